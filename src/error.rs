//! Crate-wide error type and its mapping onto the POSIX errno surface the
//! FUSE callbacks must return (spec §7 "Error Handling Design").

use std::io;

/// Errors produced anywhere in the proxy: node operations, chip/line
/// handling, the allocator, the watcher, and hotplug processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Parse failure on an attribute write, export of an unknown gpio,
    /// unexport of a non-exported gpio.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Write to a read-only node; mkdir/unlink/rmdir on regular files;
    /// readlink on a non-symlink.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// mknod on any path.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Path resolution miss.
    #[error("no such entry: {0}")]
    NoSuchEntry(String),

    /// rmdir on a directory node.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Chardev ioctl failed.
    #[error("gpio ioctl failed: {0}")]
    Nix(#[from] nix::Error),

    /// Any other OS-level failure (opening a chip device node, reading a
    /// sysfs attribute file while probing, etc).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// udev enumeration or monitor setup/read failure.
    #[error("udev error: {0}")]
    Udev(#[from] udev::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Error::PermissionDenied(msg.into())
    }

    pub fn no_such_entry(msg: impl Into<String>) -> Self {
        Error::NoSuchEntry(msg.into())
    }

    /// Maps this error to the `libc::E*` constant the FUSE reply should
    /// carry, per spec §6 "Error code surface" and §7's table.
    pub fn errno(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => libc::EINVAL,
            Error::PermissionDenied(_) => libc::EPERM,
            Error::AccessDenied(_) => libc::EACCES,
            Error::NoSuchEntry(_) => libc::ENOENT,
            Error::NotADirectory(_) => libc::ENOTDIR,
            Error::Nix(errno) => *errno as i32,
            Error::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            Error::Udev(_) => libc::EIO,
        }
    }

    /// True when an OS error observed during hotplug handling should be
    /// swallowed rather than treated as fatal (spec §4.6, §7
    /// `transient-device-gone`).
    pub fn is_transient_device_gone(&self) -> bool {
        matches!(
            self,
            Error::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::NotFound
            ) || e.raw_os_error() == Some(libc::ENODEV)
        )
    }
}
