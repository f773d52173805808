//! Binds the [`crate::vfs::tree::Tree`] to FUSE lowlevel callbacks (spec
//! §4.0 "Filesystem binding").
//!
//! Everything path-shaped lives in `Tree`; this module only translates
//! between FUSE's inode numbers and tree paths, and between
//! [`crate::error::Error`] and the errno a `Reply*::error` expects.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Mutex;
use std::time::Duration;

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyPoll, ReplyWrite, Request,
};

use crate::domain::gpio_entry::PollNotifier;
use crate::error::Error;
use crate::vfs::node::PollHandle;
use crate::vfs::stat::{NodeType, Stat};
use crate::vfs::tree::SharedTree;

/// Attributes are never cached client-side: every live attribute can
/// change from outside the filesystem (an edge fires, another process
/// toggles `value`), so a positive TTL would serve stale reads (spec §6
/// "attribute TTL: 0").
const ATTR_TTL: Duration = Duration::from_secs(0);
const ROOT_INO: u64 = 1;

/// FUSE mount options for the proxy: a fixed filesystem-type tag (so `mount`
/// and `/proc/mounts` identify it) plus `allow_other` when requested on the
/// command line (spec SPEC_FULL §4.7).
pub fn mount_options(allow_other: bool) -> Vec<fuser::MountOption> {
    let mut options = vec![
        fuser::MountOption::FSName("gpio-sysfs-proxy".to_string()),
        fuser::MountOption::NoDev,
        fuser::MountOption::NoSuid,
    ];
    if allow_other {
        options.push(fuser::MountOption::AllowOther);
    }
    options
}

/// Bidirectional map between FUSE inode numbers and tree paths. Inodes
/// are allocated on first lookup and never recycled; a sysfs tree this
/// size never approaches `u64` exhaustion (spec §4.0).
struct InodeTable {
    paths: Vec<String>,
    by_path: HashMap<String, u64>,
}

impl InodeTable {
    fn new() -> Self {
        Self {
            paths: vec!["/".to_string()],
            by_path: HashMap::from([("/".to_string(), ROOT_INO)]),
        }
    }

    fn path(&self, ino: u64) -> Option<&str> {
        self.paths.get((ino - 1) as usize).map(String::as_str)
    }

    fn ino_for(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.by_path.get(path) {
            return ino;
        }
        self.paths.push(path.to_string());
        let ino = self.paths.len() as u64;
        self.by_path.insert(path.to_string(), ino);
        ino
    }

    fn join(&self, parent: u64, name: &str) -> Option<String> {
        let parent_path = self.path(parent)?;
        Some(if parent_path == "/" {
            format!("/{name}")
        } else {
            format!("{parent_path}/{name}")
        })
    }
}

pub struct SysfsGpioFs {
    tree: SharedTree,
    inodes: Mutex<InodeTable>,
}

impl SysfsGpioFs {
    pub fn new(tree: SharedTree) -> Self {
        Self {
            tree,
            inodes: Mutex::new(InodeTable::new()),
        }
    }

    fn stat_to_attr(ino: u64, stat: &Stat) -> FileAttr {
        let kind = match stat.kind {
            NodeType::Directory => FileType::Directory,
            NodeType::RegularAttr => FileType::RegularFile,
            NodeType::Symlink => FileType::Symlink,
        };
        FileAttr {
            ino,
            size: stat.size(),
            blocks: 0,
            atime: stat.atime,
            mtime: stat.mtime,
            ctime: stat.ctime,
            crtime: stat.ctime,
            kind,
            perm: (stat.mode & 0o7777) as u16,
            nlink: stat.nlink,
            uid: stat.uid,
            gid: stat.gid,
            rdev: 0,
            blksize: 4096,
            flags: 0,
        }
    }
}

/// Wraps `fuser::Notifier` so the domain layer can wake a blocked poller
/// without depending on `fuser` directly (spec §4.4 "the watcher wakes
/// the kernel through whatever handle it was given").
pub struct FuseNotifier(pub fuser::Notifier);

impl PollNotifier for FuseNotifier {
    fn notify(&self, handle: PollHandle) {
        if let Err(e) = self.0.poll(handle) {
            log::debug!("poll notify failed (session likely gone): {e}");
        }
    }
}

impl Filesystem for SysfsGpioFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), i32> {
        Ok(())
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match name.to_str() {
            Some(n) => n,
            None => return reply.error(libc::EINVAL),
        };
        let path = {
            let inodes = self.inodes.lock().unwrap();
            match inodes.join(parent, name) {
                Some(p) => p,
                None => return reply.error(libc::ENOENT),
            }
        };

        let stat = match self.tree.lock().unwrap().getattr(&path) {
            Ok(s) => s,
            Err(e) => return reply.error(e.errno()),
        };
        let ino = self.inodes.lock().unwrap().ino_for(&path);
        reply.entry(&ATTR_TTL, &Self::stat_to_attr(ino, &stat), 0);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().getattr(&path) {
            Ok(stat) => reply.attr(&ATTR_TTL, &Self::stat_to_attr(ino, &stat)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        let tree = self.tree.lock().unwrap();
        if let Some(mode) = mode {
            if let Err(e) = tree.chmod(&path, mode) {
                return reply.error(e.errno());
            }
        }
        if uid.is_some() || gid.is_some() {
            if let Err(e) = tree.chown(&path, uid, gid) {
                return reply.error(e.errno());
            }
        }
        match tree.getattr(&path) {
            Ok(stat) => reply.attr(&ATTR_TTL, &Self::stat_to_attr(ino, &stat)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().readlink(&path) {
            Ok(target) => reply.data(target.as_bytes()),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let path = self
            .inodes
            .lock()
            .unwrap()
            .path(parent)
            .unwrap_or("/")
            .to_string();
        match self.tree.lock().unwrap().mknod(&path) {
            Ok(()) => unreachable!("mknod always errors"),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = self
            .inodes
            .lock()
            .unwrap()
            .path(parent)
            .unwrap_or("/")
            .to_string();
        match self.tree.lock().unwrap().mkdir(&path) {
            Ok(()) => unreachable!("mkdir always errors"),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match name.to_str().and_then(|n| self.inodes.lock().unwrap().join(parent, n)) {
            Some(p) => p,
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().unlink(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match name.to_str().and_then(|n| self.inodes.lock().unwrap().join(parent, n)) {
            Some(p) => p,
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().rmdir(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().open(&path) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, _ino: u64, _flags: i32, reply: ReplyOpen) {
        reply.opened(0, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().read(&path) {
            Ok(data) => {
                let offset = offset.max(0) as usize;
                let end = (offset + size as usize).min(data.len());
                let slice = if offset >= data.len() { &[][..] } else { &data[offset..end] };
                reply.data(slice);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().write(&path, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().flush(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        let names = match self.tree.lock().unwrap().readdir(&path) {
            Ok(n) => n,
            Err(e) => return reply.error(e.errno()),
        };

        for (i, name) in names.iter().enumerate().skip(offset as usize) {
            let child_path = if name == "." {
                path.clone()
            } else if name == ".." {
                parent_of(&path)
            } else if path == "/" {
                format!("/{name}")
            } else {
                format!("{path}/{name}")
            };
            let child_ino = self.inodes.lock().unwrap().ino_for(&child_path);
            let kind = match self.tree.lock().unwrap().getattr(&child_path) {
                Ok(stat) => match stat.kind {
                    NodeType::Directory => FileType::Directory,
                    NodeType::RegularAttr => FileType::RegularFile,
                    NodeType::Symlink => FileType::Symlink,
                },
                Err(_) => FileType::RegularFile,
            };
            if reply.add(child_ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn poll(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        ph: PollHandle,
        _events: u32,
        _flags: u32,
        reply: ReplyPoll,
    ) {
        let path = match self.inodes.lock().unwrap().path(ino) {
            Some(p) => p.to_string(),
            None => return reply.error(libc::ENOENT),
        };
        match self.tree.lock().unwrap().poll(&path, ph) {
            Ok(mask) => reply.poll(mask),
            Err(e) => reply.error(e.errno()),
        }
    }
}

fn parent_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

impl From<Error> for i32 {
    fn from(e: Error) -> Self {
        e.errno()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_table_assigns_stable_ids() {
        let mut t = InodeTable::new();
        let a = t.ino_for("/export");
        let b = t.ino_for("/export");
        assert_eq!(a, b);
        assert_eq!(t.path(a), Some("/export"));
    }

    #[test]
    fn join_builds_root_relative_paths() {
        let t = InodeTable::new();
        assert_eq!(t.join(ROOT_INO, "export").as_deref(), Some("/export"));
    }
}
