//! Stat metadata carried by every node (spec §3 "Every node carries stat
//! metadata").

use std::time::SystemTime;

/// Fixed advisory size reported for every regular attribute file,
/// regardless of how many bytes its rendering actually occupies.
pub const ATTR_SIZE: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Directory,
    RegularAttr,
    Symlink,
}

/// A snapshot of a node's metadata, independent of its `NodeKind`'s
/// contents. Shared behavior (stat storage, chmod/chown) lives here instead
/// of being duplicated per variant, per spec §9 "Polymorphic nodes".
#[derive(Debug, Clone)]
pub struct Stat {
    pub kind: NodeType,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl Stat {
    fn now() -> SystemTime {
        SystemTime::now()
    }

    pub fn new_dir(mode: u32) -> Self {
        let now = Self::now();
        Self {
            kind: NodeType::Directory,
            mode: libc::S_IFDIR | mode,
            nlink: 2,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    pub fn new_reg(mode: u32) -> Self {
        let now = Self::now();
        Self {
            kind: NodeType::RegularAttr,
            mode: libc::S_IFREG | mode,
            nlink: 1,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    pub fn new_symlink() -> Self {
        let now = Self::now();
        Self {
            kind: NodeType::Symlink,
            mode: libc::S_IFLNK | 0o777,
            nlink: 1,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// Size reported in `stat(2)`: 4096 for regular files, 0 for everything
    /// else (spec §3).
    pub fn size(&self) -> u64 {
        match self.kind {
            NodeType::RegularAttr => ATTR_SIZE,
            _ => 0,
        }
    }

    pub fn touch_mtime(&mut self) {
        let now = Self::now();
        self.mtime = now;
        self.ctime = now;
    }

    pub fn chmod(&mut self, mode: u32) {
        let file_type_bits = self.mode & libc::S_IFMT;
        self.mode = file_type_bits | (mode & 0o7777);
        self.ctime = Self::now();
    }

    pub fn chown(&mut self, uid: Option<u32>, gid: Option<u32>) {
        if let Some(uid) = uid {
            self.uid = uid;
        }
        if let Some(gid) = gid {
            self.gid = gid;
        }
        self.ctime = Self::now();
    }
}
