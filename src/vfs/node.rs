//! The polymorphic VFS node (spec §3 "Node", §4.1 "VFS Node Tree").
//!
//! A tagged variant plus a small set of methods is used instead of deep
//! inheritance (spec §9): [`Stat`] carries the behavior shared by every
//! variant, [`NodeKind`] carries what differs.

use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::error::{Error, Result};
use crate::vfs::stat::Stat;

/// Readiness bits a `poll` operation can report, matching the classical
/// `poll(2)` mask (spec §4.4 "readiness mask of `readable | writable |
/// priority`").
pub mod poll_bits {
    pub const POLLIN: u32 = 0x0001;
    pub const POLLOUT: u32 = 0x0004;
    pub const POLLPRI: u32 = 0x0002;
}

/// Handle identifying a blocked poller, as handed to us by the FUSE
/// session for the lifetime of one `poll` callback. Stored verbatim (no
/// round-trip through an opaque integer) so waking it later is just
/// `notifier.poll(handle)`.
pub type PollHandle = fuser::PollHandle;

/// Behavior backing a live (domain-bound) attribute: `direction`, `edge`,
/// `active_low`, and `value`. Implemented by the chip/line domain so the
/// VFS layer never needs to know about ioctls.
pub trait LiveAttr: Send + Sync {
    /// Render the current value, without the trailing newline (the node
    /// adds it).
    fn render(&self) -> Result<String>;

    /// Parse `input` (already trimmed) and apply it. Must not partially
    /// apply: on failure the live state is unchanged (spec §7).
    fn parse_and_apply(&self, input: &str) -> Result<()>;

    /// Only meaningful for `value`; every other live attribute keeps the
    /// default, which reports a filesystem-normal mask with no pending
    /// edge (spec §4.3: "classical sysfs GPIO never blocks on normal
    /// read/write").
    fn poll(&self, _armed: PollHandle) -> u32 {
        poll_bits::POLLIN | poll_bits::POLLOUT
    }
}

type ExportCallback = Arc<dyn Fn(u32) -> Result<()> + Send + Sync>;

pub enum Attr {
    /// Renders `"{value}\n"`; any write fails with permission-denied.
    ConstReadOnly(String),
    /// Write-only, digits-only payload; invokes a callback with the parsed
    /// line number (spec §3 `ExportControl`, §4.2).
    ExportControl(ExportCallback),
    /// Pattern-validated write-only attribute (spec §3 `UeventAttr`).
    Uevent,
    /// `direction`, `edge`, `active_low`, `value`.
    Live(Arc<dyn LiveAttr>),
}

pub enum NodeKind {
    Directory(Vec<(String, Arc<Mutex<Node>>)>),
    Regular(Attr),
    Symlink(String),
}

pub struct Node {
    pub stat: Stat,
    pub kind: NodeKind,
}

pub type NodeRef = Arc<Mutex<Node>>;

fn uevent_regex() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(add|remove|change|move|online|offline|bind|unbind)\s+[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}(\s+\S+=\S*)*$",
        )
        .expect("static uevent pattern is valid")
    })
}

impl Node {
    pub fn new_root() -> NodeRef {
        Arc::new(Mutex::new(Node {
            stat: Stat::new_dir(0o755),
            kind: NodeKind::Directory(Vec::new()),
        }))
    }

    pub fn new_dir(mode: u32) -> NodeRef {
        Arc::new(Mutex::new(Node {
            stat: Stat::new_dir(mode),
            kind: NodeKind::Directory(Vec::new()),
        }))
    }

    pub fn new_const_reg(mode: u32, value: impl Into<String>) -> NodeRef {
        Arc::new(Mutex::new(Node {
            stat: Stat::new_reg(mode),
            kind: NodeKind::Regular(Attr::ConstReadOnly(value.into())),
        }))
    }

    pub fn new_export_control(mode: u32, cb: ExportCallback) -> NodeRef {
        Arc::new(Mutex::new(Node {
            stat: Stat::new_reg(mode),
            kind: NodeKind::Regular(Attr::ExportControl(cb)),
        }))
    }

    pub fn new_uevent(mode: u32) -> NodeRef {
        Arc::new(Mutex::new(Node {
            stat: Stat::new_reg(mode),
            kind: NodeKind::Regular(Attr::Uevent),
        }))
    }

    pub fn new_live(mode: u32, attr: Arc<dyn LiveAttr>) -> NodeRef {
        Arc::new(Mutex::new(Node {
            stat: Stat::new_reg(mode),
            kind: NodeKind::Regular(Attr::Live(attr)),
        }))
    }

    pub fn new_symlink(target: impl Into<String>) -> NodeRef {
        Arc::new(Mutex::new(Node {
            stat: Stat::new_symlink(),
            kind: NodeKind::Symlink(target.into()),
        }))
    }

    // -- capability-set operations (spec §4.1) --------------------------

    pub fn getattr(&self) -> Stat {
        self.stat.clone()
    }

    /// Yields `.`, `..`, then children in insertion order; `offset` is
    /// advisory (spec §4.1).
    pub fn readdir(&self) -> Result<Vec<String>> {
        match &self.kind {
            NodeKind::Directory(children) => {
                let mut names = vec![".".to_string(), "..".to_string()];
                names.extend(children.iter().map(|(name, _)| name.clone()));
                Ok(names)
            }
            _ => Err(Error::NotADirectory("readdir on non-directory".into())),
        }
    }

    pub fn lookup_child(&self, name: &str) -> Option<NodeRef> {
        match &self.kind {
            NodeKind::Directory(children) => {
                children.iter().find(|(n, _)| n == name).map(|(_, node)| node.clone())
            }
            _ => None,
        }
    }

    pub fn insert_child(&mut self, name: impl Into<String>, node: NodeRef) -> Result<()> {
        match &mut self.kind {
            NodeKind::Directory(children) => {
                let name = name.into();
                children.retain(|(n, _)| n != &name);
                children.push((name, node));
                self.stat.touch_mtime();
                Ok(())
            }
            _ => Err(Error::NotADirectory("insert on non-directory".into())),
        }
    }

    pub fn remove_child(&mut self, name: &str) -> Option<NodeRef> {
        match &mut self.kind {
            NodeKind::Directory(children) => {
                let idx = children.iter().position(|(n, _)| n == name)?;
                self.stat.touch_mtime();
                Some(children.remove(idx).1)
            }
            _ => None,
        }
    }

    pub fn children_names(&self) -> Vec<String> {
        match &self.kind {
            NodeKind::Directory(children) => children.iter().map(|(n, _)| n.clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// `open(flags)` succeeds on regular attributes returning 0;
    /// directories and symlinks do not open (spec §4.1).
    pub fn open(&self) -> Result<()> {
        match &self.kind {
            NodeKind::Regular(_) => Ok(()),
            NodeKind::Directory(_) => Err(Error::invalid_argument("open on directory")),
            NodeKind::Symlink(_) => Err(Error::invalid_argument("open on symlink")),
        }
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        match &self.kind {
            NodeKind::Regular(Attr::ConstReadOnly(v)) => Ok(format!("{v}\n").into_bytes()),
            NodeKind::Regular(Attr::ExportControl(_)) => Ok(Vec::new()),
            NodeKind::Regular(Attr::Uevent) => Ok(Vec::new()),
            NodeKind::Regular(Attr::Live(attr)) => {
                Ok(format!("{}\n", attr.render()?).into_bytes())
            }
            NodeKind::Directory(_) => Err(Error::invalid_argument("read on directory")),
            NodeKind::Symlink(_) => Err(Error::permission_denied("read on symlink")),
        }
    }

    /// Strips surrounding whitespace and decodes as UTF-8 before
    /// dispatching to the node-specific parser (spec §4.1).
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let text = std::str::from_utf8(buf)
            .map_err(|_| Error::invalid_argument("write payload is not utf-8"))?;
        let trimmed = text.trim();
        let len = buf.len();

        match &self.kind {
            NodeKind::Regular(Attr::ConstReadOnly(_)) => {
                Err(Error::permission_denied("write to read-only attribute"))
            }
            NodeKind::Regular(Attr::ExportControl(cb)) => {
                if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::invalid_argument("export payload must be digits"));
                }
                let n: u32 = trimmed
                    .parse()
                    .map_err(|_| Error::invalid_argument("export payload out of range"))?;
                cb(n)?;
                Ok(len)
            }
            NodeKind::Regular(Attr::Uevent) => {
                if uevent_regex().is_match(trimmed) {
                    Ok(len)
                } else {
                    Err(Error::invalid_argument("malformed uevent payload"))
                }
            }
            NodeKind::Regular(Attr::Live(attr)) => {
                attr.parse_and_apply(trimmed)?;
                self.stat.touch_mtime();
                Ok(len)
            }
            NodeKind::Directory(_) => Err(Error::invalid_argument("write on directory")),
            NodeKind::Symlink(_) => Err(Error::permission_denied("write on symlink")),
        }
    }

    /// Only defined on the `value` live attribute (spec §4.4).
    pub fn poll(&self, armed: PollHandle) -> Result<u32> {
        match &self.kind {
            NodeKind::Regular(Attr::Live(attr)) => Ok(attr.poll(armed)),
            _ => Err(Error::invalid_argument("poll on non-pollable node")),
        }
    }

    pub fn readlink(&self) -> Result<String> {
        match &self.kind {
            NodeKind::Symlink(target) => Ok(target.clone()),
            _ => Err(Error::permission_denied("readlink on non-symlink")),
        }
    }

    pub fn chmod(&mut self, mode: u32) {
        self.stat.chmod(mode);
    }

    pub fn chown(&mut self, uid: Option<u32>, gid: Option<u32>) {
        self.stat.chown(uid, gid);
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_control_accepts_digits_only() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls2 = calls.clone();
        let node = Node::new_export_control(
            0o200,
            Arc::new(move |n| {
                calls2.lock().unwrap().push(n);
                Ok(())
            }),
        );
        {
            let mut node = node.lock().unwrap();
            assert_eq!(node.write(b"520\n").unwrap(), 4);
            assert!(node.write(b"abc").is_err());
        }
        assert_eq!(*calls.lock().unwrap(), vec![520]);
    }

    #[test]
    fn uevent_validates_pattern() {
        let node = Node::new_uevent(0o644);
        let mut node = node.lock().unwrap();
        assert!(node
            .write(b"add 12345678-1234-1234-1234-123456789abc KEY=VAL\n")
            .is_ok());
        assert!(node.write(b"junk\n").is_err());
    }

    #[test]
    fn const_read_only_rejects_writes() {
        let node = Node::new_const_reg(0o444, "512");
        assert_eq!(node.lock().unwrap().read().unwrap(), b"512\n");
        assert!(node.lock().unwrap().write(b"1").is_err());
    }

    #[test]
    fn directory_readdir_lists_dot_and_dotdot_first() {
        let dir = Node::new_dir(0o755);
        dir.lock()
            .unwrap()
            .insert_child("a", Node::new_const_reg(0o444, "1"))
            .unwrap();
        let names = dir.lock().unwrap().readdir().unwrap();
        assert_eq!(names[0], ".");
        assert_eq!(names[1], "..");
        assert_eq!(names[2], "a");
    }
}
