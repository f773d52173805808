//! Path resolution and whole-tree invariants (spec §3 "Tree invariants",
//! §4.1 "VFS Node Tree").

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::vfs::node::{Node, NodeRef, PollHandle};
use crate::vfs::stat::Stat;

pub struct Tree {
    root: NodeRef,
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl Tree {
    pub fn new(root: NodeRef) -> Self {
        Self { root }
    }

    pub fn root(&self) -> NodeRef {
        self.root.clone()
    }

    /// Resolves `path` (normalized, split on `/`) starting from the root;
    /// `"/"` resolves to the root directly (spec §4.1).
    pub fn resolve(&self, path: &str) -> Result<NodeRef> {
        let tokens = split_path(path);
        let mut current = self.root.clone();
        for token in tokens {
            let next = {
                let guard = current.lock().unwrap();
                guard.lookup_child(token)
            };
            current = next.ok_or_else(|| Error::no_such_entry(path.to_string()))?;
        }
        Ok(current)
    }

    /// Resolves the parent directory of `path` and returns it along with
    /// the final path component, for insert/remove operations.
    pub fn resolve_parent<'a>(&self, path: &'a str) -> Result<(NodeRef, &'a str)> {
        let tokens = split_path(path);
        let (leaf, dir_tokens) = tokens
            .split_last()
            .ok_or_else(|| Error::no_such_entry(path.to_string()))?;
        let mut current = self.root.clone();
        for token in dir_tokens {
            let next = {
                let guard = current.lock().unwrap();
                guard.lookup_child(token)
            };
            current = next.ok_or_else(|| Error::no_such_entry(path.to_string()))?;
        }
        Ok((current, leaf))
    }

    pub fn insert(&self, parent_path: &str, name: &str, node: NodeRef) -> Result<()> {
        let parent = self.resolve(parent_path)?;
        parent.lock().unwrap().insert_child(name, node)
    }

    pub fn remove(&self, parent_path: &str, name: &str) -> Option<NodeRef> {
        let parent = self.resolve(parent_path).ok()?;
        parent.lock().unwrap().remove_child(name)
    }

    pub fn getattr(&self, path: &str) -> Result<Stat> {
        Ok(self.resolve(path)?.lock().unwrap().getattr())
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        self.resolve(path)?.lock().unwrap().readdir()
    }

    pub fn open(&self, path: &str) -> Result<()> {
        self.resolve(path)?.lock().unwrap().open()
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.resolve(path)?.lock().unwrap().read()
    }

    pub fn write(&self, path: &str, buf: &[u8]) -> Result<usize> {
        self.resolve(path)?.lock().unwrap().write(buf)
    }

    pub fn poll(&self, path: &str, armed: PollHandle) -> Result<u32> {
        self.resolve(path)?.lock().unwrap().poll(armed)
    }

    /// Non-sentinel paths answer `permission-denied` on `readlink`
    /// (Node::readlink); a path that fails to resolve at all also answers
    /// `permission-denied`, matching the sentinel's documented behavior
    /// (spec §4.1 "Lookup of a missing token yields a sentinel that
    /// answers every operation with no-such-entry (or permission-denied
    /// for readlink)").
    pub fn readlink(&self, path: &str) -> Result<String> {
        match self.resolve(path) {
            Ok(node) => node.lock().unwrap().readlink(),
            Err(Error::NoSuchEntry(_)) => {
                Err(Error::permission_denied("readlink on nonexistent path"))
            }
            Err(e) => Err(e),
        }
    }

    pub fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        self.resolve(path)?.lock().unwrap().chmod(mode);
        Ok(())
    }

    pub fn chown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        self.resolve(path)?.lock().unwrap().chown(uid, gid);
        Ok(())
    }

    /// mknod is refused with access-denied regardless of path (spec §7).
    pub fn mknod(&self, _path: &str) -> Result<()> {
        Err(Error::AccessDenied("mknod is not supported".into()))
    }

    /// mkdir is refused with permission-denied regardless of path (spec
    /// §4.1, §7).
    pub fn mkdir(&self, _path: &str) -> Result<()> {
        Err(Error::permission_denied("mkdir is not supported"))
    }

    /// unlink is refused with permission-denied regardless of path (spec
    /// §4.1, §7).
    pub fn unlink(&self, _path: &str) -> Result<()> {
        Err(Error::permission_denied("unlink is not supported"))
    }

    /// rmdir answers not-a-directory for directories (sysfs is not
    /// removable) and permission-denied for files (spec §4.1, §7).
    pub fn rmdir(&self, path: &str) -> Result<()> {
        let node = self.resolve(path)?;
        let is_dir = node.lock().unwrap().is_directory();
        if is_dir {
            Err(Error::NotADirectory(path.to_string()))
        } else {
            Err(Error::permission_denied("rmdir on a regular file"))
        }
    }

    /// truncate and flush are no-ops returning success (spec §4.1).
    pub fn truncate(&self, path: &str) -> Result<()> {
        self.resolve(path)?;
        Ok(())
    }

    pub fn flush(&self, path: &str) -> Result<()> {
        self.resolve(path)?;
        Ok(())
    }
}

/// Shared, lockable handle installed into the FUSE filesystem binding.
pub type SharedTree = Arc<Mutex<Tree>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::node::Node;

    fn sample_tree() -> Tree {
        let root = Node::new_root();
        {
            let mut r = root.lock().unwrap();
            r.insert_child("export", Node::new_export_control(0o200, Arc::new(|_| Ok(()))))
                .unwrap();
            let chip = Node::new_dir(0o755);
            chip.lock()
                .unwrap()
                .insert_child("base", Node::new_const_reg(0o444, "512"))
                .unwrap();
            r.insert_child("gpiochip512", chip).unwrap();
        }
        Tree::new(root)
    }

    #[test]
    fn resolves_nested_paths() {
        let tree = sample_tree();
        assert_eq!(tree.read("/gpiochip512/base").unwrap(), b"512\n");
    }

    #[test]
    fn missing_path_is_no_such_entry() {
        let tree = sample_tree();
        assert!(matches!(
            tree.read("/nope"),
            Err(Error::NoSuchEntry(_))
        ));
    }

    #[test]
    fn missing_path_readlink_is_permission_denied() {
        let tree = sample_tree();
        assert!(matches!(
            tree.readlink("/nope"),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn rmdir_rules() {
        let tree = sample_tree();
        assert!(matches!(tree.rmdir("/gpiochip512"), Err(Error::NotADirectory(_))));
        assert!(matches!(
            tree.rmdir("/gpiochip512/base"),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn readdir_root_lists_export() {
        let tree = sample_tree();
        let names = tree.readdir("/").unwrap();
        assert!(names.contains(&"export".to_string()));
        assert!(names.contains(&"gpiochip512".to_string()));
    }
}
