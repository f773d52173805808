//! The `ChipEntry` domain object and the `gpiochip<base>` directory it
//! projects into the VFS (spec §3 "Chip entity", §4.2 "gpiochip directory
//! layout").

use std::sync::Arc;

use crate::chip::Chip;
use crate::vfs::node::Node;

/// A chip currently registered in the tree: the open chardev handle plus
/// the base it was allocated (spec §3 "Chip entity").
pub struct ChipEntry {
    pub chip: Chip,
    pub base: u32,
}

impl ChipEntry {
    pub fn new(chip: Chip, base: u32) -> Arc<Self> {
        Arc::new(Self { chip, base })
    }

    pub fn dir_name(&self) -> String {
        format!("gpiochip{}", self.base)
    }

    /// Builds the static `gpiochip<base>` directory: `base`, `label`,
    /// `ngpio`, `uevent`, `device` (symlink), `power`, `subsystem`
    /// (symlinks) — spec §4.2.
    pub fn build_dir_node(&self) -> crate::vfs::node::NodeRef {
        let dir = Node::new_dir(0o755);
        {
            let mut d = dir.lock().unwrap();
            d.insert_child("base", Node::new_const_reg(0o444, self.base.to_string()))
                .unwrap();
            d.insert_child("label", Node::new_const_reg(0o444, self.chip.label().to_string()))
                .unwrap();
            d.insert_child(
                "ngpio",
                Node::new_const_reg(0o444, self.chip.num_lines().to_string()),
            )
            .unwrap();
            d.insert_child("uevent", Node::new_uevent(0o644)).unwrap();

            let device_target = self.chip.sysfs_dir().to_string_lossy().into_owned();
            d.insert_child("device", Node::new_symlink(device_target)).unwrap();
            d.insert_child("power", Node::new_symlink("device/power")).unwrap();
            d.insert_child("subsystem", Node::new_symlink("../../bus/gpio")).unwrap();
        }
        dir
    }
}
