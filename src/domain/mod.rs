//! The GPIO domain: chip/line bookkeeping bound onto the VFS tree (spec
//! §3 "Chip entity", §3 "Line (Gpio) entity", §4.2 "export/unexport").

pub mod chip_entry;
pub mod gpio_entry;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::alloc::BaseAllocator;
use crate::chip::Chip;
use crate::error::{Error, Result};
use crate::types::{Active, EdgeDetect};
use crate::vfs::node::Node;
use crate::vfs::tree::SharedTree;

pub use chip_entry::ChipEntry;
pub use gpio_entry::{ActiveLowAttr, DirectionAttr, EdgeAttr, GpioLineEntry, ValueAttr};

/// Receives line lifecycle notifications so the watcher can arm/disarm
/// its `poll(2)` set without the registry depending on the watcher's
/// implementation (spec §4.4 "the watcher holds no owning reference into
/// the tree").
pub trait LineWatcher: Send + Sync {
    fn watch(&self, entry: Arc<GpioLineEntry>);
    fn unwatch(&self, global_n: u32);
}

/// Single point of truth for "what chips and exported lines currently
/// exist", and the only writer of the tree's `gpiochip*`/`gpio*` subtrees
/// (spec §3 "Chip entity", "Line (Gpio) entity").
pub struct Registry {
    tree: SharedTree,
    watcher: Arc<dyn LineWatcher>,
    alloc: BaseAllocator,
    chips: BTreeMap<u32, Arc<ChipEntry>>,
    gpios: HashMap<u32, Arc<GpioLineEntry>>,
    consumer_label: &'static str,
}

impl Registry {
    pub fn new(tree: SharedTree, watcher: Arc<dyn LineWatcher>, consumer_label: &'static str) -> Self {
        Self {
            tree,
            watcher,
            alloc: BaseAllocator::new(),
            chips: BTreeMap::new(),
            gpios: HashMap::new(),
            consumer_label,
        }
    }

    pub fn chip_bases(&self) -> Vec<u32> {
        self.chips.keys().copied().collect()
    }

    pub fn find_chip_by_name(&self, name: &str) -> Option<u32> {
        self.chips
            .iter()
            .find(|(_, entry)| entry.chip.name() == name)
            .map(|(base, _)| *base)
    }

    /// Opens `path`, allocates it a base, and grafts its `gpiochip<base>`
    /// directory into the tree root (spec §4.2, §4.6 "chip add").
    pub fn register_chip(&mut self, path: &std::path::Path) -> Result<u32> {
        let chip = Chip::open(path)?;
        let base = self.alloc.get_new_base(chip.num_lines());
        let entry = ChipEntry::new(chip, base);

        let node = entry.build_dir_node();
        let dir_name = entry.dir_name();
        self.tree.lock().unwrap().insert("/", &dir_name, node)?;

        self.chips.insert(base, entry);
        log::info!("registered chip at base {base}");
        Ok(base)
    }

    /// Removes a chip's directory and cascades to unexport every line
    /// still exported from it (spec §4.6 "chip remove forces unexport of
    /// its lines").
    pub fn remove_chip_by_name(&mut self, name: &str) -> Result<()> {
        let base = self
            .find_chip_by_name(name)
            .ok_or_else(|| Error::no_such_entry(format!("no chip named {name}")))?;
        self.remove_chip(base)
    }

    pub fn remove_chip(&mut self, base: u32) -> Result<()> {
        let entry = self
            .chips
            .remove(&base)
            .ok_or_else(|| Error::no_such_entry(format!("no chip at base {base}")))?;

        let to_unexport: Vec<u32> = self
            .gpios
            .keys()
            .copied()
            .filter(|&n| n >= base && n < base + entry.chip.num_lines())
            .collect();
        for n in to_unexport {
            if let Err(e) = self.unexport_gpio(n) {
                log::warn!("cascade unexport of gpio{n} during chip removal: {e}");
            }
        }

        let dir_name = entry.dir_name();
        self.tree.lock().unwrap().remove("/", &dir_name);
        self.alloc.free_range(base);
        log::info!("removed chip at base {base}");
        Ok(())
    }

    /// Requests line `n` and grafts its `gpio<n>` directory into the tree
    /// (spec §4.2 "export", §4.3 "Line attributes").
    pub fn export_gpio(&mut self, n: u32) -> Result<()> {
        if self.gpios.contains_key(&n) {
            return Err(Error::invalid_argument(format!("gpio{n} already exported")));
        }
        let (base, _size) = self
            .alloc
            .find_containing(n)
            .ok_or_else(|| Error::invalid_argument(format!("gpio{n} is not backed by any chip")))?;
        let chip_entry = self
            .chips
            .get(&base)
            .ok_or_else(|| Error::invalid_argument(format!("gpio{n} is not backed by any chip")))?
            .clone();

        let offset = n - base;
        let handle = chip_entry.chip.request_line(
            offset,
            self.consumer_label,
            None,
            EdgeDetect::Disable,
            Active::High,
        )?;

        let gpio_entry = GpioLineEntry::new(
            n,
            chip_entry.chip.name().to_string(),
            base,
            chip_entry.chip.sysfs_dir(),
            handle,
        );

        let dir = build_gpio_dir_node(gpio_entry.clone());
        self.tree
            .lock()
            .unwrap()
            .insert("/", &format!("gpio{n}"), dir)?;

        self.watcher.watch(gpio_entry.clone());
        self.gpios.insert(n, gpio_entry);
        log::info!("exported gpio{n}");
        Ok(())
    }

    /// Releases line `n`: drops the chardev handle, removes it from the
    /// watcher's set, and removes the `gpio<n>` directory (spec §4.2
    /// "unexport").
    pub fn unexport_gpio(&mut self, n: u32) -> Result<()> {
        self.gpios
            .remove(&n)
            .ok_or_else(|| Error::invalid_argument(format!("gpio{n} is not exported")))?;
        self.watcher.unwatch(n);
        self.tree.lock().unwrap().remove("/", &format!("gpio{n}"));
        log::info!("unexported gpio{n}");
        Ok(())
    }
}

/// Grafts the root-level `export` and `unexport` control files, wiring
/// their writes back into `registry` (spec §4.2 "export/unexport live at
/// the tree root").
pub fn install_export_controls(tree: &SharedTree, registry: Arc<Mutex<Registry>>) {
    let export_registry = registry.clone();
    let export_cb: Arc<dyn Fn(u32) -> Result<()> + Send + Sync> =
        Arc::new(move |n| export_registry.lock().unwrap().export_gpio(n));

    let unexport_registry = registry;
    let unexport_cb: Arc<dyn Fn(u32) -> Result<()> + Send + Sync> =
        Arc::new(move |n| unexport_registry.lock().unwrap().unexport_gpio(n));

    let root = tree.lock().unwrap().root();
    let mut root = root.lock().unwrap();
    root.insert_child("export", Node::new_export_control(0o200, export_cb))
        .unwrap();
    root.insert_child("unexport", Node::new_export_control(0o200, unexport_cb))
        .unwrap();
}

/// Builds the `gpio<n>` directory: `direction`, `edge`, `active_low`,
/// `value`, `uevent`, `device`, `power`, `subsystem` (spec §4.3).
fn build_gpio_dir_node(entry: Arc<GpioLineEntry>) -> crate::vfs::node::NodeRef {
    let dir = Node::new_dir(0o755);
    {
        let mut d = dir.lock().unwrap();
        d.insert_child(
            "direction",
            Node::new_live(0o644, Arc::new(DirectionAttr(entry.clone()))),
        )
        .unwrap();
        d.insert_child("edge", Node::new_live(0o644, Arc::new(EdgeAttr(entry.clone()))))
            .unwrap();
        d.insert_child(
            "active_low",
            Node::new_live(0o644, Arc::new(ActiveLowAttr(entry.clone()))),
        )
        .unwrap();
        d.insert_child("value", Node::new_live(0o644, Arc::new(ValueAttr(entry.clone()))))
            .unwrap();
        d.insert_child("uevent", Node::new_uevent(0o644)).unwrap();

        let device_target: PathBuf = entry.chip_sysfs_dir.clone();
        d.insert_child("device", Node::new_symlink(device_target.to_string_lossy().into_owned()))
            .unwrap();
        d.insert_child("power", Node::new_symlink("device/power")).unwrap();
        d.insert_child("subsystem", Node::new_symlink("../../class/gpio")).unwrap();
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use crate::vfs::tree::Tree;

    struct NullWatcher(StdMutex<Vec<u32>>);
    impl LineWatcher for NullWatcher {
        fn watch(&self, entry: Arc<GpioLineEntry>) {
            self.0.lock().unwrap().push(entry.global_n);
        }
        fn unwatch(&self, global_n: u32) {
            self.0.lock().unwrap().retain(|&n| n != global_n);
        }
    }

    fn fresh_registry() -> Registry {
        let tree = Arc::new(std::sync::Mutex::new(Tree::new(Node::new_root())));
        let watcher: Arc<dyn LineWatcher> = Arc::new(NullWatcher(StdMutex::new(Vec::new())));
        Registry::new(tree, watcher, "sysfs")
    }

    #[test]
    fn exporting_unbacked_line_is_invalid_argument() {
        let mut reg = fresh_registry();
        assert!(matches!(reg.export_gpio(900), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn unexporting_non_exported_line_is_invalid_argument() {
        let mut reg = fresh_registry();
        assert!(matches!(reg.unexport_gpio(512), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn removing_unknown_chip_is_no_such_entry() {
        let mut reg = fresh_registry();
        assert!(matches!(reg.remove_chip(512), Err(Error::NoSuchEntry(_))));
    }
}
