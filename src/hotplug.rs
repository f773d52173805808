//! Hotplug Integrator: takes an initial snapshot of `gpiochip*` chardev
//! nodes via `udev` enumeration, then follows a live monitor socket for
//! bind/unbind events (spec §4.6 "Hotplug Integrator").

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::domain::Registry;

const SUBSYSTEM: &str = "gpio";

pub struct HotplugIntegrator {
    join: Mutex<Option<JoinHandle<()>>>,
    stop_tx: std::sync::mpsc::Sender<()>,
}

/// Empty allow-list means "register every chip seen" (spec SPEC_FULL §2,
/// §4.7 "optional chip-name allow-list").
fn chip_allowed(allowlist: &[String], devnode: &std::path::Path) -> bool {
    allowlist.is_empty()
        || devnode
            .file_name()
            .map(|n| allowlist.iter().any(|a| a == n.to_string_lossy().as_ref()))
            .unwrap_or(false)
}

impl HotplugIntegrator {
    /// Enumerates chips already present, registering each with
    /// `registry`, then spawns the live-monitor thread (spec §4.6 "On
    /// startup, enumerate every already-present chip before starting the
    /// live monitor").
    pub fn spawn(
        registry: Arc<Mutex<Registry>>,
        allowlist: Vec<String>,
    ) -> crate::error::Result<Arc<Self>> {
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();

        let mut enumerator = udev::Enumerator::new()?;
        enumerator.match_subsystem(SUBSYSTEM)?;
        for device in enumerator.scan_devices()? {
            if let Some(devnode) = device.devnode() {
                if chip_allowed(&allowlist, devnode) {
                    register_chip(&registry, devnode.to_path_buf());
                } else {
                    log::debug!("chip {} excluded by --chip allow-list", devnode.display());
                }
            }
        }

        let socket = udev::MonitorBuilder::new()?
            .match_subsystem(SUBSYSTEM)?
            .listen()?;

        let join = std::thread::Builder::new()
            .name("gpio-hotplug".into())
            .spawn(move || monitor_loop(registry, socket, stop_rx, allowlist))
            .expect("spawn hotplug thread");

        Ok(Arc::new(Self {
            join: Mutex::new(Some(join)),
            stop_tx,
        }))
    }

    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.lock().unwrap().take() {
            let _ = join.join();
        }
    }
}

fn register_chip(registry: &Arc<Mutex<Registry>>, devnode: PathBuf) {
    let result = registry.lock().unwrap().register_chip(&devnode);
    match result {
        Ok(base) => log::info!("chip {} online at base {base}", devnode.display()),
        Err(e) if e.is_transient_device_gone() => {
            log::debug!("chip {} disappeared before it could be registered: {e}", devnode.display());
        }
        Err(e) => {
            log::error!("fatal error registering chip {}: {e}", devnode.display());
            std::process::exit(1);
        }
    }
}

fn chip_name_from_syspath(syspath: &std::path::Path) -> Option<String> {
    syspath.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Polls the monitor socket's fd alongside the stop channel so shutdown
/// doesn't wait on a udev event that may never come (spec §4.6 "the
/// monitor thread exits promptly on shutdown").
fn monitor_loop(
    registry: Arc<Mutex<Registry>>,
    socket: udev::MonitorSocket,
    stop_rx: std::sync::mpsc::Receiver<()>,
    allowlist: Vec<String>,
) {
    use std::os::unix::io::AsRawFd;

    let fd = socket.as_raw_fd();
    loop {
        if stop_rx.try_recv().is_ok() {
            return;
        }

        let mut fds = [nix::poll::PollFd::new(fd, nix::poll::PollFlags::POLLIN)];
        match nix::poll::poll(&mut fds, 1000) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => {
                log::error!("fatal error polling the hotplug monitor socket: {e}");
                std::process::exit(1);
            }
        }

        for event in socket.iter() {
            handle_event(&registry, event, &allowlist);
        }
    }
}

fn handle_event(registry: &Arc<Mutex<Registry>>, event: udev::Event, allowlist: &[String]) {
    use udev::EventType;

    match event.event_type() {
        EventType::Add | EventType::Bind => {
            if let Some(devnode) = event.device().devnode() {
                if chip_allowed(allowlist, devnode) {
                    register_chip(registry, devnode.to_path_buf());
                } else {
                    log::debug!("chip {} excluded by --chip allow-list", devnode.display());
                }
            }
        }
        EventType::Remove | EventType::Unbind => {
            if let Some(name) = chip_name_from_syspath(event.device().syspath()) {
                match registry.lock().unwrap().remove_chip_by_name(&name) {
                    Ok(()) => log::info!("chip {name} removed"),
                    Err(e) if e.is_transient_device_gone() || matches!(e, crate::error::Error::NoSuchEntry(_)) => {
                        log::debug!("remove_chip_by_name({name}): {e}");
                    }
                    Err(e) => {
                        log::error!("fatal error removing chip {name}: {e}");
                        std::process::exit(1);
                    }
                }
            }
        }
        _ => {}
    }
}
