use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clap::Parser;

use gpio_sysfs_proxy::cli::Cli;
use gpio_sysfs_proxy::config::Config;
use gpio_sysfs_proxy::domain::gpio_entry::PollNotifier;
use gpio_sysfs_proxy::domain::{install_export_controls, Registry};
use gpio_sysfs_proxy::fs::{self, FuseNotifier, SysfsGpioFs};
use gpio_sysfs_proxy::hotplug::HotplugIntegrator;
use gpio_sysfs_proxy::vfs::node::Node;
use gpio_sysfs_proxy::vfs::tree::Tree;
use gpio_sysfs_proxy::watcher::EventWatcher;

/// Daemonizes unless `--foreground` is given, matching the original
/// proxy's default of running as a background mount helper (spec
/// SPEC_FULL §4.7).
fn maybe_daemonize(config: &Config) {
    if config.foreground {
        return;
    }

    let mut daemon = daemonize::Daemonize::new();
    if let Some(pid_file) = &config.pid_file {
        daemon = daemon.pid_file(pid_file);
    }
    if let Err(e) = daemon.start() {
        eprintln!("failed to daemonize: {e}");
        std::process::exit(1);
    }
}

fn main() {
    let cli = Cli::parse();
    let config = Config::from(cli);

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .init();

    maybe_daemonize(&config);

    if config.foreground {
        if let Some(pid_file) = &config.pid_file {
            let _ = std::fs::write(pid_file, format!("{}\n", std::process::id()));
        }
    }

    let tree = Arc::new(Mutex::new(Tree::new(Node::new_root())));

    let fuse_fs = SysfsGpioFs::new(tree.clone());
    let mount_options = fs::mount_options(config.allow_other);
    let session = match fuser::spawn_mount2(fuse_fs, &config.mountpoint, &mount_options) {
        Ok(session) => session,
        Err(e) => {
            log::error!("failed to mount at {}: {e}", config.mountpoint.display());
            std::process::exit(1);
        }
    };

    let notifier: Arc<dyn PollNotifier> = Arc::new(FuseNotifier(session.notifier()));
    let watcher = EventWatcher::spawn(notifier);

    let registry = Arc::new(Mutex::new(Registry::new(
        tree.clone(),
        watcher.clone(),
        config.consumer_label,
    )));
    install_export_controls(&tree, registry.clone());

    let hotplug = match HotplugIntegrator::spawn(registry.clone(), config.chip_allowlist.clone()) {
        Ok(h) => h,
        Err(e) => {
            log::error!("fatal error starting the hotplug integrator: {e:?}");
            watcher.stop();
            std::process::exit(1);
        }
    };

    log::info!("mounted sysfs GPIO proxy at {}", config.mountpoint.display());

    wait_for_shutdown_signal();

    log::info!("shutting down");
    hotplug.stop();
    watcher.stop();
    drop(session);
}

/// Blocks until SIGINT or SIGTERM, so unmounting and releasing every
/// exported line's chardev handle happens in an orderly fashion rather
/// than via process termination (spec §5 "Cancellation and shutdown").
fn wait_for_shutdown_signal() {
    let term = Arc::new(AtomicBool::new(false));
    for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(sig, term.clone()) {
            log::warn!("failed to register handler for signal {sig}: {e}");
        }
    }

    while !term.load(Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }
}
