//! Command-line interface (spec §4.7 "CLI & process lifecycle").

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "gpio-sysfs-proxy", about = "FUSE proxy emulating /sys/class/gpio on the GPIO chardev uAPI", version)]
pub struct Cli {
    /// Where to mount the emulated sysfs GPIO tree.
    pub mountpoint: PathBuf,

    /// Run in the foreground instead of daemonizing.
    #[arg(short, long)]
    pub foreground: bool,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write the daemon's pid to this file.
    #[arg(long)]
    pub pid_file: Option<PathBuf>,

    /// Allow other users to access the mount (maps to the `allow_other`
    /// FUSE mount option).
    #[arg(long)]
    pub allow_other: bool,

    /// Restrict hotplug registration to chips with this name (e.g.
    /// `gpiochip0`); repeatable. Unset registers every GPIO chip seen.
    #[arg(long = "chip")]
    pub chips: Vec<String>,
}
