//! Resolved runtime configuration, derived once from [`crate::cli::Cli`]
//! (spec §4.7).

use std::path::PathBuf;

use crate::cli::Cli;

pub struct Config {
    pub mountpoint: PathBuf,
    pub foreground: bool,
    pub verbosity: u8,
    pub pid_file: Option<PathBuf>,
    pub allow_other: bool,
    /// Empty means "register every chip seen"; non-empty is an allow-list
    /// of chip device names (spec SPEC_FULL §2 "optional chip-name
    /// allow-list").
    pub chip_allowlist: Vec<String>,
    /// Consumer label every exported line is requested with. Fixed to
    /// `"sysfs"`, matching the original proxy's hardcoded consumer string
    /// (spec SPEC_FULL §3).
    pub consumer_label: &'static str,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            mountpoint: cli.mountpoint,
            foreground: cli.foreground,
            verbosity: cli.verbose,
            pid_file: cli.pid_file,
            allow_other: cli.allow_other,
            chip_allowlist: cli.chips,
            consumer_label: "sysfs",
        }
    }
}

impl Config {
    /// Translates `-v` counts into a `log::LevelFilter`, matching the
    /// convention of zero `-v` meaning "warnings and errors only" (spec
    /// §4.7 "logging verbosity").
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
