//! High-level chip handle: open a chardev chip, read its identity, and
//! request lines off it (spec §3 "Chip entity", §1 "the GPIO
//! character-device driver ... consumed as a library").
//!
//! Built on the teacher crate's raw uAPI bindings in [`crate::raw`]; this
//! module is the `Chip` that crate's own examples (`gpiodetect-rs.rs`,
//! `gpioget-rs.rs`) imagined but never finished wiring up to the `v2`
//! struct layout in `raw::v2`.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::line::LineHandle;
use crate::raw;
use crate::raw::v2;
use crate::types::{Active, Direction, EdgeDetect};
use crate::utils::safe_get_str;

pub struct Chip {
    fd: File,
    name: String,
    label: String,
    num_lines: u32,
    /// Device-node path the chip was opened from (used to derive the
    /// `device` symlink target, spec §3 "Chip entity ... original sysfs
    /// path").
    path: PathBuf,
}

impl Chip {
    /// Opens `path` (e.g. `/dev/gpiochip0`) and reads its identity via the
    /// `GPIO_GET_CHIPINFO_IOCTL` (shared between uAPI v1 and v2).
    pub fn open(path: &Path) -> Result<Self> {
        let fd = OpenOptions::new().read(true).write(true).open(path)?;

        let mut info = raw::GpioChipInfo::default();
        unsafe {
            raw::gpio_get_chip_info(fd.as_raw_fd(), &mut info)?;
        }

        let name = safe_get_str(&info.name)?.to_string();
        let label = safe_get_str(&info.label)?.to_string();

        Ok(Self {
            fd,
            name,
            label,
            num_lines: info.lines,
            path: path.to_path_buf(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_lines(&self) -> u32 {
        self.num_lines
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The chip's sysfs directory, used for the `device`/`power` symlink
    /// targets (spec §3 "Chip entity").
    pub fn sysfs_dir(&self) -> PathBuf {
        PathBuf::from(format!("/sys/bus/gpio/devices/{}", self.name))
    }

    /// Requests a single line with the given consumer label and initial
    /// direction. `direction: None` requests "as-is" (spec §4.2 "initial
    /// direction as-is").
    pub fn request_line(
        &self,
        offset: u32,
        consumer: &str,
        direction: Option<Direction>,
        edge: EdgeDetect,
        active_low: Active,
    ) -> Result<LineHandle> {
        if offset >= self.num_lines {
            return Err(Error::invalid_argument(format!(
                "offset {offset} out of range for chip with {} lines",
                self.num_lines
            )));
        }

        let direction = direction.unwrap_or(Direction::Input);
        let mut req = v2::GpioLineRequest::default();
        req.offsets[0] = offset;
        req.num_lines = 1;
        crate::utils::safe_set_str(&mut req.consumer, consumer)?;
        req.config.flags = LineHandle::build_flags(direction, edge, active_low);
        req.event_buffer_size = 4;

        unsafe {
            v2::gpio_get_line(self.fd.as_raw_fd(), &mut req)?;
        }

        Ok(LineHandle::from_request_fd(
            req.fd,
            offset,
            direction,
            edge,
            active_low,
        ))
    }
}

impl Drop for Chip {
    fn drop(&mut self) {
        log::debug!("closing chip {}", self.name);
    }
}
