//! A single requested GPIO line handle: the fd returned by
//! `GPIO_V2_GET_LINE_IOCTL`, which doubles as both the value-read/write
//! handle and the edge-event fd (spec §3 "Line (Gpio) entity").

use std::os::unix::io::RawFd;

use nix::unistd::close;

use crate::error::Result;
use crate::raw::v2;
use crate::types::{Active, Direction, EdgeDetect};

pub struct LineHandle {
    fd: RawFd,
    offset: u32,
    direction: Direction,
    edge: EdgeDetect,
    active_low: Active,
}

impl LineHandle {
    pub(crate) fn build_flags(direction: Direction, edge: EdgeDetect, active_low: Active) -> u64 {
        let mut flags = match direction {
            Direction::Input => v2::GPIO_LINE_FLAG_INPUT,
            Direction::Output => v2::GPIO_LINE_FLAG_OUTPUT,
        };
        flags |= match edge {
            EdgeDetect::Disable => 0,
            EdgeDetect::Rising => v2::GPIO_LINE_FLAG_EDGE_RISING,
            EdgeDetect::Falling => v2::GPIO_LINE_FLAG_EDGE_FALLING,
            EdgeDetect::Both => v2::GPIO_LINE_FLAG_EDGE_BOTH,
        };
        if matches!(active_low, Active::Low) {
            flags |= v2::GPIO_LINE_FLAG_ACTIVE_LOW;
        }
        flags
    }

    pub(crate) fn from_request_fd(
        fd: RawFd,
        offset: u32,
        direction: Direction,
        edge: EdgeDetect,
        active_low: Active,
    ) -> Self {
        Self {
            fd,
            offset,
            direction,
            edge,
            active_low,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn edge(&self) -> EdgeDetect {
        self.edge
    }

    pub fn active_low(&self) -> Active {
        self.active_low
    }

    /// The fd the Event Watcher multiplexes on (spec §4.4).
    pub fn event_fd(&self) -> RawFd {
        self.fd
    }

    /// Applies `(direction, edge, active_low)` atomically via
    /// `GPIO_V2_LINE_SET_CONFIG_IOCTL` (spec §4.3 "Reconfiguration applies
    /// the tuple ... to the line handle atomically").
    pub fn reconfigure(
        &mut self,
        direction: Direction,
        edge: EdgeDetect,
        active_low: Active,
    ) -> Result<()> {
        let mut cfg = v2::GpioLineConfig {
            flags: Self::build_flags(direction, edge, active_low),
            ..Default::default()
        };
        unsafe {
            v2::gpio_line_set_config(self.fd, &mut cfg)?;
        }
        self.direction = direction;
        self.edge = edge;
        self.active_low = active_low;
        Ok(())
    }

    pub fn get_value(&self) -> Result<bool> {
        let mut values = v2::GpioLineValues { bits: 0, mask: 1 };
        unsafe {
            v2::gpio_line_get_values(self.fd, &mut values)?;
        }
        Ok(values.bits & 1 != 0)
    }

    pub fn set_value(&self, active: bool) -> Result<()> {
        let mut values = v2::GpioLineValues {
            bits: if active { 1 } else { 0 },
            mask: 1,
        };
        unsafe {
            v2::gpio_line_set_values(self.fd, &mut values)?;
        }
        Ok(())
    }

    /// Drains one kernel-provided edge event, up to the size of
    /// `GpioLineEvent` (spec §4.4 step 2.b, §9 "single drain per wakeup is
    /// sufficient"). Read errors are not surfaced: by the time the
    /// watcher wakes up the fd may already have been closed by a
    /// concurrent unexport.
    pub fn drain_one_event(&self) {
        let mut event = v2::GpioLineEvent::default();
        let buf: &mut [u8; std::mem::size_of::<v2::GpioLineEvent>()] = event.as_mut();
        let _ = nix::unistd::read(self.fd, buf);
    }
}

impl Drop for LineHandle {
    fn drop(&mut self) {
        let _ = close(self.fd);
    }
}
