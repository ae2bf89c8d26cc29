use crate::errors::Result;
use crate::fixed_str::FixedStr;
use crate::uapi::v1::{self, GPIOLINE_FLAG};
use crate::uapi::GPIO_MAX_NAME_SIZE;

use super::{ActiveState, Direction};

/// The kernel's view of a single line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInfo {
    name: FixedStr<GPIO_MAX_NAME_SIZE>,
    consumer: FixedStr<GPIO_MAX_NAME_SIZE>,
    offset: u32,
    flags: GPIOLINE_FLAG,
}

impl LineInfo {
    pub fn new(offset: u32, name: &str, consumer: &str, flags: GPIOLINE_FLAG) -> Result<Self> {
        Ok(Self {
            name: FixedStr::new(name)?,
            consumer: FixedStr::new(consumer)?,
            offset,
            flags,
        })
    }

    pub(crate) fn from_v1(info: v1::gpioline_info) -> Result<Self> {
        Ok(Self {
            name: FixedStr::from_byte_array(info.name)?,
            consumer: FixedStr::from_byte_array(info.consumer)?,
            offset: info.line_offset,
            flags: info.flags,
        })
    }

    pub fn name(&self) -> Option<&str> {
        if self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }

    pub fn consumer(&self) -> Option<&str> {
        if self.consumer.is_empty() {
            None
        } else {
            Some(&self.consumer)
        }
    }

    pub fn line_offset(&self) -> u32 {
        self.offset
    }

    pub fn flags(&self) -> GPIOLINE_FLAG {
        self.flags
    }

    /// Get the direction of this GPIO if configured
    ///
    /// Lines are considered to be inputs if not explicitly
    /// marked as outputs in the line info flags by the kernel.
    pub fn direction(&self) -> Direction {
        if self.flags.contains(GPIOLINE_FLAG::IS_OUT) {
            Direction::Output
        } else {
            Direction::Input
        }
    }

    pub fn active_state(&self) -> ActiveState {
        if self.flags.contains(GPIOLINE_FLAG::ACTIVE_LOW) {
            ActiveState::Low
        } else {
            ActiveState::High
        }
    }

    /// True if the line is held by the kernel or another process
    pub fn is_used(&self) -> bool {
        self.flags.contains(GPIOLINE_FLAG::KERNEL)
    }

    /// True if this line is marked as open drain in the kernel
    pub fn is_open_drain(&self) -> bool {
        self.flags.contains(GPIOLINE_FLAG::OPEN_DRAIN)
    }

    /// True if this line is marked as open source in the kernel
    pub fn is_open_source(&self) -> bool {
        self.flags.contains(GPIOLINE_FLAG::OPEN_SOURCE)
    }
}
