//! Reconfiguring requested lines and reading line bias. Only built with the
//! `line-config` feature.

use std::sync::Arc;

use nix::errno::Errno;

use super::bulk::refresh;
use super::request::{self, BIAS_DISABLE, BIAS_PULL_DOWN, BIAS_PULL_UP};
use super::{Line, LineBulk, LineEvent, LineInfo, LineRequest, RequestKind, RequestType};
use crate::errors::{Error, Result};
use crate::flags::FlagSet;
use crate::uapi::v1::{GPIOHANDLE_REQUEST_FLAGS, GPIOLINE_FLAG};

/// Most events returned by one [`Line::event_read_multiple`] call
pub const MAX_EVENTS: usize = 16;

int_enum! {
    pub enum Bias as "bias" {
        AsIs = 1,
        Disable = 2,
        PullUp = 3,
        PullDown = 4,
    }
}

impl LineInfo {
    pub fn bias(&self) -> Bias {
        let flags = self.flags();
        if flags.contains(GPIOLINE_FLAG::BIAS_DISABLE) {
            Bias::Disable
        } else if flags.contains(GPIOLINE_FLAG::BIAS_PULL_UP) {
            Bias::PullUp
        } else if flags.contains(GPIOLINE_FLAG::BIAS_PULL_DOWN) {
            Bias::PullDown
        } else {
            Bias::AsIs
        }
    }
}

impl LineRequest {
    pub const FLAG_BIAS_DISABLE: FlagSet = BIAS_DISABLE;
    pub const FLAG_BIAS_PULL_DOWN: FlagSet = BIAS_PULL_DOWN;
    pub const FLAG_BIAS_PULL_UP: FlagSet = BIAS_PULL_UP;
}

impl Line {
    pub fn bias(&self) -> Result<Bias> {
        Ok(self.info()?.bias())
    }

    /// Change direction, flags and output value of a requested line.
    pub fn set_config(&self, direction: RequestType, flags: FlagSet, value: i32) -> Result<()> {
        LineBulk::from_line(self.clone())?.set_config(direction, flags, &[value])
    }

    pub fn set_flags(&self, flags: FlagSet) -> Result<()> {
        LineBulk::from_line(self.clone())?.set_flags(flags)
    }

    pub fn set_direction_input(&self) -> Result<()> {
        LineBulk::from_line(self.clone())?.set_direction_input()
    }

    pub fn set_direction_output(&self, value: i32) -> Result<()> {
        LineBulk::from_line(self.clone())?.set_direction_output(&[value])
    }

    /// Read up to [`MAX_EVENTS`] pending events, blocking until at least one
    /// arrives.
    pub fn event_read_multiple(&self) -> Result<Vec<LineEvent>> {
        self.read_events(MAX_EVENTS)
    }

    /// Re-read the line's information from the kernel.
    pub fn update(&self) -> Result<()> {
        let offset = self.offset()?;
        self.chip_shared()?.update_line(offset)?;
        Ok(())
    }
}

impl LineBulk {
    /// Change direction, flags and output values of lines requested together.
    ///
    /// All lines must have been requested for values through the same
    /// request. `values` holds one entry per line; empty means all zeros.
    pub fn set_config(&self, direction: RequestType, flags: FlagSet, values: &[i32]) -> Result<()> {
        let (lines, chip) = self.checked()?;
        let direction_flags = match direction {
            RequestType::DirectionAsIs
            | RequestType::DirectionInput
            | RequestType::DirectionOutput => direction.direction_flags(),
            _ => return Err(Error::os(Errno::EINVAL, "invalid line direction")),
        };
        if !values.is_empty() && values.len() != lines.len() {
            return Err(Error::invalid(
                "the size of values array must correspond with the number of lines",
            ));
        }
        let handle_flags = request::handle_flags(direction_flags, flags)?;

        let targets = lines
            .iter()
            .map(|line| line.requested_for(RequestKind::Values))
            .collect::<Result<Vec<_>>>()?;
        let shared = &targets[0].handle;
        if !targets.iter().all(|req| Arc::ptr_eq(&req.handle, shared)) {
            return Err(Error::os(
                Errno::EINVAL,
                "lines must belong to the same request",
            ));
        }

        {
            let mut cache = shared.values();
            let mut next = cache.clone();
            if handle_flags.contains(GPIOHANDLE_REQUEST_FLAGS::OUTPUT) {
                for (idx, req) in targets.iter().enumerate() {
                    next[req.index] = u8::from(values.get(idx).is_some_and(|v| *v != 0));
                }
            }
            shared.handle.set_config(handle_flags, &next)?;
            *cache = next;
        }

        let offsets = shared.handle.offsets().to_vec();
        for &offset in &offsets {
            if let Some(req) = &mut chip.lock_lines()[offset as usize].request {
                req.flags = flags;
                req.handle_flags = handle_flags;
            }
        }

        log::debug!(
            "reconfigured lines {:?} of {} as {:?} with flags {:?}",
            offsets,
            chip.info.name(),
            direction,
            flags
        );
        refresh(chip, &offsets);
        Ok(())
    }

    /// Change the flags, keeping the current direction and output values.
    pub fn set_flags(&self, flags: FlagSet) -> Result<()> {
        let (lines, _) = self.checked()?;
        let req = lines[0].requested_for(RequestKind::Values)?;
        if req.handle_flags.contains(GPIOHANDLE_REQUEST_FLAGS::OUTPUT) {
            let values = {
                let cache = req.handle.values();
                lines
                    .iter()
                    .map(|line| line.requested().map(|r| i32::from(cache[r.index])))
                    .collect::<Result<Vec<_>>>()?
            };
            self.set_config(RequestType::DirectionOutput, flags, &values)
        } else {
            self.set_config(RequestType::DirectionInput, flags, &[])
        }
    }

    pub fn set_direction_input(&self) -> Result<()> {
        let flags = self.current_flags()?;
        self.set_config(RequestType::DirectionInput, flags, &[])
    }

    pub fn set_direction_output(&self, values: &[i32]) -> Result<()> {
        let flags = self.current_flags()?;
        self.set_config(RequestType::DirectionOutput, flags, values)
    }

    fn current_flags(&self) -> Result<FlagSet> {
        let (lines, _) = self.checked()?;
        Ok(lines[0].requested_for(RequestKind::Values)?.flags)
    }
}
