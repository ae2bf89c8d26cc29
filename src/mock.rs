//! An in-memory GPIO chip for exercising code without hardware.
//!
//! [`MockChip`] behaves like a kernel chip as far as the object model can
//! tell: lines can be requested once, requested lines report as used, output
//! values stick and dropped handles release their lines. Tests can inspect
//! every request made and inject input values and edge events.
//!
//! ```
//! use gpiod::mock::MockChip;
//! use gpiod::{LineRequest, RequestType};
//!
//! # fn main() -> gpiod::Result<()> {
//! let mock = MockChip::new("gpiochip0", "mock", 8).with_line_name(3, "led");
//! let chip = mock.to_chip()?;
//! let line = chip.find_line("led")?;
//! line.request(&LineRequest::new("demo", RequestType::DirectionOutput), 1)?;
//! assert_eq!(mock.value(3), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::os::fd::BorrowedFd;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nix::errno::Errno;

use crate::chip::{Chip, ChipInfo};
use crate::device::{ChipDevice, EventRequest, HandleRequest, LineHandle, RawEvent};
use crate::errors::{Error, Result};
use crate::fixed_str::FixedStr;
use crate::line::{EventType, LineInfo};
use crate::uapi::v1::{GPIOEVENT_REQUEST_FLAGS, GPIOHANDLE_REQUEST_FLAGS, GPIOLINE_FLAG};

/// A request as received by a [`MockChip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub offsets: Vec<u32>,
    pub flags: GPIOHANDLE_REQUEST_FLAGS,
    pub default_values: Vec<u8>,
    pub consumer: String,
    /// Set for event requests
    pub event_flags: Option<GPIOEVENT_REQUEST_FLAGS>,
}

#[derive(Debug, Default)]
struct MockLine {
    name: String,
    consumer: String,
    flags: GPIOLINE_FLAG,
    value: u8,
    requested: bool,
    edges: Option<GPIOEVENT_REQUEST_FLAGS>,
    events: VecDeque<RawEvent>,
}

#[derive(Debug)]
struct MockState {
    name: String,
    label: String,
    lines: Vec<MockLine>,
    requests: Vec<MockRequest>,
}

/// Shared handle to a simulated chip. Clones see the same state.
#[derive(Debug, Clone)]
pub struct MockChip {
    state: Arc<Mutex<MockState>>,
}

impl MockChip {
    pub fn new(name: &str, label: &str, num_lines: u32) -> Self {
        let lines = (0..num_lines).map(|_| MockLine::default()).collect();
        Self {
            state: Arc::new(Mutex::new(MockState {
                name: name.to_owned(),
                label: label.to_owned(),
                lines,
                requests: Vec::new(),
            })),
        }
    }

    /// Name the line at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of range.
    pub fn with_line_name(self, offset: u32, name: &str) -> Self {
        self.lock().lines[offset as usize].name = name.to_owned();
        self
    }

    /// Mark the line at `offset` as held by another consumer, so requesting
    /// it fails with `EBUSY`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of range.
    pub fn with_busy_line(self, offset: u32, consumer: &str) -> Self {
        {
            let mut state = self.lock();
            let line = &mut state.lines[offset as usize];
            line.consumer = consumer.to_owned();
            line.flags |= GPIOLINE_FLAG::KERNEL;
        }
        self
    }

    /// Wrap a clone of this mock in a [`Chip`].
    pub fn to_chip(&self) -> Result<Chip> {
        Chip::from_device(self.clone())
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<MockRequest> {
        self.lock().requests.clone()
    }

    pub fn value(&self, offset: u32) -> u8 {
        self.lock().lines[offset as usize].value
    }

    /// Drive the level seen on an input line.
    pub fn set_input(&self, offset: u32, value: u8) {
        self.lock().lines[offset as usize].value = u8::from(value != 0);
    }

    /// Whether a handle currently holds the line at `offset`
    pub fn is_requested(&self, offset: u32) -> bool {
        self.lock().lines[offset as usize].requested
    }

    pub fn line_flags(&self, offset: u32) -> GPIOLINE_FLAG {
        self.lock().lines[offset as usize].flags
    }

    /// Queue an edge event on `offset`. The event is dropped unless the line
    /// is requested for that kind of edge.
    pub fn push_event(&self, offset: u32, event_type: EventType, timestamp: Duration) {
        let mut state = self.lock();
        let line = &mut state.lines[offset as usize];
        let wanted = match event_type {
            EventType::RisingEdge => GPIOEVENT_REQUEST_FLAGS::RISING_EDGE,
            EventType::FallingEdge => GPIOEVENT_REQUEST_FLAGS::FALLING_EDGE,
        };
        if line.edges.is_some_and(|edges| edges.contains(wanted)) {
            line.events.push_back(RawEvent {
                timestamp,
                event_type,
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(
        &self,
        offsets: &[u32],
        flags: GPIOHANDLE_REQUEST_FLAGS,
        consumer: &str,
    ) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        for (idx, &offset) in offsets.iter().enumerate() {
            let line = state
                .lines
                .get(offset as usize)
                .ok_or(Error::os(Errno::EINVAL, "error requesting GPIO lines"))?;
            if line.requested
                || line.flags.contains(GPIOLINE_FLAG::KERNEL)
                || offsets[..idx].contains(&offset)
            {
                return Err(Error::os(Errno::EBUSY, "error requesting GPIO lines"));
            }
        }
        check_flags(flags)?;

        for &offset in offsets {
            let line = &mut state.lines[offset as usize];
            line.requested = true;
            line.consumer = consumer.to_owned();
            line.flags = line_flags(flags) | GPIOLINE_FLAG::KERNEL;
        }
        Ok(state)
    }
}

const DIRECTION: GPIOHANDLE_REQUEST_FLAGS =
    GPIOHANDLE_REQUEST_FLAGS::INPUT.union(GPIOHANDLE_REQUEST_FLAGS::OUTPUT);
const DRIVE: GPIOHANDLE_REQUEST_FLAGS =
    GPIOHANDLE_REQUEST_FLAGS::OPEN_DRAIN.union(GPIOHANDLE_REQUEST_FLAGS::OPEN_SOURCE);
const BIAS: GPIOHANDLE_REQUEST_FLAGS = GPIOHANDLE_REQUEST_FLAGS::BIAS_PULL_UP
    .union(GPIOHANDLE_REQUEST_FLAGS::BIAS_PULL_DOWN)
    .union(GPIOHANDLE_REQUEST_FLAGS::BIAS_DISABLE);

fn check_flags(flags: GPIOHANDLE_REQUEST_FLAGS) -> Result<()> {
    let invalid = flags.contains(DIRECTION)
        || flags.contains(DRIVE)
        || (flags & BIAS).bits().count_ones() > 1
        || (flags.intersects(DRIVE) && !flags.contains(GPIOHANDLE_REQUEST_FLAGS::OUTPUT));
    if invalid {
        return Err(Error::os(Errno::EINVAL, "invalid GPIO request flags"));
    }
    Ok(())
}

fn line_flags(flags: GPIOHANDLE_REQUEST_FLAGS) -> GPIOLINE_FLAG {
    use GPIOHANDLE_REQUEST_FLAGS as R;

    [
        (R::OUTPUT, GPIOLINE_FLAG::IS_OUT),
        (R::ACTIVE_LOW, GPIOLINE_FLAG::ACTIVE_LOW),
        (R::OPEN_DRAIN, GPIOLINE_FLAG::OPEN_DRAIN),
        (R::OPEN_SOURCE, GPIOLINE_FLAG::OPEN_SOURCE),
        (R::BIAS_PULL_UP, GPIOLINE_FLAG::BIAS_PULL_UP),
        (R::BIAS_PULL_DOWN, GPIOLINE_FLAG::BIAS_PULL_DOWN),
        (R::BIAS_DISABLE, GPIOLINE_FLAG::BIAS_DISABLE),
    ]
    .into_iter()
    .filter(|(req, _)| flags.contains(*req))
    .fold(GPIOLINE_FLAG::empty(), |acc, (_, info)| acc | info)
}

impl ChipDevice for MockChip {
    fn chip_info(&self) -> Result<ChipInfo> {
        let state = self.lock();
        Ok(ChipInfo::new(
            FixedStr::new(&state.name)?,
            FixedStr::new(&state.label)?,
            state.lines.len() as u32,
        ))
    }

    fn line_info(&self, offset: u32) -> Result<LineInfo> {
        let state = self.lock();
        let line = state
            .lines
            .get(offset as usize)
            .ok_or(Error::os(Errno::EINVAL, "unable to retrieve GPIO line information"))?;
        LineInfo::new(offset, &line.name, &line.consumer, line.flags)
    }

    fn request_values(&self, req: &HandleRequest<'_>) -> Result<Box<dyn LineHandle>> {
        let mut state = self.claim(req.offsets, req.flags, req.consumer)?;
        if req.flags.contains(GPIOHANDLE_REQUEST_FLAGS::OUTPUT) {
            for (idx, &offset) in req.offsets.iter().enumerate() {
                let value = req.default_values.get(idx).copied().unwrap_or(0);
                state.lines[offset as usize].value = u8::from(value != 0);
            }
        }
        state.requests.push(MockRequest {
            offsets: req.offsets.to_vec(),
            flags: req.flags,
            default_values: req.default_values.to_vec(),
            consumer: req.consumer.to_owned(),
            event_flags: None,
        });

        Ok(Box::new(MockHandle {
            chip: self.clone(),
            offsets: req.offsets.to_vec(),
            events: false,
        }))
    }

    fn request_events(&self, req: &EventRequest<'_>) -> Result<Box<dyn LineHandle>> {
        if req.handle_flags.contains(GPIOHANDLE_REQUEST_FLAGS::OUTPUT) {
            return Err(Error::os(Errno::EINVAL, "error requesting GPIO line events"));
        }
        let mut state = self.claim(&[req.offset], req.handle_flags, req.consumer)?;
        state.lines[req.offset as usize].edges = Some(req.event_flags);
        state.requests.push(MockRequest {
            offsets: vec![req.offset],
            flags: req.handle_flags,
            default_values: Vec::new(),
            consumer: req.consumer.to_owned(),
            event_flags: Some(req.event_flags),
        });

        Ok(Box::new(MockHandle {
            chip: self.clone(),
            offsets: vec![req.offset],
            events: true,
        }))
    }

    /// Never sleeps: reports the handles with queued events, or none.
    fn wait_events(&self, handles: &[&dyn LineHandle], _timeout: Duration) -> Result<Vec<usize>> {
        let state = self.lock();
        let mut ready = Vec::new();
        for (idx, handle) in handles.iter().enumerate() {
            for &offset in handle.offsets() {
                let line = &state.lines[offset as usize];
                if line.edges.is_none() {
                    return Err(Error::os(Errno::EPERM, "line not requested for events"));
                }
                if !line.events.is_empty() {
                    ready.push(idx);
                    break;
                }
            }
        }
        Ok(ready)
    }
}

#[derive(Debug)]
struct MockHandle {
    chip: MockChip,
    offsets: Vec<u32>,
    events: bool,
}

impl LineHandle for MockHandle {
    fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    fn get_values(&self, values: &mut [u8]) -> Result<()> {
        let state = self.chip.lock();
        for (dst, &offset) in values.iter_mut().zip(&self.offsets) {
            *dst = state.lines[offset as usize].value;
        }
        Ok(())
    }

    fn set_values(&self, values: &[u8]) -> Result<()> {
        let mut state = self.chip.lock();
        for (&value, &offset) in values.iter().zip(&self.offsets) {
            let line = &mut state.lines[offset as usize];
            if !line.flags.contains(GPIOLINE_FLAG::IS_OUT) {
                return Err(Error::os(Errno::EPERM, "error setting GPIO line values"));
            }
            line.value = u8::from(value != 0);
        }
        Ok(())
    }

    fn set_config(&self, flags: GPIOHANDLE_REQUEST_FLAGS, values: &[u8]) -> Result<()> {
        if self.events {
            return Err(Error::os(Errno::EPERM, "error setting GPIO line config"));
        }
        check_flags(flags)?;

        let mut state = self.chip.lock();
        for (idx, &offset) in self.offsets.iter().enumerate() {
            let line = &mut state.lines[offset as usize];
            line.flags = line_flags(flags) | GPIOLINE_FLAG::KERNEL;
            if flags.contains(GPIOHANDLE_REQUEST_FLAGS::OUTPUT) {
                line.value = u8::from(values.get(idx).is_some_and(|v| *v != 0));
            }
        }
        Ok(())
    }

    /// Returns `EAGAIN` instead of blocking when nothing is queued.
    fn read_events(&self, max: usize) -> Result<Vec<RawEvent>> {
        if !self.events {
            return Err(Error::os(Errno::EPERM, "line not requested for events"));
        }
        let mut state = self.chip.lock();
        let queue = &mut state.lines[self.offsets[0] as usize].events;
        if queue.is_empty() {
            return Err(Error::os(Errno::EAGAIN, "no GPIO events queued"));
        }
        let n = queue.len().min(max.max(1));
        Ok(queue.drain(..n).collect())
    }

    fn event_fd(&self) -> Option<BorrowedFd<'_>> {
        None
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.chip.lock();
        for &offset in &self.offsets {
            let line = &mut state.lines[offset as usize];
            line.requested = false;
            line.consumer.clear();
            line.flags = GPIOLINE_FLAG::empty();
            line.edges = None;
            line.events.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mock: &MockChip, offsets: &[u32], flags: GPIOHANDLE_REQUEST_FLAGS) -> Result<Box<dyn LineHandle>> {
        mock.request_values(&HandleRequest {
            offsets,
            flags,
            default_values: &[1, 0],
            consumer: "test",
        })
    }

    #[test]
    fn lines_can_only_be_held_once() {
        let mock = MockChip::new("gpiochip0", "mock", 4);
        let handle = request(&mock, &[0, 1], GPIOHANDLE_REQUEST_FLAGS::OUTPUT).unwrap();
        assert_eq!(mock.value(0), 1);
        assert!(mock.is_requested(1));

        let err = request(&mock, &[1], GPIOHANDLE_REQUEST_FLAGS::INPUT).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBUSY));

        drop(handle);
        assert!(!mock.is_requested(1));
        assert!(request(&mock, &[1], GPIOHANDLE_REQUEST_FLAGS::INPUT).is_ok());
    }

    #[test]
    fn conflicting_flags_are_rejected() {
        use GPIOHANDLE_REQUEST_FLAGS as R;

        let mock = MockChip::new("gpiochip0", "mock", 4);
        for flags in [
            R::INPUT | R::OUTPUT,
            R::OUTPUT | R::OPEN_DRAIN | R::OPEN_SOURCE,
            R::INPUT | R::OPEN_DRAIN,
            R::INPUT | R::BIAS_PULL_UP | R::BIAS_DISABLE,
        ] {
            let err = request(&mock, &[0, 1], flags).unwrap_err();
            assert_eq!(err.raw_os_error(), Some(libc::EINVAL), "{:?}", flags);
        }
        assert!(mock.requests().is_empty());

        let handle = request(&mock, &[0, 1], R::OUTPUT | R::OPEN_DRAIN).unwrap();
        let err = handle.set_config(R::INPUT | R::OPEN_SOURCE, &[]).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn busy_lines_report_kernel_use() {
        let mock = MockChip::new("gpiochip0", "mock", 4).with_busy_line(2, "spi");
        let info = mock.line_info(2).unwrap();
        assert!(info.is_used());
        assert_eq!(info.consumer(), Some("spi"));

        let err = request(&mock, &[2], GPIOHANDLE_REQUEST_FLAGS::INPUT).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBUSY));
    }

    #[test]
    fn inputs_cannot_be_driven() {
        let mock = MockChip::new("gpiochip0", "mock", 4);
        let handle = request(&mock, &[3], GPIOHANDLE_REQUEST_FLAGS::INPUT).unwrap();
        let err = handle.set_values(&[1]).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EPERM));
    }

    #[test]
    fn events_follow_requested_edges() {
        let mock = MockChip::new("gpiochip0", "mock", 4);
        let handle = mock
            .request_events(&EventRequest {
                offset: 1,
                handle_flags: GPIOHANDLE_REQUEST_FLAGS::INPUT,
                event_flags: GPIOEVENT_REQUEST_FLAGS::RISING_EDGE,
                consumer: "test",
            })
            .unwrap();

        mock.push_event(1, EventType::FallingEdge, Duration::from_secs(1));
        assert!(mock.wait_events(&[&*handle], Duration::ZERO).unwrap().is_empty());

        mock.push_event(1, EventType::RisingEdge, Duration::from_secs(2));
        assert_eq!(mock.wait_events(&[&*handle], Duration::ZERO).unwrap(), vec![0]);

        let events = handle.read_events(16).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::RisingEdge);
        assert_eq!(events[0].timestamp, Duration::from_secs(2));
    }
}
