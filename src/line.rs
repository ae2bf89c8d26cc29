use std::fmt;
use std::ops::Not;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nix::errno::Errno;

use crate::chip::{Chip, ChipShared};
use crate::device::LineHandle;
use crate::errors::{Error, ErrorKind, Result};
use crate::flags::FlagSet;
use crate::uapi::v1::GPIOHANDLE_REQUEST_FLAGS;

mod bulk;
#[cfg(feature = "line-config")]
mod config;
mod event;
mod info;
mod iter;
mod request;

pub use bulk::{LineBulk, LineBulkIter, MAX_LINES};
#[cfg(feature = "line-config")]
pub use config::{Bias, MAX_EVENTS};
pub use event::{EventType, LineEvent};
pub use info::LineInfo;
pub use iter::LineIter;
pub use request::{LineRequest, RequestType};

int_enum! {
    pub enum Direction as "direction" {
        Input = 1,
        Output = 2,
    }
}

int_enum! {
    pub enum ActiveState as "active state" {
        Low = 1,
        High = 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Values,
    Events,
}

/// A device handle shared by every line requested through it, with the
/// output values last written to it.
#[derive(Debug)]
pub(crate) struct SharedHandle {
    pub(crate) handle: Box<dyn LineHandle>,
    values: Mutex<Vec<u8>>,
}

impl SharedHandle {
    pub(crate) fn new(handle: Box<dyn LineHandle>, values: Vec<u8>) -> Self {
        Self {
            handle,
            values: Mutex::new(values),
        }
    }

    pub(crate) fn values(&self) -> MutexGuard<'_, Vec<u8>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, index: usize) -> Result<i32> {
        let mut values = vec![0; self.handle.offsets().len()];
        self.handle.get_values(&mut values)?;
        Ok(i32::from(values[index]))
    }

    /// Apply `(index, value)` updates and write the whole handle at once.
    /// The stored values only change if the write succeeds.
    pub(crate) fn write(&self, updates: impl IntoIterator<Item = (usize, u8)>) -> Result<()> {
        let mut values = self.values();
        let mut next = values.clone();
        for (index, value) in updates {
            next[index] = value;
        }
        self.handle.set_values(&next)?;
        *values = next;
        Ok(())
    }
}

/// How a requested line is held.
#[derive(Debug, Clone)]
pub(crate) struct Requested {
    pub(crate) handle: Arc<SharedHandle>,
    /// Position of the line within the handle
    pub(crate) index: usize,
    pub(crate) kind: RequestKind,
    pub(crate) flags: FlagSet,
    pub(crate) handle_flags: GPIOHANDLE_REQUEST_FLAGS,
}

#[derive(Debug, Default)]
pub(crate) struct LineSlot {
    pub(crate) info: Option<LineInfo>,
    pub(crate) request: Option<Requested>,
}

#[derive(Clone)]
struct LineRef {
    chip: Arc<ChipShared>,
    offset: u32,
}

/// A single line of a [`Chip`].
///
/// Lines are cheap handles: every `Line` for the same chip and offset sees
/// the same request state, and keeps the chip open. A default constructed
/// `Line` is empty.
#[derive(Clone, Default)]
pub struct Line {
    inner: Option<LineRef>,
}

impl Line {
    pub(crate) fn new(chip: Arc<ChipShared>, offset: u32) -> Self {
        Self {
            inner: Some(LineRef { chip, offset }),
        }
    }

    fn target(&self) -> Result<&LineRef> {
        self.inner.as_ref().ok_or(Error::new(ErrorKind::NoLine))
    }

    pub(crate) fn chip_shared(&self) -> Result<&Arc<ChipShared>> {
        Ok(&self.target()?.chip)
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    pub fn offset(&self) -> Result<u32> {
        Ok(self.target()?.offset)
    }

    /// Last known information about the line.
    pub fn info(&self) -> Result<LineInfo> {
        let target = self.target()?;
        target.chip.line_info(target.offset)
    }

    /// The line name, empty if the line is unnamed
    pub fn name(&self) -> Result<String> {
        Ok(self.info()?.name().unwrap_or_default().to_owned())
    }

    /// The consumer label, empty if the line is unused or unlabelled
    pub fn consumer(&self) -> Result<String> {
        Ok(self.info()?.consumer().unwrap_or_default().to_owned())
    }

    pub fn direction(&self) -> Result<Direction> {
        Ok(self.info()?.direction())
    }

    pub fn active_state(&self) -> Result<ActiveState> {
        Ok(self.info()?.active_state())
    }

    pub fn is_used(&self) -> Result<bool> {
        Ok(self.info()?.is_used())
    }

    pub fn is_open_drain(&self) -> Result<bool> {
        Ok(self.info()?.is_open_drain())
    }

    pub fn is_open_source(&self) -> Result<bool> {
        Ok(self.info()?.is_open_source())
    }

    /// Request this line. `default_val` is the initial output value.
    pub fn request(&self, config: &LineRequest, default_val: i32) -> Result<()> {
        LineBulk::from_line(self.clone())?.request(config, &[default_val])
    }

    pub fn release(&self) -> Result<()> {
        LineBulk::from_line(self.clone())?.release()
    }

    pub fn is_requested(&self) -> Result<bool> {
        let target = self.target()?;
        Ok(target.chip.lock_lines()[target.offset as usize]
            .request
            .is_some())
    }

    pub(crate) fn requested(&self) -> Result<Requested> {
        let target = self.target()?;
        target.chip.lock_lines()[target.offset as usize]
            .request
            .clone()
            .ok_or(Error::os(Errno::EPERM, "line not requested"))
    }

    pub(crate) fn requested_for(&self, kind: RequestKind) -> Result<Requested> {
        let req = self.requested()?;
        if req.kind != kind {
            return Err(match kind {
                RequestKind::Values => Error::os(Errno::EPERM, "line requested for events"),
                RequestKind::Events => Error::os(Errno::EPERM, "line not requested for events"),
            });
        }
        Ok(req)
    }

    pub fn get_value(&self) -> Result<i32> {
        let req = self.requested()?;
        let value = req.handle.read(req.index)?;
        log::trace!("line {} reads {}", self.offset()?, value);
        Ok(value)
    }

    pub fn set_value(&self, value: i32) -> Result<()> {
        let req = self.requested_for(RequestKind::Values)?;
        req.handle.write([(req.index, u8::from(value != 0))])?;
        log::trace!("line {} set to {}", self.offset()?, value);
        Ok(())
    }

    /// Wait up to `timeout` for an edge event. Returns `false` on timeout.
    pub fn event_wait(&self, timeout: Duration) -> Result<bool> {
        let req = self.requested_for(RequestKind::Events)?;
        let chip = self.chip_shared()?;
        let ready = chip.device.wait_events(&[req.handle.handle.as_ref()], timeout)?;
        Ok(!ready.is_empty())
    }

    /// Read one event, blocking until it arrives.
    pub fn event_read(&self) -> Result<LineEvent> {
        self.read_events(1)?
            .pop()
            .ok_or(Error::os(Errno::EIO, "no GPIO event read"))
    }

    pub(crate) fn read_events(&self, max: usize) -> Result<Vec<LineEvent>> {
        let req = self.requested_for(RequestKind::Events)?;
        let events = req.handle.handle.read_events(max)?;
        log::trace!("read {} events from line {}", events.len(), self.offset()?);

        Ok(events
            .into_iter()
            .map(|event| LineEvent {
                timestamp: event.timestamp,
                event_type: event.event_type,
                source: self.clone(),
            })
            .collect())
    }

    /// The file descriptor to poll for events on this line
    pub fn event_get_fd(&self) -> Result<RawFd> {
        let req = self.requested_for(RequestKind::Events)?;
        req.handle
            .handle
            .event_fd()
            .map(|fd| fd.as_raw_fd())
            .ok_or(Error::os(Errno::EOPNOTSUPP, "line handle has no file descriptor"))
    }

    /// The chip this line belongs to, empty for an empty line.
    pub fn get_chip(&self) -> Chip {
        self.inner
            .as_ref()
            .map(|target| Chip::from_shared(target.chip.clone()))
            .unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.inner = None;
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a.chip, &b.chip) && a.offset == b.offset,
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for Line {}

impl Not for &Line {
    type Output = bool;

    fn not(self) -> bool {
        !self.is_valid()
    }
}

impl Not for Line {
    type Output = bool;

    fn not(self) -> bool {
        !self.is_valid()
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(target) => f
                .debug_struct("Line")
                .field("chip", &target.chip.info.name())
                .field("offset", &target.offset)
                .finish(),
            None => f.write_str("Line(<empty>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChip;

    fn chip() -> (MockChip, Chip) {
        let mock = MockChip::new("gpiochip0", "mock", 8)
            .with_line_name(0, "button")
            .with_line_name(1, "led");
        let chip = mock.to_chip().unwrap();
        (mock, chip)
    }

    #[test]
    fn empty_line_reports_no_line() {
        let line = Line::default();
        assert!(!&line);
        assert_eq!(
            line.offset().unwrap_err().to_string(),
            "object not holding a GPIO line handle"
        );
        assert!(!line.get_chip().is_valid());
    }

    #[test]
    fn lines_compare_by_chip_and_offset() {
        let (mock, chip) = chip();
        assert_eq!(chip.get_line(1).unwrap(), chip.get_line(1).unwrap());
        assert_ne!(chip.get_line(1).unwrap(), chip.get_line(2).unwrap());

        let other = mock.to_chip().unwrap();
        assert_ne!(chip.get_line(1).unwrap(), other.get_line(1).unwrap());
        assert_eq!(chip.get_line(1).unwrap().get_chip(), chip);

        let mut line = chip.get_line(1).unwrap();
        line.reset();
        assert_eq!(line, Line::default());
    }

    #[test]
    fn default_value_matches_explicit_zero() {
        let (mock, chip) = chip();
        let config = LineRequest::new("test", RequestType::DirectionOutput);

        let line = chip.get_line(1).unwrap();
        line.request(&config, 0).unwrap();
        line.release().unwrap();
        line.request(&config, Default::default()).unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].default_values, vec![0]);
        assert_eq!(requests[0], requests[1]);
    }

    #[test]
    fn request_updates_line_info() {
        let (mock, chip) = chip();
        let line = chip.get_line(1).unwrap();
        assert_eq!(line.name().unwrap(), "led");
        assert!(!line.is_used().unwrap());

        let config = LineRequest::new("blinky", RequestType::DirectionOutput)
            .with_flags(LineRequest::FLAG_ACTIVE_LOW);
        line.request(&config, 1).unwrap();
        assert!(line.is_requested().unwrap());
        assert!(line.is_used().unwrap());
        assert_eq!(line.consumer().unwrap(), "blinky");
        assert_eq!(line.direction().unwrap(), Direction::Output);
        assert_eq!(line.active_state().unwrap(), ActiveState::Low);
        assert_eq!(mock.value(1), 1);

        // A second handle to the same line shares the request state
        let again = chip.get_line(1).unwrap();
        assert!(again.is_requested().unwrap());
        again.set_value(0).unwrap();
        assert_eq!(line.get_value().unwrap(), 0);

        line.release().unwrap();
        assert!(!again.is_requested().unwrap());
        assert!(!mock.is_requested(1));
        assert!(!line.is_used().unwrap());
    }

    #[test]
    fn values_need_a_request() {
        let (_mock, chip) = chip();
        let line = chip.get_line(2).unwrap();
        assert_eq!(line.get_value().unwrap_err().raw_os_error(), Some(libc::EPERM));
        assert_eq!(line.set_value(1).unwrap_err().raw_os_error(), Some(libc::EPERM));
        assert_eq!(
            line.event_wait(Duration::ZERO).unwrap_err().raw_os_error(),
            Some(libc::EPERM)
        );
    }

    #[test]
    fn busy_lines_cannot_be_requested() {
        let (_mock, chip) = chip();
        let line = chip.get_line(0).unwrap();
        let config = LineRequest::new("first", RequestType::DirectionInput);
        line.request(&config, 0).unwrap();

        let err = chip.get_line(0).unwrap().request(&config, 0).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBUSY));
    }

    #[test]
    fn inputs_follow_the_device() {
        let (mock, chip) = chip();
        let line = chip.get_line(0).unwrap();
        line.request(&LineRequest::new("test", RequestType::DirectionInput), 0)
            .unwrap();

        mock.set_input(0, 1);
        assert_eq!(line.get_value().unwrap(), 1);
        mock.set_input(0, 0);
        assert_eq!(line.get_value().unwrap(), 0);
    }

    #[test]
    fn events_carry_timestamp_type_and_source() {
        let (mock, chip) = chip();
        let line = chip.get_line(0).unwrap();
        line.request(&LineRequest::new("test", RequestType::EventBothEdges), 0)
            .unwrap();
        assert!(!line.event_wait(Duration::from_millis(10)).unwrap());

        mock.push_event(0, EventType::FallingEdge, Duration::from_nanos(1_000));
        mock.push_event(0, EventType::RisingEdge, Duration::from_nanos(2_000));
        assert!(line.event_wait(Duration::from_millis(10)).unwrap());

        let first = line.event_read().unwrap();
        assert_eq!(first.event_type, EventType::FallingEdge);
        assert_eq!(first.timestamp, Duration::from_nanos(1_000));
        assert_eq!(first.source, line);

        let second = line.event_read().unwrap();
        assert_eq!(second.event_type, EventType::RisingEdge);

        // Event lines are read, not driven
        assert_eq!(line.set_value(1).unwrap_err().raw_os_error(), Some(libc::EPERM));
        // The mock has no descriptor to hand out
        assert!(line.event_get_fd().is_err());
    }

    #[test]
    fn closed_enums_round_trip_host_values() {
        assert_eq!(i32::from(Direction::Output), 2);
        assert_eq!(ActiveState::try_from(1).unwrap(), ActiveState::Low);
        assert!(Direction::try_from(3).is_err());
        assert_eq!(EventType::try_from(2).unwrap(), EventType::FallingEdge);
    }
}
