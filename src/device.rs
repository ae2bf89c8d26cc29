//! The boundary between the chip/line object model and whatever actually
//! drives the GPIO lines.
//!
//! [`cdev::CdevChip`] talks to the Linux character device; the `mock` module
//! (feature `mock`) provides an in-memory stand-in for tests. Anything
//! implementing [`ChipDevice`] can be wrapped with [`Chip::from_device`].
//!
//! [`Chip::from_device`]: crate::Chip::from_device

use std::fmt;
use std::os::fd::BorrowedFd;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout};

use crate::chip::ChipInfo;
use crate::errors::{Error, Result};
use crate::line::{EventType, LineInfo};
use crate::uapi::v1::{GPIOEVENT_REQUEST_FLAGS, GPIOHANDLE_REQUEST_FLAGS};

pub mod cdev;

/// Request for a handle driving or reading the values of one or more lines.
#[derive(Debug, Clone, Copy)]
pub struct HandleRequest<'a> {
    pub offsets: &'a [u32],
    pub flags: GPIOHANDLE_REQUEST_FLAGS,
    /// One entry per offset, only meaningful for output requests
    pub default_values: &'a [u8],
    pub consumer: &'a str,
}

/// Request for edge events on a single line.
#[derive(Debug, Clone, Copy)]
pub struct EventRequest<'a> {
    pub offset: u32,
    pub handle_flags: GPIOHANDLE_REQUEST_FLAGS,
    pub event_flags: GPIOEVENT_REQUEST_FLAGS,
    pub consumer: &'a str,
}

/// An edge event as reported by a device, before it is tied to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub timestamp: Duration,
    pub event_type: EventType,
}

/// An open GPIO chip.
pub trait ChipDevice: Send + Sync + fmt::Debug {
    fn chip_info(&self) -> Result<ChipInfo>;

    /// Current information for the line at `offset`.
    fn line_info(&self, offset: u32) -> Result<LineInfo>;

    /// Request the given lines as one handle. The returned handle reports
    /// values in the order of `req.offsets`.
    fn request_values(&self, req: &HandleRequest<'_>) -> Result<Box<dyn LineHandle>>;

    /// Request edge events on one line.
    fn request_events(&self, req: &EventRequest<'_>) -> Result<Box<dyn LineHandle>>;

    /// Wait until at least one of `handles` has an event queued or `timeout`
    /// expires. Returns the indices of the ready handles, empty on timeout.
    fn wait_events(&self, handles: &[&dyn LineHandle], timeout: Duration) -> Result<Vec<usize>> {
        poll_handles(handles, timeout)
    }
}

/// Lines held by a request. Dropping the handle releases them.
pub trait LineHandle: Send + Sync + fmt::Debug {
    /// Offsets covered by this handle, in value order
    fn offsets(&self) -> &[u32];

    fn get_values(&self, values: &mut [u8]) -> Result<()>;

    fn set_values(&self, values: &[u8]) -> Result<()>;

    /// Change the flags of all lines in the handle. `values` are the output
    /// values used when `flags` contains `OUTPUT`.
    fn set_config(&self, flags: GPIOHANDLE_REQUEST_FLAGS, values: &[u8]) -> Result<()>;

    /// Read between one and `max` queued events, blocking until one arrives.
    fn read_events(&self, max: usize) -> Result<Vec<RawEvent>>;

    /// File descriptor that becomes readable when events are queued
    fn event_fd(&self) -> Option<BorrowedFd<'_>>;
}

/// Poll the event descriptors of `handles`.
pub fn poll_handles(handles: &[&dyn LineHandle], timeout: Duration) -> Result<Vec<usize>> {
    let ready = PollFlags::POLLIN | PollFlags::POLLPRI;

    let mut fds = handles
        .iter()
        .map(|h| {
            h.event_fd()
                .map(|fd| PollFd::new(fd, ready))
                .ok_or(Error::os(Errno::EPERM, "line not requested for events"))
        })
        .collect::<Result<Vec<_>>>()?;

    // Round up so sub-millisecond timeouts still wait.
    let millis = i32::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(i32::MAX);
    let timeout = PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX);

    let n = loop {
        match nix::poll::poll(&mut fds, timeout) {
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(Error::os(errno, "error polling for events")),
            Ok(n) => break n,
        }
    };

    if n == 0 {
        return Ok(Vec::new());
    }

    Ok(fds
        .iter()
        .enumerate()
        .filter(|(_, fd)| fd.revents().is_some_and(|r| r.intersects(ready)))
        .map(|(idx, _)| idx)
        .collect())
}
