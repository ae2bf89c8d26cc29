use std::ops::Not;
use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use nix::errno::Errno;

use super::{Line, LineRequest, RequestKind, Requested, SharedHandle};
use crate::chip::ChipShared;
use crate::device::{EventRequest, HandleRequest, LineHandle};
use crate::errors::{Error, ErrorKind, Result};
use crate::uapi::v1::GPIOHANDLES_MAX;

/// Most lines a bulk can hold, the kernel's per-request limit
pub const MAX_LINES: usize = GPIOHANDLES_MAX;

type Storage = heapless::Vec<Line, MAX_LINES>;

/// An ordered group of lines from one chip, operated on together.
///
/// The storage is shared copy-on-write, so iterators created with
/// [`LineBulk::iter`] are unaffected by later changes to the bulk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineBulk {
    lines: Arc<Storage>,
}

impl LineBulk {
    pub const MAX_LINES: usize = MAX_LINES;

    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bulk, appending each line in turn.
    pub fn from_lines(lines: impl IntoIterator<Item = Line>) -> Result<Self> {
        let mut bulk = Self::new();
        for line in lines {
            bulk.append(line)?;
        }
        Ok(bulk)
    }

    pub(crate) fn from_line(line: Line) -> Result<Self> {
        Self::from_lines([line])
    }

    pub fn append(&mut self, line: Line) -> Result<()> {
        if !line.is_valid() {
            return Err(Error::invalid("line_bulk cannot hold empty line objects"));
        }
        if self.lines.len() >= MAX_LINES {
            return Err(Error::new(ErrorKind::BulkFull {
                capacity: MAX_LINES,
            }));
        }
        if let Some(first) = self.lines.first() {
            if first.get_chip() != line.get_chip() {
                return Err(Error::invalid(
                    "line_bulk cannot hold GPIO lines from different chips",
                ));
            }
        }

        Arc::make_mut(&mut self.lines)
            .push(line)
            .map_err(|_| Error::new(ErrorKind::BulkFull { capacity: MAX_LINES }))
    }

    pub fn get(&self, index: usize) -> Result<Line> {
        self.lines.get(index).cloned().ok_or(Error::new(ErrorKind::Index {
            index,
            len: self.lines.len(),
        }))
    }

    pub fn size(&self) -> usize {
        self.lines.len()
    }

    pub fn empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines = Arc::default();
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn iter(&self) -> LineBulkIter {
        LineBulkIter {
            lines: self.lines.clone(),
            pos: 0,
        }
    }

    /// The lines, failing if there are none, and their chip.
    pub(crate) fn checked(&self) -> Result<(&[Line], &Arc<ChipShared>)> {
        let first = self
            .lines
            .first()
            .ok_or(Error::new(ErrorKind::EmptyBulk))?;
        Ok((self.lines.as_slice(), first.chip_shared()?))
    }

    pub(crate) fn offsets(&self) -> Result<Vec<u32>> {
        self.lines.iter().map(Line::offset).collect()
    }

    /// Request every line of the bulk.
    ///
    /// `default_vals` holds one output value per line; an empty slice means
    /// all zeros. Direction requests share one device handle, event requests
    /// get one handle per line. On failure no line stays requested.
    pub fn request(&self, config: &LineRequest, default_vals: &[i32]) -> Result<()> {
        let (lines, chip) = self.checked()?;
        if !default_vals.is_empty() && default_vals.len() != lines.len() {
            return Err(Error::invalid(
                "the number of default values must correspond with the number of lines",
            ));
        }
        let handle_flags = config.handle_flags()?;
        let offsets = self.offsets()?;
        let values: Vec<u8> = if default_vals.is_empty() {
            vec![0; offsets.len()]
        } else {
            default_vals.iter().map(|&v| u8::from(v != 0)).collect()
        };
        let consumer = config.consumer.as_str();

        let mut slots = chip.lock_lines();
        if offsets
            .iter()
            .any(|&offset| slots[offset as usize].request.is_some())
        {
            return Err(Error::os(Errno::EBUSY, "line already requested"));
        }

        let requested = |handle, index, kind| Requested {
            handle,
            index,
            kind,
            flags: config.flags,
            handle_flags,
        };

        match config.request_type.event_flags() {
            None => {
                let handle = chip.device.request_values(&HandleRequest {
                    offsets: &offsets,
                    flags: handle_flags,
                    default_values: &values,
                    consumer,
                })?;
                let shared = Arc::new(SharedHandle::new(handle, values));
                for (index, &offset) in offsets.iter().enumerate() {
                    slots[offset as usize].request =
                        Some(requested(shared.clone(), index, RequestKind::Values));
                }
            }
            Some(event_flags) => {
                // Handles already obtained are dropped, and so released, if
                // a later line fails.
                let handles = offsets
                    .iter()
                    .map(|&offset| {
                        chip.device.request_events(&EventRequest {
                            offset,
                            handle_flags,
                            event_flags,
                            consumer,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                for (handle, &offset) in handles.into_iter().zip(&offsets) {
                    let shared = Arc::new(SharedHandle::new(handle, vec![0]));
                    slots[offset as usize].request =
                        Some(requested(shared, 0, RequestKind::Events));
                }
            }
        }
        drop(slots);

        log::debug!(
            "requested lines {:?} of {} as {:?} for {:?}",
            offsets,
            chip.info.name(),
            config.request_type,
            consumer
        );
        refresh(chip, &offsets);
        Ok(())
    }

    /// Release every line of the bulk. Lines that are not requested are
    /// left alone.
    pub fn release(&self) -> Result<()> {
        let (_, chip) = self.checked()?;
        let offsets = self.offsets()?;

        let released = {
            let mut slots = chip.lock_lines();
            offsets
                .iter()
                .filter_map(|&offset| slots[offset as usize].request.take())
                .collect::<Vec<_>>()
        };
        // Device handles close once no line refers to them.
        drop(released);

        log::debug!("released lines {:?} of {}", offsets, chip.info.name());
        refresh(chip, &offsets);
        Ok(())
    }

    pub fn get_values(&self) -> Result<Vec<i32>> {
        let (lines, _) = self.checked()?;
        lines.iter().map(Line::get_value).collect()
    }

    /// Set one value per line. Lines sharing a device handle are written
    /// together.
    pub fn set_values(&self, values: &[i32]) -> Result<()> {
        let (lines, _) = self.checked()?;
        if values.len() != lines.len() {
            return Err(Error::invalid(
                "the size of values array must correspond with the number of lines",
            ));
        }

        let targets = lines
            .iter()
            .map(|line| line.requested_for(RequestKind::Values))
            .collect::<Result<Vec<_>>>()?;

        for target in targets.iter().unique_by(|req| Arc::as_ptr(&req.handle)) {
            let updates = targets
                .iter()
                .zip(values)
                .filter(|(req, _)| Arc::ptr_eq(&req.handle, &target.handle))
                .map(|(req, &value)| (req.index, u8::from(value != 0)));
            target.handle.write(updates)?;
        }

        log::trace!("set lines {:?} to {:?}", self.offsets()?, values);
        Ok(())
    }

    /// Wait up to `timeout` for events on any line of the bulk. Returns the
    /// lines with pending events, an empty bulk on timeout.
    pub fn event_wait(&self, timeout: Duration) -> Result<LineBulk> {
        let (lines, chip) = self.checked()?;
        let targets = lines
            .iter()
            .map(|line| line.requested_for(RequestKind::Events))
            .collect::<Result<Vec<_>>>()?;
        let handles: Vec<&dyn LineHandle> =
            targets.iter().map(|req| req.handle.handle.as_ref()).collect();

        let ready = chip.device.wait_events(&handles, timeout)?;
        Self::from_lines(ready.into_iter().filter_map(|idx| lines.get(idx).cloned()))
    }
}

/// Re-read line information after the request state changed.
pub(crate) fn refresh(chip: &ChipShared, offsets: &[u32]) {
    for &offset in offsets {
        if let Err(err) = chip.update_line(offset) {
            log::debug!("unable to refresh info of line {}: {}", offset, err);
        }
    }
}

impl Not for &LineBulk {
    type Output = bool;

    /// `true` for a bulk without lines
    fn not(self) -> bool {
        self.empty()
    }
}

impl<'a> IntoIterator for &'a LineBulk {
    type Item = Line;
    type IntoIter = LineBulkIter;

    fn into_iter(self) -> LineBulkIter {
        self.iter()
    }
}

/// Iterator over the lines of a [`LineBulk`] as they were when it was
/// created. It holds its own reference to the lines, so the bulk may be
/// changed or dropped while iterating.
#[derive(Debug, Clone)]
pub struct LineBulkIter {
    lines: Arc<Storage>,
    pos: usize,
}

impl Iterator for LineBulkIter {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        let line = self.lines.get(self.pos)?.clone();
        self.pos += 1;
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.lines.len() - self.pos;
        (left, Some(left))
    }
}

impl ExactSizeIterator for LineBulkIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{EventType, RequestType};
    use crate::mock::MockChip;
    use crate::uapi::v1::GPIOHANDLE_REQUEST_FLAGS;
    use crate::Chip;

    fn setup() -> (MockChip, Chip) {
        let mock = MockChip::new("gpiochip0", "mock", 70);
        let chip = mock.to_chip().unwrap();
        (mock, chip)
    }

    #[test]
    fn append_rules() {
        let (mock, chip) = setup();
        let mut bulk = LineBulk::new();

        let err = bulk.append(Line::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));

        bulk.append(chip.get_line(0).unwrap()).unwrap();
        let other = mock.to_chip().unwrap();
        let err = bulk.append(other.get_line(1).unwrap()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));

        for offset in 1..64 {
            bulk.append(chip.get_line(offset).unwrap()).unwrap();
        }
        assert_eq!(bulk.size(), LineBulk::MAX_LINES);
        let err = bulk.append(chip.get_line(64).unwrap()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::BulkFull { capacity: 64 }));
    }

    #[test]
    fn get_is_range_checked() {
        let (_mock, chip) = setup();
        let bulk = chip.get_lines(&[4, 2]).unwrap();
        assert_eq!(bulk.get(1).unwrap().offset().unwrap(), 2);
        assert!(matches!(
            bulk.get(2).unwrap_err().kind(),
            ErrorKind::Index { index: 2, len: 2 }
        ));
    }

    #[test]
    fn empty_bulk_operations_fail() {
        let bulk = LineBulk::new();
        assert!(!&bulk);
        let err = bulk.release().unwrap_err();
        assert_eq!(err.to_string(), "line_bulk not holding any GPIO lines");
        assert!(matches!(
            bulk.get_values().unwrap_err().kind(),
            ErrorKind::EmptyBulk
        ));
    }

    #[test]
    fn empty_defaults_equal_explicit_zeros() {
        let (mock, chip) = setup();
        let bulk = chip.get_lines(&[1, 2, 3]).unwrap();
        let config = LineRequest::new("test", RequestType::DirectionOutput);

        bulk.request(&config, &[]).unwrap();
        bulk.release().unwrap();
        bulk.request(&config, &[0, 0, 0]).unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].default_values, vec![0, 0, 0]);
        assert_eq!(requests[0], requests[1]);
    }

    #[test]
    fn default_count_must_match() {
        let (mock, chip) = setup();
        let bulk = chip.get_lines(&[1, 2]).unwrap();
        let config = LineRequest::new("test", RequestType::DirectionOutput);
        let err = bulk.request(&config, &[1]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn outputs_share_one_handle() {
        let (mock, chip) = setup();
        let bulk = chip.get_lines(&[5, 6, 7]).unwrap();
        bulk.request(
            &LineRequest::new("test", RequestType::DirectionOutput),
            &[1, 0, 1],
        )
        .unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].offsets, vec![5, 6, 7]);
        assert_eq!(requests[0].flags, GPIOHANDLE_REQUEST_FLAGS::OUTPUT);
        assert_eq!(requests[0].consumer, "test");

        bulk.set_values(&[0, 1, 1]).unwrap();
        assert_eq!(bulk.get_values().unwrap(), vec![0, 1, 1]);

        // Writing one line keeps the others' values
        chip.get_line(5).unwrap().set_value(1).unwrap();
        assert_eq!(
            (mock.value(5), mock.value(6), mock.value(7)),
            (1, 1, 1)
        );

        let err = bulk.set_values(&[1]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));
    }

    #[test]
    fn partial_release_keeps_handle_open() {
        let (mock, chip) = setup();
        let bulk = chip.get_lines(&[1, 2]).unwrap();
        bulk.request(&LineRequest::new("test", RequestType::DirectionOutput), &[])
            .unwrap();

        chip.get_line(1).unwrap().release().unwrap();
        assert!(mock.is_requested(2));
        chip.get_line(2).unwrap().set_value(1).unwrap();

        chip.get_line(2).unwrap().release().unwrap();
        assert!(!mock.is_requested(1));
        assert!(!mock.is_requested(2));
    }

    #[test]
    fn failed_event_request_releases_everything() {
        let mock = MockChip::new("gpiochip0", "mock", 4).with_busy_line(2, "kernel");
        let chip = mock.to_chip().unwrap();
        let bulk = chip.get_lines(&[0, 1, 2]).unwrap();

        let err = bulk
            .request(&LineRequest::new("test", RequestType::EventRisingEdge), &[])
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBUSY));
        for offset in 0..2 {
            assert!(!mock.is_requested(offset));
            assert!(!chip.get_line(offset).unwrap().is_requested().unwrap());
        }
    }

    #[test]
    fn event_wait_reports_ready_lines() {
        let (mock, chip) = setup();
        let bulk = chip.get_lines(&[1, 2, 3]).unwrap();
        bulk.request(&LineRequest::new("test", RequestType::EventBothEdges), &[])
            .unwrap();
        assert_eq!(mock.requests().len(), 3);

        assert!(bulk.event_wait(Duration::from_millis(1)).unwrap().empty());

        mock.push_event(3, EventType::RisingEdge, Duration::from_secs(1));
        mock.push_event(1, EventType::FallingEdge, Duration::from_secs(2));
        let ready = bulk.event_wait(Duration::from_millis(1)).unwrap();
        let offsets = ready.iter().map(|l| l.offset().unwrap()).collect::<Vec<_>>();
        assert_eq!(offsets, vec![1, 3]);
    }

    #[test]
    fn iterator_outlives_bulk() {
        let (_mock, chip) = setup();
        let mut bulk = chip.get_lines(&[3, 1, 2]).unwrap();
        let mut iter = bulk.iter();

        assert_eq!(iter.next().unwrap().offset().unwrap(), 3);
        bulk.append(chip.get_line(9).unwrap()).unwrap();
        bulk.clear();
        drop(bulk);

        let rest = iter.map(|l| l.offset().unwrap()).collect::<Vec<_>>();
        assert_eq!(rest, vec![1, 2]);
    }
}
