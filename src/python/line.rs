use pyo3::prelude::*;

use super::chip::PyChip;
use super::event::PyLineEvent;
use super::request::PyLineRequest;
use super::duration_from_py;
use crate::line::{ActiveState, Direction, Line, LineIter};

#[pyclass(name = "line", module = "gpiod._gpiod")]
#[derive(Debug, Clone, Default)]
pub struct PyLine {
    pub(crate) inner: Line,
}

impl From<Line> for PyLine {
    fn from(inner: Line) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyLine {
    #[classattr]
    const DIRECTION_INPUT: i32 = Direction::Input as i32;
    #[classattr]
    const DIRECTION_OUTPUT: i32 = Direction::Output as i32;
    #[classattr]
    const ACTIVE_LOW: i32 = ActiveState::Low as i32;
    #[classattr]
    const ACTIVE_HIGH: i32 = ActiveState::High as i32;

    #[new]
    fn new() -> Self {
        Self::default()
    }

    fn offset(&self) -> PyResult<u32> {
        Ok(self.inner.offset()?)
    }

    fn name(&self) -> PyResult<String> {
        Ok(self.inner.name()?)
    }

    fn consumer(&self) -> PyResult<String> {
        Ok(self.inner.consumer()?)
    }

    fn direction(&self) -> PyResult<i32> {
        Ok(self.inner.direction()?.into())
    }

    fn active_state(&self) -> PyResult<i32> {
        Ok(self.inner.active_state()?.into())
    }

    fn is_used(&self) -> PyResult<bool> {
        Ok(self.inner.is_used()?)
    }

    fn is_open_drain(&self) -> PyResult<bool> {
        Ok(self.inner.is_open_drain()?)
    }

    fn is_open_source(&self) -> PyResult<bool> {
        Ok(self.inner.is_open_source()?)
    }

    #[pyo3(signature = (config, default_val = 0))]
    fn request(&self, config: PyRef<'_, PyLineRequest>, default_val: i32) -> PyResult<()> {
        Ok(self.inner.request(&config.inner, default_val)?)
    }

    fn release(&self) -> PyResult<()> {
        Ok(self.inner.release()?)
    }

    fn is_requested(&self) -> PyResult<bool> {
        Ok(self.inner.is_requested()?)
    }

    fn get_value(&self) -> PyResult<i32> {
        Ok(self.inner.get_value()?)
    }

    fn set_value(&self, value: i32) -> PyResult<()> {
        Ok(self.inner.set_value(value)?)
    }

    /// Wait for an event; `timeout` is a `timedelta` or seconds.
    fn event_wait(&self, py: Python<'_>, timeout: &Bound<'_, PyAny>) -> PyResult<bool> {
        let timeout = duration_from_py(timeout)?;
        let line = self.inner.clone();
        Ok(py.allow_threads(move || line.event_wait(timeout))?)
    }

    fn event_read(&self, py: Python<'_>) -> PyResult<PyLineEvent> {
        let line = self.inner.clone();
        Ok(py.allow_threads(move || line.event_read())?.into())
    }

    fn event_get_fd(&self) -> PyResult<i32> {
        Ok(self.inner.event_get_fd()?)
    }

    fn get_chip(&self) -> PyChip {
        self.inner.get_chip().into()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn __eq__(&self, other: PyRef<'_, Self>) -> bool {
        self.inner == other.inner
    }

    fn __ne__(&self, other: PyRef<'_, Self>) -> bool {
        self.inner != other.inner
    }

    fn __bool__(&self) -> bool {
        self.inner.is_valid()
    }

    fn __repr__(&self) -> String {
        match (self.inner.offset(), self.inner.name()) {
            (Ok(offset), Ok(name)) => format!("<line offset={} name={:?}>", offset, name),
            (Ok(offset), Err(_)) => format!("<line offset={}>", offset),
            _ => "<line (empty)>".to_owned(),
        }
    }
}

/// Python iterator over every line of a chip.
#[pyclass(name = "line_iter", module = "gpiod._gpiod")]
#[derive(Debug)]
pub struct PyLineIter {
    iter: LineIter,
}

#[pymethods]
impl PyLineIter {
    #[new]
    fn new(chip: PyRef<'_, PyChip>) -> PyResult<Self> {
        Ok(Self {
            iter: LineIter::new(&chip.inner)?,
        })
    }

    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(&mut self) -> PyResult<Option<PyLine>> {
        Ok(self.iter.next().transpose()?.map(PyLine::from))
    }
}
