use pyo3::prelude::*;
use pyo3::types::PyDelta;

use super::line::PyLine;
use super::{duration_from_py, duration_to_py};
use crate::line::{EventType, LineEvent};

#[pyclass(name = "line_event", module = "gpiod._gpiod")]
#[derive(Debug, Clone, Default)]
pub struct PyLineEvent {
    pub(crate) inner: LineEvent,
}

impl From<LineEvent> for PyLineEvent {
    fn from(inner: LineEvent) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyLineEvent {
    #[classattr]
    const RISING_EDGE: i32 = EventType::RisingEdge as i32;
    #[classattr]
    const FALLING_EDGE: i32 = EventType::FallingEdge as i32;

    #[new]
    fn new() -> Self {
        Self::default()
    }

    #[getter]
    fn get_timestamp<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDelta>> {
        duration_to_py(py, self.inner.timestamp)
    }

    #[setter]
    fn set_timestamp(&mut self, timestamp: &Bound<'_, PyAny>) -> PyResult<()> {
        self.inner.timestamp = duration_from_py(timestamp)?;
        Ok(())
    }

    #[getter]
    fn get_event_type(&self) -> i32 {
        self.inner.event_type.into()
    }

    #[setter]
    fn set_event_type(&mut self, event_type: i32) -> PyResult<()> {
        self.inner.event_type = EventType::try_from(event_type)?;
        Ok(())
    }

    #[getter]
    fn get_source(&self) -> PyLine {
        self.inner.source.clone().into()
    }

    #[setter]
    fn set_source(&mut self, source: PyRef<'_, PyLine>) {
        self.inner.source = source.inner.clone();
    }

    fn __repr__(&self) -> String {
        format!(
            "<line_event event_type={} timestamp={:?}>",
            i32::from(self.inner.event_type),
            self.inner.timestamp
        )
    }
}
