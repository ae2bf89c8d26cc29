use pyo3::prelude::*;

use crate::flags::FlagSet;
use crate::line::{LineRequest, RequestType};

#[pyclass(name = "line_request", module = "gpiod._gpiod")]
#[derive(Debug, Clone, Default)]
pub struct PyLineRequest {
    pub(crate) inner: LineRequest,
}

impl From<LineRequest> for PyLineRequest {
    fn from(inner: LineRequest) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyLineRequest {
    #[classattr]
    const DIRECTION_AS_IS: i32 = RequestType::DirectionAsIs as i32;
    #[classattr]
    const DIRECTION_INPUT: i32 = RequestType::DirectionInput as i32;
    #[classattr]
    const DIRECTION_OUTPUT: i32 = RequestType::DirectionOutput as i32;
    #[classattr]
    const EVENT_FALLING_EDGE: i32 = RequestType::EventFallingEdge as i32;
    #[classattr]
    const EVENT_RISING_EDGE: i32 = RequestType::EventRisingEdge as i32;
    #[classattr]
    const EVENT_BOTH_EDGES: i32 = RequestType::EventBothEdges as i32;

    #[classattr]
    const FLAG_ACTIVE_LOW: FlagSet = LineRequest::FLAG_ACTIVE_LOW;
    #[classattr]
    const FLAG_OPEN_SOURCE: FlagSet = LineRequest::FLAG_OPEN_SOURCE;
    #[classattr]
    const FLAG_OPEN_DRAIN: FlagSet = LineRequest::FLAG_OPEN_DRAIN;

    #[new]
    fn new() -> Self {
        Self::default()
    }

    #[getter]
    fn get_consumer(&self) -> String {
        self.inner.consumer.clone()
    }

    #[setter]
    fn set_consumer(&mut self, consumer: String) {
        self.inner.consumer = consumer;
    }

    #[getter]
    fn get_request_type(&self) -> i32 {
        self.inner.request_type.into()
    }

    #[setter]
    fn set_request_type(&mut self, request_type: i32) -> PyResult<()> {
        self.inner.request_type = RequestType::try_from(request_type)?;
        Ok(())
    }

    #[getter]
    fn get_flags(&self) -> FlagSet {
        self.inner.flags
    }

    #[setter]
    fn set_flags(&mut self, flags: FlagSet) {
        self.inner.flags = flags;
    }

    fn __repr__(&self) -> String {
        format!(
            "<line_request consumer={:?} request_type={} flags={}>",
            self.inner.consumer,
            i32::from(self.inner.request_type),
            self.inner.flags.bits()
        )
    }
}
