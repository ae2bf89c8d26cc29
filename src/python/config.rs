//! Bias and reconfiguration methods, added to the classes when the
//! `line-config` feature is on.

use pyo3::prelude::*;

use super::bulk::PyLineBulk;
use super::event::PyLineEvent;
use super::line::PyLine;
use super::request::PyLineRequest;
use crate::flags::FlagSet;
use crate::line::{Bias, LineRequest, RequestType};

#[pymethods]
impl PyLine {
    #[classattr]
    const BIAS_AS_IS: i32 = Bias::AsIs as i32;
    #[classattr]
    const BIAS_DISABLE: i32 = Bias::Disable as i32;
    #[classattr]
    const BIAS_PULL_UP: i32 = Bias::PullUp as i32;
    #[classattr]
    const BIAS_PULL_DOWN: i32 = Bias::PullDown as i32;

    fn bias(&self) -> PyResult<i32> {
        Ok(self.inner.bias()?.into())
    }

    #[pyo3(signature = (direction, flags, value = 0))]
    fn set_config(&self, direction: i32, flags: FlagSet, value: i32) -> PyResult<()> {
        let direction = RequestType::try_from(direction)?;
        Ok(self.inner.set_config(direction, flags, value)?)
    }

    fn set_flags(&self, flags: FlagSet) -> PyResult<()> {
        Ok(self.inner.set_flags(flags)?)
    }

    fn set_direction_input(&self) -> PyResult<()> {
        Ok(self.inner.set_direction_input()?)
    }

    #[pyo3(signature = (value = 0))]
    fn set_direction_output(&self, value: i32) -> PyResult<()> {
        Ok(self.inner.set_direction_output(value)?)
    }

    fn event_read_multiple(&self, py: Python<'_>) -> PyResult<Vec<PyLineEvent>> {
        let line = self.inner.clone();
        let events = py.allow_threads(move || line.event_read_multiple())?;
        Ok(events.into_iter().map(PyLineEvent::from).collect())
    }

    fn update(&self) -> PyResult<()> {
        Ok(self.inner.update()?)
    }
}

#[pymethods]
impl PyLineBulk {
    #[pyo3(signature = (direction, flags, values = Vec::new()))]
    fn set_config(&self, direction: i32, flags: FlagSet, values: Vec<i32>) -> PyResult<()> {
        let direction = RequestType::try_from(direction)?;
        Ok(self.inner.set_config(direction, flags, &values)?)
    }

    fn set_flags(&self, flags: FlagSet) -> PyResult<()> {
        Ok(self.inner.set_flags(flags)?)
    }

    fn set_direction_input(&self) -> PyResult<()> {
        Ok(self.inner.set_direction_input()?)
    }

    #[pyo3(signature = (values = Vec::new()))]
    fn set_direction_output(&self, values: Vec<i32>) -> PyResult<()> {
        Ok(self.inner.set_direction_output(&values)?)
    }
}

#[pymethods]
impl PyLineRequest {
    #[classattr]
    const FLAG_BIAS_DISABLE: FlagSet = LineRequest::FLAG_BIAS_DISABLE;
    #[classattr]
    const FLAG_BIAS_PULL_DOWN: FlagSet = LineRequest::FLAG_BIAS_PULL_DOWN;
    #[classattr]
    const FLAG_BIAS_PULL_UP: FlagSet = LineRequest::FLAG_BIAS_PULL_UP;
}
