//! The `gpiod._gpiod` Python extension module.
//!
//! Classes and methods keep the libgpiodcxx names (`chip`, `line`,
//! `line_bulk`, ...) and forward to the Rust types of this crate.

use std::time::Duration;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDelta, PyDeltaAccess};

mod bulk;
mod chip;
#[cfg(feature = "line-config")]
mod config;
mod errors;
mod event;
mod flags;
mod line;
mod request;

pub use bulk::{PyLineBulk, PyLineBulkIter};
pub use chip::{PyChip, PyChipIter};
pub use event::PyLineEvent;
pub use line::{PyLine, PyLineIter};
pub use request::PyLineRequest;

/// Accept a `datetime.timedelta` or a number of seconds.
pub(crate) fn duration_from_py(ob: &Bound<'_, PyAny>) -> PyResult<Duration> {
    let negative = || PyValueError::new_err("duration must be a non-negative number of seconds");
    if let Ok(delta) = ob.downcast::<PyDelta>() {
        let days = u64::try_from(delta.get_days()).map_err(|_| negative())?;
        return Ok(Duration::new(
            days * 86_400 + delta.get_seconds() as u64,
            delta.get_microseconds() as u32 * 1_000,
        ));
    }
    Duration::try_from_secs_f64(ob.extract()?).map_err(|_| negative())
}

pub(crate) fn duration_to_py(py: Python<'_>, duration: Duration) -> PyResult<Bound<'_, PyDelta>> {
    let secs = duration.as_secs();
    let days = i32::try_from(secs / 86_400)
        .map_err(|_| PyValueError::new_err("duration too large for timedelta"))?;
    PyDelta::new_bound(
        py,
        days,
        (secs % 86_400) as i32,
        duration.subsec_micros() as i32,
        false,
    )
}

#[pyfunction]
fn find_line(py: Python<'_>, name: String) -> PyResult<PyLine> {
    let line = py.allow_threads(|| crate::find_line(&name))?;
    Ok(line.into())
}

#[pyfunction]
fn make_chip_iter() -> PyResult<PyChipIter> {
    PyChipIter::new()
}

/// Add every class, function and constant of the module to `m`.
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyChip>()?;
    m.add_class::<PyLine>()?;
    m.add_class::<PyLineBulk>()?;
    m.add_class::<PyLineRequest>()?;
    m.add_class::<PyLineEvent>()?;
    m.add_class::<PyChipIter>()?;
    m.add_class::<PyLineIter>()?;
    m.add_class::<PyLineBulkIter>()?;

    m.add_function(wrap_pyfunction!(find_line, m)?)?;
    m.add_function(wrap_pyfunction!(make_chip_iter, m)?)?;

    m.add("HAS_LINE_CONFIG", crate::LINE_CONFIG)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

#[pymodule]
fn _gpiod(m: &Bound<'_, PyModule>) -> PyResult<()> {
    register(m)
}
