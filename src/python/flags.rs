use pyo3::prelude::*;
use pyo3::types::PyLong;

use crate::flags::{FlagSet, FlagSetError};

/// Anything `int()` accepts, as long as the result fits in 32 bits.
impl<'py> FromPyObject<'py> for FlagSet {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        let py = ob.py();
        let int = py
            .get_type_bound::<PyLong>()
            .call1((ob.clone(),))
            .map_err(|_| {
                let repr = ob.repr().map(|r| r.to_string()).unwrap_or_default();
                PyErr::from(FlagSetError::NotAnInteger(repr))
            })?;
        let value: i128 = int.extract()?;
        Ok(FlagSet::try_from(value)?)
    }
}

impl IntoPy<PyObject> for FlagSet {
    fn into_py(self, py: Python<'_>) -> PyObject {
        self.bits().into_py(py)
    }
}

impl ToPyObject for FlagSet {
    fn to_object(&self, py: Python<'_>) -> PyObject {
        self.bits().to_object(py)
    }
}
