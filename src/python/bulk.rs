use pyo3::prelude::*;

use super::duration_from_py;
use super::line::PyLine;
use super::request::PyLineRequest;
use crate::line::{LineBulk, LineBulkIter};

#[pyclass(name = "line_bulk", module = "gpiod._gpiod")]
#[derive(Debug, Clone, Default)]
pub struct PyLineBulk {
    pub(crate) inner: LineBulk,
}

impl From<LineBulk> for PyLineBulk {
    fn from(inner: LineBulk) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyLineBulk {
    #[classattr]
    const MAX_LINES: usize = LineBulk::MAX_LINES;

    #[new]
    #[pyo3(signature = (lines = Vec::new()))]
    fn new(lines: Vec<PyRef<'_, PyLine>>) -> PyResult<Self> {
        let inner = LineBulk::from_lines(lines.iter().map(|line| line.inner.clone()))?;
        Ok(Self { inner })
    }

    fn append(&mut self, new_line: PyRef<'_, PyLine>) -> PyResult<()> {
        Ok(self.inner.append(new_line.inner.clone())?)
    }

    fn get(&self, offset: usize) -> PyResult<PyLine> {
        Ok(self.inner.get(offset)?.into())
    }

    fn __getitem__(&self, index: usize) -> PyResult<PyLine> {
        self.get(index)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn __len__(&self) -> usize {
        self.inner.size()
    }

    fn empty(&self) -> bool {
        self.inner.empty()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    /// An empty `default_vals` requests every line with value 0.
    #[pyo3(signature = (config, default_vals = Vec::new()))]
    fn request(&self, config: PyRef<'_, PyLineRequest>, default_vals: Vec<i32>) -> PyResult<()> {
        Ok(self.inner.request(&config.inner, &default_vals)?)
    }

    fn release(&self) -> PyResult<()> {
        Ok(self.inner.release()?)
    }

    fn get_values(&self) -> PyResult<Vec<i32>> {
        Ok(self.inner.get_values()?)
    }

    fn set_values(&self, values: Vec<i32>) -> PyResult<()> {
        Ok(self.inner.set_values(&values)?)
    }

    /// Lines with pending events, as a new bulk. Empty on timeout.
    fn event_wait(&self, py: Python<'_>, timeout: &Bound<'_, PyAny>) -> PyResult<Self> {
        let timeout = duration_from_py(timeout)?;
        let bulk = self.inner.clone();
        Ok(py.allow_threads(move || bulk.event_wait(timeout))?.into())
    }

    fn __bool__(&self) -> bool {
        !self.inner.empty()
    }

    fn __iter__(&self) -> PyLineBulkIter {
        PyLineBulkIter {
            iter: self.inner.iter(),
        }
    }

    fn __repr__(&self) -> String {
        let offsets: Vec<String> = self
            .inner
            .iter()
            .map(|line| match line.offset() {
                Ok(offset) => offset.to_string(),
                Err(_) => "?".to_owned(),
            })
            .collect();
        format!("<line_bulk [{}]>", offsets.join(", "))
    }
}

/// Snapshot iterator over a bulk's lines.
#[pyclass(name = "line_bulk_iter", module = "gpiod._gpiod")]
#[derive(Debug)]
pub struct PyLineBulkIter {
    iter: LineBulkIter,
}

#[pymethods]
impl PyLineBulkIter {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(&mut self) -> Option<PyLine> {
        self.iter.next().map(PyLine::from)
    }
}
