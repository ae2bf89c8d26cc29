use pyo3::prelude::*;

use super::bulk::PyLineBulk;
use super::line::PyLine;
use crate::chip::{make_chip_iter, Chip, ChipIter, OpenMode};

#[pyclass(name = "chip", module = "gpiod._gpiod")]
#[derive(Debug, Clone, Default)]
pub struct PyChip {
    pub(crate) inner: Chip,
}

impl From<Chip> for PyChip {
    fn from(inner: Chip) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyChip {
    #[classattr]
    const OPEN_LOOKUP: i32 = OpenMode::Lookup as i32;
    #[classattr]
    const OPEN_BY_PATH: i32 = OpenMode::ByPath as i32;
    #[classattr]
    const OPEN_BY_NAME: i32 = OpenMode::ByName as i32;
    #[classattr]
    const OPEN_BY_LABEL: i32 = OpenMode::ByLabel as i32;
    #[classattr]
    const OPEN_BY_NUMBER: i32 = OpenMode::ByNumber as i32;

    /// Without a device the chip starts out empty.
    #[new]
    #[pyo3(signature = (device = None, how = OpenMode::Lookup as i32))]
    fn new(py: Python<'_>, device: Option<String>, how: i32) -> PyResult<Self> {
        let Some(device) = device else {
            return Ok(Self::default());
        };
        let how = OpenMode::try_from(how)?;
        let inner = py.allow_threads(|| Chip::new(&device, how))?;
        Ok(Self { inner })
    }

    #[pyo3(signature = (device, how = OpenMode::Lookup as i32))]
    fn open(&mut self, py: Python<'_>, device: String, how: i32) -> PyResult<()> {
        let how = OpenMode::try_from(how)?;
        self.inner = py.allow_threads(|| Chip::new(&device, how))?;
        Ok(())
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn name(&self) -> PyResult<String> {
        Ok(self.inner.name()?.to_owned())
    }

    fn label(&self) -> PyResult<String> {
        Ok(self.inner.label()?.to_owned())
    }

    fn num_lines(&self) -> PyResult<u32> {
        Ok(self.inner.num_lines()?)
    }

    fn get_line(&self, offset: u32) -> PyResult<PyLine> {
        Ok(self.inner.get_line(offset)?.into())
    }

    fn find_line(&self, name: String) -> PyResult<PyLine> {
        Ok(self.inner.find_line(&name)?.into())
    }

    fn get_lines(&self, offsets: Vec<u32>) -> PyResult<PyLineBulk> {
        Ok(self.inner.get_lines(&offsets)?.into())
    }

    fn get_all_lines(&self) -> PyResult<PyLineBulk> {
        Ok(self.inner.get_all_lines()?.into())
    }

    fn find_lines(&self, names: Vec<String>) -> PyResult<PyLineBulk> {
        Ok(self.inner.find_lines(names)?.into())
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
        match self.inner.info() {
            Ok(info) => format!(
                "<chip name={:?} label={:?} lines={}>",
                info.name(),
                info.label(),
                info.num_lines()
            ),
            Err(_) => "<chip (empty)>".to_owned(),
        }
    }
}

/// Python iterator over the chips in `/dev`.
#[pyclass(name = "chip_iter", module = "gpiod._gpiod")]
#[derive(Debug)]
pub struct PyChipIter {
    iter: ChipIter,
}

#[pymethods]
impl PyChipIter {
    #[new]
    pub(crate) fn new() -> PyResult<Self> {
        Ok(Self {
            iter: make_chip_iter()?,
        })
    }

    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(&mut self) -> PyResult<Option<PyChip>> {
        Ok(self.iter.next().transpose()?.map(PyChip::from))
    }
}
