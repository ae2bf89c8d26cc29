use pyo3::exceptions::{
    PyIndexError, PyOSError, PyOverflowError, PyRuntimeError, PyTypeError, PyValueError,
};
use pyo3::PyErr;

use crate::errors::{Error, ErrorKind};
use crate::flags::FlagSetError;

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::Io(_) | ErrorKind::Os { .. } => match err.raw_os_error() {
                Some(errno) => PyOSError::new_err((errno, msg)),
                None => PyOSError::new_err(msg),
            },
            ErrorKind::NoChip | ErrorKind::NoLine | ErrorKind::EmptyBulk => {
                PyRuntimeError::new_err(msg)
            }
            ErrorKind::Offset { .. } | ErrorKind::Index { .. } | ErrorKind::BulkFull { .. } => {
                PyIndexError::new_err(msg)
            }
            ErrorKind::InvalidArgument(_)
            | ErrorKind::InvalidConstant { .. }
            | ErrorKind::FixedStr(_) => PyValueError::new_err(msg),
            ErrorKind::FlagSet(err) => err.clone().into(),
        }
    }
}

impl From<FlagSetError> for PyErr {
    fn from(err: FlagSetError) -> PyErr {
        let msg = err.to_string();
        match err {
            FlagSetError::NotAnInteger(_) => PyTypeError::new_err(msg),
            FlagSetError::OutOfRange(_) => PyOverflowError::new_err(msg),
            FlagSetError::IndexOutOfRange(_) => PyIndexError::new_err(msg),
        }
    }
}
