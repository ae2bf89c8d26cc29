use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IOError;

use nix::errno::Errno;

use crate::fixed_str::FixedStrErr;
use crate::flags::FlagSetError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by chip, line and bulk operations.
///
/// Failures coming from the kernel keep their `errno`, see
/// [`Error::raw_os_error`].
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An I/O error while opening or talking to a device
    Io(IOError),
    /// A failed system call
    Os { errno: Errno, context: &'static str },
    /// The chip handle is empty
    NoChip,
    /// The line handle is empty
    NoLine,
    /// The line bulk holds no lines
    EmptyBulk,
    /// Line offset past the end of the chip
    Offset { offset: u32, num_lines: u32 },
    /// Index past the end of a line bulk
    Index { index: usize, len: usize },
    /// The line bulk already holds its maximum number of lines
    BulkFull { capacity: usize },
    /// An argument was rejected before reaching the device
    InvalidArgument(&'static str),
    /// An integer does not name a constant of the given kind
    InvalidConstant { kind: &'static str, value: i32 },
    FixedStr(FixedStrErr),
    FlagSet(FlagSetError),
}

impl Error {
    pub(crate) const fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    pub(crate) const fn os(errno: Errno, context: &'static str) -> Self {
        Self::new(ErrorKind::Os { errno, context })
    }

    pub(crate) const fn invalid(msg: &'static str) -> Self {
        Self::new(ErrorKind::InvalidArgument(msg))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The `errno` value when the error originates from the operating system.
    pub fn raw_os_error(&self) -> Option<i32> {
        match &self.kind {
            ErrorKind::Io(err) => err.raw_os_error(),
            ErrorKind::Os { errno, .. } => Some(*errno as i32),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::Os { errno, context } => write!(f, "{}: {}", context, errno.desc()),
            ErrorKind::NoChip => f.write_str("object not associated with an open GPIO chip"),
            ErrorKind::NoLine => f.write_str("object not holding a GPIO line handle"),
            ErrorKind::EmptyBulk => f.write_str("line_bulk not holding any GPIO lines"),
            ErrorKind::Offset { offset, num_lines } => write!(
                f,
                "line offset {} out of range (chip has {} lines)",
                offset, num_lines
            ),
            ErrorKind::Index { index, len } => write!(
                f,
                "index {} out of range for line_bulk of {} lines",
                index, len
            ),
            ErrorKind::BulkFull { capacity } => {
                write!(f, "maximum number of lines reached ({})", capacity)
            }
            ErrorKind::InvalidArgument(msg) => f.write_str(msg),
            ErrorKind::InvalidConstant { kind, value } => {
                write!(f, "{} is not a valid {} constant", value, kind)
            }
            ErrorKind::FixedStr(err) => err.fmt(f),
            ErrorKind::FlagSet(err) => err.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::Io(err) => Some(err),
            ErrorKind::Os { errno, .. } => Some(errno),
            ErrorKind::FixedStr(err) => Some(err),
            ErrorKind::FlagSet(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IOError> for Error {
    fn from(err: IOError) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        Self::os(errno, "GPIO ioctl failed")
    }
}

impl From<FixedStrErr> for Error {
    fn from(err: FixedStrErr) -> Self {
        Self::new(ErrorKind::FixedStr(err))
    }
}

impl From<FlagSetError> for Error {
    fn from(err: FlagSetError) -> Self {
        Self::new(ErrorKind::FlagSet(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_errors_keep_errno() {
        let err = Error::os(Errno::EBUSY, "error requesting GPIO lines");
        assert_eq!(err.raw_os_error(), Some(libc::EBUSY));
        assert!(err.to_string().starts_with("error requesting GPIO lines: "));

        let err = Error::from(IOError::from_raw_os_error(libc::ENOENT));
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn handle_errors_have_no_errno() {
        let err = Error::new(ErrorKind::NoChip);
        assert_eq!(err.raw_os_error(), None);
        assert_eq!(
            err.to_string(),
            "object not associated with an open GPIO chip"
        );
    }
}
