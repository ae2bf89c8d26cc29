//! GPIO chips exposed by the kernel as `/dev/gpiochipN`, driven through the
//! v1 character device ioctls.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bstr::ByteSlice;
use nix::errno::Errno;
use nix::sys::stat::{lstat, major, minor, SFlag};

use super::{ChipDevice, EventRequest, HandleRequest, LineHandle, RawEvent};
use crate::chip::ChipInfo;
use crate::errors::{Error, Result};
use crate::fixed_str::FixedStr;
use crate::line::{EventType, LineInfo};
use crate::uapi::{self, v1};

/// Where the kernel publishes the `major:minor` of each GPIO device
pub const SYSFS_GPIO_DEVICES: &str = "/sys/bus/gpio/devices";

/// An open GPIO character device.
#[derive(Debug)]
pub struct CdevChip {
    file: File,
    path: PathBuf,
}

impl CdevChip {
    /// Open the GPIO chip at `path` (e.g. `/dev/gpiochip0`).
    ///
    /// Fails with `ENOTTY` when `path` is not a character device or has no
    /// GPIO device entry in sysfs, and with `ENODEV` when the device numbers
    /// do not match that entry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        check_gpiochip_cdev(path)?;

        let chip = Self {
            file,
            path: path.to_owned(),
        };
        // Make sure the ioctls are understood before handing the chip out.
        let _ = chip.chip_info()?;
        Ok(chip)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn check_gpiochip_cdev(path: &Path) -> Result<()> {
    let stat = lstat(path)?;
    if SFlag::from_bits_truncate(stat.st_mode) & SFlag::S_IFMT != SFlag::S_IFCHR {
        return Err(Error::os(Errno::ENOTTY, "not a character device"));
    }

    let name = path
        .file_name()
        .ok_or(Error::os(Errno::ENOTTY, "not a GPIO character device"))?;
    let sysfs = Path::new(SYSFS_GPIO_DEVICES).join(name).join("dev");
    let Ok(contents) = std::fs::read(&sysfs) else {
        return Err(Error::os(Errno::ENOTTY, "not a GPIO character device"));
    };

    let expected = format!("{}:{}", major(stat.st_rdev), minor(stat.st_rdev));
    if contents.trim() != expected.as_bytes() {
        return Err(Error::os(
            Errno::ENODEV,
            "device numbers do not match the GPIO device in sysfs",
        ));
    }

    Ok(())
}

impl ChipDevice for CdevChip {
    fn chip_info(&self) -> Result<ChipInfo> {
        let mut info = uapi::gpio_chip_info::zeroed();
        unsafe { uapi::gpio_get_chipinfo(self.file.as_raw_fd(), &mut info) }
            .map_err(|e| Error::os(e, "unable to retrieve GPIO chip information"))?;

        Ok(ChipInfo::new(
            FixedStr::from_byte_array(info.name)?,
            FixedStr::from_byte_array(info.label)?,
            info.lines,
        ))
    }

    fn line_info(&self, offset: u32) -> Result<LineInfo> {
        let mut info = v1::gpioline_info::new_get(offset);
        unsafe { v1::gpio_get_lineinfo(self.file.as_raw_fd(), &mut info) }
            .map_err(|e| Error::os(e, "unable to retrieve GPIO line information"))?;

        LineInfo::from_v1(info)
    }

    fn request_values(&self, req: &HandleRequest<'_>) -> Result<Box<dyn LineHandle>> {
        if req.offsets.is_empty() || req.offsets.len() > v1::GPIOHANDLES_MAX {
            return Err(Error::os(Errno::EINVAL, "invalid number of lines"));
        }

        let mut raw = v1::gpiohandle_request::zeroed();
        raw.lines = req.offsets.len() as u32;
        raw.lineoffsets[..req.offsets.len()].copy_from_slice(req.offsets);
        raw.flags = req.flags;
        for (dst, src) in raw.default_values.iter_mut().zip(req.default_values) {
            *dst = u8::from(*src != 0);
        }
        raw.consumer_label = FixedStr::<{ uapi::GPIO_MAX_NAME_SIZE }>::truncated(req.consumer)
            .into_byte_array();

        unsafe { v1::gpio_get_linehandle(self.file.as_raw_fd(), &mut raw) }
            .map_err(|e| Error::os(e, "error requesting GPIO lines"))?;

        Ok(Box::new(CdevHandle::new(raw.fd, req.offsets.to_vec(), false)))
    }

    fn request_events(&self, req: &EventRequest<'_>) -> Result<Box<dyn LineHandle>> {
        let mut raw = v1::gpioevent_request {
            lineoffset: req.offset,
            handleflags: req.handle_flags,
            eventflags: req.event_flags,
            consumer_label: FixedStr::<{ uapi::GPIO_MAX_NAME_SIZE }>::truncated(req.consumer)
                .into_byte_array(),
            fd: 0,
        };

        unsafe { v1::gpio_get_lineevent(self.file.as_raw_fd(), &mut raw) }
            .map_err(|e| Error::os(e, "error requesting GPIO line events"))?;

        Ok(Box::new(CdevHandle::new(raw.fd, vec![req.offset], true)))
    }
}

/// Lines held through a handle or event file descriptor.
#[derive(Debug)]
pub struct CdevHandle {
    file: File,
    offsets: Vec<u32>,
    events: bool,
}

impl CdevHandle {
    fn new(fd: libc::c_int, offsets: Vec<u32>, events: bool) -> Self {
        // The kernel hands over ownership of `fd` on a successful request.
        let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
        Self {
            file,
            offsets,
            events,
        }
    }
}

impl LineHandle for CdevHandle {
    fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    fn get_values(&self, values: &mut [u8]) -> Result<()> {
        let mut data = v1::gpiohandle_data {
            values: [0; v1::GPIOHANDLES_MAX],
        };
        unsafe { v1::gpiohandle_get_line_values(self.file.as_raw_fd(), &mut data) }
            .map_err(|e| Error::os(e, "error reading GPIO line values"))?;

        let n = values.len().min(self.offsets.len());
        values[..n].copy_from_slice(&data.values[..n]);
        Ok(())
    }

    fn set_values(&self, values: &[u8]) -> Result<()> {
        let mut data = v1::gpiohandle_data {
            values: [0; v1::GPIOHANDLES_MAX],
        };
        for (dst, src) in data.values.iter_mut().zip(values) {
            *dst = u8::from(*src != 0);
        }
        unsafe { v1::gpiohandle_set_line_values(self.file.as_raw_fd(), &mut data) }
            .map_err(|e| Error::os(e, "error setting GPIO line values"))?;
        Ok(())
    }

    fn set_config(&self, flags: v1::GPIOHANDLE_REQUEST_FLAGS, values: &[u8]) -> Result<()> {
        let mut config = v1::gpiohandle_config::new(flags);
        for (dst, src) in config.default_values.iter_mut().zip(values) {
            *dst = u8::from(*src != 0);
        }
        unsafe { v1::gpiohandle_set_config(self.file.as_raw_fd(), &mut config) }
            .map_err(|e| Error::os(e, "error setting GPIO line config"))?;
        Ok(())
    }

    fn read_events(&self, max: usize) -> Result<Vec<RawEvent>> {
        if !self.events {
            return Err(Error::os(Errno::EPERM, "line not requested for events"));
        }

        let size = v1::gpioevent_data::SIZE;
        let mut buf = vec![0u8; size * max.max(1)];
        let n = loop {
            match (&self.file).read(&mut buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                res => break res?,
            }
        };
        if n < size {
            return Err(Error::os(Errno::EIO, "short read of GPIO event"));
        }

        buf[..n - n % size]
            .chunks_exact(size)
            .map(|chunk| {
                let mut record = [0u8; v1::gpioevent_data::SIZE];
                record.copy_from_slice(chunk);
                let data = v1::gpioevent_data::from_bytes(&record);
                let event_type = match data.id {
                    v1::GPIOEVENT_EVENT_RISING_EDGE => EventType::RisingEdge,
                    v1::GPIOEVENT_EVENT_FALLING_EDGE => EventType::FallingEdge,
                    _ => return Err(Error::os(Errno::EIO, "unknown GPIO event type")),
                };
                Ok(RawEvent {
                    timestamp: Duration::from_nanos(data.timestamp),
                    event_type,
                })
            })
            .collect()
    }

    fn event_fd(&self) -> Option<BorrowedFd<'_>> {
        self.events.then(|| self.file.as_fd())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_files_are_not_chips() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = CdevChip::open(file.path()).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }

    #[test]
    fn missing_device_reports_enoent() {
        let dir = tempfile::tempdir().unwrap();
        let err = CdevChip::open(dir.path().join("gpiochip0")).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn char_devices_without_sysfs_entry_are_not_chips() {
        // /dev/null is a character device but never a GPIO chip
        let err = CdevChip::open("/dev/null").unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }
}
