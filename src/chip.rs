use std::fmt;
use std::ops::Not;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bstr::ByteSlice;
use itertools::Itertools;
use nix::errno::Errno;

use crate::device::cdev::CdevChip;
use crate::device::ChipDevice;
use crate::errors::{Error, ErrorKind, Result};
use crate::fixed_str::FixedStr;
use crate::line::{Line, LineBulk, LineInfo, LineSlot};
use crate::uapi::GPIO_MAX_NAME_SIZE;

/// Directory scanned for `gpiochip*` devices
pub const DEV_DIR: &str = "/dev";

int_enum! {
    /// How [`Chip::open`] interprets its device argument.
    pub enum OpenMode as "open mode" {
        /// Guess from the argument: a number, a label, a name or a path
        Lookup = 1,
        ByPath = 2,
        /// Device name under `/dev`, e.g. `gpiochip0`
        ByName = 3,
        ByLabel = 4,
        /// Chip number, e.g. `0` for `/dev/gpiochip0`
        ByNumber = 5,
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        Self::Lookup
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipInfo {
    name: FixedStr<GPIO_MAX_NAME_SIZE>,
    label: FixedStr<GPIO_MAX_NAME_SIZE>,
    lines: u32,
}

impl ChipInfo {
    pub fn new(
        name: FixedStr<GPIO_MAX_NAME_SIZE>,
        label: FixedStr<GPIO_MAX_NAME_SIZE>,
        lines: u32,
    ) -> Self {
        Self { name, label, lines }
    }

    /// The name of the device driving this GPIO chip in the kernel
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// A functional name for this GPIO chip, such as a product number.
    ///
    /// Chips that do not report a label are labelled `"unknown"`.
    ///
    /// As an example, the SoC GPIO chip on a Raspberry Pi is "pinctrl-bcm2835"
    pub fn label(&self) -> &str {
        if self.label.is_empty() {
            "unknown"
        } else {
            self.label.as_str()
        }
    }

    /// The number of lines/pins indexable through this chip
    ///
    /// Not all of these may be usable depending on how the hardware is
    /// configured/muxed.
    pub const fn num_lines(&self) -> u32 {
        self.lines
    }
}

/// State shared by a chip handle and every line obtained from it.
pub(crate) struct ChipShared {
    pub(crate) device: Box<dyn ChipDevice>,
    pub(crate) info: ChipInfo,
    lines: Mutex<Vec<LineSlot>>,
}

impl ChipShared {
    pub(crate) fn lock_lines(&self) -> MutexGuard<'_, Vec<LineSlot>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-read the kernel's view of the line at `offset`.
    pub(crate) fn update_line(&self, offset: u32) -> Result<LineInfo> {
        let info = self.device.line_info(offset)?;
        self.lock_lines()[offset as usize].info = Some(info.clone());
        Ok(info)
    }

    /// Last known information for the line, read from the device on first use.
    pub(crate) fn line_info(&self, offset: u32) -> Result<LineInfo> {
        if let Some(info) = &self.lock_lines()[offset as usize].info {
            return Ok(info.clone());
        }
        self.update_line(offset)
    }

    fn check_offset(&self, offset: u32) -> Result<()> {
        if offset >= self.info.num_lines() {
            return Err(Error::new(ErrorKind::Offset {
                offset,
                num_lines: self.info.num_lines(),
            }));
        }
        Ok(())
    }
}

impl fmt::Debug for ChipShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChipShared")
            .field("device", &self.device)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// A GPIO Chip maps to the actual device driver instance in hardware that
/// one interacts with to interact with individual GPIOs.  Often these chips
/// map to IP chunks on an SoC but could also be enumerated within the kernel
/// via something like a PCI or USB bus.
///
/// A `Chip` is a cheap, clonable handle: clones and every [`Line`] taken
/// from it refer to the same open device, which is closed once the last of
/// them is dropped. A default constructed `Chip` is empty and most methods
/// fail on it until [`Chip::open`] succeeds.
///
/// It is best not to assume that a device will always be enumerated in the
/// same order (especially if it is connected via a bus).  In order to reliably
/// find the correct chip, open it by label or iterate over all chips with
/// [`make_chip_iter`] to find the device with matching criteria.
#[derive(Clone, Default)]
pub struct Chip {
    shared: Option<Arc<ChipShared>>,
}

impl Chip {
    /// Open a chip, see [`OpenMode`] for how `device` is interpreted.
    pub fn new(device: &str, how: OpenMode) -> Result<Self> {
        let chip = match how {
            OpenMode::ByPath => Self::open_path(device)?,
            OpenMode::ByName => Self::open_path(Path::new(DEV_DIR).join(device))?,
            OpenMode::ByNumber => {
                let num: u32 = device
                    .trim()
                    .parse()
                    .map_err(|_| Error::invalid("chip number must be an unsigned integer"))?;
                Self::open_path(Path::new(DEV_DIR).join(format!("gpiochip{}", num)))?
            }
            OpenMode::ByLabel => Self::open_label(device)?,
            OpenMode::Lookup => Self::open_lookup(device)?,
        };
        Ok(chip)
    }

    /// Wrap an already open device.
    pub fn from_device(device: impl ChipDevice + 'static) -> Result<Self> {
        let info = device.chip_info()?;
        let lines = (0..info.num_lines()).map(|_| LineSlot::default()).collect();
        log::debug!(
            "opened GPIO chip {} [{}] with {} lines",
            info.name(),
            info.label(),
            info.num_lines()
        );

        Ok(Self {
            shared: Some(Arc::new(ChipShared {
                device: Box::new(device),
                info,
                lines: Mutex::new(lines),
            })),
        })
    }

    pub(crate) fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_device(CdevChip::open(path)?)
    }

    fn open_label(label: &str) -> Result<Self> {
        for chip in make_chip_iter()? {
            let chip = chip?;
            if chip.label()? == label {
                return Ok(chip);
            }
        }
        Err(Error::os(Errno::ENOENT, "no GPIO chip with the given label"))
    }

    fn open_lookup(device: &str) -> Result<Self> {
        if !device.is_empty() && device.bytes().all(|b| b.is_ascii_digit()) {
            return Self::new(device, OpenMode::ByNumber);
        }
        match Self::open_label(device) {
            Ok(chip) => Ok(chip),
            Err(err) => {
                log::debug!("no chip labelled {:?} ({}), trying by name/path", device, err);
                if device.starts_with("/dev/") {
                    Self::open_path(device)
                } else {
                    Self::new(device, OpenMode::ByName)
                }
            }
        }
    }

    /// Open `device`, replacing whatever this handle referred to before.
    ///
    /// On failure the handle is left unchanged.
    pub fn open(&mut self, device: &str, how: OpenMode) -> Result<()> {
        *self = Self::new(device, how)?;
        Ok(())
    }

    /// Drop this handle's reference to the chip, leaving it empty.
    pub fn reset(&mut self) {
        self.shared = None;
    }

    pub fn is_valid(&self) -> bool {
        self.shared.is_some()
    }

    pub(crate) fn shared(&self) -> Result<&Arc<ChipShared>> {
        self.shared.as_ref().ok_or(Error::new(ErrorKind::NoChip))
    }

    pub(crate) fn from_shared(shared: Arc<ChipShared>) -> Self {
        Self {
            shared: Some(shared),
        }
    }

    pub fn info(&self) -> Result<&ChipInfo> {
        Ok(&self.shared()?.info)
    }

    pub fn name(&self) -> Result<&str> {
        Ok(self.info()?.name())
    }

    pub fn label(&self) -> Result<&str> {
        Ok(self.info()?.label())
    }

    pub fn num_lines(&self) -> Result<u32> {
        Ok(self.info()?.num_lines())
    }

    /// Get the line at `offset`, refreshing its information.
    ///
    /// The actual physical line corresponding to a given offset
    /// is completely dependent on how the driver/hardware for
    /// the chip works as well as the associated board layout.
    ///
    /// For a device like the NXP i.mx6 SoC GPIO controller there
    /// are several banks of GPIOs with each bank containing 32
    /// GPIOs.  For this hardware and driver something like
    /// `GPIO2_5` would map to offset 37.
    pub fn get_line(&self, offset: u32) -> Result<Line> {
        let shared = self.shared()?;
        shared.check_offset(offset)?;
        shared.update_line(offset)?;
        Ok(Line::new(shared.clone(), offset))
    }

    /// The first line named `name`, or an empty line if there is none.
    pub fn find_line(&self, name: &str) -> Result<Line> {
        for offset in 0..self.num_lines()? {
            let line = self.get_line(offset)?;
            if line.name()? == name {
                return Ok(line);
            }
        }
        Ok(Line::default())
    }

    pub fn get_lines(&self, offsets: &[u32]) -> Result<LineBulk> {
        let mut bulk = LineBulk::new();
        for &offset in offsets {
            bulk.append(self.get_line(offset)?)?;
        }
        Ok(bulk)
    }

    /// Every line of the chip, in offset order.
    pub fn get_all_lines(&self) -> Result<LineBulk> {
        let offsets = (0..self.num_lines()?).collect::<Vec<_>>();
        self.get_lines(&offsets)
    }

    /// Look up several lines by name. The result is empty if any one of
    /// them is missing.
    pub fn find_lines<I, S>(&self, names: I) -> Result<LineBulk>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bulk = LineBulk::new();
        for name in names {
            let line = self.find_line(name.as_ref())?;
            if !line.is_valid() {
                return Ok(LineBulk::new());
            }
            bulk.append(line)?;
        }
        Ok(bulk)
    }
}

impl PartialEq for Chip {
    fn eq(&self, other: &Self) -> bool {
        match (&self.shared, &other.shared) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for Chip {}

impl Not for &Chip {
    type Output = bool;

    /// `true` for an empty handle
    fn not(self) -> bool {
        !self.is_valid()
    }
}

impl Not for Chip {
    type Output = bool;

    fn not(self) -> bool {
        !self.is_valid()
    }
}

impl fmt::Debug for Chip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shared {
            Some(shared) => f
                .debug_struct("Chip")
                .field("name", &shared.info.name())
                .field("label", &shared.info.label())
                .field("num_lines", &shared.info.num_lines())
                .finish(),
            None => f.write_str("Chip(<empty>)"),
        }
    }
}

/// Iterator over the GPIO chips found in a directory, in name order.
///
/// Each chip is opened when it is reached, so a chip that cannot be opened
/// shows up as an `Err` item without ending the iteration.
#[derive(Debug)]
pub struct ChipIter {
    paths: std::vec::IntoIter<PathBuf>,
}

impl ChipIter {
    /// Collect the `gpiochip*` entries of `dir`.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_name().as_bytes().starts_with_str("gpiochip") {
                paths.push(entry.path());
            }
        }

        Ok(Self {
            paths: paths.into_iter().sorted(),
        })
    }
}

impl Iterator for ChipIter {
    type Item = Result<Chip>;

    fn next(&mut self) -> Option<Result<Chip>> {
        self.paths.next().map(Chip::open_path)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

/// Iterate over all GPIO chips currently present on this system
pub fn make_chip_iter() -> Result<ChipIter> {
    ChipIter::scan(DEV_DIR)
}

/// Search `chips` for a line named `name`. Returns an empty line when no
/// chip has one.
pub fn find_line_in<I>(chips: I, name: &str) -> Result<Line>
where
    I: IntoIterator<Item = Result<Chip>>,
{
    for chip in chips {
        let chip = match chip {
            Ok(chip) => chip,
            Err(err) => {
                log::warn!("skipping GPIO chip that failed to open: {}", err);
                continue;
            }
        };
        let line = chip.find_line(name)?;
        if line.is_valid() {
            return Ok(line);
        }
    }
    Ok(Line::default())
}
