// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `gpiod` crate provides the libgpiodcxx object model (chips, lines,
//! line bulks, requests and events) on top of the [GPIO character device
//! ABI](https://www.kernel.org/doc/Documentation/ABI/testing/gpio-cdev), and
//! optionally exposes it to Python as the `gpiod._gpiod` extension module.
//!
//! Chips and lines are cheap shared handles. A [`Line`] keeps its [`Chip`]
//! open, and every handle to the same line sees the same request state, so
//! lines can be passed around freely.
//!
//! # Examples
//!
//! Mirror the state of one line onto another:
//!
//! ```no_run
//! use std::time::Duration;
//! use gpiod::{Chip, EventType, LineRequest, OpenMode, RequestType};
//!
//! fn mirror_gpio(inputline: u32, outputline: u32) -> gpiod::Result<()> {
//!     let chip = Chip::new("gpiochip0", OpenMode::Lookup)?;
//!     let input = chip.get_line(inputline)?;
//!     let output = chip.get_line(outputline)?;
//!
//!     output.request(&LineRequest::new("mirror-gpio", RequestType::DirectionOutput), 0)?;
//!     input.request(&LineRequest::new("mirror-gpio", RequestType::EventBothEdges), 0)?;
//!
//!     loop {
//!         if !input.event_wait(Duration::from_secs(1))? {
//!             continue;
//!         }
//!         let event = input.event_read()?;
//!         println!("{:?}", event);
//!         match event.event_type {
//!             EventType::RisingEdge => output.set_value(1)?,
//!             EventType::FallingEdge => output.set_value(0)?,
//!         }
//!     }
//! }
//!
//! # fn main() -> gpiod::Result<()> {
//! #     mirror_gpio(0, 1)
//! # }
//! ```
//!
//! To find a line by name on any chip and read it:
//!
//! ```no_run
//! use gpiod::{LineRequest, RequestType};
//!
//! # fn main() -> gpiod::Result<()> {
//! let line = gpiod::find_line("button")?;
//! if line.is_valid() {
//!     line.request(&LineRequest::new("read-input", RequestType::DirectionInput), 0)?;
//!     println!("Value: {}", line.get_value()?);
//! }
//! # Ok(()) }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
mod macros;

mod errors;

pub mod fixed_str;

pub mod flags;

#[allow(non_camel_case_types)]
pub mod uapi;

pub mod device;

#[cfg(any(test, feature = "mock"))]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;

pub mod chip;

pub mod line;

#[cfg(feature = "python")]
#[cfg_attr(docsrs, doc(cfg(feature = "python")))]
pub mod python;

pub use chip::{find_line_in, make_chip_iter, Chip, ChipInfo, ChipIter, OpenMode};
pub use errors::{Error, ErrorKind, Result};
pub use flags::{FlagSet, FlagSetError};
#[cfg(feature = "line-config")]
pub use line::Bias;
pub use line::{
    ActiveState, Direction, EventType, Line, LineBulk, LineBulkIter, LineEvent, LineInfo,
    LineIter, LineRequest, RequestType,
};

/// Whether line reconfiguration and bias support are compiled in
pub const LINE_CONFIG: bool = cfg!(feature = "line-config");

/// Find the first line named `name` on any chip of the system.
///
/// Returns an empty [`Line`] if no chip has such a line.
pub fn find_line(name: &str) -> Result<Line> {
    find_line_in(make_chip_iter()?, name)
}
