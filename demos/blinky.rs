// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use gpiod::{Chip, LineRequest, OpenMode, RequestType};
use quicli::prelude::*;
use std::thread::sleep;
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip, by name, number, label or path (e.g. gpiochip0)
    chip: String,
    /// The offset of the GPIO line for the provided chip
    line: u32,
    /// Period in milliseconds
    period_ms: u64,
    /// Duration over which to blink in milliseconds
    duration_ms: u64,
}

fn do_main(args: Cli) -> gpiod::Result<()> {
    let chip = Chip::new(&args.chip, OpenMode::Lookup)?;
    let line = chip.get_line(args.line)?;

    // The default value is the first state, so no separate write is needed
    line.request(&LineRequest::new("blinky", RequestType::DirectionOutput), 1)?;

    let duration = Duration::from_millis(args.duration_ms);
    let start_time = Instant::now();
    while start_time.elapsed() < duration {
        sleep(Duration::from_millis(args.period_ms));
        line.set_value(0)?;
        sleep(Duration::from_millis(args.period_ms));
        line.set_value(1)?;
    }

    line.release()
}

fn main() -> CliResult {
    let args = Cli::from_args();
    do_main(args).or_else(|e| {
        error!("{}", e);
        Ok(())
    })
}
