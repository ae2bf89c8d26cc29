// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! List every chip and line on the system, like `gpioinfo`.

use gpiod::{make_chip_iter, ActiveState, Direction, LineIter};

fn main() -> anyhow::Result<()> {
    for chip in make_chip_iter()? {
        let chip = match chip {
            Ok(chip) => chip,
            Err(e) => {
                eprintln!("Failed to open chip: {}", e);
                continue;
            }
        };
        println!(
            "GPIO chip: \"{}\", \"{}\", {} GPIO Lines",
            chip.name()?,
            chip.label()?,
            chip.num_lines()?
        );

        for line in LineIter::new(&chip)? {
            let info = match line.and_then(|line| line.info()) {
                Ok(info) => info,
                Err(e) => {
                    eprintln!("\tline: error {e}");
                    continue;
                }
            };

            let mut flags = vec![];
            if info.is_used() {
                flags.push("used");
            }
            if info.direction() == Direction::Output {
                flags.push("output");
            }
            if info.active_state() == ActiveState::Low {
                flags.push("active-low");
            }
            if info.is_open_drain() {
                flags.push("open-drain");
            }
            if info.is_open_source() {
                flags.push("open-source");
            }

            let usage = if !flags.is_empty() {
                format!("[{}]", flags.join(" "))
            } else {
                "".to_owned()
            };

            println!(
                "\tline {lineno:>3}: {name} {consumer} {usage}",
                lineno = info.line_offset(),
                name = info.name().unwrap_or("unnamed"),
                consumer = info.consumer().unwrap_or("unused"),
                usage = usage,
            );
        }
        println!();
    }
    Ok(())
}
