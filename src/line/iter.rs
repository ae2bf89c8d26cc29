use std::ops::Range;

use super::Line;
use crate::chip::Chip;
use crate::errors::Result;

/// Iterator over every line of a chip in offset order.
#[derive(Debug, Clone)]
pub struct LineIter {
    chip: Chip,
    offsets: Range<u32>,
}

impl LineIter {
    pub fn new(chip: &Chip) -> Result<Self> {
        Ok(Self {
            chip: chip.clone(),
            offsets: 0..chip.num_lines()?,
        })
    }
}

impl Iterator for LineIter {
    type Item = Result<Line>;

    fn next(&mut self) -> Option<Result<Line>> {
        self.offsets.next().map(|offset| self.chip.get_line(offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.offsets.size_hint()
    }
}
