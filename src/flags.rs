//! A fixed-width set of 32 independent flags.
//!
//! [`FlagSet`] is the Rust counterpart of the `std::bitset<32>` used by
//! libgpiodcxx for request flags. On the host side it is an unsigned integer
//! in which bit *i* corresponds to flag *i*. Conversion from an integer is
//! checked: anything outside `0..=u32::MAX` is rejected rather than
//! truncated, so the mapping is a bijection on that range.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};
use std::str::FromStr;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(u32);

impl FlagSet {
    /// Number of flags held
    pub const BITS: usize = 32;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(u32::MAX)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// A set holding only flag `bit`.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= 32`.
    pub const fn bit(bit: usize) -> Self {
        assert!(bit < Self::BITS, "flag index out of range");
        Self(1 << bit)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// State of flag `bit`, `None` if the index is out of range.
    pub const fn test(self, bit: usize) -> Option<bool> {
        if bit < Self::BITS {
            Some(self.0 & (1 << bit) != 0)
        } else {
            None
        }
    }

    pub fn set(&mut self, bit: usize, value: bool) -> Result<(), FlagSetError> {
        if bit >= Self::BITS {
            return Err(FlagSetError::IndexOutOfRange(bit));
        }
        if value {
            self.0 |= 1 << bit;
        } else {
            self.0 &= !(1 << bit);
        }
        Ok(())
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Indices of the flags that are set, lowest first.
    pub fn iter_set(self) -> impl Iterator<Item = usize> {
        (0..Self::BITS).filter(move |bit| self.0 & (1 << bit) != 0)
    }
}

impl From<u32> for FlagSet {
    #[inline]
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<FlagSet> for u32 {
    #[inline]
    fn from(flags: FlagSet) -> Self {
        flags.0
    }
}

impl From<FlagSet> for u64 {
    #[inline]
    fn from(flags: FlagSet) -> Self {
        flags.0.into()
    }
}

impl TryFrom<i128> for FlagSet {
    type Error = FlagSetError;

    fn try_from(value: i128) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| FlagSetError::OutOfRange(value))
    }
}

impl TryFrom<u64> for FlagSet {
    type Error = FlagSetError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::try_from(i128::from(value))
    }
}

impl TryFrom<i64> for FlagSet {
    type Error = FlagSetError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_from(i128::from(value))
    }
}

impl FromStr for FlagSet {
    type Err = FlagSetError;

    /// Parse decimal integer text, the way a host `int()` call would.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i128 = trimmed
            .parse()
            .map_err(|_| FlagSetError::NotAnInteger(trimmed.to_owned()))?;
        Self::try_from(value)
    }
}

impl BitOr for FlagSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FlagSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FlagSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for FlagSet {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for FlagSet {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Most significant flag first, like `std::bitset::to_string`.
impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032b}", self.0)
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlagSet({:#010x})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagSetError {
    #[error("cannot interpret {0:?} as an integer flag set")]
    NotAnInteger(String),
    #[error("{0} does not fit in a 32-bit flag set")]
    OutOfRange(i128),
    #[error("flag index {0} out of range for a 32-bit flag set")]
    IndexOutOfRange(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn integer_round_trip_is_identity(x in any::<u32>()) {
            let flags = FlagSet::try_from(u64::from(x)).unwrap();
            prop_assert_eq!(u64::from(flags), u64::from(x));
        }

        #[test]
        fn wider_values_are_rejected(x in (u64::from(u32::MAX) + 1)..=u64::MAX) {
            prop_assert_eq!(
                FlagSet::try_from(x),
                Err(FlagSetError::OutOfRange(i128::from(x)))
            );
        }
    }

    #[test]
    fn each_bit_maps_to_one_flag() {
        for i in 0..32 {
            let flags = FlagSet::try_from(1u64 << i).unwrap();
            assert_eq!(flags.count(), 1);
            assert_eq!(flags.test(i), Some(true));
            assert_eq!(flags.iter_set().collect::<Vec<_>>(), vec![i]);
            assert_eq!(flags, FlagSet::bit(i));
        }
    }

    #[test]
    fn all_bits_set_is_a_valid_value() {
        let flags = FlagSet::try_from(0xFFFF_FFFFu64).unwrap();
        assert_eq!(flags, FlagSet::all());
        assert_eq!(flags.count(), 32);
        assert_eq!(u32::from(flags), u32::MAX);
        assert_eq!("4294967295".parse::<FlagSet>(), Ok(FlagSet::all()));
    }

    #[test]
    fn negative_values_are_rejected() {
        assert_eq!(
            FlagSet::try_from(-1i64),
            Err(FlagSetError::OutOfRange(-1))
        );
    }

    #[test]
    fn text_must_be_an_integer() {
        assert_eq!(" 5 ".parse::<FlagSet>(), Ok(FlagSet::from_bits(5)));
        assert_eq!(
            "active-low".parse::<FlagSet>(),
            Err(FlagSetError::NotAnInteger("active-low".to_owned()))
        );
        assert!(matches!(
            "".parse::<FlagSet>(),
            Err(FlagSetError::NotAnInteger(_))
        ));
    }

    #[test]
    fn set_and_test_flags() {
        let mut flags = FlagSet::empty();
        flags.set(3, true).unwrap();
        flags.set(5, true).unwrap();
        flags.set(3, false).unwrap();
        assert_eq!(flags.bits(), 1 << 5);
        assert_eq!(flags.test(32), None);
        assert_eq!(flags.set(32, true), Err(FlagSetError::IndexOutOfRange(32)));
    }

    #[test]
    fn display_matches_bitset_text() {
        let flags = FlagSet::from_bits(0b101);
        assert_eq!(flags.to_string(), format!("{}101", "0".repeat(29)));
    }
}
