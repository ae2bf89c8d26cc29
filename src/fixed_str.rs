//! NUL-padded, fixed capacity strings as used by the kernel for chip names,
//! chip labels, line names and consumer labels.

use std::ops::Deref;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize> {
    s: [u8; N],
}

impl<const N: usize> FixedStr<N> {
    #[inline]
    pub const fn empty() -> Self {
        Self { s: [0; N] }
    }

    /// Copy `s` into a new string. The kernel expects a terminating NUL, so
    /// at most `N - 1` bytes fit.
    pub fn new(s: &str) -> Result<Self, FixedStrErr> {
        if s.len() >= N {
            return Err(FixedStrErr::CapacityOverflow {
                capacity: N - 1,
                required: s.len(),
            });
        }
        if s.as_bytes().contains(&0) {
            return Err(FixedStrErr::InteriorNul);
        }

        let mut f = Self::empty();
        f.s[..s.len()].copy_from_slice(s.as_bytes());
        Ok(f)
    }

    /// Like [`FixedStr::new`] but silently cut at the last character
    /// boundary that fits, matching how consumer labels are passed to the
    /// kernel.
    pub fn truncated(s: &str) -> Self {
        let s = s.split('\0').next().unwrap_or_default();
        let mut end = s.len().min(N.saturating_sub(1));
        while !s.is_char_boundary(end) {
            end -= 1;
        }

        let mut f = Self::empty();
        f.s[..end].copy_from_slice(&s.as_bytes()[..end]);
        f
    }

    pub fn from_byte_array(mut bytes: [u8; N]) -> Result<Self, FixedStrErr> {
        let nul = find_nul(&bytes);
        let _ = core::str::from_utf8(&bytes[..nul])?;
        if nul < N {
            bytes[nul..].fill(0);
        }

        Ok(FixedStr { s: bytes })
    }

    pub const fn into_byte_array(self) -> [u8; N] {
        self.s
    }

    #[inline]
    pub fn len(&self) -> usize {
        find_nul(&self.s)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0 || self.s[0] == 0
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        let l = self.len();
        // Only ever filled from `&str` or validated in `from_byte_array`.
        unsafe { std::str::from_utf8_unchecked(&self.s[..l]) }
    }
}

impl<const N: usize> Default for FixedStr<N> {
    #[inline(always)]
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> std::fmt::Debug for FixedStr<N> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FixedStr").field(&self.as_str()).finish()
    }
}

impl<const N: usize> std::fmt::Display for FixedStr<N> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl<const N: usize> AsRef<str> for FixedStr<N> {
    #[inline(always)]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize> Deref for FixedStr<N> {
    type Target = str;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FixedStrErr {
    #[error(
        "Exceeded fixed string size: required {required} bytes with only {capacity} available"
    )]
    CapacityOverflow { capacity: usize, required: usize },
    #[error("String contains an interior NUL byte")]
    InteriorNul,
    #[error("UTF8 Error")]
    Utf8(#[from] core::str::Utf8Error),
}

impl From<FixedStrErr> for std::io::Error {
    fn from(value: FixedStrErr) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, value)
    }
}

#[inline]
fn find_nul(s: &[u8]) -> usize {
    s.iter().position(|c| *c == 0).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_reports_empty() {
        let s = FixedStr::<32>::empty();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
        assert_eq!(s.as_str(), "");

        let s = FixedStr::<32>::new("gpiochip0").unwrap();
        assert!(!s.is_empty());
        assert_eq!(&*s, "gpiochip0");
    }

    #[test]
    fn new_keeps_room_for_terminator() {
        let exact = "a".repeat(31);
        assert!(FixedStr::<32>::new(&exact).is_ok());

        let err = FixedStr::<32>::new(&"a".repeat(32)).unwrap_err();
        assert_eq!(
            err,
            FixedStrErr::CapacityOverflow {
                capacity: 31,
                required: 32
            }
        );
    }

    #[test]
    fn truncated_cuts_on_char_boundary() {
        // 15 two byte characters followed by a three byte one
        let s = format!("{}€", "é".repeat(15));
        let t = FixedStr::<32>::truncated(&s);
        assert_eq!(t.as_str(), "é".repeat(15));

        let t = FixedStr::<8>::truncated("consumer-label");
        assert_eq!(t.as_str(), "consume");
    }

    #[test]
    fn byte_array_is_cleared_after_terminator() {
        let mut raw = [b'x'; 8];
        raw[..4].copy_from_slice(b"abc\0");
        let s = FixedStr::<8>::from_byte_array(raw).unwrap();
        assert_eq!(s.as_str(), "abc");
        assert_eq!(s.into_byte_array(), *b"abc\0\0\0\0\0");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut raw = [0u8; 4];
        raw[0] = 0xff;
        assert!(matches!(
            FixedStr::<4>::from_byte_array(raw),
            Err(FixedStrErr::Utf8(_))
        ));
    }
}
