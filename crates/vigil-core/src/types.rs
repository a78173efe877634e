use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;

/// `Sequence` number newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Sequence(pub u16);

impl Sequence {
    /// The sequence number of the following cycle, wrapping at 65536.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `TraceId` newtype.
///
/// The `ICMP` identifier shared by every echo request of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct TraceId(pub u16);

/// `MaxCycles` newtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd)]
pub struct MaxCycles(pub NonZeroUsize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_next() {
        assert_eq!(Sequence(1), Sequence(0).next());
        assert_eq!(Sequence(u16::MAX), Sequence(u16::MAX - 1).next());
    }

    #[test]
    fn test_sequence_wraps() {
        assert_eq!(Sequence(0), Sequence(u16::MAX).next());
    }

    #[test]
    fn test_kth_sequence() {
        let kth = |k: usize| {
            std::iter::successors(Some(Sequence::default()), |s| Some(s.next()))
                .nth(k - 1)
                .unwrap()
        };
        assert_eq!(Sequence(0), kth(1));
        assert_eq!(Sequence(9), kth(10));
        assert_eq!(Sequence(u16::MAX), kth(65536));
        assert_eq!(Sequence(0), kth(65537));
        assert_eq!(Sequence(4), kth(65541));
    }
}
