use core::fmt;
use core::num::NonZeroU32;

/// Stable handle into one of the arenas owned by a containing system.
///
/// Stored as `index + 1` so `Option<Id>` costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    pub fn from_index(index: usize) -> Self {
        let index = u32::try_from(index).unwrap_or(u32::MAX - 1);
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Node inside a system's node table.
pub type NodeId = Id;
/// Child component inside a containing system.
pub type CompId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_survives_round_trip() {
        for i in [0_usize, 1, 7, 4096] {
            assert_eq!(Id::from_index(i).index(), i);
        }
    }

    #[test]
    fn option_id_has_no_overhead() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }

    #[test]
    fn ids_order_by_index() {
        assert!(Id::from_index(2) < Id::from_index(3));
        assert_eq!(format!("{:?}", Id::from_index(5)), "#5");
    }
}
