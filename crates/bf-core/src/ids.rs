use core::fmt;
use core::num::NonZeroU32;

/// Arena handle for a node or element.
///
/// The handle stores its 0-based arena index shifted up by one, which puts
/// a niche at zero: `Option<Id>` costs no more than `Id` itself, and every
/// back-reference in the graph (`coupled`, slot owners) stays four bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Handle addressing the arena slot at `index`.
    ///
    /// Panics on `u32::MAX`, where the shifted value would wrap to zero;
    /// no realistic network comes anywhere near that many vertices.
    pub fn from_index(index: u32) -> Self {
        match NonZeroU32::new(index.wrapping_add(1)) {
            Some(raw) => Self(raw),
            None => panic!("arena index out of range"),
        }
    }

    /// The 0-based arena index this handle addresses.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// The arena index widened for direct `Vec` access.
    pub fn idx(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.index()).finish()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Role-specific aliases; purely for signature readability.
pub type NodeId = Id;
pub type ElemId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_survives_the_shift() {
        for i in [0_u32, 1, 7, 4_096, u32::MAX - 1] {
            let id = Id::from_index(i);
            assert_eq!(id.index(), i);
            assert_eq!(id.idx(), i as usize);
        }
    }

    #[test]
    fn option_pays_nothing_for_the_niche() {
        // The whole point of the +1 shift: None fits into the zero slot.
        assert_eq!(
            core::mem::size_of::<Option<Id>>(),
            core::mem::size_of::<Id>()
        );
    }

    #[test]
    fn ordering_follows_the_arena() {
        assert!(Id::from_index(2) < Id::from_index(10));
        assert_eq!(format!("{:?}", Id::from_index(3)), "Id(3)");
        assert_eq!(format!("{}", Id::from_index(3)), "3");
    }
}
