//! Type definitions for the engine ABI.

/// An opaque handle to one expression node owned by the engine.
///
/// The value is meaningful only to the engine instance that issued it.
/// Never do arithmetic on it or pass it to another engine.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef(i32);

impl EntityRef {
    /// Wraps a raw handle value received from or produced for the engine.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub const fn into_raw(self) -> i32 {
        self.0
    }

    /// Placeholder written into out-parameters before a call.
    pub const fn invalid() -> Self {
        Self(-1)
    }
}

impl Default for EntityRef {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Side from which a limit is approached.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApproachFrom {
    /// Two-sided limit.
    #[default]
    BothSides = 0,
    /// Limit from the left.
    Left = 1,
    /// Limit from the right.
    Right = 2,
}

impl ApproachFrom {
    /// Converts a raw ABI value, if it names a known side.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::BothSides),
            1 => Some(Self::Left),
            2 => Some(Self::Right),
            _ => None,
        }
    }
}

/// A pair of 64-bit integers (numerator, denominator).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LongTuple {
    /// First component.
    pub first: i64,
    /// Second component.
    pub second: i64,
}

/// A pair of doubles (real part, imaginary part).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DoubleTuple {
    /// First component.
    pub first: f64,
    /// Second component.
    pub second: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ref_raw() {
        let r = EntityRef::from_raw(42);
        assert_eq!(r.into_raw(), 42);
        assert_eq!(EntityRef::default(), EntityRef::invalid());
    }

    #[test]
    fn approach_from_values() {
        assert_eq!(ApproachFrom::BothSides as i32, 0);
        assert_eq!(ApproachFrom::Left as i32, 1);
        assert_eq!(ApproachFrom::Right as i32, 2);
        assert_eq!(ApproachFrom::from_raw(2), Some(ApproachFrom::Right));
        assert_eq!(ApproachFrom::from_raw(3), None);
        assert_eq!(ApproachFrom::default(), ApproachFrom::BothSides);
    }

    #[test]
    fn tuple_layout() {
        assert_eq!(std::mem::size_of::<LongTuple>(), 16);
        assert_eq!(std::mem::size_of::<DoubleTuple>(), 16);
        assert_eq!(std::mem::size_of::<EntityRef>(), 4);
    }
}
