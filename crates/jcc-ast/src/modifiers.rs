//! Declaration modifiers.

use bitflags::bitflags;
use jcc_source::types::SourceRange;

bitflags! {
    /// The raw modifier bit set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModifierFlags: u8 {
        const PUBLIC    = 1 << 0;
        const PROTECTED = 1 << 1;
        const STATIC    = 1 << 2;
        const FINAL     = 1 << 3;
        const ABSTRACT  = 1 << 4;
        const NATIVE    = 1 << 5;
    }
}

/// Modifiers of a declaration, with a source range per bit for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Modifiers {
    flags: ModifierFlags,
    ranges: [Option<SourceRange>; 6],
}

impl Modifiers {
    /// Creates an empty modifier set.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Sets a modifier bit, remembering where it was written.
    pub fn set(&mut self, flag: ModifierFlags, range: SourceRange) {
        self.flags |= flag;
        self.ranges[Self::bit_index(flag)] = Some(range);
    }

    /// Convenience builder used when assembling declarations by hand.
    #[must_use]
    pub fn with(mut self, flag: ModifierFlags) -> Self {
        self.set(flag, SourceRange::synthetic());
        self
    }

    /// Returns the source range where the given modifier was written.
    #[must_use]
    pub fn range_of(&self, flag: ModifierFlags) -> Option<SourceRange> {
        self.ranges[Self::bit_index(flag)]
    }

    /// Returns the raw bit set.
    #[must_use]
    pub const fn flags(&self) -> ModifierFlags { self.flags }

    #[must_use]
    pub fn is_public(&self) -> bool { self.flags.contains(ModifierFlags::PUBLIC) }

    #[must_use]
    pub fn is_protected(&self) -> bool { self.flags.contains(ModifierFlags::PROTECTED) }

    #[must_use]
    pub fn is_static(&self) -> bool { self.flags.contains(ModifierFlags::STATIC) }

    #[must_use]
    pub fn is_final(&self) -> bool { self.flags.contains(ModifierFlags::FINAL) }

    #[must_use]
    pub fn is_abstract(&self) -> bool { self.flags.contains(ModifierFlags::ABSTRACT) }

    #[must_use]
    pub fn is_native(&self) -> bool { self.flags.contains(ModifierFlags::NATIVE) }

    fn bit_index(flag: ModifierFlags) -> usize {
        debug_assert_eq!(flag.bits().count_ones(), 1, "expected a single modifier bit");
        flag.bits().trailing_zeros() as usize
    }
}
