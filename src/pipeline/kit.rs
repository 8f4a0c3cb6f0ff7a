// Gate value -> slice of the sample bank.

use serde::{Deserialize, Serialize};

use crate::devices::pcm::BANK_SHIFT;

/// The co-processor sees one 32 KiB bank at a time, so a kit never exceeds it.
pub const BANK_LEN: usize = 0x8000;

/// Where the kit is linked in cartridge ROM. Bank aligned.
pub const KIT_ROM_ADDRESS: u32 = 0x0001_0000;
pub const KIT_BANK: u16 = (KIT_ROM_ADDRESS >> BANK_SHIFT) as u16;

// Start, length of each multi-kit slot. Not a hardware layout: the built-in kit is
// rendered to fit it, and a user kit has to be cut the same way.
const MULTI_REGIONS: [(u16, u16); 9] = [
    (0x0000, 0x0E00),
    (0x0E00, 0x0A00),
    (0x1800, 0x0C00),
    (0x2400, 0x0800),
    (0x2C00, 0x0C00),
    (0x3800, 0x0A00),
    (0x4200, 0x1000),
    (0x5200, 0x1200),
    (0x6400, 0x1C00),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KitLayout {
    /// One sample: gate 1 plays it whole, gate 2 its second half.
    #[default]
    Split,
    /// Nine fixed slices of one bank.
    Multi,
}

impl KitLayout {
    /// Highest usable gate value.
    pub fn slots(self) -> u8 {
        match self {
            KitLayout::Split => 2,
            KitLayout::Multi => MULTI_REGIONS.len() as u8,
        }
    }

    /// Start and length for a gate value in a kit of `kit_len` bytes.
    /// None for gate 0, out of range gates and slices that fall outside the kit.
    pub fn region(self, gate: u8, kit_len: usize) -> Option<(u16, u16)> {
        let kit_len = kit_len.min(BANK_LEN) as u16;
        let (start, length) = match (self, gate) {
            (_, 0) => return None,
            (KitLayout::Split, 1) => (0, kit_len),
            (KitLayout::Split, 2) => ((kit_len / 2).saturating_sub(1), kit_len / 2),
            (KitLayout::Split, _) => return None,
            (KitLayout::Multi, g) => *MULTI_REGIONS.get(usize::from(g) - 1)?,
        };
        if start >= kit_len {
            return None;
        }
        let length = length.min(kit_len - start);
        (length > 0).then_some((start, length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_plays_whole_then_second_half() {
        assert_eq!(KitLayout::Split.region(1, 20000), Some((0, 20000)));
        assert_eq!(KitLayout::Split.region(2, 20000), Some((9999, 10000)));
        assert_eq!(KitLayout::Split.region(3, 20000), None);
        assert_eq!(KitLayout::Split.region(0, 20000), None);
    }

    #[test]
    fn split_is_capped_at_one_bank() {
        assert_eq!(KitLayout::Split.region(1, 100_000), Some((0, 0x8000)));
    }

    #[test]
    fn multi_uses_the_fixed_table() {
        assert_eq!(KitLayout::Multi.slots(), 9);
        assert_eq!(KitLayout::Multi.region(1, BANK_LEN), Some((0x0000, 0x0E00)));
        assert_eq!(KitLayout::Multi.region(9, BANK_LEN), Some((0x6400, 0x1C00)));
        assert_eq!(KitLayout::Multi.region(10, BANK_LEN), None);
    }

    #[test]
    fn multi_slices_are_clipped_to_a_short_kit() {
        assert_eq!(KitLayout::Multi.region(2, 0x1000), Some((0x0E00, 0x0200)));
        assert_eq!(KitLayout::Multi.region(3, 0x1000), None);
    }

    #[test]
    fn slices_are_ordered_and_fit_in_the_bank() {
        let mut end = 0u32;
        for (start, len) in MULTI_REGIONS {
            assert!(u32::from(start) >= end);
            end = u32::from(start) + u32::from(len);
        }
        assert!(end as usize <= BANK_LEN);
    }
}
