//! Block locators
//!
//! The ten most recent heights, then exponentially sparser heights, then
//! genesis. A peer scans the list for the first hash it knows to find the
//! fork point in a logarithmic number of entries.

/// Maximum locator entries, the wire bound of `GetBlocks`.
pub const LOCATORS_MAX_COUNT: usize = 128;

const DENSE_LOCATORS: usize = 10;

/// Heights of the locators for a main chain ending at `head_height`,
/// highest first and always ending at genesis (height 1).
pub fn locator_heights(head_height: u32) -> Vec<u32> {
    let mut heights = Vec::new();
    let mut height = head_height;
    while height > 1 && heights.len() < DENSE_LOCATORS {
        heights.push(height);
        height -= 1;
    }

    let mut step = 2u32;
    while height > 1 && heights.len() < LOCATORS_MAX_COUNT - 1 {
        heights.push(height);
        height = height.saturating_sub(step).max(1);
        step = step.saturating_mul(2);
    }

    heights.push(1);
    heights
}
