//! Band utilities
//!
//! The rank space `1..=8000` is split into eight 1000-wide bands named by
//! their upper rank: ranks 1-1000 belong to band 1000, 1001-2000 to band 2000,
//! and so on up to band 8000.

use crate::types::{BAND_COUNT, BAND_WIDTH, MAX_RANK, MIN_RANK};

/// Clamp any signed rank arithmetic result into the rank space
pub fn clamp_rank(rank: i64) -> u32 {
    rank.clamp(MIN_RANK as i64, MAX_RANK as i64) as u32
}

pub fn rank_to_band(rank: u32) -> u32 {
    let rank = rank.clamp(MIN_RANK, MAX_RANK);
    rank.div_ceil(BAND_WIDTH) * BAND_WIDTH
}

/// Zero-based index of the band containing `rank_or_band`
pub fn band_index(rank_or_band: u32) -> usize {
    (rank_to_band(rank_or_band) / BAND_WIDTH - 1) as usize
}

pub fn band_from_index(index: usize) -> u32 {
    (index.min(BAND_COUNT - 1) as u32 + 1) * BAND_WIDTH
}

/// Lowest rank of a band
pub fn band_floor(band: u32) -> u32 {
    rank_to_band(band) - BAND_WIDTH + 1
}

/// Highest rank of a band
pub fn band_ceiling(band: u32) -> u32 {
    rank_to_band(band)
}

pub fn band_midpoint(band: u32) -> u32 {
    rank_to_band(band) - BAND_WIDTH / 2
}

/// Ledger tiers map onto bands; tiers above 8 fold into the top band.
pub fn tier_to_band(tier: u32) -> u32 {
    tier.clamp(1, BAND_COUNT as u32) * BAND_WIDTH
}

pub fn all_bands() -> impl Iterator<Item = u32> {
    (0..BAND_COUNT).map(band_from_index)
}

/// Intersection of a band with `[low, high]`, if any
pub fn band_overlap(band: u32, low: u32, high: u32) -> Option<(u32, u32)> {
    let lo = band_floor(band).max(low);
    let hi = band_ceiling(band).min(high);
    (lo <= hi).then_some((lo, hi))
}
