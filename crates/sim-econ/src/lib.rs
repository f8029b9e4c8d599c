#![deny(warnings)]

//! Market allocation engine: demand, competitive scoring, softmax share
//! allocation and the catch-up correction.
//!
//! This crate is pure math over `sim-core` types. Every function is
//! deterministic given its inputs and RNG stream, and numeric edge cases
//! (empty segments, zero demand) yield defined zero results rather than
//! errors.

mod allocate;
mod demand;
mod score;

pub use allocate::{
    allocate_segment, softmax_shares, SegmentAllocation, SegmentEntrant, RUBBER_BAND_BOOST,
    RUBBER_BAND_DRAG, SOFTMAX_TEMPERATURE,
};
pub use demand::segment_demand;
pub use score::{score_team, SegmentScore, EXPECTATION_BONUS_CAP};
