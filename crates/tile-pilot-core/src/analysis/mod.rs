//! Board analysis through a multimodal inference endpoint.
//!
//! A board screenshot goes out as an inline base64 PNG next to a strategic
//! prompt; the reply comes back as free text that is expected to wrap one
//! JSON object matching [`BoardAnalysis`]. The [`MoveAnalyzer`] trait is
//! the seam the play loop depends on, so everything downstream of the
//! HTTP call is testable without a network.

mod client;
mod model;

pub use client::{MoveAnalyzer, VisionClient, DEFAULT_ENDPOINT};
pub use model::{
    extract_json, BoardAnalysis, FollowUp, MoveDirection, Objective, PlannedMove, SpecialTile,
};
