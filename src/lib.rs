//! Bid decisioning for mixed resale lots.
//!
//! Given a manifest of heterogeneous items, the pipeline gates each item on
//! evidence quality, fuses noisy price signals into a per-item price
//! distribution, models 60-day sell-through, and runs a seeded Monte-Carlo
//! simulation inside a bisection search to find the largest bid that still
//! meets the caller's ROI, risk, cash, and throughput constraints.

pub mod condition;
pub mod config;
pub mod error;
pub mod evidence;
pub mod gate;
pub mod ids;
pub mod item;
pub mod ladder;
pub mod optimize;
pub mod pipeline;
pub mod sell;
pub mod simulate;
pub mod stress;
pub mod survival;
pub mod triangulate;
