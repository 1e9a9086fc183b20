//! Sociflow - Social-media metrics history and anomaly detection
//!
//! Periodically polls tracked accounts across Instagram, TikTok and YouTube,
//! appends time-series engagement metrics to SQLite, and flags accounts whose
//! follower or engagement numbers move implausibly fast (heuristic bot
//! detection).
//!
//! All domain logic lives in [`pipeline`]; the production daemon is the
//! `pipeline_runtime` binary.

pub mod pipeline;
