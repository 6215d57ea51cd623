//! Head-turn liveness capture and KYC intake.
//!
//! The crate is split by concern. Each concern keeps its traits and value
//! types under `domain` and its I/O-bound implementations under
//! `infrastructure`; `pipeline` wires them into runnable sessions and use
//! cases.

pub mod detection;
pub mod kyc;
pub mod liveness;
pub mod pipeline;
pub mod shared;
pub mod video;
