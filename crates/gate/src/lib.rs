//! Capability gate for murmur.
//!
//! The single answer to "is this action allowed right now". The gate learns
//! the account's tier and monthly usage from the platform's usage endpoint
//! through a [`UsageProbe`], and answers admission and quota questions from
//! the last known state.
//!
//! Before the first successful detection every check is permissive. Once a
//! monthly cap is confirmed reached the gate pauses publishing until an
//! explicit [`CapabilityGate::resume`].

pub mod gate;
pub mod probe;

pub use gate::{Admission, CapabilityGate, GateStatus, RefreshOutcome};
pub use probe::{HttpUsageProbe, ProbeOutcome, UsageProbe, UsageSnapshot};
