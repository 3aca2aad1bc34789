//! Admission control: who may submit, and how many tasks may be pending.

pub mod admission;
pub mod rate;

pub use admission::{AdmissionQueue, AdmissionSnapshot, QueueFull};
pub use rate::{RateDecision, RateLimiter};
