//! The three-stage recommendation pipeline: search → analysis → critique.

pub mod analyze;
pub mod bridge;
pub mod critic;
pub mod extract;
pub mod pipeline;
pub mod roles;
pub mod search;
pub mod tools;

pub use pipeline::{Advisor, TurnReport};
