//! Helpers for exercising table syncs without external services.

pub mod data;
pub mod faulty;
