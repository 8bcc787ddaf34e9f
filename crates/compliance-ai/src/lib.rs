//! Compliance review pipeline for clinical documents.
//!
//! The [`review`] module carries the request pipeline: a reference catalogue
//! and matcher, provider adapters behind the [`review::ComplianceProvider`]
//! capability, and the orchestrating [`review::ComplianceReviewService`].
//! Configuration and telemetry live beside it so the service crate only has
//! to wire the pieces together.

pub mod config;
pub mod error;
pub mod review;
pub mod telemetry;
