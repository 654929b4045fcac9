//! Shared API plumbing used by every HTTP endpoint.

pub mod common;
