//! Powder Core - Foundational types for the powder ski sandbox
//!
//! This crate provides the core types that all other powder crates depend on:
//! - `EntityId` - Stable identifiers for objects handed to the scene registry
//! - `Transform`, `Vec3` - Spatial types with guarded normalization
//! - Error types and Result alias

mod error;
mod id;
mod types;

pub use error::{PowderError, Result};
pub use id::EntityId;
pub use types::{Transform, Vec3};
