//! Powder Player — ski session orchestration
//!
//! This crate provides the `SkiSession` runtime system, the `GameConfig`
//! TOML configuration, and the headless `SkiApp` loop behind `powder-sim`.

mod app;
pub mod config;
mod session;

pub use app::{Pilot, SkiApp};
pub use config::{GameConfig, SpawnConfig, TrailConfig};
pub use session::{SessionStats, SkiSession};
