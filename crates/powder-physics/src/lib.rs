//! Powder Physics - Rapier 3D integration and skier control
//!
//! - `PhysicsWorld` — wraps the Rapier pipeline, body/collider sets, and ray queries
//! - `PhysicsHost` — owns chunk colliders, props, and the skier body for the terrain store
//! - `probe` — single-ray and ring ground probes with normal smoothing
//! - `SkierController` — slope-aligned steering, drive, drag, jump, and boost
//! - `sync` — pose write-back and collision event translation

pub mod body;
pub mod host;
pub mod probe;
pub mod skier;
pub mod sync;
pub mod world;

pub use body::{GroundQuery, RapierBody, SkierBody};
pub use host::{ChunkTag, PhysicsBody, PhysicsHost, PropTag, Skier, SkierBodyConfig};
pub use probe::{probe, NormalSmoother, ProbeConfig, ProbeMode, ProbeResult};
pub use skier::{
    boost_impulse, jump_impulse, ControlMode, FrameTelemetry, Penetration, SkierController,
    SkierState, SkierTuning,
};
pub use world::{PhysicsWorld, QueryLayer, RayHit};
