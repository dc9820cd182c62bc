//! Powder ECS - Scene registry with stable IDs
//!
//! Wraps hecs with stable `EntityId`s so terrain chunks, scatter props and
//! the skier can be addressed for later removal. Components are plain Rust
//! types resolved at compile time; there is no string-keyed lookup.

mod world;

pub use world::SceneWorld;
