//! Powder Runtime - Game loop infrastructure
//!
//! Provides the core game loop building blocks:
//! - `GameClock`: fixed-timestep accumulator with a capped frame delta
//! - `InputState`: key and touch tracking folded into a per-frame `ControlInput`
//! - `GameEvent` / `EventBus`: typed events and the bounded queue they wait in
//! - `RuntimeSystem`: lifecycle trait for systems ticked by the game loop

mod clock;
mod event;
mod event_bus;
mod input;
mod system;

pub use clock::{ClockConfig, GameClock};
pub use event::GameEvent;
pub use event_bus::EventBus;
pub use input::{ControlInput, InputState};
pub use system::RuntimeSystem;
