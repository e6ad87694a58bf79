//! Gruescope: game-state introspection for Z-machine interactive fiction.
//!
//! Sits between a bytecode interpreter and a consumer such as a learning
//! agent. Each supported story gets a [`GameAdapter`] describing where its
//! score, move counter and player object live; an [`Episode`] drives the
//! interpreter one command at a time and reports score, termination, cleaned
//! text and the object-tree changes since the previous turn.

#[macro_use]
extern crate lazy_static;

pub mod adapter;
pub mod config;
pub mod diff;
pub mod error;
pub mod games;
pub mod header;
pub mod interpreter;
pub mod memory;
pub mod observer;
pub mod registry;
pub mod snapshot;
pub mod test_utils;

pub use adapter::{GameAdapter, GameAdapterBuilder, ScoreLocation};
pub use diff::{world_diff, ChangeEvent};
pub use error::{IntrospectError, Outcome, RangeKind, Result};
pub use interpreter::{Interpreter, StoryLoader};
pub use memory::{MemoryAccessor, MemoryView, WorldObject};
pub use observer::{Driver, Episode, EpisodeState, StepResult};
pub use registry::{AdapterRegistry, GameId};
pub use snapshot::ObjectSnapshot;
