//! Agent team and task coordination engine.
//!
//! Agents publish team definitions to a teams directory (one JSON file per
//! team) and task lists to a tasks directory. This crate watches both,
//! debounces bursts of writes, parses the files tolerantly, reconciles them
//! into an in-memory team map and raises change events. It also links live
//! sessions (owned by an external registry) to team roles, either manually
//! or by guessing the lead session of a freshly detected team.
//!
//! [`TeamEngine`] is the entry point. It is poll-driven and single-threaded:
//! call [`TeamEngine::poll`] from your event loop.

pub mod config;
pub mod debounce;
pub mod engine;
pub mod errors;
pub mod linker;
pub mod logging;
pub mod parser;
pub mod reconciler;
pub mod registry;
pub mod scanner;
pub mod sink;
pub mod types;
pub mod watcher;

pub use config::EngineConfig;
pub use engine::TeamEngine;
pub use errors::{ConfigError, RegistryError, TeamsError};
pub use registry::{InMemorySessionRegistry, SessionRegistry};
pub use sink::{EventSink, FnSink};
pub use types::*;
pub use watcher::{FeedKind, WatchState};
