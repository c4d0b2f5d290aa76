//! Candor Core - realtime interview-analysis engine.
//!
//! This crate provides the core functionality for Candor, a system that
//! ingests a live candidate interview (video frames + PCM audio) over a
//! bidirectional event socket, runs four inference modalities on a rotating
//! schedule, fuses their outputs into periodic binary samples, and folds a
//! closed session's samples into weighted final scores. It is designed to be
//! used by both the standalone headless server and embedders.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`media`]: Intake queues and the sliding audio buffer
//! - [`detect`]: Detector contracts and the heuristic implementations
//! - [`analysis`]: The per-session scheduler, canonicalizer, and publisher
//! - [`session`]: Session lifecycle and the process-wide registry
//! - [`scoring`]: Job-role weights, final scores, and summaries
//! - [`events`]: Event system for real-time client communication
//! - [`store`]: Persistence contract and the in-memory backend
//! - [`api`]: HTTP/WebSocket surface
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from external
//! collaborators:
//!
//! - [`Store`](store::Store): Persistence backend
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - The detector traits in [`detect`]: swapping in model-backed inference
//!
//! Each trait has a default implementation suitable for the standalone
//! server.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod api;
pub mod bootstrap;
pub mod detect;
pub mod error;
pub mod events;
pub mod media;
pub mod protocol_constants;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod state;
pub mod store;
pub mod utils;

// Re-export commonly used types at the crate root
pub use analysis::{canonicalize, ModalityStates, Sample, SamplePublisher, Stamped};
pub use bootstrap::{bootstrap_services, bootstrap_services_with_store, BootstrappedServices};
pub use detect::{ConfidenceLevel, DetectorSet, Emotion, StressLevel};
pub use error::{CandorError, CandorResult, ErrorCode};
pub use events::{
    AnalysisEvent, BroadcastEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter,
    NoopEventEmitter, SessionEvent,
};
pub use media::{AudioChunk, AudioWindow, MediaIntake, VideoFrame};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use scoring::{Aggregator, FinalScore, JobRole, JobRoleWeights, SessionSummary};
pub use session::{SessionContext, SessionManager, SessionState, SessionView};
pub use state::{Config, EngineConfig};
pub use store::{MemoryStore, Store, StoreError};
pub use utils::now_millis;

// Re-export API types
pub use api::{start_server, AppState, ServerError, WsConnectionManager};
