//! Interactive refinement module
//!
//! This module drives the operator-facing part of an analysis:
//! - Collaborator traits for controls, display and persistence
//! - The refinement state machine
//! - Scripted collaborators for headless runs
//! - A file-backed result sink

pub mod controls;
pub mod scripted;
pub mod session;
pub mod sink;

pub use controls::{ActionPoll, Display, OperatorAction, ParameterSource, RawParameters, ResultSink};
pub use scripted::{MemorySink, NullDisplay, RecordingDisplay, ScriptedActions, ScriptedParameters};
pub use session::{CycleSummary, LoopState, RefinementLoop, SessionReport, TickOutcome};
pub use sink::FileResultSink;
