//! # Chatflow
//!
//! Chatflow is a messenger conversation-flow engine written in Rust.
//! A flow is a directed graph of steps: each step sends a message and lists
//! the keywords that move the conversation on to another step.
//!
//! ## Core Features
//!
//! - **Flow Documents**: Ordered, explicitly-started step maps stored as JSON
//! - **Graph View**: Lossless conversion to nodes and edges for visual editing
//! - **Editor**: Atomic, validated mutations that keep document and graph in sync
//! - **Runtime**: Deterministic keyword matching with configurable no-match and terminal policies
//! - **Flow Metadata**: Description, status, channel and weekly schedule per stored flow
//! - **Pluggable Storage**: In-memory (testing), JSON files, and PostgreSQL
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chatflow::{EngineBuilder, Transition};
//!
//! let engine = EngineBuilder::new().build()?;
//!
//! let mut editor = engine.open_editor(engine.flow_id())?;
//! editor.add_step("A")?;
//! editor.update_step("A", "Hi", vec![Transition::new("1", "B")])?;
//! editor.add_step("B")?;
//! editor.update_message("B", "Bye")?;
//! engine.save(&editor)?;
//!
//! let outcome = engine.handle_message("conversation-1", "hello");
//! assert_eq!(outcome.reply.as_deref(), Some("Hi"));
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
mod events;
mod model;
mod utils;

pub mod editor;
pub mod graph;
pub mod runtime;
pub mod store;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{Config, DEFAULT_FLOW_ID, FileConfig, PostgresConfig, RuntimeConfig, StoreConfig, StoreType};
pub use editor::{FlowEditor, OptionField};
pub use engine::Engine;
pub use error::ChatflowError;
pub use events::{RuntimeEvent, RuntimeEventKind};
pub use graph::{GraphEdge, GraphModel, GraphNode, Position, flow_to_graph, graph_to_flow};
pub use model::*;
pub use runtime::{FlowRuntime, MatchMode, NoMatchPolicy, Outcome, OutcomeKind, TerminalPolicy};
pub use store::data::FlowSummary;

/// Result type alias for Chatflow operations.
pub type Result<T> = std::result::Result<T, ChatflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
