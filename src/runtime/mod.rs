//! Conversation runtime: walks subscribers through a flow document.

mod flow;
mod interpreter;
mod matcher;
mod session;

pub use flow::FlowRuntime;
pub use interpreter::{Interpreter, NoMatchPolicy, Outcome, OutcomeKind, TerminalPolicy};
pub use matcher::MatchMode;
pub use session::{Session, SessionStore};
