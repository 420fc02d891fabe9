mod flow;

pub use flow::{Flow, FlowSummary};
