mod flow;

use std::sync::Arc;

use super::synclient::SynClient;

pub use flow::FlowCollection;

pub type DbConnection = Arc<SynClient>;
