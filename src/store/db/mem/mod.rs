mod collect;
mod r#impl;

use std::sync::Arc;

use crate::{
    Result,
    store::{DbCollection, DbStore, Store, data::*},
};
use collect::Collect;

#[derive(Debug, Clone)]
pub struct MemStore {
    flows: Arc<Collect<Flow>>,
}

pub(crate) trait DbDocument: Clone {
    fn id(&self) -> &str;
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) -> Result<()> {
        s.register(self.flows());
        Ok(())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            flows: Arc::new(Collect::new("flows")),
        }
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow> + Send + Sync> {
        self.flows.clone()
    }
}
