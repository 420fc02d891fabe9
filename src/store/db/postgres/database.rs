use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::{
    Result,
    store::{DbCollection, DbStore, Store, data::*, map_db_err},
};

use super::{DbInit, collection::*, synclient::SynClient};

pub struct PostgresStore {
    flows: Arc<FlowCollection>,
}

impl DbStore for PostgresStore {
    fn init(
        &self,
        s: &Store,
    ) -> Result<()> {
        self.flows.init()?;

        s.register(self.flows());
        Ok(())
    }
}

impl PostgresStore {
    /// Connects to `db_url`, driving the pool on `runtime`.
    pub fn new(
        db_url: &str,
        runtime: Arc<Runtime>,
    ) -> Result<Self> {
        let conn = Arc::new(SynClient::connect(db_url, runtime).map_err(map_db_err)?);

        Ok(Self {
            flows: Arc::new(FlowCollection::new(&conn)),
        })
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow> + Send + Sync> {
        self.flows.clone()
    }
}
