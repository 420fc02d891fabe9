use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::{
    Config, Engine, Result, StoreType,
    config::{FileConfig, RuntimeConfig},
};

#[derive(Default)]
pub struct EngineBuilder {
    config: Config,
    rt: Option<Arc<Runtime>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn flow_id(
        mut self,
        flow_id: &str,
    ) -> Self {
        self.config.flow_id = flow_id.to_string();
        self
    }

    /// Store flows as JSON files under `dir`.
    pub fn file_store(
        mut self,
        dir: &str,
    ) -> Self {
        self.config.store.store_type = StoreType::File;
        self.config.store.file = Some(FileConfig {
            dir: dir.to_string(),
        });
        self
    }

    pub fn runtime_config(
        mut self,
        runtime: RuntimeConfig,
    ) -> Self {
        self.config.runtime = runtime;
        self
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.config.async_worker_thread_number = n;
        self
    }

    /// Drive the Postgres client on an existing tokio runtime.
    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    pub fn build(self) -> Result<Engine> {
        Engine::new(self.config, self.rt)
    }
}
