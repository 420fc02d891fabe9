//! Flow engine - the main entry point for Chatflow.
//!
//! The engine ties the pieces together:
//! - Loading and saving flow documents through the configured store
//! - Opening editors over stored flows
//! - Running conversations against the configured flow
//! - Publishing saved documents to the runtime

use std::sync::Arc;

use tokio::{
    runtime::{Builder, Runtime},
    sync::broadcast,
};
use tracing::{debug, warn};

use crate::{
    ChatflowError, Config, Result, StoreType,
    editor::FlowEditor,
    events::RuntimeEvent,
    model::{FlowDocument, FlowMeta, Validation},
    runtime::{FlowRuntime, Outcome},
    store::{DbStore, FileStore, MemStore, PostgresStore, Store, data::FlowSummary},
};

/// The main flow engine.
///
/// Engine is the central coordinator for Chatflow, responsible for:
/// - Storing flow documents
/// - Handing out editors and persisting their documents
/// - Driving conversations through the flow named by `flow_id`
///
/// # Example
///
/// ```rust,ignore
/// let engine = Engine::new_with_config(Config::default())?;
///
/// let mut editor = engine.open_editor("default")?;
/// editor.add_step("welcome")?;
/// editor.update_message("welcome", "Hi! Reply 1 for billing")?;
/// engine.save(&editor)?;
///
/// let outcome = engine.handle_message("whatsapp:+15550100", "hello");
/// ```
pub struct Engine {
    config: Config,
    /// Persistent storage for flow documents.
    store: Arc<Store>,
    /// Conversation runtime for the configured flow.
    runtime: Arc<FlowRuntime>,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    ///
    /// This initializes the storage backend and loads the configured flow
    /// into the runtime.
    pub fn new_with_config(config: Config) -> Result<Self> {
        Self::new(config, None)
    }

    pub(crate) fn new(
        config: Config,
        rt: Option<Arc<Runtime>>,
    ) -> Result<Self> {
        config.check()?;
        let store = Store::new();
        let db: Box<dyn DbStore> = match config.store.store_type {
            StoreType::Mem => Box::new(MemStore::new()),
            StoreType::File => {
                let file = config.store.file.as_ref().ok_or_else(|| ChatflowError::Config("[store.file] is required when store_type is file".into()))?;
                Box::new(FileStore::new(&file.dir))
            }
            StoreType::Postgres => {
                let postgres = config
                    .store
                    .postgres
                    .as_ref()
                    .ok_or_else(|| ChatflowError::Config("[store.postgres] is required when store_type is postgres".into()))?;
                let rt = match rt {
                    Some(rt) => rt,
                    None => Arc::new(
                        Builder::new_multi_thread()
                            .worker_threads(config.async_worker_thread_number.into())
                            .enable_all()
                            .build()
                            .map_err(|e| ChatflowError::Engine(format!("failed to build tokio runtime: {}", e)))?,
                    ),
                };
                Box::new(PostgresStore::new(&postgres.database_url, rt)?)
            }
        };
        db.init(&store)?;

        let doc = store.load_flow(&config.flow_id)?;
        debug!("engine: flow {} loaded with {} steps", config.flow_id, doc.len());
        let runtime = Arc::new(FlowRuntime::new(doc, &config.runtime));

        Ok(Self {
            config,
            store: Arc::new(store),
            runtime,
        })
    }

    /// Id of the flow conversations run against.
    pub fn flow_id(&self) -> &str {
        &self.config.flow_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads a flow; a flow never saved loads as an empty document.
    pub fn load_flow(
        &self,
        flow_id: &str,
    ) -> Result<FlowDocument> {
        self.store.load_flow(flow_id)
    }

    /// Opens an editor over the stored flow.
    pub fn open_editor(
        &self,
        flow_id: &str,
    ) -> Result<FlowEditor> {
        Ok(FlowEditor::open(flow_id, self.load_flow(flow_id)?))
    }

    /// Saves the editor's document under the flow it was opened on; an
    /// editor not opened on a stored flow saves as the configured flow.
    pub fn save(
        &self,
        editor: &FlowEditor,
    ) -> Result<Validation> {
        self.save_as(editor.flow_id().unwrap_or(self.config.flow_id.as_str()), editor.document())
    }

    /// Saves `doc` under `flow_id`, replacing the stored document.
    ///
    /// Validation issues are logged and returned but never block the save.
    /// Saving the configured flow publishes it to the runtime.
    pub fn save_as(
        &self,
        flow_id: &str,
        doc: &FlowDocument,
    ) -> Result<Validation> {
        let validation = doc.validate();
        for issue in validation.issues() {
            warn!("engine::save({}): {}", flow_id, issue);
        }
        if doc.is_executable() {
            for id in doc.unreachable_steps() {
                warn!("engine::save({}): step {} is unreachable from the start step", flow_id, id);
            }
        }

        self.store.save_flow(flow_id, doc)?;
        if flow_id == self.config.flow_id {
            self.runtime.reload(doc.clone());
        }
        Ok(validation)
    }

    /// Deletes a stored flow. Deleting the configured flow leaves the runtime
    /// with an empty, non-executable document.
    pub fn delete_flow(
        &self,
        flow_id: &str,
    ) -> Result<bool> {
        let deleted = self.store.delete_flow(flow_id)?;
        if deleted && flow_id == self.config.flow_id {
            self.runtime.reload(FlowDocument::new());
        }
        Ok(deleted)
    }

    /// Every stored flow with its metadata, ordered by id.
    pub fn list_flows(&self) -> Result<Vec<FlowSummary>> {
        self.store.list_flows()
    }

    pub fn flow_meta(
        &self,
        flow_id: &str,
    ) -> Result<Option<FlowMeta>> {
        self.store.flow_meta(flow_id)
    }

    /// Sets the description, status, channel and schedule of a flow. The
    /// document and the runtime are left alone.
    pub fn save_flow_meta(
        &self,
        flow_id: &str,
        meta: &FlowMeta,
    ) -> Result<()> {
        self.store.save_flow_meta(flow_id, meta)
    }

    /// Runs one inbound message through the configured flow.
    pub fn handle_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Outcome {
        self.runtime.handle(conversation_id, text)
    }

    pub fn runtime(&self) -> Arc<FlowRuntime> {
        self.runtime.clone()
    }

    /// Subscribes to runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.runtime.subscribe()
    }
}
