use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{trace, warn};

use crate::{
    ChatflowError, Result, ShareLock,
    model::{FlowDocument, FlowMeta},
    utils,
};

use super::{DbCollection, DbCollectionIden, data::*};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

/// Registry of the collections a backend provides.
pub struct Store {
    collections: ShareLock<HashMap<super::StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn collection<DATA>(&self) -> Result<Arc<dyn DbCollection<Item = DATA>>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);

        collections
            .get(&DATA::iden())
            .and_then(|collection| collection.downcast_ref::<DynDbSetRef<DATA>>())
            .map(|v| v.0.clone())
            .ok_or_else(|| ChatflowError::Store(format!("fail to get collection: {}", DATA::iden().as_ref())))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn flows(&self) -> Result<Arc<dyn DbCollection<Item = Flow>>> {
        self.collection()
    }

    /// Writes `doc` under `id`, replacing whatever was stored before.
    /// Metadata already stored for the flow is kept.
    pub fn save_flow(
        &self,
        id: &str,
        doc: &FlowDocument,
    ) -> Result<()> {
        trace!("store::save_flow({})", id);
        let text = doc.to_json_pretty()?;
        self.upsert(id, |prev| {
            let now = utils::time::time_millis();
            Flow {
                id: id.to_string(),
                data: text.clone(),
                meta: prev.and_then(|p| p.meta.clone()),
                create_time: prev.map_or(now, |p| p.create_time),
                update_time: now,
            }
        })
    }

    /// Sets the list metadata of flow `id`. A flow not stored yet is
    /// created with an empty document.
    pub fn save_flow_meta(
        &self,
        id: &str,
        meta: &FlowMeta,
    ) -> Result<()> {
        trace!("store::save_flow_meta({})", id);
        meta.check()?;
        let empty = FlowDocument::new().to_json_pretty()?;
        self.upsert(id, |prev| {
            let now = utils::time::time_millis();
            Flow {
                id: id.to_string(),
                data: prev.map_or_else(|| empty.clone(), |p| p.data.clone()),
                meta: Some(meta.clone()),
                create_time: prev.map_or(now, |p| p.create_time),
                update_time: now,
            }
        })
    }

    /// Reads the flow stored under `id`; a flow never saved loads empty.
    pub fn load_flow(
        &self,
        id: &str,
    ) -> Result<FlowDocument> {
        trace!("store::load_flow({})", id);
        let flows = self.flows()?;
        if !flows.exists(id)? {
            warn!("store::load_flow: flow {} not found, starting empty", id);
            return Ok(FlowDocument::new());
        }
        FlowDocument::from_json(&flows.find(id)?.data)
    }

    pub fn flow_meta(
        &self,
        id: &str,
    ) -> Result<Option<FlowMeta>> {
        let flows = self.flows()?;
        if !flows.exists(id)? {
            return Ok(None);
        }
        Ok(flows.find(id)?.meta)
    }

    pub fn delete_flow(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("store::delete_flow({})", id);
        self.flows()?.delete(id)
    }

    /// Every stored flow, ordered by id.
    pub fn list_flows(&self) -> Result<Vec<FlowSummary>> {
        Ok(self.flows()?.list()?.into_iter().map(FlowSummary::from).collect())
    }

    /// Creates or updates the row of flow `id` with the one `build` derives
    /// from the stored row, if any.
    fn upsert(
        &self,
        id: &str,
        build: impl Fn(Option<&Flow>) -> Flow,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(ChatflowError::Store("missing flow id".into()));
        }
        let flows = self.flows()?;
        if flows.exists(id)? {
            let prev = flows.find(id)?;
            return Self::replace(flows.as_ref(), &build(Some(&prev)));
        }

        match flows.create(&build(None)) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ChatflowError::Store(format!("flow '{}' was not created", id))),
            // another writer created it first
            Err(err) if flows.exists(id)? => {
                trace!("store::upsert({}): create lost a race ({}), updating", id, err);
                let prev = flows.find(id)?;
                Self::replace(flows.as_ref(), &build(Some(&prev)))
            }
            Err(err) => Err(err),
        }
    }

    fn replace(
        flows: &dyn DbCollection<Item = Flow>,
        data: &Flow,
    ) -> Result<()> {
        if flows.update(data)? {
            Ok(())
        } else {
            Err(ChatflowError::Store(format!("flow '{}' was deleted while saving", data.id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::{
        model::{Channel, FlowStatus, Step},
        store::{DbStore, MemStore},
    };

    fn store() -> Store {
        let store = Store::new();
        MemStore::new().init(&store).unwrap();
        store
    }

    fn ids(store: &Store) -> Vec<String> {
        store.list_flows().unwrap().into_iter().map(|f| f.id).collect()
    }

    /// Flows whose rows disappear between `find` and `update`.
    struct VanishingFlows;

    impl DbCollection for VanishingFlows {
        type Item = Flow;

        fn exists(
            &self,
            _id: &str,
        ) -> Result<bool> {
            Ok(true)
        }

        fn find(
            &self,
            id: &str,
        ) -> Result<Flow> {
            Ok(Flow {
                id: id.to_string(),
                data: "{}".into(),
                meta: None,
                create_time: 0,
                update_time: 0,
            })
        }

        fn list(&self) -> Result<Vec<Flow>> {
            Ok(vec![])
        }

        fn create(
            &self,
            _data: &Flow,
        ) -> Result<bool> {
            Ok(true)
        }

        fn update(
            &self,
            _data: &Flow,
        ) -> Result<bool> {
            Ok(false)
        }

        fn delete(
            &self,
            _id: &str,
        ) -> Result<bool> {
            Ok(false)
        }
    }

    /// Flows where another writer creates the row just before our `create`.
    struct RacingFlows {
        inner: Arc<dyn DbCollection<Item = Flow>>,
        raced: AtomicBool,
    }

    impl DbCollection for RacingFlows {
        type Item = Flow;

        fn exists(
            &self,
            id: &str,
        ) -> Result<bool> {
            self.inner.exists(id)
        }

        fn find(
            &self,
            id: &str,
        ) -> Result<Flow> {
            self.inner.find(id)
        }

        fn list(&self) -> Result<Vec<Flow>> {
            self.inner.list()
        }

        fn create(
            &self,
            data: &Flow,
        ) -> Result<bool> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner.create(&Flow {
                    data: "{}".into(),
                    meta: Some(FlowMeta::new("created elsewhere", Channel::Telegram)),
                    create_time: 1,
                    ..data.clone()
                })?;
            }
            self.inner.create(data)
        }

        fn update(
            &self,
            data: &Flow,
        ) -> Result<bool> {
            self.inner.update(data)
        }

        fn delete(
            &self,
            id: &str,
        ) -> Result<bool> {
            self.inner.delete(id)
        }
    }

    #[test]
    fn test_load_missing_flow_is_empty() {
        let doc = store().load_flow("default").unwrap();
        assert!(doc.is_empty());
        assert!(doc.start().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let store = store();
        let doc = FlowDocument::new().with_step("A", Step::new("Hi").with_option("1", "B")).with_step("B", Step::new("Bye"));
        store.save_flow("default", &doc).unwrap();
        assert_eq!(store.load_flow("default").unwrap(), doc);
    }

    #[test]
    fn test_last_save_wins() {
        let store = store();
        let first = FlowDocument::new().with_step("A", Step::new("first"));
        let second = FlowDocument::new().with_step("A", Step::new("second"));
        store.save_flow("default", &first).unwrap();
        let created = store.flows().unwrap().find("default").unwrap().create_time;

        store.save_flow("default", &second).unwrap();
        assert_eq!(store.load_flow("default").unwrap(), second);
        assert_eq!(store.flows().unwrap().find("default").unwrap().create_time, created);
    }

    #[test]
    fn test_legacy_document_loads_with_start() {
        let store = store();
        let legacy = Flow {
            id: "old".into(),
            data: r#"{"welcome":{"message":"Hi","options":[{"keyword":"1","next":"bye"}]},"bye":{"message":"Bye"}}"#.into(),
            meta: None,
            create_time: 0,
            update_time: 0,
        };
        store.flows().unwrap().create(&legacy).unwrap();

        let doc = store.load_flow("old").unwrap();
        assert_eq!(doc.start(), Some("welcome"));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_list_and_delete() {
        let store = store();
        let doc = FlowDocument::new().with_step("A", Step::new("Hi"));
        store.save_flow("b", &doc).unwrap();
        store.save_flow("a", &doc).unwrap();
        assert_eq!(ids(&store), vec!["a".to_string(), "b".to_string()]);

        assert!(store.delete_flow("a").unwrap());
        assert!(!store.delete_flow("a").unwrap());
        assert_eq!(ids(&store), vec!["b".to_string()]);
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(matches!(store().save_flow("", &FlowDocument::new()), Err(ChatflowError::Store(_))));
    }

    #[test]
    fn test_unregistered_collection() {
        assert!(matches!(Store::new().flows(), Err(ChatflowError::Store(_))));
    }

    #[test]
    fn test_flow_deleted_while_saving() {
        let store = Store::new();
        store.register::<Flow>(Arc::new(VanishingFlows));

        let doc = FlowDocument::new().with_step("A", Step::new("Hi"));
        let err = store.save_flow("default", &doc).unwrap_err();
        assert!(matches!(err, ChatflowError::Store(ref msg) if msg.contains("deleted")));
    }

    #[test]
    fn test_concurrent_create_falls_back_to_update() {
        let mem = store();
        let store = Store::new();
        store.register::<Flow>(Arc::new(RacingFlows {
            inner: mem.flows().unwrap(),
            raced: AtomicBool::new(false),
        }));

        let doc = FlowDocument::new().with_step("A", Step::new("mine"));
        store.save_flow("default", &doc).unwrap();

        let row = mem.flows().unwrap().find("default").unwrap();
        assert_eq!(FlowDocument::from_json(&row.data).unwrap(), doc);
        // the other writer's row was updated, not replaced
        assert_eq!(row.create_time, 1);
        assert_eq!(row.meta.map(|m| m.description), Some("created elsewhere".to_string()));
    }

    #[test]
    fn test_flow_meta() {
        let store = store();
        assert_eq!(store.flow_meta("default").unwrap(), None);

        // metadata first creates an empty flow
        let mut meta = FlowMeta::new("Support desk", Channel::Web);
        store.save_flow_meta("default", &meta).unwrap();
        assert!(store.load_flow("default").unwrap().is_empty());
        assert_eq!(store.flow_meta("default").unwrap(), Some(meta.clone()));

        // saving the document keeps the metadata and the other way round
        let doc = FlowDocument::new().with_step("A", Step::new("Hi"));
        store.save_flow("default", &doc).unwrap();
        meta.status = FlowStatus::Inactive;
        store.save_flow_meta("default", &meta).unwrap();
        assert_eq!(store.load_flow("default").unwrap(), doc);

        let list = store.list_flows().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "default");
        assert_eq!(list[0].meta, Some(meta));
    }

    #[test]
    fn test_invalid_meta_not_saved() {
        let store = store();
        let err = store.save_flow_meta("default", &FlowMeta::new("", Channel::Api)).unwrap_err();
        assert!(matches!(err, ChatflowError::InvalidMeta(_)));
        assert!(ids(&store).is_empty());
    }
}
