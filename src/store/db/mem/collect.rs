use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

use tracing::trace;

use crate::{
    ChatflowError, Result,
    store::{DbCollection, db::mem::DbDocument},
};

/// In-memory collection keyed by record id.
#[derive(Debug)]
pub(crate) struct Collect<T> {
    name: String,
    items: RwLock<BTreeMap<String, T>>,
}

impl<T> Collect<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Send + Sync,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("mem::{}::exists({})", self.name, id);
        Ok(self.items.read().unwrap_or_else(PoisonError::into_inner).contains_key(id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        trace!("mem::{}::find({})", self.name, id);
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ChatflowError::Store(format!("{} '{}' not found", self.name, id)))
    }

    fn list(&self) -> Result<Vec<Self::Item>> {
        Ok(self.items.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect())
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("mem::{}::create({})", self.name, data.id());
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.contains_key(data.id()) {
            return Err(ChatflowError::Store(format!("{} '{}' already exists", self.name, data.id())));
        }
        items.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("mem::{}::update({})", self.name, data.id());
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.get_mut(data.id()) {
            Some(item) => {
                *item = data.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("mem::{}::delete({})", self.name, id);
        Ok(self.items.write().unwrap_or_else(PoisonError::into_inner).remove(id).is_some())
    }
}
