use serde::{Deserialize, Serialize};

use crate::{
    model::FlowMeta,
    store::{DbCollectionIden, StoreIden},
};

/// Stored row of a flow document.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    /// the document in its canonical JSON shape
    pub data: String,
    #[serde(default)]
    pub meta: Option<FlowMeta>,
    pub create_time: i64,
    pub update_time: i64,
}

impl DbCollectionIden for Flow {
    fn iden() -> StoreIden {
        StoreIden::Flows
    }
}

/// Flow list entry: a stored flow without its document.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FlowSummary {
    pub id: String,
    pub meta: Option<FlowMeta>,
    pub create_time: i64,
    pub update_time: i64,
}

impl From<Flow> for FlowSummary {
    fn from(flow: Flow) -> Self {
        Self {
            id: flow.id,
            meta: flow.meta,
            create_time: flow.create_time,
            update_time: flow.update_time,
        }
    }
}
