use crate::store::{data::Flow, db::mem::DbDocument};

impl DbDocument for Flow {
    fn id(&self) -> &str {
        &self.id
    }
}
