//! Directory-backed store: one `<flow_id>.json` file per flow.
//!
//! The file holds only the document, pretty-printed with two-space indent,
//! so it can be edited by hand and read by older consumers. List metadata,
//! when set, lives next to it in `<flow_id>.meta.json`. Create and update
//! times come from the document file's metadata.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::NamedTempFile;
use tracing::trace;

use crate::{
    ChatflowError, Result,
    store::{DbCollection, DbStore, Store, data::Flow, map_db_err},
    utils,
};

const EXTENSION: &str = "json";
const META_SUFFIX: &str = ".meta";

#[derive(Debug, Clone)]
pub struct FileStore {
    flows: Arc<FlowFiles>,
}

impl DbStore for FileStore {
    fn init(
        &self,
        s: &Store,
    ) -> Result<()> {
        fs::create_dir_all(&self.flows.dir).map_err(map_db_err)?;
        s.register(self.flows());
        Ok(())
    }
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            flows: Arc::new(FlowFiles {
                dir: dir.as_ref().to_path_buf(),
            }),
        }
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow> + Send + Sync> {
        self.flows.clone()
    }
}

#[derive(Debug)]
struct FlowFiles {
    dir: PathBuf,
}

impl FlowFiles {
    fn path(
        &self,
        id: &str,
    ) -> Result<PathBuf> {
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) || id.ends_with(META_SUFFIX) {
            return Err(ChatflowError::Store(format!("invalid flow id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.{}", id, EXTENSION)))
    }

    fn meta_path(
        &self,
        id: &str,
    ) -> Result<PathBuf> {
        self.path(id)?;
        Ok(self.dir.join(format!("{}{}.{}", id, META_SUFFIX, EXTENSION)))
    }

    fn read(
        &self,
        id: &str,
        path: &Path,
    ) -> Result<Flow> {
        let data = fs::read_to_string(path).map_err(map_db_err)?;
        let stat = fs::metadata(path).map_err(map_db_err)?;
        let update_time = stat.modified().map(utils::time::system_time_millis).unwrap_or_default();
        let create_time = stat.created().map(utils::time::system_time_millis).unwrap_or(update_time);
        let meta = match fs::read_to_string(self.meta_path(id)?) {
            Ok(text) => Some(serde_json::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(map_db_err(err)),
        };
        Ok(Flow {
            id: id.to_string(),
            data,
            meta,
            create_time,
            update_time,
        })
    }

    /// Writes to a uniquely named file in the same directory and renames it
    /// over `path`, so readers never see a partial file.
    fn write_atomic(
        &self,
        path: &Path,
        bytes: &[u8],
    ) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(map_db_err)?;
        tmp.write_all(bytes).map_err(map_db_err)?;
        tmp.persist(path).map_err(map_db_err)?;
        Ok(())
    }

    fn write(
        &self,
        data: &Flow,
    ) -> Result<()> {
        let path = self.path(&data.id)?;
        let meta_path = self.meta_path(&data.id)?;
        match &data.meta {
            Some(meta) => self.write_atomic(&meta_path, serde_json::to_string_pretty(meta)?.as_bytes())?,
            None => {
                remove_if_exists(&meta_path)?;
            }
        }
        self.write_atomic(&path, data.data.as_bytes())
    }
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(map_db_err(err)),
    }
}

impl DbCollection for FlowFiles {
    type Item = Flow;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        Ok(self.path(id)?.is_file())
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        trace!("file::flows::find({})", id);
        let path = self.path(id)?;
        self.read(id, &path)
    }

    fn list(&self) -> Result<Vec<Self::Item>> {
        let mut flows = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(map_db_err)? {
            let path = entry.map_err(map_db_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(id) if !id.starts_with('.') && !id.ends_with(META_SUFFIX) => flows.push(self.read(id, &path)?),
                _ => {}
            }
        }
        flows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(flows)
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("file::flows::create({})", data.id);
        if self.exists(&data.id)? {
            return Err(ChatflowError::Store(format!("flow '{}' already exists", data.id)));
        }
        self.write(data)?;
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("file::flows::update({})", data.id);
        if !self.exists(&data.id)? {
            return Ok(false);
        }
        self.write(data)?;
        Ok(true)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("file::flows::delete({})", id);
        let path = self.path(id)?;
        if !path.is_file() {
            return Ok(false);
        }
        remove_if_exists(&self.meta_path(id)?)?;
        remove_if_exists(&path)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::model::{Channel, FlowDocument, FlowMeta, Step};

    fn store(dir: &Path) -> Store {
        let store = Store::new();
        FileStore::new(dir).init(&store).unwrap();
        store
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_save_writes_pretty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let doc = FlowDocument::new().with_step("A", Step::new("Hi").with_option("1", "B")).with_step("B", Step::new("Bye"));
        store.save_flow("default", &doc).unwrap();

        let text = fs::read_to_string(dir.path().join("default.json")).unwrap();
        assert!(text.starts_with("{\n  \"startStepId\": \"A\""));
        assert_eq!(store.load_flow("default").unwrap(), doc);
        assert_eq!(file_names(dir.path()), vec!["default.json"]);
    }

    #[test]
    fn test_hand_written_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.json"), r#"{ "start": { "message": "Welcome", "options": [ { "keyword": "1", "next": "end" } ] }, "end": { "message": "Bye" } }"#).unwrap();

        let doc = store(dir.path()).load_flow("default").unwrap();
        assert_eq!(doc.start(), Some("start"));
        assert_eq!(doc.step("end").unwrap().message, "Bye");
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let doc = FlowDocument::new().with_step("A", Step::new("Hi"));
        store.save_flow("sales", &doc).unwrap();
        store.save_flow("default", &doc).unwrap();
        store.save_flow_meta("sales", &FlowMeta::new("Sales bot", Channel::Facebook)).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let ids: Vec<String> = store.list_flows().unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["default".to_string(), "sales".to_string()]);
        assert!(store.delete_flow("sales").unwrap());
        assert!(!store.delete_flow("sales").unwrap());
        assert!(store.load_flow("sales").unwrap().is_empty());
        assert_eq!(file_names(dir.path()), vec!["default.json", "notes.txt"]);
    }

    #[test]
    fn test_meta_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let doc = FlowDocument::new().with_step("A", Step::new("Hi"));
        store.save_flow("default", &doc).unwrap();
        store.save_flow_meta("default", &FlowMeta::new("Front desk", Channel::WhatsApp)).unwrap();

        // the document file stays a plain document
        assert_eq!(FlowDocument::from_json(&fs::read_to_string(dir.path().join("default.json")).unwrap()).unwrap(), doc);
        let sidecar = fs::read_to_string(dir.path().join("default.meta.json")).unwrap();
        assert!(sidecar.contains("\"description\": \"Front desk\""));

        // a fresh store over the same directory sees the metadata
        let reopened = self::store(dir.path());
        assert_eq!(reopened.flow_meta("default").unwrap().map(|m| m.channel), Some(Channel::WhatsApp));
        assert!(matches!(reopened.save_flow("default.meta", &doc), Err(ChatflowError::Store(_))));
    }

    #[test]
    fn test_concurrent_saves() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..20 {
                        let doc = FlowDocument::new().with_step("A", Step::new(format!("{}-{}", t, i)));
                        store.save_flow("default", &doc).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let doc = store.load_flow("default").unwrap();
        assert!(doc.step("A").unwrap().message.ends_with("-19"));
        assert_eq!(file_names(dir.path()), vec!["default.json"]);
    }

    #[test]
    fn test_invalid_flow_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let doc = FlowDocument::new().with_step("A", Step::new("Hi"));
        assert!(matches!(store.save_flow("../escape", &doc), Err(ChatflowError::Store(_))));
        assert!(matches!(store.save_flow("a/b", &doc), Err(ChatflowError::Store(_))));
    }
}
