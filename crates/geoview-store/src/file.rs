// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use geoview_sql::QueryDefinition;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{QueryKey, QueryStore, StoreError, StoredQuery, stored_query::Queries};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Document {
    version: u32,
    queries: Vec<StoredQuery>,
}

/// Keeps all queries in one JSON document. Every change rewrites the document through a temporary
/// file in the same directory, so readers see either the old or the new document.
pub struct FileQueryStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileQueryStore {
    /// A store at `path`. The file is created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Queries, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Queries::default()),
            Err(e) => return Err(e.into()),
        };

        let document: Document = serde_json::from_str(&content)?;
        Ok(Queries::from_list(document.queries))
    }

    fn write(&self, queries: &Queries) -> Result<(), StoreError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(directory)?;

        let document = Document {
            version: FORMAT_VERSION,
            queries: queries.to_list(),
        };

        let mut file = NamedTempFile::new_in(directory)?;
        serde_json::to_writer_pretty(&mut file, &document)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), "Wrote query store");
        Ok(())
    }

    fn modify<T>(
        &self,
        change: impl FnOnce(&mut Queries) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut queries = self.load()?;
        let result = change(&mut queries)?;
        self.write(&queries)?;
        Ok(result)
    }
}

impl QueryStore for FileQueryStore {
    fn save(&self, definition: QueryDefinition) -> Result<StoredQuery, StoreError> {
        self.modify(|queries| queries.save(definition))
    }

    fn list(&self, schema: Option<&str>) -> Result<Vec<StoredQuery>, StoreError> {
        Ok(self.load()?.list(schema))
    }

    fn get(&self, key: &QueryKey) -> Result<Option<StoredQuery>, StoreError> {
        Ok(self.load()?.get(key))
    }

    fn delete(&self, key: &QueryKey) -> Result<bool, StoreError> {
        self.modify(|queries| Ok(queries.delete(key)))
    }
}

#[cfg(test)]
mod tests {
    use geoview_sql::query::{AggregateFunction, SelectColumn};

    use super::*;

    fn definition() -> QueryDefinition {
        QueryDefinition {
            name: Some("population_by_name".into()),
            columns: vec![
                SelectColumn::plain("name"),
                SelectColumn::aggregated("population", AggregateFunction::Sum, Some("total_pop")),
            ],
            group_by: vec!["name".into()],
            limit: Some(100),
            ..QueryDefinition::new("countries")
        }
    }

    #[test]
    fn survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.json");

        let saved = FileQueryStore::new(&path).save(definition()).unwrap();

        let reopened = FileQueryStore::new(&path);
        let loaded = reopened.get(&saved.key).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.definition, definition());
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileQueryStore::new(dir.path().join("nested").join("queries.json"));

        assert!(store.list(None).unwrap().is_empty());
        assert!(!store.delete(&QueryKey::new("public", "countries", "x")).unwrap());
        // Deleting rewrote the (empty) document, creating the directory on the way
        assert!(store.path().exists());
    }

    #[test]
    fn save_list_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileQueryStore::new(dir.path().join("queries.json"));
        store
            .save(QueryDefinition {
                name: Some("all_rivers".into()),
                ..QueryDefinition::new("rivers")
            })
            .unwrap();
        let before = store.list(None).unwrap();

        let saved = store.save(definition()).unwrap();
        assert_eq!(store.list(Some("public")).unwrap().len(), 2);
        assert!(store.delete(&saved.key).unwrap());

        assert_eq!(store.list(None).unwrap(), before);
    }

    #[test]
    fn overwrite_increments_revision() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileQueryStore::new(dir.path().join("queries.json"));

        assert_eq!(store.save(definition()).unwrap().revision, 1);
        assert_eq!(store.save(definition()).unwrap().revision, 2);
        assert_eq!(store.list(None).unwrap().len(), 1);
    }

    #[test]
    fn malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.json");
        fs::write(&path, "{ not json").unwrap();

        let error = FileQueryStore::new(&path).list(None).unwrap_err();
        assert_eq!(error.code(), "Serde");
    }
}
