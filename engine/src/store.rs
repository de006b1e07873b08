//! Store - the append-only versioned record log.
//!
//! Every create, update and delete appends a row. Rows are never rewritten,
//! so the log doubles as the full history of each lineage. Lookups scan from
//! the newest row backwards so the latest version of a document wins.

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::record::{DocValue, Record, VersionId, VersionSelector};
use crate::{error::Result, Error};

/// A named, in-memory record store for one data type.
#[derive(Debug)]
pub struct RecordStore {
    /// Data type name (e.g. "observation")
    name: String,
    /// Every row ever appended, oldest first
    rows: RwLock<Vec<Record>>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Get the data type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows in the log, tombstones and superseded rows included.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Check if nothing has been appended yet.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Start a new lineage with `value` as its first version.
    pub async fn create(&self, value: DocValue) -> Result<Record> {
        let id = Uuid::new_v4().simple().to_string();
        let record = Record::new(id, value, Utc::now());

        self.rows.write().await.push(record.clone());

        tracing::debug!(store = %self.name, version = %record.version, "Record created");

        Ok(record)
    }

    /// Get the latest row of a document.
    pub async fn get_by_doc_id(&self, id: &str) -> Result<Record> {
        self.rows
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    /// Get the row with exactly this version.
    pub async fn get_by_version_id(&self, version: &VersionId) -> Result<Record> {
        let rows = self.rows.read().await;
        find_version(&rows, version).cloned()
    }

    /// Get every row of the log.
    ///
    /// This is the raw history, not a latest-per-document view: each update
    /// or delete contributes its own row. Without `include_deleted`,
    /// tombstone rows are left out.
    pub async fn get_many(&self, include_deleted: bool) -> Result<Vec<Record>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| include_deleted || r.is_active())
            .cloned()
            .collect())
    }

    /// Append a new version with `patch` merged over the value of `version`.
    pub async fn update(
        &self,
        version: impl Into<VersionSelector>,
        patch: DocValue,
    ) -> Result<Record> {
        let version = version.into().single()?;

        let mut rows = self.rows.write().await;
        let current = find_version(&rows, &version)?;

        if current.deleted {
            return Err(Error::DeletedLineage(version.to_string()));
        }

        let updated = current.successor(patch, Utc::now());
        rows.push(updated.clone());

        tracing::debug!(
            store = %self.name,
            from = %version,
            to = %updated.version,
            "Record updated"
        );

        Ok(updated)
    }

    /// Append a tombstone superseding `version`.
    ///
    /// Tombstoning a tombstone is allowed and appends another row.
    pub async fn delete(&self, version: impl Into<VersionSelector>) -> Result<Record> {
        let version = version.into().single()?;

        let mut rows = self.rows.write().await;
        let tombstone = find_version(&rows, &version)?.tombstone(Utc::now());
        rows.push(tombstone.clone());

        tracing::debug!(
            store = %self.name,
            from = %version,
            to = %tombstone.version,
            "Record deleted"
        );

        Ok(tombstone)
    }
}

fn find_version<'a>(rows: &'a [Record], version: &VersionId) -> Result<&'a Record> {
    rows.iter()
        .rev()
        .find(|r| &r.version == version)
        .ok_or_else(|| Error::VersionNotFound(version.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn object(value: serde_json::Value) -> DocValue {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn test_store() -> RecordStore {
        RecordStore::new("observation")
    }

    #[tokio::test]
    async fn create_record() {
        let store = test_store();
        let record = store.create(object(json!({"lat": 0}))).await.unwrap();

        assert_eq!(record.version.seq(), 1);
        assert_eq!(record.version.doc_id(), record.id);
        assert_eq!(record.created_at, record.updated_at);
        assert!(!record.deleted);
        assert!(record.links.is_empty());
        assert!(record.forks.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let store = test_store();
        let a = store.create(DocValue::new()).await.unwrap();
        let b = store.create(DocValue::new()).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn get_by_doc_id_returns_latest() {
        let store = test_store();
        let created = store.create(object(json!({"n": 1}))).await.unwrap();
        let updated = store
            .update(&created.version, object(json!({"n": 2})))
            .await
            .unwrap();

        let latest = store.get_by_doc_id(&created.id).await.unwrap();
        assert_eq!(latest, updated);

        let first = store.get_by_version_id(&created.version).await.unwrap();
        assert_eq!(first, created);
    }

    #[tokio::test]
    async fn lookups_not_found() {
        let store = test_store();

        let err = store.get_by_doc_id("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = store
            .get_by_version_id(&VersionId::first("missing"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::VersionNotFound("missing@1".into()));

        let err = store
            .update(VersionId::first("missing"), DocValue::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn update_deleted_lineage_fails() {
        let store = test_store();
        let created = store.create(DocValue::new()).await.unwrap();
        let dead = store.delete(&created.version).await.unwrap();

        let err = store
            .update(&dead.version, object(json!({"a": 1})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn delete_tombstone_appends_again() {
        let store = test_store();
        let created = store.create(DocValue::new()).await.unwrap();
        let first = store.delete(&created.version).await.unwrap();
        let second = store.delete(&first.version).await.unwrap();

        assert!(second.deleted);
        assert_eq!(second.version.seq(), 3);
        assert_eq!(
            second.links,
            vec![created.version.clone(), first.version.clone()]
        );
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn get_many_filters_tombstones() {
        let store = test_store();
        let a = store.create(DocValue::new()).await.unwrap();
        let _b = store.create(DocValue::new()).await.unwrap();
        store.delete(&a.version).await.unwrap();

        let active = store.get_many(false).await.unwrap();
        assert_eq!(active.len(), 2); // a@1 and b@1
        assert!(active.iter().all(|r| !r.deleted));

        let all = store.get_many(true).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn version_arrays_rejected() {
        let store = test_store();
        let created = store.create(DocValue::new()).await.unwrap();

        let err = store
            .update(vec![created.version.clone()], DocValue::new())
            .await
            .unwrap_err();
        assert_eq!(err, Error::VersionArrayUnsupported(1));

        let err = store
            .delete(vec![created.version.clone(), created.version.next()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_from_old_version_extends_that_row() {
        let store = test_store();
        let created = store.create(object(json!({"n": 1}))).await.unwrap();
        store
            .update(&created.version, object(json!({"n": 2})))
            .await
            .unwrap();

        // updating @1 again produces another @2 row; no fork detection here
        let again = store
            .update(&created.version, object(json!({"n": 3})))
            .await
            .unwrap();
        assert_eq!(again.version.seq(), 2);
        assert!(again.forks.is_empty());

        let latest = store.get_by_version_id(&again.version).await.unwrap();
        assert_eq!(latest.value["n"], 3);
    }
}
