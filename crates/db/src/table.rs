use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::DbError;

/// A stored row: store-managed id and timestamps around the caller's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub data: T,
}

/// On-disk snapshot layout.
#[derive(Deserialize)]
struct Snapshot<T> {
    next_id: i64,
    rows: Vec<Record<T>>,
}

#[derive(Serialize)]
struct SnapshotRef<'a, T> {
    next_id: i64,
    rows: Vec<&'a Record<T>>,
}

struct State<T> {
    next_id: i64,
    rows: BTreeMap<i64, Record<T>>,
}

impl<T> State<T> {
    fn empty() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

/// An autoincrement table guarded by a read/write lock.
///
/// Ids start at 1 and are never reused, even after deletes. Iteration order
/// is id order, which is insertion order.
pub struct Table<T> {
    name: &'static str,
    state: RwLock<State<T>>,
    snapshot_path: Option<PathBuf>,
}

impl<T> Table<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync,
{
    /// Create an empty table that is never written to disk.
    pub fn in_memory(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(State::empty()),
            snapshot_path: None,
        }
    }

    /// Open a table backed by a JSON snapshot, loading it if the file exists.
    pub async fn open(name: &'static str, path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();

        let state = match tokio::fs::read_to_string(&path).await {
            Ok(data) => {
                let snapshot: Snapshot<T> =
                    serde_json::from_str(&data).map_err(|source| DbError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                let rows: BTreeMap<i64, Record<T>> = snapshot
                    .rows
                    .into_iter()
                    .map(|record| (record.id, record))
                    .collect();
                let after_last = rows.keys().next_back().map_or(1, |id| id + 1);
                State {
                    next_id: snapshot.next_id.max(after_last),
                    rows,
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::empty(),
            Err(source) => {
                return Err(DbError::Io {
                    action: "read",
                    path,
                    source,
                })
            }
        };

        tracing::info!(
            table = name,
            path = %path.display(),
            rows = state.rows.len(),
            "opened table snapshot"
        );

        Ok(Self {
            name,
            state: RwLock::new(state),
            snapshot_path: Some(path),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// All rows in id order.
    pub async fn all(&self) -> Vec<Record<T>> {
        self.state.read().await.rows.values().cloned().collect()
    }

    pub async fn get(&self, id: i64) -> Option<Record<T>> {
        self.state.read().await.rows.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.rows.is_empty()
    }

    /// Insert a row, assigning the next id and both timestamps.
    pub async fn insert(&self, data: T) -> Result<Record<T>, DbError> {
        let mut state = self.state.write().await;

        let now = OffsetDateTime::now_utc();
        let record = Record {
            id: state.next_id,
            created_at: now,
            updated_at: now,
            data,
        };
        state.rows.insert(record.id, record.clone());
        state.next_id += 1;

        if let Err(e) = self.persist(&state).await {
            state.rows.remove(&record.id);
            state.next_id -= 1;
            return Err(e);
        }

        tracing::debug!(table = self.name, id = record.id, "inserted row");
        Ok(record)
    }

    /// Apply `apply` to the row's data. Returns `None` when the id is absent.
    ///
    /// `updated_at` only moves when the data actually changed.
    pub async fn update<F>(&self, id: i64, apply: F) -> Result<Option<Record<T>>, DbError>
    where
        F: FnOnce(&mut T) + Send,
    {
        let mut state = self.state.write().await;

        let Some(record) = state.rows.get_mut(&id) else {
            return Ok(None);
        };

        let previous = record.clone();
        apply(&mut record.data);
        if record.data == previous.data {
            return Ok(Some(previous));
        }
        record.updated_at = OffsetDateTime::now_utc();
        let updated = record.clone();

        if let Err(e) = self.persist(&state).await {
            state.rows.insert(id, previous);
            return Err(e);
        }

        tracing::debug!(table = self.name, id, "updated row");
        Ok(Some(updated))
    }

    /// Delete a row. Returns whether it existed.
    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let mut state = self.state.write().await;

        let Some(removed) = state.rows.remove(&id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&state).await {
            state.rows.insert(id, removed);
            return Err(e);
        }

        tracing::debug!(table = self.name, id, "deleted row");
        Ok(true)
    }

    /// Write the snapshot, if any, via a temp file and rename.
    async fn persist(&self, state: &State<T>) -> Result<(), DbError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let snapshot = SnapshotRef {
            next_id: state.next_id,
            rows: state.rows.values().collect(),
        };
        let data = serde_json::to_string_pretty(&snapshot).map_err(|source| DbError::Encode {
            table: self.name,
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DbError::Io {
                    action: "create directory for",
                    path: path.clone(),
                    source,
                })?;
        }

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &data)
            .await
            .map_err(|source| DbError::Io {
                action: "write",
                path: temp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|source| DbError::Io {
                action: "replace",
                path: path.clone(),
                source,
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        title: String,
    }

    fn row(title: &str) -> Row {
        Row {
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let table = Table::in_memory("rows");

        let first = table.insert(row("a")).await.unwrap();
        let second = table.insert(row("b")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let table = Table::in_memory("rows");
        table.insert(row("a")).await.unwrap();
        let second = table.insert(row("b")).await.unwrap();

        assert!(table.delete(second.id).await.unwrap());
        let third = table.insert(row("c")).await.unwrap();

        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn all_returns_rows_in_insertion_order() {
        let table = Table::in_memory("rows");
        for title in ["c", "a", "b"] {
            table.insert(row(title)).await.unwrap();
        }

        let titles: Vec<String> = table
            .all()
            .await
            .into_iter()
            .map(|record| record.data.title)
            .collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn update_missing_row_returns_none() {
        let table: Table<Row> = Table::in_memory("rows");
        let result = table.update(42, |r| r.title.push('!')).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn noop_update_keeps_updated_at() {
        let table = Table::in_memory("rows");
        let created = table.insert(row("a")).await.unwrap();

        let same = table
            .update(created.id, |r| r.title = "a".to_string())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(same, created);
    }

    #[tokio::test]
    async fn update_changes_data_but_not_created_at() {
        let table = Table::in_memory("rows");
        let created = table.insert(row("a")).await.unwrap();

        let updated = table
            .update(created.id, |r| r.title = "z".to_string())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.data.title, "z");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(table.get(created.id).await.unwrap().data.title, "z");
    }

    #[tokio::test]
    async fn delete_missing_row_returns_false() {
        let table: Table<Row> = Table::in_memory("rows");
        assert!(!table.delete(1).await.unwrap());
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("rows.json");

        {
            let table = Table::open("rows", &path).await.unwrap();
            table.insert(row("a")).await.unwrap();
            let b = table.insert(row("b")).await.unwrap();
            table.delete(b.id).await.unwrap();
        }

        let reopened: Table<Row> = Table::open("rows", &path).await.unwrap();
        let rows = reopened.all().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data.title, "a");

        // The deleted id stays burned across restarts.
        let next = reopened.insert(row("c")).await.unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = Table::<Row>::open("rows", &path).await.err().unwrap();
        assert!(matches!(err, DbError::Corrupt { .. }));
    }
}
