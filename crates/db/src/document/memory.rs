use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{segments, DocumentError, DocumentStore};

/// A whole JSON tree held in process memory.
pub struct InMemoryDocumentStore {
    root: RwLock<Value>,
    next_key: AtomicU64,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self { root: RwLock::new(Value::Object(Map::new())), next_key: AtomicU64::new(1) }
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.as_object()?.get(*key))
}

fn assign(root: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = if value.is_null() { Value::Object(Map::new()) } else { value };
        return;
    };

    let mut node = root;
    for key in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(children) = node else { return };
        node = children.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(children) = node {
        if value.is_null() {
            children.remove(*last);
        } else {
            children.insert(last.to_string(), value);
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, DocumentError> {
        let path = segments(path)?;
        let root = self.root.read().await;
        Ok(lookup(&root, &path).cloned())
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), DocumentError> {
        let path = segments(path)?;
        let mut root = self.root.write().await;
        assign(&mut root, &path, value);
        Ok(())
    }

    async fn append(&self, path: &str) -> Result<String, DocumentError> {
        segments(path)?;
        let key = self.next_key.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{key:06}"))
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), DocumentError> {
        let base = segments(path)?;

        // Resolve every path before touching the tree so a bad key writes nothing.
        let mut writes = Vec::with_capacity(fields.len());
        for (relative, value) in fields {
            let mut full: Vec<String> = base.iter().map(|part| part.to_string()).collect();
            full.extend(segments(&relative)?.into_iter().map(str::to_string));
            if full.is_empty() {
                return Err(DocumentError::InvalidPath(relative));
            }
            writes.push((full, value));
        }

        let mut root = self.root.write().await;
        for (full, value) in writes {
            let keys: Vec<&str> = full.iter().map(String::as_str).collect();
            assign(&mut root, &keys, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::InMemoryDocumentStore;
    use crate::document::{DocumentError, DocumentStore};

    #[tokio::test]
    async fn write_then_read_nested_paths() {
        let store = InMemoryDocumentStore::new();
        store.write("requests/book_order/R1", json!({ "status": "pending" })).await.expect("write");

        assert_eq!(
            store.read("requests/book_order/R1/status").await.expect("read"),
            Some(json!("pending"))
        );
        assert_eq!(store.read("requests/timing_request").await.expect("read"), None);
        assert!(store.read("").await.expect("root").is_some());
    }

    #[tokio::test]
    async fn writing_null_removes_the_value() {
        let store = InMemoryDocumentStore::new();
        store.write("notifications/N1", json!({ "read": false })).await.expect("write");
        store.write("notifications/N1", Value::Null).await.expect("delete");

        assert_eq!(store.read("notifications/N1").await.expect("read"), None);
        assert_eq!(store.read("notifications").await.expect("read"), Some(json!({})));
    }

    #[tokio::test]
    async fn append_keys_are_unique_and_ordered() {
        let store = InMemoryDocumentStore::new();
        let first = store.append("requests").await.expect("first");
        let second = store.append("notifications").await.expect("second");

        assert_ne!(first, second);
        assert!(first < second);
    }

    #[tokio::test]
    async fn update_merges_multiple_paths() {
        let store = InMemoryDocumentStore::new();
        store
            .write("requests/book_order/R1", json!({ "status": "pending", "version": 1 }))
            .await
            .expect("seed");

        let mut fields = Map::new();
        fields.insert("requests/book_order/R1/status".to_string(), json!("approved"));
        fields.insert("notifications/N1".to_string(), json!({ "recipient_role": "registrar" }));
        store.update("", fields).await.expect("update");

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot["requests"]["book_order"]["R1"]["status"], json!("approved"));
        assert_eq!(snapshot["requests"]["book_order"]["R1"]["version"], json!(1));
        assert_eq!(snapshot["notifications"]["N1"]["recipient_role"], json!("registrar"));
    }

    #[tokio::test]
    async fn update_with_bad_path_writes_nothing() {
        let store = InMemoryDocumentStore::new();

        let mut fields = Map::new();
        fields.insert("requests/R1".to_string(), json!({ "ok": true }));
        fields.insert("requests/../escape".to_string(), json!(1));
        let error = store.update("", fields).await.expect_err("bad path");

        assert!(matches!(error, DocumentError::InvalidPath(_)));
        assert_eq!(store.read("requests").await.expect("read"), None);
    }
}
