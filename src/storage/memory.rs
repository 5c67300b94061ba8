use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::{EntityKind, SharedStore, Store};

/// In-process document store: one map per entity kind, guarded by a single
/// RwLock. Lock scopes never span an await point.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<EntityKind, HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Convenience for wiring the store into the engine.
    pub fn shared() -> SharedStore { Arc::new(Self::new()) }
}

fn now_ms() -> i64 { chrono::Utc::now().timestamp_millis() }

fn doc_matches(doc: &Value, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(k, want)| doc.get(k) == Some(want))
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_by_id(&self, kind: EntityKind, id: &str) -> AppResult<Option<Value>> {
        let map = self.collections.read();
        Ok(map.get(&kind).and_then(|c| c.get(id)).cloned())
    }

    async fn find(&self, kind: EntityKind, filter: &Map<String, Value>) -> AppResult<Vec<Value>> {
        let map = self.collections.read();
        let Some(coll) = map.get(&kind) else { return Ok(Vec::new()) };
        let mut out: Vec<Value> = coll.values().filter(|d| doc_matches(d, filter)).cloned().collect();
        // Stable order for callers and tests; insertion order is not tracked.
        out.sort_by(|a, b| {
            let ka = a.get("created_at").and_then(|v| v.as_i64()).unwrap_or(0);
            let kb = b.get("created_at").and_then(|v| v.as_i64()).unwrap_or(0);
            ka.cmp(&kb).then_with(|| {
                let ia = a.get("id").and_then(|v| v.as_str()).unwrap_or("");
                let ib = b.get("id").and_then(|v| v.as_str()).unwrap_or("");
                ia.cmp(ib)
            })
        });
        Ok(out)
    }

    async fn create(&self, kind: EntityKind, mut fields: Map<String, Value>) -> AppResult<Value> {
        let id = match fields.get("id").and_then(|v| v.as_str()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        fields.insert("id".into(), Value::String(id.clone()));
        let now = now_ms();
        fields.entry("created_at").or_insert_with(|| Value::from(now));
        fields.insert("updated_at".into(), Value::from(now));
        let doc = Value::Object(fields);
        let mut map = self.collections.write();
        map.entry(kind).or_default().insert(id.clone(), doc.clone());
        debug!(target: "fieldgate", "store.create kind={} id={}", kind, id);
        Ok(doc)
    }

    async fn update(&self, kind: EntityKind, id: &str, fields: Map<String, Value>) -> AppResult<Value> {
        let mut map = self.collections.write();
        let coll = map.entry(kind).or_default();
        let Some(doc) = coll.get_mut(id) else {
            return Err(AppError::storage(format!("update on missing {} {}", kind, id)));
        };
        let obj = doc.as_object_mut()
            .ok_or_else(|| AppError::storage(format!("corrupt document {} {}", kind, id)))?;
        for (k, v) in fields {
            obj.insert(k, v);
        }
        obj.insert("updated_at".into(), Value::from(now_ms()));
        Ok(doc.clone())
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> AppResult<()> {
        let mut map = self.collections.write();
        if let Some(coll) = map.get_mut(&kind) {
            if coll.remove(id).is_some() {
                debug!(target: "fieldgate", "store.delete kind={} id={}", kind, id);
            }
        }
        Ok(())
    }
}
