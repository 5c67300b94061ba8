use serde_json::Value;

use futures_util::future::join_all;

use crate::error::{AppError, AppResult};
use crate::storage::{EntityKind, SharedStore, Store};

use super::resolver::{resolver, Resolver};

async fn load_one(store: SharedStore, target: EntityKind, id: Value) -> AppResult<Value> {
    let id = match id {
        Value::String(s) => s,
        Value::Null => return Ok(Value::Null),
        other => return Err(AppError::storage(format!("reference id is not a string: {}", other))),
    };
    // Dangling references resolve to null, never an error.
    Ok(store.find_by_id(target, &id).await?.unwrap_or(Value::Null))
}

/// Generic identifier-expansion resolver: one implementation serves every
/// (id_field, target, cardinality) combination the schema declares.
///
/// Single: absent id -> null, dangling target -> null. List: all elements are
/// loaded concurrently and reassembled in input order; dangling elements
/// become null at their position rather than failing the list.
pub fn reference_resolver(id_field: String, target: EntityKind, is_list: bool) -> Resolver {
    resolver(move |req| {
        let stored = req.parent.get(&id_field).cloned().unwrap_or(Value::Null);
        let store = req.store.clone();
        async move {
            if !is_list {
                return load_one(store, target, stored).await;
            }
            let ids = match stored {
                Value::Array(ids) => ids,
                Value::Null => Vec::new(),
                other => return Err(AppError::storage(format!("reference id list is not an array: {}", other))),
            };
            let loads = ids.into_iter().map(|id| load_one(store.clone(), target, id));
            let results: Vec<AppResult<Value>> = join_all(loads).await;
            results.into_iter().collect::<AppResult<Vec<Value>>>().map(Value::Array)
        }
    })
}
