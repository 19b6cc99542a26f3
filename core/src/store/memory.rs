use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::RecordStore;
use crate::error::StoreError;
use crate::query::{Filter, ListQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Insert,
    Update,
    Delete,
}

/// A request observed by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    List(ListQuery),
    Insert { table: String, row: Value },
    Update { table: String, key: Uuid, fields: Value },
    Delete { table: String, key: Uuid },
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::List(_) => StoreOp::List,
            StoreCall::Insert { .. } => StoreOp::Insert,
            StoreCall::Update { .. } => StoreOp::Update,
            StoreCall::Delete { .. } => StoreOp::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Vec<Value>>,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOp, String>,
}

/// In-process record store. Generates `id` and `created_at` on insert,
/// resolves embedded joins, records every call, and can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing call recording.
    pub async fn seed(&self, table: &str, row: Value) -> Value {
        let row = stamp(row);
        let mut inner = self.inner.lock().await;
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    /// Make every subsequent `op` fail with `message` until cleared.
    pub async fn fail(&self, op: StoreOp, message: &str) {
        self.inner
            .lock()
            .await
            .failures
            .insert(op, message.to_string());
    }

    pub async fn clear_failures(&self) {
        self.inner.lock().await.failures.clear();
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.inner
            .lock()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn stamp(row: Value) -> Value {
    let mut obj = match row {
        Value::Object(obj) => obj,
        other => return other,
    };
    obj.entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    obj.entry("created_at").or_insert_with(|| {
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    });
    Value::Object(obj)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| row.get(&f.column).map(text).as_deref() == Some(f.value.as_str()))
}

fn project(row: &Value, columns: &[String]) -> Map<String, Value> {
    let Some(obj) = row.as_object() else {
        return Map::new();
    };
    if columns.is_empty() {
        return obj.clone();
    }
    columns
        .iter()
        .filter_map(|c| obj.get(c).map(|v| (c.clone(), v.clone())))
        .collect()
}

fn key_matches(row: &Value, key: Uuid) -> bool {
    row.get("id").map(text) == Some(key.to_string())
}

impl Inner {
    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        match self.failures.get(&op) {
            Some(message) => Err(StoreError::remote(400, message.clone())),
            None => Ok(()),
        }
    }

    fn list(&self, query: &ListQuery) -> Vec<Value> {
        let empty = Vec::new();
        let rows = self.tables.get(&query.table).unwrap_or(&empty);
        let mut matched: Vec<&Value> = rows.iter().filter(|r| matches(r, &query.filters)).collect();

        if let Some(order) = &query.order {
            matched.sort_by(|a, b| {
                let ka = a.get(&order.column).map(text).unwrap_or_default();
                let kb = b.get(&order.column).map(text).unwrap_or_default();
                if order.descending { kb.cmp(&ka) } else { ka.cmp(&kb) }
            });
        }

        matched
            .into_iter()
            .map(|row| {
                let mut out = project(row, &query.columns);
                if let Some(join) = &query.join {
                    let related = row
                        .get(&join.foreign_key)
                        .map(text)
                        .and_then(|fk| {
                            self.tables
                                .get(&join.table)?
                                .iter()
                                .find(|r| r.get("id").map(text).as_deref() == Some(fk.as_str()))
                        })
                        .map(|r| Value::Object(project(r, &join.columns)))
                        .unwrap_or(Value::Null);
                    out.insert(join.table.clone(), related);
                }
                Value::Object(out)
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::List(query.clone()));
        inner.check(StoreOp::List)?;
        Ok(inner.list(query))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::Insert {
            table: table.to_string(),
            row: row.clone(),
        });
        inner.check(StoreOp::Insert)?;

        let row = stamp(row);
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        key: Uuid,
        fields: Value,
    ) -> Result<Vec<Value>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::Update {
            table: table.to_string(),
            key,
            fields: fields.clone(),
        });
        inner.check(StoreOp::Update)?;

        let mut updated = Vec::new();
        if let (Some(rows), Some(patch)) = (inner.tables.get_mut(table), fields.as_object()) {
            for row in rows.iter_mut().filter(|r| key_matches(r, key)) {
                if let Some(obj) = row.as_object_mut() {
                    for (k, v) in patch {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, key: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::Delete {
            table: table.to_string(),
            key,
        });
        inner.check(StoreOp::Delete)?;

        if let Some(rows) = inner.tables.get_mut(table) {
            rows.retain(|r| !key_matches(r, key));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::Join;

    #[tokio::test]
    async fn list_filters_orders_and_embeds() {
        let store = MemoryStore::new();
        let agent = store.seed("agents", json!({ "name": "Closer" })).await;
        let user = Uuid::now_v7();

        store
            .seed(
                "campaigns",
                json!({ "user_id": user, "agent_id": agent["id"], "name": "old", "created_at": "2025-01-01T00:00:00Z" }),
            )
            .await;
        store
            .seed(
                "campaigns",
                json!({ "user_id": user, "agent_id": agent["id"], "name": "new", "created_at": "2025-02-01T00:00:00Z" }),
            )
            .await;
        store
            .seed("campaigns", json!({ "user_id": Uuid::now_v7(), "name": "other" }))
            .await;

        let query = ListQuery::table("campaigns")
            .select(["name"])
            .join(Join::new("agents", "agent_id", ["name"]))
            .eq("user_id", user)
            .order_desc("created_at");
        let rows = store.list(&query).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "new");
        assert_eq!(rows[1]["name"], "old");
        assert_eq!(rows[0]["agents"], json!({ "name": "Closer" }));
    }

    #[tokio::test]
    async fn injected_failure_is_recorded_and_surfaced() {
        let store = MemoryStore::new();
        store.fail(StoreOp::Insert, "duplicate key value").await;

        let err = store
            .insert("contacts", json!({ "name": "x" }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "duplicate key value");
        assert!(store.rows("contacts").await.is_empty());
        assert_eq!(store.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn update_patches_matching_row_only() {
        let store = MemoryStore::new();
        let id = Uuid::now_v7();
        store
            .seed("profiles", json!({ "id": id, "full_name": "A" }))
            .await;
        store
            .seed("profiles", json!({ "full_name": "B" }))
            .await;

        let updated = store
            .update("profiles", id, json!({ "full_name": "Ada" }))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["full_name"], "Ada");
        assert_eq!(store.rows("profiles").await[1]["full_name"], "B");
    }
}
