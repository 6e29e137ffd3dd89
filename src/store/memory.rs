//! In-memory record store
//!
//! Records are kept per model in insertion order, which is the default
//! order of an unsorted find.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::RecordStore;
use crate::blueprint::filter::{FilterExpr, QueryFilter};
use crate::blueprint::model::{AssociationKind, ModelDef, ModelRegistry};
use crate::blueprint::plan::{compare_records, QueryPlan};

type Collections = HashMap<String, Vec<Value>>;

/// Record store backed by process memory
pub struct MemoryStore {
    /// Model definitions, for resolving association targets
    models: Arc<ModelRegistry>,

    /// Records by model identity
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new(models: Arc<ModelRegistry>) -> Self {
        Self {
            models,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Append a record to a model's collection
    pub fn insert(&self, model: &str, record: Value) -> StoreResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))?;
        collections.entry(model.to_string()).or_default().push(record);
        Ok(())
    }

    /// Append many records per model
    pub fn seed(&self, fixtures: HashMap<String, Vec<Value>>) -> StoreResult<usize> {
        let mut inserted = 0;
        for (model, records) in fixtures {
            for record in records {
                self.insert(&model, record)?;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))
    }

    /// Expand the named associations of one record
    fn populate(
        &self,
        collections: &Collections,
        model: &ModelDef,
        mut record: Value,
        names: &[String],
    ) -> StoreResult<Value> {
        for name in names {
            let association = model.association(name).ok_or_else(|| {
                StoreError::Query(format!("'{}' has no association '{}'", model.identity, name))
            })?;
            let target = self.models.get(&association.target).ok_or_else(|| {
                StoreError::Query(format!("Unknown association target: {}", association.target))
            })?;
            let related = collections
                .get(&target.identity)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let expanded = match &association.kind {
                AssociationKind::Model => match record.get(name) {
                    Some(key) if !key.is_null() && !key.is_object() => {
                        let by_key = FilterExpr::eq(target.primary_key.clone(), key.clone());
                        related
                            .iter()
                            .find(|r| by_key.matches(r))
                            .cloned()
                            .unwrap_or(Value::Null)
                    }
                    _ => continue,
                },
                AssociationKind::Collection { via } => {
                    let Some(key) = model.primary_key_of(&record) else {
                        continue;
                    };
                    let by_parent = FilterExpr::eq(via.clone(), key.clone());
                    Value::Array(related.iter().filter(|r| by_parent.matches(r)).cloned().collect())
                }
            };

            if let Some(obj) = record.as_object_mut() {
                obj.insert(name.clone(), expanded);
            }
        }
        Ok(record)
    }
}

/// Project records onto the selected fields
fn select_fields(records: Vec<Value>, select: Option<&[String]>) -> Vec<Value> {
    let Some(fields) = select else {
        return records;
    };

    records
        .into_iter()
        .map(|record| match record {
            Value::Object(obj) => Value::Object(
                obj.into_iter()
                    .filter(|(k, _)| fields.contains(k))
                    .collect(),
            ),
            other => other,
        })
        .collect()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, model: &ModelDef, plan: &QueryPlan) -> StoreResult<Vec<Value>> {
        let collections = self.read()?;

        let mut matching: Vec<Value> = collections
            .get(&model.identity)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| plan.filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Stable sort: ties keep insertion order
        if !plan.sort.is_empty() {
            matching.sort_by(|a, b| compare_records(a, b, &plan.sort));
        }

        let page = matching
            .into_iter()
            .skip(plan.offset)
            .take(plan.limit)
            .map(|record| self.populate(&collections, model, record, &plan.populate))
            .collect::<StoreResult<Vec<Value>>>()?;

        Ok(select_fields(page, plan.select.as_deref()))
    }

    async fn count(&self, model: &ModelDef, filter: &QueryFilter) -> StoreResult<u64> {
        let collections = self.read()?;
        let count = collections
            .get(&model.identity)
            .map(|records| records.iter().filter(|r| filter.matches(r)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find_one(
        &self,
        model: &ModelDef,
        key: &Value,
        populate: &[String],
    ) -> StoreResult<Option<Value>> {
        let collections = self.read()?;
        let by_key = FilterExpr::eq(model.primary_key.clone(), key.clone());

        let found = collections
            .get(&model.identity)
            .and_then(|records| records.iter().find(|r| by_key.matches(r)).cloned());

        found
            .map(|record| self.populate(&collections, model, record, populate))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::filter::FilterOperator;
    use crate::blueprint::model::{AssociationDef, AttributeType};
    use crate::blueprint::plan::SortClause;
    use serde_json::json;

    fn registry() -> Arc<ModelRegistry> {
        Arc::new(ModelRegistry::from_models([
            ModelDef::new("user")
                .with_attribute("name", AttributeType::String)
                .with_attribute("age", AttributeType::Number)
                .with_association(AssociationDef::collection("pets", "pet", "owner")),
            ModelDef::new("pet")
                .with_attribute("name", AttributeType::String)
                .with_association(AssociationDef::model("owner", "user")),
        ]))
    }

    fn seeded() -> (Arc<ModelRegistry>, MemoryStore) {
        let models = registry();
        let store = MemoryStore::new(models.clone());
        for (id, name, age) in [(1, "A", 30), (2, "B", 25), (3, "C", 41), (4, "D", 19), (5, "E", 33)] {
            store
                .insert("user", json!({"id": id, "name": name, "age": age}))
                .unwrap();
        }
        store.insert("pet", json!({"id": 10, "name": "Rex", "owner": 1})).unwrap();
        store.insert("pet", json!({"id": 11, "name": "Tom", "owner": 1})).unwrap();
        store.insert("pet", json!({"id": 12, "name": "Kit", "owner": 9})).unwrap();
        (models, store)
    }

    #[tokio::test]
    async fn test_find_paginates_in_insertion_order() {
        let (models, store) = seeded();
        let user = models.get("user").unwrap();
        let plan = QueryPlan::default().with_limit(2).with_offset(1);

        let records = store.find(&user, &plan).await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_find_sorts_and_filters() {
        let (models, store) = seeded();
        let user = models.get("user").unwrap();
        let plan = QueryPlan::new(
            QueryFilter::new().and(FilterExpr::new("age", FilterOperator::Gte, json!(25))),
        )
        .with_sort(SortClause::desc("age"));

        let records = store.find(&user, &plan).await.unwrap();
        let ages: Vec<i64> = records.iter().map(|r| r["age"].as_i64().unwrap()).collect();
        assert_eq!(ages, vec![41, 33, 30, 25]);
    }

    #[tokio::test]
    async fn test_count_ignores_pagination() {
        let (models, store) = seeded();
        let user = models.get("user").unwrap();
        let filter = QueryFilter::new().and(FilterExpr::new("age", FilterOperator::Lt, json!(40)));

        assert_eq!(store.count(&user, &filter).await.unwrap(), 4);
        assert_eq!(store.count(&user, &QueryFilter::new()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_populate_both_directions() {
        let (models, store) = seeded();
        let user = models.get("user").unwrap();
        let pet = models.get("pet").unwrap();

        let owner = store
            .find_one(&user, &json!(1), &["pets".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner["pets"].as_array().unwrap().len(), 2);

        let mut plan = QueryPlan::default();
        plan.populate = vec!["owner".to_string()];
        let pets = store.find(&pet, &plan).await.unwrap();
        assert_eq!(pets[0]["owner"]["name"], "A");
        assert!(pets[2]["owner"].is_null());
    }

    #[tokio::test]
    async fn test_select_projects_fields() {
        let (models, store) = seeded();
        let user = models.get("user").unwrap();
        let mut plan = QueryPlan::default().with_limit(1);
        plan.select = Some(vec!["id".to_string(), "name".to_string()]);

        let records = store.find(&user, &plan).await.unwrap();
        assert_eq!(records[0], json!({"id": 1, "name": "A"}));
    }

    #[tokio::test]
    async fn test_find_one_missing() {
        let (models, store) = seeded();
        let user = models.get("user").unwrap();
        assert!(store.find_one(&user, &json!(99), &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_model_is_empty() {
        let store = MemoryStore::new(registry());
        let ghost = ModelDef::new("ghost");
        assert!(store.find(&ghost, &QueryPlan::default()).await.unwrap().is_empty());
        assert_eq!(store.count(&ghost, &QueryFilter::new()).await.unwrap(), 0);
    }
}
