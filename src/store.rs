use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::LoaderError;

pub type Record = Map<String, Value>;

/// Read grant over a set of collections, persisted as a role document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub collections: Vec<String>,
    pub privileges: Vec<String>,
}

impl RoleGrant {
    pub fn read(collections: Vec<String>) -> Self {
        Self {
            collections,
            privileges: vec!["read".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BulkReport {
    pub submitted: usize,
    pub loaded: usize,
}

impl BulkReport {
    pub fn absorb(&mut self, other: BulkReport) {
        self.submitted += other.submitted;
        self.loaded += other.loaded;
    }
}

/// Collection schema used for every collection this loader creates: string
/// fields indexed as keywords, result window sized for dashboard queries.
pub fn default_schema() -> Value {
    json!({
        "settings": {
            "index": {
                "max_result_window": 100_000
            }
        },
        "mappings": {
            "dynamic_templates": [
                {
                    "string_values": {
                        "match": "*",
                        "match_mapping_type": "string",
                        "mapping": {
                            "type": "keyword"
                        }
                    }
                }
            ]
        }
    })
}

/// Capability surface of the backing document store. Deletes of absent
/// collections, records, and roles succeed; absent reads return `None`.
pub trait DocumentStore: Send + Sync {
    fn collection_exists(&self, name: &str) -> Result<bool, LoaderError>;
    fn create_collection(&self, name: &str, schema: &Value) -> Result<(), LoaderError>;
    fn delete_collection(&self, name: &str) -> Result<(), LoaderError>;
    fn collection_fields(&self, name: &str) -> Result<Vec<String>, LoaderError>;

    fn get_record(&self, collection: &str, id: &str) -> Result<Option<Record>, LoaderError>;
    fn put_record(&self, collection: &str, id: &str, record: &Record) -> Result<(), LoaderError>;
    fn delete_record(&self, collection: &str, id: &str) -> Result<(), LoaderError>;
    fn list_record_ids(&self, collection: &str) -> Result<Vec<String>, LoaderError>;

    fn bulk_insert(&self, collection: &str, records: &[Record]) -> Result<BulkReport, LoaderError>;
    fn count_by_field(&self, collection: &str, field: &str, value: &str)
    -> Result<u64, LoaderError>;
    fn delete_by_field(&self, collection: &str, field: &str, value: &str)
    -> Result<(), LoaderError>;

    fn get_role(&self, name: &str) -> Result<Option<RoleGrant>, LoaderError>;
    fn put_role(&self, name: &str, grant: &RoleGrant) -> Result<(), LoaderError>;
    fn delete_role(&self, name: &str) -> Result<(), LoaderError>;
    fn list_roles(&self) -> Result<Vec<String>, LoaderError>;
}

pub fn ensure_collection<S: DocumentStore + ?Sized>(
    store: &S,
    name: &str,
) -> Result<(), LoaderError> {
    if !store.collection_exists(name)? {
        tracing::info!(collection = name, "creating collection");
        store.create_collection(name, &default_schema())?;
    }
    Ok(())
}
