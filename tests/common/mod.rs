use std::collections::BTreeMap;
use std::sync::Mutex;

use celldash_loader::domain::Framework;
use celldash_loader::error::LoaderError;
use celldash_loader::extract::RawTables;
use celldash_loader::shape::{ShapedTables, shape};
use celldash_loader::store::{BulkReport, DocumentStore, Record, RoleGrant};
use celldash_loader::table::{Cell, Table};
use serde_json::Value;

#[derive(Default)]
struct Collection {
    records: BTreeMap<String, Record>,
    bulk: Vec<Record>,
}

impl Collection {
    fn all_records(&self) -> impl Iterator<Item = &Record> {
        self.records.values().chain(self.bulk.iter())
    }
}

#[derive(Default)]
struct State {
    collections: BTreeMap<String, Collection>,
    roles: BTreeMap<String, RoleGrant>,
}

/// In-memory document store with the same capability surface and
/// absent-is-ok delete semantics as the real backend.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bulk_record_count(&self, collection: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(collection)
            .map(|c| c.bulk.len())
            .unwrap_or(0)
    }

}

impl DocumentStore for MemoryStore {
    fn collection_exists(&self, name: &str) -> Result<bool, LoaderError> {
        Ok(self.state.lock().unwrap().collections.contains_key(name))
    }

    fn create_collection(&self, name: &str, _schema: &Value) -> Result<(), LoaderError> {
        self.state
            .lock()
            .unwrap()
            .collections
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    fn delete_collection(&self, name: &str) -> Result<(), LoaderError> {
        self.state.lock().unwrap().collections.remove(name);
        Ok(())
    }

    fn collection_fields(&self, name: &str) -> Result<Vec<String>, LoaderError> {
        let state = self.state.lock().unwrap();
        let mut fields = Vec::new();
        if let Some(collection) = state.collections.get(name) {
            for record in collection.all_records() {
                fields.extend(record.keys().cloned());
            }
        }
        fields.sort();
        fields.dedup();
        Ok(fields)
    }

    fn get_record(&self, collection: &str, id: &str) -> Result<Option<Record>, LoaderError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .collections
            .get(collection)
            .and_then(|c| c.records.get(id).cloned()))
    }

    fn put_record(&self, collection: &str, id: &str, record: &Record) -> Result<(), LoaderError> {
        let mut state = self.state.lock().unwrap();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .records
            .insert(id.to_string(), record.clone());
        Ok(())
    }

    fn delete_record(&self, collection: &str, id: &str) -> Result<(), LoaderError> {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.collections.get_mut(collection) {
            c.records.remove(id);
        }
        Ok(())
    }

    fn list_record_ids(&self, collection: &str) -> Result<Vec<String>, LoaderError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .collections
            .get(collection)
            .map(|c| c.records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn bulk_insert(&self, collection: &str, records: &[Record]) -> Result<BulkReport, LoaderError> {
        let mut state = self.state.lock().unwrap();
        let target = state.collections.entry(collection.to_string()).or_default();
        target.bulk.extend(records.iter().cloned());
        Ok(BulkReport {
            submitted: records.len(),
            loaded: records.len(),
        })
    }

    fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, LoaderError> {
        let state = self.state.lock().unwrap();
        let Some(target) = state.collections.get(collection) else {
            return Ok(0);
        };
        Ok(target
            .all_records()
            .filter(|record| record.get(field).and_then(Value::as_str) == Some(value))
            .count() as u64)
    }

    fn delete_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<(), LoaderError> {
        let mut state = self.state.lock().unwrap();
        if let Some(target) = state.collections.get_mut(collection) {
            target
                .records
                .retain(|_, record| record.get(field).and_then(Value::as_str) != Some(value));
            target
                .bulk
                .retain(|record| record.get(field).and_then(Value::as_str) != Some(value));
        }
        Ok(())
    }

    fn get_role(&self, name: &str) -> Result<Option<RoleGrant>, LoaderError> {
        Ok(self.state.lock().unwrap().roles.get(name).cloned())
    }

    fn put_role(&self, name: &str, grant: &RoleGrant) -> Result<(), LoaderError> {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(name.to_string(), grant.clone());
        Ok(())
    }

    fn delete_role(&self, name: &str) -> Result<(), LoaderError> {
        self.state.lock().unwrap().roles.remove(name);
        Ok(())
    }

    fn list_roles(&self) -> Result<Vec<String>, LoaderError> {
        Ok(self.state.lock().unwrap().roles.keys().cloned().collect())
    }
}

/// Raw result tables for a small analysis with the given number of cells.
pub fn raw_tables(cells: usize) -> RawTables {
    let mut raw = RawTables::new();

    let mut metrics = Table::new(
        "hmmcopy_metrics",
        vec![
            "cell_id".to_string(),
            "unmapped_reads".to_string(),
            "total_reads".to_string(),
            "is_contaminated".to_string(),
        ],
    );
    for cell in 0..cells {
        metrics.push_row(vec![
            Cell::Str(format!("cell-{cell}")),
            Cell::Int(25),
            Cell::Int(100),
            Cell::Bool(false),
        ]);
    }
    raw.insert(metrics);

    for table_name in ["hmmcopy_segs", "hmmcopy_reads"] {
        let mut table = Table::new(
            table_name,
            vec![
                "cell_id".to_string(),
                "chr".to_string(),
                "state".to_string(),
            ],
        );
        for cell in 0..cells {
            table.push_row(vec![
                Cell::Str(format!("cell-{cell}")),
                Cell::Int(1),
                Cell::Int(2),
            ]);
        }
        raw.insert(table);
    }

    let mut columns = vec!["cell_id".to_string()];
    columns.extend((0..=100u8).map(|n| n.to_string()));
    let mut gc = Table::new("gc_metrics", columns);
    for cell in 0..cells {
        let mut row = vec![Cell::Str(format!("cell-{cell}"))];
        row.extend((0..=100u8).map(|n| Cell::Float(n as f64 / 100.0)));
        gc.push_row(row);
    }
    raw.insert(gc);

    raw
}

pub fn shaped_tables(cells: usize) -> ShapedTables {
    shape(&raw_tables(cells), Framework::Mondrian).unwrap()
}
