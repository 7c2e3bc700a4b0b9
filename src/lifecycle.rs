use serde::Serialize;

use crate::acl::{LabelRegistry, Projects};
use crate::domain::{ANALYSES_COLLECTION, AnalysisEntry, AnalysisId, DataType, ProjectName};
use crate::error::LoaderError;
use crate::shape::ShapedTables;
use crate::store::{BulkReport, DocumentStore, ensure_collection};

/// Rows submitted to the store per batch; the store client may split a
/// batch further.
const LOAD_BATCH_SIZE: usize = 100_000;

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub analysis_id: String,
    pub cell_count: u64,
    pub records: Vec<TableSummary>,
    pub labels_added: Vec<String>,
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub data_type: String,
    pub records: usize,
}

/// Load, clean, and verify one analysis's data, metadata, and project
/// membership as a single logical unit.
pub struct Lifecycle<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> Lifecycle<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Data collections are written before the metadata record, so a reader
    /// that observes the record can trust the data behind it. Project
    /// existence is checked before the first store mutation.
    pub fn load(
        &self,
        mut entry: AnalysisEntry,
        tables: &ShapedTables,
        projects: &[ProjectName],
    ) -> Result<LoadSummary, LoaderError> {
        let project_manager = Projects::new(self.store);
        project_manager.verify_exist(projects)?;

        let id = entry.analysis_id.clone();
        let mut records = Vec::new();
        for data_type in DataType::ALL {
            let loaded = self.load_table(&id, data_type, tables)?;
            records.push(TableSummary {
                data_type: data_type.as_str().to_string(),
                records: loaded,
            });
        }

        let cell_count = tables.qc.len() as u64;
        entry.cell_count = Some(cell_count);
        ensure_collection(self.store, ANALYSES_COLLECTION)?;
        self.store
            .put_record(ANALYSES_COLLECTION, id.as_str(), &entry.to_record())?;
        tracing::info!(analysis = %id, cell_count, "stored analysis record");

        let labels_added = LabelRegistry::new(self.store).reconcile()?;

        project_manager.add_analysis_to_projects(&id, projects)?;

        Ok(LoadSummary {
            analysis_id: id.as_str().to_string(),
            cell_count,
            records,
            labels_added,
            projects: projects.iter().map(|p| p.as_str().to_string()).collect(),
        })
    }

    fn load_table(
        &self,
        id: &AnalysisId,
        data_type: DataType,
        tables: &ShapedTables,
    ) -> Result<usize, LoaderError> {
        let collection = id.data_collection(data_type);
        let records = tables.get(data_type).records();
        let total = records.len();

        // Re-loading the same analysis overwrites, never appends.
        self.store.delete_collection(&collection)?;
        ensure_collection(self.store, &collection)?;

        let mut report = BulkReport::default();
        for batch in records.chunks(LOAD_BATCH_SIZE) {
            report.absorb(self.store.bulk_insert(&collection, batch)?);
            tracing::info!(
                collection = %collection,
                batch = batch.len(),
                loaded = report.loaded,
                total,
                "loading records"
            );
        }

        if report.loaded != report.submitted {
            return Err(LoaderError::BulkMismatch {
                collection,
                submitted: report.submitted,
                loaded: report.loaded,
            });
        }
        Ok(report.loaded)
    }

    /// Reverse of load. Absent collections, records, and memberships are
    /// treated as already clean.
    pub fn clean(&self, id: &AnalysisId) -> Result<(), LoaderError> {
        for data_type in DataType::ALL {
            self.store.delete_collection(&id.data_collection(data_type))?;
        }
        self.store.delete_record(ANALYSES_COLLECTION, id.as_str())?;
        Projects::new(self.store).remove_analysis(id, None)?;
        tracing::info!(analysis = %id, "cleaned analysis");
        Ok(())
    }

    pub fn is_loaded(&self, id: &AnalysisId) -> Result<bool, LoaderError> {
        is_loaded(self.store, id)
    }

    /// Analyses with a metadata record but one or more missing data
    /// collections. These are invisible-but-broken dashboard entries.
    pub fn find_dangling(&self) -> Result<Vec<AnalysisId>, LoaderError> {
        let mut dangling = Vec::new();
        for raw_id in self.store.list_record_ids(ANALYSES_COLLECTION)? {
            let id: AnalysisId = raw_id.parse()?;
            let mut missing = false;
            for data_type in DataType::ALL {
                if !self.store.collection_exists(&id.data_collection(data_type))? {
                    missing = true;
                    break;
                }
            }
            if missing {
                dangling.push(id);
            }
        }
        Ok(dangling)
    }
}

/// The metadata record is the authoritative loaded signal.
pub fn is_loaded<S: DocumentStore + ?Sized>(
    store: &S,
    id: &AnalysisId,
) -> Result<bool, LoaderError> {
    Ok(store.count_by_field(ANALYSES_COLLECTION, "dashboard_id", id.as_str())? == 1)
}

/// Batch verification reporting the exact set of unloaded IDs.
pub fn verify_loaded<S: DocumentStore + ?Sized>(
    store: &S,
    ids: &[AnalysisId],
) -> Result<(), LoaderError> {
    let mut unloaded = Vec::new();
    for id in ids {
        if !is_loaded(store, id)? {
            unloaded.push(id.as_str().to_string());
        }
    }
    if unloaded.is_empty() {
        Ok(())
    } else {
        Err(LoaderError::AnalysesNotLoaded(unloaded))
    }
}
