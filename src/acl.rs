use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::domain::{ANALYSES_COLLECTION, AnalysisId, DataType, LABELS_COLLECTION, ProjectName};
use crate::error::LoaderError;
use crate::lifecycle::verify_loaded;
use crate::store::{DocumentStore, Record, RoleGrant, ensure_collection};

/// Project groupings persisted as role documents named
/// `{project}_dashboardReader`. A grant covers the shared `analyses`
/// collection, each member analysis ID, and the member's data collections.
pub struct Projects<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> Projects<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<ProjectName>, LoaderError> {
        let mut projects: Vec<ProjectName> = self
            .store
            .list_roles()?
            .iter()
            .filter_map(|role| ProjectName::from_role_name(role))
            .collect();
        projects.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(projects)
    }

    pub fn exists(&self, project: &ProjectName) -> Result<bool, LoaderError> {
        Ok(self.store.get_role(&project.role_name())?.is_some())
    }

    pub fn verify_exist(&self, projects: &[ProjectName]) -> Result<(), LoaderError> {
        let mut missing = Vec::new();
        for project in projects {
            if !self.exists(project)? {
                missing.push(project.as_str().to_string());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::ProjectsMissing(missing))
        }
    }

    pub fn add(&self, project: &ProjectName, members: &[AnalysisId]) -> Result<(), LoaderError> {
        if self.exists(project)? {
            return Err(LoaderError::ProjectExists(project.as_str().to_string()));
        }
        verify_loaded(self.store, members)?;

        let mut collections = BTreeSet::new();
        collections.insert(ANALYSES_COLLECTION.to_string());
        for member in members {
            collections.extend(member_entries(member));
        }
        self.store.put_role(
            &project.role_name(),
            &RoleGrant::read(collections.into_iter().collect()),
        )?;
        tracing::info!(project = %project, members = members.len(), "added project");
        Ok(())
    }

    pub fn add_analyses(
        &self,
        project: &ProjectName,
        ids: &[AnalysisId],
    ) -> Result<(), LoaderError> {
        let role_name = project.role_name();
        let grant = self
            .store
            .get_role(&role_name)?
            .ok_or_else(|| LoaderError::ProjectsMissing(vec![project.as_str().to_string()]))?;
        verify_loaded(self.store, ids)?;

        let mut collections: BTreeSet<String> = grant.collections.into_iter().collect();
        collections.insert(ANALYSES_COLLECTION.to_string());
        for id in ids {
            collections.extend(member_entries(id));
        }
        self.store.put_role(
            &role_name,
            &RoleGrant::read(collections.into_iter().collect()),
        )?;
        tracing::info!(project = %project, analyses = ids.len(), "added analyses to project");
        Ok(())
    }

    /// Add one loaded analysis to every named project. All projects are
    /// checked before the first membership write.
    pub fn add_analysis_to_projects(
        &self,
        id: &AnalysisId,
        projects: &[ProjectName],
    ) -> Result<(), LoaderError> {
        self.verify_exist(projects)?;
        for project in projects {
            self.add_analyses(project, std::slice::from_ref(id))?;
        }
        Ok(())
    }

    /// Remove an analysis from the given projects, or from every existing
    /// project when none are named. Removing a non-member is a no-op.
    pub fn remove_analysis(
        &self,
        id: &AnalysisId,
        projects: Option<&[ProjectName]>,
    ) -> Result<(), LoaderError> {
        let projects = match projects {
            Some(projects) => projects.to_vec(),
            None => self.list()?,
        };

        let entries = member_entries(id);
        for project in &projects {
            let role_name = project.role_name();
            let Some(grant) = self.store.get_role(&role_name)? else {
                continue;
            };
            let mut collections: BTreeSet<String> = grant.collections.into_iter().collect();
            let before = collections.len();
            for entry in &entries {
                collections.remove(entry);
            }
            if collections.len() != before {
                tracing::info!(project = %project, analysis = %id, "removing analysis from project");
                self.store.put_role(
                    &role_name,
                    &RoleGrant::read(collections.into_iter().collect()),
                )?;
            }
        }
        Ok(())
    }

    pub fn remove(&self, project: &ProjectName) -> Result<(), LoaderError> {
        self.store.delete_role(&project.role_name())?;
        tracing::info!(project = %project, "removed project");
        Ok(())
    }

    /// Member analysis IDs of a project: grant entries that are neither the
    /// shared collection nor a per-type data collection.
    pub fn members(&self, project: &ProjectName) -> Result<Vec<String>, LoaderError> {
        let grant = self
            .store
            .get_role(&project.role_name())?
            .ok_or_else(|| LoaderError::ProjectsMissing(vec![project.as_str().to_string()]))?;
        Ok(grant
            .collections
            .into_iter()
            .filter(|entry| entry != ANALYSES_COLLECTION && !is_data_collection(entry))
            .collect())
    }
}

fn member_entries(id: &AnalysisId) -> Vec<String> {
    let mut entries = vec![id.as_str().to_string()];
    entries.extend(DataType::ALL.iter().map(|data_type| id.data_collection(*data_type)));
    entries
}

fn is_data_collection(name: &str) -> bool {
    DataType::ALL
        .iter()
        .any(|data_type| name.ends_with(&format!("_{}", data_type.as_str())))
}

/// Registry of known metadata fields, kept so the dashboard can distinguish
/// registered fields from ad hoc ones.
pub struct LabelRegistry<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    exclusions: BTreeSet<String>,
}

impl<'a, S: DocumentStore + ?Sized> LabelRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_exclusions(
            store,
            ["dashboard_type", "jira_id"].into_iter().map(String::from),
        )
    }

    pub fn with_exclusions(
        store: &'a S,
        exclusions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            exclusions: exclusions.into_iter().collect(),
        }
    }

    pub fn initialize(&self) -> Result<(), LoaderError> {
        ensure_collection(self.store, LABELS_COLLECTION)
    }

    pub fn add(&self, field: &str) -> Result<(), LoaderError> {
        let mut record: Record = Map::new();
        record.insert("id".to_string(), Value::String(field.to_string()));
        record.insert(
            "name".to_string(),
            Value::String(field.replace('_', " ")),
        );
        self.store.put_record(LABELS_COLLECTION, field, &record)
    }

    pub fn known(&self) -> Result<BTreeSet<String>, LoaderError> {
        Ok(self
            .store
            .list_record_ids(LABELS_COLLECTION)?
            .into_iter()
            .collect())
    }

    /// Fields present in the analyses collection schema but absent from the
    /// registry, minus the exclusion set.
    pub fn missing(&self) -> Result<Vec<String>, LoaderError> {
        let known = self.known()?;
        Ok(self
            .store
            .collection_fields(ANALYSES_COLLECTION)?
            .into_iter()
            .filter(|field| !known.contains(field) && !self.exclusions.contains(field))
            .collect())
    }

    pub fn reconcile(&self) -> Result<Vec<String>, LoaderError> {
        self.initialize()?;
        let missing = self.missing()?;
        for field in &missing {
            tracing::info!(field, "registering metadata label");
            self.add(field)?;
        }
        Ok(missing)
    }
}
