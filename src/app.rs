use std::collections::BTreeMap;

use serde::Serialize;

use crate::acl::{LabelRegistry, Projects};
use crate::domain::{ANALYSES_COLLECTION, AnalysisEntry, AnalysisId, Framework, ProjectName};
use crate::error::LoaderError;
use crate::extract::{ResultDirs, ResultsExtractor};
use crate::lifecycle::{Lifecycle, LoadSummary};
use crate::shape::shape;
use crate::store::{DocumentStore, ensure_collection};

pub const DEFAULT_PROJECT: &str = "DLP";

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub id: AnalysisId,
    pub dirs: ResultDirs,
    pub framework: Framework,
    pub library_id: String,
    pub sample_id: String,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
    pub projects: Vec<ProjectName>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectList {
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub dangling: Vec<String>,
    pub cleaned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeResult {
    pub default_project_created: bool,
}

pub struct App<S: DocumentStore, E: ResultsExtractor> {
    store: S,
    extractor: E,
}

impl<S: DocumentStore, E: ResultsExtractor> App<S, E> {
    pub fn new(store: S, extractor: E) -> Self {
        Self { store, extractor }
    }

    pub fn load(&self, request: LoadRequest) -> Result<LoadSummary, LoaderError> {
        let raw = self.extractor.extract(&request.dirs)?;
        let tables = shape(&raw, request.framework)?;
        let entry = AnalysisEntry::new(
            request.id,
            &request.library_id,
            &request.sample_id,
            &request.description,
            request.metadata,
        );
        Lifecycle::new(&self.store).load(entry, &tables, &request.projects)
    }

    pub fn clean(&self, id: &AnalysisId) -> Result<(), LoaderError> {
        Lifecycle::new(&self.store).clean(id)
    }

    pub fn add_project(
        &self,
        project: &ProjectName,
        analyses: &[AnalysisId],
    ) -> Result<(), LoaderError> {
        Projects::new(&self.store).add(project, analyses)
    }

    pub fn add_analyses_to_project(
        &self,
        project: &ProjectName,
        analyses: &[AnalysisId],
    ) -> Result<(), LoaderError> {
        Projects::new(&self.store).add_analyses(project, analyses)
    }

    pub fn remove_project(&self, project: &ProjectName) -> Result<(), LoaderError> {
        Projects::new(&self.store).remove(project)
    }

    pub fn list_projects(&self) -> Result<ProjectList, LoaderError> {
        let projects = Projects::new(&self.store)
            .list()?
            .into_iter()
            .map(|project| project.as_str().to_string())
            .collect();
        Ok(ProjectList { projects })
    }

    /// Report analyses whose metadata record exists but whose data
    /// collections are missing; optionally clean them.
    pub fn verify(&self, delete: bool) -> Result<VerifyResult, LoaderError> {
        let lifecycle = Lifecycle::new(&self.store);
        let dangling = lifecycle.find_dangling()?;
        if delete {
            for id in &dangling {
                lifecycle.clean(id)?;
            }
        }
        Ok(VerifyResult {
            dangling: dangling.iter().map(|id| id.as_str().to_string()).collect(),
            cleaned: delete,
        })
    }

    pub fn initialize(&self) -> Result<InitializeResult, LoaderError> {
        ensure_collection(&self.store, ANALYSES_COLLECTION)?;
        LabelRegistry::new(&self.store).initialize()?;

        let projects = Projects::new(&self.store);
        let default_project: ProjectName = DEFAULT_PROJECT.parse()?;
        let created = if projects.exists(&default_project)? {
            false
        } else {
            projects.add(&default_project, &[])?;
            true
        };
        Ok(InitializeResult {
            default_project_created: created,
        })
    }
}
