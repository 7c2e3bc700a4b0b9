use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LoaderError;

pub const ANALYSES_COLLECTION: &str = "analyses";
pub const LABELS_COLLECTION: &str = "metadata_labels";
pub const ROLE_SUFFIX: &str = "_dashboardReader";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Qc,
    Segs,
    Bins,
    GcBias,
}

impl DataType {
    pub const ALL: [DataType; 4] = [DataType::Qc, DataType::Segs, DataType::Bins, DataType::GcBias];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Qc => "qc",
            DataType::Segs => "segs",
            DataType::Bins => "bins",
            DataType::GcBias => "gc_bias",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Scp,
    Mondrian,
}

impl Framework {
    pub fn metrics_table(&self) -> &'static str {
        match self {
            Framework::Scp => "annotation_metrics",
            Framework::Mondrian => "hmmcopy_metrics",
        }
    }

    pub fn qc_renames(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Framework::Scp => &[],
            Framework::Mondrian => &[
                ("clustering_order", "order"),
                ("condition", "experimental_condition"),
            ],
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framework::Scp => write!(f, "scp"),
            Framework::Mondrian => write!(f, "mondrian"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisId(String);

impl AnalysisId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn data_collection(&self, data_type: DataType) -> String {
        format!("{}_{}", self.0.to_lowercase(), data_type.as_str())
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AnalysisId {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        if !is_valid {
            return Err(LoaderError::InvalidAnalysisId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn role_name(&self) -> String {
        format!("{}{}", self.0, ROLE_SUFFIX)
    }

    pub fn from_role_name(role: &str) -> Option<Self> {
        role.strip_suffix(ROLE_SUFFIX)
            .filter(|name| !name.is_empty())
            .map(|name| Self(name.to_string()))
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectName {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty() && !trimmed.chars().any(|ch| ch.is_whitespace());
        if !is_valid {
            return Err(LoaderError::InvalidProjectName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisEntry {
    pub analysis_id: AnalysisId,
    pub library_id: String,
    pub sample_id: String,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
    pub timestamp: String,
    pub cell_count: Option<u64>,
}

impl AnalysisEntry {
    pub fn new(
        analysis_id: AnalysisId,
        library_id: &str,
        sample_id: &str,
        description: &str,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            analysis_id,
            library_id: library_id.to_string(),
            sample_id: sample_id.to_string(),
            description: description.to_string(),
            metadata,
            timestamp: chrono::Utc::now().to_rfc3339(),
            cell_count: None,
        }
    }

    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        for (key, value) in &self.metadata {
            record.insert(key.clone(), Value::String(value.clone()));
        }
        record.insert("timestamp".to_string(), Value::String(self.timestamp.clone()));
        record.insert(
            "dashboard_id".to_string(),
            Value::String(self.analysis_id.as_str().to_string()),
        );
        record.insert(
            "jira_id".to_string(),
            Value::String(self.analysis_id.as_str().to_string()),
        );
        record.insert("dashboard_type".to_string(), Value::String("single".to_string()));
        record.insert("library_id".to_string(), Value::String(self.library_id.clone()));
        record.insert("sample_id".to_string(), Value::String(self.sample_id.clone()));
        record.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        if let Some(count) = self.cell_count {
            record.insert("cell_count".to_string(), Value::Number(count.into()));
        }
        record
    }
}

pub fn parse_metadata_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>, LoaderError> {
    let mut metadata = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once(':')
            .ok_or_else(|| LoaderError::InvalidMetadata(pair.clone()))?;
        if key.trim().is_empty() {
            return Err(LoaderError::InvalidMetadata(pair.clone()));
        }
        metadata.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_analysis_id_valid() {
        let id: AnalysisId = "SC-1935".parse().unwrap();
        assert_eq!(id.as_str(), "SC-1935");
    }

    #[test]
    fn parse_analysis_id_invalid() {
        let err = "no spaces allowed".parse::<AnalysisId>().unwrap_err();
        assert_matches!(err, LoaderError::InvalidAnalysisId(_));

        let err = "".parse::<AnalysisId>().unwrap_err();
        assert_matches!(err, LoaderError::InvalidAnalysisId(_));
    }

    #[test]
    fn data_collection_names_are_lowercased() {
        let id: AnalysisId = "SC-1935".parse().unwrap();
        assert_eq!(id.data_collection(DataType::Qc), "sc-1935_qc");
        assert_eq!(id.data_collection(DataType::GcBias), "sc-1935_gc_bias");
    }

    #[test]
    fn project_role_name_round_trip() {
        let project: ProjectName = "DLP".parse().unwrap();
        assert_eq!(project.role_name(), "DLP_dashboardReader");

        let parsed = ProjectName::from_role_name("DLP_dashboardReader").unwrap();
        assert_eq!(parsed, project);
        assert!(ProjectName::from_role_name("superuser").is_none());
    }

    #[test]
    fn entry_record_fields() {
        let id: AnalysisId = "SC-1935".parse().unwrap();
        let mut metadata = BTreeMap::new();
        metadata.insert("batch".to_string(), "1".to_string());
        let mut entry = AnalysisEntry::new(id, "A96213A", "SA1090", "test run", metadata);
        entry.cell_count = Some(120);

        let record = entry.to_record();
        assert_eq!(record["dashboard_id"], "SC-1935");
        assert_eq!(record["jira_id"], "SC-1935");
        assert_eq!(record["dashboard_type"], "single");
        assert_eq!(record["library_id"], "A96213A");
        assert_eq!(record["sample_id"], "SA1090");
        assert_eq!(record["batch"], "1");
        assert_eq!(record["cell_count"], 120);
    }

    #[test]
    fn metadata_pairs() {
        let pairs = vec!["batch:1".to_string(), "site: left ".to_string()];
        let metadata = parse_metadata_pairs(&pairs).unwrap();
        assert_eq!(metadata["batch"], "1");
        assert_eq!(metadata["site"], "left");

        let err = parse_metadata_pairs(&["nocolon".to_string()]).unwrap_err();
        assert_matches!(err, LoaderError::InvalidMetadata(_));
    }
}
