use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;

use crate::error::LoaderError;
use crate::table::{Cell, Table};

/// Named tables read from an analysis's result directories.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    tables: BTreeMap<String, Table>,
}

impl RawTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Table, LoaderError> {
        self.get(name)
            .ok_or_else(|| LoaderError::MissingTable(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

/// Result directories of one analysis. A combined QC directory is expressed
/// by pointing all three at the same path.
#[derive(Debug, Clone)]
pub struct ResultDirs {
    pub alignment: Utf8PathBuf,
    pub hmmcopy: Utf8PathBuf,
    pub annotation: Utf8PathBuf,
}

impl ResultDirs {
    pub fn combined(dir: &Utf8Path) -> Self {
        Self {
            alignment: dir.to_path_buf(),
            hmmcopy: dir.to_path_buf(),
            annotation: dir.to_path_buf(),
        }
    }
}

pub trait ResultsExtractor: Send + Sync {
    fn extract(&self, dirs: &ResultDirs) -> Result<RawTables, LoaderError>;
}

const TABLE_NAMES: &[&str] = &[
    "annotation_metrics",
    "hmmcopy_metrics",
    "hmmcopy_segs",
    "hmmcopy_reads",
    "gc_metrics",
];

/// Reads result tables as CSV or gzip-compressed CSV, discovering files by
/// table-name suffix. Tables absent from the directories are simply not
/// extracted; the shaper decides which ones are required.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExtractor;

impl CsvExtractor {
    fn source_dir<'a>(dirs: &'a ResultDirs, table: &str) -> &'a Utf8Path {
        match table {
            "annotation_metrics" => &dirs.annotation,
            "gc_metrics" => &dirs.alignment,
            _ => &dirs.hmmcopy,
        }
    }
}

impl ResultsExtractor for CsvExtractor {
    fn extract(&self, dirs: &ResultDirs) -> Result<RawTables, LoaderError> {
        let mut raw = RawTables::new();
        for table in TABLE_NAMES {
            let dir = Self::source_dir(dirs, table);
            match find_table_file(dir, table)? {
                Some(path) => {
                    tracing::info!(table, path = %path, "reading results table");
                    raw.insert(read_csv_table(table, &path)?);
                }
                None => {
                    tracing::debug!(table, dir = %dir, "no results file found");
                }
            }
        }
        Ok(raw)
    }
}

fn find_table_file(dir: &Utf8Path, table: &str) -> Result<Option<Utf8PathBuf>, LoaderError> {
    let plain = format!("{table}.csv");
    let gzipped = format!("{table}.csv.gz");

    let mut matches = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = current.read_dir_utf8().map_err(|err| LoaderError::ResultsRead {
            path: current.to_string(),
            message: err.to_string(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|err| LoaderError::ResultsRead {
                path: current.to_string(),
                message: err.to_string(),
            })?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.to_path_buf());
            } else if let Some(name) = path.file_name() {
                if name.ends_with(&plain) || name.ends_with(&gzipped) {
                    matches.push(path.to_path_buf());
                }
            }
        }
    }

    matches.sort();
    Ok(matches.into_iter().next())
}

fn read_csv_table(table: &str, path: &Utf8Path) -> Result<Table, LoaderError> {
    let file = File::open(path).map_err(|err| LoaderError::ResultsRead {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    let reader: Box<dyn Read> = if path.as_str().ends_with(".gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|err| LoaderError::ResultsRead {
            path: path.to_string(),
            message: err.to_string(),
        })?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut parsed = Table::new(table, headers);
    for record in csv_reader.records() {
        let record = record.map_err(|err| LoaderError::ResultsRead {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        parsed.push_row(record.iter().map(Cell::parse).collect());
    }
    Ok(parsed)
}
