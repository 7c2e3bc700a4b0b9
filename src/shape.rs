use crate::domain::{DataType, Framework};
use crate::error::LoaderError;
use crate::extract::RawTables;
use crate::table::{Cell, Table};

/// The four canonical row tables derived from one analysis's raw results.
#[derive(Debug, Clone)]
pub struct ShapedTables {
    pub qc: Table,
    pub segs: Table,
    pub bins: Table,
    pub gc_bias: Table,
}

impl ShapedTables {
    pub fn get(&self, data_type: DataType) -> &Table {
        match data_type {
            DataType::Qc => &self.qc,
            DataType::Segs => &self.segs,
            DataType::Bins => &self.bins,
            DataType::GcBias => &self.gc_bias,
        }
    }
}

pub fn shape(raw: &RawTables, framework: Framework) -> Result<ShapedTables, LoaderError> {
    Ok(ShapedTables {
        qc: shape_qc(raw, framework)?,
        segs: shape_chrom_table(raw, "hmmcopy_segs")?,
        bins: shape_chrom_table(raw, "hmmcopy_reads")?,
        gc_bias: shape_gc_bias(raw)?,
    })
}

fn shape_qc(raw: &RawTables, framework: Framework) -> Result<Table, LoaderError> {
    let mut table = raw.require(framework.metrics_table())?.clone();
    for (from, to) in framework.qc_renames() {
        table.rename_column(from, to);
    }

    let unmapped = table.require_column("unmapped_reads")?;
    let total = table.require_column("total_reads")?;
    let percent: Vec<Cell> = table
        .rows()
        .iter()
        .map(|row| divide(&row[unmapped], &row[total]))
        .collect();
    table.add_column("percent_unmapped_reads", percent);

    let contaminated = table.require_column("is_contaminated")?;
    table.map_column(contaminated, normalize_flag);

    Ok(table)
}

fn shape_chrom_table(raw: &RawTables, source: &str) -> Result<Table, LoaderError> {
    let mut table = raw.require(source)?.clone();
    let chrom = table.require_column("chr")?;
    let numbers: Vec<Cell> = table
        .rows()
        .iter()
        .map(|row| Cell::Str(chrom_number(&chrom_label(&row[chrom]))))
        .collect();
    table.add_column("chrom_number", numbers);
    Ok(table)
}

fn shape_gc_bias(raw: &RawTables) -> Result<Table, LoaderError> {
    let source = raw.require("gc_metrics")?;
    let cell_id = source.require_column("cell_id")?;

    let mut percent_columns = Vec::with_capacity(101);
    for percent in 0..=100u8 {
        percent_columns.push(source.require_column(&percent.to_string())?);
    }

    let mut table = Table::new(
        "gc_bias",
        vec![
            "cell_id".to_string(),
            "gc_percent".to_string(),
            "value".to_string(),
        ],
    );
    for (percent, column) in percent_columns.iter().enumerate() {
        for row in source.rows() {
            table.push_row(vec![
                row[cell_id].clone(),
                Cell::Int(percent as i64),
                row[*column].clone(),
            ]);
        }
    }
    Ok(table)
}

fn divide(numerator: &Cell, denominator: &Cell) -> Cell {
    match (as_f64(numerator), as_f64(denominator)) {
        (Some(num), Some(den)) => Cell::Float(num / den),
        _ => Cell::Null,
    }
}

fn as_f64(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Int(value) => Some(*value as f64),
        Cell::Float(value) => Some(*value),
        _ => None,
    }
}

fn normalize_flag(cell: &Cell) -> Cell {
    match cell {
        Cell::Bool(true) => Cell::Str("true".to_string()),
        Cell::Bool(false) => Cell::Str("false".to_string()),
        Cell::Str(value) if value.eq_ignore_ascii_case("true") => Cell::Str("true".to_string()),
        Cell::Str(value) if value.eq_ignore_ascii_case("false") => Cell::Str("false".to_string()),
        other => other.clone(),
    }
}

fn chrom_label(cell: &Cell) -> String {
    let label = match cell {
        Cell::Int(value) => value.to_string(),
        Cell::Str(value) => value.clone(),
        Cell::Float(value) => value.to_string(),
        Cell::Bool(value) => value.to_string(),
        Cell::Null => String::new(),
    };
    label.strip_prefix("chr").unwrap_or(&label).to_string()
}

/// Zero-pad single-digit chromosome labels so lexicographic sorting matches
/// genomic order; every other label passes through unchanged.
fn chrom_number(label: &str) -> String {
    match label {
        "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9" => format!("0{label}"),
        other => other.to_string(),
    }
}
