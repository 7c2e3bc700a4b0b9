use std::fs::File;
use std::io::Write;
use std::path::Path;

use camino::Utf8PathBuf;
use celldash_loader::extract::{CsvExtractor, ResultDirs, ResultsExtractor};
use celldash_loader::table::Cell;
use flate2::Compression;
use flate2::write::GzEncoder;

fn write_csv(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn write_csv_gz(dir: &Path, name: &str, content: &str) {
    let file = File::create(dir.join(name)).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
}

#[test]
fn combined_dir_extracts_plain_and_gzipped_tables() {
    let temp = tempfile::tempdir().unwrap();
    write_csv(
        temp.path(),
        "hmmcopy_metrics.csv",
        "cell_id,total_reads,is_contaminated\nc1,100,False\nc2,250,True\n",
    );
    write_csv_gz(
        temp.path(),
        "hmmcopy_segs.csv.gz",
        "cell_id,chr,state\nc1,1,2\nc1,X,3\n",
    );

    let dirs = ResultDirs::combined(&utf8(temp.path()));
    let raw = CsvExtractor.extract(&dirs).unwrap();

    let metrics = raw.require("hmmcopy_metrics").unwrap();
    assert_eq!(metrics.len(), 2);
    assert_eq!(*metrics.cell(0, 1), Cell::Int(100));
    assert_eq!(*metrics.cell(1, 2), Cell::Bool(true));

    let segs = raw.require("hmmcopy_segs").unwrap();
    assert_eq!(segs.len(), 2);
    assert_eq!(*segs.cell(1, 1), Cell::Str("X".to_string()));

    // tables without files are simply absent
    assert!(raw.get("gc_metrics").is_none());
}

#[test]
fn tables_are_read_from_their_own_result_dirs() {
    let alignment = tempfile::tempdir().unwrap();
    let hmmcopy = tempfile::tempdir().unwrap();
    let annotation = tempfile::tempdir().unwrap();

    write_csv(alignment.path(), "gc_metrics.csv", "cell_id,0\nc1,0.5\n");
    write_csv(hmmcopy.path(), "hmmcopy_reads.csv", "cell_id,chr\nc1,7\n");
    write_csv(
        annotation.path(),
        "annotation_metrics.csv",
        "cell_id,total_reads\nc1,10\n",
    );

    let dirs = ResultDirs {
        alignment: utf8(alignment.path()),
        hmmcopy: utf8(hmmcopy.path()),
        annotation: utf8(annotation.path()),
    };
    let raw = CsvExtractor.extract(&dirs).unwrap();

    assert!(raw.get("gc_metrics").is_some());
    assert!(raw.get("hmmcopy_reads").is_some());
    assert!(raw.get("annotation_metrics").is_some());
    assert!(raw.get("hmmcopy_metrics").is_none());
}

#[test]
fn files_are_discovered_by_suffix_in_subdirectories() {
    let temp = tempfile::tempdir().unwrap();
    let nested = temp.path().join("results").join("hmmcopy");
    std::fs::create_dir_all(&nested).unwrap();
    write_csv(
        &nested,
        "A90652A_hmmcopy_metrics.csv",
        "cell_id,total_reads\nc1,42\n",
    );

    let dirs = ResultDirs::combined(&utf8(temp.path()));
    let raw = CsvExtractor.extract(&dirs).unwrap();

    let metrics = raw.require("hmmcopy_metrics").unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(*metrics.cell(0, 1), Cell::Int(42));
}

#[test]
fn empty_cells_parse_as_null() {
    let temp = tempfile::tempdir().unwrap();
    write_csv(
        temp.path(),
        "hmmcopy_metrics.csv",
        "cell_id,quality\nc1,\nc2,0.9\n",
    );

    let dirs = ResultDirs::combined(&utf8(temp.path()));
    let raw = CsvExtractor.extract(&dirs).unwrap();

    let metrics = raw.require("hmmcopy_metrics").unwrap();
    assert_eq!(*metrics.cell(0, 1), Cell::Null);
    assert_eq!(*metrics.cell(1, 1), Cell::Float(0.9));
}
