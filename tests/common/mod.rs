//! Common test utilities for taxkit tests
//!
//! Builds NCBI-style taxdump directories inside temporary directories.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// (taxid, parent, rank, scientific name)
pub type Row<'a> = (u32, u32, &'a str, &'a str);

/// Small slice of the NCBI taxonomy
pub const SAMPLE: &[Row<'static>] = &[
    (1, 1, "no rank", "root"),
    (131567, 1, "no rank", "cellular organisms"),
    (2, 131567, "superkingdom", "Bacteria"),
    (1224, 2, "phylum", "Proteobacteria"),
    (1236, 1224, "class", "Gammaproteobacteria"),
    (91347, 1236, "order", "Enterobacterales"),
    (543, 91347, "family", "Enterobacteriaceae"),
    (561, 543, "genus", "Escherichia"),
    (562, 561, "species", "Escherichia coli"),
    (83333, 562, "strain", "Escherichia coli K-12"),
    (620, 543, "genus", "Shigella"),
    (623, 620, "species", "Shigella flexneri"),
    (2157, 131567, "superkingdom", "Archaea"),
];

pub const SAMPLE_MERGED: &[(u32, u32)] = &[(469598, 562)];
pub const SAMPLE_DELETED: &[u32] = &[3];

/// Write nodes.dmp, names.dmp, merged.dmp and delnodes.dmp into `dir`
pub fn write_taxdump(dir: &Path, taxa: &[Row], merged: &[(u32, u32)], deleted: &[u32]) {
    fs::create_dir_all(dir).expect("Failed to create taxdump dir");

    let nodes: String = taxa
        .iter()
        .map(|(id, parent, rank, _)| {
            format!("{}\t|\t{}\t|\t{}\t|\t\t|\t0\t|\t1\t|\t11\t|\t1\t|\t0\t|\t1\t|\t1\t|\t0\t|\t\t|\n", id, parent, rank)
        })
        .collect();
    let names: String = taxa
        .iter()
        .flat_map(|(id, _, _, name)| {
            [
                format!("{}\t|\t{}\t|\t\t|\tscientific name\t|\n", id, name),
                format!("{}\t|\t{} (synonym)\t|\t\t|\tsynonym\t|\n", id, name),
            ]
        })
        .collect();
    let merged: String = merged
        .iter()
        .map(|(old, new)| format!("{}\t|\t{}\t|\n", old, new))
        .collect();
    let deleted: String = deleted.iter().map(|id| format!("{}\t|\n", id)).collect();

    fs::write(dir.join("nodes.dmp"), nodes).expect("Failed to write nodes.dmp");
    fs::write(dir.join("names.dmp"), names).expect("Failed to write names.dmp");
    fs::write(dir.join("merged.dmp"), merged).expect("Failed to write merged.dmp");
    fs::write(dir.join("delnodes.dmp"), deleted).expect("Failed to write delnodes.dmp");
}

/// Test environment owning a temporary directory with a taxdump in `data_dir`
pub struct TestEnvironment {
    temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("taxdump");
        fs::create_dir_all(&data_dir).expect("Failed to create data dir");
        TestEnvironment { temp_dir, data_dir }
    }

    /// Environment holding [`SAMPLE`]
    pub fn sample() -> Self {
        let env = Self::new();
        write_taxdump(&env.data_dir, SAMPLE, SAMPLE_MERGED, SAMPLE_DELETED);
        env
    }

    /// Get a path within the test environment
    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }
}
