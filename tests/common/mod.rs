#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use county_patterns::config::{CategoricalEncoding, PipelineConfig};
use county_patterns::dataset::Dataset;
use tempfile::{TempDir, tempdir};

/// Three counties used throughout the end-to-end tests.
pub const COUNTIES_CSV: &str = "county_id,death_rate,edu\n\
                                A,0.2,5\n\
                                B,0.8,9\n\
                                C,0.5,7\n";

pub const SINGLE_PATTERN_CSV: &str = "pattern,description\n\
                                      1,\"{'ID': 1, 'constraints': {'death_rate': {'lb': 0.4}}}\"\n";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("out")
    }

    /// Writes both inputs and returns a config pointing at them.
    pub fn config(&self, counties: &str, patterns: &str) -> PipelineConfig {
        let county_path = self.write("counties.csv", counties);
        let pattern_path = self.write("patterns.csv", patterns);
        PipelineConfig::new(county_path, pattern_path, self.output_dir())
    }

    pub fn artifact(&self, name: &str) -> Dataset {
        let path = self.output_dir().join(format!("{name}.csv"));
        Dataset::load(&path, b',', encoding_rs::UTF_8).expect("load artifact")
    }
}

pub fn metro_encoding() -> CategoricalEncoding {
    CategoricalEncoding {
        column: "metro".into(),
        positive: "Metro".into(),
        negative: "Nonmetro".into(),
    }
}

/// Builds a pattern table whose description cells are CSV-quoted.
pub fn patterns_csv(descriptions: &[&str]) -> String {
    let mut out = String::from("pattern,description\n");
    for (idx, description) in descriptions.iter().enumerate() {
        out.push_str(&format!("{},\"{}\"\n", idx + 1, description.replace('"', "\"\"")));
    }
    out
}

pub fn column<'a>(table: &'a Dataset, name: &str) -> Vec<&'a str> {
    let idx = table.column_index(name).expect("column present");
    table.rows.iter().map(|row| row[idx].as_str()).collect()
}
