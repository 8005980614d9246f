mod common;

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

use common::{COUNTIES_CSV, SINGLE_PATTERN_CSV, TestWorkspace, patterns_csv};

fn bin() -> Command {
    Command::cargo_bin("county-patterns").expect("binary exists")
}

#[test]
fn run_writes_all_artifacts_and_prints_summary() {
    let workspace = TestWorkspace::new();
    let counties = workspace.write("counties.csv", COUNTIES_CSV);
    let patterns = workspace.write("patterns.csv", SINGLE_PATTERN_CSV);
    let output = workspace.output_dir();

    bin()
        .args([
            "run",
            "--counties",
            counties.to_str().unwrap(),
            "--patterns",
            patterns.to_str().unwrap(),
            "--output-dir",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("pattern").and(contains("total")));

    for name in [
        "feature_dict.csv",
        "pattern_constraints.csv",
        "norc_with_pattern.csv",
        "normalized_norc_with_pattern.csv",
        "final.csv",
        "run_report.json",
    ] {
        assert!(output.join(name).exists(), "missing {name}");
    }
    let final_csv = fs::read_to_string(output.join("final.csv")).expect("read final");
    assert_eq!(
        final_csv,
        "Pattern_id,county_id,death_rate,edu\n1,B,1,-1\n1,C,0,-1\n"
    );
}

#[test]
fn run_reads_yaml_config_with_cli_overrides() {
    let workspace = TestWorkspace::new();
    let counties = workspace.write(
        "counties.tsv",
        "fips\tdeath_rate\tmetro\n01001\t0.2\tMetro\n01003\t0.9\tNonmetro\n",
    );
    let patterns = workspace.write(
        "patterns.csv",
        &patterns_csv(&["{'ID': 5, 'constraints': {'metro': {'ub': 1}}}"]),
    );
    let config = workspace.write(
        "pipeline.yml",
        &format!(
            "county_table: {}\npattern_table: {}\noutput_dir: ignored\ncounty_id_column: fips\n\
             categorical:\n  column: metro\n  positive: Metro\n  negative: Nonmetro\n",
            counties.display(),
            patterns.display()
        ),
    );
    let output = workspace.output_dir();

    bin()
        .args([
            "run",
            "--config",
            config.to_str().unwrap(),
            "--output-dir",
            output.to_str().unwrap(),
            "--quiet",
        ])
        .assert()
        .success();

    let final_csv = fs::read_to_string(output.join("final.csv")).expect("read final");
    assert_eq!(
        final_csv,
        "Pattern_id,fips,death_rate,metro\n5,01001,-1,1\n5,01003,-1,0\n"
    );
    assert!(!workspace.path().join("ignored").exists());
}

#[test]
fn run_fails_on_malformed_description() {
    let workspace = TestWorkspace::new();
    let counties = workspace.write("counties.csv", COUNTIES_CSV);
    let patterns = workspace.write(
        "patterns.csv",
        &patterns_csv(&["{'ID': 1, 'constraints': {'edu': {'lb': __import__}}}"]),
    );

    bin()
        .args([
            "run",
            "--counties",
            counties.to_str().unwrap(),
            "--patterns",
            patterns.to_str().unwrap(),
            "--output-dir",
            workspace.output_dir().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Unrecognized token '__import__'"));
    assert!(!workspace.output_dir().exists());
}

#[test]
fn run_exits_non_zero_when_validation_fails() {
    let workspace = TestWorkspace::new();
    let counties = workspace.write("counties.csv", COUNTIES_CSV);
    let patterns = workspace.write(
        "patterns.csv",
        &patterns_csv(&["{'ID': 1, 'constraints': {'edu': {'lb': 9, 'ub': 9}}}"]),
    );
    let output_dir = workspace.output_dir();
    let args = [
        "run",
        "--counties",
        counties.to_str().unwrap(),
        "--patterns",
        patterns.to_str().unwrap(),
        "--output-dir",
        output_dir.to_str().unwrap(),
        "--quiet",
    ];

    bin()
        .args(args)
        .assert()
        .failure()
        .stdout(contains("missing value"))
        .stderr(contains("Validation reported 1 violation(s)"));

    bin()
        .args(args)
        .arg("--allow-violations")
        .assert()
        .success();
}

#[test]
fn catalog_command_writes_feature_dictionary_only() {
    let workspace = TestWorkspace::new();
    let counties = workspace.write("counties.csv", COUNTIES_CSV);
    let patterns = workspace.write("patterns.csv", SINGLE_PATTERN_CSV);

    bin()
        .args([
            "catalog",
            "--counties",
            counties.to_str().unwrap(),
            "--patterns",
            patterns.to_str().unwrap(),
            "-o",
            workspace.output_dir().to_str().unwrap(),
        ])
        .assert()
        .success();

    let dict = fs::read_to_string(workspace.output_dir().join("feature_dict.csv"))
        .expect("read feature dict");
    assert_eq!(dict, "Feature_ID,Feature_Name\nf1,death_rate\nf2,edu\n");
    assert!(!workspace.output_dir().join("final.csv").exists());
}

#[test]
fn constraints_command_writes_constraint_table() {
    let workspace = TestWorkspace::new();
    let counties = workspace.write("counties.csv", COUNTIES_CSV);
    let patterns = workspace.write(
        "patterns.csv",
        &patterns_csv(&[
            "{'ID': 1, 'constraints': {'edu': {'lb': -inf, 'ub': 8}, 'income': {'lb': 1}}}",
        ]),
    );

    bin()
        .args([
            "constraints",
            "--counties",
            counties.to_str().unwrap(),
            "--patterns",
            patterns.to_str().unwrap(),
            "-o",
            workspace.output_dir().to_str().unwrap(),
        ])
        .assert()
        .success();

    let table = fs::read_to_string(workspace.output_dir().join("pattern_constraints.csv"))
        .expect("read constraints");
    assert_eq!(table, "Pattern_id,Feature_ID,UB,LB\n1,f2,8,-inf\n");
}

#[test]
fn validate_command_flags_out_of_range_cells() {
    let workspace = TestWorkspace::new();
    let good = workspace.write(
        "good.csv",
        "Pattern_id,county_id,a,b\n1,A,0,-1\n1,B,1,0.25\n",
    );
    let bad = workspace.write(
        "bad.csv",
        "Pattern_id,county_id,a,b\n1,A,1.5,-1\n1,B,1,0.25\n",
    );

    bin()
        .args(["validate", "-i", good.to_str().unwrap()])
        .assert()
        .success();

    bin()
        .args(["validate", "-i", bad.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(contains("out of range").and(contains("1.5")))
        .stderr(contains("1 violation(s)"));
}

#[test]
fn summary_command_counts_rows_per_pattern() {
    let workspace = TestWorkspace::new();
    let table = workspace.write(
        "norc_with_pattern.csv",
        "Pattern_id,county_id,x\n2,A,1\n2,B,2\n7,A,1\n",
    );

    bin()
        .args(["summary", "-i", table.to_str().unwrap()])
        .assert()
        .success()
        .stdout(
            contains("pattern  rows\n")
                .and(contains("2           2\n"))
                .and(contains("total       3\n")),
        );
}

#[test]
fn validate_command_uses_feature_dictionary_to_pick_columns() {
    let workspace = TestWorkspace::new();
    let table = workspace.write(
        "final.csv",
        "Pattern_id,county_id,a,note\n1,A,0.5,rural\n1,B,-1,urban\n",
    );
    let dict = workspace.write("feature_dict.csv", "Feature_ID,Feature_Name\nf1,a\n");

    bin()
        .args(["validate", "-i", table.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(contains("non-numeric"));

    bin()
        .args([
            "validate",
            "-i",
            table.to_str().unwrap(),
            "--feature-dict",
            dict.to_str().unwrap(),
        ])
        .assert()
        .success();

    let stale = workspace.write("stale_dict.csv", "Feature_ID,Feature_Name\nf1,a\nf2,edu\n");
    bin()
        .args([
            "validate",
            "-i",
            table.to_str().unwrap(),
            "--feature-dict",
            stale.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Feature 'edu' not present"));
}
