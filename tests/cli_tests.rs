/// End-to-end checks of the taxkit binary
mod common;

use assert_cmd::Command;
use common::{write_taxdump, TestEnvironment};
use predicates::prelude::*;

fn taxkit(env: &TestEnvironment) -> Command {
    let mut cmd = Command::cargo_bin("taxkit").unwrap();
    cmd.env("TAXKIT_HOME", env.path("home"))
        .env_remove("RUST_LOG")
        .env_remove("TAXKIT_LOG")
        .arg("--data-dir")
        .arg(&env.data_dir);
    cmd
}

#[test]
fn test_minimal_lineage_and_lca() {
    let env = TestEnvironment::new();
    write_taxdump(
        &env.data_dir,
        &[
            (1, 1, "no rank", "root"),
            (2, 1, "superkingdom", "Bacteria"),
            (3, 2, "phylum", "Proteobacteria"),
        ],
        &[],
        &[],
    );

    taxkit(&env)
        .arg("lineage")
        .write_stdin("3\n")
        .assert()
        .success()
        .stdout("3\tBacteria;Proteobacteria\n");

    taxkit(&env)
        .arg("lca")
        .write_stdin("2 3\n")
        .assert()
        .success()
        .stdout("2 3\t2\n");
}

#[test]
fn test_lineage_columns_and_status() {
    let env = TestEnvironment::sample();
    taxkit(&env)
        .args(["lineage", "-c", "-n", "-r", "-t"])
        .write_stdin("562\n469598\n3\n999999\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "562\t562\tcellular organisms;Bacteria;Proteobacteria;Gammaproteobacteria;Enterobacterales;Enterobacteriaceae;Escherichia;Escherichia coli\t131567;2;1224;1236;91347;543;561;562\tEscherichia coli\tspecies\n",
        ))
        .stdout(predicate::str::contains("469598\t562\tcellular organisms;"))
        .stdout(predicate::str::contains("3\t0\t\t\t\t\n"))
        .stdout(predicate::str::contains("999999\t-1\t\t\t\t\n"));
}

#[test]
fn test_lineage_pads_unparsable_taxids() {
    let env = TestEnvironment::sample();
    taxkit(&env)
        .args(["lineage", "-n"])
        .write_stdin("abc\n562\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("abc\t\t\n"));

    taxkit(&env)
        .args(["lineage", "-c", "-r", "-i", "2"])
        .write_stdin("only-one-field\nx\t3\n")
        .assert()
        .success()
        .stdout("only-one-field\t-1\t\t\nx\t3\t0\t\t\n");
}

#[test]
fn test_list_reports_cycle() {
    let env = TestEnvironment::new();
    write_taxdump(
        &env.data_dir,
        &[
            (1, 1, "no rank", "root"),
            (3, 4, "genus", "G"),
            (4, 3, "family", "F"),
        ],
        &[],
        &[],
    );

    taxkit(&env)
        .args(["list", "--ids", "3"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .code(5);
}

#[test]
fn test_lca_skip_flags() {
    let env = TestEnvironment::sample();
    taxkit(&env)
        .arg("lca")
        .write_stdin("562 623 3\n")
        .assert()
        .success()
        .stdout("562 623 3\t0\n");

    taxkit(&env)
        .args(["lca", "--skip-deleted"])
        .write_stdin("562 623 3\n")
        .assert()
        .success()
        .stdout("562 623 3\t543\n");

    taxkit(&env)
        .args(["lca", "-D", "-U", "-s", ","])
        .write_stdin("83333,999999,469598\n")
        .assert()
        .success()
        .stdout("83333,999999,469598\t562\n");
}

#[test]
fn test_filter_lower_than() {
    let env = TestEnvironment::sample();
    taxkit(&env)
        .args(["filter", "--lower-than", "genus", "--discard-noranks"])
        .write_stdin("1\n131567\n2\n543\n561\n562\n")
        .assert()
        .success()
        .stdout("2\n543\n");
    assert!(env.data_dir.join("ranks.txt").exists());
}

#[test]
fn test_filter_rejects_both_bounds() {
    let env = TestEnvironment::sample();
    taxkit(&env)
        .args(["filter", "--lower-than", "genus", "--higher-than", "phylum"])
        .write_stdin("2\n")
        .assert()
        .failure();
}

#[test]
fn test_filter_list_order() {
    let env = TestEnvironment::sample();
    taxkit(&env)
        .args(["filter", "--list-order"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("life\n"))
        .stdout(predicate::str::contains("!no rank"));
}

#[test]
fn test_list_subtree() {
    let env = TestEnvironment::sample();
    taxkit(&env)
        .args(["list", "--ids", "543", "-n"])
        .assert()
        .success()
        .stdout(
            "543 Enterobacteriaceae\n  561 Escherichia\n    562 Escherichia coli\n      83333 Escherichia coli K-12\n  620 Shigella\n    623 Shigella flexneri\n\n",
        );

    taxkit(&env)
        .args(["list", "--ids", "620", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"623\": {}"));
}

#[test]
fn test_name2taxid() {
    let env = TestEnvironment::sample();
    taxkit(&env)
        .args(["name2taxid", "-r"])
        .write_stdin("Escherichia coli\nNothing here\n")
        .assert()
        .success()
        .stdout("Escherichia coli\t562\tspecies\nNothing here\t\t\n");
}

#[test]
fn test_create_taxdump_and_query() {
    let env = TestEnvironment::new();
    let input = env.path("gtdb.tsv");
    std::fs::write(
        &input,
        "RS_GCF_000001.1\td__Bacteria;p__P1;c__C1;o__O1;f__F1;g__G1;s__G1 sp1\n",
    )
    .unwrap();
    let out_dir = env.path("custom");

    taxkit(&env)
        .args(["create-taxdump", "--gtdb", "--out-dir"])
        .arg(&out_dir)
        .arg(&input)
        .assert()
        .success();

    let map = std::fs::read_to_string(out_dir.join("taxid.map")).unwrap();
    let taxid = map.trim_end().split('\t').nth(1).unwrap().to_string();

    let mut cmd = Command::cargo_bin("taxkit").unwrap();
    cmd.env("TAXKIT_HOME", env.path("home"))
        .arg("--data-dir")
        .arg(&out_dir)
        .arg("lineage")
        .write_stdin(format!("{}\n", taxid))
        .assert()
        .success()
        .stdout(format!("{}\tBacteria;P1;C1;O1;F1;G1;G1 sp1;000001\n", taxid));
}

#[test]
fn test_create_taxdump_needs_species_field() {
    let env = TestEnvironment::new();
    let input = env.path("table.tsv");
    std::fs::write(&input, "Bacteria\tG1\n").unwrap();

    taxkit(&env)
        .args(["create-taxdump", "-K", "1", "-G", "2"])
        .arg(&input)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("species"));
}

#[test]
fn test_taxid_changelog() {
    let env = TestEnvironment::new();
    let archive = env.path("archive");
    write_taxdump(
        &archive.join("v1"),
        &[(1, 1, "no rank", "root"), (2, 1, "superkingdom", "Bacteria")],
        &[],
        &[],
    );
    write_taxdump(
        &archive.join("v2"),
        &[(1, 1, "no rank", "root"), (2, 1, "superkingdom", "Bacteria2")],
        &[],
        &[],
    );

    taxkit(&env)
        .args(["taxid-changelog", "--archive"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "taxid,version,change,change-value,name,rank,lineage,lineage-taxids\n",
        ))
        .stdout(predicate::str::contains("2,v2,CHANGE_NAME,,Bacteria2,superkingdom,Bacteria2,2\n"));
}

#[test]
fn test_missing_taxdump_is_io_error() {
    let env = TestEnvironment::new();
    taxkit(&env)
        .arg("lineage")
        .write_stdin("1\n")
        .assert()
        .failure()
        .code(3);
}
