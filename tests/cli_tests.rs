use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create an ipcountry command isolated from the caller's environment
fn ipcountry_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ipcountry"));
    cmd.env_remove("IPCOUNTRY_DATASET")
        .env_remove("IPCOUNTRY_URL")
        .env_remove("IPCOUNTRY_CACHE_DIR")
        .env_remove("RUST_LOG");
    cmd
}

const DATASET: &str = "\
0.0.0.0,0.255.255.255,AA
1.0.0.0,1.255.255.255,BB
8.8.8.0,8.8.8.255,US
2001:200::,2001:200:ffff:ffff:ffff:ffff:ffff:ffff,JP
";

fn write_dataset(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_help() {
    ipcountry_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve IPv4/IPv6 addresses"));
}

#[test]
fn test_version() {
    ipcountry_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ipcountry"));
}

#[test]
fn test_lookup_help() {
    ipcountry_cmd()
        .args(["lookup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Look up the country"));
}

#[test]
fn test_lookup_requires_address() {
    ipcountry_cmd().arg("lookup").assert().failure().code(2);
}

#[test]
fn test_lookup_found() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "dbip.csv", DATASET);

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&dataset)
        .args(["0.10.0.1", "2001:200::1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "The country for IP address '0.10.0.1': AA",
        ))
        .stdout(predicate::str::contains(
            "The country for IP address '2001:200::1': JP",
        ));
}

#[test]
fn test_lookup_not_found_exits_one() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "dbip.csv", DATASET);

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&dataset)
        .arg("2.0.0.0")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "The country for IP address '2.0.0.0': Unknown Country",
        ));
}

#[test]
fn test_lookup_invalid_address_exits_one() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "dbip.csv", DATASET);

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&dataset)
        .args(["1.0.0.1", "not-an-ip"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("': BB"))
        .stderr(predicate::str::contains("invalid IP address"));
}

#[test]
fn test_lookup_json() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "dbip.csv", DATASET);

    let output = ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&dataset)
        .args(["--json", "8.8.8.8", "9.9.9.9"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["ip"], "8.8.8.8");
    assert_eq!(json[0]["country"], "US");
    assert_eq!(json[0]["found"], true);
    assert_eq!(json[1]["country"], serde_json::Value::Null);
    assert_eq!(json[1]["found"], false);
}

#[test]
fn test_lookup_quiet() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "dbip.csv", DATASET);

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&dataset)
        .args(["--quiet", "8.8.8.8"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&dataset)
        .args(["-q", "9.9.9.9"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_lookup_dataset_from_env() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "dbip.csv", DATASET);

    ipcountry_cmd()
        .env("IPCOUNTRY_DATASET", &dataset)
        .args(["lookup", "1.2.3.4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("': BB"));
}

#[test]
fn test_lookup_dataset_from_stdin() {
    ipcountry_cmd()
        .args(["lookup", "--dataset", "-", "8.8.8.8"])
        .write_stdin(DATASET)
        .assert()
        .success()
        .stdout(predicate::str::contains("': US"));
}

#[test]
fn test_lookup_skips_bad_rows() {
    let dir = TempDir::new().unwrap();
    let data = format!("{}10.0.0.5,10.0.0.1,XX\n", DATASET);
    let dataset = write_dataset(&dir, "dbip.csv", &data);

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&dataset)
        .arg("10.0.0.3")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Unknown Country"));
}

#[test]
fn test_lookup_missing_dataset_is_fatal() {
    let dir = TempDir::new().unwrap();

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(dir.path().join("missing.csv"))
        .arg("8.8.8.8")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to load dataset"));
}

#[test]
fn test_lookup_overlapping_dataset_is_fatal() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(
        &dir,
        "overlap.csv",
        "1.0.0.0,1.0.0.255,AU\n1.0.0.128,1.0.1.255,CN\n",
    );

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&dataset)
        .arg("1.0.0.1")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("structurally invalid"))
        .stderr(predicate::str::contains("overlapping ranges"));
}

#[test]
fn test_lookup_unreachable_url_is_fatal() {
    let dir = TempDir::new().unwrap();

    ipcountry_cmd()
        .arg("lookup")
        .args(["--url", "http://127.0.0.1:1/dbip.csv.gz"])
        .arg("--cache-dir")
        .arg(dir.path())
        .arg("8.8.8.8")
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to obtain dataset"));
}

#[test]
fn test_lookup_uses_cached_download() {
    let dir = TempDir::new().unwrap();
    // Pre-seed the cache; the unreachable URL is never contacted
    fs::write(dir.path().join("dbip.csv.gz"), DATASET).unwrap();

    ipcountry_cmd()
        .arg("lookup")
        .args(["--url", "http://127.0.0.1:1/dbip.csv.gz"])
        .arg("--cache-dir")
        .arg(dir.path())
        .arg("8.8.8.8")
        .assert()
        .success()
        .stdout(predicate::str::contains("': US"));
}

#[test]
fn test_lookup_unparsable_download_is_fatal() {
    let dir = TempDir::new().unwrap();
    // An error page saved in place of the dump
    fs::write(
        dir.path().join("dbip.csv.gz"),
        "<html>\n<body>Service unavailable</body>\n</html>\n",
    )
    .unwrap();

    ipcountry_cmd()
        .arg("lookup")
        .args(["--url", "http://127.0.0.1:1/dbip.csv.gz"])
        .arg("--cache-dir")
        .arg(dir.path())
        .arg("8.8.8.8")
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("could be parsed"));

    // The bad copy is not reused by the next run
    assert!(!dir.path().join("dbip.csv.gz").exists());
}

#[test]
fn test_lookup_corrupt_cache_is_discarded() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dbip.csv.gz"), b"\x1f\x8bnot deflate").unwrap();

    ipcountry_cmd()
        .arg("lookup")
        .args(["--url", "http://127.0.0.1:1/dbip.csv.gz"])
        .arg("--cache-dir")
        .arg(dir.path())
        .arg("8.8.8.8")
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to obtain dataset"));

    assert!(!dir.path().join("dbip.csv.gz").exists());
}

#[test]
fn test_lookup_huge_max_age_is_accepted() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dbip.csv.gz"), DATASET).unwrap();

    ipcountry_cmd()
        .arg("lookup")
        .args(["--url", "http://127.0.0.1:1/dbip.csv.gz"])
        .arg("--cache-dir")
        .arg(dir.path())
        .args(["--max-age-hours", &u64::MAX.to_string()])
        .arg("8.8.8.8")
        .assert()
        .success()
        .stdout(predicate::str::contains("': US"));
}

#[test]
fn test_lookup_dataset_without_valid_rows_is_fatal() {
    let dir = TempDir::new().unwrap();
    let garbage = write_dataset(&dir, "garbage.csv", "not,a,range\nstill nothing\n");
    let empty = write_dataset(&dir, "empty.csv", "");

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&garbage)
        .arg("8.8.8.8")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("None of the 2 dataset rows could be parsed"));

    ipcountry_cmd()
        .arg("lookup")
        .arg("--dataset")
        .arg(&empty)
        .arg("8.8.8.8")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Dataset contains no rows"));
}

#[test]
fn test_validate_valid_dataset() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "dbip.csv", DATASET);

    ipcountry_cmd()
        .arg("validate")
        .arg(&dataset)
        .assert()
        .success()
        .stdout(predicate::str::contains("VALIDATION PASSED"))
        .stdout(predicate::str::contains("3 IPv4 + 1 IPv6 intervals"));
}

#[test]
fn test_validate_reports_skipped_rows() {
    let dir = TempDir::new().unwrap();
    let data = format!("{}10.0.0.5,10.0.0.1,XX\n1.0.0.0,1.0.0.1,\n", DATASET);
    let dataset = write_dataset(&dir, "dbip.csv", &data);

    ipcountry_cmd()
        .arg("validate")
        .arg(&dataset)
        .assert()
        .success()
        .stdout(predicate::str::contains("SKIPPED ROWS (2)"))
        .stdout(predicate::str::contains("line 5: malformed row"))
        .stdout(predicate::str::contains("line 6: empty label"));

    ipcountry_cmd()
        .arg("validate")
        .arg(&dataset)
        .args(["--max-skip-rate", "0.1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("VALIDATION FAILED"));
}

#[test]
fn test_validate_overlap_fails() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(
        &dir,
        "overlap.csv",
        "1.0.0.0,1.0.0.255,AU\n1.0.0.128,1.0.1.255,CN\n",
    );

    ipcountry_cmd()
        .arg("validate")
        .arg(&dataset)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("overlapping ranges"));
}

#[test]
fn test_validate_rejects_bad_skip_rate() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "dbip.csv", DATASET);

    for rate in ["1.5", "NaN", "inf"] {
        ipcountry_cmd()
            .arg("validate")
            .arg(&dataset)
            .args(["--max-skip-rate", rate])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Max skip rate must be between"));
    }
}

#[test]
fn test_validate_without_valid_rows_fails() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, "garbage.csv", "<html>\n</html>\n");

    ipcountry_cmd()
        .arg("validate")
        .arg(&dataset)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("no usable rows"))
        .stdout(predicate::str::contains("VALIDATION FAILED"));
}

#[test]
fn test_validate_json() {
    let dir = TempDir::new().unwrap();
    let data = format!("{}garbage\n", DATASET);
    let dataset = write_dataset(&dir, "dbip.csv", &data);

    let output = ipcountry_cmd()
        .arg("validate")
        .arg(&dataset)
        .arg("--json")
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["is_valid"], true);
    assert_eq!(json["rows_read"], 5);
    assert_eq!(json["records"], 4);
    assert_eq!(json["skipped"][0]["line"], 5);
    assert_eq!(json["stats"]["v6_intervals"], 1);
}

#[test]
fn test_bench_small() {
    ipcountry_cmd()
        .args(["bench", "--sizes", "10,1000", "--queries", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- 1,000 ranges ---"))
        .stdout(predicate::str::contains("Benchmark complete"));
}

#[test]
fn test_bench_rejects_bad_occupancy() {
    ipcountry_cmd()
        .args(["bench", "--occupancy", "1.5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Occupancy must be between"));
}
