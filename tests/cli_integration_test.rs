use predicates::prelude::*;

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", "hosts", name].iter().collect();
    path.to_string_lossy().into_owned()
}

/// Test that the binary runs and shows help
#[test]
fn test_help_command() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("security mitigation status"));
}

/// Test that the binary shows version
#[test]
fn test_version_command() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mitscan"));
}

#[test]
fn test_domains_lists_catalog() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .env("NO_COLOR", "1")
        .arg("domains")
        .assert()
        .success()
        .stdout(predicate::str::contains("secure-speculation-control"))
        .stdout(predicate::str::contains("needs kva-shadow"));
}

#[test]
fn test_domains_json() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["domains", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"system-info\""));
}

#[test]
fn test_decode_kva_shadow_json() {
    let output = assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["decode", "kva-shadow", "21000000", "--vendor", "intel", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["schema_version"], "1.0");
    assert_eq!(json["cpu"]["vendor"], "intel");
    assert_eq!(json["cpu"]["architecture"], "x64");

    let fields = json["domains"][0]["fields"].as_array().unwrap();
    assert_eq!(fields[0]["name"], "KvaShadowEnabled");
    assert_eq!(fields[0]["value"], true);
    assert_eq!(fields[0]["secure"], "true");
}

#[test]
fn test_decode_arm_architecture_implies_arm_vendor() {
    let output = assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["decode", "pointer-auth", "00000000", "--vendor", "intel", "--arch", "arm64", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["cpu"]["vendor"], "arm");
    assert_eq!(json["cpu"]["architecture"], "arm64");
}

#[test]
fn test_decode_rejects_bad_hex() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["decode", "kva-shadow", "zz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid hex input"));
}

#[test]
fn test_decode_rejects_property_domain() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["decode", "device-guard", "00000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bit-packed"));
}

#[test]
fn test_decode_with_dependency() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .env("NO_COLOR", "1")
        .args(["decode", "secure-speculation-control", "00000000", "--vendor", "intel", "--dependency", "30000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("insecure"));
}

#[test]
fn test_inspect_snapshot_terminal() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .env("NO_COLOR", "1")
        .args(["inspect", &fixture("intel_unpatched.yaml")])
        .assert()
        .success()
        .stdout(predicate::str::contains("CPU: Intel (x64)"))
        .stdout(predicate::str::contains("Kernel VA Shadow (kva-shadow)"))
        .stdout(predicate::str::contains("tpm").not())
        .stdout(predicate::str::contains("TBS_E_TPM_NOT_FOUND").not())
        .stderr(predicate::str::contains("Intel workstation"));
}

#[test]
fn test_inspect_domain_selection() {
    let output = assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["-f", "json", "inspect", &fixture("intel_unpatched.yaml"), "-d", "kva-shadow"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let domains = json["domains"].as_array().unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0]["id"], "kva-shadow");
    assert!(json.get("failed").is_none());
}

#[test]
fn test_query_failures_listed_only_when_verbose() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = temp_dir.path().join("host.yaml");
    fs::write(&snapshot, "system_information:\n  201: { status: STATUS_ACCESS_DENIED }\n").unwrap();
    let snapshot = snapshot.to_str().unwrap();

    assert_cmd::cargo_bin_cmd!("mitscan")
        .env("NO_COLOR", "1")
        .args(["inspect", snapshot, "-d", "speculation-control"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failed").not());

    assert_cmd::cargo_bin_cmd!("mitscan")
        .env("NO_COLOR", "1")
        .args(["inspect", snapshot, "-d", "speculation-control", "-v"])
        .assert()
        .success()
        .stdout(predicate::str::contains("speculation-control failed: query failed with STATUS_ACCESS_DENIED"));
}

#[test]
fn test_fail_on_insecure() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["inspect", &fixture("intel_unpatched.yaml"), "--fail-on-insecure"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Insecure mitigation state detected"));

    assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["inspect", &fixture("amd_hardened.yaml"), "--fail-on-insecure"])
        .assert()
        .success();
}

#[test]
fn test_inspect_missing_snapshot() {
    assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["inspect", "/nonexistent/host.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load snapshot"));
}

#[test]
fn test_inspect_output_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("report.json");

    assert_cmd::cargo_bin_cmd!("mitscan")
        .args([
            "inspect",
            &fixture("amd_hardened.yaml"),
            "-f",
            "json",
            "-o",
            output_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Results written to"));

    let content = fs::read_to_string(&output_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["cpu"]["vendor"], "amd");
}

#[test]
fn test_config_file_hides_informational_fields() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("mitscan.yaml");
    fs::write(&config_path, "domains: [kva-shadow]\nshow_informational: false\n").unwrap();

    assert_cmd::cargo_bin_cmd!("mitscan")
        .env("NO_COLOR", "1")
        .args(["inspect", &fixture("intel_unpatched.yaml"), "-c", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("KvaShadowEnabled"))
        .stdout(predicate::str::contains("InvalidPteBit").not())
        .stdout(predicate::str::contains("tpm").not());
}

#[test]
fn test_bad_config_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("mitscan.yaml");
    fs::write(&config_path, "domains: [meltdown]\n").unwrap();

    assert_cmd::cargo_bin_cmd!("mitscan")
        .args(["domains", "-c", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
