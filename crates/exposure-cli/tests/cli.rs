use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

const INVENTORY: &str = r#"{
    "security_groups": [
        {
            "group_id": "sg-1",
            "group_name": "web-sg",
            "vpc_id": "vpc-1",
            "ip_permissions": [
                { "ip_protocol": "tcp", "from_port": 80, "to_port": 80, "ip_ranges": ["0.0.0.0/0"] },
                { "ip_protocol": "tcp", "from_port": 22, "to_port": 22, "ip_ranges": ["203.0.113.5/32"] }
            ]
        }
    ],
    "instances": [
        { "instance_id": "i-1", "instance_type": "t2.micro", "vpc_id": "vpc-1", "security_groups": ["sg-1"] }
    ],
    "load_balancers": [
        { "arn": "arn:lb/app/web/abc", "name": "web", "type": "application", "vpc_id": "vpc-1" }
    ]
}"#;

fn exposure(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_exposure"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run exposure")
}

fn write_inventory(dir: &Path) -> String {
    let path = dir.join("inventory.json");
    fs::write(&path, INVENTORY).unwrap();
    path.display().to_string()
}

#[test]
fn test_report_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = write_inventory(dir.path());
    let out = dir.path().join("report.txt");

    let output = exposure(&[
        "--snapshot",
        &inventory,
        "--vpc-id",
        "vpc-1",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let report = fs::read_to_string(&out).unwrap();
    assert!(report.starts_with("=== Attack Surface: 0.0.0.0/0 ===\n\ngraph TD\n"));
    assert!(report.contains("  CIDR_0_0_0_0_0 -->|\"Port 80-80 (tcp)\"| sg_1\n"));
    assert!(report.contains("=== Attack Surface: 203.0.113.5/32 ===\n"));
}

#[test]
fn test_other_vpc_reports_no_exposures() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = write_inventory(dir.path());

    let output = exposure(&["--snapshot", &inventory, "--vpc-id", "vpc-2"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "No external CIDR exposures found.\n"
    );
}

#[test]
fn test_split_dir() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = write_inventory(dir.path());
    let split = dir.path().join("sections");

    let output = exposure(&["--snapshot", &inventory, "--split-dir", split.to_str().unwrap()]);
    assert!(output.status.success());

    let mut names: Vec<String> = fs::read_dir(&split)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "01-attack_surface_0_0_0_0_0.mmd",
            "02-attack_surface_203_0_113_5_32.mmd",
        ]
    );
}

#[test]
fn test_missing_snapshot_is_reported_opaquely() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");

    let output = exposure(&["--snapshot", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error loading infrastructure: "));
    assert!(stderr.contains("not found"));
}

#[test]
fn test_load_balancer_view_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = write_inventory(dir.path());
    let config = dir.path().join("exposure.toml");
    fs::write(
        &config,
        format!("snapshot = {inventory:?}\nview = \"load-balancer\"\n"),
    )
    .unwrap();

    let output = exposure(&["--config", config.to_str().unwrap(), "--load-balancer", "web"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("graph TD\n"));
    assert!(stdout.contains("  abc[\"web (application)\"]\n"));
}

#[test]
fn test_unknown_load_balancer_fails() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = write_inventory(dir.path());

    let output = exposure(&[
        "--snapshot",
        &inventory,
        "--view",
        "load-balancer",
        "--load-balancer",
        "api",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: "));
    assert!(stderr.contains("api"));
}
