//! Integration tests for boot partition provisioning
//!
//! Runs the patcher through the library API and the `sdflash patch` command
//! against temporary boot directories.

mod common;

use assert_fs::prelude::*;
use common::{TestProject, DEVICE_INIT, GOOD_USER_DATA, OCCIDENTALIS};
use predicates::prelude::*;
use sdflash::core::patcher::ConfigPatcher;
use sdflash::core::request::ProvisioningInputs;
use sdflash::error::PatchError;

fn apply(project: &TestProject, inputs: ProvisioningInputs) -> sdflash::core::patcher::PatchReport {
    let request = inputs.resolve().expect("inputs should resolve");
    ConfigPatcher::new(&project.path())
        .apply(&request)
        .expect("patch should succeed")
}

#[test]
fn test_user_data_only_creates_empty_meta_data() {
    let project = TestProject::new();
    let user_data = project.create_input("good.yml", GOOD_USER_DATA);

    let report = apply(
        &project,
        ProvisioningInputs {
            user_data: Some(user_data),
            ..Default::default()
        },
    );

    assert_eq!(project.read_file("user-data"), GOOD_USER_DATA);
    assert_eq!(project.read_file("meta-data"), "");
    assert!(report.created_meta_data);
    assert!(report.substitutions.is_empty());
}

#[test]
fn test_user_data_and_meta_data_copied_verbatim() {
    let project = TestProject::new();
    let user_data = project.create_input("user.yml", GOOD_USER_DATA);
    let meta_data = project.create_input("meta.yml", "instance-id: node-1\n");

    let report = apply(
        &project,
        ProvisioningInputs {
            user_data: Some(user_data),
            meta_data: Some(meta_data),
            ..Default::default()
        },
    );

    assert_eq!(project.read_file("user-data"), GOOD_USER_DATA);
    assert_eq!(project.read_file("meta-data"), "instance-id: node-1\n");
    assert!(!report.created_meta_data);
    assert_eq!(report.copied.len(), 2);
}

#[test]
fn test_hostname_rewrites_only_the_hostname_line() {
    let project = TestProject::new();
    project.create_file("user-data", GOOD_USER_DATA);

    apply(
        &project,
        ProvisioningInputs {
            hostname: Some("node-7".to_string()),
            ..Default::default()
        },
    );

    let expected = GOOD_USER_DATA.replace("hostname: good", "hostname: node-7");
    assert_eq!(project.read_file("user-data"), expected);
}

#[test]
fn test_boot_conf_copied_without_touching_cloud_init() {
    let project = TestProject::new();
    project.create_file("user-data", GOOD_USER_DATA);
    project.create_file("meta-data", "instance-id: keep\n");
    let boot_conf = project.create_input("my-config.txt", "enable_uart=0\n");

    apply(
        &project,
        ProvisioningInputs {
            boot_conf: Some(boot_conf),
            ..Default::default()
        },
    );

    let boot = assert_fs::fixture::ChildPath::new(project.path());
    boot.child("config.txt").assert("enable_uart=0\n");
    boot.child("user-data").assert(GOOD_USER_DATA);
    boot.child("meta-data").assert("instance-id: keep\n");
}

#[test]
fn test_patching_is_idempotent() {
    let project = TestProject::new();
    let legacy = project.create_input("device-init.yaml", DEVICE_INIT);
    let inputs = ProvisioningInputs {
        legacy_config: Some(legacy),
        hostname: Some("node-1".to_string()),
        wifi_ssid: Some("lab".to_string()),
        wifi_password: Some("p\"w".to_string()),
        cluster_lab: Some("true".to_string()),
        ..Default::default()
    };

    apply(&project, inputs.clone());
    let once = project.read_file("device-init.yaml");
    apply(&project, inputs);

    assert_eq!(project.read_file("device-init.yaml"), once);
    assert!(once.contains("hostname: node-1\n"));
    assert!(once.contains("\n  wlan0:\n"));
    assert!(once.contains("      ssid: \"lab\"\n"));
    assert!(once.contains("      password: \"p\\\"w\"\n"));
    assert!(once.contains("  run_on_boot: \"true\"\n"));
}

#[test]
fn test_legacy_and_cloud_init_do_not_mix() {
    let project = TestProject::new();
    let legacy = project.create_input("device-init.yaml", DEVICE_INIT);
    let user_data = project.create_input("user.yml", GOOD_USER_DATA);

    apply(
        &project,
        ProvisioningInputs {
            legacy_config: Some(legacy),
            user_data: Some(user_data),
            ..Default::default()
        },
    );

    assert_eq!(project.read_file("device-init.yaml"), DEVICE_INIT);
    assert_eq!(project.read_file("user-data"), GOOD_USER_DATA);
    assert!(!project.file_exists("occidentalis.txt"));
}

#[test]
fn test_occidentalis_source_keeps_its_name() {
    let project = TestProject::new();
    let legacy = project.create_input("occidentalis-lab.txt", OCCIDENTALIS);

    let report = apply(
        &project,
        ProvisioningInputs {
            legacy_config: Some(legacy),
            hostname: Some("pi-3".to_string()),
            wifi_ssid: Some("lab".to_string()),
            ..Default::default()
        },
    );

    assert!(!project.file_exists("device-init.yaml"));
    let content = project.read_file("occidentalis.txt");
    assert!(content.contains("\nhostname=pi-3\n"));
    assert!(content.contains("\nwifi_ssid=lab\n"));
    assert!(content.contains("wifi_password=your-presharedkey\n"));
    assert!(content.starts_with("# hostname for your Hypriot Raspberry Pi:\n"));
    assert_eq!(report.substitutions.len(), 2);
}

#[test]
fn test_missing_key_is_reported_not_fatal() {
    let project = TestProject::new();
    project.create_file("user-data", "#cloud-config\nusers: []\n");

    let report = apply(
        &project,
        ProvisioningInputs {
            hostname: Some("node-1".to_string()),
            ..Default::default()
        },
    );

    assert_eq!(project.read_file("user-data"), "#cloud-config\nusers: []\n");
    assert!(matches!(
        report.unmatched.as_slice(),
        [PatchError::NoMatch { .. }]
    ));
}

#[test]
fn test_patch_command_applies_flags() {
    let project = TestProject::new();
    project.create_file("user-data", GOOD_USER_DATA);
    let meta = project.create_input("meta.yml", "instance-id: cli\n");
    let boot = project.path();

    let output = project.run(&[
        "patch",
        boot.to_str().unwrap(),
        "-n",
        "from-cli",
        "-m",
        meta.to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("✓ Finished"));
    assert!(predicate::str::contains("hostname: from-cli\n").eval(&project.read_file("user-data")));
    assert_eq!(project.read_file("meta-data"), "instance-id: cli\n");
}

#[test]
fn test_patch_command_uses_settings_defaults() {
    let project = TestProject::new();
    project.create_file("occidentalis.txt", OCCIDENTALIS);
    project.write_settings("[provision]\nwifi_ssid = \"from-settings\"\n");
    let boot = project.path();

    let output = project.run(&["patch", boot.to_str().unwrap(), "-n", "cli-wins"]);

    assert!(output.status.success());
    let content = project.read_file("occidentalis.txt");
    assert!(content.contains("wifi_ssid=from-settings\n"));
    assert!(content.contains("hostname=cli-wins\n"));
}

#[test]
fn test_patch_command_json_report() {
    let project = TestProject::new();
    project.create_file("user-data", GOOD_USER_DATA);
    let boot = project.path();

    let output = project.run(&["--json", "patch", boot.to_str().unwrap(), "-n", "j"]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["substitutions"][0]["field"], "hostname");
    assert_eq!(json["created_meta_data"], true);
}
