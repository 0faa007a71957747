#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn actionchain(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("actionchain").unwrap();
    cmd.current_dir(dir.path())
        .env("ACTIONCHAIN_ROOT", dir.path())
        .env("ACTIONCHAIN_CONFIG", write_config(dir));
    cmd
}

fn write_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("config.yaml");
    if !path.exists() {
        std::fs::write(&path, "skip_set_owner: true\n").unwrap();
    }
    path
}

fn chunk_file(dir: &TempDir, chain: u64, machine: &str, chunk: u32) -> PathBuf {
    dir.path()
        .join("actionchains")
        .join(format!("actionchain_{chain}_{machine}_{chunk}.sls"))
}

const REBOOT_REQUEST: &str = "\
chain:
  id: 5
endpoint:
  minion_id: web1.example.com
  machine_id: abc123
states:
  - kind: module_run
    id: mgr_actionchain_5_action_1
    name: state.apply
    action_id: 1
    args:
      mods: remotecommands
    kwargs:
      pillar:
        mgr_remote_cmd_script: salt://scripts/script_1.sh
  - kind: system_reboot
    id: mgr_actionchain_5_action_2
    minutes: 3
    action_id: 2
  - kind: module_run
    id: mgr_actionchain_5_action_3
    name: state.apply
    action_id: 3
    args:
      mods: channels
";

const UPGRADE_REQUEST: &str = "\
chain:
  id: 9
  label: nightly patching
endpoint:
  minion_id: db1.example.com
  machine_id: def456
states:
  - kind: module_run
    id: mgr_actionchain_9_action_1
    name: state.apply
    action_id: 1
    args:
      mods: channels
  - kind: module_run
    id: mgr_actionchain_9_action_2
    name: state.apply
    action_id: 2
    args:
      mods: packages.pkginstall
    kwargs:
      pillar:
        param_pkgs:
          salt: 3006.0
          vim: ''
";

const INVENTORY: &str = "\
endpoints:
  - minion_id: web1.example.com
    machine_id: abc123
";

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ---------------------------------------------------------------------------
// actionchain plan / count
// ---------------------------------------------------------------------------

#[test]
fn plan_writes_one_file_per_chunk() {
    let dir = TempDir::new().unwrap();
    write(&dir, "request.yaml", REBOOT_REQUEST);

    actionchain(&dir)
        .args(["plan", "request.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web1.example.com"));

    let first = std::fs::read_to_string(chunk_file(&dir, 5, "abc123", 1)).unwrap();
    assert!(first.contains("mgr_actionchain_5_action_1_chunk_1"));
    assert!(first.contains("mgractionchains.next"));
    assert!(first.contains("system.reboot"));

    let second = std::fs::read_to_string(chunk_file(&dir, 5, "abc123", 2)).unwrap();
    assert!(second.contains("mgr_actionchain_5_action_3_chunk_2"));
    assert!(!second.contains("mgractionchains.next"));
    assert!(!chunk_file(&dir, 5, "abc123", 3).exists());
}

#[test]
fn plan_json_reports_counts() {
    let dir = TempDir::new().unwrap();
    write(&dir, "request.yaml", UPGRADE_REQUEST);

    let output = actionchain(&dir)
        .args(["--json", "plan", "request.yaml"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["label"], "nightly patching");
    assert_eq!(parsed["chunks"]["db1.example.com"], 3);
    assert_eq!(parsed["files"].as_array().unwrap().len(), 3);

    let upgrade = std::fs::read_to_string(chunk_file(&dir, 9, "def456", 2)).unwrap();
    assert!(upgrade.contains("clean_action_chain_if_previous_failed"));
    let upgrade: serde_yaml::Value = serde_yaml::from_str(&upgrade).unwrap();
    assert_eq!(
        upgrade["schedule_next_chunk"]["module.run"][2]["chunk"],
        serde_yaml::Value::from(3)
    );
    let verification = std::fs::read_to_string(chunk_file(&dir, 9, "def456", 3)).unwrap();
    assert!(verification.contains("pkg.installed"));
}

#[test]
fn count_does_not_write() {
    let dir = TempDir::new().unwrap();
    write(&dir, "request.yaml", UPGRADE_REQUEST);

    actionchain(&dir)
        .args(["--json", "count", "request.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"db1.example.com\": 3"));
    assert!(!dir.path().join("actionchains").exists());
}

#[test]
fn plan_rejects_unsafe_machine_id() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "request.yaml",
        &REBOOT_REQUEST.replace("machine_id: abc123", "machine_id: ../etc"),
    );

    actionchain(&dir)
        .args(["plan", "request.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
    assert!(!dir.path().join("actionchains").exists());
}

#[test]
fn plan_missing_request_fails() {
    let dir = TempDir::new().unwrap();
    actionchain(&dir)
        .args(["plan", "missing.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.yaml"));
}

// ---------------------------------------------------------------------------
// actionchain clean / clean-endpoint
// ---------------------------------------------------------------------------

#[test]
fn clean_removes_chunk_and_its_references() {
    let dir = TempDir::new().unwrap();
    write(&dir, "request.yaml", REBOOT_REQUEST);
    write(&dir, "inventory.yaml", INVENTORY);
    std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
    write(&dir, "scripts/script_1.sh", "echo hi\n");

    actionchain(&dir).args(["plan", "request.yaml"]).assert().success();
    actionchain(&dir)
        .args([
            "clean",
            "--chain",
            "5",
            "--minion",
            "web1.example.com",
            "--chunk",
            "1",
            "--inventory",
            "inventory.yaml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));

    assert!(!chunk_file(&dir, 5, "abc123", 1).exists());
    assert!(!dir.path().join("scripts/script_1.sh").exists());
    assert!(chunk_file(&dir, 5, "abc123", 2).exists());
}

#[test]
fn clean_failed_removes_remaining_chunks() {
    let dir = TempDir::new().unwrap();
    write(&dir, "request.yaml", REBOOT_REQUEST);
    write(&dir, "inventory.yaml", INVENTORY);

    actionchain(&dir).args(["plan", "request.yaml"]).assert().success();
    actionchain(&dir)
        .args([
            "clean",
            "--chain",
            "5",
            "--minion",
            "web1.example.com",
            "--chunk",
            "1",
            "--failed",
            "--inventory",
            "inventory.yaml",
        ])
        .assert()
        .success();

    assert!(!chunk_file(&dir, 5, "abc123", 1).exists());
    assert!(!chunk_file(&dir, 5, "abc123", 2).exists());
}

#[test]
fn clean_unknown_minion_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    write(&dir, "inventory.yaml", INVENTORY);

    actionchain(&dir)
        .args([
            "clean",
            "--chain",
            "5",
            "--minion",
            "nobody",
            "--chunk",
            "1",
            "--inventory",
            "inventory.yaml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to delete."));
}

#[test]
fn clean_endpoint_removes_every_chain() {
    let dir = TempDir::new().unwrap();
    write(&dir, "request.yaml", REBOOT_REQUEST);
    write(
        &dir,
        "other.yaml",
        &REBOOT_REQUEST.replace("id: 5", "id: 6").replace("_5_", "_6_"),
    );
    write(&dir, "inventory.yaml", INVENTORY);

    actionchain(&dir).args(["plan", "request.yaml"]).assert().success();
    actionchain(&dir).args(["plan", "other.yaml"]).assert().success();
    assert!(chunk_file(&dir, 6, "abc123", 2).exists());

    actionchain(&dir)
        .args([
            "clean-endpoint",
            "--minion",
            "web1.example.com",
            "--inventory",
            "inventory.yaml",
        ])
        .assert()
        .success();

    let left: Vec<_> = std::fs::read_dir(dir.path().join("actionchains"))
        .unwrap()
        .collect();
    assert!(left.is_empty());
}

#[test]
fn clean_endpoint_unknown_minion_fails() {
    let dir = TempDir::new().unwrap();
    write(&dir, "inventory.yaml", INVENTORY);

    actionchain(&dir)
        .args([
            "clean-endpoint",
            "--minion",
            "nobody",
            "--inventory",
            "inventory.yaml",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nobody"));
}

// ---------------------------------------------------------------------------
// actionchain decode / path / refs / top
// ---------------------------------------------------------------------------

#[test]
fn decode_result_key() {
    let dir = TempDir::new().unwrap();
    actionchain(&dir)
        .args([
            "--json",
            "decode",
            "module_|-mgr_actionchain_131_action_24_chunk_1_|-state.apply_|-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"chain_id\": 131"))
        .stdout(predicate::str::contains("\"action_id\": 24"));
}

#[test]
fn decode_rejects_foreign_ids() {
    let dir = TempDir::new().unwrap();
    actionchain(&dir)
        .args(["decode", "schedule_next_chunk"])
        .assert()
        .failure();
}

#[test]
fn path_prints_file_and_reference() {
    let dir = TempDir::new().unwrap();
    actionchain(&dir)
        .args(["path", "--chain", "3", "--machine", "m1", "--chunk", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("actionchain_3_m1_2.sls"))
        .stdout(predicate::str::contains("salt://actionchains/actionchain_3_m1_2.sls"));
}

#[test]
fn refs_lists_deletable_references() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "chunk.sls",
        "a: salt://scripts/s.sh\nb: salt://channels/init.sls\n",
    );
    actionchain(&dir)
        .args(["refs", "chunk.sls"])
        .assert()
        .success()
        .stdout(predicate::eq("scripts/s.sh\n"));
}

#[test]
fn top_writes_top_file() {
    let dir = TempDir::new().unwrap();
    actionchain(&dir)
        .args(["top", "--chain", "4", "--action", "8", "channels", "packages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("salt://actionchains/top_4_8.sls"));

    let top = std::fs::read_to_string(dir.path().join("actionchains/top_4_8.sls")).unwrap();
    assert!(top.contains("base"));
    assert!(top.contains("packages"));
}

// ---------------------------------------------------------------------------
// actionchain config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_reports_relative_root() {
    let dir = TempDir::new().unwrap();
    actionchain(&dir)
        .env("ACTIONCHAIN_ROOT", "relative/root")
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("relative"));
}

#[test]
fn config_show_json_uses_root_override() {
    let dir = TempDir::new().unwrap();
    actionchain(&dir)
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"skip_set_owner\": true"))
        .stdout(predicate::str::contains("permanent_states"));
}

#[test]
fn config_init_writes_defaults_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("etc/actionchain.yaml");
    let path_arg = path.to_str().unwrap();

    actionchain(&dir)
        .args(["config", "init", "--config", path_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("permanent_tops"));
    assert!(written.contains(dir.path().to_str().unwrap()));

    actionchain(&dir)
        .args(["config", "init", "--config", path_arg])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    actionchain(&dir)
        .args(["config", "init", "--force", "--config", path_arg])
        .assert()
        .success();
}
