use std::fs;
use std::path::Path;

use predicates::prelude::*;
use tempfile::tempdir;

fn mtfix() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mtfix");
    cmd.env_remove("MTFIX_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn rejects_unknown_mode() {
    mtfix()
        .args(["repair", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid value"))
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn rejects_wrong_argument_count() {
    mtfix().arg("check").assert().code(1);
    mtfix().args(["check", "a", "b"]).assert().code(1);
    mtfix().assert().code(1);
}

#[test]
fn help_exits_zero() {
    mtfix()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check-nodir"));
}

#[test]
fn sidecar_only_tree_has_no_targets() {
    let tmp = tempdir().expect("tempdir");
    let month = tmp.path().join("2022").join("2022-05");
    fs::create_dir_all(&month).expect("mkdir");
    fs::write(month.join(".picasa.ini"), "[Picasa]\n").expect("write sidecar");

    mtfix()
        .arg("check")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("no target files"));
}

#[test]
fn file_without_metadata_is_flagged() {
    let tmp = tempdir().expect("tempdir");
    let month = tmp.path().join("2022").join("2022-05");
    fs::create_dir_all(&month).expect("mkdir");
    fs::write(month.join("notes.txt"), "hello").expect("write");
    let report = tmp.path().join("report.jsonl");

    mtfix()
        .arg("fix")
        .arg(tmp.path().join("2022"))
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.txt"))
        .stdout(predicate::str::contains("    capture:   UNKNOWN"))
        .stdout(predicate::str::contains("  not fixed"))
        .stdout(predicate::str::contains("no fixable files"));

    let text = fs::read_to_string(&report).expect("read report");
    assert_eq!(text.lines().count(), 1);
    assert!(text.contains("\"verdict\":\"missing-metadata\""));
}

#[test]
fn invalid_config_is_fatal() {
    let tmp = tempdir().expect("tempdir");
    let config = tmp.path().join("mtfix.toml");
    fs::write(&config, "utc_offset = \"JST\"\n").expect("write config");

    mtfix()
        .arg("check")
        .arg(tmp.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid configuration"));
}

#[cfg(unix)]
fn write_fake_ffprobe(bin_path: &Path, creation_time: &str) {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        "#!/bin/sh\necho \"Input #0, mov,mp4,m4a,3gp,3g2,mj2, from '$2':\" >&2\necho \"    creation_time   : {}\" >&2\n",
        creation_time
    );
    fs::write(bin_path, script).expect("write fake ffprobe");
    let mut perms = fs::metadata(bin_path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(bin_path, perms).expect("chmod");
}

#[cfg(unix)]
#[test]
fn fix_rewrites_video_modify_time() {
    let tmp = tempdir().expect("tempdir");
    let month = tmp.path().join("archive").join("2022").join("2022-05");
    fs::create_dir_all(&month).expect("mkdir");
    let clip = month.join("clip.mp4");
    fs::write(&clip, b"not really a video").expect("write clip");

    let probe = tmp.path().join("ffprobe");
    // 2022-05-15 10:00:00 +09:00
    write_fake_ffprobe(&probe, "2022-05-15T01:00:00.000000Z");
    let config = tmp.path().join("mtfix.toml");
    fs::write(&config, format!("ffprobe = {:?}\n", probe.display().to_string())).expect("write config");

    mtfix()
        .arg("fix")
        .arg(tmp.path().join("archive"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("  fixed to 2022-05-15 10:00:00.000 +09:00"))
        .stdout(predicate::str::contains("1 files, 1 fixed"));

    let meta = fs::metadata(&clip).expect("metadata");
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    assert_eq!(mtime.unix_seconds(), 1_652_576_400);
}

#[cfg(unix)]
#[test]
fn fix_leaves_out_of_range_video_alone() {
    let tmp = tempdir().expect("tempdir");
    let month = tmp.path().join("archive").join("2022").join("2022-05");
    fs::create_dir_all(&month).expect("mkdir");
    let clip = month.join("clip.mp4");
    fs::write(&clip, b"not really a video").expect("write clip");
    let before = filetime::FileTime::from_last_modification_time(&fs::metadata(&clip).expect("metadata"));

    let probe = tmp.path().join("ffprobe");
    // 2022-06-01 00:00:00 +09:00
    write_fake_ffprobe(&probe, "2022-05-31T15:00:00.000000Z");
    let config = tmp.path().join("mtfix.toml");
    fs::write(&config, format!("ffprobe = {:?}\n", probe.display().to_string())).expect("write config");

    mtfix()
        .arg("fix")
        .arg(tmp.path().join("archive"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("unfixable"))
        .stdout(predicate::str::contains("no fixable files"));

    let after = filetime::FileTime::from_last_modification_time(&fs::metadata(&clip).expect("metadata"));
    assert_eq!(before, after);
}
