use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

pub fn ckpt_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ckpt"));
    cmd.current_dir(workspace_root());
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Absolute path of a fixture under `demos/`.
#[allow(dead_code)]
pub fn demo(name: &str) -> String {
    workspace_root()
        .join("demos")
        .join(name)
        .to_string_lossy()
        .to_string()
}

fn describe_failure(args: &[&str], out: &Output) -> String {
    format!(
        "ckpt {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}

/// Run ckpt, assert exit code, return parsed JSON stdout.
pub fn ckpt_json(args: &[&str], expected_exit: i32) -> Value {
    ckpt_json_in(&workspace_root(), args, expected_exit)
}

/// Same as [`ckpt_json`] with a different working directory.
pub fn ckpt_json_in(dir: &Path, args: &[&str], expected_exit: i32) -> Value {
    let out = ckpt_bin()
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run ckpt");
    let code = out.status.code().unwrap_or(-1);
    assert_eq!(code, expected_exit, "exit mismatch for: {}", describe_failure(args, &out));
    serde_json::from_slice(&out.stdout)
        .unwrap_or_else(|e| panic!("invalid JSON from: {}\n{e}", describe_failure(args, &out)))
}

/// Run ckpt, return stdout as string (exit 0 expected).
#[allow(dead_code)]
pub fn ckpt_stdout(args: &[&str]) -> String {
    let out = ckpt_bin().args(args).output().expect("failed to run ckpt");
    assert!(out.status.success(), "failed: {}", describe_failure(args, &out));
    String::from_utf8_lossy(&out.stdout).to_string()
}

/// Run ckpt in `dir`, return (exit code, stderr).
#[allow(dead_code)]
pub fn ckpt_status_in(dir: &Path, args: &[&str]) -> (i32, String) {
    let out = ckpt_bin()
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run ckpt");
    (
        out.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&out.stderr).to_string(),
    )
}
