//! Integration tests for the mdrun binary.
//!
//! Each test points the store at its own temp directory through a config file.

use std::path::Path;
use std::process::{Command, Output};

fn mdrun_cmd(store_root: &Path) -> Command {
    let config_content = format!(
        "[store]\nmodels_dir = \"{}\"\n\n[inference]\nn_gpu_layers = 0\n",
        store_root.display()
    );
    let config_path = store_root.join("mdrun.toml");
    std::fs::create_dir_all(store_root).unwrap();
    std::fs::write(&config_path, config_content).unwrap();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mdrun"));
    cmd.arg("--config").arg(config_path);
    cmd.env_remove("MODELS_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("Failed to execute command")
}

fn write_manifest(store_root: &Path, registry: &str, namespace: &str, name: &str, tag: &str) {
    let dir = store_root
        .join("manifests")
        .join(registry)
        .join(namespace)
        .join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let manifest = serde_json::json!({
        "version": "v2",
        "mediaType": "application/vnd.cnai.model.manifest.v2+json",
        "weights": { "file": [], "format": "gguf" }
    });
    std::fs::write(dir.join(tag), manifest.to_string()).unwrap();
}

#[test]
fn list_prints_short_tag_names() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "registry.cnai.com", "sys", "gemma-2b", "latest");
    write_manifest(dir.path(), "registry.cnai.com", "google", "gemma-2b", "it");
    write_manifest(dir.path(), "localhost:5000", "sys", "tiny", "v1");

    let output = run(mdrun_cmd(dir.path()).arg("list"));
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["localhost:5000/sys/tiny:v1", "google/gemma-2b:it", "gemma-2b:latest"]
    );
}

#[test]
fn list_on_empty_store_prints_nothing() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(mdrun_cmd(dir.path()).arg("list"));
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn default_run_without_model_fails_with_no_output() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(&mut mdrun_cmd(dir.path()));

    assert!(!output.status.success(), "Run should fail when the model is missing");
    assert!(output.stdout.is_empty(), "Nothing may be printed on failure");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("gemma-2b:latest"), "stderr: {stderr}");
    assert!(stderr.contains("model not found"), "stderr: {stderr}");
}

#[test]
fn manifest_without_weights_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "registry.cnai.com", "sys", "gemma-2b", "latest");

    let output = run(&mut mdrun_cmd(dir.path()));

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("has no weights layer"), "stderr: {stderr}");
}

#[test]
fn debug_logging_goes_to_stderr_only() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(
        mdrun_cmd(dir.path())
            .env("RUST_LOG", "debug")
            .args(["--model", "tiny:v1", "--max-length", "8"]),
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "Logs must not reach stdout");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Running tiny:v1 with max_length 8"), "stderr: {stderr}");
}

#[test]
fn malformed_reference_is_reported_as_invalid() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(mdrun_cmd(dir.path()).args(["--model", "gemma:a:b"]));

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not allowed in tag names"), "stderr: {stderr}");
}
