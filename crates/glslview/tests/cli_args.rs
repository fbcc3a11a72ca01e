use std::process::Command;

fn glslview() -> Command {
    Command::new(env!("CARGO_BIN_EXE_glslview"))
}

#[test]
fn rejects_malformed_size() {
    let output = glslview()
        .args(["--size", "not-a-size"])
        .output()
        .expect("failed to run glslview");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("WxH"), "unexpected stderr: {stderr}");
}

#[test]
fn rejects_non_object_uniform_config() {
    let output = glslview()
        .args(["--uniforms", "[1, 2, 3]"])
        .output()
        .expect("failed to run glslview");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("uniform config"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn rejects_missing_shader_file() {
    let output = glslview()
        .arg("does-not-exist.frag")
        .output()
        .expect("failed to run glslview");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to read shader"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn rejects_unreadable_uniform_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let gone = dir.path().join("uniforms.json");

    let output = glslview()
        .args(["--uniforms", &format!("@{}", gone.display())])
        .output()
        .expect("failed to run glslview");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("uniform config"),
        "unexpected stderr: {stderr}"
    );
}
