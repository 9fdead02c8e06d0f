//! CLI integration tests for batch processing file ordering
//!
//! Runs the built binary over a directory and checks that files are
//! processed in name order, batch by batch.
#![cfg(feature = "cli")]

use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_whitebg-erase"))
}

fn write_shot(dir: &Path, name: &str) {
    let image = RgbImage::from_fn(32, 32, |x, y| {
        if (8..24).contains(&x) && (8..24).contains(&y) {
            Rgb([10, 10, 10])
        } else {
            Rgb([255, 255, 255])
        }
    });
    DynamicImage::ImageRgb8(image)
        .save(dir.join(name))
        .expect("Failed to write test image");
}

#[test]
fn test_cli_batch_alphanumerical_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let src = temp_dir.path().join("src");
    let dst = temp_dir.path().join("dst");
    std::fs::create_dir(&src).unwrap();

    let test_files = ["z_last.png", "a_first.png", "m_middle.bmp", "img10.png", "img2.png"];
    for name in &test_files {
        write_shot(&src, name);
    }

    let output = binary()
        .arg(&src)
        .arg("--dst")
        .arg(&dst)
        .args(["--batch-size", "2", "--gaussian", "0", "--hole-thresh", "0"])
        .arg("--no-log-file")
        .arg("--verbose")
        .output()
        .expect("Failed to execute CLI");
    assert!(
        output.status.success(),
        "CLI failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let log = format!("{}{}", stdout, stderr);

    let expected = ["a_first.png", "img10.png", "img2.png", "m_middle.bmp", "z_last.png"];
    let positions: Vec<usize> = expected
        .iter()
        .map(|name| {
            log.find(name)
                .unwrap_or_else(|| panic!("{} missing from log output:\n{}", name, log))
        })
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "files not logged in name order:\n{}", log);

    for stem in ["a_first", "img10", "img2", "m_middle", "z_last"] {
        assert!(dst.join(format!("{}.png", stem)).exists());
    }
}

#[test]
fn test_cli_writes_log_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let src = temp_dir.path().join("src");
    let logs = temp_dir.path().join("logs");
    std::fs::create_dir(&src).unwrap();
    write_shot(&src, "one.png");

    let output = binary()
        .arg(&src)
        .arg("--log-dir")
        .arg(&logs)
        .output()
        .expect("Failed to execute CLI");
    assert!(output.status.success());

    let log_files: Vec<_> = std::fs::read_dir(&logs)
        .expect("log directory not created")
        .filter_map(Result::ok)
        .collect();
    assert_eq!(log_files.len(), 1);
    let name = log_files[0].file_name().to_string_lossy().into_owned();
    assert!(name.ends_with(".log"));
    assert!(temp_dir.path().join("src results").join("one.png").exists());
}

#[test]
fn test_cli_keep_going_exits_non_zero() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let src = temp_dir.path().join("src");
    std::fs::create_dir(&src).unwrap();
    write_shot(&src, "good.png");
    std::fs::write(src.join("bad.png"), b"garbage").unwrap();

    let output = binary()
        .arg(&src)
        .arg("--keep-going")
        .arg("--no-log-file")
        .output()
        .expect("Failed to execute CLI");

    assert!(!output.status.success());
    assert!(temp_dir.path().join("src results").join("good.png").exists());
}

#[test]
fn test_cli_empty_source_creates_destination() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let src = temp_dir.path().join("src");
    let dst = temp_dir.path().join("dst");
    std::fs::create_dir(&src).unwrap();

    let output = binary()
        .arg(&src)
        .arg("--dst")
        .arg(&dst)
        .arg("--no-log-file")
        .output()
        .expect("Failed to execute CLI");

    assert!(output.status.success());
    assert!(dst.is_dir());
}

#[test]
fn test_cli_missing_source_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let output = binary()
        .arg(temp_dir.path().join("missing"))
        .arg("--no-log-file")
        .output()
        .expect("Failed to execute CLI");
    assert!(!output.status.success());
}
