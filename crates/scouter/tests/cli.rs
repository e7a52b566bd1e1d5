#![cfg(feature = "cli")]

use std::path::Path;

use assert_cmd::Command;
use nalgebra::Point2;
use predicates::prelude::*;
use scouter::report::{write_json, DetectionReport};
use scouter::{Candidate, CandidateSet, Rect};
use serde_json::{json, Value};

/// 8x16 window over 4x4 cells that fires on fully bright luma cells.
fn write_detector_config(path: &Path) {
    let mut weights = vec![0.0f32; 6 * 2 * 4];
    weights[..8].fill(1.0);
    let config = json!({
        "models": [{
            "name": "bright",
            "window": [8, 16],
            "shrink": 4,
            "weights": weights,
            "bias": -7.5,
            "threshold": 0.0
        }]
    });
    std::fs::write(path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
}

fn write_blob_png(path: &Path) {
    let img = image::RgbImage::from_fn(64, 64, |x, y| {
        if (32..48).contains(&x) && (16..48).contains(&y) {
            image::Rgb([255, 255, 255])
        } else {
            image::Rgb([0, 0, 0])
        }
    });
    img.save(path).unwrap();
}

fn write_report(path: &Path, camera_id: i32, ground: [f32; 2], height: f32) {
    let mut c = Candidate::new(Rect::new(10, 10, 40, 120), 1.0).unwrap();
    c.set_height_estimate(height, Point2::new(ground[0], ground[1]))
        .unwrap();
    let report = DetectionReport {
        camera_id,
        offset: [0, 0],
        image_size: [640, 480],
        candidates: CandidateSet::from(vec![c]),
    };
    write_json(&report, path).unwrap();
}

fn scouter() -> Command {
    Command::cargo_bin("scouter").unwrap()
}

#[test]
fn help_lists_subcommands() {
    scouter()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect").and(predicate::str::contains("match")));
}

#[test]
fn detect_writes_report_and_annotated_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("detector.json");
    let image = dir.path().join("frame.png");
    let report = dir.path().join("report.json");
    let drawn = dir.path().join("drawn.jpg");
    write_detector_config(&config);
    write_blob_png(&image);

    scouter()
        .args(["detect", "--camera-id", "4", "--offset-x", "100", "--offset-y", "50"])
        .arg("--config")
        .arg(&config)
        .arg("--image")
        .arg(&image)
        .arg("--output")
        .arg(&report)
        .arg("--draw")
        .arg(&drawn)
        .assert()
        .success();

    let value: Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(value["camera_id"], 4);
    assert_eq!(value["offset"], json!([100, 50]));
    assert_eq!(value["image_size"], json!([64, 64]));
    let candidates = value["candidates"].as_array().unwrap();
    assert!(!candidates.is_empty());

    let jpeg = std::fs::read(&drawn).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[test]
fn detect_prints_report_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("detector.json");
    let image = dir.path().join("frame.png");
    write_detector_config(&config);
    write_blob_png(&image);

    scouter()
        .arg("detect")
        .arg("--config")
        .arg(&config)
        .arg("--image")
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"candidates\""));
}

#[test]
fn detect_takes_external_rects() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("detector.json");
    let image = dir.path().join("frame.png");
    let rects = dir.path().join("rects.json");
    let report = dir.path().join("report.json");
    write_detector_config(&config);
    write_blob_png(&image);
    let input = json!([
        { "x": 4, "y": 6, "width": 10, "height": 20 },
        { "x": 0, "y": 0, "width": 0, "height": 8 },
        { "x": 30, "y": 12, "width": 16, "height": 40 }
    ]);
    std::fs::write(&rects, input.to_string()).unwrap();

    scouter()
        .args(["detect", "--offset-x", "7"])
        .arg("--config")
        .arg(&config)
        .arg("--image")
        .arg(&image)
        .arg("--rects")
        .arg(&rects)
        .arg("--output")
        .arg(&report)
        .assert()
        .success();

    let value: Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    let candidates = value["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[1]["rect"]["x"], 30);
    assert_eq!(candidates[1]["offset"], json!([7, 0]));
}

#[test]
fn detect_reports_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("frame.png");
    write_blob_png(&image);

    scouter()
        .arg("detect")
        .arg("--config")
        .arg(dir.path().join("missing.json"))
        .arg("--image")
        .arg(&image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn match_merges_nearby_detections_from_two_cameras() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("cam1.json");
    let b = dir.path().join("cam2.json");
    write_report(&a, 1, [2.0, 5.0], 1.70);
    write_report(&b, 2, [2.12, 5.15], 1.58);

    let out = scouter()
        .args(["match", "--threshold", "0.5"])
        .arg("--input")
        .arg(&a)
        .arg("--input")
        .arg(&b)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&out).unwrap();
    let objects = value["objects"].as_array().unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["views"].as_array().unwrap().len(), 2);

    let out_path = dir.path().join("matched.json");
    scouter()
        .args(["match", "--threshold", "0.95"])
        .arg("--input")
        .arg(&a)
        .arg("--input")
        .arg(&b)
        .arg("--output")
        .arg(&out_path)
        .assert()
        .success();
    let value: Value = serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(value["objects"].as_array().unwrap().len(), 2);
}

#[test]
fn match_rejects_out_of_range_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("cam1.json");
    write_report(&a, 1, [0.0, 0.0], 1.7);

    scouter()
        .args(["match", "--threshold", "1.5"])
        .arg("--input")
        .arg(&a)
        .assert()
        .failure()
        .stderr(predicate::str::contains("threshold"));
}
