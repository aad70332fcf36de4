//! Integration tests for media_frame organ operations

use media_frame::organ::{FrameOrgan, Organ, Stimulus};
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use tempfile::TempDir;

/// Helper to create a test stimulus
fn create_stimulus(op: &str, input: serde_json::Value) -> Stimulus {
    Stimulus {
        op: op.to_string(),
        input,
        context: HashMap::new(),
    }
}

#[tokio::test]
async fn test_media_capabilities() {
    let organ = FrameOrgan::new();

    let response = organ.stimulate(create_stimulus("media.capabilities", json!({}))).await.unwrap();

    assert!(response.ok);
    assert_eq!(response.output["name"], "media_frame");
    let functions = response.output["functions"].as_array().unwrap();
    assert_eq!(functions.len(), 4);
}

#[tokio::test]
async fn test_organ_describe() {
    let organ = FrameOrgan::new();
    let card = organ.describe();

    assert_eq!(card.name, "media_frame");
    assert_eq!(card.division, "media");
    assert!(card.execution_modes.contains(&"embedded".to_string()));
    assert!(card.tags.contains(&"frames".to_string()));
}

#[tokio::test]
async fn test_unsupported_operation() {
    let organ = FrameOrgan::new();

    let response = organ.stimulate(create_stimulus("invalid.operation", json!({}))).await.unwrap();

    assert!(!response.ok);
    assert!(response.output["error"].as_str().unwrap().contains("Unsupported"));
}

#[tokio::test]
async fn test_missing_required_input() {
    let organ = FrameOrgan::new();

    // frame.read requires input_path and position
    let response = organ
        .stimulate(create_stimulus("frame.read", json!({"input_path": "/tmp/a.mp4", "output_path": "/tmp/a.jpg"})))
        .await
        .unwrap();

    assert!(!response.ok);
    assert!(response.output["error"].as_str().unwrap().contains("Missing required field"));
}

#[tokio::test]
async fn test_frame_read_missing_file() {
    let organ = FrameOrgan::new();

    let response = organ
        .stimulate(create_stimulus(
            "frame.read",
            json!({
                "input_path": "/nonexistent/clip.mp4",
                "output_path": "/tmp/never-written.jpg",
                "position": 0.5
            }),
        ))
        .await
        .unwrap();

    assert!(!response.ok);
    assert!(response.output["error"].as_str().unwrap().contains("does not exist"));
}

#[tokio::test]
async fn test_frame_probe_rejects_directory() {
    let organ = FrameOrgan::new();
    let dir = TempDir::new().unwrap();

    let response = organ
        .stimulate(create_stimulus(
            "frame.probe",
            json!({ "input_path": dir.path().to_string_lossy() }),
        ))
        .await
        .unwrap();

    assert!(!response.ok);
    assert!(response.output["error"].as_str().unwrap().contains("Unsupported input"));
}

#[tokio::test]
async fn test_archive_read_zip() {
    let organ = FrameOrgan::new();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("download.zip");

    let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    writer.add_directory("clips/", options).unwrap();
    writer.start_file("clips/intro.MP4", options).unwrap();
    writer.write_all(b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom").unwrap();
    writer.start_file("clips/credits.txt", options).unwrap();
    writer.write_all(b"thanks for watching").unwrap();
    writer.finish().unwrap();

    let response = organ
        .stimulate(create_stimulus("archive.read", json!({ "input_path": path.to_string_lossy() })))
        .await
        .unwrap();

    assert!(response.ok, "{}", response.output);
    assert_eq!(response.output["kind"], "zip");
    assert_eq!(response.output["file_count"], 2);
    let files = response.output["files"].as_array().unwrap();
    assert_eq!(files[0]["extension"], ".mp4");
    assert!(files[0]["mime_type"].as_str().unwrap().starts_with("video/"));
    assert_eq!(files[1]["extension"], ".txt");
    assert_eq!(files[1]["size_bytes"], 19);
}

#[tokio::test]
async fn test_archive_read_failure_counts_in_metrics() {
    let organ = FrameOrgan::new();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.tar.gz");
    std::fs::write(&path, b"not gzip at all").unwrap();

    let response = organ
        .stimulate(create_stimulus("archive.read", json!({ "input_path": path.to_string_lossy() })))
        .await
        .unwrap();
    assert!(!response.ok);

    let snapshot = organ.metrics().snapshot();
    assert_eq!(snapshot.failed_requests, 1);
    assert_eq!(snapshot.operations.archive_read, 1);
}

#[tokio::test]
async fn test_function_cards_have_required_fields() {
    let organ = FrameOrgan::new();
    let card = organ.describe();

    for function in &card.functions {
        assert!(!function.name.is_empty(), "Function name is empty");
        assert!(!function.description.is_empty(), "Function description is empty for {}", function.name);
        assert!(!function.tags.is_empty(), "Function tags are empty for {}", function.name);
        assert!(!function.examples.is_empty(), "Function examples are empty for {}", function.name);
        assert!(function.output_schema.is_object(), "Output schema not an object for {}", function.name);
    }
}
