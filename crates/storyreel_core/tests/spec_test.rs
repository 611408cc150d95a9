//! Tests for story spec parsing and validation.

use storyreel_core::{JobPatch, JobRecord, JobStatus, StoryRequest, StorySpec};

fn scene_json(id: u32, duration: i64) -> String {
    format!(
        r#"{{
            "id": {id},
            "goal": "stay calm",
            "script": "I can take a deep breath.",
            "on_screen_text": "Deep breath",
            "image_prompt": "a child breathing calmly",
            "duration_sec": {duration},
            "audio_ssml": "<speak>I can take a deep breath.</speak>"
        }}"#
    )
}

fn spec_json(scenes: &[String]) -> String {
    format!(
        r#"{{
            "meta": {{"title": "First Day", "language": "en-US"}},
            "scenes": [{}],
            "closing_affirmation": "I can do this!"
        }}"#,
        scenes.join(",")
    )
}

#[test]
fn parses_valid_spec() {
    let raw = spec_json(&[scene_json(1, 7), scene_json(2, 8)]);
    let spec = StorySpec::from_json(&raw).unwrap();
    assert_eq!(spec.scenes.len(), 2);
    assert_eq!(spec.total_duration_secs(), 15);
    assert_eq!(spec.meta["title"], "First Day");
}

#[test]
fn coerces_nonpositive_durations_to_one() {
    let raw = spec_json(&[scene_json(1, 0), scene_json(2, -3)]);
    let spec = StorySpec::from_json(&raw).unwrap();
    assert!(spec.scenes.iter().all(|s| s.duration_sec == 1));
}

#[test]
fn clamps_oversized_durations_to_a_minute() {
    let raw = spec_json(&[scene_json(1, 100_000), scene_json(2, i64::MAX)]);
    let spec = StorySpec::from_json(&raw).unwrap();
    assert!(spec.scenes.iter().all(|s| s.duration_sec == 60));
    assert_eq!(spec.total_duration_secs(), 120);
}

#[test]
fn rejects_empty_scene_list() {
    let raw = spec_json(&[]);
    let err = StorySpec::from_json(&raw).unwrap_err();
    assert!(format!("{err}").contains("no scenes"));
}

#[test]
fn rejects_duplicate_scene_ids() {
    let raw = spec_json(&[scene_json(2, 6), scene_json(2, 6)]);
    let err = StorySpec::from_json(&raw).unwrap_err();
    assert!(format!("{err}").contains("duplicate scene id 2"));
}

#[test]
fn rejects_missing_fields() {
    let raw = r#"{"meta": {}, "scenes": [{"id": 1}], "closing_affirmation": ""}"#;
    assert!(StorySpec::from_json(raw).is_err());
}

#[test]
fn scenes_by_id_restores_ascending_order() {
    let raw = spec_json(&[scene_json(3, 6), scene_json(1, 6), scene_json(2, 6)]);
    let spec = StorySpec::from_json(&raw).unwrap();
    let ids: Vec<u32> = spec.scenes_by_id().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn patch_merges_without_clobbering() {
    let request: StoryRequest = serde_json::from_str(
        r#"{"situation": "first day of school", "setting": "a kindergarten classroom"}"#,
    )
    .unwrap();
    let mut record = JobRecord::queued("job-1", request);
    JobPatch {
        status: Some(JobStatus::Running),
        current_step: Some("spec".to_string()),
        ..JobPatch::default()
    }
    .apply(&mut record);
    JobPatch {
        total_scenes: Some(6),
        ..JobPatch::default()
    }
    .apply(&mut record);

    assert_eq!(record.status, JobStatus::Running);
    assert_eq!(record.progress.current_step, "spec");
    assert_eq!(record.progress.total_scenes, 6);
    assert_eq!(record.progress.scenes_completed, 0);
    assert!(record.error.is_none());
}

#[test]
fn terminal_states_are_terminal() {
    assert!(JobStatus::Succeeded.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(!JobStatus::Queued.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
}
