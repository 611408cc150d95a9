//! Subtitle track generation.

use storyreel_core::StorySpec;

/// Build an SRT subtitle track from the spec's captions.
///
/// One cue per scene in ascending id order; timestamps are computed from
/// cumulative scene durations, so the track always aligns with the
/// concatenated clips regardless of what order the assets were produced in.
pub fn build_srt(spec: &StorySpec) -> String {
    let mut srt = String::new();
    let mut cursor_secs = 0u32;

    for (index, scene) in spec.scenes_by_id().iter().enumerate() {
        let start = cursor_secs;
        let end = cursor_secs + scene.duration_sec;
        srt.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(start),
            format_timestamp(end),
            scene.on_screen_text,
        ));
        cursor_secs = end;
    }
    srt
}

fn format_timestamp(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02},000")
}
