//! Prompt templates for story spec generation.

use storyreel_core::StoryRequest;

/// System prompt establishing the instructional-design persona and the
/// social-story writing criteria.
pub const SYSTEM_PROMPT: &str = "You are a special-education instructional designer. \
Write Social Stories that follow the standard criteria:\n\
- Descriptive and perspective sentences greatly outnumber directive sentences.\n\
- Answer who/what/where/when/why/how concretely; nonjudgmental tone.\n\
- Short sentences at early-reader level; avoid sarcasm and idioms.\n\
- End with an encouraging affirmation.\n\
Output ONLY valid JSON matching the provided schema. Avoid names; use \"I\" or \"the student\".";

/// Fixed schema description embedded in the user prompt. The generator must
/// return JSON matching this shape exactly.
pub const STORY_SCHEMA: &str = r#"{
  "meta": {
    "language": "en-US",
    "age": <number>,
    "reading_level": "<string>",
    "perspective": "first_person",
    "visual_guidelines": {
      "palette": "soft_high_contrast",
      "avoid": ["flashing", "crowded backgrounds"]
    },
    "title": "<short title>"
  },
  "scenes": [
    {
      "id": <int>,
      "goal": "<short goal>",
      "script": "<1-2 short sentences at early-reader level>",
      "on_screen_text": "<<= 10 words>",
      "image_prompt": "<flat, classroom-friendly illustration; simple shapes; soft colors; clean background; no text on walls>",
      "duration_sec": <6-9>,
      "audio_ssml": "<speak><prosody rate='-10%'>...</prosody></speak>"
    }
  ],
  "closing_affirmation": "<gentle encouragement>"
}"#;

/// Assemble the user prompt for a request.
pub fn build_user_prompt(request: &StoryRequest) -> String {
    let words_to_avoid =
        serde_json::to_string(&request.words_to_avoid).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Inputs:\n\
         - Age: {age}, Reading level: {reading_level}, Language: en-US\n\
         - Diagnosis summary (high-level only): {diagnosis_summary}\n\
         - Situation: {situation}\n\
         - Setting: {setting}\n\
         - Words to avoid: {words_to_avoid}\n\
         - Perspective: first_person\n\n\
         Schema:\n{schema}\n\n\
         Constraints:\n\
         - 6-8 scenes.\n\
         - Descriptive/perspective sentences greatly outnumber directive ones.\n\
         - Avoid negative/judgmental language and idioms.\n\
         - Match reading level to age.\n\
         Return ONLY valid JSON for the schema above.",
        age = request.age,
        reading_level = request.reading_level,
        diagnosis_summary = request.diagnosis_summary,
        situation = request.situation,
        setting = request.setting,
        words_to_avoid = words_to_avoid,
        schema = STORY_SCHEMA,
    )
}
