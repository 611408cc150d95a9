//! Image generation via a create-then-poll prediction service.

use crate::ImageGenerator;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::time::{Duration, Instant};
use storyreel_error::{
    ConfigError, StoryreelResult, UpstreamError, UpstreamErrorKind,
};

/// Style suffix appended to every scene prompt.
const PROMPT_SUFFIX: &str = ", flat, classroom-friendly illustration, simple shapes, \
soft colors, clean background, no text on walls";

/// Configuration for the prediction image client.
#[derive(Debug, Clone)]
pub struct ImageClientConfig {
    /// Base URL of the prediction API.
    pub base_url: String,
    /// API token.
    pub api_token: String,
    /// Model selector: either an `owner/name` alias or a pinned version hash.
    pub model: String,
    /// Interval between status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Overall wall-clock ceiling for polling, in seconds. Independent of
    /// the per-request timeout.
    pub poll_timeout_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl ImageClientConfig {
    /// Read configuration from the environment.
    ///
    /// Reads:
    /// - `REPLICATE_API_TOKEN` (required)
    /// - `REPLICATE_BASE_URL` (default: "https://api.replicate.com")
    /// - `REPLICATE_MODEL_VERSION` (default: "black-forest-labs/flux-schnell")
    /// - `REPLICATE_POLL_INTERVAL_MS` (default: 1500)
    /// - `REPLICATE_POLL_TIMEOUT_S` (default: 120)
    pub fn from_env() -> StoryreelResult<Self> {
        let api_token = std::env::var("REPLICATE_API_TOKEN")
            .map_err(|_| ConfigError::new("REPLICATE_API_TOKEN not set"))?;
        let base_url = std::env::var("REPLICATE_BASE_URL")
            .unwrap_or_else(|_| "https://api.replicate.com".to_string());
        let model = std::env::var("REPLICATE_MODEL_VERSION")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "black-forest-labs/flux-schnell".to_string());
        let poll_interval_ms = env_u64("REPLICATE_POLL_INTERVAL_MS", 1500);
        let poll_timeout_secs = env_u64("REPLICATE_POLL_TIMEOUT_S", 120);
        Ok(Self {
            base_url,
            api_token,
            model,
            poll_interval_ms,
            poll_timeout_secs,
            request_timeout_secs: 30,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// How the model selector routes the create call.
enum ModelSelector {
    /// `owner/name` alias; create against the model's predictions route.
    Alias { owner: String, name: String },
    /// Pinned version hash; create against the generic predictions route.
    Version(String),
}

impl ModelSelector {
    fn parse(selector: &str) -> Self {
        // `owner/name` or `owner/name:alias`; anything else is a version hash.
        let (owner_name, _alias) = match selector.split_once(':') {
            Some((head, tail)) => (head, Some(tail)),
            None => (selector, None),
        };
        match owner_name.split_once('/') {
            Some((owner, name)) => ModelSelector::Alias {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            None => ModelSelector::Version(selector.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PredictionStatus {
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    logs: Option<String>,
}

/// Image generator speaking the create-then-poll prediction protocol.
#[derive(Debug, Clone)]
pub struct PredictionImageClient {
    config: ImageClientConfig,
    client: reqwest::Client,
}

impl PredictionImageClient {
    /// Create a new image client.
    pub fn new(config: ImageClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Submit a generation request and return the prediction id.
    async fn create_prediction(&self, prompt: &str) -> StoryreelResult<String> {
        let mut body = json!({
            "input": {
                "prompt": format!("{prompt}{PROMPT_SUFFIX}"),
                "num_outputs": 1,
            }
        });
        let url = match ModelSelector::parse(&self.config.model) {
            ModelSelector::Alias { owner, name } => {
                format!("{}/v1/models/{owner}/{name}/predictions", self.config.base_url)
            }
            ModelSelector::Version(version) => {
                body["version"] = json!(version);
                format!("{}/v1/predictions", self.config.base_url)
            }
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.config.api_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                UpstreamError::new(UpstreamErrorKind::Http(format!("prediction create: {e}")))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(UpstreamError::new(UpstreamErrorKind::Api(format!(
                "prediction create failed {status}: {detail}"
            )))
            .into());
        }

        let created: PredictionCreated = response.json().await.map_err(|e| {
            UpstreamError::new(UpstreamErrorKind::Deserialization(format!(
                "prediction create response: {e}"
            )))
        })?;
        Ok(created.id)
    }

    /// Poll a prediction until it reaches a terminal state, returning the
    /// output URL on success.
    async fn wait_for_output(&self, prediction_id: &str) -> StoryreelResult<String> {
        let url = format!("{}/v1/predictions/{prediction_id}", self.config.base_url);
        let deadline = Instant::now() + Duration::from_secs(self.config.poll_timeout_secs);

        loop {
            let response = self
                .client
                .get(&url)
                .header("Authorization", format!("Token {}", self.config.api_token))
                .send()
                .await
                .map_err(|e| {
                    UpstreamError::new(UpstreamErrorKind::Http(format!("prediction poll: {e}")))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                return Err(UpstreamError::new(UpstreamErrorKind::Api(format!(
                    "prediction poll failed {status}: {detail}"
                )))
                .into());
            }

            let body: PredictionStatus = response.json().await.map_err(|e| {
                UpstreamError::new(UpstreamErrorKind::Deserialization(format!(
                    "prediction poll response: {e}"
                )))
            })?;

            match body.status.as_str() {
                "succeeded" => {
                    let output_url = body
                        .output
                        .as_ref()
                        .and_then(|o| o.as_array())
                        .and_then(|a| a.first())
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    return output_url.ok_or_else(|| {
                        UpstreamError::new(UpstreamErrorKind::Generation(
                            "prediction succeeded but returned no output URL".to_string(),
                        ))
                        .into()
                    });
                }
                "failed" | "canceled" => {
                    Err(UpstreamError::new(UpstreamErrorKind::Generation(format!(
                        "prediction {}: error={:?} logs={:?}",
                        body.status, body.error, body.logs
                    ))))?;
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                Err(UpstreamError::new(UpstreamErrorKind::PollTimeout(format!(
                    "prediction {prediction_id} did not finish within {}s",
                    self.config.poll_timeout_secs
                ))))?;
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    /// Download the generated image and normalize it to PNG.
    async fn fetch_png(&self, url: &str) -> StoryreelResult<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            UpstreamError::new(UpstreamErrorKind::Http(format!("image fetch: {e}")))
        })?;

        if !response.status().is_success() {
            Err(UpstreamError::new(UpstreamErrorKind::Api(format!(
                "image fetch failed: {}",
                response.status()
            ))))?;
        }

        let bytes = response.bytes().await.map_err(|e| {
            UpstreamError::new(UpstreamErrorKind::Http(format!("image body: {e}")))
        })?;

        to_png(&bytes)
    }
}

/// Re-encode image bytes as PNG if they are in any other format.
///
/// Alpha channels are composited onto a white background; transparent
/// frames confuse the downstream video encoders.
fn to_png(bytes: &[u8]) -> StoryreelResult<Vec<u8>> {
    let format = image::guess_format(bytes).map_err(|e| {
        UpstreamError::new(UpstreamErrorKind::Deserialization(format!(
            "unrecognized image format: {e}"
        )))
    })?;
    if format == image::ImageFormat::Png {
        return Ok(bytes.to_vec());
    }

    tracing::debug!(format = ?format, "Converting downloaded image to PNG");
    let decoded = image::load_from_memory(bytes).map_err(|e| {
        UpstreamError::new(UpstreamErrorKind::Deserialization(format!(
            "image decode: {e}"
        )))
    })?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut flattened = image::RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        let blend = |channel: u8| -> u8 {
            ((channel as u16 * alpha + 255 * (255 - alpha)) / 255) as u8
        };
        flattened.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }

    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(flattened)
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| {
            UpstreamError::new(UpstreamErrorKind::Deserialization(format!(
                "png encode: {e}"
            )))
        })?;
    Ok(out.into_inner())
}

#[async_trait::async_trait]
impl ImageGenerator for PredictionImageClient {
    #[tracing::instrument(skip(self, prompt))]
    async fn generate_png(&self, prompt: &str) -> StoryreelResult<Vec<u8>> {
        let prediction_id = self.create_prediction(prompt).await?;
        tracing::debug!(prediction_id = %prediction_id, "Prediction created, polling");
        let output_url = self.wait_for_output(&prediction_id).await?;
        tracing::debug!(url = %output_url, "Prediction finished, fetching image");
        self.fetch_png(&output_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_alias_and_version() {
        assert!(matches!(
            ModelSelector::parse("black-forest-labs/flux-schnell"),
            ModelSelector::Alias { .. }
        ));
        assert!(matches!(
            ModelSelector::parse("owner/name:latest"),
            ModelSelector::Alias { .. }
        ));
        assert!(matches!(
            ModelSelector::parse("5c7d5dc6dd8bf75c1acaa8565735e7986bc5b66206b55cca93cb72c9bf15ccaa"),
            ModelSelector::Version(_)
        ));
    }

    #[test]
    fn png_passthrough_keeps_bytes() {
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2))
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        let png = buf.into_inner();
        assert_eq!(to_png(&png).unwrap(), png);
    }

    #[test]
    fn alpha_composites_onto_white() {
        let mut rgba = image::RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(rgba)
            .write_to(&mut buf, image::ImageFormat::WebP)
            .unwrap();

        let png = to_png(&buf.into_inner()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255]);
    }
}
