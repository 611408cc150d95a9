//! Local video encoding through ffmpeg.

use crate::LocalRenderer;
use std::path::{Path, PathBuf};
use storyreel_core::StorySpec;
use storyreel_error::{RenderError, RenderErrorKind, StoryreelResult};
use tokio::process::Command;

/// Encoding parameters. Resolution and frame rate are configuration, not
/// architecture.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: u32,
    /// Name or path of the ffmpeg binary.
    pub ffmpeg_bin: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            ffmpeg_bin: "ffmpeg".to_string(),
        }
    }
}

impl EncoderConfig {
    /// Read encoding parameters from the environment.
    ///
    /// Reads `VIDEO_WIDTH` (default 1280), `VIDEO_HEIGHT` (default 720) and
    /// `FPS` (default 30).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            width: env_u32("VIDEO_WIDTH", defaults.width),
            height: env_u32("VIDEO_HEIGHT", defaults.height),
            fps: env_u32("FPS", defaults.fps),
            ffmpeg_bin: defaults.ffmpeg_bin,
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Local rendering strategy: one ffmpeg clip per scene, lossless concat,
/// then a subtitle burn pass.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer {
    config: EncoderConfig,
}

impl FfmpegRenderer {
    /// Create a renderer with the given encoding parameters.
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Run ffmpeg with the given arguments, propagating stderr verbatim on
    /// failure so encoder diagnostics survive into the job's error text.
    async fn run_ffmpeg(&self, args: &[String]) -> StoryreelResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let output = Command::new(&self.config.ffmpeg_bin)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                RenderError::new(RenderErrorKind::Encoder(format!(
                    "failed to spawn {}: {e}",
                    self.config.ffmpeg_bin
                )))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(RenderError::new(RenderErrorKind::Encoder(stderr)))?;
        }
        Ok(())
    }

    /// Encode one scene: loop the image over the audio for the target
    /// duration, with a slow zoom so the frame is not entirely static.
    async fn scene_clip(
        &self,
        image: &Path,
        audio: &Path,
        out: &Path,
        duration_sec: u32,
    ) -> StoryreelResult<()> {
        let frames = duration_sec * self.config.fps;
        let filter = format!(
            "[0:v]zoompan=z='min(zoom+0.0008,1.08)':d={frames}:s={}x{},format=yuv420p[v]",
            self.config.width, self.config.height
        );
        let args = vec![
            "-y".to_string(),
            "-loop".to_string(),
            "1".to_string(),
            "-i".to_string(),
            image.display().to_string(),
            "-i".to_string(),
            audio.display().to_string(),
            "-filter_complex".to_string(),
            filter,
            "-map".to_string(),
            "[v]".to_string(),
            "-map".to_string(),
            "1:a".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-r".to_string(),
            self.config.fps.to_string(),
            "-t".to_string(),
            duration_sec.to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-shortest".to_string(),
            out.display().to_string(),
        ];
        self.run_ffmpeg(&args).await
    }

    /// Losslessly concatenate clips with the concat demuxer.
    async fn concat(&self, clips: &[PathBuf], out: &Path) -> StoryreelResult<()> {
        let list_path = out.with_extension("concat.txt");
        let mut list = String::new();
        for clip in clips {
            list.push_str(&format!("file '{}'\n", clip.display()));
        }
        tokio::fs::write(&list_path, list).await.map_err(|e| {
            RenderError::new(RenderErrorKind::Io(format!(
                "{}: {e}",
                list_path.display()
            )))
        })?;

        let args = vec![
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list_path.display().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            out.display().to_string(),
        ];
        self.run_ffmpeg(&args).await
    }

    /// Burn the subtitle track into the concatenated video.
    async fn burn_subtitles(&self, input: &Path, srt: &Path, out: &Path) -> StoryreelResult<()> {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-vf".to_string(),
            format!("subtitles={}", srt.display()),
            "-c:a".to_string(),
            "copy".to_string(),
            out.display().to_string(),
        ];
        self.run_ffmpeg(&args).await
    }
}

#[async_trait::async_trait]
impl LocalRenderer for FfmpegRenderer {
    #[tracing::instrument(skip(self, spec, workdir, srt_path), fields(scenes = spec.scenes.len()))]
    async fn render(
        &self,
        spec: &StorySpec,
        workdir: &Path,
        srt_path: &Path,
    ) -> StoryreelResult<PathBuf> {
        let mut clips = Vec::new();
        for scene in spec.scenes_by_id() {
            let image = workdir.join(format!("scene_{}.png", scene.id));
            let audio = workdir.join(format!("scene_{}.mp3", scene.id));
            for asset in [&image, &audio] {
                if !asset.exists() {
                    Err(RenderError::new(RenderErrorKind::MissingAsset(format!(
                        "scene {}: {}",
                        scene.id,
                        asset.display()
                    ))))?;
                }
            }

            let clip = workdir.join(format!("scene_{}.mp4", scene.id));
            tracing::debug!(scene = scene.id, "Encoding scene clip");
            self.scene_clip(&image, &audio, &clip, scene.duration_sec)
                .await?;
            clips.push(clip);
        }

        let concatenated = workdir.join("tmp_concat.mp4");
        self.concat(&clips, &concatenated).await?;

        let final_path = workdir.join("final.mp4");
        self.burn_subtitles(&concatenated, srt_path, &final_path)
            .await?;
        tracing::info!(path = %final_path.display(), "Local rendering completed");
        Ok(final_path)
    }
}
