//! Generation job requests.
//!
//! A [`JobSpec`] is built by the front-end and treated as opaque JSON by the
//! core, which only adds `callback_url` and `task_id` before sending it.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Value, json};

use crate::consts::MAX_MEDIA_BYTES;

/// The four generation pipelines the worker exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    TextToVideo,
    ImageToVideo,
    Animate,
    CameraMotion,
}

impl JobKind {
    /// Worker endpoint path, appended to the worker base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            JobKind::TextToVideo => "/api/generate/t2v",
            JobKind::ImageToVideo => "/api/generate/i2v",
            JobKind::Animate => "/api/generate/animate",
            JobKind::CameraMotion => "/api/generate/camera-lora",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobKind::TextToVideo => "t2v",
            JobKind::ImageToVideo => "i2v",
            JobKind::Animate => "animate",
            JobKind::CameraMotion => "camera",
        }
    }

    fn min_prompt_chars(&self) -> usize {
        match self {
            JobKind::TextToVideo => 10,
            _ => 5,
        }
    }

    /// Default sampling parameters for this kind.
    fn defaults(&self) -> Map<String, Value> {
        let value = match self {
            JobKind::TextToVideo => json!({
                "width": 832, "height": 480, "num_frames": 121,
                "steps": 30, "cfg": 7.5, "use_fast_mode": false,
            }),
            JobKind::ImageToVideo => json!({
                "width": 1280, "height": 704, "num_frames": 81,
                "steps": 20, "cfg": 3.5, "use_fast_mode": false,
            }),
            JobKind::Animate => json!({
                "width": 640, "height": 640, "num_frames": 77,
                "steps": 6, "cfg": 1.0, "use_fast_mode": true,
            }),
            JobKind::CameraMotion => json!({
                "width": 1280, "height": 704, "num_frames": 81,
                "steps": 20, "cfg": 3.5, "lora_strength": 1.0,
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Camera moves the camera-LoRA pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMotion {
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    TiltUp,
    TiltDown,
    RollingClockwise,
    RollingAnticlockwise,
}

impl CameraMotion {
    pub const ALL: [CameraMotion; 8] = [
        CameraMotion::ZoomIn,
        CameraMotion::ZoomOut,
        CameraMotion::PanLeft,
        CameraMotion::PanRight,
        CameraMotion::TiltUp,
        CameraMotion::TiltDown,
        CameraMotion::RollingClockwise,
        CameraMotion::RollingAnticlockwise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraMotion::ZoomIn => "ZoomIn",
            CameraMotion::ZoomOut => "ZoomOut",
            CameraMotion::PanLeft => "PanLeft",
            CameraMotion::PanRight => "PanRight",
            CameraMotion::TiltUp => "TiltUp",
            CameraMotion::TiltDown => "TiltDown",
            CameraMotion::RollingClockwise => "RollingClockwise",
            CameraMotion::RollingAnticlockwise => "RollingAnticlockwise",
        }
    }
}

impl FromStr for CameraMotion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        CameraMotion::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<_> = CameraMotion::ALL.iter().map(|m| m.as_str()).collect();
                anyhow::anyhow!("unknown camera motion '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// A complete generation request, ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    kind: JobKind,
    fields: Map<String, Value>,
}

impl JobSpec {
    /// Start a job of `kind` with its default parameters and the given prompt.
    fn with_prompt(kind: JobKind, prompt: &str) -> Result<Self> {
        let prompt = prompt.trim();
        if prompt.chars().count() < kind.min_prompt_chars() {
            bail!(
                "prompt too short: {} needs at least {} characters",
                kind,
                kind.min_prompt_chars()
            );
        }
        let mut fields = kind.defaults();
        fields.insert("prompt".into(), Value::String(prompt.to_string()));
        fields.insert("negative_prompt".into(), Value::String(String::new()));
        Ok(Self { kind, fields })
    }

    pub fn text_to_video(prompt: &str) -> Result<Self> {
        Self::with_prompt(JobKind::TextToVideo, prompt)
    }

    pub fn image_to_video(image: &[u8], prompt: &str) -> Result<Self> {
        let mut spec = Self::with_prompt(JobKind::ImageToVideo, prompt)?;
        spec.attach("image_base64", image)?;
        Ok(spec)
    }

    /// Transfer the motion in `video` onto the character in `reference`.
    pub fn animate(reference: &[u8], video: &[u8], prompt: &str) -> Result<Self> {
        let mut spec = Self::with_prompt(JobKind::Animate, prompt)?;
        spec.attach("reference_image_base64", reference)?;
        spec.attach("video_base64", video)?;
        Ok(spec)
    }

    pub fn camera_motion(motion: CameraMotion, image: &[u8], prompt: &str) -> Result<Self> {
        let mut spec = Self::with_prompt(JobKind::CameraMotion, prompt)?;
        spec.attach("image_base64", image)?;
        spec.fields
            .insert("camera_motion".into(), Value::String(motion.as_str().to_string()));
        Ok(spec)
    }

    pub fn with_negative_prompt(mut self, negative: &str) -> Self {
        self.fields.insert(
            "negative_prompt".into(),
            Value::String(negative.trim().to_string()),
        );
        self
    }

    /// Override a single parameter, e.g. `steps` or `cfg`.
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The request body sent to the worker.
    pub fn payload(&self, callback_url: &str, task_id: &str) -> Value {
        let mut body = self.fields.clone();
        body.insert("callback_url".into(), Value::String(callback_url.to_string()));
        body.insert("task_id".into(), Value::String(task_id.to_string()));
        Value::Object(body)
    }

    fn attach(&mut self, field: &str, media: &[u8]) -> Result<()> {
        if media.is_empty() {
            bail!("{field}: media is empty");
        }
        if media.len() > MAX_MEDIA_BYTES {
            bail!(
                "{field}: media too large ({} bytes, max {} MB)",
                media.len(),
                MAX_MEDIA_BYTES / (1024 * 1024)
            );
        }
        self.fields
            .insert(field.to_string(), Value::String(STANDARD.encode(media)));
        Ok(())
    }
}
