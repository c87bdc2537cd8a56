//! ComfyUI API-format graph assembly.
//!
//! Seven nodes: checkpoint loader, positive and negative CLIP encoders,
//! empty latent, KSampler, VAE decode, save image. Node ids are fixed so
//! the usage instructions can refer to them.

use crate::types::ToolError;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_OUTPUT_SIZE: &str = "1024x1024";
pub const DEFAULT_STEPS: u32 = 20;
pub const MIN_STEPS: u32 = 10;
pub const MAX_STEPS: u32 = 50;

const MIN_DIMENSION: u32 = 64;
const MAX_DIMENSION: u32 = 4096;
const CFG_SCALE: f64 = 7.5;
const SAMPLER: &str = "euler_ancestral";
const SCHEDULER: &str = "normal";
const FILENAME_PREFIX: &str = "floral_arrangement";
/// Largest integer a JSON consumer can hold exactly.
const SEED_MASK: u64 = (1 << 53) - 1;

pub const USAGE_INSTRUCTIONS: &str = "1. Copy the 'workflow' JSON from this response\n\
2. In ComfyUI, click 'Load' and paste the JSON\n\
3. Ensure you have the specified model checkpoint\n\
4. Click 'Queue Prompt' to generate\n\
5. Adjust the seed value in node 5 for variations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPreference {
    Flux,
    Sdxl,
    Sd15,
}

impl ModelPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelPreference::Flux => "flux",
            ModelPreference::Sdxl => "sdxl",
            ModelPreference::Sd15 => "sd15",
        }
    }

    pub fn checkpoint(&self) -> &'static str {
        match self {
            ModelPreference::Flux => "flux1-dev.safetensors",
            ModelPreference::Sdxl => "sd_xl_base_1.0.safetensors",
            ModelPreference::Sd15 => "v1-5-pruned-emaonly.safetensors",
        }
    }
}

impl Default for ModelPreference {
    fn default() -> Self {
        ModelPreference::Flux
    }
}

impl fmt::Display for ModelPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelPreference {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flux" => Ok(ModelPreference::Flux),
            "sdxl" => Ok(ModelPreference::Sdxl),
            "sd15" | "sd1.5" => Ok(ModelPreference::Sd15),
            other => Err(ToolError::InvalidParams(format!(
                "unknown model '{other}', expected flux, sdxl or sd15"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl Default for OutputSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for OutputSize {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ToolError::InvalidParams(format!("output_size '{s}' is not WIDTHxHEIGHT"));
        let (w, h) = s
            .trim()
            .to_ascii_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
            .ok_or_else(invalid)?;
        let width: u32 = w.parse().map_err(|_| invalid())?;
        let height: u32 = h.parse().map_err(|_| invalid())?;
        for dim in [width, height] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&dim) {
                return Err(ToolError::InvalidParams(format!(
                    "output_size dimensions must be between {MIN_DIMENSION} and {MAX_DIMENSION}"
                )));
            }
        }
        Ok(Self { width, height })
    }
}

pub fn validate_steps(steps: u32) -> Result<u32, ToolError> {
    if (MIN_STEPS..=MAX_STEPS).contains(&steps) {
        Ok(steps)
    } else {
        Err(ToolError::InvalidParams(format!(
            "steps must be between {MIN_STEPS} and {MAX_STEPS}, got {steps}"
        )))
    }
}

/// Deterministic sampler seed from a selection fingerprint.
pub fn seed_from_fingerprint(fingerprint: &str) -> u64 {
    let digits: String = fingerprint.chars().take(16).collect();
    u64::from_str_radix(&digits, 16).unwrap_or(0) & SEED_MASK
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphSpec<'a> {
    pub positive_prompt: &'a str,
    pub negative_prompt: &'a str,
    pub size: OutputSize,
    pub model: ModelPreference,
    pub steps: u32,
    pub seed: u64,
}

/// API-format graph: node id -> `{class_type, inputs}`.
pub fn build_graph(spec: &GraphSpec<'_>) -> Value {
    json!({
        "1": {
            "class_type": "CheckpointLoaderSimple",
            "inputs": {"ckpt_name": spec.model.checkpoint()}
        },
        "2": {
            "class_type": "CLIPTextEncode",
            "inputs": {"text": spec.positive_prompt, "clip": ["1", 1]}
        },
        "3": {
            "class_type": "CLIPTextEncode",
            "inputs": {"text": spec.negative_prompt, "clip": ["1", 1]}
        },
        "4": {
            "class_type": "EmptyLatentImage",
            "inputs": {"width": spec.size.width, "height": spec.size.height, "batch_size": 1}
        },
        "5": {
            "class_type": "KSampler",
            "inputs": {
                "seed": spec.seed,
                "steps": spec.steps,
                "cfg": CFG_SCALE,
                "sampler_name": SAMPLER,
                "scheduler": SCHEDULER,
                "denoise": 1.0,
                "model": ["1", 0],
                "positive": ["2", 0],
                "negative": ["3", 0],
                "latent_image": ["4", 0]
            }
        },
        "6": {
            "class_type": "VAEDecode",
            "inputs": {"samples": ["5", 0], "vae": ["1", 2]}
        },
        "7": {
            "class_type": "SaveImage",
            "inputs": {"filename_prefix": FILENAME_PREFIX, "images": ["6", 0]}
        }
    })
}
