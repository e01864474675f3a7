//! Daemon configuration module.
//!
//! Contains the runtime configuration for the inbetween-daemon: which
//! inference endpoint to talk to, where generated frames are written, and
//! the default generation parameters used to build a [`JobRequest`].
//!
//! [`JobRequest`]: crate::types::JobRequest

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{CFG_SCALE_RANGE, DIMENSION_RANGE, ETA_RANGE, FRAME_STRIDE_RANGE, STEPS_RANGE};

/// Base URL of the hosted in-betweening model.
pub const HOSTED_URL: &str = "https://genime-production.up.railway.app/frame-inbetween";

/// Path of the in-betweening route on a self-hosted server.
pub const INBETWEEN_ROUTE: &str = "/frame-inbetween";

/// Default address of a self-hosted inference server.
pub const DEFAULT_LOCAL_ADDRESS: &str = "http://127.0.0.1:8188";

/// The inference endpoint a job is submitted to.
///
/// Exactly one variant is active; the hosted model is authenticated with an
/// API key, a local server is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EndpointConfig {
    /// The hosted model at [`HOSTED_URL`].
    Hosted { api_key: String },
    /// A self-hosted server at `base_address`.
    Local { base_address: String },
}

impl EndpointConfig {
    /// Returns the full URL requests are posted to.
    pub fn url(&self) -> String {
        match self {
            EndpointConfig::Hosted { .. } => HOSTED_URL.to_string(),
            EndpointConfig::Local { base_address } => {
                format!("{}{}", base_address.trim_end_matches('/'), INBETWEEN_ROUTE)
            }
        }
    }

    /// Returns the API key to send, if this endpoint is authenticated.
    pub fn api_key(&self) -> Option<&str> {
        match self {
            EndpointConfig::Hosted { api_key } => Some(api_key),
            EndpointConfig::Local { .. } => None,
        }
    }

    /// Returns a short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            EndpointConfig::Hosted { .. } => "hosted",
            EndpointConfig::Local { .. } => "local",
        }
    }
}

/// Default generation parameters, mirrored from the panel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDefaults {
    /// First endpoint frame; generated frames are inserted from here.
    pub start_frame: i32,
    /// Second endpoint frame.
    pub end_frame: i32,
    /// Text prompt describing the motion.
    pub prompt: String,
    /// DDIM eta (0-1).
    pub eta: f32,
    /// Classifier-free guidance scale (1-15).
    pub cfg_scale: f32,
    /// Number of sampling steps (1-60).
    pub sampling_steps: u32,
    /// Frame stride passed to the model (1-30).
    pub frame_stride: u32,
    /// Requested output width in pixels (64-5000).
    pub width: u32,
    /// Requested output height in pixels (64-5000).
    pub height: u32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            start_frame: 1,
            end_frame: 10,
            prompt: String::new(),
            eta: 1.0,
            cfg_scale: 7.5,
            sampling_steps: 50,
            frame_stride: 10,
            width: 512,
            height: 320,
        }
    }
}

/// Runtime configuration for the daemon.
///
/// This configuration is typically loaded from environment variables at
/// startup and then overridden by command-line arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InbetweenConfig {
    /// Use the hosted model instead of a local server.
    pub use_hosted_model: bool,

    /// API key for the hosted model (sent as `X-API-KEY`).
    pub api_key: String,

    /// Address of the local server, e.g. `http://127.0.0.1:8188`.
    pub local_address: String,

    /// Base directory for generated frames.
    /// If None, uses the platform-specific default data location.
    pub output_dir: Option<PathBuf>,

    /// Default generation parameters.
    pub generation: GenerationDefaults,
}

impl Default for InbetweenConfig {
    fn default() -> Self {
        Self {
            use_hosted_model: true,
            api_key: String::new(),
            local_address: DEFAULT_LOCAL_ADDRESS.to_string(),
            output_dir: None,
            generation: GenerationDefaults::default(),
        }
    }
}

impl InbetweenConfig {
    /// Creates a new InbetweenConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an InbetweenConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `INBETWEEN_USE_HOSTED` - `true`/`false`, `1`/`0`
    /// - `INBETWEEN_API_KEY` - API key for the hosted model
    /// - `INBETWEEN_LOCAL_ADDRESS` - Local server address
    /// - `INBETWEEN_OUTPUT_DIR` - Base output directory
    /// - `INBETWEEN_PROMPT` - Default prompt
    /// - `INBETWEEN_ETA`, `INBETWEEN_CFG_SCALE`, `INBETWEEN_STEPS`,
    ///   `INBETWEEN_FRAME_STRIDE`, `INBETWEEN_WIDTH`, `INBETWEEN_HEIGHT`
    ///
    /// Unset, unparsable, or out-of-range values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("INBETWEEN_USE_HOSTED") {
            if let Some(flag) = parse_flag(&value) {
                config.use_hosted_model = flag;
            }
        }

        if let Ok(key) = std::env::var("INBETWEEN_API_KEY") {
            config.api_key = key;
        }

        if let Ok(address) = std::env::var("INBETWEEN_LOCAL_ADDRESS") {
            if !address.trim().is_empty() {
                config.local_address = address;
            }
        }

        if let Ok(path) = std::env::var("INBETWEEN_OUTPUT_DIR") {
            config.output_dir = Some(PathBuf::from(path));
        }

        if let Ok(prompt) = std::env::var("INBETWEEN_PROMPT") {
            config.generation.prompt = prompt;
        }

        let generation = &mut config.generation;
        if let Some(eta) = env_in_range("INBETWEEN_ETA", ETA_RANGE) {
            generation.eta = eta;
        }
        if let Some(cfg_scale) = env_in_range("INBETWEEN_CFG_SCALE", CFG_SCALE_RANGE) {
            generation.cfg_scale = cfg_scale;
        }
        if let Some(steps) = env_in_range("INBETWEEN_STEPS", STEPS_RANGE) {
            generation.sampling_steps = steps;
        }
        if let Some(stride) = env_in_range("INBETWEEN_FRAME_STRIDE", FRAME_STRIDE_RANGE) {
            generation.frame_stride = stride;
        }
        if let Some(width) = env_in_range("INBETWEEN_WIDTH", DIMENSION_RANGE) {
            generation.width = width;
        }
        if let Some(height) = env_in_range("INBETWEEN_HEIGHT", DIMENSION_RANGE) {
            generation.height = height;
        }

        config
    }

    /// Returns the endpoint selected by `use_hosted_model`.
    pub fn endpoint(&self) -> EndpointConfig {
        if self.use_hosted_model {
            EndpointConfig::Hosted {
                api_key: self.api_key.clone(),
            }
        } else {
            EndpointConfig::Local {
                base_address: self.local_address.clone(),
            }
        }
    }

    /// Returns the effective output directory, using platform defaults if not specified.
    pub fn effective_output_dir(&self) -> PathBuf {
        if let Some(ref path) = self.output_dir {
            path.clone()
        } else {
            default_output_dir()
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.use_hosted_model {
            if self.api_key.trim().is_empty() {
                return Some("hosted model requires an API key (INBETWEEN_API_KEY)".to_string());
            }
        } else if !(self.local_address.starts_with("http://")
            || self.local_address.starts_with("https://"))
        {
            return Some(format!(
                "local address must be an http(s) URL, got {:?}",
                self.local_address
            ));
        }

        None
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_in_range<T>(name: &str, range: std::ops::RangeInclusive<T>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let value = std::env::var(name).ok()?.trim().parse::<T>().ok()?;
    range.contains(&value).then_some(value)
}

/// Returns the platform-specific default output path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Application Support/inbetween/frames
/// - Linux: ~/.local/share/inbetween/frames
/// - Windows: C:\Users\<user>\AppData\Roaming\inbetween\data\frames
fn default_output_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "inbetween") {
        proj_dirs.data_dir().join("frames")
    } else {
        // Fallback to current directory
        PathBuf::from("./inbetweens")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_panel_settings() {
        let config = InbetweenConfig::new();
        assert!(config.use_hosted_model);
        assert_eq!(config.local_address, "http://127.0.0.1:8188");
        assert_eq!(config.generation.start_frame, 1);
        assert_eq!(config.generation.end_frame, 10);
        assert_eq!(config.generation.eta, 1.0);
        assert_eq!(config.generation.cfg_scale, 7.5);
        assert_eq!(config.generation.sampling_steps, 50);
        assert_eq!(config.generation.frame_stride, 10);
        assert_eq!(config.generation.width, 512);
        assert_eq!(config.generation.height, 320);
    }

    #[test]
    fn endpoint_follows_hosted_flag() {
        let mut config = InbetweenConfig::new();
        config.api_key = "secret".to_string();
        assert_eq!(
            config.endpoint(),
            EndpointConfig::Hosted {
                api_key: "secret".to_string()
            }
        );

        config.use_hosted_model = false;
        let endpoint = config.endpoint();
        assert_eq!(endpoint.api_key(), None);
        assert_eq!(endpoint.url(), "http://127.0.0.1:8188/frame-inbetween");
    }

    #[test]
    fn local_url_trims_trailing_slash() {
        let endpoint = EndpointConfig::Local {
            base_address: "http://10.0.0.2:8080/".to_string(),
        };
        assert_eq!(endpoint.url(), "http://10.0.0.2:8080/frame-inbetween");
    }

    #[test]
    fn hosted_url_is_fixed() {
        let endpoint = EndpointConfig::Hosted {
            api_key: "k".to_string(),
        };
        assert_eq!(endpoint.url(), HOSTED_URL);
        assert_eq!(endpoint.api_key(), Some("k"));
    }

    #[test]
    fn config_validation() {
        let mut config = InbetweenConfig::new();
        assert!(config.validate().is_some(), "hosted without key must fail");

        config.api_key = "key".to_string();
        assert!(config.validate().is_none());

        config.use_hosted_model = false;
        config.local_address = "127.0.0.1:8188".to_string();
        assert!(config.validate().is_some());

        config.local_address = "http://127.0.0.1:8188".to_string();
        assert!(config.validate().is_none());
    }

    #[test]
    fn env_values_outside_request_bounds_are_ignored() {
        std::env::set_var("INBETWEEN_TEST_STEPS_LOW", "0");
        std::env::set_var("INBETWEEN_TEST_STEPS_OK", "60");
        std::env::set_var("INBETWEEN_TEST_WIDTH_HIGH", "5001");
        assert_eq!(env_in_range("INBETWEEN_TEST_STEPS_LOW", STEPS_RANGE), None);
        assert_eq!(env_in_range("INBETWEEN_TEST_STEPS_OK", STEPS_RANGE), Some(60));
        assert_eq!(env_in_range("INBETWEEN_TEST_WIDTH_HIGH", DIMENSION_RANGE), None);
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn effective_output_dir_is_valid() {
        let config = InbetweenConfig::new();
        assert!(!config.effective_output_dir().as_os_str().is_empty());

        let config = InbetweenConfig {
            output_dir: Some(PathBuf::from("/tmp/frames")),
            ..InbetweenConfig::default()
        };
        assert_eq!(config.effective_output_dir(), PathBuf::from("/tmp/frames"));
    }
}
