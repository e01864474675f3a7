//! JobRequest type describing one in-betweening job.
//!
//! A JobRequest is built from the current configuration when a job starts
//! and is never mutated afterwards.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{EndpointConfig, InbetweenConfig};
use crate::error::{InbetweenError, Result};

/// Allowed DDIM eta.
pub const ETA_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Allowed classifier-free guidance scale.
pub const CFG_SCALE_RANGE: RangeInclusive<f32> = 1.0..=15.0;
/// Allowed number of sampling steps.
pub const STEPS_RANGE: RangeInclusive<u32> = 1..=60;
/// Allowed frame stride.
pub const FRAME_STRIDE_RANGE: RangeInclusive<u32> = 1..=30;
/// Allowed start and end frame numbers.
pub const FRAME_RANGE: RangeInclusive<i32> = -1_048_574..=1_048_574;
/// Allowed output width and height in pixels.
pub const DIMENSION_RANGE: RangeInclusive<u32> = 64..=5000;

/// Parameters of a single in-betweening job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// First endpoint frame; returned frames are inserted from here.
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
    /// Frame stride (1-30).
    pub frame_stride: u32,
    /// Requested width in pixels (64-5000).
    pub width: u32,
    /// Requested height in pixels (64-5000).
    pub height: u32,
    /// Where the request is sent.
    pub endpoint: EndpointConfig,
    /// Base directory the per-job output directory is created in.
    pub output_dir: PathBuf,
}

impl JobRequest {
    /// Builds a request from the current configuration and validates it.
    pub fn from_config(config: &InbetweenConfig) -> Result<Self> {
        let generation = &config.generation;
        let request = Self {
            start_frame: generation.start_frame,
            end_frame: generation.end_frame,
            prompt: generation.prompt.clone(),
            eta: generation.eta,
            cfg_scale: generation.cfg_scale,
            sampling_steps: generation.sampling_steps,
            frame_stride: generation.frame_stride,
            width: generation.width,
            height: generation.height,
            endpoint: config.endpoint(),
            output_dir: config.effective_output_dir(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks every bounded field.
    pub fn validate(&self) -> Result<()> {
        check("start_frame", self.start_frame, &FRAME_RANGE)?;
        check("end_frame", self.end_frame, &FRAME_RANGE)?;
        check("eta", self.eta, &ETA_RANGE)?;
        check("cfg_scale", self.cfg_scale, &CFG_SCALE_RANGE)?;
        check("sampling_steps", self.sampling_steps, &STEPS_RANGE)?;
        check("frame_stride", self.frame_stride, &FRAME_STRIDE_RANGE)?;
        check("width", self.width, &DIMENSION_RANGE)?;
        check("height", self.height, &DIMENSION_RANGE)?;
        Ok(())
    }
}

fn check<T>(field: &str, value: T, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(InbetweenError::invalid_request(format!(
            "{} must be between {} and {}, got {}",
            field,
            range.start(),
            range.end(),
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn hosted_config() -> InbetweenConfig {
        InbetweenConfig {
            api_key: "key".to_string(),
            output_dir: Some(PathBuf::from("/tmp/out")),
            ..InbetweenConfig::default()
        }
    }

    #[test]
    fn from_config_copies_generation_defaults() {
        let request = JobRequest::from_config(&hosted_config()).unwrap();
        assert_eq!(request.start_frame, 1);
        assert_eq!(request.end_frame, 10);
        assert_eq!(request.sampling_steps, 50);
        assert_eq!(request.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(request.endpoint.api_key(), Some("key"));
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut request = JobRequest::from_config(&hosted_config()).unwrap();
        request.eta = 0.0;
        request.cfg_scale = 15.0;
        request.sampling_steps = 60;
        request.frame_stride = 1;
        request.width = 64;
        request.height = 5000;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let base = JobRequest::from_config(&hosted_config()).unwrap();

        let cases: Vec<(&str, JobRequest)> = vec![
            ("start_frame", JobRequest { start_frame: i32::MAX, ..base.clone() }),
            ("end_frame", JobRequest { end_frame: i32::MIN, ..base.clone() }),
            ("eta", JobRequest { eta: 1.5, ..base.clone() }),
            ("cfg_scale", JobRequest { cfg_scale: 0.5, ..base.clone() }),
            ("sampling_steps", JobRequest { sampling_steps: 0, ..base.clone() }),
            ("frame_stride", JobRequest { frame_stride: 31, ..base.clone() }),
            ("width", JobRequest { width: 63, ..base.clone() }),
            ("height", JobRequest { height: 5001, ..base.clone() }),
        ];

        for (field, request) in cases {
            let err = request.validate().unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidRequest);
            assert!(err.message.starts_with(field), "{}", err.message);
        }
    }

    #[test]
    fn from_config_rejects_invalid_defaults() {
        let mut config = hosted_config();
        config.generation.width = 10;
        assert!(JobRequest::from_config(&config).is_err());
    }
}
