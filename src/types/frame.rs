//! Frames returned by the inference service.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{InbetweenError, Result};

/// Image container detected from a decoded frame's magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Unknown,
}

impl ImageFormat {
    /// Sniffs the format from the leading bytes of an image.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            ImageFormat::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            ImageFormat::Webp
        } else {
            ImageFormat::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
            ImageFormat::Unknown => "unknown",
        }
    }
}

/// One generated frame, still in its transport (base64) encoding.
///
/// Decoding is deferred to insertion so that a single corrupt frame halts
/// the batch at its own index instead of discarding the whole response.
/// The container format is not carried here; it is sniffed from the decoded
/// bytes with [`ImageFormat::detect`] and recorded on the inserted frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameAsset {
    pub encoded: String,
}

impl FrameAsset {
    /// Wraps an already base64-encoded frame.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self {
            encoded: encoded.into(),
        }
    }

    /// Encodes raw image bytes for transport.
    pub fn from_image_bytes(bytes: &[u8]) -> Self {
        Self {
            encoded: STANDARD.encode(bytes),
        }
    }

    /// Decodes the frame to raw image bytes.
    ///
    /// Whitespace anywhere in the payload is ignored, so MIME-wrapped
    /// base64 (a line break every 76 characters) decodes too.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let compact: String = self
            .encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD
            .decode(compact)
            .map_err(InbetweenError::decode_failed)
    }
}

/// A successful inference response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Generated frames in timeline order.
    pub frames: Vec<FrameAsset>,
    /// Authoritative width; may differ from the request.
    pub width: u32,
    /// Authoritative height; may differ from the request.
    pub height: u32,
}

impl JobResult {
    /// Returns the number of frames in the response.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if the service returned no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
