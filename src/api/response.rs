//! Parsing of frame-inbetween responses.

use serde::Deserialize;

use crate::error::{InbetweenError, Result};
use crate::types::{FrameAsset, JobResult};

/// Wire shape of a successful response.
#[derive(Debug, Deserialize)]
struct WireResponse {
    frames: Vec<String>,
    width: u32,
    height: u32,
}

/// Turns an HTTP status and body into a [`JobResult`].
///
/// Any status other than 200 fails with `API_STATUS` without looking at the
/// body. A 200 body must be a JSON object with `frames` (strings), `width`
/// and `height`; anything else fails with `API_MALFORMED`.
pub fn parse_response(status: u16, body: &[u8]) -> Result<JobResult> {
    if status != 200 {
        return Err(InbetweenError::api_status(status));
    }

    let wire: WireResponse = serde_json::from_slice(body)
        .map_err(|e| InbetweenError::api_malformed(e.to_string()))?;

    if wire.width == 0 || wire.height == 0 {
        return Err(InbetweenError::api_malformed(format!(
            "invalid resolution {}x{}",
            wire.width, wire.height
        )));
    }

    Ok(JobResult {
        frames: wire.frames.into_iter().map(FrameAsset::from_encoded).collect(),
        width: wire.width,
        height: wire.height,
    })
}
