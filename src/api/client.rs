//! HTTP client for the frame-inbetween inference service.
//!
//! Posts the two endpoint frames plus the generation parameters as a
//! multipart form and parses the multi-frame response.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use tracing::{debug, info, warn};

use crate::config::{EndpointConfig, HOSTED_URL};
use crate::error::{ErrorCode, InbetweenError, Result};
use crate::types::{JobRequest, JobResult};

use super::response::parse_response;

/// Fixed request timeout. Inference backends can take many minutes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(1000);

/// Header carrying the hosted model's API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Anything that can turn two endpoint frames into generated frames.
///
/// [`InferenceClient`] is the production implementation; closures with the
/// same signature implement it too.
pub trait Submitter: Send + 'static {
    fn submit(&self, image1: &[u8], image2: &[u8], request: &JobRequest) -> Result<JobResult>;
}

impl<F> Submitter for F
where
    F: Fn(&[u8], &[u8], &JobRequest) -> Result<JobResult> + Send + 'static,
{
    fn submit(&self, image1: &[u8], image2: &[u8], request: &JobRequest) -> Result<JobResult> {
        self(image1, image2, request)
    }
}

/// Blocking client for the inference service.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::blocking::Client,
    hosted_url: String,
}

impl InferenceClient {
    /// Creates a client with the fixed [`REQUEST_TIMEOUT`].
    pub fn new() -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                InbetweenError::with_source(
                    ErrorCode::ApiUnreachable,
                    format!("Failed to create HTTP client: {}", e),
                    e,
                )
            })?;

        Ok(Self {
            http,
            hosted_url: HOSTED_URL.to_string(),
        })
    }

    /// Points the hosted endpoint at a different URL (staging, tests).
    pub fn with_hosted_url(mut self, url: impl Into<String>) -> Self {
        self.hosted_url = url.into();
        self
    }

    /// Returns the URL a request for `endpoint` is posted to.
    pub fn endpoint_url(&self, endpoint: &EndpointConfig) -> String {
        match endpoint {
            EndpointConfig::Hosted { .. } => self.hosted_url.clone(),
            EndpointConfig::Local { .. } => endpoint.url(),
        }
    }

    /// Sends both endpoint frames and waits for the generated frames.
    ///
    /// Blocks for up to [`REQUEST_TIMEOUT`]. The API key header is only sent
    /// to the hosted endpoint. Non-200 responses fail with `API_STATUS` and
    /// their body is never read.
    pub fn submit(&self, image1: &[u8], image2: &[u8], request: &JobRequest) -> Result<JobResult> {
        let url = self.endpoint_url(&request.endpoint);
        info!(
            endpoint = request.endpoint.label(),
            url = %url,
            start_frame = request.start_frame,
            end_frame = request.end_frame,
            "Submitting in-between request"
        );

        let form = build_form(image1, image2, request)?;
        let mut builder = self.http.post(&url).multipart(form);
        if let Some(key) = request.endpoint.api_key() {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder
            .send()
            .map_err(|e| InbetweenError::api_unreachable(&url, e))?;

        let status = response.status().as_u16();
        if status != 200 {
            warn!(status, "Inference service returned an error status");
            return Err(InbetweenError::api_status(status));
        }

        let body = response.bytes().map_err(|e| {
            InbetweenError::with_source(
                ErrorCode::ApiMalformed,
                format!("Failed to read response body: {}", e),
                e,
            )
        })?;
        debug!(bytes = body.len(), "Received inference response");

        parse_response(status, &body)
    }
}

impl Submitter for InferenceClient {
    fn submit(&self, image1: &[u8], image2: &[u8], request: &JobRequest) -> Result<JobResult> {
        InferenceClient::submit(self, image1, image2, request)
    }
}

/// Builds the multipart form: two PNG parts and the scalar parameters.
fn build_form(image1: &[u8], image2: &[u8], request: &JobRequest) -> Result<Form> {
    let form = Form::new()
        .part("image1", png_part("image1.png", image1)?)
        .part("image2", png_part("image2.png", image2)?)
        .text("prompt", request.prompt.clone())
        .text("eta", request.eta.to_string())
        .text("cfg_scale", request.cfg_scale.to_string())
        .text("steps", request.sampling_steps.to_string())
        .text("width", request.width.to_string())
        .text("height", request.height.to_string())
        .text("frame_stride", request.frame_stride.to_string());
    Ok(form)
}

fn png_part(file_name: &'static str, bytes: &[u8]) -> Result<Part> {
    Part::bytes(bytes.to_vec())
        .file_name(file_name)
        .mime_str("image/png")
        .map_err(|e| {
            InbetweenError::with_source(
                ErrorCode::InvalidRequest,
                format!("Failed to build {} part: {}", file_name, e),
                e,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::path::PathBuf;
    use std::thread::{self, JoinHandle};

    struct CapturedRequest {
        head: String,
        body: Vec<u8>,
    }

    /// Serves exactly one HTTP response on a loopback port.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let captured = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            captured
        });

        (address, handle)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn read_request(stream: &mut TcpStream) -> CapturedRequest {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];

        let header_end = loop {
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            });

        match content_length {
            Some(len) => {
                while buf.len() < header_end + len {
                    let n = stream.read(&mut chunk).unwrap();
                    assert!(n > 0, "connection closed mid-body");
                    buf.extend_from_slice(&chunk[..n]);
                }
                buf.truncate(header_end + len);
            }
            None => {
                // Chunked upload: read until the terminating chunk.
                while !buf.ends_with(b"0\r\n\r\n") {
                    let n = stream.read(&mut chunk).unwrap();
                    assert!(n > 0, "connection closed mid-body");
                    buf.extend_from_slice(&chunk[..n]);
                }
            }
        }

        CapturedRequest {
            head,
            body: buf[header_end..].to_vec(),
        }
    }

    fn request(endpoint: EndpointConfig) -> JobRequest {
        JobRequest {
            start_frame: 1,
            end_frame: 10,
            prompt: "a ball bouncing".to_string(),
            eta: 1.0,
            cfg_scale: 7.5,
            sampling_steps: 50,
            frame_stride: 10,
            width: 512,
            height: 320,
            endpoint,
            output_dir: PathBuf::from("/tmp"),
        }
    }

    fn has_field(body: &str, name: &str, value: &str) -> bool {
        let marker = format!("name=\"{}\"", name);
        body.split(marker.as_str())
            .nth(1)
            .map(|rest| rest.split("\r\n\r\n").nth(1).unwrap_or("").starts_with(value))
            .unwrap_or(false)
    }

    #[test]
    fn local_submit_sends_form_without_api_key() {
        let (address, server) = serve_once(
            "200 OK",
            r#"{"frames":["YQ==","Yg=="],"width":256,"height":128}"#,
        );
        let client = InferenceClient::new().unwrap();
        let request = request(EndpointConfig::Local {
            base_address: address,
        });

        let result = client.submit(b"start-image", b"end-image", &request).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!((result.width, result.height), (256, 128));

        let captured = server.join().unwrap();
        assert!(captured.head.starts_with("POST /frame-inbetween "));
        assert!(!captured.head.to_lowercase().contains("x-api-key"));
        assert!(captured.head.to_lowercase().contains("multipart/form-data"));

        let body = String::from_utf8_lossy(&captured.body);
        assert!(body.contains("filename=\"image1.png\""));
        assert!(body.contains("filename=\"image2.png\""));
        assert!(body.contains("start-image"));
        assert!(body.contains("end-image"));
        assert!(has_field(&body, "prompt", "a ball bouncing"));
        assert!(has_field(&body, "cfg_scale", "7.5"));
        assert!(has_field(&body, "steps", "50"));
        assert!(has_field(&body, "width", "512"));
        assert!(has_field(&body, "height", "320"));
        assert!(has_field(&body, "frame_stride", "10"));
        assert!(has_field(&body, "eta", "1"));
    }

    #[test]
    fn hosted_submit_sends_api_key() {
        let (address, server) = serve_once(
            "200 OK",
            r#"{"frames":[],"width":512,"height":320}"#,
        );
        let client = InferenceClient::new()
            .unwrap()
            .with_hosted_url(format!("{}/frame-inbetween", address));
        let request = request(EndpointConfig::Hosted {
            api_key: "secret-key".to_string(),
        });

        client.submit(b"a", b"b", &request).unwrap();

        let captured = server.join().unwrap();
        let head = captured.head.to_lowercase();
        assert!(head.contains("x-api-key: secret-key"));
    }

    #[test]
    fn error_status_is_reported_without_parsing() {
        let (address, server) = serve_once("500 Internal Server Error", "not json at all");
        let client = InferenceClient::new().unwrap();
        let request = request(EndpointConfig::Local {
            base_address: address,
        });

        let err = client.submit(b"a", b"b", &request).unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiStatus);
        assert_eq!(err.status_code, Some(500));
        server.join().unwrap();
    }

    #[test]
    fn unreachable_server_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = InferenceClient::new().unwrap();
        let request = request(EndpointConfig::Local {
            base_address: address,
        });

        let err = client.submit(b"a", b"b", &request).unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiUnreachable);
    }

    #[test]
    fn endpoint_url_uses_hosted_override() {
        let client = InferenceClient::new().unwrap();
        let hosted = EndpointConfig::Hosted {
            api_key: "k".to_string(),
        };
        assert_eq!(client.endpoint_url(&hosted), HOSTED_URL);

        let client = client.with_hosted_url("http://staging/frame-inbetween");
        assert_eq!(client.endpoint_url(&hosted), "http://staging/frame-inbetween");
    }

    #[test]
    fn closures_are_submitters() {
        fn takes_submitter<S: Submitter>(s: S) -> Result<JobResult> {
            s.submit(b"a", b"b", &request(EndpointConfig::Local {
                base_address: "http://localhost".to_string(),
            }))
        }

        let result = takes_submitter(|_: &[u8], _: &[u8], req: &JobRequest| -> Result<JobResult> {
            Ok(JobResult {
                frames: Vec::new(),
                width: req.width,
                height: req.height,
            })
        })
        .unwrap();
        assert_eq!(result.width, 512);
    }
}
