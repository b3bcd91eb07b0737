//! Optional HAR-format recording of outbound HTTP traffic, toggled per-process
//! by [`set_recording_dir`]. Used by [`crate::client::HttpManager`] to capture
//! request/response pairs for later inspection or replay in tests.

use anyhow::Result;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

struct RecordingState {
    session_dir: PathBuf,
    entries: Vec<JsonValue>,
}

static RECORDING_STATE: Lazy<Mutex<Option<RecordingState>>> = Lazy::new(|| Mutex::new(None));

/// Start a recording session, writing a HAR file under `session_dir` on
/// [`finalize_recording`].
pub fn set_recording_dir(session_dir: PathBuf) -> Result<()> {
    debug!("setting recording directory: {:?}", session_dir);

    let mut state = RECORDING_STATE.lock().unwrap();
    *state = Some(RecordingState {
        session_dir,
        entries: Vec::new(),
    });

    Ok(())
}

/// Append one request/response pair to the active recording, if any.
#[allow(clippy::too_many_arguments)]
pub fn record_http_request(
    url: &str,
    method: &str,
    request_headers: Option<&HashMap<String, String>>,
    request_body: Option<&str>,
    response_status: u16,
    response_headers: Option<&HashMap<String, String>>,
    response_body: &str,
    started_at: DateTime<Utc>,
    duration_ms: u64,
) -> Result<()> {
    let mut state = RECORDING_STATE.lock().unwrap();

    if let Some(recording_state) = state.as_mut() {
        debug!("recording HTTP request: {} {}", method, url);

        let req_headers: Vec<JsonValue> = request_headers
            .map(|headers| {
                headers
                    .iter()
                    .map(|(name, value)| json!({"name": name, "value": value, "comment": ""}))
                    .collect()
            })
            .unwrap_or_default();

        let resp_headers: Vec<JsonValue> = response_headers
            .map(|headers| {
                headers
                    .iter()
                    .map(|(name, value)| json!({"name": name, "value": value, "comment": ""}))
                    .collect()
            })
            .unwrap_or_default();

        let entry = json!({
            "startedDateTime": started_at.to_rfc3339(),
            "time": duration_ms,
            "request": {
                "method": method,
                "url": url,
                "httpVersion": "HTTP/1.1",
                "cookies": [],
                "headers": req_headers,
                "queryString": [],
                "postData": request_body.map(|body| json!({
                    "mimeType": "application/x-www-form-urlencoded",
                    "text": body,
                    "params": []
                })),
                "headersSize": -1,
                "bodySize": request_body.map_or(0, |b| b.len())
            },
            "response": {
                "status": response_status,
                "statusText": match response_status {
                    200 => "OK",
                    400 => "Bad Request",
                    401 => "Unauthorized",
                    404 => "Not Found",
                    500 => "Internal Server Error",
                    _ => "Unknown",
                },
                "httpVersion": "HTTP/1.1",
                "cookies": [],
                "headers": resp_headers,
                "content": {
                    "size": response_body.len(),
                    "mimeType": "application/json",
                    "text": response_body,
                    "compression": 0
                },
                "redirectURL": "",
                "headersSize": -1,
                "bodySize": response_body.len()
            },
            "cache": {},
            "timings": {
                "blocked": 0,
                "dns": 0,
                "connect": 0,
                "send": 0,
                "wait": duration_ms,
                "receive": 0,
                "ssl": -1
            },
            "serverIPAddress": "",
            "connection": "",
            "comment": ""
        });

        recording_state.entries.push(entry);
        info!("recorded HTTP request {} {} -> {}", method, url, response_status);
    }

    Ok(())
}

/// Flush the active recording to `requests.har` and clear session state.
pub fn finalize_recording() -> Result<()> {
    let mut state = RECORDING_STATE.lock().unwrap();

    if let Some(recording_state) = state.take() {
        debug!("finalizing recording with {} entries", recording_state.entries.len());

        let har = json!({
            "log": {
                "version": "1.2",
                "creator": {"name": "conduit", "version": env!("CARGO_PKG_VERSION"), "comment": ""},
                "browser": {"name": "conduit", "version": env!("CARGO_PKG_VERSION"), "comment": ""},
                "pages": [],
                "entries": recording_state.entries,
                "comment": ""
            }
        });

        let har_file = recording_state.session_dir.join("requests.har");
        let har_json = serde_json::to_string_pretty(&har)?;
        fs::write(&har_file, har_json)?;

        info!("saved HAR file: {:?}", har_file);
    }

    Ok(())
}

/// Whether a recording session is currently active.
pub fn is_recording() -> bool {
    RECORDING_STATE.lock().unwrap().is_some()
}

/// The directory of the active recording session, if any.
pub fn get_recording_dir() -> Option<PathBuf> {
    RECORDING_STATE.lock().unwrap().as_ref().map(|s| s.session_dir.clone())
}

/// Record the decoded call-time input for the active recording session.
pub fn record_input(input_json: &JsonValue) -> Result<()> {
    let state = RECORDING_STATE.lock().unwrap();

    if let Some(recording_state) = state.as_ref() {
        let input_file = recording_state.session_dir.join("input.json");
        fs::write(&input_file, serde_json::to_string_pretty(input_json)?)?;
        info!("saved input JSON: {:?}", input_file);
    }

    Ok(())
}

/// Record the decoded call-time output for the active recording session.
pub fn record_output(output_json: &JsonValue) -> Result<()> {
    let state = RECORDING_STATE.lock().unwrap();

    if let Some(recording_state) = state.as_ref() {
        let output_file = recording_state.session_dir.join("output.json");
        fs::write(&output_file, serde_json::to_string_pretty(output_json)?)?;
        info!("saved output JSON: {:?}", output_file);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_recording());

        set_recording_dir(dir.path().to_path_buf()).unwrap();
        assert!(is_recording());
        assert_eq!(get_recording_dir(), Some(dir.path().to_path_buf()));

        record_http_request(
            "https://example.com/widgets",
            "GET",
            None,
            None,
            200,
            None,
            "{}",
            Utc::now(),
            12,
        )
        .unwrap();

        finalize_recording().unwrap();
        assert!(!is_recording());
        assert!(dir.path().join("requests.har").exists());
    }
}
