//! Shared `ureq` plumbing: agent construction, error mapping and URL joins.

use std::io::Read;
use std::time::Duration;

use docsync_core::RemoteError;
use ureq::{Agent, AgentBuilder, Request, Response};

/// Build the agent every HTTP collaborator shares. `timeout` bounds the whole
/// request, connect included.
pub fn agent(user_agent: &str, timeout: Duration) -> Agent {
    AgentBuilder::new()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

pub(crate) fn remote_err(url: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, _) => RemoteError::Status {
            url: url.to_string(),
            status,
        },
        ureq::Error::Transport(transport) => RemoteError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

/// Read a response body, refusing anything larger than `limit` bytes.
pub(crate) fn read_body(url: &str, response: Response, limit: u64) -> Result<Vec<u8>, RemoteError> {
    let mut body = Vec::new();
    response
        .into_reader()
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|e| RemoteError::Transport {
            url: url.to_string(),
            message: format!("reading body: {e}"),
        })?;
    if body.len() as u64 > limit {
        return Err(RemoteError::Payload {
            source_name: url.to_string(),
            message: format!("body exceeds {limit} bytes"),
        });
    }
    Ok(body)
}

pub(crate) fn with_token(request: Request, token: Option<&str>) -> Request {
    match token {
        Some(token) => request.set("Authorization", &format!("Bearer {token}")),
        None => request,
    }
}

/// `base` + `/` + `segment`, percent-encoding the segment.
pub(crate) fn join(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), encode_segment(segment))
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
