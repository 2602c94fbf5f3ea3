//! HTTP probe client.
//!
//! One request per check, bounded by a timeout, never retried. A transport
//! failure is captured in the response rather than returned as an error so
//! the executor can classify it.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::GateError;

/// Request methods a probe may use. The gate only observes, so nothing that
/// mutates server state is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl ProbeRequest {
    pub fn get(url: &str, timeout: Duration) -> Self {
        ProbeRequest {
            url: url.to_string(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// No connection could be established
    Unreachable,
    /// The request did not complete within its timeout
    Timeout,
    /// The request could not be built or the body could not be read
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

/// Everything a probe observed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeResponse {
    /// `None` when no response arrived at all.
    pub status: Option<u16>,
    pub body: String,
    pub transport_error: Option<TransportError>,
}

impl ProbeResponse {
    pub fn ok(status: u16, body: &str) -> Self {
        ProbeResponse {
            status: Some(status),
            body: body.to_string(),
            transport_error: None,
        }
    }

    pub fn failed(kind: TransportErrorKind, message: &str) -> Self {
        ProbeResponse {
            status: None,
            body: String::new(),
            transport_error: Some(TransportError {
                kind,
                message: message.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

/// Issues single bounded requests.
pub trait ProbeClient: Send + Sync {
    fn probe(&self, request: &ProbeRequest) -> ProbeResponse;
}

/// Real client built on a blocking reqwest client.
pub struct HttpProbeClient {
    client: reqwest::blocking::Client,
}

impl HttpProbeClient {
    pub fn new() -> Result<Self, GateError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("verigate/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(GateError::HttpClient)?;
        Ok(HttpProbeClient { client })
    }
}

fn classify(err: &reqwest::Error) -> TransportErrorKind {
    transport_kind(
        err.is_connect(),
        err.is_timeout(),
        err.is_builder() || err.is_body() || err.is_decode(),
    )
}

/// A connection that was never established is unreachable, even when the
/// connect phase ran out of time.
fn transport_kind(connect: bool, timeout: bool, protocol: bool) -> TransportErrorKind {
    if connect {
        TransportErrorKind::Unreachable
    } else if timeout {
        TransportErrorKind::Timeout
    } else if protocol {
        TransportErrorKind::Protocol
    } else {
        TransportErrorKind::Unreachable
    }
}

impl ProbeClient for HttpProbeClient {
    fn probe(&self, request: &ProbeRequest) -> ProbeResponse {
        let mut builder = self
            .client
            .request(request.method.to_reqwest(), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!(method = %request.method, url = %request.url, "probing");

        let response = match builder.send() {
            Ok(response) => response,
            Err(e) => {
                let kind = classify(&e);
                tracing::debug!(url = %request.url, ?kind, error = %e, "probe failed");
                return ProbeResponse::failed(kind, &e.to_string());
            }
        };

        let status = response.status().as_u16();
        match response.text() {
            Ok(body) => ProbeResponse {
                status: Some(status),
                body,
                transport_error: None,
            },
            Err(e) => ProbeResponse {
                status: Some(status),
                body: String::new(),
                transport_error: Some(TransportError {
                    kind: if e.is_timeout() {
                        TransportErrorKind::Timeout
                    } else {
                        TransportErrorKind::Protocol
                    },
                    message: format!("body could not be read: {}", e),
                }),
            },
        }
    }
}
