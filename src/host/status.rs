//! Typed views of the host's loosely-typed status objects.
//!
//! Every parser here fails closed: a value that is not an object, or a field
//! that is missing or has the wrong type, yields a non-terminal reading
//! rather than an error.

use serde::Deserialize;
use serde_json::Value;

/// Canonical request states reported by `checkRequestStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Pending,
    HeadersReceived,
    Processing,
    PartialResult,
    Completed,
    Error,
    NotFound,
    /// Missing or unrecognised status; treated as still in flight.
    Unknown,
}

impl StatusKind {
    /// Normalise a raw host status. Suffixed variants such as
    /// `completed_from_cache` collapse onto their canonical state.
    pub fn normalize(raw: &str) -> Self {
        const PREFIXES: [(&str, StatusKind); 5] = [
            ("headers_received", StatusKind::HeadersReceived),
            ("processing", StatusKind::Processing),
            ("partial_result", StatusKind::PartialResult),
            ("completed", StatusKind::Completed),
            ("error", StatusKind::Error),
        ];
        for (prefix, kind) in PREFIXES {
            if raw.starts_with(prefix) {
                return kind;
            }
        }
        match raw {
            "pending" => StatusKind::Pending,
            "not_found" => StatusKind::NotFound,
            _ => StatusKind::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StatusKind::Completed | StatusKind::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusKind::Pending => "pending",
            StatusKind::HeadersReceived => "headers_received",
            StatusKind::Processing => "processing",
            StatusKind::PartialResult => "partial_result",
            StatusKind::Completed => "completed",
            StatusKind::Error => "error",
            StatusKind::NotFound => "not_found",
            StatusKind::Unknown => "unknown",
        }
    }
}

/// Response header summary attached to a `headers_received` status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderInfo {
    pub status: Option<u16>,
    pub content_length: Option<u64>,
}

impl HeaderInfo {
    fn parse(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let content_length = object
            .get("contentLength")
            .or_else(|| object.get("content-length"))
            .and_then(as_u64);
        let status = object
            .get("status")
            .and_then(as_u64)
            .and_then(|s| u16::try_from(s).ok());
        Some(Self {
            status,
            content_length,
        })
    }
}

/// Accept both JSON numbers and numeric strings; the host forwards raw
/// header values.
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn message_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatus {
    status: Option<String>,
    headers: Option<Value>,
    #[serde(rename = "elapsedMs")]
    elapsed_ms: Option<f64>,
    #[serde(rename = "partialResult")]
    partial_result: Option<Value>,
    result: Option<Value>,
    error: Option<Value>,
}

/// Snapshot of one `checkRequestStatus` answer.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub kind: StatusKind,
    pub headers: Option<HeaderInfo>,
    pub elapsed_ms: Option<f64>,
    pub partial_result: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl StatusSnapshot {
    pub fn unknown() -> Self {
        Self {
            kind: StatusKind::Unknown,
            headers: None,
            elapsed_ms: None,
            partial_result: None,
            result: None,
            error: None,
        }
    }

    pub fn parse(value: &Value) -> Self {
        let raw: RawStatus = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed status object, treating as in flight");
                return Self::unknown();
            }
        };

        Self {
            kind: raw
                .status
                .as_deref()
                .map(StatusKind::normalize)
                .unwrap_or(StatusKind::Unknown),
            headers: raw.headers.as_ref().and_then(HeaderInfo::parse),
            elapsed_ms: raw.elapsed_ms,
            partial_result: raw.partial_result.filter(|v| !v.is_null()),
            result: raw.result.filter(|v| !v.is_null()),
            error: raw.error.filter(|v| !v.is_null()).map(|v| message_of(&v)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFetchStatus {
    completed: Option<bool>,
    success: Option<bool>,
    data: Option<Value>,
    error: Option<Value>,
}

/// Reading of one `checkFetchRequestStatus` answer.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    InFlight,
    Succeeded(Value),
    Failed(String),
}

impl FetchStatus {
    pub fn parse(value: &Value) -> Self {
        let raw: RawFetchStatus = serde_json::from_value(value.clone()).unwrap_or_default();
        match (raw.completed, raw.success) {
            (Some(true), Some(true)) => match raw.data.filter(|v| !v.is_null()) {
                Some(data) => FetchStatus::Succeeded(data),
                None => FetchStatus::InFlight,
            },
            (Some(true), Some(false)) => FetchStatus::Failed(
                raw.error
                    .filter(|v| !v.is_null())
                    .map(|v| message_of(&v))
                    .unwrap_or_else(|| "unknown error".to_string()),
            ),
            _ => FetchStatus::InFlight,
        }
    }
}

/// Reading of one `checkResponseLookup` answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LookupResult {
    pub exists: bool,
    pub partial: bool,
    pub complete: bool,
}

impl LookupResult {
    pub fn parse(value: &Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}
