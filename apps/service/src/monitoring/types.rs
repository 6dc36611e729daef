use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::validation::ValidationError;

/// Lower bound for every monitor cadence, in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 10_000;

/// Upper bound for every monitor cadence: 30 days.
pub const MAX_INTERVAL_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Cadence actually used for a requested interval.
pub fn effective_interval_ms(requested_ms: u64) -> u64 {
    requested_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

/// HTTP method used by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            _ => Err(ValidationError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Ordered key/value parameters sent with a probe.
///
/// Serialized as a JSON object; insertion order survives a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair, keeping duplicates like a form would.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` rendering of the pairs.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new()).extend_pairs(self.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Serialize for FormParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for FormParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FormParamsVisitor;

        impl<'de> Visitor<'de> for FormParamsVisitor {
            type Value = FormParams;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    pairs.push((key, value));
                }
                Ok(FormParams(pairs))
            }
        }

        deserializer.deserialize_map(FormParamsVisitor)
    }
}

/// A configured recurring HTTP health check, as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "url")]
    pub target_url: String,
    #[serde(rename = "method")]
    pub http_method: HttpMethod,
    pub interval_ms: u64,
    #[serde(rename = "formData", default)]
    pub parameters: FormParams,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonitorDefinition {
    /// Create an enabled monitor with a fresh id
    pub fn new(
        name: impl Into<String>,
        target_url: impl Into<String>,
        http_method: HttpMethod,
        interval_ms: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            target_url: target_url.into(),
            http_method,
            interval_ms,
            parameters: FormParams::new(),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parameters(mut self, parameters: FormParams) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn effective_interval_ms(&self) -> u64 {
        effective_interval_ms(self.interval_ms)
    }

    pub fn effective_interval(&self) -> Duration {
        Duration::from_millis(self.effective_interval_ms())
    }

    /// Whether both definitions probe the same target on the same cadence;
    /// names and timestamps are ignored.
    pub fn same_schedule(&self, other: &Self) -> bool {
        self.id == other.id
            && self.target_url == other.target_url
            && self.http_method == other.http_method
            && self.interval_ms == other.interval_ms
            && self.parameters == other.parameters
            && self.enabled == other.enabled
    }
}

/// Outcome of a single probe. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    #[serde(rename = "configId")]
    pub monitor_id: String,

    /// Wall clock at dispatch
    pub started_at: DateTime<Utc>,

    pub duration_ms: u64,

    #[serde(rename = "status")]
    pub http_status: Option<u16>,

    pub ok: bool,

    #[serde(rename = "error")]
    pub error_message: Option<String>,
}

impl RunRecord {
    /// Start a record for a probe dispatched at `started_at`
    pub fn new(monitor_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            monitor_id: monitor_id.into(),
            started_at,
            duration_ms: 0,
            http_status: None,
            ok: false,
            error_message: None,
        }
    }

    /// The HTTP exchange completed; only 2xx counts as ok
    pub fn completed(mut self, duration_ms: u64, status: u16) -> Self {
        self.duration_ms = duration_ms;
        self.http_status = Some(status);
        self.ok = (200..300).contains(&status);
        self.error_message = None;
        self
    }

    /// The request never produced a response
    pub fn failed(mut self, duration_ms: u64, error: impl Into<String>) -> Self {
        self.duration_ms = duration_ms;
        self.http_status = None;
        self.ok = false;
        self.error_message = Some(error.into());
        self
    }
}

/// Scheduling times reported for a registered monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: DateTime<Utc>,
}

impl TaskStatus {
    /// Whether the monitor should run at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run_at <= now
    }
}
