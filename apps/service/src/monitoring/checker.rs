use anyhow::Result;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use std::error::Error as StdError;
use std::time::{Duration, Instant};

use super::types::{FormParams, HttpMethod, MonitorDefinition, RunRecord};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Executes a single probe for a monitor.
///
/// Implementations never fail: transport problems become a failed
/// [`RunRecord`]. They never retry either.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn run(&self, monitor: &MonitorDefinition) -> RunRecord;
}

/// HTTP/HTTPS probe backed by a shared reqwest client
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout_seconds: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    fn build_request(&self, monitor: &MonitorDefinition) -> reqwest::RequestBuilder {
        match monitor.http_method {
            HttpMethod::Get => self.client.get(with_query(&monitor.target_url, &monitor.parameters)),
            HttpMethod::Post => self
                .client
                .post(&monitor.target_url)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(monitor.parameters.encode()),
        }
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn run(&self, monitor: &MonitorDefinition) -> RunRecord {
        let request = self.build_request(monitor);
        let record = RunRecord::new(monitor.id.clone(), Utc::now());
        let start = Instant::now();

        let outcome = request.send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(response) => record.completed(duration_ms, response.status().as_u16()),
            Err(e) => record.failed(duration_ms, describe_error(&e)),
        }
    }
}

/// Append form parameters to a GET target, respecting an existing query string
pub fn with_query(target_url: &str, parameters: &FormParams) -> String {
    if parameters.is_empty() {
        return target_url.to_string();
    }

    let separator = if target_url.contains('?') { '&' } else { '?' };
    format!("{target_url}{separator}{}", parameters.encode())
}

/// Flatten an error and its sources into one line
fn describe_error(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }

    if message.trim().is_empty() { "network error".to_string() } else { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::testing::{refused_url, serve_once};

    fn probe() -> HttpProbe {
        HttpProbe::new(5, "pingkeeper-test").unwrap()
    }

    #[test]
    fn test_with_query_separator() {
        let params: FormParams = [("a", "1"), ("b", "x y")].into_iter().collect();
        assert_eq!(with_query("https://x/ping", &params), "https://x/ping?a=1&b=x+y");
        assert_eq!(with_query("https://x/ping?k=v", &params), "https://x/ping?k=v&a=1&b=x+y");
        assert_eq!(with_query("https://x/ping", &FormParams::new()), "https://x/ping");
    }

    #[tokio::test]
    async fn test_get_probe_success() {
        let (base, server) = serve_once("200 OK").await;
        let monitor = MonitorDefinition::new("m1", format!("{base}/ping"), HttpMethod::Get, 10_000)
            .with_parameters([("token", "abc")].into_iter().collect());

        let record = probe().run(&monitor).await;
        let request = server.await.unwrap();

        assert!(record.ok);
        assert_eq!(record.http_status, Some(200));
        assert_eq!(record.error_message, None);
        assert_eq!(record.monitor_id, monitor.id);
        assert!(request.head.starts_with("GET /ping?token=abc HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_post_probe_sends_form_body() {
        let (base, server) = serve_once("201 Created").await;
        let monitor = MonitorDefinition::new("m2", format!("{base}/submit"), HttpMethod::Post, 10_000)
            .with_parameters([("user", "a b"), ("mode", "check")].into_iter().collect());

        let record = probe().run(&monitor).await;
        let request = server.await.unwrap();

        assert!(record.ok);
        assert_eq!(record.http_status, Some(201));
        assert!(request.head.starts_with("POST /submit HTTP/1.1"));
        assert!(request.head.to_ascii_lowercase().contains("content-type: application/x-www-form-urlencoded"));
        assert_eq!(request.body, "user=a+b&mode=check");
    }

    #[tokio::test]
    async fn test_non_2xx_is_not_ok() {
        let (base, server) = serve_once("503 Service Unavailable").await;
        let monitor = MonitorDefinition::new("m3", base, HttpMethod::Get, 10_000);

        let record = probe().run(&monitor).await;
        server.await.unwrap();

        assert!(!record.ok);
        assert_eq!(record.http_status, Some(503));
        assert_eq!(record.error_message, None);
    }

    #[tokio::test]
    async fn test_connection_refused_is_failed_record() {
        let monitor = MonitorDefinition::new("m4", refused_url().await, HttpMethod::Get, 10_000);

        let record = probe().run(&monitor).await;

        assert!(!record.ok);
        assert_eq!(record.http_status, None);
        assert!(record.error_message.as_deref().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_malformed_url_is_failed_record() {
        let monitor = MonitorDefinition::new("m5", "not a url", HttpMethod::Get, 10_000);

        let record = probe().run(&monitor).await;

        assert!(!record.ok);
        assert!(record.error_message.is_some());
    }
}
