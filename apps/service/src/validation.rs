//! Boundary checks for monitor input.
//!
//! Drafts coming from the HTTP API are validated here before they can become
//! a [`MonitorDefinition`]; nothing invalid ever reaches the scheduler.

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::monitoring::types::{FormParams, HttpMethod, MAX_INTERVAL_MS, MonitorDefinition};

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("name too long (max 100 characters)")]
    NameTooLong,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("unsupported http method `{0}`, expected GET or POST")]
    UnsupportedMethod(String),
    #[error("interval must be greater than zero")]
    ZeroInterval,
    #[error("interval {0} ms exceeds the 30 day maximum")]
    IntervalTooLarge(u64),
}

/// Validate an HTTP/HTTPS probe target
pub fn validate_http_endpoint(target: &str) -> Result<(), ValidationError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ValidationError::MissingField("url"));
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return Err(ValidationError::InvalidUrl(format!(
                    "scheme '{scheme}' is not http or https"
                )));
            }

            if url.host_str().is_none() {
                return Err(ValidationError::InvalidUrl("url must have a host".to_string()));
            }

            Ok(())
        }
        Err(_) if !target.contains("://") => Err(ValidationError::InvalidUrl(
            "url must include scheme (http:// or https://)".to_string(),
        )),
        Err(e) => Err(ValidationError::InvalidUrl(e.to_string())),
    }
}

/// Validate monitor name
pub fn validate_monitor_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }

    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }

    Ok(())
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

fn parse_target(url: Option<&str>, method: Option<&str>) -> Result<(String, HttpMethod), ValidationError> {
    let url = required(url, "url")?.trim();
    validate_http_endpoint(url)?;
    let method = required(method, "method")?.parse::<HttpMethod>()?;
    Ok((url.to_string(), method))
}

/// Monitor create/update payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDraft {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub interval_ms: Option<u64>,
    pub form_data: Option<FormParams>,
    #[serde(default)]
    pub enabled: bool,
}

impl MonitorDraft {
    /// Validate and turn the draft into a definition.
    ///
    /// `existing` is the stored monitor being updated, if any; its id and
    /// creation time are kept.
    pub fn into_definition(
        self,
        existing: Option<&MonitorDefinition>,
    ) -> Result<MonitorDefinition, ValidationError> {
        let name = required(self.name, "name")?;
        validate_monitor_name(&name)?;
        let (target_url, http_method) = parse_target(self.url.as_deref(), self.method.as_deref())?;
        let interval_ms = required(self.interval_ms, "intervalMs")?;
        if interval_ms == 0 {
            return Err(ValidationError::ZeroInterval);
        }
        if interval_ms > MAX_INTERVAL_MS {
            return Err(ValidationError::IntervalTooLarge(interval_ms));
        }

        let now = Utc::now();
        let (id, created_at) = match existing {
            Some(monitor) => (monitor.id.clone(), monitor.created_at),
            None => (self.id.unwrap_or_else(|| Uuid::new_v4().to_string()), now),
        };

        Ok(MonitorDefinition {
            id,
            name: name.trim().to_string(),
            target_url,
            http_method,
            interval_ms,
            parameters: self.form_data.unwrap_or_default(),
            enabled: self.enabled,
            created_at,
            updated_at: now,
        })
    }
}

/// Ad-hoc probe payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDraft {
    pub url: Option<String>,
    pub method: Option<String>,
    pub form_data: Option<FormParams>,
    pub config_id: Option<String>,
}

impl ProbeDraft {
    /// Build the transient definition a one-off probe runs against.
    ///
    /// The definition is never scheduled, so it carries no cadence.
    pub fn into_definition(self) -> Result<MonitorDefinition, ValidationError> {
        let (target_url, http_method) = parse_target(self.url.as_deref(), self.method.as_deref())?;
        let now = Utc::now();
        Ok(MonitorDefinition {
            id: self.config_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: "ad-hoc probe".to_string(),
            target_url,
            http_method,
            interval_ms: 0,
            parameters: self.form_data.unwrap_or_default(),
            enabled: false,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MonitorDraft {
        MonitorDraft {
            name: Some("Status page".to_string()),
            url: Some("https://example.com/health".to_string()),
            method: Some("get".to_string()),
            interval_ms: Some(30_000),
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_http_validation() {
        assert!(validate_http_endpoint("http://example.com").is_ok());
        assert!(validate_http_endpoint("https://example.com:8080/path?x=1").is_ok());
        assert!(validate_http_endpoint("http://192.168.1.1").is_ok());

        assert_eq!(validate_http_endpoint(""), Err(ValidationError::MissingField("url")));
        assert!(matches!(
            validate_http_endpoint("example.com"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_http_endpoint("ftp://example.com"),
            Err(ValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_monitor_name("My Monitor").is_ok());
        assert_eq!(validate_monitor_name("   "), Err(ValidationError::MissingField("name")));
        assert_eq!(validate_monitor_name(&"x".repeat(101)), Err(ValidationError::NameTooLong));
    }

    #[test]
    fn test_draft_into_new_definition() {
        let monitor = draft().into_definition(None).unwrap();
        assert!(Uuid::parse_str(&monitor.id).is_ok());
        assert_eq!(monitor.http_method, HttpMethod::Get);
        assert_eq!(monitor.interval_ms, 30_000);
        assert!(monitor.parameters.is_empty());
        assert!(monitor.enabled);
    }

    #[test]
    fn test_draft_update_keeps_identity() {
        let existing = draft().into_definition(None).unwrap();
        let mut update = draft();
        update.interval_ms = Some(5_000);
        update.enabled = false;

        let updated = update.into_definition(Some(&existing)).unwrap();
        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.created_at, existing.created_at);
        assert_eq!(updated.interval_ms, 5_000);
        assert!(!updated.enabled);
    }

    #[test]
    fn test_draft_missing_fields_rejected() {
        let mut no_url = draft();
        no_url.url = None;
        assert_eq!(no_url.into_definition(None), Err(ValidationError::MissingField("url")));

        let mut no_method = draft();
        no_method.method = None;
        assert_eq!(no_method.into_definition(None), Err(ValidationError::MissingField("method")));

        let mut no_interval = draft();
        no_interval.interval_ms = None;
        assert_eq!(
            no_interval.into_definition(None),
            Err(ValidationError::MissingField("intervalMs"))
        );

        let mut zero = draft();
        zero.interval_ms = Some(0);
        assert_eq!(zero.into_definition(None), Err(ValidationError::ZeroInterval));

        let mut bad_method = draft();
        bad_method.method = Some("PUT".to_string());
        assert_eq!(
            bad_method.into_definition(None),
            Err(ValidationError::UnsupportedMethod("PUT".to_string()))
        );
    }

    #[test]
    fn test_interval_upper_bound() {
        let mut at_limit = draft();
        at_limit.interval_ms = Some(MAX_INTERVAL_MS);
        assert_eq!(at_limit.into_definition(None).unwrap().interval_ms, MAX_INTERVAL_MS);

        let huge: MonitorDraft = serde_json::from_str(
            r#"{"name":"x","url":"https://example.com","method":"GET","intervalMs":100000000000000000}"#,
        )
        .unwrap();
        assert_eq!(
            huge.into_definition(None),
            Err(ValidationError::IntervalTooLarge(100_000_000_000_000_000))
        );
    }

    #[test]
    fn test_draft_from_json() {
        let draft: MonitorDraft = serde_json::from_str(
            r#"{"name":"n","url":"http://x.test/a","method":"POST","intervalMs":1000,"formData":{"b":"2","a":"1"},"enabled":true}"#,
        )
        .unwrap();
        let monitor = draft.into_definition(None).unwrap();
        assert_eq!(monitor.parameters.encode(), "b=2&a=1");
    }

    #[test]
    fn test_probe_draft_uses_config_id() {
        let probe = ProbeDraft {
            url: Some("http://x.test".to_string()),
            method: Some("GET".to_string()),
            config_id: Some("m1".to_string()),
            ..Default::default()
        };
        let monitor = probe.into_definition().unwrap();
        assert_eq!(monitor.id, "m1");
        assert!(!monitor.enabled);
    }
}
