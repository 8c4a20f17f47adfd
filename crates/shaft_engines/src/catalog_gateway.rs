#![forbid(unsafe_code)]

use std::env;
use std::io::Read;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use shaft_contracts::wire::{ExportDocument, MatcherPayload, MatcherResponse};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MATCHER_URL: &str = "http://127.0.0.1:5000/api/select";
pub const DEFAULT_EXPORTER_URL: &str = "http://127.0.0.1:5000/api/export";
pub const DEFAULT_USER_AGENT: &str = "shaft-gateway/1.0";
pub const DEFAULT_TIMEOUT_MS: u32 = 5_000;
const MIN_TIMEOUT_MS: u32 = 100;
const MAX_TIMEOUT_MS: u32 = 60_000;
const MAX_EXPORT_BYTES: u64 = 32 * 1024 * 1024;
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error ({kind}): {detail}")]
    Network { kind: &'static str, detail: String },
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("unparsable response: {0}")]
    Parse(String),
}

impl TransportError {
    /// Text shown to the user, verbatim from the backend where possible.
    pub fn user_text(&self) -> String {
        match self {
            Self::HttpStatus { body, .. } if !body.trim().is_empty() => body.trim().to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayConfigError {
    #[error("{var} is not a valid http(s) URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} must be an integer in {min}..={max}, got {value}")]
    InvalidTimeout {
        var: &'static str,
        min: u32,
        max: u32,
        value: String,
    },
}

/// The two external services the submission flow talks to.
pub trait CatalogGateway {
    fn match_selection(&self, payload: &MatcherPayload) -> Result<MatcherResponse, TransportError>;

    fn export_document(&self, payload: &MatcherPayload) -> Result<ExportDocument, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub matcher_url: String,
    pub exporter_url: String,
    pub timeout_ms: u32,
    pub user_agent: String,
    /// Served instead of calling the matcher when set.
    pub matcher_fixture_json: Option<String>,
}

impl GatewayConfig {
    pub fn mvp_v1() -> Self {
        Self {
            matcher_url: DEFAULT_MATCHER_URL.to_string(),
            exporter_url: DEFAULT_EXPORTER_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            matcher_fixture_json: None,
        }
    }

    pub fn from_env() -> Result<Self, GatewayConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, GatewayConfigError> {
        let defaults = Self::mvp_v1();
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let matcher_url = match read("SHAFT_MATCHER_URL") {
            Some(v) => validated_url("SHAFT_MATCHER_URL", v)?,
            None => defaults.matcher_url,
        };
        let exporter_url = match read("SHAFT_EXPORTER_URL") {
            Some(v) => validated_url("SHAFT_EXPORTER_URL", v)?,
            None => defaults.exporter_url,
        };
        let timeout_ms = match read("SHAFT_HTTP_TIMEOUT_MS") {
            Some(v) => parse_timeout("SHAFT_HTTP_TIMEOUT_MS", v)?,
            None => defaults.timeout_ms,
        };
        Ok(Self {
            matcher_url,
            exporter_url,
            timeout_ms,
            user_agent: read("SHAFT_HTTP_USER_AGENT").unwrap_or(defaults.user_agent),
            matcher_fixture_json: None,
        })
    }
}

fn validated_url(var: &'static str, value: String) -> Result<String, GatewayConfigError> {
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(value),
        _ => Err(GatewayConfigError::InvalidUrl { var, value }),
    }
}

fn parse_timeout(var: &'static str, value: String) -> Result<u32, GatewayConfigError> {
    match value.parse::<u32>() {
        Ok(ms) if (MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&ms) => Ok(ms),
        _ => Err(GatewayConfigError::InvalidTimeout {
            var,
            min: MIN_TIMEOUT_MS,
            max: MAX_TIMEOUT_MS,
            value,
        }),
    }
}

/// Blocking gateway over ureq. Callers on an async runtime must move calls
/// onto a blocking thread.
#[derive(Debug, Clone)]
pub struct HttpCatalogGateway {
    config: GatewayConfig,
    agent: ureq::Agent,
}

impl HttpCatalogGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let agent = build_http_agent(config.timeout_ms, &config.user_agent);
        Self { config, agent }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl CatalogGateway for HttpCatalogGateway {
    fn match_selection(&self, payload: &MatcherPayload) -> Result<MatcherResponse, TransportError> {
        if let Some(fixture) = self.config.matcher_fixture_json.as_deref() {
            debug!("matcher fixture served");
            return parse_matcher_response(fixture);
        }
        debug!(url = %self.config.matcher_url, tip = %payload.tip, "matcher request");
        let response = self
            .agent
            .post(&self.config.matcher_url)
            .set("Accept", "application/json")
            .send_json(payload)
            .map_err(transport_error_from_ureq)?;
        let body = response
            .into_string()
            .map_err(|e| TransportError::Parse(e.to_string()))?;
        parse_matcher_response(&body)
    }

    fn export_document(&self, payload: &MatcherPayload) -> Result<ExportDocument, TransportError> {
        debug!(url = %self.config.exporter_url, "exporter request");
        let response = self
            .agent
            .post(&self.config.exporter_url)
            .send_json(payload)
            .map_err(transport_error_from_ureq)?;

        let content_type = response
            .header("Content-Type")
            .map(str::to_string)
            .unwrap_or_else(|| XLSX_CONTENT_TYPE.to_string());
        let file_name = response
            .header("Content-Disposition")
            .and_then(content_disposition_file_name)
            .unwrap_or_else(default_export_file_name);

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_EXPORT_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| TransportError::Parse(e.to_string()))?;
        if bytes.is_empty() {
            return Err(TransportError::Parse("empty export document".to_string()));
        }
        Ok(ExportDocument {
            file_name,
            content_type,
            bytes,
        })
    }
}

pub fn parse_matcher_response(body: &str) -> Result<MatcherResponse, TransportError> {
    serde_json::from_str(body).map_err(|e| TransportError::Parse(e.to_string()))
}

fn build_http_agent(timeout_ms: u32, user_agent: &str) -> ureq::Agent {
    let timeout = Duration::from_millis(u64::from(timeout_ms.max(MIN_TIMEOUT_MS)));
    ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(user_agent)
        .try_proxy_from_env(false)
        .build()
}

fn transport_error_from_ureq(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            warn!(status, "catalog service returned non-2xx");
            TransportError::HttpStatus { status, body }
        }
        ureq::Error::Transport(transport) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            let kind = classify_transport_error_kind(&combined);
            warn!(kind, "catalog service unreachable");
            TransportError::Network {
                kind,
                detail: transport.to_string(),
            }
        }
    }
}

fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}

/// `attachment; filename="KP_1.xlsx"` and RFC 5987
/// `filename*=charset'lang'value` forms. `filename*` wins when it decodes to a
/// safe name.
pub fn content_disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                if let Some(name) = extended_value(value.trim().trim_matches('"'))
                    .filter(|n| is_safe_file_name(n))
                {
                    return Some(name);
                }
            }
            "filename" => {
                let name = value.trim().trim_matches('"').to_string();
                if is_safe_file_name(&name) {
                    plain = Some(name);
                }
            }
            _ => {}
        }
    }
    plain
}

/// Decodes an RFC 5987 `ext-value`. Only UTF-8 and ISO-8859-1 are accepted.
fn extended_value(raw: &str) -> Option<String> {
    let mut parts = raw.splitn(3, '\'');
    let charset = parts.next()?.trim();
    let _language = parts.next()?;
    let encoded = parts.next()?;
    if charset.eq_ignore_ascii_case("utf-8") {
        urlencoding::decode(encoded).ok().map(|name| name.into_owned())
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(
            urlencoding::decode_binary(encoded.as_bytes())
                .iter()
                .map(|&b| char::from(b))
                .collect(),
        )
    } else {
        None
    }
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

pub fn default_export_file_name() -> String {
    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("KP_{unix_ms}.xlsx")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn at_gw_01_config_defaults_when_env_empty() {
        let c = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c, GatewayConfig::mvp_v1());
    }

    #[test]
    fn at_gw_02_config_reads_and_validates_overrides() {
        let c = GatewayConfig::from_lookup(lookup(&[
            ("SHAFT_MATCHER_URL", "https://catalog.example/api/select"),
            ("SHAFT_HTTP_TIMEOUT_MS", "1500"),
            ("SHAFT_HTTP_USER_AGENT", " kp-bot/2 "),
        ]))
        .unwrap();
        assert_eq!(c.matcher_url, "https://catalog.example/api/select");
        assert_eq!(c.timeout_ms, 1500);
        assert_eq!(c.user_agent, "kp-bot/2");

        let bad_url = GatewayConfig::from_lookup(lookup(&[("SHAFT_EXPORTER_URL", "ftp://x")]));
        assert!(matches!(
            bad_url,
            Err(GatewayConfigError::InvalidUrl { var: "SHAFT_EXPORTER_URL", .. })
        ));
        let bad_timeout = GatewayConfigError::InvalidTimeout {
            var: "SHAFT_HTTP_TIMEOUT_MS",
            min: 100,
            max: 60_000,
            value: "50".to_string(),
        };
        assert_eq!(
            GatewayConfig::from_lookup(lookup(&[("SHAFT_HTTP_TIMEOUT_MS", "50")])),
            Err(bad_timeout)
        );
    }

    #[test]
    fn at_gw_03_fixture_served_without_network() {
        let mut config = GatewayConfig::mvp_v1();
        config.matcher_fixture_json =
            Some(r#"{"results":[{"article":"A1","name":"Шахта","quantity":1}]}"#.to_string());
        let gw = HttpCatalogGateway::new(config);
        let r = gw.match_selection(&MatcherPayload::default()).unwrap();
        assert_eq!(r.results.len(), 1);
        assert_eq!(r.results[0].name.as_deref(), Some("Шахта"));
    }

    #[test]
    fn at_gw_04_unparsable_body_is_parse_error() {
        assert!(matches!(
            parse_matcher_response("<html>oops</html>"),
            Err(TransportError::Parse(_))
        ));
    }

    #[test]
    fn at_gw_05_content_disposition_file_names() {
        assert_eq!(
            content_disposition_file_name(r#"attachment; filename="KP_42.xlsx""#).as_deref(),
            Some("KP_42.xlsx")
        );
        assert_eq!(
            content_disposition_file_name(
                "attachment; filename=fallback.xlsx; filename*=UTF-8''%D0%9A%D0%9F.xlsx"
            )
            .as_deref(),
            Some("КП.xlsx")
        );
        assert_eq!(
            content_disposition_file_name(r#"attachment; filename="../etc/passwd""#),
            None
        );
        assert_eq!(content_disposition_file_name("inline"), None);
    }

    #[test]
    fn at_gw_08_extended_file_name_with_language_tag() {
        assert_eq!(
            content_disposition_file_name("attachment; filename*=UTF-8'ru'%D0%9A%D0%9F.xlsx")
                .as_deref(),
            Some("КП.xlsx")
        );
        assert_eq!(
            content_disposition_file_name(
                r#"attachment; filename*=UTF-8'en'KP_9.xlsx; filename="fallback.xlsx""#
            )
            .as_deref(),
            Some("KP_9.xlsx")
        );
        assert_eq!(
            content_disposition_file_name("attachment; filename*=iso-8859-1''caf%E9.xlsx")
                .as_deref(),
            Some("café.xlsx")
        );
        // Undecodable or unsafe extended names fall back to the plain parameter.
        assert_eq!(
            content_disposition_file_name(
                r#"attachment; filename*=UTF-8''%2E%2E%2Fx.xlsx; filename="KP_3.xlsx""#
            )
            .as_deref(),
            Some("KP_3.xlsx")
        );
        assert_eq!(
            content_disposition_file_name(
                r#"attachment; filename*=KOI8-R''%EB%f0.xlsx; filename="KP_4.xlsx""#
            )
            .as_deref(),
            Some("KP_4.xlsx")
        );
        assert_eq!(
            content_disposition_file_name(r#"attachment; filename*=KP_5.xlsx; filename="KP_6.xlsx""#)
                .as_deref(),
            Some("KP_6.xlsx")
        );
    }

    #[test]
    fn at_gw_06_default_file_name_shape() {
        let name = default_export_file_name();
        assert!(name.starts_with("KP_"));
        assert!(name.ends_with(".xlsx"));
        assert!(name["KP_".len()..name.len() - ".xlsx".len()]
            .chars()
            .all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn at_gw_07_transport_classification_and_user_text() {
        assert_eq!(classify_transport_error_kind("Io timed out"), "timeout");
        assert_eq!(classify_transport_error_kind("Dns failed"), "dns");
        assert_eq!(classify_transport_error_kind("ConnectionFailed"), "connection");
        let e = TransportError::HttpStatus {
            status: 500,
            body: " Ошибка сервера ".to_string(),
        };
        assert_eq!(e.user_text(), "Ошибка сервера");
        let e = TransportError::HttpStatus {
            status: 502,
            body: String::new(),
        };
        assert_eq!(e.user_text(), "HTTP 502: ");
    }
}
