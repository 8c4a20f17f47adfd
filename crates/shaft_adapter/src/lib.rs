#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shaft_contracts::wire::{ExportDocument, MatchedItem, MatcherPayload};
use shaft_contracts::{
    Coercion, FieldDirectives, FieldEdit, FieldId, ProductType, SchemaVersion, Selection,
    Vocabulary,
};
use shaft_engines::catalog_gateway::{
    default_export_file_name, CatalogGateway, GatewayConfig, HttpCatalogGateway, TransportError,
};
use shaft_engines::constraint_table::{option_catalog, OptionCatalog};
use shaft_engines::display_message::DisplayMessage;
use shaft_engines::normalizer::{missing_required, normalize};
use shaft_engines::payload_codec::encode;
use shaft_flow::{FlowError, SubmissionFlow, SubmissionState};
use tracing::{debug, info};

/// Raw form body. Keys are field names or matcher wire keys; values may be
/// strings, numbers or booleans and are parsed leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormInput(pub BTreeMap<String, Value>);

impl FormInput {
    pub fn to_selection(&self) -> Selection {
        let mut selection = Selection::empty();
        apply_form_entries(&mut selection, &self.0);
        selection
    }
}

fn apply_form_entries(selection: &mut Selection, entries: &BTreeMap<String, Value>) {
    for (key, value) in entries {
        if let Value::Object(nested) = value {
            // germetizatsiya: { membrana, lenta }
            let nested: BTreeMap<String, Value> =
                nested.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            apply_form_entries(selection, &nested);
            continue;
        }
        match FieldId::parse(key) {
            Some(field) => selection.apply(FieldEdit::from_input(field, &value_text(value))),
            None => debug!(key = %key, "ignored unknown form field"),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub schema_version: SchemaVersion,
    pub selection: Selection,
    pub directives: FieldDirectives,
    pub coercions: Vec<Coercion>,
    pub missing_required: Vec<FieldId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionsAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub options: OptionCatalog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub article: String,
    pub name: String,
    pub quantity: String,
}

impl From<&MatchedItem> for ResultRow {
    fn from(item: &MatchedItem) -> Self {
        Self {
            article: item.article.as_ref().map(ToString::to_string).unwrap_or_default(),
            name: item.name.clone().unwrap_or_default(),
            quantity: item.quantity.as_ref().map(ToString::to_string).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub results: Vec<ResultRow>,
    pub message: Option<DisplayMessage>,
    pub message_html: Option<String>,
    pub missing_required: Vec<FieldId>,
    pub payload: Option<MatcherPayload>,
}

impl SelectAdapterResponse {
    fn with_message(
        status: &str,
        outcome: &str,
        reason: Option<String>,
        message: Option<DisplayMessage>,
    ) -> Self {
        Self {
            status: status.to_string(),
            outcome: outcome.to_string(),
            reason,
            results: Vec::new(),
            message_html: message.as_ref().map(DisplayMessage::to_html),
            message,
            missing_required: Vec::new(),
            payload: None,
        }
    }

    pub fn failed(reason: String) -> Self {
        Self::with_message("error", "FAILED", Some(reason), None)
    }

    /// Error envelope for a flow failure. Backend error text is rendered
    /// through the same escaped message formatter as guidance messages.
    pub fn rejected(err: &FlowError) -> Self {
        match err {
            FlowError::Incomplete { missing } => Self {
                missing_required: missing.clone(),
                ..Self::with_message("error", "INCOMPLETE", Some(err.to_string()), None)
            },
            FlowError::Transport(transport) => {
                let text = transport.user_text();
                let message = Some(DisplayMessage::parse(&text)).filter(|m| !m.is_empty());
                Self::with_message("error", "FAILED", Some(text), message)
            }
            FlowError::ExportUnavailable => {
                Self::with_message("error", "REJECTED", Some(err.to_string()), None)
            }
        }
    }
}

/// HTTP status for a flow failure.
pub fn flow_error_status(err: &FlowError) -> u16 {
    match err {
        FlowError::Incomplete { .. } => 400,
        FlowError::Transport(TransportError::HttpStatus { .. }) => 502,
        FlowError::Transport(TransportError::Network { kind, .. }) if *kind == "timeout" => 504,
        FlowError::Transport(_) => 502,
        FlowError::ExportUnavailable => 409,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub matcher_url: String,
    pub exporter_url: String,
}

/// `Content-Disposition` value for a download. Non-ASCII names travel in the
/// RFC 5987 `filename*` parameter with an ASCII fallback.
pub fn content_disposition(file_name: &str) -> String {
    let ascii_safe = file_name
        .chars()
        .all(|c| c.is_ascii_graphic() && c != '"' && c != '\\');
    if ascii_safe {
        return format!("attachment; filename=\"{file_name}\"");
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        default_export_file_name(),
        urlencoding::encode(file_name)
    )
}

/// Stateless: every request normalizes its own snapshot.
#[derive(Debug, Clone)]
pub struct AdapterRuntime<G = HttpCatalogGateway> {
    gateway: G,
}

impl AdapterRuntime<HttpCatalogGateway> {
    pub fn default_from_env() -> Result<Self, String> {
        let config = GatewayConfig::from_env().map_err(|e| e.to_string())?;
        Ok(Self::new(HttpCatalogGateway::new(config)))
    }

    pub fn health(&self) -> AdapterHealthResponse {
        let config = self.gateway.config();
        AdapterHealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
            reason: None,
            matcher_url: config.matcher_url.clone(),
            exporter_url: config.exporter_url.clone(),
        }
    }
}

impl<G: CatalogGateway> AdapterRuntime<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn normalize(&self, input: &FormInput) -> NormalizeAdapterResponse {
        let out = normalize(&input.to_selection());
        let missing = missing_required(&out.canonical, &out.directives);
        NormalizeAdapterResponse {
            status: "ok".to_string(),
            outcome: if missing.is_empty() {
                "COMPLETE".to_string()
            } else {
                "INCOMPLETE".to_string()
            },
            reason: None,
            schema_version: out.schema_version,
            selection: out.canonical,
            directives: out.directives,
            coercions: out.coercions,
            missing_required: missing,
        }
    }

    /// Unknown or empty `tip` yields the unconstrained lists.
    pub fn options(&self, tip: Option<&str>) -> OptionsAdapterResponse {
        let product_type = tip.and_then(ProductType::parse_input);
        OptionsAdapterResponse {
            status: "ok".to_string(),
            outcome: "OPTIONS".to_string(),
            reason: None,
            options: option_catalog(product_type),
        }
    }

    pub fn select(&self, input: &FormInput) -> Result<SelectAdapterResponse, FlowError> {
        let mut flow = SubmissionFlow::new();
        let state = flow.submit(&self.gateway, &input.to_selection())?;
        let response = match state {
            SubmissionState::Success {
                payload,
                results,
                message,
                ..
            } => SelectAdapterResponse {
                results: results.iter().map(ResultRow::from).collect(),
                payload: Some(payload.clone()),
                ..SelectAdapterResponse::with_message("ok", "SUCCESS", None, message.clone())
            },
            SubmissionState::Empty { message, .. } => {
                SelectAdapterResponse::with_message("ok", "EMPTY", None, message.clone())
            }
            other => SelectAdapterResponse::with_message("ok", other.outcome(), None, None),
        };
        Ok(response)
    }

    /// Exports the posted selection after the same normalization and
    /// completeness check a submit performs.
    pub fn export(&self, input: &FormInput) -> Result<ExportDocument, FlowError> {
        let out = normalize(&input.to_selection());
        let missing = missing_required(&out.canonical, &out.directives);
        if !missing.is_empty() {
            debug!(missing = missing.len(), "export rejected: selection incomplete");
            return Err(FlowError::Incomplete { missing });
        }
        let doc = self.gateway.export_document(&encode(&out.canonical))?;
        info!(file_name = %doc.file_name, bytes = doc.bytes.len(), "export streamed");
        Ok(doc)
    }
}
