#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use shaft_contracts::wire::{ExportDocument, MatcherPayload};
use shaft_contracts::{FieldEdit, FieldId};
use shaft_engines::constraint_table::OptionCatalog;
use shaft_flow::{FormSession, SubmissionState};

/// `field=value`, where field is a field name or matcher wire key.
pub fn parse_assignment(raw: &str) -> Result<FieldEdit, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let field = FieldId::parse(key).ok_or_else(|| {
        let allowed = FieldId::ALL
            .iter()
            .map(|f| f.wire_name())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown field '{}'. allowed: {allowed}", key.trim())
    })?;
    Ok(FieldEdit::from_input(field, value))
}

/// Applies assignments left to right, normalizing after each one as the form
/// does on every change.
pub fn session_from_assignments(args: &[String]) -> Result<FormSession, String> {
    let mut session = FormSession::new();
    for raw in args {
        session.apply_edit(parse_assignment(raw)?);
    }
    Ok(session)
}

pub fn render_normalize(session: &FormSession) -> Result<String, String> {
    let out = session.current();
    let value = json!({
        "schema_version": out.schema_version,
        "selection": out.canonical,
        "directives": out.directives,
        "coercions": out.coercions,
        "missing_required": session.missing_required(),
    });
    serde_json::to_string_pretty(&value).map_err(|e| e.to_string())
}

pub fn render_payload(payload: &MatcherPayload) -> Result<String, String> {
    serde_json::to_string_pretty(payload).map_err(|e| e.to_string())
}

pub fn render_options(options: &OptionCatalog) -> Result<String, String> {
    serde_json::to_string_pretty(options).map_err(|e| e.to_string())
}

pub fn render_state(state: &SubmissionState) -> String {
    match state {
        SubmissionState::Success {
            results, message, ..
        } => {
            let mut lines = vec![format!("{:<16} {:<48} {:>6}", "ARTICLE", "NAME", "QTY")];
            for item in results {
                lines.push(format!(
                    "{:<16} {:<48} {:>6}",
                    item.article.as_ref().map(ToString::to_string).unwrap_or_default(),
                    item.name.as_deref().unwrap_or(""),
                    item.quantity.as_ref().map(ToString::to_string).unwrap_or_default(),
                ));
            }
            if let Some(message) = message {
                lines.push(String::new());
                lines.push(message.to_plain());
            }
            lines.join("\n")
        }
        SubmissionState::Empty { message, .. } => match message {
            Some(message) => format!("no matching items\n{}", message.to_plain()),
            None => "no matching items".to_string(),
        },
        SubmissionState::Failed { error, .. } => format!("failed: {}", error.user_text()),
        other => other.outcome().to_ascii_lowercase(),
    }
}

/// Writes the exported document into `out_dir` under the exporter's file name.
pub fn write_export(doc: &ExportDocument, out_dir: &Path) -> Result<PathBuf, String> {
    let name = Path::new(&doc.file_name)
        .file_name()
        .ok_or_else(|| format!("invalid export file name '{}'", doc.file_name))?;
    fs::create_dir_all(out_dir).map_err(|e| format!("failed to create {}: {e}", out_dir.display()))?;
    let path = out_dir.join(name);
    fs::write(&path, &doc.bytes).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaft_contracts::wire::{MatchedItem, WireScalar};
    use shaft_contracts::{PowerRating, ProductType, Selection};
    use shaft_engines::display_message::DisplayMessage;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn at_cli_01_assignments_parse_names_and_wire_keys() {
        assert_eq!(
            parse_assignment("tip=VBA").unwrap(),
            FieldEdit::ProductType(Some(ProductType::SupplyActive))
        );
        assert_eq!(
            parse_assignment("power=750").unwrap(),
            FieldEdit::Power(Some(PowerRating::W750))
        );
        assert!(parse_assignment("tip").unwrap_err().contains("field=value"));
        assert!(parse_assignment("colour=red").unwrap_err().contains("unknown field"));
    }

    #[test]
    fn at_cli_02_session_applies_in_order_and_renders_json() {
        let session =
            session_from_assignments(&args(&["tip=VBV", "diametr=800", "tip_klapana=pov"]))
                .unwrap();
        assert_eq!(session.current().canonical.power, Some(PowerRating::W750));
        let rendered = render_normalize(&session).unwrap();
        let v: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(v["selection"]["power"], "w750");
        assert_eq!(v["directives"]["power"]["editable"], false);
        assert!(v["missing_required"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("valve_position")));
    }

    #[test]
    fn at_cli_03_render_state_lists_items_and_guidance() {
        let state = SubmissionState::Success {
            request_seq: 1,
            canonical: Selection::empty(),
            payload: MatcherPayload::default(),
            results: vec![MatchedItem {
                article: Some(WireScalar::Number(4411.0)),
                name: Some("Клапан".to_string()),
                quantity: Some(WireScalar::Text("2".to_string())),
            }],
            message: Some(DisplayMessage::parse("Проверьте\n• длину")),
        };
        let text = render_state(&state);
        assert!(text.contains("4411"));
        assert!(text.contains("Клапан"));
        assert!(text.ends_with("Проверьте\n  • длину"));

        let empty = SubmissionState::Empty {
            request_seq: 2,
            message: None,
        };
        assert_eq!(render_state(&empty), "no matching items");
    }

    #[test]
    fn at_cli_04_write_export_keeps_only_file_name() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(1);
        let dir = std::env::temp_dir().join(format!("shaft-export-test-{suffix}"));
        let doc = ExportDocument {
            file_name: "../KP_7.xlsx".to_string(),
            content_type: "application/octet-stream".to_string(),
            bytes: vec![1, 2, 3],
        };
        let path = write_export(&doc, &dir).unwrap();
        assert_eq!(path, dir.join("KP_7.xlsx"));
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
