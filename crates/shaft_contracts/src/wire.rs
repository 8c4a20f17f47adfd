#![forbid(unsafe_code)]

//! Shapes exchanged with the external matcher and exporter services.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sealing {
    pub membrana: bool,
    pub lenta: bool,
}

/// Request body of the matcher. Unset enumerations are empty strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatcherPayload {
    pub tip: String,
    pub diametr: String,
    pub tip_klapana: String,
    pub raspolozhenie: String,
    pub grav_variant: String,
    pub tip_motora: String,
    pub moshchnost: String,
    pub verhnyaya_chast: String,
    pub germetizatsiya: Sealing,
    pub avtomat: bool,
    pub kapleulavlivatel: bool,
    pub montazhny_komplekt: bool,
    pub korona: bool,
    pub udlinenie_m: f64,
}

/// Article numbers and quantities arrive as either JSON strings or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireScalar {
    Number(f64),
    Text(String),
}

impl fmt::Display for WireScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchedItem {
    #[serde(default)]
    pub article: Option<WireScalar>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<WireScalar>,
}

/// Empty `results` with a `message` is a "no match, with guidance" answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatcherResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<MatchedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<MatchedItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<MatchedItem>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Opaque spreadsheet returned by the exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_wire_01_response_tolerates_absent_or_null_results() {
        let r: MatcherResponse =
            serde_json::from_str(r#"{"message":"Ничего не найдено"}"#).unwrap();
        assert!(r.results.is_empty());
        assert_eq!(r.message.as_deref(), Some("Ничего не найдено"));

        let r: MatcherResponse = serde_json::from_str(r#"{"results":null}"#).unwrap();
        assert!(r.results.is_empty());
    }

    #[test]
    fn at_wire_02_items_accept_string_or_number_scalars() {
        let r: MatcherResponse = serde_json::from_str(
            r#"{"results":[{"article":"A-100","name":"Секция VB-710 (1м)","quantity":2},
                           {"article":4411,"quantity":"1"}]}"#,
        )
        .unwrap();
        assert_eq!(r.results.len(), 2);
        assert_eq!(r.results[0].quantity.as_ref().unwrap().to_string(), "2");
        assert_eq!(r.results[1].article.as_ref().unwrap().to_string(), "4411");
        assert_eq!(r.results[1].name, None);
    }

    #[test]
    fn at_wire_03_payload_serializes_nested_sealing() {
        let p = MatcherPayload {
            tip: "VBV".to_string(),
            germetizatsiya: Sealing {
                membrana: true,
                lenta: false,
            },
            ..MatcherPayload::default()
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["tip"], "VBV");
        assert_eq!(v["germetizatsiya"]["membrana"], true);
        assert_eq!(v["diametr"], "");
        assert_eq!(v["udlinenie_m"], 0.0);
    }
}
