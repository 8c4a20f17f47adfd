#![forbid(unsafe_code)]

use std::cell::RefCell;

use shaft_contracts::wire::{ExportDocument, MatcherPayload, MatcherResponse};
use shaft_contracts::{FieldEdit, FieldId, ProductType, Selection};
use shaft_engines::catalog_gateway::{CatalogGateway, TransportError};
use shaft_flow::{FlowError, FormSession, SubmissionFlow, SubmissionState};

/// Records every payload it receives and answers from canned responses.
struct FakeCatalog {
    matcher_reply: Result<MatcherResponse, TransportError>,
    export_reply: Result<ExportDocument, TransportError>,
    matcher_calls: RefCell<Vec<MatcherPayload>>,
    export_calls: RefCell<Vec<MatcherPayload>>,
}

impl FakeCatalog {
    fn answering(json: &str) -> Self {
        Self {
            matcher_reply: Ok(serde_json::from_str(json).unwrap()),
            export_reply: Ok(ExportDocument {
                file_name: "KP_1.xlsx".to_string(),
                content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                    .to_string(),
                bytes: b"PK\x03\x04".to_vec(),
            }),
            matcher_calls: RefCell::new(Vec::new()),
            export_calls: RefCell::new(Vec::new()),
        }
    }

    fn failing(error: TransportError) -> Self {
        Self {
            matcher_reply: Err(error.clone()),
            export_reply: Err(error),
            ..Self::answering("{}")
        }
    }
}

impl CatalogGateway for FakeCatalog {
    fn match_selection(&self, payload: &MatcherPayload) -> Result<MatcherResponse, TransportError> {
        self.matcher_calls.borrow_mut().push(payload.clone());
        self.matcher_reply.clone()
    }

    fn export_document(&self, payload: &MatcherPayload) -> Result<ExportDocument, TransportError> {
        self.export_calls.borrow_mut().push(payload.clone());
        self.export_reply.clone()
    }
}

fn filled_session(pairs: &[(FieldId, &str)]) -> FormSession {
    let mut session = FormSession::new();
    for (field, raw) in pairs {
        session.apply_input(*field, raw);
    }
    session
}

fn exhaust_710() -> FormSession {
    filled_session(&[
        (FieldId::ProductType, "VBV"),
        (FieldId::Diameter, "710"),
        (FieldId::ValveKind, "pov"),
        (FieldId::ValvePosition, "niz"),
        (FieldId::MotorType, "6е"),
        (FieldId::TopPart, "зонт"),
        (FieldId::CrownRing, "on"),
        (FieldId::ExtensionMeters, "0,5"),
    ])
}

#[test]
fn at_flow_db_01_end_to_end_exhaust_710_reaches_matcher_encoded() {
    let gw = FakeCatalog::answering(
        r#"{"results":[{"article":"VB-710","name":"Шахта вытяжная 710","quantity":1}]}"#,
    );
    let mut session = exhaust_710();
    let state = session.submit(&gw).unwrap();
    assert_eq!(state.outcome(), "SUCCESS");

    let calls = gw.matcher_calls.borrow();
    assert_eq!(calls.len(), 1);
    let p = &calls[0];
    assert_eq!(p.tip, "VBV");
    assert_eq!(p.diametr, "710");
    assert_eq!(p.tip_klapana, "pov");
    assert_eq!(p.raspolozhenie, "niz");
    assert_eq!(p.tip_motora, "6e");
    assert_eq!(p.moshchnost, "370");
    assert_eq!(p.verhnyaya_chast, "zont");
    assert!(!p.korona);
    assert_eq!(p.udlinenie_m, 0.5);
}

#[test]
fn at_flow_db_02_export_posts_last_successful_payload() {
    let gw = FakeCatalog::answering(r#"{"results":[{"article":1,"name":"x","quantity":2}]}"#);
    let mut session = exhaust_710();
    session.submit(&gw).unwrap();

    session.apply_input(FieldId::Diameter, "315");
    let doc = session.export(&gw).unwrap();
    assert_eq!(doc.file_name, "KP_1.xlsx");

    let exported = gw.export_calls.borrow();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].diametr, "710");
    assert_eq!(exported[0], gw.matcher_calls.borrow()[0]);
}

#[test]
fn at_flow_db_03_empty_result_with_guidance_disables_export() {
    let gw = FakeCatalog::answering(r#"{"results":[],"message":"Ничего не найдено"}"#);
    let mut session = exhaust_710();
    let state = session.submit(&gw).unwrap();
    assert_eq!(state.outcome(), "EMPTY");
    assert_eq!(session.export(&gw).unwrap_err(), FlowError::ExportUnavailable);
    assert!(gw.export_calls.borrow().is_empty());
}

#[test]
fn at_flow_db_04_transport_failure_is_reported_and_retryable() {
    let error = TransportError::Network {
        kind: "connection",
        detail: "refused".to_string(),
    };
    let failing = FakeCatalog::failing(error.clone());
    let mut session = exhaust_710();
    assert_eq!(
        session.submit(&failing).unwrap_err(),
        FlowError::Transport(error.clone())
    );
    assert!(matches!(
        session.flow().state(),
        SubmissionState::Failed { error: e, .. } if *e == error
    ));
    assert_eq!(session.export(&failing).unwrap_err(), FlowError::ExportUnavailable);

    let healthy = FakeCatalog::answering(r#"{"results":[{"article":"A"}]}"#);
    assert_eq!(session.submit(&healthy).unwrap().outcome(), "SUCCESS");
}

#[test]
fn at_flow_db_05_incomplete_never_calls_matcher() {
    let gw = FakeCatalog::answering("{}");
    let mut session = filled_session(&[(FieldId::ProductType, "VBA")]);
    let err = session.submit(&gw).unwrap_err();
    assert!(matches!(err, FlowError::Incomplete { .. }));
    assert!(gw.matcher_calls.borrow().is_empty());
}

#[test]
fn at_flow_db_06_stale_raw_selection_is_renormalized_before_encoding() {
    let gw = FakeCatalog::answering(r#"{"results":[{"article":"A"}]}"#);
    let stale = Selection::empty()
        .with(FieldEdit::ProductType(Some(ProductType::SupplyMixed)))
        .with(FieldEdit::from_input(FieldId::Diameter, "800"))
        .with(FieldEdit::from_input(FieldId::ValveKind, "grav"))
        .with(FieldEdit::from_input(FieldId::MotorType, "6d"))
        .with(FieldEdit::from_input(FieldId::TopPart, "rastrub"))
        .with(FieldEdit::CrownRing(true));
    let mut flow = SubmissionFlow::new();
    flow.submit(&gw, &stale).unwrap();

    let p = &gw.matcher_calls.borrow()[0];
    assert_eq!(p.tip, "VBR");
    assert_eq!(p.tip_klapana, "pov");
    assert_eq!(p.raspolozhenie, "niz");
    assert_eq!(p.grav_variant, "");
    assert_eq!(p.moshchnost, "750");
    assert_eq!(p.verhnyaya_chast, "zont");
    assert!(!p.korona);
}
