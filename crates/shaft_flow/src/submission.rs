#![forbid(unsafe_code)]

//! One matcher round trip per submit, plus the export that may follow it.
//!
//! A submit is split into `begin_submit` (snapshot, normalize, encode) and
//! `complete_submit` (apply the response), so a caller may keep editing a new
//! selection while the request is in flight. Only the newest ticket's response
//! is applied.

use shaft_contracts::wire::{ExportDocument, MatchedItem, MatcherPayload, MatcherResponse};
use shaft_contracts::{FieldId, Selection};
use shaft_engines::catalog_gateway::{CatalogGateway, TransportError};
use shaft_engines::display_message::DisplayMessage;
use shaft_engines::normalizer::{missing_required, normalize};
use shaft_engines::payload_codec::encode;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("required fields missing: {}", field_list(.missing))]
    Incomplete { missing: Vec<FieldId> },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("export is only available after a successful submission")]
    ExportUnavailable,
}

fn field_list(fields: &[FieldId]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Submitting {
        request_seq: u64,
    },
    Success {
        request_seq: u64,
        canonical: Selection,
        payload: MatcherPayload,
        results: Vec<MatchedItem>,
        message: Option<DisplayMessage>,
    },
    Empty {
        request_seq: u64,
        message: Option<DisplayMessage>,
    },
    Failed {
        request_seq: u64,
        error: TransportError,
    },
}

impl SubmissionState {
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Submitting { .. } => "SUBMITTING",
            Self::Success { .. } => "SUCCESS",
            Self::Empty { .. } => "EMPTY",
            Self::Failed { .. } => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success { .. } | Self::Empty { .. } | Self::Failed { .. }
        )
    }
}

/// Snapshot taken at submit time. Later edits never reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    pub request_seq: u64,
    pub canonical: Selection,
    pub payload: MatcherPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTicket {
    pub request_seq: u64,
    pub payload: MatcherPayload,
}

#[derive(Debug, Clone)]
pub struct SubmissionFlow {
    state: SubmissionState,
    last_issued_seq: u64,
}

impl Default for SubmissionFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionFlow {
    pub fn new() -> Self {
        Self {
            state: SubmissionState::Idle,
            last_issued_seq: 0,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Re-normalizes the snapshot, rejects it when required fields are still
    /// Unset, and moves to `Submitting`. The previous state is kept on rejection.
    pub fn begin_submit(&mut self, selection: &Selection) -> Result<SubmitTicket, FlowError> {
        let out = normalize(selection);
        let missing = missing_required(&out.canonical, &out.directives);
        if !missing.is_empty() {
            debug!(missing = %field_list(&missing), "submit rejected: selection incomplete");
            return Err(FlowError::Incomplete { missing });
        }

        self.last_issued_seq += 1;
        let request_seq = self.last_issued_seq;
        let payload = encode(&out.canonical);
        info!(
            request_seq,
            tip = %payload.tip,
            diametr = %payload.diametr,
            coercions = out.coercions.len(),
            "submit started"
        );
        self.state = SubmissionState::Submitting { request_seq };
        Ok(SubmitTicket {
            request_seq,
            canonical: out.canonical,
            payload,
        })
    }

    /// Applies the matcher outcome for `ticket`. Returns `false` and changes
    /// nothing when a newer ticket has been issued since.
    pub fn complete_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<MatcherResponse, TransportError>,
    ) -> bool {
        let request_seq = ticket.request_seq;
        if request_seq != self.last_issued_seq {
            debug!(
                request_seq,
                latest = self.last_issued_seq,
                "submit response superseded"
            );
            return false;
        }

        self.state = match result {
            Ok(response) => {
                let message = response
                    .message
                    .as_deref()
                    .map(DisplayMessage::parse)
                    .filter(|m| !m.is_empty());
                if response.results.is_empty() {
                    info!(request_seq, "submit applied: no matching items");
                    SubmissionState::Empty {
                        request_seq,
                        message,
                    }
                } else {
                    info!(request_seq, items = response.results.len(), "submit applied");
                    SubmissionState::Success {
                        request_seq,
                        canonical: ticket.canonical,
                        payload: ticket.payload,
                        results: response.results,
                        message,
                    }
                }
            }
            Err(error) => {
                warn!(request_seq, error = %error, "submit failed");
                SubmissionState::Failed { request_seq, error }
            }
        };
        true
    }

    /// Synchronous submit: snapshot, call the matcher, apply. A transport
    /// failure is recorded as `Failed` and also returned.
    pub fn submit(
        &mut self,
        gateway: &impl CatalogGateway,
        selection: &Selection,
    ) -> Result<&SubmissionState, FlowError> {
        let ticket = self.begin_submit(selection)?;
        let result = gateway.match_selection(&ticket.payload);
        let failure = result.as_ref().err().cloned();
        self.complete_submit(ticket, result);
        match failure {
            Some(error) => Err(FlowError::Transport(error)),
            None => Ok(&self.state),
        }
    }

    /// The payload of the last successful submission.
    pub fn export_ticket(&self) -> Result<ExportTicket, FlowError> {
        match &self.state {
            SubmissionState::Success {
                request_seq,
                payload,
                ..
            } => Ok(ExportTicket {
                request_seq: *request_seq,
                payload: payload.clone(),
            }),
            _ => Err(FlowError::ExportUnavailable),
        }
    }

    pub fn export(&self, gateway: &impl CatalogGateway) -> Result<ExportDocument, FlowError> {
        let ticket = self.export_ticket()?;
        let doc = gateway.export_document(&ticket.payload).map_err(|e| {
            warn!(request_seq = ticket.request_seq, error = %e, "export failed");
            FlowError::Transport(e)
        })?;
        info!(
            request_seq = ticket.request_seq,
            file_name = %doc.file_name,
            bytes = doc.bytes.len(),
            "export completed"
        );
        Ok(doc)
    }

    pub fn last_canonical(&self) -> Option<&Selection> {
        match &self.state {
            SubmissionState::Success { canonical, .. } => Some(canonical),
            _ => None,
        }
    }
}
