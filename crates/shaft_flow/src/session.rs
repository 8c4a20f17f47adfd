#![forbid(unsafe_code)]

use shaft_contracts::wire::{ExportDocument, MatcherResponse};
use shaft_contracts::{FieldEdit, FieldId, NormalizeOutput, Selection};
use shaft_engines::catalog_gateway::{CatalogGateway, TransportError};
use shaft_engines::normalizer::{missing_required, normalize};

use crate::submission::{FlowError, SubmissionFlow, SubmissionState, SubmitTicket};

/// One user's form: the current selection, its latest normalization, and the
/// submission flow. Edits are applied strictly in arrival order.
#[derive(Debug, Clone)]
pub struct FormSession {
    current: NormalizeOutput,
    flow: SubmissionFlow,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    pub fn new() -> Self {
        Self::from_selection(&Selection::empty())
    }

    pub fn from_selection(selection: &Selection) -> Self {
        Self {
            current: normalize(selection),
            flow: SubmissionFlow::new(),
        }
    }

    /// Applies one edit on top of the canonical selection and re-normalizes.
    pub fn apply_edit(&mut self, edit: FieldEdit) -> &NormalizeOutput {
        let next = self.current.canonical.clone().with(edit);
        self.current = normalize(&next);
        &self.current
    }

    pub fn apply_input(&mut self, field: FieldId, raw: &str) -> &NormalizeOutput {
        self.apply_edit(FieldEdit::from_input(field, raw))
    }

    pub fn current(&self) -> &NormalizeOutput {
        &self.current
    }

    pub fn missing_required(&self) -> Vec<FieldId> {
        missing_required(&self.current.canonical, &self.current.directives)
    }

    pub fn submit(&mut self, gateway: &impl CatalogGateway) -> Result<&SubmissionState, FlowError> {
        let snapshot = self.current.canonical.clone();
        self.flow.submit(gateway, &snapshot)
    }

    /// Snapshots the current selection for a matcher call made elsewhere.
    /// Edits may continue while the ticket is outstanding.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, FlowError> {
        let snapshot = self.current.canonical.clone();
        self.flow.begin_submit(&snapshot)
    }

    pub fn complete_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<MatcherResponse, TransportError>,
    ) -> bool {
        self.flow.complete_submit(ticket, result)
    }

    pub fn export(&self, gateway: &impl CatalogGateway) -> Result<ExportDocument, FlowError> {
        self.flow.export(gateway)
    }

    pub fn flow(&self) -> &SubmissionFlow {
        &self.flow
    }
}
