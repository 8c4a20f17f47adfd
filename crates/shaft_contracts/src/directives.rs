#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::selection::{FieldId, Selection};
use crate::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};

pub const SHAFT_NORMALIZE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// How the form should present one gated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDirective {
    pub visible: bool,
    pub required: bool,
    pub editable: bool,
    /// Wire code of the value the field is pinned to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_value: Option<String>,
    /// Options the user may pick. Empty for checkboxes.
    #[serde(default)]
    pub allowed_values: Vec<String>,
}

impl FieldDirective {
    pub fn open(required: bool, allowed_values: Vec<String>) -> Self {
        Self {
            visible: true,
            required,
            editable: true,
            forced_value: None,
            allowed_values,
        }
    }

    pub fn locked(forced_value: String) -> Self {
        Self {
            visible: true,
            required: true,
            editable: false,
            allowed_values: vec![forced_value.clone()],
            forced_value: Some(forced_value),
        }
    }

    /// Shown but greyed out and cleared.
    pub fn disabled() -> Self {
        Self {
            visible: true,
            required: false,
            editable: false,
            forced_value: None,
            allowed_values: Vec::new(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::disabled()
        }
    }
}

impl Validate for FieldDirective {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.required && !self.visible {
            return Err(ContractViolation::InvalidValue {
                field: "field_directive.required",
                reason: "a hidden field cannot be required",
            });
        }
        if let Some(forced) = &self.forced_value {
            if self.editable {
                return Err(ContractViolation::InvalidValue {
                    field: "field_directive.editable",
                    reason: "a forced field must not be editable",
                });
            }
            if !self.allowed_values.is_empty() && !self.allowed_values.contains(forced) {
                return Err(ContractViolation::InvalidValue {
                    field: "field_directive.forced_value",
                    reason: "must be one of allowed_values",
                });
            }
        }
        Ok(())
    }
}

/// Directive set for every gated field. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDirectives {
    pub product_type: FieldDirective,
    pub diameter: FieldDirective,
    pub valve_kind: FieldDirective,
    pub valve_position: FieldDirective,
    pub gravity_variant: FieldDirective,
    pub motor_type: FieldDirective,
    pub power: FieldDirective,
    pub top_part: FieldDirective,
    pub mount_kit: FieldDirective,
    pub crown_ring: FieldDirective,
}

impl FieldDirectives {
    pub fn get(&self, field: FieldId) -> Option<&FieldDirective> {
        match field {
            FieldId::ProductType => Some(&self.product_type),
            FieldId::Diameter => Some(&self.diameter),
            FieldId::ValveKind => Some(&self.valve_kind),
            FieldId::ValvePosition => Some(&self.valve_position),
            FieldId::GravityVariant => Some(&self.gravity_variant),
            FieldId::MotorType => Some(&self.motor_type),
            FieldId::Power => Some(&self.power),
            FieldId::TopPart => Some(&self.top_part),
            FieldId::MountKit => Some(&self.mount_kit),
            FieldId::CrownRing => Some(&self.crown_ring),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &FieldDirective)> {
        FieldId::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|d| (field, d)))
    }
}

impl Validate for FieldDirectives {
    fn validate(&self) -> Result<(), ContractViolation> {
        for (_, directive) in self.iter() {
            directive.validate()?;
        }
        Ok(())
    }
}

/// A value the Normalizer changed while resolving a contradiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coercion {
    pub field: FieldId,
    pub reason_code: ReasonCodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOutput {
    pub schema_version: SchemaVersion,
    pub canonical: Selection,
    pub directives: FieldDirectives,
    pub coercions: Vec<Coercion>,
}

impl NormalizeOutput {
    pub fn v1(canonical: Selection, directives: FieldDirectives, coercions: Vec<Coercion>) -> Self {
        Self {
            schema_version: SHAFT_NORMALIZE_CONTRACT_VERSION,
            canonical,
            directives,
            coercions,
        }
    }
}

impl Validate for NormalizeOutput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != SHAFT_NORMALIZE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "normalize_output.schema_version",
                reason: "must match SHAFT_NORMALIZE_CONTRACT_VERSION",
            });
        }
        self.canonical.validate()?;
        self.directives.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_dir_01_locked_directive_is_consistent() {
        let d = FieldDirective::locked("niz".to_string());
        assert!(d.visible && d.required && !d.editable);
        assert_eq!(d.allowed_values, vec!["niz".to_string()]);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn at_dir_02_required_hidden_field_is_rejected() {
        let d = FieldDirective {
            required: true,
            ..FieldDirective::hidden()
        };
        assert!(d.validate().is_err());
    }

    #[test]
    fn at_dir_03_editable_forced_field_is_rejected() {
        let d = FieldDirective {
            editable: true,
            ..FieldDirective::locked("750".to_string())
        };
        assert!(d.validate().is_err());
    }

    #[test]
    fn at_dir_04_forced_serialization_omits_absent_value() {
        let json = serde_json::to_value(FieldDirective::disabled()).unwrap();
        assert!(json.get("forced_value").is_none());
        assert_eq!(json["editable"], serde_json::json!(false));
    }
}
