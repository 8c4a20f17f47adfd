#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::vocabulary::{
    fold_input, Diameter, GravityVariant, MotorType, PowerRating, ProductType, TopPart, ValveKind,
    ValvePosition, Vocabulary,
};
use crate::{ContractViolation, Validate};

/// One field of the configuration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    ProductType,
    Diameter,
    ValveKind,
    ValvePosition,
    GravityVariant,
    MotorType,
    Power,
    TopPart,
    SealingMembrane,
    SealingTape,
    AutomaticDamper,
    DropCatcher,
    MountKit,
    CrownRing,
    ExtensionMeters,
}

impl FieldId {
    pub const ALL: [FieldId; 15] = [
        FieldId::ProductType,
        FieldId::Diameter,
        FieldId::ValveKind,
        FieldId::ValvePosition,
        FieldId::GravityVariant,
        FieldId::MotorType,
        FieldId::Power,
        FieldId::TopPart,
        FieldId::SealingMembrane,
        FieldId::SealingTape,
        FieldId::AutomaticDamper,
        FieldId::DropCatcher,
        FieldId::MountKit,
        FieldId::CrownRing,
        FieldId::ExtensionMeters,
    ];

    /// Key of the field in the matcher payload.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::ProductType => "tip",
            Self::Diameter => "diametr",
            Self::ValveKind => "tip_klapana",
            Self::ValvePosition => "raspolozhenie",
            Self::GravityVariant => "grav_variant",
            Self::MotorType => "tip_motora",
            Self::Power => "moshchnost",
            Self::TopPart => "verhnyaya_chast",
            Self::SealingMembrane => "membrana",
            Self::SealingTape => "lenta",
            Self::AutomaticDamper => "avtomat",
            Self::DropCatcher => "kapleulavlivatel",
            Self::MountKit => "montazhny_komplekt",
            Self::CrownRing => "korona",
            Self::ExtensionMeters => "udlinenie_m",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductType => "product_type",
            Self::Diameter => "diameter",
            Self::ValveKind => "valve_kind",
            Self::ValvePosition => "valve_position",
            Self::GravityVariant => "gravity_variant",
            Self::MotorType => "motor_type",
            Self::Power => "power",
            Self::TopPart => "top_part",
            Self::SealingMembrane => "sealing_membrane",
            Self::SealingTape => "sealing_tape",
            Self::AutomaticDamper => "has_automatic_damper",
            Self::DropCatcher => "has_drop_catcher",
            Self::MountKit => "has_mount_kit",
            Self::CrownRing => "has_crown_ring",
            Self::ExtensionMeters => "extension_meters",
        }
    }

    /// Resolves either the field name or the wire key.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == token || f.wire_name() == token)
    }
}

/// User-facing configuration request. `None` means Unset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub product_type: Option<ProductType>,
    pub diameter: Option<Diameter>,
    pub valve_kind: Option<ValveKind>,
    pub valve_position: Option<ValvePosition>,
    pub gravity_variant: Option<GravityVariant>,
    pub motor_type: Option<MotorType>,
    pub power: Option<PowerRating>,
    pub top_part: Option<TopPart>,
    pub sealing_membrane: bool,
    pub sealing_tape: bool,
    pub has_automatic_damper: bool,
    pub has_drop_catcher: bool,
    pub has_mount_kit: bool,
    pub has_crown_ring: bool,
    pub extension_meters: f64,
}

impl Selection {
    /// Session-start state: everything Unset, false or zero.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, edit: FieldEdit) -> Self {
        self.apply(edit);
        self
    }

    pub fn apply(&mut self, edit: FieldEdit) {
        match edit {
            FieldEdit::ProductType(v) => self.product_type = v,
            FieldEdit::Diameter(v) => self.diameter = v,
            FieldEdit::ValveKind(v) => self.valve_kind = v,
            FieldEdit::ValvePosition(v) => self.valve_position = v,
            FieldEdit::GravityVariant(v) => self.gravity_variant = v,
            FieldEdit::MotorType(v) => self.motor_type = v,
            FieldEdit::Power(v) => self.power = v,
            FieldEdit::TopPart(v) => self.top_part = v,
            FieldEdit::SealingMembrane(v) => self.sealing_membrane = v,
            FieldEdit::SealingTape(v) => self.sealing_tape = v,
            FieldEdit::AutomaticDamper(v) => self.has_automatic_damper = v,
            FieldEdit::DropCatcher(v) => self.has_drop_catcher = v,
            FieldEdit::MountKit(v) => self.has_mount_kit = v,
            FieldEdit::CrownRing(v) => self.has_crown_ring = v,
            FieldEdit::ExtensionMeters(v) => self.extension_meters = v,
        }
    }
}

impl Validate for Selection {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !self.extension_meters.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "selection.extension_meters",
            });
        }
        if self.extension_meters < 0.0 {
            return Err(ContractViolation::InvalidRange {
                field: "selection.extension_meters",
                min: 0.0,
                max: f64::MAX,
                got: self.extension_meters,
            });
        }
        Ok(())
    }
}

/// A single field change coming from the form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldEdit {
    ProductType(Option<ProductType>),
    Diameter(Option<Diameter>),
    ValveKind(Option<ValveKind>),
    ValvePosition(Option<ValvePosition>),
    GravityVariant(Option<GravityVariant>),
    MotorType(Option<MotorType>),
    Power(Option<PowerRating>),
    TopPart(Option<TopPart>),
    SealingMembrane(bool),
    SealingTape(bool),
    AutomaticDamper(bool),
    DropCatcher(bool),
    MountKit(bool),
    CrownRing(bool),
    ExtensionMeters(f64),
}

impl FieldEdit {
    /// Builds an edit from raw form text. Unrecognised values become Unset,
    /// `false` or `0`; the Normalizer resolves the rest.
    pub fn from_input(field: FieldId, raw: &str) -> Self {
        match field {
            FieldId::ProductType => Self::ProductType(ProductType::parse_input(raw)),
            FieldId::Diameter => Self::Diameter(Diameter::parse_input(raw)),
            FieldId::ValveKind => Self::ValveKind(ValveKind::parse_input(raw)),
            FieldId::ValvePosition => Self::ValvePosition(ValvePosition::parse_input(raw)),
            FieldId::GravityVariant => Self::GravityVariant(GravityVariant::parse_input(raw)),
            FieldId::MotorType => Self::MotorType(MotorType::parse_input(raw)),
            FieldId::Power => Self::Power(PowerRating::parse_input(raw)),
            FieldId::TopPart => Self::TopPart(TopPart::parse_input(raw)),
            FieldId::SealingMembrane => Self::SealingMembrane(parse_flag(raw)),
            FieldId::SealingTape => Self::SealingTape(parse_flag(raw)),
            FieldId::AutomaticDamper => Self::AutomaticDamper(parse_flag(raw)),
            FieldId::DropCatcher => Self::DropCatcher(parse_flag(raw)),
            FieldId::MountKit => Self::MountKit(parse_flag(raw)),
            FieldId::CrownRing => Self::CrownRing(parse_flag(raw)),
            FieldId::ExtensionMeters => Self::ExtensionMeters(parse_extension_meters(raw)),
        }
    }

    pub fn field(&self) -> FieldId {
        match self {
            Self::ProductType(_) => FieldId::ProductType,
            Self::Diameter(_) => FieldId::Diameter,
            Self::ValveKind(_) => FieldId::ValveKind,
            Self::ValvePosition(_) => FieldId::ValvePosition,
            Self::GravityVariant(_) => FieldId::GravityVariant,
            Self::MotorType(_) => FieldId::MotorType,
            Self::Power(_) => FieldId::Power,
            Self::TopPart(_) => FieldId::TopPart,
            Self::SealingMembrane(_) => FieldId::SealingMembrane,
            Self::SealingTape(_) => FieldId::SealingTape,
            Self::AutomaticDamper(_) => FieldId::AutomaticDamper,
            Self::DropCatcher(_) => FieldId::DropCatcher,
            Self::MountKit(_) => FieldId::MountKit,
            Self::CrownRing(_) => FieldId::CrownRing,
            Self::ExtensionMeters(_) => FieldId::ExtensionMeters,
        }
    }
}

/// Checkbox semantics: `true`, `1`, `on`, `yes`, `да` are set; anything else is not.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        fold_input(raw).as_str(),
        "true" | "1" | "on" | "yes" | "да" | "checked"
    )
}

/// Free numeric input for the extension length. Accepts a comma decimal
/// separator; non-numeric, negative and non-finite input yields `0`.
pub fn parse_extension_meters(raw: &str) -> f64 {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}
