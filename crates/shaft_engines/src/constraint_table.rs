#![forbid(unsafe_code)]

//! Declarative rule rows keyed by product type.
//!
//! The table is the union of every rule the form ever enforced: valve-kind
//! legality, forced valve/position/top part, and the valve kinds under which
//! the motor, crown-ring and mount-kit fields apply. Nothing here branches on
//! field values beyond a row lookup and a membership test.

use serde::Serialize;
use shaft_contracts::{
    Diameter, GravityVariant, MotorType, PowerRating, ProductType, TopPart, ValveKind,
    ValvePosition, Vocabulary,
};

const ALL_VALVES: &[ValveKind] = &[ValveKind::Rotary, ValveKind::Gravity, ValveKind::DoubleFlap];
const MECHANISED: &[ValveKind] = &[ValveKind::Rotary, ValveKind::Gravity];
const NO_VALVES: &[ValveKind] = &[];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductRules {
    pub product_type: Option<ProductType>,
    pub allowed_valve_kinds: &'static [ValveKind],
    pub forced_valve_kind: Option<ValveKind>,
    pub forced_valve_position: Option<ValvePosition>,
    pub forced_top_part: Option<TopPart>,
    motor_valves: &'static [ValveKind],
    crown_valves: &'static [ValveKind],
    mount_valves: &'static [ValveKind],
}

impl ProductRules {
    pub fn allows_valve(&self, kind: ValveKind) -> bool {
        self.allowed_valve_kinds.contains(&kind)
    }

    /// Replacement for an illegal valve kind: Rotary when allowed, else the
    /// first allowed kind.
    pub fn fallback_valve_kind(&self) -> ValveKind {
        if self.allows_valve(ValveKind::Rotary) {
            ValveKind::Rotary
        } else {
            self.allowed_valve_kinds
                .first()
                .copied()
                .unwrap_or(ValveKind::Rotary)
        }
    }

    pub fn motor_eligible(&self, valve: Option<ValveKind>) -> bool {
        valve.is_some_and(|v| self.motor_valves.contains(&v))
    }

    pub fn crown_eligible(&self, valve: Option<ValveKind>) -> bool {
        valve.is_some_and(|v| self.crown_valves.contains(&v))
    }

    pub fn mount_eligible(&self, valve: Option<ValveKind>) -> bool {
        valve.is_some_and(|v| self.mount_valves.contains(&v))
    }
}

static UNCONSTRAINED: ProductRules = ProductRules {
    product_type: None,
    allowed_valve_kinds: ALL_VALVES,
    forced_valve_kind: None,
    forced_valve_position: None,
    forced_top_part: None,
    motor_valves: NO_VALVES,
    crown_valves: NO_VALVES,
    mount_valves: NO_VALVES,
};

static EXHAUST: ProductRules = ProductRules {
    product_type: Some(ProductType::Exhaust),
    allowed_valve_kinds: ALL_VALVES,
    forced_valve_kind: None,
    forced_valve_position: None,
    forced_top_part: None,
    motor_valves: MECHANISED,
    crown_valves: NO_VALVES,
    mount_valves: MECHANISED,
};

static SUPPLY_ACTIVE: ProductRules = ProductRules {
    product_type: Some(ProductType::SupplyActive),
    allowed_valve_kinds: &[ValveKind::Rotary, ValveKind::DoubleFlap],
    forced_valve_kind: None,
    forced_valve_position: None,
    forced_top_part: Some(TopPart::Umbrella),
    motor_valves: MECHANISED,
    crown_valves: MECHANISED,
    mount_valves: MECHANISED,
};

static SUPPLY_PASSIVE: ProductRules = ProductRules {
    product_type: Some(ProductType::SupplyPassive),
    allowed_valve_kinds: MECHANISED,
    forced_valve_kind: None,
    forced_valve_position: None,
    forced_top_part: Some(TopPart::Umbrella),
    motor_valves: NO_VALVES,
    crown_valves: MECHANISED,
    mount_valves: MECHANISED,
};

static SUPPLY_MIXED: ProductRules = ProductRules {
    product_type: Some(ProductType::SupplyMixed),
    allowed_valve_kinds: &[ValveKind::Rotary],
    forced_valve_kind: Some(ValveKind::Rotary),
    forced_valve_position: Some(ValvePosition::Bottom),
    forced_top_part: Some(TopPart::Umbrella),
    motor_valves: MECHANISED,
    crown_valves: NO_VALVES,
    mount_valves: MECHANISED,
};

/// Rule row for a product type. Unset yields the unconstrained row.
pub fn rules_for(product_type: Option<ProductType>) -> &'static ProductRules {
    match product_type {
        None => &UNCONSTRAINED,
        Some(ProductType::Exhaust) => &EXHAUST,
        Some(ProductType::SupplyActive) => &SUPPLY_ACTIVE,
        Some(ProductType::SupplyPassive) => &SUPPLY_PASSIVE,
        Some(ProductType::SupplyMixed) => &SUPPLY_MIXED,
    }
}

/// Power rating pinned by duct diameter, when the motor fields apply.
pub fn forced_power(diameter: Diameter) -> Option<PowerRating> {
    match diameter.mm() {
        800 => Some(PowerRating::W750),
        560 | 710 => Some(PowerRating::W370),
        _ => None,
    }
}

/// Legal option lists for every enumerated field under one product type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionCatalog {
    pub product_types: Vec<&'static str>,
    pub diameters: Vec<u16>,
    pub valve_kinds: Vec<&'static str>,
    pub valve_positions: Vec<&'static str>,
    pub gravity_variants: Vec<&'static str>,
    pub motor_types: Vec<&'static str>,
    pub powers: Vec<&'static str>,
    pub top_parts: Vec<&'static str>,
}

pub fn option_catalog(product_type: Option<ProductType>) -> OptionCatalog {
    let rules = rules_for(product_type);
    let motor_possible = !rules.motor_valves.is_empty();
    OptionCatalog {
        product_types: ProductType::codes(),
        diameters: Diameter::SERIES_MM.to_vec(),
        valve_kinds: rules.allowed_valve_kinds.iter().map(|v| v.code()).collect(),
        valve_positions: match rules.forced_valve_position {
            Some(p) => vec![p.code()],
            None => ValvePosition::codes(),
        },
        gravity_variants: if rules.allows_valve(ValveKind::Gravity) {
            GravityVariant::codes()
        } else {
            Vec::new()
        },
        motor_types: if motor_possible {
            MotorType::codes()
        } else {
            Vec::new()
        },
        powers: if motor_possible {
            PowerRating::codes()
        } else {
            Vec::new()
        },
        top_parts: match rules.forced_top_part {
            Some(t) => vec![t.code()],
            None => TopPart::codes(),
        },
    }
}
