#![forbid(unsafe_code)]

//! Resolves any selection into a canonical one plus field directives.
//!
//! Rules run in a fixed order; each later rule only reads fields earlier rules
//! have already settled, so a single pass is enough and a second pass is a no-op.

use shaft_contracts::{
    Coercion, ContractViolation, Diameter, FieldDirective, FieldDirectives, FieldId,
    GravityVariant, MotorType, NormalizeOutput, PowerRating, ProductType, ReasonCodeId, Selection,
    TopPart, ValveKind, ValvePosition, Vocabulary,
};

use crate::constraint_table::{forced_power, rules_for, ProductRules};

pub mod reason_codes {
    use shaft_contracts::ReasonCodeId;

    // Normalizer reason-code namespace.
    pub const N_VALVE_KIND_FORCED: ReasonCodeId = ReasonCodeId(0x5348_0001);
    pub const N_VALVE_KIND_COERCED: ReasonCodeId = ReasonCodeId(0x5348_0002);
    pub const N_VALVE_POSITION_FORCED: ReasonCodeId = ReasonCodeId(0x5348_0003);
    pub const N_VALVE_POSITION_CLEARED: ReasonCodeId = ReasonCodeId(0x5348_0004);
    pub const N_GRAVITY_VARIANT_CLEARED: ReasonCodeId = ReasonCodeId(0x5348_0005);
    pub const N_TOP_PART_FORCED: ReasonCodeId = ReasonCodeId(0x5348_0006);
    pub const N_MOTOR_CLEARED: ReasonCodeId = ReasonCodeId(0x5348_0007);
    pub const N_POWER_FORCED_BY_DIAMETER: ReasonCodeId = ReasonCodeId(0x5348_0008);
    pub const N_CROWN_RING_INELIGIBLE: ReasonCodeId = ReasonCodeId(0x5348_0009);
    pub const N_MOUNT_KIT_INELIGIBLE: ReasonCodeId = ReasonCodeId(0x5348_000A);
    pub const N_EXTENSION_CLAMPED: ReasonCodeId = ReasonCodeId(0x5348_000B);
}

/// Never fails: every input resolves to a consistent selection.
pub fn normalize(raw: &Selection) -> NormalizeOutput {
    let mut s = raw.clone();
    let mut coercions = Vec::new();
    let rules = rules_for(s.product_type);

    resolve_valve_kind(&mut s, rules, &mut coercions);
    gate_valve_details(&mut s, rules, &mut coercions);
    force_top_part(&mut s, rules, &mut coercions);
    gate_motor(&mut s, rules, &mut coercions);
    force_power(&mut s, rules, &mut coercions);
    gate_accessories(&mut s, rules, &mut coercions);
    clamp_extension(&mut s, &mut coercions);

    let directives = directives_for(&s);
    NormalizeOutput::v1(s, directives, coercions)
}

fn note(coercions: &mut Vec<Coercion>, field: FieldId, reason_code: ReasonCodeId) {
    coercions.push(Coercion { field, reason_code });
}

fn resolve_valve_kind(s: &mut Selection, rules: &ProductRules, coercions: &mut Vec<Coercion>) {
    if let Some(forced) = rules.forced_valve_kind {
        if s.valve_kind != Some(forced) {
            s.valve_kind = Some(forced);
            note(coercions, FieldId::ValveKind, reason_codes::N_VALVE_KIND_FORCED);
        }
        return;
    }
    if let Some(kind) = s.valve_kind {
        if !rules.allows_valve(kind) {
            s.valve_kind = Some(rules.fallback_valve_kind());
            note(coercions, FieldId::ValveKind, reason_codes::N_VALVE_KIND_COERCED);
        }
    }
}

fn gate_valve_details(s: &mut Selection, rules: &ProductRules, coercions: &mut Vec<Coercion>) {
    if s.valve_kind == Some(ValveKind::Rotary) {
        if let Some(forced) = rules.forced_valve_position {
            if s.valve_position != Some(forced) {
                s.valve_position = Some(forced);
                note(
                    coercions,
                    FieldId::ValvePosition,
                    reason_codes::N_VALVE_POSITION_FORCED,
                );
            }
        }
    } else if s.valve_position.take().is_some() {
        note(
            coercions,
            FieldId::ValvePosition,
            reason_codes::N_VALVE_POSITION_CLEARED,
        );
    }

    if s.valve_kind != Some(ValveKind::Gravity) && s.gravity_variant.take().is_some() {
        note(
            coercions,
            FieldId::GravityVariant,
            reason_codes::N_GRAVITY_VARIANT_CLEARED,
        );
    }
}

fn force_top_part(s: &mut Selection, rules: &ProductRules, coercions: &mut Vec<Coercion>) {
    if let Some(forced) = rules.forced_top_part {
        if s.top_part != Some(forced) {
            s.top_part = Some(forced);
            note(coercions, FieldId::TopPart, reason_codes::N_TOP_PART_FORCED);
        }
    }
}

fn gate_motor(s: &mut Selection, rules: &ProductRules, coercions: &mut Vec<Coercion>) {
    if rules.motor_eligible(s.valve_kind) {
        return;
    }
    if s.motor_type.take().is_some() {
        note(coercions, FieldId::MotorType, reason_codes::N_MOTOR_CLEARED);
    }
    if s.power.take().is_some() {
        note(coercions, FieldId::Power, reason_codes::N_MOTOR_CLEARED);
    }
}

fn force_power(s: &mut Selection, rules: &ProductRules, coercions: &mut Vec<Coercion>) {
    if !rules.motor_eligible(s.valve_kind) {
        return;
    }
    if let Some(forced) = s.diameter.and_then(forced_power) {
        if s.power != Some(forced) {
            s.power = Some(forced);
            note(
                coercions,
                FieldId::Power,
                reason_codes::N_POWER_FORCED_BY_DIAMETER,
            );
        }
    }
}

fn gate_accessories(s: &mut Selection, rules: &ProductRules, coercions: &mut Vec<Coercion>) {
    if s.has_crown_ring && !rules.crown_eligible(s.valve_kind) {
        s.has_crown_ring = false;
        note(
            coercions,
            FieldId::CrownRing,
            reason_codes::N_CROWN_RING_INELIGIBLE,
        );
    }
    if s.has_mount_kit && !rules.mount_eligible(s.valve_kind) {
        s.has_mount_kit = false;
        note(
            coercions,
            FieldId::MountKit,
            reason_codes::N_MOUNT_KIT_INELIGIBLE,
        );
    }
}

fn clamp_extension(s: &mut Selection, coercions: &mut Vec<Coercion>) {
    if !s.extension_meters.is_finite() || s.extension_meters < 0.0 {
        s.extension_meters = 0.0;
        note(
            coercions,
            FieldId::ExtensionMeters,
            reason_codes::N_EXTENSION_CLAMPED,
        );
    }
}

fn codes<T: Vocabulary>(values: &[T]) -> Vec<String> {
    values.iter().map(|v| v.code().to_string()).collect()
}

fn pinned_off() -> FieldDirective {
    FieldDirective {
        forced_value: Some("false".to_string()),
        ..FieldDirective::hidden()
    }
}

/// Directives are a pure function of an already canonical selection.
pub fn directives_for(s: &Selection) -> FieldDirectives {
    let rules = rules_for(s.product_type);
    let motor = rules.motor_eligible(s.valve_kind);

    let valve_kind = match rules.forced_valve_kind {
        Some(forced) => FieldDirective::locked(forced.code().to_string()),
        None => FieldDirective::open(true, codes(rules.allowed_valve_kinds)),
    };

    let valve_position = match (s.valve_kind, rules.forced_valve_position) {
        (Some(ValveKind::Rotary), Some(forced)) => FieldDirective::locked(forced.code().to_string()),
        (Some(ValveKind::Rotary), None) => FieldDirective::open(true, codes(ValvePosition::ALL)),
        _ => FieldDirective::hidden(),
    };

    let gravity_variant = if s.valve_kind == Some(ValveKind::Gravity) {
        FieldDirective::open(true, codes(GravityVariant::ALL))
    } else {
        FieldDirective::hidden()
    };

    let (motor_type, power) = if motor {
        let power = match s.diameter.and_then(forced_power) {
            Some(forced) => FieldDirective::locked(forced.code().to_string()),
            None => FieldDirective::open(true, codes(PowerRating::ALL)),
        };
        (FieldDirective::open(true, codes(MotorType::ALL)), power)
    } else {
        (FieldDirective::disabled(), FieldDirective::disabled())
    };

    let top_part = match rules.forced_top_part {
        Some(forced) => FieldDirective::locked(forced.code().to_string()),
        None => FieldDirective::open(true, codes(TopPart::ALL)),
    };

    let mount_kit = if rules.mount_eligible(s.valve_kind) {
        FieldDirective::open(false, Vec::new())
    } else {
        pinned_off()
    };

    let crown_ring = if rules.crown_eligible(s.valve_kind) {
        FieldDirective::open(false, Vec::new())
    } else {
        pinned_off()
    };

    FieldDirectives {
        product_type: FieldDirective::open(true, codes(ProductType::ALL)),
        diameter: FieldDirective::open(true, Diameter::series().map(Diameter::code).collect()),
        valve_kind,
        valve_position,
        gravity_variant,
        motor_type,
        power,
        top_part,
        mount_kit,
        crown_ring,
    }
}

/// Fields whose directive says required but whose value is still Unset.
pub fn missing_required(s: &Selection, directives: &FieldDirectives) -> Vec<FieldId> {
    directives
        .iter()
        .filter(|(_, d)| d.required)
        .map(|(field, _)| field)
        .filter(|field| !is_set(s, *field))
        .collect()
}

fn is_set(s: &Selection, field: FieldId) -> bool {
    match field {
        FieldId::ProductType => s.product_type.is_some(),
        FieldId::Diameter => s.diameter.is_some(),
        FieldId::ValveKind => s.valve_kind.is_some(),
        FieldId::ValvePosition => s.valve_position.is_some(),
        FieldId::GravityVariant => s.gravity_variant.is_some(),
        FieldId::MotorType => s.motor_type.is_some(),
        FieldId::Power => s.power.is_some(),
        FieldId::TopPart => s.top_part.is_some(),
        _ => true,
    }
}

/// Checks every canonical-selection invariant against the constraint table.
pub fn check_canonical(s: &Selection) -> Result<(), ContractViolation> {
    let rules = rules_for(s.product_type);
    let fail = |field: &'static str, reason: &'static str| {
        Err(ContractViolation::InvalidValue { field, reason })
    };

    if s.valve_kind != Some(ValveKind::Rotary) && s.valve_position.is_some() {
        return fail("selection.valve_position", "must be Unset unless valve is rotary");
    }
    if s.valve_kind != Some(ValveKind::Gravity) && s.gravity_variant.is_some() {
        return fail("selection.gravity_variant", "must be Unset unless valve is gravity");
    }
    if let Some(kind) = s.valve_kind {
        if !rules.allows_valve(kind) {
            return fail("selection.valve_kind", "not allowed for product type");
        }
    }
    if let Some(forced) = rules.forced_valve_kind {
        if s.valve_kind != Some(forced) {
            return fail("selection.valve_kind", "must equal the forced valve kind");
        }
    }
    if let (Some(ValveKind::Rotary), Some(forced)) = (s.valve_kind, rules.forced_valve_position) {
        if s.valve_position != Some(forced) {
            return fail("selection.valve_position", "must equal the forced position");
        }
    }
    if let Some(forced) = rules.forced_top_part {
        if s.top_part != Some(forced) {
            return fail("selection.top_part", "must equal the forced top part");
        }
    }
    let motor = rules.motor_eligible(s.valve_kind);
    if !motor && (s.motor_type.is_some() || s.power.is_some()) {
        return fail("selection.motor_type", "motor fields must be cleared");
    }
    if motor {
        if let Some(forced) = s.diameter.and_then(forced_power) {
            if s.power != Some(forced) {
                return fail("selection.power", "must equal the power forced by diameter");
            }
        }
    }
    if s.has_crown_ring && !rules.crown_eligible(s.valve_kind) {
        return fail("selection.has_crown_ring", "not eligible for type and valve");
    }
    if s.has_mount_kit && !rules.mount_eligible(s.valve_kind) {
        return fail("selection.has_mount_kit", "not eligible for type and valve");
    }
    if !s.extension_meters.is_finite() || s.extension_meters < 0.0 {
        return fail("selection.extension_meters", "must be a finite number >= 0");
    }
    Ok(())
}
