#![forbid(unsafe_code)]

//! Maps a canonical selection onto the matcher's wire payload.

use shaft_contracts::wire::{MatcherPayload, Sealing};
use shaft_contracts::{Selection, Vocabulary};

use crate::constraint_table::rules_for;

fn code_or_empty<T: Vocabulary>(value: Option<T>) -> String {
    value.map(|v| v.code().to_string()).unwrap_or_default()
}

/// Encodes the selection as the matcher expects it.
///
/// Crown-ring and mount-kit flags are re-checked against the constraint table
/// here, so a stale `true` never reaches the matcher even if the input skipped
/// normalization.
pub fn encode(s: &Selection) -> MatcherPayload {
    let rules = rules_for(s.product_type);
    let udlinenie_m = if s.extension_meters.is_finite() && s.extension_meters > 0.0 {
        s.extension_meters
    } else {
        0.0
    };

    MatcherPayload {
        tip: code_or_empty(s.product_type),
        diametr: s.diameter.map(|d| d.code()).unwrap_or_default(),
        tip_klapana: code_or_empty(s.valve_kind),
        raspolozhenie: code_or_empty(s.valve_position),
        grav_variant: code_or_empty(s.gravity_variant),
        tip_motora: code_or_empty(s.motor_type),
        moshchnost: code_or_empty(s.power),
        verhnyaya_chast: code_or_empty(s.top_part),
        germetizatsiya: Sealing {
            membrana: s.sealing_membrane,
            lenta: s.sealing_tape,
        },
        avtomat: s.has_automatic_damper,
        kapleulavlivatel: s.has_drop_catcher,
        montazhny_komplekt: s.has_mount_kit && rules.mount_eligible(s.valve_kind),
        korona: s.has_crown_ring && rules.crown_eligible(s.valve_kind),
        udlinenie_m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use shaft_contracts::{
        Diameter, FieldEdit, GravityVariant, MotorType, PowerRating, ProductType, TopPart,
        ValveKind, ValvePosition,
    };

    #[test]
    fn at_codec_01_empty_selection_encodes_blank_codes() {
        let p = encode(&Selection::empty());
        assert_eq!(p, MatcherPayload::default());
    }

    #[test]
    fn at_codec_02_end_to_end_exhaust_710() {
        let s = Selection::empty()
            .with(FieldEdit::ProductType(Some(ProductType::Exhaust)))
            .with(FieldEdit::Diameter(Diameter::new(710)))
            .with(FieldEdit::ValveKind(Some(ValveKind::Rotary)))
            .with(FieldEdit::ValvePosition(Some(ValvePosition::Bottom)))
            .with(FieldEdit::MotorType(Some(MotorType::ThreePhase)))
            .with(FieldEdit::TopPart(Some(TopPart::Umbrella)))
            .with(FieldEdit::DropCatcher(true))
            .with(FieldEdit::ExtensionMeters(1.5));
        let p = encode(&normalize(&s).canonical);
        assert_eq!(p.tip, "VBV");
        assert_eq!(p.diametr, "710");
        assert_eq!(p.tip_klapana, "pov");
        assert_eq!(p.raspolozhenie, "niz");
        assert_eq!(p.grav_variant, "");
        assert_eq!(p.tip_motora, "6d");
        assert_eq!(p.moshchnost, "370");
        assert_eq!(p.verhnyaya_chast, "zont");
        assert!(p.kapleulavlivatel);
        assert!(!p.korona);
        assert_eq!(p.udlinenie_m, 1.5);
    }

    #[test]
    fn at_codec_03_crown_ring_rechecked_without_normalization() {
        let raw = Selection::empty()
            .with(FieldEdit::ProductType(Some(ProductType::Exhaust)))
            .with(FieldEdit::ValveKind(Some(ValveKind::Rotary)))
            .with(FieldEdit::CrownRing(true))
            .with(FieldEdit::MountKit(true));
        let p = encode(&raw);
        assert!(!p.korona);
        assert!(p.montazhny_komplekt);

        let double_flap = raw.with(FieldEdit::ValveKind(Some(ValveKind::DoubleFlap)));
        assert!(!encode(&double_flap).montazhny_komplekt);
    }

    #[test]
    fn at_codec_04_supply_passive_gravity_keeps_crown_ring() {
        let s = Selection::empty()
            .with(FieldEdit::ProductType(Some(ProductType::SupplyPassive)))
            .with(FieldEdit::ValveKind(Some(ValveKind::Gravity)))
            .with(FieldEdit::GravityVariant(Some(GravityVariant::External)))
            .with(FieldEdit::CrownRing(true))
            .with(FieldEdit::SealingTape(true));
        let p = encode(&normalize(&s).canonical);
        assert_eq!(p.tip, "VBP");
        assert_eq!(p.tip_klapana, "grav");
        assert_eq!(p.grav_variant, "vnesh");
        assert!(p.korona);
        assert!(p.germetizatsiya.lenta);
        assert!(!p.germetizatsiya.membrana);
        assert_eq!(p.moshchnost, "");
    }

    #[test]
    fn at_codec_05_non_finite_extension_sent_as_zero() {
        let mut s = Selection::empty();
        s.extension_meters = f64::NAN;
        assert_eq!(encode(&s).udlinenie_m, 0.0);
        s.extension_meters = -2.0;
        assert_eq!(encode(&s).udlinenie_m, 0.0);
    }

    #[test]
    fn at_codec_06_power_code_is_wattage() {
        let s = Selection::empty().with(FieldEdit::Power(Some(PowerRating::W750)));
        assert_eq!(encode(&s).moshchnost, "750");
    }
}
