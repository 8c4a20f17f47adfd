#![forbid(unsafe_code)]

//! Closed enumerations of the ventilation-shaft catalog.
//!
//! Every member carries a short wire code (what the matcher service expects) and
//! a set of input aliases: the English variant name and the Russian form label.
//! Parsing user input never fails; unknown text is `None` (Unset).

use serde::{Deserialize, Serialize};

/// Shared behaviour of the enumerated selection fields.
pub trait Vocabulary: Copy + PartialEq + Sized + 'static {
    const ALL: &'static [Self];

    fn code(self) -> &'static str;

    fn aliases(self) -> &'static [&'static str];

    fn from_code(code: &str) -> Option<Self> {
        let code = fold_input(code);
        Self::ALL
            .iter()
            .copied()
            .find(|v| fold_input(v.code()) == code)
    }

    /// Accepts the wire code, the English name or the form label.
    fn parse_input(raw: &str) -> Option<Self> {
        let token = fold_input(raw);
        if token.is_empty() {
            return None;
        }
        Self::ALL.iter().copied().find(|v| {
            fold_input(v.code()) == token || v.aliases().iter().any(|a| fold_input(a) == token)
        })
    }

    fn codes() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.code()).collect()
    }
}

/// Lowercases, collapses whitespace and folds the Cyrillic `е` into Latin `e`
/// (catalog data writes motor codes like `6е` in either script).
pub fn fold_input(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace('е', "e")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Exhaust,
    SupplyActive,
    SupplyPassive,
    SupplyMixed,
}

impl ProductType {
    pub fn is_supply(self) -> bool {
        !matches!(self, Self::Exhaust)
    }
}

impl Vocabulary for ProductType {
    const ALL: &'static [Self] = &[
        Self::Exhaust,
        Self::SupplyActive,
        Self::SupplyPassive,
        Self::SupplyMixed,
    ];

    fn code(self) -> &'static str {
        match self {
            Self::Exhaust => "VBV",
            Self::SupplyActive => "VBA",
            Self::SupplyPassive => "VBP",
            Self::SupplyMixed => "VBR",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Exhaust => &["exhaust", "вытяжная"],
            Self::SupplyActive => &["supply_active", "приточная активная"],
            Self::SupplyPassive => &["supply_passive", "приточная пассивная"],
            Self::SupplyMixed => &[
                "supply_mixed",
                "приточная с подмешиванием",
                "подмешивающая",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValveKind {
    Rotary,
    Gravity,
    DoubleFlap,
}

impl ValveKind {
    /// Rotary and gravity valves carry a motor, mount kit and crown ring.
    pub fn is_mechanised(self) -> bool {
        matches!(self, Self::Rotary | Self::Gravity)
    }
}

impl Vocabulary for ValveKind {
    const ALL: &'static [Self] = &[Self::Rotary, Self::Gravity, Self::DoubleFlap];

    fn code(self) -> &'static str {
        match self {
            Self::Rotary => "pov",
            Self::Gravity => "grav",
            Self::DoubleFlap => "dvustv",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Rotary => &["rotary", "поворотный"],
            Self::Gravity => &["gravity", "гравитационный", "гравитац."],
            Self::DoubleFlap => &["double_flap", "двустворчатый"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValvePosition {
    Bottom,
    Top,
}

impl Vocabulary for ValvePosition {
    const ALL: &'static [Self] = &[Self::Bottom, Self::Top];

    fn code(self) -> &'static str {
        match self {
            Self::Bottom => "niz",
            Self::Top => "verh",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Bottom => &["bottom", "низ"],
            Self::Top => &["top", "верх"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GravityVariant {
    Internal,
    External,
}

impl Vocabulary for GravityVariant {
    const ALL: &'static [Self] = &[Self::Internal, Self::External];

    fn code(self) -> &'static str {
        match self {
            Self::Internal => "vnut",
            Self::External => "vnesh",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Internal => &["internal", "внутренний"],
            Self::External => &["external", "внешний"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorType {
    SinglePhase,
    ThreePhase,
}

impl Vocabulary for MotorType {
    const ALL: &'static [Self] = &[Self::SinglePhase, Self::ThreePhase];

    fn code(self) -> &'static str {
        match self {
            Self::SinglePhase => "6e",
            Self::ThreePhase => "6d",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::SinglePhase => &["single_phase", "однофазный", "6e (однофазный)"],
            Self::ThreePhase => &[
                "three_phase",
                "трёхфазный",
                "трехфазный",
                "6d (трёхфазный)",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerRating {
    W370,
    W750,
}

impl PowerRating {
    pub fn watts(self) -> u16 {
        match self {
            Self::W370 => 370,
            Self::W750 => 750,
        }
    }
}

impl Vocabulary for PowerRating {
    const ALL: &'static [Self] = &[Self::W370, Self::W750];

    fn code(self) -> &'static str {
        match self {
            Self::W370 => "370",
            Self::W750 => "750",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::W370 => &["w370", "370w", "370 вт"],
            Self::W750 => &["w750", "750w", "750 вт"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopPart {
    Umbrella,
    Bellmouth,
}

impl Vocabulary for TopPart {
    const ALL: &'static [Self] = &[Self::Umbrella, Self::Bellmouth];

    fn code(self) -> &'static str {
        match self {
            Self::Umbrella => "zont",
            Self::Bellmouth => "rastrub",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Umbrella => &["umbrella", "зонт"],
            Self::Bellmouth => &["bellmouth", "раструб"],
        }
    }
}

/// Nominal duct diameter in millimetres, restricted to the catalog series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Diameter(u16);

impl Diameter {
    pub const SERIES_MM: [u16; 12] = [160, 200, 250, 315, 355, 400, 450, 500, 560, 630, 710, 800];

    pub fn new(mm: u16) -> Option<Self> {
        Self::SERIES_MM.contains(&mm).then_some(Self(mm))
    }

    pub fn mm(self) -> u16 {
        self.0
    }

    pub fn series() -> impl Iterator<Item = Diameter> {
        Self::SERIES_MM.iter().map(|mm| Diameter(*mm))
    }

    /// Accepts `710`, `710mm`, `710 мм`, `Ø710`.
    pub fn parse_input(raw: &str) -> Option<Self> {
        let token = fold_input(raw);
        let digits = token
            .trim_start_matches('ø')
            .trim_end_matches("mm")
            .trim_end_matches("мм")
            .trim();
        digits.parse::<u16>().ok().and_then(Self::new)
    }

    pub fn code(self) -> String {
        self.0.to_string()
    }
}

impl TryFrom<u16> for Diameter {
    type Error = String;

    fn try_from(mm: u16) -> Result<Self, Self::Error> {
        Self::new(mm).ok_or_else(|| format!("diameter {mm} is not in the catalog series"))
    }
}

impl From<Diameter> for u16 {
    fn from(d: Diameter) -> Self {
        d.0
    }
}
