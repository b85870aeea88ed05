//! Unit normalization and scale conversion.
//!
//! Price lists spell units in many vernacular ways (`m`, `ml`, `mq`, `m²`,
//! `pz`, ...). Everything is folded into a small closed set of
//! [`CanonicalUnit`]s before any quantity is computed. Model quantities are
//! stored at the project's declared scale, which [`detect_scale`] reads from
//! the raw schema label and [`conversion_factor`] turns into a multiplier.

use serde::Serialize;
use std::fmt;

/// Normalized unit family used for quantity computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum CanonicalUnit {
    Length,
    Area,
    Volume,
    Height,
    Count,
    MassKg,
    MassG,
    MassTonne,
    TimeHour,
    /// A non-empty label that matched no synonym. Keeps the original text.
    Unrecognized(String),
}

impl CanonicalUnit {
    /// Short label used in reports.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Length | Self::Height => "m",
            Self::Area => "m2",
            Self::Volume => "m3",
            Self::Count => "pcs",
            Self::MassKg => "kg",
            Self::MassG => "g",
            Self::MassTonne => "t",
            Self::TimeHour => "h",
            Self::Unrecognized(raw) => raw,
        }
    }

    #[must_use]
    pub fn is_mass(&self) -> bool {
        matches!(self, Self::MassKg | Self::MassG | Self::MassTonne)
    }

    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

const LENGTH: &[&str] = &["m", "lm", "lbm", "ml", "meter", "metre", "m1"];
const AREA: &[&str] = &["m2", "m²", "sqm", "mq", "m^2"];
const VOLUME: &[&str] = &["m3", "m³", "mc", "cubicmeter", "m^3", "cbm"];
const COUNT: &[&str] = &["pcs", "pz", "nr", "ud", "unit", "piece"];
const MASS_KG: &[&str] = &["kg", "kilogram"];
const MASS_G: &[&str] = &["g", "gram"];
const MASS_TONNE: &[&str] = &["t", "ton", "tonne"];
const TIME_HOUR: &[&str] = &["h", "hr", "hour", "ore"];
const HEIGHT: &[&str] = &["height"];

const SYNONYMS: &[(&[&str], CanonicalUnit)] = &[
    (LENGTH, CanonicalUnit::Length),
    (AREA, CanonicalUnit::Area),
    (VOLUME, CanonicalUnit::Volume),
    (COUNT, CanonicalUnit::Count),
    (MASS_KG, CanonicalUnit::MassKg),
    (MASS_G, CanonicalUnit::MassG),
    (MASS_TONNE, CanonicalUnit::MassTonne),
    (TIME_HOUR, CanonicalUnit::TimeHour),
    (HEIGHT, CanonicalUnit::Height),
];

/// Maps a raw unit label to its canonical unit.
///
/// Matching is case-insensitive on the trimmed label. An empty label (or the
/// `-` placeholder written by report tools) means "no unit specified" and
/// counts the element as one piece. Any other unknown label is kept as
/// [`CanonicalUnit::Unrecognized`].
///
/// ```
/// use ifc_estimator::units::{normalize, CanonicalUnit};
///
/// assert_eq!(normalize(" MQ "), CanonicalUnit::Area);
/// assert_eq!(normalize(""), CanonicalUnit::Count);
/// assert_eq!(normalize("furlong"), CanonicalUnit::Unrecognized("furlong".into()));
/// ```
#[must_use]
pub fn normalize(raw: &str) -> CanonicalUnit {
    let s = raw.trim().to_lowercase();
    if s.is_empty() || s == "-" {
        return CanonicalUnit::Count;
    }

    SYNONYMS
        .iter()
        .find(|(labels, _)| labels.contains(&s.as_str()))
        .map_or_else(
            || CanonicalUnit::Unrecognized(raw.trim().to_string()),
            |(_, unit)| unit.clone(),
        )
}

/// Scale at which the model stores a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Scale {
    Milli,
    Centi,
    #[default]
    Base,
}

/// Infers the storage scale from a project unit label such as
/// `millimetre`, `centisquare_metre` or `cubic_metre`.
///
/// Labels that mention neither prefix nor metre (imperial units, empty
/// labels) fall back to [`Scale::Base`].
#[must_use]
pub fn detect_scale(declared_project_unit: &str) -> Scale {
    let label = declared_project_unit.trim().to_lowercase();
    if label.contains("milli") || label.starts_with("mm") {
        Scale::Milli
    } else if label.contains("centi") || label.starts_with("cm") {
        Scale::Centi
    } else {
        if !(label.contains("metre") || label.starts_with('m')) {
            tracing::debug!(label = %label, "Unknown project unit label, assuming base scale");
        }
        Scale::Base
    }
}

/// Multiplier converting a value stored at `from_scale` into the canonical
/// unit (m, m2, m3). Families without a metric scale (count, mass, time,
/// unrecognized) convert with factor 1.0.
#[must_use]
pub fn conversion_factor(from_scale: Scale, unit: &CanonicalUnit) -> f64 {
    match (from_scale, unit) {
        (Scale::Milli, CanonicalUnit::Length | CanonicalUnit::Height) => 1e-3,
        (Scale::Milli, CanonicalUnit::Area) => 1e-6,
        (Scale::Milli, CanonicalUnit::Volume) => 1e-9,
        (Scale::Centi, CanonicalUnit::Length | CanonicalUnit::Height) => 1e-2,
        (Scale::Centi, CanonicalUnit::Area) => 1e-4,
        (Scale::Centi, CanonicalUnit::Volume) => 1e-6,
        _ => 1.0,
    }
}

/// The dimensions a project declares units for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dimension {
    Length,
    Area,
    Volume,
}

/// Raw unit labels declared by the model, one per dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectUnits {
    pub length: Option<String>,
    pub area: Option<String>,
    pub volume: Option<String>,
}

impl ProjectUnits {
    #[must_use]
    pub fn label(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Length => self.length.as_deref(),
            Dimension::Area => self.area.as_deref(),
            Dimension::Volume => self.volume.as_deref(),
        }
    }
}

/// Detected scales for each dimension. Height shares the length scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProjectScales {
    pub length: Scale,
    pub area: Scale,
    pub volume: Scale,
}

impl ProjectScales {
    /// Every dimension at the same scale.
    #[must_use]
    pub fn uniform(scale: Scale) -> Self {
        Self {
            length: scale,
            area: scale,
            volume: scale,
        }
    }

    #[must_use]
    pub fn from_units(units: &ProjectUnits) -> Self {
        let scale_of = |dimension| units.label(dimension).map(detect_scale).unwrap_or_default();
        Self {
            length: scale_of(Dimension::Length),
            area: scale_of(Dimension::Area),
            volume: scale_of(Dimension::Volume),
        }
    }

    /// Scale at which quantity-set values of this unit family are stored.
    #[must_use]
    pub fn for_unit(&self, unit: &CanonicalUnit) -> Scale {
        match unit {
            CanonicalUnit::Area => self.area,
            CanonicalUnit::Volume => self.volume,
            _ => self.length,
        }
    }
}
