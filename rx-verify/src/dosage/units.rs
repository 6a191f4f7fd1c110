//! Dose Units
//!
//! Mass and volume units convert within their dimension. Discrete units
//! (tablets, capsules, international units, drops) only compare to themselves.

use crate::normalize::types::Dose;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Signed number (thousands separators and leading-decimal forms allowed),
/// a unit word and an optional per-unit suffix such as `/kg`
static DOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([-+]?)(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d*\.?\d+)\s*(µg|μg|[a-z]+)(\s*/\s*[a-z0-9²]+)?",
    )
    .expect("valid regex")
});

/// Physical dimension of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Mass,
    Volume,
    Discrete,
}

/// Recognised dose units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseUnit {
    Gram,
    Milligram,
    Microgram,
    Nanogram,
    Liter,
    Milliliter,
    Unit,
    InternationalUnit,
    Tablet,
    Capsule,
    Drop,
}

impl DoseUnit {
    /// Parse a unit spelling (case-insensitive, singular or plural)
    pub fn parse(text: &str) -> Option<DoseUnit> {
        let unit = match text.trim().to_lowercase().as_str() {
            "g" | "gm" | "gram" | "grams" => DoseUnit::Gram,
            "mg" | "milligram" | "milligrams" => DoseUnit::Milligram,
            "mcg" | "ug" | "µg" | "μg" | "microgram" | "micrograms" => DoseUnit::Microgram,
            "ng" | "nanogram" | "nanograms" => DoseUnit::Nanogram,
            "l" | "liter" | "liters" | "litre" | "litres" => DoseUnit::Liter,
            "ml" | "cc" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                DoseUnit::Milliliter
            }
            "unit" | "units" | "u" => DoseUnit::Unit,
            "iu" | "ius" => DoseUnit::InternationalUnit,
            "tablet" | "tablets" | "tab" | "tabs" => DoseUnit::Tablet,
            "capsule" | "capsules" | "cap" | "caps" => DoseUnit::Capsule,
            "drop" | "drops" | "gtt" | "gtts" => DoseUnit::Drop,
            _ => return None,
        };
        Some(unit)
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            DoseUnit::Gram | DoseUnit::Milligram | DoseUnit::Microgram | DoseUnit::Nanogram => {
                Dimension::Mass
            }
            DoseUnit::Liter | DoseUnit::Milliliter => Dimension::Volume,
            _ => Dimension::Discrete,
        }
    }

    /// Multiplier to the dimension's smallest unit (ng for mass, mL for volume).
    /// Whole numbers keep conversions such as 250 mcg -> 0.25 mg exact.
    fn base_factor(&self) -> f64 {
        match self {
            DoseUnit::Gram => 1_000_000_000.0,
            DoseUnit::Milligram => 1_000_000.0,
            DoseUnit::Microgram => 1_000.0,
            DoseUnit::Nanogram => 1.0,
            DoseUnit::Liter => 1000.0,
            DoseUnit::Milliliter => 1.0,
            _ => 1.0,
        }
    }

    /// Canonical abbreviation
    pub fn symbol(&self) -> &'static str {
        match self {
            DoseUnit::Gram => "g",
            DoseUnit::Milligram => "mg",
            DoseUnit::Microgram => "mcg",
            DoseUnit::Nanogram => "ng",
            DoseUnit::Liter => "l",
            DoseUnit::Milliliter => "ml",
            DoseUnit::Unit => "unit",
            DoseUnit::InternationalUnit => "iu",
            DoseUnit::Tablet => "tablet",
            DoseUnit::Capsule => "capsule",
            DoseUnit::Drop => "drop",
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convert `value` from one unit to another.
///
/// Returns `None` when the units cannot be reconciled.
pub fn convert(value: f64, from: DoseUnit, to: DoseUnit) -> Option<f64> {
    if from == to {
        return Some(value);
    }
    match (from.dimension(), to.dimension()) {
        (Dimension::Mass, Dimension::Mass) | (Dimension::Volume, Dimension::Volume) => {
            Some(value * from.base_factor() / to.base_factor())
        }
        _ => None,
    }
}

/// Convert a dose written with arbitrary unit text into `to`
pub fn convert_dose(dose: &Dose, to: DoseUnit) -> Option<f64> {
    let from = DoseUnit::parse(&dose.unit)?;
    convert(dose.value, from, to)
}

/// Parse a dose from free text such as `"500mg"`, `"1,000 mg"` or
/// `"2.5 milligrams"`.
///
/// The unit is returned in its canonical spelling. Negative amounts, ranges
/// (`"5-10 mg"`) and per-unit amounts (`"10 mg/kg"`, `"250 mg/5 ml"`) are
/// `MalformedInput`: none of them is an absolute single dose.
pub fn parse_dose(text: &str) -> crate::Result<Dose> {
    let trimmed = text.trim();
    let malformed = |why: &str| {
        crate::Error::MalformedInput(format!("could not parse dose '{}': {}", trimmed, why))
    };

    for caps in DOSE.captures_iter(text) {
        let Some(unit) = DoseUnit::parse(&caps[3]) else {
            continue;
        };
        let start = caps.get(0).map_or(0, |m| m.start());
        let prefix = &text[..start];
        let ends_with_digit = |s: &str| s.trim_end().ends_with(|c: char| c.is_ascii_digit());
        let negative = &caps[1] == "-";

        if (negative && ends_with_digit(prefix))
            || prefix.trim_end().strip_suffix('-').is_some_and(ends_with_digit)
        {
            return Err(malformed("dose ranges are not supported"));
        }
        if negative {
            return Err(malformed("dose must not be negative"));
        }
        if prefix.ends_with(|c: char| c.is_ascii_digit() || c == '.' || c == ',') {
            return Err(malformed("ambiguous number"));
        }
        if let Some(per) = caps.get(4) {
            return Err(malformed(&format!(
                "'{}{}' is a per-unit amount, not an absolute dose",
                unit,
                per.as_str().split_whitespace().collect::<String>()
            )));
        }

        let value: f64 = caps[2].replace(',', "").parse().map_err(|_| malformed("invalid number"))?;
        return Ok(Dose::new(value, unit.symbol()));
    }
    Err(malformed("no amount with a recognised unit"))
}
