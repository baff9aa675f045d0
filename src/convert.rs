//! Pattern-based rewriting of measurements embedded in free text.
//!
//! Each unit family has one metric and one imperial pattern. A pattern only
//! matches a number that starts on a word boundary and is directly followed
//! (optionally after one space) by the unit token, which itself must end on
//! a word boundary. Quantities without a recognized unit are left alone.

use std::sync::LazyLock;

use regex::{Captures, Regex};

const GRAMS_TO_OUNCES: f64 = 0.035274;
const KILOGRAMS_TO_POUNDS: f64 = 2.20462;
const MILLILITERS_TO_FLUID_OUNCES: f64 = 0.033814;
const CENTIMETERS_TO_INCHES: f64 = 0.393701;

const NUMBER: &str = r"\b([0-9]+\.?[0-9]*)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    WeightSmall,
    WeightLarge,
    Volume,
    Temperature,
    Length,
}

impl UnitFamily {
    /// Families in the order they are applied to a string.
    pub const ALL: [UnitFamily; 5] = [
        UnitFamily::WeightSmall,
        UnitFamily::WeightLarge,
        UnitFamily::Volume,
        UnitFamily::Temperature,
        UnitFamily::Length,
    ];

    pub fn to_imperial(&self, value: f64) -> f64 {
        match self {
            UnitFamily::WeightSmall => value * GRAMS_TO_OUNCES,
            UnitFamily::WeightLarge => value * KILOGRAMS_TO_POUNDS,
            UnitFamily::Volume => value * MILLILITERS_TO_FLUID_OUNCES,
            UnitFamily::Temperature => value * 9.0 / 5.0 + 32.0,
            UnitFamily::Length => value * CENTIMETERS_TO_INCHES,
        }
    }

    pub fn to_metric(&self, value: f64) -> f64 {
        match self {
            UnitFamily::WeightSmall => value / GRAMS_TO_OUNCES,
            UnitFamily::WeightLarge => value / KILOGRAMS_TO_POUNDS,
            UnitFamily::Volume => value / MILLILITERS_TO_FLUID_OUNCES,
            UnitFamily::Temperature => (value - 32.0) * 5.0 / 9.0,
            UnitFamily::Length => value / CENTIMETERS_TO_INCHES,
        }
    }

    fn format_imperial(&self, value: f64) -> String {
        let converted = self.to_imperial(value);
        match self {
            UnitFamily::WeightSmall => format!("{converted:.1} oz"),
            UnitFamily::WeightLarge => format!("{converted:.1} lb"),
            UnitFamily::Volume => format!("{converted:.1} fl oz"),
            UnitFamily::Temperature => format!("{converted:.0}°F"),
            UnitFamily::Length => format!("{converted:.1} inches"),
        }
    }

    fn format_metric(&self, value: f64) -> String {
        let converted = self.to_metric(value);
        match self {
            UnitFamily::WeightSmall => format!("{converted:.0}g"),
            UnitFamily::WeightLarge => format!("{converted:.1}kg"),
            UnitFamily::Volume => format!("{converted:.0}ml"),
            UnitFamily::Temperature => format!("{converted:.0}°C"),
            UnitFamily::Length => format!("{converted:.1}cm"),
        }
    }

    fn metric_pattern(&self) -> &'static Regex {
        match self {
            UnitFamily::WeightSmall => &METRIC_GRAMS,
            UnitFamily::WeightLarge => &METRIC_KILOGRAMS,
            UnitFamily::Volume => &METRIC_MILLILITERS,
            UnitFamily::Temperature => &METRIC_CELSIUS,
            UnitFamily::Length => &METRIC_CENTIMETERS,
        }
    }

    fn imperial_pattern(&self) -> &'static Regex {
        match self {
            UnitFamily::WeightSmall => &IMPERIAL_OUNCES,
            UnitFamily::WeightLarge => &IMPERIAL_POUNDS,
            UnitFamily::Volume => &IMPERIAL_FLUID_OUNCES,
            UnitFamily::Temperature => &IMPERIAL_FAHRENHEIT,
            UnitFamily::Length => &IMPERIAL_INCHES,
        }
    }

    /// Range unit token (already lowercased) to family, metric side.
    fn from_metric_range_unit(unit: &str) -> Option<Self> {
        match unit {
            "g" => Some(UnitFamily::WeightSmall),
            "kg" => Some(UnitFamily::WeightLarge),
            _ if unit.starts_with("ml") => Some(UnitFamily::Volume),
            _ => None,
        }
    }

    /// Range unit token to family, imperial side.
    fn from_imperial_range_unit(unit: &str) -> Option<Self> {
        match unit {
            "oz" => Some(UnitFamily::WeightSmall),
            "fl oz" => Some(UnitFamily::Volume),
            "lb" | "lbs" => Some(UnitFamily::WeightLarge),
            _ => None,
        }
    }

    fn range_precision(&self, to_imperial: bool) -> usize {
        match (self, to_imperial) {
            (_, true) => 1,
            (UnitFamily::WeightLarge, false) => 1,
            (_, false) => 0,
        }
    }

    fn range_unit(&self, to_imperial: bool) -> &'static str {
        match (self, to_imperial) {
            (UnitFamily::WeightSmall, true) => "oz",
            (UnitFamily::WeightLarge, true) => "lb",
            (UnitFamily::Volume, true) => "fl oz",
            (UnitFamily::WeightSmall, false) => "g",
            (UnitFamily::WeightLarge, false) => "kg",
            (UnitFamily::Volume, false) => "ml",
            (UnitFamily::Temperature, true) => "°F",
            (UnitFamily::Temperature, false) => "°C",
            (UnitFamily::Length, true) => "inches",
            (UnitFamily::Length, false) => "cm",
        }
    }
}

fn unit_regex(unit: &str) -> Regex {
    Regex::new(&format!(r"{NUMBER} ?{unit}\b")).unwrap()
}

static METRIC_GRAMS: LazyLock<Regex> = LazyLock::new(|| unit_regex("g"));
static METRIC_KILOGRAMS: LazyLock<Regex> = LazyLock::new(|| unit_regex("kg"));
static METRIC_MILLILITERS: LazyLock<Regex> = LazyLock::new(|| unit_regex(r"(?i:ml'?s?)"));
static METRIC_CELSIUS: LazyLock<Regex> = LazyLock::new(|| unit_regex("°C"));
static METRIC_CENTIMETERS: LazyLock<Regex> = LazyLock::new(|| unit_regex("cm"));

static IMPERIAL_OUNCES: LazyLock<Regex> = LazyLock::new(|| unit_regex("oz"));
static IMPERIAL_POUNDS: LazyLock<Regex> = LazyLock::new(|| unit_regex("lbs?"));
static IMPERIAL_FLUID_OUNCES: LazyLock<Regex> = LazyLock::new(|| unit_regex("fl oz"));
static IMPERIAL_FAHRENHEIT: LazyLock<Regex> = LazyLock::new(|| unit_regex("°F"));
static IMPERIAL_INCHES: LazyLock<Regex> = LazyLock::new(|| unit_regex("inch(?:es)?"));

static METRIC_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){NUMBER}\s*-\s*([0-9]+\.?[0-9]*) ?(kg|g|ml'?s?)\b"
    ))
    .unwrap()
});

static IMPERIAL_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{NUMBER}\s*-\s*([0-9]+\.?[0-9]*) ?(fl oz|oz|lbs?)\b"
    ))
    .unwrap()
});

/// Rewrites every recognized measurement in `text` into imperial units
/// (`to_imperial == true`) or metric units.
///
/// Ranges such as `10-15g` are handled first so both bounds share one unit
/// label (`0.4-0.5 oz`); single values are then converted family by family.
pub fn convert(text: &str, to_imperial: bool) -> String {
    let mut result = convert_ranges(text, to_imperial);
    for family in UnitFamily::ALL {
        let pattern = if to_imperial {
            family.metric_pattern()
        } else {
            family.imperial_pattern()
        };
        result = pattern
            .replace_all(&result, |caps: &Captures| match caps[1].parse::<f64>() {
                Ok(value) if to_imperial => family.format_imperial(value),
                Ok(value) => family.format_metric(value),
                Err(_) => caps[0].to_string(),
            })
            .into_owned();
    }
    result
}

fn convert_ranges(text: &str, to_imperial: bool) -> String {
    let pattern: &Regex = if to_imperial {
        &METRIC_RANGE
    } else {
        &IMPERIAL_RANGE
    };
    pattern
        .replace_all(text, |caps: &Captures| {
            let unit = caps[3].to_lowercase();
            let family = if to_imperial {
                UnitFamily::from_metric_range_unit(&unit)
            } else {
                UnitFamily::from_imperial_range_unit(&unit)
            };
            let (Some(family), Ok(low), Ok(high)) =
                (family, caps[1].parse::<f64>(), caps[2].parse::<f64>())
            else {
                return caps[0].to_string();
            };
            let (low, high) = if to_imperial {
                (family.to_imperial(low), family.to_imperial(high))
            } else {
                (family.to_metric(low), family.to_metric(high))
            };
            let precision = family.range_precision(to_imperial);
            format!(
                "{low:.precision$}-{high:.precision$} {}",
                family.range_unit(to_imperial)
            )
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_units_map_to_families() {
        assert_eq!(
            UnitFamily::from_metric_range_unit("ml's"),
            Some(UnitFamily::Volume)
        );
        assert_eq!(
            UnitFamily::from_imperial_range_unit("lbs"),
            Some(UnitFamily::WeightLarge)
        );
        assert_eq!(UnitFamily::from_imperial_range_unit("cups"), None);
    }

    #[test]
    fn temperature_round_trips_through_factors() {
        let family = UnitFamily::Temperature;
        let back = family.to_metric(family.to_imperial(93.0));
        assert!((back - 93.0).abs() < 1e-9);
    }
}
