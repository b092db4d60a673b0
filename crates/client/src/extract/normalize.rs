//! Numeric normalization of Indonesian and English financial figures.
//!
//! Figures on the investor-relations site mix conventions: `"Rp 60,1 Triliun"`,
//! `"1.234.567"`, `"29.4%"`. A caller that knows the page language passes a
//! [`NumberLocale`]; otherwise the separator heuristic applies and any guess
//! on an ambiguous three-digit group is reported as [`Confidence::Low`].

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use triwulan_core::{Confidence, Metric, Reading, Unit};

static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(rp\.?|rupiah|\$|usd)").expect("hardcoded currency pattern is valid"));

static SCALE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(triliun|trillion|miliar|billion|juta|million)").expect("hardcoded unit pattern is valid")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d(?:[\d.,]*\d)?").expect("hardcoded number pattern is valid"));

/// Number formatting convention of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberLocale {
    /// `.` groups thousands, `,` marks decimals.
    Indonesian,
    /// `,` groups thousands, `.` marks decimals.
    English,
    /// Decide per number from the separators present.
    #[default]
    Unknown,
}

impl NumberLocale {
    /// Locale from a BCP-47 language tag such as `id-ID` or `en`.
    pub fn from_lang(tag: &str) -> Self {
        let primary = tag.trim().split(['-', '_']).next().unwrap_or("").to_ascii_lowercase();
        match primary.as_str() {
            "id" | "in" => NumberLocale::Indonesian,
            "en" => NumberLocale::English,
            _ => NumberLocale::Unknown,
        }
    }
}

/// Magnitude word found next to a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Trillion,
    Billion,
    Million,
}

impl Scale {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "triliun" | "trillion" => Some(Scale::Trillion),
            "miliar" | "billion" => Some(Scale::Billion),
            "juta" | "million" => Some(Scale::Million),
            _ => None,
        }
    }

    /// Multiplier converting a figure in this scale to trillions.
    pub fn to_trillions(self) -> f64 {
        match self {
            Scale::Trillion => 1.0,
            Scale::Billion => 1e-3,
            Scale::Million => 1e-6,
        }
    }
}

/// A parsed figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Normalized {
    pub value: f64,
    pub scale: Option<Scale>,
    pub confidence: Confidence,
}

impl Normalized {
    /// Value expressed in trillions when a scale word was present.
    pub fn in_trillions(&self) -> f64 {
        self.scale.map_or(self.value, |s| self.value * s.to_trillions())
    }
}

/// Parse the first figure in `text`.
///
/// Currency markers and scale words are stripped (the scale is remembered),
/// then the first numeric run is disambiguated according to `locale`.
/// Returns `None` when no number can be read.
pub fn normalize(text: &str, locale: NumberLocale) -> Option<Normalized> {
    let scale = SCALE_WORD.find(text).and_then(|m| Scale::from_word(m.as_str()));
    let stripped = CURRENCY.replace_all(text, " ");
    let stripped = SCALE_WORD.replace_all(&stripped, " ");

    let number = NUMBER.find(&stripped)?.as_str();
    let (digits, confidence) = disambiguate(number, locale);

    let value = digits.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(Normalized { value, scale, confidence })
}

/// Best-effort float from a raw fragment, 0.0 when unparseable.
pub fn parse_amount(text: &str) -> f64 {
    normalize(text, NumberLocale::Unknown).map_or(0.0, |n| n.value)
}

/// Normalize a raw fragment into a reading for `metric`.
///
/// Currency metrics are rescaled to trillions of Rupiah when the fragment names a scale.
pub fn to_reading(metric: Metric, raw: &str, locale: NumberLocale) -> Option<Reading> {
    let normalized = normalize(raw, locale)?;
    let value = match metric.unit() {
        Unit::TrillionRupiah => normalized.in_trillions(),
        Unit::Percent => normalized.value,
    };
    Some(Reading::new(value, normalized.confidence).with_raw(raw.trim()))
}

fn disambiguate(number: &str, locale: NumberLocale) -> (String, Confidence) {
    let commas = number.matches(',').count();
    let periods = number.matches('.').count();
    let tail = |sep: char| number.rsplit(sep).next().map_or(0, str::len);
    let thousands = |sep: &str| number.replace(sep, "");
    let decimal = |sep: &str| number.replace(sep, ".");

    match (commas, periods, locale) {
        (0, 0, _) => (number.to_string(), Confidence::High),
        (1, 0, _) if tail(',') <= 2 => (decimal(","), Confidence::High),
        (1, 0, NumberLocale::Indonesian) => (decimal(","), Confidence::High),
        (1, 0, NumberLocale::English) => (thousands(","), Confidence::High),
        (1, 0, NumberLocale::Unknown) => (thousands(","), Confidence::Low),
        (_, 0, _) => (thousands(","), Confidence::High),
        (0, 1, NumberLocale::Indonesian) if tail('.') == 3 => (thousands("."), Confidence::High),
        (0, 1, NumberLocale::Unknown) if tail('.') == 3 => (number.to_string(), Confidence::Low),
        (0, 1, _) => (number.to_string(), Confidence::High),
        (0, _, _) => (thousands("."), Confidence::High),
        // Both separators.
        (_, _, NumberLocale::Indonesian) => (thousands(".").replace(',', "."), Confidence::High),
        (_, _, NumberLocale::English) => (thousands(","), Confidence::High),
        // Comma groups thousands; a trailing comma means that guess is doubtful.
        _ if number.rfind(',') > number.rfind('.') => (thousands(","), Confidence::Low),
        _ => (thousands(","), Confidence::High),
    }
}
