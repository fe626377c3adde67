use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A literal cell value as last saved in the workbook.
///
/// Formula cells carry their cached result; the engine never recomputes.
/// Dates arrive as their serial number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl CellValue {
    /// Text form used for keyword matching and header titles.
    /// Integral numbers print without a fractional part.
    pub fn raw_display(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(format!("{}", n))
                }
            }
            CellValue::Bool(b) => Cow::Borrowed(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => Cow::Borrowed(e.as_str()),
        }
    }

    /// Trimmed display text, or an empty string for blank cells.
    pub fn trimmed_text(&self) -> String {
        if is_blank(self) {
            String::new()
        } else {
            self.raw_display().trim().to_string()
        }
    }

    /// Numeric reading of the value. Text is parsed with `parse_number`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    /// The cell held a formula; `value` is its cached result.
    #[serde(default)]
    pub is_formula: bool,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self { value: value.into(), is_formula: false }
    }

    pub fn formula(cached: impl Into<CellValue>) -> Self {
        Self { value: cached.into(), is_formula: true }
    }

    pub fn is_blank(&self) -> bool {
        is_blank(&self.value)
    }
}

/// Parse a number the way estimate files write them: surrounding whitespace
/// is ignored and a comma is accepted as the decimal separator.
pub fn parse_number(text: &str) -> Option<f64> {
    let normalized = text.replace(',', ".");
    normalized.trim().parse::<f64>().ok()
}

/// True for empty cells and whitespace-only text. Numeric zero is never blank.
pub fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Empty => true,
        CellValue::Text(s) => s.trim().is_empty(),
        CellValue::Error(e) => e.trim().is_empty(),
        CellValue::Number(_) | CellValue::Bool(_) => false,
    }
}

/// True iff the value reads as a number equal to exactly 0.0.
/// Non-numeric values are simply not zero.
pub fn is_numeric_zero(value: &CellValue) -> bool {
    value.as_number().map_or(false, |n| n == 0.0)
}

/// True iff the value reads as a number equal to its truncation
/// (`"3"` and `"3.0"` both qualify, `"3.5"` does not).
pub fn is_integer_valued(value: &CellValue) -> bool {
    value
        .as_number()
        .map_or(false, |n| n.is_finite() && n == n.trunc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values() {
        assert!(is_blank(&CellValue::Empty));
        assert!(is_blank(&CellValue::from("")));
        assert!(is_blank(&CellValue::from("   \t")));
        assert!(!is_blank(&CellValue::from("x")));
    }

    #[test]
    fn test_zero_is_never_blank() {
        assert!(!is_blank(&CellValue::Number(0.0)));
        assert!(!is_blank(&CellValue::from("0")));
        assert!(!is_blank(&CellValue::Bool(false)));
    }

    #[test]
    fn test_numeric_zero() {
        assert!(is_numeric_zero(&CellValue::Number(0.0)));
        assert!(is_numeric_zero(&CellValue::from("0")));
        assert!(is_numeric_zero(&CellValue::from(" 0,00 ")));
        assert!(!is_numeric_zero(&CellValue::from(" ")));
        assert!(!is_numeric_zero(&CellValue::from("abc")));
        assert!(!is_numeric_zero(&CellValue::Empty));
        assert!(!is_numeric_zero(&CellValue::Number(0.01)));
    }

    #[test]
    fn test_integer_valued() {
        assert!(is_integer_valued(&CellValue::from("3")));
        assert!(is_integer_valued(&CellValue::from("3.0")));
        assert!(is_integer_valued(&CellValue::from("3,0")));
        assert!(is_integer_valued(&CellValue::Number(12.0)));
        assert!(!is_integer_valued(&CellValue::from("3.5")));
        assert!(!is_integer_valued(&CellValue::from("1.1.1")));
        assert!(!is_integer_valued(&CellValue::Empty));
        assert!(!is_integer_valued(&CellValue::Number(f64::INFINITY)));
    }

    #[test]
    fn test_parse_number_accepts_comma() {
        assert_eq!(parse_number("1,5"), Some(1.5));
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("Раздел 1"), None);
    }

    #[test]
    fn test_raw_display() {
        assert_eq!(CellValue::Number(5.0).raw_display(), "5");
        assert_eq!(CellValue::Number(2.5).raw_display(), "2.5");
        assert_eq!(CellValue::from("  Раздел 1 ").trimmed_text(), "Раздел 1");
        assert_eq!(CellValue::Empty.trimmed_text(), "");
    }
}
