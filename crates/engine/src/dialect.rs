use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::coord::{col_to_letter, letters_to_col};
use crate::error::DialectError;

// ---------------------------------------------------------------------------
// Column / span primitives
// ---------------------------------------------------------------------------

/// A 0-based column index, written as letters ("A", "AB") in dialect files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(pub u32);

impl Column {
    pub fn letter(letters: &str) -> Self {
        Column(letters_to_col(letters).unwrap_or_else(|| panic!("bad column {letters:?}")))
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&col_to_letter(self.0))
    }
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        letters_to_col(s.trim())
            .map(Column)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid column {s:?}")))
    }
}

/// Inclusive column span of a merge, written "A:K".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Column,
    pub end: Column,
}

impl Span {
    pub fn parse(s: &str) -> Option<Self> {
        let (a, b) = s.split_once(':')?;
        Some(Self {
            start: Column(letters_to_col(a.trim())?),
            end: Column(letters_to_col(b.trim())?),
        })
    }

    pub fn cols(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| panic!("bad span {s:?}"))
    }

    pub fn contains(&self, col: Column) -> bool {
        self.start <= col && col <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl Serialize for Span {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Span {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Span::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid span {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything that distinguishes one estimate-authoring tool's layout from
/// another. The engine itself is shared; dialects are pure data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialectConfig {
    pub name: String,
    /// Grouping for pickers ("Турбосметчик-1".."3" share one family).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    pub header: HeaderRule,
    #[serde(default)]
    pub footers: Vec<FooterRule>,
    pub item_price: ItemPriceRule,
    pub item: ItemRule,
    #[serde(default)]
    pub filters: Filters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Section,
    Subsection,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Section => write!(f, "section"),
            Self::Subsection => write!(f, "subsection"),
        }
    }
}

// ---------------------------------------------------------------------------
// Headers / footers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderRule {
    /// Exact merge span a header row must carry.
    pub span: Span,
    /// Column whose text is matched and becomes the title.
    pub text_column: Column,
    pub section_prefix: String,
    pub subsection: SubsectionMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum SubsectionMatch {
    /// Text must start with the prefix.
    Prefix { prefix: String },
    /// Any non-blank text that is not a section header.
    AnyText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FooterRule {
    pub level: Level,
    pub span: Span,
    pub text_column: Column,
    pub prefix: String,
    pub total: TotalSource,
}

/// Where a total lives on the row that carries it: the cell in `column`, or
/// the anchor of the `merge` span when the row has that merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalSource {
    pub column: Column,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<Span>,
}

// ---------------------------------------------------------------------------
// Priced-item rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPriceRule {
    pub rule: PriceMatch,
    pub total: TotalSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceMatch {
    /// Exact merge span whose text column equals `text`.
    MergedText { span: Span, text_column: Column, text: String },
    /// Column equals `text`; no merge required.
    ColumnText { column: Column, text: String },
    /// Every `non_empty` column has a value and no `empty` column does.
    ColumnPattern { non_empty: Vec<Column>, empty: Vec<Column> },
}

// ---------------------------------------------------------------------------
// Items + filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRule {
    /// Column holding the position number.
    pub id_column: Column,
    /// Source columns for output slots 1..=5.
    pub columns: [Column; 5],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_price: Option<TotalSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    /// Drop item rows whose value in this column reads as numeric zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_item_when_zero: Option<Column>,
    /// Drop output records whose resolved total reads as numeric zero.
    #[serde(default)]
    pub drop_zero_totals: bool,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DialectConfig {
    pub fn from_toml(input: &str) -> Result<Self, DialectError> {
        let config: DialectConfig =
            toml::from_str(input).map_err(|e| DialectError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, DialectError> {
        toml::to_string_pretty(self).map_err(|e| DialectError::ConfigParse(e.to_string()))
    }

    /// Family name, defaulting to the dialect name.
    pub fn family_name(&self) -> &str {
        self.family.as_deref().unwrap_or(&self.name)
    }

    pub fn validate(&self) -> Result<(), DialectError> {
        let fail = |message: String| DialectError::ConfigValidation {
            dialect: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(fail("name must not be empty".into()));
        }

        check_span(&self.header.span).map_err(|m| fail(format!("header: {m}")))?;
        if self.header.section_prefix.trim().is_empty() {
            return Err(fail("header: section_prefix must not be empty".into()));
        }
        if let SubsectionMatch::Prefix { prefix } = &self.header.subsection {
            if prefix.trim().is_empty() {
                return Err(fail("header: subsection prefix must not be empty".into()));
            }
        }

        for (i, footer) in self.footers.iter().enumerate() {
            check_span(&footer.span).map_err(|m| fail(format!("footer #{i}: {m}")))?;
            if footer.prefix.trim().is_empty() {
                return Err(fail(format!("footer #{i}: prefix must not be empty")));
            }
            check_total(&footer.total).map_err(|m| fail(format!("footer #{i}: {m}")))?;
        }

        match &self.item_price.rule {
            PriceMatch::MergedText { span, text, .. } => {
                check_span(span).map_err(|m| fail(format!("item_price: {m}")))?;
                if text.trim().is_empty() {
                    return Err(fail("item_price: text must not be empty".into()));
                }
            }
            PriceMatch::ColumnText { text, .. } => {
                if text.trim().is_empty() {
                    return Err(fail("item_price: text must not be empty".into()));
                }
            }
            PriceMatch::ColumnPattern { non_empty, empty } => {
                if non_empty.is_empty() {
                    return Err(fail("item_price: non_empty must list at least one column".into()));
                }
                if let Some(col) = non_empty.iter().find(|c| empty.contains(c)) {
                    return Err(fail(format!(
                        "item_price: column {col} is listed as both non_empty and empty"
                    )));
                }
            }
        }
        check_total(&self.item_price.total).map_err(|m| fail(format!("item_price: {m}")))?;

        if let Some(inline) = &self.item.inline_price {
            check_total(inline).map_err(|m| fail(format!("item.inline_price: {m}")))?;
        }

        Ok(())
    }
}

fn check_span(span: &Span) -> Result<(), String> {
    if span.start > span.end {
        return Err(format!("span {span} is reversed"));
    }
    Ok(())
}

fn check_total(total: &TotalSource) -> Result<(), String> {
    if let Some(merge) = &total.merge {
        check_span(merge)?;
        if !merge.contains(total.column) {
            return Err(format!("total column {} lies outside merge {merge}", total.column));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
