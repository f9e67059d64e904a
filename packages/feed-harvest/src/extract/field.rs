//! Field specifications: what to read and how to fall back.
//!
//! A [`FieldSpec`] names one output field, its kind, and an ordered list of
//! [`Strategy`]s. The extractor tries the strategies in order and keeps the
//! first value that has the kind's shape.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};
use crate::extract::numeric::{parse_count, try_parse_score};
use crate::traits::item::ItemView;

/// Shape of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Count,
    Score,
    Url,
    Timestamp,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Count => "count",
            Self::Score => "score",
            Self::Url => "url",
            Self::Timestamp => "timestamp",
        }
    }
}

/// One read against an item: a selector, optionally an attribute or the
/// n-th match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub selector: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Probe {
    /// Read the text of the first match.
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attr: None,
            index: None,
        }
    }

    /// Read an attribute of the first match.
    pub fn attr(selector: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attr: Some(name.into()),
            index: None,
        }
    }

    /// Read the text of the `index`-th match.
    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            attr: None,
            index: Some(index),
        }
    }

    pub fn read<I: ItemView + ?Sized>(&self, item: &I) -> ExtractResult<String> {
        match (&self.attr, self.index) {
            (Some(name), _) => item.attr(&self.selector, name),
            (None, Some(index)) => item.nth_text(&self.selector, index),
            (None, None) => item.text(&self.selector),
        }
    }
}

/// How `combine` merges its two reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    /// `<whole digits>.<fraction digits>` ("1,299" + "99" → "1299.99")
    Decimal,

    /// Sum of the two counts
    Sum,
}

/// Keyword rule for the `classify` strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl ClassifyRule {
    pub fn new(label: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    }
}

/// One way of reading a raw field value out of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Read one probe as-is
    Read(Probe),

    /// Read two probes and merge them arithmetically
    Combine {
        first: Probe,
        second: Probe,
        op: CombineOp,
    },

    /// Read a number and divide it (prices stored in cents)
    Scale { probe: Probe, divisor: f64 },

    /// Scan the text of every match for a regex capture
    Pattern {
        selector: String,
        regex: String,
        #[serde(default = "default_group")]
        group: usize,
        #[serde(skip)]
        compiled: CompiledRegex,
    },

    /// Map free text to a label by keyword
    Classify {
        probe: Probe,
        rules: Vec<ClassifyRule>,
        #[serde(default)]
        otherwise: Option<String>,
    },
}

fn default_group() -> usize {
    1
}

/// A pattern's regex, compiled on first use and reused for every item.
#[derive(Debug, Clone, Default)]
pub struct CompiledRegex(OnceLock<Regex>);

impl CompiledRegex {
    fn get(&self, pattern: &str) -> ExtractResult<&Regex> {
        if let Some(re) = self.0.get() {
            return Ok(re);
        }
        let re = compile(pattern)?;
        Ok(self.0.get_or_init(|| re))
    }

    pub fn is_compiled(&self) -> bool {
        self.0.get().is_some()
    }
}

// Cache state is not part of a strategy's identity
impl PartialEq for CompiledRegex {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Strategy {
    /// Shorthand for reading the text of a selector.
    pub fn text(selector: impl Into<String>) -> Self {
        Self::Read(Probe::text(selector))
    }

    /// Shorthand for reading an attribute.
    pub fn attr(selector: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Read(Probe::attr(selector, name))
    }

    pub fn pattern(selector: impl Into<String>, regex: impl Into<String>, group: usize) -> Self {
        Self::Pattern {
            selector: selector.into(),
            regex: regex.into(),
            group,
            compiled: CompiledRegex::default(),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Combine { .. } => "combine",
            Self::Scale { .. } => "scale",
            Self::Pattern { .. } => "pattern",
            Self::Classify { .. } => "classify",
        }
    }

    /// Produce the raw string this strategy reads.
    ///
    /// Absence and parse failures come back as errors so the caller can
    /// fall through to the next strategy.
    pub fn apply<I: ItemView + ?Sized>(&self, item: &I) -> ExtractResult<String> {
        match self {
            Self::Read(probe) => probe.read(item),

            Self::Combine { first, second, op } => {
                let a = first.read(item)?;
                let b = second.read(item)?;
                combine(&a, &b, *op)
            }

            Self::Scale { probe, divisor } => {
                let raw = probe.read(item)?;
                let value = try_parse_score(&raw).ok_or_else(|| ExtractError::parse(&raw, "number"))?;
                if *divisor == 0.0 || !divisor.is_finite() {
                    return Err(ExtractError::parse(divisor.to_string(), "divisor"));
                }
                Ok((value / divisor).to_string())
            }

            Self::Pattern {
                selector,
                regex,
                group,
                compiled,
            } => {
                let re = compiled.get(regex)?;
                item.texts(selector)?
                    .iter()
                    .find_map(|text| {
                        re.captures(text)
                            .and_then(|caps| caps.get(*group))
                            .map(|m| m.as_str().to_string())
                    })
                    .ok_or_else(|| ExtractError::absent(format!("{selector} =~ /{regex}/")))
            }

            Self::Classify {
                probe,
                rules,
                otherwise,
            } => {
                let raw = probe.read(item)?;
                let lowered = raw.to_lowercase();
                rules
                    .iter()
                    .find(|rule| rule.matches(&lowered))
                    .map(|rule| rule.label.clone())
                    .or_else(|| otherwise.clone())
                    .ok_or_else(|| ExtractError::parse(raw, "classified text"))
            }
        }
    }

    /// Check configuration that can be validated without an item.
    ///
    /// Pattern regexes are compiled here and kept for later reads.
    pub fn validate(&self) -> ExtractResult<()> {
        if let Self::Pattern {
            regex, compiled, ..
        } = self
        {
            compiled.get(regex)?;
        }
        Ok(())
    }
}

fn compile(pattern: &str) -> ExtractResult<Regex> {
    Regex::new(pattern).map_err(|_| ExtractError::InvalidSelector {
        selector: pattern.to_string(),
    })
}

fn combine(a: &str, b: &str, op: CombineOp) -> ExtractResult<String> {
    match op {
        CombineOp::Decimal => {
            let whole: String = a.chars().filter(char::is_ascii_digit).collect();
            let fraction: String = b.chars().filter(char::is_ascii_digit).collect();
            if whole.is_empty() {
                return Err(ExtractError::parse(a, "whole digits"));
            }
            if fraction.is_empty() {
                Ok(whole)
            } else {
                Ok(format!("{whole}.{fraction}"))
            }
        }
        CombineOp::Sum => Ok(parse_count(a).saturating_add(parse_count(b)).to_string()),
    }
}

/// Post-read cleanup applied before the shape check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Trim and fold runs of whitespace into one space
    CollapseWhitespace,

    /// Keep the first non-empty line
    FirstLine,

    /// Keep the first whitespace-separated token
    FirstToken,

    /// Keep the last non-empty `/` segment (channel ids from URLs)
    LastPathSegment,

    /// Drop non-ASCII characters
    AsciiOnly,
}

impl Transform {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Self::CollapseWhitespace => raw.split_whitespace().collect::<Vec<_>>().join(" "),
            Self::FirstLine => raw
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default()
                .to_string(),
            Self::FirstToken => raw.split_whitespace().next().unwrap_or_default().to_string(),
            Self::LastPathSegment => {
                let path = raw.split(['?', '#']).next().unwrap_or_default();
                path.rsplit('/')
                    .map(str::trim)
                    .find(|segment| !segment.is_empty())
                    .unwrap_or_default()
                    .to_string()
            }
            Self::AsciiOnly => raw.chars().filter(char::is_ascii).collect::<String>().trim().to_string(),
        }
    }
}

/// Specification of one output field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    pub kind: FieldKind,

    /// Tried in order; the first shaped value wins
    pub strategies: Vec<Strategy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<Transform>,

    /// Items where this field is absent are skipped
    #[serde(default)]
    pub required: bool,

    /// Raw value used when every strategy is exhausted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Machine-readable timestamp attribute (timestamp fields only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<Probe>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            strategies: Vec::new(),
            transforms: Vec::new(),
            required: false,
            default: None,
            machine: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Count)
    }

    pub fn score(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Score)
    }

    pub fn url(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Url)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    /// Append a fallback strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the machine timestamp probe.
    pub fn with_machine(mut self, probe: Probe) -> Self {
        self.machine = Some(probe);
        self
    }

    /// Apply every transform in order.
    pub fn transform(&self, raw: &str) -> String {
        self.transforms
            .iter()
            .fold(raw.to_string(), |value, transform| transform.apply(&value))
    }
}
