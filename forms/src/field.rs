//! Field kinds, options, values and grid placement.
//!
//! A [`FieldSpec`] pairs a unique key with kind-specific [`FieldOptions`].
//! The options also hold the field's current state (selected combo item,
//! spin value, date...), which only dependency-rule evaluation and
//! [`FormSchema::apply_change`](crate::FormSchema::apply_change) may change
//! once the form is finalized.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, UpdateError};
use crate::rule::Mutation;

/// Kind of form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Label,
    Combo,
    TextLine,
    Spin,
    Check,
    Date,
    Time,
    Separator,
}

impl FieldKind {
    /// Identifier used in generated keys and serialized schemas.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Label => "label",
            FieldKind::Combo => "combo",
            FieldKind::TextLine => "text_line",
            FieldKind::Spin => "spin",
            FieldKind::Check => "check",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::Separator => "separator",
        }
    }

    /// Returns `true` if fields of this kind carry an operator-editable value.
    pub fn has_value(self) -> bool {
        !matches!(self, FieldKind::Label | FieldKind::Separator)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a separator line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Cell rectangle a field occupies in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: u32,
    pub col: u32,
    pub row_span: u32,
    pub col_span: u32,
}

impl GridPosition {
    pub fn new(row: u32, col: u32, row_span: u32, col_span: u32) -> Self {
        Self {
            row,
            col,
            row_span,
            col_span,
        }
    }

    /// Top-left cell shared with `other`, if the rectangles intersect.
    ///
    /// ```
    /// use agent_schema_forms::GridPosition;
    ///
    /// let combo = GridPosition::new(0, 1, 1, 2);
    /// assert_eq!(combo.first_shared_cell(&GridPosition::new(0, 2, 2, 1)), Some((0, 2)));
    /// assert_eq!(combo.first_shared_cell(&GridPosition::new(1, 1, 1, 2)), None);
    /// ```
    pub fn first_shared_cell(&self, other: &GridPosition) -> Option<(u32, u32)> {
        let row = self.row.max(other.row);
        let col = self.col.max(other.col);
        let row_end = self.row_end().min(other.row_end());
        let col_end = self.col_end().min(other.col_end());
        (row < row_end && col < col_end).then_some((row, col))
    }

    fn row_end(&self) -> u32 {
        self.row.saturating_add(self.row_span)
    }

    fn col_end(&self) -> u32 {
        self.col.saturating_add(self.col_span)
    }
}

/// Current value of a value-bearing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Kind-specific options and state of a field.
///
/// # Examples
///
/// ```
/// use agent_schema_forms::{FieldKind, FieldOptions, FieldValue};
///
/// let arch = FieldOptions::combo(["x64", "x86"]);
/// assert_eq!(arch.kind(), FieldKind::Combo);
/// assert_eq!(arch.value(), Some(FieldValue::Text("x64".into())));
///
/// let sleep = FieldOptions::text_line("4s").with_placeholder("1h 2m 5s");
/// assert_eq!(sleep.value(), Some(FieldValue::Text("4s".into())));
///
/// assert_eq!(FieldOptions::label("Arch:").value(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldOptions {
    Label {
        text: String,
    },
    Combo {
        items: Vec<String>,
        selected: Option<usize>,
    },
    TextLine {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    Spin {
        min: i64,
        max: i64,
        value: i64,
    },
    Check {
        label: String,
        checked: bool,
    },
    /// Date picker; `format` is a display pattern such as `dd.MM.yyyy`.
    Date {
        format: String,
        value: NaiveDate,
    },
    /// Time picker; `format` is a display pattern such as `HH:mm`.
    Time {
        format: String,
        value: NaiveTime,
    },
    Separator {
        orientation: Orientation,
    },
}

impl FieldOptions {
    pub fn label(text: &str) -> Self {
        FieldOptions::Label {
            text: text.to_string(),
        }
    }

    /// Drop-down list; the first item starts selected.
    pub fn combo<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        let selected = (!items.is_empty()).then_some(0);
        FieldOptions::Combo { items, selected }
    }

    pub fn text_line(text: &str) -> Self {
        FieldOptions::TextLine {
            text: text.to_string(),
            placeholder: None,
        }
    }

    /// Sets the placeholder of a text line. Other kinds are returned unchanged.
    pub fn with_placeholder(self, hint: &str) -> Self {
        match self {
            FieldOptions::TextLine { text, .. } => FieldOptions::TextLine {
                text,
                placeholder: Some(hint.to_string()),
            },
            other => other,
        }
    }

    pub fn spin(min: i64, max: i64, value: i64) -> Self {
        FieldOptions::Spin { min, max, value }
    }

    /// Unchecked check box.
    pub fn check(label: &str) -> Self {
        FieldOptions::Check {
            label: label.to_string(),
            checked: false,
        }
    }

    /// Date picker starting at 2000-01-01.
    pub fn date(format: &str) -> Self {
        FieldOptions::Date {
            format: format.to_string(),
            value: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
        }
    }

    /// Time picker starting at midnight.
    pub fn time(format: &str) -> Self {
        FieldOptions::Time {
            format: format.to_string(),
            value: NaiveTime::default(),
        }
    }

    pub fn hline() -> Self {
        FieldOptions::Separator {
            orientation: Orientation::Horizontal,
        }
    }

    pub fn vline() -> Self {
        FieldOptions::Separator {
            orientation: Orientation::Vertical,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldOptions::Label { .. } => FieldKind::Label,
            FieldOptions::Combo { .. } => FieldKind::Combo,
            FieldOptions::TextLine { .. } => FieldKind::TextLine,
            FieldOptions::Spin { .. } => FieldKind::Spin,
            FieldOptions::Check { .. } => FieldKind::Check,
            FieldOptions::Date { .. } => FieldKind::Date,
            FieldOptions::Time { .. } => FieldKind::Time,
            FieldOptions::Separator { .. } => FieldKind::Separator,
        }
    }

    /// Current value, or `None` for labels, separators and empty combos.
    pub fn value(&self) -> Option<FieldValue> {
        match self {
            FieldOptions::Combo { items, selected } => selected
                .and_then(|i| items.get(i))
                .map(|item| FieldValue::Text(item.clone())),
            FieldOptions::TextLine { text, .. } => Some(FieldValue::Text(text.clone())),
            FieldOptions::Spin { value, .. } => Some(FieldValue::Int(*value)),
            FieldOptions::Check { checked, .. } => Some(FieldValue::Bool(*checked)),
            FieldOptions::Date { value, .. } => Some(FieldValue::Date(*value)),
            FieldOptions::Time { value, .. } => Some(FieldValue::Time(*value)),
            FieldOptions::Label { .. } | FieldOptions::Separator { .. } => None,
        }
    }

    pub(crate) fn validate(&self, key: &str) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidOptions {
            key: key.to_string(),
            reason,
        };
        match self {
            FieldOptions::Spin { min, max, value } => {
                if min > max {
                    return Err(invalid(format!("range {min}..={max} is empty")));
                }
                if value < min || value > max {
                    return Err(invalid(format!("value {value} outside {min}..={max}")));
                }
            }
            FieldOptions::Combo {
                items,
                selected: Some(index),
            } if *index >= items.len() => {
                return Err(invalid(format!("selected index {index} out of range")));
            }
            FieldOptions::Date { format, .. } | FieldOptions::Time { format, .. }
                if format.trim().is_empty() =>
            {
                return Err(invalid("display format is empty".to_string()));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Translates a Qt-style display pattern (`dd.MM.yyyy`, `HH:mm:ss`) into a
/// chrono format string.
///
/// ```
/// use agent_schema_forms::chrono_format;
///
/// assert_eq!(chrono_format("dd.MM.yyyy"), "%d.%m.%Y");
/// assert_eq!(chrono_format("HH:mm"), "%H:%M");
/// assert_eq!(chrono_format("h:mm AP"), "%-I:%M %p");
/// ```
pub fn chrono_format(pattern: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("dd", "%d"),
        ("d", "%-d"),
        ("HH", "%H"),
        ("H", "%-H"),
        ("hh", "%H"),
        ("h", "%-H"),
        ("mm", "%M"),
        ("m", "%-M"),
        ("ss", "%S"),
        ("s", "%-S"),
        ("zzz", "%3f"),
        ("AP", "%p"),
        ("ap", "%P"),
    ];
    let twelve_hour = pattern.contains("AP") || pattern.contains("ap");

    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        if c == '\'' {
            let quoted = &rest[1..];
            match quoted.find('\'') {
                Some(0) => {
                    out.push('\'');
                    rest = &quoted[1..];
                }
                Some(end) => {
                    push_literal(&mut out, &quoted[..end]);
                    rest = &quoted[end + 1..];
                }
                None => {
                    push_literal(&mut out, quoted);
                    rest = "";
                }
            }
            continue;
        }

        if let Some(&(token, spec)) = TOKENS.iter().find(|(token, _)| rest.starts_with(token)) {
            let spec = match token {
                "hh" if twelve_hour => "%I",
                "h" if twelve_hour => "%-I",
                _ => spec,
            };
            out.push_str(spec);
            rest = &rest[token.len()..];
        } else {
            push_literal(&mut out, &rest[..c.len_utf8()]);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

fn push_literal(out: &mut String, text: &str) {
    out.push_str(&text.replace('%', "%%"));
}

/// One configuration field.
///
/// Fields are created through [`FormBuilder`](crate::FormBuilder); their
/// state is read-only to everything but the form's update protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    key: String,
    #[serde(flatten)]
    options: FieldOptions,
    visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<GridPosition>,
}

impl FieldSpec {
    pub(crate) fn new(key: String, options: FieldOptions) -> Self {
        Self {
            key,
            options,
            visible: true,
            position: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> FieldKind {
        self.options.kind()
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Grid cell rectangle, if the field was laid out.
    pub fn position(&self) -> Option<GridPosition> {
        self.position
    }

    pub fn value(&self) -> Option<FieldValue> {
        self.options.value()
    }

    /// Current value as JSON, with dates and times in the field's display format.
    pub fn value_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;

        match &self.options {
            FieldOptions::Date { format, value } => Some(Value::String(
                value.format(&chrono_format(format)).to_string(),
            )),
            FieldOptions::Time { format, value } => Some(Value::String(
                value.format(&chrono_format(format)).to_string(),
            )),
            _ => match self.value()? {
                FieldValue::Text(s) => Some(Value::String(s)),
                FieldValue::Int(n) => Some(Value::from(n)),
                FieldValue::Bool(b) => Some(Value::Bool(b)),
                FieldValue::Date(_) | FieldValue::Time(_) => None,
            },
        }
    }

    /// Interprets a saved JSON value for this field.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ValueMismatch`] if the JSON type does not fit
    /// the field kind.
    pub fn parse_json(&self, raw: &serde_json::Value) -> Result<FieldValue, UpdateError> {
        let value = match (self.kind(), raw) {
            (FieldKind::Combo | FieldKind::TextLine, serde_json::Value::String(s)) => {
                Some(FieldValue::Text(s.clone()))
            }
            (FieldKind::Date | FieldKind::Time, serde_json::Value::String(s)) => {
                Some(FieldValue::Text(s.clone()))
            }
            (FieldKind::Spin, serde_json::Value::Number(n)) => n.as_i64().map(FieldValue::Int),
            (FieldKind::Check, serde_json::Value::Bool(b)) => Some(FieldValue::Bool(*b)),
            _ => None,
        };
        value.ok_or_else(|| self.mismatch())
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn place(&mut self, position: GridPosition) {
        self.position = Some(position);
    }

    /// Replaces the field's value. Text is parsed for dates and times.
    pub(crate) fn set_value(&mut self, value: FieldValue) -> Result<(), UpdateError> {
        let mismatch = self.mismatch();
        let rejected = |value: &dyn fmt::Display| UpdateError::ValueRejected {
            key: self.key.clone(),
            value: value.to_string(),
        };

        match (&mut self.options, value) {
            (FieldOptions::Combo { items, selected }, FieldValue::Text(text)) => {
                let index = items
                    .iter()
                    .position(|item| *item == text)
                    .ok_or_else(|| rejected(&text))?;
                *selected = Some(index);
            }
            (FieldOptions::TextLine { text, .. }, FieldValue::Text(new)) => *text = new,
            (FieldOptions::Spin { min, max, value }, FieldValue::Int(n)) => {
                if n < *min || n > *max {
                    return Err(rejected(&n));
                }
                *value = n;
            }
            (FieldOptions::Check { checked, .. }, FieldValue::Bool(b)) => *checked = b,
            (FieldOptions::Date { value, .. }, FieldValue::Date(d)) => *value = d,
            (FieldOptions::Date { format, value }, FieldValue::Text(text)) => {
                *value = NaiveDate::parse_from_str(&text, &chrono_format(format))
                    .map_err(|_| rejected(&text))?;
            }
            (FieldOptions::Time { value, .. }, FieldValue::Time(t)) => *value = t,
            (FieldOptions::Time { format, value }, FieldValue::Text(text)) => {
                *value = NaiveTime::parse_from_str(&text, &chrono_format(format))
                    .map_err(|_| rejected(&text))?;
            }
            _ => return Err(mismatch),
        }
        Ok(())
    }

    /// Applies one rule mutation to this field.
    pub(crate) fn apply(&mut self, mutation: &Mutation) -> Result<(), UpdateError> {
        match mutation {
            Mutation::SetVisible(visible) => {
                self.visible = *visible;
                return Ok(());
            }
            Mutation::SetValue(value) => return self.set_value(value.clone()),
            Mutation::SetItems(_) | Mutation::SetRange { .. } => {}
        }

        match (mutation, &mut self.options) {
            (Mutation::SetItems(new_items), FieldOptions::Combo { items, selected }) => {
                *items = new_items.clone();
                *selected = (!items.is_empty()).then_some(0);
            }
            (Mutation::SetRange { min, max }, FieldOptions::Spin { .. }) if min > max => {
                return Err(UpdateError::InvalidRange {
                    key: self.key.clone(),
                    min: *min,
                    max: *max,
                });
            }
            (
                Mutation::SetRange { min, max },
                FieldOptions::Spin {
                    min: lo,
                    max: hi,
                    value,
                },
            ) => {
                *lo = *min;
                *hi = *max;
                *value = (*value).clamp(*min, *max);
            }
            _ => {
                return Err(UpdateError::MutationMismatch {
                    key: self.key.clone(),
                    mutation: mutation.name(),
                });
            }
        }
        Ok(())
    }

    fn mismatch(&self) -> UpdateError {
        UpdateError::ValueMismatch {
            key: self.key.clone(),
            kind: self.kind(),
        }
    }
}
