//! INCAR reader and writer.
//!
//! An INCAR is a list of `TAG = value` directives. `#` and `!` start a
//! comment, `;` separates several directives on one line, and tags are case
//! insensitive. Values are typed on read:
//!
//! | Text | Value |
//! |------|-------|
//! | `.TRUE.`, `T`, `.f.` | [`IncarValue::Bool`] |
//! | `400` | [`IncarValue::Int`] |
//! | `1E-6`, `0.5d0` | [`IncarValue::Float`] |
//! | `Accurate` | [`IncarValue::Str`] |
//! | `2 2 1` | [`IncarValue::List`] of one element type |
//!
//! `SYSTEM`, `MAGMOM` and `M_CONSTR` keep their text verbatim, since
//! shorthand such as `4*1.0` is only meaningful to VASP.
//!
//! # Example
//!
//! ```
//! use vaspio::incar::{Incar, IncarValue};
//!
//! let mut incar: Incar = "ENCUT = 400 ; ISMEAR = 0\nLWAVE = .FALSE. # no WAVECAR".parse()?;
//! assert_eq!(incar.get("encut"), Some(&IncarValue::Int(400)));
//! incar.set("sigma", 0.05);
//! assert_eq!(incar.to_string(), "ENCUT = 400\nISMEAR = 0\nLWAVE = .FALSE. # no WAVECAR\nSIGMA = 0.05\n");
//! # Ok::<(), vaspio::incar::IncarError>(())
//! ```

mod error;

#[cfg(test)]
mod tests;

pub use error::IncarError;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use log::info;
use serde::Serialize;

/// Tags whose value is kept as the raw text
const RAW_TAGS: &[&str] = &["system", "magmom", "m_constr"];

/// Typed value of an INCAR tag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IncarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Whitespace-separated values, all of the same type
    List(Vec<IncarValue>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Bool,
    Int,
    Float,
    Str,
}

impl IncarValue {
    /// Type a value as it appears after the `=` of `tag`
    pub fn parse(tag: &str, text: &str) -> Result<Self, IncarError> {
        let tag = tag.trim().to_lowercase();
        let text = text.trim();
        if text.is_empty() {
            return Err(IncarError::EmptyValue(tag.to_uppercase()));
        }
        if RAW_TAGS.contains(&tag.as_str()) {
            return Ok(IncarValue::Str(text.to_string()));
        }

        let mut values: Vec<IncarValue> = text.split_whitespace().map(parse_token).collect();
        if values.len() == 1 {
            return Ok(values.remove(0));
        }
        let first = values[0].value_type();
        if values.iter().any(|v| v.value_type() != first) {
            return Err(IncarError::MixedTypes(tag.to_uppercase()));
        }
        Ok(IncarValue::List(values))
    }

    fn value_type(&self) -> Option<ValueType> {
        match self {
            IncarValue::Bool(_) => Some(ValueType::Bool),
            IncarValue::Int(_) => Some(ValueType::Int),
            IncarValue::Float(_) => Some(ValueType::Float),
            IncarValue::Str(_) => Some(ValueType::Str),
            IncarValue::List(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            IncarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            IncarValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float value; integers are widened
    pub fn as_float(&self) -> Option<f64> {
        match self {
            IncarValue::Float(f) => Some(*f),
            IncarValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            IncarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[IncarValue]> {
        match self {
            IncarValue::List(values) => Some(values),
            _ => None,
        }
    }
}

/// Type a single whitespace-free token
fn parse_token(token: &str) -> IncarValue {
    if let Some(b) = parse_bool(token) {
        return IncarValue::Bool(b);
    }
    if let Ok(i) = token.parse::<i64>() {
        return IncarValue::Int(i);
    }
    if let Some(f) = parse_fortran_float(token) {
        return IncarValue::Float(f);
    }
    IncarValue::Str(token.to_string())
}

fn parse_bool(token: &str) -> Option<bool> {
    let bare = token.trim_matches('.').to_lowercase();
    match bare.as_str() {
        "t" | "true" => Some(true),
        "f" | "false" => Some(false),
        _ => None,
    }
}

/// Parse a float, accepting the Fortran `d` exponent
///
/// Words that Rust would read as floats (`inf`, `NaN`) stay strings.
fn parse_fortran_float(token: &str) -> Option<f64> {
    let numeric = token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E' | 'd' | 'D'));
    if !numeric || !token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    token.replace(&['d', 'D'][..], "e").parse().ok()
}

impl fmt::Display for IncarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncarValue::Bool(true) => f.write_str(".TRUE."),
            IncarValue::Bool(false) => f.write_str(".FALSE."),
            IncarValue::Int(i) => write!(f, "{}", i),
            // Debug keeps a decimal point or exponent, so the value reads back as a float
            IncarValue::Float(x) => write!(f, "{:?}", x),
            IncarValue::Str(s) => f.write_str(s),
            IncarValue::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for IncarValue {
    fn from(value: bool) -> Self {
        IncarValue::Bool(value)
    }
}

impl From<i64> for IncarValue {
    fn from(value: i64) -> Self {
        IncarValue::Int(value)
    }
}

impl From<i32> for IncarValue {
    fn from(value: i32) -> Self {
        IncarValue::Int(value.into())
    }
}

impl From<f64> for IncarValue {
    fn from(value: f64) -> Self {
        IncarValue::Float(value)
    }
}

impl From<&str> for IncarValue {
    fn from(value: &str) -> Self {
        IncarValue::Str(value.to_string())
    }
}

impl From<String> for IncarValue {
    fn from(value: String) -> Self {
        IncarValue::Str(value)
    }
}

impl<T: Into<IncarValue>> From<Vec<T>> for IncarValue {
    fn from(values: Vec<T>) -> Self {
        IncarValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// One tag of an INCAR
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncarEntry {
    pub value: IncarValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Contents of an INCAR file, keyed by lower-case tag
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Incar {
    /// Comment line written before the first tag
    pub header: Option<String>,
    entries: BTreeMap<String, IncarEntry>,
}

impl Incar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an INCAR file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, IncarError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn get(&self, tag: &str) -> Option<&IncarValue> {
        self.entries.get(&tag.to_lowercase()).map(|e| &e.value)
    }

    /// Comment attached to a tag
    pub fn comment(&self, tag: &str) -> Option<&str> {
        self.entries
            .get(&tag.to_lowercase())
            .and_then(|e| e.comment.as_deref())
    }

    /// Modify a tag, or add it if it is not present
    ///
    /// Returns the previous value.
    pub fn set(&mut self, tag: &str, value: impl Into<IncarValue>) -> Option<IncarValue> {
        self.insert(tag, value.into(), None)
    }

    /// Like [`set`](Self::set), attaching a comment
    pub fn set_with_comment(
        &mut self,
        tag: &str,
        value: impl Into<IncarValue>,
        comment: &str,
    ) -> Option<IncarValue> {
        self.insert(tag, value.into(), Some(comment.trim().to_string()))
    }

    fn insert(&mut self, tag: &str, value: IncarValue, comment: Option<String>) -> Option<IncarValue> {
        self.entries
            .insert(tag.trim().to_lowercase(), IncarEntry { value, comment })
            .map(|e| e.value)
    }

    pub fn remove(&mut self, tag: &str) -> Option<IncarValue> {
        self.entries.remove(&tag.to_lowercase()).map(|e| e.value)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(&tag.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in tag order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IncarEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Write the rendered INCAR to a file
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), IncarError> {
        let mut writer = BufWriter::new(File::create(path)?);
        write!(writer, "{}", self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Split a line at the first comment character
fn split_comment(line: &str) -> (&str, Option<&str>) {
    match line.find(&['#', '!'][..]) {
        Some(pos) => {
            let comment = line[pos + 1..].trim();
            (&line[..pos], (!comment.is_empty()).then_some(comment))
        }
        None => (line, None),
    }
}

impl FromStr for Incar {
    type Err = IncarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut incar = Incar::new();

        for (index, line) in s.lines().enumerate() {
            let line_number = index + 1;
            let (content, comment) = split_comment(line);

            if content.trim().is_empty() {
                if incar.is_empty() && incar.header.is_none() {
                    incar.header = comment.map(str::to_string);
                }
                continue;
            }

            let directives: Vec<&str> = content
                .split(';')
                .filter(|d| !d.trim().is_empty())
                .collect();
            let last = directives.len().saturating_sub(1);

            for (i, directive) in directives.into_iter().enumerate() {
                let parts: Vec<&str> = directive.split('=').collect();
                let (tag, value) = match parts.as_slice() {
                    [tag, value] => (*tag, *value),
                    [_] => {
                        return Err(IncarError::MissingEquals {
                            line: line_number,
                            directive: directive.trim().to_string(),
                        })
                    }
                    _ => {
                        return Err(IncarError::MultipleEquals {
                            line: line_number,
                            directive: directive.trim().to_string(),
                        })
                    }
                };

                let Some(tag) = tag.split_whitespace().next() else {
                    return Err(IncarError::EmptyTag { line: line_number });
                };
                let value = IncarValue::parse(tag, value)?;
                let comment = if i == last { comment.map(str::to_string) } else { None };

                if incar.insert(tag, value, comment).is_some() {
                    info!("Tag {} occurs more than once, keeping the last value", tag.to_uppercase());
                }
            }
        }

        Ok(incar)
    }
}

impl fmt::Display for Incar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(header) = &self.header {
            writeln!(f, "# {}", header)?;
        }
        for (tag, entry) in &self.entries {
            write!(f, "{} = {}", tag.to_uppercase(), entry.value)?;
            if let Some(comment) = &entry.comment {
                write!(f, " # {}", comment)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
