//! Conversion of element text into numbers and fixed-shape arrays.
//!
//! Every helper takes the name of the section being converted so that count
//! mismatches and overflows can be reported against it.

use std::sync::OnceLock;

use ndarray::{Array1, Array2};
use regex::Regex;

use super::error::{ExtractError, VasprunError};
use crate::elements;

/// Text emitted instead of a number whose printed width overflowed
pub const OVERFLOW_SENTINEL: &str = "****";

fn check_overflow(section: &'static str, text: &str) -> Result<(), ExtractError> {
    if text.contains(OVERFLOW_SENTINEL) {
        return Err(ExtractError::Overflow {
            section,
            text: text.trim().to_string(),
        });
    }
    Ok(())
}

fn parse_token<T: std::str::FromStr>(section: &'static str, token: &str) -> Result<T, ExtractError> {
    check_overflow(section, token)?;
    token.parse().map_err(|_| ExtractError::InvalidNumber {
        section,
        text: token.to_string(),
    })
}

/// Single float from an element's text
pub(crate) fn scalar_f64(section: &'static str, text: &str) -> Result<f64, ExtractError> {
    parse_token(section, text.trim())
}

/// Single integer from an element's text
pub(crate) fn scalar_i64(section: &'static str, text: &str) -> Result<i64, ExtractError> {
    parse_token(section, text.trim())
}

/// Whitespace separated floats from one element
pub(crate) fn floats(section: &'static str, text: &str) -> Result<Vec<f64>, ExtractError> {
    check_overflow(section, text)?;
    text.split_whitespace()
        .map(|token| parse_token(section, token))
        .collect()
}

/// Whitespace separated integers from one element
pub(crate) fn ints(section: &'static str, text: &str) -> Result<Vec<i64>, ExtractError> {
    check_overflow(section, text)?;
    text.split_whitespace()
        .map(|token| parse_token(section, token))
        .collect()
}

/// One float per element
pub(crate) fn column(section: &'static str, rows: &[String]) -> Result<Array1<f64>, ExtractError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let values = floats(section, row)?;
        if values.len() != 1 {
            return Err(ExtractError::mismatch(section, 1, values.len()));
        }
        out.push(values[0]);
    }
    Ok(Array1::from(out))
}

/// Rows of exactly `dim` floats each
pub(crate) fn matrix(
    section: &'static str,
    rows: &[String],
    dim: usize,
) -> Result<Array2<f64>, ExtractError> {
    let mut out = Array2::zeros((rows.len(), dim));
    for (index, row) in rows.iter().enumerate() {
        check_overflow(section, row)?;
        let mut count = 0;
        for token in row.split_whitespace() {
            if count < dim {
                out[[index, count]] = parse_token(section, token)?;
            }
            count += 1;
        }
        if count != dim {
            return Err(ExtractError::mismatch(section, dim, count));
        }
    }
    Ok(out)
}

/// Like [`matrix`], but the row count is fixed as well
pub(crate) fn fixed_matrix(
    section: &'static str,
    rows: &[String],
    nrows: usize,
    dim: usize,
) -> Result<Array2<f64>, ExtractError> {
    if rows.len() != nrows {
        return Err(ExtractError::mismatch(section, nrows, rows.len()));
    }
    matrix(section, rows, dim)
}

/// Number of columns in the first row, used where the layout varies
pub(crate) fn columns(rows: &[String]) -> usize {
    rows.first()
        .map(|row| row.split_whitespace().count())
        .unwrap_or(0)
}

/// Resolve atomic symbols to atomic numbers
///
/// Only the first token of each entry is used and matched case
/// insensitively. An unknown symbol is fatal for the whole parse.
pub(crate) fn species(symbols: &[String]) -> Result<Array1<u32>, VasprunError> {
    symbols
        .iter()
        .map(|symbol| {
            let token = symbol.split_whitespace().next().unwrap_or("");
            elements::atomic_number(token)
                .ok_or_else(|| VasprunError::UnresolvableSpecies(symbol.trim().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Array1::from)
}

/// Reduce a generator version string to `MAJOR.MINOR.PATCH`
///
/// Returns `None` when no such triple is present.
pub fn normalize_version(raw: &str) -> Option<String> {
    static VERSION: OnceLock<Option<Regex>> = OnceLock::new();
    let re = VERSION
        .get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").ok())
        .as_ref()?;
    re.captures(raw)
        .map(|caps| format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]))
}
