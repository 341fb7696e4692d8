#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Delimited-text parsing for sample upload previews.
//!
//! The first line of a file names the columns; every following line becomes
//! one row keyed by those names. Two grammars are available:
//!
//! * [`TabularFormat::Simple`] splits each line on the delimiter. Quoted
//!   fields containing the delimiter or newlines are not understood.
//! * [`TabularFormat::Quoted`] follows RFC 4180 quoting via the `csv` crate.
//!
//! Empty input is not an error: it yields no columns and no rows.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur while parsing delimited text.
#[derive(Debug, thiserror::Error)]
pub enum TabularError {
    /// Reading the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The quoted grammar rejected the input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An unrecognised delimiter name was given.
    #[error("Unknown delimiter '{0}': expected comma, tab, or semicolon")]
    UnknownDelimiter(String),
}

/// Field separator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// `,`
    #[default]
    Comma,
    /// `\t`
    Tab,
    /// `;`
    Semicolon,
}

impl Delimiter {
    /// The separator character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab => '\t',
            Self::Semicolon => ';',
        }
    }

    /// The separator as a byte, for the `csv` reader.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Tab => b'\t',
            Self::Semicolon => b';',
        }
    }

    /// Picks the delimiter from a file name: `.tsv` and `.tab` are
    /// tab-separated, everything else is comma-separated.
    #[must_use]
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".tsv") || lower.ends_with(".tab") {
            Self::Tab
        } else {
            Self::Comma
        }
    }
}

impl FromStr for Delimiter {
    type Err = TabularError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comma" | "," | "csv" => Ok(Self::Comma),
            "tab" | "\\t" | "tsv" => Ok(Self::Tab),
            "semicolon" | ";" => Ok(Self::Semicolon),
            _ if s == "\t" => Ok(Self::Tab),
            _ => Err(TabularError::UnknownDelimiter(s.to_string())),
        }
    }
}

/// Which grammar to parse with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabularFormat {
    /// Plain split on newline and delimiter.
    #[default]
    Simple,
    /// RFC 4180 quoting.
    Quoted,
}

/// Parsed file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularData {
    /// Column names from the header line, in file order.
    pub column_names: Vec<String>,
    /// One mapping per data line, keyed by column name.
    pub rows: Vec<BTreeMap<String, String>>,
}

impl TabularData {
    /// Builds a row by pairing `values` positionally with the column names.
    /// Missing trailing values become empty strings; surplus values are
    /// dropped.
    fn push_row<'a>(&mut self, values: impl IntoIterator<Item = &'a str>) {
        let mut values = values.into_iter();
        let row = self
            .column_names
            .iter()
            .map(|name| {
                let value = values.next().unwrap_or("").trim().to_string();
                (name.clone(), value)
            })
            .collect();
        self.rows.push(row);
    }
}

/// Parses `text` with the given delimiter and grammar.
///
/// # Errors
///
/// Returns [`TabularError::Csv`] when the quoted grammar rejects the input.
/// The simple grammar never fails.
pub fn parse(
    text: &str,
    delimiter: Delimiter,
    format: TabularFormat,
) -> Result<TabularData, TabularError> {
    match format {
        TabularFormat::Simple => Ok(parse_simple(text, delimiter)),
        TabularFormat::Quoted => parse_quoted(text, delimiter),
    }
}

/// Splits on newlines and the delimiter. Carriage returns and a leading
/// byte-order mark are stripped, and blank lines are skipped.
#[must_use]
pub fn parse_simple(text: &str, delimiter: Delimiter) -> TabularData {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    let Some(header) = lines.next().filter(|h| !h.trim().is_empty()) else {
        return TabularData::default();
    };

    let sep = delimiter.as_char();
    let column_names: Vec<String> = header.split(sep).map(|h| h.trim().to_string()).collect();
    if column_names.iter().all(String::is_empty) {
        return TabularData::default();
    }

    let mut data = TabularData {
        column_names,
        rows: Vec::new(),
    };

    for line in lines.filter(|l| !l.trim().is_empty()) {
        data.push_row(line.split(sep));
    }

    log::debug!(
        "Parsed {} column(s), {} row(s)",
        data.column_names.len(),
        data.rows.len()
    );

    data
}

/// Parses RFC 4180 quoted text. Rows may have a different number of fields
/// than the header.
///
/// # Errors
///
/// Returns [`TabularError::Csv`] on malformed input (e.g. invalid UTF-8).
pub fn parse_quoted(text: &str, delimiter: Delimiter) -> Result<TabularData, TabularError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .flexible(true)
        .from_reader(text.as_bytes());

    let column_names: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if column_names.iter().all(String::is_empty) {
        return Ok(TabularData::default());
    }

    let mut data = TabularData {
        column_names,
        rows: Vec::new(),
    };

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        data.push_row(record.iter());
    }

    log::debug!(
        "Parsed {} column(s), {} row(s) (quoted)",
        data.column_names.len(),
        data.rows.len()
    );

    Ok(data)
}

/// Reads and parses a file, choosing the delimiter from its extension.
///
/// # Errors
///
/// Returns [`TabularError::Io`] if the file cannot be read, or the errors of
/// [`parse`].
pub fn parse_file(path: &Path, format: TabularFormat) -> Result<TabularData, TabularError> {
    let text = std::fs::read_to_string(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse(&text, Delimiter::from_file_name(&name), format)
}
