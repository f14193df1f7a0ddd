//! Delimited-text parser with delimiter detection.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::source::{RawTable, SourceMetadata};
use crate::error::{Result, WavebookError};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Parses tabular data files.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the raw table and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(RawTable, SourceMetadata)> {
        let path = path.as_ref();

        let mut file = File::open(path).map_err(|e| WavebookError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(|e| WavebookError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let size_bytes = contents.len() as u64;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let unreadable = |message: String| WavebookError::UnreadableSource {
            path: path.to_path_buf(),
            message,
        };

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(&contents).map_err(|e| unreadable(e.to_string()))?,
        };

        let table = self
            .parse_bytes(&contents, delimiter)
            .map_err(|e| unreadable(e.to_string()))?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, metadata))
    }

    /// Parse bytes directly.
    pub(crate) fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut records = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            if self.config.max_rows.is_some_and(|max| row_idx >= max) {
                break;
            }
            records.push(result?);
        }

        let headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.trim().to_string()).collect()
        } else {
            match records.first() {
                Some(record) => (0..record.len())
                    .map(|i| format!("column_{}", i + 1))
                    .collect(),
                None => return Err(WavebookError::config("parser", "no data rows found")),
            }
        };

        if headers.iter().all(|h| h.is_empty()) {
            return Err(WavebookError::config("parser", "no columns found"));
        }

        let expected_cols = headers.len();
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|record| {
                let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
                row.resize(expected_cols, String::new());
                row
            })
            .collect();

        if rows.is_empty() {
            return Err(WavebookError::config("parser", "no data rows found"));
        }

        Ok(RawTable::new(headers, rows))
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let lines: Vec<String> = BufReader::new(bytes)
        .lines()
        .take(10)
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(WavebookError::config("parser", "no lines to analyze"));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        // Consistent counts across lines beat raw frequency; tabs win ties.
        let consistent = counts.iter().all(|&c| c == first_count);
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
