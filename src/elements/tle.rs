use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TleError {
    #[error("expected 3 non-blank lines, found {0}")]
    LineCount(usize),
    #[error("line 1 does not start with '1 '")]
    Line1Prefix,
    #[error("line 2 does not start with '2 '")]
    Line2Prefix,
    #[error("no catalog number in line 1")]
    MissingCatnr,
    #[error("catalog number {found} does not match {expected}")]
    CatnrMismatch { found: u32, expected: u32 },
}

/// A name plus the two element lines, checked against the catalog number it
/// is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TleRecord {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl TleRecord {
    pub fn new(
        name: impl Into<String>,
        line1: impl Into<String>,
        line2: impl Into<String>,
        catnr: u32,
    ) -> Result<Self, TleError> {
        let record = Self {
            name: name.into().trim().to_string(),
            line1: line1.into().trim().to_string(),
            line2: line2.into().trim().to_string(),
        };
        record.validate(catnr)?;
        Ok(record)
    }

    pub fn validate(&self, catnr: u32) -> Result<(), TleError> {
        if !self.line1.starts_with("1 ") {
            return Err(TleError::Line1Prefix);
        }
        if !self.line2.starts_with("2 ") {
            return Err(TleError::Line2Prefix);
        }
        let found = parse_catnr(&self.line1)?;
        if found != catnr {
            return Err(TleError::CatnrMismatch {
                found,
                expected: catnr,
            });
        }
        Ok(())
    }

    /// On-disk form: name, line 1, line 2, newline terminated.
    pub fn to_file_contents(&self) -> String {
        format!("{}\n{}\n{}\n", self.name, self.line1, self.line2)
    }
}

/// Catalog number embedded in line 1: the digits of its second token
/// ("25544U" -> 25544).
pub fn parse_catnr(line1: &str) -> Result<u32, TleError> {
    let token = line1
        .split_whitespace()
        .nth(1)
        .ok_or(TleError::MissingCatnr)?;
    let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().map_err(|_| TleError::MissingCatnr)
}

/// Parse an element file: the first three non-blank lines are name, line 1
/// and line 2.
pub fn parse_element_file(content: &str, catnr: u32) -> Result<TleRecord, TleError> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < 3 {
        return Err(TleError::LineCount(lines.len()));
    }

    let line1 = lines[1].trim_start_matches('\u{feff}');
    TleRecord::new(lines[0], line1, lines[2], catnr)
}

/// Scan free text (catalog dumps with headers, other satellites, footers)
/// for the element set of `catnr`.
pub fn locate_in_text(text: &str, catnr: u32) -> Option<TleRecord> {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim().trim_start_matches('\u{feff}'))
        .filter(|l| !l.is_empty())
        .collect();

    for (i, line1) in lines.iter().enumerate() {
        if !line1.starts_with("1 ") || parse_catnr(line1) != Ok(catnr) {
            continue;
        }
        let Some(line2) = lines.get(i + 1) else {
            continue;
        };
        if !line2.starts_with("2 ") {
            continue;
        }

        // The line before may be another satellite's element line in a
        // two-line dump; only a non-element line counts as a name.
        let name = match i.checked_sub(1).map(|p| lines[p]) {
            Some(prev) if !prev.starts_with("1 ") && !prev.starts_with("2 ") => prev.to_string(),
            _ => placeholder_name(catnr),
        };

        return TleRecord::new(name, *line1, *line2, catnr).ok();
    }

    None
}

pub fn placeholder_name(catnr: u32) -> String {
    format!("CATNR {}", catnr)
}
