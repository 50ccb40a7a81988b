use crate::utils::error::{AppError, Result};
use std::fmt;

/// An A1-style spreadsheet reference such as `B2` or `AA43`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    column: String,
    row: u32,
}

impl CellRef {
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = || AppError::CellReferenceError {
            reference: reference.to_string(),
        };

        let trimmed = reference.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = trimmed.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }

        Ok(Self {
            column: letters.to_ascii_uppercase(),
            row,
        })
    }

    pub fn new(column: &str, row: u32) -> Result<Self> {
        Self::parse(&format!("{}{}", column, row))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index: `A` = 0, `Z` = 25, `AA` = 26.
    pub fn column_index(&self) -> usize {
        self.column
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A') as usize + 1)
            - 1
    }

    /// Same column, `offset` rows further down.
    pub fn offset_rows(&self, offset: u32) -> Self {
        Self {
            column: self.column.clone(),
            row: self.row + offset,
        }
    }

    /// Position of this cell in the CSV export, which carries one header row and
    /// one header column ahead of the sheet data.
    pub fn csv_position(&self) -> (usize, usize) {
        (self.row as usize, self.column_index() + 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl std::str::FromStr for CellRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
