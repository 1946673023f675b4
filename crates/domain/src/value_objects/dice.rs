//! Dice notation value object.
//!
//! Supports formulas like "1d20+5", "2d6-1", "5d6", and the "d20" shorthand.
//! Parsing is manual to keep regex out of the domain layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error when parsing dice notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    /// The notation string is empty
    #[error("Empty dice notation")]
    Empty,
    /// Invalid format - expected XdY or XdY+Z
    #[error("Invalid dice notation: {0}")]
    InvalidFormat(String),
    /// Dice count must be at least 1
    #[error("Dice count must be at least 1")]
    InvalidCount,
    /// Die must have at least 2 sides
    #[error("Die must have at least 2 sides")]
    InvalidSides,
}

/// A parsed dice expression like "2d6+3".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceExpression {
    /// Number of dice to roll (X in XdY)
    pub count: u32,
    /// Number of sides per die (Y in XdY)
    pub sides: u32,
    /// Flat modifier applied after the dice (+Z or -Z)
    pub modifier: i32,
}

impl DiceExpression {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Result<Self, DiceParseError> {
        if count == 0 {
            return Err(DiceParseError::InvalidCount);
        }
        if sides < 2 {
            return Err(DiceParseError::InvalidSides);
        }
        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    /// Parses dice notation, case-insensitively and ignoring surrounding
    /// whitespace.
    ///
    /// Accepted forms:
    /// - "XdY" - X dice with Y sides
    /// - "XdY+Z" / "XdY-Z" - with a flat modifier
    /// - "dY" - shorthand for one die
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let input = input.trim().to_ascii_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let d_pos = input.find('d').ok_or_else(|| {
            DiceParseError::InvalidFormat(format!("missing 'd' separator in '{}'", input))
        })?;

        let count_str = &input[..d_pos];
        let count: u32 = if count_str.is_empty() {
            1 // "d20" means "1d20"
        } else {
            count_str.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("invalid dice count '{}'", count_str))
            })?
        };

        let after_d = &input[d_pos + 1..];

        // Split off the modifier, if any. rfind so "-" can't be confused
        // with a (nonsensical) negative die size prefix.
        let (sides_str, modifier) = if let Some(plus_pos) = after_d.find('+') {
            let modifier: i32 = after_d[plus_pos + 1..].parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!(
                    "invalid modifier '+{}'",
                    &after_d[plus_pos + 1..]
                ))
            })?;
            (&after_d[..plus_pos], modifier)
        } else if let Some(minus_pos) = after_d.rfind('-') {
            if minus_pos == 0 {
                return Err(DiceParseError::InvalidFormat(format!(
                    "invalid die size '{}'",
                    after_d
                )));
            }
            let modifier: i32 = after_d[minus_pos + 1..].parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!(
                    "invalid modifier '-{}'",
                    &after_d[minus_pos + 1..]
                ))
            })?;
            (&after_d[..minus_pos], -modifier)
        } else {
            (after_d, 0)
        };

        let sides: u32 = sides_str.parse().map_err(|_| {
            DiceParseError::InvalidFormat(format!("invalid die size '{}'", sides_str))
        })?;

        Self::new(count, sides, modifier)
    }

    /// Smallest value the expression can produce.
    pub fn min_value(&self) -> i64 {
        i64::from(self.count) + i64::from(self.modifier)
    }

    /// Largest value the expression can produce.
    pub fn max_value(&self) -> i64 {
        i64::from(self.count) * i64::from(self.sides) + i64::from(self.modifier)
    }
}

impl FromStr for DiceExpression {
    type Err = DiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifier == 0 {
            write!(f, "{}d{}", self.count, self.sides)
        } else if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        }
    }
}
