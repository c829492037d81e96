//! Pattern match types for attribute/value searches.
//!
//! The native search call takes a numeric match-type code with the
//! case-insensitivity flag folded into it as a high bit, mirroring the
//! platform's pattern-matching constant space.

use serde::{Deserialize, Serialize};

/// Bit folded into a match-type code to request case-insensitive matching.
pub const CASE_INSENSITIVE_BIT: u32 = 0x0100;

/// How a search pattern is matched against attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    /// Value equals the pattern
    Exact,
    /// Value starts with the pattern
    StartsWith,
    /// Value ends with the pattern
    EndsWith,
    /// Value contains the pattern
    Contains,
    /// Value is less than the pattern
    LessThan,
    /// Value is greater than the pattern
    GreaterThan,
    /// The pattern is a pre-formed compound filter expression
    CompoundExpression,
}

impl MatchType {
    /// Base numeric code for this match type.
    #[must_use]
    pub const fn base_code(self) -> u32 {
        match self {
            Self::Exact => 0x2001,
            Self::StartsWith => 0x2002,
            Self::EndsWith => 0x2003,
            Self::Contains => 0x2004,
            Self::LessThan => 0x2005,
            Self::GreaterThan => 0x2006,
            Self::CompoundExpression => 0x200B,
        }
    }

    /// Numeric code with the case-insensitivity flag folded in.
    #[must_use]
    pub const fn code(self, case_insensitive: bool) -> u32 {
        if case_insensitive {
            self.base_code() | CASE_INSENSITIVE_BIT
        } else {
            self.base_code()
        }
    }

    /// Resolves a base numeric code back to a match type.
    #[must_use]
    pub const fn from_base_code(code: u32) -> Option<Self> {
        match code & !CASE_INSENSITIVE_BIT {
            0x2001 => Some(Self::Exact),
            0x2002 => Some(Self::StartsWith),
            0x2003 => Some(Self::EndsWith),
            0x2004 => Some(Self::Contains),
            0x2005 => Some(Self::LessThan),
            0x2006 => Some(Self::GreaterThan),
            0x200B => Some(Self::CompoundExpression),
            _ => None,
        }
    }
}
