// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The transformation chain (`spec.md` §4.1): a pipe-separated, ordered list
//! of named steps applied to one extracted string value before it is coerced
//! to its target scalar type. Parsing the chain is a domain concern (it is
//! pure and carries no I/O); *applying* a step is a service port
//! (`TransformationService`, see `crate::services::transformation_service`).

use serde::{Deserialize, Serialize};

/// One recognized transformation step. Unknown steps parse fine (the engine
/// logs and passes the value through unchanged at apply time, per spec) but
/// are kept as `Unknown(String)` so the chain can still round-trip.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum TransformStep {
    Uppercase,
    Lowercase,
    Trim,
    RemoveLeadingZeros,
    DateFormat,
    TimeFormat,
    DatetimeFormat,
    DecimalFormat,
    IntegerFormat,
    CurrencyFormat,
    Unknown(String),
}

impl TransformStep {
    /// Canonical lowercase, snake_case spelling — the inverse of
    /// [`Self::parse_one`], used by [`TransformationChain::to_raw`] to
    /// persist a chain back to its pipe-separated textual form.
    fn as_raw(&self) -> &str {
        match self {
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::Trim => "trim",
            Self::RemoveLeadingZeros => "remove_leading_zeros",
            Self::DateFormat => "date_format",
            Self::TimeFormat => "time_format",
            Self::DatetimeFormat => "datetime_format",
            Self::DecimalFormat => "decimal_format",
            Self::IntegerFormat => "integer_format",
            Self::CurrencyFormat => "currency_format",
            Self::Unknown(raw) => raw,
        }
    }

    fn parse_one(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "uppercase" => Self::Uppercase,
            "lowercase" => Self::Lowercase,
            "trim" => Self::Trim,
            "remove_leading_zeros" => Self::RemoveLeadingZeros,
            "date_format" => Self::DateFormat,
            "time_format" => Self::TimeFormat,
            "datetime_format" => Self::DatetimeFormat,
            "decimal_format" => Self::DecimalFormat,
            "integer_format" => Self::IntegerFormat,
            "currency_format" => Self::CurrencyFormat,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A parsed, ordered chain of [`TransformStep`]s, e.g.
/// `"remove_leading_zeros|integer_format"`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Default)]
pub struct TransformationChain(Vec<TransformStep>);

impl TransformationChain {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        Self(raw.split('|').map(TransformStep::parse_one).collect())
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Re-serializes the chain to its pipe-separated textual form, for
    /// persistence in `MAPPING_RULES.transformation` (`spec.md` §6).
    pub fn to_raw(&self) -> String {
        self.0.iter().map(TransformStep::as_raw).collect::<Vec<_>>().join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pipe_separated_chain_case_insensitively() {
        let chain = TransformationChain::parse("  Remove_Leading_Zeros | INTEGER_FORMAT ");
        assert_eq!(
            chain.steps(),
            &[TransformStep::RemoveLeadingZeros, TransformStep::IntegerFormat]
        );
    }

    #[test]
    fn unknown_step_is_preserved_not_dropped() {
        let chain = TransformationChain::parse("trim|frobnicate");
        assert_eq!(chain.steps()[1], TransformStep::Unknown("frobnicate".to_string()));
    }

    #[test]
    fn empty_chain_is_empty() {
        assert!(TransformationChain::parse("").is_empty());
        assert!(TransformationChain::parse("   ").is_empty());
    }
}
