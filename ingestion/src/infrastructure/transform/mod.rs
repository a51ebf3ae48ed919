// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Transformation engine (C1, `spec.md` §4.1): applies a pipe-separated chain
//! of named string transforms, then coerces the result to a target scalar
//! type. Pure and stateless - no I/O.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

use ingestion_domain::error::IngestionError;
use ingestion_domain::services::{CoercedValue, TransformationService};
use ingestion_domain::value_objects::{DataType, TransformStep, TransformationChain};

#[derive(Debug, Clone, Copy, Default)]
pub struct StringTransformationService;

impl StringTransformationService {
    pub fn new() -> Self {
        Self
    }

    fn apply_step(value: String, step: &TransformStep) -> String {
        match step {
            TransformStep::Uppercase => value.to_uppercase(),
            TransformStep::Lowercase => value.to_lowercase(),
            TransformStep::Trim => value.trim().to_string(),
            TransformStep::RemoveLeadingZeros => {
                let trimmed = value.trim_start_matches('0');
                if trimmed.is_empty() {
                    "0".to_string()
                } else {
                    trimmed.to_string()
                }
            }
            TransformStep::DateFormat => reformat_date(&value).unwrap_or(value),
            TransformStep::TimeFormat => reformat_time(&value).unwrap_or(value),
            TransformStep::DatetimeFormat => reformat_datetime(&value).unwrap_or(value),
            TransformStep::DecimalFormat => format_decimal(&value, 3).unwrap_or(value),
            TransformStep::IntegerFormat => format_decimal(&value, 0).unwrap_or(value),
            TransformStep::CurrencyFormat => format_decimal(&value, 2).unwrap_or(value),
            TransformStep::Unknown(name) => {
                tracing::warn!(step = %name, "unrecognized transformation step, passing value through");
                value
            }
        }
    }
}

impl TransformationService for StringTransformationService {
    fn apply_chain(&self, value: Option<&str>, chain: &TransformationChain) -> Option<String> {
        let value = value?.trim();
        if value.is_empty() {
            return None;
        }
        let mut current = value.to_string();
        for step in chain.steps() {
            current = Self::apply_step(current, step);
        }
        Some(current)
    }

    fn transform_and_convert(
        &self,
        value: Option<&str>,
        chain: &TransformationChain,
        target_type: DataType,
    ) -> Result<CoercedValue, IngestionError> {
        let Some(transformed) = self.apply_chain(value, chain) else {
            return Ok(CoercedValue::Null);
        };
        coerce(&transformed, target_type).map(CoercedValue::String)
    }
}

/// Strips thousands separators and normalizes a comma decimal separator to a
/// dot, then drops anything outside `[0-9.-]` (`spec.md` §4.1 coercion rules).
fn normalize_numeric(raw: &str) -> String {
    let comma_as_decimal = !raw.contains('.') && raw.contains(',');
    let mut s = if comma_as_decimal { raw.replace(',', ".") } else { raw.replace(',', "") };
    s.retain(|c| c.is_ascii_digit() || c == '.' || c == '-');
    s
}

fn coerce(value: &str, target_type: DataType) -> Result<String, IngestionError> {
    match target_type {
        DataType::String => Ok(value.to_string()),
        DataType::Integer | DataType::Long => {
            let normalized = normalize_numeric(value);
            let parsed = BigDecimal::from_str(&normalized)
                .map_err(|e| IngestionError::Transform(format!("cannot coerce '{value}' to integer: {e}")))?;
            Ok(round_half_up_to_integer(&parsed))
        }
        DataType::Double => {
            let normalized = normalize_numeric(value);
            normalized
                .parse::<f64>()
                .map(|f| f.to_string())
                .map_err(|e| IngestionError::Transform(format!("cannot coerce '{value}' to double: {e}")))
        }
        DataType::BigDecimal => {
            let normalized = normalize_numeric(value);
            BigDecimal::from_str(&normalized)
                .map(|d| d.to_string())
                .map_err(|e| IngestionError::Transform(format!("cannot coerce '{value}' to decimal: {e}")))
        }
        DataType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|d| d.to_string())
            .map_err(|e| IngestionError::Transform(format!("cannot coerce '{value}' to ISO-8601 date: {e}"))),
        DataType::DateTime => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
            .map(|d| d.to_string())
            .map_err(|e| IngestionError::Transform(format!("cannot coerce '{value}' to ISO-8601 datetime: {e}"))),
        DataType::Boolean => match value {
            "true" => Ok("true".to_string()),
            "false" => Ok("false".to_string()),
            other => Err(IngestionError::Transform(format!(
                "cannot coerce '{other}' to boolean: expected strict 'true' or 'false'"
            ))),
        },
    }
}

/// HALF_UP rounding to zero decimal places, per `spec.md` §4.1's
/// `Integer`/`Long` coercion rule.
fn round_half_up_to_integer(value: &BigDecimal) -> String {
    use bigdecimal::RoundingMode;
    value.with_scale_round(0, RoundingMode::HalfUp).to_string()
}

fn format_decimal(raw: &str, scale: i64) -> Option<String> {
    use bigdecimal::RoundingMode;
    let normalized = normalize_numeric(raw);
    let value = BigDecimal::from_str(&normalized).ok()?;
    Some(value.with_scale_round(scale, RoundingMode::HalfUp).to_string())
}

fn reformat_date(raw: &str) -> Option<String> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y%m%d", "%d-%b-%Y"];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw.trim(), fmt) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    None
}

fn reformat_time(raw: &str) -> Option<String> {
    const FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];
    for fmt in FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(raw.trim(), fmt) {
            return Some(t.format("%H:%M:%S").to_string());
        }
    }
    None
}

fn reformat_datetime(raw: &str) -> Option<String> {
    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDateTime::parse_from_str(raw.trim(), fmt) {
            return Some(d.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(raw: &str) -> TransformationChain {
        TransformationChain::parse(raw)
    }

    #[test]
    fn empty_input_yields_null_regardless_of_chain() {
        let svc = StringTransformationService::new();
        assert_eq!(svc.apply_chain(Some(""), &chain("uppercase")), None);
        assert_eq!(svc.apply_chain(Some("   "), &chain("uppercase")), None);
        assert_eq!(svc.apply_chain(None, &chain("uppercase")), None);
    }

    #[test]
    fn trim_is_idempotent() {
        let svc = StringTransformationService::new();
        let once = svc.apply_chain(Some("  hi  "), &chain("trim"));
        let twice = svc.apply_chain(Some("  hi  "), &chain("trim|trim"));
        assert_eq!(once, twice);
    }

    #[test]
    fn remove_leading_zeros_then_integer_format() {
        let svc = StringTransformationService::new();
        let result = svc
            .transform_and_convert(Some("00012345"), &chain("remove_leading_zeros|integer_format"), DataType::Integer)
            .unwrap();
        assert_eq!(result, CoercedValue::String("12345".to_string()));
    }

    #[test]
    fn remove_leading_zeros_of_all_zeros_is_zero() {
        let svc = StringTransformationService::new();
        assert_eq!(svc.apply_chain(Some("0000"), &chain("remove_leading_zeros")), Some("0".to_string()));
    }

    #[test]
    fn decimal_format_rounds_half_up_to_three_places() {
        let svc = StringTransformationService::new();
        let result = svc
            .transform_and_convert(Some("12.3456"), &chain("decimal_format"), DataType::String)
            .unwrap();
        assert_eq!(result, CoercedValue::String("12.346".to_string()));
    }

    #[test]
    fn comma_decimal_separator_is_normalized() {
        let svc = StringTransformationService::new();
        let result = svc.transform_and_convert(Some("1234,56"), &chain(""), DataType::BigDecimal).unwrap();
        assert_eq!(result, CoercedValue::String("1234.56".to_string()));
    }

    #[test]
    fn unknown_step_passes_through() {
        let svc = StringTransformationService::new();
        assert_eq!(svc.apply_chain(Some("hello"), &chain("frobnicate")), Some("hello".to_string()));
    }

    #[test]
    fn strict_boolean_rejects_non_true_false() {
        let svc = StringTransformationService::new();
        assert!(svc.transform_and_convert(Some("yes"), &chain(""), DataType::Boolean).is_err());
        assert!(svc.transform_and_convert(Some("true"), &chain(""), DataType::Boolean).is_ok());
    }
}
