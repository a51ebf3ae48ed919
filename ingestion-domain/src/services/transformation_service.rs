// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Transformation engine port (C1, `spec.md` §4.1).
//!
//! Pure and stateless: no I/O, no async. The concrete implementation lives
//! in `ingestion::infrastructure::transform` so the domain does not need a
//! date/number formatting dependency of its own.

use crate::error::IngestionError;
use crate::value_objects::{DataType, TransformationChain};

/// A coerced scalar value, ready to hand to a [`crate::entities::field_descriptor::FieldDescriptor::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Null,
    String(String),
}

pub trait TransformationService: Send + Sync {
    /// Applies `chain`'s steps to `value` in order. Unknown steps are logged
    /// and passed through. Empty/whitespace input yields `None` regardless
    /// of chain (`spec.md` §4.1, §8 boundary: `apply_chain("", "uppercase")
    /// == null`).
    fn apply_chain(&self, value: Option<&str>, chain: &TransformationChain) -> Option<String>;

    /// Runs [`Self::apply_chain`] then coerces to `target_type`.
    /// Coercion failures raise [`IngestionError::Transform`], never a silent
    /// substitution.
    fn transform_and_convert(
        &self,
        value: Option<&str>,
        chain: &TransformationChain,
        target_type: DataType,
    ) -> Result<CoercedValue, IngestionError>;
}
