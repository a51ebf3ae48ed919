// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Document processing strategies (C6, `spec.md` §4.6): one implementation
//! per document type plus the factory that selects between them.

pub mod asn;
pub mod factory;
pub mod order;

pub use asn::AsnStrategy;
pub use factory::HashMapStrategyFactory;
pub use order::OrderStrategy;

use ingestion_domain::entities::field_descriptor::FieldDescriptor;
use ingestion_domain::entities::MappingRule;
use ingestion_domain::error::IngestionError;
use ingestion_domain::services::xml_processor_service::{ParsedDocument, XmlElement, XmlProcessorService};
use ingestion_domain::services::{CoercedValue, TransformationService};
use ingestion_domain::value_objects::{TargetLevel, XPathExpr};

/// Rules relevant to one entity's field table (`spec.md` §4.6 step 1:
/// partition by `target_level`, further narrowed to this strategy's own
/// table so an interface shared across document types cannot bleed rules
/// across strategies). Order is whatever the caller already sorted by.
pub fn rules_for<'a>(rules: &'a [MappingRule], level: TargetLevel, table_name: &str) -> Vec<&'a MappingRule> {
    rules
        .iter()
        .filter(|r| r.target_level() == level && r.table_name().eq_ignore_ascii_case(table_name))
        .collect()
}

/// Evaluates `rule.source_field()` against the whole document, applies its
/// transformation chain, coerces, and assigns through `entity`'s
/// `FieldDescriptor` table (`spec.md` §4.6 step 3). Returns `Err` only when
/// a required field is still absent after the default value and
/// transformation have been applied.
pub async fn apply_header_rule<E>(
    xml: &dyn XmlProcessorService,
    transform: &dyn TransformationService,
    document: &dyn ParsedDocument,
    rule: &MappingRule,
    fields: &[FieldDescriptor<E>],
    entity: &mut E,
) -> Result<(), IngestionError> {
    let Some(descriptor) = FieldDescriptor::find(fields, rule.target_field()) else {
        return Ok(());
    };
    let raw = xml.eval_string(document, rule.source_field()).await?;
    let raw = raw.or_else(|| rule.default_value().map(str::to_string));
    let coerced = coerce_value(transform, raw.as_deref(), rule)?;
    if coerced.is_none() && rule.is_required() {
        return Err(IngestionError::validation(rule.target_field(), "required header field is missing"));
    }
    (descriptor.set)(entity, coerced)
}

/// Same as [`apply_header_rule`] but evaluates `rule.source_field()`
/// relative to `line_xpath` inside `line_node` (`spec.md` §4.6 step 6). A
/// non-required rule that fails to resolve is logged and skipped, leaving
/// the line otherwise intact; a required rule that fails aborts the whole
/// line by returning `Err`.
pub async fn apply_line_rule<E>(
    xml: &dyn XmlProcessorService,
    transform: &dyn TransformationService,
    line_node: &dyn XmlElement,
    line_xpath: &str,
    rule: &MappingRule,
    fields: &[FieldDescriptor<E>],
    entity: &mut E,
) -> Result<(), IngestionError> {
    let Some(descriptor) = FieldDescriptor::find(fields, rule.target_field()) else {
        return Ok(());
    };

    let relative = xml.relative_path(rule.source_field().as_str(), line_xpath);
    let expr = match XPathExpr::parse(&relative) {
        Ok(expr) => expr,
        Err(e) => return reject_or_skip(rule, e),
    };

    let raw = match xml.eval_string_in(line_node, &expr).await {
        Ok(raw) => raw,
        Err(e) => return reject_or_skip(rule, e),
    };
    let raw = raw.or_else(|| rule.default_value().map(str::to_string));

    let coerced = match coerce_value(transform, raw.as_deref(), rule) {
        Ok(coerced) => coerced,
        Err(e) => return reject_or_skip(rule, e),
    };

    if coerced.is_none() {
        return if rule.is_required() {
            Err(IngestionError::validation(rule.target_field(), "required line field is missing"))
        } else {
            Ok(())
        };
    }
    (descriptor.set)(entity, coerced)
}

/// A required rule's failure propagates as a line-aborting error; a
/// non-required rule's failure is swallowed (tracing logs it upstream of
/// this module, at the strategy call site).
fn reject_or_skip(rule: &MappingRule, err: IngestionError) -> Result<(), IngestionError> {
    if rule.is_required() {
        Err(err)
    } else {
        Ok(())
    }
}

fn coerce_value(transform: &dyn TransformationService, raw: Option<&str>, rule: &MappingRule) -> Result<Option<String>, IngestionError> {
    match transform.transform_and_convert(raw, rule.transformation(), rule.data_type())? {
        CoercedValue::Null => Ok(None),
        CoercedValue::String(s) => Ok(Some(s)),
    }
}

/// Determines the line-node XPath (`spec.md` §4.6 step 5): the common
/// parent of every LINE rule's `source_field`, falling back to
/// `default_line_xpath`, and as a last resort to the largest group of
/// sibling elements sharing a local name anywhere in the document.
pub async fn line_node_xpath(
    xml: &dyn XmlProcessorService,
    document: &dyn ParsedDocument,
    line_rules: &[&MappingRule],
    default_line_xpath: &str,
) -> Result<String, IngestionError> {
    let mut parents = line_rules.iter().map(|r| xml.parent_path(r.source_field().as_str())).filter(|p| !p.is_empty());
    if let Some(first) = parents.next() {
        if parents.all(|p| p == first) {
            return Ok(first);
        }
    }

    let expr = XPathExpr::parse(default_line_xpath)?;
    if !xml.eval_nodes(document, &expr).await?.is_empty() {
        return Ok(default_line_xpath.to_string());
    }

    Ok(xml.largest_sibling_group(document).await?.unwrap_or_else(|| default_line_xpath.to_string()))
}
