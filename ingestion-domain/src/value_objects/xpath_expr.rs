// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Syntactically validated XPath expression.
//!
//! `MappingRule.source_field` must be "a syntactically valid XPath"
//! (`spec.md` §3). Full XPath grammar validation belongs to the XML
//! processor (C2, infrastructure), but the domain still enforces a cheap,
//! dependency-free sanity check at construction time so an obviously broken
//! rule (unbalanced brackets/quotes, empty string) is rejected before it
//! ever reaches persistence.

use serde::{Deserialize, Serialize};

use crate::error::IngestionError;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct XPathExpr(String);

impl XPathExpr {
    pub fn parse(raw: &str) -> Result<Self, IngestionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IngestionError::validation("source_field", "xpath is empty"));
        }
        balanced(trimmed, '[', ']')?;
        balanced(trimmed, '(', ')')?;
        if trimmed.matches('\'').count() % 2 != 0 || trimmed.matches('"').count() % 2 != 0 {
            return Err(IngestionError::validation(
                "source_field",
                "xpath has an unterminated quote",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn balanced(s: &str, open: char, close: char) -> Result<(), IngestionError> {
    let mut depth = 0i32;
    for c in s.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth < 0 {
                return Err(IngestionError::validation(
                    "source_field",
                    format!("unbalanced '{close}' in xpath"),
                ));
            }
        }
    }
    if depth != 0 {
        return Err(IngestionError::validation(
            "source_field",
            format!("unbalanced '{open}' in xpath"),
        ));
    }
    Ok(())
}

impl std::fmt::Display for XPathExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_xpath() {
        assert!(XPathExpr::parse("//ASN_LINE/ItemNumber").is_ok());
        assert!(XPathExpr::parse("./Header/Field[@type='A']").is_ok());
    }

    #[test]
    fn rejects_empty_and_unbalanced() {
        assert!(XPathExpr::parse("").is_err());
        assert!(XPathExpr::parse("//Field[@type='A'").is_err());
        assert!(XPathExpr::parse("//Field[@type=\"A]").is_err());
    }
}
