// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `DocumentAggregate` — the transactional consistency boundary C10 commits
//! in one shot (`spec.md` §3 ownership note, §4.6 invariants): a header and
//! the lines that belong to it, never split across two transactions.

use crate::entities::{validate_batch, DocumentHeader, DocumentLine};
use crate::error::IngestionError;
use crate::value_objects::ClientId;

pub struct DocumentAggregate {
    header: DocumentHeader,
    lines: Vec<DocumentLine>,
}

impl DocumentAggregate {
    /// Builds the aggregate, enforcing the cross-entity invariants from
    /// `spec.md` §3 up front: `lines` must share one header and one client,
    /// and that client/header must match `header` itself. A strategy
    /// (C6) that produced an inconsistent batch never gets past this point.
    pub fn new(header: DocumentHeader, lines: Vec<DocumentLine>) -> Result<Self, IngestionError> {
        validate_batch(&lines)?;
        if let Some(first) = lines.first() {
            if first.client_id() != header.client_id() {
                return Err(IngestionError::validation(
                    "document_aggregate.lines",
                    "line batch client_id does not match header client_id",
                ));
            }
        }
        Ok(Self { header, lines })
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn lines(&self) -> &[DocumentLine] {
        &self.lines
    }

    pub fn client_id(&self) -> ClientId {
        self.header.client_id()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Consumes the aggregate, handing ownership of its parts to the
    /// persistence layer (header first, then lines once the header has an
    /// identity — `spec.md` §4.6 steps 4-7).
    pub fn into_parts(self) -> (DocumentHeader, Vec<DocumentLine>) {
        (self.header, self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AsnHeader, AsnLine, DocumentHeader, DocumentLine};
    use crate::value_objects::{ClientId, HeaderId, InterfaceId};

    fn header_with(client_id: ClientId) -> (DocumentHeader, HeaderId) {
        let mut h = AsnHeader::new_default(client_id, InterfaceId::new());
        h.asn_number = "ASN-1".into();
        let id = h.id;
        (DocumentHeader::Asn(h), id)
    }

    #[test]
    fn rejects_lines_from_a_different_client() {
        let client_id = ClientId::new();
        let (header, header_id) = header_with(client_id);
        let line = AsnLine::new_default(header_id, ClientId::new(), 1);
        let lines = vec![DocumentLine::Asn(line)];
        assert!(DocumentAggregate::new(header, lines).is_err());
    }

    #[test]
    fn accepts_consistent_header_and_lines() {
        let client_id = ClientId::new();
        let (header, header_id) = header_with(client_id);
        let line = AsnLine::new_default(header_id, client_id, 1);
        let lines = vec![DocumentLine::Asn(line)];
        assert!(DocumentAggregate::new(header, lines).is_ok());
    }
}
