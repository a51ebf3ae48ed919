// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Property tests for the two idempotence laws `SPEC_FULL.md`'s Tests
//! section names: re-applying an idempotent transformation step changes
//! nothing, and `find_or_create_processed_file` (`spec.md` §4.7, S6) never
//! creates a second ledger row for the same `(file_name, interface_id)`.

use proptest::prelude::*;

use ingestion::infrastructure::repositories::{connect, processed_file};
use ingestion::infrastructure::repositories::SqliteProcessedFileRepository;
use ingestion::infrastructure::transform::StringTransformationService;
use ingestion_domain::services::TransformationService;
use ingestion_domain::value_objects::{ClientId, InterfaceId, TransformationChain};

fn non_empty_ascii() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}".prop_filter("must contain a non-space character", |s| !s.trim().is_empty())
}

proptest! {
    #[test]
    fn uppercase_is_idempotent(s in non_empty_ascii()) {
        let svc = StringTransformationService::new();
        let chain_once = TransformationChain::parse("uppercase");
        let chain_twice = TransformationChain::parse("uppercase|uppercase");
        prop_assert_eq!(svc.apply_chain(Some(&s), &chain_once), svc.apply_chain(Some(&s), &chain_twice));
    }

    #[test]
    fn trim_is_idempotent(s in non_empty_ascii()) {
        let svc = StringTransformationService::new();
        let padded = format!("  {s}  ");
        let chain_once = TransformationChain::parse("trim");
        let chain_twice = TransformationChain::parse("trim|trim");
        prop_assert_eq!(svc.apply_chain(Some(&padded), &chain_once), svc.apply_chain(Some(&padded), &chain_twice));
    }

    #[test]
    fn remove_leading_zeros_is_idempotent(digits in "[0-9]{1,12}") {
        let svc = StringTransformationService::new();
        let chain_once = TransformationChain::parse("remove_leading_zeros");
        let chain_twice = TransformationChain::parse("remove_leading_zeros|remove_leading_zeros");
        prop_assert_eq!(svc.apply_chain(Some(&digits), &chain_once), svc.apply_chain(Some(&digits), &chain_twice));
    }

    #[test]
    fn find_or_create_processed_file_never_duplicates_a_ledger_row(file_name in "[a-z]{1,12}\\.xml") {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let pool = connect("sqlite::memory:", 1).await.unwrap();
            let repo = SqliteProcessedFileRepository::new(pool);
            let client_id = ClientId::new();
            let interface_id = InterfaceId::new();

            let first = processed_file::find_or_create(&repo, &file_name, client_id, interface_id).await.unwrap();
            let second = processed_file::find_or_create(&repo, &file_name, client_id, interface_id).await.unwrap();
            prop_assert_eq!(first.id(), second.id());
            Ok(())
        })?;
    }
}
