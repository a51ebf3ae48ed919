// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Generic ID Value Object
//!
//! A type-safe ID wrapper over ULID with a phantom category marker, so that
//! `ClientId` and `InterfaceId` cannot be confused at compile time even
//! though both are, at runtime, just a ULID. Every entity in this crate is
//! identified this way rather than by a database auto-increment integer;
//! `spec.md`'s "numeric identity, never cyclic object references" invariant
//! is satisfied because a ULID is an opaque, time-sortable identity compared
//! and stored by value, never a pointer into another entity's memory.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::marker::PhantomData;
use ulid::Ulid;

use crate::error::IngestionError;

/// Per-category validation hook for [`GenericId`].
pub trait IdCategory {
    fn category_name() -> &'static str;

    fn validate_id(ulid: &Ulid) -> Result<(), IngestionError> {
        if *ulid == Ulid::nil() {
            return Err(IngestionError::validation(
                Self::category_name(),
                "id cannot be nil",
            ));
        }
        Ok(())
    }
}

/// Foundational ID implementation that every specific entity ID composes.
/// Not used directly — see `ClientId`, `InterfaceId`, etc.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GenericId<T: IdCategory> {
    value: Ulid,
    _phantom: PhantomData<T>,
}

impl<T: IdCategory> Serialize for GenericId<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.to_string().serialize(serializer)
    }
}

impl<'de, T: IdCategory> Deserialize<'de> for GenericId<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let ulid = Ulid::from_string(&s).map_err(|e| serde::de::Error::custom(e.to_string()))?;
        Ok(Self {
            value: ulid,
            _phantom: PhantomData,
        })
    }
}

impl<T: IdCategory> GenericId<T> {
    /// Generates a new, time-ordered id.
    pub fn new() -> Self {
        Self {
            value: Ulid::new(),
            _phantom: PhantomData,
        }
    }

    /// Parses and validates an id from its canonical string form.
    pub fn parse(s: &str) -> Result<Self, IngestionError> {
        let ulid = Ulid::from_string(s)
            .map_err(|e| IngestionError::validation(T::category_name(), e.to_string()))?;
        T::validate_id(&ulid)?;
        Ok(Self {
            value: ulid,
            _phantom: PhantomData,
        })
    }

    pub fn from_ulid(ulid: Ulid) -> Result<Self, IngestionError> {
        T::validate_id(&ulid)?;
        Ok(Self {
            value: ulid,
            _phantom: PhantomData,
        })
    }

    pub fn as_ulid(&self) -> Ulid {
        self.value
    }
}

impl<T: IdCategory> Default for GenericId<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IdCategory> Display for GenericId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: IdCategory> Copy for GenericId<T> {}
