// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `MessageEnvelope` (`spec.md` §3/§6): the in-flight record carried on the
//! message bus for one file. Never persisted by the core; the wire format is
//! `{file_bytes (base64), file_name, client_id, interface_id, priority,
//! enqueued_at}` as JSON (`spec.md` §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ClientId, InterfaceId, Priority};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(with = "base64_bytes")]
    pub file_bytes: Vec<u8>,
    pub file_name: String,
    pub client_id: ClientId,
    pub interface_id: InterfaceId,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
}

impl MessageEnvelope {
    pub fn new(
        file_bytes: Vec<u8>,
        file_name: impl Into<String>,
        client_id: ClientId,
        interface_id: InterfaceId,
        priority: Priority,
    ) -> Self {
        Self {
            file_bytes,
            file_name: file_name.into(),
            client_id,
            interface_id,
            priority,
            enqueued_at: Utc::now(),
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let envelope = MessageEnvelope::new(
            b"<ASN/>".to_vec(),
            "file.xml",
            ClientId::new(),
            InterfaceId::new(),
            Priority::High,
        );
        let json = serde_json::to_string(&envelope).unwrap();
        let back: MessageEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file_bytes, envelope.file_bytes);
        assert_eq!(back.file_name, envelope.file_name);
    }
}
