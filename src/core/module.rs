//! Compiled modules and the live instances built from them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::utils::hash::fingerprint;

/// Live object built from a module by the host runtime.
///
/// Opaque to the reload subsystem; it is stored, swapped and handed back.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Opaque loadable unit produced by a compilation pipeline.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(with = "hex_payload")]
    payload: Vec<u8>,
    fingerprint: String,
}

impl Module {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let fingerprint = fingerprint(&payload);
        Self {
            payload,
            fingerprint,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Short content hash of the payload.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("fingerprint", &self.fingerprint)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// Payload bytes as a hex string, so persisted snapshots stay compact JSON.
mod hex_payload {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_fingerprint_tracks_payload() {
        let a = Module::new(b"return 1".to_vec());
        let b = Module::new(b"return 1".to_vec());
        let c = Module::new(b"return 2".to_vec());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn test_module_persists_as_hex() {
        let module = Module::new(vec![0xde, 0xad]);
        let json = serde_json::to_value(&module).unwrap();
        assert_eq!(json["payload"], "dead");

        let back: Module = serde_json::from_value(json).unwrap();
        assert_eq!(back, module);
    }
}
