//! Client side of the handshake.

use std::sync::Arc;

use netszr_protocol::HandshakeMessage;
use netszr_strings::{HASH_LEN, MappedStringDict, MappedStrings, PackageHash, StringCache};

use crate::{HandshakeConfig, HandshakeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    AwaitingServer,
    AwaitingPackage { expected: PackageHash },
    Complete,
    Failed,
}

/// Walks the client through one handshake against a server.
///
/// ```text
/// AwaitingServer ──(cache hit)──────────────────────→ Complete
///       │
///       └──(cache miss)──→ AwaitingPackage ──(verified)──→ Complete
///                                 │
///                                 └──(bad package)──→ Failed
/// ```
pub struct HandshakeClient {
    dict: Arc<MappedStringDict>,
    cache: Option<StringCache>,
    state: ClientState,
}

impl HandshakeClient {
    pub fn new(dict: Arc<MappedStringDict>, config: &HandshakeConfig) -> Self {
        Self::with_cache(dict, config.cache_dir.clone().map(StringCache::new))
    }

    pub fn with_cache(dict: Arc<MappedStringDict>, cache: Option<StringCache>) -> Self {
        Self {
            dict,
            cache,
            state: ClientState::AwaitingServer,
        }
    }

    pub fn dict(&self) -> &Arc<MappedStringDict> {
        &self.dict
    }

    pub fn is_complete(&self) -> bool {
        self.state == ClientState::Complete
    }

    /// Handles `ServerHandshake { hash }` and returns the reply.
    ///
    /// Replies `needs_strings: false` if the table for `hash` is already
    /// adopted or found in the cache, `needs_strings: true` otherwise.
    pub fn on_server_handshake(&mut self, hash: &[u8]) -> Result<HandshakeMessage, HandshakeError> {
        if self.state != ClientState::AwaitingServer {
            return Err(self.fail(HandshakeError::ProtocolViolation(
                "unexpected server handshake".into(),
            )));
        }
        let Some(hash) = PackageHash::from_slice(hash) else {
            return Err(self.fail(HandshakeError::ProtocolViolation(format!(
                "hash must be {HASH_LEN} bytes, got {}",
                hash.len()
            ))));
        };

        if let Ok(table) = self.dict.frozen().map(Arc::clone) {
            if *table.hash() == hash {
                tracing::debug!(%hash, "string table already adopted");
                return Ok(self.complete());
            }
            return Err(self.fail(HandshakeError::HashMismatch {
                expected: hash.to_string(),
                actual: table.hash().to_string(),
            }));
        }

        if let Some(table) = self.load_cached(&hash) {
            tracing::info!(%hash, count = table.len(), "using cached string package");
            self.dict.adopt(Arc::new(table))?;
            return Ok(self.complete());
        }

        tracing::debug!(%hash, "requesting string package");
        self.state = ClientState::AwaitingPackage { expected: hash };
        Ok(HandshakeMessage::ClientHandshake {
            needs_strings: true,
        })
    }

    /// Handles `StringsPackage { package }` and returns the confirmation.
    ///
    /// The package must hash to the value the server advertised. A
    /// mismatch is fatal.
    pub fn on_strings_package(&mut self, package: &[u8]) -> Result<HandshakeMessage, HandshakeError> {
        let ClientState::AwaitingPackage { expected } = self.state else {
            return Err(self.fail(HandshakeError::ProtocolViolation(
                "unexpected strings package".into(),
            )));
        };

        let table = match MappedStrings::from_package(package, self.dict.limits()) {
            Ok(table) => table,
            Err(e) => return Err(self.fail(HandshakeError::InvalidPackage(e))),
        };
        if *table.hash() != expected {
            return Err(self.fail(HandshakeError::HashMismatch {
                expected: expected.to_string(),
                actual: table.hash().to_string(),
            }));
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&table) {
                tracing::warn!(hash = %expected, error = %e, "failed to cache string package");
            }
        }

        tracing::info!(hash = %expected, count = table.len(), "adopted string package from server");
        self.dict.adopt(Arc::new(table))?;
        Ok(self.complete())
    }

    fn load_cached(&self, hash: &PackageHash) -> Option<MappedStrings> {
        let cache = self.cache.as_ref()?;
        match cache.load(hash, self.dict.limits()) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%hash, error = %e, "failed to read string cache");
                None
            }
        }
    }

    fn complete(&mut self) -> HandshakeMessage {
        self.state = ClientState::Complete;
        HandshakeMessage::ClientHandshake {
            needs_strings: false,
        }
    }

    fn fail(&mut self, error: HandshakeError) -> HandshakeError {
        self.state = ClientState::Failed;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_table() -> Arc<MappedStrings> {
        let dict = MappedStringDict::default();
        dict.add_string("textures/metal_wall").unwrap();
        dict.finalize().unwrap()
    }

    fn client(cache: Option<StringCache>) -> HandshakeClient {
        HandshakeClient::with_cache(Arc::new(MappedStringDict::default()), cache)
    }

    #[test]
    fn test_cache_miss_requests_strings() {
        let table = server_table();
        let mut client = client(None);

        let reply = client.on_server_handshake(table.hash().as_bytes()).unwrap();

        assert_eq!(reply, HandshakeMessage::ClientHandshake { needs_strings: true });
        assert!(!client.is_complete());
    }

    #[test]
    fn test_package_adopted_after_miss() {
        let table = server_table();
        let mut client = client(None);
        client.on_server_handshake(table.hash().as_bytes()).unwrap();

        let reply = client.on_strings_package(table.package()).unwrap();

        assert_eq!(reply, HandshakeMessage::ClientHandshake { needs_strings: false });
        assert!(client.is_complete());
        assert_eq!(client.dict().frozen().unwrap().strings(), table.strings());
    }

    #[test]
    fn test_cache_hit_skips_package() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StringCache::new(dir.path());
        let table = server_table();
        cache.store(&table).unwrap();
        let mut client = client(Some(cache));

        let reply = client.on_server_handshake(table.hash().as_bytes()).unwrap();

        assert_eq!(reply, HandshakeMessage::ClientHandshake { needs_strings: false });
        assert!(client.is_complete());
    }

    #[test]
    fn test_received_package_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StringCache::new(dir.path());
        let table = server_table();
        let mut client = client(Some(cache.clone()));
        client.on_server_handshake(table.hash().as_bytes()).unwrap();
        client.on_strings_package(table.package()).unwrap();

        assert!(cache.path_for(table.hash()).exists());
    }

    #[test]
    fn test_package_with_other_hash_is_mismatch() {
        let table = server_table();
        let other = {
            let dict = MappedStringDict::default();
            dict.add_string("reinforced window").unwrap();
            dict.finalize().unwrap()
        };
        let mut client = client(None);
        client.on_server_handshake(table.hash().as_bytes()).unwrap();

        let result = client.on_strings_package(other.package());

        assert!(matches!(result, Err(HandshakeError::HashMismatch { .. })));
        assert!(!client.is_complete());
        assert!(client.dict().frozen().is_err());
    }

    #[test]
    fn test_short_hash_is_violation() {
        let mut client = client(None);
        assert!(matches!(
            client.on_server_handshake(&[1, 2, 3]),
            Err(HandshakeError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_package_before_server_handshake_is_violation() {
        let table = server_table();
        let mut client = client(None);
        assert!(matches!(
            client.on_strings_package(table.package()),
            Err(HandshakeError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_corrupt_package_fails() {
        let table = server_table();
        let mut client = client(None);
        client.on_server_handshake(table.hash().as_bytes()).unwrap();

        let result = client.on_strings_package(&[0u8; 40]);

        let err = result.unwrap_err();
        assert!(matches!(err, HandshakeError::InvalidPackage(_)));
        assert!(err.is_peer_fault());
        assert!(!client.is_complete());
    }
}
