use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes drawn per [`Handle`], giving 160 bits of
/// entropy once hex-encoded (40 hex characters).
const HANDLE_BYTES: usize = 20;

/// Opaque, process-unique identifier for an exported method or a
/// pending reply. Rendered on the wire as lowercase hex text.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Wrap an already-generated hex string as a `Handle` without
    /// validation. Used by transports reconstructing handles read off
    /// the wire.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Handle(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Collaborator responsible for minting fresh [`Handle`]s. The core
/// makes no assumption about how randomness is sourced; a Capnode is
/// constructed with an `Arc<dyn IdSource>` so callers may substitute a
/// deterministic source in tests or a hardware RNG in production.
pub trait IdSource: Send + Sync {
    fn next_handle(&self) -> Handle;
}

/// Default [`IdSource`]: draws [`HANDLE_BYTES`] bytes from the thread's
/// CSPRNG and hex-encodes them, giving ≥160 bits of entropy per handle.
#[derive(Default)]
pub struct DefaultIdSource;

impl IdSource for DefaultIdSource {
    fn next_handle(&self) -> Handle {
        let mut bytes = [0u8; HANDLE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Handle(hex::encode(bytes))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Deterministic `IdSource` for tests: emits `"test-<n>"` in
    /// increasing order, so assertions can predict handles.
    #[derive(Default)]
    pub struct CountingIdSource(AtomicU64);

    impl IdSource for CountingIdSource {
        fn next_handle(&self) -> Handle {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Handle(format!("test-{:04}", n))
        }
    }
}
