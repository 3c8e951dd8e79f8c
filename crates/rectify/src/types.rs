//! Shared application state.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::RectifyConfig;
use crate::db::RequestStore;
use crate::planner::SisClient;

/// A key derived from a boleta, used for per-student locking and logging.
///
/// The boleta is hashed so that log lines and lock maps never carry the raw
/// credential.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn from_boleta(boleta: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(boleta.as_bytes());
        let result = hasher.finalize();
        let hash = result[..16]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>();
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show first 8 chars
        write!(f, "{}...", &self.0[..8.min(self.0.len())])
    }
}

/// External verifier for the boleta/codigo/dni triple.
///
/// The real check lives in the payment system; the portal only consumes a
/// yes/no answer.
pub trait BoletaVerifier: Send + Sync {
    fn verify(&self, boleta: &str, codigo: &str, dni: &str) -> bool;
}

/// Placeholder verifier: accepts any non-empty triple.
// TODO: replace with the SIGU payment-system check once its endpoint is provisioned
pub struct StubVerifier;

impl BoletaVerifier for StubVerifier {
    fn verify(&self, boleta: &str, codigo: &str, dni: &str) -> bool {
        !boleta.is_empty() && !codigo.is_empty() && !dni.is_empty()
    }
}

/// State shared across request handlers.
pub struct AppState {
    pub config: RectifyConfig,
    pub client: SisClient,
    pub store: RequestStore,
    pub verifier: Box<dyn BoletaVerifier>,
    /// Per-boleta locks so one student cannot run two plans at once
    plan_locks: DashMap<RequestKey, Arc<tokio::sync::Mutex<()>>>,
}

impl AppState {
    pub fn new(
        config: RectifyConfig,
        client: SisClient,
        store: RequestStore,
        verifier: Box<dyn BoletaVerifier>,
    ) -> Self {
        Self {
            config,
            client,
            store,
            verifier,
            plan_locks: DashMap::new(),
        }
    }

    /// Gets or creates the lock for the given student.
    pub fn get_plan_lock(&self, key: &RequestKey) -> Arc<tokio::sync::Mutex<()>> {
        self.plan_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_stable_and_masked() {
        let a = RequestKey::from_boleta("B-1000");
        let b = RequestKey::from_boleta("B-1000");
        let c = RequestKey::from_boleta("B-1001");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.as_str().contains("B-1000"));
        assert!(format!("{}", a).ends_with("..."));
    }

    #[test]
    fn test_stub_verifier_rejects_empty_fields() {
        let v = StubVerifier;
        assert!(v.verify("b", "c", "d"));
        assert!(!v.verify("", "c", "d"));
        assert!(!v.verify("b", "", "d"));
        assert!(!v.verify("b", "c", ""));
    }
}
