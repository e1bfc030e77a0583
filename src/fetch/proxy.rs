//! Round-robin proxy identities
//!
//! An identity marked blocked is skipped for the rest of the process. A
//! rotator with no identities means direct connections.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

/// A proxy endpoint, e.g. `http://10.0.0.1:3128`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyIdentity(String);

impl ProxyIdentity {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProxyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct RotatorState {
    identities: Vec<ProxyIdentity>,
    blocked: HashSet<ProxyIdentity>,
    cursor: usize,
}

#[derive(Debug, Default)]
pub struct ProxyRotator {
    state: Mutex<RotatorState>,
}

impl ProxyRotator {
    pub fn new(identities: impl IntoIterator<Item = ProxyIdentity>) -> Self {
        Self {
            state: Mutex::new(RotatorState {
                identities: identities.into_iter().collect(),
                ..RotatorState::default()
            }),
        }
    }

    /// A rotator that always connects directly
    pub fn direct() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RotatorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Next non-blocked identity in round-robin order
    pub fn next(&self) -> Option<ProxyIdentity> {
        let mut state = self.state();
        let count = state.identities.len();
        for offset in 0..count {
            let position = (state.cursor + offset) % count;
            let candidate = &state.identities[position];
            if !state.blocked.contains(candidate) {
                let identity = candidate.clone();
                state.cursor = (position + 1) % count;
                return Some(identity);
            }
        }
        None
    }

    /// Removes an identity from rotation for the process lifetime
    pub fn mark_blocked(&self, identity: &ProxyIdentity) {
        let mut state = self.state();
        if state.blocked.insert(identity.clone()) {
            tracing::warn!(
                "Proxy {} blocked ({}/{} remaining)",
                identity,
                state.identities.len().saturating_sub(state.blocked.len()),
                state.identities.len()
            );
        }
    }

    /// True when no identities are configured
    pub fn is_direct(&self) -> bool {
        self.state().identities.is_empty()
    }

    /// True when identities are configured and every one is blocked
    pub fn is_exhausted(&self) -> bool {
        let state = self.state();
        !state.identities.is_empty()
            && state
                .identities
                .iter()
                .all(|identity| state.blocked.contains(identity))
    }

    pub fn remaining(&self) -> usize {
        let state = self.state();
        state
            .identities
            .iter()
            .filter(|identity| !state.blocked.contains(*identity))
            .count()
    }
}
