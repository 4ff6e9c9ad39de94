//! Network reachability
//!
//! The cache interceptor probes connectivity before every request. With no
//! network at all, every request is answered from the cache or not at all.

use std::fmt;

/// Connectivity as reported by the host platform. Defaults to `Wifi`; only
/// an explicit `None` turns requests into cache-only lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NetworkState {
    None,
    #[default]
    Wifi,
    Cellular2G,
    Cellular3G,
    Cellular4G,
    CellularOther,
}

impl NetworkState {
    #[must_use]
    pub fn is_connected(self) -> bool {
        self != NetworkState::None
    }

    #[must_use]
    pub fn is_cellular(self) -> bool {
        matches!(
            self,
            NetworkState::Cellular2G
                | NetworkState::Cellular3G
                | NetworkState::Cellular4G
                | NetworkState::CellularOther
        )
    }
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetworkState::None => "none",
            NetworkState::Wifi => "wifi",
            NetworkState::Cellular2G => "2g",
            NetworkState::Cellular3G => "3g",
            NetworkState::Cellular4G => "4g",
            NetworkState::CellularOther => "cellular",
        })
    }
}

/// Connectivity probe.
pub trait Reachability: Send + Sync {
    fn network_state(&self) -> NetworkState;
}

impl<F> Reachability for F
where
    F: Fn() -> NetworkState + Send + Sync,
{
    fn network_state(&self) -> NetworkState {
        self()
    }
}

/// Always reports the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticReachability(pub NetworkState);

impl StaticReachability {
    #[must_use]
    pub fn online() -> Self {
        Self(NetworkState::Wifi)
    }

    #[must_use]
    pub fn offline() -> Self {
        Self(NetworkState::None)
    }
}

impl Default for StaticReachability {
    fn default() -> Self {
        Self::online()
    }
}

impl Reachability for StaticReachability {
    fn network_state(&self) -> NetworkState {
        self.0
    }
}
