//! The ordered ring of endpoints an adapter fails over across.

use arb_types::RpcEndpoint;

/// Owns an ordered list of endpoints plus the index of the one currently in
/// use. Advancing wraps modulo the endpoint count, matching the boundary
/// behavior in `SPEC_FULL.md` §8: "RPC failover advances the ring index by
/// exactly one per failure, modulo endpoint count."
#[derive(Clone, Debug)]
pub struct EndpointRing {
    endpoints: Vec<RpcEndpoint>,
    current: usize,
}

impl EndpointRing {
    pub fn new(urls: impl IntoIterator<Item = String>) -> Self {
        let endpoints: Vec<RpcEndpoint> = urls.into_iter().map(RpcEndpoint::new).collect();
        assert!(!endpoints.is_empty(), "endpoint ring requires at least one URL");
        Self { endpoints, current: 0 }
    }

    pub fn current(&self) -> &RpcEndpoint {
        &self.endpoints[self.current]
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Advances to the next endpoint, recording a failure on the one being left behind.
    pub fn advance(&mut self) {
        self.endpoints[self.current].failure_count += 1;
        self.current = (self.current + 1) % self.endpoints.len();
        tracing::warn!(
            endpoint = %self.current().url,
            index = self.current,
            "RPC endpoint switched after transport failure"
        );
    }
}
