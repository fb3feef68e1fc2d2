//! Transformer Chain - Sequential delivery transformation
//!
//! The `Chain` applies a channel's transformers in order.
//!
//! # Design
//!
//! - **Zero-cost when empty**: Empty chain hands back the same `Arc`
//! - **Sequential execution**: Each stage receives the previous stage's output
//! - **Skip on failure**: A failing stage is logged and bypassed
//! - **Copy-on-write**: `with` / `without` build a new chain so a published
//!   chain is never modified while partitions read it

use std::sync::Arc;

use courier_protocol::Delivery;

use crate::Transformer;

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Result of running a delivery through a chain
#[derive(Debug)]
pub struct ChainOutput {
    /// Delivery after the last successful stage
    pub delivery: Arc<Delivery>,
    /// Stages that produced output
    pub applied: usize,
    /// Stages that failed and were bypassed
    pub skipped: usize,
}

/// Ordered list of transformers, unique by address
#[derive(Clone, Default)]
pub struct Chain {
    transformers: Vec<Arc<dyn Transformer>>,
}

impl Chain {
    /// Create a chain, dropping later duplicates of an address
    pub fn new(transformers: Vec<Arc<dyn Transformer>>) -> Self {
        let mut chain = Self::empty();
        for transformer in transformers {
            if !chain.contains(transformer.address()) {
                chain.transformers.push(transformer);
            }
        }
        chain
    }

    /// Create an empty chain (no-op)
    pub fn empty() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    /// Get the number of transformers
    #[inline]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Check if the chain is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Addresses in application order
    pub fn addresses(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.address()).collect()
    }

    /// Check if a transformer with this address is present
    pub fn contains(&self, address: &str) -> bool {
        self.transformers.iter().any(|t| t.address() == address)
    }

    /// New chain with `transformer` appended, or `None` if its address is
    /// already present
    pub fn with(&self, transformer: Arc<dyn Transformer>) -> Option<Self> {
        if self.contains(transformer.address()) {
            return None;
        }
        let mut transformers = self.transformers.clone();
        transformers.push(transformer);
        Some(Self { transformers })
    }

    /// New chain without `address`, or `None` if it is absent
    pub fn without(&self, address: &str) -> Option<Self> {
        if !self.contains(address) {
            return None;
        }
        let transformers = self
            .transformers
            .iter()
            .filter(|t| t.address() != address)
            .cloned()
            .collect();
        Some(Self { transformers })
    }

    /// Run a delivery through every stage in order
    ///
    /// Failures are logged and skipped; the delivery that entered a failing
    /// stage continues to the next one.
    pub async fn apply(&self, delivery: Arc<Delivery>) -> ChainOutput {
        let mut current = delivery;
        let mut applied = 0;
        let mut skipped = 0;

        for transformer in &self.transformers {
            match transformer.apply(&current).await {
                Ok(next) => {
                    current = next;
                    applied += 1;
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(
                        transformer = %transformer.address(),
                        uid = %current.uid(),
                        error = %e,
                        "transformer failed, skipping"
                    );
                }
            }
        }

        ChainOutput {
            delivery: current,
            applied,
            skipped,
        }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.addresses()).finish()
    }
}
