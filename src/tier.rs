//! Ordered fallback chains.
//!
//! A classifier is a list of [`Tier`]s tried in order plus a static default.
//! A tier either resolves the text, declines (`Ok(None)`, e.g. its model is
//! not loaded), or fails. Failures, panics included, are logged and the
//! next tier is tried.

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use metrics::counter;
use std::panic::AssertUnwindSafe;

#[async_trait]
pub trait Tier<L>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, text: &str) -> Result<Option<L>>;
}

/// Which tier produced a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<L> {
    pub label: L,
    pub tier: &'static str,
}

pub const DEFAULT_TIER: &str = "default";

pub struct FallbackChain<L> {
    classifier: &'static str,
    tiers: Vec<Box<dyn Tier<L>>>,
    default: L,
}

impl<L: Copy + Send + Sync + std::fmt::Debug> FallbackChain<L> {
    pub fn new(classifier: &'static str, default: L) -> Self {
        Self {
            classifier,
            tiers: Vec::new(),
            default,
        }
    }

    pub fn with_tier(mut self, tier: impl Tier<L> + 'static) -> Self {
        self.tiers.push(Box::new(tier));
        self
    }

    /// Runs the tiers in order and stops at the first that resolves.
    pub async fn resolve(&self, text: &str) -> Resolution<L> {
        for tier in &self.tiers {
            let attempt = AssertUnwindSafe(tier.attempt(text))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(anyhow::anyhow!(panic_message(panic.as_ref()))));

            match attempt {
                Ok(Some(label)) => {
                    tracing::debug!(classifier = self.classifier, tier = tier.name(), ?label, "Resolved");
                    return self.record(Resolution {
                        label,
                        tier: tier.name(),
                    });
                }
                Ok(None) => {
                    tracing::trace!(classifier = self.classifier, tier = tier.name(), "Tier unavailable");
                }
                Err(e) => {
                    tracing::warn!(
                        classifier = self.classifier,
                        tier = tier.name(),
                        error = %e,
                        "Tier failed, falling back"
                    );
                }
            }
        }

        self.record(Resolution {
            label: self.default,
            tier: DEFAULT_TIER,
        })
    }

    fn record(&self, resolution: Resolution<L>) -> Resolution<L> {
        counter!(
            "classifier_tier_resolutions_total",
            "classifier" => self.classifier,
            "tier" => resolution.tier
        )
        .increment(1);
        resolution
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
