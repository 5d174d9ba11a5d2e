//! Token usage and cost accounting

use serde::{Deserialize, Serialize};

use crate::provider::Usage;

/// Per-million-token rates in USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_mtok: 2.50,
            output_per_mtok: 10.00,
        }
    }
}

/// Cumulative totals as sent to the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_requests: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_usd: f64,
}

/// Running per-session totals
#[derive(Debug, Clone, Default)]
pub struct CostTracker {
    pricing: Pricing,
    requests: u64,
    input_tokens: u64,
    output_tokens: u64,
}

impl CostTracker {
    pub fn new(pricing: Pricing) -> Self {
        Self {
            pricing,
            ..Default::default()
        }
    }

    /// Record one provider request
    pub fn record(&mut self, usage: Usage) {
        self.requests += 1;
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
    }

    /// Estimated spend so far
    pub fn cost_usd(&self) -> f64 {
        (self.input_tokens as f64 * self.pricing.input_per_mtok
            + self.output_tokens as f64 * self.pricing.output_per_mtok)
            / 1_000_000.0
    }

    pub fn summary(&self) -> CostSummary {
        CostSummary {
            total_requests: self.requests,
            total_input_tokens: self.input_tokens,
            total_output_tokens: self.output_tokens,
            total_cost_usd: self.cost_usd(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_and_cost() {
        let mut tracker = CostTracker::new(Pricing::default());
        tracker.record(Usage { input_tokens: 1_000_000, output_tokens: 0 });
        tracker.record(Usage { input_tokens: 0, output_tokens: 500_000 });

        let summary = tracker.summary();
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.total_input_tokens, 1_000_000);
        assert_eq!(summary.total_output_tokens, 500_000);
        assert!((summary.total_cost_usd - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_tracker() {
        let tracker = CostTracker::new(Pricing { input_per_mtok: 1.0, output_per_mtok: 1.0 });
        assert_eq!(tracker.summary(), CostSummary::default());
    }
}
