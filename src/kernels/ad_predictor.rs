//! # Ad slot prediction kernel.
//!
//! Watches browsing signals (`reel_view`, `search_query`, `product_view`)
//! and asks the ads collaborator to pre-compute slot predictions for the
//! user's current interests.
//!
//! ## Decision logic
//! - Top 3 categories by frequency across the scanned events; ties keep
//!   first-seen order (stable sort on descending count).
//! - Up to 5 most recent non-empty search query strings, newest first.
//! - Budget in cents: `round(100 * min(2, (reels + products) / 20))`.
//! - Confidence: `min(0.95, 0.5 + total_events / 100)`.
//!
//! One `ads.predict_ad_slots` command per tick, and only when at least one
//! qualifying event exists.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use crate::error::KernelError;
use crate::events::Event;

use super::context::KernelContext;
use super::kernel::Kernel;

const REEL_VIEW: &str = "reel_view";
const SEARCH_QUERY: &str = "search_query";
const PRODUCT_VIEW: &str = "product_view";

/// Predicts ad slots from recent browsing signals.
pub struct AdPredictor {
    scan_limit: usize,
}

impl AdPredictor {
    /// Creates the kernel with the given per-type scan window.
    pub fn new(scan_limit: usize) -> Self {
        Self { scan_limit }
    }
}

impl Default for AdPredictor {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl Kernel for AdPredictor {
    fn name(&self) -> &str {
        "ad_predictor"
    }

    fn priority(&self) -> u8 {
        8
    }

    fn max_concurrency(&self) -> usize {
        2
    }

    async fn run(&self, ctx: &KernelContext) -> Result<(), KernelError> {
        let reels = ctx.recent(REEL_VIEW, self.scan_limit);
        let searches = ctx.recent(SEARCH_QUERY, self.scan_limit);
        let products = ctx.recent(PRODUCT_VIEW, self.scan_limit);

        let total = reels.len() + searches.len() + products.len();
        if total == 0 {
            return Ok(());
        }

        let categories = top_categories(
            reels.iter().chain(searches.iter()).chain(products.iter()),
            3,
        );
        let queries: Vec<String> = searches
            .iter()
            .rev()
            .filter_map(|ev| ev.meta_str("query"))
            .filter(|q| !q.trim().is_empty())
            .take(5)
            .map(str::to_string)
            .collect();

        let engagement = reels.len() + products.len();
        let budget_cents = (100.0 * (engagement as f64 / 20.0).min(2.0)).round() as u64;
        let confidence = (0.5 + total as f64 / 100.0).min(0.95);

        ctx.invoke(
            "ads",
            "predict_ad_slots",
            json!({
                "categories": categories,
                "queries": queries,
                "budget_cents": budget_cents,
                "confidence": confidence,
            }),
        )
        .await?;
        Ok(())
    }
}

/// Most frequent `category` metadata values, descending by count; ties keep
/// first-seen order.
fn top_categories<'a>(events: impl Iterator<Item = &'a Event>, take: usize) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for ev in events {
        if let Some(category) = ev.meta_str("category") {
            if category.is_empty() {
                continue;
            }
            if !counts.contains_key(category) {
                order.push(category.to_string());
            }
            *counts.entry(category.to_string()).or_insert(0) += 1;
        }
    }
    order.sort_by(|a, b| counts[b.as_str()].cmp(&counts[a.as_str()]));
    order.truncate(take);
    order
}
