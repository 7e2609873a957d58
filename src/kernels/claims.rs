//! # Unclaimed-entity outreach kernel.
//!
//! Triggered by `contact_import` and `daily_claim_scan` events. Asks the
//! social-graph collaborator for unclaimed entities with candidate claimers
//! and requests claim invites for matches above the confidence bar.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::KernelError;

use super::context::KernelContext;
use super::kernel::Kernel;

const CONTACT_IMPORT: &str = "contact_import";
const DAILY_CLAIM_SCAN: &str = "daily_claim_scan";

/// Hunts for unclaimed entities their likely owners should be invited to claim.
pub struct ClaimHunter {
    scan_limit: usize,
    min_confidence: f64,
}

impl ClaimHunter {
    /// Creates the kernel with the given scan window and confidence bar.
    pub fn new(scan_limit: usize, min_confidence: f64) -> Self {
        Self {
            scan_limit,
            min_confidence,
        }
    }
}

impl Default for ClaimHunter {
    /// 100-event scan window, matches must exceed 0.7 confidence.
    fn default() -> Self {
        Self::new(100, 0.7)
    }
}

#[async_trait]
impl Kernel for ClaimHunter {
    fn name(&self) -> &str {
        "claim_hunter"
    }

    fn priority(&self) -> u8 {
        5
    }

    async fn run(&self, ctx: &KernelContext) -> Result<(), KernelError> {
        let imports = ctx.recent(CONTACT_IMPORT, self.scan_limit);
        let scans = ctx.recent(DAILY_CLAIM_SCAN, self.scan_limit);
        if imports.is_empty() && scans.is_empty() {
            return Ok(());
        }

        let importer_ids: Vec<&str> = imports.iter().filter_map(|ev| ev.id("user_id")).collect();

        let answer = ctx
            .invoke(
                "social",
                "find_unclaimed_matches",
                json!({
                    "importer_ids": importer_ids,
                    "full_scan": !scans.is_empty(),
                }),
            )
            .await?;

        let matches: Vec<Value> = answer.as_array().cloned().unwrap_or_default();
        let qualified: Vec<Value> = matches
            .into_iter()
            .filter(|m| {
                m.get("confidence")
                    .and_then(Value::as_f64)
                    .map(|c| c > self.min_confidence)
                    .unwrap_or(false)
            })
            .collect();
        if qualified.is_empty() {
            return Ok(());
        }

        ctx.invoke(
            "social",
            "generate_claim_invites",
            json!({ "matches": qualified }),
        )
        .await?;
        Ok(())
    }
}
