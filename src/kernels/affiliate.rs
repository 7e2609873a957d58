//! # Affiliate commission routing kernel.
//!
//! Tracks referral share clicks and allocates tiered commissions on
//! completed purchases.
//!
//! Tier is derived from the referrer's lifetime referral count, fetched
//! through the collaborator (`affiliates.lookup_referral_count`). A `Null`
//! or non-numeric answer counts as zero referrals, so with the reference
//! collaborator every purchase resolves to bronze.

use async_trait::async_trait;
use serde_json::json;

use crate::error::KernelError;

use super::context::KernelContext;
use super::kernel::Kernel;

const SHARE_CLICK: &str = "share_click";
const PURCHASE_COMPLETE: &str = "purchase_complete";

/// Commission tier keyed by lifetime referral count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    /// Tier thresholds: bronze `[0,5)`, silver `[5,20)`, gold `[20,50)`,
    /// platinum `[50,..)`.
    fn for_referrals(referrals: u64) -> Self {
        match referrals {
            0..=4 => Tier::Bronze,
            5..=19 => Tier::Silver,
            20..=49 => Tier::Gold,
            _ => Tier::Platinum,
        }
    }

    fn rate(self) -> f64 {
        match self {
            Tier::Bronze => 0.05,
            Tier::Silver => 0.08,
            Tier::Gold => 0.12,
            Tier::Platinum => 0.15,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
        }
    }
}

/// Routes referral tracking and tiered commission allocation.
pub struct AffiliateRouter {
    scan_limit: usize,
}

impl AffiliateRouter {
    /// Creates the kernel with the given per-type scan window.
    pub fn new(scan_limit: usize) -> Self {
        Self { scan_limit }
    }
}

impl Default for AffiliateRouter {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl Kernel for AffiliateRouter {
    fn name(&self) -> &str {
        "affiliate_router"
    }

    fn priority(&self) -> u8 {
        9
    }

    fn max_concurrency(&self) -> usize {
        3
    }

    async fn run(&self, ctx: &KernelContext) -> Result<(), KernelError> {
        let shares = ctx.recent(SHARE_CLICK, self.scan_limit);
        let purchases = ctx.recent(PURCHASE_COMPLETE, self.scan_limit);
        if shares.is_empty() && purchases.is_empty() {
            return Ok(());
        }

        for ev in &shares {
            let (user_id, referral_code) = match (ev.id("user_id"), ev.id("referral_code")) {
                (Some(user_id), Some(referral_code)) => (user_id, referral_code),
                _ => continue,
            };
            ctx.invoke(
                "affiliates",
                "track_referral",
                json!({ "user_id": user_id, "referral_code": referral_code }),
            )
            .await?;
        }

        for ev in &purchases {
            let referral_code = match ev.id("referral_code") {
                Some(referral_code) => referral_code,
                None => continue,
            };
            let amount_cents = match ev.meta_u64("amount") {
                Some(amount_cents) => amount_cents,
                None => continue,
            };

            let answer = ctx
                .invoke(
                    "affiliates",
                    "lookup_referral_count",
                    json!({ "referral_code": referral_code }),
                )
                .await?;
            let referrals = answer.as_u64().unwrap_or(0);

            let tier = Tier::for_referrals(referrals);
            let commission_cents = (amount_cents as f64 * tier.rate()).round() as u64;

            ctx.invoke(
                "affiliates",
                "allocate_tier_commission",
                json!({
                    "referral_code": referral_code,
                    "tier": tier.as_str(),
                    "amount_cents": amount_cents,
                    "commission_cents": commission_cents,
                }),
            )
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::RecordingCommands;
    use crate::commands::CommandError;
    use crate::events::{Event, EventBus};
    use std::sync::Arc;

    fn context(bus: &Arc<EventBus>, commands: &Arc<RecordingCommands>) -> KernelContext {
        KernelContext::new(Arc::clone(bus), commands.clone())
    }

    #[test]
    fn tier_thresholds_match_the_ladder() {
        assert_eq!(Tier::for_referrals(0), Tier::Bronze);
        assert_eq!(Tier::for_referrals(4), Tier::Bronze);
        assert_eq!(Tier::for_referrals(5), Tier::Silver);
        assert_eq!(Tier::for_referrals(19), Tier::Silver);
        assert_eq!(Tier::for_referrals(20), Tier::Gold);
        assert_eq!(Tier::for_referrals(49), Tier::Gold);
        assert_eq!(Tier::for_referrals(50), Tier::Platinum);
    }

    #[tokio::test]
    async fn share_clicks_are_tracked() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(
            Event::new(SHARE_CLICK)
                .with_id("user_id", "u-1")
                .with_id("referral_code", "RC7"),
        );
        // Missing referral code: ignored, not an error.
        bus.publish(Event::new(SHARE_CLICK).with_id("user_id", "u-2"));

        let commands = RecordingCommands::arc();
        AffiliateRouter::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();

        let tracked = commands.calls_for("track_referral");
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].params["referral_code"], "RC7");
    }

    #[tokio::test]
    async fn default_lookup_resolves_to_bronze_commission() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(
            Event::new(PURCHASE_COMPLETE)
                .with_id("referral_code", "RC7")
                .with_meta("amount", 10_000u64),
        );

        let commands = RecordingCommands::arc();
        AffiliateRouter::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();

        let allocated = commands.calls_for("allocate_tier_commission");
        assert_eq!(allocated.len(), 1);
        assert_eq!(allocated[0].params["tier"], "bronze");
        assert_eq!(allocated[0].params["commission_cents"], 500);
    }

    #[tokio::test]
    async fn referral_count_from_collaborator_upgrades_the_tier() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(
            Event::new(PURCHASE_COMPLETE)
                .with_id("referral_code", "RC7")
                .with_meta("amount", 10_000u64),
        );

        let commands = RecordingCommands::with_responder(|_domain, action, _params| {
            if action == "lookup_referral_count" {
                Ok(serde_json::json!(7))
            } else {
                Ok(serde_json::Value::Null)
            }
        });
        AffiliateRouter::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();

        let allocated = commands.calls_for("allocate_tier_commission");
        assert_eq!(allocated[0].params["tier"], "silver");
        assert_eq!(allocated[0].params["commission_cents"], 800);
    }

    #[tokio::test]
    async fn collaborator_rejection_propagates() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(
            Event::new(PURCHASE_COMPLETE)
                .with_id("referral_code", "RC7")
                .with_meta("amount", 2_500u64),
        );

        let commands = RecordingCommands::with_responder(|_domain, _action, _params| {
            Err(CommandError::new("ledger offline"))
        });
        let err = AffiliateRouter::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "command_failed");
    }

    #[tokio::test]
    async fn no_events_means_no_commands() {
        let bus = Arc::new(EventBus::new(64));
        let commands = RecordingCommands::arc();
        AffiliateRouter::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();
        assert_eq!(commands.call_count(), 0);
    }
}
