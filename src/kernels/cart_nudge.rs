//! # Abandoned-cart nudge kernel.
//!
//! A cart counts as abandoned when its `add_to_cart` event is older than the
//! configured window (24 hours by default) and no `checkout_complete` event
//! exists for the same `user_id` + `cart_id`. Each abandoned cart gets one
//! templated reminder through `messages.send_message`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::KernelError;

use super::context::KernelContext;
use super::kernel::Kernel;

const ADD_TO_CART: &str = "add_to_cart";
const CHECKOUT_COMPLETE: &str = "checkout_complete";

/// Nudges users about carts they walked away from.
pub struct CartNudge {
    abandon_after: Duration,
    scan_limit: usize,
}

impl CartNudge {
    /// Creates the kernel with an explicit abandonment window and scan limit.
    pub fn new(abandon_after: Duration, scan_limit: usize) -> Self {
        Self {
            abandon_after,
            scan_limit,
        }
    }
}

impl Default for CartNudge {
    /// 24-hour abandonment window, 100-event scan window.
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60), 100)
    }
}

#[async_trait]
impl Kernel for CartNudge {
    fn name(&self) -> &str {
        "cart_nudge"
    }

    fn priority(&self) -> u8 {
        6
    }

    fn max_concurrency(&self) -> usize {
        2
    }

    async fn run(&self, ctx: &KernelContext) -> Result<(), KernelError> {
        let adds = ctx.recent(ADD_TO_CART, self.scan_limit);
        if adds.is_empty() {
            return Ok(());
        }
        let checkouts = ctx.recent(CHECKOUT_COMPLETE, self.scan_limit);

        for add in &adds {
            let (user_id, cart_id) = match (add.id("user_id"), add.id("cart_id")) {
                (Some(user_id), Some(cart_id)) => (user_id, cart_id),
                _ => continue,
            };
            if add.age() <= self.abandon_after {
                continue;
            }
            let checked_out = checkouts
                .iter()
                .any(|c| c.id("user_id") == Some(user_id) && c.id("cart_id") == Some(cart_id));
            if checked_out {
                continue;
            }

            let item_count = add.meta_u64("item_count").unwrap_or(1);
            let first_item = add.meta_str("first_item").unwrap_or("your item");
            let body = if item_count <= 1 {
                format!("Still thinking it over? {first_item} is waiting in your cart.")
            } else {
                format!("You have {item_count} items waiting in your cart, including {first_item}.")
            };

            ctx.invoke(
                "messages",
                "send_message",
                json!({ "user_id": user_id, "body": body }),
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
    use crate::events::{Event, EventBus};
    use std::sync::Arc;
    use std::time::SystemTime;

    fn context(bus: &Arc<EventBus>, commands: &Arc<RecordingCommands>) -> KernelContext {
        KernelContext::new(Arc::clone(bus), commands.clone())
    }

    fn cart_add(hours_ago: u64) -> Event {
        Event::new(ADD_TO_CART)
            .with_at(SystemTime::now() - Duration::from_secs(hours_ago * 3600))
            .with_id("user_id", "u-1")
            .with_id("cart_id", "c-1")
            .with_meta("item_count", 1u64)
            .with_meta("first_item", "western saddle")
    }

    #[tokio::test]
    async fn stale_cart_without_checkout_gets_one_nudge() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(cart_add(25));

        let commands = RecordingCommands::arc();
        CartNudge::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();

        let sent = commands.calls_for("send_message");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].params["user_id"], "u-1");
        assert_eq!(
            sent[0].params["body"],
            "Still thinking it over? western saddle is waiting in your cart."
        );
    }

    #[tokio::test]
    async fn fresh_cart_is_left_alone() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(cart_add(23));

        let commands = RecordingCommands::arc();
        CartNudge::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();

        assert_eq!(commands.call_count(), 0);
    }

    #[tokio::test]
    async fn matching_checkout_suppresses_the_nudge() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(cart_add(25));
        bus.publish(
            Event::new(CHECKOUT_COMPLETE)
                .with_id("user_id", "u-1")
                .with_id("cart_id", "c-1"),
        );

        let commands = RecordingCommands::arc();
        CartNudge::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();

        assert_eq!(commands.call_count(), 0);
    }

    #[tokio::test]
    async fn checkout_for_a_different_cart_does_not_count() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(cart_add(25));
        bus.publish(
            Event::new(CHECKOUT_COMPLETE)
                .with_id("user_id", "u-1")
                .with_id("cart_id", "c-other"),
        );

        let commands = RecordingCommands::arc();
        CartNudge::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();

        assert_eq!(commands.calls_for("send_message").len(), 1);
    }

    #[tokio::test]
    async fn multi_item_carts_use_the_count_template() {
        let bus = Arc::new(EventBus::new(64));
        bus.publish(
            Event::new(ADD_TO_CART)
                .with_at(SystemTime::now() - Duration::from_secs(30 * 3600))
                .with_id("user_id", "u-2")
                .with_id("cart_id", "c-9")
                .with_meta("item_count", 3u64)
                .with_meta("first_item", "hoof pick"),
        );

        let commands = RecordingCommands::arc();
        CartNudge::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();

        let sent = commands.calls_for("send_message");
        assert_eq!(
            sent[0].params["body"],
            "You have 3 items waiting in your cart, including hoof pick."
        );
    }

    #[tokio::test]
    async fn no_cart_events_means_no_commands() {
        let bus = Arc::new(EventBus::new(64));
        let commands = RecordingCommands::arc();
        CartNudge::default()
            .run(&context(&bus, &commands))
            .await
            .unwrap();
        assert_eq!(commands.call_count(), 0);
    }
}
