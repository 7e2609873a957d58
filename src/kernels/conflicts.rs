//! # Calendar conflict detection kernel.
//!
//! For each `calendar_create_event`, asks the calendar collaborator for
//! overlapping events belonging to the same user. When overlaps exist the
//! kernel flags the conflict (severity by overlap count), computes two
//! alternative slots shifted one hour either way with the same duration,
//! and notifies the user.

use async_trait::async_trait;
use serde_json::json;

use crate::error::KernelError;

use super::context::KernelContext;
use super::kernel::Kernel;

const CALENDAR_CREATE_EVENT: &str = "calendar_create_event";
const HOUR_MS: u64 = 3_600_000;

/// Flags overlapping calendar events and proposes alternative slots.
pub struct ConflictDetector {
    scan_limit: usize,
}

impl ConflictDetector {
    /// Creates the kernel with the given scan window.
    pub fn new(scan_limit: usize) -> Self {
        Self { scan_limit }
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(100)
    }
}

fn severity(conflicts: usize) -> &'static str {
    if conflicts > 2 {
        "high"
    } else if conflicts == 2 {
        "medium"
    } else {
        "low"
    }
}

#[async_trait]
impl Kernel for ConflictDetector {
    fn name(&self) -> &str {
        "conflict_detector"
    }

    fn priority(&self) -> u8 {
        7
    }

    fn max_concurrency(&self) -> usize {
        2
    }

    async fn run(&self, ctx: &KernelContext) -> Result<(), KernelError> {
        let creations = ctx.recent(CALENDAR_CREATE_EVENT, self.scan_limit);
        if creations.is_empty() {
            return Ok(());
        }

        for ev in &creations {
            let (user_id, event_id) = match (ev.id("user_id"), ev.id("event_id")) {
                (Some(user_id), Some(event_id)) => (user_id, event_id),
                _ => continue,
            };
            let (starts_at, ends_at) = match (ev.meta_u64("starts_at"), ev.meta_u64("ends_at")) {
                (Some(starts_at), Some(ends_at)) if ends_at > starts_at => (starts_at, ends_at),
                _ => continue,
            };

            let answer = ctx
                .invoke(
                    "calendar",
                    "find_overlaps",
                    json!({
                        "user_id": user_id,
                        "starts_at": starts_at,
                        "ends_at": ends_at,
                        "exclude_event_id": event_id,
                    }),
                )
                .await?;
            let conflicts = answer.as_array().map(Vec::len).unwrap_or(0);
            if conflicts == 0 {
                continue;
            }

            ctx.invoke(
                "calendar",
                "flag_conflict",
                json!({
                    "user_id": user_id,
                    "event_id": event_id,
                    "severity": severity(conflicts),
                    "conflict_count": conflicts,
                }),
            )
            .await?;

            let earlier = (
                starts_at.saturating_sub(HOUR_MS),
                ends_at.saturating_sub(HOUR_MS),
            );
            let later = (
                starts_at.saturating_add(HOUR_MS),
                ends_at.saturating_add(HOUR_MS),
            );
            ctx.invoke(
                "messages",
                "send_message",
                json!({
                    "user_id": user_id,
                    "body": format!(
                        "Your new event overlaps {conflicts} existing event(s). \
                         Two open slots nearby: one hour earlier or one hour later."
                    ),
                    "alternatives": [
                        { "starts_at": earlier.0, "ends_at": earlier.1 },
                        { "starts_at": later.0, "ends_at": later.1 },
                    ],
                }),
            )
            .await?;
        }
        Ok(())
    }
}
