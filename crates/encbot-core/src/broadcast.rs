//! Admin broadcast fan-out.
//!
//! Targets are snapshotted from the registry's active set when the job starts
//! and visited in that order. A failed send only affects its own target: the
//! chat is pruned from the active set and the loop moves on. Consecutive sends
//! are separated by the configured pacing delay.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::Config,
    domain::{ChatId, MessageRef, UserId},
    errors::Error,
    formatting::{render_broadcast_body, render_broadcast_progress, render_broadcast_summary},
    messaging::port::MessagingPort,
    registry::ChatRegistry,
    security::is_admin,
    Result,
};

/// One broadcast run. Lives only for the duration of [`BroadcastDispatcher::broadcast`].
#[derive(Clone, Debug)]
pub struct BroadcastJob {
    pub originator: ChatId,
    pub body: String,
    pub targets: Vec<ChatId>,
    pub success_count: usize,
    pub failure_count: usize,
    pub pruned: Vec<ChatId>,
}

impl BroadcastJob {
    fn new(originator: ChatId, body: &str, targets: Vec<ChatId>) -> Self {
        Self {
            originator,
            body: body.to_string(),
            targets,
            success_count: 0,
            failure_count: 0,
            pruned: Vec::new(),
        }
    }

    fn summary(&self) -> BroadcastSummary {
        BroadcastSummary {
            targets: self.targets.len(),
            succeeded: self.success_count,
            failed: self.failure_count,
            pruned: self.pruned.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub targets: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pruned: Vec<ChatId>,
}

pub struct BroadcastDispatcher {
    cfg: Arc<Config>,
    registry: Arc<ChatRegistry>,
    messenger: Arc<dyn MessagingPort>,
}

impl BroadcastDispatcher {
    pub fn new(
        cfg: Arc<Config>,
        registry: Arc<ChatRegistry>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            cfg,
            registry,
            messenger,
        }
    }

    /// Send `body` to every active chat on behalf of `sender`.
    ///
    /// Returns `Error::Unauthorized` without sending anything unless `sender`
    /// is the configured administrator. Progress and the final summary are
    /// shown in `origin`; failures to update that display are logged only.
    pub async fn broadcast(
        &self,
        origin: ChatId,
        sender: Option<UserId>,
        body: &str,
    ) -> Result<BroadcastSummary> {
        if !is_admin(sender, self.cfg.admin_id) {
            warn!(
                chat_id = origin.0,
                user_id = sender.map(|u| u.0),
                "broadcast rejected: not the administrator"
            );
            return Err(Error::Unauthorized);
        }

        let mut job = BroadcastJob::new(origin, body, self.registry.list_active().await);
        let total = job.targets.len();
        info!(origin = job.originator.0, targets = total, "broadcast started");

        let mut status = self
            .notify(
                None,
                origin,
                &format!("📢 Preparing broadcast to {total} chats..."),
            )
            .await;

        let html = render_broadcast_body(&job.body);
        let targets = job.targets.clone();
        for (idx, target) in targets.into_iter().enumerate() {
            if idx > 0 && !self.cfg.broadcast_delay.is_zero() {
                tokio::time::sleep(self.cfg.broadcast_delay).await;
            }

            match self.messenger.send_html(target, &html).await {
                Ok(_) => {
                    job.success_count += 1;
                    if job.success_count % self.cfg.broadcast_progress_every == 0 {
                        // A failed edit may have replaced the status message.
                        status = self
                            .notify(status, origin, &render_broadcast_progress(idx + 1, total))
                            .await;
                    }
                }
                Err(e) => {
                    warn!(chat_id = target.0, error = %e, "broadcast send failed; pruning chat");
                    job.failure_count += 1;
                    self.registry.forget(target).await;
                    job.pruned.push(target);
                }
            }
        }

        let summary = job.summary();
        info!(
            targets = summary.targets,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "broadcast finished"
        );
        self.notify(
            status,
            origin,
            &render_broadcast_summary(summary.succeeded, summary.failed),
        )
        .await;

        Ok(summary)
    }

    /// Best-effort status display: edit `status` if present, else send anew.
    async fn notify(
        &self,
        status: Option<MessageRef>,
        origin: ChatId,
        html: &str,
    ) -> Option<MessageRef> {
        if let Some(st) = status {
            match self.messenger.edit_html(st, html).await {
                Ok(()) => return Some(st),
                Err(e) => warn!(chat_id = origin.0, "broadcast status edit failed: {e}"),
            }
        }
        match self.messenger.send_html(origin, html).await {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(chat_id = origin.0, "broadcast status send failed: {e}");
                None
            }
        }
    }
}
