//! Inbound message dispatch: the single entry point every transport feeds.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

use crate::{
    broadcast::{BroadcastDispatcher, BroadcastSummary},
    cipher::SecretCipher,
    config::Config,
    domain::{ChatId, InboundMessage},
    errors::Error,
    formatting::{framed, help_text},
    messaging::{port::MessagingPort, types::ReplyKeyboard},
    registry::ChatRegistry,
    request::{ReplyHandler, ReplyOutcome},
};

pub const MENU_ENCRYPT: &str = "🔒 Encrypt";
pub const MENU_DECRYPT: &str = "🔓 Decrypt";
pub const MENU_HELP: &str = "ℹ️ Help";
pub const MENU_BROADCAST: &str = "📢 Broadcast (Admin)";

/// What the bot did with one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handled {
    Start,
    Help,
    BroadcastUsage,
    /// `None` when the sender was not the administrator.
    Broadcast(Option<BroadcastSummary>),
    Reply(ReplyOutcome),
    Ignored,
}

/// Serializes work per chat while letting different chats run concurrently.
///
/// Entries only live while a chat has work in flight or queued; see
/// [`ChatLocks::release`].
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id.0)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the chat's entry if no guard or waiter still references it.
    /// Call after the guard from [`ChatLocks::lock_chat`] has been dropped.
    pub async fn release(&self, chat_id: ChatId) {
        let mut map = self.inner.lock().await;
        if map
            .get(&chat_id.0)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&chat_id.0);
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}

pub struct EncryptBot {
    cfg: Arc<Config>,
    messenger: Arc<dyn MessagingPort>,
    registry: Arc<ChatRegistry>,
    replies: ReplyHandler,
    broadcaster: BroadcastDispatcher,
    chat_locks: ChatLocks,
}

impl EncryptBot {
    pub fn new(
        cfg: Arc<Config>,
        messenger: Arc<dyn MessagingPort>,
        registry: Arc<ChatRegistry>,
        cipher: Arc<SecretCipher>,
    ) -> Self {
        Self {
            replies: ReplyHandler::new(cfg.clone(), messenger.clone(), cipher),
            broadcaster: BroadcastDispatcher::new(cfg.clone(), registry.clone(), messenger.clone()),
            cfg,
            messenger,
            registry,
            chat_locks: ChatLocks::default(),
        }
    }

    pub fn registry(&self) -> &Arc<ChatRegistry> {
        &self.registry
    }

    /// Handle one inbound message. Never fails: every error is turned into a
    /// chat message or a log line here.
    pub async fn handle(&self, msg: InboundMessage) -> Handled {
        if let Err(e) = self.registry.record(msg.chat_id).await {
            error!(chat_id = msg.chat_id.0, "failed to record chat: {e}");
        }

        let guard = self.chat_locks.lock_chat(msg.chat_id).await;
        let handled = self.dispatch(&msg).await;
        drop(guard);
        self.chat_locks.release(msg.chat_id).await;
        handled
    }

    async fn dispatch(&self, msg: &InboundMessage) -> Handled {
        let text = msg.text.as_deref().unwrap_or("");
        if text.starts_with('/') {
            let (cmd, args) = parse_command(text);
            return self.handle_command(msg, &cmd, &args).await;
        }

        match text {
            MENU_HELP => {
                self.send(msg.chat_id, &help_text()).await;
                return Handled::Help;
            }
            MENU_BROADCAST => {
                self.send(msg.chat_id, &broadcast_usage()).await;
                return Handled::BroadcastUsage;
            }
            _ => {}
        }

        match self.replies.handle(msg).await {
            ReplyOutcome::Ignored => Handled::Ignored,
            outcome => Handled::Reply(outcome),
        }
    }

    async fn handle_command(&self, msg: &InboundMessage, cmd: &str, args: &str) -> Handled {
        match cmd {
            "start" => {
                self.show_menu(msg.chat_id).await;
                Handled::Start
            }
            "help" => {
                self.send(msg.chat_id, &help_text()).await;
                Handled::Help
            }
            "broadcast" if args.is_empty() => {
                self.send(msg.chat_id, &broadcast_usage()).await;
                Handled::BroadcastUsage
            }
            "broadcast" => match self
                .broadcaster
                .broadcast(msg.chat_id, msg.sender_id, args)
                .await
            {
                Ok(summary) => Handled::Broadcast(Some(summary)),
                Err(Error::Unauthorized) => {
                    self.send(msg.chat_id, "❌ Admin access required").await;
                    Handled::Broadcast(None)
                }
                Err(e) => {
                    error!(chat_id = msg.chat_id.0, "broadcast failed: {e}");
                    self.send(msg.chat_id, "❌ Broadcast failed.").await;
                    Handled::Broadcast(None)
                }
            },
            other => {
                debug!(chat_id = msg.chat_id.0, command = other, "ignoring unknown command");
                Handled::Ignored
            }
        }
    }

    async fn show_menu(&self, chat_id: ChatId) {
        if let Some(url) = &self.cfg.banner_url {
            let caption = framed("Secure your messages with authenticated encryption.");
            if let Err(e) = self.messenger.send_photo(chat_id, url, &caption).await {
                warn!(chat_id = chat_id.0, "banner send failed: {e}");
            }
        }

        let keyboard = ReplyKeyboard::new(vec![
            vec![MENU_ENCRYPT, MENU_DECRYPT],
            vec![MENU_HELP, MENU_BROADCAST],
        ]);
        if let Err(e) = self
            .messenger
            .send_keyboard(chat_id, "Choose an option:", keyboard)
            .await
        {
            warn!(chat_id = chat_id.0, "menu send failed: {e}");
        }
    }

    async fn send(&self, chat_id: ChatId, html: &str) {
        if let Err(e) = self.messenger.send_html(chat_id, html).await {
            warn!(chat_id = chat_id.0, "send failed: {e}");
        }
    }
}

fn broadcast_usage() -> String {
    "📢 Usage: <code>/broadcast your message</code>\n\nAdmin only.".to_string()
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}
