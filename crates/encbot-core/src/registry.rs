//! Durable registry of every chat that has talked to the bot.
//!
//! On disk it is a single JSON array of chat ids, rewritten wholesale on each
//! new registration. The *active* set (broadcast targets) lives in memory
//! only: a failed broadcast send prunes the chat from it without touching the
//! file, and the chat is re-activated the next time it messages the bot.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use tokio::{io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info};

use crate::{domain::ChatId, Result};

#[derive(Debug, Default)]
struct RegistryState {
    /// Insertion order; this is the broadcast order.
    known: Vec<ChatId>,
    members: HashSet<ChatId>,
    inactive: HashSet<ChatId>,
}

#[derive(Debug)]
pub struct ChatRegistry {
    path: PathBuf,
    // Held across the file rewrite so concurrent inserts cannot lose entries.
    state: Mutex<RegistryState>,
}

impl ChatRegistry {
    /// Load the registry from `path`. A missing file is an empty registry.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids: Vec<ChatId> = match tokio::fs::read_to_string(&path).await {
            Ok(txt) if txt.trim().is_empty() => Vec::new(),
            Ok(txt) => serde_json::from_str(&txt)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut state = RegistryState::default();
        for id in ids {
            if state.members.insert(id) {
                state.known.push(id);
            }
        }
        info!(path = %path.display(), chats = state.known.len(), "chat registry loaded");

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Idempotent insert. Returns `true` when the chat was not known before.
    ///
    /// A known chat that had been pruned from the active set is re-activated.
    pub async fn record(&self, chat_id: ChatId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.members.contains(&chat_id) {
            if state.inactive.remove(&chat_id) {
                debug!(chat_id = chat_id.0, "chat re-activated");
            }
            return Ok(false);
        }

        state.known.push(chat_id);
        state.members.insert(chat_id);
        if let Err(e) = persist(&self.path, &state.known).await {
            state.known.pop();
            state.members.remove(&chat_id);
            return Err(e);
        }

        info!(chat_id = chat_id.0, total = state.known.len(), "new chat registered");
        Ok(true)
    }

    /// Every chat ever recorded, in registration order.
    pub async fn list_all(&self) -> Vec<ChatId> {
        self.state.lock().await.known.clone()
    }

    /// Chats currently believed reachable, in registration order.
    pub async fn list_active(&self) -> Vec<ChatId> {
        let state = self.state.lock().await;
        state
            .known
            .iter()
            .filter(|id| !state.inactive.contains(id))
            .copied()
            .collect()
    }

    /// Drop a chat from the active set. Durable storage is left untouched.
    pub async fn forget(&self, chat_id: ChatId) {
        let mut state = self.state.lock().await;
        if state.members.contains(&chat_id) && state.inactive.insert(chat_id) {
            debug!(chat_id = chat_id.0, "chat pruned from active set");
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.known.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn persist(path: &Path, ids: &[ChatId]) -> Result<()> {
    let txt = serde_json::to_string(ids)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(txt.as_bytes()).await?;
    // Durable before it replaces the previous list.
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
