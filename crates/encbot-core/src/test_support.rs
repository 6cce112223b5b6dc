//! In-crate fakes shared by unit tests.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::{Config, ResultDelivery, TransportMode},
    domain::{ChatId, FileRef, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, MessagingCapabilities, OutgoingDocument, ReplyKeyboard},
    },
    Result,
};

pub const ADMIN: UserId = UserId(42);

pub fn test_config(temp_dir: &Path) -> Config {
    Config {
        telegram_bot_token: "x".to_string(),
        secret_key: "test-secret".to_string(),
        admin_id: Some(ADMIN),
        banner_url: None,
        transport: TransportMode::Polling,
        registry_file: temp_dir.join("chats.json"),
        temp_dir: temp_dir.to_path_buf(),
        broadcast_delay: Duration::from_millis(300),
        broadcast_progress_every: 10,
        progress_animation: true,
        progress_step_delay: Duration::from_millis(200),
        max_file_size: 5 * 1024 * 1024,
        inline_result_limit: 3500,
        result_delivery: ResultDelivery::Auto,
        encrypt_keywords: vec!["enc".to_string(), "🔒 encrypt".to_string()],
        decrypt_keywords: vec!["dec".to_string(), "🔓 decrypt".to_string()],
    }
}

#[derive(Clone, Debug)]
pub struct SentDocument {
    pub chat_id: ChatId,
    pub file_name: String,
    pub content: String,
    pub caption_html: String,
    pub reply_to: Option<MessageId>,
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    pub sends: Mutex<Vec<(ChatId, String)>>,
    pub replies: Mutex<Vec<(MessageRef, String)>>,
    pub edits: Mutex<Vec<(MessageRef, String)>>,
    pub deletes: Mutex<Vec<MessageRef>>,
    pub documents: Mutex<Vec<SentDocument>>,
    pub photos: Mutex<Vec<(ChatId, String)>>,
    pub keyboards: Mutex<Vec<(ChatId, ReplyKeyboard)>>,
    pub actions: Mutex<Vec<(ChatId, ChatAction)>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetched: Mutex<Vec<String>>,
    failing_chats: Mutex<HashSet<ChatId>>,
    fail_edits: Mutex<bool>,
    edit_failures_left: Mutex<usize>,
    fail_photos: Mutex<bool>,
    fail_documents: Mutex<bool>,
    supports_edit: bool,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1000),
            supports_edit: true,
            ..Default::default()
        }
    }

    pub fn put_file(&self, file_id: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
    }

    /// Every send/reply/document/photo to `chat_id` fails from now on.
    pub fn fail_chat(&self, chat_id: ChatId) {
        self.failing_chats.lock().unwrap().insert(chat_id);
    }

    pub fn without_edits(mut self) -> Self {
        self.supports_edit = false;
        self
    }

    pub fn fail_edits(&self) {
        *self.fail_edits.lock().unwrap() = true;
    }

    /// The next `n` edits fail, later ones succeed.
    pub fn fail_next_edits(&self, n: usize) {
        *self.edit_failures_left.lock().unwrap() = n;
    }

    pub fn fail_photos(&self) {
        *self.fail_photos.lock().unwrap() = true;
    }

    pub fn fail_documents(&self) {
        *self.fail_documents.lock().unwrap() = true;
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn sends_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == chat_id)
            .map(|(_, html)| html.clone())
            .collect()
    }

    pub fn edit_texts(&self) -> Vec<String> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, html)| html.clone())
            .collect()
    }

    /// Total number of outbound calls of any kind.
    pub fn outbound_count(&self) -> usize {
        self.sends.lock().unwrap().len()
            + self.replies.lock().unwrap().len()
            + self.edits.lock().unwrap().len()
            + self.deletes.lock().unwrap().len()
            + self.documents.lock().unwrap().len()
            + self.photos.lock().unwrap().len()
            + self.keyboards.lock().unwrap().len()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        let id = *guard;
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(id),
        }
    }

    fn check_chat(&self, chat_id: ChatId) -> Result<()> {
        if self.failing_chats.lock().unwrap().contains(&chat_id) {
            return Err(Error::Transport(format!(
                "telegram error: chat {} not found",
                chat_id.0
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_edit: self.supports_edit,
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.check_chat(chat_id)?;
        self.sends.lock().unwrap().push((chat_id, html.to_string()));
        Ok(self.alloc(chat_id))
    }

    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef> {
        self.check_chat(to.chat_id)?;
        self.replies.lock().unwrap().push((to, html.to_string()));
        Ok(self.alloc(to.chat_id))
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        if *self.fail_edits.lock().unwrap() {
            return Err(Error::Transport("telegram error: edit failed".to_string()));
        }
        {
            let mut left = self.edit_failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(Error::Transport("telegram error: edit failed".to_string()));
            }
        }
        self.edits.lock().unwrap().push((msg, html.to_string()));
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.deletes.lock().unwrap().push(msg);
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        self.actions.lock().unwrap().push((chat_id, action));
        Ok(())
    }

    async fn send_document(&self, chat_id: ChatId, doc: OutgoingDocument) -> Result<MessageRef> {
        self.check_chat(chat_id)?;
        if *self.fail_documents.lock().unwrap() {
            return Err(Error::Transport("telegram error: upload failed".to_string()));
        }
        let content = std::fs::read_to_string(&doc.path)?;
        self.documents.lock().unwrap().push(SentDocument {
            chat_id,
            file_name: doc.file_name,
            content,
            caption_html: doc.caption_html,
            reply_to: doc.reply_to,
        });
        Ok(self.alloc(chat_id))
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        url: &str,
        _caption_html: &str,
    ) -> Result<MessageRef> {
        self.check_chat(chat_id)?;
        if *self.fail_photos.lock().unwrap() {
            return Err(Error::Transport("telegram error: wrong file identifier".to_string()));
        }
        self.photos.lock().unwrap().push((chat_id, url.to_string()));
        Ok(self.alloc(chat_id))
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        _text: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<MessageRef> {
        self.check_chat(chat_id)?;
        self.keyboards.lock().unwrap().push((chat_id, keyboard));
        Ok(self.alloc(chat_id))
    }

    async fn fetch_file(&self, file: &FileRef) -> Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(file.file_id.clone());
        self.files
            .lock()
            .unwrap()
            .get(&file.file_id)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("file {} not found", file.file_id)))
    }
}
