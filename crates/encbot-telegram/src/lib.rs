//! Telegram adapter (teloxide).
//!
//! This crate implements the `encbot-core` MessagingPort over Telegram Bot API
//! and wires the dispatcher to either long polling or a webhook.

use std::path::Path;

use async_trait::async_trait;

use teloxide::{
    net::Download,
    prelude::*,
    types::{InputFile, KeyboardButton, KeyboardMarkup, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use encbot_core::{
    domain::{ChatId, FileRef, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, MessagingCapabilities, OutgoingDocument, ReplyKeyboard},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn sent(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        retry_on_rate_limit(op).await
    }
}

/// Run `op`, retrying once when Telegram asks us to back off.
async fn retry_on_rate_limit<T, Fut>(mut op: impl FnMut() -> Fut) -> Result<T>
where
    Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
    Fut::IntoFuture: Send,
{
    const MAX_RETRIES: usize = 1;
    let mut attempts = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                attempts += 1;
                tracing::debug!(wait = ?d, "telegram asked to retry later");
                sleep(d).await;
            }
            Err(other) => return Err(TelegramMessenger::map_err(other)),
        }
    }
}

fn keyboard_markup(keyboard: ReplyKeyboard) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = keyboard
        .rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect())
        .collect();
    KeyboardMarkup::new(rows).resize_keyboard(true)
}

fn document_input(path: &Path, file_name: &str) -> InputFile {
    InputFile::file(path.to_path_buf()).file_name(file_name.to_string())
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_edit: true,
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(to.chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_to_message_id(Self::tg_msg_id(to.message_id))
            })
            .await?;
        Ok(Self::sent(to.chat_id, &msg))
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .edit_message_text(
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.message_id),
                    html.to_string(),
                )
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        let tg_action = match action {
            ChatAction::Typing => teloxide::types::ChatAction::Typing,
            ChatAction::UploadDocument => teloxide::types::ChatAction::UploadDocument,
        };
        self.with_retry(|| self.bot.send_chat_action(Self::tg_chat(chat_id), tg_action))
            .await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: ChatId, doc: OutgoingDocument) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_document(
                        Self::tg_chat(chat_id),
                        document_input(&doc.path, &doc.file_name),
                    )
                    .caption(doc.caption_html.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(id) = doc.reply_to {
                    req = req.reply_to_message_id(Self::tg_msg_id(id));
                }
                req
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_photo(&self, chat_id: ChatId, url: &str, caption_html: &str) -> Result<MessageRef> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid photo url {url}: {e}")))?;
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_photo(Self::tg_chat(chat_id), InputFile::url(url.clone()))
                    .caption(caption_html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<MessageRef> {
        let markup = keyboard_markup(keyboard);
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup.clone())
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn fetch_file(&self, file: &FileRef) -> Result<Vec<u8>> {
        let meta = self
            .with_retry(|| self.bot.get_file(file.file_id.clone()))
            .await?;

        let mut buf: Vec<u8> = Vec::with_capacity(file.size as usize);
        self.bot
            .download_file(&meta.path, &mut buf)
            .await
            .map_err(|e| Error::Transport(format!("telegram download error: {e}")))?;
        Ok(buf)
    }
}
