use async_trait::async_trait;

use crate::{
    domain::{ChatId, FileRef, MessageRef},
    messaging::types::{ChatAction, MessagingCapabilities, OutgoingDocument, ReplyKeyboard},
    Result,
};

/// Outbound half of the transport.
///
/// Every call is a suspension point and may fail with `Error::Transport`; the
/// core decides per call site whether that aborts a request, prunes a
/// broadcast target, or is ignored as cosmetic.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef>;
    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()>;
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    async fn send_document(&self, chat_id: ChatId, doc: OutgoingDocument) -> Result<MessageRef>;
    async fn send_photo(&self, chat_id: ChatId, url: &str, caption_html: &str)
        -> Result<MessageRef>;
    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<MessageRef>;

    /// Download the raw bytes behind a file reference.
    async fn fetch_file(&self, file: &FileRef) -> Result<Vec<u8>>;
}
