use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric). Serialized as a bare number in the registry file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Platform handle for a downloadable file attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRef {
    pub file_id: String,
    pub file_name: Option<String>,
    pub size: u64,
}

/// The message an inbound message replies to.
#[derive(Clone, Debug)]
pub struct RepliedMessage {
    pub message_id: MessageId,
    pub text: Option<String>,
    /// Content of the first preformatted/code span of `text`, if any. The
    /// bot's own inline results put the payload there.
    pub code_block: Option<String>,
    pub file: Option<FileRef>,
}

/// Transport-neutral view of an incoming chat message.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub sender_id: Option<UserId>,
    pub text: Option<String>,
    pub file: Option<FileRef>,
    pub reply_to: Option<RepliedMessage>,
}

impl InboundMessage {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}
