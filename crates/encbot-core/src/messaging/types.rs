use std::path::PathBuf;

use crate::domain::MessageId;

/// Outgoing "chat action" (typing indicator, etc).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadDocument,
}

/// Persistent reply keyboard shown under the input field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    pub fn new(rows: Vec<Vec<&str>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }
}

/// A file on disk to upload as a document.
#[derive(Clone, Debug)]
pub struct OutgoingDocument {
    pub path: PathBuf,
    /// Name shown to the recipient (the on-disk name is a scratch name).
    pub file_name: String,
    pub caption_html: String,
    pub reply_to: Option<MessageId>,
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_edit: bool,
    pub max_message_len: usize,
}
