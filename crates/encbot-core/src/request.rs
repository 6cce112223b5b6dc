//! Reply-driven encrypt/decrypt requests.
//!
//! A request is a message that replies to another message with one of the
//! configured keywords. It moves through classify -> resolve -> (animate) ->
//! encrypt|decrypt -> render, and every failure along the way ends as a
//! visible message in the chat rather than an error escaping the handler.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    cipher::SecretCipher,
    config::{Config, ResultDelivery},
    domain::{InboundMessage, MessageRef, RepliedMessage},
    errors::Error,
    formatting::{render_failure, render_inline_result, render_invalid_format},
    messaging::{
        port::MessagingPort,
        types::{ChatAction, OutgoingDocument},
    },
    progress,
    resolver::{self, ContentSource, ResolvedContent},
    Result,
};

/// Room left for the frame around an inline result.
const INLINE_OVERHEAD: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyAction {
    Encrypt,
    Decrypt,
}

impl ReplyAction {
    /// Case-insensitive exact match against the configured vocabularies.
    /// `None` means the message is not a request.
    pub fn classify(text: &str, cfg: &Config) -> Option<Self> {
        let lower = text.to_lowercase();
        if cfg.encrypt_keywords.iter().any(|k| *k == lower) {
            return Some(Self::Encrypt);
        }
        if cfg.decrypt_keywords.iter().any(|k| *k == lower) {
            return Some(Self::Decrypt);
        }
        None
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Encrypt => "Encrypted",
            Self::Decrypt => "Decrypted",
        }
    }

    pub fn progressive(self) -> &'static str {
        match self {
            Self::Encrypt => "Encrypting",
            Self::Decrypt => "Decrypting",
        }
    }

    fn file_prefix(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypted",
            Self::Decrypt => "decrypted",
        }
    }
}

/// What a single request ended as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Not a request; nothing was sent.
    Ignored,
    Delivered {
        action: ReplyAction,
        as_document: bool,
    },
    InvalidFormat,
    Failed,
}

pub struct ReplyHandler {
    cfg: Arc<Config>,
    messenger: Arc<dyn MessagingPort>,
    cipher: Arc<SecretCipher>,
}

impl ReplyHandler {
    pub fn new(
        cfg: Arc<Config>,
        messenger: Arc<dyn MessagingPort>,
        cipher: Arc<SecretCipher>,
    ) -> Self {
        Self {
            cfg,
            messenger,
            cipher,
        }
    }

    /// The request predicate: a reply whose text is a known keyword.
    pub fn classify<'m>(&self, msg: &'m InboundMessage) -> Option<(ReplyAction, &'m RepliedMessage)> {
        let replied = msg.reply_to.as_ref()?;
        let action = ReplyAction::classify(msg.text.as_deref()?, &self.cfg)?;
        Some((action, replied))
    }

    pub async fn handle(&self, msg: &InboundMessage) -> ReplyOutcome {
        let Some((action, replied)) = self.classify(msg) else {
            return ReplyOutcome::Ignored;
        };

        let anchor = MessageRef {
            chat_id: msg.chat_id,
            message_id: replied.message_id,
        };
        debug!(chat_id = msg.chat_id.0, ?action, "reply request accepted");

        let mut status = None;
        match self.run(action, replied, anchor, &mut status).await {
            Ok(outcome) => {
                info!(chat_id = msg.chat_id.0, ?action, ?outcome, "reply request finished");
                outcome
            }
            Err(e) => {
                self.report_failure(msg, status, &e).await;
                ReplyOutcome::Failed
            }
        }
    }

    async fn run(
        &self,
        action: ReplyAction,
        replied: &RepliedMessage,
        anchor: MessageRef,
        status: &mut Option<MessageRef>,
    ) -> Result<ReplyOutcome> {
        let api = self.messenger.as_ref();

        if let Err(e) = api.send_chat_action(anchor.chat_id, ChatAction::Typing).await {
            debug!(chat_id = anchor.chat_id.0, "chat action failed: {e}");
        }

        let content = match (action, replied.code_block.as_deref()) {
            // Lets `dec` work directly on a rendered result.
            (ReplyAction::Decrypt, Some(code)) if !code.trim().is_empty() => ResolvedContent {
                text: code.to_string(),
                source: ContentSource::Text,
            },
            _ => resolver::resolve(replied, api, self.cfg.max_file_size).await?,
        };

        if self.cfg.progress_animation && api.capabilities().supports_edit {
            let st = progress::start(api, anchor, action).await?;
            *status = Some(st);
            progress::animate(api, st, action, self.cfg.progress_step_delay).await?;
        }

        let output = match self.apply(action, &content.text) {
            Ok(out) => out,
            Err(Error::InvalidCiphertext) => {
                self.show(anchor, *status, &render_invalid_format()).await?;
                return Ok(ReplyOutcome::InvalidFormat);
            }
            Err(e) => return Err(e),
        };

        let as_document = self.deliver_as_document(&content, &output);
        if as_document {
            self.send_as_document(action, &content, &output, anchor, *status)
                .await?;
        } else {
            self.show(anchor, *status, &render_inline_result(action, &output))
                .await?;
        }

        Ok(ReplyOutcome::Delivered {
            action,
            as_document,
        })
    }

    fn apply(&self, action: ReplyAction, text: &str) -> Result<String> {
        match action {
            ReplyAction::Encrypt => self.cipher.encrypt(text),
            ReplyAction::Decrypt => self.cipher.decrypt(text).ok_or(Error::InvalidCiphertext),
        }
    }

    fn deliver_as_document(&self, content: &ResolvedContent, output: &str) -> bool {
        let hard_limit = self
            .messenger
            .capabilities()
            .max_message_len
            .saturating_sub(INLINE_OVERHEAD);
        let len = output.chars().count();
        match self.cfg.result_delivery {
            ResultDelivery::Document => true,
            ResultDelivery::Inline => len > hard_limit,
            ResultDelivery::Auto => {
                matches!(content.source, ContentSource::Document { .. })
                    || len > self.cfg.inline_result_limit.min(hard_limit)
            }
        }
    }

    async fn send_as_document(
        &self,
        action: ReplyAction,
        content: &ResolvedContent,
        output: &str,
        anchor: MessageRef,
        status: Option<MessageRef>,
    ) -> Result<()> {
        let file_name = result_file_name(action, &content.source);

        // Removed when `scratch` drops, including on every early return below.
        let scratch = tempfile::Builder::new()
            .prefix("encbot-")
            .suffix(".txt")
            .tempfile_in(&self.cfg.temp_dir)?;
        tokio::fs::write(scratch.path(), output).await?;

        if let Err(e) = self
            .messenger
            .send_chat_action(anchor.chat_id, ChatAction::UploadDocument)
            .await
        {
            debug!(chat_id = anchor.chat_id.0, "chat action failed: {e}");
        }

        self.messenger
            .send_document(
                anchor.chat_id,
                OutgoingDocument {
                    path: scratch.path().to_path_buf(),
                    file_name,
                    caption_html: format!("✅ {}", action.past_tense()),
                    reply_to: Some(anchor.message_id),
                },
            )
            .await?;

        // The document is the result; the progress message is now stale.
        if let Some(st) = status {
            if let Err(e) = self.messenger.delete_message(st).await {
                debug!(chat_id = anchor.chat_id.0, "status delete failed: {e}");
            }
        }
        Ok(())
    }

    /// Put `html` on the status message if there is one, else reply to `anchor`.
    async fn show(&self, anchor: MessageRef, status: Option<MessageRef>, html: &str) -> Result<()> {
        match status {
            Some(st) => self.messenger.edit_html(st, html).await,
            None => self.messenger.reply_html(anchor, html).await.map(|_| ()),
        }
    }

    async fn report_failure(&self, msg: &InboundMessage, status: Option<MessageRef>, err: &Error) {
        let reason = match err {
            Error::NoContent => {
                "Nothing to process. Reply to a text message or a text document.".to_string()
            }
            Error::FileTooLarge { limit, .. } => format!(
                "File too large. Maximum size is {}.",
                format_size(*limit)
            ),
            Error::NotText => "Only UTF-8 text files can be processed.".to_string(),
            other => {
                error!(chat_id = msg.chat_id.0, error = %other, "reply request failed");
                "Something went wrong. Please try again.".to_string()
            }
        };

        let html = render_failure(&reason);
        if let Err(e) = self.show(msg.message_ref(), status, &html).await {
            // The status message may be gone; fall back to a fresh reply.
            if status.is_some() {
                if let Err(e) = self.messenger.reply_html(msg.message_ref(), &html).await {
                    warn!(chat_id = msg.chat_id.0, "failed to report error: {e}");
                }
            } else {
                warn!(chat_id = msg.chat_id.0, "failed to report error: {e}");
            }
        }
    }
}

fn result_file_name(action: ReplyAction, source: &ContentSource) -> String {
    let base = match source {
        ContentSource::Document {
            file_name: Some(name),
        } => sanitize_filename(name),
        _ => "message.txt".to_string(),
    };
    format!("{}_{base}", action.file_prefix())
}

fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.trim_matches('.').is_empty() {
        "document.txt".to_string()
    } else {
        out
    }
}

fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        return format!("{}MB", bytes / MIB);
    }
    if bytes >= 1024 {
        return format!("{}KB", bytes / 1024);
    }
    format!("{bytes} bytes")
}
