//! Telegram update handlers.
//!
//! Updates are converted into core `InboundMessage`s and handed to
//! [`EncryptBot::handle`]; no bot behavior lives here.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{Message, MessageEntityKind},
};

use encbot_core::{
    app::EncryptBot,
    domain::{ChatId, FileRef, InboundMessage, MessageId, RepliedMessage, UserId},
};

pub async fn handle_message(msg: Message, app: Arc<EncryptBot>) -> ResponseResult<()> {
    let inbound = to_inbound(&msg);
    let outcome = app.handle(inbound).await;
    tracing::debug!(chat_id = msg.chat.id.0, ?outcome, "update handled");
    Ok(())
}

pub fn to_inbound(msg: &Message) -> InboundMessage {
    InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        sender_id: msg.from().map(|u| UserId(u.id.0 as i64)),
        text: msg.text().map(str::to_string),
        file: file_ref(msg),
        reply_to: msg.reply_to_message().map(|r| RepliedMessage {
            message_id: MessageId(r.id.0),
            text: r.text().map(str::to_string),
            code_block: code_block(r),
            file: file_ref(r),
        }),
    }
}

fn code_block(msg: &Message) -> Option<String> {
    msg.parse_entities()?
        .iter()
        .find(|e| matches!(e.kind(), MessageEntityKind::Pre { .. } | MessageEntityKind::Code))
        .map(|e| e.text().to_string())
}

fn file_ref(msg: &Message) -> Option<FileRef> {
    let doc = msg.document()?;
    Some(FileRef {
        file_id: doc.file.id.clone(),
        file_name: doc.file_name.clone(),
        size: doc.file.size as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn converts_reply_to_document() {
        let msg = message(serde_json::json!({
            "message_id": 2,
            "date": 1700000000,
            "chat": { "id": 100, "type": "private", "first_name": "Ann" },
            "from": { "id": 7, "is_bot": false, "first_name": "Ann" },
            "text": "enc",
            "reply_to_message": {
                "message_id": 1,
                "date": 1699999999,
                "chat": { "id": 100, "type": "private", "first_name": "Ann" },
                "from": { "id": 7, "is_bot": false, "first_name": "Ann" },
                "document": {
                    "file_id": "doc-1",
                    "file_unique_id": "u-1",
                    "file_name": "notes.txt",
                    "file_size": 9
                }
            }
        }));

        let inbound = to_inbound(&msg);
        assert_eq!(inbound.chat_id, ChatId(100));
        assert_eq!(inbound.message_id, MessageId(2));
        assert_eq!(inbound.sender_id, Some(UserId(7)));
        assert_eq!(inbound.text.as_deref(), Some("enc"));
        assert!(inbound.file.is_none());

        let replied = inbound.reply_to.unwrap();
        assert_eq!(replied.message_id, MessageId(1));
        assert!(replied.text.is_none());
        assert!(replied.code_block.is_none());
        let file = replied.file.unwrap();
        assert_eq!(file.file_id, "doc-1");
        assert_eq!(file.file_name.as_deref(), Some("notes.txt"));
        assert_eq!(file.size, 9);
    }

    #[test]
    fn plain_text_has_no_reply() {
        let msg = message(serde_json::json!({
            "message_id": 5,
            "date": 1700000000,
            "chat": { "id": -200, "type": "group", "title": "team" },
            "from": { "id": 8, "is_bot": false, "first_name": "Bo" },
            "text": "/start"
        }));

        let inbound = to_inbound(&msg);
        assert_eq!(inbound.chat_id, ChatId(-200));
        assert!(inbound.reply_to.is_none());
        assert_eq!(inbound.text.as_deref(), Some("/start"));
    }

    #[test]
    fn reply_to_rendered_result_carries_its_pre_block() {
        let msg = message(serde_json::json!({
            "message_id": 9,
            "date": 1700000000,
            "chat": { "id": 100, "type": "private", "first_name": "Ann" },
            "from": { "id": 7, "is_bot": false, "first_name": "Ann" },
            "text": "dec",
            "reply_to_message": {
                "message_id": 8,
                "date": 1699999999,
                "chat": { "id": 100, "type": "private", "first_name": "Ann" },
                "from": { "id": 1, "is_bot": true, "first_name": "EncryptBot" },
                "text": "Encrypted:\nQUJD",
                "entities": [{ "type": "pre", "offset": 11, "length": 4 }]
            }
        }));

        let replied = to_inbound(&msg).reply_to.unwrap();
        assert_eq!(replied.text.as_deref(), Some("Encrypted:\nQUJD"));
        assert_eq!(replied.code_block.as_deref(), Some("QUJD"));
    }
}
