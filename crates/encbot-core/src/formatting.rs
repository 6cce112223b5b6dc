//! Telegram HTML rendering for bot replies.

use crate::request::ReplyAction;

pub const BRAND_HEADER: &str = "🔒 <b>EncryptBot</b>";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Prefix a body with the brand header.
pub fn framed(body: &str) -> String {
    format!("{BRAND_HEADER}\n\n{body}")
}

/// Inline result: escaped and wrapped in a `<pre>` block so it copies cleanly.
pub fn render_inline_result(action: ReplyAction, result: &str) -> String {
    framed(&format!(
        "✅ {}:\n<pre>{}</pre>",
        action.past_tense(),
        escape_html(result)
    ))
}

pub fn render_invalid_format() -> String {
    framed("❌ Decrypted (Invalid format)\n\nThe message is not ciphertext produced with this bot's key.")
}

pub fn render_failure(reason: &str) -> String {
    framed(&format!("❌ {}", escape_html(reason)))
}

pub fn render_broadcast_body(body: &str) -> String {
    format!("📢 <b>Broadcast</b>\n\n{}", escape_html(body))
}

pub fn render_broadcast_progress(done: usize, total: usize) -> String {
    format!("📢 Broadcasting... {done}/{total}")
}

pub fn render_broadcast_summary(succeeded: usize, failed: usize) -> String {
    format!(
        "📢 <b>Broadcast Results</b>\n\n✅ Sent to: {succeeded} chats\n❌ Failed: {failed} chats"
    )
}

pub fn help_text() -> String {
    framed(
        "<b>Help</b>\n\n\
🔹 <b>Reply to any message with:</b>\n\
- <code>enc</code> to encrypt it\n\
- <code>dec</code> to decrypt it\n\n\
Text messages and text documents are both supported.\n\n\
🔹 <b>Admin Commands:</b>\n\
/broadcast &lt;text&gt; - Send a message to all users",
    )
}
