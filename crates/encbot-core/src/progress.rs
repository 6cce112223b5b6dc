//! Cosmetic progress bar shown while a reply request runs.
//!
//! One status message is edited through a fixed sequence of frames. Frames are
//! awaited one after another on the caller's task, so a failed edit simply
//! returns early and nothing keeps running in the background.

use std::time::Duration;

use crate::{
    domain::MessageRef, formatting::framed, messaging::port::MessagingPort,
    request::ReplyAction, Result,
};

pub const STEPS: u8 = 10;
const FILLED: char = '▰';
const EMPTY: char = '▱';

/// Percentages shown by the animation: 0, 10, ..., 100.
pub fn percentages() -> impl Iterator<Item = u8> {
    (0..=STEPS).map(|i| i * (100 / STEPS))
}

pub fn bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100) / (100 / STEPS));
    let mut out = String::with_capacity(usize::from(STEPS) * 3);
    for i in 0..usize::from(STEPS) {
        out.push(if i < filled { FILLED } else { EMPTY });
    }
    out
}

pub fn render_frame(action: ReplyAction, percent: u8) -> String {
    let icon = if percent >= 100 { "✅" } else { "⏳" };
    framed(&format!(
        "{icon} {}... ({percent}%)\n{}",
        action.progressive(),
        bar(percent)
    ))
}

/// Send the 0% frame as a reply to `anchor`.
pub async fn start(
    api: &dyn MessagingPort,
    anchor: MessageRef,
    action: ReplyAction,
) -> Result<MessageRef> {
    api.reply_html(anchor, &render_frame(action, 0)).await
}

/// Edit `status` through the remaining frames up to 100%.
pub async fn animate(
    api: &dyn MessagingPort,
    status: MessageRef,
    action: ReplyAction,
    step_delay: Duration,
) -> Result<()> {
    for percent in percentages().skip(1) {
        if !step_delay.is_zero() {
            tokio::time::sleep(step_delay).await;
        }
        api.edit_html(status, &render_frame(action, percent)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, MessageId},
        test_support::FakeMessenger,
    };

    #[test]
    fn percentages_strictly_increase_to_100() {
        let all: Vec<u8> = percentages().collect();
        assert_eq!(all.first(), Some(&0));
        assert_eq!(all.last(), Some(&100));
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(all.len(), 11);
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar(0), "▱▱▱▱▱▱▱▱▱▱");
        assert_eq!(bar(30), "▰▰▰▱▱▱▱▱▱▱");
        assert_eq!(bar(100), "▰▰▰▰▰▰▰▰▰▰");
    }

    #[tokio::test(start_paused = true)]
    async fn animate_edits_every_step_in_order() {
        let api = FakeMessenger::new();
        let status = MessageRef {
            chat_id: ChatId(1),
            message_id: MessageId(5),
        };
        animate(&api, status, ReplyAction::Encrypt, Duration::from_millis(200))
            .await
            .unwrap();

        let edits = api.edit_texts();
        assert_eq!(edits.len(), 10);
        assert!(edits[0].contains("(10%)"));
        assert!(edits[9].contains("✅ Encrypting... (100%)"));
    }

    #[tokio::test]
    async fn failed_edit_stops_the_animation() {
        let api = FakeMessenger::new();
        api.fail_edits();
        let status = MessageRef {
            chat_id: ChatId(1),
            message_id: MessageId(5),
        };
        let res = animate(&api, status, ReplyAction::Decrypt, Duration::ZERO).await;
        assert!(res.is_err());
        assert!(api.edit_texts().is_empty());
    }
}
