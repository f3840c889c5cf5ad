//! Demo command routing for the bootstrap binary.

use std::{path::PathBuf, sync::Arc, time::Instant};

use reactor_core::{
    entities::{BotCommand, Message},
    server::{MessageProcessor, Outbox},
};

const HELP: &str = "Commands:\n\
/status - uptime of this bot\n\
/title <text> - rename this chat\n\
/get_video - send the demo video\n\
/help - this message";

pub struct CommandRouter {
    started: Instant,
    demo_video: Option<PathBuf>,
}

impl CommandRouter {
    pub fn new(demo_video: Option<PathBuf>) -> Self {
        Self {
            started: Instant::now(),
            demo_video,
        }
    }

    fn route(&self, message: &Arc<Message>, command: &BotCommand, outbox: &Outbox) {
        let chat = &message.chat;
        match command.command.as_str() {
            "/start" | "/help" => outbox.send_message(chat, HELP),
            "/status" => {
                let uptime = format_duration(self.started.elapsed().as_secs());
                outbox.reply_message(chat, message, format!("Up for {uptime}."));
            }
            "/title" => {
                let title = command_args(message, command);
                if title.is_empty() {
                    outbox.reply_message(chat, message, "Usage: /title <text>");
                } else {
                    outbox.set_chat_title(chat, title);
                }
            }
            "/get_video" => match &self.demo_video {
                Some(path) => outbox.send_video(chat, path.clone()),
                None => outbox.reply_message(chat, message, "No demo video configured."),
            },
            other => outbox.send_message(chat, format!("Unknown command \"{other}\".")),
        }
    }
}

impl MessageProcessor for CommandRouter {
    fn on_message(&self, _message: &Arc<Message>, _outbox: &Outbox) {}

    fn on_bot_commands(&self, message: &Arc<Message>, commands: &[BotCommand], outbox: &Outbox) {
        // Anonymous channel posts have no sender; ignore them.
        if message.from.is_none() {
            return;
        }
        for command in commands {
            tracing::info!(command = %command.command, chat = %message.chat.id, "routing command");
            self.route(message, command, outbox);
        }
    }

    fn on_message_edited(&self, message: &Arc<Message>, outbox: &Outbox) {
        outbox.reply_message(&message.chat, message, "Edited messages are not processed.");
    }
}

/// Text following the command entity, trimmed.
fn command_args(message: &Message, command: &BotCommand) -> String {
    let text = message.text.as_deref().unwrap_or("");
    let end = command.offset.saturating_add(command.length) as usize;
    let rest: Vec<u16> = text.encode_utf16().skip(end).collect();
    String::from_utf16_lossy(&rest).trim().to_string()
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        return format!("{hours}h {mins}m {secs}s");
    }
    if mins > 0 {
        return format!("{mins}m {secs}s");
    }
    format!("{secs}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactor_core::{
        actions::{channel, OutgoingAction},
        codec::Decode,
        server::extract_bot_commands,
    };
    use serde_json::json;

    fn command(text: &str, length: u32) -> Arc<Message> {
        Arc::new(
            Message::decode(&json!({
                "message_id": 3,
                "date": 0,
                "chat": {"id": 5, "type": "group", "title": "old"},
                "from": {"id": 8, "is_bot": false, "first_name": "Ada"},
                "text": text,
                "entities": [{"type": "bot_command", "offset": 0, "length": length}]
            }))
            .unwrap(),
        )
    }

    fn run(router: &CommandRouter, msg: &Arc<Message>) -> Vec<OutgoingAction> {
        let (queue, mut drain) = channel();
        let outbox = Outbox::new(queue);
        router.on_bot_commands(msg, &extract_bot_commands(msg), &outbox);
        std::iter::from_fn(|| drain.try_next()).collect()
    }

    #[test]
    fn title_command_uses_trailing_text() {
        let router = CommandRouter::new(None);
        let actions = run(&router, &command("/title@mybot  New name ", 12));
        match &actions[..] {
            [OutgoingAction::SetChatTitle { title, .. }] => assert_eq!(title, "New name"),
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_reported() {
        let router = CommandRouter::new(None);
        let actions = run(&router, &command("/nope", 5));
        match &actions[..] {
            [OutgoingAction::SendMessage { text, .. }] => {
                assert_eq!(text, "Unknown command \"/nope\".")
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn get_video_sends_configured_file() {
        let router = CommandRouter::new(Some(PathBuf::from("/srv/demo.mpg")));
        let actions = run(&router, &command("/get_video", 10));
        assert!(matches!(
            &actions[..],
            [OutgoingAction::SendVideo { path, .. }] if path == &PathBuf::from("/srv/demo.mpg")
        ));
    }

    #[test]
    fn args_of_span_near_u32_max_are_empty() {
        let msg = command("/title x", 8);
        let huge = BotCommand {
            command: "/title".to_string(),
            offset: u32::MAX - 1,
            length: 8,
        };
        assert_eq!(command_args(&msg, &huge), "");
    }

    #[test]
    fn durations_are_human_readable() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(3_725), "1h 2m 5s");
    }
}
