//! Application-facing facade over [`PollEngine`].
//!
//! The server routes every decoded update to a [`MessageProcessor`] and gives it
//! an [`Outbox`] to queue replies. Queued actions go out after the batch is
//! dispatched.

use std::{path::PathBuf, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{
    actions::{ActionQueue, OutgoingAction},
    config::ServerConfig,
    engine::{EngineHandle, EngineState, Launch, PollEngine, SharedState},
    entities::{BotCommand, Chat, Message, Update},
    ports::Transport,
    Error, Result,
};

/// Application hooks, called on the poll task for every update.
pub trait MessageProcessor: Send + Sync {
    fn on_message(&self, message: &Arc<Message>, outbox: &Outbox);

    /// Called instead of [`MessageProcessor::on_message`] when the message
    /// carries at least one bot command.
    fn on_bot_commands(&self, message: &Arc<Message>, commands: &[BotCommand], outbox: &Outbox);

    fn on_message_edited(&self, _message: &Arc<Message>, _outbox: &Outbox) {}
}

/// Queues outgoing actions for the next flush.
#[derive(Clone, Debug)]
pub struct Outbox {
    queue: ActionQueue,
}

impl Outbox {
    pub fn new(queue: ActionQueue) -> Self {
        Self { queue }
    }

    pub fn send_message(&self, chat: &Arc<Chat>, text: impl Into<String>) {
        self.queue.push(OutgoingAction::SendMessage {
            chat: chat.clone(),
            text: text.into(),
        });
    }

    pub fn reply_message(
        &self,
        chat: &Arc<Chat>,
        message_to_reply: &Arc<Message>,
        text: impl Into<String>,
    ) {
        self.queue.push(OutgoingAction::ReplyMessage {
            chat: chat.clone(),
            reply_to: message_to_reply.clone(),
            text: text.into(),
        });
    }

    pub fn set_chat_title(&self, chat: &Arc<Chat>, title: impl Into<String>) {
        self.queue.push(OutgoingAction::SetChatTitle {
            chat: chat.clone(),
            title: title.into(),
        });
    }

    pub fn send_video(&self, chat: &Arc<Chat>, path: impl Into<PathBuf>) {
        self.queue.push(OutgoingAction::SendVideo {
            chat: chat.clone(),
            path: path.into(),
        });
    }
}

pub struct Server {
    engine: Option<PollEngine>,
    handle: Option<EngineHandle>,
    processor: Arc<dyn MessageProcessor>,
    outbox: Outbox,
    stop: CancellationToken,
    state: SharedState,
}

impl Server {
    pub fn new(
        cfg: ServerConfig,
        transport: Arc<dyn Transport>,
        processor: Arc<dyn MessageProcessor>,
    ) -> Result<Self> {
        cfg.validate()?;
        tracing::info!(api = %cfg.api_base, "creating server");
        if let Some(proxy) = &cfg.proxy {
            tracing::info!(%proxy, "using proxy");
        }

        let engine = PollEngine::new(&cfg, transport);
        let outbox = Outbox::new(engine.queue());
        let stop = engine.stop_token();
        let state = engine.shared_state();
        Ok(Self {
            engine: Some(engine),
            handle: None,
            processor,
            outbox,
            stop,
            state,
        })
    }

    /// Check the token and start polling.
    ///
    /// With [`Launch::Joined`] this returns once the loop exits.
    pub async fn start(&mut self, launch: Launch) -> Result<()> {
        let engine = self
            .engine
            .take()
            .ok_or_else(|| Error::Worker("server already started".to_string()))?;

        let processor = self.processor.clone();
        let outbox = self.outbox.clone();
        let on_updates = move |updates: &[Update]| {
            tracing::info!(count = updates.len(), "dispatching updates");
            for update in updates {
                dispatch(processor.as_ref(), &outbox, update);
            }
        };

        self.handle = Some(engine.start(on_updates, launch).await?);
        Ok(())
    }

    /// Ask the loop to exit before its next fetch.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// `Faulted` once a fetch fault has killed the loop, even after `join`.
    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    /// Wait for a detached loop to exit.
    pub async fn join(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().await,
            None => Ok(()),
        }
    }

    pub fn send_message(&self, chat: &Arc<Chat>, text: impl Into<String>) {
        self.outbox.send_message(chat, text);
    }

    pub fn reply_message(
        &self,
        chat: &Arc<Chat>,
        message_to_reply: &Arc<Message>,
        text: impl Into<String>,
    ) {
        self.outbox.reply_message(chat, message_to_reply, text);
    }

    pub fn set_chat_title(&self, chat: &Arc<Chat>, title: impl Into<String>) {
        self.outbox.set_chat_title(chat, title);
    }

    pub fn send_video(&self, chat: &Arc<Chat>, path: impl Into<PathBuf>) {
        self.outbox.send_video(chat, path);
    }
}

fn dispatch(processor: &dyn MessageProcessor, outbox: &Outbox, update: &Update) {
    if let Some(message) = &update.message {
        let commands = extract_bot_commands(message);
        if commands.is_empty() {
            processor.on_message(message, outbox);
        } else {
            tracing::info!(count = commands.len(), "message carries bot commands");
            processor.on_bot_commands(message, &commands, outbox);
        }
    }

    if let Some(message) = &update.edited_message {
        processor.on_message_edited(message, outbox);
    }
}

/// Collect one [`BotCommand`] per `bot_command` entity of `message`.
///
/// The command text is the entity span `[offset, offset + length)` in UTF-16
/// units, cut at the first `@` so `/status@mybot` becomes `/status`. Spans past
/// the end of the text are clamped; a message without text yields empty commands.
pub fn extract_bot_commands(message: &Message) -> Vec<BotCommand> {
    let Some(entities) = &message.entities else {
        return Vec::new();
    };
    let text = message.text.as_deref().unwrap_or("");

    entities
        .iter()
        .filter(|e| e.is_bot_command())
        .map(|e| BotCommand {
            command: command_text(text, e.offset, e.length),
            offset: e.offset,
            length: e.length,
        })
        .collect()
}

fn command_text(text: &str, offset: u32, length: u32) -> String {
    let units: Vec<u16> = text
        .encode_utf16()
        .skip(offset as usize)
        .take(length as usize)
        .collect();
    let span = String::from_utf16_lossy(&units);
    match span.split_once('@') {
        Some((command, _bot)) => command.to_string(),
        None => span,
    }
}
