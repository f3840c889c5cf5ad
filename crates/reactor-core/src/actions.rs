//! Deferred outbound calls.
//!
//! Application code pushes [`OutgoingAction`]s through an [`ActionQueue`]; the
//! poll loop owns the matching [`ActionDrain`] and executes everything queued,
//! in push order, after each non-empty batch.

use std::{path::PathBuf, sync::Arc};

use tokio::sync::mpsc;

use crate::{
    api::{methods, Api},
    codec::{check_envelope, parse_body},
    entities::{Chat, Message},
    ports::{Attachment, Params, Transport},
    Result,
};

const VIDEO_FIELD: &str = "video";
const VIDEO_MIME: &str = "video/mpeg";

#[derive(Clone, Debug)]
pub enum OutgoingAction {
    SendMessage {
        chat: Arc<Chat>,
        text: String,
    },
    ReplyMessage {
        chat: Arc<Chat>,
        reply_to: Arc<Message>,
        text: String,
    },
    SetChatTitle {
        chat: Arc<Chat>,
        title: String,
    },
    SendVideo {
        chat: Arc<Chat>,
        path: PathBuf,
    },
}

impl OutgoingAction {
    /// Bot API method this action calls.
    pub fn method(&self) -> &'static str {
        match self {
            OutgoingAction::SendMessage { .. } | OutgoingAction::ReplyMessage { .. } => {
                methods::SEND_MESSAGE
            }
            OutgoingAction::SetChatTitle { .. } => methods::SET_CHAT_TITLE,
            OutgoingAction::SendVideo { .. } => methods::SEND_VIDEO,
        }
    }

    pub fn chat(&self) -> &Chat {
        match self {
            OutgoingAction::SendMessage { chat, .. }
            | OutgoingAction::ReplyMessage { chat, .. }
            | OutgoingAction::SetChatTitle { chat, .. }
            | OutgoingAction::SendVideo { chat, .. } => chat,
        }
    }

    fn params(&self) -> Params {
        let mut params = vec![("chat_id".to_string(), self.chat().id.to_string())];
        match self {
            OutgoingAction::SendMessage { text, .. } => {
                params.push(("text".to_string(), text.clone()));
            }
            OutgoingAction::ReplyMessage { reply_to, text, .. } => {
                params.push(("text".to_string(), text.clone()));
                params.push((
                    "reply_to_message_id".to_string(),
                    reply_to.message_id.to_string(),
                ));
            }
            OutgoingAction::SetChatTitle { title, .. } => {
                params.push(("title".to_string(), title.clone()));
            }
            OutgoingAction::SendVideo { .. } => {}
        }
        params
    }

    /// Perform the call and check the response envelope.
    pub async fn execute(&self, api: &Api, transport: &dyn Transport) -> Result<()> {
        let url = api.method_url(self.method());
        let params = self.params();

        let body = match self {
            OutgoingAction::SendVideo { path, .. } => {
                tracing::info!(path = %path.display(), chat = %self.chat().id, "uploading video");
                let attachment = Attachment {
                    field: VIDEO_FIELD.to_string(),
                    mime_type: VIDEO_MIME.to_string(),
                    path: path.clone(),
                };
                transport.upload(&url, &params, &attachment).await?
            }
            _ => transport.request(&url, &params).await?,
        };

        check_envelope(&parse_body(&body)?)
    }
}

/// Producer side of the action queue. Cheap to clone; pushing never blocks.
#[derive(Clone, Debug)]
pub struct ActionQueue {
    tx: mpsc::UnboundedSender<OutgoingAction>,
}

impl ActionQueue {
    pub fn push(&self, action: OutgoingAction) {
        if let Err(e) = self.tx.send(action) {
            tracing::warn!(method = e.0.method(), "poll engine is gone, dropping action");
        }
    }
}

/// Consumer side of the action queue, owned by the poll loop.
#[derive(Debug)]
pub struct ActionDrain {
    rx: mpsc::UnboundedReceiver<OutgoingAction>,
}

/// Outcome of one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub executed: usize,
    pub failed: usize,
}

pub fn channel() -> (ActionQueue, ActionDrain) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ActionQueue { tx }, ActionDrain { rx })
}

impl ActionDrain {
    /// Take the next queued action without waiting.
    pub fn try_next(&mut self) -> Option<OutgoingAction> {
        self.rx.try_recv().ok()
    }

    /// Execute every queued action in FIFO order.
    ///
    /// A failing action is logged and dropped; the remaining actions still run.
    pub async fn flush(&mut self, api: &Api, transport: &dyn Transport) -> FlushReport {
        let mut report = FlushReport::default();
        while let Some(action) = self.try_next() {
            report.executed += 1;
            tracing::debug!(n = report.executed, method = action.method(), "executing outgoing action");
            if let Err(e) = action.execute(api, transport).await {
                report.failed += 1;
                tracing::warn!(
                    method = action.method(),
                    chat = %action.chat().id,
                    error = %e,
                    "outgoing action failed"
                );
            }
        }
        if report.executed > 0 {
            tracing::info!(
                executed = report.executed,
                failed = report.failed,
                "flushed outgoing actions"
            );
        }
        report
    }
}
