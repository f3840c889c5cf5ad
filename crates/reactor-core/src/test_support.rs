//! In-memory transport and fixtures shared by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::{
    api::methods,
    domain::{ChatId, MessageId},
    entities::{Chat, Message},
    ports::{Attachment, Params, Transport},
    Result,
};

#[derive(Clone, Debug)]
pub struct Call {
    pub url: String,
    pub params: Params,
    pub attachment: Option<Attachment>,
}

impl Call {
    pub fn method(&self) -> String {
        self.url.rsplit('/').next().unwrap_or_default().to_string()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted transport: records every call and serves canned bodies.
///
/// `getUpdates` answers come from a queue; once it is drained the fake trips the
/// optional stop token and keeps answering with an empty batch.
#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    updates: Mutex<VecDeque<Result<String>>>,
    sticky: Mutex<HashMap<String, String>>,
    stop_when_drained: Mutex<Option<CancellationToken>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_to(&self, method: &str, body: &str) {
        self.sticky
            .lock()
            .unwrap()
            .insert(method.to_string(), body.to_string());
    }

    pub fn push_updates(&self, body: Result<String>) {
        self.updates.lock().unwrap().push_back(body);
    }

    pub fn stop_when_drained(&self, token: CancellationToken) {
        *self.stop_when_drained.lock().unwrap() = Some(token);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method() == method)
            .collect()
    }

    fn record(&self, url: &str, params: &Params, attachment: Option<&Attachment>) -> String {
        let call = Call {
            url: url.to_string(),
            params: params.clone(),
            attachment: attachment.cloned(),
        };
        let method = call.method();
        self.calls.lock().unwrap().push(call);
        method
    }

    fn answer(&self, method: &str) -> Result<String> {
        if let Some(body) = self.sticky.lock().unwrap().get(method) {
            return Ok(body.clone());
        }
        match method {
            methods::GET_ME => Ok(json!({
                "ok": true,
                "result": {"id": 1, "is_bot": true, "first_name": "reactor", "username": "reactor_bot"}
            })
            .to_string()),
            methods::GET_UPDATES => {
                if let Some(next) = self.updates.lock().unwrap().pop_front() {
                    return next;
                }
                if let Some(token) = self.stop_when_drained.lock().unwrap().as_ref() {
                    token.cancel();
                }
                Ok(updates_body(vec![]))
            }
            _ => Ok(json!({"ok": true, "result": true}).to_string()),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(&self, url: &str, params: &Params) -> Result<String> {
        let method = self.record(url, params, None);
        self.answer(&method)
    }

    async fn upload(&self, url: &str, params: &Params, attachment: &Attachment) -> Result<String> {
        let method = self.record(url, params, Some(attachment));
        self.answer(&method)
    }
}

pub fn chat_json(id: i64) -> Value {
    json!({"id": id, "type": "private", "first_name": "Ada"})
}

pub fn message_json(id: i64, chat_id: i64, text: &str) -> Value {
    json!({
        "message_id": id,
        "date": 1_700_000_000,
        "chat": chat_json(chat_id),
        "from": {"id": chat_id, "is_bot": false, "first_name": "Ada"},
        "text": text
    })
}

pub fn command_message_json(id: i64, chat_id: i64, text: &str, offset: u32, length: u32) -> Value {
    let mut msg = message_json(id, chat_id, text);
    msg["entities"] = json!([{"type": "bot_command", "offset": offset, "length": length}]);
    msg
}

pub fn updates_body(updates: Vec<Value>) -> String {
    json!({"ok": true, "result": updates}).to_string()
}

pub fn chat(id: ChatId) -> Arc<Chat> {
    Arc::new(Chat {
        id,
        kind: "private".to_string(),
        title: None,
        user_name: None,
        first_name: None,
        last_name: None,
    })
}

pub fn message(id: MessageId, chat: Arc<Chat>, text: Option<&str>) -> Arc<Message> {
    Arc::new(Message {
        message_id: id,
        from: None,
        date: 0,
        chat,
        forward_from: None,
        reply_to_message: None,
        text: text.map(str::to_string),
        entities: None,
        sticker: None,
        new_chat_members: None,
        left_chat_member: None,
    })
}
