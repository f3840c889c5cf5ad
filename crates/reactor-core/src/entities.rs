//! Decoded Bot API entities.
//!
//! Everything here is built by [`crate::codec`] and handed out read-only. Nested
//! entities are behind `Arc` so a batch can share them with application code
//! without copying.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{ChatId, MessageId, UpdateId, UserId};

#[derive(Clone, Debug, PartialEq)]
pub struct Chat {
    pub id: ChatId,
    /// "private", "group", "supergroup" or "channel".
    pub kind: String,
    pub title: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: UserId,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub message_id: MessageId,
    pub from: Option<Arc<User>>,
    /// Unix timestamp (seconds).
    pub date: i64,
    pub chat: Arc<Chat>,
    pub forward_from: Option<Arc<User>>,
    pub reply_to_message: Option<Arc<Message>>,
    pub text: Option<String>,
    pub entities: Option<Vec<Arc<MessageEntity>>>,
    pub sticker: Option<Arc<Sticker>>,
    pub new_chat_members: Option<Vec<Arc<User>>>,
    pub left_chat_member: Option<Arc<User>>,
}

impl Message {
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }
}

/// Entity type tag of a bot command (`/start`, `/status@mybot`).
pub const BOT_COMMAND: &str = "bot_command";

/// A special span inside [`Message::text`].
///
/// `offset` and `length` count UTF-16 code units.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntity {
    pub kind: String,
    pub offset: u32,
    pub length: u32,
    pub user: Option<Arc<User>>,
    pub url: Option<String>,
}

impl MessageEntity {
    pub fn is_bot_command(&self) -> bool {
        self.kind == BOT_COMMAND
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sticker {
    pub file_id: String,
    pub width: i32,
    pub height: i32,
    pub is_animated: bool,
    pub emoji: Option<String>,
    pub set_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: i32,
    pub height: i32,
    pub file_size: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Video {
    pub file_id: String,
    pub width: i32,
    pub height: i32,
    pub duration: i32,
    pub thumb: Option<Arc<PhotoSize>>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMember {
    pub user: Arc<User>,
    /// "creator", "administrator", "member", "restricted", "left" or "kicked".
    pub status: String,
    pub until_date: Option<i64>,
    pub can_be_edited: Option<bool>,
    pub can_post_messages: Option<bool>,
    pub can_edit_messages: Option<bool>,
    pub can_delete_messages: Option<bool>,
    pub can_restrict_members: Option<bool>,
    pub can_promote_members: Option<bool>,
    pub can_change_info: Option<bool>,
    pub can_invite_users: Option<bool>,
    pub can_pin_messages: Option<bool>,
    pub is_member: Option<bool>,
    pub can_send_messages: Option<bool>,
    pub can_send_media_messages: Option<bool>,
    pub can_send_polls: Option<bool>,
    pub can_send_other_messages: Option<bool>,
    pub can_add_web_page_previews: Option<bool>,
}

/// One inbound event from `getUpdates`.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub update_id: UpdateId,
    pub message: Option<Arc<Message>>,
    pub edited_message: Option<Arc<Message>>,
}

/// A command extracted from a message's `bot_command` entity.
///
/// Derived locally, never decoded. `command` has any `@botname` suffix removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotCommand {
    pub command: String,
    pub offset: u32,
    pub length: u32,
}
