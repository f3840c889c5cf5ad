//! JSON → entity decoding.
//!
//! Decoding is structural and field-by-field: required fields must be present
//! (and non-null), optional fields are looked up by key and left `None` when
//! absent. Every entry point checks the `ok` flag first, so a failure envelope
//! short-circuits anywhere in the recursion and is turned into a typed fault by
//! [`classify`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    entities::{
        Chat, ChatMember, Message, MessageEntity, PhotoSize, Sticker, Update, User, Video,
    },
    errors::{classify, Error},
    Result,
};

/// An entity that can be decoded from a Bot API JSON object.
pub trait Decode: Sized {
    const NAME: &'static str;

    /// Decode the entity from its JSON representation.
    ///
    /// Implementations call [`check_envelope`] before touching any field.
    fn decode(value: &Value) -> Result<Self>;
}

/// Parse a raw response body.
pub fn parse_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| {
        Error::MalformedResponse(format!(
            "invalid JSON body ({e}): {}",
            body.chars().take(200).collect::<String>()
        ))
    })
}

/// Fail with the classified fault if `value` carries `ok: false`.
pub fn check_envelope(value: &Value) -> Result<()> {
    match value.get("ok") {
        None | Some(Value::Bool(true)) => Ok(()),
        Some(Value::Bool(false)) => Err(classify(value)),
        Some(other) => Err(Error::MalformedResponse(format!(
            "`ok` must be a boolean, got {other}"
        ))),
    }
}

/// Unwrap a `{ok, result}` envelope, returning the `result` payload.
pub fn decode_envelope(envelope: &Value) -> Result<&Value> {
    check_envelope(envelope)?;
    match envelope.get("result") {
        Some(result) if !result.is_null() => Ok(result),
        _ => Err(Error::MalformedResponse(
            "successful envelope without `result`".to_string(),
        )),
    }
}

/// Unwrap an envelope and decode its `result` as a single entity.
pub fn decode_result<T: Decode>(envelope: &Value) -> Result<T> {
    T::decode(decode_envelope(envelope)?)
}

/// Decode the envelope returned by `getUpdates`, preserving receive order.
pub fn decode_update_batch(envelope: &Value) -> Result<Vec<Update>> {
    let result = decode_envelope(envelope)?;
    let items = result.as_array().ok_or_else(|| {
        Error::MalformedResponse("getUpdates result is not an array".to_string())
    })?;
    items.iter().map(Update::decode).collect()
}

fn object<'a>(value: &'a Value, entity: &str) -> Result<&'a serde_json::Map<String, Value>> {
    check_envelope(value)?;
    value
        .as_object()
        .ok_or_else(|| Error::MalformedResponse(format!("{entity}: expected a JSON object")))
}

fn lookup<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn required<T: DeserializeOwned>(
    obj: &serde_json::Map<String, Value>,
    entity: &str,
    key: &str,
) -> Result<T> {
    let value = lookup(obj, key).ok_or_else(|| {
        Error::MalformedResponse(format!("{entity}: missing required field `{key}`"))
    })?;
    T::deserialize(value)
        .map_err(|e| Error::MalformedResponse(format!("{entity}.{key}: {e}")))
}

fn optional<T: DeserializeOwned>(
    obj: &serde_json::Map<String, Value>,
    entity: &str,
    key: &str,
) -> Result<Option<T>> {
    lookup(obj, key)
        .map(|value| {
            T::deserialize(value)
                .map_err(|e| Error::MalformedResponse(format!("{entity}.{key}: {e}")))
        })
        .transpose()
}

fn required_entity<T: Decode>(
    obj: &serde_json::Map<String, Value>,
    entity: &str,
    key: &str,
) -> Result<Arc<T>> {
    let value = lookup(obj, key).ok_or_else(|| {
        Error::MalformedResponse(format!("{entity}: missing required field `{key}`"))
    })?;
    T::decode(value).map(Arc::new)
}

fn optional_entity<T: Decode>(
    obj: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Arc<T>>> {
    lookup(obj, key)
        .map(|value| T::decode(value).map(Arc::new))
        .transpose()
}

fn optional_list<T: Decode>(
    obj: &serde_json::Map<String, Value>,
    entity: &str,
    key: &str,
) -> Result<Option<Vec<Arc<T>>>> {
    let Some(value) = lookup(obj, key) else {
        return Ok(None);
    };
    let items = value
        .as_array()
        .ok_or_else(|| Error::MalformedResponse(format!("{entity}.{key}: expected an array")))?;
    items
        .iter()
        .map(|item| T::decode(item).map(Arc::new))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

impl Decode for Chat {
    const NAME: &'static str = "Chat";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        Ok(Self {
            id: required(o, Self::NAME, "id")?,
            kind: required(o, Self::NAME, "type")?,
            title: optional(o, Self::NAME, "title")?,
            user_name: optional(o, Self::NAME, "user_name")?,
            first_name: optional(o, Self::NAME, "first_name")?,
            last_name: optional(o, Self::NAME, "last_name")?,
        })
    }
}

impl Decode for User {
    const NAME: &'static str = "User";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        Ok(Self {
            id: required(o, Self::NAME, "id")?,
            is_bot: required(o, Self::NAME, "is_bot")?,
            first_name: required(o, Self::NAME, "first_name")?,
            last_name: optional(o, Self::NAME, "last_name")?,
            username: optional(o, Self::NAME, "username")?,
        })
    }
}

impl Decode for Sticker {
    const NAME: &'static str = "Sticker";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        Ok(Self {
            file_id: required(o, Self::NAME, "file_id")?,
            width: required(o, Self::NAME, "width")?,
            height: required(o, Self::NAME, "height")?,
            is_animated: required(o, Self::NAME, "is_animated")?,
            emoji: optional(o, Self::NAME, "emoji")?,
            set_name: optional(o, Self::NAME, "set_name")?,
        })
    }
}

impl Decode for MessageEntity {
    const NAME: &'static str = "MessageEntity";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        Ok(Self {
            kind: required(o, Self::NAME, "type")?,
            offset: required(o, Self::NAME, "offset")?,
            length: required(o, Self::NAME, "length")?,
            user: optional_entity(o, "user")?,
            url: optional(o, Self::NAME, "url")?,
        })
    }
}

impl Decode for Message {
    const NAME: &'static str = "Message";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        Ok(Self {
            message_id: required(o, Self::NAME, "message_id")?,
            from: optional_entity(o, "from")?,
            date: required(o, Self::NAME, "date")?,
            chat: required_entity(o, Self::NAME, "chat")?,
            forward_from: optional_entity(o, "forward_from")?,
            reply_to_message: optional_entity(o, "reply_to_message")?,
            text: optional(o, Self::NAME, "text")?,
            entities: optional_list(o, Self::NAME, "entities")?,
            sticker: optional_entity(o, "sticker")?,
            new_chat_members: optional_list(o, Self::NAME, "new_chat_members")?,
            left_chat_member: optional_entity(o, "left_chat_member")?,
        })
    }
}

impl Decode for PhotoSize {
    const NAME: &'static str = "PhotoSize";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        Ok(Self {
            file_id: required(o, Self::NAME, "file_id")?,
            width: required(o, Self::NAME, "width")?,
            height: required(o, Self::NAME, "height")?,
            file_size: optional(o, Self::NAME, "file_size")?,
        })
    }
}

impl Decode for Video {
    const NAME: &'static str = "Video";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        Ok(Self {
            file_id: required(o, Self::NAME, "file_id")?,
            width: required(o, Self::NAME, "width")?,
            height: required(o, Self::NAME, "height")?,
            duration: required(o, Self::NAME, "duration")?,
            thumb: optional_entity(o, "thumb")?,
            mime_type: optional(o, Self::NAME, "mime_type")?,
            file_size: optional(o, Self::NAME, "file_size")?,
        })
    }
}

impl Decode for ChatMember {
    const NAME: &'static str = "ChatMember";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        let flag = |key: &str| optional::<bool>(o, Self::NAME, key);
        Ok(Self {
            user: required_entity(o, Self::NAME, "user")?,
            status: required(o, Self::NAME, "status")?,
            until_date: optional(o, Self::NAME, "until_date")?,
            can_be_edited: flag("can_be_edited")?,
            can_post_messages: flag("can_post_messages")?,
            can_edit_messages: flag("can_edit_messages")?,
            can_delete_messages: flag("can_delete_messages")?,
            can_restrict_members: flag("can_restrict_members")?,
            can_promote_members: flag("can_promote_members")?,
            can_change_info: flag("can_change_info")?,
            can_invite_users: flag("can_invite_users")?,
            can_pin_messages: flag("can_pin_messages")?,
            is_member: flag("is_member")?,
            can_send_messages: flag("can_send_messages")?,
            can_send_media_messages: flag("can_send_media_messages")?,
            can_send_polls: flag("can_send_polls")?,
            can_send_other_messages: flag("can_send_other_messages")?,
            can_add_web_page_previews: flag("can_add_web_page_previews")?,
        })
    }
}

impl Decode for Update {
    const NAME: &'static str = "Update";

    fn decode(value: &Value) -> Result<Self> {
        let o = object(value, Self::NAME)?;
        Ok(Self {
            update_id: required(o, Self::NAME, "update_id")?,
            message: optional_entity(o, "message")?,
            edited_message: optional_entity(o, "edited_message")?,
        })
    }
}
