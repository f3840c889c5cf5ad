use std::path::PathBuf;

use async_trait::async_trait;

use crate::Result;

/// Ordered request parameters (`key=value` pairs).
pub type Params = Vec<(String, String)>;

/// A local file sent as one multipart field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub field: String,
    pub mime_type: String,
    pub path: PathBuf,
}

/// Hexagonal port for the HTTP layer.
///
/// Implementations return the raw response body regardless of HTTP status; the
/// Bot API envelope inside the body decides success. Timeouts must surface as
/// `Error::DeadWall`, other failures as `Error::Transport`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Plain parameterized call.
    async fn request(&self, url: &str, params: &Params) -> Result<String>;

    /// Multipart call carrying `attachment` plus `params` as text fields.
    async fn upload(&self, url: &str, params: &Params, attachment: &Attachment) -> Result<String>;
}
