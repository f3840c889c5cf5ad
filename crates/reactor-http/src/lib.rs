//! reqwest adapter for the `reactor-core` Transport port.
//!
//! Plain calls are GET requests with URL-encoded query parameters; uploads are
//! multipart POSTs. There is a connect timeout but no overall request timeout,
//! since `getUpdates` long polls are held open by the server.

use std::path::Path;

use async_trait::async_trait;

use reactor_core::{
    config::ServerConfig,
    errors::Error,
    ports::{Attachment, Params, Transport},
    Result,
};

#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(cfg: &ServerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .user_agent(cfg.user_agent.clone())
            .danger_accept_invalid_certs(true);
        tracing::warn!("TLS certificate validation is disabled for Bot API calls");

        // Only the configured proxy is used; HTTP_PROXY and friends are ignored.
        builder = match &cfg.proxy {
            Some(proxy) => builder.proxy(
                reqwest::Proxy::all(proxy.as_str())
                    .map_err(|e| Error::Config(format!("invalid proxy URI {proxy}: {e}")))?,
            ),
            None => builder.no_proxy(),
        };

        let http = builder
            .build()
            .map_err(|e| Error::Transport(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }

    fn map_err(e: reqwest::Error) -> Error {
        // Request errors carry the URL, which embeds the bot token.
        let e = e.without_url();
        if e.is_timeout() {
            Error::DeadWall
        } else {
            Error::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, url: &str, params: &Params) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(Self::map_err)?;

        tracing::debug!(status = %resp.status(), "Bot API response");
        resp.text().await.map_err(Self::map_err)
    }

    async fn upload(&self, url: &str, params: &Params, attachment: &Attachment) -> Result<String> {
        let bytes = tokio::fs::read(&attachment.path).await.map_err(Error::Io)?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name(&attachment.path))
            .mime_str(&attachment.mime_type)
            .map_err(|e| Error::Transport(format!("multipart error: {e}")))?;

        let mut form = reqwest::multipart::Form::new().part(attachment.field.clone(), part);
        for (key, value) in params {
            form = form.text(key.clone(), value.clone());
        }

        let resp = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(Self::map_err)?;

        let body = resp.text().await.map_err(Self::map_err)?;
        tracing::info!(
            field = %attachment.field,
            response = %body.chars().take(200).collect::<String>(),
            "upload finished"
        );
        Ok(body)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.bin")
        .to_string()
}
