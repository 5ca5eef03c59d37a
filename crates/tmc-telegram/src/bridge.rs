//! Transport over an MTProto HTTP bridge.
//!
//! The bridge holds the user session and exposes a small JSON API under
//! `{base_url}/v1/sessions/{session}`:
//!
//! - `POST connect` with credentials and the client profile
//! - `GET dialogs?offset=&limit=` → `{dialogs, next_offset}`
//! - `GET entities/{id}` → `{id, access_hash, title}`
//! - `GET channels/{id}/full?access_hash=` → `{participants_count}`
//! - `GET channels/{id}/messages?q=&limit=&filter=&offset_id=&access_hash=`
//!   → `{messages, next_offset_id}`

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use tmc_core::{
    config::ClientProfile,
    domain::{ChannelHandle, Dialog, FullChannel, MessageEvent},
    errors::Error,
    ports::{MessageFilter, SearchQuery, TransportPort},
    Result,
};

use crate::wire::{WireDialog, WireHandle, WireMessage};

const DIALOG_PAGE_SIZE: usize = 100;
const MESSAGE_PAGE_SIZE: usize = 100;

#[derive(Clone, Debug)]
pub struct BridgeSettings {
    pub base_url: String,
    pub api_id: i32,
    pub api_hash: String,
    pub session_name: String,
    pub profile: ClientProfile,
    pub request_timeout: Duration,
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    api_id: i32,
    api_hash: &'a str,
    device_model: &'a str,
    system_version: &'a str,
    app_version: &'a str,
    lang_code: &'a str,
    system_lang_code: &'a str,
}

#[derive(Deserialize)]
struct ConnectResponse {
    authorized: bool,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Deserialize)]
struct DialogsPage {
    dialogs: Vec<WireDialog>,
    #[serde(default)]
    next_offset: Option<u64>,
}

#[derive(Deserialize)]
struct FullChannelResponse {
    #[serde(default)]
    participants_count: Option<u64>,
}

#[derive(Deserialize)]
struct MessagesPage {
    messages: Vec<WireMessage>,
    #[serde(default)]
    next_offset_id: Option<i64>,
}

/// Thin JSON client bound to one bridge session.
#[derive(Clone, Debug)]
struct BridgeApi {
    http: reqwest::Client,
    session_url: String,
}

impl BridgeApi {
    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.session_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("bridge request error: {e}")))?;
        Self::decode(path, resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("bridge request error: {e}")))?;
        Self::decode(path, resp).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "bridge {path} failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        resp.json()
            .await
            .map_err(|e| Error::Transport(format!("bridge {path} json error: {e}")))
    }
}

#[derive(Clone, Debug)]
pub struct BridgeTransport {
    api: BridgeApi,
    settings: BridgeSettings,
}

impl BridgeTransport {
    pub fn new(settings: BridgeSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent("tmc/0.1")
            .build()
            .map_err(|e| Error::Transport(format!("failed to build http client: {e}")))?;
        let session_url = format!(
            "{}/v1/sessions/{}",
            settings.base_url.trim_end_matches('/'),
            settings.session_name
        );
        Ok(Self {
            api: BridgeApi { http, session_url },
            settings,
        })
    }
}

fn filter_param(filter: MessageFilter) -> &'static str {
    match filter {
        MessageFilter::Empty => "empty",
    }
}

#[derive(Clone, Copy, Debug)]
struct Cursor<T> {
    at: Option<T>,
    remaining: usize,
    done: bool,
}

#[async_trait]
impl TransportPort for BridgeTransport {
    async fn connect(&self) -> Result<()> {
        let s = &self.settings;
        let req = ConnectRequest {
            api_id: s.api_id,
            api_hash: &s.api_hash,
            device_model: &s.profile.device_model,
            system_version: &s.profile.system_version,
            app_version: &s.profile.app_version,
            lang_code: &s.profile.lang_code,
            system_lang_code: &s.profile.system_lang_code,
        };
        let resp: ConnectResponse = self.api.post_json("connect", &req).await?;
        if !resp.authorized {
            return Err(Error::Transport(format!(
                "session {:?} is not authorized; log it in through the bridge first",
                s.session_name
            )));
        }
        tracing::info!(
            session = %s.session_name,
            user = resp.user.as_deref().unwrap_or("?"),
            "connected to telegram bridge"
        );
        Ok(())
    }

    fn stream_dialogs(&self) -> BoxStream<'_, Result<Dialog>> {
        let api = self.api.clone();
        let start = Cursor::<u64> {
            at: None,
            remaining: usize::MAX,
            done: false,
        };

        stream::try_unfold(start, move |cursor| {
            let api = api.clone();
            async move {
                if cursor.done {
                    return Ok(None);
                }
                let mut query = vec![("limit", DIALOG_PAGE_SIZE.to_string())];
                if let Some(offset) = cursor.at {
                    query.push(("offset", offset.to_string()));
                }
                let page: DialogsPage = api.get_json("dialogs", &query).await?;
                let next = Cursor {
                    at: page.next_offset,
                    remaining: cursor.remaining,
                    done: page.dialogs.is_empty() || page.next_offset.is_none(),
                };
                let dialogs: Vec<Dialog> = page.dialogs.into_iter().map(Dialog::from).collect();
                Ok::<_, Error>(Some((dialogs, next)))
            }
        })
        .map_ok(|batch| stream::iter(batch.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }

    async fn resolve_entity(&self, dialog: &Dialog) -> Result<ChannelHandle> {
        let handle: WireHandle = self
            .api
            .get_json(&format!("entities/{}", dialog.id), &[])
            .await?;
        Ok(handle.into())
    }

    async fn fetch_full_channel(&self, handle: &ChannelHandle) -> Result<FullChannel> {
        let mut query = Vec::new();
        if let Some(hash) = handle.access_hash {
            query.push(("access_hash", hash.to_string()));
        }
        let full: FullChannelResponse = self
            .api
            .get_json(&format!("channels/{}/full", handle.id), &query)
            .await?;
        Ok(FullChannel {
            participants_count: full.participants_count,
        })
    }

    fn stream_messages(
        &self,
        channel: ChannelHandle,
        query: SearchQuery,
    ) -> BoxStream<'_, Result<MessageEvent>> {
        let api = self.api.clone();
        let path = format!("channels/{}/messages", channel.id);
        let start = Cursor::<i64> {
            at: None,
            remaining: query.limit,
            done: query.limit == 0,
        };

        stream::try_unfold(start, move |cursor| {
            let api = api.clone();
            let path = path.clone();
            let term = query.term.clone();
            let filter = query.filter;
            let access_hash = channel.access_hash;
            async move {
                if cursor.done {
                    return Ok(None);
                }
                let size = cursor.remaining.min(MESSAGE_PAGE_SIZE);
                let mut params = vec![
                    ("q", term),
                    ("limit", size.to_string()),
                    ("filter", filter_param(filter).to_string()),
                ];
                if let Some(hash) = access_hash {
                    params.push(("access_hash", hash.to_string()));
                }
                if let Some(offset_id) = cursor.at {
                    params.push(("offset_id", offset_id.to_string()));
                }

                let page: MessagesPage = api.get_json(&path, &params).await?;
                let batch: Vec<MessageEvent> = page
                    .messages
                    .into_iter()
                    .take(size)
                    .map(WireMessage::into_event)
                    .collect();
                let remaining = cursor.remaining - batch.len();
                let next = Cursor {
                    at: page.next_offset_id,
                    remaining,
                    done: batch.is_empty() || remaining == 0 || page.next_offset_id.is_none(),
                };
                Ok::<_, Error>(Some((batch, next)))
            }
        })
        .map_ok(|batch| stream::iter(batch.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_url_strips_trailing_slash() {
        let t = BridgeTransport::new(BridgeSettings {
            base_url: "http://bridge.local:8081/".to_string(),
            api_id: 1,
            api_hash: "h".to_string(),
            session_name: "crawler".to_string(),
            profile: ClientProfile::default(),
            request_timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            t.api.url("dialogs"),
            "http://bridge.local:8081/v1/sessions/crawler/dialogs"
        );
    }
}
