//! Live-channel abstraction and its WebSocket implementation

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::connect_async;
use tracing::{debug, trace, warn};

use crate::error::{LiveError, LiveResult};
use crate::message::{ClientMessage, LiveMessage};

/// Stream of messages from one connection; ends when the connection closes
pub type MessageStream = BoxStream<'static, LiveResult<LiveMessage>>;

/// A push channel that can be (re)connected
#[async_trait]
pub trait LiveChannel: Send + Sync {
    async fn connect(&self) -> LiveResult<MessageStream>;
}

/// WebSocket live channel
#[derive(Debug, Clone)]
pub struct WsChannel {
    url: String,
    token: Option<String>,
}

impl WsChannel {
    /// `base_url` may be `http(s)://` or `ws(s)://`; `/api/ws` is appended
    /// unless the URL already names a path ending in `/ws`
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let url = base_url
            .trim_end_matches('/')
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        let url = if url.ends_with("/ws") {
            url
        } else {
            format!("{}/api/ws", url)
        };
        Self { url, token }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn decode(message: Message) -> Option<LiveResult<LiveMessage>> {
    match message {
        Message::Text(text) => {
            trace!("Live message: {}", text);
            Some(serde_json::from_str(&text).map_err(LiveError::from))
        }
        Message::Close(frame) => {
            debug!("Live channel closed by peer: {:?}", frame);
            None
        }
        _ => None,
    }
}

#[async_trait]
impl LiveChannel for WsChannel {
    async fn connect(&self) -> LiveResult<MessageStream> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| LiveError::Channel(e.to_string()))?;
            request.headers_mut().insert("Authorization", value);
        }

        let (ws, _) = connect_async(request).await?;
        debug!("Connected to {}", self.url);
        let (mut write, read) = ws.split();

        let ping = serde_json::to_string(&ClientMessage::Ping)?;
        if let Err(e) = write.send(Message::Text(ping)).await {
            warn!("Initial ping failed: {}", e);
        }

        let stream = read.filter_map(|frame| async move {
            match frame {
                Ok(message) => decode(message),
                Err(e) => Some(Err(LiveError::from(e))),
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url() {
        assert_eq!(
            WsChannel::new("http://localhost:8099/", None).url(),
            "ws://localhost:8099/api/ws"
        );
        assert_eq!(
            WsChannel::new("wss://tent.example/api/ws", None).url(),
            "wss://tent.example/api/ws"
        );
    }

    #[test]
    fn test_decode_frames() {
        let msg = decode(Message::Text(r#"{"type":"pong"}"#.into()))
            .unwrap()
            .unwrap();
        assert_eq!(msg, LiveMessage::Pong);
        assert!(decode(Message::Binary(vec![1, 2])).is_none());
        assert!(decode(Message::Text("not json".into())).unwrap().is_err());
    }
}
