use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{InboundHandler, TelemetryChannel, Topic, TopicMap};
use crate::error::TransportError;

/// Broker-backed channel using redis pub/sub.
///
/// Inbound topics are read by a spawned task that clears the connected
/// flag when the subscription stream ends. Nothing reconnects on its own;
/// the next [`connect`](TelemetryChannel::connect) does.
pub struct RedisChannel {
    url: String,
    topics: TopicMap,
    connected: Arc<AtomicBool>,
    publisher: Mutex<Option<ConnectionManager>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for RedisChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisChannel")
            .field("url", &self.url)
            .field("topics", &self.topics)
            .field("connected", &self.connected.load(Ordering::Acquire))
            .finish()
    }
}

impl RedisChannel {
    pub fn new(url: impl Into<String>, topics: TopicMap) -> Self {
        Self {
            url: url.into(),
            topics,
            connected: Arc::new(AtomicBool::new(false)),
            publisher: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

#[async_trait]
impl TelemetryChannel for RedisChannel {
    async fn connect(
        &self,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<(), TransportError> {
        let mut reader = self.reader.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        if let Some(stale) = reader.take() {
            stale.abort();
        }

        info!(url = %self.url, "connecting to telemetry broker");
        let client = redis::Client::open(self.url.as_str())?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        let mut pubsub = client.get_async_pubsub().await?;
        for topic in Topic::INBOUND {
            pubsub.subscribe(self.topics.name(topic)).await?;
        }

        *self.publisher.lock().await = Some(publisher);
        self.connected.store(true, Ordering::Release);

        let topics = self.topics.clone();
        let connected = Arc::clone(&self.connected);
        *reader = Some(tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let channel = msg.get_channel_name();
                match topics.resolve(channel) {
                    Some(topic) => {
                        trace!(%topic, "inbound message");
                        handler.on_message(topic, msg.get_payload_bytes());
                    }
                    None => debug!(channel, "message on unmapped channel"),
                }
            }
            connected.store(false, Ordering::Release);
            handler.on_disconnect();
            warn!("telemetry subscription ended; channel disconnected");
        }));

        info!("telemetry broker connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn publish(
        &self,
        topic: Topic,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let Some(mut conn) = self.publisher.lock().await.clone() else {
            return Err(TransportError::NotConnected);
        };

        let channel = self.topics.name(topic);
        let result: Result<(), redis::RedisError> =
            conn.publish(channel, payload).await;
        if let Err(err) = result {
            warn!(%topic, error = %err, "publish failed; marking channel disconnected");
            self.mark_disconnected();
            return Err(err.into());
        }
        debug!(%topic, channel, "published");
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        self.publisher.lock().await.take();
        if self.connected.swap(false, Ordering::AcqRel) {
            info!("telemetry broker disconnected");
        }
    }
}
