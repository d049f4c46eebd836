//! Point-to-point link to a single truck controller.
//!
//! Every message in either direction is a 4-byte big-endian length
//! followed by that many bytes of UTF-8 JSON.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use minefleet_config::FramedConfig;
use minefleet_model::{TruckCommand, TruckId};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{
    FramedRead, FramedWrite, LengthDelimitedCodec, LengthDelimitedCodecError,
};
use tracing::{debug, info, trace, warn};

use super::{InboundHandler, TelemetryChannel, Topic};
use crate::error::{FrameError, TransportError};

fn codec(max_frame_len: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .max_frame_length(max_frame_len)
        .new_codec()
}

fn classify(err: io::Error, max: usize) -> FrameError {
    let too_large = err
        .get_ref()
        .is_some_and(|inner| inner.is::<LengthDelimitedCodecError>());
    if too_large {
        return FrameError::TooLarge { max };
    }
    match err.kind() {
        // A stream that ends with a partial frame buffered surfaces as
        // `Other` ("bytes remaining on stream").
        io::ErrorKind::Other
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => FrameError::Disconnected,
        _ => FrameError::Io(err),
    }
}

/// Reads whole frames; a short read is a disconnect, never a short frame.
pub struct FrameReader<R> {
    inner: FramedRead<R, LengthDelimitedCodec>,
    max_frame_len: usize,
}

impl<R> fmt::Debug for FrameReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameReader")
            .field("max_frame_len", &self.max_frame_len)
            .finish_non_exhaustive()
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_frame_len: usize) -> Self {
        Self {
            inner: FramedRead::new(reader, codec(max_frame_len)),
            max_frame_len,
        }
    }

    pub async fn next_frame(&mut self) -> Result<Bytes, FrameError> {
        match self.inner.next().await {
            Some(Ok(frame)) => Ok(frame.freeze()),
            Some(Err(err)) => Err(classify(err, self.max_frame_len)),
            None => Err(FrameError::Disconnected),
        }
    }
}

pub struct FrameWriter<W> {
    inner: FramedWrite<W, LengthDelimitedCodec>,
    max_frame_len: usize,
}

impl<W> fmt::Debug for FrameWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWriter")
            .field("max_frame_len", &self.max_frame_len)
            .finish_non_exhaustive()
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W, max_frame_len: usize) -> Self {
        Self {
            inner: FramedWrite::new(writer, codec(max_frame_len)),
            max_frame_len,
        }
    }

    pub async fn send(&mut self, payload: Bytes) -> Result<(), FrameError> {
        if payload.len() > self.max_frame_len {
            return Err(FrameError::TooLarge {
                max: self.max_frame_len,
            });
        }
        self.inner
            .send(payload)
            .await
            .map_err(|err| classify(err, self.max_frame_len))
    }
}

/// [`TelemetryChannel`] over one TCP connection to a truck controller.
///
/// Inbound state frames are handed to the handler as
/// [`InboundHandler::on_state_frame`] for the configured truck.
pub struct FramedChannel {
    addr: String,
    truck: TruckId,
    max_frame_len: usize,
    connected: Arc<AtomicBool>,
    writer: Mutex<Option<FrameWriter<OwnedWriteHalf>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for FramedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramedChannel")
            .field("addr", &self.addr)
            .field("truck", &self.truck)
            .field("connected", &self.connected.load(Ordering::Acquire))
            .finish()
    }
}

impl FramedChannel {
    pub fn new(config: &FramedConfig) -> Self {
        Self {
            addr: config.addr.clone(),
            truck: TruckId(config.truck_id),
            max_frame_len: config.max_frame_len,
            connected: Arc::new(AtomicBool::new(false)),
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    pub fn truck(&self) -> TruckId {
        self.truck
    }

    pub async fn send_command(
        &self,
        command: &TruckCommand,
    ) -> Result<(), TransportError> {
        let payload = command.encode()?;
        trace!(?command, "sending command");
        self.send_frame(Bytes::from(payload)).await
    }

    async fn send_frame(&self, payload: Bytes) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        if let Err(err) = writer.send(payload).await {
            warn!(addr = %self.addr, error = %err, "framed send failed");
            if matches!(err, FrameError::Disconnected | FrameError::Io(_)) {
                guard.take();
                self.connected.store(false, Ordering::Release);
            }
            return Err(err.into());
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryChannel for FramedChannel {
    async fn connect(
        &self,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<(), TransportError> {
        let mut reader_slot = self.reader.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        if let Some(stale) = reader_slot.take() {
            stale.abort();
        }

        info!(addr = %self.addr, truck = %self.truck, "opening framed link");
        let stream = TcpStream::connect(self.addr.as_str()).await.map_err(|source| {
            TransportError::Connect {
                addr: self.addr.clone(),
                source,
            }
        })?;
        stream.set_nodelay(true).map_err(|source| TransportError::Connect {
            addr: self.addr.clone(),
            source,
        })?;
        let (read_half, write_half) = stream.into_split();

        *self.writer.lock().await =
            Some(FrameWriter::new(write_half, self.max_frame_len));
        self.connected.store(true, Ordering::Release);

        let mut frames = FrameReader::new(read_half, self.max_frame_len);
        let connected = Arc::clone(&self.connected);
        let truck = self.truck;
        *reader_slot = Some(tokio::spawn(async move {
            loop {
                match frames.next_frame().await {
                    Ok(frame) => handler.on_state_frame(truck, &frame),
                    Err(FrameError::Disconnected) => {
                        info!(%truck, "framed link closed by peer");
                        break;
                    }
                    Err(err) => {
                        warn!(%truck, error = %err, "framed link failed");
                        break;
                    }
                }
            }
            connected.store(false, Ordering::Release);
            handler.on_disconnect();
        }));

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
        debug!(%topic, truck = %self.truck, "publishing over framed link");
        self.send_frame(Bytes::from(payload)).await
    }

    async fn disconnect(&self) {
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        self.writer.lock().await.take();
        if self.connected.swap(false, Ordering::AcqRel) {
            info!(addr = %self.addr, "framed link closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn short_frame_is_a_disconnect() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(&[b'x'; 9]).await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server, 1024);
        assert!(matches!(
            reader.next_frame().await,
            Err(FrameError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn whole_frames_round_trip_then_eof_disconnects() {
        let (client, server) = tokio::io::duplex(256);
        let mut writer = FrameWriter::new(client, 1024);
        writer.send(Bytes::from_static(b"{\"a\":1}")).await.unwrap();
        writer.send(Bytes::from_static(b"{}")).await.unwrap();
        drop(writer);

        let mut reader = FrameReader::new(server, 1024);
        assert_eq!(reader.next_frame().await.unwrap(), &b"{\"a\":1}"[..]);
        assert_eq!(reader.next_frame().await.unwrap(), &b"{}"[..]);
        assert!(matches!(
            reader.next_frame().await,
            Err(FrameError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn header_is_four_byte_big_endian() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut writer = FrameWriter::new(client, 1024);
        writer.send(Bytes::from_static(b"abc")).await.unwrap();
        drop(writer);

        let mut raw = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut server, &mut raw)
            .await
            .unwrap();
        assert_eq!(raw, b"\x00\x00\x00\x03abc");
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(&4096u32.to_be_bytes()).await.unwrap();
        let mut reader = FrameReader::new(server, 16);
        assert!(matches!(
            reader.next_frame().await,
            Err(FrameError::TooLarge { max: 16 })
        ));

        let (client, _server) = tokio::io::duplex(64);
        let mut writer = FrameWriter::new(client, 4);
        assert!(matches!(
            writer.send(Bytes::from_static(b"too long")).await,
            Err(FrameError::TooLarge { max: 4 })
        ));
    }
}
