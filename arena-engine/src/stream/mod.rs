//! Push-event stream consumer for live debates
//!
//! One consumer per debate session: it owns the stream connection's
//! lifecycle, parses frames into [`DebateEvent`]s, and delivers them to
//! the caller in transport arrival order over a bounded channel. No
//! reordering happens here — ordering correctness belongs to the
//! transcript reconstructor.

mod parser;

pub use parser::{decode_frame, RawFrame, SseParser};

use arena_common::events::{DebateEvent, STATUS_COMPLETED};
use arena_common::ArenaConfig;
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StreamError;

/// Consumes one debate's event stream.
///
/// `open` subscribes, spawns a reader task, and hands back the consumer;
/// events arrive via [`StreamConsumer::next_event`]. When the transport
/// itself fails, a terminal [`DebateEvent::TransportError`] is delivered
/// and nothing further arrives. [`StreamConsumer::close`] releases the
/// connection and is safe to call any number of times; dropping the
/// consumer closes it as well.
pub struct StreamConsumer {
    events: mpsc::Receiver<DebateEvent>,
    reader: Option<JoinHandle<()>>,
    closed: bool,
}

impl StreamConsumer {
    /// Open the stream for a debate and start delivering events.
    ///
    /// `planned_rounds` is the round count the debate was created with;
    /// it classifies each incoming round (opening/rebuttal/closing) since
    /// live frames carry no kind field.
    pub async fn open(
        http: &reqwest::Client,
        config: &ArenaConfig,
        debate_id: Uuid,
        planned_rounds: u32,
    ) -> Result<Self, StreamError> {
        let url = format!("{}/api/debates/stream/{}", config.base_url(), debate_id);

        let response = tokio::time::timeout(
            config.connect_timeout(),
            http.get(&url)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .send(),
        )
        .await
        .map_err(|_| StreamError::ConnectTimeout)?
        .map_err(StreamError::Connect)?;

        if !response.status().is_success() {
            return Err(StreamError::HttpStatus(response.status().as_u16()));
        }

        info!("stream opened for debate {}", debate_id);
        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let reader = tokio::spawn(read_frames(response, tx, planned_rounds, debate_id));

        Ok(Self {
            events: rx,
            reader: Some(reader),
            closed: false,
        })
    }

    /// Next event in arrival order; `None` once the stream is exhausted
    /// or the consumer has been closed.
    pub async fn next_event(&mut self) -> Option<DebateEvent> {
        if self.closed {
            return None;
        }
        self.events.recv().await
    }

    /// Release the underlying connection.
    ///
    /// Idempotent: the first call aborts the reader (dropping the HTTP
    /// response closes the connection); later calls are no-ops. Events
    /// still buffered are discarded — after close, nothing is delivered.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
            debug!("stream consumer closed");
        }
        self.closed = true;
        self.events.close();
    }

    /// Whether the connection has been released
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for StreamConsumer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reader task: parse the byte stream into events until it ends.
///
/// An EOF before a completion frame means the connection died mid-debate
/// and is reported as a transport error; an EOF afterwards is a normal
/// finish.
async fn read_frames(
    response: reqwest::Response,
    tx: mpsc::Sender<DebateEvent>,
    planned_rounds: u32,
    debate_id: Uuid,
) {
    let mut stream = response.bytes_stream();
    let mut parser = SseParser::new();
    let mut completed = false;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for frame in parser.push(&bytes) {
                    let Some(event) = decode_frame(frame, planned_rounds) else {
                        continue;
                    };
                    if matches!(&event, DebateEvent::End { .. })
                        || matches!(&event, DebateEvent::Status { text, .. } if text == STATUS_COMPLETED)
                    {
                        completed = true;
                    }
                    if tx.send(event).await.is_err() {
                        // Receiver gone; stop reading
                        return;
                    }
                }
            }
            Err(e) => {
                debug!("stream chunk error for debate {}: {}", debate_id, e);
                let _ = tx
                    .send(DebateEvent::TransportError {
                        reason: e.to_string(),
                        timestamp: Utc::now(),
                    })
                    .await;
                return;
            }
        }
    }

    if !completed {
        let _ = tx
            .send(DebateEvent::TransportError {
                reason: "connection closed before completion".to_string(),
                timestamp: Utc::now(),
            })
            .await;
    }
    debug!("stream reader finished for debate {}", debate_id);
}
