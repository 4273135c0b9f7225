//! Push-mode drain
//!
//! ```text
//! Streaming
//!   ├─ end-of-data → Completed  (emits Complete)
//!   ├─ I/O error   → Errored    (emits Error)
//!   └─ cancel      → Cancelled  (emits nothing)
//! ```
//!
//! Terminal states are absorbing, so the terminal event is emitted at most
//! once and nothing follows it. The drain owns its resource and closes it on
//! every exit path.

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use safstream_storage::ReadResource;

use crate::chunk::{Chunk, ChunkReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ReadEvent {
    Chunk(Vec<u8>),
    Complete,
    Error(String),
}

impl ReadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReadEvent::Chunk(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainState {
    Streaming,
    Completed,
    Errored,
    Cancelled,
}

impl DrainState {
    pub fn can_transition_to(&self, target: DrainState) -> bool {
        matches!(
            (self, target),
            (
                DrainState::Streaming,
                DrainState::Completed | DrainState::Errored | DrainState::Cancelled
            )
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DrainState::Streaming)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DrainState::Streaming => "streaming",
            DrainState::Completed => "completed",
            DrainState::Errored => "errored",
            DrainState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DrainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A push-mode read session that has not started draining yet
pub struct Drain {
    session_id: String,
    reader: ChunkReader,
    start: Option<u64>,
    state: DrainState,
}

impl Drain {
    pub fn new(
        session_id: impl Into<String>,
        resource: Box<dyn ReadResource>,
        buffer_size: usize,
        start: Option<u64>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            reader: ChunkReader::new(resource, buffer_size),
            start: start.filter(|offset| *offset > 0),
            state: DrainState::Streaming,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Release the resource without draining
    pub fn discard(self) {
        if let Err(e) = self.reader.close() {
            tracing::warn!(session_id = %self.session_id, error = %e, "Failed to close read stream");
        }
    }

    /// Run the drain loop to a terminal state. Blocks on provider I/O and on
    /// event delivery, so it belongs on a blocking worker.
    pub fn run(
        mut self,
        cancel: watch::Receiver<bool>,
        events: mpsc::Sender<ReadEvent>,
    ) -> DrainState {
        let cancelled = || *cancel.borrow() || events.is_closed();

        if let Some(offset) = self.start.take() {
            if cancelled() {
                return self.finish(DrainState::Cancelled, None, &events);
            }
            match self.reader.skip(offset) {
                Ok(skipped) => {
                    tracing::debug!(
                        session_id = %self.session_id,
                        requested = offset,
                        skipped,
                        "Applied start offset"
                    );
                }
                Err(e) => {
                    return self.finish(
                        DrainState::Errored,
                        Some(ReadEvent::Error(e.to_string())),
                        &events,
                    )
                }
            }
        }

        let mut chunks = 0usize;
        loop {
            if cancelled() {
                return self.finish(DrainState::Cancelled, None, &events);
            }

            match self.reader.next_chunk() {
                Ok(Chunk::Data(bytes)) => {
                    if cancelled() {
                        return self.finish(DrainState::Cancelled, None, &events);
                    }
                    let len = bytes.len();
                    if events.blocking_send(ReadEvent::Chunk(bytes)).is_err() {
                        return self.finish(DrainState::Cancelled, None, &events);
                    }
                    chunks += 1;
                    tracing::debug!(session_id = %self.session_id, bytes = len, "Emitted chunk");
                }
                Ok(Chunk::End) => {
                    tracing::debug!(session_id = %self.session_id, chunks, "Reached end of data");
                    return self.finish(DrainState::Completed, Some(ReadEvent::Complete), &events);
                }
                Err(e) => {
                    return self.finish(
                        DrainState::Errored,
                        Some(ReadEvent::Error(e.to_string())),
                        &events,
                    )
                }
            }
        }
    }

    fn finish(
        mut self,
        target: DrainState,
        terminal: Option<ReadEvent>,
        events: &mpsc::Sender<ReadEvent>,
    ) -> DrainState {
        if !self.state.can_transition_to(target) {
            tracing::warn!(
                session_id = %self.session_id,
                from = %self.state,
                to = %target,
                "Ignored drain transition"
            );
            return self.state;
        }
        self.state = target;

        // Release before reporting, so a client that sees the terminal event
        // can rely on the resource being closed.
        let Drain {
            session_id,
            reader,
            state,
            ..
        } = self;
        let close_result = reader.close();

        let terminal = match (terminal, close_result) {
            (Some(ReadEvent::Complete), Err(e)) => Some(ReadEvent::Error(e.to_string())),
            (terminal, Err(e)) => {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to close read stream");
                terminal
            }
            (terminal, Ok(())) => terminal,
        };

        match &terminal {
            Some(ReadEvent::Error(reason)) => {
                tracing::warn!(session_id = %session_id, error = %reason, "Read stream failed");
            }
            _ => {
                tracing::info!(session_id = %session_id, state = %state, "Read stream finished");
            }
        }

        if let Some(event) = terminal {
            let _ = events.blocking_send(event);
        }

        state
    }
}

/// Client side of a push-mode read session.
///
/// Yields zero or more `Chunk` events followed by exactly one `Complete` or
/// `Error`, unless cancelled first. Dropping the stream cancels it.
pub struct ReadEventStream {
    channel: String,
    events: mpsc::Receiver<ReadEvent>,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<DrainState>>,
    finished: bool,
}

impl ReadEventStream {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next event, or `None` after the terminal event or cancellation
    pub async fn recv(&mut self) -> Option<ReadEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        self.observe(event.as_ref());
        event
    }

    /// Stop the drain. No further events are delivered.
    pub fn cancel(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.cancel.send_replace(true);
        self.events.close();
        tracing::info!(channel = %self.channel, "Read stream cancelled by listener");
    }

    /// Stop the drain if it is still running and wait until it has released
    /// its resource.
    pub async fn close(mut self) -> DrainState {
        self.cancel();
        match self.task.take() {
            Some(task) => task.await.unwrap_or(DrainState::Errored),
            None => DrainState::Cancelled,
        }
    }

    fn observe(&mut self, event: Option<&ReadEvent>) {
        match event {
            Some(event) if !event.is_terminal() => {}
            _ => self.finished = true,
        }
    }
}

impl Stream for ReadEventStream {
    type Item = ReadEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.events.poll_recv(cx) {
            Poll::Ready(event) => {
                self.observe(event.as_ref());
                Poll::Ready(event)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ReadEventStream {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start draining on a blocking worker.
///
/// `capacity` bounds the events buffered ahead of the listener; 1 keeps a
/// single chunk in flight.
pub fn spawn_drain(channel: impl Into<String>, drain: Drain, capacity: usize) -> ReadEventStream {
    let channel = channel.into();
    let (events_tx, events_rx) = mpsc::channel(capacity.max(1));
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tracing::info!(
        channel = %channel,
        session_id = %drain.session_id(),
        "Listener attached, draining read stream"
    );
    let task = tokio::task::spawn_blocking(move || drain.run(cancel_rx, events_tx));

    ReadEventStream {
        channel,
        events: events_rx,
        cancel: cancel_tx,
        task: Some(task),
        finished: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use safstream_storage::{Faults, MemoryProvider, StorageProvider};

    fn file(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn collect(mut stream: ReadEventStream) -> (Vec<Vec<u8>>, Vec<ReadEvent>) {
        let mut chunks = Vec::new();
        let mut terminals = Vec::new();
        while let Some(event) = stream.recv().await {
            match event {
                ReadEvent::Chunk(bytes) => chunks.push(bytes),
                other => terminals.push(other),
            }
        }
        stream.close().await;
        (chunks, terminals)
    }

    #[test]
    fn test_drain_transitions() {
        assert!(DrainState::Streaming.can_transition_to(DrainState::Completed));
        assert!(DrainState::Streaming.can_transition_to(DrainState::Errored));
        assert!(DrainState::Streaming.can_transition_to(DrainState::Cancelled));

        for terminal in [
            DrainState::Completed,
            DrainState::Errored,
            DrainState::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(DrainState::Streaming));
            assert!(!terminal.can_transition_to(DrainState::Completed));
        }
    }

    #[tokio::test]
    async fn test_chunk_counts() {
        for (len, size) in [(0, 4), (1, 1), (10, 3), (12, 4), (4096, 1000), (7, 100)] {
            let provider = MemoryProvider::new();
            let data = file(len);
            let uri = provider.insert("docs", "f.bin", data.clone());

            let drain = Drain::new("s", provider.open_read(&uri).unwrap(), size, None);
            let (chunks, terminals) = collect(spawn_drain("c", drain, 1)).await;

            assert_eq!(chunks.len(), len.div_ceil(size), "len={len} size={size}");
            assert_eq!(chunks.concat(), data);
            assert_eq!(terminals, vec![ReadEvent::Complete]);
            assert_eq!(provider.stats(&uri).closes, 1);
        }
    }

    #[tokio::test]
    async fn test_start_offset() {
        let provider = MemoryProvider::new();
        let data = file(100);
        let uri = provider.insert("docs", "f.bin", data.clone());

        let drain = Drain::new("s", provider.open_read(&uri).unwrap(), 16, Some(40));
        let (chunks, terminals) = collect(spawn_drain("c", drain, 1)).await;

        assert_eq!(chunks.concat(), data[40..].to_vec());
        assert_eq!(terminals, vec![ReadEvent::Complete]);
    }

    #[tokio::test]
    async fn test_read_error_is_terminal() {
        let provider = MemoryProvider::new();
        let uri = provider.insert("docs", "f.bin", file(100));
        provider.set_faults(
            &uri,
            Faults {
                read_fails_at: Some(30),
                ..Faults::default()
            },
        );

        let drain = Drain::new("s", provider.open_read(&uri).unwrap(), 10, None);
        let (chunks, terminals) = collect(spawn_drain("c", drain, 1)).await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(terminals.len(), 1);
        assert!(matches!(terminals[0], ReadEvent::Error(_)));
        assert_eq!(provider.stats(&uri).closes, 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_events_and_releases() {
        let provider = MemoryProvider::new();
        let uri = provider.insert("docs", "f.bin", file(10_000));

        let drain = Drain::new("s", provider.open_read(&uri).unwrap(), 10, None);
        let mut stream = spawn_drain("c", drain, 1);

        for _ in 0..3 {
            assert!(matches!(stream.recv().await, Some(ReadEvent::Chunk(_))));
        }
        stream.cancel();
        assert_eq!(stream.recv().await, None);

        let state = stream.close().await;
        assert_eq!(state, DrainState::Cancelled);
        assert_eq!(provider.stats(&uri).closes, 1);
        assert_eq!(provider.stats(&uri).open_handles(), 0);
    }

    #[tokio::test]
    async fn test_stream_adapter() {
        let provider = MemoryProvider::new();
        let data = file(50);
        let uri = provider.insert("docs", "f.bin", data.clone());

        let drain = Drain::new("s", provider.open_read(&uri).unwrap(), 8, None);
        let events: Vec<ReadEvent> = spawn_drain("c", drain, 2).collect().await;

        assert_eq!(events.last(), Some(&ReadEvent::Complete));
        let bytes: Vec<u8> = events
            .into_iter()
            .filter_map(|e| match e {
                ReadEvent::Chunk(bytes) => Some(bytes),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(bytes, data);
    }
}
