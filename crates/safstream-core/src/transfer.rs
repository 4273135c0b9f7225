//! Transfer orchestrator
//!
//! One `Transfer` serves every session of one client. Read sessions come in
//! two flavors: push (started here, drained once a listener attaches) and
//! pull (one chunk per request). Write sessions append client chunks.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use safstream_read::{spawn_drain, Chunk, Drain, PullReadManager, ReadEventStream};
use safstream_session::{Session, SessionError};
use safstream_storage::{DocumentEntry, LocalFile, StorageProvider};
use safstream_write::{open_target, WriteStreamManager};

use crate::config::Config;
use crate::error::CoreError;
use crate::oneshot;
use crate::Result;

pub struct Transfer {
    provider: Arc<dyn StorageProvider>,
    config: Config,
    /// Push sessions waiting for a listener, keyed by channel name
    pending: Arc<Mutex<HashMap<String, Drain>>>,
    pull: PullReadManager,
    writes: WriteStreamManager,
}

impl Transfer {
    pub fn new(provider: Arc<dyn StorageProvider>, config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            pull: PullReadManager::new(),
            writes: WriteStreamManager::new(),
        })
    }

    pub fn with_provider<P: StorageProvider>(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            config: Config::default(),
            pending: Arc::new(Mutex::new(HashMap::new())),
            pull: PullReadManager::new(),
            writes: WriteStreamManager::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open pull-read and write sessions
    pub fn sessions(&self) -> Vec<Session> {
        let mut sessions = self.pull.list_sessions();
        sessions.extend(self.writes.list_sessions());
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    // === Push reads ===

    /// Open `locator` for a push-mode read. Returns the event channel name;
    /// nothing is read until [`listen`](Self::listen) attaches to it.
    pub async fn start_read_stream(
        &self,
        locator: &str,
        session_id: &str,
        buffer_size: Option<usize>,
        start: Option<u64>,
    ) -> Result<String> {
        let buffer_size = self.buffer_size(buffer_size)?;
        let provider = Arc::clone(&self.provider);
        let locator = locator.to_string();
        let resource = run_blocking(move || Ok(provider.open_read(&locator)?)).await?;

        let channel = self.config.channel_name(session_id);
        let drain = Drain::new(session_id, resource, buffer_size, start);

        {
            let mut pending = self.pending.lock();
            if !pending.contains_key(&channel) {
                pending.insert(channel.clone(), drain);
                tracing::info!(
                    session_id = %session_id,
                    channel = %channel,
                    buffer_size,
                    start = ?start,
                    "Started read stream"
                );
                return Ok(channel);
            }
        }

        run_blocking(move || {
            drain.discard();
            Ok(())
        })
        .await?;
        Err(SessionError::AlreadyExists(session_id.to_string()).into())
    }

    /// Attach a listener to a started push session and begin draining.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen(&self, channel: &str) -> Result<ReadEventStream> {
        let drain = self
            .pending
            .lock()
            .remove(channel)
            .ok_or_else(|| SessionError::NotFound(channel.to_string()))?;

        Ok(spawn_drain(channel, drain, self.config.event_capacity))
    }

    /// Release a push session nobody listened to
    pub async fn cancel_pending(&self, channel: &str) -> Result<()> {
        let drain = self
            .pending
            .lock()
            .remove(channel)
            .ok_or_else(|| SessionError::NotFound(channel.to_string()))?;

        tracing::info!(channel = %channel, "Discarding unheard read stream");
        run_blocking(move || {
            drain.discard();
            Ok(())
        })
        .await
    }

    // === Pull reads ===

    pub async fn start_pull_read(
        &self,
        locator: &str,
        session_id: &str,
        buffer_size: Option<usize>,
        start: Option<u64>,
    ) -> Result<()> {
        let buffer_size = self.buffer_size(buffer_size)?;
        let provider = Arc::clone(&self.provider);
        let pull = self.pull.clone();
        let locator = locator.to_string();
        let session_id = session_id.to_string();

        run_blocking(move || {
            let resource = provider.open_read(&locator)?;
            pull.start(&session_id, resource, buffer_size, start)?;
            Ok(())
        })
        .await
    }

    pub async fn read_next_chunk(&self, session_id: &str) -> Result<Chunk> {
        let pull = self.pull.clone();
        let session_id = session_id.to_string();
        run_blocking(move || Ok(pull.next_chunk(&session_id)?)).await
    }

    pub async fn skip_chunk(&self, session_id: &str, count: u64) -> Result<u64> {
        let pull = self.pull.clone();
        let session_id = session_id.to_string();
        run_blocking(move || Ok(pull.skip(&session_id, count)?)).await
    }

    pub async fn end_read_stream(&self, session_id: &str) -> Result<()> {
        let pull = self.pull.clone();
        let session_id = session_id.to_string();
        run_blocking(move || Ok(pull.end(&session_id)?)).await
    }

    // === Writes ===

    pub async fn start_write_stream(
        &self,
        dir: &str,
        file_name: &str,
        mime: &str,
        session_id: &str,
        overwrite: bool,
    ) -> Result<DocumentEntry> {
        let provider = Arc::clone(&self.provider);
        let writes = self.writes.clone();
        let (dir, file_name, mime) = (dir.to_string(), file_name.to_string(), mime.to_string());
        let session_id = session_id.to_string();

        run_blocking(move || {
            let (entry, stream) =
                open_target(provider.as_ref(), &dir, &file_name, &mime, overwrite)?;
            writes.start(&session_id, stream)?;
            tracing::info!(
                session_id = %session_id,
                uri = %entry.uri,
                file_name = %entry.name,
                "Started write stream"
            );
            Ok(entry)
        })
        .await
    }

    pub async fn write_chunk(&self, session_id: &str, data: Vec<u8>) -> Result<()> {
        let writes = self.writes.clone();
        let session_id = session_id.to_string();
        run_blocking(move || Ok(writes.write_chunk(&session_id, &data)?)).await
    }

    pub async fn end_write_stream(&self, session_id: &str) -> Result<()> {
        let writes = self.writes.clone();
        let session_id = session_id.to_string();
        run_blocking(move || Ok(writes.end(&session_id)?)).await
    }

    // === One-shot transfers ===

    /// Copy a provider document to a local path. Returns the bytes copied.
    pub async fn copy_to_local(&self, src: &str, dest: impl Into<PathBuf>) -> Result<u64> {
        let provider = Arc::clone(&self.provider);
        let buffer_size = self.config.default_buffer_size;
        let src = src.to_string();
        let dest = dest.into();

        run_blocking(move || {
            let reader = provider.open_read(&src)?;
            let writer = match LocalFile::create(&dest) {
                Ok(file) => file,
                Err(e) => {
                    let _ = reader.close();
                    return Err(e.into());
                }
            };
            let copied = oneshot::copy_and_close(reader, Box::new(writer), buffer_size)?;
            tracing::info!(
                src = %src,
                dest = %dest.display(),
                bytes = copied,
                "Copied to local file"
            );
            Ok(copied)
        })
        .await
    }

    /// Read a whole document, or `count` bytes from `start`
    pub async fn read_bytes(
        &self,
        locator: &str,
        start: Option<u64>,
        count: Option<usize>,
    ) -> Result<Vec<u8>> {
        let provider = Arc::clone(&self.provider);
        let buffer_size = self.config.default_buffer_size;
        let locator = locator.to_string();

        run_blocking(move || {
            let reader = provider.open_read(&locator)?;
            Ok(oneshot::read_range(reader, start, count, buffer_size)?)
        })
        .await
    }

    pub async fn write_bytes(
        &self,
        dir: &str,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
        overwrite: bool,
    ) -> Result<DocumentEntry> {
        let provider = Arc::clone(&self.provider);
        let (dir, file_name, mime) = (dir.to_string(), file_name.to_string(), mime.to_string());

        run_blocking(move || {
            let (entry, stream) =
                open_target(provider.as_ref(), &dir, &file_name, &mime, overwrite)?;
            oneshot::write_and_close(stream, &data)?;
            tracing::info!(uri = %entry.uri, bytes = data.len(), "Wrote file");
            Ok(entry)
        })
        .await
    }

    /// Copy a local file into a document under `dir`
    pub async fn paste_local_file(
        &self,
        dir: &str,
        file_name: &str,
        mime: &str,
        local_src: impl Into<PathBuf>,
        overwrite: bool,
    ) -> Result<DocumentEntry> {
        let provider = Arc::clone(&self.provider);
        let buffer_size = self.config.default_buffer_size;
        let (dir, file_name, mime) = (dir.to_string(), file_name.to_string(), mime.to_string());
        let local_src = local_src.into();

        run_blocking(move || {
            // Open the source first so a missing file creates no document
            let reader = LocalFile::open(&local_src)?;
            let (entry, stream) =
                match open_target(provider.as_ref(), &dir, &file_name, &mime, overwrite) {
                    Ok(target) => target,
                    Err(e) => {
                        let _ = safstream_storage::ReadResource::close(Box::new(reader));
                        return Err(e.into());
                    }
                };
            let copied = oneshot::copy_and_close(Box::new(reader), stream, buffer_size)?;
            tracing::info!(
                src = %local_src.display(),
                uri = %entry.uri,
                bytes = copied,
                "Pasted local file"
            );
            Ok(entry)
        })
        .await
    }

    /// Resolve a requested chunk size before any resource is opened
    fn buffer_size(&self, requested: Option<usize>) -> Result<usize> {
        match requested.unwrap_or(self.config.default_buffer_size) {
            size if size == 0 || size > self.config.max_buffer_size => {
                Err(SessionError::InvalidBufferSize(size).into())
            }
            size => Ok(size),
        }
    }
}

impl Clone for Transfer {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
            pending: Arc::clone(&self.pending),
            pull: self.pull.clone(),
            writes: self.writes.clone(),
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(CoreError::Worker(e.to_string())))
}
