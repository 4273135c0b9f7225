//! Method dispatch
//!
//! Maps named client calls with JSON arguments onto [`Transfer`]
//! operations. Every call produces exactly one [`MethodResult`]; failures
//! carry a per-method error code alongside the error kind.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, ErrorKind};
use crate::transfer::Transfer;
use crate::Result;

/// A named call from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub code: Option<String>,
    pub kind: Option<ErrorKind>,
}

impl MethodResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
            kind: None,
        }
    }

    pub fn err(code: &str, error: &CoreError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            code: Some(code.to_string()),
            kind: Some(error.kind()),
        }
    }

    pub fn not_implemented(method: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(format!("Method not implemented: {}", method)),
            code: Some("notImplemented".to_string()),
            kind: None,
        }
    }
}

/// Methods understood by [`dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    ReadFile,
    StartReadCustomFileStream,
    ReadCustomFileStreamChunk,
    SkipCustomFileStreamChunk,
    EndReadCustomFileStream,
    CopyToLocalFile,
    ReadFileSync,
    WriteFileSync,
    StartWriteStream,
    WriteChunk,
    EndWriteStream,
    PasteLocalFile,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        let method = match name {
            "readFile" => Method::ReadFile,
            "startReadCustomFileStream" => Method::StartReadCustomFileStream,
            "readCustomFileStreamChunk" => Method::ReadCustomFileStreamChunk,
            "skipCustomFileStreamChunk" => Method::SkipCustomFileStreamChunk,
            "endReadCustomFileStream" => Method::EndReadCustomFileStream,
            "copyToLocalFile" => Method::CopyToLocalFile,
            "readFileSync" => Method::ReadFileSync,
            "writeFileSync" => Method::WriteFileSync,
            "startWriteStream" => Method::StartWriteStream,
            "writeChunk" => Method::WriteChunk,
            "endWriteStream" => Method::EndWriteStream,
            "pasteLocalFile" => Method::PasteLocalFile,
            _ => return None,
        };
        Some(method)
    }

    fn error_code(&self, error: &CoreError) -> &'static str {
        match self {
            Method::ReadFile | Method::ReadFileSync => "ReadFileError",
            Method::StartReadCustomFileStream => "StartReadCustomFileStream",
            Method::ReadCustomFileStreamChunk => "ReadCustomFileStreamChunk",
            Method::SkipCustomFileStreamChunk => "SkipCustomFileStreamChunk",
            Method::EndReadCustomFileStream => "EndReadCustomFileStream",
            Method::CopyToLocalFile => "CopyToLocalFileError",
            Method::WriteFileSync | Method::StartWriteStream | Method::PasteLocalFile => {
                "StartWriteStream"
            }
            Method::WriteChunk if error.is_stream_not_found() => "WriteChunk",
            Method::WriteChunk => "WriteFileChunkError",
            Method::EndWriteStream if error.is_stream_not_found() => "EndWriteStream",
            Method::EndWriteStream => "CloseWriteStreamError",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadStreamArgs {
    file_uri: String,
    session: String,
    buffer_size: Option<usize>,
    start: Option<u64>,
}

#[derive(Deserialize)]
struct SessionArgs {
    session: String,
}

#[derive(Deserialize)]
struct SkipArgs {
    session: String,
    count: u64,
}

#[derive(Deserialize)]
struct CopyArgs {
    src: String,
    dest: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadSyncArgs {
    file_uri: String,
    start: Option<u64>,
    count: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteSyncArgs {
    tree_uri: String,
    file_name: String,
    mime: String,
    data: Vec<u8>,
    #[serde(default)]
    overwrite: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartWriteArgs {
    tree_uri: String,
    file_name: String,
    mime: String,
    session: String,
    #[serde(default)]
    overwrite: bool,
}

#[derive(Deserialize)]
struct ChunkArgs {
    session: String,
    data: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasteArgs {
    tree_uri: String,
    file_name: String,
    mime: String,
    local_src: String,
    #[serde(default)]
    overwrite: bool,
}

/// Run one client call to completion
pub async fn dispatch(transfer: &Transfer, call: MethodCall) -> MethodResult {
    let Some(method) = Method::parse(&call.method) else {
        tracing::warn!(method = %call.method, "Unknown method");
        return MethodResult::not_implemented(&call.method);
    };

    match run(transfer, method, call.args).await {
        Ok(data) => MethodResult::ok(data),
        Err(e) => {
            let code = method.error_code(&e);
            tracing::warn!(
                method = %call.method,
                code,
                kind = %e.kind(),
                error = %e,
                "Method failed"
            );
            MethodResult::err(code, &e)
        }
    }
}

async fn run(transfer: &Transfer, method: Method, args: Value) -> Result<Value> {
    match method {
        Method::ReadFile => {
            let a: ReadStreamArgs = parse(args)?;
            let channel = transfer
                .start_read_stream(&a.file_uri, &a.session, a.buffer_size, a.start)
                .await?;
            Ok(Value::String(channel))
        }
        Method::StartReadCustomFileStream => {
            let a: ReadStreamArgs = parse(args)?;
            transfer
                .start_pull_read(&a.file_uri, &a.session, a.buffer_size, a.start)
                .await?;
            Ok(Value::Null)
        }
        Method::ReadCustomFileStreamChunk => {
            let a: SessionArgs = parse(args)?;
            let chunk = transfer.read_next_chunk(&a.session).await?;
            Ok(serde_json::to_value(chunk)?)
        }
        Method::SkipCustomFileStreamChunk => {
            let a: SkipArgs = parse(args)?;
            let skipped = transfer.skip_chunk(&a.session, a.count).await?;
            Ok(Value::from(skipped))
        }
        Method::EndReadCustomFileStream => {
            let a: SessionArgs = parse(args)?;
            transfer.end_read_stream(&a.session).await?;
            Ok(Value::Null)
        }
        Method::CopyToLocalFile => {
            let a: CopyArgs = parse(args)?;
            transfer.copy_to_local(&a.src, a.dest).await?;
            Ok(Value::Null)
        }
        Method::ReadFileSync => {
            let a: ReadSyncArgs = parse(args)?;
            let bytes = transfer.read_bytes(&a.file_uri, a.start, a.count).await?;
            Ok(serde_json::to_value(bytes)?)
        }
        Method::WriteFileSync => {
            let a: WriteSyncArgs = parse(args)?;
            let entry = transfer
                .write_bytes(&a.tree_uri, &a.file_name, &a.mime, a.data, a.overwrite)
                .await?;
            Ok(serde_json::to_value(entry)?)
        }
        Method::StartWriteStream => {
            let a: StartWriteArgs = parse(args)?;
            let entry = transfer
                .start_write_stream(&a.tree_uri, &a.file_name, &a.mime, &a.session, a.overwrite)
                .await?;
            Ok(serde_json::to_value(entry)?)
        }
        Method::WriteChunk => {
            let a: ChunkArgs = parse(args)?;
            transfer.write_chunk(&a.session, a.data).await?;
            Ok(Value::Null)
        }
        Method::EndWriteStream => {
            let a: SessionArgs = parse(args)?;
            transfer.end_write_stream(&a.session).await?;
            Ok(Value::Null)
        }
        Method::PasteLocalFile => {
            let a: PasteArgs = parse(args)?;
            let entry = transfer
                .paste_local_file(&a.tree_uri, &a.file_name, &a.mime, a.local_src, a.overwrite)
                .await?;
            Ok(serde_json::to_value(entry)?)
        }
    }
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| CoreError::InvalidArguments(e.to_string()))
}
