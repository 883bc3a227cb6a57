//! JSON Lines persistence for transcripts.
//!
//! A session file holds one metadata record (tagged `"_type":"metadata"`)
//! followed by one record per message, in order. Files are replaced
//! atomically: the new content is written to a temporary file next to the
//! target and renamed over it, so a reader sees either the previous complete
//! file or the new complete file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;
use tracing::debug;

use clawgate_core::{Message, Metadata};

use crate::error::{Result, SessionError};
use crate::session::{Transcript, TranscriptState};

/// File extension of session files.
pub const SESSION_EXTENSION: &str = "jsonl";

const RECORD_TYPE_FIELD: &str = "_type";
const METADATA_RECORD: &str = "metadata";

#[derive(Debug, Serialize, Deserialize)]
struct MetadataRecord<'a> {
    #[serde(rename = "_type")]
    record_type: Cow<'a, str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    metadata: Cow<'a, Metadata>,
}

impl<'a> MetadataRecord<'a> {
    fn of(state: &'a TranscriptState) -> Self {
        Self {
            record_type: Cow::Borrowed(METADATA_RECORD),
            created_at: state.created_at,
            updated_at: state.updated_at,
            metadata: Cow::Borrowed(&state.metadata),
        }
    }
}

fn is_metadata_record(value: &Value) -> bool {
    value.get(RECORD_TYPE_FIELD).and_then(Value::as_str) == Some(METADATA_RECORD)
}

/// Serialize a transcript state into the record stream.
pub(crate) fn encode_state(state: &TranscriptState) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    serde_json::to_writer(&mut buf, &MetadataRecord::of(state))?;
    buf.push(b'\n');
    for msg in &state.messages {
        serde_json::to_writer(&mut buf, msg)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

/// Rebuild a transcript state from a record stream.
///
/// Records are read until the stream is exhausted; they do not need to be
/// one per line. A stream without a metadata record yields a state stamped
/// with the current time.
pub(crate) fn decode_state<R: Read>(reader: R, path: &Path) -> Result<TranscriptState> {
    let mut state = TranscriptState::empty(Utc::now());
    let records = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();

    for (record, value) in records.enumerate() {
        let corrupt = |source: serde_json::Error| {
            if source.is_io() {
                SessionError::io(path, source.into())
            } else {
                SessionError::Corrupt {
                    path: path.to_path_buf(),
                    record,
                    source,
                }
            }
        };

        let value = value.map_err(corrupt)?;
        if is_metadata_record(&value) {
            let meta: MetadataRecord<'static> = serde_json::from_value(value).map_err(corrupt)?;
            state.created_at = meta.created_at;
            state.updated_at = meta.updated_at;
            state.metadata = meta.metadata.into_owned();
        } else {
            let msg: Message = serde_json::from_value(value).map_err(corrupt)?;
            state.messages.push(msg);
        }
    }

    Ok(state)
}

/// Write `transcript` to `path`, replacing any previous file atomically.
///
/// The transcript's read lock is held only while the records are serialized,
/// not during file I/O. Saves of the same transcript are serialized.
pub fn save(transcript: &Transcript, path: &Path) -> Result<()> {
    let _ordered = transcript.persist_guard();

    let bytes = transcript
        .with_state(encode_state)
        .map_err(|source| SessionError::Encode {
            key: transcript.key().to_string(),
            source,
        })?;

    write_atomic(path, &bytes)?;
    debug!(
        "Saved session {} ({} bytes) to {}",
        transcript.key(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Load the transcript stored at `path` under `key`.
pub fn load(key: &str, path: &Path) -> Result<Transcript> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SessionError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(SessionError::io(path, e)),
    };

    let state = decode_state(BufReader::new(file), path)?;
    debug!(
        "Loaded session {key} with {} messages from {}",
        state.messages.len(),
        path.display()
    );
    Ok(Transcript::from_state(key.to_string(), state))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source: std::io::Error| SessionError::io(path, source);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
