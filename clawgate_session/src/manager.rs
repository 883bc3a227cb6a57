//! Registry of live conversation sessions.
//!
//! The `SessionManager` is the entry point for channel and agent workers:
//! it hands out shared [`Transcript`]s by key, loading them from disk on
//! first use, and persists them on request.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::codec::{self, SESSION_EXTENSION};
use crate::error::{Result, SessionError};
use crate::session::Transcript;

/// Characters that are replaced when a key is turned into a file name.
const RESERVED_PATH_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Turn an arbitrary conversation key into a file-name-safe stem.
#[must_use]
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if RESERVED_PATH_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Owns the set of live transcripts, one per key.
///
/// The registry lock only guards the key map. It is never held while a
/// transcript is read or written, or while files are touched, so work on one
/// conversation never stalls another.
#[derive(Debug)]
pub struct SessionManager {
    base_dir: PathBuf,
    sessions: RwLock<HashMap<String, Arc<Transcript>>>,
}

impl SessionManager {
    /// Create a manager storing sessions under `base_dir`, creating the
    /// directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| SessionError::io(&base_dir, e))?;
        info!("SessionManager initialized at {}", base_dir.display());

        Ok(Self {
            base_dir,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Storage location of the session with the given key.
    #[must_use]
    pub fn session_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{SESSION_EXTENSION}", sanitize_key(key)))
    }

    /// Return the live transcript for `key`, loading it from disk or
    /// starting a fresh one if it is not live yet.
    ///
    /// A missing session file is not an error. A file that exists but cannot
    /// be read or decoded is.
    pub fn get_or_create(&self, key: &str) -> Result<Arc<Transcript>> {
        if let Some(transcript) = self.live(key) {
            return Ok(transcript);
        }

        let transcript = match codec::load(key, &self.session_path(key)) {
            Ok(transcript) => transcript,
            Err(e) if e.is_not_found() => {
                debug!("No stored session for {key}, starting a new one");
                Transcript::new(key)
            }
            Err(e) => return Err(e),
        };

        // Another caller may have registered the key while we were loading;
        // the first registration wins.
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(transcript));
        Ok(Arc::clone(entry))
    }

    /// Start a new, empty session under `key` and persist it.
    ///
    /// Fails with [`SessionError::AlreadyExists`] if the key is live or has a
    /// stored session.
    pub fn create(&self, key: &str) -> Result<Arc<Transcript>> {
        let path = self.session_path(key);
        if path.exists() {
            return Err(SessionError::AlreadyExists(key.to_string()));
        }

        let transcript = Arc::new(Transcript::new(key));
        {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            if sessions.contains_key(key) {
                return Err(SessionError::AlreadyExists(key.to_string()));
            }
            sessions.insert(key.to_string(), Arc::clone(&transcript));
        }

        if let Err(e) = codec::save(&transcript, &path) {
            self.unregister(key, &transcript);
            return Err(e);
        }

        info!("Created session {key} at {}", path.display());
        Ok(transcript)
    }

    /// Persist `transcript` to its storage location.
    pub fn save(&self, transcript: &Transcript) -> Result<()> {
        codec::save(transcript, &self.session_path(transcript.key()))
    }

    /// Forget `key` and remove its session file. Deleting a key that was
    /// never stored succeeds.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        let path = self.session_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted session {key}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::io(path, e)),
        }
    }

    /// Keys of every stored session, sorted.
    ///
    /// Keys are derived from file names, so they come back in sanitized form
    /// (`a/b` is listed as `a_b`). Sessions that are live but were never
    /// saved are not included.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.base_dir).map_err(|e| SessionError::io(&self.base_dir, e))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SessionError::io(&self.base_dir, e))?;
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            // Matched on the raw name: the empty key is stored as `.jsonl`,
            // which `Path::extension` treats as a dotfile with no extension.
            let name = entry.file_name();
            if let Some(stem) = name
                .to_str()
                .and_then(|n| n.strip_suffix(SESSION_EXTENSION))
                .and_then(|n| n.strip_suffix('.'))
            {
                keys.push(stem.to_string());
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Whether `key` is currently held in memory.
    #[must_use]
    pub fn is_live(&self, key: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn live(&self, key: &str) -> Option<Arc<Transcript>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Remove `key` only if it still maps to `transcript`.
    fn unregister(&self, key: &str, transcript: &Arc<Transcript>) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.get(key).is_some_and(|t| Arc::ptr_eq(t, transcript)) {
            sessions.remove(key);
        }
    }
}
