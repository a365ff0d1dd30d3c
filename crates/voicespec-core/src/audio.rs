//! Audio inputs: validation, MIME detection, and the inbox/processed folders.

use crate::error::{Result, VoicespecError};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Container formats accepted as dictated specifications.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg", "flac", "webm"];

/// MIME type for a supported extension (case-insensitive).
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(mime)
}

pub fn is_audio(path: &Path) -> bool {
    mime_type_for(path).is_some()
}

// ---------------------------------------------------------------------------
// AudioFile
// ---------------------------------------------------------------------------

/// An audio file that exists, is readable, and has a supported format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub size: u64,
}

impl AudioFile {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(VoicespecError::AudioNotFound(path.to_path_buf()));
        }
        let mime_type =
            mime_type_for(path).ok_or_else(|| VoicespecError::UnsupportedAudio(path.to_path_buf()))?;
        // Opening proves readability before any bytes leave the machine.
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            mime_type,
            size,
        })
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InboxEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
}

impl InboxEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Audio files waiting in `dir`, newest first. Creates `dir` if missing.
pub fn list_inbox(dir: &Path) -> Result<Vec<InboxEntry>> {
    crate::io::ensure_dir(dir)?;

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_audio(&path) {
            continue;
        }
        let meta = entry.metadata()?;
        entries.push(InboxEntry {
            path,
            size: meta.len(),
            modified: DateTime::<Local>::from(meta.modified()?),
        });
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(entries)
}

/// Move a consumed audio file into `processed_dir`, suffixing on collision.
pub fn move_to_processed(audio: &Path, processed_dir: &Path) -> Result<PathBuf> {
    let dest = crate::io::move_into(audio, processed_dir)?;
    tracing::info!(from = %audio.display(), to = %dest.display(), "moved processed audio");
    Ok(dest)
}

/// `512 B`, `12.3 KB`, `4.0 MB`.
pub fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}
