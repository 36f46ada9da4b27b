//! Local persistence for the invoice being built.
//!
//! The whole record is written as one JSON document next to a last-saved
//! timestamp. Writes replace the previous document atomically, so when an
//! autosave and a manual save race the last one simply wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local, Utc};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::InvoiceRecord;

pub const DATA_FILE: &str = "invoice_data.json";
pub const LAST_SAVED_FILE: &str = "invoice_last_saved";

#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Store { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    fn last_saved_path(&self) -> PathBuf {
        self.dir.join(LAST_SAVED_FILE)
    }

    /// Loads the saved record. Stored fields are merged over the defaults, so
    /// blobs written by older builds still load. A corrupt file is treated as
    /// absent. The stored totals are returned as written; callers pass the
    /// record through `Editor::recalculate` before using it.
    pub fn load(&self) -> Result<Option<InvoiceRecord>> {
        let path = self.data_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str::<InvoiceRecord>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load saved invoice data, starting fresh");
                Ok(None)
            }
        }
    }

    pub fn last_saved(&self) -> Result<Option<DateTime<Utc>>> {
        let path = self.last_saved_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc)))
    }

    pub fn save(&self, record: &InvoiceRecord) -> Result<DateTime<Utc>> {
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(record)?;
        self.replace(&self.data_path(), json.as_bytes())?;

        let now = Utc::now();
        self.replace(&self.last_saved_path(), now.to_rfc3339().as_bytes())?;
        info!(dir = %self.dir.display(), invoice = %record.invoice_number, "invoice saved");
        Ok(now)
    }

    // Each writer gets its own temp file, so racing saves never share one.
    fn replace(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        for path in [self.data_path(), self.last_saved_path()] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        info!(dir = %self.dir.display(), "saved invoice data cleared");
        Ok(())
    }
}

pub fn format_last_saved(saved: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(saved) = saved else {
        return "Never".to_string();
    };
    let seconds = (now - saved).num_seconds();
    if seconds < 60 {
        "Just now".to_string()
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{} hours ago", seconds / 3600)
    } else {
        saved.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}

/// Reads an image file into a data URL suitable for the logo field.
pub fn read_logo(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "image/png",
    };
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}
