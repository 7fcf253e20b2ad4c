use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mindlink_core::session_state::SessionExport;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// `mindlink_session_<UTC timestamp>.json`, safe on every filesystem.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("mindlink_session_{}.json", at.format("%Y%m%dT%H%M%SZ"))
}

/// Writes the snapshot as pretty JSON into `dir`, creating it if needed.
pub fn write_export(dir: &Path, export: &SessionExport) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;

    let path = dir.join(export_file_name(export.date));
    let json = export
        .to_json_pretty()
        .context("Failed to serialize session export")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write session export: {}", path.display()))?;

    Ok(path)
}

/// Stores synthesized speech for a patient message as `<message-id>.mp3`.
pub fn write_audio(dir: &Path, message_id: Uuid, audio: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create audio directory: {}", dir.display()))?;
    let path = dir.join(format!("{message_id}.mp3"));
    fs::write(&path, audio)
        .with_context(|| format!("Failed to write audio file: {}", path.display()))?;
    Ok(path)
}
