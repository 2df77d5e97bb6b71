// Default on-disk location for the movie database

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the database file location.
pub const DB_PATH_ENV: &str = "REELRANK_DB";

/// Database file path: `REELRANK_DB` if set, otherwise
/// `<platform data dir>/reelrank/movies.db` (created as needed).
pub fn database_file_path() -> Result<PathBuf> {
    if let Ok(custom) = env::var(DB_PATH_ENV) {
        if !custom.trim().is_empty() {
            return Ok(PathBuf::from(custom));
        }
    }

    let dir = dirs::data_dir()
        .context("could not resolve platform data directory")?
        .join("reelrank");
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create data directory {}", dir.display()))?;

    Ok(dir.join("movies.db"))
}
