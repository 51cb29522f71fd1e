use chrono::Datelike;
use log::info;

use crate::errors::Result;

/// Sanitizes a filename by removing invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Sanitizes track filename in "Artist - Title" format
pub fn sanitize_track_filename(artist: &str, title: &str) -> String {
    let sanitized_artist = sanitize_filename(artist);
    let sanitized_title = sanitize_filename(title);
    format!("{} - {}", sanitized_artist, sanitized_title)
}

/// Creates a directory if it doesn't exist
pub async fn ensure_dir_exists(path: &std::path::Path) -> Result<()> {
    if !path.exists() {
        tokio::fs::create_dir_all(path).await?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Parses a 1-based selection list such as `1,3-5` into zero-based indices.
pub fn parse_selection(input: &str, len: usize) -> Vec<usize> {
    let mut picked = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (a.trim().parse::<usize>(), b.trim().parse::<usize>()),
            None => (part.parse::<usize>(), part.parse::<usize>()),
        };
        if let (Ok(start), Ok(end)) = (start, end) {
            for n in start.min(end)..=start.max(end) {
                if n >= 1 && n <= len && !picked.contains(&(n - 1)) {
                    picked.push(n - 1);
                }
            }
        }
    }
    picked
}
