use regex::Regex;
use std::sync::OnceLock;

use crate::api::LyricResponse;

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("static lyric marker pattern"))
}

/// Strips every bracketed marker (`[00:12.34]`, `[ar:Someone]`) and surrounding
/// whitespace. Returns `None` when nothing is left.
pub fn normalize_lyrics(raw: &str) -> Option<String> {
    let cleaned = marker_pattern().replace_all(raw, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Picks the lyric text to embed. The translated text wins when present and
/// preferred; otherwise the original, falling back to whichever normalizes to
/// something non-empty.
pub fn choose_lyrics(response: &LyricResponse, prefer_translated: bool) -> Option<String> {
    let original = response.lyric.as_deref().and_then(normalize_lyrics);
    let translated = response.translated.as_deref().and_then(normalize_lyrics);

    if prefer_translated {
        translated.or(original)
    } else {
        original.or(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_markers_are_removed() {
        assert_eq!(
            normalize_lyrics("[00:01.00]Hello\n[00:02.00]World").as_deref(),
            Some("Hello\nWorld")
        );
    }

    #[test]
    fn marker_only_text_is_absent() {
        assert_eq!(normalize_lyrics("[ti:Song]\n[00:00.00]  \n"), None);
        assert_eq!(normalize_lyrics(""), None);
    }

    #[test]
    fn translated_text_preferred_when_configured() {
        let response = LyricResponse {
            lyric: Some("[00:01]original".to_string()),
            translated: Some("[00:01]translated".to_string()),
        };
        assert_eq!(choose_lyrics(&response, true).as_deref(), Some("translated"));
        assert_eq!(choose_lyrics(&response, false).as_deref(), Some("original"));
    }

    #[test]
    fn empty_translation_falls_back_to_original() {
        let response = LyricResponse {
            lyric: Some("[00:01]original".to_string()),
            translated: Some("[00:01]".to_string()),
        };
        assert_eq!(choose_lyrics(&response, true).as_deref(), Some("original"));
    }
}
