//! Content constraints enforced at the boundary: emoji stripping,
//! punctuation-aware title truncation, the short excerpt used to render a
//! cover image, and body-file reading.
//!
//! All lengths are counted in characters, not bytes; titles and bodies are
//! mostly CJK text.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{EngineError, Result};

/// Separators a truncated title may end on, tried in order. Mixed CJK and
/// ASCII because titles routinely mix both.
const TITLE_BREAKS: [char; 11] = ['！', '!', '，', ',', '。', '？', '?', '｜', '|', ' ', '、'];

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F300..=0x1F5FF   // symbols & pictographs
        | 0x1F600..=0x1F64F // emoticons
        | 0x1F680..=0x1F6FF // transport & map
        | 0x1F900..=0x1F9FF // supplemental symbols
        | 0x1FA00..=0x1FA6F
        | 0x1FA70..=0x1FAFF
        | 0x2600..=0x26FF   // misc symbols
        | 0x2702..=0x27B0   // dingbats
        | 0x1F1E0..=0x1F1FF // regional indicators
        | 0xFE00..=0xFE0F   // variation selectors
        | 0x200D            // zero-width joiner
    )
}

/// Remove emoji code points. A no-op on strings that contain none.
pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|c| !is_emoji(*c)).collect()
}

/// Truncate a title to at most `max_chars` characters, never mid-word when
/// a separator exists past the midpoint. Emoji are stripped first; they eat
/// into the character budget and the composer rejects them anyway.
/// Idempotent: re-truncating a truncated title returns it unchanged.
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    let title = strip_emoji(title);
    let title = title.trim();
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    tracing::warn!(max_chars, "title over limit, truncating");
    let cut: String = title.chars().take(max_chars).collect();
    for sep in TITLE_BREAKS {
        if let Some(byte_idx) = cut.rfind(sep) {
            let char_idx = cut[..byte_idx].chars().count();
            if char_idx > max_chars / 2 {
                return cut[..byte_idx + sep.len_utf8()].trim_end().to_string();
            }
        }
    }
    cut.trim_end().to_string()
}

fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\S+").unwrap())
}

/// Derive the short text used to generate a cover image: emoji and
/// `#hashtag` tokens stripped, clipped to `max_chars`. Falls back to the
/// raw content prefix if stripping leaves nothing.
pub fn image_excerpt(content: &str, max_chars: usize) -> String {
    let text = strip_emoji(content);
    let text = hashtag_re().replace_all(&text, "");
    let text = text.trim();
    let clipped: String = text.chars().take(max_chars).collect();
    if clipped.is_empty() {
        content.chars().take(max_chars).collect()
    } else {
        clipped
    }
}

/// Read a message body from a plain-text/markdown file. Other formats are
/// rejected up front rather than pasted as garbage.
pub fn read_body_file(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !matches!(ext.as_str(), "md" | "markdown" | "txt") {
        return Err(EngineError::Content(format!(
            "body must be a markdown/text file (.md, .markdown, .txt): {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content.trim().to_string())
}

/// `@path` indirection for positional arguments: a value starting with `@`
/// names a UTF-8 file to read; anything else is taken literally.
pub fn resolve_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(content.trim().to_string())
        }
        None => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn strip_emoji_is_noop_without_emoji() {
        assert_eq!(strip_emoji("plain ascii"), "plain ascii");
        assert_eq!(strip_emoji("中文标题没有表情"), "中文标题没有表情");
    }

    #[test]
    fn strip_emoji_removes_supplementary_plane_emoji() {
        assert_eq!(strip_emoji("Hello 🎉 World"), "Hello  World");
        assert_eq!(strip_emoji("🚀🚀🚀"), "");
        assert_eq!(strip_emoji("a✂b"), "ab");
    }

    #[test]
    fn short_titles_pass_through() {
        assert_eq!(truncate_title("Project Updates", 20), "Project Updates");
    }

    #[test]
    fn truncation_respects_limit_and_breaks_on_separator() {
        let t = truncate_title("a strong opinion, and then a very long tail", 20);
        assert!(t.chars().count() <= 20);
        // The comma sits past the midpoint, so the cut backs off to it
        // instead of splitting "and".
        assert_eq!(t, "a strong opinion,");
    }

    #[test]
    fn truncation_is_idempotent() {
        for raw in [
            "Project Updates",
            "a strong opinion, and then a very long tail",
            "发布 🎉 一篇很长很长很长很长很长很长很长很长的标题！结尾",
            "nobreakatallinthiswholeverylongtitlestring",
        ] {
            let once = truncate_title(raw, 20);
            assert_eq!(truncate_title(&once, 20), once);
            assert!(once.chars().count() <= 20);
        }
    }

    #[test]
    fn truncation_ignores_separators_before_midpoint() {
        // Only separator is at char 3, inside the first half: hard cut wins.
        let t = truncate_title("ab, cdefghijklmnopqrstuv", 20);
        assert_eq!(t.chars().count(), 20);
        assert!(!t.ends_with(','));
    }

    #[test]
    fn excerpt_strips_hashtags_and_emoji() {
        assert_eq!(image_excerpt("Status: green. \n\n#weekly", 500), "Status: green.");
        assert_eq!(image_excerpt("🎉 #a #b", 500), "🎉 #a #b".chars().take(500).collect::<String>());
    }

    #[test]
    fn excerpt_clips_to_max_chars() {
        let long = "字".repeat(600);
        assert_eq!(image_excerpt(&long, 500).chars().count(), 500);
    }

    #[test]
    fn body_file_rejects_unknown_extensions() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        writeln!(f, "hello").unwrap();
        assert!(read_body_file(f.path()).is_err());
    }

    #[test]
    fn body_file_reads_and_trims_markdown() {
        let mut f = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        writeln!(f, "Status: green. \n\n#weekly\n").unwrap();
        assert_eq!(read_body_file(f.path()).unwrap(), "Status: green. \n\n#weekly");
    }

    #[test]
    fn at_prefix_reads_file() {
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(f, "from file").unwrap();
        let arg = format!("@{}", f.path().display());
        assert_eq!(resolve_arg(&arg).unwrap(), "from file");
        assert_eq!(resolve_arg("inline").unwrap(), "inline");
    }
}
