//! Assistant-response sanitation.
//!
//! LLM output reaches the transcript (and the TTS stage downstream) with
//! markdown decoration, emoji, and URLs that read badly and get spoken
//! literally. The sanitizer strips them while leaving the words intact.

use regex::Regex;

/// Cleans assistant text fragments. Patterns are compiled once at
/// construction; build one per process and share it.
#[derive(Debug)]
pub struct ResponseSanitizer {
    emoji: Regex,
    emoticon: Regex,
    url: Regex,
    markdown_code: Regex,
    markdown_bold: Regex,
    markdown_emphasis: Regex,
    markdown_heading: Regex,
    repeated_terminal: Regex,
    whitespace: Regex,
}

impl ResponseSanitizer {
    pub fn new() -> Self {
        Self {
            emoji: Regex::new(
                "[\u{1F300}-\u{1FAFF}\u{2600}-\u{27BF}\u{1F1E6}-\u{1F1FF}\u{FE0F}\u{2B00}-\u{2BFF}]+",
            )
            .expect("emoji pattern"),
            emoticon: Regex::new(r"(?:^|\s)(?::[-']?[)(DPpd/\\|]|;[-']?\)|<3|\^_\^|-_-|T_T)(?:\s|$)")
                .expect("emoticon pattern"),
            url: Regex::new(r"(?:https?://|www\.)\S+").expect("url pattern"),
            markdown_code: Regex::new(r"`([^`]*)`").expect("code pattern"),
            markdown_bold: Regex::new(r"\*\*([^*]*)\*\*").expect("bold pattern"),
            // Asterisk emphasis only: underscore emphasis would mangle
            // snake_case identifiers in tool output.
            markdown_emphasis: Regex::new(r"\*([^*]*)\*").expect("emphasis pattern"),
            markdown_heading: Regex::new(r"(?m)^#{1,6}\s*").expect("heading pattern"),
            repeated_terminal: Regex::new(r"!{2,}|\?{2,}|\.{2,}").expect("terminal pattern"),
            whitespace: Regex::new(r"\s+").expect("whitespace pattern"),
        }
    }

    pub fn sanitize(&self, text: &str) -> String {
        let text = self.url.replace_all(text, "");
        let text = self.emoji.replace_all(&text, "");
        let text = self.emoticon.replace_all(&text, " ");
        let text = self.markdown_code.replace_all(&text, "$1");
        let text = self.markdown_bold.replace_all(&text, "$1");
        let text = self.markdown_emphasis.replace_all(&text, "$1");
        let text = self.markdown_heading.replace_all(&text, "");
        let text = self
            .repeated_terminal
            .replace_all(&text, |caps: &regex::Captures| caps[0][0..1].to_string());
        let text = self.whitespace.replace_all(&text, " ");
        text.trim().to_string()
    }
}

impl Default for ResponseSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_decoration() {
        let s = ResponseSanitizer::new();
        assert_eq!(
            s.sanitize("Your **primary swap** costs *170 rupees*."),
            "Your primary swap costs 170 rupees."
        );
        assert_eq!(s.sanitize("## Swap history\nDone"), "Swap history Done");
        assert_eq!(s.sanitize("use `get_swap_history`"), "use get_swap_history");
    }

    #[test]
    fn strips_urls() {
        let s = ResponseSanitizer::new();
        assert_eq!(
            s.sanitize("Details at https://example.in/plans ok?"),
            "Details at ok?"
        );
    }

    #[test]
    fn strips_emoji() {
        let s = ResponseSanitizer::new();
        assert_eq!(s.sanitize("Done! 🎉 Battery swapped 🔋"), "Done! Battery swapped");
    }

    #[test]
    fn collapses_repeated_punctuation() {
        let s = ResponseSanitizer::new();
        assert_eq!(s.sanitize("Ready!!! Sure??"), "Ready! Sure?");
    }

    #[test]
    fn plain_hindi_passes_through() {
        let s = ResponseSanitizer::new();
        assert_eq!(
            s.sanitize("आपका स्वैप पूरा हो गया है।"),
            "आपका स्वैप पूरा हो गया है।"
        );
    }
}
