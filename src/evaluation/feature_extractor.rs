//! Statistical features extracted from snapshot code text.
//!
//! The scorer never looks at code semantics, only at these counts.

use once_cell::sync::Lazy;
use regex::Regex;

/// Line prefixes that make a line count as a comment line
const COMMENT_LINE_PREFIXES: [&str; 4] = ["//", "#", "/*", "*"];

/// Comment markers counted anywhere in the text
static COMMENT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"//|/\*|#").expect("comment marker pattern is valid"));

/// Counts derived from one snapshot's code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodeFeatures {
    /// Length in characters
    pub char_count: usize,
    pub total_lines: usize,
    pub comment_lines: usize,
    /// Occurrences of `//`, `/*` or `#`
    pub comment_markers: usize,
}

impl CodeFeatures {
    /// Fraction of lines that are comments, 0 when there are no lines
    pub fn comment_ratio(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        self.comment_lines as f64 / self.total_lines as f64
    }
}

/// Extracts [`CodeFeatures`] from code text
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(code: &str) -> CodeFeatures {
        let mut total_lines = 0;
        let mut comment_lines = 0;

        for line in code.lines() {
            total_lines += 1;
            let trimmed = line.trim_start();
            if COMMENT_LINE_PREFIXES
                .iter()
                .any(|prefix| trimmed.starts_with(prefix))
            {
                comment_lines += 1;
            }
        }

        CodeFeatures {
            char_count: code.chars().count(),
            total_lines,
            comment_lines,
            comment_markers: COMMENT_MARKER.find_iter(code).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_code_has_no_lines() {
        let features = FeatureExtractor::extract("");
        assert_eq!(features.total_lines, 0);
        assert_eq!(features.comment_ratio(), 0.0);
        assert_eq!(features.comment_markers, 0);
    }

    #[test]
    fn test_comment_lines_and_markers() {
        let code = "// entry point\nfn main() {\n    let x = 1; // inline\n    /* block */\n}\n";
        let features = FeatureExtractor::extract(code);

        assert_eq!(features.total_lines, 5);
        // "// entry point" and "/* block */" start with a comment prefix
        assert_eq!(features.comment_lines, 2);
        assert_eq!(features.comment_markers, 3);
        assert!((features.comment_ratio() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_hash_comments() {
        let code = "# setup\nimport os\n  # indented\nprint(os.name)";
        let features = FeatureExtractor::extract(code);
        assert_eq!(features.total_lines, 4);
        assert_eq!(features.comment_lines, 2);
        assert_eq!(features.comment_markers, 2);
    }

    #[test]
    fn test_char_count_is_characters_not_bytes() {
        let features = FeatureExtractor::extract("héllo");
        assert_eq!(features.char_count, 5);
    }
}
