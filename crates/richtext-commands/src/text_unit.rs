//! Text Units
//!
//! Character and word boundaries inside a single textblock's text, in `char` offsets (the
//! same unit document positions use for text).
//!
//! - A character step moves over one extended grapheme cluster, so a combining mark is
//!   never separated from its base.
//! - A word step first skips one run of whitespace next to the offset, then consumes a
//!   maximal run of the class that follows (word characters or other punctuation).
//!
//! # Example
//!
//! ```rust
//! use richtext_commands::{TextUnit, text_unit::prev_boundary};
//!
//! assert_eq!(prev_boundary("foo bar ", 8, TextUnit::Word), 4);
//! assert_eq!(prev_boundary("e\u{301}", 2, TextUnit::Char), 0);
//! ```

use unicode_segmentation::UnicodeSegmentation;

/// How far a motion or deletion reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextUnit {
    /// One grapheme cluster.
    Char,
    /// One word, with the whitespace next to it.
    Word,
}

/// Character class used for word boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    /// Whitespace.
    Whitespace,
    /// Letters, digits, `_`, and extenders such as `·`.
    Word,
    /// Everything else: punctuation, symbols, inline leaves.
    Other,
}

/// Classify `ch`.
pub fn char_class(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Whitespace
    } else if ch.is_alphanumeric() || ch == '_' || is_extender(ch) {
        CharClass::Word
    } else {
        CharClass::Other
    }
}

/// Extenders continue the word they sit in (`l·l`, `ー`).
fn is_extender(ch: char) -> bool {
    matches!(
        ch,
        '\u{b7}'
            | '\u{2d0}'
            | '\u{2d1}'
            | '\u{387}'
            | '\u{640}'
            | '\u{e46}'
            | '\u{ec6}'
            | '\u{3005}'
            | '\u{3031}'..='\u{3035}'
            | '\u{309d}'..='\u{309e}'
            | '\u{30fc}'..='\u{30fe}'
            | '\u{a015}'
            | '\u{ff70}'
    )
}

#[derive(Debug, Clone, Copy)]
struct Cluster {
    start: usize,
    end: usize,
    class: CharClass,
}

fn clusters(text: &str) -> Vec<Cluster> {
    let mut out = Vec::new();
    let mut start = 0;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        let class = grapheme.chars().next().map_or(CharClass::Other, char_class);
        out.push(Cluster {
            start,
            end: start + len,
            class,
        });
        start += len;
    }
    out
}

/// The `unit` boundary before char offset `offset`. Returns `offset` when there is none.
pub fn prev_boundary(text: &str, offset: usize, unit: TextUnit) -> usize {
    let clusters = clusters(text);
    let i = clusters.iter().take_while(|c| c.end <= offset).count();
    if let Some(inside) = clusters.get(i)
        && inside.start < offset
    {
        return inside.start;
    }
    let mut j = i;
    match unit {
        TextUnit::Char => j = j.saturating_sub(1),
        TextUnit::Word => {
            while j > 0 && clusters[j - 1].class == CharClass::Whitespace {
                j -= 1;
            }
            if j > 0 {
                let class = clusters[j - 1].class;
                while j > 0 && clusters[j - 1].class == class {
                    j -= 1;
                }
            }
        }
    }
    if j == i { offset } else { clusters[j].start }
}

/// The `unit` boundary after char offset `offset`. Returns `offset` when there is none.
pub fn next_boundary(text: &str, offset: usize, unit: TextUnit) -> usize {
    let clusters = clusters(text);
    let i = clusters.iter().take_while(|c| c.start < offset).count();
    if i > 0 && clusters[i - 1].end > offset {
        return clusters[i - 1].end;
    }
    let mut j = i;
    match unit {
        TextUnit::Char => j = (j + 1).min(clusters.len()),
        TextUnit::Word => {
            while j < clusters.len() && clusters[j].class == CharClass::Whitespace {
                j += 1;
            }
            if j < clusters.len() {
                let class = clusters[j].class;
                while j < clusters.len() && clusters[j].class == class {
                    j += 1;
                }
            }
        }
    }
    if j == i { offset } else { clusters[j - 1].end }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_class() {
        assert_eq!(char_class(' '), CharClass::Whitespace);
        assert_eq!(char_class('\u{a0}'), CharClass::Whitespace);
        assert_eq!(char_class('x'), CharClass::Word);
        assert_eq!(char_class('漢'), CharClass::Word);
        assert_eq!(char_class('_'), CharClass::Word);
        assert_eq!(char_class('\u{b7}'), CharClass::Word);
        assert_eq!(char_class('\u{387}'), CharClass::Word);
        assert_eq!(char_class('ー'), CharClass::Word);
        assert_eq!(char_class('.'), CharClass::Other);
        assert_eq!(char_class('\u{FFFC}'), CharClass::Other);
    }

    #[test]
    fn test_char_steps_keep_combining_marks() {
        let text = "ae\u{301}b";
        assert_eq!(prev_boundary(text, 3, TextUnit::Char), 1);
        assert_eq!(next_boundary(text, 1, TextUnit::Char), 3);
        assert_eq!(prev_boundary(text, 0, TextUnit::Char), 0);
        assert_eq!(next_boundary(text, 4, TextUnit::Char), 4);
    }

    #[test]
    fn test_offset_inside_cluster_snaps() {
        let text = "e\u{301}";
        assert_eq!(prev_boundary(text, 1, TextUnit::Char), 0);
        assert_eq!(next_boundary(text, 1, TextUnit::Char), 2);
    }

    #[test]
    fn test_word_backward_skips_space() {
        assert_eq!(prev_boundary("foo bar", 7, TextUnit::Word), 4);
        assert_eq!(prev_boundary("foo bar ", 8, TextUnit::Word), 4);
        assert_eq!(prev_boundary("foo...", 6, TextUnit::Word), 3);
        assert_eq!(prev_boundary("   ", 3, TextUnit::Word), 0);
        assert_eq!(prev_boundary("l·l", 3, TextUnit::Word), 0);
    }

    #[test]
    fn test_word_forward() {
        assert_eq!(next_boundary("foo bar", 0, TextUnit::Word), 3);
        assert_eq!(next_boundary("foo bar", 3, TextUnit::Word), 7);
        assert_eq!(next_boundary("a, b", 1, TextUnit::Word), 2);
        assert_eq!(next_boundary("abc", 3, TextUnit::Word), 3);
    }
}
