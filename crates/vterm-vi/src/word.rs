//! Word classification for motions and text objects.
//!
//! Spec §4.4: "Word classification distinguishes Word (alnum+_), Keyword
//! (configurable broader class), Whitespace, and Other. Motion `w`/`b`/`e`
//! transitions on changes of class (with whitespace folding); `W`/`B`/`E`
//! use only empty-vs-nonempty."

/// The class a single character falls into for small-word (`w`/`b`/`e`)
/// motions. Big-word (`W`/`B`/`E`) motions only distinguish `Whitespace`
/// from everything else, via [`CharClass::is_whitespace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// `[A-Za-z0-9_]`, or any character in the configured keyword set.
    Word,
    /// Whitespace (folds runs together under `w`/`b`/`e` transitions).
    Whitespace,
    /// Punctuation/symbols not in the word or keyword class.
    Other,
}

impl CharClass {
    #[must_use]
    pub fn is_whitespace(self) -> bool {
        matches!(self, Self::Whitespace)
    }
}

/// Word-delimiter configuration: the additional characters, beyond
/// `[A-Za-z0-9_]`, that count as `Word` for `w`/`b`/`e` motions and
/// `Inner`/`A` `Word` text objects.
#[derive(Debug, Clone)]
pub struct WordClassifier {
    keyword_chars: Vec<char>,
}

impl Default for WordClassifier {
    fn default() -> Self {
        // xterm's default wordDelimiters complement: treat only alnum+_
        // as word chars out of the box; hosts widen this via config.
        Self { keyword_chars: Vec::new() }
    }
}

impl WordClassifier {
    #[must_use]
    pub fn new(extra_keyword_chars: impl IntoIterator<Item = char>) -> Self {
        Self { keyword_chars: extra_keyword_chars.into_iter().collect() }
    }

    #[must_use]
    pub fn classify(&self, ch: char) -> CharClass {
        if ch.is_whitespace() {
            return CharClass::Whitespace;
        }
        if ch == '_' || ch.is_alphanumeric() || self.keyword_chars.contains(&ch) {
            return CharClass::Word;
        }
        CharClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classifier_splits_word_whitespace_other() {
        let c = WordClassifier::default();
        assert_eq!(c.classify('a'), CharClass::Word);
        assert_eq!(c.classify('_'), CharClass::Word);
        assert_eq!(c.classify(' '), CharClass::Whitespace);
        assert_eq!(c.classify('-'), CharClass::Other);
    }

    #[test]
    fn configured_keyword_chars_widen_word_class() {
        let c = WordClassifier::new(['-', '.']);
        assert_eq!(c.classify('-'), CharClass::Word);
        assert_eq!(c.classify('.'), CharClass::Word);
        assert_eq!(c.classify('/'), CharClass::Other);
    }
}
