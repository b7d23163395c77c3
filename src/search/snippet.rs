use crate::core::types::StoredFields;

/// Context excerpt around the first literal match in a stored field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snippet {
    Text(String),
    /// The document matched through analysis but no candidate occurs
    /// literally in the stored text (stemming, phrase gaps, other fields).
    NoLiteralMatch,
    /// The document has no stored value for the snippet field
    MissingField,
}

impl Snippet {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Snippet::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnippetExtractor {
    pub field: String,
    pub margin: usize,      // Characters kept on each side of the match
}

impl SnippetExtractor {
    pub fn new(field: impl Into<String>, margin: usize) -> Self {
        SnippetExtractor { field: field.into(), margin }
    }

    /// Try each candidate in order; the first one found case-insensitively
    /// in the stored field decides the window.
    pub fn extract(&self, fields: &StoredFields, candidates: &[String]) -> Snippet {
        let Some(text) = fields.get(&self.field) else {
            return Snippet::MissingField;
        };

        candidates.iter()
            .filter(|candidate| !candidate.trim().is_empty())
            .find_map(|candidate| find_ignore_case(text, candidate.trim()))
            .map(|(start, end)| Snippet::Text(self.window(text, start, end)))
            .unwrap_or(Snippet::NoLiteralMatch)
    }

    fn window(&self, text: &str, start: usize, end: usize) -> String {
        let from = text[..start]
            .char_indices()
            .rev()
            .take(self.margin)
            .last()
            .map(|(idx, _)| idx)
            .unwrap_or(start);
        let to = text[end..]
            .char_indices()
            .nth(self.margin)
            .map(|(idx, _)| end + idx)
            .unwrap_or(text.len());

        text[from..to].trim().to_string()
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte range of the first case-insensitive occurrence of `needle`
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return None;
    }

    for (start, _) in haystack.char_indices() {
        let mut rest = haystack[start..].char_indices();
        let mut end = start;
        let matched = needle.iter().all(|&n| match rest.next() {
            Some((idx, c)) if chars_eq_ignore_case(c, n) => {
                end = start + idx + c.len_utf8();
                true
            }
            _ => false,
        });
        if matched {
            return Some((start, end));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(content: &str) -> StoredFields {
        StoredFields::from([("content".to_string(), content.to_string())])
    }

    fn candidates(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn whole_short_text_is_returned_for_a_full_match() {
        let extractor = SnippetExtractor::new("content", 50);
        let snippet = extractor.extract(&fields("the quick brown fox"), &candidates(&["the quick brown fox"]));
        assert_eq!(snippet, Snippet::Text("the quick brown fox".to_string()));
    }

    #[test]
    fn window_is_clipped_to_margin_and_trimmed() {
        let extractor = SnippetExtractor::new("content", 4);
        let snippet = extractor.extract(
            &fields("aaaa bbbb NEEDLE cccc dddd"),
            &candidates(&["needle"]),
        );
        assert_eq!(snippet, Snippet::Text("bbb NEEDLE ccc".to_string()));
    }

    #[test]
    fn falls_back_to_later_candidates() {
        let extractor = SnippetExtractor::new("content", 3);
        let snippet = extractor.extract(&fields("one two three"), &candidates(&["two three four", "", "Three"]));
        assert_eq!(snippet, Snippet::Text("wo three".to_string()));
    }

    #[test]
    fn reports_missing_literal_and_missing_field() {
        let extractor = SnippetExtractor::new("content", 10);
        assert_eq!(extractor.extract(&fields("running dogs"), &candidates(&["run dog"])), Snippet::NoLiteralMatch);
        assert_eq!(extractor.extract(&StoredFields::new(), &candidates(&["x"])), Snippet::MissingField);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let extractor = SnippetExtractor::new("content", 2);
        let snippet = extractor.extract(&fields("ééé CAFÉ ààà"), &candidates(&["café"]));
        assert_eq!(snippet, Snippet::Text("é CAFÉ à".to_string()));
    }
}
