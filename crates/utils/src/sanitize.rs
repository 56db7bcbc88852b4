/// Clean user text before it becomes part of an `ILIKE` pattern.
///
/// Single quotes are doubled and the `%`/`_` wildcards are removed so a search
/// term can only ever match literally. Absent input yields an empty string.
pub fn sanitize_for_search(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    value
        .replace('\'', "''")
        .replace('%', "")
        .replace('_', "")
}

/// Sanitize an optional filter, dropping it entirely when nothing is left.
pub fn search_filter(value: Option<&str>) -> Option<String> {
    let cleaned = sanitize_for_search(value);
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_empty_for_missing_input() {
        assert_eq!(sanitize_for_search(None), "");
    }

    #[test]
    fn escapes_quotes_and_strips_wildcards() {
        assert_eq!(sanitize_for_search(Some("foo'bar")), "foo''bar");
        assert_eq!(sanitize_for_search(Some("a%b_c")), "abc");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(sanitize_for_search(Some("hello")), "hello");
    }

    #[test]
    fn filter_drops_terms_that_sanitize_to_nothing() {
        assert_eq!(search_filter(Some("%_")), None);
        assert_eq!(search_filter(None), None);
        assert_eq!(search_filter(Some("Lahore")), Some("Lahore".to_string()));
    }
}
