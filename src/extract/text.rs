use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap();
    static ref STYLE_BLOCK: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&[#a-zA-Z0-9]+;").unwrap();
}

/// Counts the visible words of an HTML document
///
/// Script and style blocks are removed with their content, then every tag and
/// character entity is replaced by a space before splitting on whitespace.
/// Tags count as separators, so `<p>one</p><p>two</p>` is two words.
///
/// # Examples
///
/// ```
/// use crawl_lab::extract::count_words;
///
/// assert_eq!(count_words("<script>ignored</script><p>Hello  world</p>"), 2);
/// assert_eq!(count_words(""), 0);
/// ```
pub fn count_words(html: &str) -> usize {
    let text = SCRIPT_BLOCK.replace_all(html, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = ENTITY.replace_all(&text, " ");

    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_content_ignored() {
        assert_eq!(count_words("<script>ignored</script><p>Hello  world</p>"), 2);
    }

    #[test]
    fn test_style_and_attributes_ignored() {
        let html = r#"<style type="text/css">body { color: red; }</style>
            <div class="intro">One two three</div>"#;
        assert_eq!(count_words(html), 3);
    }

    #[test]
    fn test_uppercase_script_tags() {
        assert_eq!(count_words("<SCRIPT src=x.js>var a = 1;</SCRIPT>word"), 1);
    }

    #[test]
    fn test_entities_are_separators() {
        assert_eq!(count_words("<p>fish&amp;chips &nbsp; tea</p>"), 3);
    }

    #[test]
    fn test_adjacent_tags_separate_words() {
        assert_eq!(count_words("<p>one</p><p>two</p>"), 2);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(count_words("just some plain text"), 4);
    }

    #[test]
    fn test_unclosed_script_keeps_going() {
        // No closing tag: only the opening tag itself is stripped
        assert_eq!(count_words("<script>a b"), 2);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   \n\t "), 0);
        assert_eq!(count_words("<html><body></body></html>"), 0);
    }
}
