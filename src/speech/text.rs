//! Turning chat replies into text a voice can read

/// Clean a model reply for synthesis.
///
/// Strips markdown decoration, replaces links by their label, expands a few
/// symbols and collapses whitespace.
pub fn prepare_for_speech(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let line = strip_line_marker(line.trim());
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    let mut result = replace_links(&lines.join(". "));
    result = result.replace("**", "").replace("__", "").replace('`', "");

    for (symbol, spoken) in [
        ("&", " and "),
        ("%", " percent"),
        ("@", " at "),
        ("+", " plus "),
        ("=", " equals "),
    ] {
        result = result.replace(symbol, spoken);
    }

    result = result
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ".,!?;:'-\"()/".contains(*c))
        .collect();

    result = result.split_whitespace().collect::<Vec<_>>().join(" ");
    // Joining lines can double up sentence punctuation
    for doubled in ["?.", "!.", ":.", ".."] {
        result = result.replace(doubled, &doubled[..1]);
    }
    result.trim().to_string()
}

/// Drop heading hashes, list bullets and quote markers
fn strip_line_marker(line: &str) -> &str {
    let line = line.trim_start_matches('#').trim_start_matches('>').trim_start();
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    line
}

/// `[label](url)` becomes `label`; bare URLs become "link"
fn replace_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find("](").map(|i| open + i) else {
            break;
        };
        let Some(end) = rest[close..].find(')').map(|i| close + i) else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(&rest[open + 1..close]);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);

    out.split(' ')
        .map(|word| {
            if word.starts_with("http://") || word.starts_with("https://") {
                "link"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown() {
        assert_eq!(
            prepare_for_speech("## Summary\n- **Paris** is the `capital`\n- It has 2M people"),
            "Summary. Paris is the capital. It has 2M people"
        );
    }

    #[test]
    fn test_links_are_read_by_label() {
        assert_eq!(
            prepare_for_speech("See [Wikipedia](https://en.wikipedia.org/wiki/Paris) or https://example.com"),
            "See Wikipedia or link"
        );
    }

    #[test]
    fn test_symbols_are_spoken() {
        assert_eq!(prepare_for_speech("50% of A & B"), "50 percent of A and B");
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        assert_eq!(prepare_for_speech("Hello there, how are you?"), "Hello there, how are you?");
        assert_eq!(prepare_for_speech("   \n  "), "");
    }
}
