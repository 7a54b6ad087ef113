#![forbid(unsafe_code)]

//! C14N character escaping, written straight into the output buffer.

/// Which escaping table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Element text: `& < > CR`.
    Text,
    /// Attribute and namespace values: `& < " TAB LF CR`. `>` stays.
    Attribute,
}

fn replacement(ch: char, ctx: Context) -> Option<&'static str> {
    match (ch, ctx) {
        ('&', _) => Some("&amp;"),
        ('<', _) => Some("&lt;"),
        ('\r', _) => Some("&#xD;"),
        ('>', Context::Text) => Some("&gt;"),
        ('"', Context::Attribute) => Some("&quot;"),
        ('\t', Context::Attribute) => Some("&#x9;"),
        ('\n', Context::Attribute) => Some("&#xA;"),
        _ => None,
    }
}

/// Append `s` to `out`, escaped for `ctx`.
pub fn push_escaped(out: &mut String, s: &str, ctx: Context) {
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        if let Some(rep) = replacement(ch, ctx) {
            out.push_str(&s[start..i]);
            out.push_str(rep);
            start = i + ch.len_utf8();
        }
    }
    out.push_str(&s[start..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(s: &str, ctx: Context) -> String {
        let mut out = String::new();
        push_escaped(&mut out, s, ctx);
        out
    }

    #[test]
    fn test_text_markup() {
        assert_eq!(escaped("plain", Context::Text), "plain");
        assert_eq!(escaped("a&b<c>d", Context::Text), "a&amp;b&lt;c&gt;d");
        assert_eq!(escaped("line\rend", Context::Text), "line&#xD;end");
        assert_eq!(escaped("say \"hi\"\t", Context::Text), "say \"hi\"\t");
    }

    #[test]
    fn test_attribute_whitespace() {
        assert_eq!(escaped("a&b\"c", Context::Attribute), "a&amp;b&quot;c");
        assert_eq!(escaped("a\tb\nc\rd", Context::Attribute), "a&#x9;b&#xA;c&#xD;d");
        assert_eq!(escaped("x>y", Context::Attribute), "x>y");
    }

    #[test]
    fn test_appends_multibyte() {
        let mut out = String::from("<");
        push_escaped(&mut out, "ä&ö", Context::Text);
        assert_eq!(out, "<ä&amp;ö");
    }
}
