use std::sync::LazyLock;

use regex::Regex;

/// Upper bound on how far past the labeled element's opening tag its closing
/// tag may sit.
pub const LABEL_SCAN_WINDOW_BYTES: usize = 4096;

static INLINE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?P<tag>span|a|strong|b|em|i|small)\b[^>]*>").expect("inline tag pattern")
});

/// Finds the first element whose `class` attribute carries a label as one of
/// its tokens and reads a value out of that element's contents.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    pattern: Regex,
}

impl LabelMatcher {
    pub fn new(label: &str) -> Result<Self, regex::Error> {
        let token = regex::escape(label);
        let pattern = Regex::new(&format!(
            r#"(?i)<(?P<tag>[a-z][a-z0-9]*)\b[^>]*?\sclass\s*=\s*(?:"(?:[^"]*\s)?{token}(?:\s[^"]*)?"|'(?:[^']*\s)?{token}(?:\s[^']*)?')[^>]*>"#
        ))?;
        Ok(Self { pattern })
    }

    /// Returns the trimmed, lowercased text of the first non-empty inline
    /// element inside the labeled element.
    ///
    /// `None` if the label is missing, the element does not close within
    /// [`LABEL_SCAN_WINDOW_BYTES`], or it holds no inline text. Callers treat
    /// that as a hard failure.
    pub fn extract(&self, html: &str) -> Option<String> {
        let captures = self.pattern.captures(html)?;
        let open = captures.get(0)?;
        let tag = captures.name("tag")?.as_str();
        if open.as_str().ends_with("/>") {
            return None;
        }
        let limit = char_boundary_at_or_before(html, open.end() + LABEL_SCAN_WINDOW_BYTES);
        let close = matching_close(&html[..limit], tag, open.end())?;
        first_inline_text(&html[open.end()..close]).map(|text| text.to_lowercase())
    }
}

fn first_inline_text(contents: &str) -> Option<String> {
    for captures in INLINE_OPEN.captures_iter(contents) {
        let (Some(open), Some(tag)) = (captures.get(0), captures.name("tag")) else {
            continue;
        };
        if open.as_str().ends_with("/>") {
            continue;
        }
        let Some(content_end) = matching_close(contents, tag.as_str(), open.end()) else {
            continue;
        };
        let text = decode_html(&strip_tags(&contents[open.end()..content_end]));
        let text = collapse_whitespace(&text);
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

/// Offset of the `</tag>` that closes an element whose contents start at
/// `from`, counting nested elements of the same name.
fn matching_close(html: &str, tag: &str, from: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut depth = 0usize;
    let mut index = from;
    while index < html.len() {
        let at = index + html[index..].find('<')?;
        let closing = bytes.get(at + 1).copied() == Some(b'/');
        let name_start = at + 1 + usize::from(closing);
        if !is_tag_name_at(bytes, name_start, tag) {
            index = at + 1;
            continue;
        }
        let end = find_tag_end(html, at)?;
        if closing {
            if depth == 0 {
                return Some(at);
            }
            depth -= 1;
        } else if bytes[end - 1] != b'/' {
            depth += 1;
        }
        index = end + 1;
    }
    None
}

fn is_tag_name_at(bytes: &[u8], at: usize, tag: &str) -> bool {
    let end = at + tag.len();
    bytes
        .get(at..end)
        .is_some_and(|name| name.eq_ignore_ascii_case(tag.as_bytes()))
        && matches!(
            bytes.get(end).copied(),
            Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'>') | Some(b'/')
        )
}

fn find_tag_end(html: &str, start: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut quote = None::<u8>;
    for (index, &byte) in bytes.iter().enumerate().skip(start) {
        match quote {
            Some(active) if byte == active => quote = None,
            Some(_) => {}
            None if byte == b'"' || byte == b'\'' => quote = Some(byte),
            None if byte == b'>' => return Some(index),
            None => {}
        }
    }
    None
}

/// Pulls asset URLs of the form `<prefix><alnum>.png` out of a page body.
#[derive(Debug, Clone)]
pub struct AssetUrlMatcher {
    pattern: Regex,
}

impl AssetUrlMatcher {
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"{}[A-Za-z0-9]+\.png", regex::escape(prefix)))?;
        Ok(Self { pattern })
    }

    pub fn find(&self, html: &str) -> Option<String> {
        self.pattern
            .find(html)
            .map(|found| found.as_str().to_string())
    }
}

fn char_boundary_at_or_before(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn strip_tags(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => output.push(ch),
            _ => {}
        }
    }
    output
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_html(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
