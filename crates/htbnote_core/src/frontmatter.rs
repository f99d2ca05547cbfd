use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static BLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A\x{FEFF}?(?P<block>---\r?\n(?:(?P<body>.*?)\r?\n)??---)(?:\r?\n|\z)")
        .expect("frontmatter block pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NewlineStyle {
    Lf,
    CrLf,
}

impl NewlineStyle {
    /// The first line break in the document decides the style for every write.
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(index) if index > 0 && text.as_bytes()[index - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackedField {
    #[serde(rename = "_os")]
    Os,
    #[serde(rename = "_difficulty")]
    Difficulty,
    #[serde(rename = "_image")]
    Image,
}

impl TrackedField {
    pub fn key(self) -> &'static str {
        match self {
            Self::Os => "_os",
            Self::Difficulty => "_difficulty",
            Self::Image => "_image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Absent,
    Present(String),
}

impl FieldValue {
    /// Absent keys count as blank: they still need a value and get appended.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Present(value) => is_blank(value),
        }
    }

    pub fn has_content(&self) -> bool {
        !self.is_blank()
    }
}

/// Empty, whitespace-only, `""` and `''` are blank. Anything else is content.
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == "\"\"" || trimmed == "''"
}

/// A `key: value` line located inside a block body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldLine<'a> {
    /// Offset in the body where the value starts (just past the colon).
    pub value_start: usize,
    /// Offset in the body where the value ends (before the line break).
    pub value_end: usize,
    pub value: &'a str,
}

/// Scans body lines for `key`, optional spaces or tabs, then `:`. First match wins.
pub(crate) fn find_field_line<'a>(body: &'a str, key: &str) -> Option<FieldLine<'a>> {
    let mut offset = 0usize;
    for raw in body.split_inclusive('\n') {
        let line = raw.trim_end_matches('\n').trim_end_matches('\r');
        let indented = line.trim_start_matches([' ', '\t']);
        if let Some(after_key) = indented.strip_prefix(key)
            && let Some(value) = after_key.trim_start_matches([' ', '\t']).strip_prefix(':')
        {
            let value_start = offset + line.len() - value.len();
            return Some(FieldLine {
                value_start,
                value_end: offset + line.len(),
                value,
            });
        }
        offset += raw.len();
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    span: Range<usize>,
    body: Option<String>,
}

impl Frontmatter {
    /// Finds the block anchored at the start of `text` (after an optional BOM).
    /// Returns `None` when the document does not open with a `---` pair.
    pub fn locate(text: &str) -> Option<Self> {
        let captures = BLOCK_PATTERN.captures(text)?;
        let block = captures.name("block")?;
        Some(Self {
            span: block.range(),
            body: captures.name("body").map(|body| body.as_str().to_string()),
        })
    }

    /// Byte range of the block from the opening `---` through the closing `---`.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn field(&self, field: TrackedField) -> FieldValue {
        read_field(self.body(), field.key())
    }
}

/// First matching line wins; later duplicates are ignored.
pub fn read_field(body: &str, key: &str) -> FieldValue {
    find_field_line(body, key)
        .map(|line| FieldValue::Present(line.value.trim().to_string()))
        .unwrap_or(FieldValue::Absent)
}
