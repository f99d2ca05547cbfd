use std::ops::Range;

use crate::frontmatter::{NewlineStyle, find_field_line};

pub const BLOCK_DELIMITER: &str = "---";

/// Sets `key` to `value` inside a block body.
///
/// The first `key:` line has everything after its colon replaced; indentation
/// and the key itself are kept. When no such line exists, `key: value` is
/// appended after dropping trailing blank lines.
pub fn upsert_field(body: &str, key: &str, value: &str, newline: NewlineStyle) -> String {
    if let Some(line) = find_field_line(body, key) {
        let mut output = String::with_capacity(body.len() + value.len() + 1);
        output.push_str(&body[..line.value_start]);
        output.push(' ');
        output.push_str(value);
        output.push_str(&body[line.value_end..]);
        return output;
    }

    let kept = trim_trailing_blank_lines(body);
    if kept.is_empty() {
        return format!("{key}: {value}");
    }
    format!("{kept}{}{key}: {value}", newline.as_str())
}

fn trim_trailing_blank_lines(body: &str) -> &str {
    let mut kept = body;
    loop {
        let last_start = kept.rfind('\n').map(|index| index + 1).unwrap_or(0);
        if !kept[last_start..].trim().is_empty() {
            return kept;
        }
        if last_start == 0 {
            return "";
        }
        kept = kept[..last_start - 1].trim_end_matches('\r');
    }
}

pub fn render_block(body: &str, newline: NewlineStyle) -> String {
    let newline = newline.as_str();
    format!("{BLOCK_DELIMITER}{newline}{body}{newline}{BLOCK_DELIMITER}")
}

/// Replaces exactly the byte range the block was found at, leaving any identical
/// text elsewhere in the document alone.
pub fn splice(document: &str, span: Range<usize>, block: &str) -> String {
    let mut output = String::with_capacity(document.len() + block.len());
    output.push_str(&document[..span.start]);
    output.push_str(block);
    output.push_str(&document[span.end..]);
    output
}

/// Quoted wiki-link to the downloaded asset, e.g. `"[[htb_active.png]]"`.
pub fn image_link(asset_filename: &str) -> String {
    format!("\"[[{asset_filename}]]\"")
}
