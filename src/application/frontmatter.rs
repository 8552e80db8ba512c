//! Front-matter splitting.
//!
//! A document may open with a YAML block fenced by `---` lines. Everything
//! after the closing fence is the body. Documents without an opening fence
//! have no metadata.

use std::collections::BTreeMap;

use serde_yaml::Value;
use thiserror::Error;

const DELIMITER: &str = "---";
const BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("front matter opened with `---` but never closed")]
    Unterminated,
    #[error("front matter is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("front matter must be a mapping")]
    NotAMapping,
    #[error("front matter keys must be strings")]
    NonStringKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub metadata: BTreeMap<String, Value>,
    pub body: String,
}

pub fn parse(raw: &str) -> Result<FrontMatter, FrontMatterError> {
    let text = raw.strip_prefix(BOM).unwrap_or(raw);

    let Some(after_open) = strip_delimiter_line(text) else {
        return Ok(FrontMatter {
            metadata: BTreeMap::new(),
            body: text.to_string(),
        });
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if is_delimiter(line) {
            let block = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return Ok(FrontMatter {
                metadata: parse_block(block)?,
                body: body.to_string(),
            });
        }
        offset += line.len();
    }

    Err(FrontMatterError::Unterminated)
}

/// Text following the opening fence when `text` starts with one.
fn strip_delimiter_line(text: &str) -> Option<&str> {
    let line_end = text.find('\n').map(|idx| idx + 1).unwrap_or(text.len());
    is_delimiter(&text[..line_end]).then(|| &text[line_end..])
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn parse_block(block: &str) -> Result<BTreeMap<String, Value>, FrontMatterError> {
    if block.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let mapping = match serde_yaml::from_str::<Value>(block)? {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(BTreeMap::new()),
        _ => return Err(FrontMatterError::NotAMapping),
    };

    mapping
        .into_iter()
        .map(|(key, value)| match key {
            Value::String(key) => Ok((key, value)),
            _ => Err(FrontMatterError::NonStringKey),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_metadata_and_body() {
        let parsed = parse("---\ntitle: A\ndescription: d\n---\n# Heading\n\nText\n").expect("parse");
        assert_eq!(parsed.metadata["title"], Value::String("A".into()));
        assert_eq!(parsed.metadata["description"], Value::String("d".into()));
        assert_eq!(parsed.body, "# Heading\n\nText\n");
    }

    #[test]
    fn documents_without_fence_are_all_body() {
        let parsed = parse("# Just text\n---\nnot metadata\n").expect("parse");
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, "# Just text\n---\nnot metadata\n");
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let parsed = parse("\u{feff}---\r\ntitle: A\r\n---\r\nbody\r\n").expect("parse");
        assert_eq!(parsed.metadata["title"], Value::String("A".into()));
        assert_eq!(parsed.body, "body\r\n");
    }

    #[test]
    fn closing_fence_at_end_of_input() {
        let parsed = parse("---\ntitle: A\n---").expect("parse");
        assert_eq!(parsed.metadata.len(), 1);
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn empty_block_is_empty_mapping() {
        let parsed = parse("---\n---\nbody").expect("parse");
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, "body");
    }

    #[test]
    fn missing_closing_fence_fails() {
        assert!(matches!(
            parse("---\ntitle: A\nbody"),
            Err(FrontMatterError::Unterminated)
        ));
    }

    #[test]
    fn non_mapping_block_fails() {
        assert!(matches!(
            parse("---\n- a\n- b\n---\n"),
            Err(FrontMatterError::NotAMapping)
        ));
    }

    #[test]
    fn invalid_yaml_fails() {
        assert!(matches!(
            parse("---\ntitle: [unclosed\n---\n"),
            Err(FrontMatterError::Yaml(_))
        ));
    }

    #[test]
    fn non_string_keys_fail() {
        assert!(matches!(
            parse("---\n1: one\n---\n"),
            Err(FrontMatterError::NonStringKey)
        ));
    }

    #[test]
    fn indented_fence_does_not_close_the_block() {
        let parsed = parse("---\ntitle: |\n  ---\n  kept\n---\nbody").expect("parse");
        assert_eq!(parsed.metadata["title"], Value::String("---\nkept\n".into()));
        assert_eq!(parsed.body, "body");
    }
}
