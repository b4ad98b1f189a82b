//! Doc comment assembly.

use crate::ts::DocComment;

/// Strip the common leading indentation from comment lines.
///
/// Blank lines do not count towards the common width and come out empty.
/// Trailing blank lines are dropped; `None` when nothing is left.
pub fn deindent(lines: &[String]) -> Option<Vec<String>> {
    let width = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()?;

    let mut out: Vec<String> = lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                l[width.min(l.len())..].trim_end().to_string()
            }
        })
        .collect();

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    (!out.is_empty()).then_some(out)
}

/// Builder for a [`DocComment`], collecting text and tags in output order.
#[derive(Debug, Default)]
pub struct DocBuilder {
    lines: Vec<String>,
    deprecated: Option<String>,
    source_type: Option<String>,
    canonical_type: Option<String>,
}

impl DocBuilder {
    pub fn new(raw: Option<Vec<String>>) -> Self {
        Self {
            lines: raw.as_deref().and_then(deindent).unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn deprecated(mut self, marker: Option<Option<&str>>) -> Self {
        if let Some(message) = marker {
            self.deprecated = Some(match message {
                Some(message) if !message.is_empty() => format!("@deprecated {message}"),
                _ => "@deprecated".to_string(),
            });
        }
        self
    }

    pub fn source_type(mut self, path: &str) -> Self {
        self.source_type = Some(format!("@SourceTypeName {path}"));
        self
    }

    pub fn canonical_type(mut self, path: &str) -> Self {
        self.canonical_type = Some(format!("@CanonicalTypeName {path}"));
        self
    }

    pub fn build(self) -> Option<DocComment> {
        let tags: Vec<String> = [self.deprecated, self.source_type, self.canonical_type]
            .into_iter()
            .flatten()
            .collect();
        let doc = DocComment {
            lines: self.lines,
            tags,
        };
        (!doc.is_empty()).then_some(doc)
    }
}
