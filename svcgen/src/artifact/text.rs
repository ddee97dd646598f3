//! Mapping between `proc-macro2` span locations and byte offsets.

use std::ops::Range;

use proc_macro2::{Delimiter, LineColumn, Span, TokenStream, TokenTree};

/// Line start table for one version of an artifact's text.
pub(crate) struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    /// Byte offset of a 1-based line / 0-based char column.
    pub(crate) fn offset(&self, at: LineColumn) -> usize {
        let Some(&start) = self.line_starts.get(at.line.saturating_sub(1)) else {
            return self.text.len();
        };
        self.text[start..]
            .char_indices()
            .nth(at.column)
            .map_or(self.text.len(), |(i, _)| start + i)
    }

    pub(crate) fn start_of(&self, span: Span) -> usize {
        self.offset(span.start())
    }

    pub(crate) fn end_of(&self, span: Span) -> usize {
        self.offset(span.end())
    }

    /// Byte range covered by every token in `tokens`.
    pub(crate) fn range_of(&self, tokens: TokenStream) -> Option<Range<usize>> {
        let mut range: Option<Range<usize>> = None;
        self.extend_range(tokens, &mut range);
        range
    }

    fn extend_range(&self, tokens: TokenStream, range: &mut Option<Range<usize>>) {
        for tree in tokens {
            let (start, end) = match &tree {
                TokenTree::Group(group) if group.delimiter() == Delimiter::None => {
                    self.extend_range(group.stream(), range);
                    continue;
                }
                TokenTree::Group(group) => (
                    self.start_of(group.span_open()),
                    self.end_of(group.span_close()),
                ),
                other => (self.start_of(other.span()), self.end_of(other.span())),
            };
            *range = Some(match range.take() {
                Some(r) => r.start.min(start)..r.end.max(end),
                None => start..end,
            });
        }
    }

    /// Offset of the first byte of the line containing `offset`.
    pub(crate) fn line_start(&self, offset: usize) -> usize {
        self.text[..offset].rfind('\n').map_or(0, |i| i + 1)
    }

    /// Offset just past the newline ending the line containing `offset`.
    pub(crate) fn next_line_start(&self, offset: usize) -> Option<usize> {
        self.text[offset..].find('\n').map(|i| offset + i + 1)
    }

    /// Leading whitespace of the line holding `offset`, if only whitespace
    /// precedes `offset` on that line.
    pub(crate) fn indent_before(&self, offset: usize) -> Option<&'a str> {
        let prefix = &self.text[self.line_start(offset)..offset];
        prefix.chars().all(|c| c == ' ' || c == '\t').then_some(prefix)
    }
}

/// Indent every non-empty line of `block` with `indent`.
pub(crate) fn indent_lines(block: &str, indent: &str) -> String {
    block
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;

    #[test]
    fn test_offsets_follow_lines_and_chars() {
        let text = "fn a() {}\n// héllo\nfn b() {}\n";
        let index = LineIndex::new(text);
        assert_eq!(index.offset(LineColumn { line: 1, column: 0 }), 0);
        assert_eq!(index.offset(LineColumn { line: 3, column: 3 }), text.find("b()").unwrap());
        assert_eq!(index.offset(LineColumn { line: 2, column: 5 }), text.find("llo").unwrap());
    }

    #[test]
    fn test_range_of_item_covers_doc_comments() {
        let text = "struct S;\n\nimpl S {\n    /// docs\n    pub fn f(&self) -> u8 {\
                    \n        1\n    }\n}\n";
        let file = syn::parse_file(text).unwrap();
        let syn::Item::Impl(item) = &file.items[1] else {
            panic!("expected impl");
        };
        let index = LineIndex::new(text);
        let range = index.range_of(item.items[0].to_token_stream()).unwrap();
        assert_eq!(&text[range], "/// docs\n    pub fn f(&self) -> u8 {\n        1\n    }");
    }

    #[test]
    fn test_indent_before() {
        let text = "impl S {\n    fn f() {}\n}";
        let index = LineIndex::new(text);
        let at = text.find("fn f").unwrap();
        assert_eq!(index.indent_before(at), Some("    "));
        assert_eq!(index.indent_before(text.find('{').unwrap()), None);
    }

    #[test]
    fn test_indent_lines_keeps_blank_lines_empty() {
        assert_eq!(indent_lines("a\n\nb", "  "), "  a\n\n  b");
    }
}
