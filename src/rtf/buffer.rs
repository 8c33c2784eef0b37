//! In-memory rich-text document.
//!
//! [`RichTextBuffer`] stores characters and images with tag spans over
//! them and keeps a priority-ordered tag table. It implements both
//! [`DocumentSink`] and [`DocumentSource`], so a parse can be serialized
//! again without a text widget in between.

use super::picture::Image;
use super::sink::{Anchor, DocumentSink, Gravity, MarkId};
use super::source::{DocumentSource, Inline, SourceRun};
use super::tags::{TagName, TextProperties};
use std::collections::HashMap;
use std::ops::Range;

/// Placeholder character reported for images by [`RichTextBuffer::text`].
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Char(char),
    Image(Image),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    tag: usize,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    offset: usize,
    gravity: Gravity,
}

/// Attributed text with embedded images.
#[derive(Debug, Clone, Default)]
pub struct RichTextBuffer {
    items: Vec<Item>,
    table: Vec<(TagName, TextProperties)>,
    index: HashMap<TagName, usize>,
    spans: Vec<Span>,
    marks: HashMap<MarkId, Mark>,
    next_mark: u32,
}

impl RichTextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positions; an image counts as one.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Document text, with [`OBJECT_REPLACEMENT`] standing in for images.
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|item| match item {
                Item::Char(c) => *c,
                Item::Image(_) => OBJECT_REPLACEMENT,
            })
            .collect()
    }

    /// Embedded images in document order.
    pub fn images(&self) -> impl Iterator<Item = &Image> {
        self.items.iter().filter_map(|item| match item {
            Item::Image(image) => Some(image),
            Item::Char(_) => None,
        })
    }

    /// Registered properties of a tag.
    pub fn tag_properties(&self, name: &TagName) -> Option<&TextProperties> {
        self.index.get(name).map(|&i| &self.table[i].1)
    }

    /// Current offset of a mark.
    pub fn mark_offset(&self, mark: MarkId) -> Option<usize> {
        self.marks.get(&mark).map(|m| m.offset)
    }

    /// Names of the tags covering the character at `offset`, in priority
    /// order.
    pub fn tags_at(&self, offset: usize) -> Vec<&TagName> {
        self.covering(offset, offset + 1)
            .into_iter()
            .map(|i| &self.table[i].0)
            .collect()
    }

    /// Append text carrying the given tags. Tags must have been registered.
    pub fn append(&mut self, text: &str, tags: &[TagName]) {
        let start = self.len();
        self.insert_items(start, text.chars().map(Item::Char).collect());
        for tag in tags {
            self.apply_range(tag, start, self.len());
        }
    }

    /// Append an image carrying the given tags.
    pub fn append_image(&mut self, image: Image, tags: &[TagName]) {
        let start = self.len();
        self.insert_items(start, vec![Item::Image(image)]);
        for tag in tags {
            self.apply_range(tag, start, self.len());
        }
    }

    /// Text split into runs of uniform formatting, each with the merged
    /// properties of its tags.
    pub fn styled_runs(&self) -> Vec<(String, TextProperties)> {
        let mut runs: Vec<(String, TextProperties)> = Vec::new();
        for segment in self.segments(0..self.len()) {
            let mut props = TextProperties::default();
            for &tag in &segment.1 {
                props.merge(&self.table[tag].1);
            }
            let text: String = self.items[segment.0.clone()]
                .iter()
                .map(|item| match item {
                    Item::Char(c) => *c,
                    Item::Image(_) => OBJECT_REPLACEMENT,
                })
                .collect();
            match runs.last_mut() {
                Some(last) if last.1 == props => last.0.push_str(&text),
                _ => runs.push((text, props)),
            }
        }
        runs
    }

    fn resolve(&self, at: Anchor) -> usize {
        match at {
            Anchor::End => self.len(),
            Anchor::Mark(mark) => match self.marks.get(&mark) {
                Some(m) => m.offset.min(self.len()),
                None => {
                    tracing::warn!(mark = mark.0, "unknown mark, using document end");
                    self.len()
                },
            },
        }
    }

    fn insert_items(&mut self, offset: usize, items: Vec<Item>) {
        let count = items.len();
        if count == 0 {
            return;
        }
        self.items.splice(offset..offset, items);

        for span in &mut self.spans {
            if offset <= span.start {
                span.start += count;
                span.end += count;
            } else if offset < span.end {
                span.end += count;
            }
        }
        for mark in self.marks.values_mut() {
            if offset < mark.offset || (offset == mark.offset && mark.gravity == Gravity::Right) {
                mark.offset += count;
            }
        }
    }

    fn apply_range(&mut self, name: &TagName, start: usize, end: usize) {
        let Some(&tag) = self.index.get(name) else {
            tracing::warn!(tag = %name, "applying unregistered tag");
            return;
        };
        if start >= end {
            return;
        }

        // Coalesce with overlapping or touching spans of the same tag
        let mut merged = Span { tag, start, end };
        self.spans.retain(|span| {
            if span.tag == tag && span.start <= merged.end && merged.start <= span.end {
                merged.start = merged.start.min(span.start);
                merged.end = merged.end.max(span.end);
                false
            } else {
                true
            }
        });
        self.spans.push(merged);
    }

    /// Tag table indices covering all of `start..end`, in priority order.
    fn covering(&self, start: usize, end: usize) -> Vec<usize> {
        let mut tags: Vec<usize> = self
            .spans
            .iter()
            .filter(|span| span.start <= start && end <= span.end)
            .map(|span| span.tag)
            .collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    /// Split `range` at every span boundary and merge neighbours that carry
    /// the same tags.
    fn segments(&self, range: Range<usize>) -> Vec<(Range<usize>, Vec<usize>)> {
        if range.is_empty() {
            return Vec::new();
        }
        let mut cuts = vec![range.start, range.end];
        for span in &self.spans {
            for cut in [span.start, span.end] {
                if range.start < cut && cut < range.end {
                    cuts.push(cut);
                }
            }
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut segments: Vec<(Range<usize>, Vec<usize>)> = Vec::new();
        for pair in cuts.windows(2) {
            let tags = self.covering(pair[0], pair[1]);
            match segments.last_mut() {
                Some(last) if last.1 == tags => last.0.end = pair[1],
                _ => segments.push((pair[0]..pair[1], tags)),
            }
        }
        segments
    }
}

impl DocumentSink for RichTextBuffer {
    fn create_mark(&mut self, at: Anchor, gravity: Gravity) -> MarkId {
        let offset = self.resolve(at);
        let id = MarkId(self.next_mark);
        self.next_mark += 1;
        self.marks.insert(id, Mark { offset, gravity });
        id
    }

    fn move_mark(&mut self, mark: MarkId, to: Anchor) {
        let offset = self.resolve(to);
        if let Some(m) = self.marks.get_mut(&mark) {
            m.offset = offset;
        }
    }

    fn delete_mark(&mut self, mark: MarkId) {
        self.marks.remove(&mark);
    }

    fn insert_text(&mut self, at: Anchor, text: &str) {
        let offset = self.resolve(at);
        self.insert_items(offset, text.chars().map(Item::Char).collect());
    }

    fn insert_image(&mut self, at: Anchor, image: &Image) {
        let offset = self.resolve(at);
        self.insert_items(offset, vec![Item::Image(image.clone())]);
    }

    fn has_tag(&self, name: &TagName) -> bool {
        self.index.contains_key(name)
    }

    fn ensure_tag(&mut self, name: &TagName, properties: TextProperties) {
        if !self.index.contains_key(name) {
            self.index.insert(name.clone(), self.table.len());
            self.table.push((name.clone(), properties));
        }
    }

    fn define_tag(&mut self, name: &TagName, properties: TextProperties) {
        match self.index.get(name) {
            Some(&i) => self.table[i].1 = properties,
            None => {
                self.index.insert(name.clone(), self.table.len());
                self.table.push((name.clone(), properties));
            },
        }
    }

    fn apply_tag(&mut self, name: &TagName, start: Anchor, end: Anchor) {
        let start = self.resolve(start);
        let end = self.resolve(end);
        self.apply_range(name, start, end);
    }
}

impl DocumentSource for RichTextBuffer {
    type Tag = TagName;

    fn tags(&self) -> Vec<(TagName, TextProperties)> {
        self.table.clone()
    }

    fn paragraphs(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let end = range.end.min(self.len());
        let mut paragraphs = Vec::new();
        let mut pos = range.start;
        while pos < end {
            let mut next = pos;
            while next < end && self.items[next] != Item::Char('\n') {
                next += 1;
            }
            while next < end && self.items[next] == Item::Char('\n') {
                next += 1;
            }
            paragraphs.push(pos..next);
            pos = next;
        }
        paragraphs
    }

    fn runs(&self, paragraph: Range<usize>) -> Vec<SourceRun<TagName>> {
        let paragraph = paragraph.start..paragraph.end.min(self.len());
        self.segments(paragraph)
            .into_iter()
            .map(|(range, tags)| {
                let mut content = Vec::new();
                let mut text = String::new();
                for item in &self.items[range.clone()] {
                    match item {
                        Item::Char(c) => text.push(*c),
                        Item::Image(image) => {
                            if !text.is_empty() {
                                content.push(Inline::Text(std::mem::take(&mut text)));
                            }
                            content.push(Inline::Image(image.clone()));
                        },
                    }
                }
                if !text.is_empty() {
                    content.push(Inline::Text(text));
                }
                SourceRun {
                    range,
                    tags: tags.into_iter().map(|i| self.table[i].0.clone()).collect(),
                    content,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> TextProperties {
        TextProperties {
            bold: Some(true),
            ..TextProperties::default()
        }
    }

    #[test]
    fn test_insert_and_text() {
        let mut buffer = RichTextBuffer::new();
        buffer.insert_text(Anchor::End, "Hello");
        buffer.insert_image(Anchor::End, &Image::filled(1, 1, [0, 0, 0, 255]));
        buffer.insert_text(Anchor::End, "!");
        assert_eq!(buffer.len(), 7);
        assert_eq!(buffer.text(), "Hello\u{FFFC}!");
        assert_eq!(buffer.images().count(), 1);
    }

    #[test]
    fn test_mark_gravity() {
        let mut buffer = RichTextBuffer::new();
        buffer.insert_text(Anchor::End, "ab");
        let left = buffer.create_mark(Anchor::End, Gravity::Left);
        let right = buffer.create_mark(Anchor::End, Gravity::Right);
        buffer.insert_text(Anchor::Mark(right), "cd");
        assert_eq!(buffer.mark_offset(left), Some(2));
        assert_eq!(buffer.mark_offset(right), Some(4));

        // Inserting before both moves both
        let start = buffer.create_mark(Anchor::End, Gravity::Left);
        buffer.move_mark(start, Anchor::Mark(left));
        buffer.insert_text(Anchor::Mark(left), "X");
        assert_eq!(buffer.text(), "abXcd");
        assert_eq!(buffer.mark_offset(left), Some(2));
        assert_eq!(buffer.mark_offset(right), Some(5));

        buffer.delete_mark(start);
        assert_eq!(buffer.mark_offset(start), None);
    }

    #[test]
    fn test_ensure_tag_is_idempotent() {
        let mut buffer = RichTextBuffer::new();
        buffer.ensure_tag(&TagName::Bold, bold());
        buffer.ensure_tag(&TagName::Bold, TextProperties::default());
        assert_eq!(buffer.tags().len(), 1);
        assert_eq!(buffer.tag_properties(&TagName::Bold), Some(&bold()));

        buffer.define_tag(&TagName::Bold, TextProperties::default());
        assert_eq!(buffer.tags().len(), 1);
        assert_eq!(buffer.tag_properties(&TagName::Bold), Some(&TextProperties::default()));
    }

    #[test]
    fn test_span_shifts_and_extends() {
        let mut buffer = RichTextBuffer::new();
        buffer.ensure_tag(&TagName::Bold, bold());
        buffer.append("abcd", &[]);
        buffer.apply_range(&TagName::Bold, 1, 3);

        // Insertion at the span start shifts it
        buffer.insert_items(1, vec![Item::Char('x')]);
        assert!(buffer.tags_at(1).is_empty());
        assert_eq!(buffer.tags_at(2), vec![&TagName::Bold]);

        // Insertion inside the span extends it
        buffer.insert_items(3, vec![Item::Char('y')]);
        assert_eq!(buffer.text(), "axbycd");
        assert_eq!(buffer.tags_at(4), vec![&TagName::Bold]);
        assert!(buffer.tags_at(5).is_empty());
    }

    #[test]
    fn test_paragraphs_include_trailing_breaks() {
        let mut buffer = RichTextBuffer::new();
        buffer.append("one\ntwo\n\nthree", &[]);
        assert_eq!(buffer.paragraphs(0..buffer.len()), vec![0..4, 4..9, 9..14]);
        assert_eq!(buffer.paragraphs(5..7), vec![5..7]);
        assert!(buffer.paragraphs(0..0).is_empty());
        assert!(RichTextBuffer::new().paragraphs(0..10).is_empty());
    }

    #[test]
    fn test_runs_split_on_tag_changes() {
        let mut buffer = RichTextBuffer::new();
        buffer.ensure_tag(&TagName::Bold, bold());
        buffer.ensure_tag(
            &TagName::Italic,
            TextProperties {
                italic: Some(true),
                ..TextProperties::default()
            },
        );
        buffer.append("plain ", &[]);
        buffer.append("bold ", &[TagName::Bold]);
        buffer.append("both", &[TagName::Italic, TagName::Bold]);

        let runs = buffer.runs(0..buffer.len());
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].text(), "plain ");
        assert!(runs[0].tags.is_empty());
        assert_eq!(runs[1].tags, vec![TagName::Bold]);
        assert_eq!(runs[2].tags, vec![TagName::Bold, TagName::Italic]);
        assert_eq!(runs[2].range, 11..15);
    }

    #[test]
    fn test_adjacent_spans_coalesce() {
        let mut buffer = RichTextBuffer::new();
        buffer.ensure_tag(&TagName::Bold, bold());
        buffer.append("ab", &[TagName::Bold]);
        buffer.append("cd", &[TagName::Bold]);
        assert_eq!(buffer.spans.len(), 1);
        assert_eq!(buffer.runs(0..4).len(), 1);
    }

    #[test]
    fn test_styled_runs_merge_properties() {
        let mut buffer = RichTextBuffer::new();
        buffer.ensure_tag(
            &TagName::FontSize(10000),
            TextProperties {
                size: Some(10.0),
                ..TextProperties::default()
            },
        );
        buffer.ensure_tag(
            &TagName::FontSize(14000),
            TextProperties {
                size: Some(14.0),
                ..TextProperties::default()
            },
        );
        buffer.append("x", &[TagName::FontSize(10000), TagName::FontSize(14000)]);
        let runs = buffer.styled_runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].1.size, Some(14.0));
    }

    #[test]
    fn test_unregistered_tag_is_ignored() {
        let mut buffer = RichTextBuffer::new();
        buffer.append("x", &[TagName::Bold]);
        assert!(buffer.tags_at(0).is_empty());
        buffer.apply_tag(&TagName::Italic, Anchor::End, Anchor::End);
        assert!(buffer.tags().is_empty());
    }
}
