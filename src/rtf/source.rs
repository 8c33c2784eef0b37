//! The document interface the writer reads from.

use super::picture::Image;
use super::tags::TextProperties;
use std::hash::Hash;
use std::ops::Range;

/// Content of one run.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Image(Image),
}

/// A maximal stretch of content carrying the same set of tags.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRun<T> {
    /// Document offsets covered by the run
    pub range: Range<usize>,
    /// Tags active over the whole run, in tag table order
    pub tags: Vec<T>,
    /// Text and images in document order
    pub content: Vec<Inline>,
}

impl<T> SourceRun<T> {
    /// Concatenated text of the run, images omitted.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|inline| match inline {
                Inline::Text(text) => Some(text.as_str()),
                Inline::Image(_) => None,
            })
            .collect()
    }
}

/// Read access to a rich-text document for serialization.
///
/// Offsets count characters, with an image counting as one.
pub trait DocumentSource {
    /// Tag handle. Equal handles denote the same tag.
    type Tag: Clone + Eq + Hash;

    /// Every tag with its properties, lowest priority first.
    fn tags(&self) -> Vec<(Self::Tag, TextProperties)>;

    /// Paragraphs overlapping `range`, clipped to it. A paragraph includes
    /// the line breaks that end it.
    fn paragraphs(&self, range: Range<usize>) -> Vec<Range<usize>>;

    /// Runs of one paragraph in document order.
    fn runs(&self, paragraph: Range<usize>) -> Vec<SourceRun<Self::Tag>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_text_skips_images() {
        let run: SourceRun<u32> = SourceRun {
            range: 0..5,
            tags: vec![],
            content: vec![
                Inline::Text("ab".to_string()),
                Inline::Image(Image::filled(1, 1, [0, 0, 0, 255])),
                Inline::Text("cd".to_string()),
            ],
        };
        assert_eq!(run.text(), "abcd");
    }
}
