//! The document interface the parser writes into.
//!
//! Positions are never passed around as raw offsets: every insertion shifts
//! what follows it, so the parser works with marks that the document keeps
//! up to date. A mark's [`Gravity`] decides which side of an insertion made
//! exactly at the mark it ends up on.

use super::picture::Image;
pub use super::tags::{TagName, TextProperties};

/// Handle to a position mark owned by a [`DocumentSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub u32);

/// Which side of text inserted at a mark's position the mark stays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    /// The mark stays before inserted text
    Left,
    /// The mark moves past inserted text
    #[default]
    Right,
}

/// A position in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The end of the document
    End,
    /// The current position of a mark
    Mark(MarkId),
}

/// Mutable rich-text document that receives parsed content.
///
/// Tags are identified by [`TagName`]. [`ensure_tag`](Self::ensure_tag) is an
/// idempotent lookup-or-create, so the same name recurring anywhere in one or
/// several parses maps to one tag. Applying a tag that was never created is a
/// no-op.
pub trait DocumentSink {
    /// Create a mark at `at` and return its handle.
    fn create_mark(&mut self, at: Anchor, gravity: Gravity) -> MarkId;

    /// Move an existing mark.
    fn move_mark(&mut self, mark: MarkId, to: Anchor);

    fn delete_mark(&mut self, mark: MarkId);

    /// Insert plain text at `at`. Marks at the insertion point move past the
    /// text only if they have right gravity.
    fn insert_text(&mut self, at: Anchor, text: &str);

    /// Insert an image at `at`. It occupies one position.
    fn insert_image(&mut self, at: Anchor, image: &Image);

    /// Whether a tag with this name exists.
    fn has_tag(&self, name: &TagName) -> bool;

    /// Create the tag if it does not exist yet. An existing tag keeps its
    /// properties.
    fn ensure_tag(&mut self, name: &TagName, properties: TextProperties);

    /// Create the tag, or replace the properties of an existing one.
    ///
    /// Used for font table and stylesheet entries, which a later definition
    /// with the same index overrides.
    fn define_tag(&mut self, name: &TagName, properties: TextProperties);

    /// Apply a tag to the text between two positions.
    fn apply_tag(&mut self, name: &TagName, start: Anchor, end: Anchor);
}

impl<S: DocumentSink + ?Sized> DocumentSink for &mut S {
    fn create_mark(&mut self, at: Anchor, gravity: Gravity) -> MarkId {
        (**self).create_mark(at, gravity)
    }

    fn move_mark(&mut self, mark: MarkId, to: Anchor) {
        (**self).move_mark(mark, to)
    }

    fn delete_mark(&mut self, mark: MarkId) {
        (**self).delete_mark(mark)
    }

    fn insert_text(&mut self, at: Anchor, text: &str) {
        (**self).insert_text(at, text)
    }

    fn insert_image(&mut self, at: Anchor, image: &Image) {
        (**self).insert_image(at, image)
    }

    fn has_tag(&self, name: &TagName) -> bool {
        (**self).has_tag(name)
    }

    fn ensure_tag(&mut self, name: &TagName, properties: TextProperties) {
        (**self).ensure_tag(name, properties)
    }

    fn define_tag(&mut self, name: &TagName, properties: TextProperties) {
        (**self).define_tag(name, properties)
    }

    fn apply_tag(&mut self, name: &TagName, start: Anchor, end: Anchor) {
        (**self).apply_tag(name, start, end)
    }
}
