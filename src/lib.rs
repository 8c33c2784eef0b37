//! rtfcodec - A Rust library for reading and writing Rich Text Format
//!
//! This library converts between RTF byte streams and an abstract rich-text
//! document: attributed text, embedded images and named formatting tags.
//!
//! # Features
//!
//! - **RTF Parser**: Stateful destination machine covering fonts, colors,
//!   stylesheets, footnotes, pictures and Unicode escapes
//! - **RTF Writer**: Serializes any [`DocumentSource`](rtf::DocumentSource)
//!   with hoisted paragraph formatting and minimal grouping
//! - **Codepages**: Legacy `\'XX` escapes decoded through `encoding_rs`,
//!   including double-byte East Asian codepages, and `oem_cp` for the DOS
//!   codepages 437 and 850
//! - **Pictures**: PNG, JPEG and bitmap decoding through the `image` crate
//!   (feature `imgconv`, enabled by default)
//!
//! # Example - Round trip
//!
//! ```
//! use rtfcodec::rtf::{Parser, RichTextBuffer, serialize};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = RichTextBuffer::new();
//! Parser::new().parse(br"{\rtf1\ansi Hello {\i there}\par}", &mut doc)?;
//! assert_eq!(doc.text(), "Hello there");
//!
//! let rtf = serialize(&doc, 0..doc.len());
//! let mut copy = RichTextBuffer::new();
//! Parser::new().parse(rtf.as_bytes(), &mut copy)?;
//! assert_eq!(copy.text(), doc.text());
//! # Ok(())
//! # }
//! ```

/// Encoding and unit helpers shared by the parser and the writer
pub mod common;

/// RTF parser and writer
pub mod rtf;
