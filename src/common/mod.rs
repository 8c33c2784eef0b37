//! Helpers shared by the RTF parser and writer.

pub mod encoding;
pub mod unit;

pub use encoding::{
    CharacterSet, OemCodepage, TextEncoding, charset_to_codepage, codepage_to_encoding,
};
