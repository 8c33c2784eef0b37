//! Destinations whose content is skipped: unknown `\*` destinations and
//! known ones the document has no use for, like `\info` or `\header`.
//!
//! Only the special characters are looked up, so `\u` still skips its
//! fallback text.

use super::document::SPECIAL_WORDS;
use super::{DestinationInfo, State, discard_text, no_cleanup, no_codepage};

pub(crate) static IGNORE_DESTINATION: DestinationInfo = DestinationInfo {
    words: &[&SPECIAL_WORDS],
    new_state: || State::Ignore,
    inherit_attributes: false,
    flush: discard_text,
    cleanup: no_cleanup,
    codepage: no_codepage,
};
