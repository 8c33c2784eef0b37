//! Character-set resolution shared by the RTF parser and writer.
//!
//! RTF names text encodings in two different ways: document-level words
//! (`\ansi`, `\mac`, `\pc`, `\pca`, `\ansicpg`) carry Windows codepage numbers,
//! while font table entries carry a `\fcharset` number that has to be mapped
//! to a codepage first. Both end up at a [`TextEncoding`]: an `encoding_rs`
//! [`Encoding`] for most codepages, or an `oem_cp` table for the DOS codepages
//! `encoding_rs` does not cover.

use encoding_rs::{DecoderResult, Encoding};
use oem_cp::code_table::{DECODING_TABLE_CP437, DECODING_TABLE_CP850};
use oem_cp::decode_string_complete_table;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Longest byte sequence any supported codepage uses for one character.
const MAX_SEQUENCE_LEN: usize = 4;

/// Document-level character set declared in the RTF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CharacterSet {
    /// ANSI (`\ansi`, Windows-1252)
    #[default]
    Ansi,
    /// Apple Macintosh (`\mac`, Mac Roman)
    Mac,
    /// IBM PC (`\pc`, codepage 437)
    Pc,
    /// IBM PC multilingual (`\pca`, codepage 850)
    Pca,
}

impl CharacterSet {
    /// Codepage used when the document gives no `\ansicpg`.
    #[inline]
    pub const fn codepage(self) -> u16 {
        match self {
            CharacterSet::Ansi => 1252,
            CharacterSet::Mac => 10000,
            CharacterSet::Pc => 437,
            CharacterSet::Pca => 850,
        }
    }
}

/// Map a Windows codepage identifier to an `encoding_rs` encoding.
///
/// Returns `None` when `encoding_rs` has no decoder for the codepage. The DOS
/// codepages 437 and 850 are among those; [`TextEncoding::for_codepage`]
/// covers them.
///
/// # Examples
/// ```
/// use rtfcodec::common::encoding::codepage_to_encoding;
///
/// let encoding = codepage_to_encoding(936).unwrap();
/// assert_eq!(encoding.name(), "GBK");
/// ```
#[inline]
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        // Windows codepages
        874 => Some(encoding_rs::WINDOWS_874),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1252 => Some(encoding_rs::WINDOWS_1252),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),

        // East Asian multi-byte codepages
        932 | 943 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        20932 => Some(encoding_rs::EUC_JP),
        20936 => Some(encoding_rs::GBK),
        54936 => Some(encoding_rs::GB18030),

        // ISO 8859 family
        28591 => Some(encoding_rs::WINDOWS_1252),
        28592 => Some(encoding_rs::ISO_8859_2),
        28593 => Some(encoding_rs::ISO_8859_3),
        28594 => Some(encoding_rs::ISO_8859_4),
        28595 => Some(encoding_rs::ISO_8859_5),
        28596 => Some(encoding_rs::ISO_8859_6),
        28597 => Some(encoding_rs::ISO_8859_7),
        28598 => Some(encoding_rs::ISO_8859_8),
        28603 => Some(encoding_rs::ISO_8859_13),
        28605 => Some(encoding_rs::ISO_8859_15),

        // Cyrillic
        866 => Some(encoding_rs::IBM866),
        20866 => Some(encoding_rs::KOI8_R),
        21866 => Some(encoding_rs::KOI8_U),

        // Macintosh
        10000 => Some(encoding_rs::MACINTOSH),
        10001 => Some(encoding_rs::SHIFT_JIS), // Mac Japanese
        10002 => Some(encoding_rs::BIG5),      // Mac Traditional Chinese
        10003 => Some(encoding_rs::EUC_KR),    // Mac Korean
        10007 => Some(encoding_rs::X_MAC_CYRILLIC),
        10008 => Some(encoding_rs::GBK), // Mac Simplified Chinese

        // Unicode
        1200 => Some(encoding_rs::UTF_16LE),
        1201 => Some(encoding_rs::UTF_16BE),
        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}

/// DOS codepages decoded from `oem_cp` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OemCodepage {
    /// IBM PC (codepage 437)
    Cp437,
    /// Multilingual Latin 1 (codepage 850)
    Cp850,
}

impl OemCodepage {
    #[inline]
    pub const fn codepage(self) -> u16 {
        match self {
            OemCodepage::Cp437 => 437,
            OemCodepage::Cp850 => 850,
        }
    }

    /// Decode one byte. Both codepages assign a character to every byte.
    pub fn decode(self, byte: u8) -> char {
        if byte.is_ascii() {
            return byte as char;
        }
        let table = match self {
            OemCodepage::Cp437 => &DECODING_TABLE_CP437,
            OemCodepage::Cp850 => &DECODING_TABLE_CP850,
        };
        decode_string_complete_table(&[byte], table)
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

/// Decoder for the bytes of one codepage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextEncoding {
    /// Single- and multi-byte codepages known to `encoding_rs`
    Standard(&'static Encoding),
    /// Single-byte DOS codepages
    Oem(OemCodepage),
}

impl TextEncoding {
    /// Decoder for a Windows codepage identifier, or `None` if there is none.
    ///
    /// # Examples
    /// ```
    /// use rtfcodec::common::encoding::TextEncoding;
    ///
    /// assert_eq!(TextEncoding::for_codepage(850).unwrap().name(), "IBM850");
    /// assert_eq!(TextEncoding::for_codepage(1251).unwrap().name(), "windows-1251");
    /// assert!(TextEncoding::for_codepage(1361).is_none());
    /// ```
    pub fn for_codepage(codepage: u16) -> Option<Self> {
        match codepage {
            437 => Some(TextEncoding::Oem(OemCodepage::Cp437)),
            850 => Some(TextEncoding::Oem(OemCodepage::Cp850)),
            _ => codepage_to_encoding(codepage).map(TextEncoding::Standard),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Standard(encoding) => encoding.name(),
            TextEncoding::Oem(OemCodepage::Cp437) => "IBM437",
            TextEncoding::Oem(OemCodepage::Cp850) => "IBM850",
        }
    }
}

impl From<&'static Encoding> for TextEncoding {
    #[inline]
    fn from(encoding: &'static Encoding) -> Self {
        TextEncoding::Standard(encoding)
    }
}

/// Map an RTF `\fcharset` number to a Windows codepage.
///
/// Returns `None` for the symbol charsets (which have no codepage) and for
/// charset numbers this table does not know. Callers treat `None` as "no
/// override" and fall back to the document codepage.
#[inline]
pub fn charset_to_codepage(charset: i32) -> Option<u16> {
    let codepage = match charset {
        0 => 1252,   // ANSI
        77 => 10000, // Mac Roman
        78 => 10001, // Mac Shift JIS
        79 => 10003, // Mac Hangul
        80 => 10008, // Mac GB2312
        81 => 10002, // Mac Big5
        83 => 10005, // Mac Hebrew
        84 => 10004, // Mac Arabic
        85 => 10006, // Mac Greek
        86 => 10081, // Mac Turkish
        87 => 10021, // Mac Thai
        88 => 10029, // Mac East Europe
        89 => 10007, // Mac Russian
        128 => 943,  // Shift JIS
        129 => 949,  // Hangul
        130 => 1361, // Johab
        134 => 936,  // GB2312
        136 => 950,  // Big5
        161 => 1253, // Greek
        162 => 1254, // Turkish
        163 => 1258, // Vietnamese
        177 => 1255, // Hebrew
        178 => 1256, // Arabic
        181 => 862,  // Hebrew user
        186 => 1257, // Baltic
        204 => 1251, // Russian
        222 => 874,  // Thai
        238 => 1250, // Eastern European
        254 => 437,  // PC 437
        255 => 850,  // OEM
        _ => return None,
    };
    Some(codepage)
}

/// Incremental byte-to-text converter for `\'XX` escapes.
///
/// Multi-byte codepages spread one character over several escapes
/// (`\'82\'a0` in Shift JIS). Bytes are held here until they form a complete
/// character; a literal character arriving while a sequence is open is fed in
/// as a byte, since lead bytes may be followed by plain ASCII trail bytes.
#[derive(Debug, Default, Clone)]
pub struct ByteDecoder {
    pending: SmallVec<[u8; MAX_SEQUENCE_LEN]>,
}

impl ByteDecoder {
    /// Create an empty decoder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an incomplete multi-byte sequence is waiting for more bytes.
    #[inline]
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop any incomplete sequence.
    #[inline]
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Feed one byte, appending any completed characters to `out`.
    ///
    /// Unconvertible sequences are dropped with a warning.
    pub fn push(&mut self, byte: u8, encoding: TextEncoding, out: &mut String) {
        let encoding = match encoding {
            TextEncoding::Standard(encoding) => encoding,
            TextEncoding::Oem(codepage) => {
                if self.is_pending() {
                    tracing::warn!(
                        "Dropping incomplete sequence {:02x?} before {} text",
                        self.pending.as_slice(),
                        codepage.codepage()
                    );
                    self.pending.clear();
                }
                out.push(codepage.decode(byte));
                return;
            },
        };
        self.pending.push(byte);

        let mut decoder = encoding.new_decoder_without_bom_handling();
        let capacity = decoder
            .max_utf8_buffer_length(self.pending.len())
            .unwrap_or(MAX_SEQUENCE_LEN * 4);
        let mut decoded = String::with_capacity(capacity);
        let (result, _) =
            decoder.decode_to_string_without_replacement(&self.pending, &mut decoded, false);

        match result {
            DecoderResult::InputEmpty => {
                if decoded.is_empty() {
                    if self.pending.len() < MAX_SEQUENCE_LEN {
                        return;
                    }
                    tracing::warn!(
                        "Dropping incomplete {} sequence {:02x?}",
                        encoding.name(),
                        self.pending.as_slice()
                    );
                }
                out.push_str(&decoded);
            },
            DecoderResult::Malformed(_, _) => {
                tracing::warn!(
                    "Bytes {:02x?} are not valid {}",
                    self.pending.as_slice(),
                    encoding.name()
                );
                out.push_str(&decoded);
            },
            DecoderResult::OutputFull => {
                tracing::warn!("Decoder output overflow for {}", encoding.name());
            },
        }
        self.pending.clear();
    }
}

/// Decode a chunk of hexadecimal text, skipping ASCII whitespace.
///
/// `carry` holds a dangling high nibble between calls so payloads split at
/// arbitrary points decode the same as a single chunk. On a non-hex byte the
/// offending byte is returned and `out` keeps whatever was decoded before it.
pub fn decode_hex_chunk(hex: &[u8], carry: &mut Option<u8>, out: &mut Vec<u8>) -> Result<(), u8> {
    out.reserve(hex.len() / 2);
    for &byte in hex {
        if byte.is_ascii_whitespace() {
            continue;
        }
        let nibble = hex_nibble(byte).ok_or(byte)?;
        match carry.take() {
            Some(high) => out.push((high << 4) | nibble),
            None => *carry = Some(nibble),
        }
    }
    Ok(())
}

/// Value of one hexadecimal digit.
#[inline]
pub fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
