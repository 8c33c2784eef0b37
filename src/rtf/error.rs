//! Error types for RTF parsing.

use thiserror::Error;

/// Result type for RTF operations.
pub type RtfResult<T> = Result<T, RtfError>;

/// RTF parsing errors.
///
/// Every variant aborts the parse. Content-level anomalies such as an
/// undefined font or an unknown destination are logged and recovered instead
/// of being reported here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtfError {
    /// Input does not start with `{\rtf`
    #[error("input is not an RTF document (missing {{\\rtf preamble)")]
    InvalidFormat,

    /// Input is not valid UTF-8 text
    #[error("RTF input is not valid UTF-8 at byte {offset}")]
    InvalidEncoding { offset: usize },

    /// Input ended while groups were still open
    #[error("unexpected end of input: {open_groups} group(s) still open")]
    UnexpectedEof { open_groups: usize },

    /// A closing brace without a matching open group
    #[error("unbalanced closing brace at byte {offset}")]
    UnbalancedGroup { offset: usize },

    /// `\'` not followed by two hexadecimal digits
    #[error("malformed \\'XX hex escape at byte {offset}")]
    BadHexCode { offset: usize },

    /// Backslash followed by neither a letter nor a control symbol
    #[error("backslash without control word at byte {offset}")]
    MissingControlWord { offset: usize },

    /// A control word that requires a parameter had none
    #[error("control word \\{word} requires a numeric parameter")]
    MissingParameter { word: String },

    /// A numeric parameter does not fit in 32 bits
    #[error("parameter of \\{word} is out of range")]
    ParameterOverflow { word: String },

    /// `\rtf` with a version other than 1
    #[error("unsupported RTF version {0}")]
    UnsupportedVersion(i32),

    /// Color index not present in the color table
    #[error("color {0} is not defined in the color table")]
    UndefinedColor(i32),

    /// Color table with more entries than a color index can address
    #[error("color table exceeds {} entries", u16::MAX as usize + 1)]
    TooManyColors,

    /// No decoder available for the resolved codepage
    #[error("no decoder available for codepage {0}")]
    UnsupportedCharset(i32),

    /// Zero or negative font size or scale
    #[error("invalid font size {0}")]
    BadFontSize(i32),

    /// Legacy bitmap word with a type parameter other than zero
    #[error("unsupported picture type \\{word}{value}")]
    BadPictureType { word: &'static str, value: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RtfError::MissingParameter {
                word: "fs".to_string()
            }
            .to_string(),
            "control word \\fs requires a numeric parameter"
        );
        assert_eq!(
            RtfError::UndefinedColor(5).to_string(),
            "color 5 is not defined in the color table"
        );
        assert_eq!(
            RtfError::TooManyColors.to_string(),
            "color table exceeds 65536 entries"
        );
        assert_eq!(
            RtfError::InvalidFormat.to_string(),
            "input is not an RTF document (missing {\\rtf preamble)"
        );
    }
}
