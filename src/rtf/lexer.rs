//! RTF lexer/tokenizer.
//!
//! The lexer is a cursor over the document text. It splits the input into
//! group delimiters, control words, `\'XX` byte escapes and literal
//! characters. Control word parameters are read on demand, because whether a
//! number after a word is its parameter depends on how the active
//! destination declares that word.

use super::error::{RtfError, RtfResult};
use crate::common::encoding::hex_nibble;

/// A control word or control symbol, without its backslash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlWord<'a> {
    /// Letters of the word, or the single character of a control symbol
    pub name: &'a str,
    /// Preceded by `\*`
    pub ignorable: bool,
}

/// Token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Opening brace
    OpenGroup,
    /// Closing brace
    CloseGroup,
    /// Control word or symbol; its parameter has not been read yet
    Control(ControlWord<'a>),
    /// Byte from a `\'XX` escape
    HexByte(u8),
    /// Literal character
    Char(char),
}

/// Cursor over RTF text.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /// Source input
    input: &'a str,
    /// Current position in bytes
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peek at the current character.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    #[inline]
    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + ahead).copied()
    }

    /// Advance position by one character.
    #[inline]
    fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    /// Get the next token, skipping bare line breaks. Returns `None` at the
    /// end of the input.
    pub fn next_token(&mut self) -> RtfResult<Option<Token<'a>>> {
        loop {
            let Some(ch) = self.peek() else {
                return Ok(None);
            };
            let token = match ch {
                '{' => {
                    self.advance();
                    Token::OpenGroup
                },
                '}' => {
                    self.advance();
                    Token::CloseGroup
                },
                '\\' if self.peek_byte(1) == Some(b'\'') => Token::HexByte(self.read_hex_byte()?),
                '\\' => Token::Control(self.parse_control_word()?),
                '\r' | '\n' => {
                    self.advance();
                    continue;
                },
                _ => {
                    self.advance();
                    Token::Char(ch)
                },
            };
            return Ok(Some(token));
        }
    }

    /// Parse a control word or control symbol at a backslash.
    ///
    /// `\*` prefixes are folded into [`ControlWord::ignorable`].
    pub fn parse_control_word(&mut self) -> RtfResult<ControlWord<'a>> {
        let mut ignorable = false;
        loop {
            let start = self.pos;
            if self.peek() != Some('\\') {
                return Err(RtfError::MissingControlWord { offset: start });
            }
            self.advance(); // Skip '\'

            match self.peek() {
                Some('*') => {
                    self.advance();
                    ignorable = true;
                    while self.peek().is_some_and(char::is_whitespace) {
                        self.advance();
                    }
                },
                Some(ch) if ch.is_ascii_alphabetic() => {
                    let begin = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                        self.advance();
                    }
                    return Ok(ControlWord {
                        name: &self.input[begin..self.pos],
                        ignorable,
                    });
                },
                Some(ch) if ch.is_ascii_punctuation() || ch == '\n' || ch == '\r' => {
                    let begin = self.pos;
                    self.advance();
                    return Ok(ControlWord {
                        name: &self.input[begin..self.pos],
                        ignorable,
                    });
                },
                _ => return Err(RtfError::MissingControlWord { offset: start }),
            }
        }
    }

    /// Read a signed integer parameter, eating one delimiting space after
    /// it. Returns `None` without consuming anything if no number follows.
    ///
    /// `word` names the control word in overflow errors.
    pub fn parse_parameter(&mut self, word: &str) -> RtfResult<Option<i32>> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut end = start;
        if bytes.get(end) == Some(&b'-') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        if end == start {
            return Ok(None);
        }

        let value = atoi_simd::parse::<i32, false, false>(&bytes[start..end]).map_err(|_| {
            RtfError::ParameterOverflow {
                word: word.to_string(),
            }
        })?;
        self.pos = end;
        self.eat_space();
        Ok(Some(value))
    }

    /// Consume one space if it is the current character.
    #[inline]
    pub fn eat_space(&mut self) {
        if self.peek_byte(0) == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Read a `\'XX` escape at the current position.
    pub fn read_hex_byte(&mut self) -> RtfResult<u8> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let high = bytes.get(start + 2).copied().and_then(hex_nibble);
        let low = bytes.get(start + 3).copied().and_then(hex_nibble);
        match (high, low) {
            (Some(high), Some(low)) => {
                self.pos += 4;
                Ok((high << 4) | low)
            },
            _ => Err(RtfError::BadHexCode { offset: start }),
        }
    }

    /// Skip one character or control word of `\u` fallback text.
    ///
    /// Group delimiters end the fallback and are left in place. Line breaks
    /// do not count as characters.
    pub fn skip_character_or_control_word(&mut self) -> RtfResult<()> {
        loop {
            match self.peek() {
                None | Some('{') | Some('}') => return Ok(()),
                Some('\\') if self.peek_byte(1) == Some(b'\'') => {
                    self.read_hex_byte()?;
                    return Ok(());
                },
                Some('\\') => {
                    let word = self.parse_control_word()?;
                    if self.parse_parameter(word.name)?.is_none() {
                        self.eat_space();
                    }
                    return Ok(());
                },
                Some('\r') | Some('\n') => self.advance(),
                Some(_) => {
                    self.advance();
                    return Ok(());
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        while let Some(token) = lexer.next_token().unwrap() {
            out.push(token);
            if let Token::Control(word) = token
                && lexer.parse_parameter(word.name).unwrap().is_none()
            {
                lexer.eat_space();
            }
        }
        out
    }

    fn word(name: &str) -> Token<'_> {
        Token::Control(ControlWord {
            name,
            ignorable: false,
        })
    }

    #[test]
    fn test_simple_tokenization() {
        let tokens = tokens(r"{\rtf1\ansi Hi}");
        assert_eq!(
            tokens,
            vec![
                Token::OpenGroup,
                word("rtf"),
                word("ansi"),
                Token::Char('H'),
                Token::Char('i'),
                Token::CloseGroup,
            ]
        );
    }

    #[test]
    fn test_line_breaks_are_skipped() {
        assert_eq!(tokens("a\r\nb"), vec![Token::Char('a'), Token::Char('b')]);
    }

    #[test]
    fn test_control_symbols() {
        assert_eq!(tokens(r"\~\{"), vec![word("~"), word("{")]);
        assert_eq!(tokens("\\\n"), vec![word("\n")]);
    }

    #[test]
    fn test_ignorable_destination() {
        let mut lexer = Lexer::new(r"\* \shppict");
        assert_eq!(
            lexer.parse_control_word().unwrap(),
            ControlWord {
                name: "shppict",
                ignorable: true
            }
        );
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_missing_control_word() {
        let mut lexer = Lexer::new(r"\ x");
        assert_eq!(
            lexer.parse_control_word(),
            Err(RtfError::MissingControlWord { offset: 0 })
        );
        let mut lexer = Lexer::new(r"\*x");
        assert_eq!(
            lexer.parse_control_word(),
            Err(RtfError::MissingControlWord { offset: 2 })
        );
    }

    #[test]
    fn test_parameters() {
        let mut lexer = Lexer::new("-12 x");
        assert_eq!(lexer.parse_parameter("li").unwrap(), Some(-12));
        assert_eq!(lexer.peek(), Some('x'));

        // A lone minus sign is not a number
        let mut lexer = Lexer::new("-x");
        assert_eq!(lexer.parse_parameter("li").unwrap(), None);
        assert_eq!(lexer.position(), 0);

        // Only one delimiting space is eaten
        let mut lexer = Lexer::new("5  x");
        assert_eq!(lexer.parse_parameter("fs").unwrap(), Some(5));
        assert_eq!(lexer.peek(), Some(' '));
    }

    #[test]
    fn test_parameter_overflow() {
        let mut lexer = Lexer::new("99999999999");
        assert_eq!(
            lexer.parse_parameter("fs"),
            Err(RtfError::ParameterOverflow {
                word: "fs".to_string()
            })
        );
    }

    #[test]
    fn test_hex_escape() {
        assert_eq!(tokens(r"\'e9\'4F"), vec![Token::HexByte(0xE9), Token::HexByte(0x4F)]);

        let mut lexer = Lexer::new(r"\'4");
        assert_eq!(lexer.next_token(), Err(RtfError::BadHexCode { offset: 0 }));
        let mut lexer = Lexer::new(r"a\'g1");
        lexer.next_token().unwrap();
        assert_eq!(lexer.next_token(), Err(RtfError::BadHexCode { offset: 1 }));
    }

    #[test]
    fn test_skip_fallback() {
        let mut lexer = Lexer::new(r"\'41B");
        lexer.skip_character_or_control_word().unwrap();
        assert_eq!(lexer.peek(), Some('B'));

        let mut lexer = Lexer::new("\\emdash5 B");
        lexer.skip_character_or_control_word().unwrap();
        assert_eq!(lexer.peek(), Some('B'));

        let mut lexer = Lexer::new("\n?B");
        lexer.skip_character_or_control_word().unwrap();
        assert_eq!(lexer.peek(), Some('B'));

        let mut lexer = Lexer::new("}B");
        lexer.skip_character_or_control_word().unwrap();
        assert_eq!(lexer.peek(), Some('}'));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_hex_escape_decodes_any_byte(byte in any::<u8>()) {
            let input = format!("\\'{:02x}", byte);
            let mut lexer = Lexer::new(&input);
            prop_assert_eq!(lexer.next_token().unwrap(), Some(Token::HexByte(byte)));
            prop_assert!(lexer.is_eof());
        }

        #[test]
        fn prop_parameter_round_trips(value in any::<i32>()) {
            let input = format!("{} ", value);
            let mut lexer = Lexer::new(&input);
            prop_assert_eq!(lexer.parse_parameter("x").unwrap(), Some(value));
            prop_assert!(lexer.is_eof());
        }

        #[test]
        fn prop_lexer_always_advances(input in "[a-z{}\\\\'0-9 \\-*\n]{0,40}") {
            let mut lexer = Lexer::new(&input);
            loop {
                let before = lexer.position();
                match lexer.next_token() {
                    Ok(Some(Token::Control(word))) => {
                        let _ = lexer.parse_parameter(word.name);
                    },
                    Ok(Some(_)) => {},
                    Ok(None) | Err(_) => break,
                }
                prop_assert!(lexer.position() > before);
            }
        }
    }
}
