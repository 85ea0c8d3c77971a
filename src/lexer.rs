use crate::token::{Position, Span, Spanned, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Validates the raw source bytes as UTF-8.
pub fn decode(src: &[u8]) -> Result<&str> {
    std::str::from_utf8(src).map_err(|error| {
        let lo = error.valid_up_to();
        let len = error.error_len().unwrap_or(src.len() - lo);
        Span::new_of_length(lo, u32::try_from(len).unwrap_or(u32::MAX)).wrap(Error::InvalidUtf8)
    })
}

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// The last token is always [`TokenKind::Eof`]. Lexing stops at the first
/// error.
pub fn lex(src: &str, tokens: &mut Vec<Token>) -> Result<()> {
    let _span = tracing::debug_span!("lex").entered();
    Lexer::new(src, tokens).lex()?;
    tracing::debug!(tokens = tokens.len(), "scanned source");
    Ok(())
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens)?;
    Ok(tokens)
}

struct Lexer<'src, 'tok> {
    src: &'src str,
    cursor: usize,
    line: u32,
    col: u32,
    current_lo: usize,
    current_line: u32,
    current_col: u32,
    /// Whether a line feed at this point would end a statement.
    insert_semi: bool,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    fn lex(mut self) -> Result<()> {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        // A byte order mark is only legal as the very first character.
        if self.peek() == '\u{FEFF}' {
            self.advance();
        }
        loop {
            self.whitespace();
            self.mark();
            let next = self.scan_token_kind()?;
            let is_eof = next == TokenKind::Eof;
            self.insert_semi = next.ends_statement();
            self.produce(next);
            if is_eof {
                break Ok(());
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> Result<TokenKind> {
        use TokenKind::*;
        let Some(current) = self.advance() else {
            return Ok(Eof);
        };
        let kind = match current {
            '\0' => return self.error(Error::IllegalNul),
            '\u{FEFF}' => return self.error(Error::IllegalByteOrderMark),
            '+' => match self.peek() {
                '+' => self.advance_with(PlusPlus),
                '=' => self.advance_with(PlusAssign),
                _ => Plus,
            },
            '-' => match self.peek() {
                '-' => self.advance_with(MinusMinus),
                '=' => self.advance_with(MinusAssign),
                '>' => self.advance_with(Arrow),
                _ => Minus,
            },
            '*' => Star,
            '/' => match self.peek() {
                '/' => self.advance_with(SlashSlash),
                _ => Slash,
            },
            '%' => Percent,
            '<' => match self.peek() {
                '=' => self.advance_with(LessEq),
                _ => Less,
            },
            '>' => match self.peek() {
                '=' => self.advance_with(GreaterEq),
                _ => Greater,
            },
            '=' => match self.peek() {
                '=' => self.advance_with(EqEq),
                _ => Assign,
            },
            '!' => match self.peek() {
                '=' => self.advance_with(NotEq),
                _ => return self.error(Error::IllegalChar('!')),
            },
            ':' => match self.peek() {
                '=' => self.advance_with(Define),
                ':' => self.advance_with(ColonColon),
                _ => Colon,
            },
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ',' => Comma,
            ';' => Semicolon,
            '"' => self.string()?,
            c if c.is_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(c)?,
            c => return self.error(Error::IllegalChar(c)),
        };
        Ok(kind)
    }

    /// Skips blanks. A line feed produces a statement terminator if the
    /// previous token may end a statement.
    fn whitespace(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' if self.insert_semi => {
                    self.mark();
                    self.advance();
                    self.produce(TokenKind::Semicolon);
                    if let Some(last) = self.tokens.last_mut() {
                        last.synthetic = true;
                    }
                    self.insert_semi = false;
                }
                '\n' => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    /// Lexes a string literal, decoding its escape sequences on the fly.
    fn string(&mut self) -> Result<TokenKind> {
        let mut buf = String::new();
        loop {
            let escape_lo = self.cursor;
            match self.advance() {
                // Strings may not span multiple lines.
                None | Some('\n') => return self.error(Error::UnterminatedString),
                Some('\0') => {
                    let span = Span::new_of_bounds(escape_lo..self.cursor);
                    return Err(span.wrap(Error::IllegalNul));
                }
                Some('"') => return Ok(TokenKind::String(buf.into_boxed_str())),
                Some('\\') => buf.push(self.escape(escape_lo)?),
                Some(c) => buf.push(c),
            }
        }
    }

    fn escape(&mut self, lo: usize) -> Result<char> {
        let c = match self.advance() {
            Some('a') => '\x07',
            Some('b') => '\x08',
            Some('f') => '\x0c',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('v') => '\x0b',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('x') => return self.code_point(lo, 2),
            Some('u') => return self.code_point(lo, 4),
            Some('U') => return self.code_point(lo, 8),
            Some(d @ '0'..='7') => {
                let mut value = u32::from(d) - u32::from('0');
                for _ in 0..2 {
                    let Some(digit) = self.peek().to_digit(8) else {
                        break;
                    };
                    self.advance();
                    value = value * 8 + digit;
                }
                if value > 255 {
                    let span = Span::new_of_bounds(lo..self.cursor);
                    return Err(span.wrap(Error::OctalEscapeOutOfRange));
                }
                return self.char_of(lo, value);
            }
            _ => {
                let span = Span::new_of_bounds(lo..self.cursor);
                return Err(span.wrap(Error::UnknownEscape));
            }
        };
        Ok(c)
    }

    /// Reads exactly `digits` hexadecimal digits as a code point.
    fn code_point(&mut self, lo: usize, digits: usize) -> Result<char> {
        let mut value: u32 = 0;
        for _ in 0..digits {
            let Some(digit) = self.peek().to_digit(16) else {
                let span = Span::new_of_bounds(lo..self.cursor);
                return Err(span.wrap(Error::MalformedEscape));
            };
            self.advance();
            value = value * 16 + digit;
        }
        self.char_of(lo, value)
    }

    fn char_of(&self, lo: usize, value: u32) -> Result<char> {
        char::from_u32(value).ok_or_else(|| {
            let span = Span::new_of_bounds(lo..self.cursor);
            span.wrap(Error::InvalidCodePoint(value))
        })
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_alphanumeric() || c == '_';

        while valid_identifier_suffix(self.peek()) {
            self.advance();
        }
        let substr = self.substr();
        match KEYWORDS.get(substr) {
            Some(keyword) => keyword.clone(),
            None => TokenKind::Ident(substr.into()),
        }
    }

    fn number(&mut self, first: char) -> Result<TokenKind> {
        if first == '0' && matches!(self.peek(), 'x' | 'X') {
            self.advance();
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            let digits = &self.substr()[2..];
            if digits.is_empty() {
                return self.error(Error::HexWithoutDigits);
            }
            return self.int_of(digits, 16);
        }

        self.digits();
        let mut is_float = false;
        if self.peek() == '.' && self.peek_nth(1).is_ascii_digit() {
            self.advance();
            self.digits();
            is_float = true;
        }
        if matches!(self.peek(), 'e' | 'E') {
            let signed = matches!(self.peek_nth(1), '+' | '-');
            let first_digit = if signed { 2 } else { 1 };
            if self.peek_nth(first_digit).is_ascii_digit() {
                for _ in 0..first_digit {
                    self.advance();
                }
                self.digits();
                is_float = true;
            }
        }

        let text = self.substr();
        if is_float {
            return match text.parse() {
                Ok(value) => Ok(TokenKind::Float(value)),
                Err(_) => self.error(Error::MalformedFloat),
            };
        }
        if first == '0' && text.len() > 1 {
            if let Some(bad) = text.chars().find(|c| matches!(c, '8' | '9')) {
                return self.error(Error::InvalidOctalDigit(bad));
            }
            return self.int_of(&text[1..], 8);
        }
        self.int_of(text, 10)
    }

    fn digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
    }

    fn int_of(&self, digits: &str, radix: u32) -> Result<TokenKind> {
        match i64::from_str_radix(digits, radix) {
            Ok(value) => Ok(TokenKind::Int(value)),
            Err(_) => self.error(Error::IntegerOverflow),
        }
    }
}

impl<'src> Lexer<'src, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            cursor: 0,
            line: 1,
            col: 1,
            current_lo: 0,
            current_line: 1,
            current_col: 1,
            insert_semi: false,
            tokens,
        }
    }

    /// Starts a new token "mark".
    fn mark(&mut self) {
        self.current_lo = self.cursor;
        self.current_line = self.line;
        self.current_col = self.col;
    }

    /// Returns the next character and advances, keeping track of lines.
    fn advance(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing. Yields `'\0'` at the
    /// end of the input.
    fn peek(&self) -> char {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> char {
        self.rest().chars().nth(n).unwrap_or('\0')
    }

    fn rest(&self) -> &'src str {
        &self.src[self.cursor..]
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &'src str {
        &self.src[self.current_lo..self.cursor]
    }

    fn error<T>(&self, error: Error) -> Result<T> {
        Err(self.span().wrap(error))
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        let pos = Position {
            line: self.current_line,
            col: self.current_col,
            width: u32::try_from(self.substr().chars().count()).unwrap_or(u32::MAX),
        };
        self.tokens.push(Token::new(kind, self.span(), pos));
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("illegal NUL character")]
    IllegalNul,
    #[error("illegal byte order mark")]
    IllegalByteOrderMark,
    #[error("invalid UTF-8 encoding")]
    InvalidUtf8,
    #[error("illegal character {0:?}")]
    IllegalChar(char),
    #[error("string literal not terminated")]
    UnterminatedString,
    #[error("unknown escape sequence")]
    UnknownEscape,
    #[error("escape sequence is missing digits")]
    MalformedEscape,
    #[error("escape sequence is invalid Unicode code point {0:#x}")]
    InvalidCodePoint(u32),
    #[error("octal escape value > 255")]
    OctalEscapeOutOfRange,
    #[error("hexadecimal literal has no digits")]
    HexWithoutDigits,
    #[error("invalid digit {0:?} in octal literal")]
    InvalidOctalDigit(char),
    #[error("integer literal out of range")]
    IntegerOverflow,
    #[error("malformed floating-point literal")]
    MalformedFloat,
}
