//! Hand-written lexer for Quill source text.
//!
//! Maximal-munch scanning over a `char` cursor. Multi-character operators
//! (`..`, `==`, `<=`, ...) are matched before their single-character
//! prefixes, and operator lexemes are only recognized in normal scanning
//! mode — never inside string literals or `#` comments.

use std::str::Chars;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// A classified unit of source text with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // -- Literals --
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,

    // -- Identifiers & keywords --
    Ident(String),
    Let,
    If,
    Then,
    Else,

    // -- Operators --
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `..` — the range operator.
    DotDot,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Assign,

    // -- Delimiters --
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
    Newline,

    // -- Terminals --
    Eof,
    /// Unrecognized input. The parser turns this into a lexical diagnostic;
    /// scanning is not retried.
    Error(String),
}

impl TokenKind {
    /// The source lexeme for display in error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Int(n) => n.to_string(),
            TokenKind::Float(f) => format!("{:?}", f),
            TokenKind::Str(s) => format!("{:?}", s),
            TokenKind::True => "true".into(),
            TokenKind::False => "false".into(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Let => "let".into(),
            TokenKind::If => "if".into(),
            TokenKind::Then => "then".into(),
            TokenKind::Else => "else".into(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Star => "*".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Percent => "%".into(),
            TokenKind::DotDot => "..".into(),
            TokenKind::EqEq => "==".into(),
            TokenKind::NotEq => "!=".into(),
            TokenKind::Lt => "<".into(),
            TokenKind::Le => "<=".into(),
            TokenKind::Gt => ">".into(),
            TokenKind::Ge => ">=".into(),
            TokenKind::AndAnd => "&&".into(),
            TokenKind::OrOr => "||".into(),
            TokenKind::Bang => "!".into(),
            TokenKind::Assign => "=".into(),
            TokenKind::LParen => "(".into(),
            TokenKind::RParen => ")".into(),
            TokenKind::LBracket => "[".into(),
            TokenKind::RBracket => "]".into(),
            TokenKind::Semicolon => ";".into(),
            TokenKind::Newline => "newline".into(),
            TokenKind::Eof => "end of input".into(),
            TokenKind::Error(msg) => msg.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// Cursor over source text. All scanner state is explicit — the lexer is
/// re-entrant and two lexers never share state.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    chars: Chars<'src>,
    line: usize,
    col: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            chars: source.chars(),
            line: 1,
            col: 0,
        }
    }

    /// Tokenize the whole input, ending with a single `Eof` token.
    pub fn tokenize(source: &'src str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        match c {
            Some('\n') => {
                self.line += 1;
                self.col = 0;
            }
            Some(_) => self.col += 1,
            None => {}
        }
        c
    }

    fn bump_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    /// Scan the next token, advancing the cursor past its lexeme.
    pub fn next_token(&mut self) -> Token {
        // Skip horizontal whitespace and comments; newlines are tokens
        // (they separate statements).
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('#') => {
                    self.bump_while(|c| c != '\n');
                }
                _ => break,
            }
        }

        let line = self.line;
        let col = self.col + 1;
        let token = |kind| Token { kind, line, col };

        let c = match self.peek() {
            Some(c) => c,
            None => return token(TokenKind::Eof),
        };

        if c == '\n' {
            self.bump();
            // Collapse a run of blank lines into one separator.
            loop {
                match self.peek() {
                    Some('\n') | Some(' ') | Some('\t') | Some('\r') => {
                        self.bump();
                    }
                    _ => break,
                }
            }
            return token(TokenKind::Newline);
        }

        if c.is_ascii_digit() {
            return token(self.next_number());
        }

        if c.is_alphabetic() || c == '_' {
            let word = self.bump_while(|c| c.is_alphanumeric() || c == '_');
            let kind = match word.as_str() {
                "let" => TokenKind::Let,
                "if" => TokenKind::If,
                "then" => TokenKind::Then,
                "else" => TokenKind::Else,
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                _ => TokenKind::Ident(word),
            };
            return token(kind);
        }

        if c == '"' {
            return token(self.next_string());
        }

        self.bump();
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            '.' => {
                if self.peek() == Some('.') {
                    self.bump();
                    TokenKind::DotDot
                } else {
                    TokenKind::Error("unexpected character '.'".into())
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.bump();
                    TokenKind::AndAnd
                } else {
                    TokenKind::Error("unexpected character '&' (did you mean '&&'?)".into())
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.bump();
                    TokenKind::OrOr
                } else {
                    TokenKind::Error("unexpected character '|' (did you mean '||'?)".into())
                }
            }
            other => TokenKind::Error(format!("unexpected character '{}'", other)),
        };
        token(kind)
    }

    /// Scan an integer or float literal.
    ///
    /// A `.` only starts a fractional part when followed by a digit, so
    /// `1..5` lexes as `1` `..` `5` rather than a malformed float.
    fn next_number(&mut self) -> TokenKind {
        let mut text = self.bump_while(|c| c.is_ascii_digit());
        let mut is_float = false;

        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.bump();
            text.push_str(&self.bump_while(|c| c.is_ascii_digit()));
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let after = self.peek2();
            let signed = matches!(after, Some('+') | Some('-'));
            let has_digits = if signed {
                let mut iter = self.chars.clone();
                iter.next();
                iter.next();
                iter.next().is_some_and(|c| c.is_ascii_digit())
            } else {
                after.is_some_and(|c| c.is_ascii_digit())
            };
            if has_digits {
                is_float = true;
                text.extend(self.bump());
                if signed {
                    text.extend(self.bump());
                }
                text.push_str(&self.bump_while(|c| c.is_ascii_digit()));
            }
        }

        if is_float {
            match text.parse::<f64>() {
                Ok(f) => TokenKind::Float(f),
                Err(_) => TokenKind::Error(format!("invalid float literal '{}'", text)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(_) => TokenKind::Error(format!("integer literal '{}' out of range", text)),
            }
        }
    }

    /// Scan a double-quoted string literal. Operator lexemes inside the
    /// quotes are plain text — string mode never produces operator tokens.
    fn next_string(&mut self) -> TokenKind {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return TokenKind::Str(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some(other) => {
                        return TokenKind::Error(format!("unknown escape '\\{}'", other))
                    }
                    None => return TokenKind::Error("unterminated string literal".into()),
                },
                Some('\n') | None => return TokenKind::Error("unterminated string literal".into()),
                Some(c) => value.push(c),
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn range_operator_tokenizes() {
        assert_eq!(
            kinds("a .. b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::DotDot,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn range_between_int_literals_is_not_a_float() {
        // Maximal munch: the digit's fractional part is only taken when a
        // digit follows the dot.
        assert_eq!(
            kinds("1..5"),
            vec![
                TokenKind::Int(1),
                TokenKind::DotDot,
                TokenKind::Int(5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn float_literals_still_lex() {
        assert_eq!(kinds("1.5"), vec![TokenKind::Float(1.5), TokenKind::Eof]);
        assert_eq!(
            kinds("1.5..2.5"),
            vec![
                TokenKind::Float(1.5),
                TokenKind::DotDot,
                TokenKind::Float(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn exponent_floats() {
        assert_eq!(kinds("2e10"), vec![TokenKind::Float(2e10), TokenKind::Eof]);
        assert_eq!(
            kinds("1.5e-3"),
            vec![TokenKind::Float(1.5e-3), TokenKind::Eof]
        );
    }

    #[test]
    fn single_dot_is_an_error() {
        let tokens = kinds("1 . 2");
        assert!(matches!(tokens[1], TokenKind::Error(_)));
    }

    #[test]
    fn range_inside_string_is_plain_text() {
        assert_eq!(
            kinds("\"1..5\""),
            vec![TokenKind::Str("1..5".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn range_inside_comment_is_ignored() {
        assert_eq!(
            kinds("1 # .. not an operator\n2"),
            vec![
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn two_char_operators_win_over_prefixes() {
        assert_eq!(
            kinds("< <= = == ! !="),
            vec![
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::Bang,
                TokenKind::NotEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("let xs = if x then y else z"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("xs".into()),
                TokenKind::Assign,
                TokenKind::If,
                TokenKind::Ident("x".into()),
                TokenKind::Then,
                TokenKind::Ident("y".into()),
                TokenKind::Else,
                TokenKind::Ident("z".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\n\t\"\\b""#),
            vec![TokenKind::Str("a\n\t\"\\b".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let tokens = kinds("\"abc");
        assert!(matches!(tokens[0], TokenKind::Error(_)));
    }

    #[test]
    fn lone_ampersand_is_an_error() {
        let tokens = kinds("a & b");
        assert!(matches!(tokens[1], TokenKind::Error(_)));
    }

    #[test]
    fn int_out_of_range_is_an_error() {
        let tokens = kinds("99999999999999999999");
        assert!(matches!(tokens[0], TokenKind::Error(_)));
    }

    #[test]
    fn newlines_collapse_into_one_separator() {
        assert_eq!(
            kinds("1\n\n\n2"),
            vec![
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens = Lexer::tokenize("1 + 2\n  .. 3");
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (1, 3));
        let dotdot = tokens.iter().find(|t| t.kind == TokenKind::DotDot).unwrap();
        assert_eq!((dotdot.line, dotdot.col), (2, 3));
    }
}
