//! # Lexer
//!
//! Single-pass tokenizer for the algebra's surface syntax. Works left to
//! right with two-character lookahead so digraph operators (`*:`, `?!`,
//! `#.`, `:=`, ...) always win over their single-character prefixes.
//!
//! Every token carries its (line, column) origin plus the byte offset of
//! its first character, which the session layer uses to slice statement
//! text around assignment operators.
//!
//! A `/` directly after `~` or `!~` opens a regex literal. That one token
//! of lookbehind is what keeps regex literals from colliding with the
//! summarize operator; the parser currently rejects regex predicates, but
//! the token stream is stable if they ever come back.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::error::LexError;

/// A token kind, with payloads for literals and identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier (relation or attribute name, or function name)
    Ident(String),
    /// Integer literal
    Int(i64),
    /// Decimal literal
    Decimal(Decimal),
    /// String literal (unescaped content)
    Str(String),
    /// Boolean literal (`true` / `false` reserved words)
    Bool(bool),
    /// Regex literal body (reserved; never evaluated)
    Regex(String),

    // single-character operators
    Question, // ?
    Hash,     // #
    Star,     // *
    Plus,     // +
    Minus,    // -
    Pipe,     // |
    Amp,      // &
    Slash,    // /
    Dollar,   // $
    Caret,    // ^
    At,       // @
    Eq,       // =
    Lt,       // <
    Gt,       // >
    Tilde,    // ~
    LBracket, // [
    RBracket, // ]
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    Comma,    // ,
    Colon,    // :
    Dot,      // .

    // digraphs
    QuestionBang,   // ?!
    HashBang,       // #!
    StarColon,      // *:
    LtColon,        // <:
    SlashDot,       // /.
    SlashColon,     // /:
    HashDot,        // #.
    PlusDot,        // +.
    GtDot,          // >.
    LtDot,          // <.
    PercentDot,     // %.
    Assign,         // :=
    PipeAssign,     // |=
    MinusAssign,    // -=
    QuestionAssign, // ?=
    NotEq,          // !=
    GtEq,           // >=
    LtEq,           // <=
    NotTilde,       // !~
    ColonColon,     // ::
    PlusColon,      // +:
}

impl TokenKind {
    /// Fixed surface spelling for operator tokens
    fn symbol(&self) -> Option<&'static str> {
        let s = match self {
            TokenKind::Question => "?",
            TokenKind::Hash => "#",
            TokenKind::Star => "*",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Pipe => "|",
            TokenKind::Amp => "&",
            TokenKind::Slash => "/",
            TokenKind::Dollar => "$",
            TokenKind::Caret => "^",
            TokenKind::At => "@",
            TokenKind::Eq => "=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Tilde => "~",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::QuestionBang => "?!",
            TokenKind::HashBang => "#!",
            TokenKind::StarColon => "*:",
            TokenKind::LtColon => "<:",
            TokenKind::SlashDot => "/.",
            TokenKind::SlashColon => "/:",
            TokenKind::HashDot => "#.",
            TokenKind::PlusDot => "+.",
            TokenKind::GtDot => ">.",
            TokenKind::LtDot => "<.",
            TokenKind::PercentDot => "%.",
            TokenKind::Assign => ":=",
            TokenKind::PipeAssign => "|=",
            TokenKind::MinusAssign => "-=",
            TokenKind::QuestionAssign => "?=",
            TokenKind::NotEq => "!=",
            TokenKind::GtEq => ">=",
            TokenKind::LtEq => "<=",
            TokenKind::NotTilde => "!~",
            TokenKind::ColonColon => "::",
            TokenKind::PlusColon => "+:",
            _ => return None,
        };
        Some(s)
    }

    /// Whether this token can end an operand (used to tell a minus sign
    /// from a negative literal)
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::Decimal(_)
                | TokenKind::Str(_)
                | TokenKind::Bool(_)
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sym) = self.symbol() {
            return write!(f, "'{sym}'");
        }
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::Int(v) => write!(f, "integer {v}"),
            TokenKind::Decimal(v) => write!(f, "decimal {v}"),
            TokenKind::Str(s) => write!(f, "string \"{s}\""),
            TokenKind::Bool(b) => write!(f, "boolean {b}"),
            TokenKind::Regex(r) => write!(f, "regex /{r}/"),
            _ => unreachable!("operator tokens are handled by symbol()"),
        }
    }
}

/// A token with its source origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub col: u32,
    /// Byte offset of the token's first character in the source
    pub offset: usize,
}

/// The tokenizer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens: Vec<Token> = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            let Some(ch) = self.peek() else { break };

            let (line, col, offset) = (self.line, self.col, self.pos);
            let prev_ends_operand = tokens.last().is_some_and(|t| t.kind.ends_operand());
            let after_tilde = tokens.last().is_some_and(|t| {
                matches!(t.kind, TokenKind::Tilde | TokenKind::NotTilde)
            });

            let kind = if ch == '"' {
                self.scan_string()?
            } else if ch == '/' && after_tilde {
                self.scan_regex()?
            } else if ch.is_ascii_digit() {
                self.scan_number(false, line, col)?
            } else if ch == '-' && self.peek_next().is_some_and(|c| c.is_ascii_digit())
                && !prev_ends_operand
            {
                self.advance();
                self.scan_number(true, line, col)?
            } else if ch.is_ascii_alphabetic() || ch == '_' {
                self.scan_identifier()
            } else {
                self.advance();
                self.scan_operator(ch, line, col)?
            };

            tokens.push(Token {
                kind,
                line,
                col,
                offset,
            });
        }

        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            // -- comment runs to end of line
            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn scan_string(&mut self) -> Result<TokenKind, LexError> {
        let (line, col) = (self.line, self.col);
        self.advance(); // opening quote
        let mut content = String::new();

        loop {
            match self.advance() {
                Some('"') => return Ok(TokenKind::Str(content)),
                Some('\\') => match self.advance() {
                    Some('"') => content.push('"'),
                    Some('\\') => content.push('\\'),
                    // Unknown escapes pass through verbatim
                    Some(other) => {
                        content.push('\\');
                        content.push(other);
                    }
                    None => return Err(LexError::UnterminatedString { line, col }),
                },
                Some(other) => content.push(other),
                None => return Err(LexError::UnterminatedString { line, col }),
            }
        }
    }

    fn scan_regex(&mut self) -> Result<TokenKind, LexError> {
        let (line, col) = (self.line, self.col);
        self.advance(); // opening slash
        let mut body = String::new();

        loop {
            match self.advance() {
                Some('/') => return Ok(TokenKind::Regex(body)),
                Some('\\') => match self.advance() {
                    Some(other) => {
                        body.push('\\');
                        body.push(other);
                    }
                    None => return Err(LexError::UnterminatedRegex { line, col }),
                },
                Some(other) => body.push(other),
                None => return Err(LexError::UnterminatedRegex { line, col }),
            }
        }
    }

    fn scan_number(&mut self, negative: bool, line: u32, col: u32) -> Result<TokenKind, LexError> {
        let mut text = String::new();
        if negative {
            text.push('-');
        }

        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance();
        }

        // A dot makes it a decimal; fractional digits are optional
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                text.push(c);
                self.advance();
            }
            let value = Decimal::from_str(&text).map_err(|_| LexError::InvalidNumber {
                text: text.clone(),
                line,
                col,
            })?;
            return Ok(TokenKind::Decimal(value));
        }

        let value = text.parse::<i64>().map_err(|_| LexError::InvalidNumber {
            text: text.clone(),
            line,
            col,
        })?;
        Ok(TokenKind::Int(value))
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];
        match text {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Ident(text.to_string()),
        }
    }

    fn scan_operator(&mut self, first: char, line: u32, col: u32) -> Result<TokenKind, LexError> {
        let second = self.peek();

        // Digraphs take precedence over their single-character prefixes
        let digraph = match (first, second) {
            ('?', Some('!')) => Some(TokenKind::QuestionBang),
            ('?', Some('=')) => Some(TokenKind::QuestionAssign),
            ('#', Some('!')) => Some(TokenKind::HashBang),
            ('#', Some('.')) => Some(TokenKind::HashDot),
            ('*', Some(':')) => Some(TokenKind::StarColon),
            ('<', Some(':')) => Some(TokenKind::LtColon),
            ('<', Some('.')) => Some(TokenKind::LtDot),
            ('<', Some('=')) => Some(TokenKind::LtEq),
            ('/', Some('.')) => Some(TokenKind::SlashDot),
            ('/', Some(':')) => Some(TokenKind::SlashColon),
            ('+', Some('.')) => Some(TokenKind::PlusDot),
            ('+', Some(':')) => Some(TokenKind::PlusColon),
            ('>', Some('.')) => Some(TokenKind::GtDot),
            ('>', Some('=')) => Some(TokenKind::GtEq),
            ('%', Some('.')) => Some(TokenKind::PercentDot),
            (':', Some('=')) => Some(TokenKind::Assign),
            (':', Some(':')) => Some(TokenKind::ColonColon),
            ('|', Some('=')) => Some(TokenKind::PipeAssign),
            ('-', Some('=')) => Some(TokenKind::MinusAssign),
            ('!', Some('=')) => Some(TokenKind::NotEq),
            ('!', Some('~')) => Some(TokenKind::NotTilde),
            _ => None,
        };
        if let Some(kind) = digraph {
            self.advance();
            return Ok(kind);
        }

        let kind = match first {
            '?' => TokenKind::Question,
            '#' => TokenKind::Hash,
            '*' => TokenKind::Star,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '|' => TokenKind::Pipe,
            '&' => TokenKind::Amp,
            '/' => TokenKind::Slash,
            '$' => TokenKind::Dollar,
            '^' => TokenKind::Caret,
            '@' => TokenKind::At,
            '=' => TokenKind::Eq,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '~' => TokenKind::Tilde,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            // '!' and '%' exist only as digraph prefixes
            other => {
                return Err(LexError::UnexpectedChar {
                    ch: other,
                    line,
                    col,
                })
            }
        };
        Ok(kind)
    }
}

/// Convenience: tokenize a source string
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("lexes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_digraphs_win_over_prefixes() {
        assert_eq!(kinds("*:"), vec![TokenKind::StarColon]);
        assert_eq!(kinds("?!"), vec![TokenKind::QuestionBang]);
        assert_eq!(kinds("#."), vec![TokenKind::HashDot]);
        assert_eq!(kinds(":="), vec![TokenKind::Assign]);
        assert_eq!(kinds("* :"), vec![TokenKind::Star, TokenKind::Colon]);
    }

    #[test]
    fn test_chain_tokens() {
        let toks = kinds("E ? salary > 50000 # [name salary]");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("E".into()),
                TokenKind::Question,
                TokenKind::Ident("salary".into()),
                TokenKind::Gt,
                TokenKind::Int(50000),
                TokenKind::Hash,
                TokenKind::LBracket,
                TokenKind::Ident("name".into()),
                TokenKind::Ident("salary".into()),
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(kinds("42"), vec![TokenKind::Int(42)]);
        assert_eq!(
            kinds("3.25"),
            vec![TokenKind::Decimal(Decimal::from_str("3.25").expect("decimal"))]
        );
        assert_eq!(kinds("true false"), vec![TokenKind::Bool(true), TokenKind::Bool(false)]);
        assert_eq!(
            kinds(r#""he said \"hi\" \\ bye""#),
            vec![TokenKind::Str(r#"he said "hi" \ bye"#.into())]
        );
    }

    #[test]
    fn test_negative_number_vs_minus() {
        // After an operand, '-' is the operator
        assert_eq!(
            kinds("a -5"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Minus,
                TokenKind::Int(5)
            ]
        );
        // After a non-operand, it signs the literal
        assert_eq!(
            kinds("^ -5"),
            vec![TokenKind::Caret, TokenKind::Int(-5)]
        );
        assert_eq!(kinds("x: -2"), {
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Colon,
                TokenKind::Int(-2),
            ]
        });
    }

    #[test]
    fn test_descending_sort_key() {
        assert_eq!(
            kinds("$ salary-"),
            vec![
                TokenKind::Dollar,
                TokenKind::Ident("salary".into()),
                TokenKind::Minus
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("E # name -- project the name\n? x = 1"),
            vec![
                TokenKind::Ident("E".into()),
                TokenKind::Hash,
                TokenKind::Ident("name".into()),
                TokenKind::Question,
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Int(1),
            ]
        );
    }

    #[test]
    fn test_positions() {
        let toks = tokenize("E\n  ? x").expect("lexes");
        assert_eq!((toks[0].line, toks[0].col), (1, 1));
        assert_eq!((toks[1].line, toks[1].col), (2, 3));
        assert_eq!((toks[2].line, toks[2].col), (2, 5));
    }

    #[test]
    fn test_regex_only_after_tilde() {
        assert_eq!(
            kinds("name ~ /al.*/"),
            vec![
                TokenKind::Ident("name".into()),
                TokenKind::Tilde,
                TokenKind::Regex("al.*".into())
            ]
        );
        // Elsewhere '/' is the summarize operator
        assert_eq!(
            kinds("E / dept"),
            vec![
                TokenKind::Ident("E".into()),
                TokenKind::Slash,
                TokenKind::Ident("dept".into())
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize(r#""oops"#).expect_err("must fail");
        assert!(matches!(err, LexError::UnterminatedString { line: 1, col: 1 }));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("E ! x").expect_err("must fail");
        assert!(matches!(err, LexError::UnexpectedChar { ch: '!', .. }));
    }

    #[test]
    fn test_assignment_digraphs() {
        assert_eq!(
            kinds("R |= S"),
            vec![
                TokenKind::Ident("R".into()),
                TokenKind::PipeAssign,
                TokenKind::Ident("S".into())
            ]
        );
        assert_eq!(kinds("::"), vec![TokenKind::ColonColon]);
        assert_eq!(kinds("+:"), vec![TokenKind::PlusColon]);
    }
}
