use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    Identifier(&'a str),
    Integer(i32),
    /// Raw contents between the quotes, escapes not yet decoded.
    String(&'a str),
    True,
    False,

    // Keywords
    While,
    If,
    Then,
    Else,
    Do,
    For,
    To,
    Read,
    Write,
    Skip,

    // Operators
    Assign,    // :=
    Equal,     // = or ==
    NotEqual,  // !=
    Less,      // <
    Greater,   // >
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /

    // Delimiters
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }

    EOF,
}

impl TokenKind<'_> {
    pub fn keyword(text: &str) -> Option<TokenKind<'static>> {
        Some(match text {
            "while" => TokenKind::While,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "to" => TokenKind::To,
            "read" => TokenKind::Read,
            "write" => TokenKind::Write,
            "skip" => TokenKind::Skip,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        })
    }

    pub fn symbol(text: &str) -> Option<TokenKind<'static>> {
        Some(match text {
            ":=" => TokenKind::Assign,
            "=" | "==" => TokenKind::Equal,
            "!=" => TokenKind::NotEqual,
            "<" => TokenKind::Less,
            ">" => TokenKind::Greater,
            "+" => TokenKind::Plus,
            "-" => TokenKind::Minus,
            "*" => TokenKind::Star,
            "/" => TokenKind::Slash,
            "(" => TokenKind::LParen,
            ")" => TokenKind::RParen,
            "{" => TokenKind::LBrace,
            "}" => TokenKind::RBrace,
            ";" => TokenKind::Semicolon,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Identifier(name) => return write!(f, "identifier '{name}'"),
            TokenKind::Integer(value) => return write!(f, "number {value}"),
            TokenKind::String(raw) => return write!(f, "string \"{raw}\""),
            TokenKind::EOF => return write!(f, "end of input"),
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::While => "while",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::To => "to",
            TokenKind::Read => "read",
            TokenKind::Write => "write",
            TokenKind::Skip => "skip",
            TokenKind::Assign => ":=",
            TokenKind::Equal => "=",
            TokenKind::NotEqual => "!=",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Semicolon => ";",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
        };
        write!(f, "'{text}'")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }
}
