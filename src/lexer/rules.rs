//! Token rules of the While language.

use crate::rexp::Rexp;

use super::LexRule;

pub const WHITESPACE: &str = "whitespace";
pub const COMMENT: &str = "comment";
pub const KEYWORD: &str = "keyword";
pub const IDENTIFIER: &str = "identifier";
pub const NUMBER: &str = "number";
pub const STRING: &str = "string";
pub const OPERATOR: &str = "operator";
pub const PAREN: &str = "paren";
pub const SEMICOLON: &str = "semicolon";

pub const KEYWORDS: [&str; 12] = [
    "while", "if", "then", "else", "do", "for", "to", "read", "write", "skip", "true", "false",
];

const OPERATORS: [&str; 10] = [":=", "==", "!=", "=", "<", ">", "+", "-", "*", "/"];

fn letter() -> Rexp {
    Rexp::one_of(('a'..='z').chain('A'..='Z'))
}

fn digit() -> Rexp {
    Rexp::one_of('0'..='9')
}

/// Anything on the same line except the quote and the backslash.
fn string_char() -> Rexp {
    Rexp::none_of(['"', '\\', '\n'])
}

fn escape() -> Rexp {
    Rexp::seq(Rexp::Char('\\'), Rexp::one_of(['n', 't', '"', '\\']))
}

/// Rules in priority order: on equal-length matches the earlier rule wins,
/// which is what makes `while` a keyword rather than an identifier.
pub fn while_rules() -> Vec<LexRule> {
    let keyword = Rexp::alts(KEYWORDS.iter().map(|k| Rexp::literal(k)));
    let identifier = Rexp::seq(
        letter(),
        Rexp::star(Rexp::alts([letter(), digit(), Rexp::Char('_')])),
    );
    let number = Rexp::plus(digit());
    let string = Rexp::seqs([
        Rexp::Char('"'),
        Rexp::star(Rexp::alt(string_char(), escape())),
        Rexp::Char('"'),
    ]);
    let operator = Rexp::alts(OPERATORS.iter().map(|op| Rexp::literal(op)));
    let whitespace = Rexp::plus(Rexp::one_of([' ', '\t', '\r', '\n']));
    let comment = Rexp::seq(
        Rexp::literal("//"),
        Rexp::star(Rexp::none_of(['\n'])),
    );

    vec![
        LexRule::skip(WHITESPACE, whitespace),
        LexRule::skip(COMMENT, comment),
        LexRule::token(KEYWORD, keyword),
        LexRule::token(IDENTIFIER, identifier),
        LexRule::token(NUMBER, number),
        LexRule::token(STRING, string),
        LexRule::token(OPERATOR, operator),
        LexRule::token(PAREN, Rexp::one_of(['(', ')', '{', '}'])),
        LexRule::token(SEMICOLON, Rexp::Char(';')),
    ]
}
