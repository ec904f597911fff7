use std::sync::{Arc, LazyLock};

use log::{debug, trace};

use crate::rexp::{Reconstruct, Rexp, Simplified, Val, ValueError, derivative, nullable, simplify};
use crate::token::{Span, Token, TokenKind};

pub mod error;
pub mod injection;
pub mod rules;

pub use error::{LexError, LexResult};
use injection::{inject, mkeps};

/// A named token pattern. Matches of skip rules are consumed but not
/// reported.
#[derive(Debug, Clone)]
pub struct LexRule {
    pub name: Arc<str>,
    pub pattern: Rexp,
    pub skip: bool,
}

impl LexRule {
    pub fn token(name: impl Into<Arc<str>>, pattern: Rexp) -> Self {
        Self {
            name: name.into(),
            pattern,
            skip: false,
        }
    }

    pub fn skip(name: impl Into<Arc<str>>, pattern: Rexp) -> Self {
        Self {
            name: name.into(),
            pattern,
            skip: true,
        }
    }
}

/// One matched substring and the rule that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme<'a> {
    pub rule: Arc<str>,
    pub text: &'a str,
    pub span: Span,
}

/// Longest-match lexer over an ordered list of rules.
#[derive(Debug, Clone)]
pub struct Lexer {
    rules: Vec<LexRule>,
    combined: Rexp,
}

struct Step {
    pattern: Rexp,
    character: char,
    reconstruct: Reconstruct,
}

impl Lexer {
    pub fn new(rules: Vec<LexRule>) -> Self {
        let combined = Rexp::alts(
            rules
                .iter()
                .map(|rule| Rexp::Tagged(rule.name.clone(), Arc::new(rule.pattern.clone()))),
        );
        Self { rules, combined }
    }

    pub fn rules(&self) -> &[LexRule] {
        &self.rules
    }

    /// Splits `source` into lexemes, dropping those of skip rules.
    pub fn lexemes<'a>(&self, source: &'a str) -> LexResult<Vec<Lexeme<'a>>> {
        let chars: Vec<(usize, char)> = source.char_indices().collect();
        let mut lexemes = Vec::new();
        let mut index = 0;
        let mut line = 1;
        let mut column = 1;

        while index < chars.len() {
            let (start, character) = chars[index];
            let Some((length, value)) = self.longest_match(&chars[index..])? else {
                return Err(LexError::NoMatchingRule {
                    character,
                    position: start,
                    line,
                    column,
                });
            };

            let end = chars.get(index + length).map_or(source.len(), |(offset, _)| *offset);
            let text = &source[start..end];
            let (rule, matched) = rule_of(value)?;
            if matched.flatten() != text {
                return Err(ValueError::shape("matched text", &matched).into());
            }

            let skip = self
                .rules
                .iter()
                .find(|candidate| candidate.name == rule)
                .map(|candidate| candidate.skip)
                .ok_or_else(|| LexError::UnknownRule {
                    rule: rule.to_string(),
                })?;

            trace!("{rule} {text:?} at {line}:{column}");
            if !skip {
                lexemes.push(Lexeme {
                    rule,
                    text,
                    span: Span {
                        start,
                        end,
                        line,
                        column,
                    },
                });
            }

            for c in text.chars() {
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }
            index += length;
        }

        Ok(lexemes)
    }

    /// Length in characters and value of the longest non-empty prefix of
    /// `input` matched by any rule.
    fn longest_match(&self, input: &[(usize, char)]) -> LexResult<Option<(usize, Val)>> {
        let mut steps: Vec<Step> = Vec::new();
        let mut current = self.combined.clone();
        let mut accepted = None;

        for &(_, character) in input {
            let Simplified {
                pattern,
                reconstruct,
            } = simplify(&derivative(character, &current));
            let previous = std::mem::replace(&mut current, pattern);
            steps.push(Step {
                pattern: previous,
                character,
                reconstruct,
            });
            if current == Rexp::Null {
                break;
            }
            if nullable(&current) {
                accepted = Some(steps.len());
            }
        }

        let Some(length) = accepted else {
            return Ok(None);
        };
        let end_pattern = match steps.get(length) {
            Some(step) => step.pattern.clone(),
            None => current,
        };
        steps.truncate(length);

        let mut value = mkeps(&end_pattern)?;
        for step in steps.into_iter().rev() {
            value = inject(&step.pattern, step.character, (step.reconstruct)(value)?)?;
        }
        Ok(Some((length, value)))
    }
}

/// Follows the alternation path of a combined-pattern value down to the
/// tagged rule that matched.
fn rule_of(value: Val) -> LexResult<(Arc<str>, Val)> {
    let mut value = value;
    loop {
        match value {
            Val::Left(inner) | Val::Right(inner) => value = *inner,
            Val::Tagged(rule, inner) => return Ok((rule, *inner)),
            other => return Err(ValueError::shape("tagged rule", &other).into()),
        }
    }
}

static WHILE_LEXER: LazyLock<Lexer> = LazyLock::new(|| Lexer::new(rules::while_rules()));

/// Tokenizes While source, ending with an `EOF` token.
pub fn tokenize(source: &str) -> LexResult<Vec<Token<'_>>> {
    let lexemes = WHILE_LEXER.lexemes(source)?;
    let mut tokens = Vec::with_capacity(lexemes.len() + 1);
    for lexeme in lexemes {
        tokens.push(Token::new(classify(&lexeme)?, lexeme.span));
    }
    let (line, column) = end_position(source);
    tokens.push(Token::new(
        TokenKind::EOF,
        Span {
            start: source.len(),
            end: source.len(),
            line,
            column,
        },
    ));
    debug!("tokenized {} bytes into {} tokens", source.len(), tokens.len());
    Ok(tokens)
}

/// Line and column just past the last character of `source`.
fn end_position(source: &str) -> (usize, usize) {
    let line = 1 + source.matches('\n').count();
    let last_line = source.rsplit('\n').next().unwrap_or(source);
    (line, 1 + last_line.chars().count())
}

fn classify<'a>(lexeme: &Lexeme<'a>) -> LexResult<TokenKind<'a>> {
    let text = lexeme.text;
    let unknown = || LexError::UnknownRule {
        rule: lexeme.rule.to_string(),
    };
    match &*lexeme.rule {
        rules::KEYWORD => TokenKind::keyword(text).ok_or_else(unknown),
        rules::IDENTIFIER => Ok(TokenKind::Identifier(text)),
        rules::NUMBER => text
            .parse::<i32>()
            .map(TokenKind::Integer)
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: text.to_string(),
                position: lexeme.span.start,
            }),
        rules::STRING => Ok(TokenKind::String(&text[1..text.len() - 1])),
        rules::OPERATOR | rules::PAREN | rules::SEMICOLON => {
            TokenKind::symbol(text).ok_or_else(unknown)
        }
        _ => Err(unknown()),
    }
}

/// Decodes the escapes of a string literal body.
pub fn unescape(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some(other) => decoded.push(other),
            None => decoded.push('\\'),
        }
    }
    decoded
}
