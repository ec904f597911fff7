use log::debug;
use thiserror::Error;

use crate::ast::{AExp, ArithOp, Assignment, BExp, Block, CompareOp, Program, Stmt};
use crate::lexer::unescape;
use crate::token::{Token, TokenKind};

pub mod combinators;

use combinators::{Items, alt, chain_left, map, opt, resolve, satisfy, sep_by1, seq};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected {found} at line {line}, column {column}")]
    UnexpectedToken {
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Cannot parse an empty token stream")]
    NoParse,
}

type Tokens<'a> = &'a [Token<'a>];
type Results<'a, T> = Vec<(T, Tokens<'a>)>;

/// Parses a token stream ending in `EOF` into a program. The first
/// derivation that consumes every token wins.
pub fn parse_tokens(tokens: &[Token<'_>]) -> Result<Program, ParseError> {
    match resolve(program(tokens)) {
        Some(statements) => {
            debug!("parsed {} top-level statements", statements.len());
            Ok(Program { statements })
        }
        None => Err(unexpected_token(tokens)),
    }
}

/// Reports the token right after the longest statement prefix that parses.
fn unexpected_token(tokens: Tokens<'_>) -> ParseError {
    let furthest = statement_prefix(tokens)
        .into_iter()
        .map(|(_, rest)| rest)
        .min_by_key(|rest| rest.len())
        .unwrap_or(tokens);
    match furthest.first() {
        Some(token) => ParseError::UnexpectedToken {
            found: token.kind.to_string(),
            line: token.span.line,
            column: token.span.column,
        },
        None => ParseError::NoParse,
    }
}

fn punct<'a>(kind: TokenKind<'static>) -> impl Fn(Tokens<'a>) -> Results<'a, ()> + Copy {
    move |tokens: Tokens<'a>| match tokens.split_first() {
        Some((token, rest)) if token.kind == kind => vec![((), rest)],
        _ => Vec::new(),
    }
}

fn identifier<'a>(tokens: Tokens<'a>) -> Results<'a, String> {
    satisfy(|token: &Token<'a>| match token.kind {
        TokenKind::Identifier(name) => Some(name.to_string()),
        _ => None,
    })(tokens)
}

fn number<'a>(tokens: Tokens<'a>) -> Results<'a, i32> {
    satisfy(|token: &Token<'a>| match token.kind {
        TokenKind::Integer(value) => Some(value),
        _ => None,
    })(tokens)
}

fn string<'a>(tokens: Tokens<'a>) -> Results<'a, String> {
    satisfy(|token: &Token<'a>| match token.kind {
        TokenKind::String(raw) => Some(unescape(raw)),
        _ => None,
    })(tokens)
}

fn program<'a>(tokens: Tokens<'a>) -> Results<'a, Block> {
    map(seq(statement_prefix, punct(TokenKind::EOF)), |(statements, _)| {
        statements.to_vec()
    })(tokens)
}

/// Optional statements with an optional trailing semicolon. Stays a shared
/// list until a closing token confirms it.
fn statement_prefix<'a>(tokens: Tokens<'a>) -> Results<'a, Items<Stmt>> {
    map(
        seq(opt(statements), opt(punct(TokenKind::Semicolon))),
        |(statements, _)| statements.unwrap_or_default(),
    )(tokens)
}

fn statements<'a>(tokens: Tokens<'a>) -> Results<'a, Items<Stmt>> {
    sep_by1(stmt, punct(TokenKind::Semicolon))(tokens)
}

fn block<'a>(tokens: Tokens<'a>) -> Results<'a, Block> {
    alt(
        map(
            seq(seq(punct(TokenKind::LBrace), statement_prefix), punct(TokenKind::RBrace)),
            |((_, statements), _)| statements.to_vec(),
        ),
        map(stmt, |statement| vec![statement]),
    )(tokens)
}

fn stmt<'a>(tokens: Tokens<'a>) -> Results<'a, Stmt> {
    alt(
        alt(
            alt(map(punct(TokenKind::Skip), |_| Stmt::Skip), map(assignment, Stmt::Assign)),
            alt(if_stmt, while_stmt),
        ),
        alt(alt(for_stmt, read_stmt), write_stmt),
    )(tokens)
}

fn assignment<'a>(tokens: Tokens<'a>) -> Results<'a, Assignment> {
    map(
        seq(seq(identifier, punct(TokenKind::Assign)), aexp),
        |((name, _), value)| Assignment { name, value },
    )(tokens)
}

fn if_stmt<'a>(tokens: Tokens<'a>) -> Results<'a, Stmt> {
    let else_branch = map(seq(punct(TokenKind::Else), block), |(_, block)| block);
    map(
        seq(
            seq(
                seq(seq(punct(TokenKind::If), bexp), punct(TokenKind::Then)),
                block,
            ),
            opt(else_branch),
        ),
        |((((_, condition), _), then_block), else_block)| Stmt::If {
            condition,
            then_block,
            else_block: else_block.unwrap_or_default(),
        },
    )(tokens)
}

fn while_stmt<'a>(tokens: Tokens<'a>) -> Results<'a, Stmt> {
    map(
        seq(
            seq(seq(punct(TokenKind::While), bexp), opt(punct(TokenKind::Do))),
            block,
        ),
        |(((_, condition), _), body)| Stmt::While { condition, body },
    )(tokens)
}

fn for_stmt<'a>(tokens: Tokens<'a>) -> Results<'a, Stmt> {
    map(
        seq(
            seq(
                seq(
                    seq(seq(punct(TokenKind::For), assignment), punct(TokenKind::To)),
                    aexp,
                ),
                opt(punct(TokenKind::Do)),
            ),
            block,
        ),
        |(((((_, init), _), bound), _), body)| Stmt::For { init, bound, body },
    )(tokens)
}

fn read_stmt<'a>(tokens: Tokens<'a>) -> Results<'a, Stmt> {
    let parenthesized = map(
        seq(seq(punct(TokenKind::LParen), identifier), punct(TokenKind::RParen)),
        |((_, name), _)| name,
    );
    map(
        seq(punct(TokenKind::Read), alt(identifier, parenthesized)),
        |(_, name)| Stmt::Read(name),
    )(tokens)
}

fn write_stmt<'a>(tokens: Tokens<'a>) -> Results<'a, Stmt> {
    map(
        seq(
            punct(TokenKind::Write),
            alt(map(string, Stmt::WriteLiteral), map(aexp, Stmt::Write)),
        ),
        |(_, statement)| statement,
    )(tokens)
}

fn aexp<'a>(tokens: Tokens<'a>) -> Results<'a, AExp> {
    let additive = satisfy(|token: &Token<'a>| match token.kind {
        TokenKind::Plus => Some(ArithOp::Add),
        TokenKind::Minus => Some(ArithOp::Sub),
        _ => None,
    });
    chain_left(term, additive, |left, op, right| AExp::aop(op, left, right))(tokens)
}

fn term<'a>(tokens: Tokens<'a>) -> Results<'a, AExp> {
    let multiplicative = satisfy(|token: &Token<'a>| match token.kind {
        TokenKind::Star => Some(ArithOp::Mul),
        TokenKind::Slash => Some(ArithOp::Div),
        _ => None,
    });
    chain_left(factor, multiplicative, |left, op, right| {
        AExp::aop(op, left, right)
    })(tokens)
}

fn factor<'a>(tokens: Tokens<'a>) -> Results<'a, AExp> {
    alt(
        map(
            seq(seq(punct(TokenKind::LParen), aexp), punct(TokenKind::RParen)),
            |((_, inner), _)| inner,
        ),
        alt(map(identifier, AExp::Var), map(number, AExp::Num)),
    )(tokens)
}

fn bexp<'a>(tokens: Tokens<'a>) -> Results<'a, BExp> {
    let comparison = satisfy(|token: &Token<'a>| match token.kind {
        TokenKind::Equal => Some(CompareOp::Equal),
        TokenKind::NotEqual => Some(CompareOp::NotEqual),
        TokenKind::Less => Some(CompareOp::Less),
        TokenKind::Greater => Some(CompareOp::Greater),
        _ => None,
    });
    alt(
        alt(
            map(punct(TokenKind::True), |_| BExp::True),
            map(punct(TokenKind::False), |_| BExp::False),
        ),
        alt(
            map(seq(seq(aexp, comparison), aexp), |((left, op), right)| {
                BExp::bop(op, left, right)
            }),
            map(
                seq(seq(punct(TokenKind::LParen), bexp), punct(TokenKind::RParen)),
                |((_, inner), _)| inner,
            ),
        ),
    )(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use indoc::indoc;
    use std::time::{Duration, Instant};

    fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = tokenize(source).expect("tokenize should succeed");
        parse_tokens(&tokens)
    }

    fn statements(source: &str) -> Block {
        parse(source).expect("parse should succeed").statements
    }

    #[test]
    fn parses_assignment_and_write() {
        assert_eq!(
            statements("x := 5; write x"),
            vec![
                Stmt::Assign(Assignment::new("x", AExp::num(5))),
                Stmt::Write(AExp::var("x")),
            ]
        );
    }

    #[test]
    fn arithmetic_is_left_associative_with_precedence() {
        assert_eq!(
            statements("x := 10 - 3 - 2 * y / 4"),
            vec![Stmt::Assign(Assignment::new(
                "x",
                AExp::aop(
                    ArithOp::Sub,
                    AExp::aop(ArithOp::Sub, AExp::num(10), AExp::num(3)),
                    AExp::aop(
                        ArithOp::Div,
                        AExp::aop(ArithOp::Mul, AExp::num(2), AExp::var("y")),
                        AExp::num(4),
                    ),
                ),
            ))]
        );
    }

    #[test]
    fn parses_while_with_and_without_do() {
        let expected = vec![Stmt::While {
            condition: BExp::bop(CompareOp::Less, AExp::var("x"), AExp::num(3)),
            body: vec![Stmt::Assign(Assignment::new(
                "x",
                AExp::aop(ArithOp::Add, AExp::var("x"), AExp::num(1)),
            ))],
        }];
        assert_eq!(statements("while x < 3 do { x := x + 1 }"), expected);
        assert_eq!(statements("while (x < 3) x := x + 1"), expected);
    }

    #[test]
    fn parses_if_with_optional_else() {
        let source = indoc! {r#"
            if n == 0 then { write "zero" } else { write "other"; skip };
            if true then skip
        "#};
        assert_eq!(
            statements(source),
            vec![
                Stmt::If {
                    condition: BExp::bop(CompareOp::Equal, AExp::var("n"), AExp::num(0)),
                    then_block: vec![Stmt::WriteLiteral("zero".to_string())],
                    else_block: vec![Stmt::WriteLiteral("other".to_string()), Stmt::Skip],
                },
                Stmt::If {
                    condition: BExp::True,
                    then_block: vec![Stmt::Skip],
                    else_block: vec![],
                },
            ]
        );
    }

    #[test]
    fn parses_for_and_read() {
        let source = indoc! {"
            read n;
            for i := 0 to n do {
                write i
            }
        "};
        assert_eq!(
            statements(source),
            vec![
                Stmt::Read("n".to_string()),
                Stmt::For {
                    init: Assignment::new("i", AExp::num(0)),
                    bound: AExp::var("n"),
                    body: vec![Stmt::Write(AExp::var("i"))],
                },
            ]
        );
        assert_eq!(statements("read(n)"), vec![Stmt::Read("n".to_string())]);
    }

    #[test]
    fn decodes_string_escapes() {
        assert_eq!(
            statements(r#"write "a\tb\n""#),
            vec![Stmt::WriteLiteral("a\tb\n".to_string())]
        );
    }

    #[test]
    fn accepts_empty_programs_and_trailing_semicolons() {
        assert_eq!(statements(""), vec![]);
        assert_eq!(statements("skip;"), vec![Stmt::Skip]);
        assert_eq!(
            statements("while true do { skip; }; skip;"),
            vec![
                Stmt::While {
                    condition: BExp::True,
                    body: vec![Stmt::Skip],
                },
                Stmt::Skip,
            ]
        );
    }

    #[test]
    fn reports_the_first_unparsed_token() {
        let err = parse("x := 1; y := ; write y").expect_err("expected parse failure");
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                found: "identifier 'y'".to_string(),
                line: 1,
                column: 9,
            }
        );
        assert!(err.to_string().contains("line 1, column 9"));
    }

    #[test]
    fn rejects_missing_separator() {
        let err = parse("x := 1 y := 2").expect_err("expected parse failure");
        assert!(matches!(err, ParseError::UnexpectedToken { ref found, .. } if found == "identifier 'y'"));
    }

    #[test]
    fn long_programs_parse_in_linear_time() {
        let source: String = (0..3000).map(|i| format!("x{i} := {i};\n")).collect();
        let tokens = tokenize(&source).expect("tokenize should succeed");
        let started = Instant::now();
        let program = parse_tokens(&tokens).expect("parse should succeed");
        assert_eq!(program.statements.len(), 3000);
        assert_eq!(
            program.statements[2999],
            Stmt::Assign(Assignment::new("x2999", AExp::num(2999)))
        );

        let terms = vec!["1"; 2000].join(" + ");
        let source = format!("x := {terms}");
        let tokens = tokenize(&source).expect("tokenize should succeed");
        let program = parse_tokens(&tokens).expect("parse should succeed");
        let elapsed = started.elapsed();

        let mut depth = 0;
        let Stmt::Assign(Assignment { value, .. }) = &program.statements[0] else {
            panic!("expected an assignment");
        };
        let mut node: &AExp = value;
        while let AExp::Aop { left, .. } = node {
            depth += 1;
            node = left.as_ref();
        }
        assert_eq!(depth, 1999);
        assert!(elapsed < Duration::from_secs(5), "parsing took {elapsed:?}");
    }

    #[test]
    fn empty_token_stream_has_no_parse() {
        assert_eq!(parse_tokens(&[]), Err(ParseError::NoParse));
    }
}
