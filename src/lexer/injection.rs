//! Building match values backwards from the end of a match.
//!
//! `mkeps` says how a nullable pattern matches the empty string, and
//! `inject` undoes one derivative step by putting the consumed character back
//! into a value.

use crate::rexp::{Rexp, Val, ValueError, nullable};

/// How `r` matches the empty string. Alternations prefer their left side,
/// which is what gives earlier lexer rules priority on equal-length matches.
pub fn mkeps(r: &Rexp) -> Result<Val, ValueError> {
    match r {
        Rexp::Empty => Ok(Val::Void),
        Rexp::Alt(r1, r2) => {
            if nullable(r1) {
                Ok(Val::left(mkeps(r1)?))
            } else {
                Ok(Val::right(mkeps(r2)?))
            }
        }
        Rexp::Seq(r1, r2) => Ok(Val::seq(mkeps(r1)?, mkeps(r2)?)),
        Rexp::Star(_) | Rexp::Opt(_) | Rexp::Not(_) => Ok(Val::Stars(Vec::new())),
        Rexp::Plus(inner) => Ok(Val::Stars(vec![mkeps(inner)?])),
        Rexp::Ntimes(_, 0) | Rexp::Range(_, 0, _) => Ok(Val::Stars(Vec::new())),
        Rexp::Ntimes(inner, n) | Rexp::Range(inner, n, _) => {
            let once = mkeps(inner)?;
            Ok(Val::Stars(vec![once; *n]))
        }
        Rexp::Tagged(name, inner) => Ok(Val::tagged(name.clone(), mkeps(inner)?)),
        Rexp::Null | Rexp::Char(_) | Rexp::CharSet(_) | Rexp::NoneOf(_) => Err(ValueError::NotNullable {
            pattern: r.to_string(),
        }),
    }
}

/// Turns a value for `derivative(c, r)` into a value for `r` that also
/// accounts for `c`.
pub fn inject(r: &Rexp, c: char, v: Val) -> Result<Val, ValueError> {
    match r {
        Rexp::Star(inner) | Rexp::Plus(inner) | Rexp::Ntimes(inner, _) | Rexp::Range(inner, _, _) => {
            let (head, tail) = match v {
                Val::Seq(head, tail) => (head, tail),
                other => return Err(ValueError::shape("repetition step", &other)),
            };
            match *tail {
                Val::Stars(mut rest) => {
                    rest.insert(0, inject(inner, c, *head)?);
                    Ok(Val::Stars(rest))
                }
                other => Err(ValueError::shape("repetition", &other)),
            }
        }
        Rexp::Opt(inner) => Ok(Val::Stars(vec![inject(inner, c, v)?])),
        Rexp::Seq(r1, r2) => match v {
            Val::Seq(v1, v2) => Ok(Val::seq(inject(r1, c, *v1)?, *v2)),
            Val::Left(inner) => match *inner {
                Val::Seq(v1, v2) => Ok(Val::seq(inject(r1, c, *v1)?, *v2)),
                other => Err(ValueError::shape("sequence", &other)),
            },
            Val::Right(v2) => Ok(Val::seq(mkeps(r1)?, inject(r2, c, *v2)?)),
            other => Err(ValueError::shape("sequence", &other)),
        },
        Rexp::Alt(r1, r2) => match v {
            Val::Left(v1) => Ok(Val::left(inject(r1, c, *v1)?)),
            Val::Right(v2) => Ok(Val::right(inject(r2, c, *v2)?)),
            other => Err(ValueError::shape("alternative", &other)),
        },
        Rexp::Char(_) | Rexp::CharSet(_) | Rexp::NoneOf(_) => match v {
            Val::Void => Ok(Val::Char(c)),
            other => Err(ValueError::shape("character", &other)),
        },
        Rexp::Not(_) => match v {
            Val::Stars(mut chars) => {
                chars.insert(0, Val::Char(c));
                Ok(Val::Stars(chars))
            }
            other => Err(ValueError::shape("complement", &other)),
        },
        Rexp::Tagged(name, inner) => Ok(Val::tagged(name.clone(), inject(inner, c, v)?)),
        Rexp::Null | Rexp::Empty => Err(ValueError::shape("non-empty", &v)),
    }
}
