use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Records how a pattern matched a string: which side of each alternation
/// was taken and which characters each part consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Val {
    Void,
    Char(char),
    Seq(Box<Val>, Box<Val>),
    Left(Box<Val>),
    Right(Box<Val>),
    /// One value per iteration of a repetition.
    Stars(Vec<Val>),
    Tagged(Arc<str>, Box<Val>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Value {found} does not fit a {expected} pattern")]
    ShapeMismatch { expected: &'static str, found: String },

    #[error("Pattern {pattern} cannot match the empty string")]
    NotNullable { pattern: String },
}

impl ValueError {
    pub(crate) fn shape(expected: &'static str, found: &Val) -> Self {
        ValueError::ShapeMismatch {
            expected,
            found: found.to_string(),
        }
    }
}

impl Val {
    pub fn seq(v1: Val, v2: Val) -> Val {
        Val::Seq(Box::new(v1), Box::new(v2))
    }

    pub fn left(v: Val) -> Val {
        Val::Left(Box::new(v))
    }

    pub fn right(v: Val) -> Val {
        Val::Right(Box::new(v))
    }

    pub fn tagged(name: Arc<str>, v: Val) -> Val {
        Val::Tagged(name, Box::new(v))
    }

    /// The matched text, in order.
    pub fn flatten(&self) -> String {
        let mut text = String::new();
        let mut pending = vec![self];
        while let Some(value) = pending.pop() {
            match value {
                Val::Void => {}
                Val::Char(c) => text.push(*c),
                Val::Seq(v1, v2) => {
                    pending.push(v2);
                    pending.push(v1);
                }
                Val::Left(v) | Val::Right(v) | Val::Tagged(_, v) => pending.push(v),
                Val::Stars(vs) => pending.extend(vs.iter().rev()),
            }
        }
        text
    }

    /// Every tagged sub-match as `(tag, text)`, outermost first and left to
    /// right.
    pub fn env(&self) -> Vec<(Arc<str>, String)> {
        let mut found = Vec::new();
        let mut pending = vec![self];
        while let Some(value) = pending.pop() {
            match value {
                Val::Void | Val::Char(_) => {}
                Val::Seq(v1, v2) => {
                    pending.push(v2);
                    pending.push(v1);
                }
                Val::Left(v) | Val::Right(v) => pending.push(v),
                Val::Stars(vs) => pending.extend(vs.iter().rev()),
                Val::Tagged(name, v) => {
                    found.push((name.clone(), v.flatten()));
                    pending.push(v);
                }
            }
        }
        found
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Void => write!(f, "void"),
            Val::Char(c) => write!(f, "{c:?}"),
            Val::Seq(v1, v2) => write!(f, "seq({v1}, {v2})"),
            Val::Left(v) => write!(f, "left({v})"),
            Val::Right(v) => write!(f, "right({v})"),
            Val::Stars(vs) => {
                write!(f, "stars[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Val::Tagged(name, v) => write!(f, "{name}:{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_reads_characters_left_to_right() {
        let v = Val::seq(
            Val::left(Val::Char('a')),
            Val::Stars(vec![Val::Char('b'), Val::right(Val::Char('c')), Val::Void]),
        );
        assert_eq!(v.flatten(), "abc");
    }

    #[test]
    fn env_lists_nested_tags_outermost_first() {
        let inner = Val::tagged("digit".into(), Val::Char('7'));
        let v = Val::seq(
            Val::tagged("word".into(), Val::Stars(vec![Val::Char('x'), Val::Char('y')])),
            Val::tagged("number".into(), Val::Stars(vec![inner])),
        );
        let names: Vec<(String, String)> = v
            .env()
            .into_iter()
            .map(|(name, text)| (name.to_string(), text))
            .collect();
        assert_eq!(
            names,
            vec![
                ("word".to_string(), "xy".to_string()),
                ("number".to_string(), "7".to_string()),
                ("digit".to_string(), "7".to_string()),
            ]
        );
    }
}
