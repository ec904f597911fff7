//! Regular expressions over characters, matched with Brzozowski derivatives.
//!
//! Patterns are immutable trees. Children sit behind `Arc` so that taking a
//! derivative shares every untouched subtree with the pattern it came from,
//! and so a rule table can be built once and handed to any number of lexing
//! runs.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub mod simplify;
pub mod value;

pub use simplify::{Reconstruct, Simplified, simplify};
pub use value::{Val, ValueError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rexp {
    /// Matches nothing.
    Null,
    /// Matches only the empty string.
    Empty,
    Char(char),
    Alt(Arc<Rexp>, Arc<Rexp>),
    Seq(Arc<Rexp>, Arc<Rexp>),
    Star(Arc<Rexp>),
    /// Any single character from the set.
    CharSet(BTreeSet<char>),
    /// Any single character outside the set.
    NoneOf(BTreeSet<char>),
    Plus(Arc<Rexp>),
    Opt(Arc<Rexp>),
    /// Exactly `n` repetitions.
    Ntimes(Arc<Rexp>, usize),
    /// Between `n` and `m` repetitions.
    Range(Arc<Rexp>, usize, usize),
    /// Complement: every string the inner pattern does not match.
    Not(Arc<Rexp>),
    /// Records which named rule produced a match.
    Tagged(Arc<str>, Arc<Rexp>),
}

impl Rexp {
    /// Pattern matching exactly `text`.
    pub fn literal(text: &str) -> Rexp {
        let mut chars = text.chars().rev();
        let Some(last) = chars.next() else {
            return Rexp::Empty;
        };
        chars.fold(Rexp::Char(last), |tail, c| Rexp::seq(Rexp::Char(c), tail))
    }

    pub fn one_of(chars: impl IntoIterator<Item = char>) -> Rexp {
        Rexp::CharSet(chars.into_iter().collect())
    }

    pub fn none_of(chars: impl IntoIterator<Item = char>) -> Rexp {
        Rexp::NoneOf(chars.into_iter().collect())
    }

    pub fn alt(r1: Rexp, r2: Rexp) -> Rexp {
        Rexp::Alt(Arc::new(r1), Arc::new(r2))
    }

    pub fn seq(r1: Rexp, r2: Rexp) -> Rexp {
        Rexp::Seq(Arc::new(r1), Arc::new(r2))
    }

    pub fn star(r: Rexp) -> Rexp {
        Rexp::Star(Arc::new(r))
    }

    pub fn plus(r: Rexp) -> Rexp {
        Rexp::Plus(Arc::new(r))
    }

    pub fn opt(r: Rexp) -> Rexp {
        Rexp::Opt(Arc::new(r))
    }

    pub fn ntimes(r: Rexp, n: usize) -> Rexp {
        Rexp::Ntimes(Arc::new(r), n)
    }

    pub fn range(r: Rexp, n: usize, m: usize) -> Rexp {
        Rexp::Range(Arc::new(r), n, m)
    }

    pub fn not(r: Rexp) -> Rexp {
        Rexp::Not(Arc::new(r))
    }

    pub fn tagged(name: impl Into<Arc<str>>, r: Rexp) -> Rexp {
        Rexp::Tagged(name.into(), Arc::new(r))
    }

    /// Right-nested alternation. Earlier patterns end up further left, which
    /// is the side `mkeps` prefers. An empty list matches nothing.
    pub fn alts(patterns: impl IntoIterator<Item = Rexp>) -> Rexp {
        let patterns: Vec<Rexp> = patterns.into_iter().collect();
        let mut rev = patterns.into_iter().rev();
        let Some(last) = rev.next() else {
            return Rexp::Null;
        };
        rev.fold(last, |tail, r| Rexp::alt(r, tail))
    }

    /// Right-nested sequence. An empty list matches the empty string.
    pub fn seqs(patterns: impl IntoIterator<Item = Rexp>) -> Rexp {
        let patterns: Vec<Rexp> = patterns.into_iter().collect();
        let mut rev = patterns.into_iter().rev();
        let Some(last) = rev.next() else {
            return Rexp::Empty;
        };
        rev.fold(last, |tail, r| Rexp::seq(r, tail))
    }

    /// Number of nodes in the pattern tree.
    pub fn size(&self) -> usize {
        match self {
            Rexp::Null | Rexp::Empty | Rexp::Char(_) | Rexp::CharSet(_) | Rexp::NoneOf(_) => 1,
            Rexp::Alt(r1, r2) | Rexp::Seq(r1, r2) => 1 + r1.size() + r2.size(),
            Rexp::Star(r)
            | Rexp::Plus(r)
            | Rexp::Opt(r)
            | Rexp::Ntimes(r, _)
            | Rexp::Range(r, _, _)
            | Rexp::Not(r)
            | Rexp::Tagged(_, r) => 1 + r.size(),
        }
    }
}

/// True iff `r` matches the empty string.
pub fn nullable(r: &Rexp) -> bool {
    match r {
        Rexp::Null | Rexp::Char(_) | Rexp::CharSet(_) | Rexp::NoneOf(_) => false,
        Rexp::Empty | Rexp::Star(_) | Rexp::Opt(_) => true,
        Rexp::Alt(r1, r2) => nullable(r1) || nullable(r2),
        Rexp::Seq(r1, r2) => nullable(r1) && nullable(r2),
        Rexp::Plus(r) | Rexp::Tagged(_, r) => nullable(r),
        Rexp::Ntimes(r, n) => *n == 0 || nullable(r),
        Rexp::Range(r, n, _) => *n == 0 || nullable(r),
        Rexp::Not(r) => !nullable(r),
    }
}

/// Brzozowski derivative of `r` with respect to `c`: the pattern matching
/// every `s` such that `r` matches `c` followed by `s`.
pub fn derivative(c: char, r: &Rexp) -> Rexp {
    match r {
        Rexp::Null | Rexp::Empty => Rexp::Null,
        Rexp::Char(d) => {
            if *d == c {
                Rexp::Empty
            } else {
                Rexp::Null
            }
        }
        Rexp::CharSet(set) => {
            if set.contains(&c) {
                Rexp::Empty
            } else {
                Rexp::Null
            }
        }
        Rexp::NoneOf(set) => {
            if set.contains(&c) {
                Rexp::Null
            } else {
                Rexp::Empty
            }
        }
        Rexp::Alt(r1, r2) => Rexp::alt(derivative(c, r1), derivative(c, r2)),
        Rexp::Seq(r1, r2) => {
            let head = Rexp::Seq(Arc::new(derivative(c, r1)), r2.clone());
            if nullable(r1) {
                Rexp::alt(head, derivative(c, r2))
            } else {
                head
            }
        }
        Rexp::Star(inner) => Rexp::Seq(Arc::new(derivative(c, inner)), Arc::new(r.clone())),
        Rexp::Plus(inner) => Rexp::Seq(
            Arc::new(derivative(c, inner)),
            Arc::new(Rexp::Star(inner.clone())),
        ),
        Rexp::Opt(inner) => derivative(c, inner),
        Rexp::Ntimes(inner, n) => {
            if *n == 0 {
                Rexp::Null
            } else {
                Rexp::Seq(
                    Arc::new(derivative(c, inner)),
                    Arc::new(Rexp::Ntimes(inner.clone(), n - 1)),
                )
            }
        }
        Rexp::Range(inner, n, m) => {
            if *m == 0 {
                Rexp::Null
            } else {
                Rexp::Seq(
                    Arc::new(derivative(c, inner)),
                    Arc::new(Rexp::Range(inner.clone(), n.saturating_sub(1), m - 1)),
                )
            }
        }
        Rexp::Not(inner) => Rexp::not(derivative(c, inner)),
        // The tag only matters for the outermost pattern; `inject` puts it back.
        Rexp::Tagged(_, inner) => derivative(c, inner),
    }
}

/// Derivative of `r` with respect to every character of `s`, simplifying
/// after each step.
pub fn derivatives(s: &str, r: &Rexp) -> Rexp {
    let mut current = r.clone();
    for c in s.chars() {
        current = simplify(&derivative(c, &current)).pattern;
        if current == Rexp::Null {
            break;
        }
    }
    current
}

pub fn matches(r: &Rexp, s: &str) -> bool {
    nullable(&derivatives(s, r))
}

impl fmt::Display for Rexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rexp::Null => write!(f, "∅"),
            Rexp::Empty => write!(f, "ε"),
            Rexp::Char(c) => write!(f, "{}", c.escape_debug()),
            Rexp::Alt(r1, r2) => write!(f, "({r1}|{r2})"),
            Rexp::Seq(r1, r2) => write!(f, "({r1}{r2})"),
            Rexp::Star(r) => write!(f, "{r}*"),
            Rexp::CharSet(set) => {
                write!(f, "[")?;
                for c in set {
                    write!(f, "{}", c.escape_debug())?;
                }
                write!(f, "]")
            }
            Rexp::NoneOf(set) => {
                write!(f, "[^")?;
                for c in set {
                    write!(f, "{}", c.escape_debug())?;
                }
                write!(f, "]")
            }
            Rexp::Plus(r) => write!(f, "{r}+"),
            Rexp::Opt(r) => write!(f, "{r}?"),
            Rexp::Ntimes(r, n) => write!(f, "{r}{{{n}}}"),
            Rexp::Range(r, n, m) => write!(f, "{r}{{{n},{m}}}"),
            Rexp::Not(r) => write!(f, "!{r}"),
            Rexp::Tagged(name, r) => write!(f, "<{name}>{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits() -> Rexp {
        Rexp::one_of('0'..='9')
    }

    fn identifier() -> Rexp {
        Rexp::seq(
            Rexp::one_of('a'..='z'),
            Rexp::star(Rexp::one_of(('a'..='z').chain('0'..='9'))),
        )
    }

    #[test]
    fn literal_matches_only_itself() {
        let r = Rexp::literal("while");
        assert!(matches(&r, "while"));
        assert!(!matches(&r, "whil"));
        assert!(!matches(&r, "whiles"));
        assert_eq!(Rexp::literal(""), Rexp::Empty);
    }

    #[test]
    fn nullable_agrees_with_matching_the_empty_string() {
        let patterns = [
            Rexp::Null,
            Rexp::Empty,
            Rexp::Char('a'),
            Rexp::star(Rexp::Char('a')),
            Rexp::plus(Rexp::Char('a')),
            Rexp::plus(Rexp::star(Rexp::Char('a'))),
            Rexp::opt(Rexp::Char('a')),
            Rexp::ntimes(Rexp::Char('a'), 0),
            Rexp::ntimes(Rexp::Char('a'), 2),
            Rexp::range(Rexp::Char('a'), 0, 3),
            Rexp::range(Rexp::Char('a'), 1, 3),
            Rexp::not(Rexp::Char('a')),
            Rexp::not(Rexp::Empty),
            Rexp::tagged("t", Rexp::opt(Rexp::Char('a'))),
            Rexp::seq(Rexp::opt(Rexp::Char('a')), Rexp::star(Rexp::Char('b'))),
        ];
        for r in &patterns {
            assert_eq!(matches(r, ""), nullable(r), "pattern {r}");
        }
    }

    #[test]
    fn derivative_law_holds_on_samples() {
        let patterns = [
            identifier(),
            Rexp::plus(digits()),
            Rexp::seq(Rexp::opt(Rexp::Char('a')), Rexp::literal("ab")),
            Rexp::star(Rexp::alt(Rexp::literal("ab"), Rexp::Char('a'))),
            Rexp::ntimes(Rexp::Char('a'), 3),
            Rexp::range(Rexp::Char('a'), 2, 4),
            Rexp::not(Rexp::literal("ab")),
        ];
        let samples = ["", "a", "b", "ab", "aa", "aaa", "aab", "abab", "aaaa", "aaaaa", "x1", "12"];
        for r in &patterns {
            for s in samples {
                let mut chars = s.chars();
                let Some(c) = chars.next() else { continue };
                let rest = chars.as_str();
                assert_eq!(
                    matches(r, s),
                    matches(&derivative(c, r), rest),
                    "pattern {r} on {s:?}"
                );
            }
        }
    }

    #[test]
    fn none_of_matches_any_other_single_character() {
        let r = Rexp::none_of(['"', '\n']);
        assert!(matches(&r, "a"));
        assert!(matches(&r, "é"));
        assert!(matches(&r, "字"));
        assert!(!matches(&r, "\""));
        assert!(!matches(&r, "\n"));
        assert!(!matches(&r, ""));
        assert!(!matches(&r, "ab"));
        assert!(r.to_string().starts_with("[^"));
    }

    #[test]
    fn bounded_repetitions() {
        let exactly = Rexp::ntimes(Rexp::Char('a'), 3);
        assert!(matches(&exactly, "aaa"));
        assert!(!matches(&exactly, "aa"));
        assert!(!matches(&exactly, "aaaa"));

        let between = Rexp::range(Rexp::Char('a'), 2, 4);
        assert!(!matches(&between, "a"));
        assert!(matches(&between, "aa"));
        assert!(matches(&between, "aaaa"));
        assert!(!matches(&between, "aaaaa"));
    }

    #[test]
    fn complement_inverts_membership() {
        let r = Rexp::not(Rexp::literal("ab"));
        assert!(matches(&r, ""));
        assert!(matches(&r, "a"));
        assert!(!matches(&r, "ab"));
        assert!(matches(&r, "abc"));
    }

    #[test]
    fn simplified_derivatives_stay_small() {
        let r = Rexp::seq(identifier(), Rexp::opt(Rexp::Char(';')));
        let mut current = r.clone();
        for c in "abc123".chars().cycle().take(300) {
            current = simplify(&derivative(c, &current)).pattern;
        }
        assert!(nullable(&current));
        assert!(current.size() <= r.size(), "derivative grew to {}", current.size());
    }

    #[test]
    fn alts_and_seqs_fold_to_the_right() {
        assert_eq!(Rexp::alts([]), Rexp::Null);
        assert_eq!(Rexp::seqs([]), Rexp::Empty);
        assert_eq!(
            Rexp::alts([Rexp::Char('a'), Rexp::Char('b'), Rexp::Char('c')]),
            Rexp::alt(Rexp::Char('a'), Rexp::alt(Rexp::Char('b'), Rexp::Char('c')))
        );
        assert!(matches(
            &Rexp::seqs([Rexp::Char('a'), digits(), Rexp::Char('b')]),
            "a7b"
        ));
    }
}
