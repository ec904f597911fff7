use std::sync::Arc;

use super::Rexp;
use super::value::{Val, ValueError};

/// Maps a value for a simplified pattern back to a value for the pattern it
/// was simplified from.
pub type Reconstruct = Box<dyn Fn(Val) -> Result<Val, ValueError> + Send + Sync>;

pub struct Simplified {
    pub pattern: Rexp,
    pub reconstruct: Reconstruct,
}

impl Simplified {
    fn new(
        pattern: Rexp,
        reconstruct: impl Fn(Val) -> Result<Val, ValueError> + Send + Sync + 'static,
    ) -> Self {
        Simplified {
            pattern,
            reconstruct: Box::new(reconstruct),
        }
    }

    fn unchanged(pattern: Rexp) -> Self {
        Simplified::new(pattern, Ok)
    }
}

/// Removes `Null` alternatives, `Empty` sequence parts and duplicate
/// alternatives, returning the smaller pattern together with the function
/// that rebuilds values for the original one.
pub fn simplify(r: &Rexp) -> Simplified {
    match r {
        Rexp::Alt(r1, r2) => {
            let Simplified {
                pattern: p1,
                reconstruct: f1,
            } = simplify(r1);
            let Simplified {
                pattern: p2,
                reconstruct: f2,
            } = simplify(r2);
            if p1 == Rexp::Null {
                Simplified::new(p2, move |v| Ok(Val::right(f2(v)?)))
            } else if p2 == Rexp::Null || p1 == p2 {
                Simplified::new(p1, move |v| Ok(Val::left(f1(v)?)))
            } else {
                Simplified::new(Rexp::alt(p1, p2), move |v| match v {
                    Val::Left(v) => Ok(Val::left(f1(*v)?)),
                    Val::Right(v) => Ok(Val::right(f2(*v)?)),
                    other => Err(ValueError::shape("alternative", &other)),
                })
            }
        }
        Rexp::Seq(r1, r2) => {
            let Simplified {
                pattern: p1,
                reconstruct: f1,
            } = simplify(r1);
            let Simplified {
                pattern: p2,
                reconstruct: f2,
            } = simplify(r2);
            if p1 == Rexp::Null || p2 == Rexp::Null {
                Simplified::new(Rexp::Null, |v| Err(ValueError::shape("empty language", &v)))
            } else if p1 == Rexp::Empty {
                Simplified::new(p2, move |v| Ok(Val::seq(f1(Val::Void)?, f2(v)?)))
            } else if p2 == Rexp::Empty {
                Simplified::new(p1, move |v| Ok(Val::seq(f1(v)?, f2(Val::Void)?)))
            } else {
                Simplified::new(Rexp::seq(p1, p2), move |v| match v {
                    Val::Seq(v1, v2) => Ok(Val::seq(f1(*v1)?, f2(*v2)?)),
                    other => Err(ValueError::shape("sequence", &other)),
                })
            }
        }
        Rexp::Tagged(name, inner) => {
            let Simplified {
                pattern,
                reconstruct,
            } = simplify(inner);
            Simplified::new(
                Rexp::Tagged(name.clone(), Arc::new(pattern)),
                move |v| match v {
                    Val::Tagged(name, v) => Ok(Val::Tagged(name, Box::new(reconstruct(*v)?))),
                    other => Err(ValueError::shape("tagged", &other)),
                },
            )
        }
        // A complement's value is the list of characters it consumed, which
        // does not depend on the shape of the inner pattern.
        Rexp::Not(inner) => Simplified::unchanged(Rexp::not(simplify(inner).pattern)),
        _ => Simplified::unchanged(r.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rexp::{derivative, matches, nullable};

    #[test]
    fn drops_null_alternatives_and_rebuilds_the_side() {
        let r = Rexp::alt(Rexp::Null, Rexp::Char('a'));
        let simplified = simplify(&r);
        assert_eq!(simplified.pattern, Rexp::Char('a'));
        assert_eq!(
            (simplified.reconstruct)(Val::Char('a')),
            Ok(Val::right(Val::Char('a')))
        );
    }

    #[test]
    fn collapses_duplicate_alternatives_to_the_left() {
        let r = Rexp::alt(Rexp::Char('a'), Rexp::Char('a'));
        let simplified = simplify(&r);
        assert_eq!(simplified.pattern, Rexp::Char('a'));
        assert_eq!(
            (simplified.reconstruct)(Val::Char('a')),
            Ok(Val::left(Val::Char('a')))
        );
    }

    #[test]
    fn removes_empty_sequence_parts() {
        let r = Rexp::seq(Rexp::Empty, Rexp::seq(Rexp::Char('a'), Rexp::Empty));
        let simplified = simplify(&r);
        assert_eq!(simplified.pattern, Rexp::Char('a'));
        assert_eq!(
            (simplified.reconstruct)(Val::Char('a')),
            Ok(Val::seq(Val::Void, Val::seq(Val::Char('a'), Val::Void)))
        );
    }

    #[test]
    fn null_sequence_part_makes_the_whole_sequence_null() {
        let r = Rexp::seq(Rexp::star(Rexp::Char('a')), Rexp::Null);
        assert_eq!(simplify(&r).pattern, Rexp::Null);
    }

    #[test]
    fn keeps_tags_around_simplified_children() {
        let r = Rexp::tagged("t", Rexp::alt(Rexp::Null, Rexp::Char('x')));
        let simplified = simplify(&r);
        assert_eq!(simplified.pattern, Rexp::tagged("t", Rexp::Char('x')));
        assert_eq!(
            (simplified.reconstruct)(Val::tagged("t".into(), Val::Char('x'))),
            Ok(Val::tagged("t".into(), Val::right(Val::Char('x'))))
        );
    }

    #[test]
    fn rejects_values_of_the_wrong_shape() {
        let r = Rexp::alt(Rexp::Char('a'), Rexp::Char('b'));
        let simplified = simplify(&r);
        assert!(matches!(
            (simplified.reconstruct)(Val::Void),
            Err(ValueError::ShapeMismatch { expected: "alternative", .. })
        ));
    }

    #[test]
    fn preserves_the_language_of_derivatives() {
        let r = Rexp::seq(
            Rexp::star(Rexp::alt(Rexp::Char('a'), Rexp::Char('b'))),
            Rexp::literal("ab"),
        );
        let samples = ["", "b", "ab", "bab", "aab", "abb", "ba"];
        for c in ['a', 'b'] {
            let raw = derivative(c, &r);
            let simplified = simplify(&raw).pattern;
            assert!(simplified.size() <= raw.size());
            assert_eq!(nullable(&raw), nullable(&simplified));
            for s in samples {
                assert_eq!(matches(&raw, s), matches(&simplified, s), "{c} then {s:?}");
            }
        }
    }
}
