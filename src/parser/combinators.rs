//! Backtracking parser combinators that return every way of parsing a prefix.
//!
//! A parser maps an input to a list of `(value, remainder)` pairs, one per
//! successful parse, in the order the alternatives were declared. An empty
//! list means failure.

use std::fmt;
use std::rc::Rc;

/// Inputs the combinators can consume: token slices and strings.
pub trait Input: Copy {
    fn remaining(&self) -> usize;

    fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

impl<T> Input for &[T] {
    fn remaining(&self) -> usize {
        self.len()
    }
}

impl Input for &str {
    fn remaining(&self) -> usize {
        self.len()
    }
}

pub trait Parser<I: Input, T> {
    fn parse(&self, input: I) -> Vec<(T, I)>;
}

impl<I: Input, T, F> Parser<I, T> for F
where
    F: Fn(I) -> Vec<(T, I)>,
{
    fn parse(&self, input: I) -> Vec<(T, I)> {
        self(input)
    }
}

/// Results of `p` followed by results of `q`.
pub fn alt<I, T>(p: impl Parser<I, T>, q: impl Parser<I, T>) -> impl Fn(I) -> Vec<(T, I)>
where
    I: Input,
{
    move |input: I| {
        let mut results = p.parse(input);
        results.extend(q.parse(input));
        results
    }
}

/// Every result of `p` paired with every result of `q` on its remainder.
pub fn seq<I, T, S>(p: impl Parser<I, T>, q: impl Parser<I, S>) -> impl Fn(I) -> Vec<((T, S), I)>
where
    I: Input,
    T: Clone,
{
    move |input: I| {
        let mut results = Vec::new();
        for (first, rest) in p.parse(input) {
            for (second, remainder) in q.parse(rest) {
                results.push(((first.clone(), second), remainder));
            }
        }
        results
    }
}

pub fn map<I, T, S>(p: impl Parser<I, T>, f: impl Fn(T) -> S) -> impl Fn(I) -> Vec<(S, I)>
where
    I: Input,
{
    move |input: I| {
        p.parse(input)
            .into_iter()
            .map(|(value, rest)| (f(value), rest))
            .collect()
    }
}

/// `p` if it applies, then the empty parse.
pub fn opt<I, T>(p: impl Parser<I, T>) -> impl Fn(I) -> Vec<(Option<T>, I)>
where
    I: Input,
{
    move |input: I| {
        let mut results: Vec<(Option<T>, I)> = p
            .parse(input)
            .into_iter()
            .map(|(value, rest)| (Some(value), rest))
            .collect();
        results.push((None, input));
        results
    }
}

/// Items collected by a repetition. Extending a list shares the prefix it
/// grew from, so every partial repetition costs one node.
pub struct Items<T> {
    last: Option<Rc<Node<T>>>,
    len: usize,
}

struct Node<T> {
    value: T,
    prev: Option<Rc<Node<T>>>,
}

impl<T> Items<T> {
    pub fn new() -> Self {
        Self { last: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A new list with `value` appended; `self` is left untouched.
    pub fn push(&self, value: T) -> Self {
        Self {
            last: Some(Rc::new(Node {
                value,
                prev: self.last.clone(),
            })),
            len: self.len + 1,
        }
    }
}

impl<T: Clone> Items<T> {
    pub fn to_vec(&self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        let mut node = self.last.as_deref();
        while let Some(current) = node {
            values.push(current.value.clone());
            node = current.prev.as_deref();
        }
        values.reverse();
        values
    }
}

impl<T> Clone for Items<T> {
    fn clone(&self) -> Self {
        Self {
            last: self.last.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for Items<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Items<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

// Unlinks nodes one at a time; long lists would otherwise drop recursively.
impl<T> Drop for Items<T> {
    fn drop(&mut self) {
        let mut next = self.last.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.prev.take(),
                Err(_) => break,
            }
        }
    }
}

/// Extends every seed with as many parses of `step` as apply, keeping each
/// level of partial results. Longest first.
fn repeat<I, T>(step: &impl Parser<I, T>, seeds: Vec<(Items<T>, I)>) -> Vec<(Items<T>, I)>
where
    I: Input,
{
    let mut levels = vec![seeds];
    loop {
        let mut next = Vec::new();
        if let Some(frontier) = levels.last() {
            for (items, rest) in frontier {
                for (item, remainder) in step.parse(*rest) {
                    if remainder.remaining() >= rest.remaining() {
                        continue;
                    }
                    next.push((items.push(item), remainder));
                }
            }
        }
        if next.is_empty() {
            break;
        }
        levels.push(next);
    }
    levels.into_iter().rev().flatten().collect()
}

/// Zero or more repetitions of `p`, longest first. Parses of `p` that
/// consume nothing are ignored so the repetition always terminates.
pub fn many<I, T>(p: impl Parser<I, T>) -> impl Fn(I) -> Vec<(Items<T>, I)>
where
    I: Input,
{
    move |input: I| repeat(&p, vec![(Items::new(), input)])
}

/// One or more `p` separated by `sep`, longest first.
pub fn sep_by1<I, T, U>(p: impl Parser<I, T>, sep: impl Parser<I, U>) -> impl Fn(I) -> Vec<(Items<T>, I)>
where
    I: Input,
{
    move |input: I| {
        let seeds = p
            .parse(input)
            .into_iter()
            .map(|(item, rest)| (Items::new().push(item), rest))
            .collect();
        let step = |input: I| {
            let mut results = Vec::new();
            for (_, rest) in sep.parse(input) {
                results.extend(p.parse(rest));
            }
            results
        };
        repeat(&step, seeds)
    }
}

/// Left-associative chain: `p (op p)*` folded with `combine`, longest first.
/// Each level folds one more operand onto the previous level's values.
pub fn chain_left<I, T, O>(
    p: impl Parser<I, T>,
    op: impl Parser<I, O>,
    combine: impl Fn(T, O, T) -> T,
) -> impl Fn(I) -> Vec<(T, I)>
where
    I: Input,
    T: Clone,
    O: Clone,
{
    move |input: I| {
        let mut levels = vec![p.parse(input)];
        loop {
            let mut next = Vec::new();
            if let Some(frontier) = levels.last() {
                for (left, rest) in frontier {
                    for (operator, after) in op.parse(*rest) {
                        for (right, remainder) in p.parse(after) {
                            if remainder.remaining() >= rest.remaining() {
                                continue;
                            }
                            next.push((combine(left.clone(), operator.clone(), right), remainder));
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }
        levels.into_iter().rev().flatten().collect()
    }
}

/// A single element satisfying `f`, mapped to its value.
pub fn satisfy<'a, E: 'a, T>(
    f: impl Fn(&E) -> Option<T>,
) -> impl Fn(&'a [E]) -> Vec<(T, &'a [E])> {
    move |input: &'a [E]| match input.split_first() {
        Some((first, rest)) => f(first).map(|value| (value, rest)).into_iter().collect(),
        None => Vec::new(),
    }
}

/// The exact text `expected` at the start of the input.
pub fn literal<'a>(expected: &'static str) -> impl Fn(&'a str) -> Vec<(&'a str, &'a str)> + Copy {
    move |input: &'a str| match input.strip_prefix(expected) {
        Some(rest) => vec![(&input[..expected.len()], rest)],
        None => Vec::new(),
    }
}

/// A run of ASCII digits as a number; every shorter prefix is a parse too.
pub fn number<'a>() -> impl Fn(&'a str) -> Vec<(i64, &'a str)> + Copy {
    move |input: &'a str| {
        let digits = input.bytes().take_while(u8::is_ascii_digit).count();
        (1..=digits)
            .rev()
            .filter_map(|end| input[..end].parse().ok().map(|n| (n, &input[end..])))
            .collect()
    }
}

/// A lowercase letter followed by letters and digits, longest first.
pub fn identifier<'a>() -> impl Fn(&'a str) -> Vec<(&'a str, &'a str)> + Copy {
    move |input: &'a str| {
        if !input.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Vec::new();
        }
        let len = input
            .bytes()
            .take_while(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            .count();
        vec![(&input[..len], &input[len..])]
    }
}

/// The first result that consumes the whole input.
pub fn resolve<I: Input, T>(results: Vec<(T, I)>) -> Option<T> {
    results
        .into_iter()
        .find(|(_, rest)| rest.is_exhausted())
        .map(|(value, _)| value)
}
