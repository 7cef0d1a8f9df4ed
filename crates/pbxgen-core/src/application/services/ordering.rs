//! Child ordering of groups.
//!
//! Default order is numeric-aware by name, with sub-groups placed according
//! to the project's group sort position. Declared group orderings are applied
//! afterwards to every group whose name matches their pattern.

use std::cmp::Ordering;

use crate::{
    application::services::glob::Pattern,
    domain::{GroupOrdering, SortPosition},
};

/// Something that can sit in a group's children list.
pub trait GroupChild {
    fn sort_name(&self) -> &str;
    fn is_group(&self) -> bool;
}

/// Numeric-aware, case-insensitive comparison: `"2file" < "10file"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l, r) {
                    (Chunk::Number(l), Chunk::Number(r)) => {
                        let l = l.trim_start_matches('0');
                        let r = r.trim_start_matches('0');
                        l.len().cmp(&r.len()).then_with(|| l.cmp(r))
                    }
                    (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
                    (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
                    (Chunk::Text(l), Chunk::Text(r)) => l
                        .chars()
                        .flat_map(char::to_lowercase)
                        .cmp(r.chars().flat_map(char::to_lowercase)),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

enum Chunk<'a> {
    Number(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Number(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}

/// Default order: by name, with groups placed per `position`.
pub fn sort_children<T: GroupChild>(children: &mut [T], position: SortPosition) {
    let rank = |child: &T| match (position, child.is_group()) {
        (SortPosition::Top, true) | (SortPosition::Bottom, false) => 0,
        (SortPosition::Top, false) | (SortPosition::Bottom, true) => 1,
        (SortPosition::None, _) => 0,
    };
    children.sort_by(|a, b| {
        rank(a)
            .cmp(&rank(b))
            .then_with(|| natural_cmp(a.sort_name(), b.sort_name()))
    });
}

/// Apply every ordering rule matching `group_name` (`None` for the main
/// group). Children not named by a rule keep their relative order.
pub fn apply_group_ordering<T: GroupChild>(
    children: &mut Vec<T>,
    group_name: Option<&str>,
    rules: &[GroupOrdering],
) {
    for rule in rules {
        let applies = match group_name {
            None => rule.pattern.is_empty(),
            Some(name) => !rule.pattern.is_empty() && Pattern::new(&rule.pattern).matches(name),
        };
        if !applies {
            continue;
        }

        let mut remaining: Vec<T> = std::mem::take(children);
        let mut ordered = Vec::new();
        for wanted in &rule.order {
            while let Some(index) = remaining.iter().position(|c| c.sort_name() == wanted) {
                ordered.push(remaining.remove(index));
            }
        }

        *children = match rule.position {
            SortPosition::Bottom => remaining.into_iter().chain(ordered).collect(),
            SortPosition::Top | SortPosition::None => ordered.into_iter().chain(remaining).collect(),
        };
    }
}
