//! Block registry and reference resolution
//!
//! This module turns parsed circuit files into a [`Design`]: every block with
//! its terminals, instances, attributes and connections, plus the names each
//! file can see. Reference checks happen while building, so a successfully
//! built design only holds connections whose endpoints resolve.

pub mod builder;
pub mod error;
pub mod model;

pub use builder::{DesignBuilder, DesignOptions};
pub use error::DesignError;
pub use model::*;

use std::collections::BTreeSet;

/// Where a dotted terminal path ends up
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint<'d> {
    /// A declared terminal of a known block
    Terminal {
        block: BlockId,
        terminal: &'d TerminalDef,
    },
    /// Somewhere inside an instance of an opaque type declared in `block`
    Opaque { block: BlockId, type_name: &'d str },
}

/// Why a terminal path failed to resolve
#[derive(Debug, Clone, PartialEq)]
pub enum Unresolved {
    /// `path[depth]` is not an instance of `block`
    UnknownInstance { depth: usize, block: BlockId },
    /// `path[depth]` is a terminal but more segments follow
    NotAnInstance { depth: usize },
    /// The last segment is not a terminal of `block`
    UndeclaredTerminal { block: BlockId },
    /// The terminal is private to a block other than the one referencing it
    Private,
    /// The path ends at an instance
    NotATerminal,
}

impl Design {
    /// Resolve a terminal path relative to `block`
    pub fn resolve<'d>(
        &'d self,
        block: BlockId,
        path: &'d [String],
    ) -> Result<Endpoint<'d>, Unresolved> {
        let Some((last, through)) = path.split_last() else {
            return Err(Unresolved::UndeclaredTerminal { block });
        };

        let mut current = block;
        for (depth, segment) in through.iter().enumerate() {
            let def = self.block(current);
            match def.instance(segment) {
                Some(inst) => match inst.ty {
                    TypeRef::Block(next) => current = next,
                    TypeRef::Opaque => {
                        return Ok(Endpoint::Opaque {
                            block: current,
                            type_name: &inst.type_name,
                        })
                    }
                },
                None if def.terminal(segment).is_some() => {
                    return Err(Unresolved::NotAnInstance { depth })
                }
                None => {
                    return Err(Unresolved::UnknownInstance {
                        depth,
                        block: current,
                    })
                }
            }
        }

        let def = self.block(current);
        match def.terminal(last) {
            Some(t) if t.private && !through.is_empty() => Err(Unresolved::Private),
            Some(terminal) => Ok(Endpoint::Terminal {
                block: current,
                terminal,
            }),
            None if def.instance(last).is_some() => Err(Unresolved::NotATerminal),
            None => Err(Unresolved::UndeclaredTerminal { block: current }),
        }
    }
}

/// Compute Levenshtein edit distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut row = vec![0usize; n + 1];
    for i in 1..=m {
        row[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[n]
}

/// Up to three names within edit distance 2 of `target`, closest first
pub(crate) fn find_similar<'a>(
    defined: impl IntoIterator<Item = &'a str>,
    target: &str,
) -> Vec<String> {
    let unique: BTreeSet<&str> = defined.into_iter().collect();
    let mut candidates: Vec<(&str, usize)> = unique
        .into_iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            (dist <= 2 && dist > 0).then_some((name, dist))
        })
        .collect();

    candidates.sort_by_key(|(_, d)| *d);
    candidates
        .into_iter()
        .map(|(name, _)| name.to_string())
        .take(3)
        .collect()
}
