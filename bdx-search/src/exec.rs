//! Executes one `Plan` against one `Shard`, producing the shard-local doc
//! ids that match.

use std::collections::BTreeSet;

use bdx_query::{Leaf, Plan};
use bdx_store::{LocalId, Shard};

use crate::bridge::{range_slot, tok_slot, whole_slot};

pub fn execute(shard: &Shard, plan: &Plan) -> BTreeSet<LocalId> {
    match plan {
        Plan::And(parts) => intersect_all(parts.iter().map(|p| execute(shard, p))),
        Plan::Or(parts) => union_all(parts.iter().map(|p| execute(shard, p))),
        Plan::Not(inner) => {
            let matched: Vec<LocalId> = execute(shard, inner).into_iter().collect();
            bdx_store::store::complement(shard.all_ids(), &matched).into_iter().collect()
        }
        Plan::Leaf(leaf) => execute_leaf(shard, leaf),
    }
}

fn execute_leaf(shard: &Shard, leaf: &Leaf) -> BTreeSet<LocalId> {
    match leaf {
        Leaf::Token { field, token } => shard.token(tok_slot(*field), token).iter().copied().collect(),
        Leaf::TokenPrefix { field, prefix } => shard.token_prefix(tok_slot(*field), prefix).into_iter().collect(),
        Leaf::Whole { field, term } => shard.whole(whole_slot(*field), term).iter().copied().collect(),
        Leaf::WholePrefix { field, prefix } => shard.whole_prefix(whole_slot(*field), prefix).into_iter().collect(),
        Leaf::Range { field, lo, hi } => shard.range(range_slot(*field), *lo, *hi).into_iter().collect(),
    }
}

fn intersect_all(mut sets: impl Iterator<Item = BTreeSet<LocalId>>) -> BTreeSet<LocalId> {
    let Some(first) = sets.next() else { return BTreeSet::new() };
    sets.fold(first, |acc, s| acc.intersection(&s).copied().collect())
}

fn union_all(sets: impl Iterator<Item = BTreeSet<LocalId>>) -> BTreeSet<LocalId> {
    sets.fold(BTreeSet::new(), |mut acc, s| {
        acc.extend(s);
        acc
    })
}
