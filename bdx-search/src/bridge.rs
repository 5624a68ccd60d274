//! Maps `bdx-query`'s field-kind enums onto `bdx-store`'s shard-side slot
//! enums. These two families are deliberately separate: the store has no
//! notion of the query language, and the query planner has no notion of
//! how postings are stored. This module is the only place both are named.

use bdx_query::{RangeField, TokField, WholeField};
use bdx_store::{RangeSlot, TokSlot, WholeSlot};

pub fn tok_slot(field: TokField) -> TokSlot {
    match field {
        TokField::Name => TokSlot::Name,
        TokField::Path => TokSlot::Path,
        TokField::Source => TokSlot::Source,
    }
}

pub fn whole_slot(field: WholeField) -> WholeSlot {
    match field {
        WholeField::Name => WholeSlot::Name,
        WholeField::Path => WholeSlot::Path,
        WholeField::Source => WholeSlot::Source,
        WholeField::Section => WholeSlot::Section,
        WholeField::Type => WholeSlot::Type,
        WholeField::Relocations => WholeSlot::Relocations,
    }
}

pub fn range_slot(field: RangeField) -> RangeSlot {
    match field {
        RangeField::Address => RangeSlot::Address,
        RangeField::Size => RangeSlot::Size,
        RangeField::Mtime => RangeSlot::Mtime,
    }
}
