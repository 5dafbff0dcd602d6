use crate::{
    db::store::{FieldMap, RawRow},
    types::Key,
};
use std::rc::Rc;

///
/// SlotData
///
/// One materialized entity row: its key, its decoded field values, and
/// the raw bytes for entity projection. Shared between exec rows via
/// `Rc`, so joins never re-decode.
///

#[derive(Debug)]
pub(crate) struct SlotData {
    pub key: Key,
    pub values: FieldMap,
    pub row: RawRow,
}

///
/// ExecRow
///
/// One candidate result: a slot per bound alias, in alias-table order.
/// A vacant slot is an alias left unmatched by an outer join; its
/// fields evaluate to null.
///

#[derive(Clone, Debug)]
pub(crate) struct ExecRow {
    pub slots: Vec<Option<Rc<SlotData>>>,
}

impl ExecRow {
    pub fn single(width: usize, index: usize, data: Rc<SlotData>) -> Self {
        let mut slots = vec![None; width];
        slots[index] = Some(data);
        Self { slots }
    }

    /// Copy with `index` filled.
    pub fn with_slot(&self, index: usize, data: Option<Rc<SlotData>>) -> Self {
        let mut slots = self.slots.clone();
        slots[index] = data;
        Self { slots }
    }
}

///
/// AliasTable
///
/// Maps each bound alias to its slot index, in binding order: roots
/// first, then joins.
///

#[derive(Debug, Default)]
pub(crate) struct AliasTable {
    aliases: Vec<&'static str>,
}

impl AliasTable {
    pub fn push(&mut self, alias: &'static str) {
        self.aliases.push(alias);
    }

    pub fn index_of(&self, alias: &str) -> Option<usize> {
        self.aliases.iter().position(|bound| *bound == alias)
    }

    pub fn width(&self) -> usize {
        self.aliases.len()
    }
}

///
/// Frame
///
/// Unit of the result set after the grouping phase. A plain frame is
/// one row; a grouped frame carries a representative row for group-key
/// evaluation plus every member for aggregates.
///

#[derive(Debug)]
pub(crate) enum Frame {
    Plain(ExecRow),
    Grouped {
        rep: ExecRow,
        members: Vec<ExecRow>,
    },
}

impl Frame {
    pub const fn rep(&self) -> &ExecRow {
        match self {
            Self::Plain(row) | Self::Grouped { rep: row, .. } => row,
        }
    }
}
