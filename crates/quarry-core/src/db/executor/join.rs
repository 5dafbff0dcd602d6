use crate::{
    db::{
        executor::{
            eval::{EvalScope, eval_predicate},
            load_source,
            row::{AliasTable, ExecRow, SlotData},
        },
        query::select::{JoinKind, JoinSpec},
        session::Session,
    },
    error::Error,
    value::Value,
};
use std::rc::Rc;

/// Apply one join clause, extending each row at `index` with its
/// matches.
///
/// Pairing requires the link key to match (when the join has one) and
/// the `on` predicate to hold (when present). Left joins keep unmatched
/// rows with a vacant slot; right joins additionally emit a row for
/// every target the left side never matched.
pub(crate) fn apply_join(
    session: &Session,
    aliases: &AliasTable,
    index: usize,
    rows: &[ExecRow],
    join: &JoinSpec,
) -> Result<Vec<ExecRow>, Error> {
    let targets = load_source(session, &join.source)?;

    let mut out = Vec::new();
    let mut matched_targets = vec![false; targets.len()];

    for row in rows {
        let mut matched = false;
        for (target_index, target) in targets.iter().enumerate() {
            if !link_matches(row, aliases, join, target) {
                continue;
            }

            let candidate = row.with_slot(index, Some(Rc::clone(target)));
            if let Some(on) = &join.on {
                let scope = EvalScope {
                    session,
                    aliases,
                    rep: &candidate,
                    members: None,
                    parent: None,
                };
                if !eval_predicate(&scope, on)? {
                    continue;
                }
            }

            matched = true;
            matched_targets[target_index] = true;
            out.push(candidate);
        }

        if !matched && join.kind == JoinKind::Left {
            out.push(row.with_slot(index, None));
        }
    }

    if join.kind == JoinKind::Right {
        for (target_index, target) in targets.iter().enumerate() {
            if !matched_targets[target_index] {
                out.push(ExecRow::single(aliases.width(), index, Rc::clone(target)));
            }
        }
    }

    Ok(out)
}

fn link_matches(
    row: &ExecRow,
    aliases: &AliasTable,
    join: &JoinSpec,
    target: &Rc<SlotData>,
) -> bool {
    let Some(link) = &join.link else {
        return true;
    };
    let Some(owner_index) = aliases.index_of(link.alias) else {
        return false;
    };

    // A vacant owner slot or a null link never matches.
    match &row.slots[owner_index] {
        Some(data) => data.values.get(link.field) == Some(&Value::Key(target.key)),
        None => false,
    }
}
