use crate::{
    db::{
        executor::{
            eval::{EvalScope, eval_expr},
            row::{AliasTable, ExecRow, Frame},
        },
        query::expr::Expr,
        session::Session,
    },
    error::Error,
    value::Value,
};

/// Partition rows into grouped frames.
///
/// With group keys, rows sharing every key value form one group, in
/// first-seen order, with the group's first row as its representative.
/// Null keys group together. Without keys the whole input is one
/// implicit group, which is how bare aggregates see every row; that
/// group exists even when the input is empty, so `count` over nothing
/// still yields one zero-valued result.
pub(crate) fn group_rows(
    session: &Session,
    aliases: &AliasTable,
    rows: Vec<ExecRow>,
    group_by: &[Expr],
) -> Result<Vec<Frame>, Error> {
    if group_by.is_empty() {
        let rep = rows.first().map_or_else(
            || ExecRow {
                slots: vec![None; aliases.width()],
            },
            Clone::clone,
        );

        return Ok(vec![Frame::Grouped { rep, members: rows }]);
    }

    let mut groups: Vec<(Vec<Value>, Vec<ExecRow>)> = Vec::new();
    for row in rows {
        let scope = EvalScope {
            session,
            aliases,
            rep: &row,
            members: None,
            parent: None,
        };
        let mut key = Vec::with_capacity(group_by.len());
        for expr in group_by {
            key.push(eval_expr(&scope, expr)?);
        }

        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }

    Ok(groups
        .into_iter()
        .map(|(_, members)| {
            let rep = members[0].clone();
            Frame::Grouped { rep, members }
        })
        .collect())
}
