//! Query execution pipeline.
//!
//! Declarative specs arrive validated; execution is a fixed phase
//! order: bind sources, apply joins, filter, group, order, page,
//! project. Count terminals stop after grouping, so ordering and
//! paging never affect totals.

pub(crate) mod eval;
mod group;
mod join;
pub(crate) mod row;
pub mod trace;

#[cfg(test)]
mod tests;

pub use trace::{QueryTraceEvent, QueryTraceSink, TracePhase};

use crate::{
    db::{
        executor::{
            eval::{EvalScope, eval_expr, eval_predicate},
            row::{AliasTable, ExecRow, Frame, SlotData},
            trace::Tracer,
        },
        query::{
            expr::Expr,
            select::{Projection, SelectSpec},
            sort::{NullOrder, OrderDirection, PageSpec, SortKey},
            source::SourceSpec,
        },
        response::{Response, Tuple},
        session::Session,
    },
    error::Error,
    traits::EntityKind,
    value::{Value, canonical_cmp, widened_cmp},
};
use std::{cmp::Ordering, rc::Rc};

/// Execute an entity-projection query.
pub(crate) fn load_entities<E: EntityKind>(
    session: &Session,
    spec: &SelectSpec,
) -> Result<Response<E>, Error> {
    let tracer = Tracer::new(session.trace_sink());
    let result = load_entities_inner::<E>(session, spec, tracer);
    finish(tracer, result.as_ref().map(Response::count));

    result
}

/// Execute a tuple-projection query.
pub(crate) fn load_tuples(session: &Session, spec: &SelectSpec) -> Result<Vec<Tuple>, Error> {
    let tracer = Tracer::new(session.trace_sink());
    let result = load_tuples_inner(session, spec, tracer);
    finish(tracer, result.as_ref().map(Vec::len));

    result
}

/// Count qualifying frames, ignoring ordering and paging.
pub(crate) fn count(session: &Session, spec: &SelectSpec) -> Result<u64, Error> {
    let tracer = Tracer::new(session.trace_sink());
    let result = shape(session, spec, tracer, false)
        .map(|(_, frames)| u64::try_from(frames.len()).unwrap_or(u64::MAX));
    finish(
        tracer,
        result
            .as_ref()
            .map(|total| usize::try_from(*total).unwrap_or(usize::MAX)),
    );

    result
}

fn finish(tracer: Tracer, outcome: Result<usize, &Error>) {
    match outcome {
        Ok(rows) => tracer.record(&QueryTraceEvent::Finish { rows }),
        Err(err) => tracer.record(&QueryTraceEvent::Failed {
            message: err.to_string(),
        }),
    }
}

fn load_entities_inner<E: EntityKind>(
    session: &Session,
    spec: &SelectSpec,
    tracer: Tracer,
) -> Result<Response<E>, Error> {
    let Projection::Entity(alias) = &spec.projection else {
        return Err(Error::executor_internal("entity projection expected"));
    };
    check_projected_entity::<E>(spec, alias)?;

    let (aliases, frames) = shape(session, spec, tracer, true)?;
    let index = aliases
        .index_of(alias)
        .ok_or_else(|| Error::executor_internal(format!("projected alias unbound: {alias}")))?;

    // Association fields to hydrate into each loaded entity.
    let hydrations: Vec<&'static str> = spec
        .joins
        .iter()
        .filter(|join| join.fetch)
        .filter_map(|join| join.link.as_ref())
        .filter(|link| link.alias == *alias)
        .map(|link| link.field)
        .collect();

    let mut results = Vec::with_capacity(frames.len());
    for frame in &frames {
        let Some(data) = &frame.rep().slots[index] else {
            return Err(Error::executor_unsupported(
                "projected alias left vacant by an outer join",
            ));
        };
        let mut entity = data.row.try_decode::<E>()?;
        for field in &hydrations {
            entity.hydrate(field, session)?;
        }
        results.push((data.key, entity));
    }

    Ok(Response(results))
}

fn load_tuples_inner(
    session: &Session,
    spec: &SelectSpec,
    tracer: Tracer,
) -> Result<Vec<Tuple>, Error> {
    let Projection::Exprs(exprs) = &spec.projection else {
        return Err(Error::executor_internal("tuple projection expected"));
    };

    let (aliases, frames) = shape(session, spec, tracer, true)?;

    let mut results = Vec::with_capacity(frames.len());
    for frame in &frames {
        let (rep, members) = split(frame);
        let scope = EvalScope {
            session,
            aliases: &aliases,
            rep,
            members,
            parent: None,
        };
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(eval_expr(&scope, expr)?);
        }
        results.push(Tuple(values));
    }

    Ok(results)
}

fn check_projected_entity<E: EntityKind>(spec: &SelectSpec, alias: &str) -> Result<(), Error> {
    let bound = spec
        .sources
        .iter()
        .chain(spec.joins.iter().map(|join| &join.source))
        .find(|source| source.alias == alias)
        .ok_or_else(|| Error::executor_internal(format!("projected alias unbound: {alias}")))?;

    if bound.model.path == E::PATH {
        Ok(())
    } else {
        Err(Error::executor_internal(format!(
            "projected alias {alias} is {}, decoded as {}",
            bound.model.path,
            E::PATH
        )))
    }
}

/// Run the shaping phases shared by all terminals.
fn shape(
    session: &Session,
    spec: &SelectSpec,
    tracer: Tracer,
    paged: bool,
) -> Result<(AliasTable, Vec<Frame>), Error> {
    let root = spec
        .sources
        .first()
        .ok_or_else(|| Error::executor_internal("query has no source"))?;
    tracer.record(&QueryTraceEvent::Start {
        entity: root.model.path,
    });

    let mut aliases = AliasTable::default();
    for source in &spec.sources {
        aliases.push(source.alias);
    }
    for join in &spec.joins {
        aliases.push(join.source.alias);
    }
    let width = aliases.width();

    // Roots bind as an unrestricted product; a filter over both
    // aliases turns it into a theta join.
    let mut rows: Vec<ExecRow> = Vec::new();
    for (index, source) in spec.sources.iter().enumerate() {
        let slots = load_source(session, source)?;
        if index == 0 {
            rows = slots
                .into_iter()
                .map(|data| ExecRow::single(width, 0, data))
                .collect();
        } else {
            let mut product = Vec::with_capacity(rows.len() * slots.len().max(1));
            for existing in &rows {
                for data in &slots {
                    product.push(existing.with_slot(index, Some(Rc::clone(data))));
                }
            }
            rows = product;
        }
    }
    tracer.phase(TracePhase::Source, rows.len());

    for (offset, join) in spec.joins.iter().enumerate() {
        let index = spec.sources.len() + offset;
        rows = join::apply_join(session, &aliases, index, &rows, join)?;
    }
    tracer.phase(TracePhase::Join, rows.len());

    if let Some(predicate) = &spec.predicate {
        let mut kept = Vec::with_capacity(rows.len());
        for exec_row in rows {
            let scope = EvalScope {
                session,
                aliases: &aliases,
                rep: &exec_row,
                members: None,
                parent: None,
            };
            if eval_predicate(&scope, predicate)? {
                kept.push(exec_row);
            }
        }
        rows = kept;
    }
    tracer.phase(TracePhase::Filter, rows.len());

    let mut frames = if wants_grouping(spec) {
        group::group_rows(session, &aliases, rows, &spec.group_by)?
    } else {
        rows.into_iter().map(Frame::Plain).collect()
    };

    if let Some(having) = &spec.having {
        let mut kept = Vec::with_capacity(frames.len());
        for frame in frames {
            let (rep, members) = split(&frame);
            let scope = EvalScope {
                session,
                aliases: &aliases,
                rep,
                members,
                parent: None,
            };
            if eval_predicate(&scope, having)? {
                kept.push(frame);
            }
        }
        frames = kept;
    }
    tracer.phase(TracePhase::Group, frames.len());

    if paged {
        order_frames(session, &aliases, &mut frames, &spec.order)?;
        tracer.phase(TracePhase::Order, frames.len());

        frames = page_frames(frames, spec.page);
        tracer.phase(TracePhase::Page, frames.len());
    }

    Ok((aliases, frames))
}

fn wants_grouping(spec: &SelectSpec) -> bool {
    if !spec.group_by.is_empty() || spec.having.is_some() {
        return true;
    }

    match &spec.projection {
        Projection::Exprs(exprs) => exprs.iter().any(Expr::contains_aggregate),
        Projection::Entity(_) => false,
    }
}

/// Materialize every row of one source, decoded for evaluation.
pub(crate) fn load_source(
    session: &Session,
    source: &SourceSpec,
) -> Result<Vec<Rc<SlotData>>, Error> {
    let Some(store) = session.store_by_path(source.model.path) else {
        return Ok(Vec::new());
    };

    let decode = store.ops().values;
    let mut out = Vec::with_capacity(store.len());
    for (key, raw) in store.iter() {
        out.push(Rc::new(SlotData {
            key: *key,
            values: decode(raw)?,
            row: raw.clone(),
        }));
    }

    Ok(out)
}

fn split(frame: &Frame) -> (&ExecRow, Option<&[ExecRow]>) {
    match frame {
        Frame::Plain(exec_row) => (exec_row, None),
        Frame::Grouped { rep, members } => (rep, Some(members.as_slice())),
    }
}

fn order_frames(
    session: &Session,
    aliases: &AliasTable,
    frames: &mut Vec<Frame>,
    order: &[SortKey],
) -> Result<(), Error> {
    if order.is_empty() {
        return Ok(());
    }

    let mut keyed = Vec::with_capacity(frames.len());
    for frame in frames.drain(..) {
        let keys = {
            let (rep, members) = split(&frame);
            let scope = EvalScope {
                session,
                aliases,
                rep,
                members,
                parent: None,
            };
            order
                .iter()
                .map(|key| eval_expr(&scope, &key.expr))
                .collect::<Result<Vec<_>, _>>()?
        };
        keyed.push((keys, frame));
    }

    keyed.sort_by(|(left, _), (right, _)| cmp_keys(left, right, order));
    frames.extend(keyed.into_iter().map(|(_, frame)| frame));

    Ok(())
}

fn cmp_keys(left: &[Value], right: &[Value], order: &[SortKey]) -> Ordering {
    for ((a, b), key) in left.iter().zip(right).zip(order) {
        let ordering = cmp_one(a, b, key);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Compare one sort key pair. Explicit null placement is absolute;
/// the default treats null as the greatest value, so direction applies.
fn cmp_one(left: &Value, right: &Value, key: &SortKey) -> Ordering {
    let ordering = match (left.is_null(), right.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => match key.nulls {
            NullOrder::First => return Ordering::Less,
            NullOrder::Last => return Ordering::Greater,
            NullOrder::Default => Ordering::Greater,
        },
        (false, true) => match key.nulls {
            NullOrder::First => return Ordering::Greater,
            NullOrder::Last => return Ordering::Less,
            NullOrder::Default => Ordering::Less,
        },
        (false, false) => {
            widened_cmp(left, right).unwrap_or_else(|| canonical_cmp(left, right))
        }
    };

    match key.direction {
        OrderDirection::Asc => ordering,
        OrderDirection::Desc => ordering.reverse(),
    }
}

fn page_frames(frames: Vec<Frame>, page: PageSpec) -> Vec<Frame> {
    if page.is_unbounded() {
        return frames;
    }

    let iter = frames.into_iter().skip(page.offset as usize);
    match page.limit {
        Some(limit) => iter.take(limit as usize).collect(),
        None => iter.collect(),
    }
}
