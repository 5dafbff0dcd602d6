//! Pre-execution validation.
//!
//! Catches malformed compositions before any row is touched: unknown
//! aliases or fields, joins along non-ref fields, `on` without a join,
//! and projections that mix aggregated and bare fields illegally.

use crate::{
    db::query::{
        expr::{Expr, SubQuery},
        predicate::Predicate,
        select::{JoinSpec, Projection, SelectSpec},
        source::SourceSpec,
    },
    error::Error,
    model::{EntityModel, FieldKind},
};
use std::collections::BTreeMap;

///
/// Scope
///
/// Alias bindings visible at one query level. Sub-queries chain to the
/// enclosing scope, so correlated references resolve outward.
///

struct Scope<'a> {
    aliases: BTreeMap<&'static str, &'static EntityModel>,
    parent: Option<&'a Scope<'a>>,
}

impl Scope<'_> {
    fn resolve(&self, alias: &str) -> Option<&'static EntityModel> {
        match self.aliases.get(alias) {
            Some(model) => Some(model),
            None => self.parent.and_then(|parent| parent.resolve(alias)),
        }
    }
}

/// Validate a fully composed query against the metamodel. Sub-queries
/// are validated in place, chained to the enclosing scope.
pub fn validate(spec: &SelectSpec) -> Result<(), Error> {
    if spec.sources.is_empty() {
        return Err(Error::query_invariant("query has no source"));
    }
    if spec.orphan_on {
        return Err(Error::query_invariant("on clause without a join"));
    }

    let scope = build_scope(spec)?;

    for join in &spec.joins {
        check_join(join, &scope)?;
    }

    if let Some(predicate) = &spec.predicate {
        check_predicate(predicate, &scope)?;
    }

    for expr in &spec.group_by {
        check_expr(expr, &scope)?;
        if expr.contains_aggregate() {
            return Err(Error::query_invariant("group key cannot aggregate"));
        }
    }

    if spec.having.is_some() && spec.group_by.is_empty() {
        return Err(Error::query_invariant("having requires group by"));
    }
    if let Some(having) = &spec.having {
        check_predicate(having, &scope)?;
    }

    for key in &spec.order {
        check_expr(&key.expr, &scope)?;
    }

    check_projection(spec, &scope)?;
    check_grouping(spec)?;

    Ok(())
}

fn build_scope(spec: &SelectSpec) -> Result<Scope<'static>, Error> {
    let mut aliases = BTreeMap::new();
    let bindings = spec
        .sources
        .iter()
        .chain(spec.joins.iter().map(|join| &join.source));

    for SourceSpec { model, alias } in bindings {
        if aliases.insert(*alias, *model).is_some() {
            return Err(Error::query_invariant(format!(
                "alias bound twice: {alias}"
            )));
        }
    }

    Ok(Scope {
        aliases,
        parent: None,
    })
}

fn check_join(join: &JoinSpec, scope: &Scope<'_>) -> Result<(), Error> {
    if let Some(link) = &join.link {
        let Some(owner) = scope.resolve(link.alias) else {
            return Err(Error::query_invariant(format!(
                "join link alias unknown: {}",
                link.alias
            )));
        };
        let Some(field) = owner.field(link.field) else {
            return Err(Error::query_invariant(format!(
                "join link field unknown: {}.{}",
                link.alias, link.field
            )));
        };
        if field.kind != FieldKind::Ref {
            return Err(Error::query_invariant(format!(
                "join link is not an association: {}.{}",
                link.alias, link.field
            )));
        }
        let Some(association) = owner.association(link.field) else {
            return Err(Error::query_invariant(format!(
                "association missing for {}.{}",
                link.alias, link.field
            )));
        };
        if association.target != join.source.model.path {
            return Err(Error::query_invariant(format!(
                "association {}.{} targets {}, joined {}",
                link.alias, link.field, association.target, join.source.model.path
            )));
        }
    }

    if let Some(on) = &join.on {
        check_predicate(on, scope)?;
    }

    Ok(())
}

fn check_predicate(predicate: &Predicate, scope: &Scope<'_>) -> Result<(), Error> {
    let mut bad = None;
    predicate.for_each_field(&mut |alias, name| {
        if bad.is_none() {
            bad = field_error(alias, name, scope);
        }
    });
    if let Some(err) = bad {
        return Err(err);
    }

    let mut result = Ok(());
    predicate.for_each_subquery(&mut |sub| {
        if result.is_ok() {
            result = check_subquery(sub, scope);
        }
    });

    result
}

fn check_expr(expr: &Expr, scope: &Scope<'_>) -> Result<(), Error> {
    let mut bad = None;
    expr.for_each_field(&mut |alias, name| {
        if bad.is_none() {
            bad = field_error(alias, name, scope);
        }
    });
    if let Some(err) = bad {
        return Err(err);
    }

    if let Expr::Subquery(sub) = expr {
        check_subquery(sub, scope)?;
    }

    Ok(())
}

fn field_error(alias: &'static str, name: &'static str, scope: &Scope<'_>) -> Option<Error> {
    match scope.resolve(alias) {
        None => Some(Error::query_invariant(format!("alias unknown: {alias}"))),
        Some(model) => {
            if model.field(name).is_none() {
                Some(Error::query_invariant(format!(
                    "field unknown: {alias}.{name}"
                )))
            } else {
                None
            }
        }
    }
}

fn check_subquery(sub: &SubQuery, outer: &Scope<'_>) -> Result<(), Error> {
    let mut aliases = BTreeMap::new();
    aliases.insert(sub.source.alias, sub.source.model);
    let scope = Scope {
        aliases,
        parent: Some(outer),
    };

    check_expr(&sub.projection, &scope)?;
    if let Some(predicate) = &sub.predicate {
        check_predicate(predicate, &scope)?;
    }

    Ok(())
}

fn check_projection(spec: &SelectSpec, scope: &Scope<'_>) -> Result<(), Error> {
    match &spec.projection {
        Projection::Entity(alias) => {
            if scope.aliases.get(alias).is_none() {
                return Err(Error::query_invariant(format!(
                    "projected alias unknown: {alias}"
                )));
            }
        }
        Projection::Exprs(exprs) => {
            if exprs.is_empty() {
                return Err(Error::query_invariant("empty projection"));
            }
            for expr in exprs {
                check_expr(expr, scope)?;
            }
        }
    }

    Ok(())
}

/// When the query groups, every projected and ordering expression must
/// either aggregate or be one of the group keys. A whole-entity
/// projection satisfies neither, so grouped queries must `select`.
fn check_grouping(spec: &SelectSpec) -> Result<(), Error> {
    if spec.group_by.is_empty() {
        return Ok(());
    }

    let grouped = |expr: &Expr| spec.group_by.contains(expr);

    match &spec.projection {
        Projection::Entity(alias) => {
            return Err(Error::query_invariant(format!(
                "grouped query cannot project entity {alias}; select group keys or aggregates"
            )));
        }
        Projection::Exprs(exprs) => {
            for expr in exprs {
                if !expr.contains_aggregate() && !grouped(expr) {
                    return Err(Error::query_invariant(
                        "projection must aggregate or group",
                    ));
                }
            }
        }
    }

    for key in &spec.order {
        if !key.expr.contains_aggregate() && !grouped(&key.expr) {
            return Err(Error::query_invariant(
                "order key must aggregate or group",
            ));
        }
    }

    Ok(())
}
