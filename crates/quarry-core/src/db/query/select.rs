use crate::{
    db::{
        executor,
        query::{
            expr::Expr,
            field::{Field, KeyField},
            predicate::Predicate,
            sort::{PageSpec, SortKey},
            source::{QuerySource, SourceSpec},
            validate,
        },
        response::{Page, Response, Tuple},
        session::Session,
    },
    error::Error,
    traits::EntityKind,
};
use std::marker::PhantomData;

///
/// SelectSpec
///
/// Fully declarative query: everything the executor needs, nothing
/// session-specific. Builders only ever append to it.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SelectSpec {
    pub sources: Vec<SourceSpec>,
    pub joins: Vec<JoinSpec>,
    pub predicate: Option<Predicate>,
    pub group_by: Vec<Expr>,
    pub having: Option<Predicate>,
    pub order: Vec<SortKey>,
    pub page: PageSpec,
    pub projection: Projection,
    /// Set when `on` was called with no preceding join; rejected by
    /// validation so the mistake surfaces before execution.
    pub orphan_on: bool,
}

impl SelectSpec {
    #[must_use]
    pub fn new(root: SourceSpec) -> Self {
        Self {
            sources: vec![root],
            joins: Vec::new(),
            predicate: None,
            group_by: Vec::new(),
            having: None,
            order: Vec::new(),
            page: PageSpec::default(),
            projection: Projection::Entity(root.alias),
            orphan_on: false,
        }
    }

    fn push_predicate(&mut self, predicate: Predicate) {
        self.predicate = match self.predicate.take() {
            Some(existing) => Some(existing.and(predicate)),
            None => Some(predicate),
        };
    }

    fn push_on(&mut self, predicate: Predicate) {
        match self.joins.last_mut() {
            Some(join) => {
                join.on = match join.on.take() {
                    Some(existing) => Some(existing.and(predicate)),
                    None => Some(predicate),
                };
            }
            None => self.orphan_on = true,
        }
    }
}

///
/// Projection
///
/// What each result row becomes: a whole entity bound to one alias, or
/// a tuple of expressions.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    Entity(&'static str),
    Exprs(Vec<Expr>),
}

///
/// JoinKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

///
/// JoinLink
///
/// The ref field an association join matches on: `alias.field` holds
/// the key of the joined row.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JoinLink {
    pub alias: &'static str,
    pub field: &'static str,
}

///
/// JoinSpec
///
/// One join clause. With a link, rows pair where the link field equals
/// the joined row's key; without one the pairing is unrestricted and
/// the `on` predicate does the matching. For outer joins `on` filters
/// the pairing itself, so unmatched rows survive with a vacant slot.
///

#[derive(Clone, Debug, PartialEq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub source: SourceSpec,
    pub link: Option<JoinLink>,
    pub on: Option<Predicate>,
    pub fetch: bool,
}

///
/// SelectQuery
///
/// Session-bound fluent query producing `E` rows. Builder methods move
/// `self`; terminal fetches borrow the session for execution.
///

pub struct SelectQuery<'a, E: EntityKind> {
    session: &'a Session,
    spec: SelectSpec,
    _marker: PhantomData<E>,
}

impl<'a, E: EntityKind> SelectQuery<'a, E> {
    pub(crate) fn new(session: &'a Session, root: SourceSpec) -> Self {
        Self {
            session,
            spec: SelectSpec::new(root),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn spec(&self) -> &SelectSpec {
        &self.spec
    }

    // ------------------------------------------------------------------
    // Restriction
    // ------------------------------------------------------------------

    /// Restrict results; repeated calls conjoin.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.spec.push_predicate(predicate);
        self
    }

    /// Conjoin every present predicate; absent entries are skipped, so
    /// optional search terms compose without special cases.
    #[must_use]
    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        for predicate in predicates.into_iter().flatten() {
            self.spec.push_predicate(predicate);
        }
        self
    }

    // ------------------------------------------------------------------
    // Sources and joins
    // ------------------------------------------------------------------

    /// Bind an additional root source; rows pair freely with the first
    /// root, so a `filter` over both aliases forms a theta join.
    #[must_use]
    pub fn and_from(mut self, source: &impl QuerySource) -> Self {
        self.spec.sources.push(source.source());
        self
    }

    /// Inner join along an association.
    #[must_use]
    pub fn join<T: EntityKind>(
        self,
        link: KeyField<T>,
        target: &impl QuerySource<Entity = T>,
    ) -> Self {
        self.push_join(JoinKind::Inner, Some(link_of(link)), target.source())
    }

    /// Left outer join along an association.
    #[must_use]
    pub fn left_join<T: EntityKind>(
        self,
        link: KeyField<T>,
        target: &impl QuerySource<Entity = T>,
    ) -> Self {
        self.push_join(JoinKind::Left, Some(link_of(link)), target.source())
    }

    /// Right outer join along an association.
    #[must_use]
    pub fn right_join<T: EntityKind>(
        self,
        link: KeyField<T>,
        target: &impl QuerySource<Entity = T>,
    ) -> Self {
        self.push_join(JoinKind::Right, Some(link_of(link)), target.source())
    }

    /// Inner join with no association; pair rows via `on`.
    #[must_use]
    pub fn join_entity(self, target: &impl QuerySource) -> Self {
        self.push_join(JoinKind::Inner, None, target.source())
    }

    /// Left outer join with no association; pair rows via `on`.
    #[must_use]
    pub fn left_join_entity(self, target: &impl QuerySource) -> Self {
        self.push_join(JoinKind::Left, None, target.source())
    }

    /// Attach a pairing condition to the most recent join.
    #[must_use]
    pub fn on(mut self, predicate: Predicate) -> Self {
        self.spec.push_on(predicate);
        self
    }

    /// Hydrate the most recent association join into the loaded
    /// entities, so the target is reachable without a second query.
    #[must_use]
    pub fn fetch_join(mut self) -> Self {
        if let Some(join) = self.spec.joins.last_mut() {
            join.fetch = true;
        }
        self
    }

    // ------------------------------------------------------------------
    // Shaping
    // ------------------------------------------------------------------

    /// Group rows by the given expressions.
    #[must_use]
    pub fn group_by(mut self, exprs: impl IntoExprs) -> Self {
        self.spec.group_by.extend(exprs.into_exprs());
        self
    }

    /// Restrict groups after aggregation.
    #[must_use]
    pub fn having(mut self, predicate: Predicate) -> Self {
        self.spec.having = match self.spec.having.take() {
            Some(existing) => Some(existing.and(predicate)),
            None => Some(predicate),
        };
        self
    }

    /// Append ordering criteria; earlier keys bind tighter.
    #[must_use]
    pub fn order_by(mut self, keys: impl IntoSortKeys) -> Self {
        self.spec.order.extend(keys.into_sort_keys());
        self
    }

    /// Skip the first `offset` ordered rows.
    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.spec.page.offset = offset;
        self
    }

    /// Keep at most `limit` rows after the offset.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.spec.page.limit = Some(limit);
        self
    }

    /// Project expressions instead of whole entities.
    #[must_use]
    pub fn select(self, exprs: impl IntoExprs) -> TupleQuery<'a> {
        let mut spec = self.spec;
        spec.projection = Projection::Exprs(exprs.into_exprs());
        TupleQuery {
            session: self.session,
            spec,
        }
    }

    // ------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------

    /// Execute and return all matching entities.
    pub fn fetch(&self) -> Result<Vec<E>, Error> {
        Ok(self.fetch_response()?.entities())
    }

    /// Execute and return keyed results.
    pub fn fetch_response(&self) -> Result<Response<E>, Error> {
        validate::validate(&self.spec)?;
        executor::load_entities::<E>(self.session, &self.spec)
    }

    /// Execute expecting exactly one result.
    pub fn fetch_one(&self) -> Result<E, Error> {
        let (_, entity) = self.fetch_response()?.one()?;

        Ok(entity)
    }

    /// Execute and return the first result, if any.
    pub fn fetch_first(&self) -> Result<Option<E>, Error> {
        let mut this = Self {
            session: self.session,
            spec: self.spec.clone(),
            _marker: PhantomData,
        };
        this.spec.page.limit = Some(1);
        Ok(this.fetch_response()?.entities().into_iter().next())
    }

    /// Execute and return the row count, ignoring ordering and paging.
    pub fn fetch_count(&self) -> Result<u64, Error> {
        validate::validate(&self.spec)?;
        executor::count(self.session, &self.spec)
    }

    /// Execute twice: once for the page, once for the unpaged total.
    pub fn fetch_results(&self) -> Result<Page<E>, Error> {
        validate::validate(&self.spec)?;
        let total = executor::count(self.session, &self.spec)?;
        let items = executor::load_entities::<E>(self.session, &self.spec)?.entities();

        Ok(Page { items, total })
    }

    fn push_join(mut self, kind: JoinKind, link: Option<JoinLink>, source: SourceSpec) -> Self {
        self.spec.joins.push(JoinSpec {
            kind,
            source,
            link,
            on: None,
            fetch: false,
        });
        self
    }
}

const fn link_of<T: EntityKind>(link: KeyField<T>) -> JoinLink {
    JoinLink {
        alias: link.alias(),
        field: link.name(),
    }
}

///
/// TupleQuery
///
/// A select query whose projection is a tuple of expressions. Shares
/// the builder surface for shaping; its terminals yield `Tuple` rows.
///

pub struct TupleQuery<'a> {
    session: &'a Session,
    spec: SelectSpec,
}

impl TupleQuery<'_> {
    #[must_use]
    pub const fn spec(&self) -> &SelectSpec {
        &self.spec
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.spec.push_predicate(predicate);
        self
    }

    #[must_use]
    pub fn and_from(mut self, source: &impl QuerySource) -> Self {
        self.spec.sources.push(source.source());
        self
    }

    #[must_use]
    pub fn group_by(mut self, exprs: impl IntoExprs) -> Self {
        self.spec.group_by.extend(exprs.into_exprs());
        self
    }

    #[must_use]
    pub fn having(mut self, predicate: Predicate) -> Self {
        self.spec.having = match self.spec.having.take() {
            Some(existing) => Some(existing.and(predicate)),
            None => Some(predicate),
        };
        self
    }

    #[must_use]
    pub fn order_by(mut self, keys: impl IntoSortKeys) -> Self {
        self.spec.order.extend(keys.into_sort_keys());
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.spec.page.offset = offset;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.spec.page.limit = Some(limit);
        self
    }

    /// Execute and return all projected rows.
    pub fn fetch(&self) -> Result<Vec<Tuple>, Error> {
        validate::validate(&self.spec)?;
        executor::load_tuples(self.session, &self.spec)
    }

    /// Execute expecting exactly one row.
    pub fn fetch_one(&self) -> Result<Tuple, Error> {
        let mut rows = self.fetch()?;
        match rows.len() {
            1 => rows.pop().ok_or_else(|| {
                Error::executor_internal("row vanished after cardinality check")
            }),
            0 => Err(Error::query_not_found("no rows matched")),
            n => Err(Error::query_not_unique(format!("{n} rows matched"))),
        }
    }

    /// Execute and return the first row, if any.
    pub fn fetch_first(&self) -> Result<Option<Tuple>, Error> {
        let mut this = Self {
            session: self.session,
            spec: self.spec.clone(),
        };
        this.spec.page.limit = Some(1);
        Ok(this.fetch()?.into_iter().next())
    }

    /// Execute and return the row count, ignoring ordering and paging.
    pub fn fetch_count(&self) -> Result<u64, Error> {
        validate::validate(&self.spec)?;
        executor::count(self.session, &self.spec)
    }

    /// Execute twice: once for the page, once for the unpaged total.
    pub fn fetch_results(&self) -> Result<Page<Tuple>, Error> {
        validate::validate(&self.spec)?;
        let total = executor::count(self.session, &self.spec)?;
        let items = executor::load_tuples(self.session, &self.spec)?;

        Ok(Page { items, total })
    }
}

///
/// IntoExprs
///
/// Accepted by `select` and `group_by`: a single field handle or
/// expression, a tuple of them, or an already built list.
///

pub trait IntoExprs {
    fn into_exprs(self) -> Vec<Expr>;
}

impl IntoExprs for Expr {
    fn into_exprs(self) -> Vec<Expr> {
        vec![self]
    }
}

impl<T> IntoExprs for Field<T> {
    fn into_exprs(self) -> Vec<Expr> {
        vec![self.expr()]
    }
}

impl<E: EntityKind> IntoExprs for KeyField<E> {
    fn into_exprs(self) -> Vec<Expr> {
        vec![self.expr()]
    }
}

impl IntoExprs for Vec<Expr> {
    fn into_exprs(self) -> Vec<Expr> {
        self
    }
}

macro_rules! impl_into_exprs_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<Expr>),+> IntoExprs for ($($name,)+) {
            fn into_exprs(self) -> Vec<Expr> {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

impl_into_exprs_tuple!(A, B);
impl_into_exprs_tuple!(A, B, C);
impl_into_exprs_tuple!(A, B, C, D);
impl_into_exprs_tuple!(A, B, C, D, E);
impl_into_exprs_tuple!(A, B, C, D, E, F);

///
/// IntoSortKeys
///

pub trait IntoSortKeys {
    fn into_sort_keys(self) -> Vec<SortKey>;
}

impl IntoSortKeys for SortKey {
    fn into_sort_keys(self) -> Vec<SortKey> {
        vec![self]
    }
}

impl IntoSortKeys for Vec<SortKey> {
    fn into_sort_keys(self) -> Vec<SortKey> {
        self
    }
}

impl IntoSortKeys for (SortKey, SortKey) {
    fn into_sort_keys(self) -> Vec<SortKey> {
        vec![self.0, self.1]
    }
}

impl IntoSortKeys for (SortKey, SortKey, SortKey) {
    fn into_sort_keys(self) -> Vec<SortKey> {
        vec![self.0, self.1, self.2]
    }
}

impl IntoSortKeys for (SortKey, SortKey, SortKey, SortKey) {
    fn into_sort_keys(self) -> Vec<SortKey> {
        vec![self.0, self.1, self.2, self.3]
    }
}
