use crate::{model::EntityModel, traits::EntityKind};

///
/// SourceSpec
///
/// One `(entity, alias)` binding in a query. The model pointer is the
/// entity's static metamodel; the alias names the binding inside the
/// query, so the same entity can appear under several aliases
/// (sub-queries, self-joins).
///

#[derive(Clone, Copy, Debug)]
pub struct SourceSpec {
    pub model: &'static EntityModel,
    pub alias: &'static str,
}

impl PartialEq for SourceSpec {
    fn eq(&self, other: &Self) -> bool {
        self.model.path == other.model.path && self.alias == other.alias
    }
}

impl Eq for SourceSpec {}

///
/// QuerySource
///
/// Implemented by entity column sets; ties an alias binding to the
/// entity type it materializes.
///

pub trait QuerySource {
    type Entity: EntityKind;

    fn source(&self) -> SourceSpec;
}
