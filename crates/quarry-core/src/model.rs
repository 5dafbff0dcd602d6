///
/// EntityModel
///
/// Static, reflection-free metamodel for one entity type. Generated by
/// hand (or by schema tooling) next to the entity definition; queries
/// validate every field reference against it before execution.
///

#[derive(Debug)]
pub struct EntityModel {
    pub path: &'static str,
    pub fields: &'static [FieldModel],
    pub associations: &'static [AssociationModel],
}

impl EntityModel {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|field| field.name == name)
    }

    #[must_use]
    pub fn association(&self, field: &str) -> Option<&AssociationModel> {
        self.associations.iter().find(|assoc| assoc.field == field)
    }
}

///
/// FieldModel
///

#[derive(Debug)]
pub struct FieldModel {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

///
/// FieldKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Key,
    Bool,
    Int,
    Float,
    Text,
    /// To-one association slot holding the target's key.
    Ref,
}

///
/// AssociationModel
///
/// To-one association metadata: which ref field carries it and which
/// entity it resolves to.
///

#[derive(Debug)]
pub struct AssociationModel {
    pub field: &'static str,
    pub target: &'static str,
}
