//! Canonical fixture schema used across the test suites: members that
//! belong to teams, plus a minimal standalone entity.
//!
//! The metamodels here are written by hand, the way generated schema
//! code would lay them out.

use crate::{
    db::{
        query::{
            field::{IntField, KeyField, TextField},
            source::{QuerySource, SourceSpec},
        },
        session::Session,
    },
    error::Error,
    model::{AssociationModel, EntityModel, FieldKind, FieldModel},
    traits::{EntityKind, FieldValue, FieldValues, Path, RowResolver},
    types::{Id, Key, Ref},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// Team
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Team {
    pub id: Option<Key>,
    pub name: Option<String>,
}

impl Team {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
        }
    }
}

impl Path for Team {
    const PATH: &'static str = "test::Team";
}

static TEAM_MODEL: EntityModel = EntityModel {
    path: Team::PATH,
    fields: &[
        FieldModel {
            name: "id",
            kind: FieldKind::Key,
            nullable: true,
        },
        FieldModel {
            name: "name",
            kind: FieldKind::Text,
            nullable: true,
        },
    ],
    associations: &[],
};

impl EntityKind for Team {
    const MODEL: &'static EntityModel = &TEAM_MODEL;

    fn key(&self) -> Option<Key> {
        self.id
    }

    fn set_key(&mut self, key: Key) {
        self.id = Some(key);
    }
}

impl FieldValues for Team {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.to_value()),
            "name" => Some(self.name.to_value()),
            _ => None,
        }
    }
}

///
/// TeamCols
///

#[derive(Clone, Copy, Debug)]
pub struct TeamCols {
    alias: &'static str,
    pub id: KeyField<Team>,
    pub name: TextField,
}

impl TeamCols {
    #[must_use]
    pub const fn as_alias(alias: &'static str) -> Self {
        Self {
            alias,
            id: KeyField::new(alias, "id"),
            name: TextField::new(alias, "name"),
        }
    }
}

impl QuerySource for TeamCols {
    type Entity = Team;

    fn source(&self) -> SourceSpec {
        SourceSpec {
            model: Team::MODEL,
            alias: self.alias,
        }
    }
}

/// Team columns under the default alias.
#[must_use]
pub const fn team() -> TeamCols {
    TeamCols::as_alias("team")
}

///
/// Member
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Member {
    pub id: Option<Key>,
    pub name: Option<String>,
    pub age: i64,
    pub team: Option<Ref<Team>>,
}

impl Member {
    #[must_use]
    pub fn new(name: &str, age: i64, team: Option<Id<Team>>) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
            age,
            team: team.map(Ref::to),
        }
    }

    /// Member with no name, for null-handling fixtures.
    #[must_use]
    pub const fn unnamed(age: i64) -> Self {
        Self {
            id: None,
            name: None,
            age,
            team: None,
        }
    }
}

impl Path for Member {
    const PATH: &'static str = "test::Member";
}

static MEMBER_MODEL: EntityModel = EntityModel {
    path: Member::PATH,
    fields: &[
        FieldModel {
            name: "id",
            kind: FieldKind::Key,
            nullable: true,
        },
        FieldModel {
            name: "name",
            kind: FieldKind::Text,
            nullable: true,
        },
        FieldModel {
            name: "age",
            kind: FieldKind::Int,
            nullable: false,
        },
        FieldModel {
            name: "team",
            kind: FieldKind::Ref,
            nullable: true,
        },
    ],
    associations: &[AssociationModel {
        field: "team",
        target: Team::PATH,
    }],
};

impl EntityKind for Member {
    const MODEL: &'static EntityModel = &MEMBER_MODEL;

    fn key(&self) -> Option<Key> {
        self.id
    }

    fn set_key(&mut self, key: Key) {
        self.id = Some(key);
    }

    fn hydrate(&mut self, association: &str, resolver: &dyn RowResolver) -> Result<(), Error> {
        if association == "team" {
            if let Some(team) = &mut self.team {
                team.hydrate(resolver)?;
            }
        }

        Ok(())
    }
}

impl FieldValues for Member {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.to_value()),
            "name" => Some(self.name.to_value()),
            "age" => Some(self.age.to_value()),
            "team" => Some(self.team.to_value()),
            _ => None,
        }
    }
}

///
/// MemberCols
///

#[derive(Clone, Copy, Debug)]
pub struct MemberCols {
    alias: &'static str,
    pub id: KeyField<Member>,
    pub name: TextField,
    pub age: IntField,
    pub team: KeyField<Team>,
}

impl MemberCols {
    #[must_use]
    pub const fn as_alias(alias: &'static str) -> Self {
        Self {
            alias,
            id: KeyField::new(alias, "id"),
            name: TextField::new(alias, "name"),
            age: IntField::new(alias, "age"),
            team: KeyField::new(alias, "team"),
        }
    }
}

impl QuerySource for MemberCols {
    type Entity = Member;

    fn source(&self) -> SourceSpec {
        SourceSpec {
            model: Member::MODEL,
            alias: self.alias,
        }
    }
}

/// Member columns under the default alias.
#[must_use]
pub const fn member() -> MemberCols {
    MemberCols::as_alias("member")
}

///
/// Hello
///
/// Smallest possible entity; exercises bare persistence.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Hello {
    pub id: Option<Key>,
}

impl Hello {
    #[must_use]
    pub const fn new() -> Self {
        Self { id: None }
    }
}

impl Default for Hello {
    fn default() -> Self {
        Self::new()
    }
}

impl Path for Hello {
    const PATH: &'static str = "test::Hello";
}

static HELLO_MODEL: EntityModel = EntityModel {
    path: Hello::PATH,
    fields: &[FieldModel {
        name: "id",
        kind: FieldKind::Key,
        nullable: true,
    }],
    associations: &[],
};

impl EntityKind for Hello {
    const MODEL: &'static EntityModel = &HELLO_MODEL;

    fn key(&self) -> Option<Key> {
        self.id
    }

    fn set_key(&mut self, key: Key) {
        self.id = Some(key);
    }
}

impl FieldValues for Hello {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.to_value()),
            _ => None,
        }
    }
}

///
/// HelloCols
///

#[derive(Clone, Copy, Debug)]
pub struct HelloCols {
    alias: &'static str,
    pub id: KeyField<Hello>,
}

impl HelloCols {
    #[must_use]
    pub const fn as_alias(alias: &'static str) -> Self {
        Self {
            alias,
            id: KeyField::new(alias, "id"),
        }
    }
}

impl QuerySource for HelloCols {
    type Entity = Hello;

    fn source(&self) -> SourceSpec {
        SourceSpec {
            model: Hello::MODEL,
            alias: self.alias,
        }
    }
}

/// Hello columns under the default alias.
#[must_use]
pub const fn hello() -> HelloCols {
    HelloCols::as_alias("hello")
}

///
/// Seed
///
/// Ids produced by the standard fixture load.
///

#[derive(Debug)]
pub struct Seed {
    pub team_a: Id<Team>,
    pub team_b: Id<Team>,
    pub members: Vec<Id<Member>>,
}

/// Load the standard fixture: two teams, four members aged 10..=40 in
/// steps of ten, split evenly between the teams.
pub fn seed(session: &mut Session) -> Result<Seed, Error> {
    let team_a = session.persist(&mut Team::named("teamA"))?;
    let team_b = session.persist(&mut Team::named("teamB"))?;

    let mut members = Vec::new();
    members.push(session.persist(&mut Member::new("member1", 10, Some(team_a)))?);
    members.push(session.persist(&mut Member::new("member2", 20, Some(team_a)))?);
    members.push(session.persist(&mut Member::new("member3", 30, Some(team_b)))?);
    members.push(session.persist(&mut Member::new("member4", 40, Some(team_b)))?);

    Ok(Seed {
        team_a,
        team_b,
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_serializes_associations_as_keys() {
        let mut fixture = Member::new("member1", 10, Some(Id::from_key(Key(7))));
        fixture.set_key(Key(1));

        let encoded = serde_json::to_value(&fixture).unwrap();
        assert_eq!(
            encoded,
            json!({
                "id": 1,
                "name": "member1",
                "age": 10,
                "team": { "key": 7 },
            })
        );
    }

    #[test]
    fn field_values_cover_the_model() {
        let fixture = Member::new("member1", 10, None);
        for field in Member::MODEL.fields {
            assert!(fixture.get_value(field.name).is_some());
        }
        assert!(fixture.get_value("missing").is_none());
        assert_eq!(fixture.get_value("team"), Some(Value::Null));
    }

    #[test]
    fn seed_assigns_per_store_sequences() {
        let mut session = Session::new();
        let loaded = seed(&mut session).unwrap();

        assert_eq!(loaded.team_a.key(), Key(1));
        assert_eq!(loaded.team_b.key(), Key(2));
        let keys: Vec<_> = loaded.members.iter().map(|id| id.key()).collect();
        assert_eq!(keys, [Key(1), Key(2), Key(3), Key(4)]);
    }
}
