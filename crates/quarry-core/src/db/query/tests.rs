use crate::{
    db::{
        query::{
            expr::SubQuery,
            field::{IntField, KeyField},
            predicate::{Predicate, normalize},
            select::{JoinKind, Projection},
            sort::{NullOrder, OrderDirection},
            validate,
        },
        session::Session,
    },
    error::{ErrorClass, ErrorOrigin},
    test_support::{member, team},
};
use proptest::prelude::*;

#[test]
fn filter_conjoins_predicates() {
    let session = Session::new();
    let query = session
        .query(&member())
        .filter(member().age.gt(10))
        .filter(member().name.eq("member1"));

    let Some(Predicate::And(parts)) = &query.spec().predicate else {
        panic!("expected implicit conjunction");
    };
    assert_eq!(parts.len(), 2);
}

#[test]
fn filter_all_skips_absent_terms() {
    let session = Session::new();
    let query = session.query(&member()).filter_all([
        Some(member().age.gte(10)),
        None,
        Some(member().age.lte(30)),
        None,
    ]);

    let Some(Predicate::And(parts)) = &query.spec().predicate else {
        panic!("expected implicit conjunction");
    };
    assert_eq!(parts.len(), 2);
}

#[test]
fn predicate_combinators_flatten_left() {
    let combined = member()
        .age
        .eq(10)
        .and(member().age.eq(20))
        .and(member().age.eq(30));

    let Predicate::And(parts) = combined else {
        panic!("expected conjunction");
    };
    assert_eq!(parts.len(), 3);
}

#[test]
fn normalize_flattens_nested_chains() {
    let nested = Predicate::And(vec![
        Predicate::And(vec![member().age.eq(1), member().age.eq(2)]),
        member().age.eq(3),
    ]);

    let Predicate::And(parts) = normalize(&nested) else {
        panic!("expected conjunction");
    };
    assert_eq!(parts.len(), 3);
}

#[test]
fn normalize_collapses_single_child() {
    let wrapped = Predicate::Or(vec![member().age.eq(1)]);
    assert_eq!(normalize(&wrapped), member().age.eq(1));
}

#[test]
fn sort_key_null_policy() {
    let key = member().name.asc().nulls_last();
    assert_eq!(key.direction, OrderDirection::Asc);
    assert_eq!(key.nulls, NullOrder::Last);

    let key = member().age.desc();
    assert_eq!(key.nulls, NullOrder::Default);
}

#[test]
fn select_switches_projection() {
    let session = Session::new();
    let query = session
        .query(&member())
        .select((member().name, member().age));

    let Projection::Exprs(exprs) = &query.spec().projection else {
        panic!("expected tuple projection");
    };
    assert_eq!(exprs.len(), 2);
}

#[test]
fn join_records_link_and_kind() {
    let session = Session::new();
    let query = session
        .query(&member())
        .left_join(member().team, &team())
        .fetch_join();

    let join = &query.spec().joins[0];
    assert_eq!(join.kind, JoinKind::Left);
    assert!(join.fetch);
    let link = join.link.as_ref().unwrap();
    assert_eq!(link.alias, "member");
    assert_eq!(link.field, "team");
}

#[test]
fn subquery_builder_accumulates_filters() {
    let sub = SubQuery::select(member().age.max())
        .from(member())
        .filter(member().age.gt(0));

    assert!(sub.predicate.is_some());
    assert!(sub.projection.contains_aggregate());
}

#[test]
fn on_without_join_is_rejected() {
    let session = Session::new();
    let query = session
        .query(&member())
        .on(member().name.eq("x"));

    let err = validate::validate(query.spec()).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert_eq!(err.origin, ErrorOrigin::Query);
}

#[test]
fn having_without_group_is_rejected() {
    let session = Session::new();
    let query = session
        .query(&member())
        .having(member().age.gt(10));

    let err = validate::validate(query.spec()).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn unknown_alias_is_rejected() {
    let session = Session::new();
    let query = session
        .query(&member())
        .filter(IntField::new("ghost", "age").gt(1));

    let err = validate::validate(query.spec()).unwrap_err();
    assert!(err.message.contains("ghost"));
}

#[test]
fn unknown_field_is_rejected() {
    let session = Session::new();
    let query = session
        .query(&member())
        .filter(IntField::new("member", "height").gt(1));

    let err = validate::validate(query.spec()).unwrap_err();
    assert!(err.message.contains("height"));
}

#[test]
fn join_along_non_association_is_rejected() {
    let session = Session::new();
    let query = session
        .query(&member())
        .join(KeyField::new("member", "id"), &team());

    let err = validate::validate(query.spec()).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn duplicate_alias_is_rejected() {
    let session = Session::new();
    let query = session.query(&member()).and_from(&member());

    let err = validate::validate(query.spec()).unwrap_err();
    assert!(err.message.contains("alias"));
}

#[test]
fn aggregate_group_key_is_rejected() {
    let session = Session::new();
    let query = session
        .query(&member())
        .group_by(member().age.sum())
        .select(member().age.sum());

    let err = validate::validate(query.spec()).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn ungrouped_projection_is_rejected() {
    let session = Session::new();
    let query = session
        .query(&member())
        .join(member().team, &team())
        .group_by(team().name)
        .select((team().name.expr(), member().age.expr()));

    let err = validate::validate(query.spec()).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn grouped_entity_projection_is_rejected() {
    let session = Session::new();
    let query = session
        .query(&member())
        .join(member().team, &team())
        .group_by(team().name);

    let err = validate::validate(query.spec()).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert!(err.message.contains("entity"));
}

#[test]
fn grouped_aggregate_projection_is_accepted() {
    let session = Session::new();
    let query = session
        .query(&member())
        .join(member().team, &team())
        .group_by(team().name)
        .select((team().name.expr(), member().age.avg()));

    assert!(validate::validate(query.spec()).is_ok());
}

fn leaf() -> impl Strategy<Value = Predicate> {
    (0_i64..5).prop_map(|v| member().age.eq(v))
}

fn predicate_tree() -> impl Strategy<Value = Predicate> {
    leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Predicate::And),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Predicate::Or),
            inner.prop_map(|p| p.not()),
        ]
    })
}

proptest! {
    #[test]
    fn normalize_is_idempotent(predicate in predicate_tree()) {
        let once = normalize(&predicate);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_never_nests_same_combinator(predicate in predicate_tree()) {
        fn check(p: &Predicate) -> bool {
            match p {
                Predicate::And(parts) => parts
                    .iter()
                    .all(|part| !matches!(part, Predicate::And(_)) && check(part)),
                Predicate::Or(parts) => parts
                    .iter()
                    .all(|part| !matches!(part, Predicate::Or(_)) && check(part)),
                Predicate::Not(inner) => check(inner),
                _ => true,
            }
        }
        prop_assert!(check(&normalize(&predicate)));
    }
}
