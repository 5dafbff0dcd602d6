use crate::{
    db::{
        executor::trace::{QueryTraceEvent, QueryTraceSink},
        query::expr::{Expr, SearchedCase, SubQuery},
        response::ResponseError,
        session::Session,
    },
    test_support::{Member, MemberCols, Team, member, seed, team},
    types::Key,
    value::Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};

fn seeded() -> Session {
    let mut session = Session::new();
    seed(&mut session).unwrap();
    session
}

fn names(members: &[Member]) -> Vec<Option<&str>> {
    members
        .iter()
        .map(|member| member.name.as_deref())
        .collect()
}

// ----------------------------------------------------------------------
// Restriction
// ----------------------------------------------------------------------

#[test]
fn filter_by_name_and_age() {
    let session = seeded();
    let found = session
        .query(&member())
        .filter(member().name.eq("member1"))
        .filter(member().age.eq(10))
        .fetch_one()
        .unwrap();

    assert_eq!(found.name.as_deref(), Some("member1"));
    assert_eq!(found.age, 10);
}

#[test]
fn filter_between_and_in() {
    let session = seeded();
    let found = session
        .query(&member())
        .filter(member().age.between(20, 30))
        .fetch()
        .unwrap();
    assert_eq!(names(&found), [Some("member2"), Some("member3")]);

    let found = session
        .query(&member())
        .filter(member().name.in_list(["member1", "member4"]))
        .fetch()
        .unwrap();
    assert_eq!(names(&found), [Some("member1"), Some("member4")]);
}

#[test]
fn null_comparisons_filter_like_false() {
    let mut session = seeded();
    session.persist(&mut Member::unnamed(50)).unwrap();

    // A comparison over a null field is unknown, not a match, in
    // either direction.
    let eq_rows = session
        .query(&member())
        .filter(member().name.eq("member1"))
        .fetch()
        .unwrap();
    assert_eq!(eq_rows.len(), 1);

    let ne_rows = session
        .query(&member())
        .filter(member().name.ne("member1"))
        .fetch()
        .unwrap();
    assert_eq!(ne_rows.len(), 3);

    let null_rows = session
        .query(&member())
        .filter(member().name.is_null())
        .fetch()
        .unwrap();
    assert_eq!(null_rows.len(), 1);
}

// ----------------------------------------------------------------------
// Terminals and cardinality
// ----------------------------------------------------------------------

#[test]
fn fetch_one_rejects_many() {
    let session = seeded();
    let err = session.query(&member()).fetch_one().unwrap_err();
    assert!(err.is_not_unique());
}

#[test]
fn fetch_one_rejects_none() {
    let session = seeded();
    let err = session
        .query(&member())
        .filter(member().name.eq("nobody"))
        .fetch_one()
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn response_keys_and_one_opt() {
    let session = seeded();

    let all = session.query(&member()).fetch_response().unwrap();
    assert_eq!(all.keys(), [Key(1), Key(2), Key(3), Key(4)]);
    assert!(matches!(all.one_opt(), Err(ResponseError::NotUnique(4))));

    let one = session
        .query(&member())
        .filter(member().name.eq("member1"))
        .fetch_response()
        .unwrap()
        .one_opt()
        .unwrap();
    assert_eq!(one.unwrap().0, Key(1));

    let none = session
        .query(&member())
        .filter(member().name.eq("nobody"))
        .fetch_response()
        .unwrap()
        .one_opt()
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn fetch_first_takes_the_head() {
    let session = seeded();
    let first = session
        .query(&member())
        .order_by(member().age.desc())
        .fetch_first()
        .unwrap()
        .unwrap();
    assert_eq!(first.name.as_deref(), Some("member4"));

    let none = session
        .query(&member())
        .filter(member().name.eq("nobody"))
        .fetch_first()
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn fetch_count_ignores_paging() {
    let session = seeded();
    let count = session
        .query(&member())
        .order_by(member().name.desc())
        .offset(1)
        .limit(2)
        .fetch_count()
        .unwrap();
    assert_eq!(count, 4);
}

#[test]
fn fetch_results_pages_and_totals() {
    let session = seeded();
    let page = session
        .query(&member())
        .order_by(member().name.desc())
        .offset(1)
        .limit(2)
        .fetch_results()
        .unwrap();

    assert_eq!(page.total, 4);
    assert_eq!(page.len(), 2);
    assert_eq!(names(&page.items), [Some("member3"), Some("member2")]);
}

// ----------------------------------------------------------------------
// Ordering
// ----------------------------------------------------------------------

#[test]
fn order_with_explicit_null_placement() {
    let mut session = seeded();
    session
        .persist(&mut Member::new("member5", 100, None))
        .unwrap();
    session
        .persist(&mut Member::new("member6", 100, None))
        .unwrap();
    session.persist(&mut Member::unnamed(100)).unwrap();

    let found = session
        .query(&member())
        .filter(member().age.eq(100))
        .order_by((member().age.desc(), member().name.asc().nulls_last()))
        .fetch()
        .unwrap();

    assert_eq!(names(&found), [Some("member5"), Some("member6"), None]);
}

#[test]
fn default_null_order_is_greatest() {
    let mut session = seeded();
    session.persist(&mut Member::unnamed(50)).unwrap();

    let ascending = session
        .query(&member())
        .order_by(member().name.asc())
        .fetch()
        .unwrap();
    assert_eq!(ascending.last().unwrap().name, None);

    let descending = session
        .query(&member())
        .order_by(member().name.desc())
        .fetch()
        .unwrap();
    assert_eq!(descending.first().unwrap().name, None);
}

// ----------------------------------------------------------------------
// Aggregation and grouping
// ----------------------------------------------------------------------

#[test]
fn aggregate_projection() {
    let session = seeded();
    let row = session
        .query(&member())
        .select((
            member().id.count(),
            member().age.sum(),
            member().age.avg(),
            member().age.max(),
            member().age.min(),
        ))
        .fetch_one()
        .unwrap();

    assert_eq!(row.get_as::<i64>(0), Some(4));
    assert_eq!(row.get_as::<i64>(1), Some(100));
    assert_eq!(row.get_as::<f64>(2), Some(25.0));
    assert_eq!(row.get_as::<i64>(3), Some(40));
    assert_eq!(row.get_as::<i64>(4), Some(10));
}

#[test]
fn aggregate_over_empty_store_yields_one_row() {
    let session = Session::new();
    let row = session
        .query(&member())
        .select(member().id.count())
        .fetch_one()
        .unwrap();

    assert_eq!(row.get_as::<i64>(0), Some(0));
}

#[test]
fn group_by_team_average_age() {
    let session = seeded();
    let rows = session
        .query(&member())
        .join(member().team, &team())
        .group_by(team().name)
        .select((team().name.expr(), member().age.avg()))
        .fetch()
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_as::<String>(0).as_deref(), Some("teamA"));
    assert_eq!(rows[0].get_as::<f64>(1), Some(15.0));
    assert_eq!(rows[1].get_as::<String>(0).as_deref(), Some("teamB"));
    assert_eq!(rows[1].get_as::<f64>(1), Some(35.0));
}

#[test]
fn having_restricts_groups() {
    let session = seeded();
    let rows = session
        .query(&member())
        .join(member().team, &team())
        .group_by(team().name)
        .having(member().age.avg().gt(20_i64))
        .select((team().name.expr(), member().age.avg()))
        .fetch()
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_as::<String>(0).as_deref(), Some("teamB"));
}

// ----------------------------------------------------------------------
// Joins
// ----------------------------------------------------------------------

#[test]
fn inner_join_restricts_to_matching_team() {
    let session = seeded();
    let found = session
        .query(&member())
        .join(member().team, &team())
        .filter(team().name.eq("teamA"))
        .fetch()
        .unwrap();

    assert_eq!(names(&found), [Some("member1"), Some("member2")]);
}

#[test]
fn theta_join_over_unrelated_sources() {
    let mut session = seeded();
    session
        .persist(&mut Member::new("teamA", 0, None))
        .unwrap();
    session
        .persist(&mut Member::new("teamB", 0, None))
        .unwrap();

    let found = session
        .query(&member())
        .and_from(&team())
        .filter(member().name.eq_field(team().name))
        .fetch()
        .unwrap();

    assert_eq!(names(&found), [Some("teamA"), Some("teamB")]);
}

#[test]
fn left_join_on_filters_pairing_not_rows() {
    let session = seeded();
    let rows = session
        .query(&member())
        .left_join(member().team, &team())
        .on(team().name.eq("teamA"))
        .select((member().name.expr(), team().name.expr()))
        .fetch()
        .unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].get_as::<String>(1).as_deref(), Some("teamA"));
    assert_eq!(rows[1].get_as::<String>(1).as_deref(), Some("teamA"));
    assert_eq!(rows[2].get(1), Some(&Value::Null));
    assert_eq!(rows[3].get(1), Some(&Value::Null));
}

#[test]
fn inner_join_where_equals_on() {
    let session = seeded();
    let on_rows = session
        .query(&member())
        .join(member().team, &team())
        .on(team().name.eq("teamA"))
        .select((member().name.expr(), team().name.expr()))
        .fetch()
        .unwrap();
    let where_rows = session
        .query(&member())
        .join(member().team, &team())
        .filter(team().name.eq("teamA"))
        .select((member().name.expr(), team().name.expr()))
        .fetch()
        .unwrap();

    assert_eq!(on_rows, where_rows);
    assert_eq!(on_rows.len(), 2);
}

#[test]
fn left_join_without_association() {
    let mut session = seeded();
    session
        .persist(&mut Member::new("teamA", 0, None))
        .unwrap();

    let rows = session
        .query(&member())
        .left_join_entity(&team())
        .on(member().name.eq_field(team().name))
        .select((member().name.expr(), team().name.expr()))
        .fetch()
        .unwrap();

    // Four seeded members pair with nothing; the member named after a
    // team pairs with it.
    assert_eq!(rows.len(), 5);
    let matched: Vec<_> = rows
        .iter()
        .filter(|row| row.get(1) != Some(&Value::Null))
        .collect();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].get_as::<String>(0).as_deref(), Some("teamA"));
}

#[test]
fn right_join_keeps_unmatched_targets() {
    let mut session = seeded();
    session.persist(&mut Team::named("teamC")).unwrap();

    let rows = session
        .query(&member())
        .right_join(member().team, &team())
        .select((member().name.expr(), team().name.expr()))
        .fetch()
        .unwrap();

    assert_eq!(rows.len(), 5);
    let unmatched: Vec<_> = rows
        .iter()
        .filter(|row| row.get(0) == Some(&Value::Null))
        .collect();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].get_as::<String>(1).as_deref(), Some("teamC"));
}

// ----------------------------------------------------------------------
// Fetch joins
// ----------------------------------------------------------------------

#[test]
fn association_stays_lazy_without_fetch_join() {
    let session = seeded();
    let found = session
        .query(&member())
        .join(member().team, &team())
        .filter(member().name.eq("member1"))
        .fetch_one()
        .unwrap();

    assert!(!found.team.as_ref().unwrap().is_loaded());
}

#[test]
fn fetch_join_hydrates_association() {
    let session = seeded();
    let found = session
        .query(&member())
        .left_join(member().team, &team())
        .fetch_join()
        .filter(member().name.eq("member1"))
        .fetch_one()
        .unwrap();

    let team_ref = found.team.as_ref().unwrap();
    assert!(team_ref.is_loaded());
    assert_eq!(team_ref.target().unwrap().name.as_deref(), Some("teamA"));
}

// ----------------------------------------------------------------------
// Sub-queries
// ----------------------------------------------------------------------

#[test]
fn subquery_eq_max() {
    let session = seeded();
    let sub = MemberCols::as_alias("memberSub");
    let found = session
        .query(&member())
        .filter(member().age.eq_query(SubQuery::select(sub.age.max()).from(sub)))
        .fetch()
        .unwrap();

    assert_eq!(names(&found), [Some("member4")]);
}

#[test]
fn subquery_gte_avg() {
    let session = seeded();
    let sub = MemberCols::as_alias("memberSub");
    let found = session
        .query(&member())
        .filter(member().age.gte_query(SubQuery::select(sub.age.avg()).from(sub)))
        .fetch()
        .unwrap();

    assert_eq!(names(&found), [Some("member3"), Some("member4")]);
}

#[test]
fn subquery_in_membership() {
    let session = seeded();
    let sub = MemberCols::as_alias("memberSub");
    let found = session
        .query(&member())
        .filter(member().age.in_query(
            SubQuery::select(sub.age.expr()).from(sub).filter(sub.age.gt(10)),
        ))
        .fetch()
        .unwrap();

    assert_eq!(
        names(&found),
        [Some("member2"), Some("member3"), Some("member4")]
    );
}

#[test]
fn scalar_subquery_in_projection() {
    let session = seeded();
    let sub = MemberCols::as_alias("memberSub");
    let rows = session
        .query(&member())
        .select((
            member().name.expr(),
            Expr::from(SubQuery::select(sub.age.avg()).from(sub)),
        ))
        .fetch()
        .unwrap();

    assert_eq!(rows.len(), 4);
    for row in &rows {
        assert_eq!(row.get_as::<f64>(1), Some(25.0));
    }
}

// ----------------------------------------------------------------------
// Case expressions, constants, concat
// ----------------------------------------------------------------------

#[test]
fn simple_case_over_a_field() {
    let session = seeded();
    let rows = session
        .query(&member())
        .select(
            member()
                .age
                .case()
                .when(10)
                .then("ten")
                .when(20)
                .then("twenty")
                .otherwise("etc"),
        )
        .fetch()
        .unwrap();

    let labels: Vec<_> = rows
        .iter()
        .map(|row| row.get_as::<String>(0).unwrap())
        .collect();
    assert_eq!(labels, ["ten", "twenty", "etc", "etc"]);
}

#[test]
fn searched_case_over_ranges() {
    let session = seeded();
    let rows = session
        .query(&member())
        .select(
            SearchedCase::new()
                .when(member().age.between(0, 20))
                .then("0~20")
                .when(member().age.between(21, 30))
                .then("21~30")
                .otherwise("etc"),
        )
        .fetch()
        .unwrap();

    let labels: Vec<_> = rows
        .iter()
        .map(|row| row.get_as::<String>(0).unwrap())
        .collect();
    assert_eq!(labels, ["0~20", "0~20", "21~30", "etc"]);
}

#[test]
fn searched_case_without_otherwise_yields_null() {
    let session = seeded();
    let rows = session
        .query(&member())
        .select(
            SearchedCase::new()
                .when(member().age.lte(20))
                .then("young")
                .end(),
        )
        .fetch()
        .unwrap();

    assert_eq!(rows[0].get_as::<String>(0).as_deref(), Some("young"));
    assert_eq!(rows[3].get(0), Some(&Value::Null));
}

#[test]
fn constant_projection() {
    let session = seeded();
    let row = session
        .query(&member())
        .filter(member().name.eq("member1"))
        .select((member().name.expr(), Expr::constant("A")))
        .fetch_one()
        .unwrap();

    assert_eq!(row.get_as::<String>(1).as_deref(), Some("A"));
}

#[test]
fn concat_renders_numbers_as_text() {
    let session = seeded();
    let row = session
        .query(&member())
        .filter(member().name.eq("member1"))
        .select(member().name.concat("_").concat(member().age.to_text()))
        .fetch_one()
        .unwrap();

    assert_eq!(row.get_as::<String>(0).as_deref(), Some("member1_10"));
}

#[test]
fn concat_propagates_null() {
    let mut session = Session::new();
    session.persist(&mut Member::unnamed(99)).unwrap();

    let row = session
        .query(&member())
        .select(member().name.concat("_").concat(member().age.to_text()))
        .fetch_one()
        .unwrap();

    assert_eq!(row.get(0), Some(&Value::Null));
}

// ----------------------------------------------------------------------
// Tracing
// ----------------------------------------------------------------------

#[derive(Default)]
struct CountingSink {
    starts: AtomicUsize,
    phases: AtomicUsize,
    finishes: AtomicUsize,
}

impl QueryTraceSink for CountingSink {
    fn record(&self, event: &QueryTraceEvent) {
        match event {
            QueryTraceEvent::Start { .. } => self.starts.fetch_add(1, Ordering::Relaxed),
            QueryTraceEvent::Phase { .. } => self.phases.fetch_add(1, Ordering::Relaxed),
            QueryTraceEvent::Finish { .. } | QueryTraceEvent::Failed { .. } => {
                self.finishes.fetch_add(1, Ordering::Relaxed)
            }
        };
    }
}

#[test]
fn trace_sink_sees_every_phase() {
    static SINK: CountingSink = CountingSink {
        starts: AtomicUsize::new(0),
        phases: AtomicUsize::new(0),
        finishes: AtomicUsize::new(0),
    };

    let mut session = Session::with_trace(&SINK);
    seed(&mut session).unwrap();

    session
        .query(&member())
        .filter(member().age.gt(10))
        .order_by(member().age.asc())
        .fetch()
        .unwrap();

    assert_eq!(SINK.starts.load(Ordering::Relaxed), 1);
    // Source, join, filter, group, order, page.
    assert_eq!(SINK.phases.load(Ordering::Relaxed), 6);
    assert_eq!(SINK.finishes.load(Ordering::Relaxed), 1);
}
