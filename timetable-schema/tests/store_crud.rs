//! Live-database tests for the store and the timetable schema.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p timetable-schema -- --ignored

use timetable_db::{ConnectionManager, DbConfig, DbError, FilterSet, Store};
use timetable_schema::{setup, Catalog, Course, Group, Room, Schedule, Subject, Teacher};

async fn store() -> Store {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
    let mut config = DbConfig::from_env();
    config.pool_size = 5;
    config.max_overflow = 2;
    let store = Store::new(ConnectionManager::new(config));
    let pool = store.manager().acquire().await.expect("pool creation failed");
    setup::create_all(pool).await.expect("table setup failed");
    store
}

/// Microsecond precision, matching what TIMESTAMPTZ can hold.
fn micros(ts: chrono::DateTime<chrono::Utc>) -> i64 {
    ts.timestamp_micros()
}

#[tokio::test]
#[ignore = "requires database"]
async fn add_then_get_returns_equal_record() {
    let store = store().await;
    let course = Course::new("Algebra add_then_get", Some("intro".into()));
    let id = store.add(&course).await.expect("add failed");

    let found: Vec<Course> = store
        .get(Some(&FilterSet::new().eq("id", id)), None)
        .await
        .expect("get failed");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, Some(id));
    assert_eq!(found[0].name, course.name);
    assert_eq!(found[0].description, course.description);
    assert_eq!(micros(found[0].created_at), micros(course.created_at));
}

#[tokio::test]
#[ignore = "requires database"]
async fn update_preserves_id_and_created_at() {
    let store = store().await;
    let course = Course::new("History update_preserves", None);
    let id = store.add(&course).await.expect("add failed");

    let mut fetched: Vec<Course> = store
        .get(Some(&FilterSet::new().eq("id", id)), None)
        .await
        .expect("get failed");
    let mut persisted = fetched.remove(0);
    let original_created_at = persisted.created_at;

    persisted.description = Some("revised".into());
    persisted.created_at = chrono::Utc::now(); // must not stick
    let updated_id = store.update(&persisted).await.expect("update failed");
    assert_eq!(updated_id, id);

    let after: Vec<Course> = store
        .get(Some(&FilterSet::new().eq("id", id)), None)
        .await
        .expect("get failed");
    assert_eq!(after[0].description.as_deref(), Some("revised"));
    assert_eq!(micros(after[0].created_at), micros(original_created_at));
}

#[tokio::test]
#[ignore = "requires database"]
async fn update_with_unseen_id_inserts() {
    // merge-as-insert semantics, pinned deliberately
    let store = store().await;
    let mut course = Course::new("Phantom update_inserts", None);
    course.id = Some(9_000_000 + (micros(course.created_at) % 1_000_000));
    let id = store.update(&course).await.expect("update failed");
    assert_eq!(Some(id), course.id);

    let found: Vec<Course> = store
        .get(Some(&FilterSet::new().eq("id", id)), None)
        .await
        .expect("get failed");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, course.name);
}

#[tokio::test]
#[ignore = "requires database"]
async fn delete_missing_rows_returns_zero() {
    let store = store().await;
    let count = store
        .delete::<Course>(&FilterSet::new().eq("id", -1i64))
        .await
        .expect("delete failed");
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore = "requires database"]
async fn delete_returns_count_inside_one_transaction() {
    let store = store().await;
    let name = "Doomed delete_count";
    for _ in 0..3 {
        store
            .add(&Course::new(name, None))
            .await
            .expect("add failed");
    }
    let count = store
        .delete::<Course>(&FilterSet::new().eq("name", name))
        .await
        .expect("delete failed");
    assert_eq!(count, 3);

    let left: Vec<Course> = store
        .get(Some(&FilterSet::new().eq("name", name)), None)
        .await
        .expect("get failed");
    assert!(left.is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn not_in_excludes_listed_ids() {
    let store = store().await;
    let mut ids = Vec::new();
    for n in 0..3 {
        let teacher = Teacher::new(format!("Excluded not_in {n}"));
        ids.push(store.add(&teacher).await.expect("add failed"));
    }

    let others: Vec<Teacher> = store
        .get_for_schedule(Some(&FilterSet::new().not_in("id", ids.clone())), None)
        .await
        .expect("get_for_schedule failed");
    for teacher in &others {
        assert!(!ids.contains(&teacher.id.unwrap()));
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn strict_filters_reject_unknown_fields() {
    let store = store().await;
    let err = store
        .get_for_schedule::<Teacher>(Some(&FilterSet::new().eq("cabinet", 3i64)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownField { .. }));
}

#[tokio::test]
#[ignore = "requires database"]
async fn groups_are_found_by_course() {
    let store = store().await;
    let course_id = store
        .add(&Course::new("Algebra groups_by_course", Some("intro".into())))
        .await
        .expect("add course failed");
    let group_id = store
        .add(&Group::new("G1", course_id))
        .await
        .expect("add group failed");

    let groups: Vec<Group> = store
        .get(Some(&FilterSet::new().eq("course_id", course_id)), None)
        .await
        .expect("get failed");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, Some(group_id));
    assert_eq!(groups[0].name, "G1");
    assert_eq!(groups[0].course_id, course_id);
}

async fn seed_slot(store: &Store, day: i32, time_slot: i32) -> (i64, i64, Schedule) {
    let course_id = store
        .add(&Course::new("Course seed_slot", None))
        .await
        .expect("add course failed");
    let group_id = store
        .add(&Group::new("G seed_slot", course_id))
        .await
        .expect("add group failed");
    let subject_id = store
        .add(&Subject::new("Subject seed_slot", "lecture"))
        .await
        .expect("add subject failed");
    let teacher_id = store
        .add(&Teacher::new("Teacher seed_slot"))
        .await
        .expect("add teacher failed");
    let room_id = store
        .add(&Room::new("R seed_slot", "lecture hall"))
        .await
        .expect("add room failed");
    let schedule = Schedule::new(
        course_id, group_id, subject_id, teacher_id, room_id, day, time_slot,
    );
    (teacher_id, room_id, schedule)
}

#[tokio::test]
#[ignore = "requires database"]
async fn busy_teacher_is_excluded_from_availability() {
    let store = store().await;
    let (teacher_id, _room_id, schedule) = seed_slot(&store, 1, 2).await;
    store.add(&schedule).await.expect("add schedule failed");
    // same teacher, same slot, different room
    let other_room = store
        .add(&Room::new("R2 seed_slot", "lab"))
        .await
        .expect("add room failed");
    let mut second = schedule.clone();
    second.room_id = other_room;
    store.add(&second).await.expect("add schedule failed");

    let catalog = Catalog::new(store);
    let free = catalog.free_teachers(1, 2).await.expect("lookup failed");
    assert!(free.iter().all(|t| t.id != Some(teacher_id)));
}

#[tokio::test]
#[ignore = "requires database"]
async fn schedule_loads_relations_in_one_pass() {
    let store = store().await;
    let (_teacher_id, _room_id, schedule) = seed_slot(&store, 2, 3).await;
    let group_id = schedule.group_id;
    store.add(&schedule).await.expect("add schedule failed");

    let loaded = store
        .get_with_relations::<Schedule>(
            Some(&FilterSet::new().eq("group_id", group_id)),
            None,
            &["teacher", "room", "subject"],
        )
        .await
        .expect("eager load failed");
    assert_eq!(loaded.len(), 1);
    let related = &loaded[0].related;
    assert_eq!(related["teacher"].len(), 1);
    assert_eq!(related["teacher"][0]["name"], "Teacher seed_slot");
    assert_eq!(related["room"][0]["name"], "R seed_slot");
    assert_eq!(related["subject"][0]["subject_type"], "lecture");
}

#[tokio::test]
#[ignore = "requires database"]
async fn course_groups_load_with_the_parent_fetch() {
    let store = store().await;
    let course_id = store
        .add(&Course::new("Course eager_groups", None))
        .await
        .expect("add course failed");
    for n in 0..2 {
        store
            .add(&Group::new(format!("G{n} eager_groups"), course_id))
            .await
            .expect("add group failed");
    }

    let loaded = store
        .get_with_relations::<Course>(
            Some(&FilterSet::new().eq("id", course_id)),
            None,
            &["groups"],
        )
        .await
        .expect("eager load failed");
    assert_eq!(loaded.len(), 1);
    let groups = &loaded[0].related["groups"];
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g["course_id"] == course_id));
}

#[tokio::test]
#[ignore = "requires database"]
async fn constraint_violation_propagates_without_retry() {
    let store = store().await;
    // group pointing at a course that does not exist
    let orphan = Group::new("Orphan fk_violation", -42);
    let err = store.add(&orphan).await.unwrap_err();
    assert!(matches!(err, DbError::Constraint { .. }));
}

#[tokio::test]
#[ignore = "requires database"]
async fn soft_fail_course_helper_returns_none_not_error() {
    let mut config = DbConfig::from_env();
    // point at a database that is very unlikely to exist
    config.database_url = "postgres://localhost:1/absent".into();
    config.acquire_timeout_secs = 1;
    let catalog = Catalog::new(Store::with_retry(
        ConnectionManager::new(config),
        timetable_db::RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        },
    ));
    assert_eq!(catalog.add_course("Ghost", None).await, None);
}

#[tokio::test]
#[ignore = "requires database"]
async fn execute_runs_callable_operations() {
    let store = store().await;
    let two: i64 = store
        .execute("select_two", |conn: &mut sqlx::PgConnection| {
            Box::pin(async move {
                let row: (i64,) = sqlx::query_as("SELECT 2::bigint")
                    .fetch_one(conn)
                    .await
                    .map_err(DbError::from)?;
                Ok(row.0)
            })
        })
        .await
        .expect("execute failed");
    assert_eq!(two, 2);

    store
        .execute_sql("SET statement_timeout = 60000")
        .await
        .expect("execute_sql failed");
}

#[tokio::test]
#[ignore = "requires database"]
async fn lenient_get_ignores_unknown_filter_fields() {
    let store = store().await;
    let id = store
        .add(&Course::new("Lenient get_skips", None))
        .await
        .expect("add failed");
    let found: Vec<Course> = store
        .get(
            Some(&FilterSet::new().eq("id", id).eq("wing", "east")),
            None,
        )
        .await
        .expect("get failed");
    assert_eq!(found.len(), 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn get_honors_limit() {
    let store = store().await;
    let name = "Limited get_limit";
    for _ in 0..4 {
        store
            .add(&Course::new(name, None))
            .await
            .expect("add failed");
    }
    let found: Vec<Course> = store
        .get(Some(&FilterSet::new().eq("name", name)), Some(2))
        .await
        .expect("get failed");
    assert_eq!(found.len(), 2);
}
