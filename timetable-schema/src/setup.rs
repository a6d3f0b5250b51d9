//! Table bootstrap for the timetable schema.
//!
//! Idempotent `CREATE TABLE IF NOT EXISTS` statements, enough to bring
//! up a fresh database or a throwaway test instance. No uniqueness
//! constraint guards (teacher, day, time_slot) or (room, day,
//! time_slot); the availability lookups own that invariant.

use sqlx::PgPool;

use timetable_db::Result;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS courses (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        name TEXT NOT NULL,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        name TEXT NOT NULL,
        course_id BIGINT NOT NULL REFERENCES courses(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teachers (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        name TEXT NOT NULL,
        sciencename TEXT,
        classtime TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teacher_infos (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        teacher_id BIGINT NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        subject_name TEXT,
        subject_number TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS subjects (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        name TEXT NOT NULL,
        subject_type TEXT NOT NULL,
        course_id TEXT,
        course_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lesson_types (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        name TEXT NOT NULL,
        roomstype TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS schedules (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        course_id BIGINT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
        subject_id BIGINT NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
        teacher_id BIGINT NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
        room_id BIGINT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
        day INT NOT NULL,
        time_slot INT NOT NULL
    )
    "#,
];

/// Create all timetable tables.
pub async fn create_all(pool: &PgPool) -> Result<()> {
    tracing::info!("creating timetable tables");
    for &ddl in TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}
