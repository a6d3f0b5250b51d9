//! Record kinds for the timetable schema.
//!
//! Every kind carries a storage-assigned `id`, a creation timestamp
//! fixed at construction, and its typed fields. Constructors build
//! unpersisted instances (`id: None`); ownership of persisted state
//! moves to the storage engine once a record passes through the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use timetable_db::{Record, RelationDef, RelationKind, SqlValue};

/// A course of study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    #[serde(default)]
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub description: Option<String>,
}

impl Course {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            name: name.into(),
            description,
        }
    }
}

impl Record for Course {
    const TABLE: &'static str = "courses";
    const COLUMNS: &'static [&'static str] = &["created_at", "name", "description"];
    const FIELDS: &'static [&'static str] = &["id", "created_at", "name", "description"];
    const RELATIONS: &'static [RelationDef] = &[
        RelationDef {
            name: "groups",
            table: "groups",
            kind: RelationKind::OneToMany {
                remote_key: "course_id",
            },
        },
        RelationDef {
            name: "schedules",
            table: "schedules",
            kind: RelationKind::OneToMany {
                remote_key: "course_id",
            },
        },
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.created_at.into(),
            self.name.clone().into(),
            self.description.clone().into(),
        ]
    }

    fn field(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => self.id.map(SqlValue::Int),
            "created_at" => Some(self.created_at.into()),
            "name" => Some(self.name.clone().into()),
            "description" => Some(self.description.clone().into()),
            _ => None,
        }
    }
}

/// A student group within a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Group {
    #[serde(default)]
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub course_id: i64,
}

impl Group {
    pub fn new(name: impl Into<String>, course_id: i64) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            name: name.into(),
            course_id,
        }
    }
}

impl Record for Group {
    const TABLE: &'static str = "groups";
    const COLUMNS: &'static [&'static str] = &["created_at", "name", "course_id"];
    const FIELDS: &'static [&'static str] = &["id", "created_at", "name", "course_id"];
    const RELATIONS: &'static [RelationDef] = &[
        RelationDef {
            name: "course",
            table: "courses",
            kind: RelationKind::ManyToOne {
                local_key: "course_id",
            },
        },
        RelationDef {
            name: "schedules",
            table: "schedules",
            kind: RelationKind::OneToMany {
                remote_key: "group_id",
            },
        },
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.created_at.into(),
            self.name.clone().into(),
            self.course_id.into(),
        ]
    }

    fn field(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => self.id.map(SqlValue::Int),
            "created_at" => Some(self.created_at.into()),
            "name" => Some(self.name.clone().into()),
            "course_id" => Some(self.course_id.into()),
            _ => None,
        }
    }
}

/// A teacher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    #[serde(default)]
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub sciencename: Option<String>,
    pub classtime: Option<String>,
}

impl Teacher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            name: name.into(),
            sciencename: None,
            classtime: None,
        }
    }
}

impl Record for Teacher {
    const TABLE: &'static str = "teachers";
    const COLUMNS: &'static [&'static str] = &["created_at", "name", "sciencename", "classtime"];
    const FIELDS: &'static [&'static str] =
        &["id", "created_at", "name", "sciencename", "classtime"];
    const RELATIONS: &'static [RelationDef] = &[RelationDef {
        name: "schedules",
        table: "schedules",
        kind: RelationKind::OneToMany {
            remote_key: "teacher_id",
        },
    }];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.created_at.into(),
            self.name.clone().into(),
            self.sciencename.clone().into(),
            self.classtime.clone().into(),
        ]
    }

    fn field(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => self.id.map(SqlValue::Int),
            "created_at" => Some(self.created_at.into()),
            "name" => Some(self.name.clone().into()),
            "sciencename" => Some(self.sciencename.clone().into()),
            "classtime" => Some(self.classtime.clone().into()),
            _ => None,
        }
    }
}

/// Per-teacher subject load summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TeacherInfo {
    #[serde(default)]
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub teacher_id: i64,
    pub name: String,
    pub subject_name: Option<String>,
    pub subject_number: Option<String>,
}

impl TeacherInfo {
    pub fn new(teacher_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            teacher_id,
            name: name.into(),
            subject_name: None,
            subject_number: None,
        }
    }
}

impl Record for TeacherInfo {
    const TABLE: &'static str = "teacher_infos";
    const COLUMNS: &'static [&'static str] = &[
        "created_at",
        "teacher_id",
        "name",
        "subject_name",
        "subject_number",
    ];
    const FIELDS: &'static [&'static str] = &[
        "id",
        "created_at",
        "teacher_id",
        "name",
        "subject_name",
        "subject_number",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.created_at.into(),
            self.teacher_id.into(),
            self.name.clone().into(),
            self.subject_name.clone().into(),
            self.subject_number.clone().into(),
        ]
    }

    fn field(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => self.id.map(SqlValue::Int),
            "created_at" => Some(self.created_at.into()),
            "teacher_id" => Some(self.teacher_id.into()),
            "name" => Some(self.name.clone().into()),
            "subject_name" => Some(self.subject_name.clone().into()),
            "subject_number" => Some(self.subject_number.clone().into()),
            _ => None,
        }
    }
}

/// A taught subject (mathematics, physics, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subject {
    #[serde(default)]
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub subject_type: String,
    pub course_id: Option<String>,
    pub course_name: Option<String>,
}

impl Subject {
    pub fn new(name: impl Into<String>, subject_type: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            name: name.into(),
            subject_type: subject_type.into(),
            course_id: None,
            course_name: None,
        }
    }
}

impl Record for Subject {
    const TABLE: &'static str = "subjects";
    const COLUMNS: &'static [&'static str] = &[
        "created_at",
        "name",
        "subject_type",
        "course_id",
        "course_name",
    ];
    const FIELDS: &'static [&'static str] = &[
        "id",
        "created_at",
        "name",
        "subject_type",
        "course_id",
        "course_name",
    ];
    const RELATIONS: &'static [RelationDef] = &[RelationDef {
        name: "schedules",
        table: "schedules",
        kind: RelationKind::OneToMany {
            remote_key: "subject_id",
        },
    }];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.created_at.into(),
            self.name.clone().into(),
            self.subject_type.clone().into(),
            self.course_id.clone().into(),
            self.course_name.clone().into(),
        ]
    }

    fn field(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => self.id.map(SqlValue::Int),
            "created_at" => Some(self.created_at.into()),
            "name" => Some(self.name.clone().into()),
            "subject_type" => Some(self.subject_type.clone().into()),
            "course_id" => Some(self.course_id.clone().into()),
            "course_name" => Some(self.course_name.clone().into()),
            _ => None,
        }
    }
}

/// Lesson delivery form (lecture, practice, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LessonType {
    #[serde(default)]
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub name: String,
}

impl LessonType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            name: name.into(),
        }
    }
}

impl Record for LessonType {
    const TABLE: &'static str = "lesson_types";
    const COLUMNS: &'static [&'static str] = &["created_at", "name"];
    const FIELDS: &'static [&'static str] = &["id", "created_at", "name"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.created_at.into(), self.name.clone().into()]
    }

    fn field(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => self.id.map(SqlValue::Int),
            "created_at" => Some(self.created_at.into()),
            "name" => Some(self.name.clone().into()),
            _ => None,
        }
    }
}

/// A room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Room {
    #[serde(default)]
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub roomstype: String,
}

impl Room {
    pub fn new(name: impl Into<String>, roomstype: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            name: name.into(),
            roomstype: roomstype.into(),
        }
    }
}

impl Record for Room {
    const TABLE: &'static str = "rooms";
    const COLUMNS: &'static [&'static str] = &["created_at", "name", "roomstype"];
    const FIELDS: &'static [&'static str] = &["id", "created_at", "name", "roomstype"];
    const RELATIONS: &'static [RelationDef] = &[RelationDef {
        name: "schedules",
        table: "schedules",
        kind: RelationKind::OneToMany {
            remote_key: "room_id",
        },
    }];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.created_at.into(),
            self.name.clone().into(),
            self.roomstype.clone().into(),
        ]
    }

    fn field(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => self.id.map(SqlValue::Int),
            "created_at" => Some(self.created_at.into()),
            "name" => Some(self.name.clone().into()),
            "roomstype" => Some(self.roomstype.clone().into()),
            _ => None,
        }
    }
}

/// One timetable slot.
///
/// The only kind with a real consistency concern: no two rows should
/// share (teacher, day, time_slot) or (room, day, time_slot). Storage
/// stays permissive; callers keep the invariant through the
/// availability lookups on the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Schedule {
    #[serde(default)]
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub course_id: i64,
    pub group_id: i64,
    pub subject_id: i64,
    pub teacher_id: i64,
    pub room_id: i64,
    /// Day of week, Monday = 1
    pub day: i32,
    /// Lesson slot within the day, starting at 1
    pub time_slot: i32,
}

impl Schedule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        course_id: i64,
        group_id: i64,
        subject_id: i64,
        teacher_id: i64,
        room_id: i64,
        day: i32,
        time_slot: i32,
    ) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            course_id,
            group_id,
            subject_id,
            teacher_id,
            room_id,
            day,
            time_slot,
        }
    }
}

impl Record for Schedule {
    const TABLE: &'static str = "schedules";
    const COLUMNS: &'static [&'static str] = &[
        "created_at",
        "course_id",
        "group_id",
        "subject_id",
        "teacher_id",
        "room_id",
        "day",
        "time_slot",
    ];
    const FIELDS: &'static [&'static str] = &[
        "id",
        "created_at",
        "course_id",
        "group_id",
        "subject_id",
        "teacher_id",
        "room_id",
        "day",
        "time_slot",
    ];
    const RELATIONS: &'static [RelationDef] = &[
        RelationDef {
            name: "course",
            table: "courses",
            kind: RelationKind::ManyToOne {
                local_key: "course_id",
            },
        },
        RelationDef {
            name: "group",
            table: "groups",
            kind: RelationKind::ManyToOne {
                local_key: "group_id",
            },
        },
        RelationDef {
            name: "subject",
            table: "subjects",
            kind: RelationKind::ManyToOne {
                local_key: "subject_id",
            },
        },
        RelationDef {
            name: "teacher",
            table: "teachers",
            kind: RelationKind::ManyToOne {
                local_key: "teacher_id",
            },
        },
        RelationDef {
            name: "room",
            table: "rooms",
            kind: RelationKind::ManyToOne {
                local_key: "room_id",
            },
        },
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.created_at.into(),
            self.course_id.into(),
            self.group_id.into(),
            self.subject_id.into(),
            self.teacher_id.into(),
            self.room_id.into(),
            self.day.into(),
            self.time_slot.into(),
        ]
    }

    fn field(&self, name: &str) -> Option<SqlValue> {
        match name {
            "id" => self.id.map(SqlValue::Int),
            "created_at" => Some(self.created_at.into()),
            "course_id" => Some(self.course_id.into()),
            "group_id" => Some(self.group_id.into()),
            "subject_id" => Some(self.subject_id.into()),
            "teacher_id" => Some(self.teacher_id.into()),
            "room_id" => Some(self.room_id.into()),
            "day" => Some(self.day.into()),
            "time_slot" => Some(self.time_slot.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_registry<R: Record>(instance: &R) {
        assert_eq!(
            R::COLUMNS.len(),
            instance.values().len(),
            "values() out of step with COLUMNS for {}",
            R::TABLE
        );
        assert_eq!(R::COLUMNS.first(), Some(&"created_at"));
        assert!(R::FIELDS.contains(&"id"));
        for column in R::COLUMNS {
            assert!(
                R::FIELDS.contains(column),
                "column {column} missing from FIELDS for {}",
                R::TABLE
            );
            assert!(
                instance.field(column).is_some(),
                "field({column}) missing for {}",
                R::TABLE
            );
        }
    }

    #[test]
    fn registries_are_consistent() {
        check_registry(&Course::new("Algebra", None));
        check_registry(&Group::new("G1", 1));
        check_registry(&Teacher::new("Karimov"));
        check_registry(&TeacherInfo::new(1, "Karimov"));
        check_registry(&Subject::new("Algebra", "lecture"));
        check_registry(&LessonType::new("lecture"));
        check_registry(&Room::new("101", "lecture hall"));
        check_registry(&Schedule::new(1, 2, 3, 4, 5, 1, 2));
    }

    #[test]
    fn constructors_leave_id_unassigned() {
        let course = Course::new("Algebra", Some("intro".into()));
        assert!(course.id.is_none());
        assert_eq!(course.field("name"), Some("Algebra".into()));
        assert_eq!(course.field("bogus"), None);
    }

    #[test]
    fn relations_resolve_by_name() {
        let def = Schedule::relation("teacher").unwrap();
        assert_eq!(def.table, "teachers");
        assert!(matches!(
            def.kind,
            RelationKind::ManyToOne {
                local_key: "teacher_id"
            }
        ));
        assert!(Schedule::relation("building").is_none());
        assert!(Course::relation("groups").is_some());
    }

    #[test]
    fn records_serialize_to_json() {
        let mut group = Group::new("G1", 7);
        group.id = Some(2);
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["name"], "G1");
        assert_eq!(json["course_id"], 7);
        let back: Group = serde_json::from_value(json).unwrap();
        assert_eq!(back, group);
    }
}
