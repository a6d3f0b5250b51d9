//! Domain helpers over the store.
//!
//! Thin compositions the admin endpoints call directly. Everything
//! here propagates errors, with one documented exception: see
//! [`Catalog::add_course`].

use timetable_db::{FilterSet, Loaded, Result, Store};

use crate::records::{Course, Group, Room, Schedule, Teacher};

/// Domain-level access to the timetable catalog
pub struct Catalog {
    store: Store,
}

impl Catalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Add a course, returning `None` on failure.
    ///
    /// Soft failure is intentional here and only here: the admin UI
    /// treats a failed course insert as "nothing created" rather than
    /// an error page. The cause is logged. Every sibling helper
    /// propagates.
    pub async fn add_course(&self, name: &str, description: Option<&str>) -> Option<i64> {
        let course = Course::new(name, description.map(str::to_owned));
        match self.store.add(&course).await {
            Ok(id) => {
                tracing::info!(id, name, "course added");
                Some(id)
            }
            Err(err) => {
                tracing::error!(error = %err, name, "failed to add course");
                None
            }
        }
    }

    /// Groups belonging to a course.
    pub async fn groups_of_course(&self, course_id: i64) -> Result<Vec<Group>> {
        let filters = FilterSet::new().eq("course_id", course_id);
        self.store.get(Some(&filters), None).await
    }

    /// A group's timetable with subject, teacher, and room rows
    /// materialized in the same round trip.
    pub async fn schedule_for_group(&self, group_id: i64) -> Result<Vec<Loaded<Schedule>>> {
        let filters = FilterSet::new().eq("group_id", group_id);
        self.store
            .get_with_relations(Some(&filters), None, &["subject", "teacher", "room"])
            .await
    }

    /// Teachers with no lesson at the given day and slot.
    pub async fn free_teachers(&self, day: i32, time_slot: i32) -> Result<Vec<Teacher>> {
        let busy: Vec<i64> = self
            .schedules_at(day, time_slot)
            .await?
            .iter()
            .map(|s| s.teacher_id)
            .collect();
        let filters = FilterSet::new().not_in("id", busy);
        self.store.get_for_schedule(Some(&filters), None).await
    }

    /// Rooms with no lesson at the given day and slot.
    pub async fn free_rooms(&self, day: i32, time_slot: i32) -> Result<Vec<Room>> {
        let busy: Vec<i64> = self
            .schedules_at(day, time_slot)
            .await?
            .iter()
            .map(|s| s.room_id)
            .collect();
        let filters = FilterSet::new().not_in("id", busy);
        self.store.get_for_schedule(Some(&filters), None).await
    }

    async fn schedules_at(&self, day: i32, time_slot: i32) -> Result<Vec<Schedule>> {
        let filters = FilterSet::new().eq("day", day).eq("time_slot", time_slot);
        self.store.get(Some(&filters), None).await
    }
}
