//! Course records keyed by sequential id

use crate::constants::FIRST_COURSE_ID;
use crate::{Address, Amount, CourseId, LedgerError, LedgerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A course as stored on the ledger
///
/// Descriptive content (title, lessons, images) lives off-ledger behind `metadata_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Sequential id, starting at 1
    pub id: CourseId,
    /// Opaque content reference, e.g. an IPFS CID
    pub metadata_ref: String,
    /// Price in token base units, never zero
    pub price: Amount,
    /// Account paid for every purchase
    pub instructor: Address,
    /// Whether the course can be purchased
    pub is_active: bool,
    /// Creation time, never changed
    pub created_at: DateTime<Utc>,
    /// Number of enrollments
    pub total_students: u64,
}

/// One page of active courses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCoursesPage {
    /// Active courses on this page, ascending by id
    pub courses: Vec<Course>,
    /// Number of active courses across all pages
    pub total_count: usize,
}

/// Course registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRegistry {
    courses: BTreeMap<CourseId, Course>,
    next_course_id: CourseId,
    instructor_courses: BTreeMap<Address, Vec<CourseId>>,
}

impl Default for CourseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CourseRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            courses: BTreeMap::new(),
            next_course_id: FIRST_COURSE_ID,
            instructor_courses: BTreeMap::new(),
        }
    }

    /// Register a new active course and return its id
    pub fn create_course(
        &mut self,
        instructor: Address,
        price: Amount,
        metadata_ref: String,
        now: DateTime<Utc>,
    ) -> LedgerResult<CourseId> {
        if instructor.is_zero() {
            return Err(LedgerError::InvalidSender);
        }
        if price.is_zero() {
            return Err(LedgerError::InvalidPrice);
        }
        if metadata_ref.is_empty() {
            return Err(LedgerError::InvalidMetadata);
        }

        let id = self.next_course_id;
        let next = id.checked_add(1).ok_or(LedgerError::Overflow)?;

        self.courses.insert(
            id,
            Course {
                id,
                metadata_ref,
                price,
                instructor,
                is_active: true,
                created_at: now,
                total_students: 0,
            },
        );
        self.instructor_courses.entry(instructor).or_default().push(id);
        self.next_course_id = next;
        Ok(id)
    }

    /// Replace price and metadata reference of an existing course
    pub fn update_course(
        &mut self,
        caller: Address,
        course_id: CourseId,
        new_metadata_ref: String,
        new_price: Amount,
    ) -> LedgerResult<&Course> {
        let course = self.instructor_course_mut(caller, course_id)?;
        if new_price.is_zero() {
            return Err(LedgerError::InvalidPrice);
        }

        course.metadata_ref = new_metadata_ref;
        course.price = new_price;
        Ok(&*course)
    }

    /// Flip the active flag and return the new value
    pub fn toggle_course_status(&mut self, caller: Address, course_id: CourseId) -> LedgerResult<bool> {
        let course = self.instructor_course_mut(caller, course_id)?;
        course.is_active = !course.is_active;
        Ok(course.is_active)
    }

    /// Get course by id
    pub fn get(&self, course_id: CourseId) -> LedgerResult<&Course> {
        self.courses.get(&course_id).ok_or(LedgerError::NotFound(course_id))
    }

    pub(crate) fn get_mut(&mut self, course_id: CourseId) -> LedgerResult<&mut Course> {
        self.courses.get_mut(&course_id).ok_or(LedgerError::NotFound(course_id))
    }

    /// Whether a course with this id exists
    pub fn contains(&self, course_id: CourseId) -> bool {
        self.courses.contains_key(&course_id)
    }

    /// Active courses ordered by ascending id, skipping `offset` and returning at most `limit`
    pub fn active_courses(&self, offset: usize, limit: usize) -> ActiveCoursesPage {
        let active = self.courses.values().filter(|course| course.is_active);
        let total_count = active.clone().count();
        let courses = active.skip(offset).take(limit).cloned().collect();

        ActiveCoursesPage {
            courses,
            total_count,
        }
    }

    /// Ids of the courses created by `instructor`, in creation order
    pub fn instructor_courses(&self, instructor: &Address) -> &[CourseId] {
        self.instructor_courses
            .get(instructor)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Id the next created course will receive
    pub fn next_course_id(&self) -> CourseId {
        self.next_course_id
    }

    /// Number of courses ever created
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    /// Whether no course has been created yet
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// All courses, ascending by id
    pub fn iter(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    fn instructor_course_mut(&mut self, caller: Address, course_id: CourseId) -> LedgerResult<&mut Course> {
        let course = self.get_mut(course_id)?;
        if course.instructor != caller {
            return Err(LedgerError::Unauthorized { caller });
        }
        Ok(course)
    }
}
