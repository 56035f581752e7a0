//! Paid (course, student) pairs

use crate::registry::Course;
use crate::{Address, CourseId, LedgerError, LedgerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proof that a student paid for a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Course paid for
    pub course_id: CourseId,
    /// Paying account
    pub student: Address,
    /// Purchase time
    pub enrolled_at: DateTime<Utc>,
}

/// Enrollment ledger
///
/// Holds at most one record per (course, student) pair. Records are never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentLedger {
    records: BTreeMap<CourseId, BTreeMap<Address, Enrollment>>,
    course_students: BTreeMap<CourseId, Vec<Address>>,
    student_courses: BTreeMap<Address, Vec<CourseId>>,
}

impl EnrollmentLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `student` has paid for `course_id`
    pub fn has_enrolled(&self, course_id: CourseId, student: &Address) -> bool {
        self.enrollment(course_id, student).is_some()
    }

    /// The enrollment record for a pair, if any
    pub fn enrollment(&self, course_id: CourseId, student: &Address) -> Option<&Enrollment> {
        self.records
            .get(&course_id)
            .and_then(|students| students.get(student))
    }

    /// Fail with `AlreadyEnrolled` if the pair exists
    pub fn ensure_not_enrolled(&self, course_id: CourseId, student: Address) -> LedgerResult<()> {
        if self.has_enrolled(course_id, &student) {
            return Err(LedgerError::AlreadyEnrolled { course_id, student });
        }
        Ok(())
    }

    /// Record a paid enrollment and bump the course's student count
    pub fn record_enrollment(
        &mut self,
        course: &mut Course,
        student: Address,
        now: DateTime<Utc>,
    ) -> LedgerResult<&Enrollment> {
        let course_id = course.id;
        self.ensure_not_enrolled(course_id, student)?;
        let total_students = course
            .total_students
            .checked_add(1)
            .ok_or(LedgerError::Overflow)?;

        course.total_students = total_students;
        self.course_students.entry(course_id).or_default().push(student);
        self.student_courses.entry(student).or_default().push(course_id);

        let record = Enrollment {
            course_id,
            student,
            enrolled_at: now,
        };
        let stored = self
            .records
            .entry(course_id)
            .or_default()
            .entry(student)
            .or_insert(record);
        Ok(&*stored)
    }

    /// Courses bought by `student`, in purchase order
    pub fn student_courses(&self, student: &Address) -> &[CourseId] {
        self.student_courses
            .get(student)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Students of `course_id`, in purchase order
    pub fn course_students(&self, course_id: CourseId) -> &[Address] {
        self.course_students
            .get(&course_id)
            .map(|students| students.as_slice())
            .unwrap_or(&[])
    }

    /// Number of enrollments across all courses
    pub fn total_enrollments(&self) -> usize {
        self.records.values().map(|students| students.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Amount;

    fn course(id: CourseId) -> Course {
        Course {
            id,
            metadata_ref: "QmCourse".to_string(),
            price: Amount::from(100u64),
            instructor: Address::from_low_u64(10),
            is_active: true,
            created_at: Utc::now(),
            total_students: 0,
        }
    }

    #[test]
    fn test_record_enrollment() {
        let mut ledger = EnrollmentLedger::new();
        let mut course = course(1);
        let student = Address::from_low_u64(20);

        assert!(!ledger.has_enrolled(1, &student));
        ledger.record_enrollment(&mut course, student, Utc::now()).unwrap();

        assert!(ledger.has_enrolled(1, &student));
        assert_eq!(course.total_students, 1);
        assert_eq!(ledger.student_courses(&student), &[1]);
        assert_eq!(ledger.course_students(1), &[student]);
        assert_eq!(ledger.total_enrollments(), 1);
    }

    #[test]
    fn test_duplicate_enrollment_rejected() {
        let mut ledger = EnrollmentLedger::new();
        let mut course = course(1);
        let student = Address::from_low_u64(20);

        ledger.record_enrollment(&mut course, student, Utc::now()).unwrap();
        let result = ledger.record_enrollment(&mut course, student, Utc::now());

        assert!(matches!(result, Err(LedgerError::AlreadyEnrolled { course_id: 1, .. })));
        assert_eq!(course.total_students, 1);
        assert_eq!(ledger.course_students(1).len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut ledger = EnrollmentLedger::new();
        let mut first = course(1);
        let mut second = course(2);
        let students: Vec<Address> = (30..33).map(Address::from_low_u64).collect();

        for student in students.iter().rev() {
            ledger.record_enrollment(&mut first, *student, Utc::now()).unwrap();
        }
        ledger.record_enrollment(&mut second, students[0], Utc::now()).unwrap();

        let expected: Vec<Address> = students.iter().rev().copied().collect();
        assert_eq!(ledger.course_students(1), expected.as_slice());
        assert_eq!(ledger.student_courses(&students[0]), &[1, 2]);
        assert_eq!(first.total_students, 3);
    }
}
