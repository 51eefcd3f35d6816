use super::attendance::student_present_rate;
use super::grades::{
    assignment_index, class_average, graded_assignment_count, letter_grade, percentage,
    student_average, LetterGrade,
};
use super::round_off_1_decimal;
use crate::model::{
    Assignment, AttendanceRecord, ClassSection, Communication, ContactStatus, Grade,
    ParentContact, RecordId, Student,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeDistribution {
    #[serde(rename = "A")]
    pub a: usize,
    #[serde(rename = "B")]
    pub b: usize,
    #[serde(rename = "C")]
    pub c: usize,
    #[serde(rename = "D")]
    pub d: usize,
    #[serde(rename = "F")]
    pub f: usize,
}

impl GradeDistribution {
    pub fn add(&mut self, letter: LetterGrade) {
        *self.slot(letter) += 1;
    }

    pub fn count(&self, letter: LetterGrade) -> usize {
        match letter {
            LetterGrade::A => self.a,
            LetterGrade::B => self.b,
            LetterGrade::C => self.c,
            LetterGrade::D => self.d,
            LetterGrade::F => self.f,
        }
    }

    pub fn total(&self) -> usize {
        self.a + self.b + self.c + self.d + self.f
    }

    fn slot(&mut self, letter: LetterGrade) -> &mut usize {
        match letter {
            LetterGrade::A => &mut self.a,
            LetterGrade::B => &mut self.b,
            LetterGrade::C => &mut self.c,
            LetterGrade::D => &mut self.d,
            LetterGrade::F => &mut self.f,
        }
    }
}

/// Letter histogram over every grade that joins to an assignment.
pub fn grade_distribution(grades: &[Grade], assignments: &[Assignment]) -> GradeDistribution {
    let index = assignment_index(assignments);
    let mut dist = GradeDistribution::default();
    for g in grades {
        if let Some(a) = index.get(&g.assignment_id) {
            dist.add(letter_grade(percentage(g.score, a.total_points)));
        }
    }
    dist
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPerformanceRow {
    pub student_id: RecordId,
    pub display_name: String,
    pub average: f64,
    pub letter: LetterGrade,
    pub attendance_rate: f64,
    pub assignment_count: usize,
}

pub fn student_performance(
    students: &[Student],
    grades: &[Grade],
    assignments: &[Assignment],
    attendance: &[AttendanceRecord],
) -> Vec<StudentPerformanceRow> {
    students
        .iter()
        .map(|s| {
            let average = student_average(grades, assignments, s.id);
            StudentPerformanceRow {
                student_id: s.id,
                display_name: s.display_name(),
                average: round_off_1_decimal(average),
                letter: letter_grade(average),
                attendance_rate: student_present_rate(attendance, s.id),
                assignment_count: graded_assignment_count(grades, assignments, s.id),
            }
        })
        .collect()
}

pub fn enrollment_count(class: &ClassSection) -> usize {
    class.student_ids.len()
}

/// Graded cells as a share of every (assignment, student) cell, in percent.
pub fn completion_rate(grade_count: usize, assignment_count: usize, student_count: usize) -> f64 {
    let cells = assignment_count.saturating_mul(student_count);
    if cells == 0 {
        return 0.0;
    }
    round_off_1_decimal(grade_count as f64 / cells as f64 * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRollup {
    pub class_id: RecordId,
    pub name: String,
    pub subject: String,
    pub enrollment: usize,
    pub assignment_count: usize,
    pub average: f64,
}

pub fn class_rollups(
    classes: &[ClassSection],
    grades: &[Grade],
    assignments: &[Assignment],
) -> Vec<ClassRollup> {
    classes
        .iter()
        .map(|c| ClassRollup {
            class_id: c.id,
            name: c.name.clone(),
            subject: c.subject.clone(),
            enrollment: enrollment_count(c),
            assignment_count: assignments
                .iter()
                .filter(|a| a.class_id == Some(c.id))
                .count(),
            average: round_off_1_decimal(class_average(grades, assignments, c.id)),
        })
        .collect()
}

pub const RECENT_COMMUNICATION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactStats {
    pub total_contacts: usize,
    pub recent_communications: usize,
    pub emergency_contacts: usize,
    pub active_contacts: usize,
}

fn is_emergency(contact: &ParentContact) -> bool {
    contact.status == ContactStatus::EmergencyOnly
        || contact.relationship.trim().eq_ignore_ascii_case("emergency contact")
}

pub fn contact_stats(
    contacts: &[ParentContact],
    communications: &[Communication],
    now: DateTime<Utc>,
) -> ContactStats {
    let cutoff = now - Duration::days(RECENT_COMMUNICATION_DAYS);
    ContactStats {
        total_contacts: contacts.len(),
        recent_communications: communications
            .iter()
            .filter(|c| c.timestamp > cutoff)
            .count(),
        emergency_contacts: contacts.iter().filter(|c| is_emergency(c)).count(),
        active_contacts: contacts
            .iter()
            .filter(|c| c.status == ContactStatus::Active)
            .count(),
    }
}
