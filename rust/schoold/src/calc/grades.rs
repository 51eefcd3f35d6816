use crate::model::{Assignment, Grade, RecordId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 5] = [
        LetterGrade::A,
        LetterGrade::B,
        LetterGrade::C,
        LetterGrade::D,
        LetterGrade::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `score / total_points * 100`, or 0 when the assignment has no points.
/// Not clamped: extra credit can push a percentage past 100.
pub fn percentage(score: f64, total_points: i64) -> f64 {
    if total_points <= 0 {
        return 0.0;
    }
    score / (total_points as f64) * 100.0
}

/// Total over every `f64`; NaN falls through to F.
pub fn letter_grade(percentage: f64) -> LetterGrade {
    if percentage >= 90.0 {
        LetterGrade::A
    } else if percentage >= 80.0 {
        LetterGrade::B
    } else if percentage >= 70.0 {
        LetterGrade::C
    } else if percentage >= 60.0 {
        LetterGrade::D
    } else {
        LetterGrade::F
    }
}

/// Id lookup over an assignment snapshot. The first assignment wins when ids
/// repeat.
pub fn assignment_index(assignments: &[Assignment]) -> HashMap<RecordId, &Assignment> {
    let mut index = HashMap::with_capacity(assignments.len());
    for a in assignments {
        index.entry(a.id).or_insert(a);
    }
    index
}

/// Percentage for one grade, or `None` when its assignment is missing.
pub fn grade_percentage(grade: &Grade, assignments: &[Assignment]) -> Option<f64> {
    assignments
        .iter()
        .find(|a| a.id == grade.assignment_id)
        .map(|a| percentage(grade.score, a.total_points))
}

fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / (n as f64)
    }
}

/// Mean of per-grade percentages. Every joined grade weighs the same no matter
/// how many points its assignment is worth; grades whose assignment is
/// missing are left out rather than counted as zero.
pub fn average_of<'a, I>(grades: I, assignments: &[Assignment]) -> f64
where
    I: IntoIterator<Item = &'a Grade>,
{
    let index = assignment_index(assignments);
    mean(grades.into_iter().filter_map(|g| {
        index
            .get(&g.assignment_id)
            .map(|a| percentage(g.score, a.total_points))
    }))
}

pub fn student_average(grades: &[Grade], assignments: &[Assignment], student_id: RecordId) -> f64 {
    average_of(
        grades.iter().filter(|g| g.student_id == student_id),
        assignments,
    )
}

/// Average over grades whose assignment belongs to `class_id`.
pub fn class_average(grades: &[Grade], assignments: &[Assignment], class_id: RecordId) -> f64 {
    let index = assignment_index(assignments);
    mean(grades.iter().filter_map(|g| {
        index
            .get(&g.assignment_id)
            .filter(|a| a.class_id == Some(class_id))
            .map(|a| percentage(g.score, a.total_points))
    }))
}

pub fn overall_average(grades: &[Grade], assignments: &[Assignment]) -> f64 {
    average_of(grades, assignments)
}

/// Unjoined mean of raw scores, as shown on the grade book header.
pub fn mean_raw_score(grades: &[Grade]) -> f64 {
    mean(grades.iter().map(|g| g.score))
}

/// Number of a student's grades that join to an assignment.
pub fn graded_assignment_count(
    grades: &[Grade],
    assignments: &[Assignment],
    student_id: RecordId,
) -> usize {
    let index = assignment_index(assignments);
    grades
        .iter()
        .filter(|g| g.student_id == student_id && index.contains_key(&g.assignment_id))
        .count()
}

/// Latest grade already recorded for a (student, assignment) pair.
pub fn existing_grade(
    grades: &[Grade],
    student_id: RecordId,
    assignment_id: RecordId,
) -> Option<RecordId> {
    grades
        .iter()
        .filter(|g| g.student_id == student_id && g.assignment_id == assignment_id)
        .map(|g| g.id)
        .max()
}
