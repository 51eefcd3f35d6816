//! Case-insensitive substring filters behind the list pages' search boxes.
//! A blank term matches everything.

use crate::model::{ClassSection, ParentContact, Student};

fn matches_any(haystacks: &[&str], term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

pub fn filter_students<'a>(students: &'a [Student], term: &str) -> Vec<&'a Student> {
    students
        .iter()
        .filter(|s| {
            let full_name = s.display_name();
            matches_any(
                &[full_name.as_str(), s.email.as_str(), s.grade_level.as_str()],
                term,
            )
        })
        .collect()
}

pub fn filter_classes<'a>(classes: &'a [ClassSection], term: &str) -> Vec<&'a ClassSection> {
    classes
        .iter()
        .filter(|c| matches_any(&[c.name.as_str(), c.subject.as_str(), c.period.as_str()], term))
        .collect()
}

pub fn filter_contacts<'a>(contacts: &'a [ParentContact], term: &str) -> Vec<&'a ParentContact> {
    contacts
        .iter()
        .filter(|c| {
            matches_any(
                &[
                    c.parent_name.as_str(),
                    c.student_name.as_str(),
                    c.email.as_str(),
                    c.relationship.as_str(),
                ],
                term,
            )
        })
        .collect()
}
