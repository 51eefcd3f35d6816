use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use schoold::calc::attendance::{daily_counts, present_rate, trailing_window};
use schoold::calc::grades::{
    class_average, letter_grade, overall_average, percentage, student_average, LetterGrade,
};
use schoold::calc::rollups::{class_rollups, contact_stats, grade_distribution, student_performance};
use schoold::model::{
    Assignment, AttendanceRecord, AttendanceStatus, ClassSection, Communication, ContactStatus,
    Grade, ParentContact, Student,
};

fn base_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
}

fn status_strategy() -> impl Strategy<Value = AttendanceStatus> {
    prop_oneof![
        Just(AttendanceStatus::Present),
        Just(AttendanceStatus::Absent),
        Just(AttendanceStatus::Tardy),
    ]
}

fn attendance_strategy() -> impl Strategy<Value = Vec<AttendanceRecord>> {
    prop::collection::vec((1i64..6, 0u64..30, status_strategy()), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (student_id, offset, status))| AttendanceRecord {
                id: i as i64 + 1,
                student_id,
                class_id: None,
                date: base_day() + Days::new(offset),
                status,
            })
            .collect()
    })
}

fn gradebook_strategy() -> impl Strategy<Value = (Vec<Assignment>, Vec<Grade>)> {
    let assignments = prop::collection::vec(-5i64..200, 1..6);
    let grades = prop::collection::vec((1i64..4, 1i64..8, 0.0f64..250.0), 0..30);
    (assignments, grades).prop_map(|(points, rows)| {
        let assignments = points
            .into_iter()
            .enumerate()
            .map(|(i, total_points)| Assignment {
                id: i as i64 + 1,
                name: format!("A{}", i + 1),
                total_points,
                due_date: None,
                kind: String::new(),
                class_id: Some(i as i64 % 2 + 1),
            })
            .collect();
        let grades = rows
            .into_iter()
            .enumerate()
            .map(|(i, (student_id, assignment_id, score))| Grade {
                id: i as i64 + 1,
                student_id,
                assignment_id,
                score,
                submitted_at: None,
            })
            .collect();
        (assignments, grades)
    })
}

fn roster() -> (Vec<Student>, Vec<ClassSection>) {
    let students = (1..4)
        .map(|id| Student {
            id,
            first_name: format!("S{id}"),
            last_name: "X".to_string(),
            email: format!("s{id}@school.org"),
            grade_level: String::new(),
            class_ids: vec![id % 2 + 1],
        })
        .collect();
    let classes = (1..3)
        .map(|id| ClassSection {
            id,
            name: format!("C{id}"),
            subject: String::new(),
            period: String::new(),
            student_ids: (1..4).filter(|s| s % 2 + 1 == id).collect(),
        })
        .collect();
    (students, classes)
}

fn contact_status_strategy() -> impl Strategy<Value = ContactStatus> {
    prop_oneof![
        Just(ContactStatus::Active),
        Just(ContactStatus::Inactive),
        Just(ContactStatus::EmergencyOnly),
    ]
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).single().expect("now")
}

fn contacts_strategy() -> impl Strategy<Value = (Vec<ParentContact>, Vec<Communication>)> {
    let contacts = prop::collection::vec((contact_status_strategy(), any::<bool>()), 0..12);
    let comms = prop::collection::vec((1i64..12, 0i64..20 * 24), 0..25);
    (contacts, comms).prop_map(|(contacts, comms)| {
        let contacts = contacts
            .into_iter()
            .enumerate()
            .map(|(i, (status, emergency))| ParentContact {
                id: i as i64 + 1,
                parent_name: format!("P{}", i + 1),
                student_name: "S".to_string(),
                student_id: None,
                relationship: if emergency { "Emergency Contact" } else { "Mother" }.to_string(),
                email: String::new(),
                phone: String::new(),
                address: String::new(),
                status,
                notes: String::new(),
            })
            .collect();
        let comms = comms
            .into_iter()
            .enumerate()
            .map(|(i, (contact_id, hours_ago))| Communication {
                id: i as i64 + 1,
                parent_contact_id: contact_id,
                kind: "email".to_string(),
                subject: "Update".to_string(),
                description: String::new(),
                timestamp: now() - Duration::hours(hours_ago),
            })
            .collect();
        (contacts, comms)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn letter_grade_is_total_and_monotone(a in any::<f64>(), b in -50.0f64..200.0) {
        let letter = letter_grade(a);
        prop_assert!(LetterGrade::ALL.contains(&letter));
        if a.is_finite() && a <= b {
            // A is the smallest variant, so a higher percentage never sorts after a lower one.
            prop_assert!(letter_grade(b) <= letter);
        }
    }

    #[test]
    fn percentage_is_zero_without_points(score in -100.0f64..100.0, points in -20i64..=0) {
        prop_assert_eq!(percentage(score, points), 0.0);
    }

    #[test]
    fn grade_aggregations_are_idempotent((assignments, grades) in gradebook_strategy(), student in 1i64..4) {
        let first = student_average(&grades, &assignments, student);
        let second = student_average(&grades, &assignments, student);
        prop_assert!(!first.is_nan());
        prop_assert_eq!(first.to_bits(), second.to_bits());
        prop_assert_eq!(
            grade_distribution(&grades, &assignments),
            grade_distribution(&grades, &assignments)
        );
    }

    #[test]
    fn class_and_overall_averages_are_idempotent((assignments, grades) in gradebook_strategy(), class in 1i64..3) {
        let first = class_average(&grades, &assignments, class);
        prop_assert!(!first.is_nan());
        prop_assert_eq!(first.to_bits(), class_average(&grades, &assignments, class).to_bits());
        let overall = overall_average(&grades, &assignments);
        prop_assert!(!overall.is_nan());
        prop_assert_eq!(overall.to_bits(), overall_average(&grades, &assignments).to_bits());
    }

    #[test]
    fn report_rollups_are_idempotent(
        (assignments, grades) in gradebook_strategy(),
        attendance in attendance_strategy(),
    ) {
        let (students, classes) = roster();
        let rows = student_performance(&students, &grades, &assignments, &attendance);
        prop_assert_eq!(rows.len(), students.len());
        prop_assert_eq!(&rows, &student_performance(&students, &grades, &assignments, &attendance));
        let rollups = class_rollups(&classes, &grades, &assignments);
        prop_assert_eq!(&rollups, &class_rollups(&classes, &grades, &assignments));
    }

    #[test]
    fn contact_stats_are_idempotent_and_bounded((contacts, comms) in contacts_strategy()) {
        let stats = contact_stats(&contacts, &comms, now());
        prop_assert_eq!(stats, contact_stats(&contacts, &comms, now()));
        prop_assert_eq!(stats.total_contacts, contacts.len());
        prop_assert!(stats.active_contacts <= contacts.len());
        prop_assert!(stats.emergency_contacts <= contacts.len());
        prop_assert!(stats.recent_communications <= comms.len());
    }

    #[test]
    fn attendance_aggregations_are_idempotent(records in attendance_strategy(), offset in 0u64..30) {
        let day = base_day() + Days::new(offset);
        prop_assert_eq!(daily_counts(&records, day), daily_counts(&records, day));
        let rate = present_rate(&records);
        prop_assert_eq!(rate.to_bits(), present_rate(&records).to_bits());
        prop_assert!((0.0..=100.0).contains(&rate));
    }

    #[test]
    fn trailing_window_has_exact_length_and_ascending_days(
        records in attendance_strategy(),
        days in 0usize..60,
        offset in 0u64..40,
    ) {
        let anchor = base_day() + Days::new(offset);
        let window = trailing_window(&records, days, anchor);
        prop_assert_eq!(window.len(), days);
        prop_assert!(window.windows(2).all(|w| w[0].date < w[1].date));
        if let Some(last) = window.last() {
            prop_assert_eq!(last.date, anchor);
        }
        prop_assert_eq!(&window, &trailing_window(&records, days, anchor));
    }
}
