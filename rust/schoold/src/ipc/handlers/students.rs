use crate::calc::attendance::{latest_per_day, status_counts, student_present_rate, student_records};
use crate::calc::grades::{grade_percentage, letter_grade, student_average};
use crate::calc::round_off_1_decimal;
use crate::ipc::helpers::{
    create_entity, delete_entity, get_entity, get_optional_str, get_required_id, keyed,
    update_entity, with_ctx, Ctx, HandlerErr, Keys,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceRecord, Collection, Student};
use crate::search::filter_students;
use serde_json::{json, Value};

const KEYS: Keys = Keys {
    singular: "student",
    plural: "students",
    id_alias: "studentId",
};

fn students_list(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let students = ctx.repo::<Student>().list_notified()?;
    let term = get_optional_str(params, "search").unwrap_or_default();
    keyed(KEYS.plural, filter_students(&students, &term))
}

fn students_detail(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let Some(student) = ctx.repo::<Student>().get_notified(student_id)? else {
        return Err(HandlerErr::not_found(format!("student {} not found", student_id)));
    };
    let snap = ctx.snapshot(&[
        Collection::Assignments,
        Collection::Grades,
        Collection::Attendance,
    ])?;

    let grades: Vec<Value> = snap
        .grades
        .iter()
        .filter(|g| g.student_id == student_id)
        .map(|g| {
            let pct = grade_percentage(g, &snap.assignments);
            json!({
                "grade": g,
                "percentage": pct.map(round_off_1_decimal),
                "letter": pct.map(letter_grade),
            })
        })
        .collect();

    let mut attendance: Vec<AttendanceRecord> = student_records(&snap.attendance, student_id)
        .into_iter()
        .cloned()
        .collect();
    attendance.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    let counts = status_counts(latest_per_day(&attendance));

    let average = student_average(&snap.grades, &snap.assignments, student_id);
    Ok(json!({
        "student": student,
        "grades": grades,
        "attendance": attendance,
        "average": round_off_1_decimal(average),
        "letter": letter_grade(average),
        "attendanceCounts": counts,
        "attendanceRate": student_present_rate(&snap.attendance, student_id),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_ctx(state, req, students_list)),
        "students.get" => Some(with_ctx(state, req, |ctx, p| get_entity::<Student>(ctx, p, &KEYS))),
        "students.create" => Some(with_ctx(state, req, |ctx, p| {
            create_entity::<Student>(ctx, p, &KEYS)
        })),
        "students.update" => Some(with_ctx(state, req, |ctx, p| {
            update_entity::<Student>(ctx, p, &KEYS)
        })),
        "students.delete" => Some(with_ctx(state, req, |ctx, p| {
            delete_entity::<Student>(ctx, p, &KEYS)
        })),
        "students.detail" => Some(with_ctx(state, req, students_detail)),
        _ => None,
    }
}
