use crate::calc::attendance::{present_rate, trailing_window};
use crate::calc::grades::{letter_grade, overall_average};
use crate::calc::rollups::{class_rollups, grade_distribution, student_performance};
use crate::calc::round_off_1_decimal;
use crate::config::MAX_TREND_DAYS;
use crate::ipc::helpers::{get_optional_day, get_optional_usize, with_ctx, Ctx, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::Collection;
use crate::normalize::format_day;
use chrono::Local;
use serde_json::{json, Value};

/// Everything the reports page shows, from one concurrent snapshot.
fn reports_open(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let days = get_optional_usize(params, "days")?
        .unwrap_or(ctx.config.trend_days)
        .min(MAX_TREND_DAYS);
    let anchor = get_optional_day(params, "anchorDate")?.unwrap_or_else(|| Local::now().date_naive());

    let snap = ctx.snapshot(&[
        Collection::Students,
        Collection::Classes,
        Collection::Assignments,
        Collection::Grades,
        Collection::Attendance,
    ])?;

    let overall = overall_average(&snap.grades, &snap.assignments);
    Ok(json!({
        "totals": {
            "students": snap.students.len(),
            "classes": snap.classes.len(),
            "assignments": snap.assignments.len(),
            "grades": snap.grades.len(),
        },
        "overallAverage": round_off_1_decimal(overall),
        "overallLetter": letter_grade(overall),
        "presentRate": present_rate(&snap.attendance),
        "distribution": grade_distribution(&snap.grades, &snap.assignments),
        "trend": {
            "days": days,
            "anchorDate": format_day(anchor),
            "buckets": trailing_window(&snap.attendance, days, anchor),
        },
        "students": student_performance(
            &snap.students,
            &snap.grades,
            &snap.assignments,
            &snap.attendance,
        ),
        "classes": class_rollups(&snap.classes, &snap.grades, &snap.assignments),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.open" => Some(with_ctx(state, req, reports_open)),
        _ => None,
    }
}
