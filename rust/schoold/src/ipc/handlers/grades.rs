use crate::calc::grades::{letter_grade, mean_raw_score, overall_average};
use crate::calc::rollups::{completion_rate, grade_distribution};
use crate::calc::round_off_1_decimal;
use crate::ipc::helpers::{
    create_entity, delete_entity, get_entity, get_optional_id, get_required_id, keyed,
    update_entity, with_ctx, Ctx, HandlerErr, Keys,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Assignment, Collection, Grade, RecordId};
use serde_json::{json, Value};

const KEYS: Keys = Keys {
    singular: "grade",
    plural: "grades",
    id_alias: "gradeId",
};

fn grades_list(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_optional_id(params, "studentId")?;
    let assignment_id = get_optional_id(params, "assignmentId")?;
    let mut grades = ctx.repo::<Grade>().list_notified()?;
    grades.retain(|g| {
        student_id.map_or(true, |id| g.student_id == id)
            && assignment_id.map_or(true, |id| g.assignment_id == id)
    });
    keyed(KEYS.plural, grades)
}

/// Blank entries (`null` or an empty string) are skipped, not zeroed.
fn parse_score(entry: &Value) -> Result<Option<f64>, HandlerErr> {
    match entry.get("score") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("score {:?} is not a number", s))),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params("score is not a number")),
        Some(_) => Err(HandlerErr::bad_params("score is not a number")),
    }
}

fn grades_save_batch(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let assignment_id = get_required_id(params, "assignmentId")?;
    let Some(raw_entries) = params.get("entries").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing entries"));
    };
    let mut entries: Vec<(RecordId, Option<f64>)> = Vec::with_capacity(raw_entries.len());
    for entry in raw_entries {
        entries.push((get_required_id(entry, "studentId")?, parse_score(entry)?));
    }

    if ctx.repo::<Assignment>().get_notified(assignment_id)?.is_none() {
        return Err(HandlerErr::not_found(format!(
            "assignment {} not found",
            assignment_id
        )));
    }

    let repo = ctx.repo::<Grade>();
    let summary = match repo.try_save_batch(assignment_id, &entries) {
        Ok(summary) => summary,
        Err(e) => {
            repo.report_failure("save", &e);
            return Err(e.into());
        }
    };
    ctx.notices.success("Grades saved successfully");

    let mut grades = repo.list_notified()?;
    grades.retain(|g| g.assignment_id == assignment_id);
    Ok(json!({ "summary": summary, "grades": grades }))
}

fn grades_summary(ctx: &Ctx<'_>, _params: &Value) -> Result<Value, HandlerErr> {
    let snap = ctx.snapshot(&[
        Collection::Students,
        Collection::Assignments,
        Collection::Grades,
    ])?;
    let overall = overall_average(&snap.grades, &snap.assignments);
    Ok(json!({
        "totalGrades": snap.grades.len(),
        "meanScore": round_off_1_decimal(mean_raw_score(&snap.grades)),
        "completionRate": completion_rate(
            snap.grades.len(),
            snap.assignments.len(),
            snap.students.len(),
        ),
        "overallAverage": round_off_1_decimal(overall),
        "overallLetter": letter_grade(overall),
        "distribution": grade_distribution(&snap.grades, &snap.assignments),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(with_ctx(state, req, grades_list)),
        "grades.get" => Some(with_ctx(state, req, |ctx, p| get_entity::<Grade>(ctx, p, &KEYS))),
        "grades.create" => Some(with_ctx(state, req, |ctx, p| {
            create_entity::<Grade>(ctx, p, &KEYS)
        })),
        "grades.update" => Some(with_ctx(state, req, |ctx, p| {
            update_entity::<Grade>(ctx, p, &KEYS)
        })),
        "grades.delete" => Some(with_ctx(state, req, |ctx, p| {
            delete_entity::<Grade>(ctx, p, &KEYS)
        })),
        "grades.saveBatch" => Some(with_ctx(state, req, grades_save_batch)),
        "grades.summary" => Some(with_ctx(state, req, grades_summary)),
        _ => None,
    }
}
