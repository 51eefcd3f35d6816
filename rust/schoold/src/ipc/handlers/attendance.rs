use crate::calc::attendance::{daily_counts, rate_of, trailing_window};
use crate::config::MAX_TREND_DAYS;
use crate::ipc::helpers::{
    delete_entity, get_optional_day, get_optional_id, get_optional_usize, get_required_id,
    get_required_str, keyed, with_ctx, Ctx, HandlerErr, Keys,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceRecord, AttendanceStatus, ClassSection, RecordId, Student};
use crate::normalize::format_day;
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};

const KEYS: Keys = Keys {
    singular: "attendance",
    plural: "attendance",
    id_alias: "recordId",
};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn attendance_list(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_optional_id(params, "studentId")?;
    let date = get_optional_day(params, "date")?;
    let mut records = ctx.repo::<AttendanceRecord>().list_notified()?;
    records.retain(|r| {
        student_id.map_or(true, |id| r.student_id == id) && date.map_or(true, |d| r.date == d)
    });
    records.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    keyed(KEYS.plural, records)
}

fn attendance_mark(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let class_id = get_optional_id(params, "classId")?;
    let Some(date) = get_optional_day(params, "date")? else {
        return Err(HandlerErr::bad_params("missing date"));
    };
    let raw_status = get_required_str(params, "status")?;
    let Some(status) = AttendanceStatus::parse(&raw_status) else {
        return Err(HandlerErr::bad_params(format!(
            "status must be present, absent or tardy (got {:?})",
            raw_status
        )));
    };

    let repo = ctx.repo::<AttendanceRecord>();
    match repo.try_mark(student_id, class_id, date, status) {
        Ok(outcome) => {
            ctx.notices
                .success(format!("Attendance marked as {}", status.as_str()));
            Ok(json!({ "record": outcome.record, "created": outcome.created }))
        }
        Err(e) => {
            repo.report_failure("mark", &e);
            Err(e.into())
        }
    }
}

fn attendance_mark_all_present(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let date = get_optional_day(params, "date")?.unwrap_or_else(today);
    let class_id = get_optional_id(params, "classId")?;

    let student_ids: Vec<RecordId> = match class_id {
        Some(class_id) => match ctx.repo::<ClassSection>().get_notified(class_id)? {
            Some(class) => class.student_ids,
            None => {
                return Err(HandlerErr::not_found(format!("class {} not found", class_id)));
            }
        },
        None => ctx
            .repo::<Student>()
            .list_notified()?
            .into_iter()
            .map(|s| s.id)
            .collect(),
    };

    let repo = ctx.repo::<AttendanceRecord>();
    match repo.try_mark_many(&student_ids, class_id, date, AttendanceStatus::Present) {
        Ok(summary) => {
            ctx.notices.success("All students marked present");
            Ok(json!({ "date": format_day(date), "summary": summary }))
        }
        Err(e) => {
            repo.report_failure("mark", &e);
            Err(e.into())
        }
    }
}

fn attendance_daily(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let date = get_optional_day(params, "date")?.unwrap_or_else(today);
    let records = ctx.repo::<AttendanceRecord>().list_notified()?;
    let counts = daily_counts(&records, date);
    Ok(json!({
        "date": format_day(date),
        "counts": counts,
        "total": counts.total(),
        "presentRate": rate_of(&counts),
    }))
}

fn attendance_trend(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let days = get_optional_usize(params, "days")?
        .unwrap_or(ctx.config.trend_days)
        .min(MAX_TREND_DAYS);
    let anchor = get_optional_day(params, "anchorDate")?.unwrap_or_else(today);
    let records = ctx.repo::<AttendanceRecord>().list_notified()?;
    Ok(json!({
        "days": days,
        "anchorDate": format_day(anchor),
        "buckets": trailing_window(&records, days, anchor),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.list" => Some(with_ctx(state, req, attendance_list)),
        "attendance.mark" => Some(with_ctx(state, req, attendance_mark)),
        "attendance.markAllPresent" => Some(with_ctx(state, req, attendance_mark_all_present)),
        "attendance.delete" => Some(with_ctx(state, req, |ctx, p| {
            delete_entity::<AttendanceRecord>(ctx, p, &KEYS)
        })),
        "attendance.daily" => Some(with_ctx(state, req, attendance_daily)),
        "attendance.trend" => Some(with_ctx(state, req, attendance_trend)),
        _ => None,
    }
}
