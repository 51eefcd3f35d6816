use crate::ipc::helpers::{
    create_entity, delete_entity, get_entity, get_optional_id, keyed, update_entity, with_ctx,
    Ctx, HandlerErr, Keys,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Assignment;
use serde_json::Value;

const KEYS: Keys = Keys {
    singular: "assignment",
    plural: "assignments",
    id_alias: "assignmentId",
};

fn assignments_list(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = get_optional_id(params, "classId")?;
    let mut assignments = ctx.repo::<Assignment>().list_notified()?;
    if let Some(class_id) = class_id {
        assignments.retain(|a| a.class_id == Some(class_id));
    }
    // Undated assignments sort last.
    assignments.sort_by(|a, b| match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
    keyed(KEYS.plural, assignments)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.list" => Some(with_ctx(state, req, assignments_list)),
        "assignments.get" => Some(with_ctx(state, req, |ctx, p| {
            get_entity::<Assignment>(ctx, p, &KEYS)
        })),
        "assignments.create" => Some(with_ctx(state, req, |ctx, p| {
            create_entity::<Assignment>(ctx, p, &KEYS)
        })),
        "assignments.update" => Some(with_ctx(state, req, |ctx, p| {
            update_entity::<Assignment>(ctx, p, &KEYS)
        })),
        "assignments.delete" => Some(with_ctx(state, req, |ctx, p| {
            delete_entity::<Assignment>(ctx, p, &KEYS)
        })),
        _ => None,
    }
}
