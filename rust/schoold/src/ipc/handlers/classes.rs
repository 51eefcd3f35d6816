use crate::calc::rollups::enrollment_count;
use crate::ipc::helpers::{
    create_entity, delete_entity, get_entity, get_optional_str, update_entity, with_ctx, Ctx,
    HandlerErr, Keys,
};
use crate::ipc::types::{AppState, Request};
use crate::model::ClassSection;
use crate::search::filter_classes;
use serde_json::{json, Value};

const KEYS: Keys = Keys {
    singular: "class",
    plural: "classes",
    id_alias: "classId",
};

fn classes_list(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let classes = ctx.repo::<ClassSection>().list_notified()?;
    let term = get_optional_str(params, "search").unwrap_or_default();

    // Include enrollment so the list can show counts without another call.
    let mut rows = Vec::new();
    for c in filter_classes(&classes, &term) {
        let mut row = serde_json::to_value(c)?;
        row["enrollment"] = json!(enrollment_count(c));
        rows.push(row);
    }
    Ok(json!({ "classes": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(with_ctx(state, req, classes_list)),
        "classes.get" => Some(with_ctx(state, req, |ctx, p| {
            get_entity::<ClassSection>(ctx, p, &KEYS)
        })),
        "classes.create" => Some(with_ctx(state, req, |ctx, p| {
            create_entity::<ClassSection>(ctx, p, &KEYS)
        })),
        "classes.update" => Some(with_ctx(state, req, |ctx, p| {
            update_entity::<ClassSection>(ctx, p, &KEYS)
        })),
        "classes.delete" => Some(with_ctx(state, req, |ctx, p| {
            delete_entity::<ClassSection>(ctx, p, &KEYS)
        })),
        _ => None,
    }
}
