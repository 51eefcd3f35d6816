use crate::cache::SnapshotCache;
use crate::config::Config;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{Collection, Fields, RecordId};
use crate::normalize::{coerce_id, parse_day, Entity};
use crate::notify::Notifications;
use crate::pages::{load_snapshot, PageLoadError, Snapshot, PAGE_LOAD_MESSAGE};
use crate::repo::Repository;
use crate::store::{RecordStore, RemoteError};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: "not_found",
            message: message.into(),
            details: None,
        }
    }
}

impl From<RemoteError> for HandlerErr {
    fn from(e: RemoteError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
    }
}

impl From<PageLoadError> for HandlerErr {
    fn from(e: PageLoadError) -> Self {
        let failed: Vec<&str> = e.collections().into_iter().map(Collection::name).collect();
        Self {
            code: "page_load_failed",
            message: PAGE_LOAD_MESSAGE.to_string(),
            details: Some(json!({
                "retryable": e.retryable(),
                "failed": failed,
            })),
        }
    }
}

impl From<serde_json::Error> for HandlerErr {
    fn from(e: serde_json::Error) -> Self {
        Self {
            code: "internal",
            message: e.to_string(),
            details: None,
        }
    }
}

/// Everything a handler needs once a workspace is open.
pub struct Ctx<'a> {
    pub store: &'a dyn RecordStore,
    pub cache: Option<&'a SnapshotCache>,
    pub notices: &'a Notifications,
    pub config: &'a Config,
}

impl<'a> Ctx<'a> {
    pub fn repo<E: Entity>(&self) -> Repository<'a, E> {
        Repository::new(self.store, self.notices).with_cache(self.cache)
    }

    pub fn snapshot(&self, collections: &[Collection]) -> Result<Snapshot, HandlerErr> {
        Ok(load_snapshot(self.store, self.cache, self.notices, collections)?)
    }
}

pub fn with_ctx<F>(state: &AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&Ctx<'_>, &Value) -> Result<Value, HandlerErr>,
{
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let ctx = Ctx {
        store,
        cache: state.cache.as_ref(),
        notices: &state.notices,
        config: &state.config,
    };
    match f(&ctx, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn get_required_id(params: &Value, key: &str) -> Result<RecordId, HandlerErr> {
    let v = params
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    coerce_id(v).ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer id", key)))
}

pub fn get_optional_id(params: &Value, key: &str) -> Result<Option<RecordId>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce_id(v)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer id", key))),
    }
}

pub fn get_optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    get_optional_str(params, key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_day(params: &Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => parse_day(v)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key))),
    }
}

pub fn get_optional_usize(params: &Value, key: &str) -> Result<Option<usize>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a non-negative integer", key))),
    }
}

pub fn get_fields(params: &Value) -> Result<Fields, HandlerErr> {
    params
        .as_object()
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("params must be an object"))
}

/// Wrap `value` under a single key, e.g. `{"student": {...}}`.
pub fn keyed<T: Serialize>(key: &str, value: T) -> Result<Value, HandlerErr> {
    let mut out = Fields::new();
    out.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(Value::Object(out))
}

/// Names used on the wire for one entity family.
pub struct Keys {
    pub singular: &'static str,
    pub plural: &'static str,
    /// Accepted in place of `id`, e.g. `studentId` for `students.get`.
    pub id_alias: &'static str,
}

fn record_id(params: &Value, keys: &Keys) -> Result<RecordId, HandlerErr> {
    if params.get("id").is_some_and(|v| !v.is_null()) {
        get_required_id(params, "id")
    } else {
        get_required_id(params, keys.id_alias)
    }
}

pub fn list_entities<E: Entity + Serialize>(ctx: &Ctx<'_>, keys: &Keys) -> Result<Value, HandlerErr> {
    keyed(keys.plural, ctx.repo::<E>().list_notified()?)
}

pub fn get_entity<E: Entity + Serialize>(
    ctx: &Ctx<'_>,
    params: &Value,
    keys: &Keys,
) -> Result<Value, HandlerErr> {
    let id = record_id(params, keys)?;
    match ctx.repo::<E>().get_notified(id)? {
        Some(entity) => keyed(keys.singular, entity),
        None => Err(HandlerErr::not_found(format!("{} {} not found", keys.singular, id))),
    }
}

pub fn create_entity<E: Entity + Serialize>(
    ctx: &Ctx<'_>,
    params: &Value,
    keys: &Keys,
) -> Result<Value, HandlerErr> {
    let fields = match params.get("fields") {
        Some(f) => get_fields(f)?,
        None => get_fields(params)?,
    };
    keyed(keys.singular, ctx.repo::<E>().create_notified(fields)?)
}

/// `{id, fields}`; without `fields`, the remaining params are the patch.
pub fn update_entity<E: Entity + Serialize>(
    ctx: &Ctx<'_>,
    params: &Value,
    keys: &Keys,
) -> Result<Value, HandlerErr> {
    let id = record_id(params, keys)?;
    let patch = match params.get("fields") {
        Some(f) => get_fields(f)?,
        None => {
            let mut f = get_fields(params)?;
            f.remove("id");
            f.remove(keys.id_alias);
            f
        }
    };
    if patch.is_empty() {
        return Err(HandlerErr::bad_params("nothing to update"));
    }
    keyed(keys.singular, ctx.repo::<E>().update_notified(id, patch)?)
}

pub fn delete_entity<E: Entity>(ctx: &Ctx<'_>, params: &Value, keys: &Keys) -> Result<Value, HandlerErr> {
    let id = record_id(params, keys)?;
    if ctx.repo::<E>().delete_notified(id)? {
        Ok(json!({ "deleted": true, "id": id }))
    } else {
        Err(HandlerErr::not_found(format!("{} {} not found", keys.singular, id)))
    }
}
