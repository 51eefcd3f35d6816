//! Parent contacts and the communication log kept against them.

use crate::calc::rollups::contact_stats;
use crate::ipc::helpers::{
    create_entity, delete_entity, get_entity, get_optional_str, get_required_id, keyed,
    update_entity, with_ctx, Ctx, HandlerErr, Keys,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Collection, Communication, ParentContact};
use crate::repo::newest_first;
use crate::search::filter_contacts;
use chrono::Utc;
use serde_json::{json, Value};

const CONTACT_KEYS: Keys = Keys {
    singular: "contact",
    plural: "contacts",
    id_alias: "contactId",
};

const COMMUNICATION_KEYS: Keys = Keys {
    singular: "communication",
    plural: "communications",
    id_alias: "communicationId",
};

fn parents_list(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let contacts = ctx.repo::<ParentContact>().list_notified()?;
    let term = get_optional_str(params, "search").unwrap_or_default();
    keyed(CONTACT_KEYS.plural, filter_contacts(&contacts, &term))
}

fn parents_by_student(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let repo = ctx.repo::<ParentContact>();
    let contacts = repo
        .try_by_student(student_id)
        .inspect_err(|e| repo.report_failure("fetch", e))?;
    keyed(CONTACT_KEYS.plural, contacts)
}

fn parents_stats(ctx: &Ctx<'_>, _params: &Value) -> Result<Value, HandlerErr> {
    let snap = ctx.snapshot(&[Collection::ParentContacts, Collection::Communications])?;
    Ok(json!({
        "stats": contact_stats(&snap.contacts, &snap.communications, Utc::now()),
    }))
}

fn communications_list(ctx: &Ctx<'_>, _params: &Value) -> Result<Value, HandlerErr> {
    let all = ctx.repo::<Communication>().list_notified()?;
    keyed(COMMUNICATION_KEYS.plural, newest_first(all))
}

fn communications_by_contact(ctx: &Ctx<'_>, params: &Value) -> Result<Value, HandlerErr> {
    let contact_id = get_required_id(params, "parentContactId")?;
    let repo = ctx.repo::<Communication>();
    let thread = repo
        .try_by_contact(contact_id)
        .inspect_err(|e| repo.report_failure("fetch", e))?;
    keyed(COMMUNICATION_KEYS.plural, thread)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "parents.list" => Some(with_ctx(state, req, parents_list)),
        "parents.get" => Some(with_ctx(state, req, |ctx, p| {
            get_entity::<ParentContact>(ctx, p, &CONTACT_KEYS)
        })),
        "parents.byStudent" => Some(with_ctx(state, req, parents_by_student)),
        "parents.create" => Some(with_ctx(state, req, |ctx, p| {
            create_entity::<ParentContact>(ctx, p, &CONTACT_KEYS)
        })),
        "parents.update" => Some(with_ctx(state, req, |ctx, p| {
            update_entity::<ParentContact>(ctx, p, &CONTACT_KEYS)
        })),
        "parents.delete" => Some(with_ctx(state, req, |ctx, p| {
            delete_entity::<ParentContact>(ctx, p, &CONTACT_KEYS)
        })),
        "parents.stats" => Some(with_ctx(state, req, parents_stats)),
        "communications.list" => Some(with_ctx(state, req, communications_list)),
        "communications.byContact" => Some(with_ctx(state, req, communications_by_contact)),
        "communications.create" => Some(with_ctx(state, req, |ctx, p| {
            create_entity::<Communication>(ctx, p, &COMMUNICATION_KEYS)
        })),
        "communications.update" => Some(with_ctx(state, req, |ctx, p| {
            update_entity::<Communication>(ctx, p, &COMMUNICATION_KEYS)
        })),
        "communications.delete" => Some(with_ctx(state, req, |ctx, p| {
            delete_entity::<Communication>(ctx, p, &COMMUNICATION_KEYS)
        })),
        _ => None,
    }
}
