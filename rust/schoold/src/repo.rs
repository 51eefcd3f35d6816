//! Stateless per-entity repositories over an injected [`RecordStore`].
//!
//! Each repository offers three layers. `try_*` methods return `Result` and
//! never notify; page loads use them. `*_notified` methods raise the success
//! or error notification and still return the `Result`, which is what IPC
//! handlers need. The plain methods recover locally: they log, notify, and
//! hand back an empty list, `None` or `false`.

use crate::cache::SnapshotCache;
use crate::calc::attendance::{resolve_mark, MarkAction};
use crate::calc::grades::existing_grade;
use crate::model::{
    Assignment, AttendanceRecord, AttendanceStatus, ClassSection, Communication, Fields, Grade,
    ParentContact, RecordId, Student, ID_FIELD,
};
use crate::normalize::{format_day, format_timestamp, Entity, WriteMode};
use crate::notify::Notifications;
use crate::store::{RecordStore, RemoteError};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{error, warn};

pub struct Repository<'a, E> {
    store: &'a dyn RecordStore,
    cache: Option<&'a SnapshotCache>,
    notices: &'a Notifications,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> Repository<'a, E> {
    pub fn new(store: &'a dyn RecordStore, notices: &'a Notifications) -> Self {
        Self {
            store,
            cache: None,
            notices,
            _entity: PhantomData,
        }
    }

    pub fn with_cache(mut self, cache: Option<&'a SnapshotCache>) -> Self {
        self.cache = cache;
        self
    }

    fn decode_one(record: &Fields) -> Result<E, RemoteError> {
        E::from_record(record).map_err(|source| RemoteError::Decode {
            collection: E::COLLECTION,
            source,
        })
    }

    fn decode_all(records: &[Fields]) -> Vec<E> {
        records
            .iter()
            .filter_map(|r| match E::from_record(r) {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(
                        collection = %E::COLLECTION,
                        record_id = ?r.get(ID_FIELD),
                        error = %err,
                        "skipping record that failed normalization"
                    );
                    None
                }
            })
            .collect()
    }

    fn invalidate(&self) {
        if let Some(cache) = self.cache {
            cache.invalidate(E::COLLECTION);
        }
    }

    fn report(&self, action: &str, e: &RemoteError) {
        error!(collection = %E::COLLECTION, action, error = %e, "record store call failed");
        let message = match e {
            RemoteError::Validation(inner) => format!("{}: {inner}", E::LABEL),
            RemoteError::NotFound { .. } => format!("{} not found", E::LABEL),
            _ => format!("Failed to {action} {}", E::LABEL.to_lowercase()),
        };
        self.notices.error(message);
    }

    pub fn try_list(&self) -> Result<Vec<E>, RemoteError> {
        let cached = self.cache.and_then(|c| c.get(E::COLLECTION));
        let records = match cached {
            Some(hit) => hit,
            None => {
                let fresh = self.store.list(E::COLLECTION)?;
                if let Some(cache) = self.cache {
                    cache.put(E::COLLECTION, fresh.clone());
                }
                fresh
            }
        };
        Ok(Self::decode_all(&records))
    }

    pub fn try_get(&self, id: RecordId) -> Result<Option<E>, RemoteError> {
        self.store
            .get_by_id(E::COLLECTION, id)?
            .map(|r| Self::decode_one(&r))
            .transpose()
    }

    pub fn try_create(&self, fields: Fields) -> Result<E, RemoteError> {
        let fields = E::prepare_fields(fields, WriteMode::Create)?;
        let created = self.store.create(E::COLLECTION, fields);
        self.invalidate();
        Self::decode_one(&created?)
    }

    /// The merged record must still normalize, otherwise nothing is written.
    pub fn try_update(&self, id: RecordId, fields: Fields) -> Result<E, RemoteError> {
        let fields = E::prepare_fields(fields, WriteMode::Update)?;
        let mut merged = self
            .store
            .get_by_id(E::COLLECTION, id)?
            .ok_or(RemoteError::NotFound {
                collection: E::COLLECTION,
                id,
            })?;
        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        E::from_record(&merged)?;
        let updated = self.store.update(E::COLLECTION, id, fields);
        self.invalidate();
        Self::decode_one(&updated?)
    }

    pub fn try_delete(&self, id: RecordId) -> Result<bool, RemoteError> {
        let deleted = self.store.delete(E::COLLECTION, id);
        self.invalidate();
        deleted
    }

    /// `try_list` that raises an error notification on failure.
    pub fn list_notified(&self) -> Result<Vec<E>, RemoteError> {
        self.try_list().inspect_err(|e| self.report("fetch", e))
    }

    pub fn get_notified(&self, id: RecordId) -> Result<Option<E>, RemoteError> {
        self.try_get(id).inspect_err(|e| self.report("fetch", e))
    }

    pub fn create_notified(&self, fields: Fields) -> Result<E, RemoteError> {
        match self.try_create(fields) {
            Ok(e) => {
                self.notices
                    .success(format!("{} created successfully", E::LABEL));
                Ok(e)
            }
            Err(e) => {
                self.report("create", &e);
                Err(e)
            }
        }
    }

    pub fn update_notified(&self, id: RecordId, fields: Fields) -> Result<E, RemoteError> {
        match self.try_update(id, fields) {
            Ok(e) => {
                self.notices
                    .success(format!("{} updated successfully", E::LABEL));
                Ok(e)
            }
            Err(e) => {
                self.report("update", &e);
                Err(e)
            }
        }
    }

    pub fn delete_notified(&self, id: RecordId) -> Result<bool, RemoteError> {
        match self.try_delete(id) {
            Ok(true) => {
                self.notices
                    .success(format!("{} deleted successfully", E::LABEL));
                Ok(true)
            }
            Ok(false) => {
                self.notices.error(format!("{} not found", E::LABEL));
                Ok(false)
            }
            Err(e) => {
                self.report("delete", &e);
                Err(e)
            }
        }
    }

    pub fn list(&self) -> Vec<E> {
        self.list_notified().unwrap_or_default()
    }

    pub fn get(&self, id: RecordId) -> Option<E> {
        self.get_notified(id).ok().flatten()
    }

    pub fn create(&self, fields: Fields) -> Option<E> {
        self.create_notified(fields).ok()
    }

    pub fn update(&self, id: RecordId, fields: Fields) -> Option<E> {
        self.update_notified(id, fields).ok()
    }

    pub fn delete(&self, id: RecordId) -> bool {
        self.delete_notified(id).unwrap_or(false)
    }

    /// Log and notify a failure from one of the entity-specific `try_*` calls.
    pub fn report_failure(&self, action: &str, e: &RemoteError) {
        self.report(action, e);
    }
}

pub type StudentRepo<'a> = Repository<'a, Student>;
pub type ClassRepo<'a> = Repository<'a, ClassSection>;
pub type AssignmentRepo<'a> = Repository<'a, Assignment>;
pub type GradeRepo<'a> = Repository<'a, Grade>;
pub type AttendanceRepo<'a> = Repository<'a, AttendanceRecord>;
pub type ContactRepo<'a> = Repository<'a, ParentContact>;
pub type CommunicationRepo<'a> = Repository<'a, Communication>;

impl Repository<'_, ParentContact> {
    pub fn try_by_student(&self, student_id: RecordId) -> Result<Vec<ParentContact>, RemoteError> {
        Ok(self
            .try_list()?
            .into_iter()
            .filter(|c| c.student_id == Some(student_id))
            .collect())
    }
}

pub fn newest_first(mut communications: Vec<Communication>) -> Vec<Communication> {
    communications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    communications
}

impl Repository<'_, Communication> {
    pub fn try_by_contact(&self, parent_contact_id: RecordId) -> Result<Vec<Communication>, RemoteError> {
        Ok(newest_first(
            self.try_list()?
                .into_iter()
                .filter(|c| c.parent_contact_id == parent_contact_id)
                .collect(),
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
    pub record: AttendanceRecord,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

fn status_fields(status: AttendanceStatus) -> Fields {
    let mut f = Fields::new();
    f.insert("status".to_string(), Value::from(status.as_str()));
    f
}

fn new_attendance_fields(
    student_id: RecordId,
    class_id: Option<RecordId>,
    date: NaiveDate,
    status: AttendanceStatus,
) -> Fields {
    let mut f = status_fields(status);
    f.insert("studentId".to_string(), Value::from(student_id));
    if let Some(class_id) = class_id {
        f.insert("classId".to_string(), Value::from(class_id));
    }
    f.insert("date".to_string(), Value::from(format_day(date)));
    f
}

impl Repository<'_, AttendanceRecord> {
    /// Upsert by (student, day): replace the status of the existing record for
    /// that pair, or create one.
    pub fn try_mark(
        &self,
        student_id: RecordId,
        class_id: Option<RecordId>,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<MarkOutcome, RemoteError> {
        let existing = self.try_list()?;
        match resolve_mark(&existing, student_id, date) {
            MarkAction::Update { record_id } => Ok(MarkOutcome {
                record: self.try_update(record_id, status_fields(status))?,
                created: false,
            }),
            MarkAction::Create => Ok(MarkOutcome {
                record: self.try_create(new_attendance_fields(student_id, class_id, date, status))?,
                created: true,
            }),
        }
    }

    /// Mark many students for one day against a single snapshot. Repeated
    /// student ids are marked once.
    pub fn try_mark_many(
        &self,
        student_ids: &[RecordId],
        class_id: Option<RecordId>,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<BatchSummary, RemoteError> {
        let existing = self.try_list()?;
        let mut seen = HashSet::new();
        let mut summary = BatchSummary::default();
        for &student_id in student_ids {
            if !seen.insert(student_id) {
                summary.skipped += 1;
                continue;
            }
            match resolve_mark(&existing, student_id, date) {
                MarkAction::Update { record_id } => {
                    self.try_update(record_id, status_fields(status))?;
                    summary.updated += 1;
                }
                MarkAction::Create => {
                    self.try_create(new_attendance_fields(student_id, class_id, date, status))?;
                    summary.created += 1;
                }
            }
        }
        Ok(summary)
    }
}

impl Repository<'_, Grade> {
    /// Save one assignment's score column. Blank scores are skipped; existing
    /// (student, assignment) grades are updated in place.
    pub fn try_save_batch(
        &self,
        assignment_id: RecordId,
        entries: &[(RecordId, Option<f64>)],
    ) -> Result<BatchSummary, RemoteError> {
        let existing = self.try_list()?;
        let mut summary = BatchSummary::default();
        for &(student_id, score) in entries {
            let Some(score) = score else {
                summary.skipped += 1;
                continue;
            };
            let mut f = Fields::new();
            f.insert("studentId".to_string(), Value::from(student_id));
            f.insert("assignmentId".to_string(), Value::from(assignment_id));
            f.insert("score".to_string(), Value::from(score));
            f.insert(
                "submittedDate".to_string(),
                Value::from(format_timestamp(Utc::now())),
            );
            match existing_grade(&existing, student_id, assignment_id) {
                Some(grade_id) => {
                    self.try_update(grade_id, f)?;
                    summary.updated += 1;
                }
                None => {
                    self.try_create(f)?;
                    summary.created += 1;
                }
            }
        }
        Ok(summary)
    }
}
