//! The one place where loosely typed store records become typed entities.
//!
//! Records coming back from the store are JSON objects whose identifiers may
//! arrive as integers, floats, numeric strings, or `{ "Id": n }` lookup
//! objects. Upstream tables also suffix custom fields with `_c`
//! (`studentId_c`), so reads accept either spelling.

use crate::model::{
    Assignment, AttendanceRecord, AttendanceStatus, ClassSection, Collection, Communication,
    ContactStatus, Fields, Grade, ParentContact, RecordId, Student, ID_FIELD,
};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("missing required field {0}")]
    Missing(String),
    #[error("field {field} is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> NormalizeError {
    NormalizeError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// A typed record that lives in one store collection.
pub trait Entity: Sized + Clone {
    const COLLECTION: Collection;
    /// Human label used in notifications ("Student created successfully").
    const LABEL: &'static str;

    fn id(&self) -> RecordId;

    fn from_record(record: &Fields) -> Result<Self, NormalizeError>;

    /// Validate and coerce caller-supplied fields before they reach the store.
    fn prepare_fields(fields: Fields, mode: WriteMode) -> Result<Fields, NormalizeError>;
}

pub fn coerce_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => {
            let t = s.trim();
            t.parse::<i64>().ok().or_else(|| {
                t.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        Value::Object(obj) => obj.get(ID_FIELD).or_else(|| obj.get("id")).and_then(coerce_id),
        _ => None,
    }
}

/// Lenient list coercion for reads: arrays, comma-separated strings, or a
/// single scalar. Absent or null yields an empty list.
pub fn coerce_id_list(value: Option<&Value>) -> Vec<RecordId> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(coerce_id).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .filter_map(|part| coerce_id(&Value::String(part.to_string())))
            .collect(),
        Some(other) => coerce_id(other).into_iter().collect(),
    }
}

/// Calendar day from an exact `YYYY-MM-DD` or an RFC 3339 timestamp. A
/// timestamp keeps the date as written in its own offset.
pub fn parse_day(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_day(value).map(|d| d.and_time(NaiveTime::MIN).and_utc())),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn field<'a>(record: &'a Fields, key: &str) -> Option<&'a Value> {
    record
        .get(key)
        .or_else(|| record.get(&format!("{key}_c")))
        .filter(|v| !v.is_null())
}

fn field_any<'a>(record: &'a Fields, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| field(record, k))
}

fn text_any(record: &Fields, keys: &[&str]) -> String {
    match field_any(record, keys) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn text(record: &Fields, key: &str) -> String {
    text_any(record, &[key])
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn required_id(record: &Fields, key: &str) -> Result<RecordId, NormalizeError> {
    let v = field(record, key).ok_or_else(|| NormalizeError::Missing(key.to_string()))?;
    coerce_id(v).ok_or_else(|| invalid(key, "expected an integer id"))
}

fn optional_id(record: &Fields, key: &str) -> Result<Option<RecordId>, NormalizeError> {
    match field(record, key) {
        None => Ok(None),
        Some(v) => coerce_id(v)
            .map(Some)
            .ok_or_else(|| invalid(key, "expected an integer id")),
    }
}

fn record_id(record: &Fields) -> Result<RecordId, NormalizeError> {
    required_id(record, ID_FIELD)
}

// ---- write side ----

fn canonical_keys(fields: Fields, aliases: &[(&str, &str)]) -> Fields {
    fields
        .into_iter()
        .filter(|(k, _)| k != ID_FIELD)
        .map(|(k, v)| {
            let k = match k.strip_suffix("_c") {
                Some(base) if !base.is_empty() => base.to_string(),
                _ => k,
            };
            let k = aliases
                .iter()
                .find(|(alias, _)| *alias == k)
                .map(|(_, canonical)| canonical.to_string())
                .unwrap_or(k);
            (k, v)
        })
        .collect()
}

fn coerce_fk(fields: &mut Fields, key: &str) -> Result<(), NormalizeError> {
    if let Some(v) = fields.get_mut(key) {
        if v.is_null() {
            return Ok(());
        }
        let id = coerce_id(v).ok_or_else(|| invalid(key, "expected an integer id"))?;
        *v = Value::from(id);
    }
    Ok(())
}

fn coerce_fk_list(fields: &mut Fields, key: &str) -> Result<(), NormalizeError> {
    let Some(v) = fields.get_mut(key) else {
        return Ok(());
    };
    let ids: Vec<RecordId> = match &*v {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(|item| coerce_id(item).ok_or_else(|| invalid(key, "expected integer ids")))
            .collect::<Result<_, _>>()?,
        Value::String(_) => coerce_id_list(Some(&*v)),
        _ => return Err(invalid(key, "expected a list of ids")),
    };
    *v = Value::from(ids);
    Ok(())
}

/// Create needs every key. Update may omit keys but cannot clear them.
fn require(fields: &Fields, mode: WriteMode, keys: &[&str]) -> Result<(), NormalizeError> {
    for key in keys {
        let present = match fields.get(*key) {
            None => mode == WriteMode::Update,
            Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(NormalizeError::Missing(key.to_string()));
        }
    }
    Ok(())
}

fn normalize_day_field(fields: &mut Fields, key: &str) -> Result<(), NormalizeError> {
    if let Some(v) = fields.get_mut(key) {
        if v.is_null() {
            return Ok(());
        }
        let day = parse_day(v).ok_or_else(|| invalid(key, "expected YYYY-MM-DD"))?;
        *v = Value::from(format_day(day));
    }
    Ok(())
}

fn normalize_timestamp_field(
    fields: &mut Fields,
    key: &str,
    mode: WriteMode,
) -> Result<(), NormalizeError> {
    let ts = match fields.get(key) {
        Some(v) if !v.is_null() => {
            parse_timestamp(v).ok_or_else(|| invalid(key, "expected an RFC 3339 timestamp"))?
        }
        _ if mode == WriteMode::Create => Utc::now(),
        _ => return Ok(()),
    };
    fields.insert(key.to_string(), Value::from(format_timestamp(ts)));
    Ok(())
}

fn normalize_number_field(fields: &mut Fields, key: &str) -> Result<(), NormalizeError> {
    if let Some(v) = fields.get_mut(key) {
        if v.is_null() {
            return Ok(());
        }
        let n = number_value(v).ok_or_else(|| invalid(key, "expected a number"))?;
        *v = serde_json::Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| invalid(key, "expected a finite number"))?;
    }
    Ok(())
}

// ---- entities ----

impl Entity for Student {
    const COLLECTION: Collection = Collection::Students;
    const LABEL: &'static str = "Student";

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_record(record: &Fields) -> Result<Self, NormalizeError> {
        Ok(Student {
            id: record_id(record)?,
            first_name: text(record, "firstName"),
            last_name: text(record, "lastName"),
            email: text(record, "email"),
            grade_level: text_any(record, &["gradeLevel", "grade"]),
            class_ids: coerce_id_list(field(record, "classIds")),
        })
    }

    fn prepare_fields(fields: Fields, mode: WriteMode) -> Result<Fields, NormalizeError> {
        let mut fields = canonical_keys(fields, &[("grade", "gradeLevel")]);
        coerce_fk_list(&mut fields, "classIds")?;
        if let Some(Value::String(email)) = fields.get("email") {
            let t = email.trim();
            if !t.is_empty() && !t.contains('@') {
                return Err(invalid("email", "expected an email address"));
            }
        }
        require(&fields, mode, &["firstName", "lastName", "email"])?;
        if mode == WriteMode::Create && !fields.contains_key("classIds") {
            fields.insert("classIds".to_string(), Value::Array(Vec::new()));
        }
        Ok(fields)
    }
}

impl Entity for ClassSection {
    const COLLECTION: Collection = Collection::Classes;
    const LABEL: &'static str = "Class";

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_record(record: &Fields) -> Result<Self, NormalizeError> {
        Ok(ClassSection {
            id: record_id(record)?,
            name: text(record, "name"),
            subject: text(record, "subject"),
            period: text(record, "period"),
            student_ids: coerce_id_list(field(record, "studentIds")),
        })
    }

    fn prepare_fields(fields: Fields, mode: WriteMode) -> Result<Fields, NormalizeError> {
        let mut fields = canonical_keys(fields, &[]);
        coerce_fk_list(&mut fields, "studentIds")?;
        require(&fields, mode, &["name"])?;
        if mode == WriteMode::Create && !fields.contains_key("studentIds") {
            fields.insert("studentIds".to_string(), Value::Array(Vec::new()));
        }
        Ok(fields)
    }
}

impl Entity for Assignment {
    const COLLECTION: Collection = Collection::Assignments;
    const LABEL: &'static str = "Assignment";

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_record(record: &Fields) -> Result<Self, NormalizeError> {
        let total_points = field(record, "totalPoints")
            .and_then(number_value)
            .map(|f| f.trunc() as i64)
            .unwrap_or(0);
        let due_date = match field(record, "dueDate") {
            None => None,
            Some(v) => Some(parse_day(v).ok_or_else(|| invalid("dueDate", "expected YYYY-MM-DD"))?),
        };
        Ok(Assignment {
            id: record_id(record)?,
            name: text(record, "name"),
            total_points,
            due_date,
            kind: text_any(record, &["type", "kind"]),
            class_id: optional_id(record, "classId")?,
        })
    }

    fn prepare_fields(fields: Fields, mode: WriteMode) -> Result<Fields, NormalizeError> {
        let mut fields = canonical_keys(fields, &[("kind", "type")]);
        coerce_fk(&mut fields, "classId")?;
        normalize_day_field(&mut fields, "dueDate")?;
        if let Some(v) = fields.get_mut("totalPoints") {
            let n = number_value(v)
                .ok_or_else(|| invalid("totalPoints", "expected a positive integer"))?;
            if n <= 0.0 || n.fract() != 0.0 {
                return Err(invalid("totalPoints", "expected a positive integer"));
            }
            *v = Value::from(n as i64);
        }
        require(&fields, mode, &["name", "totalPoints"])?;
        Ok(fields)
    }
}

impl Entity for Grade {
    const COLLECTION: Collection = Collection::Grades;
    const LABEL: &'static str = "Grade";

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_record(record: &Fields) -> Result<Self, NormalizeError> {
        let score = field(record, "score")
            .ok_or_else(|| NormalizeError::Missing("score".to_string()))
            .and_then(|v| number_value(v).ok_or_else(|| invalid("score", "expected a number")))?;
        Ok(Grade {
            id: record_id(record)?,
            student_id: required_id(record, "studentId")?,
            assignment_id: required_id(record, "assignmentId")?,
            score,
            submitted_at: field_any(record, &["submittedDate", "submittedAt"])
                .and_then(parse_timestamp),
        })
    }

    fn prepare_fields(fields: Fields, mode: WriteMode) -> Result<Fields, NormalizeError> {
        let mut fields = canonical_keys(fields, &[("submittedAt", "submittedDate")]);
        coerce_fk(&mut fields, "studentId")?;
        coerce_fk(&mut fields, "assignmentId")?;
        normalize_number_field(&mut fields, "score")?;
        normalize_timestamp_field(&mut fields, "submittedDate", mode)?;
        require(&fields, mode, &["studentId", "assignmentId", "score"])?;
        Ok(fields)
    }
}

impl Entity for AttendanceRecord {
    const COLLECTION: Collection = Collection::Attendance;
    const LABEL: &'static str = "Attendance record";

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_record(record: &Fields) -> Result<Self, NormalizeError> {
        let date = field(record, "date")
            .ok_or_else(|| NormalizeError::Missing("date".to_string()))
            .and_then(|v| parse_day(v).ok_or_else(|| invalid("date", "expected YYYY-MM-DD")))?;
        let status = field(record, "status")
            .ok_or_else(|| NormalizeError::Missing("status".to_string()))
            .and_then(|v| {
                v.as_str()
                    .and_then(AttendanceStatus::parse)
                    .ok_or_else(|| invalid("status", "expected present, absent or tardy"))
            })?;
        Ok(AttendanceRecord {
            id: record_id(record)?,
            student_id: required_id(record, "studentId")?,
            class_id: optional_id(record, "classId")?,
            date,
            status,
        })
    }

    fn prepare_fields(fields: Fields, mode: WriteMode) -> Result<Fields, NormalizeError> {
        let mut fields = canonical_keys(fields, &[]);
        coerce_fk(&mut fields, "studentId")?;
        coerce_fk(&mut fields, "classId")?;
        normalize_day_field(&mut fields, "date")?;
        if let Some(v) = fields.get_mut("status") {
            let status = v
                .as_str()
                .and_then(AttendanceStatus::parse)
                .ok_or_else(|| invalid("status", "expected present, absent or tardy"))?;
            *v = Value::from(status.as_str());
        }
        require(&fields, mode, &["studentId", "date", "status"])?;
        Ok(fields)
    }
}

impl Entity for ParentContact {
    const COLLECTION: Collection = Collection::ParentContacts;
    const LABEL: &'static str = "Parent contact";

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_record(record: &Fields) -> Result<Self, NormalizeError> {
        let status = match field(record, "status") {
            None => ContactStatus::default(),
            Some(v) => v
                .as_str()
                .and_then(ContactStatus::parse)
                .ok_or_else(|| invalid("status", "expected Active, Inactive or Emergency Only"))?,
        };
        Ok(ParentContact {
            id: record_id(record)?,
            parent_name: text(record, "parentName"),
            student_name: text(record, "studentName"),
            student_id: optional_id(record, "studentId")?,
            relationship: text(record, "relationship"),
            email: text(record, "email"),
            phone: text(record, "phone"),
            address: text(record, "address"),
            status,
            notes: text(record, "notes"),
        })
    }

    fn prepare_fields(fields: Fields, mode: WriteMode) -> Result<Fields, NormalizeError> {
        let mut fields = canonical_keys(fields, &[]);
        coerce_fk(&mut fields, "studentId")?;
        let status = match fields.get("status") {
            Some(v) if !v.is_null() => Some(v.as_str().and_then(ContactStatus::parse).ok_or_else(
                || invalid("status", "expected Active, Inactive or Emergency Only"),
            )?),
            _ if mode == WriteMode::Create => Some(ContactStatus::default()),
            _ => None,
        };
        if let Some(status) = status {
            fields.insert("status".to_string(), Value::from(status.as_str()));
        }
        require(&fields, mode, &["parentName", "studentName"])?;
        Ok(fields)
    }
}

impl Entity for Communication {
    const COLLECTION: Collection = Collection::Communications;
    const LABEL: &'static str = "Communication";

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_record(record: &Fields) -> Result<Self, NormalizeError> {
        let timestamp = field(record, "timestamp")
            .ok_or_else(|| NormalizeError::Missing("timestamp".to_string()))
            .and_then(|v| {
                parse_timestamp(v).ok_or_else(|| invalid("timestamp", "expected a timestamp"))
            })?;
        Ok(Communication {
            id: record_id(record)?,
            parent_contact_id: required_id(record, "parentContactId")?,
            kind: text_any(record, &["type", "kind"]),
            subject: text(record, "subject"),
            description: text(record, "description"),
            timestamp,
        })
    }

    fn prepare_fields(fields: Fields, mode: WriteMode) -> Result<Fields, NormalizeError> {
        let mut fields = canonical_keys(fields, &[("kind", "type")]);
        coerce_fk(&mut fields, "parentContactId")?;
        normalize_timestamp_field(&mut fields, "timestamp", mode)?;
        require(&fields, mode, &["parentContactId", "subject", "timestamp"])?;
        Ok(fields)
    }
}
