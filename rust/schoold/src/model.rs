use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned record identifier. Always an integer once it has crossed
/// the normalization boundary.
pub type RecordId = i64;

/// Loosely typed field map as exchanged with the record store.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Field carrying the store-assigned identifier on raw records.
pub const ID_FIELD: &str = "Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Students,
    Classes,
    Assignments,
    Grades,
    Attendance,
    ParentContacts,
    Communications,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Students,
        Collection::Classes,
        Collection::Assignments,
        Collection::Grades,
        Collection::Attendance,
        Collection::ParentContacts,
        Collection::Communications,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Classes => "classes",
            Collection::Assignments => "assignments",
            Collection::Grades => "grades",
            Collection::Attendance => "attendance",
            Collection::ParentContacts => "parent_contacts",
            Collection::Communications => "communications",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub grade_level: String,
    pub class_ids: Vec<RecordId>,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSection {
    pub id: RecordId,
    pub name: String,
    pub subject: String,
    pub period: String,
    pub student_ids: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: RecordId,
    pub name: String,
    pub total_points: i64,
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: String,
    pub class_id: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: RecordId,
    pub student_id: RecordId,
    pub assignment_id: RecordId,
    pub score: f64,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Tardy,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Tardy => "tardy",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "tardy" | "late" => Some(AttendanceStatus::Tardy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: RecordId,
    pub class_id: Option<RecordId>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContactStatus {
    #[default]
    Active,
    Inactive,
    #[serde(rename = "Emergency Only")]
    EmergencyOnly,
}

impl ContactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::Active => "Active",
            ContactStatus::Inactive => "Inactive",
            ContactStatus::EmergencyOnly => "Emergency Only",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let t = raw.trim();
        if t.eq_ignore_ascii_case("active") {
            Some(ContactStatus::Active)
        } else if t.eq_ignore_ascii_case("inactive") {
            Some(ContactStatus::Inactive)
        } else if t.eq_ignore_ascii_case("emergency only") || t.eq_ignore_ascii_case("emergency_only")
        {
            Some(ContactStatus::EmergencyOnly)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentContact {
    pub id: RecordId,
    pub parent_name: String,
    pub student_name: String,
    pub student_id: Option<RecordId>,
    pub relationship: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: ContactStatus,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: RecordId,
    pub parent_contact_id: RecordId,
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}
