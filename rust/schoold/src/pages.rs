//! Concurrent page loads.
//!
//! A page needs several unrelated collections. They are fetched on scoped
//! threads and joined; if any fetch fails the page gets one error and every
//! partial result is dropped.

use crate::cache::SnapshotCache;
use crate::model::{
    Assignment, AttendanceRecord, ClassSection, Collection, Communication, Grade, ParentContact,
    Student,
};
use crate::normalize::Entity;
use crate::notify::Notifications;
use crate::repo::Repository;
use crate::store::{RecordStore, RemoteError};
use std::thread;
use thiserror::Error;
use tracing::error;

pub const PAGE_LOAD_MESSAGE: &str = "Failed to load page data. Please try again.";

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub students: Vec<Student>,
    pub classes: Vec<ClassSection>,
    pub assignments: Vec<Assignment>,
    pub grades: Vec<Grade>,
    pub attendance: Vec<AttendanceRecord>,
    pub contacts: Vec<ParentContact>,
    pub communications: Vec<Communication>,
}

#[derive(Debug, Error)]
#[error("page load failed for {}", failed_names(.failed))]
pub struct PageLoadError {
    pub failed: Vec<(Collection, String)>,
}

fn failed_names(failed: &[(Collection, String)]) -> String {
    failed
        .iter()
        .map(|(c, _)| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PageLoadError {
    /// Page loads are always safe to retry.
    pub fn retryable(&self) -> bool {
        true
    }

    pub fn collections(&self) -> Vec<Collection> {
        self.failed.iter().map(|(c, _)| *c).collect()
    }
}

enum Fetched {
    Students(Vec<Student>),
    Classes(Vec<ClassSection>),
    Assignments(Vec<Assignment>),
    Grades(Vec<Grade>),
    Attendance(Vec<AttendanceRecord>),
    Contacts(Vec<ParentContact>),
    Communications(Vec<Communication>),
}

fn fetch<E: Entity>(
    store: &dyn RecordStore,
    cache: Option<&SnapshotCache>,
    notices: &Notifications,
) -> Result<Vec<E>, RemoteError> {
    Repository::<'_, E>::new(store, notices)
        .with_cache(cache)
        .try_list()
}

fn fetch_collection(
    collection: Collection,
    store: &dyn RecordStore,
    cache: Option<&SnapshotCache>,
    notices: &Notifications,
) -> Result<Fetched, RemoteError> {
    Ok(match collection {
        Collection::Students => Fetched::Students(fetch(store, cache, notices)?),
        Collection::Classes => Fetched::Classes(fetch(store, cache, notices)?),
        Collection::Assignments => Fetched::Assignments(fetch(store, cache, notices)?),
        Collection::Grades => Fetched::Grades(fetch(store, cache, notices)?),
        Collection::Attendance => Fetched::Attendance(fetch(store, cache, notices)?),
        Collection::ParentContacts => Fetched::Contacts(fetch(store, cache, notices)?),
        Collection::Communications => Fetched::Communications(fetch(store, cache, notices)?),
    })
}

/// Fetch `collections` concurrently into one snapshot. Collections not asked
/// for stay empty; repeats are fetched once.
pub fn load_snapshot(
    store: &dyn RecordStore,
    cache: Option<&SnapshotCache>,
    notices: &Notifications,
    collections: &[Collection],
) -> Result<Snapshot, PageLoadError> {
    let mut wanted: Vec<Collection> = Vec::with_capacity(collections.len());
    for c in collections {
        if !wanted.contains(c) {
            wanted.push(*c);
        }
    }

    let results: Vec<(Collection, Result<Fetched, String>)> = thread::scope(|scope| {
        let handles: Vec<_> = wanted
            .iter()
            .map(|&c| {
                (
                    c,
                    scope.spawn(move || fetch_collection(c, store, cache, notices)),
                )
            })
            .collect();
        handles
            .into_iter()
            .map(|(c, handle)| {
                let outcome = match handle.join() {
                    Ok(Ok(fetched)) => Ok(fetched),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("fetch thread panicked".to_string()),
                };
                (c, outcome)
            })
            .collect()
    });

    let mut snapshot = Snapshot::default();
    let mut failed = Vec::new();
    for (collection, outcome) in results {
        match outcome {
            Ok(Fetched::Students(v)) => snapshot.students = v,
            Ok(Fetched::Classes(v)) => snapshot.classes = v,
            Ok(Fetched::Assignments(v)) => snapshot.assignments = v,
            Ok(Fetched::Grades(v)) => snapshot.grades = v,
            Ok(Fetched::Attendance(v)) => snapshot.attendance = v,
            Ok(Fetched::Contacts(v)) => snapshot.contacts = v,
            Ok(Fetched::Communications(v)) => snapshot.communications = v,
            Err(message) => {
                error!(collection = %collection, error = %message, "page fetch failed");
                failed.push((collection, message));
            }
        }
    }

    if failed.is_empty() {
        Ok(snapshot)
    } else {
        notices.error(PAGE_LOAD_MESSAGE);
        Err(PageLoadError { failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fields, RecordId};
    use crate::store::SqliteStore;
    use serde_json::json;

    /// Delegates to SQLite except for one collection, which always fails.
    struct FailingStore {
        inner: SqliteStore,
        broken: Collection,
    }

    impl FailingStore {
        fn check(&self, collection: Collection) -> Result<(), RemoteError> {
            if collection == self.broken {
                Err(RemoteError::Storage("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl RecordStore for FailingStore {
        fn list(&self, collection: Collection) -> Result<Vec<Fields>, RemoteError> {
            self.check(collection)?;
            self.inner.list(collection)
        }

        fn get_by_id(&self, collection: Collection, id: RecordId) -> Result<Option<Fields>, RemoteError> {
            self.check(collection)?;
            self.inner.get_by_id(collection, id)
        }

        fn create(&self, collection: Collection, fields: Fields) -> Result<Fields, RemoteError> {
            self.check(collection)?;
            self.inner.create(collection, fields)
        }

        fn update(&self, collection: Collection, id: RecordId, fields: Fields) -> Result<Fields, RemoteError> {
            self.check(collection)?;
            self.inner.update(collection, id, fields)
        }

        fn delete(&self, collection: Collection, id: RecordId) -> Result<bool, RemoteError> {
            self.check(collection)?;
            self.inner.delete(collection, id)
        }
    }

    fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("store");
        let f = |v: serde_json::Value| v.as_object().cloned().expect("object");
        store
            .create(
                Collection::Students,
                f(json!({ "firstName": "Ada", "lastName": "L", "email": "a@x.org" })),
            )
            .expect("student");
        store
            .create(Collection::Assignments, f(json!({ "name": "Quiz", "totalPoints": 10 })))
            .expect("assignment");
        store
            .create(
                Collection::Grades,
                f(json!({ "studentId": 1, "assignmentId": 1, "score": 9 })),
            )
            .expect("grade");
        store
    }

    #[test]
    fn loads_requested_collections_only() {
        let store = seeded();
        let notices = Notifications::new();
        let snap = load_snapshot(
            &store,
            None,
            &notices,
            &[Collection::Students, Collection::Grades, Collection::Students],
        )
        .expect("snapshot");
        assert_eq!(snap.students.len(), 1);
        assert_eq!(snap.grades.len(), 1);
        assert!(snap.assignments.is_empty());
        assert!(notices.drain().is_empty());
    }

    #[test]
    fn one_failure_fails_the_page_once() {
        let store = FailingStore {
            inner: seeded(),
            broken: Collection::Attendance,
        };
        let notices = Notifications::new();
        let err = load_snapshot(&store, None, &notices, &Collection::ALL).expect_err("must fail");
        assert!(err.retryable());
        assert_eq!(err.collections(), vec![Collection::Attendance]);
        assert!(err.to_string().contains("attendance"));

        let drained = notices.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].message, PAGE_LOAD_MESSAGE);
    }

    #[test]
    fn fills_cache_when_enabled() {
        let store = FailingStore {
            inner: seeded(),
            broken: Collection::Communications,
        };
        let notices = Notifications::new();
        let cache = SnapshotCache::new();
        let snap = load_snapshot(&store, Some(&cache), &notices, &[Collection::Students])
            .expect("snapshot");
        assert_eq!(snap.students.len(), 1);
        assert!(cache.get(Collection::Students).is_some());
    }
}
