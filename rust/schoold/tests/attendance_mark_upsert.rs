mod test_support;

use serde_json::json;
use test_support::{open_workspace, request_ok, shutdown, temp_workspace};

#[test]
fn marking_same_student_and_day_updates_one_record() {
    let workspace = temp_workspace("schoold-attendance-upsert");
    let (child, mut stdin, mut reader) = open_workspace(&workspace);

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": 1, "date": "2024-03-01", "status": "tardy" }),
    );
    assert_eq!(first["created"], true);
    let record_id = first["record"]["id"].as_i64().expect("record id");

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": "1", "date": "2024-03-01", "status": "absent" }),
    );
    assert_eq!(second["created"], false);
    assert_eq!(second["record"]["id"].as_i64(), Some(record_id));
    assert_eq!(second["record"]["status"], "absent");

    let list = request_ok(&mut stdin, &mut reader, "3", "attendance.list", json!({}));
    let records = list["attendance"].as_array().expect("records");
    assert_eq!(records.len(), 1);

    let daily = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.daily",
        json!({ "date": "2024-03-01" }),
    );
    assert_eq!(daily["counts"], json!({ "present": 0, "absent": 1, "tardy": 0 }));
    assert_eq!(daily["presentRate"], 0.0);

    shutdown(child, stdin);
}

#[test]
fn mark_all_present_covers_class_roster_and_trend_sees_it() {
    let workspace = temp_workspace("schoold-mark-all");
    let (child, mut stdin, mut reader) = open_workspace(&workspace);

    for (i, name) in ["Ada", "Alan", "Grace"].iter().enumerate() {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.create",
            json!({ "firstName": name, "lastName": "X", "email": format!("{}@school.org", name) }),
        );
    }
    let class = request_ok(
        &mut stdin,
        &mut reader,
        "c",
        "classes.create",
        json!({ "name": "Logic", "studentIds": [1, 2] }),
    );
    let class_id = class["class"]["id"].as_i64().expect("class id");

    request_ok(
        &mut stdin,
        &mut reader,
        "m0",
        "attendance.mark",
        json!({ "studentId": 2, "date": "2024-01-05", "status": "absent" }),
    );
    let all = request_ok(
        &mut stdin,
        &mut reader,
        "m1",
        "attendance.markAllPresent",
        json!({ "date": "2024-01-05", "classId": class_id }),
    );
    assert_eq!(all["summary"]["created"], 1);
    assert_eq!(all["summary"]["updated"], 1);

    let trend = request_ok(
        &mut stdin,
        &mut reader,
        "t",
        "attendance.trend",
        json!({ "days": 7, "anchorDate": "2024-01-07" }),
    );
    let buckets = trend["buckets"].as_array().expect("buckets");
    assert_eq!(buckets.len(), 7);
    assert_eq!(buckets[0]["date"], "2024-01-01");
    assert_eq!(buckets[4]["date"], "2024-01-05");
    assert_eq!(buckets[4]["present"], 2);
    assert_eq!(buckets[4]["absent"], 0);
    assert_eq!(buckets[6]["date"], "2024-01-07");

    shutdown(child, stdin);
}
