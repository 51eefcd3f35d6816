mod test_support;

use serde_json::json;
use test_support::{open_workspace, request, request_err, request_ok, shutdown, temp_workspace};

#[test]
fn ninety_out_of_hundred_is_an_a_everywhere() {
    let workspace = temp_workspace("schoold-grades-e2e");
    let (child, mut stdin, mut reader) = open_workspace(&workspace);

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "ada@school.org", "gradeLevel": "10th" }),
    );
    let student_id = student["student"]["id"].as_i64().expect("student id");
    let assignment = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "assignments.create",
        json!({ "name": "Midterm", "totalPoints": 100, "type": "test", "dueDate": "2024-02-01" }),
    );
    let assignment_id = assignment["assignment"]["id"].as_i64().expect("assignment id");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.create",
        json!({ "studentId": student_id.to_string(), "assignmentId": assignment_id, "score": 90 }),
    );
    assert_eq!(created["grade"]["studentId"].as_i64(), Some(student_id));

    let detail = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.detail",
        json!({ "studentId": student_id }),
    );
    assert_eq!(detail["average"], 90.0);
    assert_eq!(detail["letter"], "A");
    assert_eq!(detail["grades"][0]["letter"], "A");

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "reports.open",
        json!({ "days": 3, "anchorDate": "2024-02-03" }),
    );
    assert_eq!(report["overallAverage"], 90.0);
    assert_eq!(report["distribution"]["A"], 1);
    assert_eq!(report["students"][0]["letter"], "A");
    assert_eq!(report["trend"]["buckets"].as_array().map(|b| b.len()), Some(3));

    shutdown(child, stdin);
}

#[test]
fn save_batch_upserts_and_skips_blank_scores() {
    let workspace = temp_workspace("schoold-grades-batch");
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
    request_ok(
        &mut stdin,
        &mut reader,
        "a",
        "assignments.create",
        json!({ "name": "Quiz", "totalPoints": 20 }),
    );

    let first = request(
        &mut stdin,
        &mut reader,
        "b1",
        "grades.saveBatch",
        json!({
            "assignmentId": 1,
            "entries": [
                { "studentId": 1, "score": 18 },
                { "studentId": 2, "score": "" },
                { "studentId": 3, "score": "15.5" }
            ]
        }),
    );
    assert_eq!(first["result"]["summary"], json!({ "created": 2, "updated": 0, "skipped": 1 }));
    assert_eq!(first["notifications"][0]["message"], "Grades saved successfully");

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "b2",
        "grades.saveBatch",
        json!({ "assignmentId": 1, "entries": [{ "studentId": 1, "score": 20 }] }),
    );
    assert_eq!(second["summary"]["updated"], 1);
    let grades = second["grades"].as_array().expect("grades");
    assert_eq!(grades.len(), 2);

    let summary = request_ok(&mut stdin, &mut reader, "s", "grades.summary", json!({}));
    assert_eq!(summary["totalGrades"], 2);
    // 2 of 3 cells graded.
    assert_eq!(summary["completionRate"], 66.7);
    assert_eq!(summary["meanScore"], 17.8);

    let missing = request_err(
        &mut stdin,
        &mut reader,
        "b3",
        "grades.saveBatch",
        json!({ "assignmentId": 99, "entries": [] }),
    );
    assert_eq!(missing["error"]["code"], "not_found");

    shutdown(child, stdin);
}

#[test]
fn invalid_points_are_rejected_with_a_notification() {
    let workspace = temp_workspace("schoold-grades-invalid");
    let (child, mut stdin, mut reader) = open_workspace(&workspace);

    let resp = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "assignments.create",
        json!({ "name": "Broken", "totalPoints": 0 }),
    );
    assert_eq!(resp["error"]["code"], "bad_params");
    assert_eq!(resp["notifications"][0]["level"], "error");

    shutdown(child, stdin);
}

#[test]
fn clearing_a_score_is_refused_and_the_grade_survives() {
    let workspace = temp_workspace("schoold-grades-clear");
    let (child, mut stdin, mut reader) = open_workspace(&workspace);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grades.create",
        json!({ "studentId": 1, "assignmentId": 1, "score": 80 }),
    );
    let grade_id = created["grade"]["id"].as_i64().expect("grade id");

    let resp = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "grades.update",
        json!({ "id": grade_id, "fields": { "score": null } }),
    );
    assert_eq!(resp["error"]["code"], "bad_params");

    let listed = request_ok(&mut stdin, &mut reader, "3", "grades.list", json!({}));
    let grades = listed["grades"].as_array().expect("grades");
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0]["score"], 80.0);

    shutdown(child, stdin);
}
