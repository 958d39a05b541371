#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use campus_database::models::{TimetableEntry, User};
use campus_models::RoleKind;
use serde_json::{json, Value};

use common::{get, post, setup, TestContext, ACADEMIC_YEAR};

// 2024-07-01 and 2024-07-08 are Mondays.
const FIRST_MONDAY: &str = "2024-07-01";
const SECOND_MONDAY: &str = "2024-07-08";

struct Class {
    teacher: User,
    asha: User,
    vikram: User,
    entry: TimetableEntry,
}

async fn monday_class(ctx: &TestContext) -> Class {
    let department = ctx.department("Computer Science").await;
    let batch = ctx.batch("2024-2028", department.id, 2).await;
    ctx.sections(department.id, batch.id, 2, 60).await;
    let teacher = ctx.user("Meera Nair", RoleKind::Teacher, Some(department.id)).await;
    let vikram = ctx.student("Vikram Iyer", department.id, batch.id, "A").await;
    let asha = ctx.student("Asha Rao", department.id, batch.id, "A").await;
    ctx.student("Neha Shah", department.id, batch.id, "B").await;
    let subject = ctx.subject("CS101", department.id).await;
    let allocation = ctx.allocation(&teacher, &subject, batch.id, "A").await;

    let entry = ctx
        .state
        .timetable_service
        .create(
            &ctx.admin,
            serde_json::from_value(json!({
                "departmentId": department.id,
                "batchId": batch.id,
                "section": "A",
                "year": 1,
                "dayOfWeek": "Monday",
                "periodNumber": 1,
                "startTime": "09:00",
                "endTime": "09:50",
                "teacherAllocationId": allocation.id,
                "academicYear": ACADEMIC_YEAR
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    Class {
        teacher,
        asha,
        vikram,
        entry,
    }
}

fn sheet(class: &Class, date: &str, asha: &str, vikram: &str) -> Value {
    json!({
        "timetableId": class.entry.id,
        "date": date,
        "records": [
            { "studentId": class.asha.id, "status": asha },
            { "studentId": class.vikram.id, "status": vikram, "remarks": "bus was late" }
        ]
    })
}

#[actix_web::test]
async fn resubmitting_a_sheet_replaces_it() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let class = monday_class(&ctx).await;
    let token = ctx.token_for(&class.teacher);

    let (status, body) = call!(app, post("/api/attendance", &token, sheet(&class, FIRST_MONDAY, "Present", "Absent")));
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["periodNumber"], 1);
    assert_eq!(body["data"]["markedBy"], class.teacher.id.to_string());

    let (status, body) = call!(app, post("/api/attendance", &token, sheet(&class, FIRST_MONDAY, "Present", "Late")));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Attendance updated");
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = call!(
        app,
        get(
            &format!("/api/attendance/timetable/{}/date/{}", class.entry.id, FIRST_MONDAY),
            &token
        )
    );
    assert_eq!(status, StatusCode::OK);
    let records = body["data"]["attendanceRecords"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r["status"] == "Late"));
}

#[actix_web::test]
async fn sheets_must_fit_the_period() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let class = monday_class(&ctx).await;
    let token = ctx.token_for(&class.teacher);

    // A Tuesday.
    let (status, _) = call!(app, post("/api/attendance", &token, sheet(&class, "2024-07-02", "Present", "Present")));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let partial = json!({
        "timetableId": class.entry.id,
        "date": FIRST_MONDAY,
        "records": [{ "studentId": class.asha.id, "status": "Present" }]
    });
    let (status, body) = call!(app, post("/api/attendance", &token, partial));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Attendance is missing for 1 enrolled student(s)");

    let other = ctx.user("Suresh Pillai", RoleKind::Teacher, None).await;
    let (status, _) = call!(
        app,
        post("/api/attendance", &ctx.token_for(&other), sheet(&class, FIRST_MONDAY, "Present", "Present"))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call!(
        app,
        post("/api/attendance", &ctx.token_for(&class.asha), sheet(&class, FIRST_MONDAY, "Present", "Present"))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins may mark any period.
    let (status, _) = call!(
        app,
        post("/api/attendance", &ctx.admin_token, sheet(&class, FIRST_MONDAY, "Present", "Present"))
    );
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn report_counts_statuses_per_student() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let class = monday_class(&ctx).await;
    let token = ctx.token_for(&class.teacher);

    call!(app, post("/api/attendance", &token, sheet(&class, FIRST_MONDAY, "Present", "Late")));
    call!(app, post("/api/attendance", &token, sheet(&class, SECOND_MONDAY, "Present", "Present")));

    let uri = format!("/api/attendance/report/batch/{}/section/A", class.entry.batch_id);
    let (status, body) = call!(app, get(&uri, &token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sessions"], 2);

    let students = body["data"]["students"].as_array().unwrap();
    assert_eq!(students.len(), 2);
    assert_eq!(students[0]["name"], "Asha Rao");
    assert_eq!(students[0]["total"], 2);
    assert_eq!(students[0]["present"], 2);
    assert_eq!(students[0]["attendancePercentage"], 100.0);
    assert_eq!(students[0]["band"], "good");
    assert_eq!(students[1]["name"], "Vikram Iyer");
    assert_eq!(students[1]["present"], 1);
    assert_eq!(students[1]["late"], 1);
    assert_eq!(students[1]["attendancePercentage"], 50.0);
    assert_eq!(students[1]["band"], "poor");

    let (_, body) = call!(app, get(&format!("{}?from={}&to={}", uri, SECOND_MONDAY, SECOND_MONDAY), &token));
    assert_eq!(body["data"]["sessions"], 1);
    assert_eq!(body["data"]["students"][1]["attendancePercentage"], 100.0);

    let (status, _) = call!(app, get(&format!("{}?from={}&to={}", uri, SECOND_MONDAY, FIRST_MONDAY), &token));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn report_exports_as_csv() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let class = monday_class(&ctx).await;
    let token = ctx.token_for(&class.teacher);

    call!(app, post("/api/attendance", &token, sheet(&class, FIRST_MONDAY, "Present", "Absent")));

    let req = get(
        &format!("/api/attendance/report/batch/{}/section/A/csv", class.entry.batch_id),
        &token,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/csv"));
    assert!(resp.headers().contains_key(header::CONTENT_DISPOSITION));

    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<&str> = text.split("\r\n").collect();
    assert_eq!(lines[0], "Name,Email,Total,Present,Absent,Late,Excused,Percentage");
    assert_eq!(lines[1], "Asha Rao,asha.rao@campus.edu,1,1,0,0,0,100.0");
    assert_eq!(lines[2], "Vikram Iyer,vikram.iyer@campus.edu,1,0,1,0,0,0.0");
}

#[actix_web::test]
async fn students_cannot_read_reports() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let class = monday_class(&ctx).await;

    let (status, _) = call!(
        app,
        get(
            &format!("/api/attendance/report/batch/{}/section/A", class.entry.batch_id),
            &ctx.token_for(&class.vikram)
        )
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
}
