#[macro_use]
mod common;

use actix_web::http::StatusCode;
use campus_models::RoleKind;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{delete, get, post, setup, ACADEMIC_YEAR};

fn entry(allocation: &campus_database::models::TeacherAllocation, day: &str, period: i16) -> Value {
    json!({
        "departmentId": allocation.department_id,
        "batchId": allocation.batch_id,
        "section": allocation.section,
        "year": 1,
        "dayOfWeek": day,
        "periodNumber": period,
        "startTime": "09:00",
        "endTime": "09:50",
        "teacherAllocationId": allocation.id,
        "roomNumber": "L-101",
        "academicYear": ACADEMIC_YEAR
    })
}

#[actix_web::test]
async fn a_section_period_and_a_teacher_period_hold_one_class() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let token = &ctx.admin_token;

    let department = ctx.department("Computer Science").await;
    let batch = ctx.batch("2024-2028", department.id, 2).await;
    ctx.sections(department.id, batch.id, 2, 60).await;
    let teacher = ctx.user("Meera Nair", RoleKind::Teacher, Some(department.id)).await;
    let subject = ctx.subject("CS101", department.id).await;
    let in_a = ctx.allocation(&teacher, &subject, batch.id, "A").await;
    let in_b = ctx.allocation(&teacher, &subject, batch.id, "B").await;

    let (status, body) = call!(app, post("/api/timetable", token, entry(&in_a, "Monday", 1)));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["teacherId"], teacher.id.to_string());
    assert_eq!(body["data"]["subjectId"], subject.id.to_string());
    assert_eq!(body["data"]["startTime"], "09:00");

    let (status, body) = call!(app, post("/api/timetable", token, entry(&in_a, "Monday", 1)));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "A class is already scheduled for this section in this period");

    let (status, body) = call!(app, post("/api/timetable", token, entry(&in_b, "Monday", 1)));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Teacher already has a class in this period");

    let (status, _) = call!(app, post("/api/timetable", token, entry(&in_b, "Monday", 2)));
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn section_week_is_a_seven_by_eight_grid() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let token = &ctx.admin_token;

    let department = ctx.department("Electronics").await;
    let batch = ctx.batch("2024-2028", department.id, 1).await;
    ctx.sections(department.id, batch.id, 1, 60).await;
    let teacher = ctx.user("Ravi Kumar", RoleKind::Teacher, Some(department.id)).await;
    let subject = ctx.subject("EC101", department.id).await;
    let allocation = ctx.allocation(&teacher, &subject, batch.id, "A").await;

    let (_, body) = call!(app, post("/api/timetable", token, entry(&allocation, "Wednesday", 3)));
    let entry_id = body["data"]["id"].as_str().unwrap().to_string();

    // Students may read their week.
    let student = ctx.student("Asha Rao", department.id, batch.id, "A").await;
    let student_token = ctx.token_for(&student);
    let (status, body) = call!(
        app,
        get(&format!("/api/timetable/batch/{}/section/a", batch.id), &student_token)
    );
    assert_eq!(status, StatusCode::OK);
    let grid = body["data"]["grid"].as_array().unwrap();
    assert_eq!(grid.len(), 7);
    assert!(grid.iter().all(|day| day.as_array().unwrap().len() == 8));
    assert_eq!(grid[2][2]["id"], entry_id.as_str());
    assert!(grid[2][1].is_null());
    assert_eq!(body["data"]["section"], "A");
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 1);

    let (status, _) = call!(app, delete(&format!("/api/timetable/{}", entry_id), token));
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call!(app, get(&format!("/api/timetable/batch/{}/section/A", batch.id), token));
    assert!(body["data"]["entries"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn entries_must_match_their_allocation() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let token = &ctx.admin_token;

    let department = ctx.department("Civil").await;
    let batch = ctx.batch("2024-2028", department.id, 2).await;
    ctx.sections(department.id, batch.id, 2, 60).await;
    let teacher = ctx.user("Kiran Das", RoleKind::Teacher, Some(department.id)).await;
    let subject = ctx.subject("CE101", department.id).await;
    let allocation = ctx.allocation(&teacher, &subject, batch.id, "A").await;

    let mut body = entry(&allocation, "Tuesday", 1);
    body["section"] = json!("B");
    let (status, _) = call!(app, post("/api/timetable", token, body));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = entry(&allocation, "Tuesday", 1);
    body["startTime"] = json!("10:00");
    let (status, body) = call!(app, post("/api/timetable", token, body));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Start time must be before end time");

    let mut body = entry(&allocation, "Tuesday", 1);
    body["teacherAllocationId"] = json!(Uuid::new_v4());
    let (status, _) = call!(app, post("/api/timetable", token, body));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call!(app, post("/api/timetable", token, entry(&allocation, "Tuesday", 9)));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn teachers_cannot_edit_the_timetable() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);

    let department = ctx.department("Mathematics").await;
    let batch = ctx.batch("2024-2028", department.id, 1).await;
    ctx.sections(department.id, batch.id, 1, 60).await;
    let teacher = ctx.user("Lata Menon", RoleKind::Teacher, Some(department.id)).await;
    let subject = ctx.subject("MA101", department.id).await;
    let allocation = ctx.allocation(&teacher, &subject, batch.id, "A").await;

    let teacher_token = ctx.token_for(&teacher);
    let (status, body) = call!(app, post("/api/timetable", &teacher_token, entry(&allocation, "Friday", 4)));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Insufficient permissions");
}

#[actix_web::test]
async fn the_week_holds_one_academic_year() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let token = &ctx.admin_token;

    let department = ctx.department("Physics").await;
    let batch = ctx.batch("2024-2028", department.id, 1).await;
    ctx.sections(department.id, batch.id, 1, 60).await;
    let teacher = ctx.user("Anil Gupta", RoleKind::Teacher, Some(department.id)).await;
    let subject = ctx.subject("PH101", department.id).await;
    let this_year = ctx.allocation(&teacher, &subject, batch.id, "A").await;

    let (status, body) = call!(app, post("/api/timetable", token, entry(&this_year, "Monday", 1)));
    assert_eq!(status, StatusCode::CREATED);
    let this_year_entry = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call!(
        app,
        post(
            "/api/sections",
            token,
            json!({
                "departmentId": department.id,
                "batchId": batch.id,
                "year": 1,
                "numberOfSections": 1,
                "capacity": 60,
                "academicYear": "2025-2026"
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call!(
        app,
        post(
            "/api/allocations",
            token,
            json!({
                "teacherId": teacher.id,
                "subjectId": subject.id,
                "departmentId": department.id,
                "batchId": batch.id,
                "section": "A",
                "year": 1,
                "academicYear": "2025-2026"
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);

    let mut next = entry(&this_year, "Monday", 1);
    next["teacherAllocationId"] = body["data"]["id"].clone();
    next["academicYear"] = json!("2025-2026");
    let (status, body) = call!(app, post("/api/timetable", token, next));
    assert_eq!(status, StatusCode::CREATED);
    let next_year_entry = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call!(app, get(&format!("/api/timetable/batch/{}/section/A", batch.id), token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["academicYear"], "2025-2026");
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["grid"][0][0]["id"], next_year_entry.as_str());

    let (_, body) = call!(
        app,
        get(
            &format!("/api/timetable/batch/{}/section/A?academicYear={}", batch.id, ACADEMIC_YEAR),
            token
        )
    );
    assert_eq!(body["data"]["academicYear"], ACADEMIC_YEAR);
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["grid"][0][0]["id"], this_year_entry.as_str());
}

#[actix_web::test]
async fn closed_or_unopened_sections_take_no_classes() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let token = &ctx.admin_token;

    let department = ctx.department("Chemistry").await;
    let batch = ctx.batch("2024-2028", department.id, 1).await;
    let sections = ctx.sections(department.id, batch.id, 1, 60).await;
    let teacher = ctx.user("Farah Khan", RoleKind::Teacher, Some(department.id)).await;
    let subject = ctx.subject("CH101", department.id).await;
    let allocation = ctx.allocation(&teacher, &subject, batch.id, "A").await;

    let (status, body) = call!(
        app,
        post(
            "/api/allocations",
            token,
            json!({
                "teacherId": teacher.id,
                "subjectId": subject.id,
                "departmentId": department.id,
                "batchId": batch.id,
                "section": "B",
                "year": 1,
                "academicYear": ACADEMIC_YEAR
            })
        )
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Section not found");

    let (status, _) = call!(app, delete(&format!("/api/sections/{}", sections[0].id), token));
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call!(app, post("/api/timetable", token, entry(&allocation, "Thursday", 2)));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Section not found");
}
