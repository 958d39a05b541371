#[macro_use]
mod common;

use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use uuid::Uuid;

use common::{delete, get, post, put, setup, ACADEMIC_YEAR};

#[actix_web::test]
async fn department_batch_and_sections_are_registered_in_order() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let token = &ctx.admin_token;

    let (status, body) = call!(
        app,
        post("/api/departments/register", token, json!({ "departmentName": "Computer Science" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["departmentCode"], "DEP01");
    let department_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call!(
        app,
        post(
            "/api/batches",
            token,
            json!({
                "batchName": "2023-2027",
                "departments": [{ "departmentId": department_id, "numberOfSections": 3 }]
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["startDate"], "2023-06-01");
    assert_eq!(body["data"]["endDate"], "2027-05-31");
    assert_eq!(body["data"]["departments"][0]["departmentName"], "Computer Science");
    let batch_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call!(
        app,
        post(
            "/api/sections",
            token,
            json!({
                "departmentId": department_id,
                "batchId": batch_id,
                "year": 1,
                "numberOfSections": 3,
                "capacity": 60,
                "academicYear": "2023-2024"
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);
    let sections = body["data"].as_array().unwrap();
    let names: Vec<&str> = sections.iter().map(|s| s["sectionName"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert!(sections.iter().all(|s| s["capacity"] == 60 && s["isActive"] == true));

    // The department listing is public and shows the batch link.
    let (status, body) = call!(app, TestRequest::get().uri("/api/departments"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["batches"][0], batch_id.as_str());

    let (status, body) = call!(app, get(&format!("/api/batches/department/{}", department_id), token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["batchName"], "2023-2027");
    assert_eq!(body["data"][0]["numberOfSections"], 3);
}

#[actix_web::test]
async fn repeated_sections_are_rejected_as_a_whole() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let department = ctx.department("Mechanical").await;
    let batch = ctx.batch("2024-2028", department.id, 4).await;

    let request = |count: i16| {
        post(
            "/api/sections",
            &ctx.admin_token,
            json!({
                "departmentId": department.id,
                "batchId": batch.id,
                "year": 1,
                "numberOfSections": count,
                "capacity": 40,
                "academicYear": "2024-2025"
            }),
        )
    };

    let (status, _) = call!(app, request(1));
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call!(app, request(3));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, body) = call!(app, get(&format!("/api/sections?batchId={}", batch.id), &ctx.admin_token));
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn sections_can_be_resized_and_deactivated() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let department = ctx.department("Civil").await;
    let batch = ctx.batch("2024-2028", department.id, 2).await;

    let (_, body) = call!(
        app,
        post(
            "/api/sections",
            &ctx.admin_token,
            json!({
                "departmentId": department.id,
                "batchId": batch.id,
                "year": 2,
                "numberOfSections": 1,
                "capacity": 40,
                "academicYear": "2024-2025"
            })
        )
    );
    let section_id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = call!(
        app,
        put(&format!("/api/sections/{}", section_id), &ctx.admin_token, json!({ "capacity": 75 }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["capacity"], 75);

    let (status, _) = call!(
        app,
        put(&format!("/api/sections/{}", section_id), &ctx.admin_token, json!({ "capacity": 5 }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call!(app, delete(&format!("/api/sections/{}", section_id), &ctx.admin_token));
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn departments_with_batches_cannot_be_deleted() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let department = ctx.department("Electrical").await;
    let batch = ctx.batch("2023-2027", department.id, 2).await;

    let (status, body) = call!(app, delete(&format!("/api/departments/{}", department.id), &ctx.admin_token));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Department is still referenced by batches");

    let (status, _) = call!(app, delete(&format!("/api/batches/{}", batch.id), &ctx.admin_token));
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call!(app, delete(&format!("/api/departments/{}", department.id), &ctx.admin_token));
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call!(app, get(&format!("/api/departments/{}", department.id), &ctx.admin_token));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Department not found");
}

#[actix_web::test]
async fn malformed_input_is_a_bad_request() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);

    let (status, body) = call!(
        app,
        post("/api/batches", &ctx.admin_token, json!({ "batchName": "2027-2023", "departments": [] }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = call!(
        app,
        TestRequest::post()
            .uri("/api/departments/register")
            .insert_header(("Authorization", format!("Bearer {}", ctx.admin_token)))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{ not json")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = call!(app, get("/api/departments/not-a-uuid", &ctx.admin_token));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_parents_narrow_to_empty_lists() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let token = &ctx.admin_token;

    let (status, body) = call!(app, get(&format!("/api/batches/department/{}", Uuid::new_v4()), token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let uri = format!(
        "/api/sections?departmentId={}&batchId={}&academicYear=2024-2025",
        Uuid::new_v4(),
        Uuid::new_v4()
    );
    let (status, body) = call!(app, get(&uri, token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn students_join_open_sections_with_free_seats() {
    let ctx = setup().await;
    let app = test_app!(ctx.state);
    let token = &ctx.admin_token;
    let department = ctx.department("Computer Science").await;
    let batch = ctx.batch("2023-2027", department.id, 1).await;

    let student = |name: &str, section: &str| {
        json!({
            "name": name,
            "email": common::email_for(name),
            "password": "password-123",
            "role": "student",
            "departmentId": department.id,
            "batchId": batch.id,
            "section": section,
            "year": 1,
            "academicYear": ACADEMIC_YEAR
        })
    };

    // No Section documents exist yet.
    let (status, body) = call!(app, post("/api/users", token, student("Asha Rao", "F")));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Section not found");

    let mut without_year = student("Asha Rao", "A");
    without_year["year"] = json!(null);
    let (status, _) = call!(app, post("/api/users", token, without_year));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let sections = ctx.sections(department.id, batch.id, 1, 12).await;
    for i in 0..11 {
        ctx.student(&format!("Student {}", i + 1), department.id, batch.id, "A").await;
    }

    // Capacity cannot drop below the students already placed.
    let section_uri = format!("/api/sections/{}", sections[0].id);
    let (status, body) = call!(app, put(&section_uri, token, json!({ "capacity": 10 })));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Section A already has 11 students");

    let (status, _) = call!(app, post("/api/users", token, student("Asha Rao", "a")));
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call!(app, post("/api/users", token, student("Vikram Iyer", "A")));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Section A is full (12 of 12 seats taken)");

    let (status, _) = call!(app, put(&section_uri, token, json!({ "capacity": 13 })));
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call!(app, post("/api/users", token, student("Vikram Iyer", "A")));
    assert_eq!(status, StatusCode::CREATED);
}
