mod helpers;

use axum::http::StatusCode;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn create_contact_applies_defaults(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool));
    let admin = helpers::register(&app, "admin@acme.test", "Acme").await;

    let (status, body) = helpers::post_json(
        &app,
        &admin.token,
        "/api/contacts",
        serde_json::json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@customer.test",
            "tags": ["vip", "b2b"],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "contact created successfully");
    let contact = &body["contact"];
    assert_eq!(contact["status"], "active");
    assert_eq!(contact["country"], "Indonesia");
    assert_eq!(contact["tenant_id"], admin.tenant_id);
    assert_eq!(contact["created_by"], admin.user_id);
    assert_eq!(contact["tags"], serde_json::json!(["vip", "b2b"]));
}

#[sqlx::test(migrations = "./migrations")]
async fn create_contact_validation(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool));
    let admin = helpers::register(&app, "admin@acme.test", "Acme").await;

    let (status, body) = helpers::post_json(
        &app,
        &admin.token,
        "/api/contacts",
        serde_json::json!({ "last_name": "Nobody" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "first name is required");

    let (status, body) = helpers::post_json(
        &app,
        &admin.token,
        "/api/contacts",
        serde_json::json!({ "first_name": "Jane", "status": "archived" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "invalid status. must be: active, inactive, or blocked"
    );

    let (status, _) = helpers::post_json(
        &app,
        &admin.token,
        "/api/contacts",
        serde_json::json!({ "first_name": "Jane", "email": "nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_contact_is_partial(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool));
    let admin = helpers::register(&app, "admin@acme.test", "Acme").await;
    let id = helpers::create_contact(&app, &admin.token, "Jane", "Doe").await;

    let (status, body) = helpers::patch_json(
        &app,
        &admin.token,
        &format!("/api/contacts/{id}"),
        serde_json::json!({ "city": "Bandung", "status": "inactive" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["contact"]["first_name"], "Jane");
    assert_eq!(body["contact"]["last_name"], "Doe");
    assert_eq!(body["contact"]["city"], "Bandung");
    assert_eq!(body["contact"]["status"], "inactive");

    let (status, body) = helpers::patch_json(
        &app,
        &admin.token,
        &format!("/api/contacts/{id}"),
        serde_json::json!({ "first_name": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "first name is required");
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_contact_hides_it(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool.clone()));
    let admin = helpers::register(&app, "admin@acme.test", "Acme").await;
    let id = helpers::create_contact(&app, &admin.token, "Jane", "Doe").await;

    let (status, _) =
        helpers::delete_json(&app, &admin.token, &format!("/api/contacts/{id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        helpers::get_json(&app, &admin.token, &format!("/api/contacts/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "contact not found");

    let (status, _) =
        helpers::delete_json(&app, &admin.token, &format!("/api/contacts/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Soft delete keeps the row.
    let deleted: bool =
        sqlx::query_scalar("SELECT deleted_at IS NOT NULL FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(deleted);
}

#[sqlx::test(migrations = "./migrations")]
async fn contacts_isolated_between_tenants(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool));
    let acme = helpers::register(&app, "admin@acme.test", "Acme").await;
    let globex = helpers::register(&app, "admin@globex.test", "Globex").await;
    let id = helpers::create_contact(&app, &acme.token, "Jane", "Doe").await;

    let path = format!("/api/contacts/{id}");

    let (status, _) = helpers::get_json(&app, &globex.token, &path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = helpers::patch_json(
        &app,
        &globex.token,
        &path,
        serde_json::json!({ "first_name": "Mallory" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = helpers::delete_json(&app, &globex.token, &path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = helpers::get_json(&app, &globex.token, "/api/contacts").await;
    assert_eq!(body["total"], 0);

    let (status, body) = helpers::get_json(&app, &acme.token, &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contact"]["first_name"], "Jane");
}

#[sqlx::test(migrations = "./migrations")]
async fn list_contacts_filters_and_paginates(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool));
    let admin = helpers::register(&app, "admin@acme.test", "Acme").await;

    for (first, city, tags) in [
        ("Alice", "Jakarta", vec!["vip", "b2b"]),
        ("Bob", "Jakarta", vec!["b2b"]),
        ("Carol", "Surabaya", vec!["vip"]),
    ] {
        let (status, body) = helpers::post_json(
            &app,
            &admin.token,
            "/api/contacts",
            serde_json::json!({ "first_name": first, "city": city, "tags": tags }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = helpers::get_json(&app, &admin.token, "/api/contacts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 20);
    assert_eq!(body["total_pages"], 1);
    let names: Vec<&str> = body["contacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["first_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Alice", "Bob", "Carol"]);

    let (_, body) = helpers::get_json(&app, &admin.token, "/api/contacts?city=Jakarta").await;
    assert_eq!(body["total"], 2);

    let (_, body) = helpers::get_json(&app, &admin.token, "/api/contacts?tags=vip,b2b").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["contacts"][0]["first_name"], "Alice");

    let (_, body) = helpers::get_json(&app, &admin.token, "/api/contacts?search=CAR").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["contacts"][0]["first_name"], "Carol");

    let (_, body) =
        helpers::get_json(&app, &admin.token, "/api/contacts?page=2&page_size=2").await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["contacts"].as_array().unwrap().len(), 1);
    assert_eq!(body["contacts"][0]["first_name"], "Carol");
}

#[sqlx::test(migrations = "./migrations")]
async fn search_contacts_requires_query(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool));
    let admin = helpers::register(&app, "admin@acme.test", "Acme").await;
    helpers::create_contact(&app, &admin.token, "Jane", "Doe").await;
    helpers::create_contact(&app, &admin.token, "John", "Smith").await;

    let (status, body) = helpers::get_json(&app, &admin.token, "/api/contacts/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "search query is required");

    let (status, body) =
        helpers::get_json(&app, &admin.token, "/api/contacts/search?q=doe").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "doe");
    assert_eq!(body["total"], 1);
    assert_eq!(body["contacts"][0]["last_name"], "Doe");
}

#[sqlx::test(migrations = "./migrations")]
async fn contact_search_treats_wildcards_literally(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool));
    let admin = helpers::register(&app, "admin@acme.test", "Acme").await;
    helpers::create_contact(&app, &admin.token, "Ann_Marie", "Lee").await;
    helpers::create_contact(&app, &admin.token, "AnnXMarie", "Lee").await;

    let (status, body) =
        helpers::get_json(&app, &admin.token, "/api/contacts/search?q=ann_").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["contacts"][0]["first_name"], "Ann_Marie");

    let (_, body) = helpers::get_json(&app, &admin.token, "/api/contacts?search=%25").await;
    assert_eq!(body["total"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn huge_page_number_returns_empty_page(pool: PgPool) {
    let app = helpers::test_router(helpers::test_state(pool));
    let admin = helpers::register(&app, "admin@acme.test", "Acme").await;
    helpers::create_contact(&app, &admin.token, "Jane", "Doe").await;

    for path in [
        "/api/contacts?page=9223372036854775807",
        "/api/contacts/search?q=jane&page=9223372036854775807&page_size=100",
        "/api/tenant/users?page=9223372036854775807",
        "/api/tenant/audit-logs?page=9223372036854775807",
    ] {
        let (status, body) = helpers::get_json(&app, &admin.token, path).await;
        assert_eq!(status, StatusCode::OK, "{path}: {body}");
        assert_eq!(body["total"], 1, "{path}");
    }

    let (_, body) =
        helpers::get_json(&app, &admin.token, "/api/contacts?page=9223372036854775807").await;
    assert!(body["contacts"].as_array().unwrap().is_empty());
}
