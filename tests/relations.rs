mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::{json, Value};

#[tokio::test]
async fn one_to_many_get_put_and_include() {
    let app = app();
    let ada = create(&app, "users", json!({ "name": "Ada", "email": "ada@example.com" })).await;
    let bob = create(&app, "users", json!({ "name": "Bob", "email": "bob@example.com" })).await;
    let task = create(&app, "tasks", json!({ "title": "A", "done": false, "owner": id(&ada) })).await;
    let base = format!("/tasks/{}", id(&task));

    let owner = call(&app, Method::GET, &format!("{}/owner", base), None).await;
    assert_eq!(owner.status, StatusCode::OK);
    assert_eq!(owner.json()["data"]["email"], "ada@example.com");

    let expanded = call(&app, Method::GET, &format!("{}?include=owner", base), None).await;
    assert_eq!(expanded.json()["data"]["owner"]["name"], "Ada");
    let listed = call(&app, Method::GET, "/tasks?include=owner&fields=title,owner", None).await;
    assert_eq!(
        listed.json()["data"][0],
        json!({ "title": "A", "owner": ada.clone() })
    );

    let moved = call(&app, Method::PUT, &format!("{}/owner", base), Some(json!({ "id": id(&bob) }))).await;
    assert_eq!(moved.status, StatusCode::OK);
    assert_eq!(moved.json()["data"]["owner"], id(&bob).as_str());

    let dangling = call(&app, Method::PUT, &format!("{}/owner", base), Some(json!({ "id": "ghost" }))).await;
    assert_eq!(dangling.status, StatusCode::BAD_REQUEST);
    assert_eq!(dangling.json()["error"]["code"], "VALIDATION_ERROR");

    let cleared = call(&app, Method::PUT, &format!("{}/owner", base), Some(Value::Null)).await;
    assert_eq!(cleared.status, StatusCode::OK);
    let owner = call(&app, Method::GET, &format!("{}/owner", base), None).await;
    assert_eq!(owner.json(), json!({ "data": null }));
}

#[tokio::test]
async fn create_rejects_missing_relation_target() {
    let app = app();
    let reply = call(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({ "title": "A", "done": false, "owner": "ghost" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"]["details"][0]["field"], "owner");
}

#[tokio::test]
async fn deleting_a_target_leaves_references_alone() {
    let app = app();
    let ada = create(&app, "users", json!({ "name": "Ada", "email": "ada@example.com" })).await;
    let task = create(&app, "tasks", json!({ "title": "A", "done": false, "owner": id(&ada) })).await;
    let deleted = call(&app, Method::DELETE, &format!("/users/{}", id(&ada)), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let reply = call(&app, Method::GET, &format!("/tasks/{}?include=owner", id(&task)), None).await;
    assert_eq!(reply.json()["data"]["owner"], id(&ada).as_str());
    let owner = call(&app, Method::GET, &format!("/tasks/{}/owner", id(&task)), None).await;
    assert!(owner.json()["data"].is_null());
}

#[tokio::test]
async fn tags_add_list_remove() {
    let app = app();
    let task = create(&app, "tasks", json!({ "title": "A", "done": false })).await;
    let urgent = create(&app, "tags", json!({ "label": "urgent" })).await;
    let home = create(&app, "tags", json!({ "label": "home" })).await;
    let tags = format!("/tasks/{}/tags", id(&task));

    let added = call(&app, Method::POST, &tags, Some(json!({ "id": id(&urgent) }))).await;
    assert_eq!(added.status, StatusCode::CREATED);
    assert_eq!(added.json()["data"]["label"], "urgent");
    let again = call(&app, Method::POST, &tags, Some(json!({ "tagId": id(&home) }))).await;
    assert_eq!(again.status, StatusCode::CREATED);

    let listed = call(&app, Method::GET, &tags, None).await;
    let labels: Vec<Value> = listed.json()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["label"].clone())
        .collect();
    assert_eq!(labels, vec![json!("urgent"), json!("home")]);

    let removed = call(&app, Method::DELETE, &format!("{}/{}", tags, id(&urgent)), None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let absent = call(&app, Method::DELETE, &format!("{}/not-attached", tags), None).await;
    assert_eq!(absent.status, StatusCode::NO_CONTENT);

    call(&app, Method::DELETE, &format!("/tags/{}", id(&home)), None).await;
    let listed = call(&app, Method::GET, &tags, None).await;
    assert_eq!(listed.json(), json!({ "data": [] }));

    let missing = call(&app, Method::POST, &tags, Some(json!({ "id": "ghost" }))).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    let no_parent = call(&app, Method::GET, "/tasks/ghost/tags", None).await;
    assert_eq!(no_parent.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn named_actions() {
    let app = app();
    let a = create(&app, "tasks", json!({ "title": "a", "done": false, "priority": "low" })).await;
    create(&app, "tasks", json!({ "title": "b", "done": false })).await;
    create(&app, "tasks", json!({ "title": "c", "done": true })).await;

    let completed = call(&app, Method::POST, &format!("/tasks/{}/complete", id(&a)), None).await;
    assert_eq!(completed.status, StatusCode::OK);
    assert_eq!(completed.json()["data"]["done"], true);

    let uri = format!("/tasks/{}/change-priority", id(&a));
    let bad = call(&app, Method::POST, &uri, Some(json!({ "priority": "urgent" }))).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.json()["error"]["code"], "VALIDATION_ERROR");
    let missing = call(&app, Method::POST, &uri, Some(json!({}))).await;
    assert_eq!(missing.json()["error"]["details"][0]["field"], "priority");
    let ok = call(&app, Method::POST, &uri, Some(json!({ "priority": "high" }))).await;
    assert_eq!(ok.json()["data"]["priority"], "high");

    let all = call(&app, Method::POST, "/tasks/complete-all", None).await;
    assert_eq!(all.status, StatusCode::OK);
    let updated = all.json()["data"].as_array().unwrap().clone();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0]["title"], "b");
    let open = call(&app, Method::GET, "/tasks?done=false", None).await;
    assert_eq!(open.json()["meta"]["total"], 0);

    let no_flag = call(&app, Method::POST, "/users/complete-all", None).await;
    assert_eq!(no_flag.status, StatusCode::BAD_REQUEST);
}
