//! End-to-end tests for spreadsheet uploads and the product read endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{csv_sheet, response_json, TestApp};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use stockbook_api::entities::{daily_record, product};

fn two_product_sheet() -> Vec<u8> {
    csv_sheet(
        1,
        &[
            "P1,First product,100,10,$2.00,5,$3.00",
            "P2,Second product,50,10,$2.00,5,$3.00",
        ],
    )
}

fn upload_dir_is_empty(app: &TestApp) -> bool {
    std::fs::read_dir(app.upload_dir())
        .expect("read upload dir")
        .next()
        .is_none()
}

#[tokio::test]
async fn upload_then_read_product_detail() {
    let app = TestApp::new().await;

    let response = app
        .upload("inventory.csv", &two_product_sheet(), Some(app.token()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = response_json(response).await;
    assert_eq!(summary["products_count"], 2);
    assert_eq!(summary["days_count"], 2);
    assert_eq!(
        summary["message"],
        "Excel file uploaded and processed successfully"
    );

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products/P1", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await,
        json!({
            "id": "P1",
            "name": "First product",
            "opening_inventory": 100,
            "days": [{"day": 1, "inventory": 105, "procurement": 20.0, "sales": 15.0}]
        })
    );

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products", None)
        .await;
    assert_eq!(
        response_json(response).await,
        json!([
            {"id": "P1", "name": "First product", "opening_inventory": 100},
            {"id": "P2", "name": "Second product", "opening_inventory": 50}
        ])
    );

    assert!(upload_dir_is_empty(&app));
}

#[tokio::test]
async fn reupload_replaces_history_without_new_products() {
    let app = TestApp::new().await;
    app.upload("inventory.csv", &two_product_sheet(), Some(app.token()))
        .await;

    let updated = csv_sheet(
        2,
        &["P1,Renamed,200,0,,1,1.50,4,$1.00,0,"],
    );
    let response = app.upload("inventory.CSV", &updated, Some(app.token())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = response_json(response).await;
    assert_eq!(summary["products_count"], 0);
    assert_eq!(summary["days_count"], 2);

    let detail = response_json(
        app.request_authenticated(Method::GET, "/api/v1/products/P1", None)
            .await,
    )
    .await;
    assert_eq!(detail["name"], "Renamed");
    assert_eq!(detail["opening_inventory"], 200);
    assert_eq!(
        detail["days"],
        json!([
            {"day": 1, "inventory": 199, "procurement": 0.0, "sales": 1.5},
            {"day": 2, "inventory": 203, "procurement": 4.0, "sales": 0.0}
        ])
    );

    // P2 was not in the second file and keeps its history
    let records = daily_record::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(records, 3);
}

#[tokio::test]
async fn same_file_twice_is_idempotent() {
    let app = TestApp::new().await;

    let first = response_json(
        app.upload("inventory.csv", &two_product_sheet(), Some(app.token()))
            .await,
    )
    .await;
    let second = response_json(
        app.upload("inventory.csv", &two_product_sheet(), Some(app.token()))
            .await,
    )
    .await;

    assert_eq!(first["products_count"], 2);
    assert_eq!(second["products_count"], 0);
    assert_eq!(second["days_count"], 2);
    assert_eq!(
        product::Entity::find().count(&*app.state.db).await.unwrap(),
        2
    );
    assert_eq!(
        daily_record::Entity::find()
            .count(&*app.state.db)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn missing_required_column_writes_nothing() {
    let app = TestApp::new().await;
    let sheet = b"ID,Product Name\nP1,First product\n";

    let response = app.upload("inventory.csv", sheet, Some(app.token())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Opening Inventory"));

    assert_eq!(
        product::Entity::find().count(&*app.state.db).await.unwrap(),
        0
    );
    assert!(upload_dir_is_empty(&app));
}

#[tokio::test]
async fn unparsable_cell_is_a_bad_request() {
    let app = TestApp::new().await;
    let sheet = csv_sheet(1, &["P1,First product,lots,10,$2.00,5,$3.00"]);

    let response = app.upload("inventory.csv", &sheet, Some(app.token())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        product::Entity::find().count(&*app.state.db).await.unwrap(),
        0
    );
    assert!(upload_dir_is_empty(&app));
}

#[tokio::test]
async fn non_spreadsheet_upload_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .upload("notes.txt", b"just some text", Some(app.token()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(response).await["message"],
        "Only spreadsheet files (.xlsx, .xls, .csv) are allowed"
    );
    assert!(upload_dir_is_empty(&app));
}

#[tokio::test]
async fn corrupt_workbook_is_a_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .upload("inventory.xlsx", b"definitely not a zip archive", Some(app.token()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(upload_dir_is_empty(&app));
}

#[tokio::test]
async fn unknown_product_detail_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products/NOPE", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(response).await["message"], "Product not found");
}

#[tokio::test]
async fn compare_skips_unknown_ids_and_keeps_request_order() {
    let app = TestApp::new().await;
    app.upload("inventory.csv", &two_product_sheet(), Some(app.token()))
        .await;

    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/products/compare?product_ids=P2,%20INVALID,P1,P2",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["P2", "P1"]);
    assert_eq!(body[1]["days"][0]["inventory"], 105);

    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/products/compare?product_ids=P1,INVALID",
            None,
        )
        .await;
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn compare_without_ids_is_a_bad_request() {
    let app = TestApp::new().await;

    for uri in [
        "/api/v1/products/compare",
        "/api/v1/products/compare?product_ids=",
        "/api/v1/products/compare?product_ids=%20,%20",
    ] {
        let response = app.request_authenticated(Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            response_json(response).await["message"],
            "No product IDs provided"
        );
    }
}

#[tokio::test]
async fn upload_over_size_limit_is_payload_too_large() {
    let app = TestApp::new().await;
    let limit = app.state.config.max_upload_bytes;

    let mut sheet = csv_sheet(1, &["P1,First product,100,10,$2.00,5,$3.00"]);
    sheet.resize(limit + 1024 * 1024, b' ');

    let response = app.upload("inventory.csv", &sheet, Some(app.token())).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        product::Entity::find().count(&*app.state.db).await.unwrap(),
        0
    );
    assert!(upload_dir_is_empty(&app));
}

#[tokio::test]
async fn overlong_product_id_is_a_bad_request() {
    let app = TestApp::new().await;
    let row = format!("{},Long id,1,0,,0,", "X".repeat(300));
    let sheet = csv_sheet(1, &[row.as_str()]);

    let response = app.upload("inventory.csv", &sheet, Some(app.token())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("column 'ID'"));
    assert_eq!(
        product::Entity::find().count(&*app.state.db).await.unwrap(),
        0
    );
}
