//! Media serving integration tests.
//!
//! Run with: `cargo test -p gallery-api --test media_test`

mod helpers;

use axum::http::StatusCode;
use helpers::auth::bearer;
use helpers::fixtures::{create_test_png, png_form};
use helpers::{api_path, setup_test_app, TestApp};
use serde_json::Value;

async fn upload_png(app: &TestApp, name: &str) -> Value {
    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Authorization", bearer(1))
        .multipart(png_form(name, create_test_png(120, 80)))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn test_serve_original_bytes() {
    let app = setup_test_app().await;
    let body = upload_png(&app, "cat.png").await;
    let filename = body["filename"].as_str().unwrap();

    let response = app.client().get(body["image_url"].as_str().unwrap()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert!(response.headers().get("content-disposition").is_none());

    let on_disk = std::fs::read(app.image_dir().join(filename)).unwrap();
    assert_eq!(response.as_bytes().as_ref(), on_disk.as_slice());
    assert_eq!(
        response.header("content-length").to_str().unwrap(),
        on_disk.len().to_string()
    );
}

#[tokio::test]
async fn test_serve_thumbnail() {
    let app = setup_test_app().await;
    let body = upload_png(&app, "cat.png").await;

    let response = app
        .client()
        .get(body["thumbnail_url"].as_str().unwrap())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let thumb = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (64, 43));
}

#[tokio::test]
async fn test_download_sets_attachment() {
    let app = setup_test_app().await;
    let body = upload_png(&app, "cat.png").await;
    let filename = body["filename"].as_str().unwrap();
    let basename = filename.rsplit('/').next().unwrap();

    let response = app
        .client()
        .get(body["download_url"].as_str().unwrap())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.header("content-disposition").to_str().unwrap(),
        format!("attachment; filename=\"{}\"", basename)
    );
}

#[tokio::test]
async fn test_path_traversal_forbidden() {
    let app = setup_test_app().await;
    std::fs::write(app.image_dir().join("../secret.txt"), b"secret").unwrap();

    for path in [
        "/media/images/..%2Fsecret.txt",
        "/media/images/user_1%2F..%2F..%2Fsecret.txt",
        "/media/download/..%2Fsecret.txt",
        "/media/thumbnails/..%2Fimages%2Fsecret.txt",
    ] {
        let response = app.client().get(path).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN, "{}", path);
    }
}

#[tokio::test]
async fn test_missing_file_not_found() {
    let app = setup_test_app().await;

    let response = app.client().get("/media/images/user_1/nope.png").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = app.client().get("/media/thumbnails/nope_thumb.png").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "healthy");

    let response = app.client().get(&api_path("/openapi.json")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let doc = response.json::<Value>();
    assert!(doc["paths"]["/api/v0/images/{id}"].is_object());
}
