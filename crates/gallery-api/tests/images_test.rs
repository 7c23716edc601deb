//! Image API integration tests.
//!
//! Run with: `cargo test -p gallery-api --test images_test`

mod helpers;

use axum::http::StatusCode;
use axum::{routing::get, Router};
use axum_test::multipart::{MultipartForm, Part};
use helpers::auth::bearer;
use helpers::fixtures::{create_test_png, png_form};
use helpers::{api_path, count_files, setup_test_app, setup_test_app_with, TestApp};
use serde_json::Value;

async fn upload(app: &TestApp, user_id: Option<i64>, form: MultipartForm) -> Value {
    let mut request = app.client().post(&api_path("/images")).multipart(form);
    if let Some(id) = user_id {
        request = request.add_header("Authorization", bearer(id));
    }
    let response = request.await;
    assert_eq!(response.status_code(), StatusCode::CREATED, "{}", response.text());
    response.json::<Value>()
}

#[tokio::test]
async fn test_upload_image() {
    let app = setup_test_app().await;

    let form = png_form("Holiday Photo.png", create_test_png(200, 100))
        .add_text("title", "Beach")
        .add_text("folder", "travel")
        .add_text("is_public", "true");
    let body = upload(&app, Some(1), form).await;

    assert_eq!(body["owner_id"], 1);
    assert_eq!(body["title"], "Beach");
    assert_eq!(body["folder"], "travel");
    assert_eq!(body["is_public"], true);
    assert_eq!(body["format"], "PNG");
    assert_eq!(body["width"], 200);
    assert_eq!(body["height"], 100);

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("user_1/"), "{}", filename);
    assert!(filename.ends_with("_Holiday_Photo.png"), "{}", filename);
    assert!(app.image_dir().join(filename).is_file());

    let thumbnail = body["thumbnail"].as_str().unwrap();
    assert!(thumbnail.ends_with("_thumb.png"), "{}", thumbnail);
    assert!(app.thumbnail_dir().join(thumbnail).is_file());

    let thumb = image::open(app.thumbnail_dir().join(thumbnail)).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (64, 32));

    assert_eq!(body["image_url"], format!("/media/images/{}", filename));
}

#[tokio::test]
async fn test_upload_defaults_and_anonymous_owner() {
    let app = setup_test_app().await;

    let body = upload(&app, None, png_form("a.png", create_test_png(10, 10))).await;

    assert!(body["owner_id"].is_null());
    assert_eq!(body["title"], "Untitled");
    assert_eq!(body["is_public"], false);
    assert!(!body["filename"].as_str().unwrap().contains('/'));
}

#[tokio::test]
async fn test_upload_converts_to_requested_format() {
    let app = setup_test_app().await;

    let form = png_form("photo.png", create_test_png(40, 30)).add_text("format", "jpg");
    let body = upload(&app, Some(1), form).await;

    assert_eq!(body["format"], "JPEG");
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".jpg"), "{}", filename);

    let bytes = std::fs::read(app.image_dir().join(filename)).unwrap();
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
}

#[tokio::test]
async fn test_upload_unsupported_format_rejected() {
    let app = setup_test_app().await;

    let form = png_form("photo.png", create_test_png(10, 10)).add_text("format", "gif");
    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Authorization", bearer(1))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("GIF"), "{}", body);
}

#[tokio::test]
async fn test_upload_invalid_image_rejected() {
    let app = setup_test_app().await;

    let part = Part::bytes(b"definitely not an image".to_vec())
        .file_name("fake.png")
        .mime_type("image/png");
    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Authorization", bearer(1))
        .multipart(MultipartForm::new().add_part("file", part))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(!app.image_dir().join("user_1").exists());
}

#[tokio::test]
async fn test_upload_without_file_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .multipart(MultipartForm::new().add_text("title", "no file"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_too_large_rejected() {
    let app = setup_test_app_with(|config| config.media.max_upload_bytes = 1024).await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .multipart(png_form("big.png", vec![0u8; 4096]))
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path("/images"))
        .add_header("Authorization", "Bearer not-a-jwt")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .client()
        .get(&api_path("/images"))
        .add_header("Authorization", "Basic dXNlcjpwYXNz")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_visibility() {
    let app = setup_test_app().await;

    upload(
        &app,
        Some(1),
        png_form("private.png", create_test_png(8, 8)).add_text("title", "private"),
    )
    .await;
    upload(
        &app,
        Some(1),
        png_form("public.png", create_test_png(8, 8))
            .add_text("title", "public")
            .add_text("is_public", "true"),
    )
    .await;

    // Anonymous callers only see public images
    let body = app.client().get(&api_path("/images")).await.json::<Value>();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "public");

    // Owners listing themselves see everything, newest first
    let body = app
        .client()
        .get(&api_path("/images?owner_id=1"))
        .add_header("Authorization", bearer(1))
        .await
        .json::<Value>();
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["title"], "public");
    assert_eq!(body["items"][1]["title"], "private");

    // Another user asking for owner 1 sees only the public one
    let body = app
        .client()
        .get(&api_path("/images?owner_id=1"))
        .add_header("Authorization", bearer(2))
        .await
        .json::<Value>();
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let app = setup_test_app().await;

    for (name, folder) in [("a.png", "cats"), ("b.png", "cats"), ("c.png", "dogs")] {
        upload(
            &app,
            Some(1),
            png_form(name, create_test_png(8, 8))
                .add_text("folder", folder)
                .add_text("is_public", "true"),
        )
        .await;
    }

    let body = app
        .client()
        .get(&api_path("/images?folder=cats&per_page=1&page=2"))
        .await
        .json::<Value>();
    assert_eq!(body["total"], 2);
    assert_eq!(body["pages"], 2);
    assert_eq!(body["page"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let body = app
        .client()
        .get(&api_path("/images?format=jpeg"))
        .await
        .json::<Value>();
    assert_eq!(body["total"], 0);

    let response = app.client().get(&api_path("/images?format=bmp")).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_search_by_term_and_tag() {
    let app = setup_test_app().await;

    let beach = upload(
        &app,
        Some(1),
        png_form("a.png", create_test_png(8, 8))
            .add_text("title", "Sunset at the Beach")
            .add_text("tags", "sea, summer")
            .add_text("is_public", "true"),
    )
    .await;
    let dog = upload(
        &app,
        Some(1),
        png_form("b.png", create_test_png(8, 8))
            .add_text("title", "Rex")
            .add_text("tags", "dog, beach")
            .add_text("is_public", "true"),
    )
    .await;
    upload(
        &app,
        Some(1),
        png_form("c.png", create_test_png(8, 8))
            .add_text("title", "Mountains")
            .add_text("is_public", "true"),
    )
    .await;

    let ids = |body: Value| -> Vec<i64> {
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_i64().unwrap())
            .collect()
    };

    let body = app.client().get(&api_path("/images?q=BEACH")).await.json::<Value>();
    assert_eq!(body["total"], 2);
    assert_eq!(
        ids(body),
        vec![dog["id"].as_i64().unwrap(), beach["id"].as_i64().unwrap()]
    );

    let body = app.client().get(&api_path("/images?tag=sea")).await.json::<Value>();
    assert_eq!(ids(body), vec![beach["id"].as_i64().unwrap()]);

    let by_id = format!("/images?q={}", dog["id"]);
    let body = app.client().get(&api_path(&by_id)).await.json::<Value>();
    assert_eq!(ids(body), vec![dog["id"].as_i64().unwrap()]);

    let body = app
        .client()
        .get(&api_path("/images?q=beach&tag=dog"))
        .await
        .json::<Value>();
    assert_eq!(ids(body), vec![dog["id"].as_i64().unwrap()]);

    let body = app.client().get(&api_path("/images?q=%20%20")).await.json::<Value>();
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_get_image_access() {
    let app = setup_test_app().await;

    let body = upload(&app, Some(1), png_form("a.png", create_test_png(8, 8))).await;
    let id = body["id"].as_i64().unwrap();
    let path = api_path(&format!("/images/{}", id));

    let response = app
        .client()
        .get(&path)
        .add_header("Authorization", bearer(1))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["id"], id);

    let response = app
        .client()
        .get(&path)
        .add_header("Authorization", bearer(2))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app.client().get(&path).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app.client().get(&api_path("/images/999")).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_replaces_file() {
    let app = setup_test_app().await;

    let body = upload(&app, Some(1), png_form("old.png", create_test_png(20, 20))).await;
    let id = body["id"].as_i64().unwrap();
    let old_file = body["filename"].as_str().unwrap().to_string();
    let old_thumb = body["thumbnail"].as_str().unwrap().to_string();

    let form = png_form("new.png", create_test_png(30, 10))
        .add_text("title", "Renamed")
        .add_text("is_public", "true");
    let response = app
        .client()
        .put(&api_path(&format!("/images/{}", id)))
        .add_header("Authorization", bearer(1))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());

    let updated = response.json::<Value>();
    assert_eq!(updated["id"], id);
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["is_public"], true);
    assert_eq!(updated["width"], 30);

    let new_file = updated["filename"].as_str().unwrap();
    assert_ne!(new_file, old_file);
    assert!(app.image_dir().join(new_file).is_file());
    assert!(!app.image_dir().join(&old_file).exists());
    assert!(!app.thumbnail_dir().join(&old_thumb).exists());
}

#[tokio::test]
async fn test_update_metadata_only_keeps_file() {
    let app = setup_test_app().await;

    let body = upload(&app, Some(1), png_form("a.png", create_test_png(8, 8))).await;
    let id = body["id"].as_i64().unwrap();

    let response = app
        .client()
        .put(&api_path(&format!("/images/{}", id)))
        .add_header("Authorization", bearer(1))
        .multipart(MultipartForm::new().add_text("tags", "sunset,sea"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let updated = response.json::<Value>();
    assert_eq!(updated["tags"], "sunset,sea");
    assert_eq!(updated["filename"], body["filename"]);
    assert!(app
        .image_dir()
        .join(body["filename"].as_str().unwrap())
        .is_file());
}

#[tokio::test]
async fn test_update_requires_owner() {
    let app = setup_test_app().await;

    let body = upload(&app, Some(1), png_form("a.png", create_test_png(8, 8))).await;
    let id = body["id"].as_i64().unwrap();

    let response = app
        .client()
        .put(&api_path(&format!("/images/{}", id)))
        .add_header("Authorization", bearer(2))
        .multipart(MultipartForm::new().add_text("title", "mine now"))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_image() {
    let app = setup_test_app().await;

    let body = upload(&app, Some(1), png_form("a.png", create_test_png(8, 8))).await;
    let id = body["id"].as_i64().unwrap();
    let file = app.image_dir().join(body["filename"].as_str().unwrap());
    let thumb = app.thumbnail_dir().join(body["thumbnail"].as_str().unwrap());
    let path = api_path(&format!("/images/{}", id));

    let response = app
        .client()
        .delete(&path)
        .add_header("Authorization", bearer(2))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .client()
        .delete(&path)
        .add_header("Authorization", bearer(1))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert!(!file.exists());
    assert!(!thumb.exists());

    let response = app
        .client()
        .get(&path)
        .add_header("Authorization", bearer(1))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_rejects_private_url() {
    let app = setup_test_app().await;

    for url in ["http://127.0.0.1/a.png", "http://localhost/a.png", "ftp://example.com/a.png"] {
        let response = app
            .client()
            .post(&api_path("/images/import"))
            .add_header("Authorization", bearer(1))
            .json(&serde_json::json!({ "url": url }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", url);
    }

    let response = app
        .client()
        .post(&api_path("/images/import"))
        .json(&serde_json::json!({ "title": "no url" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_from_local_server() {
    let png = create_test_png(50, 25);
    let served = png.clone();
    let source = Router::new().route(
        "/pics/cat.png",
        get(move || {
            let served = served.clone();
            async move { ([("content-type", "image/png")], served) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, source).await.unwrap();
    });

    let app = setup_test_app_with(|config| config.remote.allow_private_ips = true).await;
    let url = format!("http://{}/pics/cat.png", addr);

    let response = app
        .client()
        .post(&api_path("/images/import"))
        .add_header("Authorization", bearer(3))
        .json(&serde_json::json!({ "image_url": url, "is_public": "yes" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED, "{}", response.text());

    let body = response.json::<Value>();
    assert_eq!(body["title"], "Imported");
    assert_eq!(body["source_url"], url);
    assert_eq!(body["owner_id"], 3);
    assert_eq!(body["is_public"], true);
    assert_eq!(body["width"], 50);
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("user_3/"), "{}", filename);
    assert!(filename.ends_with("_cat.png"), "{}", filename);
}

#[tokio::test]
async fn test_import_unreachable_source() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = setup_test_app_with(|config| config.remote.allow_private_ips = true).await;
    let response = app
        .client()
        .post(&api_path("/images/import"))
        .json(&serde_json::json!({ "url": format!("http://{}/missing.png", addr) }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "REMOTE_FETCH_FAILED");
    assert_eq!(count_files(&app.image_dir()), 0);
    assert_eq!(count_files(&app.thumbnail_dir()), 0);

    let body = app.client().get(&api_path("/images")).await.json::<Value>();
    assert_eq!(body["total"], 0);
}
