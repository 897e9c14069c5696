//! HTTP behaviour of `ApiClient` and the editors against a mock server

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use kerala_client::{
    AboutEditor, ApiClient, BannerEditor, BookingFlow, ClientError, ContentBackend,
    GalleryEditor, ImageSlot, LoadState, Notice, ToursView,
};
use kerala_core::{BannerSlot, BlockId, ImageRef, ImageUpload, UploadPolicy};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn policy() -> UploadPolicy {
    UploadPolicy::new(5 * 1024 * 1024, vec!["jpg".into(), "jpeg".into(), "png".into()])
}

fn image(name: &str) -> ImageUpload {
    ImageUpload::from_bytes(name, b"\x89PNG fake".to_vec(), &policy()).unwrap()
}

fn client(server: &MockServer) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(server.uri()).unwrap())
}

fn body_text(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

async fn requests_to(server: &MockServer, verb: &str, route: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .collect()
}

#[tokio::test]
async fn test_gallery_block_renders_with_resolved_image() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"block": "img1", "title": "Beach", "image": "/u/1.jpg"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let editor = GalleryEditor::new(client(&server), policy());
    editor.load().await.unwrap();

    let cards = editor.cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].title, "Beach");
    assert_eq!(cards[0].image, Some(format!("{}/u/1.jpg", server.uri())));
}

#[tokio::test]
async fn test_booking_posts_exact_body_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "p1", "title": "Munnar Hills", "description": "Tea country", "price": 12000, "image": "/u/munnar.jpg"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/bookings"))
        .and(body_json(json!({
            "name": "A",
            "phone": "123",
            "date": "2024-01-01",
            "people": "2",
            "package": "Munnar Hills"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "Booked"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server);
    let tours = ToursView::new(Arc::clone(&backend));
    tours.load().await.unwrap();
    let package = tours.find("Munnar Hills").unwrap();
    assert_eq!(package.key.as_deref(), Some("p1"));
    assert_eq!(tours.cards()[0].price, "₹ 12000");

    let flow = BookingFlow::new(backend);
    flow.open(package).unwrap();
    flow.set_name("A").unwrap();
    flow.set_phone("123").unwrap();
    flow.set_date("2024-01-01").unwrap();
    flow.set_people("2").unwrap();

    let notice = flow.submit().await.unwrap();
    assert_eq!(notice, Notice::success("Booking submitted successfully!"));
    assert_eq!(requests_to(&server, "POST", "/api/bookings").await.len(), 1);
}

#[tokio::test]
async fn test_about_load_tolerates_nulls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "heading": "Kerala",
            "paragraph": null,
            "backgroundImage": "/u/bg.jpg",
            "cards": [{"title": "Houseboats", "image": "/u/c1.jpg"}, null]
        })))
        .mount(&server)
        .await;

    let editor = AboutEditor::new(client(&server), policy());
    editor.load().await.unwrap();

    let draft = editor.draft().unwrap();
    assert_eq!(draft.heading, "Kerala");
    assert_eq!(draft.paragraph, "");
    assert_eq!(draft.background, ImageSlot::Stored(ImageRef::new("/u/bg.jpg")));
    assert_eq!(draft.cards.len(), 1);
}

#[tokio::test]
async fn test_about_submit_sends_multipart_then_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "heading": "Kerala",
            "paragraph": "Backwaters",
            "cards": [{"title": "Houseboats", "image": "/u/c1.jpg"}]
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let editor = AboutEditor::new(client(&server), policy());
    editor.load().await.unwrap();
    editor.set_heading("God's Own Country").unwrap();
    editor.select_card_image(0, image("boat.png")).unwrap();

    editor.submit().await.unwrap();

    let puts = requests_to(&server, "PUT", "/api/about").await;
    let body = body_text(&puts[0]);
    assert!(body.contains("name=\"heading\""));
    assert!(body.contains("God's Own Country"));
    assert!(body.contains("name=\"paragraph\""));
    assert!(body.contains("name=\"cards[0][title]\""));
    assert!(body.contains("name=\"cards[0][image]\"; filename=\"boat.png\""));
    assert!(!body.contains("backgroundImage"));

    // The draft now mirrors the second GET, not what was typed
    assert_eq!(editor.draft().unwrap().heading, "Kerala");
}

#[tokio::test]
async fn test_error_body_message_becomes_notice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"block": "img1", "title": "Beach", "image": "/u/1.jpg"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/gallery"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Title too long"})),
        )
        .mount(&server)
        .await;

    let editor = GalleryEditor::new(client(&server), policy());
    editor.load().await.unwrap();
    let block = BlockId::new("img1").unwrap();
    editor.set_title(&block, "x".repeat(500)).unwrap();

    let err = editor.update(&block).await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 400, .. }));
    assert_eq!(editor.take_notice(), Some(Notice::error("Title too long")));
    assert_eq!(editor.draft(&block).unwrap().title.len(), 500);
}

#[tokio::test]
async fn test_bare_error_status_uses_fallback_notice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"block": "img1", "title": "Beach", "image": "/u/1.jpg"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/gallery"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let editor = GalleryEditor::new(client(&server), policy());
    editor.load().await.unwrap();
    let block = BlockId::new("img1").unwrap();
    editor.set_title(&block, "Kovalam").unwrap();

    let err = editor.update(&block).await.unwrap_err();

    assert_eq!(err.server_message(), None);
    assert_eq!(err.to_string(), "Backend returned 500: Internal Server Error");
    assert_eq!(
        editor.take_notice(),
        Some(Notice::error("Update failed for img1"))
    );
    assert_eq!(editor.draft(&block).unwrap().title, "Kovalam");
}

#[tokio::test]
async fn test_gallery_delete_hits_block_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"block": "img1", "title": "Beach", "image": "/u/1.jpg"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/gallery/img1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let editor = GalleryEditor::new(client(&server), policy());
    editor.load().await.unwrap();

    let outcome = editor
        .delete(&BlockId::new("img1").unwrap(), &|_: &str| true)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        kerala_client::Outcome::Applied(Notice::success("img1 deleted"))
    );
}

#[tokio::test]
async fn test_banner_upload_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/banner"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"message": "Banner created"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let editor = BannerEditor::new(client(&server), policy());
    let slot = BannerSlot::new(2).unwrap();
    editor.set_heading(slot, "Backwaters");
    editor.set_subheading(slot, "Cruise Alleppey");
    editor.select_image(slot, image("alleppey.jpg")).unwrap();

    let notice = editor.submit().await.unwrap();
    assert_eq!(notice, Notice::success("Banner created"));

    let posts = requests_to(&server, "POST", "/api/banner").await;
    let body = body_text(&posts[0]);
    assert!(body.contains("name=\"img2Heading\""));
    assert!(body.contains("name=\"img2Subheading\""));
    assert!(body.contains("name=\"img2\"; filename=\"alleppey.jpg\""));
    assert!(body.contains("Content-Type: image/jpeg"));
    assert!(!body.contains("img1"));
}

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tours"))
        .and(header("X-API-Key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = ApiClient::new(server.uri()).unwrap().with_api_key("secret");
    assert!(backend.fetch_tours().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_without_body_shows_status_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tours"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let view = ToursView::new(client(&server));
    let err = view.load().await.unwrap_err();

    assert_eq!(err.to_string(), "Backend returned 503: Service Unavailable");
    assert_eq!(err.server_message(), None);
    assert_eq!(
        view.load_state(),
        LoadState::Failed("Failed to load tour packages.".to_string())
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_http_error() {
    let backend = ApiClient::new("http://127.0.0.1:9").unwrap();
    let err = backend.fetch_about().await.unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
    assert!(!err.is_client_side());
}
