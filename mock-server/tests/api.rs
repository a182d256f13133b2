use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, Site, ADMIN_AUTHORIZATION};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn admin_get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, ADMIN_AUTHORIZATION)
        .body(String::new())
        .unwrap()
}

fn admin_post(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, ADMIN_AUTHORIZATION)
        .body(body.to_string())
        .unwrap()
}

fn header(response: &axum::response::Response, name: &str) -> String {
    response.headers()[name].to_str().unwrap().to_string()
}

// --- lists ---

#[tokio::test]
async fn list_posts_carries_pagination_headers() {
    let resp = app().oneshot(get("/wp-json/wp/v2/posts")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-wp-total"), "2");
    assert_eq!(header(&resp, "x-wp-totalpages"), "1");
    let posts = body_json(resp).await;
    assert_eq!(posts.as_array().unwrap().len(), 2);
    assert_eq!(posts[0]["slug"], "hello");
}

#[tokio::test]
async fn per_page_splits_pages() {
    let resp = app()
        .oneshot(get("/wp-json/wp/v2/posts?per_page=1&page=2"))
        .await
        .unwrap();

    assert_eq!(header(&resp, "x-wp-totalpages"), "2");
    let posts = body_json(resp).await;
    assert_eq!(posts[0]["id"], 8);
}

#[tokio::test]
async fn list_empty_site() {
    let resp = app_with(Site::empty())
        .oneshot(get("/wp-json/wp/v2/tags"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-wp-total"), "0");
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn filters_narrow_results() {
    let resp = app().oneshot(get("/wp-json/wp/v2/posts?slug=hello")).await.unwrap();
    let posts = body_json(resp).await;
    assert_eq!(posts.as_array().unwrap().len(), 1);
    assert_eq!(posts[0]["id"], 7);

    let resp = app().oneshot(get("/wp-json/wp/v2/comments?post=7&order=desc")).await.unwrap();
    let comments = body_json(resp).await;
    assert_eq!(comments[0]["id"], 31);

    let resp = app().oneshot(get("/wp-json/wp/v2/posts?slug=missing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn statuses_are_keyed_by_slug() {
    let resp = app().oneshot(get("/wp-json/wp/v2/statuses")).await.unwrap();

    let statuses = body_json(resp).await;
    assert_eq!(statuses["publish"]["name"], "Published");
    assert!(statuses["draft"].get("protected").is_none());
}

// --- contexts ---

#[tokio::test]
async fn view_context_strips_raw_and_private_fields() {
    let resp = app().oneshot(get("/wp-json/wp/v2/users/3")).await.unwrap();

    let user = body_json(resp).await;
    assert_eq!(user["name"], "Jane Doe");
    assert!(user.get("email").is_none());
}

#[tokio::test]
async fn edit_context_needs_credentials() {
    let resp = app()
        .oneshot(get("/wp-json/wp/v2/users/3?context=edit"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let error = body_json(resp).await;
    assert_eq!(error["code"], "rest_forbidden_context");

    let resp = app()
        .oneshot(admin_get("/wp-json/wp/v2/users/3?context=edit"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["email"], "jane@wp.test");
}

#[tokio::test]
async fn embed_inlines_related_resources() {
    let resp = app()
        .oneshot(get("/wp-json/wp/v2/posts/7?_embed=true"))
        .await
        .unwrap();

    let post = body_json(resp).await;
    let embedded = &post["_embedded"];
    assert_eq!(embedded["author"][0]["slug"], "jane");
    assert_eq!(embedded["wp:featuredmedia"][0]["id"], 12);
    assert_eq!(embedded["wp:term"][0][1]["slug"], "news");
    assert_eq!(embedded["wp:term"][1][0]["taxonomy"], "post_tag");
    assert_eq!(embedded["replies"][0].as_array().unwrap().len(), 2);
}

// --- errors ---

#[tokio::test]
async fn invalid_parameters_return_400() {
    for uri in [
        "/wp-json/wp/v2/posts?context=preview",
        "/wp-json/wp/v2/posts?per_page=0",
        "/wp-json/wp/v2/posts?order=sideways",
        "/wp-json/wp/v2/posts?page=9",
    ] {
        let resp = app().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn missing_items_return_404() {
    let resp = app().oneshot(get("/wp-json/wp/v2/posts/999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], "rest_post_invalid_id");

    let resp = app().oneshot(get("/wp-json/wp/v2/widgets")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], "rest_no_route");
}

#[tokio::test]
async fn unknown_path_returns_no_route() {
    let resp = app().oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(!body_bytes(resp).await.is_empty());
}

// --- writes ---

#[tokio::test]
async fn create_post_returns_201_in_edit_shape() {
    let resp = app()
        .oneshot(admin_post("/wp-json/wp/v2/posts", r#"{"title":"Fresh Start","content":"Body"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let post = body_json(resp).await;
    assert_eq!(post["id"], 9);
    assert_eq!(post["slug"], "fresh-start");
    assert_eq!(post["title"]["raw"], "Fresh Start");
    assert_eq!(post["status"], "draft");
}

#[tokio::test]
async fn create_without_credentials_is_rejected() {
    let req = Request::builder()
        .method("POST")
        .uri("/wp-json/wp/v2/tags")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"name":"Go"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_user_requires_password() {
    let resp = app()
        .oneshot(admin_post(
            "/wp-json/wp/v2/users",
            r#"{"username":"bob","email":"bob@wp.test"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "rest_missing_callback_param");
}

#[tokio::test]
async fn update_merges_fields() {
    let resp = app()
        .oneshot(admin_post("/wp-json/wp/v2/categories/5", r#"{"description":"Updates"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let category = body_json(resp).await;
    assert_eq!(category["description"], "Updates");
    assert_eq!(category["name"], "News");
}

#[tokio::test]
async fn update_missing_item_returns_404() {
    let resp = app()
        .oneshot(admin_post("/wp-json/wp/v2/comments/99", r#"{"content":"x"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
