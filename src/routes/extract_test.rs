use super::*;
use axum::body::Body;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientQuery {
    client_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct EmailBody {
    email: String,
}

fn json_request(body: &'static str) -> Request {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn parts(uri: &str) -> Parts {
    Request::builder().uri(uri).body(Body::empty()).unwrap().into_parts().0
}

#[tokio::test]
async fn json_accepts_valid_body() {
    let ApiJson(body) = ApiJson::<EmailBody>::from_request(json_request(r#"{"email":"a@b.co"}"#), &())
        .await
        .unwrap();
    assert_eq!(body.email, "a@b.co");
}

#[tokio::test]
async fn json_missing_field_keeps_status_and_message() {
    let err = ApiJson::<EmailBody>::from_request(json_request(r#"{"nope":1}"#), &())
        .await
        .err()
        .unwrap();
    assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err.message.contains("missing field `email`"), "{}", err.message);
}

#[tokio::test]
async fn json_syntax_error_is_bad_request() {
    let err = ApiJson::<EmailBody>::from_request(json_request("{"), &()).await.err().unwrap();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn json_without_content_type_is_unsupported_media_type() {
    let req = Request::builder().method("POST").uri("/").body(Body::from("{}")).unwrap();
    let err = ApiJson::<EmailBody>::from_request(req, &()).await.err().unwrap();
    assert_eq!(err.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn query_with_bad_uuid_is_bad_request() {
    let mut parts = parts("/x?clientId=not-a-uuid");
    let err = ApiQuery::<ClientQuery>::from_request_parts(&mut parts, &()).await.err().unwrap();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert!(!err.message.is_empty());
}

#[tokio::test]
async fn query_parses_camel_case() {
    let id = Uuid::new_v4();
    let mut parts = parts(&format!("/x?clientId={id}"));
    let ApiQuery(query) = ApiQuery::<ClientQuery>::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(query.client_id, id);
}

#[tokio::test]
async fn multipart_without_boundary_is_rejected_with_envelope_error() {
    let err = ApiMultipart::from_request(json_request("{}"), &()).await.err().unwrap();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}
