mod common;

use common::{app, get, header, json_body, request, send};
use conneg::cbor;
use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn cbor_accept_gets_equivalent_cbor() {
    let app = app();
    let as_json = send(&app, get("/items/item-003", &[])).await;
    let as_cbor = send(&app, get("/items/item-003", &[("accept", "application/cbor")])).await;

    assert_eq!(as_cbor.status(), StatusCode::OK);
    assert_eq!(header(&as_cbor, "content-type"), "application/cbor");
    assert_eq!(header(&as_cbor, "content-length"), as_cbor.body().len().to_string());
    assert_eq!(cbor::decode_to_json(as_cbor.body()).unwrap(), json_body(&as_json));
}

#[tokio::test]
async fn wildcard_or_missing_accept_is_json() {
    let app = app();
    for accept in [None, Some("*/*"), Some("application/*"), Some("application/cbor;q=0, */*")] {
        let headers: Vec<(&str, &str)> = accept.map(|a| ("accept", a)).into_iter().collect();
        let response = send(&app, get("/items/item-001", &headers)).await;
        assert_eq!(header(&response, "content-type"), "application/json", "{accept:?}");
    }
}

#[tokio::test]
async fn cbor_request_body_is_transcoded() {
    let body = cbor::encode_json(&json!({"name": "Rex", "tags": ["good", "boy"]})).unwrap();
    let response = send(&app(), request("POST", "/echo", &[("content-type", "application/cbor")], body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(&response), json!({"name": "Rex", "tags": ["good", "boy"]}));
}

#[tokio::test]
async fn cbor_both_ways() {
    let body = cbor::encode_json(&json!({"n": 1})).unwrap();
    let response = send(
        &app(),
        request("POST", "/echo", &[("content-type", "application/cbor"), ("accept", "application/cbor")], body),
    )
    .await;
    assert_eq!(header(&response, "content-type"), "application/cbor");
    assert_eq!(cbor::decode_to_json(response.body()).unwrap(), json!({"n": 1}));
}

#[tokio::test]
async fn truncated_cbor_is_400() {
    let response = send(&app(), request("POST", "/echo", &[("content-type", "application/cbor")], vec![0xa2])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header(&response, "content-type"), "application/problem+json");
    let body = json_body(&response);
    assert_eq!(body["title"], "Invalid CBOR");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn unsupported_content_type_is_415() {
    let response = send(&app(), request("POST", "/echo", &[("content-type", "text/plain")], "hello")).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let detail = json_body(&response)["detail"].as_str().unwrap().to_owned();
    assert!(detail.contains("application/cbor, application/json"), "{detail}");
}

#[tokio::test]
async fn problem_in_cbor_when_asked() {
    let response = send(&app(), get("/items/nope", &[("accept", "application/problem+cbor")])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(header(&response, "content-type"), "application/problem+cbor");
    let body = cbor::decode_to_json(response.body()).unwrap();
    assert_eq!(body["detail"], "Item 'nope' not found");
    assert_eq!(body["$schema"], "http://testserver/schemas/ErrorModel.json");
}

#[tokio::test]
async fn health_negotiates() {
    let response = send(&app(), get("/health", &[("accept", "application/cbor")])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cbor::decode_to_json(response.body()).unwrap(), json!({"status": "healthy"}));
}
