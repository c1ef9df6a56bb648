#![allow(dead_code)]

use bytes::Bytes;
use conneg::pagination::{PageParams, Paginator};
use conneg::validation::{Location, ValidationErrors, Violation};
use conneg::{ApiError, App, Config, DomainError, Json, Request, Response, Router};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Clone, Debug, Serialize)]
pub struct Item {
    pub id: String,
    pub name: String,
}

pub fn items() -> Vec<Item> {
    (1..=30)
        .map(|i| Item { id: format!("item-{i:03}"), name: format!("Item {i}") })
        .collect()
}

#[derive(Debug, Deserialize)]
struct Signup {
    email: String,
    password: String,
}

async fn list_items(req: Request) -> Result<Response, ApiError> {
    let params = PageParams::from_query(&req.query())?;
    let all = items();
    let page = Paginator::new("item", "/items").paginate(&all, params.cursor.as_deref(), params.limit, |i| i.id.as_str())?;

    let mut builder = Response::builder();
    if let Some(link) = &page.link_header {
        builder = builder.header("link", link);
    }
    builder
        .serialize(json!({
            "items": page.items,
            "total": page.total,
            "next_cursor": page.next_cursor,
            "prev_cursor": page.prev_cursor,
        }))
        .map_err(|e| ApiError::internal(e.to_string()))
}

async fn get_item(req: Request) -> Result<Json<Item>, DomainError> {
    let id = req.param("id").unwrap_or_default();
    items()
        .into_iter()
        .find(|i| i.id == id)
        .map(Json)
        .ok_or_else(|| DomainError::not_found(format!("Item '{id}' not found")))
}

async fn echo(mut req: Request) -> Result<Json<Value>, ApiError> {
    req.json::<Value>().map(Json)
}

async fn signup(mut req: Request) -> Result<StatusCode, ApiError> {
    let body: Signup = req.json()?;
    let mut errors = ValidationErrors::new();
    if !body.email.contains('@') {
        errors.push(Violation::new(Location::body().key("email"), "not a valid email").with_input(body.email));
    }
    if body.password.len() < 8 {
        errors.push(Violation::new(Location::body().key("password"), "too short").with_input(body.password));
    }
    errors.into_result()?;
    Ok(StatusCode::CREATED)
}

async fn explode(_req: Request) -> Result<Response, std::io::Error> {
    Err(std::io::Error::other("database password is hunter2"))
}

pub fn router() -> Router {
    Router::new()
        .get("/items", list_items)
        .get("/items/{id}", get_item)
        .post("/echo", echo)
        .post("/signup", signup)
        .get("/explode", explode)
}

pub fn app() -> App {
    app_with(Config::default())
}

pub fn app_with(config: Config) -> App {
    App::builder(router()).config(config).build()
}

pub fn get(uri: &str, headers: &[(&str, &str)]) -> http::Request<Full<Bytes>> {
    request("GET", uri, headers, Bytes::new())
}

pub fn request(method: &str, uri: &str, headers: &[(&str, &str)], body: impl Into<Bytes>) -> http::Request<Full<Bytes>> {
    let mut builder = http::Request::builder().method(method).uri(uri).header("host", "testserver");
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    builder.body(Full::new(body.into())).unwrap()
}

pub async fn send(app: &App, req: http::Request<Full<Bytes>>) -> http::Response<Bytes> {
    let response = app.handle(req).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    http::Response::from_parts(parts, bytes)
}

pub fn json_body(response: &http::Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

pub fn header<'a>(response: &'a http::Response<Bytes>, name: &str) -> &'a str {
    response.headers().get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}
