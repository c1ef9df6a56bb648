//! Catalog demo: paginated items and a validated create endpoint.
//!
//! Run with:
//!   RUST_LOG=info ENVIRONMENT=development cargo run --example items
//!
//! Try:
//!   curl -i 'http://localhost:8000/items?limit=5'
//!   curl -i 'http://localhost:8000/items?limit=5&category=tools' -H 'accept: application/cbor' | xxd | head
//!   curl -i http://localhost:8000/items/item-007
//!   curl -i -X POST http://localhost:8000/items \
//!        -H 'content-type: application/json' -d '{"name":"","price":-1}'
//!   curl -i -X POST http://localhost:8000/items -H 'content-type: text/plain' -d 'hi'
//!   curl -i http://localhost:8000/schemas/ErrorModel.json

use std::sync::{Arc, LazyLock, RwLock};

use chrono::{Duration, TimeZone, Utc};
use conneg::cbor::UtcTimestamp;
use conneg::pagination::{PageParams, Paginator};
use conneg::validation::{Location, ValidationErrors, Violation};
use conneg::{ApiError, App, Config, DomainError, Json, Request, Response, Router, SchemaRegistry, Server};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize)]
struct Item {
    id: String,
    name: String,
    category: String,
    price: f64,
    created_at: UtcTimestamp,
}

#[derive(Debug, Deserialize)]
struct NewItem {
    name: String,
    category: String,
    price: f64,
}

#[derive(Serialize)]
struct ItemPage {
    items: Vec<Item>,
    total: usize,
    next_cursor: Option<String>,
    prev_cursor: Option<String>,
}

type Store = Arc<RwLock<Vec<Item>>>;

static STORE: LazyLock<Store> = LazyLock::new(|| {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
    let items = (1..=30)
        .map(|i| Item {
            id: format!("item-{i:03}"),
            name: format!("Item {i}"),
            category: if i % 3 == 0 { "tools" } else { "home" }.to_owned(),
            price: f64::from(i) * 2.5,
            created_at: UtcTimestamp(epoch + Duration::hours(i64::from(i))),
        })
        .collect();
    Arc::new(RwLock::new(items))
});

#[tokio::main]
async fn main() -> Result<(), conneg::Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let schemas = SchemaRegistry::builder()
        .schema(
            "NewItem",
            json!({
                "type": "object",
                "required": ["name", "category", "price"],
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "category": {"type": "string"},
                    "price": {"type": "number", "minimum": 0}
                }
            }),
        )
        .build();

    let router = Router::new()
        .get("/items", list_items)
        .post("/items", create_item)
        .get("/items/{id}", get_item)
        .delete("/items/{id}", delete_item);

    let app = App::builder(router).config(config.clone()).schemas(schemas).build();
    Server::bind(&config.bind_addr())?.serve(app).await
}

async fn list_items(req: Request) -> Result<Response, ApiError> {
    let query = req.query();
    let params = PageParams::from_query(&query)?;

    let mut paginator = Paginator::new("item", "/items");
    let category = query.get("category").filter(|c| !c.is_empty());
    if let Some(category) = category {
        paginator = paginator.query_param("category", category.as_str());
    }

    let items: Vec<Item> = read_store()?
        .iter()
        .filter(|item| category.is_none_or(|c| &item.category == c))
        .cloned()
        .collect();

    let page = paginator.paginate(&items, params.cursor.as_deref(), params.limit, |item| item.id.as_str())?;

    let mut builder = Response::builder();
    if let Some(link) = &page.link_header {
        builder = builder.header("link", link);
    }
    builder
        .serialize(ItemPage {
            items: page.items,
            total: page.total,
            next_cursor: page.next_cursor,
            prev_cursor: page.prev_cursor,
        })
        .map_err(|e| ApiError::internal(e.to_string()))
}

async fn get_item(req: Request) -> Result<Json<Item>, ApiError> {
    let id = req.param("id").unwrap_or_default();
    read_store()?
        .iter()
        .find(|item| item.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| DomainError::not_found(format!("Item '{id}' not found")).into())
}

async fn create_item(mut req: Request) -> Result<Response, ApiError> {
    let new: NewItem = req.json()?;
    validate(&new)?;

    let mut store = STORE.write().map_err(|_| ApiError::internal("item store poisoned"))?;
    if store.iter().any(|item| item.name.eq_ignore_ascii_case(&new.name)) {
        return Err(DomainError::conflict(format!("Item '{}' already exists", new.name)).into());
    }

    let item = Item {
        id: format!("item-{:03}", store.len() + 1),
        name: new.name,
        category: new.category,
        price: new.price,
        created_at: UtcTimestamp(Utc::now()),
    };
    store.push(item.clone());

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", &format!("/items/{}", item.id))
        .serialize(item)
        .map_err(|e| ApiError::internal(e.to_string()))
}

async fn delete_item(req: Request) -> Result<StatusCode, ApiError> {
    let id = req.param("id").unwrap_or_default();
    let mut store = STORE.write().map_err(|_| ApiError::internal("item store poisoned"))?;
    let before = store.len();
    store.retain(|item| item.id != id);
    if store.len() == before {
        return Err(DomainError::not_found(format!("Item '{id}' not found")).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

fn validate(new: &NewItem) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if new.name.trim().is_empty() {
        errors.push(
            Violation::new(Location::body().key("name"), "String should have at least 1 character")
                .with_input(new.name.as_str()),
        );
    }
    if new.price < 0.0 {
        errors.push(
            Violation::new(Location::body().key("price"), "Input should be greater than or equal to 0")
                .with_input(new.price),
        );
    }
    errors.into_result()
}

fn read_store() -> Result<std::sync::RwLockReadGuard<'static, Vec<Item>>, ApiError> {
    STORE.read().map_err(|_| ApiError::internal("item store poisoned"))
}
