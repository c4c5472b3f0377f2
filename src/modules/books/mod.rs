pub mod models;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use folio_http::error::AppError;
use folio_kernel::{InitCtx, Module};
use folio_store::Store;

use models::{Book, NewBook};

const COLLECTION: &str = "books";

/// Books module: CRUD surface over the book collection. Every route performs
/// exactly one store operation.
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, store: Store) -> Router {
        // The trailing capture segment is a title for GET and a record id
        // for POST/DELETE; the literal prefixes keep the paths disjoint.
        Router::new()
            .route("/", get(list_books).post(create_book))
            .route("/author/{name}", get(books_by_author))
            .route("/genre/{name}", get(books_by_genre))
            .route("/year/{year}", get(books_by_year))
            .route("/title/{title}", post(update_book_by_title))
            .route(
                "/{title}",
                get(book_by_title)
                    .post(update_book_by_id)
                    .delete(delete_book_by_id),
            )
            .with_state(store)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List all books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All catalogued books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {"$ref": "#/components/schemas/Book"}
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "The collection is empty",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/NewBook"}
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Book stored with a generated id",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "message": {"type": "string"},
                                                "book": {"$ref": "#/components/schemas/Book"}
                                            }
                                        }
                                    }
                                }
                            },
                            "500": {
                                "description": "Store failure",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/{title}": {
                    "get": {
                        "summary": "Fetch one book by title",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "title", "in": "path", "required": true, "schema": {"type": "string"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "The matching book",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Book"}
                                    }
                                }
                            },
                            "404": {
                                "description": "No book with that title",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Update a book by id",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
                        ],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"type": "object"}
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "The updated book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "message": {"type": "string"},
                                                "updatedBook": {"$ref": "#/components/schemas/Book"}
                                            }
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book with that id",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    },
                    "delete": {
                        "summary": "Delete a book by id",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "Book removed",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {"message": {"type": "string"}}
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book with that id",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/author/{name}": {
                    "get": {
                        "summary": "List books by author",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "name", "in": "path", "required": true, "schema": {"type": "string"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "Matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {"$ref": "#/components/schemas/Book"}
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "No matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/genre/{name}": {
                    "get": {
                        "summary": "List books by genre",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "name", "in": "path", "required": true, "schema": {"type": "string"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "Matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {"$ref": "#/components/schemas/Book"}
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "No matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/year/{year}": {
                    "get": {
                        "summary": "List books by published year",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "year", "in": "path", "required": true, "schema": {"type": "string"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "Matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {"$ref": "#/components/schemas/Book"}
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "No matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/title/{title}": {
                    "post": {
                        "summary": "Update a book by title",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "title", "in": "path", "required": true, "schema": {"type": "string"}}
                        ],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"type": "object"}
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "The updated book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "message": {"type": "string"},
                                                "updatedBook": {"$ref": "#/components/schemas/Book"}
                                            }
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book with that title",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "string",
                                "description": "Store-generated unique identifier"
                            },
                            "title": {
                                "type": "string",
                                "description": "Title of the book"
                            },
                            "author": {
                                "type": "string",
                                "description": "Author of the book"
                            },
                            "genre": {
                                "type": "string",
                                "description": "Genre of the book"
                            },
                            "publishedYear": {
                                "type": "integer",
                                "description": "Year the book was published"
                            }
                        },
                        "required": ["id"],
                        "additionalProperties": true
                    },
                    "NewBook": {
                        "type": "object",
                        "properties": {
                            "title": {
                                "type": "string",
                                "description": "Title of the book"
                            },
                            "author": {
                                "type": "string",
                                "description": "Author of the book"
                            },
                            "genre": {
                                "type": "string",
                                "description": "Genre of the book"
                            },
                            "publishedYear": {
                                "type": "integer",
                                "description": "Year the book was published"
                            }
                        },
                        "additionalProperties": true
                    }
                }
            }
        }))
    }

    fn collections(&self) -> &'static [&'static str] {
        &[COLLECTION]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Add a book; the store assigns the identifier.
async fn create_book(
    State(store): State<Store>,
    Json(new_book): Json<NewBook>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doc = serde_json::to_value(&new_book).context("failed to serialize book payload")?;
    let stored = store.insert(COLLECTION, doc).await?;
    let book = into_book(stored)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Book added successfully.", "book": book})),
    ))
}

/// List the whole collection; an empty collection reads as not found.
async fn list_books(State(store): State<Store>) -> Result<Json<Vec<Book>>, AppError> {
    let docs = store.find_all(COLLECTION).await?;
    if docs.is_empty() {
        return Err(AppError::not_found("No books found."));
    }

    let books = docs
        .into_iter()
        .map(into_book)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(books))
}

/// Fetch a single book by exact title.
async fn book_by_title(
    State(store): State<Store>,
    Path(title): Path<String>,
) -> Result<Json<Book>, AppError> {
    let doc = store
        .find_one_by(COLLECTION, "title", &Value::String(title))
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    Ok(Json(into_book(doc)?))
}

async fn books_by_author(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Book>>, AppError> {
    find_books_by(&store, "author", name).await
}

async fn books_by_genre(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Book>>, AppError> {
    find_books_by(&store, "genre", name).await
}

async fn books_by_year(
    State(store): State<Store>,
    Path(year): Path<String>,
) -> Result<Json<Vec<Book>>, AppError> {
    find_books_by(&store, "publishedYear", year).await
}

/// Merge the request body into the book with the given id.
async fn update_book_by_id(
    State(store): State<Store>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let updated = store
        .update_by_id(COLLECTION, &id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Book does not exist."))?;
    let book = into_book(updated)?;

    Ok(Json(
        json!({"message": "Book updated successfully.", "updatedBook": book}),
    ))
}

/// Merge the request body into the first book with the given title.
async fn update_book_by_title(
    State(store): State<Store>,
    Path(title): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let updated = store
        .update_by_field(COLLECTION, "title", &Value::String(title), patch)
        .await?
        .ok_or_else(|| AppError::not_found("Book does not exist."))?;
    let book = into_book(updated)?;

    Ok(Json(
        json!({"message": "Book updated successfully.", "updatedBook": book}),
    ))
}

/// Remove a book permanently.
async fn delete_book_by_id(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    store
        .delete_by_id(COLLECTION, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    Ok(Json(json!({"message": "Book deleted successfully."})))
}

/// Shared shape of the author/genre/year list routes: one query, 404 when
/// nothing matched.
async fn find_books_by(
    store: &Store,
    field: &str,
    value: String,
) -> Result<Json<Vec<Book>>, AppError> {
    let docs = store
        .find_many_by(COLLECTION, field, &Value::String(value))
        .await?;
    if docs.is_empty() {
        return Err(AppError::not_found("No books found."));
    }

    let books = docs
        .into_iter()
        .map(into_book)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(books))
}

fn into_book(doc: Value) -> Result<Book, AppError> {
    serde_json::from_value(doc)
        .context("stored book document is malformed")
        .map_err(AppError::from)
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn test_router() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path()).await.expect("open store");
        store.ensure_collection(COLLECTION).await.expect("ensure");
        (BooksModule::new().routes(store), dir)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn dune() -> Value {
        json!({
            "title": "Dune",
            "author": "Herbert",
            "genre": "SciFi",
            "publishedYear": 1965
        })
    }

    #[tokio::test]
    async fn adding_a_book_returns_201_and_a_generated_id() {
        let (router, _dir) = test_router().await;

        let (status, body) = send(&router, post("/", &dune())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Book added successfully.");
        assert!(!body["book"]["id"].as_str().unwrap().is_empty());

        let (status, fetched) = send(&router, get("/Dune")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["title"], "Dune");
        assert_eq!(fetched["author"], "Herbert");
        assert_eq!(fetched["genre"], "SciFi");
        assert_eq!(fetched["publishedYear"], 1965);
        assert_eq!(fetched["id"], body["book"]["id"]);
    }

    #[tokio::test]
    async fn free_form_fields_are_stored_as_submitted() {
        let (router, _dir) = test_router().await;

        let mut payload = dune();
        payload["isbn"] = json!("978-0441172719");
        let (status, body) = send(&router, post("/", &payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["book"]["isbn"], "978-0441172719");
    }

    #[tokio::test]
    async fn listing_an_empty_collection_is_404() {
        let (router, _dir) = test_router().await;

        let (status, body) = send(&router, get("/")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "No books found.");
    }

    #[tokio::test]
    async fn listing_returns_the_inserted_books() {
        let (router, _dir) = test_router().await;
        send(&router, post("/", &dune())).await;

        let (status, body) = send(&router, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        let books = body.as_array().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0]["title"], "Dune");
    }

    #[tokio::test]
    async fn fetching_an_unknown_title_is_404() {
        let (router, _dir) = test_router().await;
        send(&router, post("/", &dune())).await;

        let (status, body) = send(&router, get("/Emma")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Book not found.");
    }

    #[tokio::test]
    async fn field_queries_return_matches_or_404() {
        let (router, _dir) = test_router().await;
        send(&router, post("/", &dune())).await;

        let (status, body) = send(&router, get("/author/Herbert")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = send(&router, get("/genre/SciFi")).await;
        assert_eq!(status, StatusCode::OK);

        // path params are strings; the store matches them against the
        // stored integer year
        let (status, _) = send(&router, get("/year/1965")).await;
        assert_eq!(status, StatusCode::OK);

        for uri in ["/author/Austen", "/genre/Romance", "/year/1850"] {
            let (status, body) = send(&router, get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "expected 404 for {uri}");
            assert_eq!(body["error"]["message"], "No books found.");
        }
    }

    #[tokio::test]
    async fn updating_by_id_merges_and_keeps_other_fields() {
        let (router, _dir) = test_router().await;
        let (_, created) = send(&router, post("/", &dune())).await;
        let id = created["book"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&router, post(&format!("/{id}"), &json!({"genre": "X"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Book updated successfully.");
        assert_eq!(body["updatedBook"]["genre"], "X");
        assert_eq!(body["updatedBook"]["title"], "Dune");
        assert_eq!(body["updatedBook"]["author"], "Herbert");
        assert_eq!(body["updatedBook"]["publishedYear"], 1965);
        assert_eq!(body["updatedBook"]["id"], id.as_str());
    }

    #[tokio::test]
    async fn updating_an_unknown_id_is_404_without_mutation() {
        let (router, _dir) = test_router().await;
        send(&router, post("/", &dune())).await;

        let missing = Uuid::nil().to_string();
        let (status, body) = send(
            &router,
            post(&format!("/{missing}"), &json!({"genre": "X"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Book does not exist.");

        let (_, fetched) = send(&router, get("/Dune")).await;
        assert_eq!(fetched["genre"], "SciFi");
    }

    #[tokio::test]
    async fn updating_with_a_malformed_id_is_500() {
        let (router, _dir) = test_router().await;

        let (status, body) = send(&router, post("/not-a-uuid", &json!({"genre": "X"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred.");
    }

    #[tokio::test]
    async fn updating_by_title_targets_the_named_book() {
        let (router, _dir) = test_router().await;
        send(&router, post("/", &dune())).await;

        let (status, body) = send(
            &router,
            post("/title/Dune", &json!({"genre": "Fantasy"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updatedBook"]["genre"], "Fantasy");

        let (status, body) = send(&router, post("/title/Emma", &json!({"genre": "X"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Book does not exist.");
    }

    #[tokio::test]
    async fn deleting_a_book_is_permanent() {
        let (router, _dir) = test_router().await;
        let (_, created) = send(&router, post("/", &dune())).await;
        let id = created["book"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&router, delete(&format!("/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Book deleted successfully.");

        let (status, _) = send(&router, get("/Dune")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&router, delete(&format!("/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Book not found.");
    }

    #[test]
    fn module_declares_its_collection() {
        let module = BooksModule::new();
        assert_eq!(module.name(), "books");
        assert_eq!(module.collections(), &[COLLECTION]);
    }
}
