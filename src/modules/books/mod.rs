pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

pub use service::{BookCatalog, Page};

/// Schema of the `books` table.
pub const BOOKS_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS books (
        id     INTEGER PRIMARY KEY AUTOINCREMENT,
        title  TEXT,
        author TEXT,
        rating INTEGER
    );
"#;

/// The book catalog: list, search-or-create, rate, and delete.
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
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
            page_size = ctx.settings.catalog.page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        let catalog = BookCatalog::from_pool(ctx.db.clone(), &ctx.settings.catalog);
        routes::router(catalog)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let page_param = json!({
            "name": "page",
            "in": "query",
            "required": false,
            "schema": { "type": "integer", "default": 1 }
        });
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer" }
        });

        Some(json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "List a page of books",
                        "tags": ["Books"],
                        "parameters": [page_param],
                        "responses": {
                            "200": {
                                "description": "A page of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookPage" }
                                    }
                                }
                            },
                            "404": error("Page holds no books")
                        }
                    },
                    "post": {
                        "summary": "Search titles, or create a book when no search term is given",
                        "tags": ["Books"],
                        "parameters": [page_param],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Search results or the created book id",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "oneOf": [
                                                { "$ref": "#/components/schemas/BookPage" },
                                                { "$ref": "#/components/schemas/CreatedBook" }
                                            ]
                                        }
                                    }
                                }
                            },
                            "422": error("Malformed body or datastore failure")
                        }
                    }
                },
                "/books/{id}": {
                    "patch": {
                        "summary": "Update a book's rating",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": { "rating": { "type": "integer" } }
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Rating updated" },
                            "400": error("Unknown book or malformed rating")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param, page_param],
                        "responses": {
                            "200": {
                                "description": "Book deleted",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/DeletedBook" }
                                    }
                                }
                            },
                            "400": error("Unknown book")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "title": { "type": "string", "nullable": true },
                            "author": { "type": "string", "nullable": true },
                            "rating": { "type": "integer", "nullable": true }
                        },
                        "required": ["id", "title", "author", "rating"]
                    },
                    "BookRequest": {
                        "type": "object",
                        "properties": {
                            "search": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "rating": { "type": "integer" }
                        }
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "success": { "type": "boolean" },
                            "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "total_books": { "type": "integer" }
                        }
                    },
                    "CreatedBook": {
                        "type": "object",
                        "properties": {
                            "success": { "type": "boolean" },
                            "created": { "type": "integer" },
                            "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "total_books": { "type": "integer" }
                        }
                    },
                    "DeletedBook": {
                        "type": "object",
                        "properties": {
                            "success": { "type": "boolean" },
                            "deleted": { "type": "integer" },
                            "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "total_books": { "type": "integer" }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: BOOKS_SCHEMA,
        }]
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

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}
