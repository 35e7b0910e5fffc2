pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use bookshelf_db::Table;
use bookshelf_kernel::{settings::DatabaseSettings, InitCtx, Module};
use serde_json::json;

use models::BookFields;
use routes::SharedRepository;

/// Books resource: list, show, create, replace, patch and delete.
pub struct BooksModule {
    repository: SharedRepository,
}

impl BooksModule {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
    }

    /// Module backed by a fresh, empty in-memory table.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(Table::<BookFields>::in_memory("books")))
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.repository
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.repository.count().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(Arc::clone(&self.repository))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let book_ref = json!({ "$ref": "#/components/schemas/Book" });
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let not_found = json!({
            "description": "Book not found",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let invalid = json!({
            "description": "Validation error",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ValidationErrorResponse" }
                }
            }
        });
        let book_response = |description: &str| {
            json!({
                "description": description,
                "content": { "application/json": { "schema": book_ref.clone() } }
            })
        };
        let body = |schema: &str| {
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{}", schema) }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books in insertion order",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": book_ref.clone() }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": body("BookInput"),
                        "responses": {
                            "201": book_response("Created book"),
                            "422": invalid.clone()
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": book_response("The book"),
                            "404": not_found.clone()
                        }
                    },
                    "put": {
                        "summary": "Replace a book's title and isbn",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "requestBody": body("BookInput"),
                        "responses": {
                            "200": book_response("Updated book"),
                            "404": not_found.clone(),
                            "422": invalid.clone()
                        }
                    },
                    "patch": {
                        "summary": "Update submitted fields of a book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "requestBody": body("BookPatch"),
                        "responses": {
                            "200": book_response("Updated book"),
                            "404": not_found.clone(),
                            "422": invalid
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Book deleted" },
                            "404": not_found
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "isbn": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "isbn", "created_at", "updated_at"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "maxLength": 255 },
                            "isbn": {
                                "description": "String or integer; stored as a string",
                                "type": "string",
                                "maxLength": 255
                            }
                        },
                        "required": ["title", "isbn"]
                    },
                    "BookPatch": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "maxLength": 255 },
                            "isbn": { "type": "string", "maxLength": 255 }
                        }
                    }
                }
            }
        }))
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

/// Create the books module, backed by a snapshot file when one is configured
pub async fn create_module(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn Module>> {
    let module = match &settings.snapshot_path {
        Some(path) => {
            let table = Table::<BookFields>::open("books", path)
                .await
                .with_context(|| "failed to open books table")?;
            BooksModule::new(Arc::new(table))
        }
        None => BooksModule::in_memory(),
    };

    Ok(Arc::new(module))
}
