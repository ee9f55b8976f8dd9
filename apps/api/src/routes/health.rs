use axum::{response::Redirect, Json};
use serde_json::{json, Value};

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-api"
    }))
}

/// GET /
pub async fn root_handler() -> Redirect {
    Redirect::temporary("/docs")
}

/// GET /docs
/// Route catalogue for the Resume API.
pub async fn docs_handler() -> Json<Value> {
    Json(json!({
        "service": "resume-api",
        "version": env!("CARGO_PKG_VERSION"),
        "resume": {
            "id": "string",
            "name": "string",
            "tags": "string[]",
            "lastEdited": "YYYY-MM-DD",
            "data": "any JSON value"
        },
        "routes": [
            { "method": "GET", "path": "/resumes", "description": "List resumes, newest edit first" },
            { "method": "GET", "path": "/resumes/{id}", "description": "Fetch one resume" },
            {
                "method": "POST",
                "path": "/resumes",
                "description": "Create a resume; id, name, tags and data are optional"
            },
            { "method": "PUT", "path": "/resumes/{id}", "description": "Overwrite the given fields" },
            { "method": "DELETE", "path": "/resumes/{id}", "description": "Delete a resume" },
            { "method": "GET", "path": "/health", "description": "Liveness check" }
        ]
    }))
}
