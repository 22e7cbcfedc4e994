use axum::response::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::middleware::ApiResponse;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Booking Gate",
            "version": version,
            "description": "Role-based route authorization for the booking dashboard",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "session": "/api/session (authenticated)",
                "dashboards": "/dashboard/org/*, /dashboard/user/* (role restricted)",
            }
        }
    }))
}

/// GET /health - liveness check
pub async fn health() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}
