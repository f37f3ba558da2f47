use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use levelmon_audio::LevelRegistry;

/// Shared context passed to all handlers.
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<LevelRegistry>,
}

pub fn router(registry: Arc<LevelRegistry>) -> Router {
    Router::new()
        .route("/levels", get(get_levels))
        .with_state(AppContext { registry })
}

/// Flat JSON object mapping every registered key to its latest RMS level.
async fn get_levels(State(ctx): State<AppContext>) -> Json<BTreeMap<String, f64>> {
    Json(ctx.registry.levels())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use levelmon_audio::LevelCell;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn registry_with(entries: &[(&str, f64)]) -> Arc<LevelRegistry> {
        let mut cells = HashMap::new();
        for (key, level) in entries {
            let cell = LevelCell::new();
            cell.publish(*level);
            cells.insert(key.to_string(), cell);
        }
        Arc::new(LevelRegistry::new(cells))
    }

    #[tokio::test]
    async fn levels_returns_a_flat_map() {
        let app = router(registry_with(&[("studio1", 0.25), ("studio2", 0.0)]));
        let response = app
            .oneshot(Request::builder().uri("/levels").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: BTreeMap<String, f64> = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["studio1"], 0.25);
        assert_eq!(parsed["studio2"], 0.0);
    }

    #[tokio::test]
    async fn empty_registry_serves_an_empty_object() {
        let app = router(Arc::new(LevelRegistry::default()));
        let response = app
            .oneshot(Request::builder().uri("/levels").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{}");
    }
}
