//! Indirect object routes
//!
//! `/files/:name/objects/:number` and its derived views. Every route takes an
//! optional `?generation=` query, defaulting to generation 0.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::document::dispatch::{self, DecodedView, Subview};
use crate::document::resolver::parse_object_number;
use crate::document::{self, ObjectContext};
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerationQuery {
    /// Kept as text so a malformed value reports InvalidRequest
    pub generation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ObjectReference {
    pub object_number: u32,
    pub generation_number: u16,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files/:name/objects", get(list_objects))
        .route("/files/:name/objects/:number", get(get_object))
        .route("/files/:name/objects/:number/content-stream", get(get_content_stream))
        .route("/files/:name/objects/:number/graphics", get(get_graphics))
        .route("/files/:name/objects/:number/font", get(get_font))
}

/// Every object the document holds
async fn list_objects(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ObjectReference>>> {
    let context = state.resolver().document(&name).await?;
    let objects = context
        .document
        .object_ids()
        .map(|(object_number, generation_number)| ObjectReference {
            object_number,
            generation_number,
        })
        .collect();
    Ok(Json(objects))
}

async fn get_object(
    state: State<AppState>,
    path: Path<(String, String)>,
    query: Query<GenerationQuery>,
) -> Result<Json<DecodedView>> {
    view(state, path, query, Subview::Object).await
}

async fn get_content_stream(
    state: State<AppState>,
    path: Path<(String, String)>,
    query: Query<GenerationQuery>,
) -> Result<Json<DecodedView>> {
    view(state, path, query, Subview::ContentStream).await
}

async fn get_graphics(
    state: State<AppState>,
    path: Path<(String, String)>,
    query: Query<GenerationQuery>,
) -> Result<Json<DecodedView>> {
    view(state, path, query, Subview::Graphics).await
}

async fn get_font(
    state: State<AppState>,
    path: Path<(String, String)>,
    query: Query<GenerationQuery>,
) -> Result<Json<DecodedView>> {
    view(state, path, query, Subview::Font).await
}

/// Resolve the object, then classify and decode its copy off the async pool
async fn view(
    State(state): State<AppState>,
    Path((name, number)): Path<(String, String)>,
    Query(query): Query<GenerationQuery>,
    subview: Subview,
) -> Result<Json<DecodedView>> {
    let resolver = state.resolver();
    let context = resolver.document(&name).await?;
    let number = parse_object_number(&number)?;
    let ObjectContext {
        document,
        id,
        object,
    } = resolver.object(&context, number, query.generation.as_deref())?;

    let view = document::blocking(move || {
        dispatch::decode(&document.document, id, dispatch::classify(object), subview)
    })
    .await?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use crate::testing::{self, Fixture};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn object_path(suffix: &str) -> String {
        format!("/files/{}/objects{}", testing::FIXTURE_NAME, suffix)
    }

    fn server(fixture: &Fixture) -> TestServer {
        TestServer::new(testing::app(fixture)).unwrap()
    }

    #[tokio::test]
    async fn test_list_objects() {
        let fixture = Fixture::new();

        let body: Value = server(&fixture).get(&object_path("")).await.json();

        let objects = body.as_array().unwrap();
        assert_eq!(objects.len(), 15);
        assert_eq!(objects[0], json!({ "object_number": 1, "generation_number": 0 }));
        assert!(objects.contains(&json!({
            "object_number": testing::OLD_GENERATION_NOTE,
            "generation_number": 2
        })));
    }

    #[tokio::test]
    async fn test_omitted_generation_is_zero() {
        let fixture = Fixture::new();
        let server = server(&fixture);

        let implicit: Value = server.get(&object_path("/1")).await.json();
        let explicit: Value = server.get(&object_path("/1?generation=0")).await.json();

        assert_eq!(implicit, explicit);
        assert_eq!(implicit["object"]["Type"], json!("Catalog"));
    }

    #[tokio::test]
    async fn test_generation_lookup() {
        let fixture = Fixture::new();
        let server = server(&fixture);
        let path = object_path(&format!("/{}", testing::OLD_GENERATION_NOTE));

        let missing = server.get(&path).await;
        missing.assert_status_not_found();
        assert_eq!(missing.json::<Value>()["error"], json!("ObjectNotFound"));

        let found = server.get(&format!("{path}?generation=2")).await;
        found.assert_status_ok();
        assert_eq!(found.json::<Value>()["object"]["Note"], json!("revised twice"));

        server
            .get(&format!("{path}?generation=-2"))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_object_number_must_be_numeric() {
        let fixture = Fixture::new();
        let response = server(&fixture).get(&object_path("/abc")).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], json!("InvalidRequest"));
    }

    #[tokio::test]
    async fn test_type0_font_view() {
        let fixture = Fixture::new();
        let path = object_path(&format!("/{}", testing::TYPE0_FONT));

        let body: Value = server(&fixture).get(&path).await.json();

        assert_eq!(body["object"]["Subtype"], json!("Type0"));
        assert_eq!(body["Mapping"]["65"], json!({ "width": 600.0 }));
    }

    #[tokio::test]
    async fn test_broken_stream_is_success_with_error() {
        let fixture = Fixture::new();
        let server = server(&fixture);
        let path = object_path(&format!("/{}/content-stream", testing::BROKEN_STREAM));

        let response = server.get(&path).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["error"].is_string());
        assert!(body.get("operations").is_none());

        // Same request again behaves the same and other objects still decode
        let again: Value = server.get(&path).await.json();
        assert_eq!(again, body);
        let healthy = server
            .get(&object_path(&format!("/{}/content-stream", testing::PAGE_ONE_CONTENTS)))
            .await;
        healthy.assert_status_ok();
        assert_eq!(healthy.json::<Value>()["operations"][0]["operator"], json!("BT"));
    }

    #[tokio::test]
    async fn test_graphics_view() {
        let fixture = Fixture::new();
        let path = object_path(&format!("/{}/graphics", testing::FORM));

        let body: Value = server(&fixture).get(&path).await.json();

        assert_eq!(body["canvas"]["spans"][0]["string"], json!("Form"));
        assert_eq!(body["canvas"]["bounds"], json!([0.0, 0.0, 100.0, 50.0]));
        // Spans are reported once, inside the canvas
        assert!(body.get("spans").is_none());
    }

    #[tokio::test]
    async fn test_font_view_of_non_font() {
        let fixture = Fixture::new();
        let path = object_path(&format!("/{}/font", testing::PAGE_ONE));

        let response = server(&fixture).get(&path).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["object"]["Type"], json!("Page"));
        assert!(body["error"].is_string());
        assert!(body.get("Mapping").is_none());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let fixture = Fixture::new();
        let response = server(&fixture).get("/nothing/here").await;

        response.assert_status_not_found();
        assert_eq!(
            response.json::<Value>(),
            json!({ "error": "NotFound", "message": "No resource at: /nothing/here" })
        );
    }
}
