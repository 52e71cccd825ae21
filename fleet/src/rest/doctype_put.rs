// FleetDocs
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.


//! API to update a document type.

use crate::driver::FleetDriver;
use crate::model::{DocumentType, DocumentTypeId, DocumentTypeUpdate};
use axum::Json;
use axum::extract::{Path, State};
use fleetdocs_core::rest::{JsonBody, RestResult};

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<FleetDriver>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> RestResult<Json<DocumentType>> {
    let id = DocumentTypeId::parse("id", id)?;
    let update = DocumentTypeUpdate::from_json(&body)?;
    let doc_type = driver.update_doc_type(id, update).await?;
    Ok(Json(doc_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::rest::testutils::*;
    use axum::http;
    use fleetdocs_core::rest::testutils::OneShotBuilder;
    use fleetdocs_core::test_payload_must_be_json;
    use serde_json::json;
    use std::time::Duration;

    fn route(id: &str) -> (http::Method, String) {
        (http::Method::PUT, format!("/api/document-types/{}", id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let doc_type = context.create_doc_type("Insurance").await;

        context.clock().advance(Duration::from_secs(3600));
        let response = OneShotBuilder::new(context.app(), route(doc_type.id().as_str()))
            .send_json(json!({"name": "Vehicle insurance", "description": "Mandatory"}))
            .await
            .expect_json::<DocumentType>()
            .await;
        assert_eq!("Vehicle insurance", response.name());
        assert_eq!(&Some("Mandatory".to_owned()), response.description());
        assert_eq!(doc_type.created_at(), response.created_at());
        assert!(response.updated_at() > doc_type.updated_at());

        let stored = db::get_doc_type(&mut context.ex().await, doc_type.id()).await.unwrap();
        assert_eq!(stored, response);
    }

    #[tokio::test]
    async fn test_same_name_is_not_a_conflict() {
        let context = TestContext::setup().await;
        let doc_type = context.create_doc_type("Insurance").await;

        let response = OneShotBuilder::new(context.app(), route(doc_type.id().as_str()))
            .send_json(json!({"name": "Insurance", "description": null}))
            .await
            .expect_json::<DocumentType>()
            .await;
        assert_eq!("Insurance", response.name());
    }

    #[tokio::test]
    async fn test_conflict() {
        let context = TestContext::setup().await;
        let doc_type = context.create_doc_type("Insurance").await;
        context.create_doc_type("Permit").await;

        OneShotBuilder::new(context.app(), route(doc_type.id().as_str()))
            .send_json(json!({"name": "Permit"}))
            .await
            .expect_status(http::StatusCode::CONFLICT)
            .expect_error("Document type with this name already exists")
            .await;
    }

    #[tokio::test]
    async fn test_invalid() {
        let context = TestContext::setup().await;
        let doc_type = context.create_doc_type("Insurance").await;

        OneShotBuilder::new(context.app(), route(doc_type.id().as_str()))
            .send_json(json!({"name": "", "description": 7}))
            .await
            .expect_violations(&[
                ("name", "Document type name is required"),
                ("description", "Expected string, received number"),
            ])
            .await;
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route("missing"))
            .send_json(json!({"name": "Permit"}))
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Document type not found")
            .await;
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route("some-id"));
}
