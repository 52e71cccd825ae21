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


//! API to register a new document type.

use crate::driver::FleetDriver;
use crate::model::{DocumentType, NewDocumentType};
use axum::Json;
use axum::extract::State;
use fleetdocs_core::rest::{JsonBody, RestResult};
use http::StatusCode;

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<FleetDriver>,
    JsonBody(body): JsonBody,
) -> RestResult<(StatusCode, Json<DocumentType>)> {
    let new = NewDocumentType::from_json(&body)?;
    let doc_type = driver.create_doc_type(new).await?;
    Ok((StatusCode::CREATED, Json(doc_type)))
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

    fn route() -> (http::Method, String) {
        (http::Method::POST, "/api/document-types".to_owned())
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_json(json!({"name": "Insurance", "description": "Third-party cover"}))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<DocumentType>()
            .await;
        assert_eq!("Insurance", response.name());
        assert_eq!(&Some("Third-party cover".to_owned()), response.description());

        let stored = db::get_doc_type(&mut context.ex().await, response.id()).await.unwrap();
        assert_eq!(stored, response);
    }

    #[tokio::test]
    async fn test_name_required() {
        for body in [json!({}), json!({"name": ""}), json!({"name": null})] {
            let context = TestContext::setup().await;
            OneShotBuilder::new(context.into_app(), route())
                .send_json(body)
                .await
                .expect_violations(&[("name", "Document type name is required")])
                .await;
        }
    }

    #[tokio::test]
    async fn test_duplicate() {
        let context = TestContext::setup().await;
        context.create_doc_type("Insurance").await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({"name": "Insurance"}))
            .await
            .expect_status(StatusCode::CONFLICT)
            .expect_error("Document type with this name already exists")
            .await;

        assert_eq!(1, db::count_doc_types(&mut context.ex().await).await.unwrap());
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route());
}
