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


//! API to delete a document.

use crate::driver::FleetDriver;
use crate::model::DocumentId;
use axum::extract::{Path, State};
use fleetdocs_core::rest::RestResult;
use http::StatusCode;

/// DELETE handler for this API.
pub(crate) async fn handler(
    State(driver): State<FleetDriver>,
    Path(id): Path<String>,
) -> RestResult<StatusCode> {
    let id = DocumentId::parse("id", id)?;
    driver.delete_document(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::rest::testutils::*;
    use axum::http;
    use fleetdocs_core::rest::testutils::OneShotBuilder;

    fn route(id: &str) -> (http::Method, String) {
        (http::Method::DELETE, format!("/api/documents/{}", id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let bus = context.create_bus("KA-01").await;
        let doc_type = context.create_doc_type("Permit").await;
        let document = context.create_document(bus.id(), &doc_type, None).await;
        let other = context.create_document(bus.id(), &doc_type, None).await;

        OneShotBuilder::new(context.app(), route(document.id().as_str()))
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        let mut ex = context.ex().await;
        assert_eq!(1, db::count_documents(&mut ex).await.unwrap());
        db::get_document(&mut ex, other.id()).await.unwrap();
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route("missing"))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_error("Document not found")
            .await;
    }
}
