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

//! REST interface for the fleet.

use crate::driver::FleetDriver;
use axum::Router;

mod bus_delete;
mod bus_documents_get;
mod bus_documents_post;
mod bus_get;
mod bus_put;
mod buses_get;
mod buses_missing_required_get;
mod buses_post;
mod dashboard_stats_get;
mod doctype_delete;
mod doctype_put;
mod doctypes_get;
mod doctypes_post;
mod document_delete;
mod document_get;
mod document_put;
mod documents_expiring_get;
mod health_get;
#[cfg(test)]
mod testutils;

pub use health_get::{HealthState, health_app};

/// Creates the router for the bus, document type and document endpoints.
///
/// The reports under `/api/buses/missing-required` and `/api/documents/expiring` are static
/// paths, so they take precedence over the `:id` captures of their siblings.
pub fn app(driver: FleetDriver) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/api/buses", get(buses_get::handler).post(buses_post::handler))
        .route("/api/buses/missing-required", get(buses_missing_required_get::handler))
        .route(
            "/api/buses/:id",
            get(bus_get::handler).put(bus_put::handler).delete(bus_delete::handler),
        )
        .route(
            "/api/buses/:id/documents",
            get(bus_documents_get::handler).post(bus_documents_post::handler),
        )
        .route("/api/documents/expiring", get(documents_expiring_get::handler))
        .route(
            "/api/documents/:id",
            get(document_get::handler).put(document_put::handler).delete(document_delete::handler),
        )
        .route("/api/document-types", get(doctypes_get::handler).post(doctypes_post::handler))
        .route(
            "/api/document-types/:id",
            axum::routing::put(doctype_put::handler).delete(doctype_delete::handler),
        )
        .with_state(driver)
}

/// Creates the router for the dashboard endpoints.
pub fn dashboard_app(driver: FleetDriver) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/api/dashboard/stats", get(dashboard_stats_get::handler))
        .with_state(driver)
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use fleetdocs_core::rest::testutils::OneShotBuilder;
    use http::{Method, StatusCode};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_e2e_bus_lifecycle() {
        let context = TestContext::setup().await;

        let doc_type = OneShotBuilder::new(context.app(), (Method::POST, "/api/document-types"))
            .send_json(json!({"name": "Insurance"}))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<Value>()
            .await;
        let doc_type_id = doc_type["id"].as_str().unwrap().to_owned();

        let bus = OneShotBuilder::new(context.app(), (Method::POST, "/api/buses"))
            .send_json(json!({"registrationNo": "KA-01-1234", "yearOfMake": 2020}))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<Value>()
            .await;
        let bus_id = bus["id"].as_str().unwrap().to_owned();

        let document = OneShotBuilder::new(
            context.app(),
            (Method::POST, format!("/api/buses/{}/documents", bus_id)),
        )
        .send_json(json!({
            "docTypeId": doc_type_id,
            "fileUrl": "https://files.example.com/ins.pdf",
            "expiryDate": "2024-01-20T00:00:00Z",
        }))
        .await
        .expect_status(StatusCode::CREATED)
        .expect_json::<Value>()
        .await;
        let document_id = document["id"].as_str().unwrap().to_owned();

        let expiring = OneShotBuilder::new(context.app(), (Method::GET, "/api/documents/expiring"))
            .send_empty()
            .await
            .expect_json::<Value>()
            .await;
        assert_eq!(json!(document_id), expiring[0]["id"]);

        OneShotBuilder::new(context.app(), (Method::DELETE, format!("/api/buses/{}", bus_id)))
            .send_empty()
            .await
            .expect_status(StatusCode::CONFLICT)
            .expect_error("Cannot delete bus with existing documents")
            .await;

        OneShotBuilder::new(
            context.app(),
            (Method::DELETE, format!("/api/documents/{}", document_id)),
        )
        .send_empty()
        .await
        .expect_status(StatusCode::NO_CONTENT)
        .expect_empty()
        .await;

        OneShotBuilder::new(context.app(), (Method::DELETE, format!("/api/buses/{}", bus_id)))
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), (Method::GET, format!("/api/buses/{}", bus_id)))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_error("Bus not found")
            .await;

        OneShotBuilder::new(
            context.app(),
            (Method::DELETE, format!("/api/document-types/{}", doc_type_id)),
        )
        .send_empty()
        .await
        .expect_status(StatusCode::NO_CONTENT)
        .expect_empty()
        .await;
    }
}
