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

//! API to register a new user.

use crate::driver::UsersDriver;
use crate::model::{NewUser, UserId};
use axum::Json;
use axum::extract::State;
use fleetdocs_core::model::{EmailAddress, Username};
use fleetdocs_core::rest::{JsonBody, RestResult};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Projection of the newly-created user.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatedUser {
    /// Identifier of the user.
    pub(crate) id: UserId,
    /// Name of the user.
    pub(crate) username: Username,
    /// Email of the user, if known.
    pub(crate) email: Option<EmailAddress>,
    /// Time when the user was created.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

/// Message returned by the server after creating a user.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct CreateUserResponse {
    /// Human-readable outcome of the operation.
    pub(crate) message: String,
    /// The affected user.
    pub(crate) user: CreatedUser,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    JsonBody(body): JsonBody,
) -> RestResult<(StatusCode, Json<CreateUserResponse>)> {
    let new = NewUser::from_json(&body)?;
    let user = driver.create_user(new).await?;

    let response = CreateUserResponse {
        message: "User created successfully".to_owned(),
        user: CreatedUser {
            id: user.id(),
            username: user.username().clone(),
            email: user.email().cloned(),
            created_at: user.created_at(),
        },
    };
    Ok((StatusCode::CREATED, Json(response)))
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
        (http::Method::POST, "/api/users".to_owned())
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "username": "driver_01",
                "password": "secret1",
                "email": "d1@example.com",
            }))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<CreateUserResponse>()
            .await;
        assert_eq!("User created successfully", response.message);
        assert_eq!(Username::from("driver_01"), response.user.username);
        assert_eq!(Some(EmailAddress::from("d1@example.com")), response.user.email);

        let user = db::get_user(&mut context.ex().await, response.user.id).await.unwrap();
        assert_eq!(user.created_at(), response.user.created_at);
    }

    #[tokio::test]
    async fn test_reports_every_violation() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({"username": "ab", "password": "123", "email": "nope"}))
            .await
            .expect_violations(&[
                ("username", "Username must be at least 3 characters"),
                ("password", "Password must be at least 6 characters"),
                ("email", "Invalid email"),
            ])
            .await;

        assert_eq!(0, db::count_active_users(&mut context.ex().await).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route())
            .send_json(json!({}))
            .await
            .expect_violations(&[
                ("username", "Username is required"),
                ("password", "Password is required"),
            ])
            .await;
    }

    #[tokio::test]
    async fn test_duplicate() {
        let context = TestContext::setup().await;
        context.create_user("driver_01", "secret1").await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({"username": "driver_01", "password": "secret1"}))
            .await
            .expect_status(StatusCode::CONFLICT)
            .expect_error("Username or email already exists")
            .await;
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route());
}
