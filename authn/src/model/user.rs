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

//! The `User` data type and the validators for user-related requests.

use crate::model::{HashedPassword, Password};
use fleetdocs_core::model::validation::{Fields, Patch, Violations};
use fleetdocs_core::model::{EmailAddress, Username};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Numeric identifier of a user, assigned by the database.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a user identifier from its raw database value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Parses a user identifier from a path parameter, which must be made only of digits.
    pub fn parse(raw: &str) -> Result<Self, Violations> {
        match raw.parse::<i64>() {
            Ok(id) if raw.bytes().all(|b| b.is_ascii_digit()) => Ok(Self(id)),
            _ => Err(Violations::single("id", "ID must be a number")),
        }
    }

    /// Returns the raw value of the identifier.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

/// Representation of an active user's information.
///
/// Users that have been deleted are never materialized into this type.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// Identifier of the user.
    id: UserId,

    /// Name of the user.
    username: Username,

    /// Email of the user, if known.
    email: Option<EmailAddress>,

    /// Hashed password.
    password: HashedPassword,

    /// Time when the user was created.
    created_at: OffsetDateTime,

    /// Time when the user was last modified.
    updated_at: OffsetDateTime,
}

impl User {
    /// Creates a new user with the given fields.
    pub(crate) fn new(
        id: UserId,
        username: Username,
        email: Option<EmailAddress>,
        password: HashedPassword,
        created_at: OffsetDateTime,
        updated_at: OffsetDateTime,
    ) -> Self {
        Self { id, username, email, password, created_at, updated_at }
    }

    /// Gets the user's identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Gets the user's username.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Gets the user's email address.
    pub fn email(&self) -> Option<&EmailAddress> {
        self.email.as_ref()
    }

    /// Gets the user's password as a hash.
    pub fn password(&self) -> &HashedPassword {
        &self.password
    }

    /// Gets the user's creation time.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Gets the user's last modification time.
    pub fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }

    /// Modifies a user to change its username.
    pub(crate) fn with_username(mut self, username: Username) -> Self {
        self.username = username;
        self
    }

    /// Modifies a user to set or clear its email.
    pub(crate) fn with_email(mut self, email: Option<EmailAddress>) -> Self {
        self.email = email;
        self
    }

    /// Modifies a user to change its password.
    pub(crate) fn with_password(mut self, password: HashedPassword) -> Self {
        self.password = password;
        self
    }

    /// Modifies a user to record its last modification time.
    pub(crate) fn with_updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = updated_at;
        self
    }
}

/// Validated details for a user registration.
#[derive(Debug, PartialEq)]
pub struct NewUser {
    /// Name of the new user.
    pub username: Username,

    /// Password in plain text.  Hashed by the driver before it reaches the database.
    pub password: Password,

    /// Optional email address of the new user.
    pub email: Option<EmailAddress>,
}

impl NewUser {
    /// Validates a raw registration payload.
    pub fn from_json(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let username = fields.parsed_all("username", Username::validate_all);
        let username = fields.required("username", username, "Username is required");
        let password = fields.parsed("password", |s| Password::new(s).validate());
        let password = fields.required("password", password, "Password is required");
        let email = fields.parsed_all("email", EmailAddress::validate_all);
        fields.finish(|| {
            Some(Self { username: username?, password: password?, email: email.into_option() })
        })
    }
}

/// Validated details for a partial update of a user.
#[derive(Debug, Default, PartialEq)]
pub struct UserUpdate {
    /// New name for the user, if it should change.
    pub username: Option<Username>,

    /// New password in plain text, if it should change.
    pub password: Option<Password>,

    /// Change to apply to the email address.
    pub email: Patch<EmailAddress>,
}

impl UserUpdate {
    /// Validates a raw update payload.  Absent fields are left untouched.
    pub fn from_json(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let username = fields.parsed_all("username", Username::validate_all);
        let username = fields.not_null("username", username);
        let password = fields.parsed("password", |s| Password::new(s).validate());
        let password = fields.not_null("password", password);
        let email = fields.parsed_all("email", EmailAddress::validate_all);
        fields.finish(|| Some(Self { username, password, email }))
    }
}

/// Credentials for a login attempt.
///
/// These are not subject to the account policies: a malformed username or a short password
/// simply do not match any account.
#[derive(Debug, PartialEq)]
pub struct Login {
    /// Name of the user trying to log in.
    pub username: String,

    /// Password provided by the user.
    pub password: Password,
}

impl Login {
    /// Validates a raw login payload.
    pub fn from_json(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let username = fields.non_empty("username", "Username is required");
        let username = fields.required("username", username, "Username is required");
        let password = fields.non_empty("password", "Password is required");
        let password = fields.required("password", password, "Password is required");
        fields.finish(|| Some(Self { username: username?, password: Password::new(password?) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdocs_core::model::validation::FieldViolation;
    use serde_json::json;

    /// Flattens `violations` into pairs of field names and messages for easier comparisons.
    fn pairs(violations: Violations) -> Vec<(String, String)> {
        violations
            .into_inner()
            .into_iter()
            .map(|FieldViolation { field, message }| (field, message))
            .collect()
    }

    #[test]
    fn test_user_id_parse() {
        assert_eq!(UserId::new(42), UserId::parse("42").unwrap());
        for raw in ["", "abc", "-1", "+1", "1.5", "99999999999999999999"] {
            assert_eq!(
                Violations::single("id", "ID must be a number"),
                UserId::parse(raw).unwrap_err(),
                "Id {} should have been rejected",
                raw
            );
        }
    }

    #[test]
    fn test_new_user_ok() {
        let user = NewUser::from_json(&json!({
            "username": "driver_01",
            "password": "secret1",
            "email": "driver@example.com",
        }))
        .unwrap();
        assert_eq!(
            NewUser {
                username: Username::from("driver_01"),
                password: Password::from("secret1"),
                email: Some(EmailAddress::from("driver@example.com")),
            },
            user
        );

        let user =
            NewUser::from_json(&json!({"username": "driver_01", "password": "secret1"})).unwrap();
        assert!(user.email.is_none());
    }

    #[test]
    fn test_new_user_reports_every_violation() {
        let err = NewUser::from_json(&json!({
            "username": "a b",
            "password": "123",
            "email": "not-an-email",
        }))
        .unwrap_err();
        assert_eq!(
            vec![
                (
                    "username".to_owned(),
                    "Username can only contain letters, numbers, and underscores".to_owned()
                ),
                ("password".to_owned(), "Password must be at least 6 characters".to_owned()),
                ("email".to_owned(), "Invalid email".to_owned()),
            ],
            pairs(err)
        );
    }

    #[test]
    fn test_new_user_reports_every_broken_rule_of_a_field() {
        let err = NewUser::from_json(&json!({"username": "a!", "password": "secret1"}))
            .unwrap_err();
        assert_eq!(
            vec![
                ("username".to_owned(), "Username must be at least 3 characters".to_owned()),
                (
                    "username".to_owned(),
                    "Username can only contain letters, numbers, and underscores".to_owned()
                ),
            ],
            pairs(err)
        );
    }

    #[test]
    fn test_new_user_missing_fields() {
        let err = NewUser::from_json(&json!({})).unwrap_err();
        assert_eq!(
            vec![
                ("username".to_owned(), "Username is required".to_owned()),
                ("password".to_owned(), "Password is required".to_owned()),
            ],
            pairs(err)
        );
    }

    #[test]
    fn test_user_update_partial() {
        let update = UserUpdate::from_json(&json!({})).unwrap();
        assert_eq!(UserUpdate::default(), update);

        let update = UserUpdate::from_json(&json!({"email": null})).unwrap();
        assert_eq!(UserUpdate { email: Patch::Clear, ..Default::default() }, update);

        let update =
            UserUpdate::from_json(&json!({"username": "renamed", "password": "longer1"})).unwrap();
        assert_eq!(Some(Username::from("renamed")), update.username);
        assert_eq!(Some(Password::from("longer1")), update.password);
        assert!(update.email.is_keep());
    }

    #[test]
    fn test_user_update_rejects_null_username() {
        let err = UserUpdate::from_json(&json!({"username": null})).unwrap_err();
        assert_eq!(vec![("username".to_owned(), "Field cannot be null".to_owned())], pairs(err));
    }

    #[test]
    fn test_login_ok() {
        let login = Login::from_json(&json!({"username": "x", "password": "y"})).unwrap();
        assert_eq!("x", login.username);
        assert_eq!(Password::new("y"), login.password);
    }

    #[test]
    fn test_login_missing() {
        let err = Login::from_json(&json!({"username": "", "password": 5})).unwrap_err();
        assert_eq!(
            vec![
                ("username".to_owned(), "Username is required".to_owned()),
                ("password".to_owned(), "Expected string, received number".to_owned()),
            ],
            pairs(err)
        );
    }
}
