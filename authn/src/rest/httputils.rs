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

//! Utilities to deal with HTTP authorization.

use base64::Engine;
use base64::engine::general_purpose;
use fleetdocs_core::rest::{RestError, RestResult, get_unique_header};
use http::header::HeaderMap;

/// Builds an authentication error that challenges the client with `challenge`.
fn unauthorized<M: Into<String>>(challenge: &str, message: M) -> RestError {
    RestError::Unauthorized { challenge: Some(challenge.to_owned()), message: message.into() }
}

/// Assumes that the `headers` contain basic authentication credentials and extracts them as a
/// raw username and password pair.
///
/// The credentials are not validated in any way: callers compare them against known values.
/// Every failure carries `challenge` so that clients know how to authenticate.
pub fn get_basic_auth(headers: &HeaderMap, challenge: &str) -> RestResult<(String, String)> {
    let authz = match get_unique_header(headers, "Authorization") {
        Ok(Some(value)) => value,
        Ok(None) => return Err(unauthorized(challenge, "Authorization header is required")),
        Err(e) => return Err(unauthorized(challenge, e.to_string())),
    };

    let authz = match authz.to_str() {
        Ok(value) => value,
        Err(_) => return Err(unauthorized(challenge, "Invalid credentials")),
    };

    let base64_payload = match authz.strip_prefix("Basic ") {
        Some(payload) => payload.trim(),
        None => return Err(unauthorized(challenge, "Basic authentication is required")),
    };

    let payload = match general_purpose::STANDARD.decode(base64_payload) {
        Ok(bytes) => bytes,
        Err(_) => return Err(unauthorized(challenge, "Invalid credentials")),
    };

    // Both the username and the password have to be strings, so it is easier to convert the
    // payload first in one go instead of doing two conversion after splitting the bytes.
    let payload = match String::from_utf8(payload) {
        Ok(s) => s,
        Err(_) => return Err(unauthorized(challenge, "Invalid credentials")),
    };

    match payload.split_once(':') {
        Some((username, password)) => Ok((username.to_owned(), password.to_owned())),
        None => Err(unauthorized(challenge, "Invalid credentials")),
    }
}
