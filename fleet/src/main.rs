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


//! Entry point to the FleetDocs service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use fleetdocs_authn::driver::{UsersDriver, UsersOptions};
use fleetdocs_authn::rest::GateOptions;
use fleetdocs_core::clocks::{Clock, SystemClock};
use fleetdocs_core::db::Db;
use fleetdocs_core::env::get_required_var;
use fleetdocs_fleet::driver::FleetDriver;
use fleetdocs_fleet::rest::HealthState;
use fleetdocs_fleet::{ServerOptions, app, serve};
use log::{error, info};
use std::process;
use std::sync::Arc;

/// Prefix of all environment variables that configure the service.
const ENV_PREFIX: &str = "FLEETDOCS";

/// Opens the database pointed at by `<prefix>_DATABASE_URL`, picking the backend from its
/// scheme.
async fn connect_db(prefix: &str) -> Result<Arc<dyn Db + Send + Sync>, String> {
    let url = get_required_var::<String>(prefix, "DATABASE_URL")?;

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        #[cfg(feature = "postgres")]
        {
            use fleetdocs_core::db::postgres::{PostgresDb, PostgresOptions};

            let opts = PostgresOptions::from_env(&format!("{}_DATABASE", prefix))?;
            let db = PostgresDb::connect(opts).map_err(|e| e.to_string())?;
            info!("Using the PostgreSQL database backend");
            return Ok(Arc::new(db));
        }

        #[cfg(not(feature = "postgres"))]
        return Err("PostgreSQL support was not built in".to_owned());
    }

    if url.starts_with("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            let db = fleetdocs_core::db::sqlite::connect(&url).await.map_err(|e| e.to_string())?;
            info!("Using the SQLite database backend");
            return Ok(Arc::new(db));
        }

        #[cfg(not(feature = "sqlite"))]
        return Err("SQLite support was not built in".to_owned());
    }

    Err(format!("Unsupported database URL scheme in {}_DATABASE_URL", prefix))
}

/// Sets up all resources and serves the application until shutdown.
async fn run() -> Result<(), String> {
    let server_opts = ServerOptions::from_env(ENV_PREFIX)?;
    let users_opts = UsersOptions::from_env(ENV_PREFIX)?;
    let gate_opts = GateOptions::from_env(ENV_PREFIX)?;

    let db = connect_db(ENV_PREFIX).await?;
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock::default());

    let setup = async {
        let mut ex = db.ex().await?;
        fleetdocs_authn::db::init_schema(&mut ex).await?;
        fleetdocs_fleet::db::init_schema(&mut ex).await
    };
    if let Err(e) = setup.await {
        db.close().await;
        return Err(format!("Cannot initialize database schema: {}", e));
    }

    let users = UsersDriver::new(db.clone(), clock.clone(), users_opts);
    let fleet = FleetDriver::new(db.clone(), clock.clone());
    let health = HealthState::new(server_opts.environment, clock);
    let app = match app(&server_opts, &gate_opts, users, fleet, health) {
        Ok(app) => app,
        Err(e) => {
            db.close().await;
            return Err(e);
        }
    };

    serve(&server_opts, app, db).await
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Cannot load .env file: {}", e);
            process::exit(1);
        }
    }
    env_logger::init();

    if let Err(e) = run().await {
        error!("{}", e);
        process::exit(1);
    }
}
