use axum::{
    Router,
    extract::State,
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use log::{error, info};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::process::Command;
use tower_http::services::ServeDir;

use crate::config::DEFAULT_BIND;

#[derive(Debug, Error)]
pub enum UpdateCommandError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command {command} returned non-zero exit status ({status})")]
    Failed { command: String, status: ExitStatus },
}

/// The external process that refreshes the dashboard data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl UpdateCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        UpdateCommand {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run to completion with inherited stdio. There is no timeout.
    pub async fn run(&self) -> Result<(), UpdateCommandError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|source| UpdateCommandError::Spawn {
                command: self.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(UpdateCommandError::Failed {
                command: self.to_string(),
                status,
            })
        }
    }
}

impl fmt::Display for UpdateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub dashboard_dir: PathBuf,
    pub update: UpdateCommand,
}

impl ServerConfig {
    pub fn new(dashboard_dir: impl Into<PathBuf>, update: UpdateCommand) -> Self {
        ServerConfig {
            bind: DEFAULT_BIND,
            dashboard_dir: dashboard_dir.into(),
            update,
        }
    }
}

pub struct AppState {
    update: UpdateCommand,
}

/// Build the dashboard service: `POST /update` runs the update command and
/// every other request is answered from the dashboard directory.
pub fn router(config: &ServerConfig) -> Router {
    let app_state = Arc::new(AppState {
        update: config.update.clone(),
    });

    let static_files = ServeDir::new(&config.dashboard_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route(
            "/update",
            post(trigger_update).fallback_service(static_files.clone()),
        )
        .fallback_service(static_files)
        .with_state(app_state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(&config);

    let listener = TcpListener::bind(config.bind).await?;
    let addr = listener.local_addr()?;
    println!("Serving dashboard at http://{addr}");
    info!(
        "serving {} with update command `{}`",
        config.dashboard_dir.display(),
        config.update
    );
    axum::serve(listener, app).await?;

    Ok(())
}

async fn trigger_update(State(state): State<Arc<AppState>>) -> Response {
    info!("running update command `{}`", state.update);

    match state.update.run().await {
        Ok(()) => {
            info!("dashboard update finished");
            (StatusCode::OK, "OK").into_response()
        }
        Err(e) => {
            error!("dashboard update failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
