//! Incident Desk: a small incident-reporting web service.
//!
//! Users register, log in, submit incident reports, and browse them on a
//! dashboard; each accepted report triggers a best-effort email
//! notification.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod incidents;
pub mod notify;
pub mod store;
pub mod telemetry;

mod cli;
mod server;

use error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
