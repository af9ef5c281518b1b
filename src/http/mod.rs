//! HTTP surface: form-facing routes, server-rendered views, and the
//! operational endpoints.

pub mod routes;
pub mod views;

pub use routes::{web_router, AppState, WebState};
pub use views::Views;
