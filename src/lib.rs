//! Video gateway: a single-endpoint handler for a video-sharing feed backed by PostgreSQL.

pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod model;
pub mod operation;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Settings;
pub use error::{AppError, ConfigError};
pub use event::{GatewayEvent, GatewayResponse};
pub use handler::handle;
pub use operation::{Operation, OperationKind, Rejection, DEFAULT_USER_ID};
pub use routes::{common_routes, gateway_routes};
pub use state::AppState;
pub use store::{Database, LikeOutcome, PgDatabase, Session};
