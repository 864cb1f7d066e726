pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{BackendKind, GatewayConfig, get_configuration};
pub use error::{ApiError, ErrorBody};
pub use server::{router, run_server};
pub use state::{AppState, Classifier, ValidateBillResponse};
