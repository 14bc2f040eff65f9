mod explore;
mod guest;
mod health;
mod metrics;
mod packing;

pub use explore::explore_handler;
pub use guest::{Access, authorize, client_identifier, is_guest_request};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use packing::packing_handler;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::json_repair;
use crate::metrics::JSON_SALVAGE;

// Salvage model text into JSON, counting which repair stage it took
fn parse_model_output(text: &str) -> Result<Value> {
    let salvaged = json_repair::salvage(text);
    JSON_SALVAGE.with_label_values(&[salvaged.outcome()]).inc();
    salvaged.into_value().ok_or(AppError::InvalidModelOutput)
}
