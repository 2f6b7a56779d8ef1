mod generate;
mod health;
mod info;
mod metrics;
mod services;
mod users;

pub use generate::generate_handler;
pub use health::{health_handler, root_handler};
pub use info::public_info_handler;
pub use metrics::metrics_handler;
pub use services::service_call_handler;
pub use users::users_handler;
