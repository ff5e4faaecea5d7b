//! User accounts: registration, lookup, and deletion.

mod routes;
pub mod service;

pub use routes::user_routes;
pub use service::UserService;
