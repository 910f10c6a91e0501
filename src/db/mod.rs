//! Database module: connection handling, view models and the repository.
//!
//! - `connection`: pool construction, migrations and sessions.
//! - `model`: view models returned by join and aggregate queries.
//! - `repo`: SQL-only methods that map rows into entities.
//!
//! External modules should import from `shopbot_store::db`.

pub mod connection;
pub mod model;
pub mod repo;

pub use connection::{Database, Pool, Session};
pub use model::{InvitedUser, OrdersPerUser, ProductsPerUser, UserOrderLine};
pub use repo::Repo;
