pub mod bind;
pub mod manager;
pub mod models;
pub mod partial_update;

pub use manager::{connect, connect_lazy, health_check, run_migrations, DatabaseError};
pub use partial_update::{sql_for_partial_update, PartialUpdateError, SqlStatement};
