pub mod manager;
pub mod models;
pub mod repository;
pub mod seed;

pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{CommunityStore, PgCommunityStore};
pub use seed::{seed_default_community, SeedOutcome};
