pub mod account;
pub mod auth;
pub mod dto;
pub mod entries;
pub mod stats;

pub use account::AccountApi;
pub use auth::AuthApi;
pub use entries::EntriesApi;
pub use stats::StatsApi;
