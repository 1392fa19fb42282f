pub mod api;
pub mod health;
pub mod listing;
pub mod storage;

pub use api::{ApiClient, ApiError, PullZone, PullZoneDetails};
pub use health::HealthChecker;
pub use listing::{ObjectListing, parse_bunny_time};
pub use storage::BunnyStorage;
