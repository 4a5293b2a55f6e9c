/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Landivo property identifier (opaque string owned by the listing service).
pub type PropertyId = String;

/// Landivo buyer identifier.
pub type BuyerId = String;
