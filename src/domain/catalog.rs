use serde::{Deserialize, Serialize};

/// Read-only snapshot of a purchasable product, owned by the main
/// application's catalog store. Fetched fresh per resolution request;
/// staleness is acceptable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub retail_cost: i64,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEntry {
    pub id: i64,
    pub name: String,
}
