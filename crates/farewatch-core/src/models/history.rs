use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One entry of `GET /users/me/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistory {
    pub id: i64,
    pub user_id: i64,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub search_date: NaiveDateTime,
    pub results_count: u32,
}
