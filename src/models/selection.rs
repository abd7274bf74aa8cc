use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bookable service picked from the catalog. Each kind carries the
/// quantities its price depends on.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServiceSelection {
    Room { service_id: String, nights: i64 },
    Tour { service_id: String },
    Guide { service_id: String, hours: i64 },
}

impl ServiceSelection {
    pub fn service_id(&self) -> &str {
        match self {
            ServiceSelection::Room { service_id, .. }
            | ServiceSelection::Tour { service_id }
            | ServiceSelection::Guide { service_id, .. } => service_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServiceSelection::Room { .. } => "room",
            ServiceSelection::Tour { .. } => "tour",
            ServiceSelection::Guide { .. } => "guide",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricedService {
    pub kind: &'static str,
    pub service_id: String,
    pub service_name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub total_cost: Decimal,
}
