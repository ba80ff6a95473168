use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const INITIAL_RATING: f64 = 5.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PartnerStats {
    pub total_deliveries: u32,
    pub completed_deliveries: u32,
    pub on_time_deliveries: u32,
    pub average_delivery_minutes: f64,
}

impl PartnerStats {
    pub fn on_time_ratio(&self) -> f64 {
        if self.total_deliveries == 0 {
            return 0.0;
        }
        f64::from(self.on_time_deliveries) / f64::from(self.total_deliveries)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartner {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub available: bool,
    pub current_order: Option<Uuid>,
    pub active: bool,
    pub stats: PartnerStats,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Partner {
    pub fn register(params: NewPartner) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: params.name,
            phone: params.phone,
            available: true,
            current_order: None,
            active: true,
            stats: PartnerStats::default(),
            rating: INITIAL_RATING,
            created_at: now,
            updated_at: now,
        }
    }
}
