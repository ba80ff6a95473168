use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_PREP_MINUTES: u32 = 5;
pub const MAX_PREP_MINUTES: u32 = 120;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Prep,
    Picked,
    OnRoute,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Prep,
        OrderStatus::Picked,
        OrderStatus::OnRoute,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Prep => "PREP",
            OrderStatus::Picked => "PICKED",
            OrderStatus::OnRoute => "ON_ROUTE",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PREP" => Ok(OrderStatus::Prep),
            "PICKED" => Ok(OrderStatus::Picked),
            "ON_ROUTE" => Ok(OrderStatus::OnRoute),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(format!(
                "unknown status: {other}, expected PREP/PICKED/ON_ROUTE/DELIVERED/CANCELLED"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// One accepted status change. History is append-only and ordered by acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
    pub actor: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Everything a manager supplies when creating an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub customer: Customer,
    pub prep_minutes: u32,
    pub eta_minutes: u32,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub code: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub customer: Customer,
    pub prep_minutes: u32,
    pub eta_minutes: u32,
    pub dispatch_at: DateTime<Utc>,
    pub priority: Priority,
    pub status: OrderStatus,
    pub assigned_partner: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub history: Vec<StatusChange>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True while the order still holds its partner.
    pub fn holds_partner(&self, partner_id: Uuid) -> bool {
        !self.is_terminal() && self.assigned_partner == Some(partner_id)
    }
}

pub fn order_total(items: &[OrderItem]) -> f64 {
    items.iter().map(OrderItem::subtotal).sum()
}
