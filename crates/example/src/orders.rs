use serde::Serialize;
use tsgen_codegen::{TypeScript, typescript};

use crate::shapes::Point;

/// Stock keeping unit, sent as text.
#[typescript(type = "string")]
pub type Sku = [u8; 12];

pub type Millis = u64;

#[derive(TypeScript, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Shipped,
    #[serde(skip)]
    Internal,
}

#[derive(TypeScript, Serialize, Debug, Clone, PartialEq)]
pub struct LineItem {
    pub sku: Sku,
    pub quantity: u32,
    pub unit_price: f64,
}

/// A customer order.
#[derive(TypeScript, Serialize, Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u64,
    pub status: Status,
    pub items: Vec<LineItem>,
    pub ship_to: Option<Point>,
    #[ts(optional)]
    pub note: Option<String>,
    #[ts(skip)]
    pub audit_log: Vec<String>,
    pub placed_at: Millis,
}

impl Order {
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.unit_price * f64::from(item.quantity))
            .sum()
    }
}
