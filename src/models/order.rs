use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Fulfilment state of an order (pedido).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum OrderStatus {
    /// Fully delivered
    Surtido,
    /// Partially delivered
    Parcial,
    /// Nothing delivered yet
    Pendiente,
    Cancelado,
}

impl OrderStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Parcial | Self::Pendiente)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub date: NaiveDate,
    pub client_id: u32,
    pub seller_id: u32,
    pub product_id: u32,
    pub qty_ordered: u32,
    pub qty_pending: u32,
    pub status: OrderStatus,
    pub channel: String,
    pub order_type: String,
}

impl Order {
    pub fn is_open(&self) -> bool {
        self.qty_pending > 0
    }

    /// Whole days elapsed between the order date and `as_of` (never negative).
    pub fn age_days(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.date).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn order(status: OrderStatus, pending: u32) -> Order {
        Order {
            order_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            client_id: 1,
            seller_id: 1,
            product_id: 1,
            qty_ordered: 10,
            qty_pending: pending,
            status,
            channel: "Web".into(),
            order_type: "Pedido".into(),
        }
    }

    #[test]
    fn open_statuses_match_pending_quantity() {
        assert!(OrderStatus::Parcial.is_open());
        assert!(OrderStatus::Pendiente.is_open());
        assert!(!OrderStatus::Surtido.is_open());
        assert!(order(OrderStatus::Parcial, 3).is_open());
        assert!(!order(OrderStatus::Surtido, 0).is_open());
    }

    #[test]
    fn age_is_clamped_at_zero() {
        let o = order(OrderStatus::Pendiente, 10);
        assert_eq!(o.age_days(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()), 10);
        assert_eq!(o.age_days(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()), 0);
    }

    #[test]
    fn status_labels_round_trip() {
        assert_eq!(OrderStatus::from_str("Parcial").unwrap(), OrderStatus::Parcial);
        assert_eq!(OrderStatus::Cancelado.as_ref(), "Cancelado");
    }
}
