//! Cart value object

use serde::{Deserialize, Serialize};

/// Proposed cart handed to the engine by the checkout flow.
///
/// The engine never mutates a cart; it only reads it to decide
/// applicability and compute grant amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub customer_id: i64,
    pub total: f64,
    pub product_ids: Vec<i64>,
    pub collection_ids: Vec<i64>,
}

impl Cart {
    pub fn new(customer_id: i64, total: f64) -> Self {
        Self {
            customer_id,
            total,
            product_ids: Vec::new(),
            collection_ids: Vec::new(),
        }
    }

    pub fn with_products(mut self, product_ids: Vec<i64>) -> Self {
        self.product_ids = product_ids;
        self
    }

    pub fn with_collections(mut self, collection_ids: Vec<i64>) -> Self {
        self.collection_ids = collection_ids;
        self
    }
}
