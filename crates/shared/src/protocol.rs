use serde::{Deserialize, Serialize};

use crate::domain::ProductId;

/// Query string for `GET /{collection}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}
