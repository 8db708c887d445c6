//! Local cart mirror.
//!
//! [`CartService`] is the only writer of the cart cache. Every change is
//! published on a broadcast channel so views showing the item count can
//! subscribe instead of re-reading the cache on a timer.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{CartLine, Product, ProductId},
    error::ValidationError,
    protocol::CartAddRequest,
};
use storage::Storage;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{api::ApiClient, error::ApiFailure};

pub const CART_KEY: &str = "cart";

#[async_trait]
pub trait CartCache: Send + Sync {
    async fn load(&self) -> Result<Vec<CartLine>>;
    async fn store(&self, lines: &[CartLine]) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryCartCache {
    lines: Mutex<Vec<CartLine>>,
}

#[async_trait]
impl CartCache for MemoryCartCache {
    async fn load(&self) -> Result<Vec<CartLine>> {
        Ok(self.lines.lock().await.clone())
    }

    async fn store(&self, lines: &[CartLine]) -> Result<()> {
        *self.lines.lock().await = lines.to_vec();
        Ok(())
    }
}

/// Cart kept as a JSON array under one key of the local store.
pub struct StoredCartCache {
    storage: Storage,
    key: String,
}

impl StoredCartCache {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            key: CART_KEY.to_string(),
        }
    }
}

#[async_trait]
impl CartCache for StoredCartCache {
    async fn load(&self) -> Result<Vec<CartLine>> {
        match self.storage.get_json::<Vec<CartLine>>(&self.key).await {
            Ok(lines) => Ok(lines.unwrap_or_default()),
            Err(error) => {
                warn!(key = %self.key, %error, "stored cart is unreadable; starting empty");
                Ok(Vec::new())
            }
        }
    }

    async fn store(&self, lines: &[CartLine]) -> Result<()> {
        self.storage.put_json(&self.key, lines).await
    }
}

#[async_trait]
pub trait CartApi: Send + Sync {
    async fn add(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiFailure>;
}

pub struct HttpCartApi {
    client: ApiClient,
}

impl HttpCartApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CartApi for HttpCartApi {
    async fn add(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiFailure> {
        let url = self.client.endpoint(&["cart"])?;
        let request = self.client.post(url).json(&CartAddRequest {
            product_id,
            quantity,
        });
        self.client.send(request).await.map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    Changed { item_count: u32 },
}

/// Adds `quantity` of `product` to `lines`, bumping an existing line if present.
pub fn merge_line(lines: &mut Vec<CartLine>, product_id: ProductId, product: &Product, quantity: u32) {
    match lines.iter_mut().find(|line| line.product_id == product_id) {
        Some(line) => line.quantity = line.quantity.saturating_add(quantity),
        None => lines.push(CartLine {
            product_id,
            title: product.title.clone(),
            price: product.price,
            quantity,
        }),
    }
}

pub fn item_count(lines: &[CartLine]) -> u32 {
    lines
        .iter()
        .fold(0u32, |total, line| total.saturating_add(line.quantity))
}

pub struct CartService {
    api: Arc<dyn CartApi>,
    cache: Arc<dyn CartCache>,
    events: broadcast::Sender<CartEvent>,
    write_lock: Mutex<()>,
}

impl CartService {
    pub fn new(api: Arc<dyn CartApi>, cache: Arc<dyn CartCache>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            api,
            cache,
            events,
            write_lock: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    pub async fn lines(&self) -> Result<Vec<CartLine>> {
        self.cache.load().await
    }

    pub async fn item_count(&self) -> Result<u32> {
        Ok(item_count(&self.cache.load().await?))
    }

    /// Adds to the remote cart and mirrors the change locally. The local mirror is
    /// updated even when the remote call fails. Returns the new item count.
    pub async fn add_to_cart(&self, product: &Product, quantity: u32) -> Result<u32> {
        let product_id = product
            .id
            .filter(|id| id.0 != 0)
            .map(|id| ProductId(id.0))
            .ok_or(ValidationError::MissingId {
                resource: "product",
            })?;
        if quantity == 0 {
            return Err(anyhow!(ValidationError::InvalidField {
                field: "quantity",
                reason: "must be at least 1".into(),
            }));
        }

        if let Err(failure) = self.api.add(product_id, quantity).await {
            warn!(
                product_id = product_id.0,
                error = %failure,
                "remote cart update failed; keeping local cart change"
            );
        }

        self.mutate(|lines| {
            merge_line(lines, product_id, product, quantity);
            true
        })
        .await
    }

    /// Sets the quantity of an existing line; zero removes it. Unknown products
    /// leave the cart untouched and publish nothing.
    pub async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<u32> {
        self.mutate(|lines| {
            let Some(index) = lines.iter().position(|line| line.product_id == product_id) else {
                return false;
            };
            if quantity == 0 {
                lines.remove(index);
                true
            } else {
                let line = &mut lines[index];
                let changed = line.quantity != quantity;
                line.quantity = quantity;
                changed
            }
        })
        .await
    }

    pub async fn clear(&self) -> Result<u32> {
        self.mutate(|lines| {
            let had_lines = !lines.is_empty();
            lines.clear();
            had_lines
        })
        .await
    }

    /// Applies `change` under the write lock. Stores and publishes only when it
    /// reports a change.
    async fn mutate(&self, change: impl FnOnce(&mut Vec<CartLine>) -> bool) -> Result<u32> {
        let _guard = self.write_lock.lock().await;
        let mut lines = self.cache.load().await?;
        if !change(&mut lines) {
            return Ok(item_count(&lines));
        }
        self.cache.store(&lines).await?;

        let count = item_count(&lines);
        info!(lines = lines.len(), item_count = count, "cart updated");
        let _ = self.events.send(CartEvent::Changed { item_count: count });
        Ok(count)
    }
}

#[cfg(test)]
#[path = "tests/cart_tests.rs"]
mod tests;
