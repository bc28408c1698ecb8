//! Durable shopping cart.
//!
//! [`CartStore`] keeps the cart lines in memory and mirrors every mutation
//! into the `shopping-cart` storage key before returning, so a restarted
//! host hydrates exactly what the buyer last saw. A corrupt stored payload
//! is discarded with a logged warning and an empty cart.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use diplostore_core::{ProductId, parse_amount};

use crate::catalog::Product;
use crate::storage::{StorageBackend, StorageError, keys};

/// How long hosts should keep a cart notice on screen before auto-dismiss.
pub const NOTICE_DISMISS_AFTER: Duration = Duration::from_secs(3);

/// One cart line.
///
/// The serde field names are the persisted contract; carts written by
/// earlier releases must keep hydrating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    /// Display price copied from the product's effective price at add time.
    pub price: String,
    pub image: String,
    pub category: String,
    pub quantity: u32,
}

/// Cart change notification, delivered synchronously to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A product entered the cart as a new line.
    ItemAdded { name: String },
    /// An existing line's quantity changed.
    QuantityChanged { name: String, quantity: u32 },
}

type Listener = Box<dyn Fn(&CartEvent) + Send + Sync>;

// =============================================================================
// CartStore
// =============================================================================

/// The shopping cart, persisted on every mutation.
///
/// Cheap to clone; every clone shares the same lines, listeners, and
/// storage handle.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    storage: Arc<dyn StorageBackend>,
    items: Mutex<Vec<CartItem>>,
    listeners: Mutex<Vec<Listener>>,
}

impl CartStore {
    /// Open the cart over a storage backend, hydrating from the
    /// `shopping-cart` key. Unreadable or corrupt payloads yield an empty
    /// cart, never an error.
    #[must_use]
    pub fn open(storage: Arc<dyn StorageBackend>) -> Self {
        let items = match storage.get(keys::SHOPPING_CART) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(err) => {
                    warn!(error = %err, "discarding corrupt cart payload");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "cart storage unreadable, starting empty");
                Vec::new()
            }
        };

        Self {
            inner: Arc::new(CartStoreInner {
                storage,
                items: Mutex::new(items),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product`. An existing line gains quantity; a new
    /// line starts at quantity 1 with the product's effective price.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted. The in-memory
    /// line keeps the change; the next successful mutation rewrites the
    /// whole list.
    pub fn add(&self, product: &Product) -> Result<(), StorageError> {
        let event = {
            let mut items = self.lock_items();
            let event = match items.iter_mut().find(|line| line.id == product.id) {
                Some(line) => {
                    line.quantity += 1;
                    CartEvent::QuantityChanged {
                        name: line.name.clone(),
                        quantity: line.quantity,
                    }
                }
                None => {
                    items.push(CartItem {
                        id: product.id,
                        name: product.name.clone(),
                        price: product.effective_price().to_string(),
                        image: product.image.clone(),
                        category: product.category.clone(),
                        quantity: 1,
                    });
                    CartEvent::ItemAdded {
                        name: product.name.clone(),
                    }
                }
            };
            self.persist(items.as_slice())?;
            event
        };

        self.notify(&event);
        Ok(())
    }

    /// Remove the line for `id` entirely. Unknown ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn remove(&self, id: ProductId) -> Result<(), StorageError> {
        let mut items = self.lock_items();
        let before = items.len();
        items.retain(|line| line.id != id);
        if items.len() != before {
            self.persist(items.as_slice())?;
        }
        Ok(())
    }

    /// Set the quantity of the line for `id`. Zero removes the line;
    /// unknown ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn set_quantity(&self, id: ProductId, quantity: u32) -> Result<(), StorageError> {
        if quantity == 0 {
            return self.remove(id);
        }

        let event = {
            let mut items = self.lock_items();
            let Some(line) = items.iter_mut().find(|line| line.id == id) else {
                return Ok(());
            };
            line.quantity = quantity;
            let event = CartEvent::QuantityChanged {
                name: line.name.clone(),
                quantity,
            };
            self.persist(items.as_slice())?;
            event
        };

        self.notify(&event);
        Ok(())
    }

    /// Empty the cart. Called after a confirmed checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut items = self.lock_items();
        items.clear();
        self.persist(items.as_slice())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the cart lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.lock_items().clone()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_items().is_empty()
    }

    /// Sum of line quantities (the badge number).
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lock_items()
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Cart total: each line's display price parsed to a decimal, times
    /// quantity, summed. Unparseable prices contribute zero.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lock_items()
            .iter()
            .map(|line| parse_amount(&line.price) * Decimal::from(line.quantity))
            .sum()
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Register a listener for cart events. Listeners run synchronously on
    /// the mutating call and live as long as the store.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&CartEvent) + Send + Sync + 'static,
    {
        self.lock_listeners().push(Box::new(listener));
    }

    fn notify(&self, event: &CartEvent) {
        for listener in self.lock_listeners().iter() {
            listener(event);
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn persist(&self, items: &[CartItem]) -> Result<(), StorageError> {
        let payload = serde_json::to_string(items)?;
        self.inner.storage.set(keys::SHOPPING_CART, &payload)
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<CartItem>> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.lock_items().len())
            .finish_non_exhaustive()
    }
}
