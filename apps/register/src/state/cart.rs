//! # Cart State
//!
//! The active seller's cart, written through to a durable slot on every
//! change so it survives a restart.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  startup        CartStore::load() ──► Cart::restore(blob)  (once)      │
//! │                                                                         │
//! │  add / update   lock ──► Cart mutation ──► Ok? ──► CartStore::save()    │
//! │  remove / clear                        └─► Err: cart unchanged,         │
//! │                                             nothing written             │
//! │                                                                         │
//! │  checkout       commit OK ──► clear + CartStore::clear()                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One slot per seller session: `<data_dir>/carts/<shop_id>--<seller_id>.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use duka_core::{Cart, CoreResult};

/// Durable storage for one serialized cart.
pub trait CartStore: Send + Sync + std::fmt::Debug {
    /// `None` when the slot is empty or unreadable.
    fn load(&self) -> Option<String>;
    fn save(&self, blob: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// A JSON file per seller session.
#[derive(Debug, Clone)]
pub struct FileCartStore {
    path: PathBuf,
}

impl FileCartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCartStore { path: path.into() }
    }

    /// The slot for a seller session under `data_dir`.
    pub fn for_session(data_dir: &Path, shop_id: &str, seller_id: &str) -> Self {
        let name = format!("{}--{}.json", slot_component(shop_id), slot_component(seller_id));
        FileCartStore::new(data_dir.join("carts").join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn slot_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl CartStore for FileCartStore {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Some(blob),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cart slot unreadable");
                None
            }
        }
    }

    /// Writes to a sibling temp file and renames it over the slot, so a crash
    /// mid-write leaves the previous snapshot.
    fn save(&self, blob: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &self.path)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process slot, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    slot: Mutex<Option<String>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        MemoryCartStore::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        MemoryCartStore {
            slot: Mutex::new(Some(blob.into())),
        }
    }
}

impl CartStore for MemoryCartStore {
    fn load(&self) -> Option<String> {
        self.slot.lock().expect("cart slot mutex poisoned").clone()
    }

    fn save(&self, blob: &str) -> io::Result<()> {
        *self.slot.lock().expect("cart slot mutex poisoned") = Some(blob.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.slot.lock().expect("cart slot mutex poisoned") = None;
        Ok(())
    }
}

/// The seller session's cart.
///
/// The mutex serializes cart commands; the store is only touched while it
/// is held, so the slot always matches the last successful mutation.
#[derive(Debug)]
pub struct CartState {
    cart: Mutex<Cart>,
    store: Box<dyn CartStore>,
}

impl CartState {
    /// Restores the cart from `store`. A bad snapshot yields an empty cart.
    pub fn restore(store: impl CartStore + 'static) -> Self {
        let cart = store.load().map(|blob| Cart::restore(&blob)).unwrap_or_default();
        debug!(lines = cart.len(), "Cart session opened");
        CartState {
            cart: Mutex::new(cart),
            store: Box::new(store),
        }
    }

    /// An empty cart with no durable slot.
    pub fn in_memory() -> Self {
        CartState::restore(MemoryCartStore::new())
    }

    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().expect("cart mutex poisoned");
        f(&cart)
    }

    /// Runs a cart mutation and persists the cart if it succeeded.
    ///
    /// A failed mutation leaves both the cart and the slot untouched. A
    /// failed slot write is logged; the in-memory cart stays authoritative.
    pub fn with_cart_mut<F, R>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut Cart) -> CoreResult<R>,
    {
        let mut cart = self.cart.lock().expect("cart mutex poisoned");
        let result = f(&mut cart)?;
        self.persist(&cart);
        Ok(result)
    }

    /// Empties the cart and its slot.
    pub fn clear(&self) {
        let mut cart = self.cart.lock().expect("cart mutex poisoned");
        cart.clear();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear cart slot");
        }
    }

    /// Clears the cart after a committed checkout, unless it was changed
    /// after `settled` was taken.
    ///
    /// Returns whether the cart was cleared.
    pub fn clear_if_unchanged(&self, settled: &Cart) -> bool {
        let mut cart = self.cart.lock().expect("cart mutex poisoned");
        if *cart != *settled {
            warn!("Cart changed during checkout, keeping the newer cart");
            return false;
        }
        cart.clear();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear cart slot");
        }
        true
    }

    fn persist(&self, cart: &Cart) {
        let written = cart
            .snapshot()
            .to_json()
            .map_err(io::Error::from)
            .and_then(|blob| self.store.save(&blob));
        if let Err(e) = written {
            warn!(error = %e, "Failed to write cart slot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use duka_core::{CoreError, Money, NewProduct, Product, UnitType};

    fn soda(quantity: i64) -> Product {
        NewProduct {
            name: "Soda 500ml".to_string(),
            sku: "SODA-500".to_string(),
            category: "Drinks".to_string(),
            buy_price: Money::from_minor(1000),
            sell_price: Money::from_minor(1500),
            quantity,
            min_threshold: 2,
            discount_bps: None,
        }
        .into_product("shop-1", Utc::now())
    }

    #[test]
    fn test_mutations_write_through_to_file_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCartStore::for_session(dir.path(), "shop-1", "seller/1");
        assert!(store.path().ends_with("carts/shop-1--seller_1.json"));

        let state = CartState::restore(store.clone());
        let product = soda(10);
        state.with_cart_mut(|c| c.add_single_unit(&product)).unwrap();
        state.with_cart_mut(|c| c.add_single_unit(&product)).unwrap();

        // a new session on the same slot sees the cart
        let reopened = CartState::restore(store.clone());
        assert_eq!(reopened.with_cart(|c| c.totals().total_units), 2);

        reopened.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_rejected_mutation_does_not_touch_slot() {
        let store = MemoryCartStore::new();
        let state = CartState::restore(store);
        let product = soda(10);

        let err = state
            .with_cart_mut(|c| c.add_pack(&product, UnitType::dozen(), 12, Money::from_minor(15_000), 1))
            .unwrap_err();
        assert!(matches!(err, CoreError::StockExceeded { max_allowed: 0, .. }));
        assert!(state.with_cart(|c| c.is_empty()));
        assert!(state.store.load().is_none());
    }

    #[test]
    fn test_malformed_slot_restores_empty_cart() {
        let state = CartState::restore(MemoryCartStore::with_blob("{not json"));
        assert!(state.with_cart(|c| c.is_empty()));

        let state = CartState::restore(MemoryCartStore::with_blob(r#"{"version":99,"lines":[]}"#));
        assert!(state.with_cart(|c| c.is_empty()));
    }

    #[test]
    fn test_clear_if_unchanged() {
        let state = CartState::in_memory();
        let product = soda(10);
        state.with_cart_mut(|c| c.add_single_unit(&product)).unwrap();

        let settled = state.with_cart(|c| c.clone());
        state.with_cart_mut(|c| c.add_single_unit(&product)).unwrap();
        assert!(!state.clear_if_unchanged(&settled));

        let settled = state.with_cart(|c| c.clone());
        assert!(state.clear_if_unchanged(&settled));
        assert!(state.with_cart(|c| c.is_empty()));
    }
}
