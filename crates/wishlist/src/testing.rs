//! In-memory storefront used by unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use nectar_core::ProductId;

use crate::error::WishlistError;
use crate::remote::RemoteWishlist;

pub fn pid(s: &str) -> ProductId {
    ProductId::parse(s).unwrap()
}

#[derive(Default)]
struct State {
    ids: Vec<ProductId>,
    list_calls: usize,
    add_calls: Vec<ProductId>,
    remove_calls: Vec<ProductId>,
    in_flight: usize,
    max_in_flight: usize,
    failing_adds: HashMap<ProductId, String>,
    failing_writes: Option<String>,
    failing_lists: Option<String>,
}

/// Server set plus a record of every request. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<State>>,
}

impl MemoryRemote {
    pub fn with_ids<const N: usize>(ids: [&str; N]) -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().ids = ids.iter().map(|s| pid(s)).collect();
        remote
    }

    pub fn ids(&self) -> Vec<ProductId> {
        self.state.lock().unwrap().ids.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn add_calls(&self) -> Vec<ProductId> {
        self.state.lock().unwrap().add_calls.clone()
    }

    pub fn remove_calls(&self) -> Vec<ProductId> {
        self.state.lock().unwrap().remove_calls.clone()
    }

    pub fn max_concurrent_adds(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    /// Reject adds of `id` with `message`.
    pub fn fail_add(&self, id: &ProductId, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_adds
            .insert(id.clone(), message.to_string());
    }

    /// Reject every add and remove with `message`.
    pub fn fail_writes(&self, message: &str) {
        self.state.lock().unwrap().failing_writes = Some(message.to_string());
    }

    pub fn fail_lists(&self, message: &str) {
        self.state.lock().unwrap().failing_lists = Some(message.to_string());
    }

    fn rejected(message: &str) -> WishlistError {
        WishlistError::Status {
            status: 400,
            message: message.to_string(),
        }
    }
}

impl RemoteWishlist for MemoryRemote {
    async fn list(&self) -> Result<Vec<ProductId>, WishlistError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if let Some(message) = &state.failing_lists {
            return Err(Self::rejected(message));
        }
        Ok(state.ids.clone())
    }

    async fn add(&self, product_id: &ProductId) -> Result<(), WishlistError> {
        {
            let mut state = self.state.lock().unwrap();
            state.add_calls.push(product_id.clone());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        // Suspend so concurrently dispatched adds overlap
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        if let Some(message) = &state.failing_writes {
            return Err(Self::rejected(message));
        }
        if let Some(message) = state.failing_adds.get(product_id) {
            return Err(Self::rejected(message));
        }
        if !state.ids.contains(product_id) {
            state.ids.push(product_id.clone());
        }
        Ok(())
    }

    async fn remove(&self, product_id: &ProductId) -> Result<(), WishlistError> {
        let mut state = self.state.lock().unwrap();
        state.remove_calls.push(product_id.clone());
        if let Some(message) = &state.failing_writes {
            return Err(Self::rejected(message));
        }
        state.ids.retain(|id| id != product_id);
        Ok(())
    }
}
