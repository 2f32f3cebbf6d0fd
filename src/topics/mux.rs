//! Topic multiplexers: aggregate many topics into one record batch.
//!
//! A multiplexer selects topics by regular expression and, on `get`,
//! yields the current value of every matching topic. Sessions reference
//! multiplexers through [`TopicSource::Mux`](crate::models::mapping::TopicSource)
//! entries in their I/O mappings.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;
use tracing::warn;

use crate::models::record::TopicDataRecord;
use crate::topics::store::TopicStore;
use crate::{AppError, Result};

/// Aggregates all topics matching a selector into one batch per read.
pub struct TopicMultiplexer {
    /// Multiplexer identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    selector: Regex,
}

impl TopicMultiplexer {
    /// Construct a multiplexer with a regex topic selector.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Mapping` if the selector is not a valid
    /// regular expression.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        topic_selector: &str,
    ) -> Result<Self> {
        let selector = Regex::new(topic_selector).map_err(|err| {
            AppError::Mapping(format!("invalid mux topic selector '{topic_selector}': {err}"))
        })?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            selector,
        })
    }

    /// Current value of every matching topic, ordered by topic name.
    #[must_use]
    pub fn get(&self, store: &TopicStore) -> Vec<TopicDataRecord> {
        store
            .topics()
            .iter()
            .filter(|topic| self.selector.is_match(topic))
            .filter_map(|topic| store.pull(topic))
            .collect()
    }
}

/// Registry of multiplexers, shared with every session.
pub struct MuxRegistry {
    store: Arc<TopicStore>,
    muxes: RwLock<HashMap<String, TopicMultiplexer>>,
}

impl MuxRegistry {
    /// Construct an empty registry reading from `store`.
    #[must_use]
    pub fn new(store: Arc<TopicStore>) -> Self {
        Self {
            store,
            muxes: RwLock::new(HashMap::new()),
        }
    }

    /// Register a multiplexer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Mapping` if a multiplexer with the same id is
    /// already registered.
    pub fn register(&self, mux: TopicMultiplexer) -> Result<()> {
        let mut muxes = self.muxes.write().unwrap_or_else(PoisonError::into_inner);
        if muxes.contains_key(&mux.id) {
            return Err(AppError::Mapping(format!(
                "mux {} is already registered",
                mux.id
            )));
        }
        muxes.insert(mux.id.clone(), mux);
        Ok(())
    }

    /// Remove a multiplexer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no multiplexer with that id exists.
    pub fn delete(&self, mux_id: &str) -> Result<()> {
        let mut muxes = self.muxes.write().unwrap_or_else(PoisonError::into_inner);
        if muxes.remove(mux_id).is_none() {
            return Err(AppError::NotFound(format!("mux {mux_id} not registered")));
        }
        Ok(())
    }

    /// Read one multiplexer's full record batch (possibly empty).
    ///
    /// An unknown id yields an empty batch; the gap surfaces through the
    /// orchestrator's completeness reporting, not here.
    #[must_use]
    pub fn get(&self, mux_id: &str) -> Vec<TopicDataRecord> {
        let muxes = self.muxes.read().unwrap_or_else(PoisonError::into_inner);
        match muxes.get(mux_id) {
            Some(mux) => mux.get(&self.store),
            None => {
                warn!(mux_id, "pull from unknown mux");
                Vec::new()
            }
        }
    }
}
