//! Credential and model rotation.
//!
//! The rotator cycles through every model for the current key before moving
//! to the next key, so each key is paired with each model before any key
//! repeats. Usage counters only grow; they live as long as the rotator.

use crate::error::TriageError;
use crate::models::UsageReport;
use std::collections::BTreeMap;
use tracing::debug;

/// One (key, model) pairing handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub key_index: usize,
    pub api_key: String,
    pub model: String,
}

/// An API key with the number of slots spent on it.
#[derive(Debug, Clone)]
struct CredentialSlot {
    api_key: String,
    uses: u64,
}

/// Round-robin scheduler over API keys and models.
#[derive(Debug, Clone)]
pub struct CredentialRotator {
    slots: Vec<CredentialSlot>,
    models: Vec<String>,
    key_cursor: usize,
    model_cursor: usize,
    per_key_limit: u64,
}

impl CredentialRotator {
    /// Create a rotator. Fails when no keys or no models are configured.
    pub fn new(
        api_keys: Vec<String>,
        models: Vec<String>,
        per_key_limit: u64,
    ) -> Result<Self, TriageError> {
        if api_keys.is_empty() {
            return Err(TriageError::Configuration(
                "at least one API key is required".to_string(),
            ));
        }
        if models.is_empty() {
            return Err(TriageError::Configuration(
                "at least one model is required".to_string(),
            ));
        }

        Ok(Self {
            slots: api_keys
                .into_iter()
                .map(|api_key| CredentialSlot { api_key, uses: 0 })
                .collect(),
            models,
            key_cursor: 0,
            model_cursor: 0,
            per_key_limit,
        })
    }

    /// Take the next (key, model) pair and spend one slot on its key.
    pub fn next_selection(&mut self) -> Selection {
        let slot = &mut self.slots[self.key_cursor];
        slot.uses += 1;

        let selection = Selection {
            key_index: self.key_cursor,
            api_key: slot.api_key.clone(),
            model: self.models[self.model_cursor].clone(),
        };

        self.model_cursor = (self.model_cursor + 1) % self.models.len();
        if self.model_cursor == 0 {
            self.key_cursor = (self.key_cursor + 1) % self.slots.len();
        }

        debug!(
            "Selected key #{} with model {}",
            selection.key_index + 1,
            selection.model
        );
        selection
    }

    /// Current per-key usage. Pure read.
    pub fn usage_report(&self) -> UsageReport {
        let counts: BTreeMap<usize, u64> = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (i, slot.uses))
            .collect();

        UsageReport {
            counts,
            per_key_limit: self.per_key_limit,
        }
    }

    /// Slots spent so far across all keys.
    pub fn total_selections(&self) -> u64 {
        self.slots.iter().map(|slot| slot.uses).sum()
    }
}
