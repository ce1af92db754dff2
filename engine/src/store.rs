//! Host-side persistence seam.
//!
//! The core only needs a per-participant key-value store with read-after-write
//! consistency. [`InMemoryStore`] keeps each state as its serialized JSON, which is
//! what a real host would hand to its database.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, SignalsError};
use crate::session::ParticipantState;

pub trait ParticipantStore: Send + Sync {
    fn load(&self, participant_id: &str) -> Result<Option<ParticipantState>>;
    fn save(&self, state: &ParticipantState) -> Result<()>;
    fn remove(&self, participant_id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryStore {
    states: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.states.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<T>(_: T) -> SignalsError {
    SignalsError::Store("store lock poisoned".into())
}

impl ParticipantStore for InMemoryStore {
    fn load(&self, participant_id: &str) -> Result<Option<ParticipantState>> {
        let states = self.states.read().map_err(poisoned)?;
        states
            .get(participant_id)
            .map(|json| serde_json::from_str(json).map_err(|e| SignalsError::Store(e.to_string())))
            .transpose()
    }

    fn save(&self, state: &ParticipantState) -> Result<()> {
        let json = serde_json::to_string(state).map_err(|e| SignalsError::Store(e.to_string()))?;
        self.states
            .write()
            .map_err(poisoned)?
            .insert(state.participant_id().to_string(), json);
        Ok(())
    }

    fn remove(&self, participant_id: &str) -> Result<()> {
        self.states.write().map_err(poisoned)?.remove(participant_id);
        Ok(())
    }
}
