//! Participant lifecycle and the host-facing interface.
//!
//! [`ParticipantState`] is the explicit per-participant state object:
//!
//! ```text
//! Uninitialized ──schedule──▶ Scheduled ──record──▶ Recording ──finalize──▶ Finalized
//!                                  └───────────────finalize────────────────────┘
//! ```
//!
//! Schedules are memoized per treatment, the ledger only grows, and finalizing
//! twice returns the stored selection. [`Experiment`] wraps the state in a
//! host store and serializes all calls for one participant behind a
//! per-participant lock, so a page reload racing the first request cannot
//! build a second schedule or draw a second payment.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ExperimentConfig, PaymentConfig, TreatmentConfig};
use crate::error::{ConfigError, Result, SignalsError, StateError, ValidationError};
use crate::ledger::{self, RoundLedger};
use crate::payoff_model::{build_payoff_table, Budget};
use crate::schedule::{build_participant_schedule, Schedule};
use crate::seeding::{participant_seed, stream_rng, Stream};
use crate::selection::select_and_pay;
use crate::store::ParticipantStore;
use crate::types::{
    ConsumptionOutcome, DecisionRecord, FinalPayoffSelection, PayoffTableRow, Phase,
    RoundAssignment,
};

/// Look up one round of a schedule.
pub fn get_round_assignment(
    schedule: &Schedule,
    round_index: usize,
) -> std::result::Result<&RoundAssignment, ValidationError> {
    schedule.get(round_index)
}

/// Payoff table for the choice page: both regimes, c1 = 1..=floor(c1_max).
pub fn compute_table(assignment: &RoundAssignment) -> Vec<PayoffTableRow> {
    build_payoff_table(
        &Budget::from_assignment(assignment),
        assignment.regimes,
        assignment.c1_max,
    )
}

/// Validate a round's inputs and append the resulting record.
pub fn record_round(
    ledger: &mut RoundLedger,
    assignment: &RoundAssignment,
    c1: f64,
    belief_raw: f64,
) -> std::result::Result<DecisionRecord, ValidationError> {
    let record = ledger::build_record(assignment, c1, belief_raw)?;
    ledger.append(record).cloned()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantState {
    participant_id: String,
    seed: u64,
    phase: Phase,
    schedules: BTreeMap<String, Schedule>,
    ledger: RoundLedger,
    selection: Option<FinalPayoffSelection>,
}

impl ParticipantState {
    pub fn new(participant_id: &str, session_seed: u64) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            seed: participant_seed(session_seed, participant_id),
            phase: Phase::Uninitialized,
            schedules: BTreeMap::new(),
            ledger: RoundLedger::new(),
            selection: None,
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ledger(&self) -> &RoundLedger {
        &self.ledger
    }

    pub fn selection(&self) -> Option<&FinalPayoffSelection> {
        self.selection.as_ref()
    }

    pub fn schedule(&self, treatment: &str) -> Option<&Schedule> {
        self.schedules.get(treatment)
    }

    fn already_finalized(&self) -> SignalsError {
        StateError::AlreadyFinalized {
            participant: self.participant_id.clone(),
        }
        .into()
    }

    /// Build the treatment's schedule on first call; later calls return it unchanged.
    pub fn initialize_schedule(&mut self, config: &TreatmentConfig) -> Result<&Schedule> {
        if self.phase == Phase::Finalized {
            return Err(self.already_finalized());
        }
        match self.schedules.entry(config.label.clone()) {
            Entry::Occupied(e) => {
                debug!(
                    participant = %self.participant_id,
                    treatment = %config.label,
                    "schedule cached"
                );
                Ok(&*e.into_mut())
            }
            Entry::Vacant(v) => {
                let schedule = build_participant_schedule(config, self.seed)?;
                info!(
                    participant = %self.participant_id,
                    treatment = %config.label,
                    rounds = schedule.len(),
                    "schedule initialized"
                );
                if self.phase == Phase::Uninitialized {
                    self.phase = Phase::Scheduled;
                }
                Ok(&*v.insert(schedule))
            }
        }
    }

    pub fn round_assignment(
        &self,
        treatment: &str,
        round_index: usize,
    ) -> Result<&RoundAssignment> {
        let schedule = self
            .schedules
            .get(treatment)
            .ok_or_else(|| StateError::NotScheduled {
                participant: self.participant_id.clone(),
                treatment: treatment.to_string(),
            })?;
        Ok(get_round_assignment(schedule, round_index)?)
    }

    pub fn payoff_table(&self, treatment: &str, round_index: usize) -> Result<Vec<PayoffTableRow>> {
        Ok(compute_table(self.round_assignment(treatment, round_index)?))
    }

    /// c2 and u of a choice without recording it (practice rounds, previews).
    pub fn practice_round(
        &self,
        treatment: &str,
        round_index: usize,
        c1: f64,
    ) -> Result<ConsumptionOutcome> {
        let assignment = self.round_assignment(treatment, round_index)?;
        Ok(ledger::evaluate_choice(assignment, c1)?)
    }

    pub fn record_round(
        &mut self,
        treatment: &str,
        round_index: usize,
        c1: f64,
        belief_raw: f64,
    ) -> Result<&DecisionRecord> {
        match self.phase {
            Phase::Uninitialized => {
                return Err(StateError::NotStarted {
                    participant: self.participant_id.clone(),
                }
                .into())
            }
            Phase::Finalized => return Err(self.already_finalized()),
            Phase::Scheduled | Phase::Recording => {}
        }
        let record = {
            let assignment = self.round_assignment(treatment, round_index)?;
            ledger::build_record(assignment, c1, belief_raw)?
        };
        let appended = self.ledger.append(record)?;
        self.phase = Phase::Recording;
        Ok(appended)
    }

    /// Draw the final payment once; every later call returns the stored selection.
    pub fn finalize(&mut self, payment: &PaymentConfig) -> Result<&FinalPayoffSelection> {
        match self.phase {
            Phase::Uninitialized => Err(StateError::NotStarted {
                participant: self.participant_id.clone(),
            }
            .into()),
            Phase::Finalized => {
                debug!(participant = %self.participant_id, "returning stored selection");
                self.selection.as_ref().ok_or_else(|| {
                    StateError::InvalidTransition {
                        operation: "finalize",
                        phase: Phase::Finalized,
                    }
                    .into()
                })
            }
            Phase::Scheduled | Phase::Recording => {
                let mut rng = stream_rng(self.seed, Stream::FinalPayment, "");
                let selection = select_and_pay(&self.ledger, payment, &mut rng);
                self.phase = Phase::Finalized;
                Ok(&*self.selection.insert(selection))
            }
        }
    }
}

/// One experimental session: configuration, host store and per-participant locks.
pub struct Experiment<S: ParticipantStore> {
    config: ExperimentConfig,
    store: S,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

fn lock_poisoned<T>(_: T) -> SignalsError {
    SignalsError::Store("participant lock poisoned".into())
}

impl<S: ParticipantStore> Experiment<S> {
    pub fn new(config: ExperimentConfig, store: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn treatment(&self, label: &str) -> Result<&TreatmentConfig> {
        self.config
            .treatment(label)
            .ok_or_else(|| ConfigError::UnknownTreatment(label.to_string()).into())
    }

    /// Lock of a participant. Unknown participants get an entry only when `create` is set.
    fn participant_lock(
        &self,
        participant_id: &str,
        create: bool,
    ) -> Result<Option<Arc<Mutex<()>>>> {
        let mut locks = self.locks.lock().map_err(lock_poisoned)?;
        if let Some(lock) = locks.get(participant_id) {
            return Ok(Some(lock.clone()));
        }
        if !create && self.store.load(participant_id)?.is_none() {
            return Ok(None);
        }
        Ok(Some(
            locks
                .entry(participant_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        ))
    }

    fn not_started(participant_id: &str) -> SignalsError {
        StateError::NotStarted {
            participant: participant_id.to_string(),
        }
        .into()
    }

    /// Run `f` on the participant's state under its lock; the state is saved only if `f` succeeds.
    fn with_state<T>(
        &self,
        participant_id: &str,
        create: bool,
        f: impl FnOnce(&mut ParticipantState) -> Result<T>,
    ) -> Result<T> {
        let lock = self
            .participant_lock(participant_id, create)?
            .ok_or_else(|| Self::not_started(participant_id))?;
        let _guard = lock.lock().map_err(lock_poisoned)?;
        let mut state = match self.store.load(participant_id)? {
            Some(state) => state,
            None if create => ParticipantState::new(participant_id, self.config.session_seed),
            None => return Err(Self::not_started(participant_id)),
        };
        let out = f(&mut state)?;
        self.store.save(&state)?;
        Ok(out)
    }

    /// Create the participant and build every configured treatment's schedule.
    ///
    /// A catalog error aborts the whole start and nothing is stored.
    pub fn start_participant(&self, participant_id: &str) -> Result<Phase> {
        self.with_state(participant_id, true, |state| {
            if state.phase() == Phase::Finalized {
                return Ok(Phase::Finalized);
            }
            for treatment in &self.config.treatments {
                state.initialize_schedule(treatment)?;
            }
            Ok(state.phase())
        })
    }

    pub fn initialize_schedule(&self, participant_id: &str, treatment: &str) -> Result<Schedule> {
        let config = self.treatment(treatment)?;
        self.with_state(participant_id, true, |state| {
            state.initialize_schedule(config).cloned()
        })
    }

    pub fn round_assignment(
        &self,
        participant_id: &str,
        treatment: &str,
        round_index: usize,
    ) -> Result<RoundAssignment> {
        self.with_state(participant_id, false, |state| {
            state.round_assignment(treatment, round_index).cloned()
        })
    }

    pub fn payoff_table(
        &self,
        participant_id: &str,
        treatment: &str,
        round_index: usize,
    ) -> Result<Vec<PayoffTableRow>> {
        self.with_state(participant_id, false, |state| {
            state.payoff_table(treatment, round_index)
        })
    }

    pub fn practice_round(
        &self,
        participant_id: &str,
        treatment: &str,
        round_index: usize,
        c1: f64,
    ) -> Result<ConsumptionOutcome> {
        self.with_state(participant_id, false, |state| {
            state.practice_round(treatment, round_index, c1)
        })
    }

    pub fn record_round(
        &self,
        participant_id: &str,
        treatment: &str,
        round_index: usize,
        c1: f64,
        belief_raw: f64,
    ) -> Result<DecisionRecord> {
        self.with_state(participant_id, false, |state| {
            state
                .record_round(treatment, round_index, c1, belief_raw)
                .cloned()
        })
    }

    pub fn finalize(&self, participant_id: &str) -> Result<FinalPayoffSelection> {
        let payment = &self.config.payment;
        self.with_state(participant_id, false, |state| {
            state.finalize(payment).cloned()
        })
    }

    pub fn participant(&self, participant_id: &str) -> Result<Option<ParticipantState>> {
        self.store.load(participant_id)
    }

    /// Drop the participant's state at the end of the session.
    ///
    /// The lock entry goes too unless another caller still holds a clone of it;
    /// clones are only taken under the map lock, so the count cannot grow meanwhile.
    pub fn end_participant(&self, participant_id: &str) -> Result<()> {
        let Some(lock) = self.participant_lock(participant_id, false)? else {
            return Ok(());
        };
        {
            let _guard = lock.lock().map_err(lock_poisoned)?;
            self.store.remove(participant_id)?;
        }
        let mut locks = self.locks.lock().map_err(lock_poisoned)?;
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(participant_id);
        }
        Ok(())
    }
}
