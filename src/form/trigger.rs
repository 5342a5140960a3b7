use std::sync::{Arc, RwLock};

use futures::future::join_all;

use super::control::{FormResult, read_state, write_state};
use super::validation::Validate;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RegistrationId(pub u64);

#[derive(Default)]
struct TriggerState {
    next_id: u64,
    validators: Vec<(RegistrationId, Arc<dyn Validate>)>,
}

/// Fans one "validate now" request out to every registered validator, e.g. on submit.
#[derive(Clone, Default)]
pub struct ValidationTrigger {
    state: Arc<RwLock<TriggerState>>,
}

impl ValidationTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_validator<V>(&self, validator: V) -> RegistrationId
    where
        V: Validate + 'static,
    {
        let mut state = write_state(&self.state);
        state.next_id += 1;
        let id = RegistrationId(state.next_id);
        state.validators.push((id, Arc::new(validator)));
        id
    }

    pub fn remove_validator(&self, id: RegistrationId) -> bool {
        let mut state = write_state(&self.state);
        let before = state.validators.len();
        state.validators.retain(|(registered, _)| *registered != id);
        state.validators.len() != before
    }

    pub fn len(&self) -> usize {
        read_state(&self.state).validators.len()
    }

    pub fn is_empty(&self) -> bool {
        read_state(&self.state).validators.is_empty()
    }

    pub fn clear(&self) {
        write_state(&self.state).validators.clear();
    }

    /// Runs every registration to completion. A failing validator never stops its siblings,
    /// and failures are only logged.
    pub async fn validate(&self) {
        for (id, outcome) in self.validate_settled().await {
            if let Err(error) = outcome {
                tracing::warn!(registration = id.0, %error, "validator failed during trigger");
            }
        }
    }

    /// Like [`ValidationTrigger::validate`], but hands back each registration's outcome.
    pub async fn validate_settled(&self) -> Vec<(RegistrationId, FormResult<()>)> {
        let validators = read_state(&self.state).validators.clone();
        tracing::trace!(count = validators.len(), "triggering validation");
        join_all(
            validators
                .iter()
                .map(|(id, validator)| async move { (*id, validator.validate().await) }),
        )
        .await
    }
}
