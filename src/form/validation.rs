use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures_timer::Delay;

use super::control::{AbstractControl, FormError, FormResult};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type BoxedValidationFuture = BoxFuture<'static, Result<Vec<String>, BoxError>>;

pub type ValidatorFn<T> = Arc<dyn Fn(&T) -> Result<Vec<String>, BoxError> + Send + Sync>;

pub type AsyncValidatorFn<T> = Arc<dyn Fn(T) -> BoxedValidationFuture + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

/// What happens to an async result when a newer `validate()` started while it was in flight.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StaleResultPolicy {
    /// Every run writes its result when it lands; the last one to resolve wins.
    #[default]
    LastWriteWins,
    /// Only the latest ticket may write errors or clear the in-flight flag.
    DiscardStale,
}

pub struct FormValidatorOptions<T> {
    pub validator: Option<ValidatorFn<T>>,
    pub async_validator: Option<AsyncValidatorFn<T>>,
    pub debounce: Duration,
    pub stale_results: StaleResultPolicy,
}

impl<T> Default for FormValidatorOptions<T> {
    fn default() -> Self {
        Self {
            validator: None,
            async_validator: None,
            debounce: Duration::ZERO,
            stale_results: StaleResultPolicy::default(),
        }
    }
}

impl<T> Clone for FormValidatorOptions<T> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
            async_validator: self.async_validator.clone(),
            debounce: self.debounce,
            stale_results: self.stale_results,
        }
    }
}

impl<T> FormValidatorOptions<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(
            move |value: &T| -> Result<Vec<String>, BoxError> { Ok(validator(value)) },
        ));
        self
    }

    /// A synchronous validator that can fail outright. Its failure is a programming error, not a
    /// validation result: it surfaces as [`FormError::ValidatorFailed`] and leaves errors as they were.
    pub fn try_validator<F, E>(mut self, validator: F) -> Self
    where
        F: Fn(&T) -> Result<Vec<String>, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.validator = Some(Arc::new(
            move |value: &T| -> Result<Vec<String>, BoxError> {
                validator(value).map_err(Into::into)
            },
        ));
        self
    }

    pub fn async_validator<F, Fut>(mut self, validator: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<String>> + Send + 'static,
    {
        self.async_validator = Some(Arc::new(move |value: T| -> BoxedValidationFuture {
            validator(value).map(Ok::<_, BoxError>).boxed()
        }));
        self
    }

    pub fn try_async_validator<F, Fut, E>(mut self, validator: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<String>, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.async_validator = Some(Arc::new(move |value: T| -> BoxedValidationFuture {
            validator(value)
                .map(|result| result.map_err(Into::into))
                .boxed()
        }));
        self
    }

    /// Delays the async step; a newer ticket issued during the delay skips the older run under
    /// either stale-result policy.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn stale_results(mut self, policy: StaleResultPolicy) -> Self {
        self.stale_results = policy;
        self
    }
}

/// Binds a sync and/or async validator to one control.
///
/// `validate()` marks the control as validating, applies the sync result, and only when that
/// left the control valid awaits the async validator. The in-flight flag is cleared when the
/// run ends, including when its future is dropped before completion.
pub struct FormValidator<C: AbstractControl> {
    control: C,
    options: FormValidatorOptions<C::Value>,
    latest: Arc<AtomicU64>,
}

impl<C> Clone for FormValidator<C>
where
    C: AbstractControl + Clone,
{
    fn clone(&self) -> Self {
        Self {
            control: self.control.clone(),
            options: self.options.clone(),
            latest: self.latest.clone(),
        }
    }
}

impl<C> FormValidator<C>
where
    C: AbstractControl + Clone,
{
    pub fn new(control: C, options: FormValidatorOptions<C::Value>) -> Self {
        Self {
            control,
            options,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn latest_ticket(&self) -> ValidationTicket {
        ValidationTicket(self.latest.load(Ordering::SeqCst))
    }

    pub async fn validate(&self) -> FormResult<ValidationTicket> {
        let ticket = ValidationTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1);
        if self.control.is_disabled() {
            self.control.set_errors(Vec::new());
            return Ok(ticket);
        }

        self.control.set_validating(true);
        let _in_flight = InFlight {
            validator: self,
            ticket,
        };
        tracing::trace!(control = %self.control.id(), ticket = ticket.0, "validation started");

        let value = self.control.value();
        let errors = match &self.options.validator {
            Some(validator) => validator(&value)
                .map_err(|error| FormError::ValidatorFailed(error.to_string()))?,
            None => Vec::new(),
        };
        self.control.set_errors(errors);

        let Some(async_validator) = &self.options.async_validator else {
            return Ok(ticket);
        };
        if !self.control.is_valid() {
            return Ok(ticket);
        }

        if !self.options.debounce.is_zero() {
            Delay::new(self.options.debounce).await;
            if !self.is_latest(ticket) {
                tracing::debug!(control = %self.control.id(), ticket = ticket.0, "skipping debounced validation");
                return Ok(ticket);
            }
        }

        let errors = async_validator(value)
            .await
            .map_err(|error| FormError::ValidatorFailed(error.to_string()))?;
        if self.accepts(ticket) {
            self.control.set_errors(errors);
        } else {
            tracing::debug!(control = %self.control.id(), ticket = ticket.0, "discarding stale validation result");
        }
        tracing::trace!(control = %self.control.id(), ticket = ticket.0, "validation finished");
        Ok(ticket)
    }

    fn is_latest(&self, ticket: ValidationTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    fn accepts(&self, ticket: ValidationTicket) -> bool {
        match self.options.stale_results {
            StaleResultPolicy::LastWriteWins => true,
            StaleResultPolicy::DiscardStale => self.is_latest(ticket),
        }
    }
}

struct InFlight<'a, C>
where
    C: AbstractControl + Clone,
{
    validator: &'a FormValidator<C>,
    ticket: ValidationTicket,
}

impl<C> Drop for InFlight<'_, C>
where
    C: AbstractControl + Clone,
{
    fn drop(&mut self) {
        if self.validator.accepts(self.ticket) {
            self.validator.control.set_validating(false);
        }
    }
}

/// Something a [`ValidationTrigger`](super::ValidationTrigger) can run on demand.
pub trait Validate: Send + Sync {
    fn validate(&self) -> BoxFuture<'_, FormResult<()>>;
}

impl<C> Validate for FormValidator<C>
where
    C: AbstractControl + Clone,
{
    fn validate(&self) -> BoxFuture<'_, FormResult<()>> {
        FormValidator::validate(self)
            .map(|result| result.map(|_| ()))
            .boxed()
    }
}

impl<F> Validate for F
where
    F: Fn() -> BoxFuture<'static, FormResult<()>> + Send + Sync,
{
    fn validate(&self) -> BoxFuture<'_, FormResult<()>> {
        (self)()
    }
}
