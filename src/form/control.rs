use std::any::Any;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

static CONTROL_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

/// Identity of a node in a control tree. Cloned handles share the id of the node they point at.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ControlId(pub u64);

impl ControlId {
    pub fn next() -> Self {
        Self(CONTROL_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for ControlId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FormError {
    #[error("index {index} out of range for {len} fields")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no field matches {0}")]
    SlotNotFound(String),
    #[error("growing from {len} to {requested} fields requires a field factory")]
    MissingFieldFactory { len: usize, requested: usize },
    #[error("value does not fit control {control}: {reason}")]
    ValueMismatch { control: ControlId, reason: String },
    #[error("validator failed: {0}")]
    ValidatorFailed(String),
}

pub type FormResult<T> = Result<T, FormError>;

/// The surface every node of a control tree exposes, leaf or composite.
///
/// Aggregated state on composites is folded from the children on every read. Nothing is
/// memoized, so a child swapped at runtime is reflected by the next call.
pub trait AbstractControl: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    fn id(&self) -> ControlId;

    fn value(&self) -> Self::Value;

    fn is_dirty(&self) -> bool;

    fn is_touched(&self) -> bool;

    /// Own errors are empty and every descendant is valid.
    fn is_valid(&self) -> bool;

    /// Own validation is in flight or any descendant is validating.
    fn is_validating(&self) -> bool;

    fn is_disabled(&self) -> bool {
        false
    }

    /// Errors attached to this node only; descendant errors are never copied upward.
    fn errors(&self) -> Vec<String>;

    fn set_value(&self, value: Self::Value) -> FormResult<()>;

    /// `None` resets to the node's own baseline; `Some` replaces the baseline first.
    fn reset(&self, value: Option<Self::Value>) -> FormResult<()>;

    /// An empty list clears the errors and makes the node valid again.
    fn set_errors(&self, errors: Vec<String>);

    fn set_validating(&self, validating: bool);

    /// Checks that `set_value(value)` would succeed on the whole subtree without mutating it.
    fn verify_value(&self, _value: &Self::Value) -> FormResult<()> {
        Ok(())
    }

    /// Checks that `reset(value)` would succeed on the whole subtree without mutating it.
    fn verify_reset(&self, _value: Option<&Self::Value>) -> FormResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

/// A type-erased control whose value is projected to plain JSON.
pub type AnyControl = Arc<dyn AbstractControl<Value = Value>>;

impl AbstractControl for AnyControl {
    type Value = Value;

    fn id(&self) -> ControlId {
        (**self).id()
    }

    fn value(&self) -> Value {
        (**self).value()
    }

    fn is_dirty(&self) -> bool {
        (**self).is_dirty()
    }

    fn is_touched(&self) -> bool {
        (**self).is_touched()
    }

    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    fn is_validating(&self) -> bool {
        (**self).is_validating()
    }

    fn is_disabled(&self) -> bool {
        (**self).is_disabled()
    }

    fn errors(&self) -> Vec<String> {
        (**self).errors()
    }

    fn set_value(&self, value: Value) -> FormResult<()> {
        (**self).set_value(value)
    }

    fn reset(&self, value: Option<Value>) -> FormResult<()> {
        (**self).reset(value)
    }

    fn set_errors(&self, errors: Vec<String>) {
        (**self).set_errors(errors)
    }

    fn set_validating(&self, validating: bool) {
        (**self).set_validating(validating)
    }

    fn verify_value(&self, value: &Value) -> FormResult<()> {
        (**self).verify_value(value)
    }

    fn verify_reset(&self, value: Option<&Value>) -> FormResult<()> {
        (**self).verify_reset(value)
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }
}

/// Wraps a typed control so it can live next to differently typed siblings.
///
/// Downcasting through [`AbstractControl::as_any`] still yields the wrapped control.
pub fn erase<C>(control: C) -> AnyControl
where
    C: AbstractControl,
    C::Value: Serialize + DeserializeOwned,
{
    let any: &dyn Any = &control;
    if let Some(erased) = any.downcast_ref::<AnyControl>() {
        return erased.clone();
    }
    Arc::new(Erased { inner: control })
}

struct Erased<C> {
    inner: C,
}

impl<C> Erased<C>
where
    C: AbstractControl,
    C::Value: Serialize + DeserializeOwned,
{
    fn decode(&self, value: Value) -> FormResult<C::Value> {
        serde_json::from_value(value).map_err(|error| FormError::ValueMismatch {
            control: self.inner.id(),
            reason: error.to_string(),
        })
    }
}

impl<C> AbstractControl for Erased<C>
where
    C: AbstractControl,
    C::Value: Serialize + DeserializeOwned,
{
    type Value = Value;

    fn id(&self) -> ControlId {
        self.inner.id()
    }

    fn value(&self) -> Value {
        match serde_json::to_value(self.inner.value()) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(control = %self.inner.id(), %error, "value has no plain projection");
                Value::Null
            }
        }
    }

    fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    fn is_touched(&self) -> bool {
        self.inner.is_touched()
    }

    fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    fn is_validating(&self) -> bool {
        self.inner.is_validating()
    }

    fn is_disabled(&self) -> bool {
        self.inner.is_disabled()
    }

    fn errors(&self) -> Vec<String> {
        self.inner.errors()
    }

    fn set_value(&self, value: Value) -> FormResult<()> {
        let value = self.decode(value)?;
        self.inner.set_value(value)
    }

    fn reset(&self, value: Option<Value>) -> FormResult<()> {
        let value = value.map(|value| self.decode(value)).transpose()?;
        self.inner.reset(value)
    }

    fn set_errors(&self, errors: Vec<String>) {
        self.inner.set_errors(errors)
    }

    fn set_validating(&self, validating: bool) {
        self.inner.set_validating(validating)
    }

    fn verify_value(&self, value: &Value) -> FormResult<()> {
        let value = self.decode(value.clone())?;
        self.inner.verify_value(&value)
    }

    fn verify_reset(&self, value: Option<&Value>) -> FormResult<()> {
        let value = value.map(|value| self.decode(value.clone())).transpose()?;
        self.inner.verify_reset(value.as_ref())
    }

    fn as_any(&self) -> &dyn Any {
        self.inner.as_any()
    }
}

pub(super) fn read_state<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(super) fn write_state<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
