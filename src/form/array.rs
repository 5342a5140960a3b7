use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::sync::{Arc, RwLock};

use super::control::{
    AbstractControl, ControlId, FormError, FormResult, read_state, write_state,
};

/// Identity of one array slot. Assigned once at insertion and never reused within an array.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SlotKey(pub u64);

impl Display for SlotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A child control paired with the key of the slot it occupies.
#[derive(Clone, Debug)]
pub struct KeyedField<C> {
    pub key: SlotKey,
    pub field: C,
}

impl<C> Deref for KeyedField<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.field
    }
}

/// What [`FieldArray::remove`] should look for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotTarget {
    Index(usize),
    Key(SlotKey),
    Control(ControlId),
}

impl From<usize> for SlotTarget {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<SlotKey> for SlotTarget {
    fn from(key: SlotKey) -> Self {
        Self::Key(key)
    }
}

impl<C: AbstractControl> From<&C> for SlotTarget {
    fn from(field: &C) -> Self {
        Self::Control(field.id())
    }
}

impl Display for SlotTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotTarget::Index(index) => write!(f, "index {index}"),
            SlotTarget::Key(key) => write!(f, "key {key}"),
            SlotTarget::Control(id) => write!(f, "control {id}"),
        }
    }
}

pub type FieldFactory<C> = Arc<dyn Fn(<C as AbstractControl>::Value) -> C + Send + Sync>;

struct ArrayState<C: AbstractControl> {
    slots: Vec<KeyedField<C>>,
    baseline: Vec<SlotKey>,
    counter: u64,
    errors: Vec<String>,
    validating: bool,
    factory: Option<FieldFactory<C>>,
}

impl<C: AbstractControl> ArrayState<C> {
    fn next_key(&mut self) -> SlotKey {
        let key = SlotKey(self.counter);
        self.counter += 1;
        key
    }

    fn keyed(&mut self, field: C) -> KeyedField<C> {
        KeyedField {
            key: self.next_key(),
            field,
        }
    }

    fn keys(&self) -> Vec<SlotKey> {
        self.slots.iter().map(|slot| slot.key).collect()
    }

    fn ensure_in_range(&self, index: usize) -> FormResult<()> {
        if index >= self.slots.len() {
            return Err(FormError::IndexOutOfRange {
                index,
                len: self.slots.len(),
            });
        }
        Ok(())
    }

    fn topology_changed(&self) -> bool {
        self.slots
            .iter()
            .map(|slot| slot.key)
            .ne(self.baseline.iter().copied())
    }
}

/// An ordered composite whose slots carry stable keys.
///
/// Dirty and touched fold the children's state with a comparison of the current key order
/// against the order captured at construction or the last reset, so pure reorderings count.
pub struct FieldArray<C: AbstractControl> {
    id: ControlId,
    state: Arc<RwLock<ArrayState<C>>>,
}

impl<C: AbstractControl> Clone for FieldArray<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: self.state.clone(),
        }
    }
}

impl<C> Default for FieldArray<C>
where
    C: AbstractControl + Clone,
{
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<C> FieldArray<C>
where
    C: AbstractControl + Clone,
{
    pub fn new<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let mut state = ArrayState {
            slots: Vec::new(),
            baseline: Vec::new(),
            counter: 0,
            errors: Vec::new(),
            validating: false,
            factory: None,
        };
        for field in fields {
            let slot = state.keyed(field);
            state.slots.push(slot);
        }
        state.baseline = state.keys();
        Self {
            id: ControlId::next(),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Like [`FieldArray::new`], with a factory that lets `reset` grow the array.
    pub fn with_factory<I, F>(fields: I, factory: F) -> Self
    where
        I: IntoIterator<Item = C>,
        F: Fn(C::Value) -> C + Send + Sync + 'static,
    {
        let array = Self::new(fields);
        array.set_factory(factory);
        array
    }

    pub fn set_factory<F>(&self, factory: F)
    where
        F: Fn(C::Value) -> C + Send + Sync + 'static,
    {
        write_state(&self.state).factory = Some(Arc::new(factory));
    }

    /// Hands out a fresh key. Every structural insertion calls this once per new slot.
    pub fn next_key(&self) -> SlotKey {
        write_state(&self.state).next_key()
    }

    pub fn len(&self) -> usize {
        read_state(&self.state).slots.len()
    }

    pub fn is_empty(&self) -> bool {
        read_state(&self.state).slots.is_empty()
    }

    pub fn keys(&self) -> Vec<SlotKey> {
        read_state(&self.state).keys()
    }

    pub fn fields(&self) -> Vec<KeyedField<C>> {
        read_state(&self.state).slots.clone()
    }

    pub fn field(&self, index: usize) -> FormResult<KeyedField<C>> {
        let state = read_state(&self.state);
        state.ensure_in_range(index)?;
        Ok(state.slots[index].clone())
    }

    pub fn find(&self, key: SlotKey) -> Option<KeyedField<C>> {
        read_state(&self.state)
            .slots
            .iter()
            .find(|slot| slot.key == key)
            .cloned()
    }

    pub fn position(&self, key: SlotKey) -> Option<usize> {
        read_state(&self.state)
            .slots
            .iter()
            .position(|slot| slot.key == key)
    }

    /// Inserts before the slot at `index`. Appending goes through [`FieldArray::push`].
    pub fn insert(&self, index: usize, field: C) -> FormResult<SlotKey> {
        let mut state = write_state(&self.state);
        state.ensure_in_range(index)?;
        let slot = state.keyed(field);
        let key = slot.key;
        state.slots.insert(index, slot);
        tracing::debug!(array = %self.id, index, key = %key, "inserted array field");
        Ok(key)
    }

    /// Removes the slot at a position, with a key, or holding a given control.
    pub fn remove(&self, target: impl Into<SlotTarget>) -> FormResult<KeyedField<C>> {
        let target = target.into();
        let mut state = write_state(&self.state);
        let index = match target {
            SlotTarget::Index(index) => {
                state.ensure_in_range(index)?;
                Some(index)
            }
            SlotTarget::Key(key) => state.slots.iter().position(|slot| slot.key == key),
            SlotTarget::Control(id) => state.slots.iter().position(|slot| slot.field.id() == id),
        };
        let Some(index) = index else {
            return Err(FormError::SlotNotFound(target.to_string()));
        };
        let removed = state.slots.remove(index);
        tracing::debug!(array = %self.id, index, key = %removed.key, "removed array field");
        Ok(removed)
    }

    pub fn move_field(&self, from: usize, to: usize) -> FormResult<()> {
        let mut state = write_state(&self.state);
        state.ensure_in_range(from)?;
        state.ensure_in_range(to)?;
        let slot = state.slots.remove(from);
        state.slots.insert(to, slot);
        tracing::debug!(array = %self.id, from, to, "moved array field");
        Ok(())
    }

    pub fn swap(&self, a: usize, b: usize) -> FormResult<()> {
        let mut state = write_state(&self.state);
        state.ensure_in_range(a)?;
        state.ensure_in_range(b)?;
        state.slots.swap(a, b);
        tracing::debug!(array = %self.id, a, b, "swapped array fields");
        Ok(())
    }

    /// Replaces the slot at `index` with `field` under a fresh key.
    pub fn set_field(&self, index: usize, field: C) -> FormResult<SlotKey> {
        let mut state = write_state(&self.state);
        state.ensure_in_range(index)?;
        let slot = state.keyed(field);
        let key = slot.key;
        state.slots[index] = slot;
        tracing::debug!(array = %self.id, index, key = %key, "replaced array field");
        Ok(key)
    }

    pub fn push(&self, field: C) -> SlotKey {
        let mut state = write_state(&self.state);
        let slot = state.keyed(field);
        let key = slot.key;
        state.slots.push(slot);
        tracing::debug!(array = %self.id, key = %key, "pushed array field");
        key
    }

    pub fn extend<I>(&self, fields: I) -> Vec<SlotKey>
    where
        I: IntoIterator<Item = C>,
    {
        fields.into_iter().map(|field| self.push(field)).collect()
    }

    pub fn clear(&self) {
        write_state(&self.state).slots.clear();
        tracing::debug!(array = %self.id, "cleared array");
    }

    /// Resets to `values`, building slots for any surplus values with `factory`.
    pub fn reset_with<F>(&self, values: Vec<C::Value>, factory: F) -> FormResult<()>
    where
        F: Fn(C::Value) -> C + Send + Sync + 'static,
    {
        let factory: FieldFactory<C> = Arc::new(factory);
        self.reset_slots(Some(values), Some(factory))
    }

    fn stored_factory(&self) -> Option<FieldFactory<C>> {
        read_state(&self.state).factory.clone()
    }

    fn check_reset(
        &self,
        values: Option<&[C::Value]>,
        factory: Option<&FieldFactory<C>>,
    ) -> FormResult<()> {
        let slots = self.fields();
        match values {
            None => {
                for slot in &slots {
                    slot.field.verify_reset(None)?;
                }
            }
            Some(values) => {
                if values.len() > slots.len() && factory.is_none() {
                    return Err(FormError::MissingFieldFactory {
                        len: slots.len(),
                        requested: values.len(),
                    });
                }
                for (slot, value) in slots.iter().zip(values) {
                    slot.field.verify_reset(Some(value))?;
                }
            }
        }
        Ok(())
    }

    fn reset_slots(
        &self,
        values: Option<Vec<C::Value>>,
        factory: Option<FieldFactory<C>>,
    ) -> FormResult<()> {
        self.check_reset(values.as_deref(), factory.as_ref())?;
        match values {
            None => {
                for slot in self.fields() {
                    slot.field.reset(None)?;
                }
            }
            Some(values) => {
                let kept = {
                    let mut state = write_state(&self.state);
                    state.slots.truncate(values.len());
                    state.slots.clone()
                };
                let mut values = values.into_iter();
                for (slot, value) in kept.iter().zip(values.by_ref()) {
                    slot.field.reset(Some(value))?;
                }
                if let Some(factory) = factory {
                    let extra = values.map(|value| factory(value)).collect::<Vec<_>>();
                    self.extend(extra);
                }
            }
        }
        let mut state = write_state(&self.state);
        state.baseline = state.keys();
        state.errors.clear();
        tracing::debug!(array = %self.id, len = state.slots.len(), "reset array");
        Ok(())
    }
}

impl<C> AbstractControl for FieldArray<C>
where
    C: AbstractControl + Clone,
{
    type Value = Vec<C::Value>;

    fn id(&self) -> ControlId {
        self.id
    }

    fn value(&self) -> Vec<C::Value> {
        self.fields().iter().map(|slot| slot.field.value()).collect()
    }

    fn is_dirty(&self) -> bool {
        self.fields().iter().any(|slot| slot.field.is_dirty())
            || read_state(&self.state).topology_changed()
    }

    fn is_touched(&self) -> bool {
        self.fields().iter().any(|slot| slot.field.is_touched())
            || read_state(&self.state).topology_changed()
    }

    fn is_valid(&self) -> bool {
        read_state(&self.state).errors.is_empty()
            && self.fields().iter().all(|slot| slot.field.is_valid())
    }

    fn is_validating(&self) -> bool {
        read_state(&self.state).validating
            || self.fields().iter().any(|slot| slot.field.is_validating())
    }

    fn errors(&self) -> Vec<String> {
        read_state(&self.state).errors.clone()
    }

    // Values beyond the current length are ignored.
    fn set_value(&self, value: Vec<C::Value>) -> FormResult<()> {
        self.verify_value(&value)?;
        for (slot, next) in self.fields().iter().zip(value) {
            slot.field.set_value(next)?;
        }
        Ok(())
    }

    fn reset(&self, value: Option<Vec<C::Value>>) -> FormResult<()> {
        let factory = self.stored_factory();
        self.reset_slots(value, factory)
    }

    fn set_errors(&self, errors: Vec<String>) {
        write_state(&self.state).errors = errors;
    }

    fn set_validating(&self, validating: bool) {
        write_state(&self.state).validating = validating;
    }

    fn verify_value(&self, value: &Vec<C::Value>) -> FormResult<()> {
        for (slot, next) in self.fields().iter().zip(value) {
            slot.field.verify_value(next)?;
        }
        Ok(())
    }

    fn verify_reset(&self, value: Option<&Vec<C::Value>>) -> FormResult<()> {
        let factory = self.stored_factory();
        self.check_reset(value.map(Vec::as_slice), factory.as_ref())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<C: AbstractControl> Debug for FieldArray<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = read_state(&self.state);
        f.debug_struct("FieldArray")
            .field("id", &self.id)
            .field("keys", &state.keys())
            .field("baseline", &state.baseline)
            .field("errors", &state.errors)
            .finish()
    }
}
