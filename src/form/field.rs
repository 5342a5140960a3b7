use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock};

use super::control::{AbstractControl, ControlId, FormResult, read_state, write_state};

/// Construction state for a leaf: the initial value plus whether the field starts disabled.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldInit<T> {
    pub value: T,
    pub disabled: bool,
}

impl<T> FieldInit<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            disabled: false,
        }
    }

    pub fn disabled(value: T) -> Self {
        Self {
            value,
            disabled: true,
        }
    }
}

struct FieldState<T> {
    init_value: T,
    value: T,
    dirty: bool,
    touched: bool,
    disabled: bool,
    validating: bool,
    errors: Vec<String>,
}

impl<T: Clone> FieldState<T> {
    fn restore(&mut self) {
        self.value = self.init_value.clone();
        self.dirty = false;
        self.touched = false;
        self.errors.clear();
    }
}

/// A leaf control holding one opaque value.
///
/// `FormField` is a handle: clones observe and mutate the same field.
pub struct FormField<T> {
    id: ControlId,
    state: Arc<RwLock<FieldState<T>>>,
}

impl<T> Clone for FormField<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: self.state.clone(),
        }
    }
}

impl<T> FormField<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self::from_init(FieldInit::new(value))
    }

    pub fn from_init(init: FieldInit<T>) -> Self {
        Self {
            id: ControlId::next(),
            state: Arc::new(RwLock::new(FieldState {
                init_value: init.value.clone(),
                value: init.value,
                dirty: false,
                touched: false,
                disabled: init.disabled,
                validating: false,
                errors: Vec::new(),
            })),
        }
    }

    /// The dirty baseline and the value `reset(None)` restores.
    pub fn init_value(&self) -> T {
        read_state(&self.state).init_value.clone()
    }

    /// Marks the field touched without changing its value.
    pub fn touch(&self) {
        write_state(&self.state).touched = true;
    }

    pub fn set_disabled(&self, disabled: bool) {
        write_state(&self.state).disabled = disabled;
    }
}

impl<T> From<FieldInit<T>> for FormField<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn from(init: FieldInit<T>) -> Self {
        Self::from_init(init)
    }
}

impl<T> AbstractControl for FormField<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Value = T;

    fn id(&self) -> ControlId {
        self.id
    }

    fn value(&self) -> T {
        read_state(&self.state).value.clone()
    }

    fn is_dirty(&self) -> bool {
        read_state(&self.state).dirty
    }

    fn is_touched(&self) -> bool {
        read_state(&self.state).touched
    }

    fn is_valid(&self) -> bool {
        read_state(&self.state).errors.is_empty()
    }

    fn is_validating(&self) -> bool {
        read_state(&self.state).validating
    }

    fn is_disabled(&self) -> bool {
        read_state(&self.state).disabled
    }

    fn errors(&self) -> Vec<String> {
        read_state(&self.state).errors.clone()
    }

    // Dirty only ever turns on here; writing the baseline back does not clear it.
    fn set_value(&self, value: T) -> FormResult<()> {
        let mut state = write_state(&self.state);
        if value != state.init_value {
            state.dirty = true;
        }
        state.touched = true;
        state.value = value;
        Ok(())
    }

    fn reset(&self, value: Option<T>) -> FormResult<()> {
        let mut state = write_state(&self.state);
        if let Some(value) = value {
            state.init_value = value;
        }
        state.restore();
        Ok(())
    }

    fn set_errors(&self, errors: Vec<String>) {
        write_state(&self.state).errors = errors;
    }

    fn set_validating(&self, validating: bool) {
        write_state(&self.state).validating = validating;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Debug> Debug for FormField<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = read_state(&self.state);
        f.debug_struct("FormField")
            .field("id", &self.id)
            .field("value", &state.value)
            .field("dirty", &state.dirty)
            .field("touched", &state.touched)
            .field("errors", &state.errors)
            .finish()
    }
}
