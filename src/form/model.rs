use std::fmt::{Display, Formatter};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::control::{AbstractControl, FormError, FormResult};
use super::group::FieldGroup;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl AsRef<str> for FieldKey {
    fn as_ref(&self) -> &str {
        self.0
    }
}

/// Names one child of a [`FieldGroup`] together with the concrete control stored there.
pub trait FieldLens: Copy + Send + Sync + 'static {
    type Control: AbstractControl + Clone;

    fn key(self) -> FieldKey;
}

/// A plain struct that can be projected into a [`FieldGroup`] and read back out of one.
pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;

    /// Builds a group holding one leaf per struct field, initialised from `self`.
    fn form_group(&self) -> FieldGroup;

    fn from_group(group: &FieldGroup) -> FormResult<Self>
    where
        Self: DeserializeOwned,
    {
        serde_json::from_value(Value::Object(group.value())).map_err(|error| {
            FormError::ValueMismatch {
                control: group.id(),
                reason: error.to_string(),
            }
        })
    }
}
