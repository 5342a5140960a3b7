use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::control::{
    AbstractControl, AnyControl, ControlId, FormResult, erase, read_state, write_state,
};
use super::model::FieldLens;

#[derive(Default)]
struct GroupState {
    fields: IndexMap<String, AnyControl>,
    errors: Vec<String>,
    validating: bool,
}

/// A composite of named child controls.
///
/// Children keep their insertion order; replacing an existing key keeps its position. The
/// group's value is the object `{key: child.value}` over whatever children it holds right now.
#[derive(Clone)]
pub struct FieldGroup {
    id: ControlId,
    state: Arc<RwLock<GroupState>>,
}

impl Default for FieldGroup {
    fn default() -> Self {
        Self::from_fields(IndexMap::new())
    }
}

impl FieldGroup {
    pub fn new<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, AnyControl)>,
        K: Into<String>,
    {
        Self::from_fields(
            fields
                .into_iter()
                .map(|(key, field)| (key.into(), field))
                .collect(),
        )
    }

    pub fn builder() -> FieldGroupBuilder {
        FieldGroupBuilder::default()
    }

    fn from_fields(fields: IndexMap<String, AnyControl>) -> Self {
        Self {
            id: ControlId::next(),
            state: Arc::new(RwLock::new(GroupState {
                fields,
                ..GroupState::default()
            })),
        }
    }

    /// Typed lookup; `None` when the key is absent or holds a different control type.
    pub fn field<C>(&self, key: &str) -> Option<C>
    where
        C: AbstractControl + Clone,
    {
        self.control(key)?.as_any().downcast_ref::<C>().cloned()
    }

    pub fn field_by<L: FieldLens>(&self, lens: L) -> Option<L::Control> {
        self.field::<L::Control>(lens.key().as_str())
    }

    pub fn control(&self, key: &str) -> Option<AnyControl> {
        read_state(&self.state).fields.get(key).cloned()
    }

    pub fn fields(&self) -> Vec<(String, AnyControl)> {
        read_state(&self.state)
            .fields
            .iter()
            .map(|(key, field)| (key.clone(), field.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        read_state(&self.state).fields.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        read_state(&self.state).fields.len()
    }

    pub fn is_empty(&self) -> bool {
        read_state(&self.state).fields.is_empty()
    }

    pub fn contains_field(&self, key: &str) -> bool {
        read_state(&self.state).fields.contains_key(key)
    }

    /// Adding a field is not a dirtying act; only the new child's own state counts.
    pub fn add_field<C>(&self, key: impl Into<String>, field: C)
    where
        C: AbstractControl,
        C::Value: Serialize + DeserializeOwned,
    {
        self.set_field(key, field);
    }

    /// Replaces or inserts a child and hands back the one it displaced.
    pub fn set_field<C>(&self, key: impl Into<String>, field: C) -> Option<AnyControl>
    where
        C: AbstractControl,
        C::Value: Serialize + DeserializeOwned,
    {
        let key = key.into();
        tracing::debug!(group = %self.id, key = %key, "setting group field");
        write_state(&self.state).fields.insert(key, erase(field))
    }

    /// Replaces the whole child map.
    pub fn set_fields<I, K>(&self, fields: I)
    where
        I: IntoIterator<Item = (K, AnyControl)>,
        K: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(key, field)| (key.into(), field))
            .collect::<IndexMap<_, _>>();
        tracing::debug!(group = %self.id, len = fields.len(), "replacing group fields");
        write_state(&self.state).fields = fields;
    }

    pub fn remove_field(&self, key: &str) -> Option<AnyControl> {
        tracing::debug!(group = %self.id, key = %key, "removing group field");
        write_state(&self.state).fields.shift_remove(key)
    }

    fn any_field(&self, predicate: impl Fn(&AnyControl) -> bool) -> bool {
        self.fields().iter().any(|(_, field)| predicate(field))
    }
}

impl AbstractControl for FieldGroup {
    type Value = Map<String, Value>;

    fn id(&self) -> ControlId {
        self.id
    }

    fn value(&self) -> Map<String, Value> {
        self.fields()
            .into_iter()
            .map(|(key, field)| (key, field.value()))
            .collect()
    }

    fn is_dirty(&self) -> bool {
        self.any_field(|field| field.is_dirty())
    }

    fn is_touched(&self) -> bool {
        self.any_field(|field| field.is_touched())
    }

    fn is_valid(&self) -> bool {
        read_state(&self.state).errors.is_empty() && !self.any_field(|field| !field.is_valid())
    }

    fn is_validating(&self) -> bool {
        read_state(&self.state).validating || self.any_field(|field| field.is_validating())
    }

    fn errors(&self) -> Vec<String> {
        read_state(&self.state).errors.clone()
    }

    // Keys without a matching child are ignored; children missing from `value` are left alone.
    fn set_value(&self, value: Map<String, Value>) -> FormResult<()> {
        self.verify_value(&value)?;
        for (key, field) in self.fields() {
            if let Some(next) = value.get(&key) {
                field.set_value(next.clone())?;
            }
        }
        Ok(())
    }

    // Never adds or removes children: a field removed earlier stays removed.
    fn reset(&self, value: Option<Map<String, Value>>) -> FormResult<()> {
        self.verify_reset(value.as_ref())?;
        for (key, field) in self.fields() {
            let next = value.as_ref().and_then(|value| value.get(&key)).cloned();
            field.reset(next)?;
        }
        write_state(&self.state).errors.clear();
        Ok(())
    }

    fn set_errors(&self, errors: Vec<String>) {
        write_state(&self.state).errors = errors;
    }

    fn set_validating(&self, validating: bool) {
        write_state(&self.state).validating = validating;
    }

    fn verify_value(&self, value: &Map<String, Value>) -> FormResult<()> {
        for (key, field) in self.fields() {
            if let Some(next) = value.get(&key) {
                field.verify_value(next)?;
            }
        }
        Ok(())
    }

    fn verify_reset(&self, value: Option<&Map<String, Value>>) -> FormResult<()> {
        for (key, field) in self.fields() {
            field.verify_reset(value.and_then(|value| value.get(&key)))?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Debug for FieldGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldGroup")
            .field("id", &self.id)
            .field("keys", &self.keys())
            .field("errors", &self.errors())
            .finish()
    }
}

#[derive(Default)]
pub struct FieldGroupBuilder {
    fields: IndexMap<String, AnyControl>,
}

impl FieldGroupBuilder {
    pub fn field<C>(mut self, key: impl Into<String>, field: C) -> Self
    where
        C: AbstractControl,
        C::Value: Serialize + DeserializeOwned,
    {
        self.fields.insert(key.into(), erase(field));
        self
    }

    pub fn build(self) -> FieldGroup {
        FieldGroup::from_fields(self.fields)
    }
}
