mod array;
mod control;
mod field;
mod group;
mod model;
mod trigger;
mod validation;


pub use array::{FieldArray, FieldFactory, KeyedField, SlotKey, SlotTarget};
pub use control::{AbstractControl, AnyControl, ControlId, FormError, FormResult, erase};
pub use field::{FieldInit, FormField};
pub use group::{FieldGroup, FieldGroupBuilder};
pub use model::{FieldKey, FieldLens, FormModel};
pub use reactive_form_derive::FormModel;
pub use trigger::{RegistrationId, ValidationTrigger};
pub use validation::{
    AsyncValidatorFn, BoxError, BoxedValidationFuture, FormValidator, FormValidatorOptions,
    StaleResultPolicy, Validate, ValidationTicket, ValidatorFn,
};
