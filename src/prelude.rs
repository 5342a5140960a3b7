pub use crate::form::{
    AbstractControl, AnyControl, FieldArray, FieldGroup, FieldInit, FieldLens, FormError,
    FormField, FormModel, FormResult, FormValidator, FormValidatorOptions, KeyedField, SlotKey,
    SlotTarget, StaleResultPolicy, Validate, ValidationTrigger, erase,
};
