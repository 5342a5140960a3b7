//! A reactive control tree for dynamically shaped forms.
//!
//! Leaves ([`form::FormField`]) hold one value each; [`form::FieldGroup`] and
//! [`form::FieldArray`] compose them and derive dirty, touched, valid and validating state from
//! their children on every read. [`form::FormValidator`] runs sync and async validators against
//! any node, and [`form::ValidationTrigger`] fans validation out to many of them at once.

pub mod form;
pub mod prelude;
