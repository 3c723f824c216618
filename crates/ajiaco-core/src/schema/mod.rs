//! Model declarations: type mapping, fields and config composition.
//!
//! A model is declared as a [`Declaration`] on top of an ancestor
//! [`ModelConfig`] and resolved with [`Declaration::compose`]. The result is
//! storage independent and can be registered against any number of
//! registries.

pub mod config;
pub mod domain;
pub mod field;
pub mod types;

pub use config::{Declaration, ModelConfig, BASE_MODEL_NAME, RESERVED_PREFIX};
pub use domain::{
    base_group, base_role, base_round, base_session, base_subject, experiment_models,
    GROUP_MODEL, ROLE_MODEL, ROUND_MODEL, SESSION_MODEL, SUBJECT_MODEL,
};
pub use field::{short_code, ColumnSpec, DefaultValue, FieldType};
pub use types::{ContainerKind, PrimitiveType, StorageKind, TypeMapping};
