//! Ajiaco Core - declarative models, schema compilation and units of work.
//!
//! Models are declared with [`Declaration`], composed into [`ModelConfig`]s,
//! compiled into physical tables by a [`ModelRegistry`] and read or written
//! through a [`UnitOfWork`] over an embedded sled storage.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod codec;
pub mod column;
pub mod compiler;
pub mod error;
pub mod model;
pub mod record;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod tracked;
pub mod unit_of_work;
pub mod value;

pub use column::ColumnDef;
pub use compiler::{compile, CompiledModel};
pub use error::{Error, FieldError, Result};
pub use model::{BackReference, Cardinality, IntoModelConfig, RegisteredModel, RelationshipDef};
pub use record::Record;
pub use registry::{register_experiment_models, ModelRegistry};
pub use schema::{
    experiment_models, ColumnSpec, ContainerKind, Declaration, DefaultValue, FieldType,
    ModelConfig, PrimitiveType, StorageKind,
};
pub use storage::{Stamp, StorageAddress, StorageConfig, StorageEngine};
pub use tracked::{TrackedList, TrackedMapping, TrackedSet};
pub use unit_of_work::{Handle, UnitOfWork};
pub use value::Value;
