//! Model registry bound to one storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::compiler::compile;
use crate::error::Error;
use crate::model::{BackReference, IntoModelConfig, RegisteredModel};
use crate::record::Record;
use crate::schema::{experiment_models, Declaration, FieldType, ModelConfig};
use crate::storage::{Stamp, StorageAddress, StorageEngine};
use crate::unit_of_work::UnitOfWork;
use crate::value::Value;

/// Registry of the physical models of one storage.
///
/// Registration takes `&mut self` and is meant to happen once at startup.
/// Afterwards the registry is shared read-only and hands out
/// [`UnitOfWork`] scopes, one at a time.
pub struct ModelRegistry {
    storage: StorageEngine,
    models: Vec<Arc<RegisteredModel>>,
    by_name: HashMap<String, usize>,
    by_table: HashMap<String, String>,
    back_references: HashMap<String, Vec<BackReference>>,
    checkout: Mutex<()>,
}

impl ModelRegistry {
    /// Create an empty registry over a storage engine.
    pub fn new(storage: StorageEngine) -> Self {
        Self {
            storage,
            models: Vec::new(),
            by_name: HashMap::new(),
            by_table: HashMap::new(),
            back_references: HashMap::new(),
            checkout: Mutex::new(()),
        }
    }

    /// Create an empty registry bound to a storage address.
    pub fn open(address: &str) -> Result<Self, Error> {
        let address = StorageAddress::parse(address)?;
        Ok(Self::new(StorageEngine::new(address)))
    }

    /// The underlying storage engine.
    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    // ========== Registration ==========

    /// Compile and register a concrete model.
    ///
    /// Fails for abstract configs, already physical models, duplicated
    /// names and tables owned by another model. On failure nothing is
    /// registered.
    pub fn register(&mut self, config: impl IntoModelConfig) -> Result<Arc<RegisteredModel>, Error> {
        let config = config.into_model_config()?;
        if config.is_abstract() {
            return Err(Error::UnsupportedOperation(format!(
                "can't register abstract model '{}'",
                config.name()
            )));
        }
        if self.by_name.contains_key(config.name()) {
            return Err(Error::DuplicateRegistration(config.name().to_string()));
        }
        if let Some(table) = config.table_name() {
            if let Some(owner) = self.by_table.get(table) {
                return Err(Error::DuplicateTable {
                    model: config.name().to_string(),
                    table: table.to_string(),
                    owner: owner.clone(),
                });
            }
        }

        let compiled = compile(&config, self)?;
        let model = Arc::new(RegisteredModel::new(
            config.rebase(),
            compiled.table_name,
            compiled.related_name,
            compiled.columns,
            compiled.relationships,
        ));

        self.by_name
            .insert(model.name().to_string(), self.models.len());
        self.by_table
            .insert(model.table_name().to_string(), model.name().to_string());
        self.models.push(Arc::clone(&model));
        for (target, back_reference) in compiled.back_references {
            self.back_references
                .entry(target)
                .or_default()
                .push(back_reference);
        }

        tracing::info!(
            model = %model.name(),
            table = %model.table_name(),
            columns = model.columns().len(),
            "Registered model"
        );
        Ok(model)
    }

    /// Register several models in order. If one fails, the ones registered
    /// before it are unregistered again.
    pub fn register_all<I, C>(&mut self, configs: I) -> Result<Vec<Arc<RegisteredModel>>, Error>
    where
        I: IntoIterator<Item = C>,
        C: IntoModelConfig,
    {
        let mark = self.models.len();
        let mut registered = Vec::new();
        for config in configs {
            match self.register(config) {
                Ok(model) => registered.push(model),
                Err(e) => {
                    self.truncate(mark);
                    return Err(e);
                }
            }
        }
        Ok(registered)
    }

    fn truncate(&mut self, len: usize) {
        for model in self.models.drain(len..) {
            self.by_name.remove(model.name());
            self.by_table.remove(model.table_name());
            for back_references in self.back_references.values_mut() {
                back_references.retain(|b| b.source != model.name());
            }
            tracing::debug!(model = %model.name(), "Unregistered model");
        }
        self.back_references.retain(|_, b| !b.is_empty());
    }

    /// Compose an anonymous concrete model from `base` and register it.
    pub fn create<N, F>(
        &mut self,
        name: &str,
        base: &ModelConfig,
        fields: impl IntoIterator<Item = (N, F)>,
        table_name: &str,
        related_name: &str,
        extra: BTreeMap<String, Value>,
    ) -> Result<Arc<RegisteredModel>, Error>
    where
        N: Into<String>,
        F: Into<FieldType>,
    {
        let mut declaration = Declaration::extends(name, base)
            .table_name(table_name)
            .related_name(related_name)
            .fields(fields);
        for (key, value) in extra {
            declaration = declaration.extra(key, value);
        }
        self.register(declaration.compose()?)
    }

    /// Look up a model by name.
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredModel>> {
        self.by_name
            .get(name)
            .and_then(|&index| self.models.get(index))
            .cloned()
    }

    /// Look up a model by name, failing if it isn't registered.
    pub fn model(&self, name: &str) -> Result<Arc<RegisteredModel>, Error> {
        self.get(name)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// Registered models in registration order.
    pub fn models(&self) -> &[Arc<RegisteredModel>] {
        &self.models
    }

    /// Collections other models contributed to `name`.
    pub fn back_references(&self, name: &str) -> &[BackReference] {
        self.back_references
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// A fresh, unsaved record of the model.
    pub fn instantiate(&self, name: &str) -> Result<Record, Error> {
        let model = self.model(name)?;
        Ok(Record::new(model, self.collection_names(name)))
    }

    pub(crate) fn collection_names(&self, name: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for back_reference in self.back_references(name) {
            if !names.contains(&back_reference.name) {
                names.push(back_reference.name.clone());
            }
        }
        names
    }

    // ========== Storage Lifecycle ==========

    /// Whether the address is a reserved in-memory address.
    pub fn is_memory_storage(&self) -> bool {
        self.storage.is_memory()
    }

    /// Whether the storage exists. In-memory storages always exist.
    pub fn exists(&self) -> bool {
        self.storage.exists()
    }

    /// Create the storage. Check [`ModelRegistry::exists`] first.
    pub fn create_storage(&self) -> Result<(), Error> {
        self.storage.create()
    }

    /// Drop the storage. In-memory storages are only cleared.
    pub fn drop_storage(&self) -> Result<(), Error> {
        self.storage.drop_storage()
    }

    /// Create the tables of every registered model.
    pub fn create_schema(&self) -> Result<(), Error> {
        let tables: Vec<_> = self.models.iter().map(|m| m.table_schema()).collect();
        self.storage.apply_schema(&tables)?;
        tracing::info!(tables = tables.len(), "Created schema");
        Ok(())
    }

    /// Drop the tables of every registered model.
    pub fn drop_schema(&self) -> Result<(), Error> {
        let tables: Vec<&str> = self.models.iter().map(|m| m.table_name()).collect();
        self.drop_schema_for(&tables)
    }

    /// Drop only the named tables.
    pub fn drop_schema_for(&self, tables: &[&str]) -> Result<(), Error> {
        self.storage.retract_schema(tables)?;
        tracing::info!(tables = tables.len(), "Dropped schema");
        Ok(())
    }

    /// Write the environment stamp. Fails if already stamped.
    pub fn stamp(&self) -> Result<Stamp, Error> {
        let stamp = Stamp::collect();
        self.storage.write_stamp(&stamp)?;
        Ok(stamp)
    }

    /// Read the environment stamp.
    pub fn read_stamp(&self) -> Result<Option<Stamp>, Error> {
        self.storage.read_stamp()
    }

    // ========== Units of Work ==========

    /// Open a unit of work.
    ///
    /// Fails with [`Error::ScopeBusy`] while another unit of work of this
    /// registry is open, nested scopes on the same thread included.
    pub fn open_scope(&self) -> Result<UnitOfWork<'_>, Error> {
        let checkout = self
            .checkout
            .try_lock()
            .ok_or_else(|| Error::ScopeBusy(self.storage.address().to_string()))?;
        UnitOfWork::new(self, checkout)
    }

    /// Run `f` inside a unit of work.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`, and
    /// releases the checkout in both cases.
    pub fn scope<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<T, Error>,
    {
        let mut uow = self.open_scope()?;
        match f(&mut uow) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(e) => {
                uow.rollback();
                Err(e)
            }
        }
    }
}

/// Register `Session`, `Subject`, `Round`, `Group` and `Role`.
///
/// Either all five are registered or none is.
pub fn register_experiment_models(
    registry: &mut ModelRegistry,
) -> Result<Vec<Arc<RegisteredModel>>, Error> {
    registry.register_all(experiment_models()?)
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("storage", &self.storage.address().to_string())
            .field(
                "models",
                &self.models.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PrimitiveType, ROLE_MODEL, ROUND_MODEL, SESSION_MODEL};
    use pretty_assertions::assert_eq;

    fn concrete(name: &str, table: &str) -> Declaration {
        Declaration::new(name).table_name(table).related_name(table)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        let model = registry.register(concrete("Foo", "foos")).unwrap();
        assert_eq!(model.table_name(), "foos");
        assert_eq!(registry.get("Foo").unwrap().name(), "Foo");
        assert!(registry.get("Bar").is_none());
        assert!(matches!(
            registry.model("Bar"),
            Err(Error::UnknownModel(_))
        ));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        registry.register(concrete("Foo", "foos")).unwrap();
        let err = registry.register(concrete("Foo", "others")).unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(ref name) if name == "Foo"));
        assert_eq!(registry.models().len(), 1);
        assert_eq!(registry.get("Foo").unwrap().table_name(), "foos");
    }

    #[test]
    fn test_duplicate_table() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        registry.register(concrete("Foo", "shared")).unwrap();
        let err = registry.register(concrete("Bar", "shared")).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateTable { ref model, ref table, ref owner }
                if model == "Bar" && table == "shared" && owner == "Foo"
        ));
        assert!(registry.get("Bar").is_none());
        assert_eq!(registry.models().len(), 1);

        registry.register(concrete("Bar", "bars")).unwrap();
    }

    #[test]
    fn test_nested_scope_is_busy() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        registry.register(concrete("Foo", "foos")).unwrap();
        registry.create_storage().unwrap();
        registry.create_schema().unwrap();

        let outer = registry.open_scope().unwrap();
        assert!(matches!(registry.open_scope(), Err(Error::ScopeBusy(_))));
        let nested: Result<(), Error> = registry.scope(|_| Ok(()));
        assert!(matches!(nested, Err(Error::ScopeBusy(_))));
        outer.rollback();

        assert!(registry.open_scope().is_ok());
    }

    #[test]
    fn test_register_rejects_abstract_and_physical() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        let abstract_config = Declaration::new("Foo").abstract_model().compose().unwrap();
        assert!(matches!(
            registry.register(&abstract_config),
            Err(Error::UnsupportedOperation(_))
        ));

        let model = registry.register(concrete("Foo", "foos")).unwrap();
        assert!(matches!(
            registry.register(&model),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_failed_registration_leaves_nothing() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        let err = registry
            .register(concrete("Holder", "holders").field("link", FieldType::reference("Link")))
            .unwrap_err();
        assert!(matches!(err, Error::Lookup { .. }));
        assert!(registry.get("Holder").is_none());
        assert!(registry.back_references("Link").is_empty());
    }

    #[test]
    fn test_create_convenience() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        let extra = BTreeMap::from([("weight".to_string(), Value::Float(0.5))]);
        let model = registry
            .create(
                "Foo",
                &ModelConfig::base(),
                [("score", PrimitiveType::Float)],
                "foos",
                "foos",
                extra,
            )
            .unwrap();
        assert!(model.column("score").is_some());
        assert_eq!(model.config().extra().get("weight"), Some(&Value::Float(0.5)));

        let err = registry
            .create(
                "Bar",
                &ModelConfig::base(),
                [("id", PrimitiveType::Integer)],
                "bars",
                "bars",
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Field(_)));
    }

    #[test]
    fn test_back_references() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        registry.register(concrete("Link", "links")).unwrap();
        registry
            .register(
                Declaration::new("Holder")
                    .table_name("holders")
                    .related_name("holders")
                    .field("link", FieldType::reference("Link")),
            )
            .unwrap();

        let refs = registry.back_references("Link");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "holders");
        assert_eq!(refs[0].source, "Holder");
        assert_eq!(refs[0].column, "_link_id");

        let link = registry.instantiate("Link").unwrap();
        assert!(link.has_attribute("holders"));
    }

    #[test]
    fn test_register_experiment_models() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        let models = register_experiment_models(&mut registry).unwrap();
        let tables: Vec<_> = models.iter().map(|m| m.table_name()).collect();
        assert_eq!(tables, vec!["sessions", "subjects", "rounds", "groups", "roles"]);

        let session = registry.instantiate(SESSION_MODEL).unwrap();
        assert!(session.has_attribute("subjects"));
        assert!(session.has_attribute("rounds"));

        let sessions = registry.model(SESSION_MODEL).unwrap().table_schema();
        assert_eq!(sessions.unique, vec!["code"]);
        assert_eq!(sessions.indexes, vec!["code", "experiment_name"]);

        let role = registry.model(ROLE_MODEL).unwrap();
        assert_eq!(role.relationships().len(), 3);
        assert!(role.column("_subject_id").is_some());

        let back: Vec<_> = registry
            .back_references(ROUND_MODEL)
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(back, vec!["groups", "roles"]);
    }

    #[test]
    fn test_experiment_models_all_or_nothing() {
        let mut registry = ModelRegistry::open("sled://").unwrap();
        registry.register(concrete("Taken", "groups")).unwrap();

        let err = register_experiment_models(&mut registry).unwrap_err();
        assert!(matches!(err, Error::DuplicateTable { ref model, .. } if model == "Group"));
        let names: Vec<_> = registry.models().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Taken"]);
        assert!(registry.get(SESSION_MODEL).is_none());
        assert!(registry.back_references(SESSION_MODEL).is_empty());
        assert!(registry.back_references(ROUND_MODEL).is_empty());

        registry.register(concrete("Session", "sessions")).unwrap();
    }

    #[test]
    fn test_memory_storage() {
        let registry = ModelRegistry::open("memory://").unwrap();
        assert!(registry.is_memory_storage());
        assert!(registry.exists());
        registry.drop_storage().unwrap();
        assert!(registry.exists());
    }
}
