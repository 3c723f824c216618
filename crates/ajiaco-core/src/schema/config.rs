//! Model declarations and their composition into resolved configs.

use std::collections::BTreeMap;

use super::field::FieldType;
use super::types::PrimitiveType;
use crate::error::FieldError;
use crate::value::Value;

/// Prefix reserved for generated attributes.
pub const RESERVED_PREFIX: char = '_';

/// Name of the root config every declaration starts from.
pub const BASE_MODEL_NAME: &str = "Model";

/// A resolved, immutable model schema descriptor.
///
/// Only produced by [`Declaration::compose`], so every `ModelConfig` already
/// satisfies the naming, redefinition and completeness rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    name: String,
    is_abstract: bool,
    fields: Vec<(String, FieldType)>,
    table_name: Option<String>,
    related_name: Option<String>,
    doc: Option<String>,
    extra: BTreeMap<String, Value>,
}

impl ModelConfig {
    /// The abstract root holding the `id` and `data` fields.
    pub fn base() -> Self {
        Self {
            name: BASE_MODEL_NAME.to_string(),
            is_abstract: true,
            fields: vec![
                ("id".to_string(), FieldType::PrimaryKey),
                (
                    "data".to_string(),
                    FieldType::Primitive(PrimitiveType::Mapping),
                ),
            ],
            table_name: None,
            related_name: None,
            doc: None,
            extra: BTreeMap::new(),
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the model can't be registered.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Resolved fields in declaration order.
    pub fn fields(&self) -> &[(String, FieldType)] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, field_type)| field_type)
    }

    /// Table name (set on concrete models).
    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    /// Name of the back-reference collection this model adds to the models
    /// it references (set on concrete models).
    pub fn related_name(&self) -> Option<&str> {
        self.related_name.as_deref()
    }

    /// Free-form attributes attached at declaration time.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Clone verbatim, skipping validation. Used when binding an already
    /// composed config to a registry.
    pub(crate) fn rebase(&self) -> Self {
        Self {
            name: self.name.clone(),
            is_abstract: self.is_abstract,
            fields: self.fields.clone(),
            table_name: self.table_name.clone(),
            related_name: self.related_name.clone(),
            doc: self.doc.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Human readable description listing every field.
    pub fn describe(&self) -> String {
        let mut lines = vec![
            self.doc
                .clone()
                .unwrap_or_else(|| format!("Model {}", self.name)),
            "Parameters".to_string(),
            "----------".to_string(),
            String::new(),
        ];
        for (name, field_type) in &self.fields {
            let mut line = format!("{} : {}", name, field_type);
            if let FieldType::Column(spec) = field_type {
                if spec.default.is_some() {
                    line.push_str(" (optional)");
                }
                if let Some(doc) = &spec.doc {
                    line.push_str("\n    ");
                    line.push_str(doc);
                }
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::base()
    }
}

#[derive(Debug, Clone)]
enum FieldDecl {
    Typed(FieldType),
    Token(String),
}

/// A model declaration: an ancestor plus field overrides.
///
/// ```ignore
/// let session = Declaration::extends("Session", &base_session())
///     .table_name("sessions")
///     .related_name("sessions")
///     .compose()?;
/// ```
#[derive(Debug, Clone)]
pub struct Declaration {
    name: String,
    ancestor: ModelConfig,
    is_abstract: bool,
    table_name: Option<String>,
    related_name: Option<String>,
    doc: Option<String>,
    fields: Vec<(String, FieldDecl)>,
    extra: BTreeMap<String, Value>,
}

impl Declaration {
    /// Declare a model directly on top of the base config.
    pub fn new(name: impl Into<String>) -> Self {
        Self::extends(name, &ModelConfig::base())
    }

    /// Declare a model extending `ancestor`.
    pub fn extends(name: impl Into<String>, ancestor: &ModelConfig) -> Self {
        Self {
            name: name.into(),
            ancestor: ancestor.clone(),
            is_abstract: false,
            table_name: None,
            related_name: None,
            doc: None,
            fields: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Mark the declaration abstract.
    pub fn abstract_model(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Set the table name.
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Set the related name.
    pub fn related_name(mut self, related_name: impl Into<String>) -> Self {
        self.related_name = Some(related_name.into());
        self
    }

    /// Set the description header.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Declare or override a field.
    pub fn field(mut self, name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        self.fields
            .push((name.into(), FieldDecl::Typed(field_type.into())));
        self
    }

    /// Declare or override a field by kind token.
    pub fn field_token(mut self, name: impl Into<String>, token: impl Into<String>) -> Self {
        self.fields
            .push((name.into(), FieldDecl::Token(token.into())));
        self
    }

    /// Declare several fields at once.
    pub fn fields<N, T>(mut self, fields: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<String>,
        T: Into<FieldType>,
    {
        for (name, field_type) in fields {
            self = self.field(name, field_type);
        }
        self
    }

    /// Attach a free-form attribute.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Resolve the declaration against its ancestor.
    pub fn compose(self) -> Result<ModelConfig, FieldError> {
        let Declaration {
            name,
            ancestor,
            is_abstract,
            table_name,
            related_name,
            doc,
            fields: overrides,
            extra,
        } = self;

        let (table_name, related_name) = if is_abstract {
            (None, None)
        } else {
            (
                Some(require(&name, table_name, "table_name")?),
                Some(require(&name, related_name, "related_name")?),
            )
        };

        let mut fields = ancestor.fields;
        for (field_name, decl) in overrides {
            if field_name.is_empty() {
                return Err(FieldError::EmptyName { model: name });
            }
            if field_name.starts_with(RESERVED_PREFIX) {
                return Err(FieldError::ReservedPrefix {
                    model: name,
                    field: field_name,
                });
            }
            let field_type = match decl {
                FieldDecl::Typed(field_type) => field_type,
                FieldDecl::Token(token) => match FieldType::from_token(&token) {
                    Some(field_type) => field_type,
                    None => {
                        return Err(FieldError::InvalidType {
                            model: name,
                            field: field_name,
                            kind: token,
                        })
                    }
                },
            };
            match fields.iter_mut().find(|(existing, _)| *existing == field_name) {
                Some((_, existing)) if !existing.is_abstract() => {
                    return Err(FieldError::Redefinition {
                        model: name,
                        field: field_name,
                    });
                }
                Some((_, existing)) => *existing = field_type,
                None => fields.push((field_name, field_type)),
            }
        }

        if !is_abstract {
            if let Some((field_name, _)) = fields.iter().find(|(_, t)| t.is_abstract()) {
                return Err(FieldError::UnresolvedAbstract {
                    model: name,
                    field: field_name.clone(),
                });
            }
        }

        tracing::debug!(
            model = %name,
            is_abstract,
            fields = fields.len(),
            "Composed model config"
        );

        Ok(ModelConfig {
            name,
            is_abstract,
            fields,
            table_name,
            related_name,
            doc,
            extra,
        })
    }
}

fn require(
    model: &str,
    value: Option<String>,
    attribute: &'static str,
) -> Result<String, FieldError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(FieldError::MissingAttribute {
            model: model.to_string(),
            attribute,
        }),
    }
}
