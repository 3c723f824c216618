//! Abstract templates of the experiment domain.
//!
//! Each template leaves its references abstract; a concrete descendant binds
//! them to registered models. [`experiment_models`] does so for the default
//! set of tables.

use super::config::{Declaration, ModelConfig};
use super::field::{ColumnSpec, DefaultValue, FieldType};
use super::types::StorageKind;
use crate::error::FieldError;
use crate::value::Value;

/// Name of the concrete session model.
pub const SESSION_MODEL: &str = "Session";
/// Name of the concrete subject model.
pub const SUBJECT_MODEL: &str = "Subject";
/// Name of the concrete round model.
pub const ROUND_MODEL: &str = "Round";
/// Name of the concrete group model.
pub const GROUP_MODEL: &str = "Group";
/// Name of the concrete role model.
pub const ROLE_MODEL: &str = "Role";

fn code() -> ColumnSpec {
    ColumnSpec::new(StorageKind::VarChar(30))
        .unique()
        .with_index()
        .with_default(DefaultValue::ShortCode)
}

fn required(kind: StorageKind) -> ColumnSpec {
    ColumnSpec::new(kind).not_null()
}

/// Template of an experiment session: one run of an experiment with
/// several subjects.
pub fn base_session() -> Result<ModelConfig, FieldError> {
    Declaration::new("BaseSession")
        .abstract_model()
        .doc("Base model of an experiment session.")
        .field("code", code())
        .field(
            "experiment_name",
            required(StorageKind::VarChar(255)).with_index(),
        )
        .field("subjects_number", required(StorageKind::Integer))
        .field("demo", required(StorageKind::Boolean))
        .field("len_stages", required(StorageKind::Integer))
        .compose()
}

/// Template of a subject: a participant of one session.
pub fn base_subject() -> Result<ModelConfig, FieldError> {
    Declaration::new("BaseSubject")
        .abstract_model()
        .doc("Base model of a subject taking part in a session.")
        .field("code", code())
        .field(
            "current_stage",
            required(StorageKind::Integer).with_default(DefaultValue::Value(Value::Integer(0))),
        )
        .field("session", FieldType::Abstract)
        .compose()
}

/// Template of a round: one game played inside a session.
pub fn base_round() -> Result<ModelConfig, FieldError> {
    Declaration::new("BaseRound")
        .abstract_model()
        .doc("Base model of a game round inside a session.")
        .field("game_name", required(StorageKind::VarChar(255)))
        .field("part", required(StorageKind::Integer))
        .field("number", required(StorageKind::Integer))
        .field("is_first", required(StorageKind::Boolean))
        .field("is_last", required(StorageKind::Boolean))
        .field("session", FieldType::Abstract)
        .compose()
}

/// Template of a group of interacting subjects within a round.
pub fn base_group() -> Result<ModelConfig, FieldError> {
    Declaration::new("BaseGroup")
        .abstract_model()
        .doc("Base model of a group of subjects within a round.")
        .field("round", FieldType::Abstract)
        .compose()
}

/// Template of a role: a subject inside a group.
pub fn base_role() -> Result<ModelConfig, FieldError> {
    Declaration::new("BaseRole")
        .abstract_model()
        .doc("Base model of the role a subject plays inside a group.")
        .field("number", required(StorageKind::Integer))
        .field("in_group_number", required(StorageKind::Integer))
        .field("group", FieldType::Abstract)
        .field("round", FieldType::Abstract)
        .field("subject", FieldType::Abstract)
        .compose()
}

/// Concrete `Session`, `Subject`, `Round`, `Group` and `Role` declarations
/// in dependency order, every abstract reference bound.
pub fn experiment_models() -> Result<Vec<Declaration>, FieldError> {
    Ok(vec![
        Declaration::extends(SESSION_MODEL, &base_session()?)
            .table_name("sessions")
            .related_name("sessions"),
        Declaration::extends(SUBJECT_MODEL, &base_subject()?)
            .table_name("subjects")
            .related_name("subjects")
            .field("session", FieldType::reference(SESSION_MODEL)),
        Declaration::extends(ROUND_MODEL, &base_round()?)
            .table_name("rounds")
            .related_name("rounds")
            .field("session", FieldType::reference(SESSION_MODEL)),
        Declaration::extends(GROUP_MODEL, &base_group()?)
            .table_name("groups")
            .related_name("groups")
            .field("round", FieldType::reference(ROUND_MODEL)),
        Declaration::extends(ROLE_MODEL, &base_role()?)
            .table_name("roles")
            .related_name("roles")
            .field("group", FieldType::reference(GROUP_MODEL))
            .field("round", FieldType::reference(ROUND_MODEL))
            .field("subject", FieldType::reference(SUBJECT_MODEL)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PrimitiveType;
    use pretty_assertions::assert_eq;

    fn names(config: &ModelConfig) -> Vec<&str> {
        config.fields().iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_template_fields() {
        assert_eq!(
            names(&base_session().unwrap()),
            vec![
                "id",
                "data",
                "code",
                "experiment_name",
                "subjects_number",
                "demo",
                "len_stages"
            ]
        );
        assert_eq!(
            names(&base_role().unwrap()),
            vec!["id", "data", "number", "in_group_number", "group", "round", "subject"]
        );
        assert!(base_group().unwrap().is_abstract());
    }

    #[test]
    fn test_subject_defaults() {
        let subject = base_subject().unwrap();
        match subject.field("current_stage") {
            Some(FieldType::Column(spec)) => {
                assert!(!spec.nullable);
                assert_eq!(spec.default, Some(DefaultValue::Value(Value::Integer(0))));
            }
            other => panic!("unexpected field {:?}", other),
        }
        assert_eq!(subject.field("session"), Some(&FieldType::Abstract));
    }

    #[test]
    fn test_unresolved_template_cannot_be_concrete() {
        let err = Declaration::extends("Subject", &base_subject().unwrap())
            .table_name("subjects")
            .related_name("subjects")
            .compose()
            .unwrap_err();
        assert!(matches!(err, FieldError::UnresolvedAbstract { ref field, .. } if field == "session"));
    }

    #[test]
    fn test_template_field_cannot_be_redefined() {
        let err = Declaration::extends("Session", &base_session().unwrap())
            .table_name("sessions")
            .related_name("sessions")
            .field("demo", PrimitiveType::Integer)
            .compose()
            .unwrap_err();
        assert!(matches!(err, FieldError::Redefinition { ref field, .. } if field == "demo"));
    }

    #[test]
    fn test_templates_require_and_lock_references() {
        let templates = [
            (base_subject().unwrap(), vec!["session"]),
            (base_round().unwrap(), vec!["session"]),
            (base_group().unwrap(), vec!["round"]),
            (base_role().unwrap(), vec!["group", "round", "subject"]),
        ];
        for (template, references) in templates {
            let concrete = || {
                Declaration::extends("Concrete", &template)
                    .table_name("concretes")
                    .related_name("concretes")
            };
            assert!(matches!(
                concrete().compose(),
                Err(FieldError::UnresolvedAbstract { .. })
            ));

            let mut declaration = concrete();
            for reference in &references {
                declaration = declaration.field(*reference, FieldType::reference("Target"));
            }
            let resolved = declaration.compose().unwrap();

            let err = Declaration::extends("Again", &resolved)
                .table_name("agains")
                .related_name("agains")
                .field(references[0], FieldType::reference("Other"))
                .compose()
                .unwrap_err();
            assert!(matches!(err, FieldError::Redefinition { .. }));
        }
    }

    #[test]
    fn test_experiment_models_compose() {
        let declarations = experiment_models().unwrap();
        let configs: Vec<_> = declarations
            .into_iter()
            .map(|d| d.compose().unwrap())
            .collect();
        let tables: Vec<_> = configs.iter().filter_map(|c| c.table_name()).collect();
        assert_eq!(tables, vec!["sessions", "subjects", "rounds", "groups", "roles"]);
        assert!(configs.iter().all(|c| !c.is_abstract()));
        assert_eq!(
            configs[4].field("subject"),
            Some(&FieldType::reference(SUBJECT_MODEL))
        );
    }
}
