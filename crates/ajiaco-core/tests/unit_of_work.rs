//! Unit-of-work behaviour against in-memory storages.

use ajiaco_core::{
    ColumnSpec, Declaration, DefaultValue, Error, FieldType, ModelRegistry, PrimitiveType,
    StorageKind, Value,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

fn registry_with(declarations: Vec<Declaration>) -> ModelRegistry {
    let mut registry = ModelRegistry::open("sled://").unwrap();
    for declaration in declarations {
        registry.register(declaration).unwrap();
    }
    registry.create_storage().unwrap();
    registry.create_schema().unwrap();
    registry
}

fn foo() -> Declaration {
    Declaration::new("Foo")
        .table_name("foos")
        .related_name("foos")
        .field("numbers", PrimitiveType::List)
        .field("tags", PrimitiveType::Set)
        .field("pair", PrimitiveType::Tuple)
        .field("frozen", PrimitiveType::FrozenSet)
        .field("score", PrimitiveType::Float)
}

#[test]
fn first_id_is_one_and_ids_increase() {
    let registry = registry_with(vec![foo()]);
    let mut uow = registry.open_scope().unwrap();
    let a = uow.create("Foo").unwrap();
    let b = uow.create("Foo").unwrap();
    assert_eq!(uow.record(a).unwrap().id(), None);
    uow.flush().unwrap();
    assert_eq!(uow.record(a).unwrap().id(), Some(1));
    assert_eq!(uow.record(b).unwrap().id(), Some(2));
    uow.commit().unwrap();

    let mut uow = registry.open_scope().unwrap();
    let c = uow.create("Foo").unwrap();
    uow.flush().unwrap();
    assert_eq!(uow.record(c).unwrap().id(), Some(3));
}

#[test]
fn list_mutation_is_persisted() {
    let registry = registry_with(vec![foo()]);

    registry
        .scope(|uow| {
            let handle = uow.create("Foo")?;
            uow.record_mut(handle)?.set("numbers", Value::list([1]))?;
            Ok(())
        })
        .unwrap();

    registry
        .scope(|uow| {
            let handle = uow.get("Foo", 1)?;
            let record = uow.record_mut(handle)?;
            let mut numbers = record.list_mut("numbers")?;
            numbers.append(2);
            numbers.extend([3, 4, 5]);
            numbers.pop();
            Ok(())
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    let handle = uow.get("Foo", 1).unwrap();
    assert_eq!(
        uow.record(handle).unwrap().get("numbers").unwrap(),
        &Value::list([1, 2, 3, 4])
    );
}

#[test]
fn mapping_and_set_mutations_are_persisted() {
    let registry = registry_with(vec![foo()]);
    registry
        .scope(|uow| {
            let handle = uow.create("Foo")?;
            let record = uow.record_mut(handle)?;
            record.set("data", Value::empty_mapping())?;
            record.set("tags", Value::set(["a"]))?;
            Ok(())
        })
        .unwrap();

    registry
        .scope(|uow| {
            let handle = uow.get("Foo", 1)?;
            let record = uow.record_mut(handle)?;
            record.mapping_mut("data")?.insert("foo", Value::list([1, 2, 3]));
            record.set_mut("tags")?.update(["b", "a"]);
            Ok(())
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    let handle = uow.get("Foo", 1).unwrap();
    let record = uow.record(handle).unwrap();
    assert_eq!(
        record.get("data").unwrap(),
        &Value::mapping([("foo", Value::list([1, 2, 3]))])
    );
    assert_eq!(record.get("tags").unwrap(), &Value::set(["b", "a"]));
}

#[test]
fn null_into_container_fails_at_commit() {
    let registry = registry_with(vec![foo()]);
    registry
        .scope(|uow| {
            let handle = uow.create("Foo")?;
            uow.record_mut(handle)?.set("numbers", Value::list([1]))?;
            Ok(())
        })
        .unwrap();

    for column in ["numbers", "tags", "pair", "frozen", "data"] {
        let mut uow = registry.open_scope().unwrap();
        let handle = uow.get("Foo", 1).unwrap();
        // Accepted on assignment, rejected on commit.
        uow.record_mut(handle).unwrap().set(column, Value::Null).unwrap();
        let err = uow.commit().unwrap_err();
        assert!(
            matches!(err, Error::StorageConstraint { column: ref c, .. } if c == column),
            "{column}: {err:?}"
        );
    }

    let mut uow = registry.open_scope().unwrap();
    let handle = uow.get("Foo", 1).unwrap();
    assert_eq!(
        uow.record(handle).unwrap().get("numbers").unwrap(),
        &Value::list([1])
    );
}

#[test]
fn wrong_container_kind_fails_at_commit() {
    let registry = registry_with(vec![foo()]);
    let mut uow = registry.open_scope().unwrap();
    let handle = uow.create("Foo").unwrap();
    uow.record_mut(handle)
        .unwrap()
        .set("pair", Value::list([1, 2]))
        .unwrap();
    assert!(matches!(
        uow.commit(),
        Err(Error::StorageConstraint { .. })
    ));
}

#[test]
fn float_column_accepts_integers() {
    let registry = registry_with(vec![foo()]);
    registry
        .scope(|uow| {
            let handle = uow.create("Foo")?;
            uow.record_mut(handle)?.set("score", 3)?;
            Ok(())
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    let handle = uow.get("Foo", 1).unwrap();
    assert_eq!(
        uow.record(handle).unwrap().get_f64("score").unwrap(),
        Some(3.0)
    );
}

#[test]
fn scope_rolls_back_on_error() {
    let registry = registry_with(vec![foo()]);
    let result: Result<(), Error> = registry.scope(|uow| {
        uow.create("Foo")?;
        uow.flush()?;
        Err(Error::InvalidValue("boom".into()))
    });
    assert!(result.is_err());

    let mut uow = registry.open_scope().unwrap();
    assert!(uow.all("Foo").unwrap().is_empty());
    assert!(matches!(uow.get("Foo", 1), Err(Error::NotFound { .. })));
}

#[test]
fn dropped_scope_discards_writes() {
    let registry = registry_with(vec![foo()]);
    {
        let mut uow = registry.open_scope().unwrap();
        uow.create("Foo").unwrap();
        uow.flush().unwrap();
    }
    let mut uow = registry.open_scope().unwrap();
    assert!(uow.all("Foo").unwrap().is_empty());
}

#[test]
fn identity_map_returns_same_handle() {
    let registry = registry_with(vec![foo()]);
    registry
        .scope(|uow| uow.create("Foo").map(|_| ()))
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    let a = uow.get("Foo", 1).unwrap();
    let b = uow.get("Foo", 1).unwrap();
    let all = uow.all("Foo").unwrap();
    assert_eq!(a, b);
    assert_eq!(all, vec![a]);
}

#[test]
fn delete_removes_row() {
    let registry = registry_with(vec![foo()]);
    registry
        .scope(|uow| {
            uow.create("Foo")?;
            uow.create("Foo")?;
            Ok(())
        })
        .unwrap();

    registry
        .scope(|uow| {
            let handle = uow.get("Foo", 1)?;
            uow.delete(handle)
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    assert!(matches!(uow.get("Foo", 1), Err(Error::NotFound { .. })));
    let remaining: Vec<_> = uow
        .all("Foo")
        .unwrap()
        .into_iter()
        .map(|h| uow.record(h).unwrap().id())
        .collect();
    assert_eq!(remaining, vec![Some(2)]);
}

#[test]
fn missing_table_fails_flush() {
    let mut registry = ModelRegistry::open("sled://").unwrap();
    registry.register(foo()).unwrap();
    let mut uow = registry.open_scope().unwrap();
    uow.create("Foo").unwrap();
    assert!(matches!(uow.flush(), Err(Error::MissingTable(ref t)) if t == "foos"));
}

fn link_and_holder() -> Vec<Declaration> {
    vec![
        Declaration::new("Link").table_name("links").related_name("links"),
        Declaration::new("Holder")
            .table_name("holders")
            .related_name("holders")
            .field("link", FieldType::reference("Link")),
    ]
}

#[test]
fn references_and_back_references() {
    let registry = registry_with(link_and_holder());

    registry
        .scope(|uow| {
            let link = uow.create("Link")?;
            for _ in 0..2 {
                let holder = uow.create("Holder")?;
                uow.set_reference(holder, "link", link)?;
            }
            Ok(())
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    let link = uow.get("Link", 1).unwrap();
    let holders = uow.back_reference(link, "holders").unwrap();
    assert_eq!(holders.len(), 2);
    for holder in holders {
        assert_eq!(uow.related(holder, "link").unwrap(), Some(link));
        assert_eq!(
            uow.record(holder).unwrap().get("_link_id").unwrap(),
            &Value::Integer(1)
        );
    }

    let by_relationship = uow.find_all("Holder", "link", 1).unwrap();
    assert_eq!(by_relationship.len(), 2);
}

#[test]
fn back_reference_on_pending_record_flushes() {
    let registry = registry_with(link_and_holder());
    let mut uow = registry.open_scope().unwrap();
    let link = uow.create("Link").unwrap();
    let holder = uow.create("Holder").unwrap();
    uow.set_reference(holder, "link", link).unwrap();

    assert_eq!(uow.back_reference(link, "holders").unwrap(), vec![holder]);
    assert_eq!(uow.record(link).unwrap().id(), Some(1));
}

#[test]
fn missing_reference_fails_not_null() {
    let registry = registry_with(link_and_holder());
    let mut uow = registry.open_scope().unwrap();
    uow.create("Holder").unwrap();
    assert!(matches!(
        uow.commit(),
        Err(Error::StorageConstraint { ref column, .. }) if column == "_link_id"
    ));
}

#[test]
fn dangling_foreign_key_is_rejected() {
    let registry = registry_with(link_and_holder());
    let mut uow = registry.open_scope().unwrap();
    let holder = uow.create("Holder").unwrap();
    uow.record_mut(holder).unwrap().set("_link_id", 42).unwrap();
    let err = uow.commit().unwrap_err();
    assert!(matches!(
        err,
        Error::StorageConstraint { ref reason, .. } if reason.contains("FOREIGN KEY")
    ));
}

#[test]
fn reference_to_wrong_model_is_rejected() {
    let registry = registry_with(link_and_holder());
    let mut uow = registry.open_scope().unwrap();
    let a = uow.create("Holder").unwrap();
    let b = uow.create("Holder").unwrap();
    assert!(matches!(
        uow.set_reference(a, "link", b),
        Err(Error::InvalidValue(_))
    ));
    assert!(matches!(
        uow.back_reference(a, "nothing"),
        Err(Error::UnknownAttribute { .. })
    ));
}

#[test]
fn session_shaped_model_round_trip() {
    let registry = registry_with(vec![Declaration::new("Session")
        .table_name("sessions")
        .related_name("sessions")
        .field_token("experiment_name", "text")
        .field_token("subjects_number", "integer")
        .field_token("demo", "boolean")
        .field_token("len_stages", "integer")]);

    registry
        .scope(|uow| {
            let handle = uow.create("Session")?;
            let session = uow.record_mut(handle)?;
            session.set("experiment_name", "foo")?;
            session.set("subjects_number", 42)?;
            session.set("demo", true)?;
            session.set("len_stages", 716)?;
            session.set("data", Value::mapping([("foo", Value::list([1, 2, 3]))]))?;
            Ok(())
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    let handle = uow.get("Session", 1).unwrap();
    let session = uow.record(handle).unwrap();
    assert_eq!(session.get("experiment_name").unwrap(), &Value::from("foo"));
    assert_eq!(session.get("subjects_number").unwrap(), &Value::Integer(42));
    assert_eq!(session.get("demo").unwrap(), &Value::Boolean(true));
    assert_eq!(session.get("len_stages").unwrap(), &Value::Integer(716));
    assert_eq!(
        session.get("data").unwrap(),
        &Value::mapping([("foo", Value::list([1, 2, 3]))])
    );
}

#[test]
fn models_cannot_share_a_table() {
    let mut registry = ModelRegistry::open("sled://").unwrap();
    registry.register(foo()).unwrap();
    let err = registry
        .register(Declaration::new("Bar").table_name("foos").related_name("bars"))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateTable { ref owner, .. } if owner == "Foo"));
    assert!(matches!(registry.model("Bar"), Err(Error::UnknownModel(_))));
}

#[test]
fn nested_scope_fails_instead_of_blocking() {
    let registry = registry_with(vec![foo()]);
    let result: Result<(), Error> = registry.scope(|uow| {
        uow.create("Foo")?;
        registry.scope(|inner| inner.create("Foo").map(|_| ()))
    });
    assert!(matches!(result, Err(Error::ScopeBusy(_))));

    let mut uow = registry.open_scope().unwrap();
    assert!(uow.all("Foo").unwrap().is_empty());
}

#[test]
fn date_times_keep_nanoseconds_across_reload() {
    let registry = registry_with(vec![Declaration::new("Event")
        .table_name("events")
        .related_name("events")
        .field(
            "created",
            ColumnSpec::new(StorageKind::DateTime).with_default(DefaultValue::CurrentTimestamp),
        )
        .field("at", ColumnSpec::new(StorageKind::DateTime))]);
    let at = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_nano_opt(1, 2, 3, 123_456_789)
        .unwrap();

    let created = registry
        .scope(|uow| {
            let handle = uow.create("Event")?;
            uow.record_mut(handle)?.set("at", at)?;
            uow.flush()?;
            Ok(uow.record(handle)?.get("created")?.clone())
        })
        .unwrap();
    assert!(matches!(created, Value::DateTime(_)));

    let mut uow = registry.open_scope().unwrap();
    let handle = uow.get("Event", 1).unwrap();
    let event = uow.record(handle).unwrap();
    assert_eq!(event.get("created").unwrap(), &created);
    assert_eq!(event.get("at").unwrap(), &Value::DateTime(at));
}
