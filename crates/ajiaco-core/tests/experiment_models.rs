//! Experiment models end to end.

use ajiaco_core::schema::{SESSION_MODEL, SUBJECT_MODEL};
use ajiaco_core::{register_experiment_models, Error, Handle, ModelRegistry, UnitOfWork, Value};
use pretty_assertions::assert_eq;

fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::open("sled://").unwrap();
    register_experiment_models(&mut registry).unwrap();
    registry.create_storage().unwrap();
    registry.create_schema().unwrap();
    registry
}

fn new_session(registry: &ModelRegistry) -> String {
    registry
        .scope(|uow| {
            let handle = uow.create(SESSION_MODEL)?;
            let session = uow.record_mut(handle)?;
            session.set("experiment_name", "foo")?;
            session.set("subjects_number", 42)?;
            session.set("demo", true)?;
            session.set("len_stages", 716)?;
            session.set("data", Value::mapping([("foo", Value::list([1, 2, 3]))]))?;
            uow.flush()?;
            Ok(uow.record(handle)?.get_str("code")?.unwrap_or_default().to_string())
        })
        .unwrap()
}

#[test]
fn session_round_trip() {
    let registry = registry();
    let code = new_session(&registry);
    assert_eq!(code.len(), 22);

    let mut uow = registry.open_scope().unwrap();
    let handle = uow.get(SESSION_MODEL, 1).unwrap();
    let session = uow.record(handle).unwrap();
    assert_eq!(session.get_str("experiment_name").unwrap(), Some("foo"));
    assert_eq!(session.get_i64("subjects_number").unwrap(), Some(42));
    assert_eq!(session.get_bool("demo").unwrap(), Some(true));
    assert_eq!(session.get_i64("len_stages").unwrap(), Some(716));
    assert_eq!(
        session.get("data").unwrap(),
        &Value::mapping([("foo", Value::list([1, 2, 3]))])
    );
    assert_eq!(session.to_string(), format!("Session(id=1, code='{}')", code));
}

#[test]
fn get_session_by_code_or_id() {
    let registry = registry();
    let code = new_session(&registry);
    new_session(&registry);

    let mut uow = registry.open_scope().unwrap();
    let by_code = uow.get_session(code.as_str()).unwrap();
    let by_id = uow.get_session(1).unwrap();
    assert_eq!(by_code, by_id);

    assert!(matches!(
        uow.get_session("missing"),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(uow.get_session(99), Err(Error::NotFound { .. })));
    assert!(matches!(uow.get_session(true), Err(Error::InvalidValue(_))));
}

#[test]
fn session_requires_mandatory_columns() {
    let registry = registry();
    let mut uow = registry.open_scope().unwrap();
    let handle = uow.create(SESSION_MODEL).unwrap();
    uow.record_mut(handle)
        .unwrap()
        .set("experiment_name", "foo")
        .unwrap();
    assert!(matches!(
        uow.commit(),
        Err(Error::StorageConstraint { .. })
    ));
}

#[test]
fn session_code_is_unique() {
    let registry = registry();
    let code = new_session(&registry);

    let mut uow = registry.open_scope().unwrap();
    let handle = uow.create(SESSION_MODEL).unwrap();
    let session = uow.record_mut(handle).unwrap();
    session.set("code", code.as_str()).unwrap();
    session.set("experiment_name", "bar").unwrap();
    session.set("subjects_number", 1).unwrap();
    session.set("demo", false).unwrap();
    session.set("len_stages", 1).unwrap();
    assert!(matches!(
        uow.commit(),
        Err(Error::StorageConstraint { ref column, .. }) if column == "code"
    ));
}

#[test]
fn subjects_belong_to_session() {
    let registry = registry();
    new_session(&registry);

    registry
        .scope(|uow| {
            let session = uow.get_session(1)?;
            for _ in 0..3 {
                let subject = uow.create(SUBJECT_MODEL)?;
                uow.set_reference(subject, "session", session)?;
            }
            Ok(())
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    let session = uow.get_session(1).unwrap();
    let subjects = uow.back_reference(session, "subjects").unwrap();
    assert_eq!(subjects.len(), 3);
    for subject in subjects {
        let record = uow.record(subject).unwrap();
        assert_eq!(record.get_i64("current_stage").unwrap(), Some(0));
        assert_eq!(record.get_str("code").unwrap().map(str::len), Some(22));
    }
    assert!(uow.back_reference(session, "rounds").unwrap().is_empty());
}

fn fill_session(uow: &mut UnitOfWork<'_>, code: &str) -> Result<Handle, Error> {
    let handle = uow.create(SESSION_MODEL)?;
    let session = uow.record_mut(handle)?;
    session.set("code", code)?;
    session.set("experiment_name", "batch")?;
    session.set("subjects_number", 2)?;
    session.set("demo", false)?;
    session.set("len_stages", 1)?;
    Ok(handle)
}

#[test]
fn unique_codes_checked_across_one_flush() {
    let registry = registry();
    new_session(&registry);
    registry
        .scope(|uow| {
            for n in 0..50 {
                fill_session(uow, &format!("batch-{n}"))?;
            }
            Ok(())
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    assert_eq!(uow.all(SESSION_MODEL).unwrap().len(), 51);
    fill_session(&mut uow, "twin").unwrap();
    fill_session(&mut uow, "twin").unwrap();
    assert!(matches!(
        uow.flush(),
        Err(Error::StorageConstraint { ref column, .. }) if column == "code"
    ));
}

#[test]
fn session_codes_can_be_swapped() {
    let registry = registry();
    registry
        .scope(|uow| {
            fill_session(uow, "first")?;
            fill_session(uow, "second")?;
            Ok(())
        })
        .unwrap();

    registry
        .scope(|uow| {
            let first = uow.get_session("first")?;
            let second = uow.get_session("second")?;
            uow.record_mut(first)?.set("code", "second")?;
            uow.record_mut(second)?.set("code", "first")?;
            Ok(())
        })
        .unwrap();

    let mut uow = registry.open_scope().unwrap();
    let first = uow.get_session("first").unwrap();
    assert_eq!(uow.record(first).unwrap().id(), Some(2));
}
