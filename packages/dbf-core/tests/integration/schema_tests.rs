//! Schema document loading and reopen tests.

use ntest::timeout;
use tempfile::tempdir;

use dbf_core::table::{load_schema_json, FieldTable};
use dbf_core::{DbfConfig, DbfError, DbfFile, FieldType};

use super::helpers::add_person;

const CUSTOMERS: &str = r#"{
    "version": 1,
    "fields": [
        { "name": "name", "type": "character", "size": 10 },
        { "name": "age", "type": "numeric", "size": 3 },
        { "name": "balance", "type": "numeric", "size": 10, "decimals": 2 },
        { "name": "since", "type": "date", "size": 8 },
        { "name": "vip", "type": "logical", "size": 1 }
    ]
}"#;

#[timeout(2000)]
#[test]
fn test_create_from_schema_document() -> anyhow::Result<()> {
    let specs = load_schema_json(CUSTOMERS)?;
    let table = FieldTable::build(&specs)?;
    assert_eq!(table.record_length(), 10 + 3 + 10 + 8 + 1 + 1);

    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("customers.dbf");
    let mut dbf = DbfFile::create(&path, &specs)?;
    assert!(dbf.flock()?);
    add_person(&mut dbf, "ALICE", 30)?;

    dbf.goto(1)?;
    dbf.insert_float("BALANCE", -42.125)?;
    dbf.insert_date("SINCE", chrono::NaiveDate::from_ymd_opt(2020, 2, 29).unwrap())?;
    dbf.insert_bool("VIP", false)?;
    dbf.commit()?;
    drop(dbf);

    let reopened = DbfFile::open(&path)?;
    assert_eq!(reopened.fields(), &table);
    assert_eq!(reopened.lastrec(), 1);
    assert_eq!(
        reopened.fields().find("since").map(|f| f.field_type),
        Some(FieldType::Date)
    );
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_reopen_reads_committed_values() -> anyhow::Result<()> {
    let specs = load_schema_json(CUSTOMERS)?;
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("customers.dbf");
    {
        let mut dbf = DbfFile::create(&path, &specs)?;
        let mut guard = dbf.try_lock()?.expect("lock should be free");
        guard.append()?;
        guard.insert_str("NAME", "ZOE")?;
        guard.insert_float("BALANCE", 1234567.891)?;
        guard.commit()?;
        guard.unlock()?;
    }

    let config = DbfConfig {
        read_only: true,
        ..Default::default()
    };
    let mut dbf = DbfFile::open_with_config(&path, &config)?;
    dbf.goto(1)?;
    assert_eq!(dbf.field_string("NAME")?, "ZOE");
    assert_eq!(dbf.field_bytes("BALANCE")?, b"1234567.89");
    assert_eq!(dbf.field_date("SINCE")?, None);
    assert!(!dbf.is_deleted());
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_invalid_documents_rejected() {
    assert!(matches!(
        load_schema_json("[]"),
        Err(DbfError::Schema(_))
    ));

    let bad_type = r#"{ "version": 1, "fields": [ { "name": "x", "type": "blob", "size": 4 } ] }"#;
    assert!(matches!(load_schema_json(bad_type), Err(DbfError::Schema(_))));

    let bad_width = r#"{ "version": 1, "fields": [ { "name": "d", "type": "date", "size": 6 } ] }"#;
    let specs = load_schema_json(bad_width).unwrap();
    assert!(matches!(FieldTable::build(&specs), Err(DbfError::Schema(_))));
}
