//! Record lifecycle tests: create, lock, append, insert, commit, delete.

use ntest::timeout;
use std::fs;
use tempfile::tempdir;

use dbf_core::header::END_OF_DATA;
use dbf_core::lock::LockState;
use dbf_core::{DbfConfig, DbfError, DbfFile};

use super::helpers::{add_person, people_schema, persisted_count, record_at};

#[timeout(2000)]
#[test]
fn test_header_invariants_after_create() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("people.dbf");
    let dbf = DbfFile::create(&path, &people_schema())?;

    let field_sum: usize = dbf.fields().iter().map(|f| f.length).sum();
    assert_eq!(dbf.header().rec_len as usize, field_sum + 1);
    assert_eq!(
        dbf.header().length as usize,
        32 + dbf.fields().len() * 32 + 2
    );
    assert_eq!(fs::metadata(&path)?.len(), 98);
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_committed_bytes_match_buffer() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("people.dbf");
    let mut dbf = DbfFile::create(&path, &people_schema())?;
    let mut guard = dbf.try_lock()?.expect("lock should be free");

    let names = ["ALICE", "BOB", "CHARLOTTE-ANNE", ""];
    for (i, name) in names.iter().enumerate() {
        guard.append()?;
        guard.insert_str("NAME", name)?;
        guard.insert_int("AGE", i as i64 * 7)?;
        let staged = guard.record_bytes().to_vec();
        guard.commit()?;

        let on_disk = record_at(&path, 98, 14, i + 1);
        assert_eq!(on_disk, staged);
    }
    assert_eq!(guard.lastrec(), names.len() as u32);
    assert_eq!(persisted_count(&path), names.len() as i32);

    let bytes = fs::read(&path)?;
    assert_eq!(bytes.len(), 98 + names.len() * 14 + 1);
    assert_eq!(bytes[bytes.len() - 1], END_OF_DATA);
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_failed_insert_changes_nothing() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("people.dbf");
    let mut dbf = DbfFile::create(&path, &people_schema())?;
    assert!(dbf.flock()?);
    add_person(&mut dbf, "ALICE", 30)?;

    dbf.goto(1)?;
    let before = dbf.record_bytes().to_vec();
    for age in [1000, -100, 123_456] {
        let err = dbf.insert_int("AGE", age).unwrap_err();
        assert!(matches!(err, DbfError::FieldFormat { .. }));
        assert!(err.is_caller_error());
    }
    assert_eq!(dbf.record_bytes(), before.as_slice());
    assert!(!dbf.is_modified());
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_soft_delete_and_undelete() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("people.dbf");
    let mut dbf = DbfFile::create(&path, &people_schema())?;
    assert!(dbf.flock()?);
    add_person(&mut dbf, "ANN", 20)?;
    add_person(&mut dbf, "BOB", 21)?;

    dbf.goto(2)?;
    dbf.record_status(true)?;
    assert_eq!(record_at(&path, 98, 14, 2)[0], b'*');
    assert_eq!(record_at(&path, 98, 14, 1)[0], b' ');
    assert_eq!(dbf.lastrec(), 2);

    dbf.unlock()?;
    assert!(matches!(
        dbf.record_status(false),
        Err(DbfError::Lock { .. })
    ));
    assert_eq!(record_at(&path, 98, 14, 2)[0], b'*');

    assert!(dbf.flock()?);
    dbf.record_status(false)?;
    assert_eq!(record_at(&path, 98, 14, 2)[0], b' ');
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_unsynced_writes_still_visible() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("fast.dbf");
    let config = DbfConfig {
        sync_writes: false,
        ..Default::default()
    };
    let mut dbf = DbfFile::create_with_config(&path, &people_schema(), &config)?;
    assert!(dbf.flock()?);
    for i in 0..50 {
        add_person(&mut dbf, &format!("P{i}"), i)?;
    }
    assert_eq!(persisted_count(&path), 50);
    assert_eq!(&record_at(&path, 98, 14, 50)[1..4], b"P49");
    Ok(())
}

#[cfg(target_os = "linux")]
#[timeout(2000)]
#[test]
fn test_writers_take_turns() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("shared.dbf");
    let mut a = DbfFile::create(&path, &people_schema())?;
    let mut b = DbfFile::open(&path)?;

    for round in 0..5 {
        {
            let mut guard = a.try_lock()?.expect("a should get the lock");
            assert!(b.try_lock()?.is_none());
            add_person(&mut guard, "A", round)?;
        }
        {
            let mut guard = b.try_lock()?.expect("b should get the lock");
            assert_eq!(a.lock_state(), LockState::None);
            add_person(&mut guard, "B", round)?;
        }
    }

    assert_eq!(persisted_count(&path), 10);
    for record in 1..=10 {
        let expected = if record % 2 == 1 { b'A' } else { b'B' };
        assert_eq!(record_at(&path, 98, 14, record)[1], expected);
    }
    Ok(())
}
