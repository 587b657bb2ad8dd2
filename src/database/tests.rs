use super::*;
use crate::command::CommandParser;
use crate::file::{PAGE_SIZE, PageId};
use crate::record::ColType;
use std::path::Path;
use tempfile::TempDir;

fn test_config(path: &Path) -> DbConfig {
    DbConfig {
        db_path: path.join("DB"),
        file_count: 2,
        max_file_size: 64 * PAGE_SIZE as u64,
        frame_count: 4,
    }
}

fn setup_test_db() -> (TempDir, DatabaseManager) {
    let temp_dir = TempDir::new().unwrap();
    let db_manager = DatabaseManager::open(test_config(temp_dir.path())).unwrap();
    (temp_dir, db_manager)
}

fn students_columns() -> Vec<ColInfo> {
    vec![
        ColInfo::new("id", ColType::Int),
        ColInfo::new("name", ColType::VarString(20)),
        ColInfo::new("score", ColType::Float),
    ]
}

fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn run(db_manager: &mut DatabaseManager, line: &str) -> DatabaseResult<QueryResult> {
    let command = CommandParser::new()?.parse(line)?;
    db_manager.execute(command)
}

#[test]
fn test_create_table() {
    let (_temp, mut db_manager) = setup_test_db();

    let table = db_manager.create_table("students", students_columns()).unwrap();
    assert_eq!(table.column_count(), 3);
    assert!(db_manager.catalog().contains("students"));
    assert_eq!(db_manager.catalog().table_names(), vec!["students".to_string()]);

    // Duplicate table
    let result = db_manager.create_table("students", students_columns());
    assert!(matches!(result, Err(DatabaseError::TableExists(_))));
}

#[test]
fn test_create_table_rejects_bad_schema() {
    let (_temp, mut db_manager) = setup_test_db();

    assert!(matches!(
        db_manager.create_table("empty", Vec::new()),
        Err(DatabaseError::InvalidTable(_))
    ));
    assert!(matches!(
        db_manager.create_table("wide", vec![ColInfo::new("blob", ColType::String(5000))]),
        Err(DatabaseError::InvalidTable(_))
    ));
    assert_eq!(db_manager.catalog().table_count(), 0);
}

#[test]
fn test_insert_and_select() {
    let (_temp, mut db_manager) = setup_test_db();
    db_manager.create_table("students", students_columns()).unwrap();

    let rid1 = db_manager.insert("students", &row(&["1", "Alice", "95.5"])).unwrap();
    let rid2 = db_manager.insert("students", &row(&["2", "\"Bob\"", "87"])).unwrap();
    let rid3 = db_manager.insert("students", &row(&["3", "Carol", "-1.25"])).unwrap();

    let rows = db_manager.select_all("students").unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].0, rid1);
    assert_eq!(rows[1].0, rid2);
    assert_eq!(rows[2].0, rid3);
    assert_eq!(
        rows[1].1,
        Record::new(vec![
            Value::Int(2),
            Value::String("Bob".to_string()),
            Value::Float(87.0)
        ])
    );
}

#[test]
fn test_insert_validation() {
    let (_temp, mut db_manager) = setup_test_db();
    db_manager.create_table("students", students_columns()).unwrap();

    // Wrong arity
    assert!(matches!(
        db_manager.insert("students", &row(&["1", "Alice"])),
        Err(DatabaseError::RecordError(RecordError::SchemaMismatch(_)))
    ));
    // Not an INT
    assert!(matches!(
        db_manager.insert("students", &row(&["x", "Alice", "1"])),
        Err(DatabaseError::RecordError(RecordError::InvalidValue(_)))
    ));
    // Too long for VARSTRING(20)
    assert!(matches!(
        db_manager.insert("students", &row(&["1", "a".repeat(21).as_str(), "1"])),
        Err(DatabaseError::RecordError(RecordError::ValueTooLong { .. }))
    ));
    // Unknown table
    assert!(matches!(
        db_manager.insert("courses", &row(&["1"])),
        Err(DatabaseError::CatalogError(CatalogError::TableNotFound(_)))
    ));

    assert!(db_manager.select_all("students").unwrap().is_empty());
}

#[test]
fn test_get_and_delete() {
    let (_temp, mut db_manager) = setup_test_db();
    db_manager.create_table("students", students_columns()).unwrap();

    let rid = db_manager.insert("students", &row(&["1", "Alice", "95.5"])).unwrap();
    let kept = db_manager.insert("students", &row(&["2", "Bob", "80"])).unwrap();

    let record = db_manager.get("students", rid).unwrap();
    assert_eq!(record.get(1), Some(&Value::String("Alice".to_string())));

    db_manager.delete("students", rid).unwrap();
    assert!(matches!(
        db_manager.get("students", rid),
        Err(DatabaseError::RecordError(RecordError::SlotEmpty(_)))
    ));

    let rows = db_manager.select_all("students").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, kept);
}

#[test]
fn test_tables_are_isolated() {
    let (_temp, mut db_manager) = setup_test_db();
    db_manager.create_table("a", students_columns()).unwrap();
    db_manager
        .create_table("b", vec![ColInfo::new("code", ColType::String(4))])
        .unwrap();

    let rid = db_manager.insert("a", &row(&["1", "x", "0"])).unwrap();
    db_manager.insert("b", &row(&["zz"])).unwrap();

    assert_eq!(db_manager.select_all("a").unwrap().len(), 1);
    assert_eq!(
        db_manager.select_all("b").unwrap()[0].1,
        Record::new(vec![Value::String("zz".to_string())])
    );
    assert!(db_manager.get("b", rid).is_err());
}

#[test]
fn test_many_records_span_pages() {
    let (_temp, mut db_manager) = setup_test_db();
    db_manager.create_table("students", students_columns()).unwrap();

    for i in 0..500 {
        let name = format!("student number {}", i);
        db_manager
            .insert("students", &row(&[i.to_string().as_str(), name.as_str(), "1.5"]))
            .unwrap();
    }

    let table = db_manager.table("students").unwrap().clone();
    let pages = db_manager.file_manager_mut().data_pages(&table).unwrap();
    assert!(pages.len() > 1);

    let rows = db_manager.select_all("students").unwrap();
    assert_eq!(rows.len(), 500);
    for (i, (_, record)) in rows.iter().enumerate() {
        assert_eq!(record.get(0), Some(&Value::Int(i as i32)));
    }
}

#[test]
fn test_persistence() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    let rid = {
        let mut db_manager = DatabaseManager::open(config.clone()).unwrap();
        db_manager.create_table("students", students_columns()).unwrap();
        db_manager.insert("students", &row(&["1", "Alice", "95.5"])).unwrap();
        let rid = db_manager.insert("students", &row(&["2", "Bob", "80"])).unwrap();
        db_manager.finish().unwrap();
        rid
    };

    assert!(config.db_path.join("DBInfo.json").exists());
    assert!(config.db_path.join("f0.data").exists());

    let mut db_manager = DatabaseManager::open(config).unwrap();
    assert!(db_manager.catalog().contains("students"));
    let rows = db_manager.select_all("students").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        db_manager.get("students", rid).unwrap().get(1),
        Some(&Value::String("Bob".to_string()))
    );
}

#[test]
fn test_free_pages_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    let freed = {
        let mut db_manager = DatabaseManager::open(config.clone()).unwrap();
        let buffer_manager = db_manager.file_manager_mut().buffer_manager_mut();
        let page_id = buffer_manager.allocate_page().unwrap();
        buffer_manager.allocate_page().unwrap();
        buffer_manager.deallocate_page(page_id).unwrap();
        db_manager.finish().unwrap();
        page_id
    };

    let mut db_manager = DatabaseManager::open(config).unwrap();
    let disk_manager = db_manager.file_manager().buffer_manager().disk_manager();
    assert_eq!(disk_manager.free_pages(), &[freed]);

    // The restored page is handed out again first
    let buffer_manager = db_manager.file_manager_mut().buffer_manager_mut();
    assert_eq!(buffer_manager.allocate_page().unwrap(), freed);
}

#[test]
fn test_reset() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    {
        let mut db_manager = DatabaseManager::open(config.clone()).unwrap();
        db_manager.create_table("students", students_columns()).unwrap();
        db_manager.insert("students", &row(&["1", "Alice", "95.5"])).unwrap();

        db_manager.reset().unwrap();
        assert_eq!(db_manager.catalog().table_count(), 0);
        assert!(db_manager.select_all("students").is_err());
        let disk_manager = db_manager.file_manager().buffer_manager().disk_manager();
        assert_eq!(disk_manager.allocated_page_count(), 0);

        // The engine is usable again after a reset
        db_manager.create_table("students", students_columns()).unwrap();
        let rid = db_manager.insert("students", &row(&["9", "Zed", "0"])).unwrap();
        assert_eq!(rid.page_id, PageId::new(1, 0));
    }

    let mut db_manager = DatabaseManager::open(config).unwrap();
    let rows = db_manager.select_all("students").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1.get(0), Some(&Value::Int(9)));
}

#[test]
fn test_execute_commands() {
    let (_temp, mut db_manager) = setup_test_db();

    let result = run(&mut db_manager, "CREATE TABLE people (id:INT,name:VARSTRING(16))").unwrap();
    assert!(matches!(result, QueryResult::TableCreated(_)));

    let rid = match run(&mut db_manager, r#"INSERT INTO people VALUES (1,"Smith, John")"#).unwrap()
    {
        QueryResult::RecordInserted(rid) => rid,
        other => panic!("unexpected result {:?}", other),
    };
    run(&mut db_manager, "INSERT INTO people VALUES (2,Ann)").unwrap();

    match run(&mut db_manager, "SELECT * FROM people").unwrap() {
        QueryResult::ResultSet(columns, rows) => {
            assert_eq!(columns, vec!["id".to_string(), "name".to_string()]);
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].1.get(1), Some(&Value::String("Smith, John".to_string())));
        }
        other => panic!("unexpected result {:?}", other),
    }

    match run(&mut db_manager, &format!("GET FROM people RECORD {}", rid)).unwrap() {
        QueryResult::ResultSet(_, rows) => assert_eq!(rows[0].0, rid),
        other => panic!("unexpected result {:?}", other),
    }

    let result = run(&mut db_manager, &format!("DELETE FROM people RECORD {}", rid)).unwrap();
    assert!(matches!(result, QueryResult::RowsAffected(1)));
    assert!(run(&mut db_manager, &format!("GET FROM people RECORD {}", rid)).is_err());

    assert!(matches!(
        run(&mut db_manager, "RESETDB").unwrap(),
        QueryResult::Empty
    ));
    assert_eq!(db_manager.catalog().table_count(), 0);

    assert!(matches!(
        run(&mut db_manager, "EXIT").unwrap(),
        QueryResult::Exit
    ));
}

#[test]
fn test_execute_syntax_error() {
    let (_temp, mut db_manager) = setup_test_db();
    assert!(matches!(
        run(&mut db_manager, "SELECT name FROM people"),
        Err(DatabaseError::CommandError(_))
    ));
}

#[test]
fn test_open_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path());
    config.frame_count = 0;
    assert!(matches!(
        DatabaseManager::open(config),
        Err(DatabaseError::ConfigError(_))
    ));
}
