//! Loader and workspace integration: files in, queries over the loaded
//! relations, snapshots out and back.

use std::io::Write as _;

use rela::value::{QueryResult, Value};
use rela::{Outcome, Session};

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create file");
    file.write_all(content.as_bytes()).expect("write file");
    path
}

#[test]
fn test_load_csv_then_query() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_file(
        &dir,
        "employees.csv",
        "emp_id,name,salary\n1,Alice,80000\n2,Bob,60000\n3,Carol,55000\n",
    );

    let mut session = Session::with_data_dir(dir.path().to_path_buf());
    let outcome = session.execute(".load employees.csv").expect("loads");
    assert!(matches!(
        outcome,
        Outcome::Loaded { ref name, tuples: 3 } if name == "employees"
    ));

    let outcome = session
        .execute("employees ? salary > 70000 # name")
        .expect("queries");
    let Outcome::Result(QueryResult::Relation(rel)) = outcome else {
        panic!("expected a relation result");
    };
    assert_eq!(rel.len(), 1);
    let tuple = rel.tuples().next().expect("one tuple");
    assert_eq!(tuple.get("name"), Some(&Value::from("Alice")));
}

#[test]
fn test_load_with_explicit_name() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_file(&dir, "d.tsv", "dept_id\tdept_name\n10\tEngineering\n");

    let mut session = Session::with_data_dir(dir.path().to_path_buf());
    let outcome = session.execute(".load d.tsv D").expect("loads");
    assert!(matches!(outcome, Outcome::Loaded { ref name, tuples: 1 } if name == "D"));
    assert!(session.environment().contains("D"));
}

#[test]
fn test_load_json_and_join() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_file(
        &dir,
        "emp.json",
        r#"[{"emp_id": 1, "dept_id": 10}, {"emp_id": 2, "dept_id": 20}]"#,
    );
    write_file(&dir, "dept.csv", "dept_id,dept_name\n10,Engineering\n20,Sales\n");

    let mut session = Session::with_data_dir(dir.path().to_path_buf());
    session.execute(".load emp.json E").expect("loads json");
    session.execute(".load dept.csv D").expect("loads csv");

    let Outcome::Result(QueryResult::Relation(rel)) =
        session.execute("E * D").expect("joins")
    else {
        panic!("expected a relation result");
    };
    assert_eq!(rel.len(), 2);
    assert_eq!(rel.schema_vec(), vec!["dept_id", "dept_name", "emp_id"]);
}

#[test]
fn test_loader_rejects_nulls() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_file(&dir, "bad.json", r#"[{"a": null}]"#);

    let mut session = Session::with_data_dir(dir.path().to_path_buf());
    assert!(session.execute(".load bad.json").is_err());
    assert!(session.environment().is_empty());
}

#[test]
fn test_workspace_snapshot_round_trip_preserves_rvas() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_file(
        &dir,
        "emp.csv",
        "emp_id,name\n1,Alice\n2,Bob\n",
    );
    write_file(
        &dir,
        "phone.csv",
        "emp_id,phone\n1,555-0001\n1,555-0002\n",
    );

    let mut session = Session::with_data_dir(dir.path().to_path_buf());
    session.execute(".load emp.csv E").expect("loads");
    session.execute(".load phone.csv Phone").expect("loads");
    session
        .execute("Nested := E *: Phone > phones")
        .expect("binds nested");
    session.execute(".save ws.json").expect("saves");

    let mut restored = Session::with_data_dir(dir.path().to_path_buf());
    let outcome = restored.execute(".open ws.json").expect("opens");
    assert!(matches!(outcome, Outcome::Opened { relations: 3, .. }));

    // The relation-valued attribute survives the round trip intact
    let Outcome::Result(QueryResult::Relation(rel)) = restored
        .execute("Nested ? emp_id = 1 # phones")
        .expect("queries restored workspace")
    else {
        panic!("expected a relation result");
    };
    let tuple = rel.tuples().next().expect("one tuple");
    let Some(Value::Relation(phones)) = tuple.get("phones") else {
        panic!("phones must be a nested relation");
    };
    assert_eq!(phones.len(), 2);
}

#[test]
fn test_script_style_statement_sequence() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_file(
        &dir,
        "emp.csv",
        "emp_id,name,salary\n1,Alice,80000\n2,Bob,60000\n",
    );

    let mut session = Session::with_data_dir(dir.path().to_path_buf());
    let script = [
        ".load emp.csv E",
        "-- keep only the well paid",
        "Rich := E ? salary > 70000",
        "Rich # name",
    ];
    let mut last = None;
    for line in script {
        last = Some(session.execute(line).expect("statement succeeds"));
    }
    let Some(Outcome::Result(QueryResult::Relation(rel))) = last else {
        panic!("expected a final relation result");
    };
    assert_eq!(rel.len(), 1);
}
