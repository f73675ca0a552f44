use std::collections::HashMap;

use crate::client::{Client, Transactional};
use crate::command::Command;
use crate::error::ErrorKind;
use crate::map::{self, Position};
use crate::reader::ResultSet;
use crate::row::Columns;
use crate::value::Value;

use super::sync_client::{fail, numbers, Kind, Result, TestClient};

fn pets() -> ResultSet {
    let mut set = ResultSet::new(Columns::new(["id", "name", "species"]));
    set.push(vec![1i64.into(), "Dan".into(), "cat".into()]);
    set.push(vec![2i64.into(), "Polly".into(), "bird".into()]);
    set.push(vec![3i64.into(), "Mittens".into(), "cat".into()]);
    set
}

#[test]
fn execute_all_sums_and_records() {
    let mut client = TestClient::new();
    client.push_execute_result(Ok(2));
    client.push_execute_result(Ok(3));

    let total = client
        .execute_all([
            Command::with_params("UPDATE pets SET name = ? WHERE id = ?", ("Dan", 1)),
            Command::new("DELETE FROM pets"),
        ])
        .unwrap();

    assert_eq!(5, total);
    let records = client.records();
    assert_eq!(2, records.len());
    assert_eq!(
        vec![Value::Text("Dan".into()), Value::Integer(1)],
        records[0].params
    );
    assert_eq!("DELETE FROM pets", records[1].text);
}

#[test]
fn execute_all_stops_at_first_failure() {
    let mut client = TestClient::new();
    client.push_execute_result(Err(fail("locked")));

    let result = client.execute_all(["one", "two"]);

    assert_eq!(ErrorKind::Query, result.unwrap_err().kind());
    assert_eq!(1, client.records().len());
}

#[test]
fn read_batch_concatenates() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![numbers("a", &[1])]));
    client.push_read_result(Ok(vec![numbers("b", &[2]), numbers("c", &[3])]));

    let reader = client.read_batch(["SELECT 1", "SELECT 2; SELECT 3"]).unwrap();
    assert_eq!(3, reader.set_count());
}

#[test]
fn query_as_reads_only_the_first_set() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![pets(), numbers("n", &[9])]));

    let rows: Vec<(i32, String)> = client.query_as("SELECT id, name FROM pets").unwrap();

    assert_eq!(3, rows.len());
    assert_eq!((2, "Polly".to_string()), rows[1]);
}

#[test]
fn query_one_and_opt() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![numbers("n", &[1])]));
    client.push_read_result(Ok(vec![numbers("n", &[])]));
    client.push_read_result(Ok(vec![numbers("n", &[1, 2])]));
    client.push_read_result(Ok(vec![numbers("n", &[])]));

    assert_eq!(1, client.query_one::<i64, _>("one").unwrap());
    assert_eq!(None, client.query_opt::<i64, _>("none").unwrap());

    let error = client.query_opt::<i64, _>("two").unwrap_err();
    assert_eq!(ErrorKind::Collect, error.kind());

    let error = client.query_one::<i64, _>("none").unwrap_err();
    assert_eq!(ErrorKind::Collect, error.kind());
}

#[test]
fn query_first_ignores_the_rest() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![numbers("n", &[4, 5, 6])]));

    assert_eq!(Some(4), client.query_first::<i64, _>("SELECT n").unwrap());
}

#[test]
fn query_scalar_null_is_none() {
    let mut client = TestClient::new();
    let mut set = ResultSet::new(Columns::new(["max"]));
    set.push(vec![Value::Null]);
    client.push_read_result(Ok(vec![set]));

    assert_eq!(None, client.query_scalar::<i64, _>("SELECT MAX(n)").unwrap());
}

#[test]
fn query_map_with_a_closure() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![pets()]));

    let labels = client
        .query_map("SELECT * FROM pets", |row| {
            let name: String = row.get("name")?;
            let species: String = row.get("species")?;
            Ok(format!("{name} the {species}"))
        })
        .unwrap();

    assert_eq!("Polly the bird", labels[1]);
}

#[test]
fn query_with_sees_every_set() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![numbers("a", &[1, 2]), numbers("b", &[3])]));

    let at = client
        .query_with(
            "SELECT a; SELECT b",
            map::by_values_at(|values, at| -> Result<(i64, usize)> {
                Ok((values[0].get()?, at.result_set))
            }),
        )
        .unwrap();

    assert_eq!(vec![(1, 0), (2, 0), (3, 1)], at);
}

#[test]
fn for_each_row_positions() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![numbers("a", &[1, 2]), numbers("b", &[3])]));

    let mut seen = vec![];
    client
        .for_each_row("SELECT a; SELECT b", |_row, at| {
            seen.push(at);
            Ok(())
        })
        .unwrap();

    assert_eq!(
        Position {
            result_set: 1,
            row: 0,
            global: 2
        },
        seen[2]
    );
}

#[test]
fn callback_errors_are_returned_unchanged() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![pets()]));

    let error = client
        .for_each_row("SELECT * FROM pets", |_row, _at| Err(fail("stop")))
        .unwrap_err();

    assert_eq!(ErrorKind::Query, error.kind());
    assert_eq!("stop", error.message());
}

#[test]
fn dictionaries_and_lookups() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![pets()]));
    client.push_read_result(Ok(vec![pets()]));
    client.push_read_result(Ok(vec![pets()]));

    let names: HashMap<i64, String> = client.query_pairs("SELECT id, name FROM pets").unwrap();
    assert_eq!("Mittens", names[&3]);

    let error = client
        .query_dictionary(
            "SELECT * FROM pets",
            |row| -> Result<String> { Ok(row.get("species")?) },
            |row| -> Result<i64> { Ok(row.get("id")?) },
        )
        .unwrap_err();
    assert_eq!(ErrorKind::Collect, error.kind());

    let by_species = client
        .query_lookup(
            "SELECT * FROM pets",
            |row| -> Result<String> { Ok(row.get("species")?) },
            |row| -> Result<i64> { Ok(row.get("id")?) },
        )
        .unwrap();
    assert_eq!(vec![1, 3], by_species["cat"]);
}

#[test]
fn records_tables_and_data_sets() {
    let mut client = TestClient::new();
    client.push_read_result(Ok(vec![pets()]));
    client.push_read_result(Ok(vec![pets()]));
    client.push_read_result(Ok(vec![pets(), ResultSet::affected(1), numbers("n", &[1])]));
    client.push_read_result(Ok(vec![]));

    let records = client.query_records("SELECT * FROM pets").unwrap();
    assert_eq!(Some(&Value::Text("cat".into())), records[2].get("species"));

    let table = client.query_table("SELECT * FROM pets").unwrap();
    assert_eq!("Table", table.name());
    assert_eq!(3, table.len());

    let data = client.query_data_set("SELECT * FROM pets; UPDATE; SELECT n").unwrap();
    assert_eq!(2, data.len());
    assert_eq!("Table1", data[1].name());

    let empty = client.query_table("PRAGMA nothing").unwrap();
    assert!(empty.is_empty());
    assert!(empty.columns().is_empty());
}

#[test]
fn transaction_commits_on_ok() {
    let mut client = TestClient::new();
    client.push_execute_result(Ok(1));

    let n = client
        .transaction(|tx| tx.execute(&"INSERT INTO pets DEFAULT VALUES".into()))
        .unwrap();

    assert_eq!(1, n);
    assert_eq!(vec![Kind::Begin, Kind::Execute, Kind::Commit], client.kinds());
}

#[test]
fn transaction_rolls_back_on_err() {
    let mut client = TestClient::new();

    let result: Result<()> = client.transaction(|tx| {
        tx.execute(&"INSERT INTO pets DEFAULT VALUES".into())?;
        Err(fail("changed my mind"))
    });

    assert_eq!("changed my mind", result.unwrap_err().message());
    assert_eq!(vec![Kind::Begin, Kind::Execute, Kind::Rollback], client.kinds());
}

#[test]
fn failed_rollback_keeps_the_original_error() {
    let mut client = TestClient::new();
    client.push_rollback_result(Err(fail("connection lost")));

    let result: Result<()> = client.transaction(|_tx| Err(fail("original")));

    assert_eq!("original", result.unwrap_err().message());
}

#[test]
fn failed_commit_is_returned() {
    let mut client = TestClient::new();
    client.push_commit_result(Err(fail("serialization failure")));

    let result = client.transaction(|_tx| Ok(()));

    assert_eq!("serialization failure", result.unwrap_err().message());
    assert_eq!(vec![Kind::Begin, Kind::Commit], client.kinds());
}

#[test]
fn failed_begin_runs_nothing() {
    let mut client = TestClient::new();
    client.push_begin_result(Err(fail("busy")));

    let mut ran = false;
    let result = client.transaction(|_tx| {
        ran = true;
        Ok(())
    });

    assert!(result.is_err());
    assert!(!ran);
    assert_eq!(vec![Kind::Begin], client.kinds());
}

#[test]
fn execute_in_transaction_is_atomic() {
    let mut client = TestClient::new();
    client.push_execute_result(Ok(1));
    client.push_execute_result(Err(fail("constraint")));

    let result = client.execute_in_transaction(["INSERT 1", "INSERT 2", "INSERT 3"]);

    assert!(result.is_err());
    assert_eq!(
        vec![Kind::Begin, Kind::Execute, Kind::Execute, Kind::Rollback],
        client.kinds()
    );
}
