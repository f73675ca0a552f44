use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::client::{Client, TransactionControl, Transactional};
use crate::command::Command;
use crate::connection::Connector;
use crate::error;
use crate::reader::{Reader, ResultSet};
use crate::row::Columns;
use crate::value::Value;

/// A scripted client that records every call.
///
/// Results are handed out in the order they were pushed; once a queue
/// runs dry, calls succeed with an empty result.  Clones share both the
/// script and the journal, which lets a [`TestConnector`] hand out
/// clients whose calls can be inspected after they were closed.
#[derive(Debug, Default, Clone)]
pub struct TestClient {
    script: Rc<RefCell<Script>>,
    journal: Rc<RefCell<Vec<Record>>>,
}

#[derive(Debug, Default)]
struct Script {
    read_results: VecDeque<Result<Vec<ResultSet>>>,
    execute_results: VecDeque<Result<u64>>,
    begin_results: VecDeque<Result<()>>,
    commit_results: VecDeque<Result<()>>,
    rollback_results: VecDeque<Result<()>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub text: String,
    pub params: Vec<Value>,
    pub kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Connect,
    Close,
    Execute,
    Read,
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug, Default, Clone)]
pub struct ErrorDetails {
    pub message: String,
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.message.fmt(f)
    }
}

pub type Error = error::Error<ErrorDetails>;
pub type Result<T> = std::result::Result<T, Error>;

pub fn fail(message: &str) -> Error {
    Error::query(ErrorDetails {
        message: message.into(),
    })
}

/// A one-column result set of integers.
pub fn numbers(name: &str, values: &[i64]) -> ResultSet {
    let mut set = ResultSet::new(Columns::new([name]));
    for value in values {
        set.push(vec![Value::Integer(*value)]);
    }
    set
}

impl TestClient {
    pub fn new() -> Self {
        TestClient::default()
    }

    pub fn push_read_result(&mut self, result: Result<Vec<ResultSet>>) {
        self.script.borrow_mut().read_results.push_back(result);
    }

    pub fn push_execute_result(&mut self, result: Result<u64>) {
        self.script.borrow_mut().execute_results.push_back(result);
    }

    pub fn push_begin_result(&mut self, result: Result<()>) {
        self.script.borrow_mut().begin_results.push_back(result);
    }

    pub fn push_commit_result(&mut self, result: Result<()>) {
        self.script.borrow_mut().commit_results.push_back(result);
    }

    pub fn push_rollback_result(&mut self, result: Result<()>) {
        self.script.borrow_mut().rollback_results.push_back(result);
    }

    pub fn records(&self) -> Vec<Record> {
        self.journal.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<Kind> {
        self.journal.borrow().iter().map(|record| record.kind).collect()
    }

    fn record(&self, kind: Kind, command: Option<&Command>) {
        self.journal.borrow_mut().push(Record {
            text: command.map(|c| c.text().to_string()).unwrap_or_default(),
            params: command.map(|c| c.params().to_vec()).unwrap_or_default(),
            kind,
        });
    }
}

impl Client for TestClient {
    type Error = ErrorDetails;

    fn execute(&mut self, command: &Command) -> Result<u64> {
        self.record(Kind::Execute, Some(command));
        self.script
            .borrow_mut()
            .execute_results
            .pop_front()
            .unwrap_or(Ok(0))
    }

    fn read(&mut self, command: &Command) -> Result<Reader> {
        self.record(Kind::Read, Some(command));
        self.script
            .borrow_mut()
            .read_results
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]))
            .map(Reader::new)
    }
}

impl Transactional for TestClient {
    type Transaction<'a> = Transaction<'a>;

    fn begin(&mut self) -> Result<Transaction<'_>> {
        self.record(Kind::Begin, None);
        let result = self.script.borrow_mut().begin_results.pop_front();
        if let Some(Err(e)) = result {
            return Err(e);
        }
        Ok(Transaction(self))
    }
}

#[derive(Debug)]
pub struct Transaction<'a>(&'a mut TestClient);

impl<'a> AsMut<TestClient> for Transaction<'a> {
    fn as_mut(&mut self) -> &mut TestClient {
        self.0
    }
}

impl<'a> Client for Transaction<'a> {
    type Error = ErrorDetails;

    fn execute(&mut self, command: &Command) -> Result<u64> {
        self.as_mut().execute(command)
    }

    fn read(&mut self, command: &Command) -> Result<Reader> {
        self.as_mut().read(command)
    }
}

impl<'a> TransactionControl for Transaction<'a> {
    fn commit(mut self) -> Result<()> {
        let client = self.as_mut();
        client.record(Kind::Commit, None);
        let result = client.script.borrow_mut().commit_results.pop_front();
        result.unwrap_or(Ok(()))
    }

    fn rollback(mut self) -> Result<()> {
        let client = self.as_mut();
        client.record(Kind::Rollback, None);
        let result = client.script.borrow_mut().rollback_results.pop_front();
        result.unwrap_or(Ok(()))
    }
}

/// Hands out clones of one scripted client.
#[derive(Debug, Default, Clone)]
pub struct TestConnector {
    pub client: TestClient,
    pub connect_results: RefCell<VecDeque<Result<()>>>,
}

impl TestConnector {
    pub fn new() -> Self {
        TestConnector::default()
    }

    pub fn push_connect_result(&self, result: Result<()>) {
        self.connect_results.borrow_mut().push_back(result);
    }
}

impl Connector for TestConnector {
    type Client = TestClient;

    fn connect(&self) -> Result<TestClient> {
        self.client.record(Kind::Connect, None);
        if let Some(Err(e)) = self.connect_results.borrow_mut().pop_front() {
            return Err(e);
        }
        Ok(self.client.clone())
    }

    fn close(&self, client: TestClient) -> Result<()> {
        client.record(Kind::Close, None);
        Ok(())
    }
}
