//! Run SQL against a SQLite database and print every result set.
//!
//! ```text
//! dbq --database "Data Source=pets.db" "SELECT * FROM pets"
//! ```

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use dbkit::connection::Database;
use dbkit::rusqlite::{Error, SqliteConnector};
use dbkit::{Command, DataSet, Table};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Format {
    /// Aligned columns
    #[default]
    Table,
    /// Comma separated values, with a header line
    Csv,
}

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Connection string, for example "Data Source=pets.db; Foreign Keys=true"
    #[arg(
        short,
        long,
        env = "DBQ_DATABASE",
        default_value = "Data Source=:memory:"
    )]
    database: String,

    /// Run every command in one transaction
    #[arg(short, long)]
    transaction: bool,

    /// How to print result sets
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// The commands to run, in order.  Each may hold several statements.
    #[arg(required = true)]
    sql: Vec<String>,
}

/// What one command gave back.
struct Output {
    data: DataSet,
    rows_affected: u64,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: &Args) -> Result<Vec<Output>, Error> {
    let connector = SqliteConnector::parse(&args.database)?;
    let mut db = Database::new(connector);
    let commands = args.sql.iter().map(|text| Command::new(text.as_str()));

    if args.transaction {
        db.transaction(|tx| commands.map(|command| read(tx, &command)).collect())
    } else {
        db.with_client(|client| commands.map(|command| read(client, &command)).collect())
    }
}

fn read<C: dbkit::client::Client>(
    client: &mut C,
    command: &Command,
) -> Result<Output, dbkit::Error<C::Error>> {
    let reader = client.read(command)?;
    let rows_affected = reader.rows_affected();
    Ok(Output {
        data: DataSet::from_reader(reader),
        rows_affected,
    })
}

fn cell(value: &dbkit::Value) -> String {
    match value {
        dbkit::Value::Null => String::new(),
        value => value.to_string(),
    }
}

fn write_line<W: Write, S: AsRef<str>>(
    out: &mut W,
    cells: &[S],
    widths: &[usize],
) -> std::io::Result<()> {
    let cells: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(text, width)| format!("{:<width$}", text.as_ref()))
        .collect();
    writeln!(out, "{}", cells.join(" | ").trim_end())
}

fn write_table<W: Write>(out: &mut W, table: &Table) -> std::io::Result<()> {
    let names = table.columns().names();
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.values().iter().map(cell).collect())
        .collect();

    let mut widths: Vec<usize> = names.iter().map(|name| name.chars().count()).collect();
    for row in &rows {
        for (width, text) in widths.iter_mut().zip(row) {
            *width = (*width).max(text.chars().count());
        }
    }

    write_line(out, names, &widths)?;
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(out, "{}", rule.join("-+-"))?;
    for row in &rows {
        write_line(out, row, &widths)?;
    }
    writeln!(out, "({} rows)", rows.len())
}

fn write_csv<W: Write>(out: &mut W, table: &Table) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.columns().names())?;
    for row in table.rows() {
        writer.write_record(row.values().iter().map(cell))?;
    }
    writer.flush()?;
    Ok(())
}

fn print<W: Write>(
    out: &mut W,
    outputs: &[Output],
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut first = true;
    for output in outputs {
        for table in output.data.tables() {
            if !first {
                writeln!(out)?;
            }
            first = false;
            match format {
                Format::Table => write_table(out, table)?,
                Format::Csv => write_csv(out, table)?,
            }
        }
    }

    if format == Format::Table {
        let rows_affected: u64 = outputs.iter().map(|output| output.rows_affected).sum();
        if !first {
            writeln!(out)?;
        }
        writeln!(out, "{rows_affected} rows affected")?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    let outputs = match run(&args) {
        Ok(outputs) => outputs,
        Err(error) => {
            tracing::debug!(kind = ?error.kind(), "command failed");
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let stdout = std::io::stdout();
    if let Err(error) = print(&mut stdout.lock(), &outputs, args.format) {
        eprintln!("error: {error}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(sql: &[&str]) -> Args {
        let mut argv = vec!["dbq"];
        argv.extend(sql);
        Args::parse_from(argv)
    }

    fn render(args: &Args) -> String {
        let outputs = run(args).unwrap();
        let mut out = vec![];
        print(&mut out, &outputs, args.format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn defaults() {
        let args = args(&["SELECT 1"]);
        assert_eq!(Format::Table, args.format);
        assert!(!args.transaction);
    }

    #[test]
    fn prints_aligned_tables() {
        let args = args(&[
            "CREATE TABLE pets (name TEXT, species TEXT); \
             INSERT INTO pets VALUES ('Dan', 'cat'), ('Polly', NULL);",
            "SELECT name, species FROM pets",
        ]);
        assert_eq!(
            "name  | species\n\
             ------+--------\n\
             Dan   | cat\n\
             Polly |\n\
             (2 rows)\n\
             \n\
             2 rows affected\n",
            render(&args)
        );
    }

    #[test]
    fn prints_csv() {
        let mut args = args(&["SELECT 1 AS n, 'a,b' AS s; SELECT NULL AS z"]);
        args.format = Format::Csv;
        assert_eq!("n,s\n1,\"a,b\"\n\nz\n\"\"\n", render(&args));
    }

    #[test]
    fn failures_roll_back_the_transaction() {
        let path = std::env::temp_dir().join(format!("dbq-test-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let database = format!("Data Source='{}'", path.display());

        let mut setup = args(&["CREATE TABLE t (n INTEGER)"]);
        setup.database = database.clone();
        run(&setup).unwrap();

        let mut failing = args(&["INSERT INTO t VALUES (1)", "INSERT INTO nowhere VALUES (2)"]);
        failing.database = database.clone();
        failing.transaction = true;
        assert!(run(&failing).is_err());

        let mut count = args(&["SELECT COUNT(*) FROM t"]);
        count.database = database;
        let outputs = run(&count).unwrap();
        assert_eq!(
            Some(0),
            outputs[0].data.tables()[0].get::<_, i64>(0, 0).ok()
        );

        let _ = std::fs::remove_file(&path);
    }
}
