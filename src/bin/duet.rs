use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use sql_duet::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run SQL against MySQL or PostgreSQL through sql-duet")]
struct Args {
    /// JSON settings file with `database` and optional `cache` sections.
    #[arg(long, conflicts_with_all = ["engine", "host", "port", "database", "user", "password"])]
    settings: Option<PathBuf>,
    #[arg(long, value_enum)]
    engine: Option<DatabaseType>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    database: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one SELECT, INSERT, UPDATE or DELETE.
    Query {
        sql: String,
        /// Typed parameter: `int:5`, `float:1.5`, `bool:true`, `null`, `text:abc` or a bare string.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<RowValues>,
        #[arg(long, value_enum, default_value = "assoc")]
        fetch: FetchMode,
        /// Require exactly one row.
        #[arg(long)]
        single: bool,
    },
    /// Run a multi-statement SQL script file.
    Script { file: PathBuf },
}

fn parse_param(raw: &str) -> Result<RowValues, String> {
    if raw == "null" {
        return Ok(RowValues::Null);
    }
    let Some((kind, value)) = raw.split_once(':') else {
        return Ok(RowValues::Text(raw.to_string()));
    };
    match kind {
        "int" => value
            .parse()
            .map(RowValues::Int)
            .map_err(|e| format!("bad int '{value}': {e}")),
        "float" => value
            .parse()
            .map(RowValues::Float)
            .map_err(|e| format!("bad float '{value}': {e}")),
        "bool" => value
            .parse()
            .map(RowValues::Bool)
            .map_err(|e| format!("bad bool '{value}': {e}")),
        "text" => Ok(RowValues::Text(value.to_string())),
        _ => Ok(RowValues::Text(raw.to_string())),
    }
}

fn load_settings(args: &Args) -> Result<Settings, SqlDuetError> {
    if let Some(path) = &args.settings {
        return Settings::from_file(path);
    }
    let engine = args.engine.ok_or_else(|| {
        SqlDuetError::ConfigError("either --settings or --engine is required".to_string())
    })?;
    let database = DbSettings::new(
        engine,
        args.host.clone(),
        args.database.clone(),
        args.user.clone(),
        args.password.clone(),
    )
    .with_port(args.port);
    Ok(Settings {
        database,
        cache: CacheSettings::default(),
    })
}

fn render(result: &ExecutionResult) -> Value {
    match result.data() {
        Some(QueryData::Row(row)) => row.to_json(),
        Some(QueryData::Rows(rows)) => Value::Array(rows.iter().map(Row::to_json).collect()),
        None => json!({
            "affected_rows": result.affected_rows(),
            "insert_id": result.insert_id(),
        }),
    }
}

async fn run(args: Args) -> Result<Value, SqlDuetError> {
    let settings = load_settings(&args)?;
    let mut db = Duet::new(settings.database, settings.cache)?;
    let outcome = match args.command {
        Command::Query {
            sql,
            params,
            fetch,
            single,
        } => {
            db.set_fetch_mode(fetch).set_fetch_single_row(single);
            db.query(&sql, &params).await.map(render)
        }
        Command::Script { file } => {
            let script = std::fs::read_to_string(&file).map_err(|e| {
                SqlDuetError::ConfigError(format!("cannot read {}: {e}", file.display()))
            })?;
            db.execute(&script).await.map(|()| json!({ "ok": true }))
        }
    };
    db.disconnect().await?;
    outcome
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(output) => {
            let text = serde_json::to_string_pretty(&output).unwrap_or_else(|_| "null".to_string());
            println!("{text}");
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_params() {
        assert_eq!(parse_param("int:5").unwrap(), RowValues::Int(5));
        assert_eq!(parse_param("float:1.5").unwrap(), RowValues::Float(1.5));
        assert_eq!(parse_param("bool:true").unwrap(), RowValues::Bool(true));
        assert_eq!(parse_param("null").unwrap(), RowValues::Null);
        assert_eq!(parse_param("text:null").unwrap(), RowValues::Text("null".into()));
        assert_eq!(parse_param("Robertson").unwrap(), RowValues::Text("Robertson".into()));
        assert_eq!(parse_param("12:30").unwrap(), RowValues::Text("12:30".into()));
        assert!(parse_param("int:five").is_err());
    }
}
