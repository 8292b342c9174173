use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use schemars::schema_for;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voteevent_core::audit::audit;
use voteevent_core::config::ProjectorSettings;
use voteevent_core::projector::ViolationMode;
use voteevent_core::schema::{Relation, COLUMNS};
use voteevent_core::{db, sql};

#[derive(Parser)]
#[command(name = "voteevent")]
#[command(about = "Vote event projection and validation", long_about = None)]
struct Cli {
    /// Settings file (.toml, .yaml or .yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the projected relation
    Project {
        #[command(flatten)]
        projection: ProjectionArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the projected relation as a table in the same database
    Materialize {
        #[command(flatten)]
        projection: ProjectionArgs,
    },
    /// Print the view SQL and the output table DDL
    Sql {
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        name: Option<String>,
    },
    /// Create the pass-through view in the database
    View {
        #[arg(long)]
        db: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Report row-level findings as JSON
    Audit {
        #[arg(long)]
        db: Option<String>,
    },
    /// Export JSON Schemas to the ./schemas directory
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for the relation types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Args, Clone, Default)]
struct ProjectionArgs {
    /// SQLite database holding the source relation
    #[arg(long)]
    db: Option<String>,
    /// Assert id, created_at and updated_at are non-null
    #[arg(long)]
    strict: bool,
    /// Report every violation instead of stopping at the first
    #[arg(long)]
    collect_all: bool,
    /// Name of the output relation
    #[arg(long)]
    name: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => ProjectorSettings::load(path)?,
        None => ProjectorSettings::default(),
    };

    match cli.command {
        Commands::Project {
            projection,
            format,
            out,
        } => project(settings, projection, format, out),
        Commands::Materialize { projection } => materialize(settings, projection),
        Commands::Sql { strict, name } => print_sql(settings, strict, name),
        Commands::View { db, name } => create_view(settings, db, name),
        Commands::Audit { db } => run_audit(settings, db),
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
    }
}

fn apply_overrides(mut settings: ProjectorSettings, args: &ProjectionArgs) -> ProjectorSettings {
    if let Some(db) = &args.db {
        settings.db_path = Some(db.clone());
    }
    if args.strict {
        settings.strict = true;
    }
    if args.collect_all {
        settings.on_violation = ViolationMode::CollectAll;
    }
    if let Some(name) = &args.name {
        settings.output_name = name.clone();
    }
    settings
}

fn db_path(settings: &ProjectorSettings) -> Result<&str> {
    settings
        .db_path
        .as_deref()
        .ok_or_else(|| anyhow!("no database given: pass --db or set db_path in the config"))
}

fn load_and_project(settings: &ProjectorSettings) -> Result<(rusqlite::Connection, Relation)> {
    let conn = db::open(db_path(settings)?)?;
    let rows = db::load_voteevents(&conn, &settings.source_table)?;
    let relation = settings.projector().project(rows)?;
    Ok((conn, relation))
}

fn project(
    settings: ProjectorSettings,
    args: ProjectionArgs,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let settings = apply_overrides(settings, &args);
    let (_conn, relation) = load_and_project(&settings)?;

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&relation)?,
        OutputFormat::Csv => relation_to_csv(&relation)?,
    };

    match out {
        Some(path) => {
            fs::write(&path, rendered)?;
            info!(path = %path.display(), rows = relation.len(), "wrote relation");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

// NULL and empty text both render as an empty field.
fn relation_to_csv(relation: &Relation) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(COLUMNS)?;
    for row in &relation.rows {
        writer.write_record(row.values().iter().map(|value| value.as_deref().unwrap_or("")))?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

fn materialize(settings: ProjectorSettings, args: ProjectionArgs) -> Result<()> {
    let settings = apply_overrides(settings, &args);
    let (conn, relation) = load_and_project(&settings)?;
    db::write_relation(&conn, &relation, &settings.source_table, settings.strict)?;
    println!("Wrote {} rows to {}", relation.len(), relation.name);
    Ok(())
}

fn print_sql(settings: ProjectorSettings, strict: bool, name: Option<String>) -> Result<()> {
    let name = name.unwrap_or(settings.output_name);
    let strict = strict || settings.strict;
    println!("{};", sql::view_sql(&name, &settings.source_table)?);
    println!();
    println!("{};", sql::table_ddl(&name, strict)?);
    Ok(())
}

fn create_view(
    settings: ProjectorSettings,
    db: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let settings = apply_overrides(
        settings,
        &ProjectionArgs {
            db,
            name,
            ..ProjectionArgs::default()
        },
    );
    let conn = db::open(db_path(&settings)?)?;
    if sql::create_view(&conn, &settings.output_name, &settings.source_table)? {
        println!("Created view {}", settings.output_name);
    } else {
        println!("View {} already exists", settings.output_name);
    }
    Ok(())
}

fn run_audit(settings: ProjectorSettings, db: Option<String>) -> Result<()> {
    let settings = apply_overrides(
        settings,
        &ProjectionArgs {
            db,
            ..ProjectionArgs::default()
        },
    );
    let conn = db::open(db_path(&settings)?)?;
    let rows = db::load_voteevents(&conn, &settings.source_table)?;
    let report = audit(&rows)?;
    info!(
        rows = report.row_count,
        checks = report.checks.len(),
        "audited vote events"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    let voteevent_schema = schema_for!(voteevent_core::schema::VoteEvent);
    let voteevent_json = serde_json::to_string_pretty(&voteevent_schema)?;
    fs::write(out_dir.join("VoteEvent.schema.json"), voteevent_json)?;

    let report_schema = schema_for!(voteevent_core::audit::AuditReport);
    let report_json = serde_json::to_string_pretty(&report_schema)?;
    fs::write(out_dir.join("AuditReport.schema.json"), report_json)?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voteevent_core::schema::{OrderKey, VoteEvent};

    #[test]
    fn csv_has_header_and_empty_nulls() {
        let relation = Relation::new(
            "voteevent",
            vec![VoteEvent {
                id: Some("1".to_string()),
                identifier: Some("VE1".to_string()),
                order: Some(OrderKey::Integer(2)),
                ..VoteEvent::default()
            }],
        );
        let csv = relation_to_csv(&relation).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), COLUMNS.join(","));
        assert_eq!(lines.next().unwrap(), "1,VE1,,,,,,,,,,,,2,");
    }

    #[test]
    fn flags_override_settings() {
        let args = ProjectionArgs {
            db: Some("votes.db".to_string()),
            strict: true,
            collect_all: true,
            name: Some("voteevent_strict".to_string()),
        };
        let settings = apply_overrides(ProjectorSettings::default(), &args);
        assert_eq!(settings.db_path.as_deref(), Some("votes.db"));
        assert!(settings.strict);
        assert_eq!(settings.on_violation, ViolationMode::CollectAll);
        assert_eq!(settings.output_name, "voteevent_strict");
    }

    #[test]
    fn missing_db_is_reported() {
        assert!(db_path(&ProjectorSettings::default()).is_err());
    }
}
