mod display;
mod sources;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sil_core::identifier::canonicalize;
use sil_core::{Chamber, Expediente, OrdenDelDia, Pipeline, RecordStore, dates, dedupe_agenda};
use sil_store::{
    AgendaStore, Backups, Filter, JsonStore, NewMovement, NewRecord, RecordPatch, Repository,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::sources::SourceArg;

#[derive(Parser)]
#[command(name = "sil", version, about = "Legislative case record reconciliation")]
struct Cli {
    /// Record file
    #[arg(long, global = true, env = "SIL_DATA", default_value = "db_expedientes.json")]
    data: PathBuf,

    /// Backup directory
    #[arg(long, global = true, env = "SIL_BACKUP_DIR", default_value = "backups")]
    backups: PathBuf,

    /// Agenda file
    #[arg(long, global = true, env = "SIL_AGENDA", default_value = "db_ordenes_dia.json")]
    agenda: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile source files into the record file
    Ingest {
        /// KIND=PATH, lowest quality first. KIND is api, htmlDetail, csv or spreadsheet
        #[arg(long = "source", required = true)]
        sources: Vec<SourceArg>,
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Show one record by id or identifier
    Show { id: String },
    /// List records, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Substring search over identifier, summary and authors
    Search { query: String },
    /// Filter records by facet
    Filter(FilterArgs),
    /// Summary counts
    Stats,
    /// Merge fresh source data into one existing record
    Enrich {
        id: String,
        /// Source kind of the file
        #[arg(long, default_value = "htmlDetail")]
        kind: sil_core::SourceKind,
        /// File holding the row for this record
        #[arg(long)]
        file: PathBuf,
    },
    /// Create a record by hand
    Create(CreateArgs),
    /// Edit fields of a record
    Update(UpdateArgs),
    /// Delete a record
    Delete { id: String },
    /// Append an internal movement to a record
    AddMovement(MovementArgs),
    /// Snapshot the record file
    Backup,
    /// List backups, newest first
    Backups,
    /// Replace the record file with a backup
    Restore { name: String },
    /// Export records as CSV or JSON
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Only records matching this search
        #[arg(long)]
        query: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Agenda ("orden del día") items
    #[command(subcommand)]
    Agenda(AgendaCommand),
    /// Known and observed blocs
    Blocs,
    /// Known and observed provinces
    Provinces,
}

#[derive(Subcommand)]
enum AgendaCommand {
    /// Merge agenda items from a JSON file into the agenda file
    Import { file: PathBuf },
    /// Copy agenda numbers onto the records they list
    Link,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long, value_parser = parse_chamber)]
    chamber: Option<Chamber>,
    #[arg(long = "type")]
    case_types: Vec<String>,
    #[arg(long = "status")]
    statuses: Vec<String>,
    #[arg(long = "bloc")]
    blocs: Vec<String>,
    #[arg(long = "province")]
    provinces: Vec<String>,
    #[arg(long)]
    has_agenda: Option<bool>,
    #[arg(long)]
    in_committee: Option<bool>,
    #[arg(long, value_parser = parse_day)]
    from: Option<NaiveDate>,
    #[arg(long, value_parser = parse_day)]
    to: Option<NaiveDate>,
}

impl From<FilterArgs> for Filter {
    fn from(a: FilterArgs) -> Self {
        Filter {
            chamber: a.chamber,
            case_types: a.case_types,
            statuses: a.statuses,
            blocs: a.blocs,
            provinces: a.provinces,
            has_agenda: a.has_agenda,
            in_committee: a.in_committee,
            date_from: a.from,
            date_to: a.to,
        }
    }
}

#[derive(Args)]
struct CreateArgs {
    identifier: String,
    #[arg(long)]
    summary: String,
    #[arg(long = "type")]
    case_type: Option<String>,
    #[arg(long, value_parser = parse_chamber)]
    chamber: Option<Chamber>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long, value_parser = parse_day)]
    date: Option<NaiveDate>,
    #[arg(long = "author")]
    authors: Vec<String>,
    #[arg(long = "bloc")]
    blocs: Vec<String>,
    #[arg(long = "province")]
    provinces: Vec<String>,
    #[arg(long = "abstract")]
    abstract_text: Option<String>,
    /// Parliamentary publication reference
    #[arg(long)]
    publication: Option<String>,
    #[arg(long)]
    link: Option<String>,
}

#[derive(Args)]
struct UpdateArgs {
    id: String,
    #[arg(long = "type")]
    case_type: Option<String>,
    #[arg(long, value_parser = parse_chamber)]
    chamber: Option<Chamber>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long, value_parser = parse_day)]
    date: Option<NaiveDate>,
    /// Replaces the author list
    #[arg(long = "author")]
    authors: Vec<String>,
    /// Replaces the bloc list
    #[arg(long = "bloc")]
    blocs: Vec<String>,
    /// Replaces the province list
    #[arg(long = "province")]
    provinces: Vec<String>,
    #[arg(long)]
    summary: Option<String>,
    #[arg(long = "abstract")]
    abstract_text: Option<String>,
    #[arg(long)]
    agenda_deputies: Option<String>,
    #[arg(long)]
    agenda_senate: Option<String>,
    #[arg(long)]
    agenda_date: Option<String>,
    #[arg(long)]
    link: Option<String>,
    #[arg(long)]
    agenda_link: Option<String>,
    #[arg(long)]
    publication: Option<String>,
}

impl From<UpdateArgs> for RecordPatch {
    fn from(a: UpdateArgs) -> Self {
        let list = |v: Vec<String>| (!v.is_empty()).then_some(v);
        RecordPatch {
            case_type: a.case_type,
            chamber: a.chamber,
            status: a.status,
            entry_date: a.date,
            authors: list(a.authors),
            blocs: list(a.blocs),
            provinces: list(a.provinces),
            summary: a.summary,
            abstract_text: a.abstract_text,
            agenda_deputies: a.agenda_deputies,
            agenda_senate: a.agenda_senate,
            agenda_date: a.agenda_date,
            case_document: a.link,
            agenda_document: a.agenda_link,
            publication: a.publication,
        }
    }
}

#[derive(Args)]
struct MovementArgs {
    id: String,
    #[arg(long)]
    date: String,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    #[arg(long)]
    note: String,
    #[arg(long = "attachment")]
    attachments: Vec<String>,
    /// Who recorded the movement
    #[arg(long = "by")]
    handled_by: Option<String>,
}

fn parse_chamber(s: &str) -> Result<Chamber, String> {
    Chamber::from_label(s).ok_or_else(|| format!("unknown chamber {s:?}"))
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    dates::parse_date(s).ok_or_else(|| format!("expected YYYY-MM-DD or DD/MM/YYYY, got {s:?}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let today = Local::now().date_naive();
    let store = JsonStore::new(&cli.data);
    let repo = Repository::new(store.clone());
    let backups = Backups::new(&cli.backups);

    match cli.command {
        Commands::Ingest { sources, dry_run } => {
            let rows = sources::read_sources(&sources)?;
            let pipeline = Pipeline::new(today);
            let stats = if dry_run {
                let existing = store.load().context("loading records")?;
                pipeline.run(existing, rows).stats
            } else {
                repo.ingest(&pipeline, rows)
                    .with_context(|| format!("reconciling into {}", cli.data.display()))?
            };
            display::print_run_stats(&stats);
            if dry_run {
                println!("\n(dry run, nothing saved)");
            }
        }

        Commands::Show { id } => {
            let record = repo.get(&id)?;
            display::print_card(&record);
        }

        Commands::List { limit } => {
            let records = repo.all().context("loading records")?;
            let limit = limit.unwrap_or(records.len());
            display::print_rows(records.iter().take(limit));
        }

        Commands::Search { query } => {
            let records = repo.all().context("loading records")?;
            display::print_rows(sil_store::search(&records, &query));
        }

        Commands::Filter(args) => {
            let records = repo.all().context("loading records")?;
            display::print_rows(Filter::from(args).apply(&records));
        }

        Commands::Stats => {
            let records = repo.all().context("loading records")?;
            display::print_stats(&sil_store::stats(&records));
        }

        Commands::Enrich { id, kind, file } => {
            let current = repo.get(&id)?;
            let key = canonicalize(&current.identifier);
            let pipeline = Pipeline::new(today);
            let partial = sources::read_rows(&file)?
                .iter()
                .filter_map(|row| pipeline.extractor().extract(row, kind))
                .find(|p| canonicalize(&p.identifier) == key);
            let Some(partial) = partial else {
                bail!("{} has no row for {}", file.display(), current.identifier);
            };
            let record = repo.enrich(&current.identifier, partial)?;
            display::print_card(&record);
        }

        Commands::Create(a) => {
            let record = repo.create(
                NewRecord {
                    identifier: a.identifier,
                    summary: a.summary,
                    case_type: a.case_type,
                    chamber: a.chamber,
                    status: a.status,
                    entry_date: a.date,
                    authors: a.authors,
                    blocs: a.blocs,
                    provinces: a.provinces,
                    abstract_text: a.abstract_text,
                    publication: a.publication,
                    case_document: a.link,
                },
                today,
            )?;
            display::print_card(&record);
        }

        Commands::Update(a) => {
            let id = a.id.clone();
            let record = repo.update(&id, a.into())?;
            display::print_card(&record);
        }

        Commands::Delete { id } => {
            let deleted = repo.delete(&id)?;
            println!("deleted {}", deleted.identifier);
        }

        Commands::AddMovement(a) => {
            let movement = repo.add_movement(
                &a.id,
                NewMovement {
                    date: a.date,
                    from: a.from,
                    to: a.to,
                    note: a.note,
                    attachments: a.attachments,
                    handled_by: a.handled_by,
                },
            )?;
            println!("added {} to {}", movement.id, a.id);
        }

        Commands::Backup => {
            let snapshot = repo.backup(&backups).context("creating backup")?;
            display::print_backup("backup", &snapshot);
        }

        Commands::Backups => {
            for name in backups.list()? {
                println!("{name}");
            }
        }

        Commands::Restore { name } => {
            let safety = repo.restore(&backups, &name)?;
            display::print_backup("previous data saved to", &safety);
            println!("restored {name}");
        }

        Commands::Export { format, output, query, filter } => {
            let records = repo.all().context("loading records")?;
            let filter = Filter::from(filter);
            let searched = match &query {
                Some(q) => sil_store::search(&records, q),
                None => records.iter().collect(),
            };
            let selected: Vec<&Expediente> =
                searched.into_iter().filter(|r| filter.matches(r)).collect();
            export(format, &selected, output.as_deref())?;
            info!(records = selected.len(), "exported");
        }

        Commands::Agenda(AgendaCommand::Import { file }) => {
            let agenda = AgendaStore::new(&cli.agenda);
            let _lock = agenda.lock()?;
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("opening {}", file.display()))?,
            );
            let incoming: Vec<OrdenDelDia> = serde_json::from_reader(reader)
                .with_context(|| format!("parsing {}", file.display()))?;
            let count = incoming.len();
            let merged = dedupe_agenda(agenda.load()?.into_iter().chain(incoming));
            agenda.save(&merged)?;
            println!("imported {count} item(s), {} in agenda", merged.len());
        }

        Commands::Agenda(AgendaCommand::Link) => {
            let orders = AgendaStore::new(&cli.agenda).load()?;
            let stats = repo.link_agenda(&orders, today)?;
            println!("linked {} case(s), {} not found", stats.linked, stats.missing);
        }

        Commands::Blocs => {
            for bloc in sil_store::bloc_catalog(&repo.all()?) {
                println!("{bloc}");
            }
        }

        Commands::Provinces => {
            for province in sil_store::province_catalog(&repo.all()?) {
                println!("{province}");
            }
        }
    }

    Ok(())
}

fn export(format: ExportFormat, records: &[&Expediente], output: Option<&Path>) -> anyhow::Result<()> {
    if matches!(format, ExportFormat::Xlsx) && output.is_none() {
        bail!("xlsx export needs --output");
    }
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    match format {
        ExportFormat::Csv => sil_store::write_csv(records, &mut out)?,
        ExportFormat::Json => sil_store::write_json(records, &mut out)?,
        ExportFormat::Xlsx => sil_store::write_xlsx(records, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_takes_ordered_sources() {
        let cli = Cli::try_parse_from([
            "sil",
            "ingest",
            "--source",
            "csv=export.csv",
            "--source",
            "api=api.json",
        ])
        .unwrap();
        let Commands::Ingest { sources, dry_run } = cli.command else {
            panic!("expected ingest");
        };
        assert!(!dry_run);
        let kinds: Vec<_> = sources.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![sil_core::SourceKind::Csv, sil_core::SourceKind::Api]);
    }

    #[test]
    fn filter_args_map_onto_filter() {
        let cli = Cli::try_parse_from([
            "sil", "filter", "--chamber", "senado", "--type", "Bill", "--from", "01/02/2025",
            "--has-agenda", "true",
        ])
        .unwrap();
        let Commands::Filter(args) = cli.command else {
            panic!("expected filter");
        };
        let f = Filter::from(args);
        assert_eq!(f.chamber, Some(Chamber::Senate));
        assert_eq!(f.case_types, vec!["Bill"]);
        assert_eq!(f.date_from, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(f.has_agenda, Some(true));
    }

    #[test]
    fn bad_chamber_is_rejected() {
        assert!(Cli::try_parse_from(["sil", "filter", "--chamber", "congreso"]).is_err());
    }

    #[test]
    fn xlsx_export_goes_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expedientes.xlsx");
        let record = sil_core::merge(
            None,
            sil_core::PartialRecord::new("1-D-2025", NaiveDate::from_ymd_opt(2025, 4, 2).unwrap()),
        );

        assert!(export(ExportFormat::Xlsx, &[&record], None).is_err());
        export(ExportFormat::Xlsx, &[&record], Some(&path)).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn update_lists_only_replace_when_given() {
        let cli = Cli::try_parse_from(["sil", "update", "1-D-2025", "--status", "Approved"]).unwrap();
        let Commands::Update(args) = cli.command else {
            panic!("expected update");
        };
        let patch = RecordPatch::from(args);
        assert_eq!(patch.status.as_deref(), Some("Approved"));
        assert_eq!(patch.authors, None);
    }
}
