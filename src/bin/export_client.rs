//! CRM export client
//!
//! Consumer side of the export pipeline: creates exports from a local store
//! file, downloads them, and independently re-verifies the fingerprint.
//!
//! Usage:
//!   crm-export-client sample-store > store.json
//!   crm-export-client add-job --store store.json --customer 2 --description "Boiler check" --scheduled-at 2026-03-01T10:00
//!   crm-export-client add-note --store store.json --parent-type job --parent-id 2 --text "Bring ladder"
//!   crm-export-client create --store store.json --customer 1 --customer 2
//!   crm-export-client download --id <export-id> --expected <hash> --out exports/
//!   crm-export-client verify --file exports/export-<id>.json --hash <hash>

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use crm_export::domain::{
    ExportId, JobStatus, NewJob, NewNote, ParentType, RecordId, StoreSnapshot,
};
use crm_export::io::ExportClient;
use crm_export::services::{verify_download, VerificationReport};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crm-export-client")]
#[command(about = "Create, download and verify CRM exports")]
struct Args {
    /// Export server base URL
    #[arg(short, long, default_value = "http://localhost:3001", global = true)]
    server: String,

    /// Request timeout (ms)
    #[arg(long, default_value = "5000", global = true)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the seeded sample store as JSON
    SampleStore,
    /// Append a job to a store file
    AddJob {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        customer: i64,
        #[arg(long)]
        description: String,
        /// Carried verbatim, e.g. 2026-02-10T09:00
        #[arg(long)]
        scheduled_at: String,
        /// pending, scheduled, in_progress or completed
        #[arg(long, default_value = "pending")]
        status: JobStatus,
    },
    /// Append a note to a store file
    AddNote {
        #[arg(long)]
        store: PathBuf,
        /// customer or job
        #[arg(long)]
        parent_type: ParentType,
        #[arg(long)]
        parent_id: i64,
        #[arg(long)]
        text: String,
    },
    /// Create an export for the selected customers
    Create {
        /// Store snapshot JSON file
        #[arg(long)]
        store: PathBuf,
        /// Customer id to include (repeatable)
        #[arg(short = 'c', long = "customer", required = true)]
        customers: Vec<i64>,
    },
    /// Download an export and verify its fingerprint
    Download {
        #[arg(long)]
        id: String,
        /// Fingerprint returned when the export was created
        #[arg(long)]
        expected: Option<String>,
        /// Directory to save the document into
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Verify a previously saved export file offline
    Verify {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        hash: String,
    },
}

fn load_store(path: &Path) -> anyhow::Result<StoreSnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read store file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse store file {}", path.display()))
}

fn save_store(path: &Path, store: &StoreSnapshot) -> anyhow::Result<()> {
    fs::write(path, serde_json::to_string_pretty(store)?)
        .with_context(|| format!("Failed to write store file {}", path.display()))
}

/// What the selection covers, on stderr so stdout stays machine-readable
fn print_selection(store: &StoreSnapshot, ids: &[RecordId]) {
    for &id in ids {
        match store.customer_by_id(id) {
            Some(customer) => {
                let jobs: Vec<_> = store.jobs_for_customer(id).collect();
                let notes = store.notes_for_parent(ParentType::Customer, id).count()
                    + jobs
                        .iter()
                        .map(|job| store.notes_for_parent(ParentType::Job, job.id).count())
                        .sum::<usize>();
                eprintln!("customer {}: {} ({} jobs, {} notes)", id, customer.name, jobs.len(), notes);
            }
            None => eprintln!("customer {}: not in store, nothing exported", id),
        }
    }
}

fn print_report(report: &VerificationReport) {
    println!("status:     {}", report.outcome.as_str());
    println!("computed:   {}", report.computed);
    if let Some(ref advertised) = report.advertised {
        println!("etag:       {}", advertised);
    }
    if let Some(ref expected) = report.expected {
        println!("expected:   {}", expected);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let args = Args::parse();
    let client = ExportClient::new(&args.server, Duration::from_millis(args.timeout_ms))?;

    match args.command {
        Command::SampleStore => {
            println!("{}", serde_json::to_string_pretty(&StoreSnapshot::sample())?);
        }
        Command::AddJob { store, customer, description, scheduled_at, status } => {
            let mut snapshot = load_store(&store)?;
            let customer_id = RecordId(customer);
            if snapshot.customer_by_id(customer_id).is_none() {
                bail!("customer {} not found in {}", customer_id, store.display());
            }

            let job = snapshot.add_job(NewJob { customer_id, description, scheduled_at, status });
            save_store(&store, &snapshot)?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::AddNote { store, parent_type, parent_id, text } => {
            let mut snapshot = load_store(&store)?;
            let parent_id = RecordId(parent_id);
            let parent_exists = match parent_type {
                ParentType::Customer => snapshot.customer_by_id(parent_id).is_some(),
                ParentType::Job => snapshot.jobs.iter().any(|job| job.id == parent_id),
                ParentType::Other => false,
            };
            if !parent_exists {
                bail!("{} {} not found in {}", parent_type.as_str(), parent_id, store.display());
            }

            let note = snapshot.add_note(NewNote { parent_type, parent_id, text });
            save_store(&store, &snapshot)?;
            println!("{}", serde_json::to_string_pretty(&note)?);
        }
        Command::Create { store, customers } => {
            let snapshot = load_store(&store)?;
            let ids: Vec<RecordId> = customers.into_iter().map(RecordId).collect();
            print_selection(&snapshot, &ids);

            let receipt = client.create_export(&snapshot, &ids).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Command::Download { id, expected, out } => {
            let download = client.download_export(&ExportId::from(id.as_str())).await?;
            let report = download.verify(expected.as_deref())?;

            println!("export:     {}", download.export_id);
            if let Some(ref attestation_id) = download.attestation_id {
                println!("proof:      {}", attestation_id);
            }
            print_report(&report);

            if let Some(dir) = out {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let path = dir.join(download.suggested_filename());
                fs::write(&path, &download.body)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("saved:      {}", path.display());
            }

            if !report.is_match() {
                bail!("fingerprint mismatch for export {}", download.export_id);
            }
        }
        Command::Verify { file, hash } => {
            let body = fs::read(&file)
                .with_context(|| format!("Failed to read export file {}", file.display()))?;
            let report = verify_download(&body, None, Some(hash.as_str()))?;
            print_report(&report);
            if !report.is_match() {
                bail!("fingerprint mismatch for {}", file.display());
            }
        }
    }

    Ok(())
}
