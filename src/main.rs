use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uffkit::file::{read_file, write_file, ReadMode, ReadOptions, UffFile, WriteMode};
use uffkit::record::Record;

#[derive(Parser)]
#[command(name = "uff", about = "Universal File Format (UFF/UNV) inspection tool")]
struct Cli {
    /// Log decode/encode progress (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every block envelope without decoding
    Scan {
        input: PathBuf,
    },
    /// Decode and print one line per record
    List {
        input: PathBuf,
        /// 0-based block index to decode (repeatable)
        #[arg(short, long = "index")]
        indices: Vec<usize>,
        /// Dataset type code to keep (repeatable)
        #[arg(short, long = "type")]
        types: Vec<u32>,
        /// Suppress self-correction warnings
        #[arg(short, long)]
        quiet: bool,
    },
    /// Decode and print records and report as JSON
    Dump {
        input: PathBuf,
        #[arg(short, long = "index")]
        indices: Vec<usize>,
        #[arg(short, long = "type")]
        types: Vec<u32>,
        #[arg(short, long)]
        quiet: bool,
    },
    /// Decode a file and encode it again
    Rewrite {
        input:  PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Append to the output instead of replacing it
        #[arg(long)]
        append: bool,
        /// Write every measurement as binary 58b
        #[arg(long, conflicts_with = "ascii")]
        binary: bool,
        /// Write every measurement as ASCII 58
        #[arg(long)]
        ascii: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {

        // ── Scan ─────────────────────────────────────────────────────────────
        Commands::Scan { input } => {
            let uff = read_file(&input, &ReadOptions::info())?;
            println!("{:>6} {:>6} {:>6} {:>12}", "Block", "Type", "Binary", "Bytes");
            for entry in &uff.report.entries {
                match (&entry.envelope, &entry.error) {
                    (Some(env), _) => println!(
                        "{:>6} {:>6} {:>6} {:>12}",
                        entry.index, env.type_code, env.binary, env.byte_count
                    ),
                    (None, Some(e)) => println!("{:>6}  error {}: {}", entry.index, e.code, e.message),
                    (None, None)    => println!("{:>6}", entry.index),
                }
            }
            println!("{} blocks", uff.report.blocks);
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, indices, types, quiet } => {
            let uff = read_file(&input, &read_options(indices, types, quiet))?;
            println!("File: {}", input.display());
            for (record, entry) in uff.records.iter().zip(&uff.report.entries) {
                let status = match &entry.error {
                    Some(e) => format!("error {}: {}", e.code, e.message),
                    None    => describe(record),
                };
                let kind = if entry.binary { "b" } else { "" };
                println!("{:>6}  {:>5}{:<1}  {}", entry.index, entry.type_code, kind, status);
            }
            println!("{}", uff.report.summary());
        }

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { input, indices, types, quiet } => {
            let uff = read_file(&input, &read_options(indices, types, quiet))?;
            println!("{}", serde_json::to_string_pretty(&uff)?);
        }

        // ── Rewrite ──────────────────────────────────────────────────────────
        Commands::Rewrite { input, output, append, binary, ascii } => {
            let UffFile { mut records, report } = read_file(&input, &ReadOptions::default())?;
            if report.failed() > 0 {
                eprintln!("{} blocks could not be decoded and are dropped", report.failed());
            }
            records.retain(|r| !r.is_empty_slot());
            if binary || ascii {
                for record in &mut records {
                    if let Record::Measurement(m) = record {
                        m.binary = binary;
                    }
                }
            }
            let mode = if append { WriteMode::Append } else { WriteMode::Replace };
            let written = write_file(&output, &records, mode)?;
            println!("Wrote {} → {}", written.summary(), output.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_options(indices: Vec<usize>, types: Vec<u32>, quiet: bool) -> ReadOptions {
    let mode = if indices.is_empty() && types.is_empty() {
        ReadMode::Full
    } else {
        ReadMode::Filtered { indices, types }
    };
    ReadOptions { mode, warnings: !quiet }
}

fn describe(record: &Record) -> String {
    match record {
        Record::FileHeader(h)         => format!("header  {:?} ({})", h.model_name, h.program),
        Record::Units(u)              => format!("units   {} {:?}", u.code, u.description),
        Record::Nodes(n)
        | Record::DoubleNodes(n)      => format!("nodes   {}", n.len()),
        Record::CoordinateSystems(c)  => format!("systems {}", c.len()),
        Record::TraceLine(t)          => format!("trace   {} {:?} ({} nodes)", t.number, t.id, t.nodes.len()),
        Record::Elements(e)           => format!("elements {}", e.len()),
        Record::NodalResponse(r)      => format!(
            "response {} nodes × {} values, analysis {}",
            r.node_labels.len(), r.values_per_node, r.analysis_type
        ),
        Record::Measurement(m)        => format!(
            "function {:?} {} points, {} {}",
            m.ids[0],
            m.data.len(),
            if m.data.is_complex() { "complex" } else { "real" },
            if m.precision == uffkit::record::Precision::Single { "single" } else { "double" },
        ),
        other                         => format!("type {}", other.type_code()),
    }
}
