pub mod args;
pub mod config;

use anyhow::Context;
use log::{LevelFilter, Log, Metadata, Record};
use pex_anon::anon::{self, Anonymizer, FileOutcome};
use pex_anon::pex::{GameVariant, PexDocument, PexHeader, PexString};
use pex_anon::types::*;
use pex_anon::utils;
use pex_anon::utils::counter::Counter;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn anonymize_files(
    args: &args::AnonymizeArgs,
    cfg: &config::FileConfig,
    encoding: Encoding,
) -> anyhow::Result<bool> {
    let settings = config::resolve(args, cfg, encoding)?;
    let files = utils::files::collect_files(
        &settings.sources,
        settings.recursive,
        &settings.valid_extensions,
    )?;
    if files.is_empty() {
        eprintln!("No files found");
        return Ok(true);
    }
    println!("Anonymizing {} File(s):", files.len());
    let counter = Counter::new();
    let anonymizer = Arc::new(Anonymizer::new(settings.anonymize));
    let results = anon::batch::run(anonymizer, files, settings.jobs, &counter)?;
    for (path, outcome) in results.iter() {
        match outcome {
            FileOutcome::Rewritten => println!("{}", path.display()),
            FileOutcome::SkippedUnrecognized(e) => println!("{}", e),
            FileOutcome::SkippedMismatch(e) => eprintln!("{}", e),
            FileOutcome::Failed(e) => eprintln!("Error anonymizing {}: {}", path.display(), e),
        }
    }
    println!("{}", counter);
    Ok(!counter.has_failures())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoReport<'a> {
    path: &'a str,
    variant: GameVariant,
    byte_order: ByteOrder,
    header: PexHeader,
    source_file_name: String,
    user_name: String,
    machine_name: String,
    payload_len: usize,
}

fn print_info(filename: &str, json: bool, encoding: Encoding) -> anyhow::Result<()> {
    let doc = PexDocument::from_file(filename)?;
    let report = InfoReport {
        path: filename,
        variant: doc.variant,
        byte_order: doc.byte_order(),
        header: doc.header,
        source_file_name: doc.source_file_name.to_string_lossy(encoding),
        user_name: doc.user_name.to_string_lossy(encoding),
        machine_name: doc.machine_name.to_string_lossy(encoding),
        payload_len: doc.payload.len(),
    };
    if json {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }
    println!("{}", filename);
    println!("Game:\t{} ({})", report.variant, report.byte_order);
    println!("{}", report.header);
    println!("Source:\t{}", report.source_file_name);
    println!("User:\t{}", report.user_name);
    println!("Machine:\t{}", report.machine_name);
    println!("Payload:\t{} bytes", report.payload_len);
    Ok(())
}

fn create_file(args: &args::CreateArgs, encoding: Encoding) -> anyhow::Result<()> {
    let mut doc = PexDocument::new(args.game);
    doc.source_file_name = PexString::new(utils::encoding::encode_string(encoding, &args.source_name)?);
    doc.user_name = PexString::new(utils::encoding::encode_string(encoding, &args.user_name)?);
    doc.machine_name =
        PexString::new(utils::encoding::encode_string(encoding, &args.machine_name)?);
    if let Some(payload) = &args.payload {
        doc.payload = utils::files::read_file(payload)
            .with_context(|| format!("Failed to read payload {}", payload))?;
    }
    let data = doc.to_bytes()?;
    let mut f = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&args.output)
        .with_context(|| format!("Failed to create {}", args.output))?;
    if let Err(e) = f.write_all(&data) {
        drop(f);
        let _ = std::fs::remove_file(&args.output);
        return Err(e).with_context(|| format!("Failed to write {}", args.output));
    }
    println!("Wrote {} bytes to {}", data.len(), args.output);
    Ok(())
}

fn main() {
    let arg = args::parse_args();
    if arg.backtrace {
        unsafe { std::env::set_var("RUST_LIB_BACKTRACE", "1") };
    }
    let cfg = match config::FileConfig::load(arg.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(2);
        }
    };
    let verbose = if cfg.verbose == Some(true) {
        arg.verbose.max(1)
    } else {
        arg.verbose
    };
    init_logger(verbose);
    let encoding = config::resolve_encoding(arg.encoding, &cfg);
    let mut ok = true;
    match &arg.command {
        args::Command::Anonymize(args) => match anonymize_files(args, &cfg, encoding) {
            Ok(all_ok) => ok = all_ok,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                if arg.backtrace {
                    eprintln!("Backtrace: {}", e.backtrace());
                }
                ok = false;
            }
        },
        args::Command::Info { files, json } => {
            for file in files.iter() {
                if let Err(e) = print_info(file, *json, encoding) {
                    eprintln!("Error reading {}: {}", file, e);
                    if arg.backtrace {
                        eprintln!("Backtrace: {}", e.backtrace());
                    }
                    ok = false;
                }
            }
        }
        args::Command::Create(args) => {
            if let Err(e) = create_file(args, encoding) {
                eprintln!("Error creating {}: {:#}", args.output, e);
                if arg.backtrace {
                    eprintln!("Backtrace: {}", e.backtrace());
                }
                ok = false;
            }
        }
    }
    if !ok {
        std::process::exit(1);
    }
}
