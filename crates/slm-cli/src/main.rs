use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use slm_core::comparator::{Comparator, ComparatorConfig, PatternExtractor, DEFAULT_THRESHOLD};
use slm_core::generator::{self, CreationMode, ManualData};
use slm_core::network::ContractKind;
use slm_core::verifier::{self, Severity};
use slm_core::{canonical, export, lifecycle, solidity, Error, LicenseDocument, Result, VersionStatus};

mod dashboard;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_ERROR: i32 = 2;

/// SLM — Smart License Manager CLI
///
/// Create, review, verify and export versioned smart license documents,
/// and read royalty state from deployed Manager contracts.
#[derive(Parser)]
#[command(name = "slm", version, about, long_about = None)]
struct Cli {
    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log verbosity (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding persisted settings
    #[arg(long, global = true, env = "SLM_HOME", default_value = ".slm")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new license from a manual form or free text
    New {
        /// Manual form (.json)
        #[arg(long, conflicts_with = "ai")]
        form: Option<PathBuf>,
        /// Free-text description (AI mode)
        #[arg(long)]
        ai: Option<String>,
        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Append a new draft version to an existing license
    Edit {
        /// License document (.json)
        file: PathBuf,
        #[arg(long, conflicts_with = "ai")]
        form: Option<PathBuf>,
        #[arg(long)]
        ai: Option<String>,
        /// Defaults to writing back to FILE
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Submit the current draft for review
    Propose {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Request changes on the current version
    Revise {
        file: PathBuf,
        /// Reviewer identity recorded in the feedback
        #[arg(long)]
        reviewer: String,
        #[arg(long)]
        comment: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Approve the proposed version
    Approve {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Deploy the approved version, superseding earlier deployments
    Deploy {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a license and its version history
    Show {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Check a manual form or AI text for missing input
    Validate {
        /// Manual form (.json)
        form: Option<PathBuf>,
        #[arg(long, conflicts_with = "form")]
        ai: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Compute the semantic hash (SHA-256) of a license
    Hash { file: PathBuf },

    /// Render the Solidity contract for a license
    Contract {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare an uploaded contract with a generated one
    Compare {
        /// License (.json) or generated contract (.sol)
        generated: PathBuf,
        /// Uploaded contract (.sol)
        uploaded: PathBuf,
        /// Minimum similarity percentage
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
        #[arg(long)]
        json: bool,
    },

    /// Check a license document's structure and versioning
    Verify {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Write the license JSON and Solidity contract with timestamped names
    Export {
        file: PathBuf,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Read royalty state once from the selected network
    Royalty {
        /// Entity contract; defaults to the configured address
        #[arg(long)]
        entity: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Network selection and contract addresses
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },

    /// Poll royalty state until interrupted
    Watch {
        #[arg(long)]
        entity: Option<String>,
        /// Seconds between polls
        #[arg(long, default_value_t = 15)]
        interval: u64,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum NetworkAction {
    /// Show the selected network profile
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Select development, alps or custom
    Use { network: String },
    /// Cache a contract address for this state directory
    SetAddress {
        contract: ContractArg,
        address: String,
    },
    /// Load addresses from a deployment file ({"Token": "0x..", ...})
    LoadAddresses { file: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum ContractArg {
    Token,
    Entity,
    Manager,
}

impl From<ContractArg> for ContractKind {
    fn from(arg: ContractArg) -> Self {
        match arg {
            ContractArg::Token => ContractKind::Token,
            ContractArg::Entity => ContractKind::Entity,
            ContractArg::Manager => ContractKind::Manager,
        }
    }
}

/// Settings shared by every command
pub(crate) struct Context {
    pub quiet: bool,
    pub state_dir: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let ctx = Context {
        quiet: cli.quiet,
        state_dir: cli.state_dir,
    };

    let exit_code = match run(cli.command, &ctx) {
        Ok(code) => code,
        Err(e) => {
            report_error(&e);
            exit_code_for(&e)
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            _ => "trace",
        }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, ctx: &Context) -> Result<i32> {
    match command {
        Commands::New { form, ai, output } => cmd_new(form.as_deref(), ai.as_deref(), output.as_deref(), ctx),
        Commands::Edit {
            file,
            form,
            ai,
            output,
        } => cmd_edit(&file, form.as_deref(), ai.as_deref(), output.as_deref(), ctx),
        Commands::Propose { file, output } => {
            cmd_transition(&file, output.as_deref(), ctx, "proposed", |doc| {
                lifecycle::propose(doc, chrono::Utc::now())
            })
        }
        Commands::Revise {
            file,
            reviewer,
            comment,
            output,
        } => cmd_transition(&file, output.as_deref(), ctx, "revision requested", |doc| {
            lifecycle::request_revision(doc, &reviewer, &comment, chrono::Utc::now())
        }),
        Commands::Approve { file, output } => {
            cmd_transition(&file, output.as_deref(), ctx, "approved", |doc| {
                lifecycle::approve(doc, chrono::Utc::now())
            })
        }
        Commands::Deploy { file, output } => {
            cmd_transition(&file, output.as_deref(), ctx, "deployed", |doc| {
                lifecycle::deploy(doc, chrono::Utc::now())
            })
        }
        Commands::Show { file, json } => cmd_show(&file, json, ctx),
        Commands::Validate { form, ai, json } => cmd_validate(form.as_deref(), ai.as_deref(), json, ctx),
        Commands::Hash { file } => {
            let doc = read_document(&file)?;
            println!("{}", canonical::semantic_hash(&doc)?);
            Ok(EXIT_OK)
        }
        Commands::Contract { file, output } => cmd_contract(&file, output.as_deref(), ctx),
        Commands::Compare {
            generated,
            uploaded,
            threshold,
            json,
        } => cmd_compare(&generated, &uploaded, threshold, json, ctx),
        Commands::Verify { file, json } => cmd_verify(&file, json, ctx),
        Commands::Export { file, dir, json } => cmd_export(&file, &dir, json, ctx),
        Commands::Royalty { entity, json } => dashboard::royalty(entity.as_deref(), json, ctx),
        Commands::Network { action } => match action {
            NetworkAction::Show { json } => dashboard::network_show(json, ctx),
            NetworkAction::Use { network } => dashboard::network_use(&network, ctx),
            NetworkAction::SetAddress { contract, address } => {
                dashboard::network_set_address(contract.into(), &address, ctx)
            }
            NetworkAction::LoadAddresses { file } => {
                dashboard::network_load_addresses(&read_text(&file)?, ctx)
            }
        },
        Commands::Watch { entity, interval } => dashboard::watch(entity.as_deref(), interval, ctx),
        Commands::Version => {
            println!("slm {} (slm-core {})", env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_VERSION"));
            Ok(EXIT_OK)
        }
    }
}

// ── Document commands ─────────────────────────────────────

fn cmd_new(form: Option<&Path>, ai: Option<&str>, output: Option<&Path>, ctx: &Context) -> Result<i32> {
    let (mode, manual, text) = load_inputs(form, ai)?;
    let doc = generator::generate_document(mode, &manual, &text, None, chrono::Utc::now())?;
    emit_document(&doc, output, ctx, "created")
}

fn cmd_edit(
    file: &Path,
    form: Option<&Path>,
    ai: Option<&str>,
    output: Option<&Path>,
    ctx: &Context,
) -> Result<i32> {
    let prior = read_document(file)?;
    verifier::ensure_valid(&prior)?;
    let (mode, manual, text) = load_inputs(form, ai)?;
    let doc = generator::generate_document(mode, &manual, &text, Some(&prior), chrono::Utc::now())?;
    emit_document(&doc, Some(output.unwrap_or(file)), ctx, "edited")
}

/// Read the selected input and reject it unless every required field is present
fn load_inputs(form: Option<&Path>, ai: Option<&str>) -> Result<(CreationMode, ManualData, String)> {
    match (form, ai) {
        (Some(path), None) => {
            let seed = chrono::Utc::now().timestamp_millis().unsigned_abs();
            let manual = ManualData::from_form_json(&read_text(path)?, seed)?;
            manual.validate().into_result()?;
            Ok((CreationMode::Manual, manual, String::new()))
        }
        (None, Some(text)) => {
            generator::validate_ai_input(text).into_result()?;
            Ok((CreationMode::Ai, ManualData::default(), text.to_string()))
        }
        _ => Err(Error::ConfigError("provide exactly one of --form or --ai".into())),
    }
}

fn cmd_transition(
    file: &Path,
    output: Option<&Path>,
    ctx: &Context,
    verb: &str,
    transition: impl FnOnce(&LicenseDocument) -> Result<LicenseDocument>,
) -> Result<i32> {
    let doc = read_document(file)?;
    verifier::ensure_valid(&doc)?;
    let next = transition(&doc)?;
    emit_document(&next, Some(output.unwrap_or(file)), ctx, verb)
}

fn emit_document(doc: &LicenseDocument, output: Option<&Path>, ctx: &Context, verb: &str) -> Result<i32> {
    let json = doc.to_json_pretty()?;
    match output {
        Some(path) => {
            write_text(path, &json)?;
            if !ctx.quiet {
                println!(
                    "{} {} {} (version {}, {}) → {}",
                    "✓".green(),
                    doc.license_id,
                    verb,
                    doc.current_version,
                    colored_status(doc.status),
                    path.display()
                );
            }
        }
        None => println!("{}", json),
    }
    Ok(EXIT_OK)
}

fn cmd_show(file: &Path, json: bool, ctx: &Context) -> Result<i32> {
    let doc = read_document(file)?;
    if json {
        println!("{}", doc.to_json_pretty()?);
        return Ok(EXIT_OK);
    }
    if ctx.quiet {
        return Ok(EXIT_OK);
    }

    println!("{} {}", doc.name.bold(), format!("({})", doc.license_id).dimmed());
    println!("  status:    {}", colored_status(doc.status));
    println!("  version:   {} of {}", doc.current_version, doc.versions.len());
    println!("  licensor:  {}", doc.parties.licensor);
    println!("  licensee:  {}", doc.parties.licensee);
    println!("  territory: {}", doc.parties.territory);
    if let Some(current) = doc.current() {
        println!("  duration:  {}", current.data.duration);
        println!("  ips:       {}", current.data.ips);
        for rule in &current.data.rules {
            println!("  rule:      {}: {}", rule.name, rule.royalty_rate.summary());
        }
    }

    println!();
    println!("{}", "History".bold());
    for version in &doc.versions {
        println!(
            "  v{} {} {} {}",
            version.version_number,
            colored_status(version.status),
            version.created_at.format("%Y-%m-%d %H:%M"),
            version.comment
        );
        if let Some(feedback) = &version.feedback {
            println!("      {} {}: {}", "feedback".yellow(), feedback.from, feedback.message);
        }
    }
    Ok(EXIT_OK)
}

fn cmd_validate(form: Option<&Path>, ai: Option<&str>, json: bool, ctx: &Context) -> Result<i32> {
    let errors = match (form, ai) {
        (Some(path), None) => match ManualData::from_form_json(&read_text(path)?, 0) {
            Ok(manual) => manual.validate().errors,
            Err(Error::ValidationError(missing)) => missing,
            Err(e) => return Err(e),
        },
        (None, Some(text)) => generator::validate_ai_input(text).errors,
        _ => return Err(Error::ConfigError("provide a form file or --ai text".into())),
    };

    let valid = errors.is_empty();
    if json {
        let out = serde_json::json!({
            "valid": valid,
            "errors": errors,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if valid {
        if !ctx.quiet {
            println!("{} input is valid", "✓".green());
        }
    } else {
        for e in &errors {
            eprintln!("{} {}", "error:".red().bold(), e);
        }
    }

    Ok(if valid { EXIT_OK } else { EXIT_FAILURE })
}

fn cmd_contract(file: &Path, output: Option<&Path>, ctx: &Context) -> Result<i32> {
    let doc = read_document(file)?;
    let source = solidity::generate_contract(&doc)?;
    match output {
        Some(path) => {
            write_text(path, &source)?;
            if !ctx.quiet {
                println!("{} contract written → {}", "✓".green(), path.display());
            }
        }
        None => print!("{}", source),
    }
    Ok(EXIT_OK)
}

fn cmd_compare(generated: &Path, uploaded: &Path, threshold: f64, json: bool, ctx: &Context) -> Result<i32> {
    let generated_source = if generated.extension().map_or(false, |ext| ext == "json") {
        solidity::generate_contract(&read_document(generated)?)?
    } else {
        read_text(generated)?
    };
    let uploaded_source = read_text(uploaded)?;

    let comparator = Comparator::new(PatternExtractor, ComparatorConfig { threshold });
    let comparison = comparator.compare(&generated_source, &uploaded_source);

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else if !ctx.quiet {
        let score = format!("{:.1}%", comparison.similarity);
        let verdict = if comparison.is_valid {
            format!("{} {} similar (threshold {}%)", "✓".green(), score.green(), comparison.threshold)
        } else {
            format!("{} {} similar (threshold {}%)", "✗".red(), score.red(), comparison.threshold)
        };
        println!("{}", verdict);
        println!("  matched elements: {}", comparison.matched);
        for difference in &comparison.differences {
            println!("  {}", difference.yellow());
        }
    }

    Ok(if comparison.is_valid { EXIT_OK } else { EXIT_FAILURE })
}

fn cmd_verify(file: &Path, json: bool, ctx: &Context) -> Result<i32> {
    let doc = read_document(file)?;
    let result = verifier::verify(&doc);
    let valid = result.is_valid();

    if json {
        let out = serde_json::json!({
            "valid": valid,
            "errors": result.errors().len(),
            "warnings": result.warnings().len(),
            "diagnostics": result.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for diagnostic in &result.diagnostics {
            match diagnostic.severity {
                Severity::Error => eprintln!("{}", diagnostic.to_string().red()),
                Severity::Warning if !ctx.quiet => eprintln!("{}", diagnostic.to_string().yellow()),
                Severity::Warning => {}
            }
        }
        if valid && !ctx.quiet {
            println!(
                "{} {} verified ({} warnings)",
                "✓".green(),
                doc.license_id,
                result.warnings().len()
            );
        }
    }

    Ok(if valid { EXIT_OK } else { EXIT_FAILURE })
}

fn cmd_export(file: &Path, dir: &Path, json: bool, ctx: &Context) -> Result<i32> {
    let doc = read_document(file)?;
    let bundle = export::write_bundle(&doc, dir, chrono::Utc::now())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
    } else if !ctx.quiet {
        println!("{} {}", "✓".green(), bundle.json.display());
        println!("{} {}", "✓".green(), bundle.contract.display());
    }
    Ok(EXIT_OK)
}

// ── Helpers ───────────────────────────────────────────────

pub(crate) fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::IoError(format!("{}: {}", path.display(), e)))
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).map_err(|e| Error::IoError(format!("{}: {}", path.display(), e)))
}

fn read_document(path: &Path) -> Result<LicenseDocument> {
    LicenseDocument::from_json(&read_text(path)?)
}

fn colored_status(status: VersionStatus) -> colored::ColoredString {
    let label = status.as_str();
    match status {
        VersionStatus::Draft => label.normal(),
        VersionStatus::Proposed => label.blue(),
        VersionStatus::NeedsRevision => label.yellow(),
        VersionStatus::Approved => label.green(),
        VersionStatus::Deployed => label.green().bold(),
        VersionStatus::Superseded => label.dimmed(),
    }
}

fn report_error(e: &Error) {
    match e {
        Error::ValidationError(messages) => {
            for message in messages {
                eprintln!("{} {}", "error:".red().bold(), message);
            }
        }
        other => eprintln!("{} {}", "error:".red().bold(), other),
    }
    if let Some(steps) = e.remediation() {
        for step in steps {
            eprintln!("  {} {}", "→".dimmed(), step);
        }
    }
}

/// 1 for input the user can fix, 2 for I/O, parse, config and chain failures
fn exit_code_for(e: &Error) -> i32 {
    match e {
        Error::ValidationError(_) | Error::InvalidTransition { .. } | Error::DocumentError(_) => {
            EXIT_FAILURE
        }
        _ => EXIT_ERROR,
    }
}
