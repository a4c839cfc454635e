//! # scim-conformance
//!
//! Command-line front end for offline validation of SCIM documents and for
//! live conformance probing of SCIM servers.
//!
//! ## Usage
//!
//! ### Validate a resource or PATCH document
//!
//! ```bash
//! scim-conformance validate user.json
//! cat patch.json | scim-conformance validate - --patch --json
//! ```
//!
//! ### Probe a live server
//!
//! ```bash
//! SCIM_TOKEN=... scim-conformance probe https://scim.example.com/scim/v2 \
//!     --i-accept-side-effects --compat --resource Agent
//! ```
//!
//! The probe creates, modifies and deletes resources whose names start with
//! `scim-sanity-test-`. It refuses to run without `--i-accept-side-effects`.
//!
//! ## Exit Codes
//!
//! - `0`: document valid, or no probe check failed
//! - `1`: validation errors, or at least one probe check failed
//! - `2`: operational error (unreadable input, bad configuration, unreachable
//!   server, missing consent)

use clap::{Args, Parser, Subcommand};
use log::{LevelFilter, debug};
use serde_json::json;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use scim_conformance::config::{ProbeConfig, ValidationMode};
use scim_conformance::report::{ProbeReport, ValidationReport};
use scim_conformance::schema::{ResourceKind, SchemaRegistry};
use scim_conformance::validator::{DocumentKind, Validator};
use scim_conformance::{ProbeEngine, ScimError, ScimResult};

const EXIT_OPERATIONAL: i32 = 2;

#[derive(Parser)]
#[command(
    name = "scim-conformance",
    version,
    about = "Validate SCIM 2.0 documents and probe SCIM servers for conformance"
)]
struct Cli {
    /// Log progress to stderr (repeat for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a single JSON document offline
    Validate(ValidateArgs),
    /// Run the live conformance probe against a server
    Probe(ProbeArgs),
}

#[derive(Args)]
struct ValidateArgs {
    /// Document to validate; `-` reads stdin
    #[arg(default_value = "-")]
    path: String,

    /// Treat the document as a PATCH request body
    #[arg(long)]
    patch: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ProbeArgs {
    /// SCIM base URL, e.g. https://scim.example.com/scim/v2
    base_url: String,

    /// Bearer token
    #[arg(long, env = "SCIM_TOKEN", hide_env_values = true, conflicts_with = "username")]
    token: Option<String>,

    /// Basic auth username
    #[arg(long, env = "SCIM_USERNAME", requires = "password")]
    username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "SCIM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Acknowledge that the probe creates, modifies and deletes data
    #[arg(long = "i-accept-side-effects")]
    accept_side_effects: bool,

    /// Report tolerated deviations as warnings instead of failures
    #[arg(long)]
    compat: bool,

    /// Only run the lifecycle of this resource type
    #[arg(long = "resource", value_name = "TYPE")]
    resource: Option<ResourceKind>,

    /// Leave created resources on the server
    #[arg(long)]
    skip_cleanup: bool,

    /// Disable TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Extra PEM root certificates
    #[arg(long, value_name = "PATH")]
    ca_bundle: Option<PathBuf>,

    /// HTTP(S) proxy URL
    #[arg(long)]
    proxy: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Deadline for the whole run in seconds
    #[arg(long, value_name = "SECONDS")]
    run_timeout: Option<u64>,

    /// Number of agents in the rapid create/delete phase (at most 10)
    #[arg(long, default_value_t = 10)]
    rapid_count: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Command::Validate(args) => validate(args),
        Command::Probe(args) => probe(args).await,
    };
    process::exit(code);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .format_timestamp(None)
        .init();
}

fn validate(args: ValidateArgs) -> i32 {
    let document = if args.patch {
        DocumentKind::Patch
    } else {
        DocumentKind::Resource
    };

    let report = match validate_document(&args.path, document) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_OPERATIONAL;
        }
    };

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return EXIT_OPERATIONAL;
            }
        }
    } else {
        print!("{}", report);
    }
    report.exit_code()
}

fn validate_document(path: &str, document: DocumentKind) -> ScimResult<ValidationReport> {
    let registry = SchemaRegistry::new()?;
    let validator = Validator::new(&registry);

    let reader: Box<dyn Read> = if path == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(path)?)
    };
    let errors = validator.validate_reader(reader, document)?;
    debug!("{}: {} validation errors", path, errors.len());

    Ok(ValidationReport::new(path, document, errors))
}

async fn probe(args: ProbeArgs) -> i32 {
    let json_output = args.json;

    let report = match run_probe(args).await {
        Ok(report) => report,
        Err(ScimError::ConsentRequired { message }) => {
            if json_output {
                println!(
                    "{}",
                    json!({"error": "consent_required", "message": message})
                );
            } else {
                eprintln!("Refusing to probe: {}", message);
            }
            return EXIT_OPERATIONAL;
        }
        Err(e) => {
            if json_output {
                println!("{}", json!({"error": "operational", "message": e.to_string()}));
            } else {
                eprintln!("Error: {}", e);
            }
            return EXIT_OPERATIONAL;
        }
    };

    if json_output {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return EXIT_OPERATIONAL;
            }
        }
    } else {
        print!("{}", report.render_text());
    }
    report.exit_code()
}

async fn run_probe(args: ProbeArgs) -> ScimResult<ProbeReport> {
    let mut builder = ProbeConfig::builder(args.base_url)
        .with_mode(if args.compat {
            ValidationMode::Compat
        } else {
            ValidationMode::Strict
        })
        .with_tls_verification(!args.insecure)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_rapid_agent_count(args.rapid_count)
        .skip_cleanup(args.skip_cleanup)
        .accept_side_effects(args.accept_side_effects);

    if let Some(token) = args.token {
        builder = builder.with_bearer_token(token);
    }
    if let (Some(username), Some(password)) = (args.username, args.password) {
        builder = builder.with_basic_auth(username, password);
    }
    if let Some(kind) = args.resource {
        builder = builder.with_resource_filter(kind);
    }
    if let Some(path) = args.ca_bundle {
        builder = builder.with_ca_bundle(path);
    }
    if let Some(proxy) = args.proxy {
        builder = builder.with_proxy(proxy);
    }
    if let Some(seconds) = args.run_timeout {
        builder = builder.with_run_timeout(Duration::from_secs(seconds));
    }

    let config = builder.build()?;
    let outcome = ProbeEngine::connect(config)?.run().await?;
    Ok(ProbeReport::new(outcome))
}
