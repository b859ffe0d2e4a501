//! yggbind - Operator Tool for the Yggdrasil Engine Binding
//!
//! Loads the native engine, optionally feeds it a state document, and
//! evaluates toggles or dumps what the engine knows.

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use serde_json::json;
use tracing::info;
use yggbind_core::{init_logging, BindingConfig, Context, Engine};

fn print_help() {
    println!("yggbind - Yggdrasil engine binding v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("  yggbind [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -l, --lib <PATH>        Native engine library (default: search paths)");
    println!("  -c, --config <FILE>     JSON binding configuration");
    println!("  -s, --state <FILE>      Load a toggle state document");
    println!("  -t, --toggle <NAME>     Evaluate a toggle (repeatable)");
    println!("  -u, --user <ID>         User id for evaluation");
    println!("      --context <FILE>    JSON evaluation context");
    println!("      --list              List known toggles");
    println!("      --metrics           Print evaluation metrics");
    println!("      --strategies        Print built-in strategy names");
    println!("  -h, --help              Print this help message");
    println!("  -v, --version           Print version information");
    println!();
    println!("ENVIRONMENT:");
    println!("  YGGDRASIL_LIB_PATH, YGGDRASIL_LIB_DIR, HOSTNAME, RUST_LOG");
}

#[derive(Debug, Default)]
struct Options {
    library: Option<PathBuf>,
    config: Option<PathBuf>,
    state: Option<PathBuf>,
    toggles: Vec<String>,
    user: Option<String>,
    context: Option<PathBuf>,
    list: bool,
    metrics: bool,
    strategies: bool,
}

/// `Ok(None)` when the invocation was fully handled (help, version).
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Options>> {
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("missing value for '{flag}'"))
        };
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "-v" | "--version" => {
                println!("yggbind {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "-l" | "--lib" => options.library = Some(value(&arg)?.into()),
            "-c" | "--config" => options.config = Some(value(&arg)?.into()),
            "-s" | "--state" => options.state = Some(value(&arg)?.into()),
            "-t" | "--toggle" => options.toggles.push(value(&arg)?),
            "-u" | "--user" => options.user = Some(value(&arg)?),
            "--context" => options.context = Some(value(&arg)?.into()),
            "--list" => options.list = true,
            "--metrics" => options.metrics = true,
            "--strategies" => options.strategies = true,
            other => bail!("unrecognized argument '{other}', run 'yggbind --help' for usage"),
        }
    }

    Ok(Some(options))
}

fn load_config(options: &Options) -> Result<BindingConfig> {
    let mut config = match &options.config {
        Some(path) => BindingConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => BindingConfig::default(),
    };
    config = config.with_vars(|key| std::env::var(key).ok());
    if let Some(library) = &options.library {
        config.library_path = Some(library.clone());
    }
    Ok(config)
}

fn load_context(options: &Options) -> Result<Context> {
    let mut context = match &options.context {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read context {}", path.display()))?;
            serde_json::from_str(&text).context("invalid context document")?
        }
        None => Context::new(),
    };
    if let Some(user) = &options.user {
        context.user_id = Some(user.clone());
    }
    Ok(context)
}

fn run(options: Options) -> Result<()> {
    let config = load_config(&options)?;
    let engine = Engine::open(&config, Vec::new()).context("failed to start engine")?;
    info!(
        core_version = engine.core_version()?.as_deref().unwrap_or("unknown"),
        "Engine ready"
    );

    if let Some(path) = &options.state {
        let state = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state {}", path.display()))?;
        engine.load_state(&state)?;
    }

    if options.strategies {
        println!("{}", serde_json::to_string_pretty(&engine.built_in_strategies()?)?);
    }

    let context = load_context(&options)?;
    let mut worker = engine.worker();
    for toggle in &options.toggles {
        let enabled = worker.check_enabled(toggle, &context)?;
        let variant = worker.get_variant(toggle, &context)?;
        let report = json!({
            "toggle": toggle,
            "found": enabled.is_some(),
            "enabled": enabled.as_ref().map(|e| e.value),
            "impressionData": enabled.as_ref().map(|e| e.impression_data),
            "variant": variant,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if options.list {
        println!("{}", serde_json::to_string_pretty(&engine.list_known_toggles()?)?);
    }

    if options.metrics {
        match engine.get_metrics()? {
            Some(bucket) => println!("{}", serde_json::to_string_pretty(&bucket)?),
            None => println!("null"),
        }
    }

    engine.dispose();
    Ok(())
}

fn main() -> Result<()> {
    let Some(options) = parse_args(std::env::args().skip(1))? else {
        return Ok(());
    };

    init_logging();
    run(options)
}
