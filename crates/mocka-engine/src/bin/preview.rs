//! Preview tool: load a rule file and show what the engine would do with
//! it, without intercepting anything.

use anyhow::Context;
use clap::Parser;

use mocka_engine::config::MockConfig;
use mocka_engine::declarative::build_rules;
use mocka_engine::flatten::flatten;

#[derive(Parser, Debug)]
#[command(name = "mocka-preview")]
#[command(about = "Preview the flattened mock table and declarative rules for a rule file")]
struct Args {
    /// Rule file (JSON, or YAML by extension)
    #[arg(short, long)]
    config: String,

    /// Origin to flatten for
    #[arg(short, long, default_value = "localhost")]
    origin: String,

    /// Also print the declarative redirect rules as JSON
    #[arg(long)]
    declarative: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = MockConfig::from_file(&args.config)
        .with_context(|| format!("failed to load rule file {}", args.config))?;

    let table = flatten(&config.rule_set, &args.origin);
    println!(
        "{} ({} group(s), {} endpoint(s) defined)",
        if config.enabled { "enabled" } else { "disabled" },
        config.rule_set.groups.len(),
        config.rule_set.endpoint_count(),
    );
    println!("flattened for origin {}: {} mock(s)", args.origin, table.len());
    for entry in table.iter() {
        println!(
            "  {}  [group {}]  payload: {}",
            entry.path,
            entry.group_key,
            serde_json::to_string(&entry.payload)?
        );
    }

    if args.declarative {
        let rules = build_rules(&config.rule_set);
        println!("declarative rules: {}", rules.len());
        println!("{}", serde_json::to_string_pretty(&rules)?);
    }

    Ok(())
}
