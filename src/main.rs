use anyhow::{Context, Result};
use clap::Parser;
use firehose::config::Config;
use firehose::output::OutputDocument;
use firehose::pipeline;
use firehose::release::{
    collapsed_summary, collapsed_version_list, format_version, group_releases, release_type,
    ReleaseGroup, ReleaseType, SemanticVersion,
};
use std::path::PathBuf;
use std::time::Instant;

/// Get the config directory path (~/.config/firehose/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("firehose"))
}

#[derive(Parser, Debug)]
#[command(
    name = "firehose",
    version,
    about = "Aggregate release feeds into one enriched, grouped JSON document"
)]
struct Args {
    /// Config file (default: ~/.config/firehose/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the JSON document here instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Read the project catalog from a local file instead of downloading it
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Print grouped releases instead of JSON on stdout
    #[arg(long)]
    grouped: bool,
}

/// The release a group's lead follows, i.e. the next older group of the
/// same project that carries a version.
fn previous_version<'a>(
    groups: &'a [ReleaseGroup<'_>],
    index: usize,
) -> Option<&'a SemanticVersion> {
    let key = &groups[index].project_key;
    groups[index + 1..]
        .iter()
        .filter(|g| &g.project_key == key)
        .find_map(|g| g.version.as_ref())
}

fn print_groups(doc: &OutputDocument) {
    let groups = group_releases(&doc.entries);
    for (i, group) in groups.iter().enumerate() {
        let lead = &group.lead.raw;
        match &group.version {
            Some(version) => {
                let bump = release_type(version, previous_version(&groups, i));
                let label = match bump {
                    ReleaseType::Unknown => String::new(),
                    other => format!(" [{other}]"),
                };
                println!(
                    "{}  {}{}  {}",
                    group.project_key,
                    format_version(version),
                    label,
                    lead.link
                );
            }
            None => println!("{}  {}  {}", group.project_key, lead.title, lead.link),
        }
        if group.is_collapsible() {
            println!(
                "    + {}: {}",
                collapsed_summary(group),
                collapsed_version_list(group)
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let started = Instant::now();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if let Some(catalog) = args.catalog {
        config.catalog_path = Some(catalog);
    }
    if let Some(output) = args.output {
        config.output_path = Some(output);
    }

    if config.feeds.is_empty() {
        eprintln!("Error: No feeds configured in {}", config_path.display());
        eprintln!();
        eprintln!("Add one [[feeds]] table per feed, for example:");
        eprintln!("  [[feeds]]");
        eprintln!("  url = \"https://github.com/kubernetes/kubernetes/releases.atom\"");
        std::process::exit(1);
    }

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()
        .context("Failed to build HTTP client")?;

    let run = pipeline::run(&client, &config)
        .await
        .context("Pipeline run failed")?;
    let doc = OutputDocument::new(run, started.elapsed());

    match &config.output_path {
        Some(path) => doc
            .write_to(path)
            .with_context(|| format!("Failed to write output to {}", path.display()))?,
        None if !args.grouped => println!("{}", doc.to_json()?),
        None => {}
    }

    if args.grouped {
        print_groups(&doc);
    }

    let stats = &doc.metadata.stats;
    eprintln!(
        "Fetched {}/{} feeds ({} failed), {} entries, {} of {} catalog projects matched in {:.1}s",
        stats.feeds_successful,
        stats.feeds_total,
        stats.feeds_failed,
        stats.entries_total,
        stats.catalog_projects_matched,
        stats.catalog_projects_total,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
