//! meterdb CLI
//!
//! Command-line interface for meterdb operations:
//! - Create, list and delete channels
//! - Add readings
//! - Query bucketed data and statistics
//! - Export data as CSV

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use meterdb::channel::{Channel, ChannelCatalog, ChannelKindRegistry};
use meterdb::config::{generate_default_config, Config, StorageBackend};
use meterdb::logging::init_logging;
use meterdb::query::{Bucket, GroupBy};
use meterdb::storage::{MemoryStore, NewChannel, NewReading, SqliteStore, TimeFilter};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "meterdb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Channel time-series storage and aggregation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: platform config dir, then ./meterdb.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

/// Time window shared by the data commands
#[derive(Debug, Clone, clap::Args)]
pub struct Window {
    /// Exclusive lower bound. Supports: "now", "yesterday", RFC 3339, Unix ms
    #[arg(long)]
    from: Option<String>,
    /// Exclusive upper bound; values in the future mean unbounded
    #[arg(long)]
    to: Option<String>,
}

impl Window {
    fn filter(&self) -> anyhow::Result<TimeFilter> {
        let from = self.from.as_deref().map(parse_time).transpose()?;
        let to = self.to.as_deref().map(parse_time).transpose()?;
        Ok(TimeFilter::new(from, to))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a channel
    Create {
        /// Channel type tag (meter, sensor)
        kind: String,
        /// Channel title
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List channels
    List {
        /// Only channels of this type
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Add a reading to a channel
    Add {
        channel: i64,
        value: f64,
        /// Timestamp (default: now). Supports: "now", "yesterday", RFC 3339, Unix ms
        #[arg(short, long)]
        time: Option<String>,
    },

    /// Show a channel's data
    Data {
        channel: i64,
        #[command(flatten)]
        window: Window,
        /// none, year, month, week, day, hour, minute or a bucket count
        #[arg(short, long)]
        group_by: Option<String>,
    },

    /// Show min, max, average and count of a channel's readings
    Stats {
        channel: i64,
        #[command(flatten)]
        window: Window,
    },

    /// Delete a channel's readings (all of them without bounds)
    Reset {
        channel: i64,
        #[command(flatten)]
        window: Window,
    },

    /// Delete a channel and all its readings
    Delete { channel: i64 },

    /// Export a channel's data as CSV
    Export {
        channel: i64,
        #[command(flatten)]
        window: Window,
        #[arg(short, long)]
        group_by: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct Stats {
    channel: i64,
    count: u64,
    min: Option<f64>,
    max: Option<f64>,
    average: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let catalog = open_catalog(&config)?;
    run(cli, &catalog).await
}

async fn run(cli: Cli, catalog: &ChannelCatalog) -> anyhow::Result<()> {
    match cli.command {
        Commands::Create {
            kind,
            title,
            description,
        } => {
            let mut new = NewChannel::new(kind, title);
            new.description = description;
            let channel = catalog.create(new).await?;

            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(channel.record())?),
                Format::Table => println!("Created {} channel {}", channel.kind().tag(), channel.id()),
            }
        }

        Commands::List { kind } => {
            let channels = match kind.as_deref() {
                Some(tag) => catalog.find_by_type(tag).await?,
                None => catalog.all().await?,
            };

            match cli.format {
                Format::Json => {
                    let records: Vec<_> = channels.values().map(|c| c.record()).collect();
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                Format::Table if channels.is_empty() => {
                    println!("No channels defined yet.");
                    println!();
                    println!("Create your first channel with:");
                    println!("  meterdb create meter \"Power\"");
                }
                Format::Table => {
                    println!("{:<6} {:<8} {:<24} {}", "ID", "Type", "Title", "Description");
                    println!("{}", "-".repeat(60));
                    for channel in channels.values() {
                        let record = channel.record();
                        println!(
                            "{:<6} {:<8} {:<24} {}",
                            record.id,
                            record.kind,
                            record.title,
                            record.description.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
        }

        Commands::Add {
            channel,
            value,
            time,
        } => {
            let timestamp = match time.as_deref() {
                Some(s) => parse_time(s)?,
                None => Utc::now().timestamp_millis(),
            };
            let channel = catalog.resolve(channel).await?;
            channel.add_data(NewReading::new(timestamp, value)).await?;

            if cli.format == Format::Table {
                println!("Added {} to channel {} at {}", value, channel.id(), format_time(timestamp));
            }
        }

        Commands::Data {
            channel,
            window,
            group_by,
        } => {
            let channel = catalog.resolve(channel).await?;
            let buckets = channel
                .get_data(window.filter()?, GroupBy::from(group_by.as_deref()))
                .await?;

            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&buckets)?),
                Format::Table => print_table(&buckets),
            }
        }

        Commands::Stats { channel, window } => {
            let channel = catalog.resolve(channel).await?;
            let stats = collect_stats(&channel, window.filter()?).await?;

            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                Format::Table => {
                    let show = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());
                    println!("Channel {} ({})", stats.channel, channel.title());
                    println!("  Readings: {}", stats.count);
                    println!("  Min:      {}", show(stats.min));
                    println!("  Max:      {}", show(stats.max));
                    println!("  Average:  {}", show(stats.average));
                }
            }
        }

        Commands::Reset { channel, window } => {
            let channel = catalog.resolve(channel).await?;
            let removed = channel.reset(window.filter()?).await?;

            match cli.format {
                Format::Json => println!("{}", serde_json::json!({ "removed": removed })),
                Format::Table => println!("Removed {} readings from channel {}", removed, channel.id()),
            }
        }

        Commands::Delete { channel } => {
            catalog.delete(channel).await?;
            if cli.format == Format::Table {
                println!("Deleted channel {}", channel);
            }
        }

        Commands::Export {
            channel,
            window,
            group_by,
            output,
        } => {
            let channel = catalog.resolve(channel).await?;
            let buckets = channel
                .get_data(window.filter()?, GroupBy::from(group_by.as_deref()))
                .await?;

            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("Cannot create {:?}", path))?;
                    write_csv(file, &buckets)?;
                    println!("Exported {} rows to {:?}", buckets.len(), path);
                }
                None => write_csv(std::io::stdout().lock(), &buckets)?,
            }
        }

        Commands::Config { output } => write_default_config(output.as_ref())?,
    }

    Ok(())
}

fn open_catalog(config: &Config) -> anyhow::Result<ChannelCatalog> {
    let kinds = ChannelKindRegistry::with_defaults();
    let zone = config.aggregation.timezone;

    let catalog = match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = expand_home(&config.storage.database_path);
            tracing::debug!("Database: {:?}", path);
            let store = SqliteStore::open(&path)
                .with_context(|| format!("Cannot open database {:?}", path))?;
            ChannelCatalog::with_store(Arc::new(store), kinds, zone)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory backend, nothing is kept after exit");
            ChannelCatalog::with_store(Arc::new(MemoryStore::new()), kinds, zone)
        }
    };

    Ok(catalog)
}

async fn collect_stats(channel: &Channel, filter: TimeFilter) -> anyhow::Result<Stats> {
    let summary = channel.summary(filter).await?;
    Ok(Stats {
        channel: channel.id(),
        count: summary.count,
        min: summary.min,
        max: summary.max,
        average: summary.average(),
    })
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }

    Ok(())
}

fn parse_time(s: &str) -> anyhow::Result<i64> {
    match s.trim() {
        "now" => Ok(Utc::now().timestamp_millis()),
        "yesterday" => Ok((Utc::now() - Duration::days(1)).timestamp_millis()),
        s => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                Ok(dt.timestamp_millis())
            } else if let Ok(ms) = s.parse::<i64>() {
                Ok(ms)
            } else {
                bail!("Invalid timestamp format: {}. Use: now, yesterday, RFC 3339 or Unix ms", s)
            }
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn format_time(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn print_table(buckets: &[Bucket]) {
    if buckets.is_empty() {
        println!("No data for the selected time range");
        return;
    }

    println!("{:<26} | {:>14} | {:>6}", "Timestamp", "Value", "Count");
    println!("{}", "-".repeat(52));

    for bucket in buckets {
        println!(
            "{:<26} | {:>14.3} | {:>6}",
            format_time(bucket.timestamp),
            bucket.value,
            bucket.count
        );
    }
}

fn write_csv<W: std::io::Write>(writer: W, buckets: &[Bucket]) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for bucket in buckets {
        csv.serialize(bucket)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("1700000000000").unwrap(), 1_700_000_000_000);
        assert_eq!(parse_time("1970-01-01T00:00:01Z").unwrap(), 1000);
        assert!(parse_time("last tuesday").is_err());

        let now = Utc::now().timestamp_millis();
        assert!(parse_time("now").unwrap() >= now);
        assert!(parse_time("yesterday").unwrap() < now);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/lib/meterdb.db"), PathBuf::from("/var/lib/meterdb.db"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/m.db"), home.join("m.db"));
        }
    }

    #[test]
    fn test_write_csv() {
        let buckets = vec![
            Bucket {
                timestamp: 3000,
                value: 6.0,
                count: 3,
            },
            Bucket {
                timestamp: 5000,
                value: 9.0,
                count: 2,
            },
        ];

        let mut out = Vec::new();
        write_csv(&mut out, &buckets).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "timestamp,value,count\n3000,6.0,3\n5000,9.0,2\n");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["meterdb", "--format", "json", "data", "3", "--from", "1000", "-g", "day"]).unwrap();
        assert_eq!(cli.format, Format::Json);
        match cli.command {
            Commands::Data { channel, window, group_by } => {
                assert_eq!(channel, 3);
                assert_eq!(window.filter().unwrap(), TimeFilter::new(Some(1000), None));
                assert_eq!(group_by.as_deref(), Some("day"));
            }
            _ => panic!("expected data command"),
        }
    }

    #[tokio::test]
    async fn test_stats_on_memory_catalog() {
        let catalog = ChannelCatalog::with_store(
            Arc::new(MemoryStore::new()),
            ChannelKindRegistry::with_defaults(),
            meterdb::query::CalendarZone::Utc,
        );
        let channel = catalog.create(NewChannel::new("sensor", "Temp")).await.unwrap();
        for (ts, v) in [(1000, 4.0), (2000, 8.0)] {
            channel.add_data(NewReading::new(ts, v)).await.unwrap();
        }

        let stats = collect_stats(&channel, TimeFilter::all()).await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.average, Some(6.0));

        let empty = collect_stats(&channel, TimeFilter::all().after(2000)).await.unwrap();
        assert_eq!(empty.count, 0);
        assert!(empty.min.is_none());
    }
}
