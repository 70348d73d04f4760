//! ses - command-line front end for the Simple Email Service
//!
//! Reads credentials from the environment (see `ses::config`), performs one
//! action and prints the result as a table or as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use prettytable::{row, Table};
use serde::{Deserialize, Serialize};
use ses::{Config, Message, SimpleEmailService};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments for ses.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Simple Email Service client",
    long_about = "Sends mail and inspects sending limits through the Simple Email Service query API.\n\n\
                  Credentials are read from SES_ACCESS_KEY_ID / SES_SECRET_ACCESS_KEY \
                  (falling back to AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY); \
                  SES_HOST and SES_TIMEOUT_SECS are optional."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format: table, json
    #[arg(short, long, default_value = "table", global = true)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current sending limits
    Quota,
    /// Show sending statistics for the last two weeks
    Stats,
    /// List verified sender addresses
    List,
    /// Start verification of a sender address
    Verify { email: String },
    /// Remove an address from the verified list
    Delete { email: String },
    /// Compose and send a message
    Send {
        #[arg(long)]
        from: String,
        #[arg(long, required = true)]
        to: Vec<String>,
        #[arg(long)]
        cc: Vec<String>,
        #[arg(long)]
        bcc: Vec<String>,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        /// Optional HTML alternative of the body
        #[arg(long)]
        html: Option<String>,
    },
    /// Send a prepared MIME file as-is
    SendRaw {
        #[arg(long)]
        from: String,
        #[arg(long, required = true)]
        to: Vec<String>,
        /// Path to the raw MIME message
        file: PathBuf,
    },
}

/// Supported output formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_request_id(request_id: &str) {
    println!("{}: {}", "Request Id".bold(), request_id);
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    let config = Config::new().context("Failed to load configuration")?;
    log::debug!("Using host {}", config.host);
    let client = SimpleEmailService::with_credentials(config.credentials()?, config.timeout)
        .context("Failed to create client")?;

    let json = matches!(cli.output, OutputFormat::Json);

    match cli.command {
        Command::Quota => {
            let quota = client.get_send_quota().context("GetSendQuota failed")?;
            if json {
                return print_json(&quota);
            }
            println!("{}", "Sending Quota".bold().blue());
            println!("{}", "----------------------------".dimmed());
            println!("{}: {}", "Max 24 Hour Send".bold(), quota.max_24_hour_send);
            println!("{}: {}", "Max Send Rate".bold(), quota.max_send_rate);
            println!("{}: {}", "Sent Last 24 Hours".bold(), quota.sent_last_24_hours);
            print_request_id(&quota.request_id);
        }
        Command::Stats => {
            let stats = client.get_send_statistics().context("GetSendStatistics failed")?;
            if json {
                return print_json(&stats);
            }
            if stats.data_points.is_empty() {
                println!("{}", "No sending activity recorded.".yellow());
            } else {
                let mut points = stats.data_points.clone();
                points.sort_by_key(|p| p.timestamp);
                let mut table = Table::new();
                table.add_row(row!["Timestamp", "Attempts", "Rejects", "Bounces", "Complaints"]);
                for p in &points {
                    table.add_row(row![
                        p.timestamp.to_rfc3339(),
                        p.delivery_attempts,
                        p.rejects,
                        p.bounces,
                        p.complaints
                    ]);
                }
                table.printstd();
            }
            print_request_id(&stats.request_id);
        }
        Command::List => {
            let list = client
                .list_verified_email_addresses()
                .context("ListVerifiedEmailAddresses failed")?;
            if json {
                return print_json(&list);
            }
            if list.addresses.is_empty() {
                println!("{}", "No verified addresses.".yellow());
            } else {
                let mut table = Table::new();
                table.add_row(row!["Verified Address"]);
                for address in &list.addresses {
                    table.add_row(row![address]);
                }
                table.printstd();
            }
            print_request_id(&list.request_id);
        }
        Command::Verify { email } => {
            let metadata = client
                .verify_email_address(&email)
                .context("VerifyEmailAddress failed")?;
            if json {
                return print_json(&metadata);
            }
            println!("{} {}", "Verification mail sent to".green(), email);
            print_request_id(&metadata.request_id);
        }
        Command::Delete { email } => {
            let metadata = client
                .delete_verified_email_address(&email)
                .context("DeleteVerifiedEmailAddress failed")?;
            if json {
                return print_json(&metadata);
            }
            println!("{} {}", "Removed".green(), email);
            print_request_id(&metadata.request_id);
        }
        Command::Send {
            from,
            to,
            cc,
            bcc,
            subject,
            body,
            html,
        } => {
            let mut message = Message::new(from, subject, body)?.to(to).cc(cc).bcc(bcc);
            if let Some(html) = html {
                message = message.attach_alternative(html, "text/html")?;
            }
            let result = client.send_email(&message).context("SendEmail failed")?;
            if json {
                return print_json(&result);
            }
            println!("{}: {}", "Message Id".bold(), result.message_id);
            print_request_id(&result.request_id);
        }
        Command::SendRaw { from, to, file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let result = client
                .send_raw_email(&from, &to, &raw)
                .context("SendRawEmail failed")?;
            if json {
                return print_json(&result);
            }
            println!("{}: {}", "Message Id".bold(), result.message_id);
            print_request_id(&result.request_id);
        }
    }

    Ok(())
}
