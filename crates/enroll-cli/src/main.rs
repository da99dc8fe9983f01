//! `enroll`: staff command-line client for the enrollment admission API.
//!
//! # Usage
//!
//! ```text
//! enroll --url http://localhost:8080 --worker alice queue
//! enroll --config ~/.config/enroll/config.toml claim
//! ENROLL_WORKER=alice enroll complete 12
//! ```

mod client;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use enroll_core::application::ApplicationForm;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "enroll", about = "Staff client for the enrollment admission queue")]
struct Args {
  /// Path to a TOML config file (url, worker).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the enroll server (default: http://localhost:8080).
  #[arg(long, env = "ENROLL_URL")]
  url: Option<String>,

  /// Worker identity sent with every request.
  #[arg(long, env = "ENROLL_WORKER")]
  worker: Option<String>,

  /// Print raw JSON instead of formatted text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Submit a new application on behalf of an applicant.
  Submit(SubmitArgs),
  /// List applications.
  Applications {
    #[arg(long)]
    status:      Option<String>,
    #[arg(long)]
    grade_level: Option<String>,
    #[arg(long)]
    search:      Option<String>,
  },
  /// Show one application.
  Application { id: i64 },
  /// Approve or reject an application.
  Decide {
    id:       i64,
    /// `approved` or `rejected`.
    decision: String,
    #[arg(long)]
    notes:    Option<String>,
  },
  /// Show the queue in serving order.
  Queue {
    #[arg(long)]
    status:   Option<String>,
    #[arg(long)]
    priority: Option<String>,
  },
  /// Show who is next, without claiming.
  Next,
  /// Show items you currently hold.
  Mine,
  /// Claim the next item, or a specific one by id.
  Claim { id: Option<i64> },
  /// Complete an item you hold.
  Complete { id: i64 },
  /// Hand an item you hold back to the line.
  Release { id: i64 },
  /// Cancel an active item.
  Cancel {
    id:     i64,
    #[arg(long)]
    reason: Option<String>,
  },
  /// Show statistics.
  Stats {
    #[arg(value_enum, default_value = "queue")]
    report: Report,
    /// Bucket width for `trends`: `daily`, `weekly`, or `monthly`.
    #[arg(long, default_value = "monthly")]
    period: String,
  },
  /// Show the activity log, newest first.
  Activity {
    #[arg(long, default_value_t = 50)]
    limit: usize,
  },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Report {
  Queue,
  Dashboard,
  Enrollments,
  Analytics,
  Grades,
  Trends,
}

#[derive(clap::Args, Debug)]
struct SubmitArgs {
  /// Read the full form from a JSON file; flags below override its fields.
  #[arg(long, value_name = "FILE")]
  from_file:     Option<PathBuf>,
  #[arg(long)]
  first_name:    Option<String>,
  #[arg(long)]
  last_name:     Option<String>,
  #[arg(long)]
  email:         Option<String>,
  #[arg(long)]
  phone:         Option<String>,
  #[arg(long)]
  academic_year: Option<String>,
  /// `grade11`, `grade12`, or `college`.
  #[arg(long)]
  grade_level:   Option<String>,
  /// `high`, `medium`, or `low`.
  #[arg(long)]
  priority:      Option<String>,
}

impl SubmitArgs {
  fn into_form(self) -> Result<ApplicationForm> {
    let mut form: ApplicationForm = match &self.from_file {
      Some(path) => {
        let raw = std::fs::read_to_string(path)
          .with_context(|| format!("reading form file {}", path.display()))?;
        serde_json::from_str(&raw).context("parsing form file")?
      }
      None => ApplicationForm::default(),
    };
    let set = |slot: &mut Option<String>, value: Option<String>| {
      if value.is_some() {
        *slot = value;
      }
    };
    set(&mut form.first_name, self.first_name);
    set(&mut form.last_name, self.last_name);
    set(&mut form.email, self.email);
    set(&mut form.phone, self.phone);
    set(&mut form.academic_year, self.academic_year);
    set(&mut form.grade_level, self.grade_level);
    set(&mut form.priority_level, self.priority);
    Ok(form)
  }
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:    String,
  #[serde(default)]
  worker: String,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    worker:   args
      .worker
      .or_else(|| (!file_cfg.worker.is_empty()).then(|| file_cfg.worker.clone())),
  };

  let client = ApiClient::new(api_config)?;
  run(&client, args.command, args.json).await
}

/// Print `value` as JSON or through `text`.
fn show<T: Serialize>(value: &T, json: bool, text: impl FnOnce(&T) -> String) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(value)?);
  } else {
    println!("{}", text(value));
  }
  Ok(())
}

fn lines<T>(items: &[T], line: fn(&T) -> String) -> String {
  if items.is_empty() {
    return "(none)".to_string();
  }
  items.iter().map(line).collect::<Vec<_>>().join("\n")
}

fn filters(pairs: [(&'static str, Option<String>); 2]) -> Vec<(&'static str, String)> {
  pairs.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))).collect()
}

async fn run(client: &ApiClient, command: Command, json: bool) -> Result<()> {
  match command {
    Command::Submit(args) => {
      let receipt = client.submit(&args.into_form()?).await?;
      show(&receipt, json, |r| {
        format!(
          "student number {}, application {}, queue number {}",
          r.student_number, r.application_id, r.queue_number
        )
      })
    }
    Command::Applications { status, grade_level, search } => {
      let mut query = filters([("status", status), ("grade_level", grade_level)]);
      query.extend(search.map(|s| ("search", s)));
      let apps = client.list_applications(&query).await?;
      show(&apps, json, |a| lines(a, render::application))
    }
    Command::Application { id } => {
      let app = client.get_application(id).await?;
      show(&app, json, render::application)
    }
    Command::Decide { id, decision, notes } => {
      let app = client.decide(id, &decision, notes.as_deref()).await?;
      show(&app, json, |a| format!("application {} is now {}", a.id, a.status))
    }
    Command::Queue { status, priority } => {
      let query = filters([("status", status), ("priority", priority)]);
      let listing = client.list_queue(&query).await?;
      show(&listing, json, |l| {
        let body = lines(&l.items, render::queue_entry);
        if l.degraded {
          format!("(queue unavailable)\n{body}")
        } else {
          body
        }
      })
    }
    Command::Next => {
      let head = client.peek().await?;
      show(&head, json, |h| match h {
        Some(e) => render::queue_entry(e),
        None => "queue is empty".to_string(),
      })
    }
    Command::Mine => {
      let items = client.mine().await?;
      show(&items, json, |i| lines(i, render::queue_entry))
    }
    Command::Claim { id } => {
      let item = client.claim(id).await?;
      show(&item, json, render::queue_item)
    }
    Command::Complete { id } => {
      let item = client.transition(id, "complete").await?;
      show(&item, json, render::queue_item)
    }
    Command::Release { id } => {
      let item = client.transition(id, "release").await?;
      show(&item, json, render::queue_item)
    }
    Command::Cancel { id, reason } => {
      let item = client.cancel(id, reason.as_deref()).await?;
      show(&item, json, render::queue_item)
    }
    Command::Stats { report, period } => match report {
      Report::Queue => show(&client.queue_stats().await?, json, render::queue_stats),
      Report::Dashboard => show(&client.dashboard().await?, json, render::dashboard),
      Report::Enrollments => show(&client.enrollments().await?, json, |c| {
        format!(
          "pending {}  approved {}  rejected {}  total {}",
          c.pending,
          c.approved,
          c.rejected,
          c.total()
        )
      }),
      Report::Analytics => show(&client.analytics().await?, json, render::analytics),
      Report::Grades => {
        let levels = client.grade_levels().await?;
        show(&levels, json, |l| lines(l, render::grade_level))
      }
      Report::Trends => {
        let trends = client.enrollment_trends(&period).await?;
        show(&trends, json, |t| lines(t, render::trend))
      }
    },
    Command::Activity { limit } => {
      let entries = client.activity(limit).await?;
      show(&entries, json, |e| lines(e, render::activity))
    }
  }
}
