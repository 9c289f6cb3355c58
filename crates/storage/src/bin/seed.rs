use std::fmt;

use chrono::{DateTime, Utc};
use quest_core::model::{Catalog, LevelIndex, Profile, UserId};
use storage::repository::Storage;

const USAGE: &str = "\
Usage:
  cargo run -p storage --bin seed -- [options]

Options:
  --db <sqlite_url>       SQLite URL (default: sqlite:quest.sqlite3?mode=rwc)
  --user <handle>         User handle to seed (default: demo-learner)
  --name <display name>   Profile display name (default: Demo Learner)
  --completed <n>         Levels marked completed, capped at the catalog (default: 1)
  --now <rfc3339>         Fixed current time for deterministic seeding
  -h, --help              Show this help

Environment (same as flags):
  QUEST_DB_URL, QUEST_USER, QUEST_NAME, QUEST_COMPLETED";

#[derive(Debug)]
enum SeedArgsError {
    MissingValue(&'static str),
    Unknown(String),
    BadValue { flag: &'static str, raw: String },
}

impl fmt::Display for SeedArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedArgsError::MissingValue(flag) => write!(f, "{flag} requires a value"),
            SeedArgsError::Unknown(arg) => write!(f, "unknown argument: {arg}"),
            SeedArgsError::BadValue { flag, raw } => write!(f, "invalid {flag} value: {raw:?}"),
        }
    }
}

impl std::error::Error for SeedArgsError {}

#[derive(Debug)]
struct SeedPlan {
    db_url: String,
    user: UserId,
    name: String,
    completed_levels: u32,
    now: Option<DateTime<Utc>>,
}

impl SeedPlan {
    fn from_args(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SeedArgsError> {
        let mut db_url =
            env("QUEST_DB_URL").unwrap_or_else(|| "sqlite:quest.sqlite3?mode=rwc".into());
        let mut user = env("QUEST_USER").unwrap_or_else(|| "demo-learner".into());
        let mut name = env("QUEST_NAME").unwrap_or_else(|| "Demo Learner".into());
        let mut completed = env("QUEST_COMPLETED").unwrap_or_else(|| "1".into());
        let mut now = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let flag = match arg.as_str() {
                "--db" => "--db",
                "--user" => "--user",
                "--name" => "--name",
                "--completed" => "--completed",
                "--now" => "--now",
                "--help" | "-h" => {
                    eprintln!("{USAGE}");
                    std::process::exit(0);
                }
                _ => return Err(SeedArgsError::Unknown(arg)),
            };
            let value = args.next().ok_or(SeedArgsError::MissingValue(flag))?;
            match flag {
                "--db" => db_url = value,
                "--user" => user = value,
                "--name" => name = value,
                "--completed" => completed = value,
                _ => now = Some(value),
            }
        }

        if db_url.trim().is_empty() {
            return Err(SeedArgsError::BadValue {
                flag: "--db",
                raw: db_url,
            });
        }
        let completed_levels = completed
            .trim()
            .parse()
            .map_err(|_| SeedArgsError::BadValue {
                flag: "--completed",
                raw: completed.clone(),
            })?;
        let now = now
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|_| SeedArgsError::BadValue { flag: "--now", raw })
            })
            .transpose()?;

        Ok(Self {
            db_url,
            user: UserId::new(user.clone()).ok_or(SeedArgsError::BadValue {
                flag: "--user",
                raw: user,
            })?,
            name,
            completed_levels,
            now,
        })
    }
}

/// Stored progress never exceeds the catalog, so seeding is capped the same way.
fn seeded_levels(requested: u32, level_count: u32) -> u32 {
    requested.min(level_count)
}

async fn seed(plan: SeedPlan) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::builtin()?;
    let levels = seeded_levels(plan.completed_levels, catalog.level_count());
    if levels < plan.completed_levels {
        eprintln!(
            "--completed {} exceeds the catalog; seeding {levels} levels",
            plan.completed_levels
        );
    }

    let storage = Storage::sqlite(&plan.db_url).await?;
    let at = plan.now.unwrap_or_else(Utc::now);

    let profile = Profile::from_name(plan.name.clone())?;
    storage.profiles.save_profile(&plan.user, &profile, at).await?;

    storage.progress.reset_progress(&plan.user, at).await?;
    for level in (0..levels).map(LevelIndex::new) {
        storage
            .progress
            .record_level_completion(&plan.user, level, at)
            .await?;
    }

    let mark = storage.progress.read_progress(&plan.user).await?;
    println!(
        "Seeded {} ({}) at {mark}/{} into {}",
        plan.user,
        profile.display_name(),
        catalog.level_count(),
        plan.db_url
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let plan = match SeedPlan::from_args(std::env::args().skip(1), |key| std::env::var(key).ok())
    {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    if let Err(err) = seed(plan).await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
