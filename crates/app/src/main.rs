mod telemetry;

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use quest_core::evaluator::{Answer, MatchMapping};
use quest_core::model::{Challenge, ChallengeIndex, LevelIndex, UserId};
use quest_core::tracker::LevelState;
use services::{
    AppServices, Clock, LevelAction, LevelRun, LogNotifier, StaticIdentity, SyncOutcome,
    match_options,
};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidUser { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLevel { raw: String },
    MissingLevel,
    MissingName,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLevel { raw } => {
                write!(f, "invalid level number (expected 1 or higher): {raw}")
            }
            ArgsError::MissingLevel => write!(f, "play requires a level number"),
            ArgsError::MissingName => write!(f, "profile requires a display name"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status,
    Play(LevelIndex),
    Reset,
    Profile(String),
    Report,
}

impl Command {
    fn from_positionals(positionals: Vec<String>) -> Result<Self, ArgsError> {
        let mut positionals = positionals.into_iter();
        let Some(first) = positionals.next() else {
            return Ok(Self::Status);
        };
        match first.as_str() {
            "status" => Ok(Self::Status),
            "reset" => Ok(Self::Reset),
            "report" => Ok(Self::Report),
            "play" => {
                let raw = positionals.next().ok_or(ArgsError::MissingLevel)?;
                // levels are numbered from 1 on the command line
                let number: u32 = raw
                    .parse()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(ArgsError::InvalidLevel { raw })?;
                Ok(Self::Play(LevelIndex::new(number - 1)))
            }
            "profile" => {
                let name = positionals.collect::<Vec<_>>().join(" ");
                if name.trim().is_empty() {
                    return Err(ArgsError::MissingName);
                }
                Ok(Self::Profile(name))
            }
            _ => Err(ArgsError::UnknownCommand(first)),
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    user: Option<UserId>,
    catalog_path: Option<PathBuf>,
    command: Command,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [status]           [options]");
    eprintln!("  cargo run -p app -- play <level>       [options]");
    eprintln!("  cargo run -p app -- reset              [options]");
    eprintln!("  cargo run -p app -- profile <name>     [options]");
    eprintln!("  cargo run -p app -- report             [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>      SQLite URL (default: sqlite://quest.sqlite3)");
    eprintln!("  --user <handle>        Signed-in user");
    eprintln!("  --catalog <path>       JSON level catalog (default: built-in levels)");
    eprintln!("  -h, --help             Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUEST_DB_URL, QUEST_USER, QUEST_CATALOG, LOG_LEVEL, LOG_FORMAT");
}

impl Args {
    fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("QUEST_DB_URL")
            .map_or_else(|| "sqlite://quest.sqlite3".into(), normalize_sqlite_url);
        let mut user_raw = env("QUEST_USER");
        let mut catalog_path = env("QUEST_CATALOG").map(PathBuf::from);
        let mut positionals = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    user_raw = Some(require_value(&mut args, "--user")?);
                }
                "--catalog" => {
                    catalog_path = Some(PathBuf::from(require_value(&mut args, "--catalog")?));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        let user = match user_raw {
            Some(raw) => Some(UserId::new(raw.clone()).ok_or(ArgsError::InvalidUser { raw })?),
            None => None,
        };

        Ok(Self {
            db_url,
            user,
            catalog_path,
            command: Command::from_positionals(positionals)?,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn show_status(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    match services.profiles().load().await? {
        Some(profile) => println!("Welcome back, {}!", profile.display_name()),
        None => println!("No profile yet. Run `profile <name>` to pick a display name."),
    }

    services.progress().load().await?;
    let selector = services.game().selector();
    println!(
        "Progress: {}/{} levels ({:.0}%)",
        selector.completed_levels(),
        selector.level_count(),
        selector.progress_ratio() * 100.0
    );

    for slot in selector.slots() {
        let marker = if slot.completed {
            "[x]"
        } else if slot.unlocked {
            "[>]"
        } else {
            "[ ]"
        };
        let action = slot.action.map_or("Locked", LevelAction::label);
        println!(
            "  {marker} Level {}: {} ({} challenges) [{action}]",
            slot.index.value() + 1,
            slot.title,
            slot.challenge_count
        );
        println!("        {}", slot.description);
    }

    if selector.can_reset() {
        println!("Run `reset` to start over.");
    }
    Ok(())
}

async fn reset_progress(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let progress = services.progress();
    progress.load().await?;
    match progress.reset()?.await? {
        SyncOutcome::Confirmed { .. } => {
            println!("Progress cleared.");
            Ok(())
        }
        SyncOutcome::Failed => Err("progress reset was not stored".into()),
    }
}

async fn save_profile(
    services: &AppServices,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = services.profiles().save(name).await?;
    println!("Display name set to {}.", profile.display_name());
    Ok(())
}

async fn show_report(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let report = services.reports().all_users().await?;
    if report.is_empty() {
        println!("No progress recorded yet.");
        return Ok(());
    }
    for row in report {
        println!(
            "{:<24} {}/{}  (updated {})",
            row.user_id,
            row.current_level,
            row.total_levels,
            row.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn read_answer(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    prompt: &str,
) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    lines.next().transpose()
}

/// Reads one answer from stdin; `None` means input ended.
fn ask(
    challenge: &Challenge,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> io::Result<Option<Answer>> {
    match challenge {
        Challenge::MultipleChoice(mc) => {
            for (number, choice) in (1..).zip(&mc.choices) {
                println!("  {number}. {choice}");
            }
            let Some(line) = read_answer(lines, "Your answer: ")? else {
                return Ok(None);
            };
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| mc.choices.get(i))
                .cloned()
                .unwrap_or_default();
            Ok(Some(Answer::Choice(picked)))
        }
        Challenge::Matching(matching) => {
            let options = match_options(matching, true);
            for (number, option) in (1..).zip(&options) {
                println!("  {number}. {option}");
            }
            let mut mapping = MatchMapping::new();
            for pair in &matching.pairs {
                let Some(line) = read_answer(lines, &format!("  {} -> ", pair.left))? else {
                    return Ok(None);
                };
                let picked = line
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| options.get(i));
                if let Some(right) = picked {
                    mapping.assign(pair.left.clone(), right.clone());
                }
            }
            Ok(Some(Answer::Matches(mapping)))
        }
    }
}

fn first_open_challenge(run: &LevelRun) -> Option<ChallengeIndex> {
    let tracker = run.tracker();
    (0_u32..)
        .take(tracker.challenge_count())
        .map(ChallengeIndex::new)
        .find(|index| !tracker.is_challenge_completed(*index))
}

async fn play_level(
    services: &AppServices,
    level: LevelIndex,
) -> Result<(), Box<dyn std::error::Error>> {
    services.progress().load().await?;
    let game = services.game();
    let mut run = game.start_level(level)?;
    let number = level.value() + 1;

    if run.state() == LevelState::Locked {
        println!("Level {number} is locked. Complete the previous level first.");
        return Ok(());
    }

    println!("Level {number}: {}", run.level().title);
    println!("{}", run.level().story);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while run.state() != LevelState::Completed {
        let index = run.current_index();
        let Some(challenge) = run.current_challenge().cloned() else {
            break;
        };
        println!();
        println!(
            "Challenge {}/{}: {}",
            index.value() + 1,
            run.tracker().challenge_count(),
            challenge.prompt()
        );

        let Some(answer) = ask(&challenge, &mut lines)? else {
            println!("Leaving level {number}; unfinished answers are discarded.");
            return Ok(());
        };

        let outcome = game.submit(&mut run, answer)?;
        let Some(verdict) = outcome.verdict else {
            println!("Pick an answer first.");
            continue;
        };

        if verdict.correct {
            println!("Correct! {}", verdict.explanation);
        } else {
            println!("Not quite. {}", verdict.explanation);
            run.tracker_mut().retry(index)?;
            continue;
        }

        if let Some(sync) = outcome.sync {
            match sync.await? {
                SyncOutcome::Confirmed { local } => {
                    let level_count = services.catalog().level_count();
                    println!("Level {number} complete! Progress: {local}/{level_count}");
                }
                SyncOutcome::Failed => {
                    println!("Level {number} complete, but progress could not be saved.");
                }
            }
        } else if !run.tracker_mut().next() {
            if let Some(open) = first_open_challenge(&run) {
                run.tracker_mut().go_to(open)?;
            }
        }
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok()).map_err(
        |e| {
            eprintln!("{e}");
            print_usage();
            e
        },
    )?;
    telemetry::init_tracing();

    let raw_catalog = args
        .catalog_path
        .as_deref()
        .map(std::fs::read_to_string)
        .transpose()?;
    let catalog = AppServices::load_catalog(raw_catalog.as_deref())?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let identity = Arc::new(StaticIdentity::new(args.user.clone()));
    let services = AppServices::new_sqlite(
        &args.db_url,
        Clock::system(),
        catalog,
        identity,
        Arc::new(LogNotifier),
    )
    .await?;
    tracing::debug!(db = %args.db_url, command = ?args.command, "services ready");

    match args.command {
        Command::Status => show_status(&services).await,
        Command::Play(level) => play_level(&services, level).await,
        Command::Reset => reset_progress(&services).await,
        Command::Profile(name) => save_profile(&services, &name).await,
        Command::Report => show_report(&services).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
