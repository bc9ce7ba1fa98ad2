use std::fmt;
use std::path::PathBuf;

use portal_core::Clock;
use portal_core::model::TutorialId;
use services::{PortalServices, QuizEngine};
use storage::{ApiConfig, ProgressApi, SafeStorage};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    InvalidTutorialId { raw: String },
    InvalidAnswers { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing argument: <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTutorialId { raw } => write!(f, "invalid tutorial id: {raw}"),
            ArgsError::InvalidAnswers { raw } => write!(f, "invalid --answers value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <command> [args] [--data <dir>] [--api-url <url>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status                          Show the current user and progress");
    eprintln!("  tutorials                       List tutorials with completion markers");
    eprintln!("  register <email> <pw> <name>    Create an account");
    eprintln!("  login <email> <password>        Sign in");
    eprintln!("  logout                          Sign out");
    eprintln!("  visit <tutorial-id>             Record tutorial navigation");
    eprintln!("  complete <tutorial-id>          Mark a tutorial complete");
    eprintln!("  quiz <tutorial-id> --answers 1,0,2");
    eprintln!("                                  Run a quiz with the given option picks");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --data portal-data");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PORTAL_DATA_DIR, PORTAL_API_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Tutorials,
    Register,
    Login,
    Logout,
    Visit,
    Complete,
    Quiz,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "tutorials" => Some(Self::Tutorials),
            "register" => Some(Self::Register),
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "visit" => Some(Self::Visit),
            "complete" => Some(Self::Complete),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }
}

struct Args {
    data_dir: PathBuf,
    api_url: Option<String>,
    positionals: Vec<String>,
    answers: Option<Vec<usize>>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut data_dir = std::env::var("PORTAL_DATA_DIR")
            .map_or_else(|_| PathBuf::from("portal-data"), PathBuf::from);
        let mut api_url = None;
        let mut positionals = Vec::new();
        let mut answers = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data" => {
                    let value = require_value(args, "--data")?;
                    data_dir = PathBuf::from(value);
                }
                "--api-url" => {
                    let value = require_value(args, "--api-url")?;
                    api_url = Some(value);
                }
                "--answers" => {
                    let value = require_value(args, "--answers")?;
                    answers = Some(parse_answers(&value)?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        Ok(Self {
            data_dir,
            api_url,
            positionals,
            answers,
        })
    }

    fn positional(&self, index: usize, name: &'static str) -> Result<&str, ArgsError> {
        self.positionals
            .get(index)
            .map(String::as_str)
            .ok_or(ArgsError::MissingArg { name })
    }

    fn tutorial_id(&self, index: usize) -> Result<TutorialId, ArgsError> {
        let raw = self.positional(index, "tutorial-id")?;
        raw.parse().map_err(|_| ArgsError::InvalidTutorialId {
            raw: raw.to_string(),
        })
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_answers(raw: &str) -> Result<Vec<usize>, ArgsError> {
    raw.split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ArgsError::InvalidAnswers {
            raw: raw.to_string(),
        })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown command: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown command")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let kv = SafeStorage::open(args.data_dir.join("storage.json"));
    let api = args
        .api_url
        .as_deref()
        .map(ApiConfig::new)
        .or_else(ApiConfig::from_env)
        .map(ProgressApi::new);
    let mut portal = PortalServices::open(kv, api, Clock::system()).await;

    match cmd {
        Command::Status => {
            match portal.current_user() {
                Some(session) => println!(
                    "signed in as {} <{}> ({})",
                    session.name, session.email, session.role
                ),
                None => println!("not signed in (anonymous progress)"),
            }
            let progress = portal.progress_service().progress();
            println!(
                "completed {}/{} tutorials ({}%)",
                progress.completed_count(),
                portal.catalog().total(),
                portal.progress_percentage()
            );
            if let Some(last) = progress.last_visited() {
                println!("last visited tutorial {last}");
            }
            Ok(())
        }
        Command::Tutorials => {
            for tutorial in portal.catalog().tutorials() {
                let marker = if portal.is_completed(tutorial.id) {
                    "x"
                } else {
                    " "
                };
                let quiz = if portal.catalog().quiz_for(tutorial.id).is_some() {
                    " [quiz]"
                } else {
                    ""
                };
                println!(
                    "[{marker}] {:>2}  {} ({:?}, {} min){quiz}",
                    tutorial.id.value(),
                    tutorial.title,
                    tutorial.difficulty,
                    tutorial.duration_minutes
                );
            }
            Ok(())
        }
        Command::Register => {
            let email = args.positional(0, "email")?;
            let password = args.positional(1, "password")?;
            let name = args.positional(2, "name")?;
            let user = portal.register(email, password, name).await?;
            println!("registered {} <{}>", user.name(), user.email());
            Ok(())
        }
        Command::Login => {
            let email = args.positional(0, "email")?;
            let password = args.positional(1, "password")?;
            let session = portal.login(email, password).await?;
            println!("signed in as {} <{}>", session.name, session.email);
            Ok(())
        }
        Command::Logout => {
            portal.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::Visit => {
            let id = args.tutorial_id(0)?;
            portal.visit_tutorial(id).await;
            println!("recorded visit to tutorial {id}");
            Ok(())
        }
        Command::Complete => {
            let id = args.tutorial_id(0)?;
            if portal.complete_tutorial(id).await {
                println!("tutorial {id} marked complete");
            } else {
                println!("tutorial {id} was already complete");
            }
            Ok(())
        }
        Command::Quiz => {
            let id = args.tutorial_id(0)?;
            let answers = args.answers.clone().ok_or(ArgsError::MissingValue {
                flag: "--answers",
            })?;
            let engine = portal.start_quiz(id)?;
            run_quiz(engine, &answers)?;
            if portal.apply_quiz_completions().await > 0 {
                println!("tutorial {id} marked complete");
            }
            Ok(())
        }
    }
}

fn run_quiz(
    mut engine: QuizEngine,
    answers: &[usize],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut answers = answers.iter();
    while let Some(question) = engine.current_question() {
        let number = engine.question_number();
        let total = engine.total_questions();
        println!("question {number}/{total}: {}", question.text());

        let Some(&pick) = answers.next() else {
            return Err(format!("expected {total} answers, got fewer").into());
        };
        engine.select_option(pick);
        let feedback = engine.submit_answer()?;
        if feedback.correct {
            println!("  correct");
        } else {
            println!(
                "  incorrect (answer was option {}): {}",
                feedback.correct_answer, feedback.explanation
            );
        }
        engine.next()?;
    }

    let report = engine.report().expect("finished quiz has a report");
    println!(
        "score {}/{} (need {}): {}",
        report.score,
        report.total,
        report.threshold,
        if report.passed { "passed" } else { "failed" }
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
