//! A terminal front end for the customer-service agent.
//!
//! Configuration comes from the environment:
//!
//! - `OPENAI_API_KEY` (required)
//! - `OPENAI_BASE_URL`, `OPENAI_MODEL` (optional)
//! - `LOOP_AGENT_MAX_ITERATIONS` (optional, defaults to 10)
//!
//! Run `loop-agent demo` to go through the canned queries, or `loop-agent`
//! to chat interactively.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use loop_agent::core::observer::{
    Observer, RoundFinished, RoundStarted, RunFinished, ToolFinished,
    ToolStarted, TracingObserver,
};
use loop_agent::core::{DEFAULT_MAX_ITERATIONS, RunOutcome};
use loop_agent::{Session, SessionBuilder};
use loop_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";

const DEMO_QUERIES: [&str; 4] = [
    "Find all premium users with expired subscriptions",
    "Get details for john@co.com and send them a renewal reminder",
    "Cancel the subscription for jane@co.com",
    "Search for users with basic plans",
];

struct Config {
    api_key: String,
    base_url: Option<String>,
    model: Option<String>,
    max_iterations: usize,
}

impl Config {
    fn from_env() -> Result<Self, String> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            "OPENAI_API_KEY environment variable is not set".to_owned()
        })?;
        let max_iterations = match env::var("LOOP_AGENT_MAX_ITERATIONS") {
            Ok(value) => value.trim().parse().map_err(|_| {
                format!("LOOP_AGENT_MAX_ITERATIONS is not a number: {value}")
            })?,
            Err(_) => DEFAULT_MAX_ITERATIONS,
        };
        Ok(Self {
            api_key,
            base_url: env::var("OPENAI_BASE_URL").ok(),
            model: env::var("OPENAI_MODEL").ok(),
            max_iterations,
        })
    }
}

/// Shows a spinner while a query runs, labelled with what the agent does.
///
/// Events are also forwarded to [`TracingObserver`], visible with
/// `RUST_LOG=loop_agent_core=info`.
#[derive(Clone, Default)]
struct Spinner {
    bar: Arc<Mutex<Option<ProgressBar>>>,
    log: TracingObserver,
}

impl Spinner {
    fn start(&self) {
        let style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_message("🤔 Thinking...");
        bar.enable_steady_tick(Duration::from_millis(100));
        self.replace(Some(bar));
    }

    fn stop(&self) {
        self.replace(None);
    }

    fn set_message(&self, message: String) {
        let Ok(bar) = self.bar.lock() else {
            return;
        };
        if let Some(bar) = bar.as_ref() {
            bar.set_message(message);
        }
    }

    fn replace(&self, bar: Option<ProgressBar>) {
        let Ok(mut current) = self.bar.lock() else {
            return;
        };
        if let Some(old) = current.take() {
            old.finish_and_clear();
        }
        *current = bar;
    }
}

impl Observer for Spinner {
    fn on_round_start(&self, event: &RoundStarted<'_>) {
        self.log.on_round_start(event);
        if event.iteration > 1 {
            self.set_message(format!(
                "🤔 Thinking... (round {})",
                event.iteration
            ));
        }
    }

    fn on_round_end(&self, event: &RoundFinished<'_>) {
        self.log.on_round_end(event);
    }

    fn on_tool_start(&self, event: &ToolStarted<'_>) {
        self.log.on_tool_start(event);
        self.set_message(format!("🔧 Running {}...", event.name));
    }

    fn on_tool_end(&self, event: &ToolFinished<'_>) {
        self.log.on_tool_end(event);
    }

    fn on_run_end(&self, event: &RunFinished<'_>) {
        self.log.on_run_end(event);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    let mut openai_config = OpenAIConfigBuilder::with_api_key(config.api_key);
    if let Some(base_url) = config.base_url {
        openai_config = openai_config.with_base_url(base_url);
    }
    if let Some(model) = config.model {
        openai_config = openai_config.with_model(model);
    }
    let model_provider = OpenAIProvider::new(openai_config.build());
    debug!("using {:?}", model_provider.config());

    let retry_policy = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::from_secs(60)))
        .build();
    let spinner = Spinner::default();
    let session = SessionBuilder::with_model_provider(model_provider)
        .with_max_iterations(config.max_iterations)
        .with_model_retry(retry_policy)
        .with_observer(spinner.clone())
        .build();

    if env::args().nth(1).as_deref() == Some("demo") {
        println!("🤖 Customer Service Agent Demo");
        println!("================================\n");
        for query in DEMO_QUERIES {
            println!("{} {}", "Query:".bright_white().bold(), query);
            ask(&session, &spinner, query).await;
            println!("---\n");
        }
        return;
    }

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        ask(&session, &spinner, query).await;
        println!();
    }
}

async fn ask(session: &Session, spinner: &Spinner, query: &str) {
    spinner.start();
    let result = session.ask(query).await;
    spinner.stop();

    match result {
        Ok(outcome) => print_outcome(&outcome),
        Err(err) => {
            error!("query failed: {err}");
            println!("{}❌ {}", BAR_CHAR.bright_red(), err.bright_red());
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let bar = BAR_CHAR.bright_cyan();
    for line in outcome.output().lines() {
        println!("{bar}🤖 {}", line.bright_white());
    }
    let rounds = outcome.iterations();
    let summary = format!(
        "{rounds} round{}",
        if rounds == 1 { "" } else { "s" }
    );
    if outcome.is_exhausted() {
        println!(
            "{} {}",
            summary.dimmed(),
            "(ran out of rounds)".bright_yellow()
        );
    } else {
        println!("{}", summary.dimmed());
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
