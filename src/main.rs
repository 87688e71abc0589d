use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use stepcheck::grading::config::DEFAULT_BASE_URL;
use stepcheck::grading::{GradingError, HttpGradingClient};
use stepcheck::{Countdown, GradingConfig, GradingOutcome, Session, StepSequenceBuilder, TaskAttempt, ValidationError, keyboard};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Typed in place of a step to place the limit marker.
const MARKER_TOKEN: &str = "LIMIT";
/// Separates steps inside one `--branch` value.
const STEP_SEPARATOR: char = ';';

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("grader error: {0}")]
    Grading(#[from] GradingError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("reading input failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("countdown task failed: {0}")]
    Countdown(#[from] tokio::task::JoinError),
    #[error("no stored integral solution for task {0}")]
    NoStoredSolution(String),
}

#[derive(Parser, Debug)]
#[command(name = "stepcheck", about = "Build and submit step-by-step calculus solutions")]
struct Cli {
    #[arg(long, env = "STEPCHECK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "STEPCHECK_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Plain,
    Limit,
    Integral,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a task.
    Task { task_id: String },
    /// Submit a plain or limit solution; use `LIMIT` as a step to place the marker.
    Submit {
        task_id: String,
        #[arg(long, value_enum, default_value_t = ModeArg::Limit)]
        mode: ModeArg,
        #[arg(long, default_value_t = false, help = "Print the payload instead of sending it")]
        dry_run: bool,
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Submit an integral-equation solution, one `--branch` per iterate.
    Integral {
        task_id: String,
        #[arg(long = "branch", required = true, help = "Steps of one iterate, separated by ';'")]
        branches: Vec<String>,
        #[arg(long = "final")]
        final_step: Option<String>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Build a solution line by line from stdin, under the countdown.
    Solve {
        task_id: String,
        #[arg(long, value_enum, default_value_t = ModeArg::Limit)]
        mode: ModeArg,
        #[arg(long, help = "Countdown in seconds (0 disables); defaults to STEPCHECK_TIME_BUDGET_SECS")]
        time_budget: Option<u64>,
    },
    /// Show the last stored integral solution for a task.
    Last { task_id: String },
}

struct CliContext {
    config: GradingConfig,
    session: Session,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    if dotenvy::dotenv().is_err() {
        debug!("no .env file loaded");
    }

    let cli = Cli::parse();
    let config = GradingConfig::from_env()?.with_base_url(&cli.base_url)?;
    let session = cli.user.map_or_else(Session::anonymous, Session::for_user);
    let ctx = CliContext { config, session };

    match cli.command {
        Command::Task { task_id } => run_task(&ctx, &task_id).await,
        Command::Submit { task_id, mode, dry_run, steps } => {
            let builder = sequence_from_steps(&task_id, mode, &steps)?;
            run_submission(&ctx, builder, dry_run).await
        }
        Command::Integral { task_id, branches, final_step, dry_run } => {
            let builder = integral_from_args(&task_id, &branches, final_step.as_deref())?;
            run_submission(&ctx, builder, dry_run).await
        }
        Command::Solve { task_id, mode, time_budget } => run_solve(&ctx, &task_id, mode, time_budget).await,
        Command::Last { task_id } => run_last(&ctx, &task_id).await,
    }
}

// =============================================================================
// ONE-SHOT COMMANDS
// =============================================================================

async fn run_task(ctx: &CliContext, task_id: &str) -> Result<(), CliError> {
    let client = HttpGradingClient::new(&ctx.config)?;
    let task = client.fetch_task(task_id).await?;
    print_json(&serde_json::to_value(task)?)
}

async fn run_last(ctx: &CliContext, task_id: &str) -> Result<(), CliError> {
    let client = HttpGradingClient::new(&ctx.config)?;
    let builder = client
        .last_integral(task_id)
        .await?
        .into_builder(task_id)
        .ok_or_else(|| CliError::NoStoredSolution(task_id.to_owned()))?;
    render(&builder);
    Ok(())
}

async fn run_submission(ctx: &CliContext, builder: StepSequenceBuilder, dry_run: bool) -> Result<(), CliError> {
    if dry_run {
        let payload = builder.serialize()?.with_user(ctx.session.username());
        return print_json(&serde_json::to_value(payload)?);
    }
    let client = Arc::new(HttpGradingClient::new(&ctx.config)?);
    let attempt = TaskAttempt::new(builder, client, ctx.session.clone());
    let outcome = attempt.submit().await?;
    print_outcome(&outcome)
}

fn sequence_from_steps(task_id: &str, mode: ModeArg, steps: &[String]) -> Result<StepSequenceBuilder, ValidationError> {
    let mut builder = match mode {
        ModeArg::Plain => StepSequenceBuilder::plain(task_id),
        ModeArg::Limit => StepSequenceBuilder::limit(task_id),
        ModeArg::Integral => return Err(ValidationError::ModeMismatch(stepcheck::Mode::Integral)),
    };
    for step in steps {
        if step.trim().eq_ignore_ascii_case(MARKER_TOKEN) {
            builder.add_limit_marker()?;
        } else {
            builder.add_step(keyboard::normalize(step))?;
        }
    }
    Ok(builder)
}

fn integral_from_args(
    task_id: &str,
    branches: &[String],
    final_step: Option<&str>,
) -> Result<StepSequenceBuilder, ValidationError> {
    let mut builder = StepSequenceBuilder::integral(task_id);
    for (i, branch) in branches.iter().enumerate() {
        if i > 0 {
            builder.add_branch()?;
        }
        let steps = branch
            .split(STEP_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty());
        for (j, step) in steps.enumerate() {
            let step = keyboard::normalize(step);
            // A new branch opens with one empty step; fill it before appending.
            if j == 0 {
                builder.edit_step(0, step)?;
            } else {
                builder.add_step(step)?;
            }
        }
    }
    if let Some(final_step) = final_step {
        builder.set_final_step(keyboard::normalize(final_step))?;
    }
    Ok(builder)
}

// =============================================================================
// INTERACTIVE
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Step(String),
    Marker,
    Edit(usize, String),
    Delete(usize),
    Branch,
    Use(usize),
    DropBranch(usize),
    Final(String),
    Check,
    Submit,
    Finish,
}

fn parse_line(raw: &str) -> Result<Line, String> {
    let line = raw.trim();
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Line::Step(keyboard::normalize(line)));
    };
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    let rest = rest.trim();
    let index = || rest.parse::<usize>().map_err(|_| format!("`:{name}` needs a step index"));
    match name {
        "marker" => Ok(Line::Marker),
        "del" => Ok(Line::Delete(index()?)),
        "edit" => {
            let (n, text) = rest
                .split_once(' ')
                .ok_or_else(|| "usage: :edit <index> <content>".to_string())?;
            let n = n
                .parse::<usize>()
                .map_err(|_| "usage: :edit <index> <content>".to_string())?;
            Ok(Line::Edit(n, keyboard::normalize(text)))
        }
        "branch" => Ok(Line::Branch),
        "use" => Ok(Line::Use(index()?)),
        "drop" => Ok(Line::DropBranch(index()?)),
        "final" => Ok(Line::Final(keyboard::normalize(rest))),
        "check" => Ok(Line::Check),
        "submit" => Ok(Line::Submit),
        "finish" => Ok(Line::Finish),
        other => Err(format!("unknown command `:{other}`")),
    }
}

fn apply(builder: &mut StepSequenceBuilder, line: Line) -> Result<(), ValidationError> {
    match line {
        Line::Step(content) => builder.add_step(content).map(drop),
        Line::Marker => builder.add_limit_marker().map(drop),
        Line::Edit(index, content) => builder.edit_step(index, content),
        Line::Delete(index) => builder.delete_step(index),
        Line::Branch => builder.add_branch().map(drop),
        Line::Use(index) => builder.set_active_branch(index),
        Line::DropBranch(index) => builder.delete_branch(index),
        Line::Final(content) => builder.set_final_step(content),
        Line::Check => {
            for problem in builder.validate() {
                eprintln!("  problem: {problem}");
            }
            Ok(())
        }
        Line::Submit | Line::Finish => Ok(()),
    }
}

async fn open_builder(client: &HttpGradingClient, task_id: &str, mode: ModeArg) -> Result<StepSequenceBuilder, CliError> {
    Ok(match mode {
        ModeArg::Plain => StepSequenceBuilder::plain(task_id),
        ModeArg::Limit => StepSequenceBuilder::limit(task_id),
        ModeArg::Integral => {
            let task = client.fetch_task(task_id).await?;
            StepSequenceBuilder::integral_seeded(task_id, task.limit_var.as_deref().unwrap_or_default())
        }
    })
}

async fn run_solve(ctx: &CliContext, task_id: &str, mode: ModeArg, time_budget: Option<u64>) -> Result<(), CliError> {
    let client = Arc::new(HttpGradingClient::new(&ctx.config)?);

    if mode == ModeArg::Integral {
        match client.last_integral(task_id).await {
            Ok(stored) => {
                if let Some(restored) = stored.into_builder(task_id) {
                    eprintln!("task {task_id} was already attempted; showing the stored solution");
                    render(&restored);
                    return Ok(());
                }
            }
            Err(e) => debug!(error = %e, "no stored integral solution"),
        }
    }

    let builder = open_builder(&client, task_id, mode).await?;
    let solution_id = match client.start_solution(task_id).await {
        Ok(started) => Some(started.solution_id),
        Err(e) => {
            warn!(error = %e, "could not open a solution record");
            None
        }
    };

    let attempt = Arc::new(TaskAttempt::new(builder, client, ctx.session.clone()));
    let budget = match time_budget {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => ctx.config.time_budget(),
    };
    let mut countdown = budget.map(|b| attempt.start_countdown(b));

    render(&attempt.snapshot());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let next = match countdown.as_mut() {
            Some(timer) => tokio::select! {
                line = lines.next_line() => line?,
                expired = timer.expired() => {
                    eprintln!("time is up; solution submitted automatically");
                    return print_outcome(&expired??);
                }
            },
            None => lines.next_line().await?,
        };
        let Some(raw) = next else { break };
        if raw.trim().is_empty() {
            continue;
        }
        match parse_line(&raw) {
            Ok(Line::Submit) => {
                if let Some(outcome) = submit_now(&attempt, &mut countdown).await? {
                    return print_outcome(&outcome);
                }
            }
            Ok(Line::Finish) => return finish_now(&attempt, solution_id, countdown.take()).await,
            Ok(line) => match attempt.edit(|b| apply(b, line)) {
                Ok(()) => render(&attempt.snapshot()),
                Err(e) => eprintln!("  {e}"),
            },
            Err(usage) => eprintln!("  {usage}"),
        }
    }

    // End of input: nothing more can be fixed, so a rejected solution ends the session.
    match submit_now(&attempt, &mut countdown).await? {
        Some(outcome) => print_outcome(&outcome),
        None => {
            settle(countdown.take()).await?;
            Err(ValidationError::Invalid(attempt.snapshot().validate()).into())
        }
    }
}

/// Submit on the student's behalf. `Ok(None)` means the solution was rejected
/// before reaching the grader and editing continues.
async fn submit_now(attempt: &TaskAttempt, countdown: &mut Option<Countdown>) -> Result<Option<GradingOutcome>, CliError> {
    match attempt.submit().await {
        Ok(outcome) => {
            settle(countdown.take()).await?;
            Ok(Some(outcome))
        }
        Err(ValidationError::Invalid(problems)) => {
            for problem in &problems {
                eprintln!("  problem: {problem}");
            }
            Ok(None)
        }
        Err(ValidationError::AttemptExhausted) => deadline_outcome(countdown.take()).await.map(Some),
        Err(e) => {
            settle(countdown.take()).await?;
            Err(e.into())
        }
    }
}

async fn finish_now(attempt: &TaskAttempt, solution_id: Option<i64>, countdown: Option<Countdown>) -> Result<(), CliError> {
    match attempt.finish_early(solution_id).await {
        Ok(()) => {
            settle(countdown).await?;
            eprintln!("attempt finished without grading");
            Ok(())
        }
        Err(ValidationError::AttemptExhausted) => print_outcome(&deadline_outcome(countdown).await?),
        Err(e) => {
            settle(countdown).await?;
            Err(e.into())
        }
    }
}

/// The deadline owns the attempt; wait for its grader call to finish.
async fn deadline_outcome(countdown: Option<Countdown>) -> Result<GradingOutcome, CliError> {
    let Some(timer) = countdown else {
        return Err(ValidationError::AttemptExhausted.into());
    };
    eprintln!("time ran out; waiting for the automatic submission");
    Ok(timer.stop().await??)
}

/// Stop a countdown that lost the race, waiting out any submission it started.
async fn settle(countdown: Option<Countdown>) -> Result<(), CliError> {
    if let Some(timer) = countdown {
        if let Err(e) = timer.stop().await? {
            debug!(error = %e, "countdown did not submit");
        }
    }
    Ok(())
}

// =============================================================================
// OUTPUT
// =============================================================================

fn render(builder: &StepSequenceBuilder) {
    if let Some(active) = builder.active_branch() {
        for (i, branch) in builder.branches().iter().enumerate() {
            let marker = if i == active { '*' } else { ' ' };
            eprintln!("{marker} {}", branch.label());
            for step in &branch.steps {
                eprintln!("    [{}] {}", step.position, step.content);
            }
        }
        eprintln!("  final: {}", builder.final_step().unwrap_or("<none>"));
    } else {
        for step in builder.steps() {
            let text = if step.is_marker() { MARKER_TOKEN } else { step.content.as_str() };
            eprintln!("  [{}] {text}", step.position);
        }
    }
}

fn print_outcome(outcome: &GradingOutcome) -> Result<(), CliError> {
    print_json(&json!({
        "success": outcome.response.success,
        "score": outcome.score,
        "message": outcome.response.message,
        "errors": outcome.response.errors,
    }))
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
