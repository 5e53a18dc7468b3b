//! Interactive session: the pet keeps decaying in the background while
//! the owner types commands.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use gochi_core::{
    Action, Config, DecayTicker, Event, EventReceiver, EventSender, PetEngine, TaskList,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::render;

const HELP: &str = "commands: feed | treat | sleep | status | mood | add <task> | done <n> | tasks | help | quit";

/// One line of owner input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Act(Action),
    Status,
    Mood,
    Add(String),
    Done(usize),
    Tasks,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

/// Parse a line typed at the prompt.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "" => Input::Empty,
        "feed" => Input::Act(Action::Feed),
        "treat" => Input::Act(Action::Treat),
        "sleep" => Input::Act(Action::Sleep),
        "status" => Input::Status,
        "mood" => Input::Mood,
        "add" => Input::Add(rest.to_string()),
        "done" => match rest.parse() {
            Ok(index) => Input::Done(index),
            Err(_) => Input::Invalid(format!("'{}' is not a task number", rest)),
        },
        "tasks" => Input::Tasks,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Invalid(format!("unknown command '{}'", other)),
    }
}

/// Carry out one input. Returns the text to show, or `None` to end the session.
pub fn handle(engine: &PetEngine, tasks: &mut TaskList, input: Input, json: bool) -> Option<String> {
    let reply = match input {
        Input::Act(action) => render(&engine.apply(action), json),
        Input::Status => render(&engine.get_state(), json),
        Input::Mood => engine.mood().to_string(),
        Input::Add(text) => match tasks.add(text) {
            Ok(()) => format!("{} task(s) pending", tasks.tasks().len()),
            Err(e) => format!("error: {}", e),
        },
        Input::Done(index) => match tasks.complete(index) {
            Ok(task) => format!("done: {} ({} completed)", task, tasks.completed()),
            Err(e) => format!("error: {}", e),
        },
        Input::Tasks => {
            if tasks.tasks().is_empty() {
                "no pending tasks".to_string()
            } else {
                tasks
                    .tasks()
                    .iter()
                    .enumerate()
                    .map(|(i, task)| format!("[{}] {}", i, task))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Input::Help => HELP.to_string(),
        Input::Quit => return None,
        Input::Empty => String::new(),
        Input::Invalid(message) => format!("{}\n{}", message, HELP),
    };
    Some(reply)
}

/// Lines typed by the owner.
pub type Lines = mpsc::Receiver<String>;

/// Forward stdin lines from a dedicated thread.
///
/// A blocked stdin read cannot be cancelled, so it is kept off the tokio
/// runtime; the thread is left behind when the process exits.
pub fn stdin_lines() -> anyhow::Result<Lines> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("gochi-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "failed to read stdin");
                        break;
                    }
                };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to start stdin reader")?;
    Ok(rx)
}

/// Cancel `shutdown` when Ctrl-C is pressed.
pub async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupted");
            shutdown.cancel();
        }
        Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
    }
}

/// Run until the owner quits, `lines` closes, or `shutdown` is cancelled.
pub async fn run(
    engine: Arc<PetEngine>,
    config: &Config,
    mut lines: Lines,
    shutdown: CancellationToken,
    events: (EventSender, EventReceiver),
    json: bool,
) -> anyhow::Result<()> {
    let (events_tx, events_rx) = events;
    let ticker = DecayTicker::with_cancellation(
        engine.clone(),
        config.tick_interval,
        shutdown.child_token(),
    )
    .with_events(events_tx)
    .spawn();
    let printer = tokio::spawn(print_events(events_rx));

    println!("{}", render(&engine.get_state(), json));
    println!("{}", HELP);

    let mut tasks = TaskList::new();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = lines.recv() => {
                let Some(line) = line else { break };
                match handle(&engine, &mut tasks, parse_input(&line), json) {
                    Some(reply) if reply.is_empty() => {}
                    Some(reply) => println!("{}", reply),
                    None => break,
                }
            }
        }
    }

    shutdown.cancel();
    let ticks = ticker.await?;
    printer.abort();
    info!(ticks, "session ended");
    Ok(())
}

async fn print_events(mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::MoodChanged { .. } | Event::PersistFailed { .. } => println!("* {}", event),
            other => debug!(event = %other, "engine event"),
        }
    }
}
