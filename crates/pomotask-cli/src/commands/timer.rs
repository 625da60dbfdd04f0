use std::io::Write;

use chrono::Utc;
use clap::Subcommand;
use pomotask_core::storage::TimerConfig;
use pomotask_core::{Event, SessionEngine, SessionState, SessionView};
use serde::Serialize;
use tokio::time::{self, Duration, MissedTickBehavior};

use crate::context::Context;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print the current session as JSON
    Status,
    /// Start the countdown
    Start,
    /// Stop the countdown, keeping the remaining time
    Stop,
    /// Start when stopped, stop when running
    Toggle,
    /// Rewind to the full duration of the selected phase
    Reset,
    /// Select a phase of the active profile
    Phase {
        /// Phase ID or name
        phase: String,
    },
    /// Persist the running countdown before going away
    Background,
    /// Show a live countdown until it expires
    Watch {
        /// How many times to flash the display once expired
        #[arg(long, default_value = "6")]
        pulses: u32,
    },
}

/// What every one-shot timer command prints.
#[derive(Serialize)]
struct TimerOutput<'a> {
    events: &'a [Event],
    session: SessionView,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let sessions = ctx.sessions();
    let profiles = ctx.profiles();
    let mut engine = SessionEngine::new(&sessions, &profiles);

    let now = Utc::now();
    let mut events: Vec<Event> = engine.reconcile(now).into_iter().collect();

    match action {
        TimerAction::Status => {}
        TimerAction::Start => {
            if engine.state() != SessionState::Running {
                events.extend(engine.toggle(now));
            }
        }
        TimerAction::Stop => {
            if engine.state() == SessionState::Running {
                events.extend(engine.toggle(now));
            }
        }
        TimerAction::Toggle => events.extend(engine.toggle(now)),
        TimerAction::Reset => events.extend(engine.reset(now)),
        TimerAction::Phase { phase } => {
            let id = resolve_phase(&engine, phase);
            events.push(engine.select_phase(&id, now)?);
        }
        TimerAction::Background => events.extend(engine.snapshot(now)),
        TimerAction::Watch { pulses } => {
            for event in &events {
                println!("{}", serde_json::to_string(event)?);
            }
            return watch(&mut engine, &ctx.config.timer, pulses);
        }
    }

    let output = TimerOutput {
        events: &events,
        session: engine.view(now),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Accept a phase ID or a case-insensitive phase name.
fn resolve_phase(engine: &SessionEngine<'_>, phase: String) -> String {
    engine
        .profile()
        .and_then(|p| {
            p.phases
                .iter()
                .find(|ph| ph.id == phase || ph.name.eq_ignore_ascii_case(&phase))
        })
        .map(|ph| ph.id.clone())
        .unwrap_or(phase)
}

/// Foreground countdown. The interval only asks the engine to redraw; the
/// engine re-derives the value from the wall clock every time.
fn watch(
    engine: &mut SessionEngine<'_>,
    config: &TimerConfig,
    pulses: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if engine.state() != SessionState::Running {
        let view = engine.view(Utc::now());
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        let mut stdout = std::io::stdout();
        let mut interval = time::interval(Duration::from_millis(config.tick_interval_ms.max(50)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let now = Utc::now();
            let expired = engine.tick(now);
            let view = engine.view(now);
            write!(
                stdout,
                "\r{} · {}  {}",
                view.profile_name.as_deref().unwrap_or("-"),
                view.phase_name.as_deref().unwrap_or("-"),
                view.countdown
            )?;
            stdout.flush()?;

            if let Some(event) = expired {
                writeln!(stdout)?;
                writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
                break;
            }
            if view.state != SessionState::Running {
                writeln!(stdout)?;
                break;
            }
        }

        if engine.view(Utc::now()).alerting {
            let mut blink = time::interval(Duration::from_millis(config.blink_interval_ms.max(50)));
            for pulse in 0..pulses.saturating_mul(2) {
                blink.tick().await;
                let shown = if pulse % 2 == 0 { "00:00" } else { "     " };
                write!(stdout, "\r{shown}")?;
                stdout.flush()?;
            }
            writeln!(stdout)?;
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
