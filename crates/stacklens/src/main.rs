use std::error::Error;
use std::process;
use std::sync::mpsc::TryRecvError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use stacklens_core::events::SessionEventReceiver;
use stacklens_core::loader::LoaderState;
use stacklens_core::model::{FrameEntry, ThreadEntry};
use stacklens_core::provider::Debuggee;
use stacklens_core::sim::{SimConfig, SimDebuggee};
use stacklens_core::{FramesView, StackId};
use stacklens_utils::{info, init_logging_for_tui, LogConfig, LogLevel};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Frames and threads explorer for paused debugging sessions.
#[derive(Parser, Debug)]
#[command(name = "stacklens")]
#[command(version)]
#[command(about = "Frames and threads explorer for paused debugging sessions", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Explore a simulated debuggee
    Demo
    {
        #[command(flatten)]
        sim: SimArgs,
        /// Initial thread filter
        #[arg(long)]
        filter: Option<String>,
        /// Print snapshots instead of starting the TUI
        #[arg(long, default_value_t = false)]
        headless: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct SimArgs
{
    /// Number of threads per pause
    #[arg(long, default_value_t = 6)]
    threads: usize,
    /// Frames per thread
    #[arg(long, default_value_t = 24)]
    depth: usize,
    /// Frames per delivered batch
    #[arg(long, default_value_t = 8)]
    batch: usize,
    /// Delay before each batch, in milliseconds
    #[arg(long, default_value_t = 40)]
    latency_ms: u64,
    /// Name of a thread whose frames fail to load
    #[arg(long)]
    fail_thread: Option<String>,
}

impl From<SimArgs> for SimConfig
{
    fn from(args: SimArgs) -> Self
    {
        Self {
            threads: args.threads,
            depth: args.depth,
            batch_size: args.batch,
            latency: Duration::from_millis(args.latency_ms),
            failing_thread: args.fail_thread,
            ..Self::default()
        }
    }
}

fn main()
{
    let cli = Cli::parse();

    let Commands::Demo { sim, filter, headless } = cli.command;
    let logging = if headless {
        LogConfig::from_env().with_level(cli.log_level).init()
    } else {
        init_logging_for_tui(cli.log_level)
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    let debuggee = Arc::new(SimDebuggee::new(sim.into()));
    let result = if headless { run_headless(&debuggee, filter) } else { run_tui(debuggee, filter) };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_tui(debuggee: Arc<SimDebuggee>, filter: Option<String>) -> Result<(), Box<dyn Error>>
{
    info!("Starting demo session");
    debuggee.pause();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(stacklens_ui::run_tui(debuggee, filter))?;
    Ok(())
}

/// Walk a simulated session without a terminal: pause, list every thread,
/// show each thread's frames, re-render after a settings change, resume.
fn run_headless(debuggee: &Arc<SimDebuggee>, filter: Option<String>) -> Result<(), Box<dyn Error>>
{
    let events = debuggee.take_event_receiver().ok_or("session events already taken")?;
    let mut view = FramesView::new(debuggee.clone());
    if let Some(text) = filter {
        view.set_filter_text(text);
    }

    info!("Pausing demo session");
    debuggee.pause();
    settle(&mut view, &events, |view| view.selected_stack().is_some() && is_idle(view))?;

    if view.open_thread_picker() {
        settle(&mut view, &events, |view| !view.registry().is_discovering() && is_idle(view))?;
    }
    print_threads(&view);
    print_frames(&view);

    let others: Vec<StackId> = view.threads().stacks().map(|stack| stack.id()).skip(1).collect();
    for stack in others {
        if view.select_stack(stack)? {
            settle(&mut view, &events, is_idle)?;
            print_frames(&view);
        }
    }

    debuggee.toggle_settings();
    settle(&mut view, &events, |view| view.selected_stack().is_some() && is_idle(view))?;
    println!("\nAfter settings change:");
    print_frames(&view);

    debuggee.resume();
    settle(&mut view, &events, |view| view.threads().entries().is_empty())?;
    println!("\nResumed: {} frames, {} threads shown", view.frames().len(), view.threads().entries().len());

    for error in view.reported_errors() {
        println!("reported: {error}");
    }
    debuggee.stop();
    Ok(())
}

/// Nothing outstanding for the displayed stack or the filter.
fn is_idle(view: &FramesView) -> bool
{
    let loading = view
        .selected_stack()
        .and_then(|stack| view.loader_state(stack.id()))
        .is_some_and(|state| state == LoaderState::Running);
    !loading && view.filter().computations_in_flight() == 0
}

/// Apply session events and background results until `done` holds.
fn settle(
    view: &mut FramesView,
    events: &SessionEventReceiver,
    done: impl Fn(&FramesView) -> bool,
) -> Result<(), Box<dyn Error>>
{
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        loop {
            match events.try_recv() {
                Ok(event) => view.on_session_event(event)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err("session event channel closed".into()),
            }
        }
        view.process_pending();

        if done(view) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err("timed out waiting for the debuggee".into());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn print_threads(view: &FramesView)
{
    let threads = view.threads();
    if threads.filter_text().is_empty() {
        println!("Threads:");
    } else {
        println!("Threads matching {:?}:", threads.filter_text());
    }
    for entry in threads.entries() {
        match entry {
            ThreadEntry::Stack(stack) => {
                let marker = if threads.selected() == Some(stack.id()) { "→" } else { " " };
                println!("  {marker} {} {}", stack.display_name(), stack.id());
            }
            ThreadEntry::Loading => println!("    Loading..."),
        }
    }
}

fn print_frames(view: &FramesView)
{
    let Some(stack) = view.selected_stack() else {
        println!("\nNo thread selected");
        return;
    };
    println!("\nFrames of {} {}:", stack.display_name(), stack.id());

    let frames = view.frames();
    for (index, entry) in frames.entries().iter().enumerate() {
        let marker = if frames.selected_index() == Some(index) { ">>" } else { "  " };
        match entry {
            FrameEntry::Frame(frame) => println!("  {marker} {index:>3}  {frame}"),
            FrameEntry::Error(message) => println!("  !! {message}"),
            FrameEntry::Loading => println!("     Loading..."),
        }
    }
}
