//! statbar - terminal host for the status bar metrics pipeline.
//!
//! Polls system metrics on a fixed interval and prints the status bar line
//! (or the popover cards, or raw JSON snapshots) every time a new snapshot
//! is published.

use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

#[cfg(target_os = "linux")]
use statbar_core::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use statbar_core::collector::mock::MockFs;
use statbar_core::collector::SystemStatsCollector;
use statbar_core::controller::{PollingConfig, PollingController, RefreshOutcome};
use statbar_core::history::DEFAULT_MAX_SAMPLES;
use statbar_core::model::{MetricKind, StatsSnapshot};
use statbar_core::summary::{DEFAULT_MAX_VISIBLE, UserPreferences, summary_text};
use statbar_core::view::PopoverViewModel;

/// Pause between the two refreshes of `--once`, so CPU and network rates
/// have a baseline.
const ONCE_BASELINE_DELAY: Duration = Duration::from_millis(500);

/// Menu bar style system stats in the terminal.
#[derive(Parser)]
#[command(name = "statbar", about = "Status bar system stats", version = statbar_core::VERSION)]
struct Args {
    /// Refresh interval in seconds (fractions allowed).
    #[arg(short, long, env = "STATBAR_INTERVAL", default_value = "2", value_parser = parse_interval)]
    interval: Duration,

    /// Samples kept per metric for trend charts.
    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
    history: usize,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to /sys filesystem (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: String,

    /// Mount point reported as disk usage.
    #[arg(long, default_value = "/")]
    volume: String,

    /// Status bar metric order, comma separated (cpu, mem, net, bat, disk).
    #[arg(long, value_delimiter = ',', default_value = "cpu,mem,net,bat,disk")]
    summary: Vec<MetricKind>,

    /// Number of metrics shown in the status bar line (at most 2).
    #[arg(long, default_value_t = DEFAULT_MAX_VISIBLE)]
    max_visible: usize,

    /// Print the popover cards instead of the status bar line.
    #[arg(long, conflicts_with = "json")]
    cards: bool,

    /// Print each snapshot as JSON.
    #[arg(long)]
    json: bool,

    /// Take a single reading and exit.
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parses a refresh interval in seconds, e.g. "2" or "0.5".
fn parse_interval(s: &str) -> Result<Duration, String> {
    let secs = s
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid interval '{}': {}", s, e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid interval '{}': {}", s, e))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Summary,
    Cards,
    Json,
}

impl OutputMode {
    fn from_args(args: &Args) -> Self {
        if args.json {
            OutputMode::Json
        } else if args.cards {
            OutputMode::Cards
        } else {
            OutputMode::Summary
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["statbar", "statbar_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Keeps the first occurrence of every kind.
fn dedup_order(order: &[MetricKind]) -> Vec<MetricKind> {
    let mut unique = Vec::with_capacity(order.len());
    for &kind in order {
        if !unique.contains(&kind) {
            unique.push(kind);
        }
    }
    unique
}

fn build_collector(args: &Args) -> SystemStatsCollector {
    #[cfg(target_os = "linux")]
    let fs = RealFs::new();
    #[cfg(not(target_os = "linux"))]
    let fs = {
        warn!("No procfs on this platform, using simulated system data");
        MockFs::typical_system()
    };
    SystemStatsCollector::procfs(fs, &args.proc_path, &args.sys_path, &args.volume)
}

struct Renderer {
    mode: OutputMode,
    prefs: UserPreferences,
}

impl Renderer {
    fn render(
        &self,
        snapshot: Option<&StatsSnapshot>,
        controller: &PollingController<SystemStatsCollector>,
    ) {
        match self.mode {
            OutputMode::Summary => println!("{}", summary_text(snapshot, &self.prefs)),
            OutputMode::Cards => {
                print_cards(&PopoverViewModel::new(snapshot, &controller.history()))
            }
            OutputMode::Json => match snapshot.map(serde_json::to_string).transpose() {
                Ok(Some(json)) => println!("{}", json),
                Ok(None) => println!("null"),
                Err(e) => warn!("Failed to serialize snapshot: {}", e),
            },
        }
    }
}

fn print_cards(view: &PopoverViewModel) {
    for card in &view.cards {
        let trend = card
            .trend_series
            .iter()
            .map(|s| format!("{} {}", s.label, s.points.len()))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:<8} {:<16} [{}]", card.title, card.text, trend);
    }
    for process in &view.top_cpu_processes {
        println!("  {:>5.1}%  {}", process.cpu_usage_percent, process.name);
    }
    println!();
}

#[cfg(unix)]
fn spawn_power_signals(controller: PollingController<SystemStatsCollector>) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let (mut sleep, mut wake) = match (
            signal(SignalKind::user_defined1()),
            signal(SignalKind::user_defined2()),
        ) {
            (Ok(sleep), Ok(wake)) => (sleep, wake),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install sleep/wake signal handlers: {}", e);
                return;
            }
        };
        loop {
            tokio::select! {
                Some(()) = sleep.recv() => {
                    info!("SIGUSR1: system going to sleep");
                    controller.will_sleep();
                }
                Some(()) = wake.recv() => {
                    info!("SIGUSR2: system woke up");
                    controller.did_wake();
                }
                else => break,
            }
        }
    });
}

async fn run_once(controller: &PollingController<SystemStatsCollector>, renderer: &Renderer) {
    controller.refresh_once().await;
    tokio::time::sleep(ONCE_BASELINE_DELAY).await;
    if controller.refresh_once().await != RefreshOutcome::Published {
        eprintln!("Error: failed to collect system stats");
        std::process::exit(1);
    }
    renderer.render(controller.current().as_deref(), controller);
}

async fn run(controller: PollingController<SystemStatsCollector>, renderer: Renderer) {
    let mut current_rx = controller.subscribe_current();

    #[cfg(unix)]
    spawn_power_signals(controller.clone());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    controller.start();
    info!("Polling every {:?}", controller.interval());

    loop {
        tokio::select! {
            changed = current_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = current_rx.borrow_and_update().clone();
                debug!(session = controller.session_id(), "Rendering snapshot");
                renderer.render(snapshot.as_deref(), &controller);
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Received shutdown signal");
                break;
            }
        }
    }

    controller.stop();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("statbar {} starting", statbar_core::VERSION);
    info!(
        "Config: interval={:?}, history={}, proc={}, sys={}, volume={}",
        args.interval, args.history, args.proc_path, args.sys_path, args.volume
    );

    let order = dedup_order(&args.summary);
    if order.is_empty() {
        eprintln!("Error: --summary needs at least one metric");
        std::process::exit(1);
    }

    let renderer = Renderer {
        mode: OutputMode::from_args(&args),
        prefs: UserPreferences {
            summary_metric_order: order,
            max_visible_summary_items: args.max_visible,
        },
    };
    debug!(mode = ?renderer.mode, visible = ?renderer.prefs.visible(), "Output configured");

    let controller = PollingController::new(
        build_collector(&args),
        PollingConfig {
            interval: args.interval,
            history_capacity: args.history,
        },
    );

    if args.once {
        run_once(&controller, &renderer).await;
    } else {
        run(controller, renderer).await;
    }
}
