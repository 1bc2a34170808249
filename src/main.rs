mod app;
mod catalog;
mod cli;
mod config;
mod detail;
mod error;
mod gateway;
mod input;
mod k8s;
mod logs;
mod model;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand};
use catalog::ResourceCatalog;
use clap::Parser;
use cli::CliArgs;
use config::BrowserConfig;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use error::BrowserError;
use futures::StreamExt;
use gateway::ClusterGateway;
use k8s::KubeGateway;
use logs::{LogDisplay, LogStreamManager, LogUpdate};
use model::{ResourceKind, ResourceObject};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::{BTreeMap, VecDeque};
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Cluster-facing half of the loop: the catalog, the gateway and the log manager.
struct Session {
    catalog: ResourceCatalog,
    gateway: Arc<dyn ClusterGateway>,
    logs: LogStreamManager,
}

impl Session {
    fn new(
        catalog: ResourceCatalog,
        gateway: Arc<dyn ClusterGateway>,
        updates: mpsc::UnboundedSender<LogUpdate>,
        tail_lines: i64,
    ) -> Self {
        let logs = LogStreamManager::new(Some(Arc::clone(&gateway)), updates, tail_lines);
        Self {
            catalog,
            gateway,
            logs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = BrowserConfig::discover()?;
    let log_filter = args
        .log_filter
        .clone()
        .or_else(|| config.log_filter.clone())
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&log_filter, args.log_file.as_deref())?;
    if let Some(source) = &config.source {
        info!(source = %source, "config loaded");
    }

    let gateway = KubeGateway::new()
        .await
        .context("failed to initialize Kubernetes client")?;
    info!(
        cluster = %gateway.cluster(),
        context = %gateway.context(),
        default_namespace = %gateway.default_namespace(),
        "cluster gateway ready"
    );

    let mut catalog = ResourceCatalog::standard();
    apply_aliases(&mut catalog, &config.aliases);
    let kinds = resolve_kinds(&catalog, &config.kinds);
    let tail_lines = args
        .tail_lines
        .filter(|lines| *lines > 0)
        .unwrap_or(config.tail_lines);
    let initial_namespace = args.namespace.clone().or_else(|| config.namespace.clone());

    let mut app = App::new(
        gateway.cluster(),
        gateway.context(),
        kinds,
        config.log_buffer_lines,
    )
    .with_initial_namespace(initial_namespace);

    let (log_tx, log_rx) = mpsc::unbounded_channel();
    let gateway: Arc<dyn ClusterGateway> = Arc::new(gateway);
    let mut session = Session::new(catalog, gateway, log_tx, tail_lines);

    run(&mut app, &mut session, log_rx).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

fn apply_aliases(catalog: &mut ResourceCatalog, aliases: &BTreeMap<String, String>) {
    for (alias, target) in aliases {
        match catalog.add_alias(alias, target) {
            Ok(kind) => debug!(alias = %alias, kind = %kind, "kind alias registered"),
            Err(error) => warn!(alias = %alias, error = %error, "ignoring kind alias"),
        }
    }
}

/// Configured kind tokens in order, or every registered kind when none resolve.
fn resolve_kinds(catalog: &ResourceCatalog, tokens: &[String]) -> Vec<ResourceKind> {
    let mut kinds = Vec::new();
    for token in tokens {
        match catalog.resolve_token(token) {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(error) => warn!(token = %token, error = %error, "ignoring configured kind"),
        }
    }
    if kinds.is_empty() {
        return catalog.kinds().to_vec();
    }
    kinds
}

async fn run(
    app: &mut App,
    session: &mut Session,
    mut log_rx: mpsc::UnboundedReceiver<LogUpdate>,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, session, &mut log_rx).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    session: &mut Session,
    log_rx: &mut mpsc::UnboundedReceiver<LogUpdate>,
) -> Result<()> {
    execute_app_command(app, session, AppCommand::LoadNamespaces).await;

    let mut reader = EventStream::new();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            terminal
                                .draw(|frame| ui::render(frame, app))
                                .context("failed to render terminal frame")?;
                            execute_app_command(app, session, command).await;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(error = %error, "terminal event error");
                    }
                    None => {
                        warn!("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_update = log_rx.recv() => {
                if let Some(update) = maybe_update
                    && let Some(display) = session.logs.accept(update)
                {
                    app.apply_log_display(display);
                }
            }
        }
    }

    session.logs.cancel_session();
    debug!(
        phase = ?session.logs.phase(),
        outcome = ?session.logs.last_outcome(),
        cancellations = session.logs.cancellations(),
        "log manager stopped"
    );
    Ok(())
}

/// Runs `command` step by step. Follow-ups produced by a step run before the
/// remaining steps.
async fn execute_app_command(app: &mut App, session: &mut Session, command: AppCommand) {
    let mut queue = VecDeque::from(command.into_steps());
    while let Some(step) = queue.pop_front() {
        let follow_up = execute_step(app, session, step).await;
        for next in follow_up.into_steps().into_iter().rev() {
            queue.push_front(next);
        }
    }
}

async fn execute_step(app: &mut App, session: &mut Session, step: AppCommand) -> AppCommand {
    let gateway = Some(&*session.gateway);
    match step {
        AppCommand::None => AppCommand::None,
        AppCommand::Batch(commands) => AppCommand::Batch(commands),
        AppCommand::LoadNamespaces => match session.gateway.list_namespaces().await {
            Ok(names) => app.set_namespaces(names),
            Err(cause) => {
                let error = BrowserError::api("list Namespaces", cause);
                warn!(error = %error, "namespace listing failed");
                app.show_error(&error);
                AppCommand::None
            }
        },
        AppCommand::LoadResources { kind, namespace } => {
            match session.catalog.load(gateway, kind, &namespace).await {
                Ok(table) => app.set_resource_table(table),
                Err(error) => {
                    warn!(kind = %kind, namespace = %namespace, error = %error, "resource load failed");
                    app.resource_load_failed(kind, &error);
                }
            }
            AppCommand::None
        }
        AppCommand::LoadPod { namespace, pod } => {
            match session
                .catalog
                .fetch(gateway, ResourceKind::Pod, &namespace, &pod)
                .await
            {
                Ok(object @ ResourceObject::Pod(_)) => app.show_pod(object),
                Ok(other) => warn!(kind = %other.kind(), "pod lookup returned another kind"),
                Err(error) => {
                    warn!(namespace = %namespace, pod = %pod, error = %error, "pod lookup failed");
                    app.show_error(&error);
                }
            }
            AppCommand::None
        }
        AppCommand::StartLogSession(target) => {
            if let Err(error) = session.logs.start_session(target) {
                app.apply_log_display(LogDisplay::ErrorLine(error.status_line()));
            }
            AppCommand::None
        }
        AppCommand::StopLogSession => {
            if let Some(target) = session.logs.live_target() {
                debug!(pod = %target.pod, container = %target.container, "stopping log session");
            }
            session.logs.cancel_session();
            AppCommand::None
        }
        AppCommand::DeleteResource {
            kind,
            namespace,
            name,
        } => {
            let namespace = namespace.unwrap_or_default();
            match session
                .catalog
                .remove(gateway, kind, &namespace, &name)
                .await
            {
                Ok(()) => app.resource_deleted(kind, &name),
                Err(error) => {
                    warn!(kind = %kind, name = %name, error = %error, "delete failed");
                    app.show_error(&error);
                    AppCommand::None
                }
            }
        }
    }
}
