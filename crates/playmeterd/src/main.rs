//! playmeterd - The playmeter background service
//!
//! This is the main entry point for the playmeterd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization (ledger, audit log, F&B stock)
//! - Billing engine
//! - Hardware link (status frames and relay commands)
//! - IPC server

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use playmeter_api::{
    ClientRole, Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response,
    ResponsePayload, ResponseResult,
};
use playmeter_config::load_config;
use playmeter_core::{BillingEngine, BillingError, BillingResult, CoreEvent};
use playmeter_ipc::{IpcServer, ServerMessage};
use playmeter_link::{DeviceSink, LinkHandle, LinkStatus};
use playmeter_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use playmeter_util::{default_config_path, ClientId};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// playmeterd - Billing and relay control for rental game units
#[derive(Parser, Debug)]
#[command(name = "playmeterd")]
#[command(about = "Billing and relay control for rental game units", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/playmeter/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set PLAYMETER_SOCKET env var)
    #[arg(short, long, env = "PLAYMETER_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set PLAYMETER_DATA_DIR env var)
    #[arg(short, long, env = "PLAYMETER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Serial device of the unit controller (default: auto-detect)
    #[arg(long, env = "PLAYMETER_DEVICE")]
    device: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: BillingEngine,
    link: LinkHandle,
    link_status: mpsc::UnboundedReceiver<LinkStatus>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    config_path: PathBuf,
    tick_interval: std::time::Duration,
}

/// State the loop handlers share once the service is running
struct Shared {
    engine: Mutex<BillingEngine>,
    link: LinkHandle,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    config_path: PathBuf,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let settings = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            units = settings.units.count,
            prices = settings.prices.len(),
            menu_items = settings.menu.len(),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| settings.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.service.data_dir.clone());

        let device = args
            .device
            .clone()
            .or_else(|| settings.service.device.clone());

        let tick_interval = settings.service.tick_interval;

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("playmeterd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let engine = BillingEngine::new(settings, store.clone());

        let sink = Arc::new(DeviceSink::new(device));
        let (link, link_status) = LinkHandle::spawn(sink);

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        Ok(Self {
            engine,
            link,
            link_status,
            ipc: Arc::new(ipc),
            store,
            config_path: args.config.clone(),
            tick_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let Service {
            engine,
            link,
            mut link_status,
            ipc,
            store,
            config_path,
            tick_interval,
        } = self;

        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
            link,
            ipc: ipc.clone(),
            store,
            config_path,
        });

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let mut tick_timer = tokio::time::interval(tick_interval);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(tick_ms = tick_interval.as_millis() as u64, "Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Tick timer - accrue, auto-stop, refresh the controller
                _ = tick_timer.tick() => {
                    Self::handle_tick(&shared, playmeter_util::now()).await;
                }

                Some(status) = link_status.recv() => {
                    Self::handle_link_status(&shared, status);
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&shared, msg).await;
                }
            }
        }

        Self::shutdown(&shared).await;
        Ok(())
    }

    async fn shutdown(shared: &Shared) {
        info!("Shutting down playmeterd");

        // Sessions live in memory only; report what is lost so it can be
        // settled by hand. Relays are left as they are.
        let now = playmeter_util::now();
        let active_units = {
            let engine = shared.engine.lock().await;
            let mut count = 0;
            for session in engine.active_units() {
                count += 1;
                warn!(
                    unit_id = %session.unit_id(),
                    unit_name = %session.unit_name(),
                    status = ?session.status(),
                    total_bill = %session.view(now).total_bill,
                    "Unit still active at shutdown"
                );
            }
            count
        };

        if let Err(e) = shared
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped { active_units }))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        shared.ipc.broadcast_event(Event::new(EventPayload::Shutdown));
        shared.ipc.shutdown();

        info!("Shutdown complete");
    }

    async fn handle_tick(shared: &Shared, now: DateTime<Local>) {
        let (events, snapshot) = {
            let mut engine = shared.engine.lock().await;
            let events = engine.tick(now);
            (events, engine.snapshot(now))
        };

        shared.link.sync(&snapshot.units);

        if !events.is_empty() {
            Self::publish(shared, &events);
            shared
                .ipc
                .broadcast_event(Event::new(EventPayload::StateChanged(snapshot)));
        }
    }

    /// Send relay commands and broadcast client events for `events`
    fn publish(shared: &Shared, events: &[CoreEvent]) {
        for event in events {
            for command in event.relay_commands() {
                debug!(unit_id = %command.unit, on = command.on, "Relay command");
                shared.link.relay(command.unit, command.on);
            }
            shared.ipc.broadcast_event(Event::new(event.to_payload()));
        }
    }

    /// Publish events caused by a command, then refresh the controller and
    /// subscribers with the new fleet state
    async fn dispatch(shared: &Shared, events: Vec<CoreEvent>) {
        if events.is_empty() {
            return;
        }

        Self::publish(shared, &events);

        let now = playmeter_util::now();
        let snapshot = shared.engine.lock().await.snapshot(now);
        shared.link.sync(&snapshot.units);
        shared
            .ipc
            .broadcast_event(Event::new(EventPayload::StateChanged(snapshot)));
    }

    fn handle_link_status(shared: &Shared, status: LinkStatus) {
        let (connected, detail) = match status {
            LinkStatus::Lost(e) => {
                warn!(error = %e, "Hardware link unavailable");
                (false, Some(e.to_string()))
            }
            LinkStatus::Restored => {
                info!("Hardware link restored");
                (true, None)
            }
        };

        let _ = shared
            .store
            .append_audit(AuditEvent::new(AuditEventType::LinkStatusChanged {
                connected,
                detail: detail.clone(),
            }));

        shared
            .ipc
            .broadcast_event(Event::new(EventPayload::LinkStatusChanged { connected, detail }));
    }

    async fn handle_ipc_message(shared: &Shared, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let response =
                    Self::handle_command(shared, &client_id, request.request_id, request.command)
                        .await;
                let _ = shared.ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                let _ = shared.store.append_audit(AuditEvent::new(
                    AuditEventType::ClientConnected {
                        client_id: client_id.to_string(),
                        role: format!("{:?}", info.role),
                        uid: info.uid,
                    },
                ));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = shared.store.append_audit(AuditEvent::new(
                    AuditEventType::ClientDisconnected {
                        client_id: client_id.to_string(),
                    },
                ));
            }
        }
    }

    async fn handle_command(
        shared: &Shared,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> Response {
        let now = playmeter_util::now();

        let role = shared
            .ipc
            .get_client_info(client_id)
            .await
            .map(|info| info.role)
            .unwrap_or(ClientRole::Observer);

        if command.requires_admin() && !role.can_configure() {
            return Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::PermissionDenied, "Admin role required"),
            );
        }
        if command.is_mutation() && !role.can_operate() {
            return Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::PermissionDenied, "Read-only client"),
            );
        }

        match command {
            Command::GetState => {
                let state = shared.engine.lock().await.snapshot(now);
                Response::success(request_id, ResponsePayload::State(state))
            }

            Command::ListPrices => {
                let prices = shared.engine.lock().await.prices().to_vec();
                Response::success(request_id, ResponsePayload::Prices(prices))
            }

            Command::ListMenu => {
                let menu = shared.engine.lock().await.menu();
                Response::success(request_id, ResponsePayload::Menu(menu))
            }

            Command::RecentTransactions { limit } => {
                match shared.engine.lock().await.recent_transactions(limit) {
                    Ok(records) => {
                        Response::success(request_id, ResponsePayload::Transactions(records))
                    }
                    Err(e) => Response::error(request_id, error_info(&e)),
                }
            }

            Command::Start {
                unit,
                price_id,
                operator,
            } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.start(unit, &price_id, operator, now)?;
                    Ok((events, ResponsePayload::Unit(engine.unit_view(unit, now)?)))
                })
                .await
            }

            Command::Extend { unit, price_id } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.extend(unit, &price_id, now)?;
                    Ok((events, ResponsePayload::Unit(engine.unit_view(unit, now)?)))
                })
                .await
            }

            Command::Stop { unit } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.stop(unit, now)?;
                    let payload = stopped_payload(&events);
                    Ok((events, payload))
                })
                .await
            }

            Command::ResetFault { unit } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.reset_fault(unit)?;
                    Ok((events, ResponsePayload::Unit(engine.unit_view(unit, now)?)))
                })
                .await
            }

            Command::Transfer {
                source,
                destination,
                faulty,
            } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.transfer(source, destination, faulty, now)?;
                    let payload = ResponsePayload::Transferred {
                        source: engine.unit_view(source, now)?,
                        destination: engine.unit_view(destination, now)?,
                    };
                    Ok((events, payload))
                })
                .await
            }

            Command::AddOrder {
                unit,
                item_id,
                quantity,
            } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.add_order(unit, &item_id, quantity)?;
                    Ok((events, ResponsePayload::Unit(engine.unit_view(unit, now)?)))
                })
                .await
            }

            Command::MarkDelivered { unit } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.mark_delivered(unit)?;
                    Ok((events, ResponsePayload::Unit(engine.unit_view(unit, now)?)))
                })
                .await
            }

            Command::RenameUnit { unit, name } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.rename_unit(unit, name)?;
                    Ok((events, ResponsePayload::Unit(engine.unit_view(unit, now)?)))
                })
                .await
            }

            Command::ResizeUnits { count, names } => {
                Self::mutate(shared, request_id, |engine| {
                    let events = engine.resize(count, &names)?;
                    Ok((events, ResponsePayload::UnitsResized { count }))
                })
                .await
            }

            Command::ReloadConfig => Self::reload_config(shared, request_id).await,

            Command::SubscribeEvents => Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),

            Command::UnsubscribeEvents => {
                Response::success(request_id, ResponsePayload::Unsubscribed)
            }

            Command::GetHealth => {
                let health = HealthStatus {
                    live: true,
                    ready: true,
                    link_connected: shared.link.is_connected(),
                    store_ok: shared.store.is_healthy(),
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }

    /// Run a billing operation under the engine lock, then publish its events
    async fn mutate<F>(shared: &Shared, request_id: u64, op: F) -> Response
    where
        F: FnOnce(&mut BillingEngine) -> BillingResult<(Vec<CoreEvent>, ResponsePayload)>,
    {
        let result = {
            let mut engine = shared.engine.lock().await;
            op(&mut engine)
        };

        match result {
            Ok((events, payload)) => {
                Self::dispatch(shared, events).await;
                Response::success(request_id, payload)
            }
            Err(e) => {
                debug!(error = %e, "Command refused");
                Response::error(request_id, error_info(&e))
            }
        }
    }

    /// Re-read the config file and apply units, prices and menu.
    ///
    /// Socket, data directory, device and tick interval are only read at
    /// startup.
    async fn reload_config(shared: &Shared, request_id: u64) -> Response {
        let settings = match load_config(&shared.config_path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %shared.config_path.display(), error = %e, "Config reload failed");
                let _ = shared.store.append_audit(AuditEvent::new(
                    AuditEventType::ConfigReloaded { success: false },
                ));
                return Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::ConfigError, e.to_string()),
                );
            }
        };

        let response = Self::mutate(shared, request_id, |engine| {
            let events = engine.reload_catalog(settings)?;
            Ok((events, ResponsePayload::ConfigReloaded))
        })
        .await;

        let success = matches!(response.result, ResponseResult::Ok(_));
        let _ = shared
            .store
            .append_audit(AuditEvent::new(AuditEventType::ConfigReloaded { success }));

        response
    }
}

fn error_info(e: &BillingError) -> ErrorInfo {
    ErrorInfo::new(e.code(), e.to_string())
}

/// Response for a stop: the ledger record if anything was running
fn stopped_payload(events: &[CoreEvent]) -> ResponsePayload {
    events
        .iter()
        .find_map(|event| match event {
            CoreEvent::SessionStopped {
                record,
                needs_collection,
                ..
            } => Some(ResponsePayload::Stopped {
                record: Some(record.clone()),
                needs_collection: *needs_collection,
            }),
            _ => None,
        })
        .unwrap_or(ResponsePayload::Stopped {
            record: None,
            needs_collection: false,
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "playmeterd starting");

    let service = Service::new(&args).await?;
    service.run().await
}
