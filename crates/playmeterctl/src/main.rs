//! playmeterctl - command-line client for playmeterd
//!
//! Front-desk operations (start, stop, orders, transfers) and admin
//! commands over the daemon's IPC socket.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use playmeter_api::{
    Command, EventPayload, FleetSnapshot, MenuItemView, PriceDefinition, ResponsePayload,
    ResponseResult, TransactionRecord, UnitView,
};
use playmeter_ipc::IpcClient;
use playmeter_util::{default_socket_path, format_hms, ItemId, OperatorId, PriceId, UnitId};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "playmeterctl")]
#[command(about = "Control the playmeterd billing service", long_about = None)]
struct Args {
    /// Socket path (or set PLAYMETER_SOCKET env var)
    #[arg(short, long, env = "PLAYMETER_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Print raw JSON responses
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show every unit
    State,
    /// List the price catalog
    Prices,
    /// List the F&B menu with stock
    Menu,
    /// Start a session on an idle unit
    Start {
        unit: u32,
        price: String,
        #[arg(short, long, env = "USER", default_value = "staff")]
        operator: String,
    },
    /// Add time to a running session
    Extend { unit: u32, price: String },
    /// Stop a running session
    Stop { unit: u32 },
    /// Return a faulted unit to service
    ResetFault { unit: u32 },
    /// Move a session to an idle unit
    Transfer {
        source: u32,
        destination: u32,
        /// Mark the source unit as faulted
        #[arg(long)]
        faulty: bool,
    },
    /// Order food or drinks for a running session
    Order {
        unit: u32,
        item: String,
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Mark every order on a unit delivered
    Deliver { unit: u32 },
    /// Rename a unit (admin)
    Rename { unit: u32, name: String },
    /// Change the number of units (admin)
    Resize { count: u32, names: Vec<String> },
    /// Reload the configuration file (admin)
    Reload,
    /// Show recent completed sessions
    History {
        #[arg(default_value_t = 20)]
        limit: usize,
    },
    /// Show service health
    Health,
    /// Print events as they happen
    Watch,
    /// Check that the service answers
    Ping,
}

impl Cmd {
    fn into_command(self) -> Option<Command> {
        Some(match self {
            Cmd::State => Command::GetState,
            Cmd::Prices => Command::ListPrices,
            Cmd::Menu => Command::ListMenu,
            Cmd::Start {
                unit,
                price,
                operator,
            } => Command::Start {
                unit: UnitId::new(unit),
                price_id: PriceId::new(price),
                operator: OperatorId::new(operator),
            },
            Cmd::Extend { unit, price } => Command::Extend {
                unit: UnitId::new(unit),
                price_id: PriceId::new(price),
            },
            Cmd::Stop { unit } => Command::Stop {
                unit: UnitId::new(unit),
            },
            Cmd::ResetFault { unit } => Command::ResetFault {
                unit: UnitId::new(unit),
            },
            Cmd::Transfer {
                source,
                destination,
                faulty,
            } => Command::Transfer {
                source: UnitId::new(source),
                destination: UnitId::new(destination),
                faulty,
            },
            Cmd::Order {
                unit,
                item,
                quantity,
            } => Command::AddOrder {
                unit: UnitId::new(unit),
                item_id: ItemId::new(item),
                quantity,
            },
            Cmd::Deliver { unit } => Command::MarkDelivered {
                unit: UnitId::new(unit),
            },
            Cmd::Rename { unit, name } => Command::RenameUnit {
                unit: UnitId::new(unit),
                name,
            },
            Cmd::Resize { count, names } => Command::ResizeUnits { count, names },
            Cmd::Reload => Command::ReloadConfig,
            Cmd::History { limit } => Command::RecentTransactions { limit },
            Cmd::Health => Command::GetHealth,
            Cmd::Ping => Command::Ping,
            Cmd::Watch => return None,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let client = IpcClient::connect(&args.socket)
        .await
        .with_context(|| format!("Failed to connect to playmeterd at {:?}", args.socket))?;

    match args.command.into_command() {
        Some(command) => run_command(client, command, args.json).await,
        None => watch(client, args.json).await,
    }
}

async fn run_command(mut client: IpcClient, command: Command, json: bool) -> Result<()> {
    let response = client.send(command).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match response.result {
        ResponseResult::Ok(payload) => {
            print!("{}", render_payload(&payload));
            Ok(())
        }
        ResponseResult::Err(e) => bail!("{:?}: {}", e.code, e.message),
    }
}

async fn watch(client: IpcClient, json: bool) -> Result<()> {
    let mut events = client.subscribe().await?;
    loop {
        let event = events.next().await?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        let time = event.timestamp.format("%H:%M:%S");
        match &event.payload {
            // Snapshots follow every change; too noisy for a terminal
            EventPayload::StateChanged(_) => {}
            EventPayload::Shutdown => {
                println!("{} service shutting down", time);
                return Ok(());
            }
            payload => println!("{} {}", time, describe_event(payload)),
        }
    }
}

fn describe_event(payload: &EventPayload) -> String {
    match payload {
        EventPayload::SessionStarted {
            unit_id,
            unit_name,
            price_name,
            ..
        } => format!("{} ({}) started on {}", unit_name, unit_id, price_name),
        EventPayload::SessionExtended {
            unit_id,
            current_amount,
            ..
        } => format!("unit {} extended, now {}", unit_id, current_amount),
        EventPayload::SessionStopped {
            record,
            auto,
            needs_collection,
        } => {
            let mut line = format!(
                "{} stopped, total {}",
                record.unit_name, record.total_bill
            );
            if *auto {
                line.push_str(" (time's up)");
            }
            if *needs_collection {
                line.push_str(" - collect payment");
            }
            line
        }
        EventPayload::SessionTransferred {
            source,
            destination,
            source_status,
            ..
        } => format!(
            "unit {} moved to unit {} (source now {})",
            source,
            destination,
            source_status.tag()
        ),
        EventPayload::FaultReset { unit_id } => format!("unit {} back in service", unit_id),
        EventPayload::OrderAdded {
            unit_id,
            name,
            quantity,
            ..
        } => format!("unit {} ordered {} x{}", unit_id, name, quantity),
        EventPayload::OrdersDelivered { unit_id } => format!("unit {} orders delivered", unit_id),
        EventPayload::UnitRenamed { unit_id, name } => format!("unit {} renamed to {}", unit_id, name),
        EventPayload::UnitsResized { count } => format!("fleet resized to {} units", count),
        EventPayload::CatalogReloaded {
            price_count,
            menu_count,
        } => format!(
            "config reloaded: {} prices, {} menu items",
            price_count, menu_count
        ),
        EventPayload::LinkStatusChanged { connected, detail } => match (connected, detail) {
            (true, _) => "hardware link restored".to_string(),
            (false, Some(detail)) => format!("hardware link down: {}", detail),
            (false, None) => "hardware link down".to_string(),
        },
        EventPayload::StateChanged(_) => "state changed".to_string(),
        EventPayload::Shutdown => "service shutting down".to_string(),
    }
}

fn render_payload(payload: &ResponsePayload) -> String {
    match payload {
        ResponsePayload::State(snapshot) => render_fleet(snapshot),
        ResponsePayload::Prices(prices) => render_prices(prices),
        ResponsePayload::Menu(menu) => render_menu(menu),
        ResponsePayload::Unit(unit) => format!("{}\n", render_unit(unit)),
        ResponsePayload::Stopped {
            record: Some(record),
            needs_collection,
        } => {
            let mut out = render_record(record);
            if *needs_collection {
                out.push_str("Collect payment from the customer\n");
            }
            out
        }
        ResponsePayload::Stopped { record: None, .. } => "Nothing to stop\n".to_string(),
        ResponsePayload::Transferred {
            source,
            destination,
        } => format!("{}\n{}\n", render_unit(source), render_unit(destination)),
        ResponsePayload::UnitsResized { count } => format!("Fleet now has {} units\n", count),
        ResponsePayload::ConfigReloaded => "Configuration reloaded\n".to_string(),
        ResponsePayload::Transactions(records) => {
            if records.is_empty() {
                return "No transactions\n".to_string();
            }
            records.iter().map(render_record).collect()
        }
        ResponsePayload::Subscribed { client_id } => format!("Subscribed as {}\n", client_id),
        ResponsePayload::Unsubscribed => "Unsubscribed\n".to_string(),
        ResponsePayload::Health(health) => format!(
            "live: {}\nready: {}\nlink: {}\nstore: {}\n",
            health.live,
            health.ready,
            if health.link_connected { "connected" } else { "down" },
            if health.store_ok { "ok" } else { "error" }
        ),
        ResponsePayload::Pong => "pong\n".to_string(),
    }
}

fn render_fleet(snapshot: &FleetSnapshot) -> String {
    snapshot
        .units
        .iter()
        .map(|unit| format!("{}\n", render_unit(unit)))
        .collect()
}

fn render_unit(unit: &UnitView) -> String {
    let time = unit
        .display_time
        .map(format_hms)
        .unwrap_or_else(|| "--:--:--".to_string());
    let price = unit
        .price
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("-");
    let pending = if unit.pending_delivery {
        "  [F&B pending]"
    } else {
        ""
    };

    format!(
        "{:>3}  {:<16} {:<13} {:>9}  {:>9}  {}{}",
        unit.unit_id.to_string(),
        unit.unit_name,
        unit.status.tag(),
        time,
        unit.total_bill.to_string(),
        price,
        pending
    )
}

fn render_prices(prices: &[PriceDefinition]) -> String {
    prices
        .iter()
        .map(|p| format!("{:<8} {}\n", p.id.to_string(), p.label()))
        .collect()
}

fn render_menu(menu: &[MenuItemView]) -> String {
    menu.iter()
        .map(|item| {
            let stock = item
                .stock
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string());
            format!(
                "{:<8} {:<20} {:>8}  stock {}\n",
                item.item_id.to_string(),
                item.name,
                item.price.to_string(),
                stock
            )
        })
        .collect()
}

fn render_record(record: &TransactionRecord) -> String {
    let mut line = format!(
        "{}  {:<16} {:<16} {:>9}  {:.0} min  by {}",
        record.timestamp.format("%Y-%m-%d %H:%M"),
        record.unit_name,
        record.package_name,
        record.total_bill.to_string(),
        record.duration_minutes,
        record.operator_id
    );
    if !record.notes.is_empty() {
        line.push_str(&format!("  [{}]", record.notes));
    }
    if record.auto_stop {
        line.push_str("  (auto)");
    }
    line.push('\n');
    line
}
