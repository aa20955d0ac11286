//! Integration tests for playmeterd
//!
//! These tests verify the end-to-end behavior of the daemon's components
//! working together: config, engine, store, link and IPC.

use chrono::{DateTime, Local, TimeZone};
use playmeter_api::{
    ClientRole, Command, Event, EventPayload, Response, ResponsePayload, ResponseResult,
    UnitStatus,
};
use playmeter_config::parse_config;
use playmeter_core::{BillingEngine, CoreEvent};
use playmeter_ipc::{IpcClient, IpcServer, ServerMessage};
use playmeter_link::{LinkHandle, MockSink};
use playmeter_store::{SqliteStore, Store};
use playmeter_util::{ItemId, Money, OperatorId, PriceId, UnitId};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;

const CONFIG: &str = r#"
config_version = 1

[units]
count = 3
names = ["PS4 - 1", "PS4 - 2"]

[[prices]]
id = "P1"
name = "Reguler PS3"
kind = { type = "package", price = 20000, duration_minutes = 60 }

[[prices]]
id = "OP1"
name = "Open PS3"
kind = { type = "hourly", rate = 4000 }

[[menu]]
id = "F1"
name = "Mie Goreng"
price = 10000
stock = 5
"#;

fn t0() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
}

fn mins(m: i64) -> chrono::Duration {
    chrono::Duration::minutes(m)
}

fn make_engine() -> (BillingEngine, Arc<SqliteStore>) {
    let settings = parse_config(CONFIG).unwrap();
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let engine = BillingEngine::new(settings, store.clone());
    (engine, store)
}

/// Forward relay commands the way the daemon does
fn publish(link: &LinkHandle, events: &[CoreEvent]) {
    for event in events {
        for command in event.relay_commands() {
            link.relay(command.unit, command.on);
        }
    }
}

async fn wait_for_lines(sink: &MockSink, count: usize) {
    for _ in 0..100 {
        if sink.lines().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} lines, got {:?}", count, sink.lines());
}

#[test]
fn test_config_builds_fleet() {
    let (engine, store) = make_engine();

    let snapshot = engine.snapshot(t0());
    assert_eq!(snapshot.units.len(), 3);
    assert_eq!(snapshot.units[0].unit_name, "PS4 - 1");
    assert_eq!(snapshot.units[2].unit_name, "Unit 3");
    assert!(snapshot.units.iter().all(|u| u.status == UnitStatus::Idle));

    assert_eq!(engine.prices().len(), 2);
    assert_eq!(store.get_stock(&ItemId::new("F1")).unwrap(), Some(5));
}

#[test]
fn test_hourly_session_lifecycle() {
    let (mut engine, store) = make_engine();
    let unit = UnitId::new(1);

    engine
        .start(unit, &PriceId::new("OP1"), OperatorId::new("desk"), t0())
        .unwrap();
    engine.tick(t0() + mins(30));
    assert_eq!(
        engine.unit_view(unit, t0() + mins(30)).unwrap().current_amount,
        Money::new(4000)
    );

    engine.tick(t0() + mins(61));
    engine.add_order(unit, &ItemId::new("F1"), 2).unwrap();
    let view = engine.unit_view(unit, t0() + mins(61)).unwrap();
    assert_eq!(view.total_bill, Money::new(28000));
    assert!(view.pending_delivery);

    engine.mark_delivered(unit).unwrap();
    let events = engine.stop(unit, t0() + mins(61)).unwrap();
    assert!(matches!(
        &events[0],
        CoreEvent::SessionStopped { needs_collection: true, auto: false, .. }
    ));

    let ledger = store.recent_transactions(5).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].unit_name, "PS4 - 1");
    assert_eq!(ledger[0].operator_id, OperatorId::new("desk"));
    assert_eq!(ledger[0].package_name, "Open PS3");
    assert_eq!(ledger[0].total_bill, Money::new(28000));
    assert_eq!(ledger[0].notes, "Mie Goreng(2)");
    assert_eq!(store.get_stock(&ItemId::new("F1")).unwrap(), Some(3));

    // Nothing left to stop
    assert!(engine.stop(unit, t0() + mins(62)).unwrap().is_empty());
    assert_eq!(store.recent_transactions(5).unwrap().len(), 1);
}

#[tokio::test]
async fn test_engine_events_drive_relays_and_frames() {
    let (mut engine, _store) = make_engine();
    let sink = Arc::new(MockSink::new());
    let (link, _status) = LinkHandle::spawn(sink.clone());

    let events = engine
        .start(UnitId::new(2), &PriceId::new("P1"), OperatorId::new("desk"), t0())
        .unwrap();
    publish(&link, &events);
    wait_for_lines(&sink, 1).await;

    link.sync(&engine.snapshot(t0() + mins(20)).units);
    wait_for_lines(&sink, 2).await;

    assert_eq!(sink.relay_lines(), vec!["ON:2"]);
    assert_eq!(
        sink.last_frame().unwrap(),
        "SYNC|1;PS4 - 1;IDLE;OFF;0;0|2;PS4 - 2;RUNNING_TIMER;00:40:00;20000;0|3;Unit 3;IDLE;OFF;0;0|"
    );

    // Timer runs out: the tick auto-stops and the relay goes off
    let events = engine.tick(t0() + mins(60));
    assert_eq!(events.len(), 1);
    publish(&link, &events);
    wait_for_lines(&sink, 3).await;

    assert_eq!(sink.relay_lines(), vec!["ON:2", "OFF:2"]);
}

#[tokio::test]
async fn test_faulty_transfer_relays() {
    let (mut engine, _store) = make_engine();
    let sink = Arc::new(MockSink::new());
    let (link, _status) = LinkHandle::spawn(sink.clone());

    engine
        .start(UnitId::new(1), &PriceId::new("OP1"), OperatorId::new("desk"), t0())
        .unwrap();
    let events = engine
        .transfer(UnitId::new(1), UnitId::new(3), true, t0() + mins(5))
        .unwrap();
    publish(&link, &events);
    wait_for_lines(&sink, 2).await;

    assert_eq!(sink.relay_lines(), vec!["OFF:1", "ON:3"]);

    let snapshot = engine.snapshot(t0() + mins(5));
    assert_eq!(snapshot.units[0].status, UnitStatus::Trouble);
    assert_eq!(snapshot.units[2].status, UnitStatus::RunningOpen);
}

/// Start a server on a temporary socket with a responder that answers a
/// few commands, and report connected client roles
async fn start_server(
    socket_path: &std::path::Path,
) -> (Arc<IpcServer>, mpsc::UnboundedReceiver<ClientRole>) {
    let mut server = IpcServer::new(socket_path);
    server.start().await.unwrap();
    let server = Arc::new(server);

    let mut messages = server.take_message_receiver().await.unwrap();
    let accept = server.clone();
    tokio::spawn(async move {
        let _ = accept.run().await;
    });

    let (role_tx, role_rx) = mpsc::unbounded_channel();
    let responder = server.clone();
    tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            match msg {
                ServerMessage::Request { client_id, request } => {
                    let payload = match request.command {
                        Command::SubscribeEvents => ResponsePayload::Subscribed {
                            client_id: client_id.clone(),
                        },
                        _ => ResponsePayload::Pong,
                    };
                    let _ = responder
                        .send_response(&client_id, Response::success(request.request_id, payload))
                        .await;
                }
                ServerMessage::ClientConnected { info, .. } => {
                    let _ = role_tx.send(info.role);
                }
                ServerMessage::ClientDisconnected { .. } => {}
            }
        }
    });

    (server, role_rx)
}

#[tokio::test]
async fn test_ipc_request_response() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("playmeterd.sock");
    let (_server, mut roles) = start_server(&socket_path).await;

    let mut client = IpcClient::connect(&socket_path).await.unwrap();
    let response = client.send(Command::Ping).await.unwrap();

    assert_eq!(response.request_id, 1);
    assert!(matches!(response.result, ResponseResult::Ok(ResponsePayload::Pong)));

    // Same uid as the server process
    let role = tokio::time::timeout(Duration::from_secs(1), roles.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(role, ClientRole::Admin);
}

#[tokio::test]
async fn test_ipc_event_subscription() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("playmeterd.sock");
    let (server, _roles) = start_server(&socket_path).await;

    let client = IpcClient::connect(&socket_path).await.unwrap();
    let mut events = client.subscribe().await.unwrap();

    server.broadcast_event(Event::new(EventPayload::LinkStatusChanged {
        connected: false,
        detail: Some("unplugged".into()),
    }));

    let event = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        event.payload,
        EventPayload::LinkStatusChanged { connected: false, .. }
    ));
}

#[tokio::test]
async fn test_ipc_rejects_garbage() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("playmeterd.sock");
    let (_server, _roles) = start_server(&socket_path).await;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    let stream = tokio::net::UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(b"not json\n").await.unwrap();

    let mut line = String::new();
    let mut reader = BufReader::new(read_half);
    tokio::time::timeout(Duration::from_secs(1), reader.read_line(&mut line))
        .await
        .unwrap()
        .unwrap();

    let response: Response = serde_json::from_str(line.trim()).unwrap();
    assert!(matches!(response.result, ResponseResult::Err(_)));
}
