//! Purpose: Run one AR view bridge over a newline-delimited JSON stdio channel.
//! Exports: `ServeConfig`, `serve`.
//! Role: Host shell for the bridge; stdin carries calls and host notices, stdout carries
//! responses and events.
//! Invariants: stdout only emits channel messages (one JSON value per line), written by a
//! single writer task so responses and events never interleave mid-line.
//! Invariants: Events a call produced are written before that call's response.
//! Invariants: Calls are submitted in arrival order; responses may complete out of order.
//! Invariants: stdin EOF disposes the bridge and exits cleanly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use arbridge::bridge::{BridgeBuilder, BridgeEvents, BridgeHandle};
use arbridge::catalog::MemoryCatalog;
use arbridge::channel::{CallId, parse_call, response_json};
use arbridge::core::command::{Command, decode_command};
use arbridge::core::error::{Error, ErrorKind};
use arbridge::core::event::event_json;
use arbridge::core::vec3::Vec3;
use arbridge::engine::sim::SimEngine;
use arbridge::observer::{HostNotice, HostNotifier};

#[derive(Clone, Debug)]
pub(super) struct ServeConfig {
    pub catalog: PathBuf,
    pub view_id: i64,
    pub measurement: bool,
    pub first_plane: Option<Vec3>,
    pub load_step: Duration,
}

pub(super) fn serve(config: ServeConfig) -> Result<(), Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start runtime")
                .with_source(err)
        })?;
    runtime.block_on(run(config))
}

async fn run(config: ServeConfig) -> Result<(), Error> {
    let catalog = MemoryCatalog::from_path(&config.catalog)?;
    let engine = SimEngine::new()
        .with_measurement_support(config.measurement)
        .with_first_plane(config.first_plane)
        .with_load_step(config.load_step);
    let notifier = HostNotifier::new();
    let (bridge, events) = BridgeBuilder::new(Arc::new(engine), Arc::new(catalog))
        .with_view_id(config.view_id)
        .with_notifier(&notifier)
        .spawn();
    tracing::info!(channel = %bridge.channel_name(), "serving AR view bridge on stdio");

    let (out_tx, out_rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(write_lines(events, out_rx));

    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = lines.next_line().await.map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to read channel input")
                .with_source(err)
        })?;
        let Some(line) = line else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        handle_line(message, &bridge, &notifier, &out_tx, &mut in_flight);
    }

    tracing::debug!("stdin closed; disposing");
    if let Err(err) = bridge.call(Command::Dispose).await {
        tracing::warn!(error = %err, "dispose on shutdown failed");
    }
    while in_flight.join_next().await.is_some() {}
    drop(bridge);
    drop(out_tx);
    writer.await.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("channel writer task failed")
            .with_source(err)
    })?
}

fn handle_line(
    message: &str,
    bridge: &BridgeHandle,
    notifier: &HostNotifier,
    out: &mpsc::UnboundedSender<Value>,
    in_flight: &mut JoinSet<()>,
) {
    let value = match serde_json::from_str::<Value>(message) {
        Ok(value) => value,
        Err(err) => {
            let error = Error::new(ErrorKind::InvalidArgument)
                .with_message("invalid JSON")
                .with_source(err);
            let _ = out.send(response_json(&CallId::Null, &Err(error)));
            return;
        }
    };

    if let Some(notice) = value.get("notice") {
        match parse_notice(notice, &value) {
            Ok(notice) => {
                let reached = notifier.publish(notice);
                tracing::debug!(reached, "host notice published");
            }
            Err(err) => {
                let _ = out.send(response_json(&CallId::Null, &Err(err)));
            }
        }
        return;
    }

    let call = match parse_call(value) {
        Ok(call) => call,
        Err(rejected) => {
            let _ = out.send(response_json(&rejected.id, &Err(rejected.error)));
            return;
        }
    };
    let pending = match decode_command(&call.method, &call.arguments) {
        Ok(command) => bridge.submit(command),
        Err(err) => {
            let _ = out.send(response_json(&call.id, &Err(err)));
            return;
        }
    };
    let out = out.clone();
    in_flight.spawn(async move {
        let result = pending.wait().await;
        let _ = out.send(response_json(&call.id, &result));
    });
}

/// `{"notice": "appPaused" | "appResumed" | "unauthorized", "message"?: str}`
fn parse_notice(kind: &Value, line: &Value) -> Result<HostNotice, Error> {
    match kind.as_str() {
        Some("appPaused") => Ok(HostNotice::AppPaused),
        Some("appResumed") => Ok(HostNotice::AppResumed),
        Some("unauthorized") => {
            let message = line
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unauthorized.")
                .to_string();
            Ok(HostNotice::Unauthorized { message })
        }
        _ => Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("notice must be one of appPaused, appResumed, unauthorized")),
    }
}

/// Single writer for stdout. Events win ties, so anything the bridge emitted before
/// answering a call is written before that call's response.
async fn write_lines(
    mut events: BridgeEvents,
    mut responses: mpsc::UnboundedReceiver<Value>,
) -> Result<(), Error> {
    let mut stdout = tokio::io::stdout();
    let mut events_open = true;
    let mut responses_open = true;
    while events_open || responses_open {
        let value = tokio::select! {
            biased;
            event = events.recv(), if events_open => match event {
                Some(event) => event_json(&event),
                None => {
                    events_open = false;
                    continue;
                }
            },
            response = responses.recv(), if responses_open => match response {
                Some(response) => response,
                None => {
                    responses_open = false;
                    continue;
                }
            },
        };
        write_line(&mut stdout, &value).await?;
    }
    Ok(())
}

async fn write_line(stdout: &mut tokio::io::Stdout, value: &Value) -> Result<(), Error> {
    let mut line = serde_json::to_vec(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode channel message")
            .with_source(err)
    })?;
    line.push(b'\n');
    stdout.write_all(&line).await.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to write channel message")
            .with_source(err)
    })?;
    stdout.flush().await.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to flush channel message")
            .with_source(err)
    })
}
