use clap::Parser;
use crossbeam_channel::unbounded;
use log::{error, info};
use tokio::sync::broadcast;

use ndef_rw::config::ServiceConfig;
use ndef_rw::nfc_service::{self, BridgeAdapter, NfcService};
use ndef_rw::session::WriteSession;
use ndef_rw::types::{NfcCommand, OutgoingMessage};
use ndef_rw::ws;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = ServiceConfig::parse();
    info!("Starting NDEF read/write service...");

    let table = match config.signature_table() {
        Ok(table) => table,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("Loaded {} tag signatures", table.len());

    // Channel: WS -> NFC (Commands)
    // Crossbeam (Sync) because the NFC thread blocks
    let (cmd_tx, cmd_rx) = unbounded::<NfcCommand>();

    // Channel: NFC -> WS (Events)
    let (event_tx, event_rx) = broadcast::channel::<OutgoingMessage>(100);

    // NFC thread -> bridge -> broadcast
    let (bridge_tx, bridge_rx) = unbounded::<OutgoingMessage>();
    let service = NfcService::new(
        bridge_tx.clone(),
        WriteSession::new(config.write_timeout()),
        table,
        config.write_policy(),
        Box::new(BridgeAdapter::new(bridge_tx)),
    );

    std::thread::spawn(move || {
        nfc_service::run(service, cmd_rx);
    });

    std::thread::spawn(move || {
        while let Ok(msg) = bridge_rx.recv() {
            let _ = event_tx.send(msg);
        }
    });

    ws::start_server(cmd_tx, event_rx, config.bind, config.locale.clone()).await;
}
