//! Publish/subscribe demo against a local broker.
//!
//! Start any MQTT 3.1.1 broker on localhost:1883, then:
//! `RUST_LOG=info cargo run --example pubsub`

use std::time::Duration;

use log::{info, warn};
use picoclient_tokio::{spawn_client, ClientInfo, Event, EventHandler, QoS};

const BROKER_HOST: &str = "127.0.0.1";
const BROKER_PORT: u16 = 1883;
const TOPIC: &str = "picoclient/demo";

struct Printer;

impl EventHandler for Printer {
    fn on_event(&mut self, event: Event<'_>) {
        match event {
            Event::Connect { status } => info!("connect finished: {:?}", status),
            Event::Disconnect { is_accepted } => {
                info!("disconnected, is_accepted: {}", is_accepted)
            }
            Event::PublishRecv {
                topic,
                payload,
                qos,
                dup,
            } => info!(
                "message on {:?} ({} bytes, qos {:?}, dup {}): {}",
                topic,
                payload.len(),
                qos,
                dup,
                String::from_utf8_lossy(payload)
            ),
            Event::Publish { arg, res } => info!("publish #{} finished: {:?}", arg, res),
            Event::Subscribe { arg, res } => info!("subscribe #{} finished: {:?}", arg, res),
            Event::Unsubscribe { arg, res } => info!("unsubscribe #{} finished: {:?}", arg, res),
            Event::KeepAlive => info!("keep-alive confirmed"),
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    static INFO: ClientInfo<'static> = ClientInfo::new("picoclient-demo");

    let (client, _driver) = spawn_client::<Printer, 1024, 1024, 8>();
    client
        .lock()
        .unwrap()
        .connect(BROKER_HOST, BROKER_PORT, Printer, &INFO)
        .expect("connect request failed");

    // Give the handshake a moment before subscribing
    tokio::time::sleep(Duration::from_millis(500)).await;
    {
        let mut client = client.lock().unwrap();
        if !client.is_connected() {
            warn!("broker not reachable at {}:{}", BROKER_HOST, BROKER_PORT);
            return;
        }
        client
            .subscribe(TOPIC, QoS::AtLeastOnce, 0)
            .expect("subscribe failed");
    }

    for round in 1..=5usize {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut client = client.lock().unwrap();
        if client.is_connected() {
            let _ = client.publish(TOPIC, b"hello from picoclient", QoS::AtLeastOnce, false, round);
        }
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    let _ = client.lock().unwrap().disconnect();
    tokio::time::sleep(Duration::from_millis(200)).await;
}
