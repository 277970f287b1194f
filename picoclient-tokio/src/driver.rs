//! Connection driver task
//!
//! Owns the TCP stream for one client and translates between socket I/O
//! and the core's transport events. Runs as a separate task; the client is
//! locked only for the duration of each event delivery.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, trace};
use picoclient_core::{EventHandler, TransportEvent, POLL_INTERVAL_MS};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time;

use crate::transport::TransportCmd;
use crate::TokioClient;

const READ_CHUNK: usize = 1024;

/// Drive one client's connection lifecycle until every outside client
/// handle is gone.
pub(crate) async fn driver_task<
    H,
    const TX_LEN: usize,
    const RX_LEN: usize,
    const MAX_REQUESTS: usize,
>(
    client: Arc<Mutex<TokioClient<H, TX_LEN, RX_LEN, MAX_REQUESTS>>>,
    mut commands: mpsc::UnboundedReceiver<TransportCmd>,
) where
    H: EventHandler + Send + 'static,
{
    loop {
        // Disconnected: nothing to do until the client asks for a dial
        let (host, port) = loop {
            match commands.recv().await {
                None => return,
                Some(TransportCmd::Dial { host, port }) => break (host, port),
                Some(other) => trace!("ignoring {:?} while disconnected", other),
            }
        };

        let stream = match TcpStream::connect((host.as_str(), port)).await {
            Ok(stream) => stream,
            Err(err) => {
                info!("tcp connect to {}:{} failed: {}", host, port, err);
                client
                    .lock()
                    .unwrap()
                    .transport_event(TransportEvent::ConnectFailed);
                continue;
            }
        };
        info!("tcp connection to {}:{} established", host, port);

        let (mut read_half, mut write_half) = stream.into_split();
        client
            .lock()
            .unwrap()
            .transport_event(TransportEvent::Connected);

        let period = Duration::from_millis(POLL_INTERVAL_MS as u64);
        let mut poll = time::interval_at(time::Instant::now() + period, period);
        let mut read_buf = [0u8; READ_CHUNK];

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None => {
                        let _ = write_half.shutdown().await;
                        return;
                    }
                    Some(TransportCmd::Send(data)) => {
                        let ok = write_half.write_all(&data).await.is_ok();
                        client.lock().unwrap().transport_event(TransportEvent::Sent {
                            len: data.len(),
                            ok,
                        });
                    }
                    Some(TransportCmd::Close) => {
                        let _ = write_half.shutdown().await;
                        client
                            .lock()
                            .unwrap()
                            .transport_event(TransportEvent::Closed { forced: true });
                        break;
                    }
                    Some(TransportCmd::Dial { .. }) => {
                        trace!("ignoring dial while connected");
                    }
                },
                result = read_half.read(&mut read_buf) => match result {
                    Ok(0) => {
                        info!("connection closed by peer");
                        client
                            .lock()
                            .unwrap()
                            .transport_event(TransportEvent::Closed { forced: false });
                        break;
                    }
                    Ok(n) => {
                        client
                            .lock()
                            .unwrap()
                            .transport_event(TransportEvent::Received(&read_buf[..n]));
                    }
                    Err(err) => {
                        info!("read error: {}", err);
                        client
                            .lock()
                            .unwrap()
                            .transport_event(TransportEvent::Closed { forced: false });
                        break;
                    }
                },
                _ = poll.tick() => {
                    client.lock().unwrap().transport_event(TransportEvent::Poll);
                }
            }
        }
    }
}
