use std::collections::HashSet;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::protocol::cipher::{decrypt, encrypt};
use crate::protocol::client::{KasaBulb, KasaError, KasaOptions};
use crate::protocol::messages::{SysInfo, make_sysinfo_message};

const MAX_DATAGRAM_SIZE: usize = 65_507;

pub struct Scanner;

impl Scanner {
    /// Broadcasts a sysinfo query and collects every light that answers
    /// before the discovery window closes.
    pub async fn scan(options: &KasaOptions) -> Result<Vec<KasaBulb>, KasaError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;

        let query = encrypt(&serde_json::to_vec(&make_sysinfo_message())?);
        socket
            .send_to(&query, options.discovery_target.as_str())
            .await?;

        let deadline = Instant::now() + options.discovery_timeout;
        let mut seen: HashSet<SocketAddr> = HashSet::new();
        let mut result = Vec::new();
        let mut data = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            match timeout_at(deadline, socket.recv_from(&mut data)).await {
                Ok(Ok((len, source))) => {
                    debug!("Received {} bytes from {}", len, source);
                    if !seen.insert(source) {
                        continue;
                    }
                    match parse_reply(&data[..len]) {
                        Ok(info) if info.is_light() => {
                            info!("Light found at {}: {}", source.ip(), info.alias);
                            let host = source.ip().to_string();
                            result.push(KasaBulb::from_sysinfo(&host, options.clone(), info));
                        }
                        Ok(info) => {
                            debug!("Ignoring {} ({}): no light control", info.alias, source);
                        }
                        Err(e) => {
                            warn!("Unparsable discovery reply from {}: {}", source, e);
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!("Error receiving discovery reply: {}", e);
                    return Err(e.into());
                }
                Err(_) => {
                    info!(
                        "Discovery window of {:?} closed, {} light(s) found",
                        options.discovery_timeout,
                        result.len()
                    );
                    break;
                }
            }
        }
        Ok(result)
    }
}

fn parse_reply(datagram: &[u8]) -> Result<SysInfo, KasaError> {
    let value = serde_json::from_slice(&decrypt(datagram))?;
    SysInfo::from_response(&value)
}
