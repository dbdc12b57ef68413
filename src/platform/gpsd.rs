// src/platform/gpsd.rs
//! Built-in provider registry backed by a gpsd daemon

use crate::{
    error::{LocationError, Result},
    listener::{ListenerId, LocationCallback},
    location::{now_millis, Location, GPS_PROVIDER, PASSIVE_PROVIDER},
    platform::ProviderRegistry,
};
use chrono::DateTime;
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// Connect to a gpsd daemon and return a stream reader
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| LocationError::Connection(format!("Failed to connect to gpsd at {}:{}: {}", host, port, e)))?;

    // Send WATCH command to start receiving JSON data
    let watch_cmd = "?WATCH={\"enable\":true,\"json\":true}\n";
    stream
        .write_all(watch_cmd.as_bytes())
        .await
        .map_err(|e| LocationError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Parse one line of gpsd JSON. Returns a location for TPV reports that
/// carry a 2D or 3D fix, `None` for everything else.
pub fn parse_gpsd_json(line: &str) -> Result<Option<Location>> {
    let msg: GpsdMessage = serde_json::from_str(line)?;

    match msg.class.as_str() {
        "TPV" => Ok(parse_tpv_message(&msg.data)),
        "VERSION" => {
            if let Some(version) = msg.data.get("release").and_then(|v| v.as_str()) {
                info!(version, "connected to gpsd");
            }
            Ok(None)
        }
        "DEVICES" => {
            if let Some(devices) = msg.data.get("devices").and_then(|v| v.as_array()) {
                info!(count = devices.len(), "gpsd managing devices");
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

/// Parse TPV (Time Position Velocity) message
fn parse_tpv_message(msg_data: &HashMap<String, serde_json::Value>) -> Option<Location> {
    let field = |name: &str| msg_data.get(name).and_then(|v| v.as_f64());

    // mode 0/1 means no fix
    let mode = msg_data.get("mode").and_then(|v| v.as_u64()).unwrap_or(0);
    if mode < 2 {
        return None;
    }

    let latitude = field("lat")?;
    let longitude = field("lon")?;

    let accuracy = match (field("eph"), field("epx"), field("epy")) {
        (Some(eph), _, _) => eph as f32,
        (None, Some(epx), Some(epy)) => epx.max(epy) as f32,
        _ => f32::MAX,
    };

    let timestamp_millis = msg_data
        .get("time")
        .and_then(|v| v.as_str())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(now_millis);

    Some(Location::new(GPS_PROVIDER, latitude, longitude, accuracy, timestamp_millis))
}

#[derive(Default)]
struct GpsdState {
    last_fix: Option<Location>,
    pending: HashMap<ListenerId, LocationCallback>,
}

/// Exposes gpsd as the `gps` provider plus a `passive` provider that only
/// ever replays the last fix.
#[derive(Clone, Default)]
pub struct GpsdProviders {
    state: Arc<Mutex<GpsdState>>,
    streaming: Arc<AtomicBool>,
}

impl GpsdProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to gpsd and start feeding reports in the background.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        info!(host, port, "connecting to gpsd");
        let reader = connect_gpsd(host, port).await?;
        let providers = Self::new();
        providers.spawn_reader(reader);
        Ok(providers)
    }

    /// Consume gpsd lines from `reader` until EOF, an IO error or `stop`.
    pub fn spawn_reader<R>(&self, mut reader: R) -> tokio::task::JoinHandle<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        self.streaming.store(true, Ordering::Release);
        let providers = self.clone();

        tokio::spawn(async move {
            let mut line = String::new();

            while providers.streaming.load(Ordering::Acquire) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if let Err(e) = providers.ingest_line(line) {
                            warn!(error = %e, "Error parsing gpsd JSON");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Error reading from gpsd");
                        break;
                    }
                }
            }

            providers.streaming.store(false, Ordering::Release);
            debug!("gpsd reader finished");
        })
    }

    pub fn stop(&self) {
        self.streaming.store(false, Ordering::Release);
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub fn ingest_line(&self, line: &str) -> Result<()> {
        if let Some(location) = parse_gpsd_json(line)? {
            self.report(location);
        }
        Ok(())
    }

    /// Record a fix and hand it to every waiting single-update listener.
    pub fn report(&self, location: Location) {
        let waiting: Vec<LocationCallback> = {
            let mut state = self.lock();
            state.last_fix = Some(location.clone());
            state.pending.drain().map(|(_, callback)| callback).collect()
        };

        for callback in waiting {
            callback(location.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, GpsdState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ProviderRegistry for GpsdProviders {
    fn providers(&self) -> Vec<String> {
        vec![GPS_PROVIDER.to_string(), PASSIVE_PROVIDER.to_string()]
    }

    fn last_known_location(&self, provider: &str) -> Option<Location> {
        match provider {
            GPS_PROVIDER => self.lock().last_fix.clone(),
            PASSIVE_PROVIDER => self.lock().last_fix.clone().map(|mut location| {
                location.provider = PASSIVE_PROVIDER.to_string();
                location
            }),
            _ => None,
        }
    }

    fn is_provider_enabled(&self, provider: &str) -> bool {
        match provider {
            GPS_PROVIDER => self.is_streaming(),
            PASSIVE_PROVIDER => true,
            _ => false,
        }
    }

    fn request_single_update(&self, provider: &str, callback: LocationCallback) -> Result<ListenerId> {
        if provider != GPS_PROVIDER {
            return Err(LocationError::Platform(format!("Unknown provider: {}", provider)));
        }
        let id = ListenerId::next();
        self.lock().pending.insert(id, callback);
        Ok(id)
    }

    fn remove_updates(&self, id: ListenerId) {
        self.lock().pending.remove(&id);
    }
}
