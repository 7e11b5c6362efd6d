use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use thermosync_api::{DeviceCommand, DeviceTelemetry, ObserverCommand, ObserverEvent};
use time::OffsetDateTime;
use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use crate::configs::Storage;
use crate::errors::DeviceError;
use crate::repositories::DeviceRepository;

/// Window after an operator-issued power command during which a hardware
/// power echo is not persisted, so the echo cannot overwrite the command.
const POWER_OVERRIDE_GRACE: Duration = Duration::from_secs(3);

const COMMAND_BUFFER: usize = 32;

/// Ephemeral per-connection state. Never persisted; the Device record in the
/// store remains the source of truth.
struct DeviceSession {
    sender: mpsc::Sender<DeviceCommand>,
    power: bool,
    temperature: i32,
    locked: bool,
    power_override_at: Option<OffsetDateTime>,
}

/// Owns the registry of live device connections and the observer broadcast
/// channel. Commands are fire-and-forget: no acknowledgement, no retry.
pub struct DeviceBridge {
    sessions: RwLock<HashMap<String, DeviceSession>>,
    observer_tx: broadcast::Sender<ObserverEvent>,
    devices: DeviceRepository,
}

impl DeviceBridge {
    pub fn new(storage: Arc<Storage>) -> Self {
        let (observer_tx, _) = broadcast::channel(100);

        Self {
            sessions: RwLock::new(HashMap::new()),
            observer_tx,
            devices: DeviceRepository::new(storage),
        }
    }

    pub fn subscribe_observers(&self) -> broadcast::Receiver<ObserverEvent> {
        self.observer_tx.subscribe()
    }

    /// Broadcast to every observer connection. Lossy when nobody listens.
    pub fn broadcast(&self, event: ObserverEvent) {
        let _ = self.observer_tx.send(event);
    }

    pub async fn is_connected(&self, serial: &str) -> bool {
        self.sessions.read().await.contains_key(serial)
    }

    /// Drive one device WebSocket for its whole lifetime: register the
    /// session, reconcile hardware towards persisted state, pump commands
    /// out and telemetry in, deregister on close.
    pub async fn handle_device_socket(self: Arc<Self>, serial: String, socket: WebSocket) {
        tracing::info!(serial = %serial, "device connected");

        let (command_tx, mut command_rx) = mpsc::channel::<DeviceCommand>(COMMAND_BUFFER);
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                serial.clone(),
                DeviceSession {
                    sender: command_tx,
                    power: false,
                    temperature: 0,
                    locked: false,
                    power_override_at: None,
                },
            );
        }

        let (mut ws_sender, mut ws_receiver) = socket.split();

        let send_serial = serial.clone();
        let send_task = tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let json = match serde_json::to_string(&command) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(serial = %send_serial, "failed to encode command: {}", e);
                        continue;
                    }
                };

                if ws_sender.send(WsMessage::Text(json)).await.is_err() {
                    break;
                }
            }
        });

        // The persisted record wins over whatever state the hardware kept
        // while offline.
        if let Err(e) = self.restore_authoritative_state(&serial).await {
            tracing::warn!(serial = %serial, "state restore failed: {}", e);
        }

        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<DeviceTelemetry>(&text) {
                    Ok(telemetry) => self.handle_telemetry(&serial, telemetry).await,
                    Err(e) => {
                        tracing::warn!(serial = %serial, "unparseable telemetry: {}", e);
                    }
                },
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(serial = %serial, "device socket error: {}", e);
                    break;
                }
            }
        }

        tracing::info!(serial = %serial, "device disconnected");
        send_task.abort();

        let mut sessions = self.sessions.write().await;
        sessions.remove(&serial);
    }

    /// Drive one observer WebSocket: forward broadcasts out, translate
    /// inbound control requests into device commands.
    pub async fn handle_observer_socket(self: Arc<Self>, socket: WebSocket) {
        let observer_id = Uuid::new_v4();
        tracing::debug!(observer_id = %observer_id, "observer connected");

        let (mut ws_sender, mut ws_receiver) = socket.split();
        let mut observer_rx = self.observer_tx.subscribe();

        let forward_task = tokio::spawn(async move {
            while let Ok(event) = observer_rx.recv().await {
                let Ok(json) = serde_json::to_string(&event) else {
                    continue;
                };

                if ws_sender.send(WsMessage::Text(json)).await.is_err() {
                    break;
                }
            }
        });

        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<ObserverCommand>(&text) {
                    Ok(command) => {
                        if let Err(e) = self.handle_observer_command(command).await {
                            tracing::warn!(observer_id = %observer_id, "observer command failed: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(observer_id = %observer_id, "unparseable observer command: {}", e);
                    }
                },
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }

        tracing::debug!(observer_id = %observer_id, "observer disconnected");
        forward_task.abort();
    }

    /// Observer control requests persist intent first, then dispatch the
    /// same outbound commands the orchestration layer uses.
    async fn handle_observer_command(&self, command: ObserverCommand) -> Result<(), DeviceError> {
        match command {
            ObserverCommand::SetPower { serial, power } => {
                self.devices
                    .persist_power(&serial, power)
                    .await
                    .map_err(|e| {
                        tracing::error!(serial = %serial, "failed to persist power intent: {}", e);
                        DeviceError::DeviceNotFound
                    })?;
                self.power(&serial, power).await
            }
            ObserverCommand::SetTemperature { serial, temp } => {
                self.devices
                    .persist_temperature(&serial, temp)
                    .await
                    .map_err(|e| {
                        tracing::error!(serial = %serial, "failed to persist temperature intent: {}", e);
                        DeviceError::DeviceNotFound
                    })?;
                self.set_temperature(&serial, temp).await
            }
            ObserverCommand::PulseTemperature { serial, steps } => {
                self.pulse_temperature(&serial, steps).await
            }
            ObserverCommand::SetLock { serial, locked } => {
                if let Err(e) = self.devices.persist_lock(&serial, locked).await {
                    tracing::error!(serial = %serial, "failed to persist lock intent: {}", e);
                }
                self.lock(&serial, locked).await
            }
        }
    }

    /// Push the persisted record back onto freshly connected hardware.
    async fn restore_authoritative_state(&self, serial: &str) -> Result<(), DeviceError> {
        let device = self
            .devices
            .find_by_serial(serial)
            .await
            .map_err(|e| {
                tracing::error!(serial = %serial, "device lookup failed: {}", e);
                DeviceError::DeviceNotFound
            })?
            .ok_or(DeviceError::DeviceNotFound)?;

        self.set_temperature(serial, device.temperature).await?;
        self.power(serial, device.is_on).await?;
        self.lock(serial, device.is_locked).await?;

        Ok(())
    }

    async fn send(&self, serial: &str, command: DeviceCommand) -> Result<(), DeviceError> {
        let sender = {
            let sessions = self.sessions.read().await;
            sessions
                .get(serial)
                .map(|session| session.sender.clone())
                .ok_or(DeviceError::DeviceNotConnected)?
        };

        sender
            .send(command)
            .await
            .map_err(|_| DeviceError::DeviceNotConnected)
    }

    pub async fn power(&self, serial: &str, on: bool) -> Result<(), DeviceError> {
        {
            let mut sessions = self.sessions.write().await;
            if let Some(session) = sessions.get_mut(serial) {
                session.power_override_at = Some(OffsetDateTime::now_utc());
            }
        }

        let command = if on {
            DeviceCommand::PowerOn
        } else {
            DeviceCommand::PowerOff
        };

        self.send(serial, command).await
    }

    pub async fn set_temperature(&self, serial: &str, temp: i32) -> Result<(), DeviceError> {
        self.send(serial, DeviceCommand::SetTemp { temp }).await
    }

    pub async fn pulse_temperature(&self, serial: &str, steps: i32) -> Result<(), DeviceError> {
        self.send(serial, DeviceCommand::TempPulse { steps }).await
    }

    pub async fn lock(&self, serial: &str, locked: bool) -> Result<(), DeviceError> {
        let command = if locked {
            DeviceCommand::Lock
        } else {
            DeviceCommand::Unlock
        };

        self.send(serial, command).await
    }

    pub async fn send_event_status(&self, serial: &str, message: &str) -> Result<(), DeviceError> {
        self.send(
            serial,
            DeviceCommand::EventStatus {
                message: message.to_string(),
            },
        )
        .await
    }

    /// Always an absolute setpoint: the persisted target is authoritative
    /// regardless of what the hardware last reported, so no incremental
    /// pulse is derived from ephemeral state here.
    pub async fn start_temperature_sync(
        &self,
        serial: &str,
        target_temp: i32,
    ) -> Result<(), DeviceError> {
        self.set_temperature(serial, target_temp).await
    }

    /// Ingest one telemetry message: update ephemeral state, opportunistically
    /// persist, rebroadcast to observers.
    pub async fn handle_telemetry(&self, serial: &str, telemetry: DeviceTelemetry) {
        let now = OffsetDateTime::now_utc();

        match telemetry {
            DeviceTelemetry::PowerUpdate { power, .. } => {
                let persist = {
                    let mut sessions = self.sessions.write().await;
                    let Some(session) = sessions.get_mut(serial) else {
                        return;
                    };
                    session.power = power;

                    // Skip the persist when an operator command just went
                    // out; the echo must not overwrite it.
                    !session.power_override_at.is_some_and(|at| {
                        (now - at).whole_seconds() < POWER_OVERRIDE_GRACE.as_secs() as i64
                    })
                };

                if persist {
                    if let Err(e) = self.devices.persist_power(serial, power).await {
                        tracing::error!(serial = %serial, "failed to persist power update: {}", e);
                    }
                }

                self.broadcast(ObserverEvent::DeviceStateChanged {
                    serial: serial.to_string(),
                    power: Some(power),
                    temperature: None,
                    locked: None,
                    room_temperature: None,
                    timestamp: now,
                });
            }
            DeviceTelemetry::TempUpdate { temp, .. } => {
                {
                    let mut sessions = self.sessions.write().await;
                    if let Some(session) = sessions.get_mut(serial) {
                        session.temperature = temp;
                    }
                }

                if let Err(e) = self.devices.persist_temperature(serial, temp).await {
                    tracing::error!(serial = %serial, "failed to persist temperature update: {}", e);
                }

                self.broadcast(ObserverEvent::DeviceStateChanged {
                    serial: serial.to_string(),
                    power: None,
                    temperature: Some(temp),
                    locked: None,
                    room_temperature: None,
                    timestamp: now,
                });
            }
            DeviceTelemetry::LockUpdate { locked, .. } => {
                {
                    let mut sessions = self.sessions.write().await;
                    if let Some(session) = sessions.get_mut(serial) {
                        session.locked = locked;
                    }
                }

                if let Err(e) = self.devices.persist_lock(serial, locked).await {
                    tracing::error!(serial = %serial, "failed to persist lock update: {}", e);
                }

                self.broadcast(ObserverEvent::DeviceStateChanged {
                    serial: serial.to_string(),
                    power: None,
                    temperature: None,
                    locked: Some(locked),
                    room_temperature: None,
                    timestamp: now,
                });
            }
            DeviceTelemetry::RoomTempUpdate { room_temp, .. } => {
                if let Err(e) = self.devices.persist_room_temperature(serial, room_temp).await {
                    tracing::error!(serial = %serial, "failed to persist room temperature: {}", e);
                }

                self.broadcast(ObserverEvent::DeviceStateChanged {
                    serial: serial.to_string(),
                    power: None,
                    temperature: None,
                    locked: None,
                    room_temperature: Some(room_temp),
                    timestamp: now,
                });
            }
            DeviceTelemetry::IrViolation { temp, .. } => {
                self.correct_ir_violation(serial, temp).await;
            }
        }
    }

    /// A physical remote changed the setpoint behind our back. Step the
    /// hardware back towards the persisted target.
    async fn correct_ir_violation(&self, serial: &str, reported_temp: i32) {
        {
            let mut sessions = self.sessions.write().await;
            if let Some(session) = sessions.get_mut(serial) {
                session.temperature = reported_temp;
            }
        }

        let persisted = match self.devices.find_by_serial(serial).await {
            Ok(Some(device)) => device.temperature,
            Ok(None) => {
                tracing::warn!(serial = %serial, "IR violation from unknown device");
                return;
            }
            Err(e) => {
                tracing::error!(serial = %serial, "device lookup failed during IR correction: {}", e);
                return;
            }
        };

        let steps = persisted - reported_temp;
        if steps == 0 {
            return;
        }

        tracing::info!(serial = %serial, steps, "correcting IR violation");

        if let Err(e) = self.pulse_temperature(serial, steps).await {
            tracing::warn!(serial = %serial, "IR correction pulse failed: {}", e);
        }
    }
}
