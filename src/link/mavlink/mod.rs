//! MAVLink v2 link to a PX4 autopilot over UDP.
//!
//! A background task receives datagrams, discovers the autopilot from its
//! HEARTBEAT and folds telemetry into a shared cache. Commands go out as
//! COMMAND_LONG / COMMAND_INT and are matched against COMMAND_ACK, with
//! retransmission on timeout. A second task sends a 1 Hz GCS heartbeat.

mod commands;
mod telemetry;

use std::io::Cursor;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mavlink::common::{MavCmd, MavMessage, MavResult, COMMAND_ACK_DATA};
use mavlink::peek_reader::PeekReader;
use mavlink::MavHeader;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, watch, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use offboard_pilot_core::{GeoFix, VelocityBodyYawspeed};

use crate::config::ControllerConfig;
use crate::error::LinkError;
use crate::link::{Capability, CapabilitySupport, VehicleLink};
use crate::types::{Attitude, Battery, FlightMode, GpsInfo, Health, Position};

pub use commands::Target;
use commands::{
    action_result, arm_params, command_long, gimbal_angle_params, gimbal_rate_params,
    hold_mode_params, land_params, offboard_mode_params, reposition, request_message_params,
    takeoff_params, velocity_body, GIMBAL_MANAGER_INFORMATION_ID,
};
use telemetry::{build_gcs_heartbeat, is_autopilot, TelemetryCache};

const DEFAULT_TAKEOFF_ALT_M: f64 = 2.5;
const RECV_BUF_LEN: usize = 2048;

/// Where the link socket binds or sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAddress {
    /// Bind locally and reply to whoever sends the first autopilot heartbeat.
    UdpIn(SocketAddr),
    /// Bind an ephemeral port and send to a fixed remote.
    UdpOut(SocketAddr),
}

impl FromStr for LinkAddress {
    type Err = LinkError;

    /// Accepts `udpin:HOST:PORT`, `udpout:HOST:PORT` and `udp://[HOST]:PORT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LinkError::ConnectionFailed(format!("invalid link address: {s}"));
        if let Some(rest) = s.strip_prefix("udpin:") {
            return rest.parse().map(LinkAddress::UdpIn).map_err(|_| invalid());
        }
        if let Some(rest) = s.strip_prefix("udpout:") {
            return rest.parse().map(LinkAddress::UdpOut).map_err(|_| invalid());
        }
        if let Some(rest) = s.strip_prefix("udp://") {
            let rest = if rest.starts_with(':') {
                format!("0.0.0.0{rest}")
            } else {
                rest.to_string()
            };
            return rest.parse().map(LinkAddress::UdpIn).map_err(|_| invalid());
        }
        Err(invalid())
    }
}

/// Link tuning derived from the controller configuration.
#[derive(Debug, Clone)]
pub struct MavlinkSettings {
    pub system_id: u8,
    pub component_id: u8,
    pub command_timeout: Duration,
    pub command_retries: u8,
    pub telemetry_timeout: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for MavlinkSettings {
    fn default() -> Self {
        Self {
            system_id: 245,
            component_id: 190, // MAV_COMP_ID_MISSIONPLANNER
            command_timeout: Duration::from_secs(1),
            command_retries: 3,
            telemetry_timeout: Duration::from_secs(3),
            heartbeat_interval: Duration::from_secs(1),
        }
    }
}

impl From<&ControllerConfig> for MavlinkSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            command_timeout: config.command_timeout(),
            command_retries: config.command_retries,
            telemetry_timeout: config.telemetry_timeout(),
            ..Default::default()
        }
    }
}

/// Open socket plus everything the receive task updates.
struct Connection {
    socket: UdpSocket,
    fixed_peer: Option<SocketAddr>,
    peer: Mutex<Option<SocketAddr>>,
    target: Mutex<Option<Target>>,
    system_id: u8,
    component_id: u8,
    sequence: AtomicU8,
    telemetry: Mutex<TelemetryCache>,
    updates: watch::Sender<u64>,
    acks: broadcast::Sender<COMMAND_ACK_DATA>,
    boot: Instant,
}

impl Connection {
    async fn open(address: LinkAddress, settings: &MavlinkSettings) -> Result<Self, LinkError> {
        let (bind, fixed_peer) = match address {
            LinkAddress::UdpIn(addr) => (addr, None),
            LinkAddress::UdpOut(addr) => (SocketAddr::from(([0, 0, 0, 0], 0)), Some(addr)),
        };
        let socket = UdpSocket::bind(bind).await?;
        let (updates, _) = watch::channel(0);
        let (acks, _) = broadcast::channel(16);
        Ok(Self {
            socket,
            fixed_peer,
            peer: Mutex::new(fixed_peer),
            target: Mutex::new(None),
            system_id: settings.system_id,
            component_id: settings.component_id,
            sequence: AtomicU8::new(0),
            telemetry: Mutex::new(TelemetryCache::default()),
            updates,
            acks,
            boot: Instant::now(),
        })
    }

    fn target(&self) -> Result<Target, LinkError> {
        self.target
            .lock()
            .ok()
            .and_then(|t| *t)
            .ok_or(LinkError::NotConnected)
    }

    fn time_boot_ms(&self) -> u32 {
        self.boot.elapsed().as_millis() as u32
    }

    fn read<T>(&self, read: impl Fn(&TelemetryCache) -> Option<T>) -> Result<Option<T>, LinkError> {
        let cache = self
            .telemetry
            .lock()
            .map_err(|_| LinkError::ProtocolError("telemetry cache poisoned".to_string()))?;
        Ok(read(&cache))
    }

    /// Send a MAVLink v2 message to the autopilot.
    async fn send(&self, msg: &MavMessage) -> Result<(), LinkError> {
        let peer = self
            .peer
            .lock()
            .ok()
            .and_then(|p| *p)
            .ok_or(LinkError::NotConnected)?;

        let header = MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        let mut buf = Cursor::new(Vec::with_capacity(280));
        mavlink::write_v2_msg(&mut buf, header, msg)
            .map_err(|e| LinkError::ProtocolError(format!("{e:?}")))?;

        self.socket.send_to(&buf.into_inner(), peer).await?;
        Ok(())
    }

    fn handle_datagram(&self, data: &[u8], from: SocketAddr) {
        let mut reader = PeekReader::new(Cursor::new(data));
        while let Ok((header, msg)) = mavlink::read_v2_msg::<MavMessage, _>(&mut reader) {
            self.handle_message(header, msg, from);
        }
    }

    fn handle_message(&self, header: MavHeader, msg: MavMessage, from: SocketAddr) {
        if header.system_id == self.system_id {
            return;
        }
        if let MavMessage::HEARTBEAT(hb) = &msg {
            if is_autopilot(hb) {
                self.discover(header, from);
            }
        }
        let is_target = self
            .target
            .lock()
            .ok()
            .and_then(|t| *t)
            .is_some_and(|t| t.system_id == header.system_id);
        if !is_target {
            return;
        }

        match msg {
            MavMessage::COMMAND_ACK(ack) => {
                debug!("COMMAND_ACK {:?} {:?}", ack.command, ack.result);
                let _ = self.acks.send(ack);
            }
            msg => {
                if let Ok(mut cache) = self.telemetry.lock() {
                    cache.apply(&msg);
                }
                self.updates.send_modify(|n| *n = n.wrapping_add(1));
            }
        }
    }

    fn discover(&self, header: MavHeader, from: SocketAddr) {
        let Ok(mut target) = self.target.lock() else {
            return;
        };
        if target.is_some() {
            return;
        }
        *target = Some(Target {
            system_id: header.system_id,
            component_id: header.component_id,
        });
        if self.fixed_peer.is_none() {
            if let Ok(mut peer) = self.peer.lock() {
                *peer = Some(from);
            }
        }
        info!(
            "Autopilot discovered: system {} component {} at {}",
            header.system_id, header.component_id, from
        );
    }
}

async fn receive_loop(conn: std::sync::Arc<Connection>) {
    let mut buf = vec![0u8; RECV_BUF_LEN];
    loop {
        match conn.socket.recv_from(&mut buf).await {
            Ok((len, from)) => conn.handle_datagram(&buf[..len], from),
            Err(e) => {
                warn!("UDP receive failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn heartbeat_loop(conn: std::sync::Arc<Connection>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match conn.send(&build_gcs_heartbeat()).await {
            Ok(()) | Err(LinkError::NotConnected) => {}
            Err(e) => debug!("Heartbeat send failed: {}", e),
        }
    }
}

/// [`VehicleLink`] over MAVLink v2 / UDP.
pub struct MavlinkLink {
    address: LinkAddress,
    settings: MavlinkSettings,
    conn: OnceCell<std::sync::Arc<Connection>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    takeoff_alt_m: Mutex<f64>,
}

impl MavlinkLink {
    pub fn new(address: LinkAddress, settings: MavlinkSettings) -> Self {
        Self {
            address,
            settings,
            conn: OnceCell::new(),
            tasks: Mutex::new(Vec::new()),
            takeoff_alt_m: Mutex::new(DEFAULT_TAKEOFF_ALT_M),
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self, LinkError> {
        Ok(Self::new(
            config.address.parse()?,
            MavlinkSettings::from(config),
        ))
    }

    /// Local socket address once connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.conn.get().and_then(|c| c.socket.local_addr().ok())
    }

    fn conn(&self) -> Result<&Connection, LinkError> {
        self.conn
            .get()
            .map(|c| c.as_ref())
            .ok_or(LinkError::NotConnected)
    }

    /// Wait for a cached telemetry value.
    async fn telemetry<T>(
        &self,
        what: &'static str,
        read: impl Fn(&TelemetryCache) -> Option<T> + Send,
    ) -> Result<T, LinkError> {
        let conn = self.conn()?;
        let mut updates = conn.updates.subscribe();
        let deadline = Instant::now() + self.settings.telemetry_timeout;
        loop {
            if let Some(value) = conn.read(&read)? {
                return Ok(value);
            }
            match tokio::time::timeout_at(deadline, updates.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => return Err(LinkError::NotConnected),
                Err(_) => return Err(LinkError::Timeout(what)),
            }
        }
    }

    /// Send a COMMAND_LONG and wait for its acknowledgement.
    async fn command(
        &self,
        action: &'static str,
        command: MavCmd,
        params: [f32; 7],
    ) -> Result<(), LinkError> {
        let conn = self.conn()?;
        let target = conn.target()?;
        self.acknowledged(action, command, |attempt| {
            command_long(target, command, params, attempt)
        })
        .await
    }

    async fn acknowledged(
        &self,
        action: &'static str,
        command: MavCmd,
        build: impl Fn(u8) -> MavMessage + Send,
    ) -> Result<(), LinkError> {
        let conn = self.conn()?;
        let mut acks = conn.acks.subscribe();
        for attempt in 0..=self.settings.command_retries {
            conn.send(&build(attempt)).await?;
            let deadline = Instant::now() + self.settings.command_timeout;
            loop {
                let ack = match tokio::time::timeout_at(deadline, acks.recv()).await {
                    Err(_) => break,
                    Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                    Ok(Err(broadcast::error::RecvError::Closed)) => {
                        return Err(LinkError::NotConnected)
                    }
                    Ok(Ok(ack)) => ack,
                };
                if ack.command != command {
                    continue;
                }
                match ack.result {
                    MavResult::MAV_RESULT_ACCEPTED => return Ok(()),
                    MavResult::MAV_RESULT_IN_PROGRESS => continue,
                    result => {
                        return Err(LinkError::Rejected {
                            action,
                            result: action_result(result),
                        })
                    }
                }
            }
            debug!("{} not acknowledged (attempt {})", action, attempt + 1);
        }
        Err(LinkError::Timeout("COMMAND_ACK"))
    }
}

impl Drop for MavlinkLink {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

#[async_trait]
impl VehicleLink for MavlinkLink {
    fn link_type(&self) -> &'static str {
        "mavlink"
    }

    async fn connect(&self) -> Result<(), LinkError> {
        self.conn
            .get_or_try_init(|| async {
                let conn = std::sync::Arc::new(Connection::open(self.address, &self.settings).await?);
                info!("MAVLink listening on {}", conn.socket.local_addr()?);
                let receiver = tokio::spawn(receive_loop(conn.clone()));
                let heartbeat =
                    tokio::spawn(heartbeat_loop(conn.clone(), self.settings.heartbeat_interval));
                if let Ok(mut tasks) = self.tasks.lock() {
                    tasks.push(receiver);
                    tasks.push(heartbeat);
                }
                Ok::<_, LinkError>(conn)
            })
            .await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn().and_then(|c| c.target()).is_ok()
    }

    async fn health(&self) -> Result<Health, LinkError> {
        self.telemetry("SYS_STATUS", |c| c.health).await
    }

    async fn position(&self) -> Result<Position, LinkError> {
        self.telemetry("GLOBAL_POSITION_INT", |c| c.position).await
    }

    async fn attitude(&self) -> Result<Attitude, LinkError> {
        self.telemetry("ATTITUDE", |c| c.attitude).await
    }

    async fn armed(&self) -> Result<bool, LinkError> {
        self.telemetry("HEARTBEAT", |c| c.armed).await
    }

    async fn in_air(&self) -> Result<bool, LinkError> {
        self.telemetry("EXTENDED_SYS_STATE", |c| c.in_air()).await
    }

    async fn battery(&self) -> Result<Battery, LinkError> {
        self.telemetry("SYS_STATUS", |c| c.battery).await
    }

    async fn gps_info(&self) -> Result<GpsInfo, LinkError> {
        self.telemetry("GPS_RAW_INT", |c| c.gps).await
    }

    async fn flight_mode(&self) -> Result<FlightMode, LinkError> {
        self.telemetry("HEARTBEAT", |c| c.flight_mode()).await
    }

    async fn arm(&self) -> Result<(), LinkError> {
        self.command("arm", MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, arm_params(true))
            .await
    }

    async fn disarm(&self) -> Result<(), LinkError> {
        self.command("disarm", MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, arm_params(false))
            .await
    }

    async fn set_takeoff_altitude(&self, altitude_m: f64) -> Result<(), LinkError> {
        let mut alt = self
            .takeoff_alt_m
            .lock()
            .map_err(|_| LinkError::ProtocolError("takeoff altitude poisoned".to_string()))?;
        *alt = altitude_m;
        Ok(())
    }

    async fn takeoff(&self) -> Result<(), LinkError> {
        let relative = self.takeoff_alt_m.lock().map(|a| *a).unwrap_or(DEFAULT_TAKEOFF_ALT_M);
        let position = self.position().await?;
        let home_abs = position.abs_alt_m - position.rel_alt_m;
        self.command(
            "takeoff",
            MavCmd::MAV_CMD_NAV_TAKEOFF,
            takeoff_params(home_abs + relative),
        )
        .await
    }

    async fn land(&self) -> Result<(), LinkError> {
        self.command("land", MavCmd::MAV_CMD_NAV_LAND, land_params())
            .await
    }

    async fn return_to_launch(&self) -> Result<(), LinkError> {
        self.command("rtl", MavCmd::MAV_CMD_NAV_RETURN_TO_LAUNCH, [0.0; 7])
            .await
    }

    async fn goto_location(&self, target: GeoFix, yaw_deg: f64) -> Result<(), LinkError> {
        let addressed = self.conn()?.target()?;
        self.acknowledged("goto", MavCmd::MAV_CMD_DO_REPOSITION, |_| {
            reposition(addressed, &target, yaw_deg)
        })
        .await
    }

    async fn start_offboard(&self) -> Result<(), LinkError> {
        self.command(
            "start_offboard",
            MavCmd::MAV_CMD_DO_SET_MODE,
            offboard_mode_params(),
        )
        .await
    }

    async fn stop_offboard(&self) -> Result<(), LinkError> {
        self.command(
            "stop_offboard",
            MavCmd::MAV_CMD_DO_SET_MODE,
            hold_mode_params(),
        )
        .await
    }

    async fn set_velocity_body(&self, setpoint: VelocityBodyYawspeed) -> Result<(), LinkError> {
        let conn = self.conn()?;
        let msg = velocity_body(conn.target()?, &setpoint, conn.time_boot_ms());
        conn.send(&msg).await
    }

    async fn probe(&self, capability: Capability) -> CapabilitySupport {
        let conn = match self.conn() {
            Ok(conn) => conn,
            Err(e) => return CapabilitySupport::Error(e.to_string()),
        };
        if let Ok(Some(true)) = conn.read(|c| c.gimbal_manager.then_some(true)) {
            return CapabilitySupport::Supported;
        }

        debug!("Probing {}", capability.name());
        match self
            .command(
                "request_gimbal_information",
                MavCmd::MAV_CMD_REQUEST_MESSAGE,
                request_message_params(GIMBAL_MANAGER_INFORMATION_ID),
            )
            .await
        {
            Ok(()) => {}
            Err(LinkError::Rejected { .. }) => return CapabilitySupport::Unsupported,
            Err(e) => return CapabilitySupport::Error(e.to_string()),
        }

        match self
            .telemetry("GIMBAL_MANAGER_INFORMATION", |c| {
                c.gimbal_manager.then_some(())
            })
            .await
        {
            Ok(()) => CapabilitySupport::Supported,
            Err(LinkError::Timeout(_)) => CapabilitySupport::Unsupported,
            Err(e) => CapabilitySupport::Error(e.to_string()),
        }
    }

    async fn set_gimbal_angle(&self, pitch_deg: f64, yaw_deg: f64) -> Result<(), LinkError> {
        self.command(
            "gimbal_angle",
            MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW,
            gimbal_angle_params(pitch_deg, yaw_deg),
        )
        .await
    }

    async fn set_gimbal_rate(
        &self,
        pitch_rate_deg_s: f64,
        yaw_rate_deg_s: f64,
    ) -> Result<(), LinkError> {
        self.command(
            "gimbal_rate",
            MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW,
            gimbal_rate_params(pitch_rate_deg_s, yaw_rate_deg_s),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::common::*;

    #[test]
    fn test_parse_addresses() {
        assert_eq!(
            "udpin:0.0.0.0:14540".parse::<LinkAddress>().unwrap(),
            LinkAddress::UdpIn("0.0.0.0:14540".parse().unwrap())
        );
        assert_eq!(
            "udp://:14540".parse::<LinkAddress>().unwrap(),
            LinkAddress::UdpIn("0.0.0.0:14540".parse().unwrap())
        );
        assert_eq!(
            "udpout:127.0.0.1:14580".parse::<LinkAddress>().unwrap(),
            LinkAddress::UdpOut("127.0.0.1:14580".parse().unwrap())
        );
        assert!("tcp:127.0.0.1:5760".parse::<LinkAddress>().is_err());
        assert!("udpin:nonsense".parse::<LinkAddress>().is_err());
    }

    #[tokio::test]
    async fn test_not_connected_errors() {
        let link = MavlinkLink::new(
            "udpin:127.0.0.1:0".parse().unwrap(),
            MavlinkSettings::default(),
        );
        assert!(!link.is_connected());
        assert!(matches!(link.position().await, Err(LinkError::NotConnected)));
        assert!(matches!(link.arm().await, Err(LinkError::NotConnected)));
    }

    fn encode(sequence: u8, msg: &MavMessage) -> Vec<u8> {
        let header = MavHeader {
            system_id: 1,
            component_id: 1,
            sequence,
        };
        let mut buf = Cursor::new(Vec::with_capacity(280));
        mavlink::write_v2_msg(&mut buf, header, msg).unwrap();
        buf.into_inner()
    }

    fn decode(data: &[u8]) -> MavMessage {
        let mut reader = PeekReader::new(Cursor::new(data));
        mavlink::read_v2_msg::<MavMessage, _>(&mut reader).unwrap().1
    }

    fn autopilot_heartbeat() -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype: MavType::MAV_TYPE_QUADROTOR,
            autopilot: MavAutopilot::MAV_AUTOPILOT_PX4,
            base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
            system_status: MavState::MAV_STATE_STANDBY,
            mavlink_version: 3,
        })
    }

    async fn connected_pair() -> (MavlinkLink, tokio::net::UdpSocket) {
        let settings = MavlinkSettings {
            command_timeout: Duration::from_millis(200),
            command_retries: 1,
            telemetry_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let link = MavlinkLink::new("udpin:127.0.0.1:0".parse().unwrap(), settings);
        link.connect().await.unwrap();
        let link_addr = link.local_addr().unwrap();

        let autopilot = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        autopilot
            .send_to(&encode(0, &autopilot_heartbeat()), link_addr)
            .await
            .unwrap();

        for _ in 0..100 {
            if link.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(link.is_connected());
        (link, autopilot)
    }

    #[tokio::test]
    async fn test_discovery_and_telemetry() {
        let (link, autopilot) = connected_pair().await;
        let link_addr = link.local_addr().unwrap();

        let pos = MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
            time_boot_ms: 0,
            lat: 473_977_420,
            lon: 85_455_940,
            alt: 491_000,
            relative_alt: 3_000,
            vx: 0,
            vy: 0,
            vz: 0,
            hdg: 0,
        });
        autopilot.send_to(&encode(1, &pos), link_addr).await.unwrap();

        let position = link.position().await.unwrap();
        assert!((position.rel_alt_m - 3.0).abs() < 1e-9);
        assert_eq!(link.armed().await.unwrap(), false);
    }

    #[tokio::test]
    async fn test_command_acknowledged() {
        let (link, autopilot) = connected_pair().await;

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                let (len, from) = autopilot.recv_from(&mut buf).await.unwrap();
                if let MavMessage::COMMAND_LONG(cmd) = decode(&buf[..len]) {
                    let ack = MavMessage::COMMAND_ACK(COMMAND_ACK_DATA {
                        command: cmd.command,
                        result: MavResult::MAV_RESULT_DENIED,
                        progress: 0,
                        result_param2: 0,
                        target_system: 0,
                        target_component: 0,
                    });
                    autopilot.send_to(&encode(2, &ack), from).await.unwrap();
                    return cmd;
                }
            }
        });

        let err = link.arm().await.unwrap_err();
        assert!(matches!(
            err,
            LinkError::Rejected {
                action: "arm",
                result: offboard_pilot_core::ActionResult::CommandDenied,
            }
        ));
        let sent = responder.await.unwrap();
        assert_eq!(sent.command, MavCmd::MAV_CMD_COMPONENT_ARM_DISARM);
        assert_eq!(sent.param1, 1.0);
    }

    #[tokio::test]
    async fn test_command_timeout_without_ack() {
        let (link, _autopilot) = connected_pair().await;
        let err = link.land().await.unwrap_err();
        assert!(matches!(err, LinkError::Timeout("COMMAND_ACK")));
    }
}
