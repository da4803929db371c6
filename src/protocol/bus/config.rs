//! Bus configuration and its fluent builder.
use embassy_time::Duration;

use crate::core::{DEFAULT_IDLE_WINDOW, DEFAULT_RESYNC_WINDOW};
use crate::error::ConfigError;
use crate::protocol::arbitration::NodeIdentity;

//==================================================================================BUS_CONFIG
/// Validated settings for one bus node.
///
/// Only [`BusConfig::default`] and [`BusConfigBuilder::build`] produce one,
/// so every instance satisfies the builder's checks:
///
/// ```compile_fail
/// use furcoms::protocol::bus::config::BusConfig;
///
/// let config = BusConfig {
///     loopback: true,
///     await_own_terminator: false,
///     ..BusConfig::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub(crate) identity: NodeIdentity,
    pub(crate) resync_window: Duration,
    pub(crate) idle_window: Duration,
    pub(crate) await_own_terminator: bool,
    pub(crate) loopback: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            identity: NodeIdentity::default(),
            resync_window: DEFAULT_RESYNC_WINDOW,
            idle_window: DEFAULT_IDLE_WINDOW,
            await_own_terminator: true,
            loopback: false,
        }
    }
}

impl BusConfig {
    /// Builder entry point, starting from the defaults.
    pub fn builder() -> BusConfigBuilder {
        BusConfigBuilder::new()
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Silence after which an END realigns the handler.
    pub fn resync_window(&self) -> Duration {
        self.resync_window
    }

    /// Silence after which the bus is reported idle.
    pub fn idle_window(&self) -> Duration {
        self.idle_window
    }

    /// After the last byte of a frame, wait for its echoed terminator
    /// (`SendingComplete`) instead of dropping straight to `Idle`.
    pub fn await_own_terminator(&self) -> bool {
        self.await_own_terminator
    }

    /// Deliver this node's own frames to its consumer.
    pub fn loopback(&self) -> bool {
        self.loopback
    }
}

//==================================================================================BUS_CONFIG_BUILDER
#[derive(Debug)]
/// Fluent builder; nothing is checked until [`build`](Self::build).
pub struct BusConfigBuilder {
    pub chip_id: u16,
    pub priority: i8,
    pub resync_window: Duration,
    pub idle_window: Duration,
    pub await_own_terminator: bool,
    pub loopback: bool,
}

impl Default for BusConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConfigBuilder {
    pub fn new() -> Self {
        let defaults = BusConfig::default();
        Self {
            chip_id: defaults.identity.chip_id(),
            priority: defaults.identity.priority(),
            resync_window: defaults.resync_window,
            idle_window: defaults.idle_window,
            await_own_terminator: defaults.await_own_terminator,
            loopback: defaults.loopback,
        }
    }

    /// 14-bit node identifier, used to break priority ties.
    pub fn chip_id(mut self, chip_id: u16) -> Self {
        self.chip_id = chip_id;
        self
    }

    /// Lower values win arbitration; clamped to [-60, 60] on the wire.
    pub fn priority(mut self, priority: i8) -> Self {
        self.priority = priority;
        self
    }

    pub fn resync_window(mut self, window: Duration) -> Self {
        self.resync_window = window;
        self
    }

    pub fn idle_window(mut self, window: Duration) -> Self {
        self.idle_window = window;
        self
    }

    pub fn await_own_terminator(mut self, wait: bool) -> Self {
        self.await_own_terminator = wait;
        self
    }

    pub fn loopback(mut self, enabled: bool) -> Self {
        self.loopback = enabled;
        self
    }

    /// Validate and produce the configuration:
    /// - chip id must fit in 14 bits
    /// - resync window strictly shorter than the idle window
    /// - loopback needs `await_own_terminator`, since the own frame is only
    ///   complete once its terminator echo comes back
    pub fn build(self) -> Result<BusConfig, ConfigError> {
        let identity = NodeIdentity::new(self.chip_id, self.priority)?;
        if self.resync_window >= self.idle_window {
            return Err(ConfigError::InvalidWindows);
        }
        if self.loopback && !self.await_own_terminator {
            return Err(ConfigError::LoopbackRequiresTerminatorWait);
        }
        Ok(BusConfig {
            identity,
            resync_window: self.resync_window,
            idle_window: self.idle_window,
            await_own_terminator: self.await_own_terminator,
            loopback: self.loopback,
        })
    }
}
