use std::time::Duration;

use crate::config::SocketConfig;

/// Bounded reconnection with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &SocketConfig) -> Self {
        Self {
            max_attempts: config.reconnect_attempts,
            delay: Duration::from_millis(config.reconnect_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting { attempt: u32 },
    Connected,
    Waiting { attempt: u32, delay: Duration },
    GaveUp,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Retry { attempt: u32, delay: Duration },
    GiveUp,
}

/// Connection lifecycle state machine.
///
/// `attempt` counts consecutive reconnection attempts; the first connection
/// is attempt 0 and a successful connection resets the count.
#[derive(Debug, Clone)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempt: u32,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, state: ConnectionState::Idle, attempt: 0 }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connecting(&mut self) {
        self.state = ConnectionState::Connecting { attempt: self.attempt };
    }

    pub fn connected(&mut self) {
        self.attempt = 0;
        self.state = ConnectionState::Connected;
    }

    /// Called after a failed connect or a dropped connection.
    pub fn next_step(&mut self) -> NextStep {
        if self.attempt >= self.policy.max_attempts {
            self.state = ConnectionState::GaveUp;
            return NextStep::GiveUp;
        }

        self.attempt += 1;
        self.state = ConnectionState::Waiting { attempt: self.attempt, delay: self.policy.delay };
        NextStep::Retry { attempt: self.attempt, delay: self.policy.delay }
    }

    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }
}
