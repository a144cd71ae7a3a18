//! Scripted connector for testing and dry runs

use super::{Connector, MailSession};
use crate::error::{ConnectError, TransportError};
use crate::models::OutboundMessage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

#[derive(Default)]
struct MockState {
    connect_script: VecDeque<Result<(), ConnectError>>,
    send_script: VecDeque<Result<(), TransportError>>,
    sent: Vec<OutboundMessage>,
    attempts: Vec<Instant>,
    connects: usize,
    closes: usize,
}

/// Mock connector that hands out sessions sharing one script
///
/// Connects and sends succeed unless an outcome has been queued. Queued
/// outcomes are consumed in order across all sessions.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the outcome of the next connect
    pub fn then_connect(self, outcome: Result<(), ConnectError>) -> Self {
        self.state().connect_script.push_back(outcome);
        self
    }

    /// Queue the outcome of the next send attempt
    pub fn then_send(self, outcome: Result<(), TransportError>) -> Self {
        self.state().send_script.push_back(outcome);
        self
    }

    /// Queue `count` identical failed send attempts
    pub fn then_fail_sends(self, count: usize, error: TransportError) -> Self {
        {
            let mut state = self.state();
            for _ in 0..count {
                state.send_script.push_back(Err(error.clone()));
            }
        }
        self
    }

    /// Messages accepted so far
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.state().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state().sent.len()
    }

    /// Check if a message was accepted for a specific address
    pub fn was_sent_to(&self, email: &str) -> bool {
        self.state().sent.iter().any(|m| m.to == email)
    }

    /// Number of send attempts, successful or not
    pub fn attempt_count(&self) -> usize {
        self.state().attempts.len()
    }

    /// When each send attempt happened
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.state().attempts.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    pub fn close_count(&self) -> usize {
        self.state().closes
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(&self) -> Result<MockSession, ConnectError> {
        let mut state = self.state();
        state.connects += 1;
        state.connect_script.pop_front().unwrap_or(Ok(()))?;

        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Session handed out by [`MockConnector`]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl MailSession for MockSession {
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.attempts.push(Instant::now());
        state.send_script.pop_front().unwrap_or(Ok(()))?;
        state.sent.push(message.clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closes += 1;
    }
}
