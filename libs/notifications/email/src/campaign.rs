//! Send orchestrator
//!
//! Drives one batch from start to finish:
//!
//! ```text
//! Idle → Connecting → Sending ⇄ {Retrying, Reconnecting} → … → Drained
//! ```
//!
//! Every record ends in exactly one of sent or failed. Only the initial
//! connect, an unreadable source and an invalid template abort the run.

use crate::builder::MessageBuilder;
use crate::error::{BuildError, CampaignError, TransportError};
use crate::models::{BatchResult, OutboundMessage};
use crate::recipients::RecipientSource;
use crate::retry::{RetryPolicy, SendOutcome};
use crate::transport::{Connector, MailSession};
use std::io::Read;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignState {
    Idle,
    Connecting,
    Sending,
    Retrying,
    Reconnecting,
    Drained,
}

pub struct Campaign<C: Connector> {
    connector: C,
    builder: MessageBuilder,
    policy: RetryPolicy,
    dry_run: bool,
    state: CampaignState,
}

impl<C: Connector> Campaign<C> {
    pub fn new(connector: C, builder: MessageBuilder, policy: RetryPolicy) -> Self {
        Self {
            connector,
            builder,
            policy,
            dry_run: false,
            state: CampaignState::Idle,
        }
    }

    /// Build and count every message without opening a connection
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self) -> CampaignState {
        self.state
    }

    fn transition(&mut self, next: CampaignState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Campaign state change");
            self.state = next;
        }
    }

    /// Process every record from `source`
    pub async fn run<R: Read>(
        &mut self,
        source: RecipientSource<R>,
    ) -> Result<BatchResult, CampaignError> {
        self.builder.validate(source.headers())?;

        let mut session = if self.dry_run {
            info!("Dry-run mode: no messages will be sent");
            None
        } else {
            self.transition(CampaignState::Connecting);
            match self.connector.connect().await {
                Ok(session) => Some(session),
                Err(e) => {
                    error!(connector = self.connector.name(), error = %e, "Failed to connect/login to SMTP server");
                    self.transition(CampaignState::Drained);
                    return Err(e.into());
                }
            }
        };

        let mut result = BatchResult::default();

        for item in source {
            self.transition(CampaignState::Sending);

            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable row");
                    result.record_failed();
                    continue;
                }
            };

            let message = match self.builder.build(&record) {
                Ok(message) => message,
                Err(BuildError::MissingEmail) => {
                    warn!(line = ?record.line(), "Row missing 'email' field, skipping");
                    result.record_failed();
                    continue;
                }
                Err(e) => {
                    error!(line = ?record.line(), error = %e, "Failed to build message");
                    result.record_failed();
                    continue;
                }
            };

            if self.dry_run {
                info!(from = %message.sender_display(), to = %message.to, "Dry-run: would send");
                result.record_sent();
                continue;
            }

            if self.deliver(&mut session, &message).await {
                result.record_sent();
            } else {
                result.record_failed();
            }
        }

        self.transition(CampaignState::Drained);
        if let Some(mut session) = session.take() {
            session.close().await;
        }

        info!(
            total = result.total,
            sent = result.sent,
            failed = result.failed,
            "Finished. {}",
            result
        );

        Ok(result)
    }

    /// Send one message, reconnecting at most once if the session drops
    async fn deliver(
        &mut self,
        session: &mut Option<C::Session>,
        message: &OutboundMessage,
    ) -> bool {
        let outcome = match session.as_mut() {
            Some(live) => self.send_with_retries(live, message).await,
            None => SendOutcome::Failed {
                attempts: 0,
                error: TransportError::Disconnected("no open session".to_string()),
            },
        };

        if !outcome.needs_reconnect() {
            return outcome.is_sent();
        }

        warn!(
            to = %message.to,
            attempts = outcome.attempts(),
            "Server disconnected; attempting reconnect and one more send"
        );
        self.transition(CampaignState::Reconnecting);

        if let Some(mut dead) = session.take() {
            dead.close().await;
        }

        match self.connector.connect().await {
            Ok(mut fresh) => {
                self.transition(CampaignState::Sending);
                let outcome = self.send_with_retries(&mut fresh, message).await;
                *session = Some(fresh);
                if let SendOutcome::Failed { error, .. } = &outcome {
                    error!(
                        to = %message.to,
                        attempts = outcome.attempts(),
                        error = %error,
                        "Send failed after reconnect"
                    );
                }
                outcome.is_sent()
            }
            Err(e) => {
                error!(to = %message.to, error = %e, "Reconnect failed");
                false
            }
        }
    }

    /// Run the retry policy for one message on one session
    async fn send_with_retries(
        &mut self,
        session: &mut C::Session,
        message: &OutboundMessage,
    ) -> SendOutcome {
        let mut attempt = 1;

        loop {
            let error = match session.send(message).await {
                Ok(()) => {
                    info!(to = %message.to, attempt, "Sent");
                    self.transition(CampaignState::Sending);
                    return SendOutcome::Sent { attempts: attempt };
                }
                Err(error) => error,
            };

            if !self.policy.should_retry(attempt, &error) {
                if error.is_session_dead() {
                    warn!(to = %message.to, attempt, error = %error, "Session lost during send");
                } else if error.is_transient() {
                    error!(to = %message.to, attempts = attempt, error = %error, "All retries failed");
                } else {
                    error!(to = %message.to, attempt, error = %error, "Send failed, not retrying");
                }
                self.transition(CampaignState::Sending);
                return SendOutcome::Failed {
                    attempts: attempt,
                    error,
                };
            }

            let wait = self.policy.delay_for(attempt);
            warn!(
                to = %message.to,
                attempt,
                error = %error,
                wait_secs = wait.as_secs(),
                "Send attempt failed, retrying"
            );
            self.transition(CampaignState::Retrying);
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Template;
    use crate::transport::MockConnector;

    fn campaign(connector: MockConnector) -> Campaign<MockConnector> {
        let builder = MessageBuilder::new("Hi", Template::builtin(), "ops@example.com", None);
        Campaign::new(connector, builder, RetryPolicy::default())
    }

    fn source(csv: &str) -> RecipientSource<&[u8]> {
        RecipientSource::from_reader(csv.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_state_ends_drained() {
        let mut campaign = campaign(MockConnector::new());
        assert_eq!(campaign.state(), CampaignState::Idle);

        campaign.run(source("email\na@example.com\n")).await.unwrap();
        assert_eq!(campaign.state(), CampaignState::Drained);
    }

    #[tokio::test]
    async fn test_session_closed_at_end() {
        let connector = MockConnector::new();
        let mut campaign = campaign(connector.clone());

        campaign.run(source("email\na@example.com\n")).await.unwrap();
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(connector.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_session_goes_straight_to_reconnect() {
        let connector = MockConnector::new();
        let mut campaign = campaign(connector.clone());
        let mut session = None;
        let message = OutboundMessage {
            from_address: "ops@example.com".into(),
            from_name: None,
            to: "a@example.com".into(),
            subject: "Hi".into(),
            body: "Hello".into(),
            attachment: None,
        };

        assert!(campaign.deliver(&mut session, &message).await);
        assert!(session.is_some());
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(connector.attempt_count(), 1);
    }
}
