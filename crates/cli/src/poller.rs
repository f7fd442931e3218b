//! Waits for asynchronous broker operations to reach a terminal state

use async_trait::async_trait;
use eden_broker::{Broker, LastOperationQuery};
use eden_common::{Error, LastOperation, OperationState, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Delay between status queries unless configured otherwise
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Answers last-operation queries
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn last_operation(&self, query: &LastOperationQuery) -> Result<LastOperation>;
}

#[async_trait]
impl<B: Broker + ?Sized> StatusSource for B {
    async fn last_operation(&self, query: &LastOperationQuery) -> Result<LastOperation> {
        Broker::last_operation(self, query).await
    }
}

/// Polling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,

    /// Upper bound on status queries; `None` polls until a terminal state
    pub max_polls: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
        }
    }
}

/// How a polled operation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub state: OperationState,
    pub description: String,

    /// Number of status queries issued
    pub polls: u32,

    /// The final status could not be decoded and was assumed to be success
    pub decode_ambiguous: bool,
}

/// Polls a status source until the operation leaves `in progress`
pub struct OperationPoller<'a, S: StatusSource + ?Sized> {
    source: &'a S,
    settings: PollSettings,
}

impl<'a, S: StatusSource + ?Sized> OperationPoller<'a, S> {
    pub fn new(source: &'a S, settings: PollSettings) -> Self {
        Self { source, settings }
    }

    /// Sleep, query, report; repeat until a terminal state.
    ///
    /// Every decoded status is handed to `on_status` before the loop decides
    /// whether to continue. A response that cannot be decoded ends polling as
    /// `Succeeded` with `decode_ambiguous` set. Transport and HTTP failures
    /// are returned as errors.
    pub async fn wait<F>(&self, query: &LastOperationQuery, mut on_status: F) -> Result<PollOutcome>
    where
        F: FnMut(&LastOperation),
    {
        let mut polls = 0u32;

        loop {
            sleep(self.settings.interval).await;
            polls += 1;

            let status = match self.source.last_operation(query).await {
                Ok(status) => status,
                Err(Error::PollDecodeAmbiguous(reason)) => {
                    warn!(
                        "Could not decode status of instance {}, assuming success: {}",
                        query.instance.instance_id, reason
                    );
                    let status = LastOperation::new(
                        OperationState::Succeeded,
                        "status response could not be decoded",
                    );
                    on_status(&status);
                    return Ok(PollOutcome {
                        state: status.state,
                        description: status.description,
                        polls,
                        decode_ambiguous: true,
                    });
                }
                Err(e) => return Err(e),
            };

            debug!(
                "Poll {} of instance {}: {} - {}",
                polls, query.instance.instance_id, status.state, status.description
            );
            on_status(&status);

            if status.state.is_terminal() {
                info!(
                    "Operation on instance {} finished: {}",
                    query.instance.instance_id, status.state
                );
                return Ok(PollOutcome {
                    state: status.state,
                    description: status.description,
                    polls,
                    decode_ambiguous: false,
                });
            }

            if let Some(max) = self.settings.max_polls {
                if polls >= max {
                    return Err(Error::PollLimitReached(polls));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eden_broker::InstanceRef;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Reply {
        Status(OperationState, &'static str),
        Garbled,
        Unreachable,
    }

    /// Answers status queries from a fixed script
    struct Scripted {
        replies: Mutex<VecDeque<Reply>>,
        seen: Mutex<Vec<LastOperationQuery>>,
    }

    impl Scripted {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StatusSource for Scripted {
        async fn last_operation(&self, query: &LastOperationQuery) -> Result<LastOperation> {
            self.seen.lock().unwrap().push(query.clone());
            match self.replies.lock().unwrap().pop_front() {
                Some(Reply::Status(state, description)) => Ok(LastOperation::new(state, description)),
                Some(Reply::Garbled) => Err(Error::PollDecodeAmbiguous("expected value".to_string())),
                Some(Reply::Unreachable) | None => {
                    Err(Error::RemoteOperationFailed("connection refused".to_string()))
                }
            }
        }
    }

    fn query() -> LastOperationQuery {
        LastOperationQuery {
            instance: InstanceRef::new("svc", "plan", "inst-1"),
            operation_token: Some("op-1".to_string()),
        }
    }

    fn fast() -> PollSettings {
        PollSettings {
            interval: Duration::ZERO,
            max_polls: None,
        }
    }

    #[tokio::test]
    async fn test_polls_until_succeeded() {
        let source = Scripted::new(vec![
            Reply::Status(OperationState::InProgress, "creating"),
            Reply::Status(OperationState::InProgress, "still creating"),
            Reply::Status(OperationState::Succeeded, "created"),
        ]);
        let mut reported = Vec::new();

        let outcome = OperationPoller::new(&source, fast())
            .wait(&query(), |status| reported.push(status.description.clone()))
            .await
            .unwrap();

        assert_eq!(source.calls(), 3);
        assert_eq!(outcome.polls, 3);
        assert_eq!(outcome.state, OperationState::Succeeded);
        assert_eq!(outcome.description, "created");
        assert!(!outcome.decode_ambiguous);
        assert_eq!(reported, vec!["creating", "still creating", "created"]);
    }

    #[tokio::test]
    async fn test_query_carries_operation_token() {
        let source = Scripted::new(vec![Reply::Status(OperationState::Succeeded, "")]);

        OperationPoller::new(&source, fast())
            .wait(&query(), |_| {})
            .await
            .unwrap();

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen[0].operation_token.as_deref(), Some("op-1"));
        assert_eq!(seen[0].instance.instance_id, "inst-1");
    }

    #[tokio::test]
    async fn test_decode_failure_is_optimistic_success() {
        let source = Scripted::new(vec![Reply::Garbled]);
        let mut reported = Vec::new();

        let outcome = OperationPoller::new(&source, fast())
            .wait(&query(), |status| reported.push(status.state))
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(outcome.state, OperationState::Succeeded);
        assert!(outcome.decode_ambiguous);
        assert_eq!(reported, vec![OperationState::Succeeded]);
    }

    #[tokio::test]
    async fn test_failed_state_stops_polling() {
        let source = Scripted::new(vec![
            Reply::Status(OperationState::InProgress, "creating"),
            Reply::Status(OperationState::Failed, "quota exceeded"),
            Reply::Status(OperationState::InProgress, "never read"),
        ]);

        let outcome = OperationPoller::new(&source, fast())
            .wait(&query(), |_| {})
            .await
            .unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(outcome.state, OperationState::Failed);
        assert_eq!(outcome.description, "quota exceeded");
    }

    #[tokio::test]
    async fn test_transport_error_is_fatal() {
        let source = Scripted::new(vec![
            Reply::Status(OperationState::InProgress, "creating"),
            Reply::Unreachable,
        ]);

        let err = OperationPoller::new(&source, fast())
            .wait(&query(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RemoteOperationFailed(_)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_max_polls_bounds_the_loop() {
        let source = Scripted::new(vec![
            Reply::Status(OperationState::InProgress, "1"),
            Reply::Status(OperationState::InProgress, "2"),
            Reply::Status(OperationState::InProgress, "3"),
        ]);
        let settings = PollSettings {
            interval: Duration::ZERO,
            max_polls: Some(2),
        };

        let err = OperationPoller::new(&source, settings)
            .wait(&query(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PollLimitReached(2)));
        assert_eq!(source.calls(), 2);
    }
}
