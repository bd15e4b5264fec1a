// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Broker lifetime enforcement.
//!
//! The broker only lives long enough to hand out its tokens. The
//! [`LifecycleMonitor`] polls the [`TokenStore`] on a fixed interval and
//! reports a [`ShutdownReason`] once every token has been consumed or the
//! lifetime has elapsed. The binary exits the process when that happens;
//! the monitor itself never does, so its decisions can be tested in-process.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::tokens::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Every issued token has been used.
    AllTokensConsumed,
    /// The broker outlived its lifetime.
    Expired,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTokensConsumed => f.write_str("all tokens consumed"),
            Self::Expired => f.write_str("token lifetime expired"),
        }
    }
}

pub struct LifecycleMonitor {
    tokens: Arc<TokenStore>,
    started_at: Instant,
    ttl: Duration,
    poll_interval: Duration,
}

impl LifecycleMonitor {
    /// Creates a monitor whose lifetime starts now.
    pub fn new(tokens: Arc<TokenStore>, ttl: Duration, poll_interval: Duration) -> Self {
        Self::starting_at(tokens, Instant::now(), ttl, poll_interval)
    }

    /// Creates a monitor whose lifetime started at `started_at`, normally the
    /// moment the process came up.
    pub fn starting_at(
        tokens: Arc<TokenStore>,
        started_at: Instant,
        ttl: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            tokens,
            started_at,
            ttl,
            poll_interval,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.started_at + self.ttl
    }

    /// Decides whether the broker should stop after `elapsed` time.
    ///
    /// Token consumption is checked first, so a broker whose tokens were all
    /// used reports [`ShutdownReason::AllTokensConsumed`] even past its
    /// deadline. A token directory that cannot be read is never taken as
    /// consumption; before the deadline it is returned as an error.
    pub fn check(&self, elapsed: Duration) -> io::Result<Option<ShutdownReason>> {
        match self.tokens.all_consumed() {
            Ok(true) => Ok(Some(ShutdownReason::AllTokensConsumed)),
            _ if elapsed > self.ttl => Ok(Some(ShutdownReason::Expired)),
            Ok(false) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Polls until a shutdown reason is found or `stop` is signalled.
    ///
    /// Returns `None` only when stopped through `stop` (or when its sender is
    /// dropped).
    #[tracing::instrument(skip_all)]
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> Option<ShutdownReason> {
        tracing::info!(
            "[broker] monitoring tokens every {:#?}, lifetime {:#?}",
            self.poll_interval,
            self.ttl
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.check(self.started_at.elapsed()) {
                        Ok(Some(reason)) => {
                            tracing::info!("[broker] {}, shutting down", reason);
                            return Some(reason);
                        }
                        Ok(None) => {
                            tracing::debug!(
                                "[broker] tokens still live, sleeping for {:#?}",
                                self.poll_interval
                            );
                        }
                        Err(err) => {
                            tracing::error!(
                                "[broker] unable to check token files, retrying in {:#?}: {:?}",
                                self.poll_interval,
                                err
                            );
                        }
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        tracing::debug!("[broker] lifecycle monitor stopped");
                        return None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tokens::Role;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(300);
    const POLL: Duration = Duration::from_secs(5);

    fn issued_store() -> (TempDir, Arc<TokenStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens"));
        store.generate_all().unwrap();
        (dir, Arc::new(store))
    }

    fn consume(store: &TokenStore, role: Role) {
        let token = std::fs::read_to_string(store.path_for(role)).unwrap();
        assert!(store.consume(&token).unwrap());
    }

    #[tokio::test]
    async fn test_check_keeps_running_with_live_tokens() {
        let (_dir, store) = issued_store();
        let monitor = LifecycleMonitor::new(store, TTL, POLL);
        assert_eq!(monitor.check(Duration::ZERO).unwrap(), None);
        assert_eq!(monitor.check(TTL).unwrap(), None);
    }

    #[tokio::test]
    async fn test_check_expires_after_ttl() {
        let (_dir, store) = issued_store();
        let monitor = LifecycleMonitor::new(store, TTL, POLL);
        assert_eq!(
            monitor.check(TTL + Duration::from_secs(1)).unwrap(),
            Some(ShutdownReason::Expired)
        );
    }

    #[tokio::test]
    async fn test_check_prefers_consumption() {
        let (_dir, store) = issued_store();
        consume(&store, Role::Database);
        consume(&store, Role::Backend);
        let monitor = LifecycleMonitor::new(store, TTL, POLL);
        assert_eq!(
            monitor.check(Duration::ZERO).unwrap(),
            Some(ShutdownReason::AllTokensConsumed)
        );
        assert_eq!(
            monitor.check(TTL * 2).unwrap(),
            Some(ShutdownReason::AllTokensConsumed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_after_all_tokens_consumed() {
        let (_dir, store) = issued_store();
        let monitor = LifecycleMonitor::new(store.clone(), TTL, POLL);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.run(stop_rx));

        tokio::time::sleep(POLL * 2).await;
        assert!(!handle.is_finished());

        consume(&store, Role::Database);
        consume(&store, Role::Backend);

        tokio::time::sleep(POLL + Duration::from_millis(1)).await;
        let reason = handle.await.unwrap();
        assert_eq!(reason, Some(ShutdownReason::AllTokensConsumed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_timeout() {
        let (_dir, store) = issued_store();
        let monitor = LifecycleMonitor::new(store, TTL, POLL);
        let (_stop_tx, stop_rx) = watch::channel(false);

        let started = Instant::now();
        let reason = monitor.run(stop_rx).await;

        assert_eq!(reason, Some(ShutdownReason::Expired));
        let elapsed = started.elapsed();
        assert!(elapsed > TTL);
        assert!(elapsed <= TTL + POLL);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_reports_unreadable_directory() {
        let (_dir, store) = issued_store();
        std::fs::remove_dir_all(store.dir()).unwrap();
        std::fs::write(store.dir(), "not a directory").unwrap();

        let monitor = LifecycleMonitor::new(store, TTL, POLL);
        assert!(monitor.check(Duration::ZERO).is_err());
        assert!(monitor.check(TTL).is_err());
        assert_eq!(
            monitor.check(TTL * 2).unwrap(),
            Some(ShutdownReason::Expired)
        );
    }

    #[cfg(unix)]
    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_polling_through_filesystem_fault() {
        let (_dir, store) = issued_store();
        let tokens_dir = store.dir().to_path_buf();
        std::fs::remove_dir_all(&tokens_dir).unwrap();
        std::fs::write(&tokens_dir, "not a directory").unwrap();

        let monitor = LifecycleMonitor::new(store, TTL, POLL);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.run(stop_rx));

        tokio::time::sleep(POLL * 3).await;
        assert!(!handle.is_finished());

        std::fs::remove_file(&tokens_dir).unwrap();
        std::fs::create_dir(&tokens_dir).unwrap();

        tokio::time::sleep(POLL + Duration::from_millis(1)).await;
        assert_eq!(
            handle.await.unwrap(),
            Some(ShutdownReason::AllTokensConsumed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifetime_counts_from_process_start() {
        let (_dir, store) = issued_store();
        let process_start = Instant::now();
        tokio::time::advance(TTL - POLL).await;

        let monitor = LifecycleMonitor::starting_at(store, process_start, TTL, POLL);
        assert_eq!(monitor.deadline(), process_start + TTL);

        let (_stop_tx, stop_rx) = watch::channel(false);
        let reason = monitor.run(stop_rx).await;

        assert_eq!(reason, Some(ShutdownReason::Expired));
        let elapsed = process_start.elapsed();
        assert!(elapsed > TTL);
        assert!(elapsed <= TTL + POLL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_honours_stop_signal() {
        let (_dir, store) = issued_store();
        let monitor = LifecycleMonitor::new(store, TTL, POLL);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.run(stop_rx));

        tokio::time::sleep(POLL).await;
        stop_tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), None);
    }
}
