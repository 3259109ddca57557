// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session keep-alive.
//!
//! Each interval, if the channel saw no traffic for a whole interval, the
//! server state variable is read. No answer within `interval x grace`
//! faults the session and the channel.

use std::sync::Weak;
use std::time::Duration;

use super::Session;
use crate::error::Error;
use crate::services::{ReadRequest, ReadValueId};
use crate::types::{ids, NodeId, TimestampsToReturn};

fn probe() -> ReadRequest {
    ReadRequest {
        max_age: 0.0,
        timestamps_to_return: TimestampsToReturn::Neither,
        nodes_to_read: vec![ReadValueId::from(NodeId::ns0(
            ids::variable::SERVER_SERVER_STATUS_STATE,
        ))],
        ..ReadRequest::default()
    }
}

pub(super) async fn run(session: Weak<Session>, interval: Duration, grace: u32) {
    let deadline = interval.saturating_mul(grace.max(1));
    loop {
        tokio::time::sleep(interval).await;
        let Some(session) = session.upgrade() else {
            return;
        };
        if !session.is_active() {
            return;
        }
        if session.channel().idle_for() < interval {
            continue;
        }

        match session.send_with_timeout(probe(), deadline).await {
            Ok(response) => {
                log::debug!(
                    "[Session] keep-alive: server state {:?}",
                    response.results.first().map(|v| v.value())
                );
            }
            Err(Error::ServiceFault(status)) => {
                // The server answered, so the connection is alive.
                log::warn!("[Session] keep-alive read failed: {}", status);
            }
            Err(Error::RequestTimedOut { .. }) => {
                log::error!("[Session] no keep-alive response within {:?}", deadline);
                session
                    .channel()
                    .fault(Error::Transport("keep-alive timed out".into()));
                session.fault(Error::Transport("keep-alive timed out".into()));
                return;
            }
            Err(e) => {
                session.fault(e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::super::testing::session_handler;
    use super::super::SessionState;
    use super::*;
    use crate::config::{ClientConfig, IdentityToken};
    use crate::secure_channel::testing::{MockServer, ServerOptions};
    use crate::secure_channel::{ChannelParams, ChannelState, SecureChannel};
    use crate::services::RequestMessage;

    #[tokio::test]
    async fn test_idle_session_is_probed() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let (client, _server) = MockServer::pair(ServerOptions::default(), move |request| {
            if matches!(request, RequestMessage::Read(_)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            session_handler(request)
        });
        let channel = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840"))
            .await
            .unwrap();
        let config = ClientConfig::new("opc.tcp://mock:4840")
            .with_keep_alive(Duration::from_millis(50), 3);
        let session = Session::create(channel, &config).await.unwrap();
        session.activate(&IdentityToken::Anonymous).await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(reads.load(Ordering::SeqCst) >= 1);
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_unanswered_probe_faults_session() {
        let silent = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&silent);
        let (client, _server) = MockServer::pair(ServerOptions::default(), move |request| {
            if flag.load(Ordering::SeqCst) {
                return None;
            }
            session_handler(request)
        });
        let channel = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840"))
            .await
            .unwrap();
        let config = ClientConfig::new("opc.tcp://mock:4840")
            .with_keep_alive(Duration::from_millis(40), 2);
        let session = Session::create(Arc::clone(&channel), &config).await.unwrap();
        session.activate(&IdentityToken::Anonymous).await.unwrap();
        silent.store(true, Ordering::SeqCst);

        let mut state = session.subscribe_state();
        tokio::time::timeout(
            Duration::from_secs(2),
            state.wait_for(|s| *s == SessionState::Faulted),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(channel.state(), ChannelState::Faulted);
    }
}
