// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publish loop.
//!
//! One task per session keeps up to `max_inflight_publish` PublishRequests
//! outstanding while subscriptions exist. Each response is checked against
//! the subscription's sequence tracker; missing numbers are fetched with
//! Republish before the current message so the consumer sees strictly
//! increasing sequence numbers.
//!
//! With several publishes outstanding, responses can complete out of order.
//! A message that skips ahead is held until the other outstanding publishes
//! have returned (or [`REORDER_WINDOW`] passes); only numbers still missing
//! then are republished.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use super::sequence::SequenceCheck;
use crate::config::PUBLISH_BACKOFF;
use crate::error::{Error, Result};
use crate::services::{
    PublishRequest, PublishResponse, RepublishRequest, RequestHeader, SubscriptionAcknowledgement,
};
use crate::session::Session;
use crate::types::StatusCode;

/// Idle wake-up when no subscription has a deadline.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Longest a message waits for its predecessors from other publishes.
const REORDER_WINDOW: Duration = Duration::from_millis(200);

type PublishOutcome = (Vec<SubscriptionAcknowledgement>, Result<PublishResponse>);

enum Step {
    Continue,
    Backoff,
    Stop,
}

/// A message that arrived ahead of its predecessors.
struct Held {
    response: PublishResponse,
    /// Publish completions still expected before republishing.
    wait: usize,
    until: Instant,
}

pub(crate) async fn run(weak: Weak<Session>) {
    let mut inflight: JoinSet<PublishOutcome> = JoinSet::new();
    // Lowered after BadTooManyPublishRequests, reset on success.
    let mut limit: Option<usize> = None;
    let mut held: Vec<Held> = Vec::new();

    log::debug!("[Publish] loop started");
    loop {
        let Some(session) = weak.upgrade() else {
            break;
        };
        if !session.is_active() {
            break;
        }
        let registry = session.subscriptions();

        let max = limit.unwrap_or_else(|| session.max_inflight_publish()).max(1);
        while !registry.is_empty() && inflight.len() < max {
            let acks = registry.take_acks();
            let timeout = registry.publish_timeout(session.request_timeout());
            let publisher = Arc::clone(&session);
            inflight.spawn(async move {
                let request = PublishRequest {
                    request_header: RequestHeader::default(),
                    subscription_acknowledgements: acks.clone(),
                };
                let result = publisher.send_with_timeout(request, timeout).await;
                (acks, result)
            });
        }

        let deadline = registry.next_deadline();
        let release = held.iter().map(|h| h.until).min();
        let changed = registry.changed();
        let step = tokio::select! {
            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                for entry in &mut held {
                    entry.wait = entry.wait.saturating_sub(1);
                }
                match joined {
                    Ok((_, Ok(response))) => {
                        limit = None;
                        let until = Instant::now() + REORDER_WINDOW;
                        on_response(&session, response, inflight.len(), until, &mut held).await
                    }
                    Ok((acks, Err(e))) => on_error(&session, acks, e, &mut limit, inflight.len()),
                    Err(e) if e.is_cancelled() => Step::Stop,
                    Err(e) => {
                        log::error!("[Publish] publish task panicked: {}", e);
                        Step::Backoff
                    }
                }
            },
            _ = changed => Step::Continue,
            _ = tokio::time::sleep_until(release.unwrap_or_else(|| Instant::now() + IDLE_WAIT)),
                if release.is_some() => Step::Continue,
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(|| Instant::now() + IDLE_WAIT)),
                if deadline.is_some() => {
                for id in registry.expire(Instant::now()) {
                    log::info!("[Publish] subscription {} expired", id);
                }
                Step::Continue
            }
        };

        let step = match step {
            Step::Stop => Step::Stop,
            other if held.is_empty() => other,
            other => match release_held(&session, &mut held).await {
                Step::Stop => Step::Stop,
                _ => other,
            },
        };
        match step {
            Step::Continue => {}
            Step::Backoff => {
                drop(session);
                tokio::time::sleep(PUBLISH_BACKOFF).await;
            }
            Step::Stop => break,
        }
    }
    inflight.abort_all();
    log::debug!("[Publish] loop stopped");
}

fn on_error(
    session: &Session,
    acks: Vec<SubscriptionAcknowledgement>,
    err: Error,
    limit: &mut Option<usize>,
    still_inflight: usize,
) -> Step {
    let registry = session.subscriptions();
    match err {
        Error::ServiceFault(StatusCode::BadTooManyPublishRequests) => {
            let lowered = still_inflight.max(1);
            log::debug!("[Publish] server limits outstanding publishes to {}", lowered);
            *limit = Some(lowered);
            registry.requeue_acks(acks);
            Step::Backoff
        }
        Error::ServiceFault(StatusCode::BadNoSubscription) => {
            log::debug!("[Publish] server reports no subscription");
            registry.requeue_acks(acks);
            Step::Backoff
        }
        Error::ServiceFault(StatusCode::BadSessionIdInvalid)
        | Error::ServiceFault(StatusCode::BadSessionClosed)
        | Error::ServiceFault(StatusCode::BadSessionNotActivated)
        | Error::Cancelled => Step::Stop,
        e if e.is_fatal() => Step::Stop,
        Error::RequestTimedOut { .. } => {
            log::warn!("[Publish] publish request timed out");
            registry.requeue_acks(acks);
            Step::Continue
        }
        e => {
            log::warn!("[Publish] publish failed: {}", e);
            registry.requeue_acks(acks);
            Step::Backoff
        }
    }
}

/// Handle one publish response. A message that skips ahead is held while
/// `wait` more publish completions are expected and `until` has not passed.
async fn on_response(
    session: &Session,
    response: PublishResponse,
    wait: usize,
    until: Instant,
    held: &mut Vec<Held>,
) -> Step {
    let registry = session.subscriptions();
    let options = session.channel().decoding_options();
    let id = response.subscription_id;
    let message = &response.notification_message;

    for status in response.results.iter().filter(|s| s.is_bad()) {
        log::debug!("[Publish] acknowledgement rejected: {}", status);
    }

    if message.is_keep_alive() {
        if !registry.touch(id) {
            log::debug!("[Publish] keep-alive for unknown subscription {}", id);
        }
        return Step::Continue;
    }

    let sequence_number = message.sequence_number;
    match registry.check(id, sequence_number) {
        None => {
            log::warn!(
                "[Publish] notification {} for unknown subscription {}",
                sequence_number,
                id
            );
            registry.acknowledge(id, sequence_number);
        }
        Some(SequenceCheck::Next) => {
            registry.deliver(id, message, options);
        }
        Some(SequenceCheck::Duplicate) => {
            log::debug!(
                "[Publish] dropping duplicate {} of subscription {}",
                sequence_number,
                id
            );
            registry.acknowledge(id, sequence_number);
        }
        Some(SequenceCheck::Gap(_)) if wait > 0 && Instant::now() < until => {
            log::debug!(
                "[Publish] holding {} of subscription {} for {} outstanding publishes",
                sequence_number,
                id,
                wait
            );
            held.push(Held {
                response,
                wait,
                until,
            });
        }
        Some(SequenceCheck::Gap(missing)) => {
            log::warn!(
                "[Publish] subscription {} missing {:?} before {}",
                id,
                missing,
                sequence_number
            );
            for number in missing {
                if let Step::Stop = republish(session, id, number).await {
                    return Step::Stop;
                }
            }
            registry.deliver(id, message, options);
        }
    }
    Step::Continue
}

/// Re-examine held messages in sequence order. Gaps nothing else can fill
/// any more are republished.
async fn release_held(session: &Session, held: &mut Vec<Held>) -> Step {
    let mut entries = std::mem::take(held);
    entries.sort_by_key(|h| {
        (
            h.response.subscription_id,
            h.response.notification_message.sequence_number,
        )
    });
    for entry in entries {
        let step = on_response(session, entry.response, entry.wait, entry.until, held).await;
        if let Step::Stop = step {
            return Step::Stop;
        }
    }
    Step::Continue
}

async fn republish(session: &Session, id: u32, number: u32) -> Step {
    let registry = session.subscriptions();
    let request = RepublishRequest {
        request_header: RequestHeader::default(),
        subscription_id: id,
        retransmit_sequence_number: number,
    };
    match session.send(request).await {
        Ok(response) => {
            let message = &response.notification_message;
            if message.sequence_number != number {
                log::warn!(
                    "[Publish] republish of {} returned {}",
                    number,
                    message.sequence_number
                );
                registry.skip(id, number);
            } else {
                log::debug!("[Publish] republished {} of subscription {}", number, id);
                registry.deliver(id, message, session.channel().decoding_options());
            }
            Step::Continue
        }
        Err(Error::ServiceFault(StatusCode::BadMessageNotAvailable)) => {
            log::warn!(
                "[Publish] notification {} of subscription {} no longer available",
                number,
                id
            );
            registry.skip(id, number);
            Step::Continue
        }
        Err(e) if e.is_fatal() || e == Error::Cancelled => Step::Stop,
        Err(e) => {
            log::warn!("[Publish] republish of {} failed: {}", number, e);
            registry.skip(id, number);
            Step::Continue
        }
    }
}
