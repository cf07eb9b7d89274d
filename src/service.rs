use crate::host::Host;
use crate::wol::{Dispatcher, Sent, WakeError};
use lazy_static::lazy_static;
use log::{debug, error, info};
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

pub const DEFAULT_ATTEMPTS: u32 = 3;

lazy_static! {
    static ref WAKE_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "wakehost_wake_requests_total",
        "Wake requests by outcome.",
        &["result"]
    )
    .expect("metric can be registered");
    static ref SEND_ATTEMPTS: IntCounter = register_int_counter!(
        "wakehost_send_attempts_total",
        "Datagrams handed to the network stack or rejected by it."
    )
    .expect("metric can be registered");
    static ref SEND_ATTEMPT_FAILURES: IntCounter = register_int_counter!(
        "wakehost_send_attempt_failures_total",
        "Datagrams the network stack rejected."
    )
    .expect("metric can be registered");
}

fn result_label(result: &Result<Sent, WakeError>) -> &'static str {
    match result {
        Ok(_) => "sent",
        Err(WakeError::InvalidAddressFormat(_)) => "invalid_address_format",
        Err(WakeError::InvalidDestination(_)) => "invalid_destination",
        Err(WakeError::NetworkUnavailable(_)) => "network_unavailable",
        Err(WakeError::SendFailed { .. }) => "send_failed",
    }
}

/// Wakes stored hosts and reports how it went.
///
/// Blocks for the duration of one send; run it off any thread that has to
/// stay responsive.
#[derive(Clone)]
pub struct Waker {
    dispatcher: Dispatcher,
    attempts: u32,
}

impl Waker {
    pub fn new(dispatcher: Dispatcher, attempts: u32) -> Self {
        Self {
            dispatcher,
            attempts,
        }
    }

    pub fn wake(&self, host: &Host) -> Result<Sent, WakeError> {
        let result = self.send(host);
        WAKE_REQUESTS
            .with_label_values(&[result_label(&result)])
            .inc();
        match &result {
            Ok(sent) => {
                SEND_ATTEMPTS.inc_by(sent.attempts.into());
                SEND_ATTEMPT_FAILURES.inc_by((sent.attempts - sent.accepted).into());
                info!(
                    "magic packet for {:?} sent ({}/{} attempts accepted)",
                    host.title, sent.accepted, sent.attempts
                );
            }
            Err(err) => {
                if let WakeError::SendFailed { attempts, .. } = err {
                    SEND_ATTEMPTS.inc_by((*attempts).into());
                    SEND_ATTEMPT_FAILURES.inc_by((*attempts).into());
                }
                error!("magic packet for {:?} was not sent: {}", host.title, err);
            }
        }
        result
    }

    fn send(&self, host: &Host) -> Result<Sent, WakeError> {
        let target = host.wake_target()?;
        debug!(
            "waking {} via {} (broadcast: {}, secure on: {})",
            target.mac,
            target.destination,
            target.destination.is_broadcast(),
            target.secure_on.is_some()
        );
        self.dispatcher
            .send(&target.packet(), &target.destination, self.attempts)
    }
}
