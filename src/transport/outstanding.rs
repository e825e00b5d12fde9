//! Outstanding-request tracking for correlating transports.
//!
//! A transport that wants to produce [`ReadOutcome::Response`] outcomes
//! records every `send` here and looks arrivals up by their correlation
//! id. A correlation id appears in at most one transport's map at a time;
//! entries leave the map on delivery, on `send_and_wait` timeout, or when
//! the transport closes.
//!
//! [`ReadOutcome::Response`]: crate::transport::ReadOutcome::Response

use std::{collections::HashMap, sync::Mutex};

use crate::message::{Message, MessageId};

/// A mutex-guarded map from outgoing message id to the original request.
#[derive(Debug)]
pub struct OutstandingRequests<M> {
    requests: Mutex<HashMap<MessageId, M>>,
}

impl<M: Message + Clone> OutstandingRequests<M> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Record a just-sent request so a later arrival can be paired with it.
    pub fn record(&self, request: &M) {
        self.lock().insert(request.message_id(), request.clone());
    }

    /// If `arrived` correlates to a recorded request, remove and return
    /// that request.
    pub fn take_match(&self, arrived: &M) -> Option<M> {
        let correlation = arrived.correlation_id()?;
        let mut requests = self.lock();
        let request = requests.remove(&correlation)?;
        if arrived.is_response_for(&request) {
            Some(request)
        } else {
            // Correlation id collided with an unrelated request; keep it.
            requests.insert(correlation, request);
            None
        }
    }

    /// Forget the request with the given id, if still present.
    pub fn remove(&self, id: MessageId) { self.lock().remove(&id); }

    /// Drop every entry. Called on transport close.
    pub fn clear(&self) { self.lock().clear(); }

    /// Return the number of requests awaiting a response.
    pub fn len(&self) -> usize { self.lock().len() }

    /// Return `true` when no requests are awaiting a response.
    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MessageId, M>> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<M: Message + Clone> Default for OutstandingRequests<M> {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe {
        id: MessageId,
        correlation: Option<MessageId>,
    }

    impl Probe {
        fn request(id: u128) -> Self {
            Self {
                id: MessageId::from_u128(id),
                correlation: None,
            }
        }

        fn response(id: u128, correlation: u128) -> Self {
            Self {
                id: MessageId::from_u128(id),
                correlation: Some(MessageId::from_u128(correlation)),
            }
        }
    }

    impl Message for Probe {
        fn message_id(&self) -> MessageId { self.id }

        fn correlation_id(&self) -> Option<MessageId> { self.correlation }
    }

    #[test]
    fn correlated_arrival_takes_the_request() {
        let outstanding = OutstandingRequests::new();
        let request = Probe::request(1);
        outstanding.record(&request);

        let taken = outstanding.take_match(&Probe::response(2, 1));
        assert_eq!(taken, Some(request));
        assert!(outstanding.is_empty());
    }

    #[test]
    fn uncorrelated_arrival_takes_nothing() {
        let outstanding = OutstandingRequests::new();
        outstanding.record(&Probe::request(1));

        assert_eq!(outstanding.take_match(&Probe::request(2)), None);
        assert_eq!(outstanding.take_match(&Probe::response(3, 9)), None);
        assert_eq!(outstanding.len(), 1);
    }

    #[test]
    fn remove_and_clear_forget_entries() {
        let outstanding = OutstandingRequests::new();
        outstanding.record(&Probe::request(1));
        outstanding.record(&Probe::request(2));

        outstanding.remove(MessageId::from_u128(1));
        assert_eq!(outstanding.len(), 1);

        outstanding.clear();
        assert!(outstanding.is_empty());
        assert_eq!(outstanding.take_match(&Probe::response(3, 2)), None);
    }
}
