//! Request/response boundary to the host process.
//!
//! Requests are `{ "method", "data" }` JSON messages. Responses carry a `status` of `"ok"`
//! or `"error"` and may echo the request ticket; untagged responses answer the oldest
//! outstanding request, matching a host that replies in order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::panel::PanelId;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("host rejected {method}: {message}")]
    Rejected { method: String, message: String },
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
}

impl Request {
    pub fn new(method: impl Into<String>, data: Value) -> Self {
        Self {
            method: method.into(),
            data,
            ticket: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default)]
    pub ticket: Option<Ticket>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
}

pub fn parse_response(raw: &str) -> Result<Response, TransportError> {
    Ok(serde_json::from_str(raw)?)
}

/// Outbound half of the host channel. A request without a ticket is fire-and-forget.
pub trait HostTransport {
    fn send(&mut self, request: &Request) -> Result<(), TransportError>;
}

/// Keeps sent requests in memory; hosts drain it and tests inspect it.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Vec<Request>,
    offline: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self {
            sent: Vec::new(),
            offline: true,
        }
    }

    pub fn sent(&self) -> &[Request] {
        &self.sent
    }

    pub fn drain(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.sent)
    }
}

impl HostTransport for MemoryTransport {
    fn send(&mut self, request: &Request) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::Unavailable("host is offline".to_string()));
        }
        self.sent.push(request.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Pending {
    owner: PanelId,
    method: String,
    abandoned: bool,
}

/// What to do with an arriving response.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Deliver {
        owner: PanelId,
        method: String,
        data: Value,
    },
    /// The owning panel closed while the request was in flight.
    Discarded { method: String },
    Failed {
        owner: PanelId,
        error: String,
    },
    /// No request was waiting for this response.
    Unmatched,
}

/// In-flight requests by ticket. Requests are never cancelled; responses for panels
/// that closed in the meantime are dropped when they arrive.
#[derive(Debug, Default)]
pub struct PendingRequests {
    next: u64,
    pending: BTreeMap<Ticket, Pending>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn owned_by(&self, owner: PanelId) -> usize {
        self.pending
            .values()
            .filter(|p| p.owner == owner && !p.abandoned)
            .count()
    }

    /// Sends `request` on behalf of `owner`. With `expect_response` the request gets a
    /// ticket and is tracked until its response arrives.
    pub fn send(
        &mut self,
        transport: &mut dyn HostTransport,
        owner: PanelId,
        mut request: Request,
        expect_response: bool,
    ) -> Option<Ticket> {
        let ticket = expect_response.then(|| {
            self.next += 1;
            Ticket(self.next)
        });
        request.ticket = ticket;
        if let Err(err) = transport.send(&request) {
            tracing::warn!(method = %request.method, error = %err, "host request failed");
            return None;
        }
        let ticket = ticket?;
        self.pending.insert(
            ticket,
            Pending {
                owner,
                method: request.method,
                abandoned: false,
            },
        );
        Some(ticket)
    }

    /// Marks every request of `owner` as abandoned. Returns how many were affected.
    pub fn abandon(&mut self, owner: PanelId) -> usize {
        let mut count = 0;
        for pending in self.pending.values_mut().filter(|p| p.owner == owner) {
            if !pending.abandoned {
                pending.abandoned = true;
                count += 1;
            }
        }
        count
    }

    pub fn receive(&mut self, response: Response) -> Delivery {
        let ticket = match response.ticket {
            Some(ticket) => Some(ticket),
            None => self.pending.keys().next().copied(),
        };
        let Some(pending) = ticket.and_then(|ticket| self.pending.remove(&ticket)) else {
            tracing::debug!(ticket = ?response.ticket, "response without a pending request");
            return Delivery::Unmatched;
        };
        if pending.abandoned {
            tracing::debug!(method = %pending.method, owner = %pending.owner, "discarding late response");
            return Delivery::Discarded {
                method: pending.method,
            };
        }
        match response.status {
            Status::Ok => Delivery::Deliver {
                owner: pending.owner,
                method: pending.method,
                data: response.data,
            },
            Status::Error => {
                let err = TransportError::Rejected {
                    method: pending.method,
                    message: response.message.unwrap_or_else(|| "unknown error".to_string()),
                };
                tracing::warn!(error = %err, "host request failed");
                Delivery::Failed {
                    owner: pending.owner,
                    error: err.to_string(),
                }
            }
        }
    }

    pub fn receive_raw(&mut self, raw: &str) -> Result<Delivery, TransportError> {
        parse_response(raw).map(|response| self.receive(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_ok_and_error_responses() {
        let ok = parse_response(r#"{"status":"ok","ticket":3,"data":[1,2]}"#).unwrap();
        assert_eq!(ok.status, Status::Ok);
        assert_eq!(ok.ticket, Some(Ticket(3)));
        assert_eq!(ok.data, json!([1, 2]));

        let err = parse_response(r#"{"status":"error","message":"no such method"}"#).unwrap();
        assert_eq!(err.status, Status::Error);
        assert!(err.ticket.is_none());
        assert!(parse_response("{").is_err());
        assert!(parse_response(r#"{"status":"maybe"}"#).is_err());
    }

    #[test]
    fn fire_and_forget_is_not_tracked() {
        let mut transport = MemoryTransport::new();
        let mut pending = PendingRequests::new();
        let ticket = pending.send(
            &mut transport,
            PanelId(1),
            Request::new("log", json!("hello")),
            false,
        );
        assert!(ticket.is_none());
        assert!(pending.is_empty());
        assert_eq!(transport.sent().len(), 1);
        assert!(transport.sent()[0].ticket.is_none());
    }

    #[test]
    fn late_response_for_closed_panel_is_discarded() {
        let mut transport = MemoryTransport::new();
        let mut pending = PendingRequests::new();
        let owner = PanelId(7);
        let ticket = pending
            .send(&mut transport, owner, Request::new("lex", json!({"text": "x"})), true)
            .unwrap();
        assert_eq!(pending.abandon(owner), 1);
        assert_eq!(pending.owned_by(owner), 0);

        let delivery = pending.receive(Response {
            status: Status::Ok,
            ticket: Some(ticket),
            data: json!([]),
            message: None,
        });
        assert_eq!(delivery, Delivery::Discarded { method: "lex".to_string() });
        assert!(pending.is_empty());
    }

    #[test]
    fn untagged_responses_answer_oldest_request() {
        let mut transport = MemoryTransport::new();
        let mut pending = PendingRequests::new();
        pending.send(&mut transport, PanelId(1), Request::new("first", Value::Null), true);
        pending.send(&mut transport, PanelId(2), Request::new("second", Value::Null), true);

        let delivery = pending.receive_raw(r#"{"status":"ok","data":42}"#).unwrap();
        assert_eq!(
            delivery,
            Delivery::Deliver { owner: PanelId(1), method: "first".to_string(), data: json!(42) }
        );
        let delivery = pending
            .receive_raw(r#"{"status":"error","message":"boom"}"#)
            .unwrap();
        assert!(matches!(delivery, Delivery::Failed { owner: PanelId(2), ref error } if error.contains("boom")));
        assert_eq!(pending.receive_raw(r#"{"status":"ok"}"#).unwrap(), Delivery::Unmatched);
    }

    #[test]
    fn send_failure_leaves_nothing_pending() {
        let mut transport = MemoryTransport::offline();
        let mut pending = PendingRequests::new();
        let ticket = pending.send(&mut transport, PanelId(1), Request::new("lex", Value::Null), true);
        assert!(ticket.is_none());
        assert!(pending.is_empty());
    }
}
