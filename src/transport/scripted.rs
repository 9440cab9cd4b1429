//! In-memory transport that replays a script of responses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::transport::{OutboundRequest, Transport, TransportError, TransportResponse};

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Respond(u16, &'static str),
    Fail(TransportError),
    /// Respond after sleeping on the tokio clock.
    Delayed(Duration, u16, &'static str),
}

/// Replays `steps` in order, then repeats `fallback` forever.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicU32,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback,
            calls: AtomicU32::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(step: Step) -> Self {
        Self::new(Vec::new(), step)
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(request.url.to_string());

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Respond(status, body) => Ok(response(status, body)),
            Step::Fail(err) => Err(err),
            Step::Delayed(delay, status, body) => {
                tokio::time::sleep(delay).await;
                Ok(response(status, body))
            }
        }
    }
}

fn response(status: u16, body: &str) -> TransportResponse {
    TransportResponse::new(StatusCode::from_u16(status).unwrap(), body)
}
