//! Test doubles shared by the worker test modules.

use async_trait::async_trait;
use bytes::Bytes;
use offcache_client::{FetchResponse, Fetcher, HeaderMap, StatusCode};
use offcache_core::Error;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

struct ScriptedResponse {
    status: u16,
    body: Vec<u8>,
    delay_ms: u64,
}

/// Fetcher fake with a scripted queue of outcomes, popped per call.
/// An empty queue behaves like a dead network.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    script: Mutex<VecDeque<Result<ScriptedResponse, Error>>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, status: u16, body: &str) {
        self.push(Ok(ScriptedResponse { status, body: body.as_bytes().to_vec(), delay_ms: 0 }));
    }

    pub fn push_ok_delayed(&self, status: u16, body: &str, delay_ms: u64) {
        self.push(Ok(ScriptedResponse { status, body: body.as_bytes().to_vec(), delay_ms }));
    }

    pub fn push_err(&self, err: Error) {
        self.push(Err(err));
    }

    fn push(&self, outcome: Result<ScriptedResponse, Error>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            None => Err(Error::Network(format!("{url}: network disabled"))),
            Some(Err(e)) => Err(e),
            Some(Ok(scripted)) => {
                if scripted.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(scripted.delay_ms)).await;
                }
                Ok(make_response(url, scripted.status, &scripted.body))
            }
        }
    }
}

pub(crate) fn make_response(url: &Url, status: u16, body: &[u8]) -> FetchResponse {
    FetchResponse {
        url: url.clone(),
        final_url: url.clone(),
        status: StatusCode::from_u16(status).unwrap(),
        content_type: Some("text/html".to_string()),
        bytes: Bytes::from(body.to_vec()),
        headers: HeaderMap::new(),
        fetch_ms: 0,
    }
}
