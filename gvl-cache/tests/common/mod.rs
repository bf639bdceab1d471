#![allow(dead_code)]

use gvl_cache::api::{FetchResponse, HttpFetch};
use gvl_cache::db::{KeyValueStore, MemoryStore, StoredValue};
use gvl_cache::{GvlError, GvlManager};
use reqwest::{StatusCode, Url};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;
pub const START_MILLIS: i64 = 1_750_000_000_000;

pub const FIXTURE: &str = r#"{"vendorListVersion":5,"vendors":{"1":{"name":"Acme"}}}"#;

pub const RICH_FIXTURE: &str = r#"{
    "gvlSpecificationVersion": 3,
    "vendorListVersion": 6,
    "lastUpdated": "2025-06-12T16:05:27Z",
    "vendors": {
        "1": {
            "id": 1,
            "name": "Exponential Interactive, Inc d/b/a VDX.tv",
            "purposes": [1, 3, 4],
            "legIntPurposes": [2, 7],
            "specialFeatures": [],
            "specialPurposes": [1, 2],
            "cookieMaxAgeSeconds": 7776000,
            "usesCookies": true,
            "usesNonCookieAccess": false
        },
        "2": {
            "id": 2,
            "name": "Captify Technologies Limited",
            "purposes": [1, 2],
            "policyUrl": "https://www.captify.co.uk/privacy-policy/"
        },
        "755": {
            "id": 755,
            "name": "Google Advertising Products",
            "purposes": [1, 3, 4, 9, 10],
            "usesCookies": true,
            "usesNonCookieAccess": true
        }
    }
}"#;

/// HTTP fake that replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<FetchResponse, GvlError>>>,
    requests: Mutex<Vec<Url>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A fetcher whose requests block until [`ScriptedFetcher::release`] is called.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        })
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(FetchResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.as_bytes().to_vec(),
        }));
    }

    pub fn fail(&self) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(GvlError::GenericIo(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))));
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpFetch for ScriptedFetcher {
    async fn get(&self, url: Url) -> Result<FetchResponse, GvlError> {
        self.requests.lock().unwrap().push(url);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(FetchResponse {
                status: StatusCode::NOT_FOUND,
                body: Vec::new(),
            })
        })
    }
}

/// Manually advanced clock, in epoch milliseconds.
#[derive(Clone)]
pub struct TestClock(Arc<AtomicI64>);

impl TestClock {
    pub fn new() -> Self {
        Self(Arc::new(AtomicI64::new(START_MILLIS)))
    }

    pub fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

pub type TestManager = GvlManager<Arc<ScriptedFetcher>, Arc<MemoryStore>>;

pub async fn manager(
    fetcher: &Arc<ScriptedFetcher>,
    store: &Arc<MemoryStore>,
    clock: &TestClock,
) -> TestManager {
    let clock = clock.clone();

    GvlManager::builder(fetcher.clone(), store.clone())
        .clock(move || clock.now())
        .initialize()
        .await
}

/// Memory store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, GvlError> {
        self.inner.get(key).await
    }

    async fn put_all(&self, entries: Vec<(&'static str, StoredValue)>) -> Result<(), GvlError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GvlError::GenericIo(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "no space left on device",
            )));
        }

        self.inner.put_all(entries).await
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<(), GvlError> {
        self.inner.remove_all(keys).await
    }
}
