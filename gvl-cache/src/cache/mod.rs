mod freshness;
mod vendors;

pub use freshness::{is_cache_fresh, now_millis};
pub use vendors::VendorRecord;

use crate::api::{HttpFetch, VendorListDocument, vendor_list_url};
use crate::config::GvlConfig;
use crate::db::{
    ALL_KEYS, DOCUMENT_KEY, KeyValueStore, StoredValue, TIMESTAMP_KEY, VERSION_KEY,
};
use crate::error::GvlError;
use reqwest::{StatusCode, Url};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;
use vendors::{VendorView, build_view};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

struct LoadedList {
    document: VendorListDocument,
    timestamp_millis: i64,
}

#[derive(Default)]
struct CacheState {
    /// Bumped by every unload and clear, downloads started under an older
    /// generation are discarded.
    generation: u64,
    loaded: Option<LoadedList>,
    vendors: Option<Arc<VendorView>>,
}

struct Inner<F, S> {
    config: GvlConfig,
    fetcher: F,
    store: S,
    clock: Clock,
    state: RwLock<CacheState>,
    /// Serializes persisting a download against clearing the store.
    commit_gate: tokio::sync::Mutex<()>,
    tracker: TaskTracker,
}

/// Owner of the cached Global Vendor List.
///
/// Cloning is cheap and every clone shares the same cache.
pub struct GvlManager<F, S> {
    inner: Arc<Inner<F, S>>,
}

impl<F, S> Clone for GvlManager<F, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct GvlManagerBuilder<F, S> {
    fetcher: F,
    store: S,
    config: GvlConfig,
    clock: Clock,
}

impl<F, S> GvlManagerBuilder<F, S>
where
    F: HttpFetch,
    S: KeyValueStore,
{
    pub fn config(mut self, config: GvlConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the wall clock, returns epoch milliseconds.
    pub fn clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Create the manager and restore a previously stored vendor list.
    ///
    /// An expired or unreadable stored list is removed from the store; this
    /// never fails.
    pub async fn initialize(self) -> GvlManager<F, S> {
        let manager = GvlManager {
            inner: Arc::new(Inner {
                config: self.config,
                fetcher: self.fetcher,
                store: self.store,
                clock: self.clock,
                state: RwLock::new(CacheState::default()),
                commit_gate: tokio::sync::Mutex::new(()),
                tracker: TaskTracker::new(),
            }),
        };

        manager.hydrate().await;
        manager
    }
}

impl<F, S> GvlManager<F, S>
where
    F: HttpFetch,
    S: KeyValueStore,
{
    pub fn builder(fetcher: F, store: S) -> GvlManagerBuilder<F, S> {
        GvlManagerBuilder {
            fetcher,
            store,
            config: GvlConfig::default(),
            clock: Arc::new(now_millis),
        }
    }

    pub fn config(&self) -> &GvlConfig {
        &self.inner.config
    }

    /// Make sure a vendor list is loaded, downloading it if the cached copy is
    /// missing or expired.
    ///
    /// Returns immediately, the download runs on a background task and its
    /// outcome is delivered through the returned handle. Must be called from
    /// within a tokio runtime.
    pub fn load(&self, version: Option<&str>) -> LoadHandle {
        let (sender, receiver) = oneshot::channel();

        let generation = {
            let state = self.inner.read_state();

            let timestamp = state.loaded.as_ref().map(|l| l.timestamp_millis);
            if is_cache_fresh(timestamp, (self.inner.clock)(), self.inner.config.cache_ttl) {
                tracing::trace!("Vendor list already loaded and fresh");
                let _ = sender.send(Ok(()));
                return LoadHandle { receiver };
            }

            state.generation
        };

        let url = vendor_list_url(&self.inner.config.endpoint, version);
        let inner = self.inner.clone();

        self.inner.tracker.spawn(async move {
            let result = inner.download(url, generation).await;

            if let Err(err) = &result {
                tracing::warn!("Failed to load vendor list: {}", err);
            }

            let _ = sender.send(result);
        });

        LoadHandle { receiver }
    }

    /// Drop the in-memory vendor list, the stored copy is kept.
    pub fn unload(&self) {
        let mut state = self.inner.write_state();
        state.generation = state.generation.wrapping_add(1);
        state.loaded = None;
        state.vendors = None;
    }

    /// Drop the in-memory vendor list and remove the stored copy.
    pub async fn clear(&self) {
        self.unload();

        let _gate = self.inner.commit_gate.lock().await;
        if let Err(err) = self.inner.store.remove_all(&ALL_KEYS).await {
            tracing::warn!("Failed to remove stored vendor list: {}", err);
        }

        tracing::debug!("Vendor list cleared");
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read_state().loaded.is_some()
    }

    /// Version of the stored vendor list, independent of what is loaded.
    pub async fn get_version(&self) -> Option<String> {
        match self.inner.store.get(VERSION_KEY).await {
            Ok(value) => value.and_then(|v| v.as_text().map(ToOwned::to_owned)),
            Err(err) => {
                tracing::warn!("Failed to read stored vendor list version: {}", err);
                None
            }
        }
    }

    /// Name declared for the vendor in the loaded list.
    pub fn get_vendor_name(&self, vendor_id: u32) -> Option<String> {
        self.vendors()?.get(&vendor_id)?.declared_name.clone()
    }

    /// Names of the given vendors keyed by their decimal id. Unknown vendors
    /// and vendors without a declared name are left out.
    pub fn get_vendor_names(&self, vendor_ids: &[u32]) -> BTreeMap<String, String> {
        let Some(vendors) = self.vendors() else {
            return BTreeMap::new();
        };

        vendor_ids
            .iter()
            .filter_map(|id| {
                let name = vendors.get(id)?.declared_name.clone()?;
                Some((id.to_string(), name))
            })
            .collect()
    }

    pub fn get_vendor_info(&self, vendor_id: u32) -> Option<VendorRecord> {
        self.vendors()?
            .get(&vendor_id)
            .map(|vendor| vendor.record.clone())
    }

    /// Wait for all in-flight downloads to finish.
    pub async fn shutdown(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    fn vendors(&self) -> Option<Arc<VendorView>> {
        {
            let state = self.inner.read_state();
            if let Some(vendors) = &state.vendors {
                return Some(vendors.clone());
            }

            state.loaded.as_ref()?;
        }

        let mut state = self.inner.write_state();
        if let Some(vendors) = &state.vendors {
            return Some(vendors.clone());
        }

        let view = Arc::new(build_view(&state.loaded.as_ref()?.document.vendors));
        tracing::trace!("Indexed {} vendors", view.len());

        state.vendors = Some(view.clone());
        Some(view)
    }

    #[tracing::instrument(skip(self))]
    async fn hydrate(&self) {
        let stored = match self.inner.store.get(DOCUMENT_KEY).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                tracing::trace!("No stored vendor list");
                return;
            }
            Err(err) => {
                tracing::warn!("Failed to read stored vendor list: {}", err);
                return;
            }
        };

        let timestamp = match self.inner.store.get(TIMESTAMP_KEY).await {
            Ok(v) => v.and_then(|v| v.as_integer()),
            Err(err) => {
                tracing::warn!("Failed to read stored vendor list timestamp: {}", err);
                None
            }
        };

        let timestamp_millis = match timestamp {
            Some(t) if is_cache_fresh(timestamp, (self.inner.clock)(), self.inner.config.cache_ttl) => t,
            _ => {
                tracing::debug!("Stored vendor list expired, discarding it");
                self.clear().await;
                return;
            }
        };

        let stored_version = match self.inner.store.get(VERSION_KEY).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!("Failed to read stored vendor list version: {}", err);
                None
            }
        };

        let document = stored
            .as_text()
            .ok_or_else(|| GvlError::CorruptValue {
                key: DOCUMENT_KEY.to_owned(),
            })
            .and_then(|text| serde_json::from_str::<VendorListDocument>(text).map_err(GvlError::from))
            .and_then(|document| {
                let version = stored_version.as_ref().and_then(StoredValue::as_text);
                if version == Some(document.vendor_list_version.to_string().as_str()) {
                    Ok(document)
                } else {
                    Err(GvlError::VersionMismatch {
                        stored: version.map(ToOwned::to_owned),
                        document: document.vendor_list_version,
                    })
                }
            });

        match document {
            Ok(document) => {
                tracing::debug!(
                    "Restored vendor list version {}",
                    document.vendor_list_version
                );

                let mut state = self.inner.write_state();
                state.loaded = Some(LoadedList {
                    document,
                    timestamp_millis,
                });
                state.vendors = None;
            }
            Err(err) => {
                tracing::warn!("Stored vendor list is corrupt, discarding it: {}", err);
                self.clear().await;
            }
        }
    }
}

impl<F, S> Inner<F, S>
where
    F: HttpFetch,
    S: KeyValueStore,
{
    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[tracing::instrument(skip_all, fields(url = url.as_str()))]
    async fn download(&self, url: Url, generation: u64) -> Result<(), GvlError> {
        let response = self.fetcher.get(url).await?;
        if response.status != StatusCode::OK {
            return Err(GvlError::UnexpectedStatus(response.status));
        }

        let body = String::from_utf8(response.body)?;
        let document = serde_json::from_str::<VendorListDocument>(&body)?;
        let version = document.vendor_list_version.to_string();
        let timestamp_millis = (self.clock)();

        let _gate = self.commit_gate.lock().await;
        let current_generation = self.read_state().generation;
        if current_generation != generation {
            return Err(GvlError::Superseded);
        }

        self.store
            .put_all(vec![
                (DOCUMENT_KEY, StoredValue::Text(body)),
                (VERSION_KEY, StoredValue::Text(version)),
                (TIMESTAMP_KEY, StoredValue::Integer(timestamp_millis)),
            ])
            .await?;

        let mut state = self.write_state();
        if state.generation != generation {
            // Unloaded while persisting, the stored copy stays for later.
            return Err(GvlError::Superseded);
        }

        tracing::debug!("Loaded vendor list version {}", document.vendor_list_version);

        state.loaded = Some(LoadedList {
            document,
            timestamp_millis,
        });
        state.vendors = None;

        Ok(())
    }
}

/// Outcome of a [`GvlManager::load`] call.
#[must_use = "the load outcome is only observable through the handle"]
pub struct LoadHandle {
    receiver: oneshot::Receiver<Result<(), GvlError>>,
}

impl LoadHandle {
    /// Wait for the load and reduce the outcome to success or failure.
    pub async fn succeeded(self) -> bool {
        self.await.is_ok()
    }
}

impl Future for LoadHandle {
    type Output = Result<(), GvlError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(GvlError::Interrupted)))
    }
}
