//! DownloadRegistry — client-side cache of the artifacts stored on the service.
//!
//! The listing is server-owned: every refresh replaces it wholesale and a
//! failed refresh leaves the previous one untouched. Refreshes can overlap
//! (one triggered by the poller, one by the user); each takes a ticket and
//! a response older than the last applied one is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use url::Url;

use crate::api::types::DownloadedFile;
use crate::api::Gateway;
use crate::core::error::AppResult;
use crate::presentation::PresentationPort;

#[derive(Default)]
struct Listing {
    files: Vec<DownloadedFile>,
    applied_ticket: u64,
}

struct Inner {
    gateway: Arc<dyn Gateway>,
    presenter: Arc<dyn PresentationPort>,
    listing: Mutex<Listing>,
    next_ticket: AtomicU64,
}

/// Cheap to clone; clones share the same listing.
#[derive(Clone)]
pub struct DownloadRegistry {
    inner: Arc<Inner>,
}

impl DownloadRegistry {
    pub fn new(gateway: Arc<dyn Gateway>, presenter: Arc<dyn PresentationPort>) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                presenter,
                listing: Mutex::new(Listing::default()),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    /// Reloads the listing and hands it to the presenter.
    ///
    /// On failure the error is logged and returned; the cached listing and
    /// what the presenter shows stay as they were.
    pub async fn refresh(&self) -> AppResult<Vec<DownloadedFile>> {
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        let files = match self.inner.gateway.list_downloads().await {
            Ok(files) => files,
            Err(e) => {
                log::warn!("Failed to refresh downloads: {}", e);
                return Err(e);
            }
        };

        let mut listing = self.lock();
        if ticket < listing.applied_ticket {
            log::debug!(
                "Dropping listing #{} (already applied #{})",
                ticket,
                listing.applied_ticket
            );
            return Ok(listing.files.clone());
        }
        listing.applied_ticket = ticket;
        listing.files = files;
        log::debug!("Listing #{} applied: {} file(s)", ticket, listing.files.len());
        self.inner.presenter.show_downloads(&listing.files);
        Ok(listing.files.clone())
    }

    /// Deletes `name` on the service, then refreshes.
    ///
    /// Confirmation is the caller's job. A failed delete leaves the listing
    /// alone and returns the server's error; a failed follow-up refresh is
    /// only logged.
    pub async fn remove(&self, name: &str) -> AppResult<()> {
        self.inner.gateway.delete_download(name).await?;
        log::info!("Deleted {}", name);

        // Already logged inside refresh()
        let _ = self.refresh().await;
        Ok(())
    }

    /// Snapshot of the cached listing.
    pub fn listing(&self) -> Vec<DownloadedFile> {
        self.lock().files.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().files.iter().any(|f| f.name == name)
    }

    /// Link the user can open to fetch `name`.
    pub fn artifact_url(&self, name: &str) -> AppResult<Url> {
        self.inner.gateway.artifact_url(name)
    }

    fn lock(&self) -> MutexGuard<'_, Listing> {
        self.inner.listing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
