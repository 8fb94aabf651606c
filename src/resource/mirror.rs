//! CPU mirror policy and reloads.
//!
//! Meshes keep a CPU copy of their data only while something needs it (ray
//! intersection, tooling). Turning the mirror back on for a resource whose
//! mirrors were released requires fresh data: either a registered
//! [`GeometryFactory`](crate::format::GeometryFactory) regenerates it, or
//! the [`ResourceLoader`] fetches the asset again.
//!
//! Loader fetches complete through a single-shot [`LoadTicket`]:
//!
//! ```ignore
//! let (completer, ticket) = load_ticket();
//! std::thread::spawn(move || completer.resolve(fetch(&path)));
//! match ticket.wait() {
//!     LoadOutcome::Resolved(bytes) => { /* prepare */ }
//!     LoadOutcome::Rejected(reason) => { /* error */ }
//! }
//! ```

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};

use crate::config::PrepareOptions;
use crate::error::{GeometryError, GeometryResult};

use super::{GeometryResource, ResourceState};

/// Result of a loader fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Resolved(Vec<u8>),
    Rejected(String),
}

/// Why a fetch was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadReason {
    Initial,
    MirrorReload,
}

/// Request metadata passed to [`ResourceLoader::load_resource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMetadata {
    pub reason: LoadReason,
    /// Whether the resource will keep CPU mirrors after the load.
    pub keep_mirror: bool,
}

/// Sending half of a load; consumed by resolving or rejecting.
///
/// Dropping it without either counts as a rejection.
#[derive(Debug)]
pub struct LoadCompleter {
    sender: SyncSender<LoadOutcome>,
}

impl LoadCompleter {
    pub fn resolve(self, data: Vec<u8>) {
        let _ = self.sender.send(LoadOutcome::Resolved(data));
    }

    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.sender.send(LoadOutcome::Rejected(reason.into()));
    }
}

/// Receiving half of a load.
#[derive(Debug)]
pub struct LoadTicket {
    receiver: Receiver<LoadOutcome>,
}

impl LoadTicket {
    /// Outcome if the load already finished.
    pub fn try_recv(&self) -> Option<LoadOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(dropped()),
        }
    }

    /// Block until the load finishes.
    ///
    /// # Warning
    ///
    /// This blocks the calling thread.
    pub fn wait(self) -> LoadOutcome {
        self.receiver.recv().unwrap_or_else(|_| dropped())
    }
}

fn dropped() -> LoadOutcome {
    LoadOutcome::Rejected("load request dropped without completion".to_string())
}

/// Create a connected completer/ticket pair.
pub fn load_ticket() -> (LoadCompleter, LoadTicket) {
    let (sender, receiver) = mpsc::sync_channel(1);
    (LoadCompleter { sender }, LoadTicket { receiver })
}

/// The external resource manager.
pub trait ResourceLoader: Send + Sync {
    /// Global CPU mirror policy.
    fn is_system_mirror_enabled(&self) -> bool;

    /// Start fetching `path`.
    fn load_resource(&self, path: &str, metadata: &LoadMetadata) -> LoadTicket;

    /// The resource at `path` was just used.
    fn keep_alive(&self, _path: &str) {}
}

impl GeometryResource {
    /// Whether CPU mirrors must survive upload.
    ///
    /// The global policy comes from the loader when one is attached and from
    /// [`GeometryConfig::system_mirror`](crate::GeometryConfig) otherwise.
    pub fn mirror_required(&self) -> bool {
        let global = match &self.loader {
            Some(loader) => loader.is_system_mirror_enabled(),
            None => self.config.system_mirror,
        };
        self.keep_mirror || self.mirror_forced || self.system_mirror || global
    }

    pub fn is_mirror_forced(&self) -> bool {
        self.mirror_forced
    }

    pub(super) fn release_unneeded_mirrors(&mut self) {
        if self.mirror_required() {
            return;
        }
        for mesh in &mut self.meshes {
            mesh.release_mirror();
        }
    }

    fn missing_mirror(&self) -> bool {
        self.meshes.iter().any(|m| !m.has_mirror())
    }

    /// Turn the resource's mirror policy on or off.
    ///
    /// Enabling it while some mesh has no mirror reloads the data. Disabling
    /// it releases mirrors nothing else requires. Returns whether a reload
    /// happened.
    pub fn set_system_mirror(&mut self, enable: bool) -> GeometryResult<bool> {
        self.system_mirror = enable;
        if enable && self.missing_mirror() {
            log::debug!("{}: mirror enabled with released data, reloading", self.path);
            self.reload()?;
            return Ok(true);
        }
        self.release_unneeded_mirrors();
        Ok(false)
    }

    /// Pin (or unpin) the mirror so automatic cleanup never removes it.
    ///
    /// Returns whether a reload happened.
    pub fn force_system_mirror(&mut self, force: bool) -> GeometryResult<bool> {
        self.mirror_forced = force;
        if force && self.missing_mirror() {
            log::debug!("{}: mirror forced with released data, reloading", self.path);
            self.reload()?;
            return Ok(true);
        }
        self.release_unneeded_mirrors();
        Ok(false)
    }

    /// Fetch the asset through the loader and prepare it.
    pub fn load(&mut self) -> GeometryResult<()> {
        self.fetch_and_prepare(LoadReason::Initial)
    }

    /// Rebuild the resource data: through the registered factory when the
    /// data came from one, otherwise through the loader.
    pub fn reload(&mut self) -> GeometryResult<()> {
        if let (Some(factory), Some(options)) = (self.factory.clone(), self.json_options.clone()) {
            log::info!("{}: regenerating from factory", self.path);
            let document = factory.create_document(&options)?;
            return self.update_from_json(&document, options);
        }
        self.fetch_and_prepare(LoadReason::MirrorReload)
    }

    fn fetch_and_prepare(&mut self, reason: LoadReason) -> GeometryResult<()> {
        let Some(loader) = self.loader.clone() else {
            return Err(GeometryError::LoadFailed {
                path: self.path.clone(),
                reason: "no resource loader attached".to_string(),
            });
        };
        self.state = ResourceState::Loading;
        let metadata = LoadMetadata {
            reason,
            keep_mirror: self.mirror_required(),
        };
        log::info!("{}: loading ({:?})", self.path, reason);
        match loader.load_resource(&self.path, &metadata).wait() {
            LoadOutcome::Resolved(data) => self.prepare(
                &data,
                PrepareOptions {
                    keep_mirror: self.keep_mirror,
                },
            ),
            LoadOutcome::Rejected(reason) => {
                self.state = ResourceState::Error;
                log::warn!("{}: load rejected: {}", self.path, reason);
                Err(GeometryError::LoadFailed {
                    path: self.path.clone(),
                    reason,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_resolve() {
        let (completer, ticket) = load_ticket();
        assert_eq!(ticket.try_recv(), None);
        completer.resolve(vec![1, 2, 3]);
        assert_eq!(ticket.wait(), LoadOutcome::Resolved(vec![1, 2, 3]));
    }

    #[test]
    fn test_ticket_dropped_completer_rejects() {
        let (completer, ticket) = load_ticket();
        drop(completer);
        assert!(matches!(ticket.wait(), LoadOutcome::Rejected(_)));
    }

    #[test]
    fn test_ticket_across_threads() {
        let (completer, ticket) = load_ticket();
        let handle = std::thread::spawn(move || completer.reject("404"));
        assert_eq!(ticket.wait(), LoadOutcome::Rejected("404".to_string()));
        handle.join().unwrap();
    }
}
