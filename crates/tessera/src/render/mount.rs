//! Live state of a mounted page
//!
//! A mount keeps, per tree path, the fetch state of every `dataFetch` node
//! and the controller of every table. Fetch cycles run as spawned tasks and
//! land their result into the slot only if the slot's generation still
//! matches; a changed configuration at the same path bumps the generation so
//! late responses of the old one are dropped. Within a generation every cycle
//! (first fetch, refresh tick, manual refresh) is numbered, and a cycle that
//! lands after a newer one is dropped too. Refresh timers and in-flight
//! cycles stop when the mount is unmounted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tessera_api::{Envelope, TableBlock};

use crate::data::FetchPlan;
use crate::error::{FetchError, TableError};
use crate::table::{QueryParams, TableAction, TableController};

use super::context::RenderServices;

/// Fetch state of one mounted `dataFetch` node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    /// No result has landed for the current generation yet.
    Pending,
    Ready(IndexMap<String, Envelope>),
    Failed(String),
}

struct NodeSlot {
    plan: FetchPlan,
    generation: u64,
    /// Highest cycle number handed out for this generation.
    issued: u64,
    /// Cycle number of the result currently in `state`.
    landed: u64,
    state: NodeState,
    refresh: Option<JoinHandle<()>>,
}

struct TableSlot {
    block: TableBlock,
    controller: TableController,
}

pub struct MountRegistry {
    services: Arc<RenderServices>,
    nodes: Mutex<HashMap<String, NodeSlot>>,
    tables: Mutex<HashMap<String, TableSlot>>,
    /// Paths visited by the current render pass.
    seen: Mutex<HashSet<String>>,
    generations: AtomicU64,
    in_flight: watch::Sender<usize>,
    cancel: CancellationToken,
}

impl MountRegistry {
    pub fn new(services: Arc<RenderServices>) -> Arc<Self> {
        let (in_flight, _) = watch::channel(0usize);
        Arc::new(Self {
            services,
            nodes: Mutex::new(HashMap::new()),
            tables: Mutex::new(HashMap::new()),
            seen: Mutex::new(HashSet::new()),
            generations: AtomicU64::new(0),
            in_flight,
            cancel: CancellationToken::new(),
        })
    }

    pub fn services(&self) -> &Arc<RenderServices> {
        &self.services
    }

    /// Current state of the node at `path`, starting its first fetch cycle
    /// (and refresh timer) when the path is new or its plan changed.
    pub fn observe(self: &Arc<Self>, path: &str, plan: &FetchPlan) -> NodeState {
        self.seen.lock().insert(path.to_string());
        if self.cancel.is_cancelled() {
            return NodeState::Pending;
        }

        let generation = {
            let mut nodes = self.nodes.lock();
            if let Some(slot) = nodes.get(path) {
                if slot.plan == *plan {
                    return slot.state.clone();
                }
                debug!(path, "dataFetch configuration changed, starting a new generation");
            }
            let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
            let previous = nodes.insert(
                path.to_string(),
                NodeSlot {
                    plan: plan.clone(),
                    generation,
                    issued: 0,
                    landed: 0,
                    state: NodeState::Pending,
                    refresh: None,
                },
            );
            if let Some(handle) = previous.and_then(|slot| slot.refresh) {
                handle.abort();
            }
            generation
        };

        self.spawn_cycle(path.to_string(), plan.clone(), generation);

        if let Some(period) = plan.refresh {
            let handle = self.spawn_refresh(path.to_string(), plan.clone(), generation, period);
            match self.nodes.lock().get_mut(path) {
                Some(slot) if slot.generation == generation => slot.refresh = Some(handle),
                _ => handle.abort(),
            }
        }
        NodeState::Pending
    }

    pub fn node_state(&self, path: &str) -> Option<NodeState> {
        self.nodes.lock().get(path).map(|slot| slot.state.clone())
    }

    /// Re-run the fetch cycle of the node at `path` now. The node keeps
    /// showing its current state until the new result lands.
    pub fn refresh(self: &Arc<Self>, path: &str) -> bool {
        let current = self
            .nodes
            .lock()
            .get(path)
            .map(|slot| (slot.plan.clone(), slot.generation));
        match current {
            Some((plan, generation)) if !self.cancel.is_cancelled() => {
                self.spawn_cycle(path.to_string(), plan, generation);
                true
            }
            _ => false,
        }
    }

    /// Number of fetch cycles that have not landed yet.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait until every spawned fetch cycle has landed (or was cancelled).
    pub async fn settled(&self) {
        let mut rx = self.in_flight.subscribe();
        // Err only when the sender is gone, which cannot outlive `self`
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    pub fn is_unmounted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop every refresh timer and abandon in-flight cycles.
    pub fn unmount(&self) {
        self.cancel.cancel();
        for slot in self.nodes.lock().values_mut() {
            if let Some(handle) = slot.refresh.take() {
                handle.abort();
            }
        }
        debug!("Mount cancelled");
    }

    pub(crate) fn begin_pass(&self) {
        self.seen.lock().clear();
    }

    /// Forget nodes and tables the last pass did not reach.
    pub(crate) fn end_pass(&self) {
        let seen = std::mem::take(&mut *self.seen.lock());
        self.nodes.lock().retain(|path, slot| {
            let keep = seen.contains(path);
            if !keep {
                debug!(path = %path, "Dropping unmounted dataFetch node");
                if let Some(handle) = slot.refresh.take() {
                    handle.abort();
                }
            }
            keep
        });
        self.tables.lock().retain(|path, _| seen.contains(path));
    }

    /// Run `f` against the controller of the table at `path`, creating it
    /// (restored from `url`) on first use or when the block changed.
    pub(crate) fn with_table<R>(
        &self,
        path: &str,
        block: &TableBlock,
        url: &QueryParams,
        f: impl FnOnce(&mut TableController) -> R,
    ) -> R {
        self.seen.lock().insert(path.to_string());
        let fallback = self.services.config.default_table_limit;
        let mut tables = self.tables.lock();
        let slot = tables.entry(path.to_string()).or_insert_with(|| TableSlot {
            block: block.clone(),
            controller: TableController::mount(block, fallback, url),
        });
        if slot.block != *block {
            debug!(path, "Table configuration changed, resetting its state");
            *slot = TableSlot {
                block: block.clone(),
                controller: TableController::mount(block, fallback, url),
            };
        }
        f(&mut slot.controller)
    }

    pub fn dispatch_table(&self, path: &str, action: TableAction) -> Result<bool, TableError> {
        let mut tables = self.tables.lock();
        let slot = tables
            .get_mut(path)
            .ok_or_else(|| TableError::UnknownTable(path.to_string()))?;
        slot.controller.dispatch(action)
    }

    /// `current` with the table's URL keys rewritten, when that table syncs to the URL.
    pub fn table_url_query(&self, path: &str, current: &QueryParams) -> Option<QueryParams> {
        self.tables
            .lock()
            .get(path)
            .and_then(|slot| slot.controller.url_query(current))
    }

    pub fn table_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.tables.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn is_current(&self, path: &str, generation: u64) -> bool {
        self.nodes
            .lock()
            .get(path)
            .map(|slot| slot.generation == generation)
            .unwrap_or(false)
    }

    fn spawn_cycle(self: &Arc<Self>, path: String, plan: FetchPlan, generation: u64) {
        let cycle = {
            let mut nodes = self.nodes.lock();
            match nodes.get_mut(&path) {
                Some(slot) if slot.generation == generation => {
                    slot.issued += 1;
                    slot.issued
                }
                _ => return,
            }
        };
        self.in_flight.send_modify(|count| *count += 1);
        let registry: Weak<Self> = Arc::downgrade(self);
        let services = Arc::clone(&self.services);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = plan.run(&services.fetcher) => Some(outcome),
            };
            if let Some(registry) = registry.upgrade() {
                if let Some(outcome) = outcome {
                    registry.land(&path, generation, cycle, outcome);
                }
                registry.in_flight.send_modify(|count| *count = count.saturating_sub(1));
            }
        });
    }

    fn spawn_refresh(
        self: &Arc<Self>,
        path: String,
        plan: FetchPlan,
        generation: u64,
        period: Duration,
    ) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                if !registry.is_current(&path, generation) {
                    break;
                }
                debug!(path = %path, "Refreshing dataFetch");
                registry.spawn_cycle(path.clone(), plan.clone(), generation);
            }
        })
    }

    fn land(
        &self,
        path: &str,
        generation: u64,
        cycle: u64,
        outcome: Result<IndexMap<String, Envelope>, FetchError>,
    ) {
        let mut nodes = self.nodes.lock();
        let Some(slot) = nodes.get_mut(path) else {
            return;
        };
        if slot.generation != generation {
            warn!(
                path,
                generation,
                current = slot.generation,
                "Discarding superseded fetch result"
            );
            return;
        }
        if cycle < slot.landed {
            warn!(path, cycle, landed = slot.landed, "Discarding result of an older refresh cycle");
            return;
        }
        slot.landed = cycle;
        slot.state = match outcome {
            Ok(entries) => NodeState::Ready(entries),
            Err(e) => NodeState::Failed(e.to_string()),
        };
    }
}

impl Drop for MountRegistry {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
