use std::fmt::{self, Debug, Display, Formatter};
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use slab::Slab;

use crate::callback::Callback;
use crate::config::Config;
use crate::cursor::CallCursor;
use crate::dependency::IntoDeps;
use crate::error::{HookError, HookResult};
use crate::hash::CallSite;
use crate::slot::{Slot, SlotError, SlotTable};

/// Identifies a mounted component instance.
///
/// Ids are never reused: once its instance is unmounted, an id stays dead even
/// if its registry entry is recycled for another instance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct InstanceId {
    /// The key in the registry.
    key: usize,
    /// Distinguishes instances that share a recycled key.
    generation: u64,
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}v{}", self.key, self.generation)
    }
}

/// Counters describing the life of an instance.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct InstanceStats {
    /// Passes that ran to completion and passed the call-order check.
    pub passes: usize,
    /// Passes that returned an error.
    pub aborted: usize,
    /// `memoize` calls that returned a cached payload.
    pub hits: usize,
    /// `memoize` calls that ran their producer.
    pub misses: usize,
}

/// The registry entry of a mounted instance.
struct InstanceCell {
    id: InstanceId,
    /// The name used in diagnostics, like `Counter#3v7`.
    label: String,
    /// Cleared on unmount, possibly while a pass is running.
    alive: AtomicBool,
    /// Locked for the duration of a render pass.
    state: Mutex<Instance>,
}

impl InstanceCell {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// The mutable state of an instance.
#[derive(Default)]
struct Instance {
    table: SlotTable,
    /// The slot count at the end of the last completed pass.
    completed: Option<usize>,
    stats: InstanceStats,
}

/// Runs render passes for component instances and owns their slot tables.
///
/// Passes of distinct instances are independent and may run on different
/// threads. At most one pass runs per instance at a time.
pub struct Runtime {
    config: Config,
    instances: RwLock<Slab<Arc<InstanceCell>>>,
    generation: AtomicU64,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            instances: RwLock::new(Slab::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// The runtime's configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Mount a new instance with an empty slot table.
    ///
    /// The `name` shows up in diagnostics.
    pub fn mount(&self, name: impl Into<String>) -> InstanceId {
        let name = name.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut instances = self.instances.write();
        let entry = instances.vacant_entry();
        let id = InstanceId { key: entry.key(), generation };
        let label = format!("{name}#{id}");
        tracing::debug!(instance = %label, "mounted");
        entry.insert(Arc::new(InstanceCell {
            id,
            label,
            alive: AtomicBool::new(true),
            state: Mutex::new(Instance::default()),
        }));
        id
    }

    /// Unmount an instance and release all payloads held by its slots.
    ///
    /// If the instance is rendering right now, its remaining `memoize` calls
    /// fail with [`HookError::MissingInstanceContext`] and the slots are
    /// released as soon as the pass ends.
    ///
    /// Returns whether the instance was mounted.
    pub fn unmount(&self, id: InstanceId) -> bool {
        let cell = {
            let mut instances = self.instances.write();
            if !instances.get(id.key).is_some_and(|cell| cell.id == id) {
                return false;
            }
            instances.remove(id.key)
        };

        cell.alive.store(false, Ordering::Release);
        match cell.state.try_lock() {
            Some(mut state) => {
                state.table.destroy();
                tracing::debug!(instance = %cell.label, "unmounted");
            }
            None => {
                tracing::debug!(instance = %cell.label, "unmounted while rendering");
            }
        }

        true
    }

    /// Unmount all instances.
    pub fn unmount_all(&self) {
        let ids: Vec<_> = self.instances.read().iter().map(|(_, cell)| cell.id).collect();
        for id in ids {
            self.unmount(id);
        }
    }

    /// Whether the instance is mounted.
    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.cell(id).is_some()
    }

    /// The number of mounted instances.
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Whether no instance is mounted.
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// The number of slots in an instance's table, or `None` if the instance
    /// is not mounted or currently rendering.
    pub fn slot_count(&self, id: InstanceId) -> Option<usize> {
        let cell = self.cell(id)?;
        let state = cell.state.try_lock()?;
        Some(state.table.len())
    }

    /// The counters of an instance, or `None` if the instance is not mounted
    /// or currently rendering.
    pub fn stats(&self, id: InstanceId) -> Option<InstanceStats> {
        let cell = self.cell(id)?;
        let state = cell.state.try_lock()?;
        Some(state.stats)
    }

    /// Run one render pass of an instance.
    ///
    /// The `routine` receives a fresh [`RenderContext`] and must call
    /// [`memoize`](RenderContext::memoize) the same number of times and in the
    /// same order on every pass. If it returns an error, the pass is aborted:
    /// slot updates made so far are kept, but the call count is not checked.
    ///
    /// Fails with [`HookError::MissingInstanceContext`] if the instance is not
    /// mounted, with [`HookError::PassInProgress`] if it is already rendering
    /// and, when diagnostics are enabled, with
    /// [`HookError::CallOrderViolation`] if the call count changed.
    pub fn render<R, E, F>(&self, id: InstanceId, routine: F) -> Result<R, E>
    where
        E: From<HookError>,
        F: FnOnce(&mut RenderContext<'_>) -> Result<R, E>,
    {
        let cell = self.cell(id).ok_or(HookError::MissingInstanceContext)?;
        let Some(mut state) = cell.state.try_lock() else {
            return Err(HookError::PassInProgress { instance: cell.label.clone() }.into());
        };

        // The instance may have been unmounted between the lookup and the
        // lock.
        if !cell.is_alive() {
            return Err(HookError::MissingInstanceContext.into());
        }

        let span = tracing::debug_span!("render", instance = %cell.label);
        let _enter = span.enter();

        let mut cx = RenderContext {
            cell: &*cell,
            instance: &mut *state,
            cursor: CallCursor::new(),
            diagnostics: self.config.diagnostics,
        };

        let result = routine(&mut cx);
        let cursor = cx.cursor;

        if !cell.is_alive() {
            state.table.destroy();
            tracing::debug!("released slots after unmount");
            return result;
        }

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                state.stats.aborted += 1;
                tracing::debug!(position = cursor.position(), "pass aborted");
                return Err(err);
            }
        };

        if self.config.diagnostics {
            if let Err((expected, actual)) = cursor.check(state.completed) {
                tracing::warn!(expected, actual, "memoize call count changed");
                state.stats.aborted += 1;
                return Err(HookError::CallOrderViolation {
                    instance: cell.label.clone(),
                    expected,
                    actual,
                }
                .into());
            }
        }

        state.completed = Some(cursor.position());
        state.stats.passes += 1;
        Ok(output)
    }

    /// Look up a mounted instance.
    fn cell(&self, id: InstanceId) -> Option<Arc<InstanceCell>> {
        self.instances
            .read()
            .get(id.key)
            .filter(|cell| cell.id == id)
            .cloned()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.unmount_all();
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("instances", &self.len())
            .finish()
    }
}

/// The context of one render pass.
///
/// Handed to the render routine by [`Runtime::render`] and threaded through
/// to every `memoize` call of the pass.
pub struct RenderContext<'a> {
    cell: &'a InstanceCell,
    instance: &'a mut Instance,
    cursor: CallCursor,
    diagnostics: bool,
}

impl RenderContext<'_> {
    /// The instance being rendered.
    pub fn instance(&self) -> InstanceId {
        self.cell.id
    }

    /// The index of the slot the next `memoize` call will use.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Return the payload cached in this call's slot, or produce a new one.
    ///
    /// The `producer` runs exactly once if the slot is fresh or the
    /// dependencies changed, and not at all otherwise. Passing `None` as the
    /// dependencies recomputes on every pass, while an empty snapshot computes
    /// only once.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use memoslot::{Runtime, HookError, deps};
    ///
    /// let runtime = Runtime::new();
    /// let id = runtime.mount("Greeting");
    /// let render = |name: &'static str| {
    ///     runtime.render(id, |cx| {
    ///         cx.memoize(|| Arc::new(format!("Hello, {name}!")), deps![name])
    ///     })
    /// };
    ///
    /// let first = render("World")?;
    /// let second = render("World")?;
    /// assert!(Arc::ptr_eq(&first, &second));
    /// # Ok::<(), HookError>(())
    /// ```
    #[track_caller]
    pub fn memoize<T, F>(
        &mut self,
        producer: F,
        deps: impl IntoDeps,
    ) -> HookResult<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T,
    {
        self.try_memoize(|| Ok(producer()), deps)
    }

    /// Like [`memoize`](Self::memoize), but with a fallible producer.
    ///
    /// If the producer fails, its error is returned and the slot keeps its
    /// previous state, so a later pass recomputes.
    #[track_caller]
    pub fn try_memoize<T, E, F>(
        &mut self,
        producer: F,
        deps: impl IntoDeps,
    ) -> Result<T, E>
    where
        T: Clone + Send + 'static,
        E: From<HookError>,
        F: FnOnce() -> Result<T, E>,
    {
        let site = CallSite::new(Location::caller());
        let deps = deps.into_deps();
        let index = self.cursor.position();
        let (cell, diagnostics) = (self.cell, self.diagnostics);
        let slot = self.slot(site)?;

        if diagnostics && slot.is_populated() && !slot.holds::<T>() {
            let expected = slot.payload_type().unwrap_or_default();
            let actual = std::any::type_name::<T>();
            tracing::warn!(slot = index, expected, actual, "memoize payload type changed");
            return Err(HookError::PayloadTypeMismatch {
                instance: cell.label.clone(),
                slot: index,
                expected,
                actual,
            }
            .into());
        }

        if let Some(payload) = slot.lookup::<T>(deps.as_ref()) {
            self.instance.stats.hits += 1;
            tracing::trace!(slot = index, "hit");

            #[cfg(feature = "testing")]
            crate::testing::register_hit();

            return Ok(payload);
        }

        let payload = producer()?;
        slot.store(payload.clone(), deps);
        self.instance.stats.misses += 1;
        tracing::trace!(slot = index, "miss");

        #[cfg(feature = "testing")]
        crate::testing::register_miss();

        Ok(payload)
    }

    /// Memoize a callback whose identity stays stable while the dependencies
    /// are unchanged.
    #[track_caller]
    pub fn callback<A, R, F>(
        &mut self,
        f: F,
        deps: impl IntoDeps,
    ) -> HookResult<Callback<A, R>>
    where
        A: 'static,
        R: 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.memoize(move || Callback::new(f), deps)
    }

    /// Visit the slot at the cursor and advance.
    fn slot(&mut self, site: CallSite) -> HookResult<&mut Slot> {
        if !self.cell.is_alive() {
            return Err(HookError::MissingInstanceContext);
        }

        let cell = self.cell;
        let index = self.cursor.advance();

        // Extra calls are rejected before they create a slot.
        if self.diagnostics {
            if let Some(expected) = self.instance.completed.filter(|&n| index >= n) {
                tracing::warn!(slot = index, expected, "memoize called too often");
                return Err(HookError::CallOrderViolation {
                    instance: cell.label.clone(),
                    expected,
                    actual: index + 1,
                });
            }
        }

        let slot = match self.instance.table.ensure_slot(index, site) {
            Ok(slot) => slot,
            Err(SlotError::Destroyed) => return Err(HookError::MissingInstanceContext),
            Err(SlotError::Skipped { len }) => {
                tracing::warn!(slot = index, len, "memoize call skipped a slot");
                return Err(HookError::CallOrderViolation {
                    instance: cell.label.clone(),
                    expected: len,
                    actual: index + 1,
                });
            }
        };

        if self.diagnostics && slot.site() != site {
            tracing::warn!(
                slot = index,
                expected = %slot.site().location(),
                actual = %site.location(),
                "memoize call site changed"
            );
            return Err(HookError::CallSiteMismatch {
                instance: cell.label.clone(),
                slot: index,
                expected: slot.site().location().to_string(),
                actual: site.location().to_string(),
            });
        }

        Ok(slot)
    }
}

impl Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("instance", &self.cell.label)
            .field("position", &self.cursor.position())
            .finish()
    }
}
