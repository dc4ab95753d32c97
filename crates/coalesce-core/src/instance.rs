//! Property instance and its flush scheduler
//!
//! A [`PropertyInstance`] owns one [`PropertyStore`] and drives the
//! ready/invalid/flushing state machine around it:
//!
//! ```text
//! Uninitialized ──initialize──▶ Buffering ──ready()──▶ Clean ◀─────────┐
//!                               (writes kept,           │              │
//!                                no flush)         invalidate     flush done
//!                                                       ▼              │
//!                                                    Invalid ──task──▶ Flushing
//! ```
//!
//! Every accepted write while ready schedules at most one flush task on the
//! injected [`Scheduler`]. The task re-checks the `invalid` flag before
//! flushing, so a batch already delivered synchronously is not delivered twice.
//!
//! Writes made by the listener during a flush open a new batch and schedule a
//! new task; they are never merged into the batch being delivered.

use crate::config::{EngineConfig, MisusePolicy};
use crate::detect::{ChangeDetector, StrictEquality};
use crate::error::{Error, Result};
use crate::microtask::{MicrotaskQueue, Scheduler};
use crate::schema::PropertySchema;
use crate::store::{ChangeBatch, PropertyStore};
use crate::{Value, ValueMap};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Receives each flushed batch
pub trait PropertiesChanged {
    /// Called once per flush with every change of the batch.
    ///
    /// Runs on a later microtask than the writes, or synchronously from
    /// [`PropertyInstance::ready`]. Writing to `instance` from here is allowed
    /// and starts the next batch.
    fn properties_changed(&mut self, instance: &PropertyInstance, batch: &ChangeBatch) {
        let _ = (instance, batch);
    }
}

/// Listener that ignores every batch
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl PropertiesChanged for NoopListener {}

impl<F> PropertiesChanged for F
where
    F: FnMut(&PropertyInstance, &ChangeBatch),
{
    fn properties_changed(&mut self, instance: &PropertyInstance, batch: &ChangeBatch) {
        self(instance, batch)
    }
}

/// Observable lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushState {
    /// Storage not initialized yet
    Uninitialized,
    /// Initialized but not ready: writes are stored, nothing is flushed
    Buffering,
    /// Ready with no flush scheduled
    Clean,
    /// Ready with a flush scheduled
    Invalid,
    /// The listener is running
    Flushing,
}

struct Inner {
    schema: Rc<PropertySchema>,
    config: EngineConfig,
    scheduler: Rc<dyn Scheduler>,
    detector: Rc<dyn ChangeDetector>,
    store: RefCell<PropertyStore>,
    listener: RefCell<Box<dyn PropertiesChanged>>,
    initialized: Cell<bool>,
    ready: Cell<bool>,
    invalid: Cell<bool>,
    flush_depth: Cell<u32>,
}

/// Handle to one reactive property instance
///
/// Cloning yields another handle to the same instance. Pending flush tasks
/// only hold a weak reference, so dropping the last handle cancels them.
#[derive(Clone)]
pub struct PropertyInstance {
    inner: Rc<Inner>,
}

impl PropertyInstance {
    /// Start building an instance for `schema`
    pub fn builder(schema: Rc<PropertySchema>) -> PropertyInstanceBuilder {
        PropertyInstanceBuilder::new(schema)
    }

    /// Reset the instance to its construction state and run setup again.
    ///
    /// Shared proto values are written through [`set_property`](Self::set_property);
    /// entries of `fields` named like a declared accessor are moved out of
    /// `fields` and replayed when the instance becomes ready.
    pub fn initialize_properties(&self, fields: &mut ValueMap) -> Result<()> {
        let inner = &self.inner;
        inner.ready.set(false);
        inner.invalid.set(false);
        inner.store.borrow_mut().initialize(&inner.schema, fields);
        inner.initialized.set(true);

        let schema = Rc::clone(&inner.schema);
        self.initialize_proto_properties(schema.proto_values())
    }

    /// Write each shared-level value through the normal setter
    pub fn initialize_proto_properties(&self, props: &ValueMap) -> Result<()> {
        for (name, value) in props {
            self.set_property(name, value.clone())?;
        }
        Ok(())
    }

    /// Write a property and schedule a flush if it changed
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        if self.set_pending_property(name, value)? {
            self.invalidate_properties();
        }
        Ok(())
    }

    /// Write a property without scheduling; returns whether it changed.
    ///
    /// Change detectors run while the store is borrowed and must not call
    /// back into the instance.
    pub fn set_pending_property(&self, name: &str, value: impl Into<Value>) -> Result<bool> {
        self.check_declared(name)?;
        let detector = self
            .inner
            .schema
            .detector_for(name)
            .unwrap_or(&self.inner.detector);
        let changed = self
            .inner
            .store
            .borrow_mut()
            .set_pending_property(name, value.into(), &**detector);
        Ok(changed)
    }

    /// Schedule one flush for the open batch.
    ///
    /// No-op before `ready()` and while a flush is already scheduled.
    pub fn invalidate_properties(&self) {
        let inner = &self.inner;
        if inner.invalid.get() || !inner.ready.get() {
            return;
        }
        inner.invalid.set(true);
        debug!("flush scheduled");

        let weak: Weak<Inner> = Rc::downgrade(inner);
        inner.scheduler.schedule(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.invalid.get() {
                inner.invalid.set(false);
                PropertyInstance { inner }.flush_properties();
            }
        }));
    }

    /// Deliver the open batch to the listener now.
    ///
    /// No-op when no batch is open. Called from inside the listener, the
    /// flush is deferred to a later task instead of nesting.
    pub fn flush_properties(&self) {
        let inner = &self.inner;
        if inner.flush_depth.get() > 0 {
            if inner.store.borrow().has_pending() {
                debug!("nested flush deferred to next task");
                self.invalidate_properties();
            }
            return;
        }

        inner.invalid.set(false);
        let drained = inner.store.borrow_mut().drain_pending();
        let Some(batch) = drained else {
            return;
        };
        debug!(changed = batch.len(), "delivering batch");

        let Ok(mut listener) = inner.listener.try_borrow_mut() else {
            // Listener still on the stack: put the batch back for a later task.
            debug!("listener busy, batch deferred to next task");
            inner.store.borrow_mut().restore_pending(batch);
            self.invalidate_properties();
            return;
        };
        let _depth = DepthGuard::enter(&inner.flush_depth);
        listener.properties_changed(self, &batch);
    }

    /// Mark the instance ready: replay captured instance overrides, then
    /// flush everything accumulated so far, synchronously.
    ///
    /// An instance built with `build_uninitialized` counts as initialized
    /// from here on, with an empty record.
    pub fn ready(&self) -> Result<()> {
        if self.inner.ready.get() {
            match self.inner.config.on_repeated_ready {
                MisusePolicy::Allow => {}
                MisusePolicy::Warn => warn!("ready() called on an instance that is already ready"),
                MisusePolicy::Reject => return Err(Error::AlreadyReady),
            }
        }
        self.inner.ready.set(true);
        self.inner.initialized.set(true);
        self.apply_captured_overrides()?;
        self.flush_properties();
        Ok(())
    }

    /// Replay captured instance overrides through the normal setter; only
    /// the first call does anything.
    pub fn apply_captured_overrides(&self) -> Result<()> {
        let captured = self.inner.store.borrow_mut().take_captured_overrides();
        for (name, value) in captured.into_iter().flatten() {
            self.set_property(&name, value)?;
        }
        Ok(())
    }

    /// Current value of a property (`Undefined` if never written)
    pub fn get(&self, name: &str) -> Value {
        self.inner.store.borrow().get(name)
    }

    /// Run `f` with the live value map
    pub fn with_current<R>(&self, f: impl FnOnce(&ValueMap) -> R) -> R {
        f(self.inner.store.borrow().current())
    }

    /// Check whether a batch is open
    pub fn has_pending(&self) -> bool {
        self.inner.store.borrow().has_pending()
    }

    /// Check whether instance overrides are waiting to be replayed
    pub fn has_captured_overrides(&self) -> bool {
        self.inner.store.borrow().captured_overrides().is_some()
    }

    /// Current lifecycle state
    pub fn state(&self) -> FlushState {
        let inner = &self.inner;
        if !inner.initialized.get() {
            FlushState::Uninitialized
        } else if inner.flush_depth.get() > 0 {
            FlushState::Flushing
        } else if !inner.ready.get() {
            FlushState::Buffering
        } else if inner.invalid.get() {
            FlushState::Invalid
        } else {
            FlushState::Clean
        }
    }

    /// Check whether `ready()` has been called
    pub fn is_ready(&self) -> bool {
        self.inner.ready.get()
    }

    /// Check whether a flush is scheduled
    pub fn is_invalid(&self) -> bool {
        self.inner.invalid.get()
    }

    /// Number of listener calls currently on the stack
    pub fn flush_depth(&self) -> u32 {
        self.inner.flush_depth.get()
    }

    /// The shared schema
    pub fn schema(&self) -> &Rc<PropertySchema> {
        &self.inner.schema
    }

    fn check_declared(&self, name: &str) -> Result<()> {
        if self.inner.schema.has_accessor(name) {
            return Ok(());
        }
        match self.inner.config.on_undeclared_property {
            MisusePolicy::Allow => Ok(()),
            MisusePolicy::Warn => {
                warn!(property = name, "write to a property without an accessor");
                Ok(())
            }
            MisusePolicy::Reject => Err(Error::UnknownProperty(name.to_string())),
        }
    }
}

impl fmt::Debug for PropertyInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInstance")
            .field("state", &self.state())
            .field("store", &self.inner.store)
            .finish()
    }
}

/// Increments the flush depth for as long as it lives
struct DepthGuard<'a>(&'a Cell<u32>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Builder for [`PropertyInstance`]
pub struct PropertyInstanceBuilder {
    schema: Rc<PropertySchema>,
    config: EngineConfig,
    scheduler: Option<Rc<dyn Scheduler>>,
    detector: Rc<dyn ChangeDetector>,
    listener: Box<dyn PropertiesChanged>,
}

impl PropertyInstanceBuilder {
    fn new(schema: Rc<PropertySchema>) -> Self {
        Self {
            schema,
            config: EngineConfig::default(),
            scheduler: None,
            detector: Rc::new(StrictEquality),
            listener: Box::new(NoopListener),
        }
    }

    /// Use `scheduler` for deferred flushes instead of the thread's queue
    pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Use `detector` for properties without their own override
    pub fn detector(mut self, detector: Rc<dyn ChangeDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Deliver batches to `listener`
    pub fn listener(mut self, listener: impl PropertiesChanged + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    /// Apply `config`
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build and initialize with no pre-existing fields
    pub fn build(self) -> Result<PropertyInstance> {
        self.build_with_fields(&mut ValueMap::new())
    }

    /// Build and initialize, capturing declared names out of `fields`
    pub fn build_with_fields(self, fields: &mut ValueMap) -> Result<PropertyInstance> {
        let instance = self.build_uninitialized();
        instance.initialize_properties(fields)?;
        Ok(instance)
    }

    /// Build without running setup; call
    /// [`PropertyInstance::initialize_properties`] before use.
    pub fn build_uninitialized(self) -> PropertyInstance {
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Rc::new(MicrotaskQueue::current()));
        PropertyInstance {
            inner: Rc::new(Inner {
                schema: self.schema,
                config: self.config,
                scheduler,
                detector: self.detector,
                store: RefCell::new(PropertyStore::new()),
                listener: RefCell::new(self.listener),
                initialized: Cell::new(false),
                ready: Cell::new(false),
                invalid: Cell::new(false),
                flush_depth: Cell::new(0),
            }),
        }
    }
}
