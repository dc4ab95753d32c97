//! Coalesce Core - per-instance reactive property batching
//!
//! This crate provides the engine behind accessor-backed reactive properties:
//! - Dynamic values (`Value`, `ValueMap`) with strict/reference equality
//! - Change detection policies (`ChangeDetector`)
//! - Per-instance storage of current, pending and old values (`PropertyStore`)
//! - A ready/invalid/flushing state machine that delivers every change made in
//!   one synchronous turn as a single batch (`PropertyInstance`)
//! - An injectable FIFO microtask queue for the deferred flush (`MicrotaskQueue`)
//!
//! ## Example
//!
//! ```
//! use coalesce_core::{ChangeBatch, MicrotaskQueue, PropertyInstance, PropertySchema, Value};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let schema = PropertySchema::builder()
//!     .property("count")
//!     .unwrap()
//!     .build();
//! let queue = MicrotaskQueue::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//!
//! let instance = PropertyInstance::builder(schema)
//!     .scheduler(Rc::new(queue.clone()))
//!     .listener(move |_: &PropertyInstance, batch: &ChangeBatch| {
//!         sink.borrow_mut().push(batch.changed.clone());
//!     })
//!     .build()
//!     .unwrap();
//! instance.ready().unwrap();
//!
//! instance.set_property("count", 1i64).unwrap();
//! instance.set_property("count", 2i64).unwrap();
//! queue.run_until_idle();
//!
//! assert_eq!(seen.borrow().len(), 1);
//! assert_eq!(seen.borrow()[0].get("count"), Some(&Value::Int(2)));
//! ```

pub mod config;
pub mod detect;
mod error;
pub mod instance;
pub mod microtask;
pub mod schema;
pub mod store;
mod value;

pub use config::{EngineConfig, MisusePolicy};
pub use detect::{default_should_change, ChangeDetector, StrictEquality, ValueEquality};
pub use error::{Error, Result};
pub use instance::{
    FlushState, NoopListener, PropertiesChanged, PropertyInstance, PropertyInstanceBuilder,
};
pub use microtask::{MicrotaskQueue, Scheduler, Task};
pub use schema::{PropertySchema, SchemaBuilder};
pub use store::{ChangeBatch, PropertyStore};
pub use value::{Value, ValueMap};
