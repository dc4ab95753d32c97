//! Coalesce Accessors - schema generation for accessor-backed properties
//!
//! A host type declares the names it wants routed through the coalesce
//! engine. This crate turns those declarations into the shared
//! [`PropertySchema`](coalesce_core::PropertySchema), skipping any name the
//! host's inheritance chain already defines natively.
//!
//! ```
//! use coalesce_accessors::{reserved_names, AccessorGenerator, TypeChain, TypeLevel};
//!
//! let chain = TypeChain::new().extends(TypeLevel::new("Element", ["id", "title"]));
//! let generated = AccessorGenerator::new(reserved_names(&chain))
//!     .declare("count")
//!     .and_then(|g| g.declare("title"))
//!     .and_then(AccessorGenerator::generate)
//!     .unwrap();
//!
//! assert!(generated.schema.has_accessor("count"));
//! assert_eq!(generated.skipped, vec!["title".to_string()]);
//! ```

mod error;
pub mod generator;
pub mod reserved;

pub use error::{Error, Result};
pub use generator::{AccessorGenerator, GeneratedAccessors};
pub use reserved::{reserved_names, ReservedNames, TypeChain, TypeLevel};
