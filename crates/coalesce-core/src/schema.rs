//! Shared accessor metadata
//!
//! A [`PropertySchema`] is built once per host type and shared by every
//! instance through an `Rc`. Instances only hold per-instance mutable state
//! and look names up here.

use crate::detect::ChangeDetector;
use crate::error::{Error, Result};
use crate::{Value, ValueMap};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Immutable set of declared accessor properties
#[derive(Default)]
pub struct PropertySchema {
    /// Declared names with an optional per-property detector
    properties: IndexMap<String, Option<Rc<dyn ChangeDetector>>>,
    /// Values found at the shared level under names accessors took over
    proto_values: ValueMap,
}

impl PropertySchema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Check whether `name` has a generated accessor
    pub fn has_accessor(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Declared names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of declared properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Detector override for one property, if any
    pub fn detector_for(&self, name: &str) -> Option<&Rc<dyn ChangeDetector>> {
        self.properties.get(name).and_then(Option::as_ref)
    }

    /// Shared-level values replayed into each new instance
    pub fn proto_values(&self) -> &ValueMap {
        &self.proto_values
    }
}

impl fmt::Debug for PropertySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overridden: Vec<&str> = self
            .properties
            .iter()
            .filter(|(_, d)| d.is_some())
            .map(|(n, _)| n.as_str())
            .collect();
        f.debug_struct("PropertySchema")
            .field("names", &self.properties.keys().collect::<Vec<_>>())
            .field("detector_overrides", &overridden)
            .field("proto_values", &self.proto_values)
            .finish()
    }
}

/// Builder for [`PropertySchema`]
#[derive(Default)]
pub struct SchemaBuilder {
    schema: PropertySchema,
}

impl SchemaBuilder {
    /// Declare a property using the instance's detector
    pub fn property(self, name: impl Into<String>) -> Result<Self> {
        self.declare(name.into(), None)
    }

    /// Declare a property with its own change detector
    pub fn property_with_detector(
        self,
        name: impl Into<String>,
        detector: Rc<dyn ChangeDetector>,
    ) -> Result<Self> {
        self.declare(name.into(), Some(detector))
    }

    /// Record a shared-level value for an already declared property
    pub fn proto_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        let name = name.into();
        if !self.schema.has_accessor(&name) {
            return Err(Error::UnknownProperty(name));
        }
        self.schema.proto_values.insert(name, value.into());
        Ok(self)
    }

    /// Finish and share the schema
    pub fn build(self) -> Rc<PropertySchema> {
        Rc::new(self.schema)
    }

    fn declare(
        mut self,
        name: String,
        detector: Option<Rc<dyn ChangeDetector>>,
    ) -> Result<Self> {
        if self.schema.properties.contains_key(&name) {
            return Err(Error::DuplicateProperty(name));
        }
        self.schema.properties.insert(name, detector);
        Ok(self)
    }
}
