//! Accessor generation
//!
//! Turns a host type's declared property names into the shared
//! [`PropertySchema`] that every instance of the type refers to. Names the
//! denylist reserves are skipped rather than shadowed.

use crate::error::{Error, Result};
use crate::reserved::ReservedNames;
use coalesce_core::{ChangeDetector, PropertySchema, Value, ValueMap};
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

/// Output of [`AccessorGenerator::generate`]
#[derive(Debug)]
pub struct GeneratedAccessors {
    /// Shared schema for every instance of the host type
    pub schema: Rc<PropertySchema>,
    /// Declared names left without an accessor because they are reserved
    pub skipped: Vec<String>,
}

/// Collects declarations for one host type
pub struct AccessorGenerator {
    reserved: ReservedNames,
    declared: IndexMap<String, Option<Rc<dyn ChangeDetector>>>,
    proto_values: ValueMap,
}

impl AccessorGenerator {
    /// Create a generator that will not shadow anything in `reserved`
    pub fn new(reserved: ReservedNames) -> Self {
        Self {
            reserved,
            declared: IndexMap::new(),
            proto_values: ValueMap::new(),
        }
    }

    /// Declare a property using the instance's change detector
    pub fn declare(self, name: impl Into<String>) -> Result<Self> {
        self.insert(name.into(), None)
    }

    /// Declare a property with its own change detector
    pub fn declare_with_detector(
        self,
        name: impl Into<String>,
        detector: Rc<dyn ChangeDetector>,
    ) -> Result<Self> {
        self.insert(name.into(), Some(detector))
    }

    /// Record a value that sat at the shared level under `name` before the
    /// accessor took it over. Each new instance replays it on setup.
    pub fn with_proto_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.proto_values.insert(name.into(), value.into());
        self
    }

    /// Build the shared schema
    pub fn generate(self) -> Result<GeneratedAccessors> {
        let mut skipped = Vec::new();
        let mut builder = PropertySchema::builder();

        for (name, detector) in self.declared {
            if self.reserved.contains(&name) {
                debug!(property = %name, "skipping reserved name");
                skipped.push(name);
                continue;
            }
            builder = match detector {
                Some(detector) => builder.property_with_detector(name, detector)?,
                None => builder.property(name)?,
            };
        }
        for (name, value) in self.proto_values {
            if skipped.contains(&name) {
                continue;
            }
            builder = builder.proto_value(name, value)?;
        }

        let schema = builder.build();
        debug!(
            accessors = schema.len(),
            skipped = skipped.len(),
            "generated accessors"
        );
        Ok(GeneratedAccessors { schema, skipped })
    }

    fn insert(mut self, name: String, detector: Option<Rc<dyn ChangeDetector>>) -> Result<Self> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidName(name));
        }
        if self.declared.contains_key(&name) {
            return Err(coalesce_core::Error::DuplicateProperty(name).into());
        }
        self.declared.insert(name, detector);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reserved::{reserved_names, TypeChain, TypeLevel};
    use coalesce_core::ValueEquality;

    fn reserved() -> ReservedNames {
        reserved_names(&TypeChain::new().extends(TypeLevel::new("Element", ["id", "title"])))
    }

    #[test]
    fn test_reserved_names_are_skipped() {
        let generated = AccessorGenerator::new(reserved())
            .declare("count")
            .and_then(|g| g.declare("title"))
            .and_then(|g| g.declare("label"))
            .and_then(AccessorGenerator::generate)
            .expect("generate");

        assert_eq!(
            generated.schema.names().collect::<Vec<_>>(),
            vec!["count", "label"]
        );
        assert_eq!(generated.skipped, vec!["title".to_string()]);
    }

    #[test]
    fn test_detector_and_proto_values_carried() {
        let generated = AccessorGenerator::new(ReservedNames::none())
            .declare_with_detector("items", Rc::new(ValueEquality))
            .map(|g| g.with_proto_value("items", Value::list([])))
            .and_then(AccessorGenerator::generate)
            .expect("generate");

        assert!(generated.schema.detector_for("items").is_some());
        assert!(generated.schema.proto_values().contains_key("items"));
    }

    #[test]
    fn test_proto_value_of_skipped_name_dropped() {
        let generated = AccessorGenerator::new(reserved())
            .declare("id")
            .map(|g| g.with_proto_value("id", "x"))
            .and_then(AccessorGenerator::generate)
            .expect("generate");
        assert!(generated.schema.is_empty());
        assert!(generated.schema.proto_values().is_empty());
    }

    #[test]
    fn test_proto_value_for_undeclared_name_fails() {
        let err = AccessorGenerator::new(ReservedNames::none())
            .with_proto_value("ghost", 1i64)
            .generate()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(coalesce_core::Error::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_invalid_and_duplicate_names() {
        assert!(matches!(
            AccessorGenerator::new(ReservedNames::none()).declare(""),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            AccessorGenerator::new(ReservedNames::none())
                .declare("a")
                .and_then(|g| g.declare("a")),
            Err(Error::Core(coalesce_core::Error::DuplicateProperty(_)))
        ));
    }
}
