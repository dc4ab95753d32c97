//! Change-detection policy
//!
//! A write is only recorded when the active [`ChangeDetector`] reports a
//! change. The default policy is strict equality with one exception: writing
//! NaN over NaN is not a change.

use crate::Value;

/// Decides whether a write counts as a change
pub trait ChangeDetector {
    /// Return true if writing `value` over `old` should be recorded and
    /// scheduled for notification.
    fn should_change(&self, name: &str, value: &Value, old: &Value) -> bool {
        default_should_change(name, value, old)
    }
}

/// The default policy: NaN over NaN is unchanged, otherwise changed unless
/// strictly equal. Lists and maps are strictly equal only when they are the
/// same reference, so a freshly allocated list always counts as a change.
pub fn default_should_change(_name: &str, value: &Value, old: &Value) -> bool {
    if value.is_nan() && old.is_nan() {
        return false;
    }
    !old.strict_eq(value)
}

/// Strict/reference equality (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictEquality;

impl ChangeDetector for StrictEquality {}

/// Structural equality for hosts that treat lists and maps as immutable data
///
/// A new list with the same contents as the old one is not a change.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueEquality;

impl ChangeDetector for ValueEquality {
    fn should_change(&self, _name: &str, value: &Value, old: &Value) -> bool {
        if value.is_nan() && old.is_nan() {
            return false;
        }
        !(old.strict_eq(value) || old == value)
    }
}
