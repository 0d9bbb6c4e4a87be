use crate::{ResourceName, ScopeValue, ScopesRecord};

/// Name-addressed access to the record's slots.
///
/// Names are resolved with [`ResourceName::resolve_field`]; a name that does
/// not resolve is reported as absent (`get`) or not settable (`set`), never as
/// an error.
impl ScopesRecord {
    pub fn get(&self, name: &str) -> Option<&ScopeValue> {
        ResourceName::resolve_field(name).and_then(|n| self.slot(n).as_ref())
    }

    /// Replaces the named slot wholesale; `None` clears it. Returns `false`
    /// when `name` does not name a slot.
    pub fn set(&mut self, name: &str, value: Option<ScopeValue>) -> bool {
        match ResourceName::resolve_field(name) {
            Some(n) => {
                *self.slot_mut(n) = value;
                true
            }
            None => false,
        }
    }

    /// Present slots in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceName, &ScopeValue)> + '_ {
        ResourceName::ALL
            .iter()
            .filter_map(move |&n| self.slot(n).as_ref().map(|v| (n, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}
