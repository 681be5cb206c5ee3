//! Typed component parameters and their resolution against system parameters.

use core::fmt;
use std::collections::BTreeMap;

use tlm_core::Real;

use crate::error::{ComponentError, ComponentResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Real,
    Integer,
    Bool,
    Text,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParameterKind::Real => "real",
            ParameterKind::Integer => "integer",
            ParameterKind::Bool => "bool",
            ParameterKind::Text => "text",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Real(Real),
    Integer(i64),
    Bool(bool),
    Text(String),
    /// Late-bound reference to a system parameter of the containing system.
    SystemRef(String),
}

impl ParameterValue {
    /// `None` for an unresolved [`ParameterValue::SystemRef`].
    pub fn kind(&self) -> Option<ParameterKind> {
        match self {
            ParameterValue::Real(_) => Some(ParameterKind::Real),
            ParameterValue::Integer(_) => Some(ParameterKind::Integer),
            ParameterValue::Bool(_) => Some(ParameterKind::Bool),
            ParameterValue::Text(_) => Some(ParameterKind::Text),
            ParameterValue::SystemRef(_) => None,
        }
    }

    pub fn as_real(&self) -> Option<Real> {
        match *self {
            ParameterValue::Real(v) => Some(v),
            ParameterValue::Integer(v) => Some(v as Real),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            ParameterValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ParameterValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to `kind`, allowing integer to real widening.
    fn coerce(self, name: &str, kind: ParameterKind) -> ComponentResult<ParameterValue> {
        match (self, kind) {
            (ParameterValue::Integer(v), ParameterKind::Real) => Ok(ParameterValue::Real(v as Real)),
            (v, k) if v.kind() == Some(k) => Ok(v),
            (v, k) => Err(ComponentError::ParameterType {
                name: name.to_owned(),
                expected: k,
                found: v.kind().unwrap_or(ParameterKind::Text),
            }),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Real(v) => write!(f, "{v}"),
            ParameterValue::Integer(v) => write!(f, "{v}"),
            ParameterValue::Bool(v) => write!(f, "{v}"),
            ParameterValue::Text(v) => f.write_str(v),
            ParameterValue::SystemRef(name) => write!(f, "${name}"),
        }
    }
}

impl From<Real> for ParameterValue {
    fn from(v: Real) -> Self {
        ParameterValue::Real(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Integer(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_owned())
    }
}

/// Declared parameter; its kind is the kind of `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub default: ParameterValue,
}

impl ParameterSpec {
    pub fn kind(&self) -> ParameterKind {
        self.default.kind().unwrap_or(ParameterKind::Real)
    }
}

/// Fully resolved parameter values handed to `initialize`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParameterValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    fn require(&self, name: &str) -> ComponentResult<&ParameterValue> {
        self.values
            .get(name)
            .ok_or_else(|| ComponentError::UnknownParameter {
                name: name.to_owned(),
            })
    }

    fn mismatch(name: &str, expected: ParameterKind, found: &ParameterValue) -> ComponentError {
        ComponentError::ParameterType {
            name: name.to_owned(),
            expected,
            found: found.kind().unwrap_or(ParameterKind::Text),
        }
    }

    pub fn real(&self, name: &str) -> ComponentResult<Real> {
        let v = self.require(name)?;
        v.as_real()
            .ok_or_else(|| Self::mismatch(name, ParameterKind::Real, v))
    }

    pub fn integer(&self, name: &str) -> ComponentResult<i64> {
        let v = self.require(name)?;
        v.as_integer()
            .ok_or_else(|| Self::mismatch(name, ParameterKind::Integer, v))
    }

    pub fn boolean(&self, name: &str) -> ComponentResult<bool> {
        let v = self.require(name)?;
        v.as_bool()
            .ok_or_else(|| Self::mismatch(name, ParameterKind::Bool, v))
    }

    pub fn text(&self, name: &str) -> ComponentResult<&str> {
        let v = self.require(name)?;
        v.as_text()
            .ok_or_else(|| Self::mismatch(name, ParameterKind::Text, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve declared parameters against instance overrides and the
/// containing system's parameters.
///
/// Each value is the override if present, else the declared default. A
/// [`ParameterValue::SystemRef`] is looked up through `system` and the
/// result checked against the declared kind.
pub fn resolve_parameters<'s>(
    specs: &[ParameterSpec],
    overrides: &BTreeMap<String, ParameterValue>,
    system: impl Fn(&str) -> Option<&'s ParameterValue>,
) -> ComponentResult<ParameterSet> {
    if let Some(unknown) = overrides
        .keys()
        .find(|name| !specs.iter().any(|s| &s.name == *name))
    {
        return Err(ComponentError::UnknownParameter {
            name: unknown.clone(),
        });
    }

    let mut set = ParameterSet::new();
    for spec in specs {
        let raw = overrides.get(&spec.name).unwrap_or(&spec.default);
        let value = match raw {
            ParameterValue::SystemRef(target) => {
                system(target)
                    .cloned()
                    .ok_or_else(|| ComponentError::Unresolved {
                        name: spec.name.clone(),
                        target: target.clone(),
                    })?
            }
            v => v.clone(),
        };
        if let ParameterValue::SystemRef(target) = &value {
            return Err(ComponentError::Unresolved {
                name: spec.name.clone(),
                target: target.clone(),
            });
        }
        set.insert(spec.name.clone(), value.coerce(&spec.name, spec.kind())?);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, default: ParameterValue) -> ParameterSpec {
        ParameterSpec {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            default,
        }
    }

    #[test]
    fn defaults_and_overrides() {
        let specs = [spec("k", 1.0_f64.into()), spec("n", 2_i64.into())];
        let mut overrides = BTreeMap::new();
        overrides.insert("k".to_owned(), ParameterValue::Integer(3));

        let set = resolve_parameters(&specs, &overrides, |_| None).unwrap();
        assert_eq!(set.real("k").unwrap(), 3.0);
        assert_eq!(set.integer("n").unwrap(), 2);
        assert!(set.boolean("n").is_err());
    }

    #[test]
    fn system_references_resolve() {
        let specs = [spec("k", 1.0_f64.into())];
        let mut overrides = BTreeMap::new();
        overrides.insert("k".to_owned(), ParameterValue::SystemRef("gain".into()));
        let gain = ParameterValue::Real(4.5);

        let set = resolve_parameters(&specs, &overrides, |n| (n == "gain").then_some(&gain)).unwrap();
        assert_eq!(set.real("k").unwrap(), 4.5);

        let err = resolve_parameters(&specs, &overrides, |_| None).unwrap_err();
        assert_eq!(
            err,
            ComponentError::Unresolved {
                name: "k".into(),
                target: "gain".into()
            }
        );
    }

    #[test]
    fn mistyped_values_are_rejected() {
        let specs = [spec("on", true.into())];
        let mut overrides = BTreeMap::new();
        overrides.insert("on".to_owned(), ParameterValue::Real(1.0));
        assert!(matches!(
            resolve_parameters(&specs, &overrides, |_| None),
            Err(ComponentError::ParameterType {
                expected: ParameterKind::Bool,
                found: ParameterKind::Real,
                ..
            })
        ));

        overrides.clear();
        overrides.insert("off".to_owned(), ParameterValue::Bool(false));
        assert!(matches!(
            resolve_parameters(&specs, &overrides, |_| None),
            Err(ComponentError::UnknownParameter { .. })
        ));
    }
}
