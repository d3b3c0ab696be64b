//! Hyperparameter values and the name-to-setter registry used to tune samplers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{NsError, NsResult};

/// A concrete hyperparameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl ParameterValue {
    pub fn as_f64(&self) -> NsResult<f64> {
        match self {
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::Bool(_) => Err(NsError::Validation(format!(
                "expected a numeric value, got {self}"
            ))),
        }
    }

    /// Integer view; floats are accepted only when they have no fractional part.
    pub fn as_i64(&self) -> NsResult<i64> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => Ok(*v as i64),
            Self::Float(v) => Err(NsError::Validation(format!(
                "expected an integer value, got {v} (use int_only when tuning integer parameters)"
            ))),
            Self::Bool(_) => Err(NsError::Validation(format!(
                "expected an integer value, got {self}"
            ))),
        }
    }

    pub fn as_usize(&self) -> NsResult<usize> {
        let v = self.as_i64()?;
        usize::try_from(v)
            .map_err(|_| NsError::Validation(format!("expected a non-negative integer, got {v}")))
    }

    pub fn as_u64(&self) -> NsResult<u64> {
        let v = self.as_i64()?;
        u64::try_from(v)
            .map_err(|_| NsError::Validation(format!("expected a non-negative integer, got {v}")))
    }

    pub fn as_bool(&self) -> NsResult<bool> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(NsError::Validation(format!(
                "expected a boolean value, got {other}"
            ))),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Bool(_))
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for ParameterValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Setter applying one named value to a configuration struct.
pub type ParameterSetter<C> = fn(&mut C, &ParameterValue) -> NsResult<()>;

/// Maps hyperparameter names to typed setters for one configuration type.
///
/// Built once per sampler type; lookups are by exact name.
pub struct ParameterRegistry<C> {
    setters: Vec<(&'static str, ParameterSetter<C>)>,
}

impl<C> ParameterRegistry<C> {
    pub fn new() -> Self {
        Self {
            setters: Vec::new(),
        }
    }

    pub fn register(mut self, name: &'static str, setter: ParameterSetter<C>) -> Self {
        self.setters.retain(|(existing, _)| *existing != name);
        self.setters.push((name, setter));
        self
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.setters.iter().map(|(name, _)| *name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.setters.iter().any(|(existing, _)| *existing == name)
    }

    pub fn apply(&self, target: &mut C, name: &str, value: &ParameterValue) -> NsResult<()> {
        let (_, setter) = self
            .setters
            .iter()
            .find(|(existing, _)| *existing == name)
            .ok_or_else(|| {
                NsError::Config(format!(
                    "unknown parameter '{name}' (known: {})",
                    self.names().join(", ")
                ))
            })?;
        setter(target, value)
    }
}

impl<C> Default for ParameterRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ParameterRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterRegistry")
            .field("names", &self.names())
            .finish()
    }
}
