use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::QuantityError;

pub const MIB_PER_GIB: f64 = 1024.0;
const MILLICORES_PER_CORE: f64 = 1000.0;

/// A resource amount in Kubernetes units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Millicores(u64),
    Cores(u64),
    Mebibytes(u64),
    Gibibytes(u64),
}

impl Quantity {
    /// Millicores below one core, whole cores from one upwards.
    /// Values that round to `0m` are clamped to `1m`.
    pub fn cpu(cores: f64) -> Result<Self, QuantityError> {
        check_magnitude(cores)?;
        if cores < 1.0 {
            let millicores = (cores * MILLICORES_PER_CORE).round() as u64;
            Ok(Self::Millicores(millicores.max(1)))
        } else {
            Ok(Self::Cores(cores.round() as u64))
        }
    }

    /// Mebibytes below 1024, gibibytes from 1024 upwards.
    /// Values that round to `0Mi` are clamped to `1Mi`.
    pub fn memory(mebibytes: f64) -> Result<Self, QuantityError> {
        check_magnitude(mebibytes)?;
        if mebibytes >= MIB_PER_GIB {
            Ok(Self::Gibibytes((mebibytes / MIB_PER_GIB).round() as u64))
        } else {
            Ok(Self::Mebibytes((mebibytes.round() as u64).max(1)))
        }
    }

    /// Keeps a configured CPU amount as written: whole cores stay cores,
    /// anything fractional is carried in millicores.
    pub fn exact_cpu(cores: f64) -> Result<Self, QuantityError> {
        check_magnitude(cores)?;
        if cores.fract() == 0.0 {
            Ok(Self::Cores(cores as u64))
        } else {
            Ok(Self::Millicores((cores * MILLICORES_PER_CORE).round() as u64))
        }
    }

    /// Keeps a configured memory amount as written: exact multiples of 1Gi
    /// stay in Gi, everything else is carried in Mi.
    pub fn exact_memory(mebibytes: f64) -> Result<Self, QuantityError> {
        check_magnitude(mebibytes)?;
        let mib = mebibytes.round();
        if mib > 0.0 && mib % MIB_PER_GIB == 0.0 {
            Ok(Self::Gibibytes((mib / MIB_PER_GIB) as u64))
        } else {
            Ok(Self::Mebibytes(mib as u64))
        }
    }

    pub fn as_cores(&self) -> Option<f64> {
        match *self {
            Self::Millicores(m) => Some(m as f64 / MILLICORES_PER_CORE),
            Self::Cores(c) => Some(c as f64),
            _ => None,
        }
    }

    pub fn as_mebibytes(&self) -> Option<f64> {
        match *self {
            Self::Mebibytes(m) => Some(m as f64),
            Self::Gibibytes(g) => Some(g as f64 * MIB_PER_GIB),
            _ => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millicores(m) => write!(f, "{}m", m),
            Self::Cores(c) => write!(f, "{}", c),
            Self::Mebibytes(m) => write!(f, "{}Mi", m),
            Self::Gibibytes(g) => write!(f, "{}Gi", g),
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn check_magnitude(value: f64) -> Result<(), QuantityError> {
    if !value.is_finite() || value < 0.0 {
        return Err(QuantityError::InvalidInput(value));
    }
    Ok(())
}

pub fn format_cpu(cores: f64) -> Result<String, QuantityError> {
    Quantity::cpu(cores).map(|q| q.to_string())
}

pub fn format_memory(mebibytes: f64) -> Result<String, QuantityError> {
    Quantity::memory(mebibytes).map(|q| q.to_string())
}

/// Parses `Gi`/`Mi` quantities into mebibytes. Any other alphabetic suffix,
/// or none, is read as mebibytes already.
pub fn parse_memory(q: &str) -> Result<f64, QuantityError> {
    let q = q.trim();
    let magnitude = q.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let multiplier = match &q[magnitude.len()..] {
        "Gi" => MIB_PER_GIB,
        _ => 1.0,
    };
    let value = parse_magnitude(q, magnitude)?;
    Ok(value * multiplier)
}

/// Parses a CPU quantity (`250m` or bare cores) into cores.
pub fn parse_cpu(q: &str) -> Result<f64, QuantityError> {
    let q = q.trim();
    match q.strip_suffix('m') {
        Some(millis) => Ok(parse_magnitude(q, millis)? / MILLICORES_PER_CORE),
        None => parse_magnitude(q, q),
    }
}

fn parse_magnitude(original: &str, magnitude: &str) -> Result<f64, QuantityError> {
    let value: f64 = magnitude
        .parse()
        .map_err(|_| QuantityError::MalformedQuantity(original.to_string()))?;
    if !value.is_finite() {
        return Err(QuantityError::MalformedQuantity(original.to_string()));
    }
    check_magnitude(value)?;
    Ok(value)
}
