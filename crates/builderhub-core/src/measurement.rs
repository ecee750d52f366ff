//! Measurement templates and register matching.
//!
//! A measurement is a named set of expected register values for one
//! attestation type. A live report matches a template when every register the
//! template names is present in the report with exactly the expected value.
//! Registers the template does not mention are ignored, so a template can pin
//! only the registers that matter for policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Expected value of a single register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterValue {
    /// Hex-encoded expected value.
    pub expected: String,
}

impl RegisterValue {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

/// A named reference template for one attestation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub attestation_type: String,
    pub registers: BTreeMap<String, RegisterValue>,
}

impl Measurement {
    pub fn new(
        name: impl Into<String>,
        attestation_type: impl Into<String>,
        registers: BTreeMap<String, RegisterValue>,
    ) -> Self {
        Self {
            name: name.into(),
            attestation_type: attestation_type.into(),
            registers,
        }
    }

    /// Returns `true` if every register of this template appears in
    /// `observed` with an equal value.
    pub fn is_satisfied_by(&self, observed: &BTreeMap<String, String>) -> bool {
        self.registers.iter().all(|(register, value)| {
            observed
                .get(register)
                .is_some_and(|actual| *actual == value.expected)
        })
    }
}

/// Resolve the template that `observed` satisfies.
///
/// Candidates are considered in name order, so when several templates match
/// the same report the lexicographically smallest name wins regardless of the
/// order the caller fetched them in. Callers should still avoid registering
/// overlapping templates.
pub fn match_measurement<'a>(
    observed: &BTreeMap<String, String>,
    candidates: &'a [Measurement],
) -> Option<&'a Measurement> {
    candidates
        .iter()
        .filter(|m| m.is_satisfied_by(observed))
        .min_by(|a, b| a.name.cmp(&b.name))
}
