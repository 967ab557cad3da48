//! The pattern table: console signatures and the handler bound to each.

use bootsniff_proto::PatternSet;
use std::collections::HashSet;
use std::fmt;

use crate::config::ConfigError;

/// How the sniff loop reacts to a matched signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Progress marker; the round counts as quiet.
    Observe,
    /// Recoverable anomaly; costs one attempt and power-cycles the machine.
    SoftError,
    /// Unrecoverable; ends the session.
    Fatal,
}

/// Action bound to a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Boot progress marker, logged only.
    Marker,
    /// Firmware error report with a platform log identifier.
    FirmwareError,
    /// Firmware assertion.
    Assertion,
    /// Kernel debug monitor prompt; runs the monitor capture protocol.
    DebugMonitor,
    /// Shutdown with an error status (usually a guarded-out part).
    ErrorShutdown,
}

impl Handler {
    pub fn outcome_kind(self) -> OutcomeKind {
        match self {
            Handler::Marker => OutcomeKind::Observe,
            Handler::FirmwareError => OutcomeKind::SoftError,
            Handler::Assertion | Handler::DebugMonitor | Handler::ErrorShutdown => {
                OutcomeKind::Fatal
            }
        }
    }
}

/// A console pattern plus its handler. Identity is the pattern text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    label: String,
    pattern: String,
    handler: Handler,
}

impl Signature {
    pub fn new(label: impl Into<String>, pattern: impl Into<String>, handler: Handler) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
            handler,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> Handler {
        self.handler
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.label, self.pattern)
    }
}

/// Ordered, immutable signature table compiled into one alternation.
#[derive(Debug, Clone)]
pub struct SignatureTable {
    signatures: Vec<Signature>,
    patterns: PatternSet,
}

impl SignatureTable {
    pub fn new(signatures: Vec<Signature>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for signature in &signatures {
            if !seen.insert(signature.pattern()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate signature pattern {:?}",
                    signature.pattern()
                )));
            }
        }

        let patterns = PatternSet::new(signatures.iter().map(|s| s.pattern.clone())).map_err(
            |source| ConfigError::Pattern {
                pattern: signatures
                    .iter()
                    .map(|s| s.pattern.as_str())
                    .collect::<Vec<_>>()
                    .join(" | "),
                source,
            },
        )?;

        Ok(Self {
            signatures,
            patterns,
        })
    }

    /// The platform boot signatures watched during every sniff session.
    ///
    /// "OCCs are now running" shares the skiboot marker handling: both are
    /// observe-only progress markers.
    pub fn boot_defaults() -> Result<Self, ConfigError> {
        Self::new(vec![
            Signature::new(
                "firmware-error",
                "Error reported by .* PLID .*===",
                Handler::FirmwareError,
            ),
            Signature::new("hostboot", "SBE starting hostboot", Handler::Marker),
            Signature::new("skiboot", "OPAL skiboot", Handler::Marker),
            Signature::new("skiboot", "OCCs are now running", Handler::Marker),
            Signature::new("assert", "Aborting!", Handler::Assertion),
            Signature::new("xmon", "mon> ", Handler::DebugMonitor),
            Signature::new(
                "guard",
                "System shutting down with error status .*",
                Handler::ErrorShutdown,
            ),
        ])
    }

    pub fn get(&self, index: usize) -> Option<&Signature> {
        self.signatures.get(index)
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
