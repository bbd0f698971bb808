//! Error types for the simulation host
//!
//! Everything that crosses the module boundary is fatal to the run: there is
//! no retry and no partial-state rollback anywhere in the host.

use thiserror::Error;

use crate::sim::SessionPhase;

/// Fetching, compiling or instantiating the simulation module failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModuleLoadError {
    #[error("failed to fetch module from {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to compile module: {0}")]
    Compile(String),
    #[error("failed to instantiate module: {0}")]
    Instantiate(String),
    #[error("module does not export `{0}`")]
    MissingExport(&'static str),
    #[error("module export `{name}` is not a {expected}")]
    ExportKind {
        name: &'static str,
        expected: &'static str,
    },
}

/// Which exported function trapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSite {
    Init,
    Step,
}

impl FaultSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultSite::Init => "init",
            FaultSite::Step => "step",
        }
    }
}

/// A trap raised inside the module's `init` or `step`
#[derive(Error, Debug, Clone, PartialEq)]
#[error("simulation trapped in `{}`: {message}", .site.as_str())]
pub struct SimulationFault {
    pub site: FaultSite,
    pub message: String,
}

impl SimulationFault {
    pub fn new(site: FaultSite, message: impl Into<String>) -> Self {
        Self {
            site,
            message: message.into(),
        }
    }
}

/// A layout read that would leave the module's memory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("read of {len} bytes at offset {offset} exceeds memory size {memory_size}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        memory_size: usize,
    },
    #[error("body count {0} overflows the addressable range")]
    CountOverflow(u32),
}

/// Malformed UTF-8 in a module log message (never fatal)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("module log message is not valid UTF-8 after {valid_up_to} bytes")]
pub struct DecodeWarning {
    pub valid_up_to: usize,
}

/// Rejected host settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Any failure the host can surface to its caller
#[derive(Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Load(#[from] ModuleLoadError),
    #[error(transparent)]
    Fault(#[from] SimulationFault),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("simulation has not been initialized")]
    NotInitialized,
    #[error("simulation is already initialized")]
    AlreadyInitialized,
    #[error("session is not running (phase {0:?})")]
    NotRunning(SessionPhase),
}

impl HostError {
    /// True when the run must be considered corrupted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HostError::Load(_) | HostError::Fault(_) | HostError::Layout(_)
        )
    }
}
