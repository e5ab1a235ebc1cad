//! Error Types
//!
//! This module defines the error type shared by every Relay crate.
//!
//! # Overview
//!
//! [`RelayError`] covers the failure modes that abort a single construction
//! call:
//! - Malformed shader networks (dangling links, duplicate handles, cycles)
//! - Unknown native node entries or unsupported primitives
//! - Scene-description I/O and (de)serialization
//!
//! Unsupported value conversions are *not* errors. They are reported once
//! through `log::warn!` and the offending value is skipped.
//!
//! # Usage
//!
//! ```rust,ignore
//! use relay_core::error::{RelayError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for Relay.
#[derive(Error, Debug)]
pub enum RelayError {
    // ========================================================================
    // Shader Network Errors
    // ========================================================================
    /// A parameter links to a handle that no node in the network declares.
    #[error("Shader \"{shader}\" links parameter \"{parameter}\" to unknown handle \"{handle}\"")]
    DanglingLink {
        /// Name of the shader holding the link
        shader: String,
        /// The linked parameter
        parameter: String,
        /// The handle that could not be resolved
        handle: String,
    },

    /// Two nodes of one network claim the same handle.
    #[error("Duplicate shader handle \"{0}\"")]
    DuplicateHandle(String),

    /// The network's links form a cycle.
    #[error("Shader network contains a cycle through \"{0}\"")]
    ShaderCycle(String),

    /// A network needs at least one node.
    #[error("Shader network is empty")]
    EmptyNetwork,

    // ========================================================================
    // Native Graph Errors
    // ========================================================================
    /// The node library has no entry with this name.
    #[error("Unknown node entry \"{0}\"")]
    UnknownNodeEntry(String),

    /// A node with this name already exists in the same scope.
    #[error("Node name \"{0}\" is already in use")]
    DuplicateNodeName(String),

    /// A node key no longer refers to a live node.
    #[error("Stale node reference: {0}")]
    StaleNode(String),

    // ========================================================================
    // Scene Errors
    // ========================================================================
    /// The primitive cannot be expressed as a native shape.
    #[error("Unsupported primitive for \"{name}\": {reason}")]
    UnsupportedPrimitive {
        /// Object name
        name: String,
        /// Why the primitive was rejected
        reason: String,
    },

    /// Time samples and values disagree, or times are not increasing.
    #[error("Invalid time samples: {0}")]
    InvalidTimeSamples(String),

    /// The object handle does not belong to the session (or was released).
    #[error("Unknown object \"{0}\"")]
    UnknownObject(String),

    /// `Session::create` was asked for a backend that is not registered.
    #[error("Unknown renderer type \"{0}\"")]
    UnknownRendererType(String),

    /// Scene-description sessions need somewhere to write.
    #[error("Scene description sessions require a destination file")]
    MissingDestination,

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The scene-description file is readable JSON but not a valid document.
    #[error("Invalid scene description: {0}")]
    InvalidDocument(String),
}

/// Alias for `Result<T, RelayError>`.
pub type Result<T> = std::result::Result<T, RelayError>;
