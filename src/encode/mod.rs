//! Transcoder adapter: binary discovery, encoder selection, argv assembly and frame sinks.

/// Encoder selection and the transcoder argument vector.
pub mod command;
/// Audio `-filter_complex` composition.
pub mod filter_graph;
/// Frame sinks (transcoder pipe, in-memory).
pub mod sink;
/// Binary discovery, encoder catalog and process lifecycle.
pub mod transcoder;
