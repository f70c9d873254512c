//! # klass-cache
//!
//! A two-tier cache in front of JVM class-file parsing.
//!
//! ## Architecture
//!
//! - **cache**: The caching decorator; boot tier keyed by type name, app tier by content fingerprint
//! - **provider**: The `KlassProvider` seam shared by parsers and their decorators
//! - **policy**: Which definition requests may be cached at all
//! - **key**: Content fingerprints over raw class bytes
//! - **klass**: Parsed class representation, load metadata and loader kinds
//! - **symbol**: Type names used as boot tier keys
//! - **classfile**: Class-file header decoding, the default fallback provider
//! - **catalog**: Reading class entries out of jars
//! - **scan**: Jar discovery in directory trees and the local Maven repository
//! - **config**: Policy and path resolution from flags and environment
//! - **cli**: Command-line definitions for the `klass-cache` binary

pub mod cache;
pub mod catalog;
pub mod classfile;
pub mod cli;
pub mod config;
pub mod key;
pub mod klass;
pub mod policy;
pub mod provider;
pub mod scan;
pub mod symbol;

pub use cache::{CacheStats, CachedKlassProvider};
pub use classfile::{ClassFileParser, ClassFormatError};
pub use key::ContentKey;
pub use klass::{ClassDefinitionInfo, LoaderKind, ParsedClass};
pub use policy::CachePolicy;
pub use provider::KlassProvider;
pub use symbol::Symbol;
