//! Values that flow through a class definition request.

use serde::Serialize;

/// Immutable result of parsing class bytes.
///
/// Produced by a [`crate::provider::KlassProvider`] and shared as
/// `Arc<ParsedClass>`; nothing mutates it after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedClass {
    pub class_name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access_flags: u16,
    pub major_version: u16,
    pub minor_version: u16,
    pub constant_pool_count: u16,
    pub field_count: u16,
    pub method_count: u16,
}

impl ParsedClass {
    /// A representation carrying only a name, for providers that do not decode
    /// class files.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            super_name: None,
            interfaces: Vec::new(),
            access_flags: 0,
            major_version: 0,
            minor_version: 0,
            constant_pool_count: 0,
            field_count: 0,
            method_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.class_name
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }
}

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

/// The loader namespace a definition request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    Boot,
    Platform,
    Application,
}

impl LoaderKind {
    /// Boot and platform loaders are process-wide singletons, so a type name
    /// identifies their classes on its own.
    pub fn is_boot_or_platform(self) -> bool {
        matches!(self, LoaderKind::Boot | LoaderKind::Platform)
    }
}

/// Load metadata attached to a definition request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassDefinitionInfo {
    /// Hidden or unsafe-anonymous: no durable name at definition time.
    pub anonymous: bool,
    /// Carries constant pool patches, so the parsed result depends on the
    /// patching context.
    pub patched: bool,
    /// Caching switched off for this request by the runtime.
    pub suppress_caching: bool,
}

impl ClassDefinitionInfo {
    pub fn named() -> Self {
        Self::default()
    }

    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            ..Self::default()
        }
    }

    pub fn with_patches(mut self) -> Self {
        self.patched = true;
        self
    }

    pub fn without_caching(mut self) -> Self {
        self.suppress_caching = true;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}
