//! The parsing capability shared by the real parser and its decorators.

use anyhow::Result;
use std::sync::Arc;

use crate::klass::{ClassDefinitionInfo, LoaderKind, ParsedClass};
use crate::symbol::Symbol;

/// Turns class bytes into a [`ParsedClass`].
///
/// Implementations must be deterministic: repeated calls with identical
/// arguments have to yield interchangeable results, because a caching decorator
/// may hand out a value produced for an earlier, identical request.
pub trait KlassProvider: Send + Sync {
    fn parser_klass(
        &self,
        loader: LoaderKind,
        symbol: Option<&Symbol>,
        bytes: &[u8],
        info: &ClassDefinitionInfo,
    ) -> Result<Arc<ParsedClass>>;

    /// Number of representations this provider currently retains.
    fn cached_klass_count(&self) -> usize {
        0
    }
}

impl<P: KlassProvider + ?Sized> KlassProvider for &P {
    fn parser_klass(
        &self,
        loader: LoaderKind,
        symbol: Option<&Symbol>,
        bytes: &[u8],
        info: &ClassDefinitionInfo,
    ) -> Result<Arc<ParsedClass>> {
        (**self).parser_klass(loader, symbol, bytes, info)
    }

    fn cached_klass_count(&self) -> usize {
        (**self).cached_klass_count()
    }
}

impl<P: KlassProvider + ?Sized> KlassProvider for Arc<P> {
    fn parser_klass(
        &self,
        loader: LoaderKind,
        symbol: Option<&Symbol>,
        bytes: &[u8],
        info: &ClassDefinitionInfo,
    ) -> Result<Arc<ParsedClass>> {
        (**self).parser_klass(loader, symbol, bytes, info)
    }

    fn cached_klass_count(&self) -> usize {
        (**self).cached_klass_count()
    }
}

impl<P: KlassProvider + ?Sized> KlassProvider for Box<P> {
    fn parser_klass(
        &self,
        loader: LoaderKind,
        symbol: Option<&Symbol>,
        bytes: &[u8],
        info: &ClassDefinitionInfo,
    ) -> Result<Arc<ParsedClass>> {
        (**self).parser_klass(loader, symbol, bytes, info)
    }

    fn cached_klass_count(&self) -> usize {
        (**self).cached_klass_count()
    }
}
