use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::symbol::Symbol;

/// One `.class` entry read out of a jar.
#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub class_name: String,
    pub bytes: Vec<u8>,
}

impl ClassEntry {
    pub fn symbol(&self) -> Symbol {
        Symbol::new(&self.class_name)
    }
}

pub fn class_entries(artifact_path: &Path) -> Result<Vec<ClassEntry>> {
    let file = File::open(artifact_path)
        .with_context(|| format!("Failed to open jar: {}", artifact_path.display()))?;
    // SAFETY: The file is opened read-only and outlives the map; the map is dropped
    // at the end of this function, before the file.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap jar: {}", artifact_path.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| {
            format!("Failed to read zip structure: {}", artifact_path.display())
        })?;

    let mut classes = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let Some(stem) = name.strip_suffix(".class") else {
            continue;
        };
        if stem.ends_with("module-info") || stem.ends_with("package-info") {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {name} from {}", artifact_path.display()))?;
        classes.push(ClassEntry {
            class_name: stem.replace(['/', '\\'], "."),
            bytes,
        });
    }
    Ok(classes)
}
