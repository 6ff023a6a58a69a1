//! Zip container access.

use crate::consts::CONTAINER_PATH;
use crate::error::{ErrorKind, Result};
use crate::xml;
use exn::{OptionExt, ResultExt};
use std::io::{Read, Seek};
use zip::ZipArchive;

/// No single entry we care about (package document, cover image) should be
/// anywhere near this big. Anything that is, is probably a zip bomb.
const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

pub(crate) struct Archive<R: Read + Seek> {
    zip: ZipArchive<R>,
}
impl<R: Read + Seek> Archive<R> {
    pub(crate) fn new(reader: R) -> Result<Self> {
        let zip = ZipArchive::new(reader).or_raise(|| ErrorKind::Archive)?;
        Ok(Self { zip })
    }

    /// Archive entry names never start with a slash, but hrefs built from
    /// package paths sometimes do. Producers are also sloppy about case.
    fn entry_name(&self, name: &str) -> Option<String> {
        let name = name.trim_start_matches('/');
        if self.zip.index_for_name(name).is_some() {
            return Some(name.to_string());
        }
        self.zip.file_names().find(|candidate| candidate.eq_ignore_ascii_case(name)).map(str::to_string)
    }

    pub(crate) fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let missing = || ErrorKind::MissingEntry(name.to_string());
        let entry_name = self.entry_name(name).ok_or_raise(missing)?;
        let entry = self.zip.by_name(&entry_name).or_raise(missing)?;
        let mut bytes = Vec::new();
        entry.take(MAX_ENTRY_BYTES).read_to_end(&mut bytes).or_raise(missing)?;
        Ok(bytes)
    }

    /// Read an entry as text, replacing invalid UTF-8 and dropping any BOM.
    pub(crate) fn read_text(&mut self, name: &str) -> Result<String> {
        let bytes = self.read(name)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
    }

    /// Locate the package document through `META-INF/container.xml`.
    ///
    /// The first `rootfile` with a non-empty `full-path` wins.
    pub(crate) fn package_path(&mut self) -> Result<String> {
        let container = self.read_text(CONTAINER_PATH).or_raise(|| ErrorKind::Container)?;
        let document = xml::parse(CONTAINER_PATH, &container).or_raise(|| ErrorKind::Container)?;
        document
            .descendants()
            .filter(|n| xml::is_element(n, "rootfile"))
            .filter_map(|n| xml::attribute(&n, "full-path"))
            .map(str::trim)
            .find(|path| !path.is_empty())
            .map(|path| path.trim_start_matches('/').to_string())
            .ok_or_raise(|| ErrorKind::Container)
    }
}
