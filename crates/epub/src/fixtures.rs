//! In-memory EPUB archives for tests.
//!
//! Enabled by the `fixtures` feature so that other crates can build real
//! archives in their own tests. Builders panic on failure: if the fixture
//! can't be built, the test shouldn't pass.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Wrap metadata and manifest fragments in an OPF package document.
pub fn package_document(metadata: &str, manifest: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/"
         xmlns:opf="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata>{metadata}</metadata>
  <manifest>{manifest}</manifest>
  <spine/>
</package>"#
    )
}

#[derive(Debug, Default)]
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>)>,
}
impl EpubBuilder {
    /// A complete archive whose package document lives at `OEBPS/content.opf`.
    pub fn package(metadata: &str, manifest: &str) -> Self {
        Self::default()
            .entry("mimetype", "application/epub+zip")
            .entry("META-INF/container.xml", CONTAINER)
            .entry("OEBPS/content.opf", package_document(metadata, manifest))
    }

    /// The smallest useful book: a title and an author.
    pub fn book(title: &str, author: &str) -> Self {
        Self::package(&format!("<dc:title>{title}</dc:title><dc:creator>{author}</dc:creator>"), "")
    }

    pub fn entry(mut self, name: impl Into<String>, data: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.into(), data.as_ref().to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, data) in self.entries {
            writer.start_file(name, options).unwrap();
            writer.write_all(&data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
