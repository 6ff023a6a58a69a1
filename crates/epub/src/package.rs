//! OPF package document field extraction.

use crate::consts::{
    ISBN_MIN_LENGTH, ISBN_URN_PREFIX, META_CALIBRE_SERIES, META_CALIBRE_SERIES_INDEX, PROPERTY_COLLECTION,
    PROPERTY_COLLECTION_TYPE, PROPERTY_GROUP_POSITION, PUBLICATION_EVENTS,
};
use crate::error::Result;
use crate::models::Series;
use crate::{date, isbn, xml};
use roxmltree::{Document, Node};
use time::OffsetDateTime;

#[derive(Debug)]
pub(crate) struct Package<'input> {
    document: Document<'input>,
    /// Directory of the package document inside the archive; manifest hrefs
    /// are relative to it.
    dir: String,
}
impl<'input> Package<'input> {
    pub(crate) fn parse(path: &str, text: &'input str) -> Result<Self> {
        let document = xml::parse(path, text)?;
        let dir = path.rsplit_once('/').map(|(dir, _)| dir.to_string()).unwrap_or_default();
        Ok(Self { document, dir })
    }

    fn elements<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
        self.document.descendants().filter(move |n| xml::is_element(n, local_name))
    }

    /// `meta` elements with `attribute` equal to `value`.
    fn metas<'a>(&'a self, attribute: &'a str, value: &'a str) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
        self.elements("meta").filter(move |n| xml::attribute(n, attribute) == Some(value))
    }

    /// Text of the first element with this local name. Only the first
    /// element counts, even when it's empty.
    fn first(&self, local_name: &str) -> Option<String> {
        self.elements(local_name).next().and_then(|n| xml::text(&n))
    }

    pub(crate) fn title(&self) -> Option<String> {
        self.first("title")
    }

    pub(crate) fn author(&self) -> Option<String> {
        self.first("creator")
    }

    pub(crate) fn description(&self) -> Option<String> {
        self.first("description")
    }

    pub(crate) fn language(&self) -> Option<String> {
        self.first("language")
    }

    pub(crate) fn publisher(&self) -> Option<String> {
        self.first("publisher")
    }

    /// First checksum-valid ISBN, looking at every `source` before any
    /// `identifier`.
    pub(crate) fn isbn(&self) -> Option<String> {
        self.elements("source")
            .chain(self.elements("identifier"))
            .filter_map(|n| xml::text(&n))
            .filter(|value| value.len() >= ISBN_MIN_LENGTH)
            .map(|value| strip_urn(&value).to_string())
            .find(|value| isbn::is_valid(value))
    }

    /// A date tagged with a publication event wins outright; an untagged
    /// date is only a fallback. Dates tagged with other events (modification,
    /// conversion) are ignored.
    pub(crate) fn published(&self) -> Option<OffsetDateTime> {
        let mut fallback = None;
        for element in self.elements("date") {
            match xml::attribute(&element, "event").map(str::trim) {
                Some(event) if PUBLICATION_EVENTS.iter().any(|e| e.eq_ignore_ascii_case(event)) => {
                    return xml::text(&element).and_then(date::parse);
                },
                None | Some("") => fallback = Some(element),
                Some(_) => {},
            }
        }
        fallback.and_then(|n| xml::text(&n)).and_then(date::parse)
    }

    pub(crate) fn series(&self) -> Option<Series> {
        self.calibre_series().or_else(|| self.collection_series())
    }

    fn calibre_series(&self) -> Option<Series> {
        let name = self.metas("name", META_CALIBRE_SERIES).next().and_then(|n| xml::attribute(&n, "content"))?;
        let index = self
            .metas("name", META_CALIBRE_SERIES_INDEX)
            .next()
            .and_then(|n| xml::attribute(&n, "content"))
            .and_then(|i| i.trim().parse::<f64>().ok())
            .unwrap_or_default();
        Series::parse(name, index)
    }

    /// EPUB3 collections, refined by `meta[refines="#id"]` elements. A
    /// collection explicitly typed as something other than a series (a
    /// "set", for example) is not a series.
    fn collection_series(&self) -> Option<Series> {
        let collection = self.metas("property", PROPERTY_COLLECTION).next()?;
        let name = xml::text(&collection)?;
        let mut index = 0.0;
        if let Some(id) = xml::attribute(&collection, "id") {
            let refines = format!("#{id}");
            for refinement in self.metas("refines", &refines) {
                let value = xml::text(&refinement).unwrap_or_default();
                match xml::attribute(&refinement, "property") {
                    Some(PROPERTY_COLLECTION_TYPE) if !value.is_empty() && value != "series" => return None,
                    Some(PROPERTY_GROUP_POSITION) => index = value.parse::<f64>().unwrap_or_default(),
                    _ => {},
                }
            }
        }
        Series::parse(name, index)
    }

    /// Archive path of the cover image.
    ///
    /// Prefers the EPUB2 `meta[name=cover]` reference to a manifest id,
    /// falling back to the EPUB3 `cover-image` manifest property.
    pub(crate) fn cover_path(&self) -> Option<String> {
        let by_reference = self
            .metas("name", "cover")
            .filter_map(|n| xml::attribute(&n, "content"))
            .find(|id| !id.trim().is_empty())
            .and_then(|id| self.document.descendants().find(|n| n.is_element() && xml::attribute(n, "id") == Some(id)))
            .and_then(|n| xml::attribute(&n, "href"));
        let href = by_reference.or_else(|| {
            self.elements("item")
                .find(|n| xml::attribute(n, "properties").is_some_and(|p| p.split_whitespace().any(|p| p == "cover-image")))
                .and_then(|n| xml::attribute(&n, "href"))
        })?;
        resolve(&self.dir, href)
    }
}

fn strip_urn(value: &str) -> &str {
    match value.get(..ISBN_URN_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(ISBN_URN_PREFIX) => &value[ISBN_URN_PREFIX.len()..],
        _ => value,
    }
}

/// Join a manifest href onto the package directory, resolving `.` and `..`
/// and dropping any fragment. `None` if the href climbs out of the archive.
fn resolve(dir: &str, href: &str) -> Option<String> {
    let href = href.split('#').next().unwrap_or_default().trim();
    if href.is_empty() {
        return None;
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(href.split('/')) {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop()?;
            },
            s => segments.push(s),
        }
    }
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn package(metadata: &str, manifest: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/"
                     xmlns:opf="http://www.idpf.org/2007/opf" version="3.0">
              <metadata>{metadata}</metadata>
              <manifest>{manifest}</manifest>
            </package>"#
        )
    }

    #[test]
    fn test_first_match_fields() {
        let text = package(
            r#"<dc:title>The Hobbit</dc:title><dc:title>There and Back Again</dc:title>
               <dc:creator>J. R. R. Tolkien</dc:creator><dc:creator>Alan Lee</dc:creator>
               <dc:publisher>Allen &amp; Unwin</dc:publisher>
               <dc:language>en</dc:language>
               <dc:description> A hobbit goes on an adventure. </dc:description>"#,
            "",
        );
        let package = Package::parse("OEBPS/content.opf", &text).unwrap();
        assert_eq!(package.title().as_deref(), Some("The Hobbit"));
        assert_eq!(package.author().as_deref(), Some("J. R. R. Tolkien"));
        assert_eq!(package.publisher().as_deref(), Some("Allen & Unwin"));
        assert_eq!(package.language().as_deref(), Some("en"));
        assert_eq!(package.description().as_deref(), Some("A hobbit goes on an adventure."));
    }

    #[test]
    fn test_first_match_does_not_skip_empty() {
        let text = package("<dc:title> </dc:title><dc:title>Second</dc:title>", "");
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.title(), None);
    }

    #[test]
    fn test_isbn() {
        let text = package(
            r#"<dc:identifier>urn:uuid:12345678-1234-1234-1234-123456789abc</dc:identifier>
               <dc:identifier>short</dc:identifier>
               <dc:identifier>9780306406158</dc:identifier>
               <dc:identifier opf:scheme="ISBN">urn:isbn:9780306406157</dc:identifier>"#,
            "",
        );
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.isbn().as_deref(), Some("9780306406157"));
    }

    #[test]
    fn test_isbn_prefers_source() {
        let text = package(
            r#"<dc:identifier>9780306406157</dc:identifier><dc:source>0-8044-2957-X</dc:source>"#,
            "",
        );
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.isbn().as_deref(), Some("0-8044-2957-X"));
    }

    #[rstest]
    #[case(r#"<dc:date opf:event="modification">2020-01-01</dc:date><dc:date>2001-05-06</dc:date>"#, Some(2001))]
    #[case(r#"<dc:date>2001-05-06</dc:date><dc:date opf:event="publication">1999-01-01</dc:date>"#, Some(1999))]
    #[case(r#"<dc:date opf:event="original-publication">1937-09-21</dc:date><dc:date>2001-05-06</dc:date>"#, Some(1937))]
    #[case(r#"<dc:date opf:event="modification">2020-01-01</dc:date>"#, None)]
    #[case(r#"<dc:date>sometime in spring</dc:date>"#, None)]
    #[case("", None)]
    fn test_published(#[case] metadata: &str, #[case] year: Option<i32>) {
        let text = package(metadata, "");
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.published().map(|d| d.year()), year);
    }

    #[test]
    fn test_calibre_series() {
        let text = package(
            r#"<meta name="calibre:series" content="Discworld"/><meta name="calibre:series_index" content="7.0"/>
               <meta property="belongs-to-collection" id="c01">Ignored</meta>"#,
            "",
        );
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.series(), Some(Series { name: "Discworld".to_string(), index: 7.0 }));
    }

    #[test]
    fn test_collection_series() {
        let text = package(
            r##"<meta property="belongs-to-collection" id="c01">The Expanse</meta>
               <meta refines="#c01" property="collection-type">series</meta>
               <meta refines="#c01" property="group-position">2</meta>"##,
            "",
        );
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.series(), Some(Series { name: "The Expanse".to_string(), index: 2.0 }));
    }

    #[test]
    fn test_collection_set_is_not_a_series() {
        let text = package(
            r##"<meta property="belongs-to-collection" id="c01">Box Set</meta>
               <meta refines="#c01" property="collection-type">set</meta>
               <meta refines="#c01" property="group-position">2</meta>"##,
            "",
        );
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.series(), None);
    }

    #[test]
    fn test_series_embedded_index() {
        let text = package(r#"<meta name="calibre:series" content="Dune #3"/>"#, "");
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.series(), Some(Series { name: "Dune".to_string(), index: 3.0 }));
    }

    #[test]
    fn test_cover_path_by_reference() {
        let text = package(
            r#"<meta name="cover" content="cover-img"/>"#,
            r#"<item id="cover-img" href="images/cover.png" media-type="image/png"/>"#,
        );
        let package = Package::parse("OEBPS/content.opf", &text).unwrap();
        assert_eq!(package.cover_path().as_deref(), Some("OEBPS/images/cover.png"));
    }

    #[test]
    fn test_cover_path_by_property() {
        let text = package(
            "",
            r#"<item id="c" href="../cover.jpg" properties="cover-image svg" media-type="image/jpeg"/>"#,
        );
        let package = Package::parse("OEBPS/content.opf", &text).unwrap();
        assert_eq!(package.cover_path().as_deref(), Some("cover.jpg"));
    }

    #[test]
    fn test_no_cover() {
        let text = package(r#"<meta name="cover" content="missing"/>"#, "");
        let package = Package::parse("content.opf", &text).unwrap();
        assert_eq!(package.cover_path(), None);
    }

    #[rstest]
    #[case("OEBPS", "images/cover.png", Some("OEBPS/images/cover.png"))]
    #[case("", "cover.png", Some("cover.png"))]
    #[case("OEBPS/text", "../images/cover.png#frag", Some("OEBPS/images/cover.png"))]
    #[case("OEBPS", "./cover.png", Some("OEBPS/cover.png"))]
    #[case("", "../../escape.png", None)]
    #[case("OEBPS", "", None)]
    fn test_resolve(#[case] dir: &str, #[case] href: &str, #[case] expected: Option<&str>) {
        assert_eq!(resolve(dir, href).as_deref(), expected);
    }
}
