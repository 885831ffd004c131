//! Per-archive extraction.
//!
//! Every entry of an archive is decoded as UTF-8 and handed to the parser
//! registered for the template it was rendered from. One bad entry fails the
//! whole archive, so a slice never holds object rows without their report row.

use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::entity::{FirstRow, SecondRow, Slices};
use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};
use crate::markup::{self, MarkupError};
use crate::template::REPORT_XML_NAME;
use crate::zip::{ZipError, ZipExtractor};

/// Ways a single document can fail to match its template's structure.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("entry is not valid UTF-8")]
    NotUtf8(#[from] FromUtf8Error),

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error("expected exactly two <var> elements, found {0}")]
    VarCount(usize),

    #[error("<{tag}> without a '{attr}' attribute")]
    MissingAttribute { tag: &'static str, attr: &'static str },

    #[error("level '{0}' is not a non-negative integer")]
    BadLevel(String),
}

/// Document parsers, one per template that has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportParser {
    /// `report.xml`: two `<var value=..>` elements read positionally as
    /// (id, level), then any number of `<object name=..>` elements.
    ReportXml,
}

impl ReportParser {
    pub fn for_template(template_name: &str) -> Result<Self> {
        match template_name {
            REPORT_XML_NAME => Ok(ReportParser::ReportXml),
            other => Err(Error::UnimplementedTemplateParser(other.to_string())),
        }
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            ReportParser::ReportXml => REPORT_XML_NAME,
        }
    }

    /// Parse one document, appending its rows to `slices` only if it is well formed.
    pub fn parse(&self, text: &str, slices: &mut Slices) -> Result<(), DocumentError> {
        match self {
            ReportParser::ReportXml => parse_report_xml(text, slices),
        }
    }
}

fn parse_report_xml(text: &str, slices: &mut Slices) -> Result<(), DocumentError> {
    let tags = markup::start_tags(text)?;

    let vars: Vec<_> = tags.iter().filter(|tag| tag.is("var")).collect();
    let [id, level] = vars.as_slice() else {
        return Err(DocumentError::VarCount(vars.len()));
    };
    let id = var_value(id)?.to_string();
    let level_text = var_value(level)?;
    let level = level_text
        .trim()
        .parse::<u32>()
        .map_err(|_| DocumentError::BadLevel(level_text.to_string()))?;

    let object_names = tags
        .iter()
        .filter(|tag| tag.is("object"))
        .map(|tag| {
            tag.attr("name").map(str::to_string).ok_or(DocumentError::MissingAttribute {
                tag: "object",
                attr: "name",
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for object_name in object_names {
        slices.second.append(SecondRow {
            id: id.clone(),
            object_name,
        });
    }
    slices.first.append(FirstRow { id, level });
    Ok(())
}

fn var_value<'t>(tag: &'t markup::Tag<'_>) -> Result<&'t str, DocumentError> {
    tag.attr("value").ok_or(DocumentError::MissingAttribute {
        tag: "var",
        attr: "value",
    })
}

/// Extract the rows of one archive, resolving the parser from `template_name`.
pub async fn extract_one(archive_path: &Path, template_name: &str) -> Result<Slices> {
    let parser = ReportParser::for_template(template_name)?;
    extract_archive(archive_path, parser).await
}

pub async fn extract_archive(archive_path: &Path, parser: ReportParser) -> Result<Slices> {
    let reader = LocalFileReader::open(archive_path).map_err(|err| Error::ArchiveUnreadable {
        path: archive_path.to_path_buf(),
        source: err.into(),
    })?;
    extract_from_reader(Arc::new(reader), archive_path, parser).await
}

/// Extract rows from an archive behind any [`ReadAt`] source; `label` names
/// it in errors.
pub async fn extract_from_reader<R: ReadAt>(reader: Arc<R>, label: &Path, parser: ReportParser) -> Result<Slices> {
    let unreadable = |source: ZipError| Error::ArchiveUnreadable {
        path: label.to_path_buf(),
        source,
    };

    let extractor = ZipExtractor::new(reader);
    let entries = extractor.list_files().await.map_err(unreadable)?;

    let mut slices = Slices::new();
    for entry in entries.iter().filter(|entry| !entry.is_directory) {
        let malformed = |source: DocumentError| Error::MalformedDocument {
            archive: label.to_path_buf(),
            entry: entry.file_name.clone(),
            source,
        };

        let data = extractor.extract_to_memory(entry).await.map_err(unreadable)?;
        let text = String::from_utf8(data).map_err(|err| malformed(err.into()))?;
        parser.parse(&text, &mut slices).map_err(malformed)?;
    }

    debug!(
        archive = %label.display(),
        reports = slices.first.len(),
        objects = slices.second.len(),
        "archive extracted"
    );
    Ok(slices)
}

/// Sequential extraction over one chunk of archives.
pub struct ArchiveWalker {
    chunk_archives: Vec<PathBuf>,
    parser: ReportParser,
    slices: Slices,
}

impl ArchiveWalker {
    pub fn new(chunk_archives: Vec<PathBuf>, parser: ReportParser) -> Self {
        Self {
            chunk_archives,
            parser,
            slices: Slices::new(),
        }
    }

    /// Extract every archive of the chunk in order, stopping at the first failure.
    pub async fn walk(&mut self) -> Result<()> {
        for archive in &self.chunk_archives {
            let slices = extract_archive(archive, self.parser).await?;
            self.slices.extend(slices);
        }
        Ok(())
    }

    pub fn into_slices(self) -> Slices {
        self.slices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::{CompressionMethod, ZipWriter};

    const DOC: &str = r#"<root>
    <var name="id" value="r-1"/>
    <var name="level" value="42"/>
    <objects><object name="o-1"/><object name="o-2"/></objects>
</root>"#;

    #[test]
    fn parses_report_xml_positionally() {
        let mut slices = Slices::new();
        ReportParser::ReportXml.parse(DOC, &mut slices).unwrap();

        assert_eq!(
            slices.first.rows(),
            [FirstRow {
                id: "r-1".to_string(),
                level: 42
            }]
        );
        let names: Vec<_> = slices.second.rows().iter().map(|r| r.object_name.as_str()).collect();
        assert_eq!(names, ["o-1", "o-2"]);
        assert!(slices.second.rows().iter().all(|r| r.id == "r-1"));
    }

    #[test]
    fn document_without_objects_yields_one_row() {
        let mut slices = Slices::new();
        ReportParser::ReportXml
            .parse(r#"<var value="a"/><var value="1"/>"#, &mut slices)
            .unwrap();
        assert_eq!(slices.first.len(), 1);
        assert!(slices.second.is_empty());
    }

    #[test]
    fn malformed_documents_leave_slices_untouched() {
        let cases = [
            (r#"<var value="only-id"/><object name="o"/>"#, "VarCount"),
            (r#"<var value="a"/><var value="b"/><var value="c"/>"#, "VarCount"),
            (r#"<var value="a"/><var value="high"/>"#, "BadLevel"),
            (r#"<var value="a"/><var/>"#, "MissingAttribute"),
            (r#"<var value="a"/><var value="1"/><object/>"#, "MissingAttribute"),
        ];
        for (doc, kind) in cases {
            let mut slices = Slices::new();
            let err = ReportParser::ReportXml.parse(doc, &mut slices).unwrap_err();
            assert!(format!("{err:?}").starts_with(kind), "{doc}: {err:?}");
            assert_eq!(slices, Slices::new());
        }
    }

    #[test]
    fn unknown_template_has_no_parser() {
        assert!(matches!(
            ReportParser::for_template("report.html"),
            Err(Error::UnimplementedTemplateParser(name)) if name == "report.html"
        ));
        assert_eq!(ReportParser::ReportXml.template_name(), "report.xml");
    }

    #[tokio::test]
    async fn one_bad_entry_fails_the_archive() {
        let mut writer = ZipWriter::new(CompressionMethod::Deflate);
        writer.add_entry("report_0.xml", DOC.as_bytes()).unwrap();
        writer.add_entry("report_1.xml", br#"<var value="x"/>"#).unwrap();
        let reader = Arc::new(MemoryReader::new(writer.finish().unwrap()));

        let err = extract_from_reader(reader, Path::new("mem.zip"), ReportParser::ReportXml)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { entry, .. } if entry == "report_1.xml"));
    }

    #[tokio::test]
    async fn non_utf8_entry_is_malformed() {
        let mut writer = ZipWriter::new(CompressionMethod::Stored);
        writer.add_entry("report_0.xml", &[0xFF, 0xFE, 0x00]).unwrap();
        let reader = Arc::new(MemoryReader::new(writer.finish().unwrap()));

        let err = extract_from_reader(reader, Path::new("mem.zip"), ReportParser::ReportXml)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedDocument {
                source: DocumentError::NotUtf8(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_archive_is_unreadable() {
        let err = extract_one(Path::new("/nonexistent/archive.zip"), "report.xml")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveUnreadable { .. }));
    }
}
