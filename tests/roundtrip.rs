use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reportzip::template::REPORT_XML_NAME;
use reportzip::walker::extract_from_reader;
use reportzip::{
    ArchiveOptions, BuiltinLoader, CompressionMethod, Error, ExtractOptions, FileFormat, FileSystemLoader,
    MemoryReader, Report, ReportArchive, ReportParser, ReportSettings, Slices, TemplateLoader, ValueRange, ZipWriter,
    discover_archives, extract_all, extract_one,
};

fn options(documents: usize, objects: ValueRange) -> ArchiveOptions {
    ArchiveOptions {
        documents,
        settings: ReportSettings {
            objects,
            ..ReportSettings::default()
        },
        ..ArchiveOptions::default()
    }
}

async fn write_archives(dir: &Path, count: usize, options: &ArchiveOptions) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for i in 0..count {
        let path = dir.join(format!("archive_{i}.zip"));
        let archive = ReportArchive::make(&BuiltinLoader, REPORT_XML_NAME, "xml", options).unwrap();
        paths.push(archive.save(&path).await.unwrap().path);
    }
    paths
}

fn assert_joined(slices: &Slices) {
    let mut ids = HashMap::new();
    for row in slices.first.rows() {
        *ids.entry(row.id.as_str()).or_insert(0) += 1;
    }
    assert!(ids.values().all(|&n| n == 1), "report ids must be unique");
    for row in slices.second.rows() {
        assert!(ids.contains_key(row.id.as_str()), "orphan object row {row:?}");
    }
}

#[tokio::test]
async fn three_reports_with_two_objects_each() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_archives(dir.path(), 1, &options(3, ValueRange::new(2, 2).unwrap())).await;

    let slices = extract_one(&paths[0], "report.xml").await.unwrap();
    assert_eq!(slices.first.len(), 3);
    assert_eq!(slices.second.len(), 6);
    assert_joined(&slices);
}

#[tokio::test]
async fn extracted_rows_match_the_report() {
    let template = BuiltinLoader.load(REPORT_XML_NAME).unwrap();
    let report = Report::new(template, &ReportSettings::default()).unwrap();

    let mut writer = ZipWriter::new(CompressionMethod::Deflate);
    writer
        .add_entry("report_0.xml", &report.render(FileFormat::Xml).unwrap())
        .unwrap();
    let reader = Arc::new(MemoryReader::new(writer.finish().unwrap()));
    let slices = extract_from_reader(reader, Path::new("memory.zip"), ReportParser::ReportXml)
        .await
        .unwrap();

    let id = report.id().to_string();
    assert_eq!(slices.first.len(), 1);
    assert_eq!(slices.first.rows()[0].id, id);
    assert_eq!(slices.first.rows()[0].level, report.level());

    let extracted: HashSet<_> = slices.second.rows().iter().map(|r| r.object_name.clone()).collect();
    let expected: HashSet<_> = report.objects().iter().map(|o| o.name().to_string()).collect();
    assert_eq!(slices.second.len(), report.objects().len());
    assert_eq!(extracted, expected);
    assert!(slices.second.rows().iter().all(|r| r.id == id));
}

#[tokio::test]
async fn batch_rows_respect_default_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_archives(dir.path(), 4, &options(25, ValueRange::new(1, 10).unwrap())).await;

    let options = ExtractOptions {
        chunk_size: 2,
        workers: 2,
    };
    let slices = extract_all(&paths, "report.xml", options).await.unwrap();
    assert_eq!(slices.first.len(), 100);
    assert!(slices.first.rows().iter().all(|r| (1..=100).contains(&r.level)));
    assert_joined(&slices);

    let mut per_report: HashMap<&str, usize> = HashMap::new();
    for row in slices.second.rows() {
        *per_report.entry(row.id.as_str()).or_default() += 1;
    }
    assert!(per_report.values().all(|n| (1..=10).contains(n)));
}

#[tokio::test]
async fn chunk_size_does_not_change_the_rows() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_archives(dir.path(), 5, &options(4, ValueRange::new(0, 3).unwrap())).await;

    let run = |chunk_size| {
        let paths = paths.clone();
        async move {
            let options = ExtractOptions { chunk_size, workers: 3 };
            let (first, second) = extract_all(&paths, "report.xml", options).await.unwrap().into_parts();
            let mut first = first.into_rows();
            let mut second = second.into_rows();
            first.sort();
            second.sort();
            (first, second)
        }
    };

    let one = run(1).await;
    let all = run(paths.len()).await;
    assert_eq!(one, all);
    assert_eq!(one.0.len(), 20);
}

#[tokio::test]
async fn single_bad_archive_fails_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = write_archives(dir.path(), 3, &options(2, ValueRange::new(1, 2).unwrap())).await;

    // Level is missing: only one scalar variable.
    let mut writer = ZipWriter::new(CompressionMethod::Stored);
    writer
        .add_entry("report_0.xml", br#"<root><var value="lonely"/><object name="o"/></root>"#)
        .unwrap();
    let bad = dir.path().join("archive_bad.zip");
    std::fs::write(&bad, writer.finish().unwrap()).unwrap();
    paths.insert(1, bad);

    for chunk_size in [1, 2, paths.len()] {
        let options = ExtractOptions { chunk_size, workers: 2 };
        let err = extract_all(&paths, "report.xml", options).await.unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }), "{err}");
    }
}

#[tokio::test]
async fn corrupt_archive_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive_0.zip");
    std::fs::write(&path, b"definitely not a zip file").unwrap();

    let options = ExtractOptions {
        chunk_size: 1,
        workers: 1,
    };
    let err = extract_all(&[path], "report.xml", options).await.unwrap_err();
    assert!(matches!(err, Error::ArchiveUnreadable { .. }));
}

#[tokio::test]
async fn templates_load_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("templates");
    std::fs::create_dir(&templates).unwrap();
    std::fs::write(
        templates.join("report.xml"),
        "<r><var value=\"{{ id }}\"/><var value=\"{{ level }}\"/>\
         {% for o in objects %}<object name=\"{{ o.name }}\"/>{% endfor %}</r>",
    )
    .unwrap();

    let loader = FileSystemLoader::new(&templates);
    let archive = ReportArchive::make(&loader, "report.xml", "xml", &options(5, ValueRange::new(3, 3).unwrap())).unwrap();
    archive.save(&dir.path().join("archive_0.zip")).await.unwrap();

    let paths = discover_archives(dir.path()).await.unwrap();
    assert_eq!(paths.len(), 1);
    let slices = extract_all(&paths, "report.xml", ExtractOptions::for_archives(paths.len()))
        .await
        .unwrap();
    assert_eq!(slices.first.len(), 5);
    assert_eq!(slices.second.len(), 15);
    assert_joined(&slices);
}

#[test]
fn html_is_not_a_supported_format() {
    let err = ReportArchive::make(&BuiltinLoader, REPORT_XML_NAME, "html", &ArchiveOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}
