//! Integration tests for packaging generated projects

use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::io::Read;

use schemaforge::{archive_file_name, from_json, generate, Archiver, GeneratorConfig, MEDIA_TYPE};

const CRM: &str = r#"{
    "name": "Tiny CRM",
    "stackVariant": "live-server-component",
    "entities": [
        {"id": "company", "name": "Company", "fields": [
            {"id": "f1", "name": "name", "type": "string", "required": true},
            {"id": "f2", "name": "website", "type": "url", "required": false}
        ]},
        {"id": "contact", "name": "Contact", "fields": [
            {"id": "f3", "name": "full_name", "type": "string", "required": true},
            {"id": "f4", "name": "company_id", "type": "integer", "required": false},
            {"id": "f5", "name": "subscribed", "type": "boolean", "required": false}
        ]}
    ]
}"#;

#[test]
fn test_archive_matches_project_tree() {
    let schema = from_json(CRM).unwrap();
    let generated = generate(&schema, &GeneratorConfig::default()).unwrap();
    let name = archive_file_name(&schema.name).unwrap();
    assert_eq!(name, "tiny-crm.tar.gz");

    let staging = tempfile::tempdir().unwrap();
    let stream = Archiver::new(Some(staging.path().to_path_buf()))
        .archive(&generated.tree, &name)
        .unwrap();
    assert_eq!(stream.media_type(), MEDIA_TYPE);

    let mut archive = tar::Archive::new(GzDecoder::new(stream));
    let mut paths = BTreeSet::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let path = entry.path().unwrap().to_string_lossy().into_owned();

        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(generated.tree.get(&path), Some(content.as_slice()), "{}", path);
        assert!(paths.insert(path), "duplicate archive entry");
    }

    let expected: BTreeSet<String> = generated.tree.paths().map(str::to_string).collect();
    assert_eq!(paths, expected);
    assert!(paths.contains("resources/views/livewire/contacts.blade.php"));

    // The reader owned the staged file; it is gone once the archive is dropped
    drop(archive);
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[test]
fn test_identical_schemas_give_identical_archives() {
    let schema = from_json(CRM).unwrap();
    let config = GeneratorConfig {
        workers: 3,
        ..GeneratorConfig::default()
    };

    let mut first = Vec::new();
    let mut second = Vec::new();
    for out in [&mut first, &mut second] {
        let generated = generate(&schema, &config).unwrap();
        Archiver::default()
            .archive(&generated.tree, "crm.tar.gz")
            .unwrap()
            .read_to_end(out)
            .unwrap();
    }
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_archive_saved_to_disk() {
    let schema = from_json(CRM).unwrap();
    let generated = generate(&schema, &GeneratorConfig::default()).unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("tiny-crm.tar.gz");

    let stream = Archiver::default().archive(&generated.tree, "tiny-crm.tar.gz").unwrap();
    let len = stream.len();
    stream.save_to(&target).unwrap();

    let mut archive = tar::Archive::new(GzDecoder::new(std::fs::File::open(&target).unwrap()));
    let count = archive.entries().unwrap().count();
    assert_eq!(count, generated.tree.len());
    assert_eq!(std::fs::metadata(&target).unwrap().len(), len);
}
