//! Bundle loading from local files

use hostbridge_core::{FetchError, SourceFetcher, UrlSourceFetcher};
use url::Url;

#[test]
fn test_reads_file_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.jsbundle");
    std::fs::write(&path, "console.log('hi');").unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let body = UrlSourceFetcher.fetch(&url).wait().unwrap();
    assert_eq!(body, b"console.log('hi');");
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::from_file_path(dir.path().join("missing.jsbundle")).unwrap();

    match UrlSourceFetcher.fetch(&url).wait() {
        Err(FetchError::Io(message)) => assert!(message.contains("missing.jsbundle"), "{}", message),
        other => panic!("expected an I/O error, got {:?}", other),
    }
}
