use std::fs;

use acn_engine::{decode_snapshot, ensure_dir, AtomicFileWriter};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn decode_respects_charset_header() {
    let bytes = b"caf\xe9";
    let decoded = decode_snapshot(bytes, Some("text/html; charset=ISO-8859-1")).unwrap();
    assert_eq!(decoded.html, "café");
    assert_eq!(decoded.encoding_label, "windows-1252");
}

#[test]
fn decode_handles_utf8_bom() {
    let decoded = decode_snapshot(b"\xEF\xBB\xBF<p>hi</p>", None).unwrap();
    assert_eq!(decoded.html, "<p>hi</p>");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn decode_reads_meta_charset() {
    let mut bytes = b"<meta charset=\"gbk\"><p>".to_vec();
    bytes.extend_from_slice(b"\xc4\xe3\xba\xc3");
    let decoded = decode_snapshot(&bytes, None).unwrap();
    assert!(decoded.html.ends_with("你好"));
    assert_eq!(decoded.encoding_label, "GBK");
}

#[test]
fn decode_rejects_malformed_utf8() {
    let result = decode_snapshot(b"ok \xff\xfe\xfd", Some("text/html; charset=utf-8"));
    assert!(result.is_err());
}

#[test]
fn creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("nested").join("store");
    ensure_dir(&dir).unwrap();
    assert!(dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("settings.ron", "(a: 1)").unwrap();
    let second = writer.write("settings.ron", "(a: 2)").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "(a: 2)");
}

#[test]
fn file_in_place_of_directory_is_an_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocked");
    fs::write(&blocker, "x").unwrap();

    let writer = AtomicFileWriter::new(blocker.clone());
    assert!(writer.write("settings.ron", "data").is_err());
    assert!(ensure_dir(&blocker).is_err());
}
