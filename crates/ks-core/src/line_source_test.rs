use super::*;
use std::io::Write;

#[test]
fn test_string_source_reads_numbered_lines() {
    let mut source = StringLineSource::new("one\ntwo\nthree");

    assert_eq!(source.next_line().unwrap(), Some((1, "one".to_string())));
    assert_eq!(source.next_line().unwrap(), Some((2, "two".to_string())));
    assert_eq!(source.next_line().unwrap(), Some((3, "three".to_string())));
    assert_eq!(source.next_line().unwrap(), None);
}

#[test]
fn test_string_source_seeks_back() {
    let mut source = StringLineSource::new("one\ntwo\nthree");
    while source.next_line().unwrap().is_some() {}

    source.seek_line(2).unwrap();
    assert_eq!(source.next_line().unwrap(), Some((2, "two".to_string())));
}

#[test]
fn test_file_source_seeks_to_visited_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upgrade.sql");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "alpha").unwrap();
    writeln!(f, "beta").unwrap();
    writeln!(f, "gamma").unwrap();
    drop(f);

    let mut source = FileLineSource::open(&path).unwrap();
    while source.next_line().unwrap().is_some() {}

    source.seek_line(2).unwrap();
    assert_eq!(source.next_line().unwrap(), Some((2, "beta".to_string())));
    assert_eq!(source.next_line().unwrap(), Some((3, "gamma".to_string())));
    assert_eq!(source.next_line().unwrap(), None);

    // Seeking again after hitting EOF still works.
    source.seek_line(1).unwrap();
    assert_eq!(source.next_line().unwrap(), Some((1, "alpha".to_string())));
}

#[test]
fn test_file_source_rejects_unvisited_seek() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upgrade.sql");
    std::fs::write(&path, "alpha\nbeta\n").unwrap();

    let mut source = FileLineSource::open(&path).unwrap();
    source.next_line().unwrap();

    let err = source.seek_line(5).unwrap_err();
    assert!(matches!(err, CoreError::SeekUnvisited { line: 5 }));
}

#[test]
fn test_file_source_strips_crlf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upgrade.sql");
    std::fs::write(&path, "alpha\r\nbeta\r\n").unwrap();

    let mut source = FileLineSource::open(&path).unwrap();
    assert_eq!(source.next_line().unwrap(), Some((1, "alpha".to_string())));
    assert_eq!(source.next_line().unwrap(), Some((2, "beta".to_string())));
}
