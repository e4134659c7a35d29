use super::*;
use crate::command::CommandKind;
use crate::line_source::StringLineSource;

fn scan_text(text: &str) -> CoreResult<UpgradeFile<StringLineSource>> {
    UpgradeFile::scan(StringLineSource::new(text))
}

const BASIC: &str = r#"--* // Keystone upgrade file
--* DEFINITION
--*     INIT "" --> "1.0.1"
--*     UPGRADE "1.0.1" --> "1.0.2"
--* /DEFINITION

--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
--* /INIT

--* UPGRADE "1.0.1" --> "1.0.2"
--* SET MESSAGE "Creating the users table"
CREATE TABLE users (
    id INTEGER,
    name VARCHAR
);
--* /UPGRADE
"#;

#[test]
fn test_scan_basic_file() {
    let file = scan_text(BASIC).unwrap();
    let segments = file.graph().segments();

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].source, None);
    assert_eq!(segments[0].target, "1.0.1");
    assert_eq!(segments[0].kind, SegmentKind::Init);
    assert_eq!(segments[1].source.as_deref(), Some("1.0.1"));
    assert_eq!(segments[1].target, "1.0.2");
    assert_eq!(segments[1].kind, SegmentKind::Upgrade);
}

#[test]
fn test_read_commands_lazily() {
    let mut file = scan_text(BASIC).unwrap();

    let init = file.read_commands(0).unwrap();
    assert_eq!(init.len(), 1);
    assert_eq!(init[0].kind, CommandKind::Persistent);
    assert!(init[0].text.starts_with("CREATE TABLE ks_version"));
    assert!(!init[0].text.contains(';'));

    let upgrade = file.read_commands(1).unwrap();
    assert_eq!(upgrade.len(), 2);
    assert_eq!(upgrade[0].kind, CommandKind::Transient);
    assert_eq!(upgrade[0].text, "SET MESSAGE \"Creating the users table\"");
    assert_eq!(upgrade[1].kind, CommandKind::Persistent);
    assert!(upgrade[1].text.contains("name VARCHAR"));
    assert_eq!(upgrade[1].line, 13);

    // Segments can be re-read in any order.
    let again = file.read_commands(0).unwrap();
    assert_eq!(again, init);
}

#[test]
fn test_missing_block_fails_with_not_found() {
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--*     UPGRADE "1.0.1" --> "1.0.2"
--* /DEFINITION
--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
--* /INIT
"#;
    let err = scan_text(text).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_missing_init_block_fails_with_not_found() {
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--* /DEFINITION
"#;
    let err = scan_text(text).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("not found"));
    assert!(!message.contains("null"));
}

#[test]
fn test_duplicate_declaration_rejected() {
    let text = r#"--* DEFINITION
--*     UPGRADE "1.0.1" --> "1.0.2"
--*     UPGRADE "1.0.1" --> "1.0.2"
--* /DEFINITION
"#;
    let err = scan_text(text).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateSegment { .. }));
}

#[test]
fn test_unterminated_branch_rejected() {
    let text = r#"--* DEFINITION
--*     UPGRADE "1.0.1" --> "1.0.2"
--*     BRANCH "legacy"
--*     UPGRADE "1.0.1" --> "1.0.1b"
--* /DEFINITION
"#;
    let err = scan_text(text).unwrap_err();
    match err {
        CoreError::UnterminatedBlock { block, line } => {
            assert!(block.contains("legacy"));
            assert_eq!(line, 3);
        }
        other => panic!("expected UnterminatedBlock, got {other:?}"),
    }
}

#[test]
fn test_branch_rejoin_must_be_declared() {
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--*     BRANCH "legacy"
--*     UPGRADE "1.0.1" --> "9.9.9"
--*     /BRANCH
--* /DEFINITION
"#;
    let err = scan_text(text).unwrap_err();
    assert!(matches!(err, CoreError::BranchRejoinNotFound { .. }));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_unterminated_body_block_rejected() {
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--* /DEFINITION
--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
"#;
    let err = scan_text(text).unwrap_err();
    assert!(matches!(err, CoreError::UnterminatedBlock { .. }));
}

#[test]
fn test_undeclared_body_block_rejected() {
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--* /DEFINITION
--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
--* /INIT
--* UPGRADE "1.0.1" --> "2.0.0"
CREATE TABLE surprise ( id INTEGER );
--* /UPGRADE
"#;
    let err = scan_text(text).unwrap_err();
    assert!(matches!(err, CoreError::UndeclaredBlock { .. }));
}

#[test]
fn test_missing_definition_section() {
    let err = scan_text("CREATE TABLE users ( id INTEGER );\n").unwrap_err();
    assert!(matches!(err, CoreError::MalformedLine { line: 1, .. }));

    let err = scan_text("-- just a comment\n").unwrap_err();
    assert!(matches!(err, CoreError::MissingDefinition));
}

#[test]
fn test_multiline_statement_keeps_first_line_number() {
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--* /DEFINITION
--* INIT "" --> "1.0.1"

-- comment before the statement
CREATE TABLE ks_version (
    version VARCHAR
);
INSERT INTO ks_version VALUES ( NULL )
--* /INIT
"#;
    let mut file = scan_text(text).unwrap();
    let commands = file.read_commands(0).unwrap();

    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].line, 7);
    // The trailing statement has no terminator but still executes.
    assert_eq!(commands[1].text, "INSERT INTO ks_version VALUES ( NULL )");
    assert_eq!(commands[1].line, 10);
}

#[test]
fn test_branch_segments_carry_branch_id() {
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--*     UPGRADE "1.0.1" --> "1.0.2"
--*     BRANCH "legacy"
--*     UPGRADE "1.0.1" --> "1.0.1b"
--*     UPGRADE "1.0.1b" --> "1.0.2"
--*     /BRANCH
--* /DEFINITION
--* INIT "" --> "1.0.1"
SELECT 1;
--* /INIT
--* UPGRADE "1.0.1" --> "1.0.2"
SELECT 2;
--* /UPGRADE
--* UPGRADE "1.0.1" --> "1.0.1b"
SELECT 3;
--* /UPGRADE
--* UPGRADE "1.0.1b" --> "1.0.2"
SELECT 4;
--* /UPGRADE
"#;
    let file = scan_text(text).unwrap();
    let segments = file.graph().segments();

    assert_eq!(segments[1].branch, None);
    assert_eq!(segments[2].branch.as_deref(), Some("legacy"));
    assert_eq!(segments[3].branch.as_deref(), Some("legacy"));
}
