use plaintask_core::model::text_project::TextProjectPatch;
use plaintask_core::{ResourceStore, TextProject, TextStore};
use std::fs;
use std::path::Path;

const ID_A: &str = "123e4567-e89b-12d3-a456-426614174000";
const ID_B: &str = "aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee";

#[cfg(unix)]
fn inode(path: &Path) -> u64 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).unwrap().ino()
}

fn canonical_file() -> String {
    format!(
        "- First\n\t- step\n\nSome notes\n\n#work\n<!--ID: {ID_A}-->\n\n- Second\n\n<!--ID: {ID_B}-->\n<<END>>"
    )
}

#[test]
fn plan_trip_gets_a_durable_identifier_on_first_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.md");
    fs::write(&path, "- Plan trip\n<<END>>").unwrap();
    let store = TextStore::open(&path).unwrap();

    let first = store.read(None);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].title, "- Plan trip");

    let on_disk = fs::read_to_string(&path).unwrap();
    assert_eq!(
        on_disk,
        format!("- Plan trip\n<!--ID: {}-->\n<<END>>", first[0].id)
    );

    let second = store.read(None);
    assert_eq!(second[0].id, first[0].id);
}

#[test]
fn read_keeps_text_outside_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.md");
    fs::write(&path, "My list\n\n- Unidentified\n\n- Other\n<<END>>\ntrailing").unwrap();
    let store = TextStore::open(&path).unwrap();

    let records = store.read(None);
    assert_eq!(records.len(), 2);

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.starts_with("My list\n\n- Unidentified\n<!--ID: "));
    assert!(on_disk.ends_with("<<END>>\ntrailing"));
}

#[cfg(unix)]
#[test]
fn canonical_file_is_never_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.md");
    fs::write(&path, canonical_file()).unwrap();
    let store = TextStore::open(&path).unwrap();
    let before = inode(&path);

    assert_eq!(store.read(None).len(), 2);
    assert_eq!(inode(&path), before);

    let same_title = TextProjectPatch {
        title: Some("- First".to_string()),
        ..TextProjectPatch::default()
    };
    assert_eq!(store.update(ID_A, same_title), 1);
    assert_eq!(inode(&path), before);
    assert_eq!(fs::read_to_string(&path).unwrap(), canonical_file());

    let renamed = TextProjectPatch {
        title: Some("- First (renamed)".to_string()),
        ..TextProjectPatch::default()
    };
    assert_eq!(store.update(ID_A, renamed), 1);
    assert_ne!(inode(&path), before);
}

#[test]
fn create_appends_serialized_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.md");
    let store = TextStore::open(&path).unwrap();

    let mut first = TextProject::new("- Buy milk");
    first.tags = vec!["#errand".to_string()];
    let created = store.create(vec![first, TextProject::new("- Call mom")]);

    assert_eq!(created.len(), 2);
    let expected = format!(
        "- Buy milk\n\n#errand\n<!--ID: {}-->\n\n- Call mom\n\n<!--ID: {}-->\n<<END>>",
        created[0].id, created[1].id
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), expected);
}

#[test]
fn create_refuses_records_the_grammar_cannot_hold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.md");
    let store = TextStore::open(&path).unwrap();

    let created = store.create(vec![TextProject::new("- fine"), TextProject::new("no marker")]);
    assert!(created.is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), "\n<<END>>");
}

#[test]
fn update_many_and_delete_many_rewrite_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.md");
    fs::write(&path, canonical_file()).unwrap();
    let store = TextStore::open(&path).unwrap();

    let patches = vec![
        TextProjectPatch {
            id: Some(ID_B.to_string()),
            tags: Some(vec!["#later".to_string()]),
            ..TextProjectPatch::default()
        },
        TextProjectPatch {
            id: Some("ffffffff-bbbb-4ccc-8ddd-eeeeeeeeeeee".to_string()),
            title: Some("- ghost".to_string()),
            ..TextProjectPatch::default()
        },
    ];
    assert_eq!(store.update_many(patches), 1);
    let second = store
        .read(None)
        .into_iter()
        .find(|record| record.id == ID_B)
        .unwrap();
    assert_eq!(second.tags, vec!["#later".to_string()]);

    assert_eq!(store.delete_many(&[ID_A.to_string(), "missing".to_string()]), 1);
    let remaining = store.read(None);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ID_B);
    assert!(!fs::read_to_string(&path).unwrap().contains(ID_A));

    assert_eq!(store.delete("missing"), 0);
}

#[test]
fn read_filters_on_wire_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.md");
    fs::write(&path, canonical_file()).unwrap();
    let store = TextStore::open(&path).unwrap();

    let mut filter = plaintask_core::Filter::new();
    filter.insert("_id".to_string(), serde_json::json!(ID_B));
    let found = store.read(Some(&filter));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "- Second");
}

#[test]
fn tags_above_a_blank_line_survive_a_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.md");
    fs::write(&path, format!("- Buy milk\n\n#errand\n\n<!--ID: {ID_A}-->\n<<END>>")).unwrap();
    let store = TextStore::open(&path).unwrap();

    let renamed = TextProjectPatch {
        title: Some("- Buy oat milk".to_string()),
        ..TextProjectPatch::default()
    };
    assert_eq!(store.update(ID_A, renamed), 1);

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("- Buy oat milk\n\n#errand\n<!--ID: {ID_A}-->\n<<END>>")
    );
    let records = store.read(None);
    assert_eq!(records[0].tags, vec!["#errand".to_string()]);
    assert_eq!(records[0].description, "");
}
