use std::sync::Arc;

use tempfile::TempDir;

use notedex::storage::file::FileStorageConfig;
use notedex::storage::{Storage, StorageConfig, StorageFactory};
use notedex::{DEFAULT_INDEX_DIR, IndexConfig, IndexingSession, NotedexError, OpenMode, SearchSession};

fn file_storage(dir: &TempDir) -> notedex::Result<Arc<dyn Storage>> {
    let config = FileStorageConfig::new(dir.path().join(DEFAULT_INDEX_DIR));
    StorageFactory::create(StorageConfig::File(config))
}

fn index(storage: &Arc<dyn Storage>, mode: OpenMode, docs: &[(&str, &str)]) -> notedex::Result<()> {
    let mut session = IndexingSession::open(storage.clone(), IndexConfig::default(), mode)?;
    session.add_document_list(docs)?;
    session.close()
}

fn hit_ids(session: &SearchSession, query: &str) -> notedex::Result<Vec<String>> {
    Ok(session.search(query)?.into_iter().map(|hit| hit.id).collect())
}

#[test]
fn test_unique_term_finds_its_page() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;

    index(
        &storage,
        OpenMode::Create,
        &[
            ("page-1", "Quarterly budget review"),
            ("page-2", "Team offsite agenda"),
            ("page-3", "Budget spreadsheet links"),
        ],
    )?;

    let session = SearchSession::open(storage, IndexConfig::default())?;
    assert_eq!(hit_ids(&session, "offsite")?, vec!["page-2"]);
    assert_eq!(session.search("budget")?.len(), 2);
    assert_eq!(session.num_docs(), 3);
    assert_eq!(session.max_doc(), 3);
    Ok(())
}

#[test]
fn test_delete_by_id_hides_page_from_next_reader() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;
    index(
        &storage,
        OpenMode::Create,
        &[("page-1", "unicorn sightings"), ("page-2", "horse care")],
    )?;

    let before = SearchSession::open(storage.clone(), IndexConfig::default())?;

    let mut session = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Append)?;
    assert_eq!(session.delete_document_by_id("page-1")?, 1);
    session.commit()?;

    let after = SearchSession::open(storage.clone(), IndexConfig::default())?;
    assert!(after.search("unicorn")?.is_empty());
    assert_eq!(after.num_docs(), 1);
    // Deleted documents keep their slot until a merge.
    assert_eq!(after.max_doc(), 2);

    // An already open session keeps its snapshot.
    assert_eq!(hit_ids(&before, "unicorn")?, vec!["page-1"]);

    session.close()?;
    let merged = SearchSession::open(storage, IndexConfig::default())?;
    assert_eq!(merged.max_doc(), 1);
    assert_eq!(hit_ids(&merged, "horse")?, vec!["page-2"]);
    Ok(())
}

#[test]
fn test_all_ids_after_rebuild() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;

    let mut session = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Create)?;
    session.add_document_list(&[
        ("p1", "one"),
        ("p2", "two"),
        ("p3", "three"),
        ("p3", "three again"),
        ("p4", "four"),
    ])?;
    session.delete_document_by_id("p2")?;
    session.close()?;

    let search = SearchSession::open(storage, IndexConfig::default())?;
    let ids: Vec<String> = search.all_values_by_field("id")?.into_iter().collect();
    assert_eq!(ids, vec!["p1", "p3", "p4"]);
    // Duplicate ids are separate documents.
    assert_eq!(search.num_docs(), 4);
    Ok(())
}

#[test]
fn test_empty_id_is_listed_and_deletable() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;
    index(&storage, OpenMode::Create, &[("", "hello"), ("a", "world")])?;

    let search = SearchSession::open(storage.clone(), IndexConfig::default())?;
    let ids: Vec<String> = search.all_values_by_field("id")?.into_iter().collect();
    assert_eq!(ids, vec!["", "a"]);

    let mut session = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Append)?;
    assert_eq!(session.delete_document_by_id("")?, 1);
    session.close()?;

    let after = SearchSession::open(storage, IndexConfig::default())?;
    assert_eq!(after.num_docs(), 1);
    assert!(after.search("hello")?.is_empty());
    assert_eq!(hit_ids(&after, "world")?, vec!["a"]);
    Ok(())
}

#[test]
fn test_deleted_terms_listed_until_merge() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;
    index(&storage, OpenMode::Create, &[("p1", "one"), ("p2", "two")])?;

    let mut session = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Append)?;
    session.delete_document_by_id("p1")?;
    session.commit()?;

    let unmerged = SearchSession::open(storage.clone(), IndexConfig::default())?;
    assert_eq!(unmerged.all_values_by_field("id")?.len(), 2);

    session.close()?;
    let merged = SearchSession::open(storage, IndexConfig::default())?;
    assert_eq!(merged.all_values_by_field("id")?.len(), 1);
    Ok(())
}

#[test]
fn test_create_mode_replaces_index() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;
    index(&storage, OpenMode::Create, &[("old-1", "ancient scrolls"), ("old-2", "dusty tomes")])?;
    index(&storage, OpenMode::Create, &[("new-1", "fresh scrolls")])?;

    let session = SearchSession::open(storage.clone(), IndexConfig::default())?;
    assert_eq!(session.num_docs(), 1);
    assert!(session.search("dusty")?.is_empty());
    assert_eq!(hit_ids(&session, "scrolls")?, vec!["new-1"]);

    // Old segment files are gone from the directory.
    let files = storage.list_files()?;
    assert!(files.iter().filter(|name| name.ends_with(".post")).count() == 1);
    Ok(())
}

#[test]
fn test_append_mode() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;

    let err = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Append).unwrap_err();
    assert!(matches!(err, NotedexError::NotFound(_)));

    index(&storage, OpenMode::CreateOrAppend, &[("p1", "first")])?;
    index(&storage, OpenMode::Append, &[("p2", "second")])?;
    index(&storage, OpenMode::CreateOrAppend, &[("p3", "third")])?;

    let session = SearchSession::open(storage, IndexConfig::default())?;
    assert_eq!(session.num_docs(), 3);
    Ok(())
}

#[test]
fn test_second_writer_fails_to_lock() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;

    let first = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Create)?;
    let second = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::CreateOrAppend);
    assert!(matches!(second, Err(NotedexError::LockObtainFailed(_))));

    // Readers take no lock.
    assert!(SearchSession::open(storage.clone(), IndexConfig::default()).is_ok());

    first.close()?;
    assert!(IndexingSession::open(storage, IndexConfig::default(), OpenMode::Append).is_ok());
    Ok(())
}

#[test]
fn test_lock_is_shared_across_storage_instances() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let first_storage = file_storage(&temp_dir)?;
    let second_storage = file_storage(&temp_dir)?;

    let _writer = IndexingSession::open(first_storage, IndexConfig::default(), OpenMode::Create)?;
    let err = IndexingSession::open(second_storage, IndexConfig::default(), OpenMode::Create).unwrap_err();
    assert!(matches!(err, NotedexError::LockObtainFailed(_)));
    Ok(())
}

#[test]
fn test_drop_without_close_commits_nothing() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;
    index(&storage, OpenMode::Create, &[("p1", "kept page")])?;

    {
        let mut session =
            IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Append)?;
        session.add_document_list(&[("p2", "lost page")])?;
        session.delete_document_by_id("p1")?;
    }

    assert!(!storage.file_exists("write.lock"));
    let search = SearchSession::open(storage.clone(), IndexConfig::default())?;
    assert_eq!(hit_ids(&search, "page")?, vec!["p1"]);

    // The directory can be written again.
    index(&storage, OpenMode::Append, &[("p3", "next page")])?;
    Ok(())
}

#[test]
fn test_merge_renumbers_and_keeps_results() -> notedex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let storage = file_storage(&temp_dir)?;
    let config = IndexConfig::builder().max_buffered_docs(2).build()?;

    let mut session = IndexingSession::open(storage.clone(), config.clone(), OpenMode::Create)?;
    session.add_document_list(&[
        ("a", "alpha shared"),
        ("b", "beta shared"),
        ("c", "gamma shared"),
        ("d", "delta shared"),
        ("e", "epsilon shared"),
    ])?;
    session.commit()?;

    let before = SearchSession::open(storage.clone(), config.clone())?;
    assert_eq!(before.reader().segments().len(), 3);
    let mut expected = hit_ids(&before, "shared")?;

    session.delete_document_by_id("b")?;
    session.close()?;

    let after = SearchSession::open(storage, config)?;
    assert_eq!(after.reader().segments().len(), 1);
    assert_eq!(after.max_doc(), 4);
    assert_eq!(after.document(1)?.get("id"), Some("c"));

    expected.retain(|id| id != "b");
    let mut actual = hit_ids(&after, "shared")?;
    expected.sort();
    actual.sort();
    assert_eq!(actual, expected);
    assert_eq!(hit_ids(&after, "gamma")?, vec!["c"]);
    Ok(())
}
