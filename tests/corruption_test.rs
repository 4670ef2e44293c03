use std::sync::Arc;

use tempfile::TempDir;

use notedex::storage::file::FileStorageConfig;
use notedex::storage::{Storage, StorageConfig, StorageFactory};
use notedex::{IndexConfig, IndexingSession, NotedexError, OpenMode, SearchSession};

fn indexed_dir() -> notedex::Result<(TempDir, Arc<dyn Storage>)> {
    let temp_dir = TempDir::new().unwrap();
    let storage = StorageFactory::create(StorageConfig::File(FileStorageConfig::new(temp_dir.path())))?;
    let mut session = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Create)?;
    session.add_document_list(&[("p1", "checksummed content"), ("p2", "more content")])?;
    session.close()?;
    Ok((temp_dir, storage))
}

fn flip_byte(dir: &TempDir, extension: &str) {
    let path = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| path.extension().is_some_and(|ext| ext == extension))
        .unwrap();
    let mut bytes = std::fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x5A;
    std::fs::write(&path, bytes).unwrap();
}

#[test]
fn test_corrupt_segment_files_are_detected() -> notedex::Result<()> {
    for extension in ["post", "dict", "docs", "lens"] {
        let (dir, storage) = indexed_dir()?;
        flip_byte(&dir, extension);
        let err = SearchSession::open(storage, IndexConfig::default()).unwrap_err();
        assert!(matches!(err, NotedexError::Corrupt(_)), "{extension}: {err}");
    }
    Ok(())
}

#[test]
fn test_corrupt_deletions_are_detected() -> notedex::Result<()> {
    let (dir, storage) = indexed_dir()?;
    let mut session = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Append)?;
    session.delete_document_by_id("p1")?;
    session.commit()?;
    drop(session);

    flip_byte(&dir, "del");
    let err = SearchSession::open(storage, IndexConfig::default()).unwrap_err();
    assert!(matches!(err, NotedexError::Corrupt(_)));
    Ok(())
}

#[test]
fn test_truncated_file_is_detected() -> notedex::Result<()> {
    let (dir, storage) = indexed_dir()?;
    let path = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| path.extension().is_some_and(|ext| ext == "docs"))
        .unwrap();
    std::fs::write(&path, [0u8, 1]).unwrap();
    let err = SearchSession::open(storage, IndexConfig::default()).unwrap_err();
    assert!(matches!(err, NotedexError::Corrupt(_)));
    Ok(())
}
