use std::sync::Arc;

use notedex::lexical::query::{BooleanQuery, PhraseQuery, TermQuery};
use notedex::storage::memory::{MemoryStorage, MemoryStorageConfig};
use notedex::storage::Storage;
use notedex::{IndexConfig, IndexingSession, NotedexError, OpenMode, SearchSession};

fn memory_storage() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::new(MemoryStorageConfig::default()))
}

fn indexed(config: &IndexConfig, docs: &[(&str, &str)]) -> notedex::Result<Arc<dyn Storage>> {
    let storage = memory_storage();
    let mut session = IndexingSession::open(storage.clone(), config.clone(), OpenMode::Create)?;
    session.add_document_list(docs)?;
    session.close()?;
    Ok(storage)
}

fn ids(session: &SearchSession, query: &str) -> notedex::Result<Vec<String>> {
    let mut ids: Vec<String> = session.search(query)?.into_iter().map(|hit| hit.id).collect();
    ids.sort();
    Ok(ids)
}

fn notes() -> notedex::Result<SearchSession> {
    let config = IndexConfig::default();
    let storage = indexed(
        &config,
        &[
            ("n1", "The quick brown fox jumps over the lazy dog"),
            ("n2", "A brown dog sleeps; the fox is quick"),
            ("n3", "Shopping list: eggs, milk, brown bread"),
            ("n4", "Fox documentary notes"),
        ],
    )?;
    SearchSession::open(storage, config)
}

#[test]
fn test_hit_count_is_capped() -> notedex::Result<()> {
    let docs: Vec<(String, String)> = (0..1205)
        .map(|i| (format!("page-{i}"), format!("recurring entry number {i}")))
        .collect();
    let storage = memory_storage();
    let mut session = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Create)?;
    session.add_document_list(&docs)?;
    session.close()?;

    let search = SearchSession::open(storage, IndexConfig::default())?;
    let results = search.search_with_total("recurring")?;
    assert_eq!(results.total_hits, 1205);
    assert_eq!(results.hits.len(), 1000);
    Ok(())
}

#[test]
fn test_hits_are_sorted_by_score() -> notedex::Result<()> {
    let session = notes()?;
    let hits = session.search("fox OR dog")?;
    assert_eq!(hits.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // Matching both clauses beats matching one.
    assert!(hits[..2].iter().all(|hit| hit.id == "n1" || hit.id == "n2"));
    assert_eq!(hits[2].id, "n4");
    Ok(())
}

#[test]
fn test_phrase_requires_adjacency() -> notedex::Result<()> {
    let session = notes()?;
    assert_eq!(ids(&session, "\"quick brown\"")?, vec!["n1"]);
    assert_eq!(ids(&session, "\"brown dog\"")?, vec!["n2"]);
    // n2 has a stop word between "fox" and "quick".
    assert!(ids(&session, "\"fox quick\"")?.is_empty());
    assert_eq!(ids(&session, "\"fox quick\"~1")?, vec!["n2"]);
    assert_eq!(ids(&session, "\"fox quick\"~3")?, vec!["n1", "n2"]);
    Ok(())
}

#[test]
fn test_boolean_operators() -> notedex::Result<()> {
    let session = notes()?;
    assert_eq!(ids(&session, "brown AND NOT fox")?, vec!["n3"]);
    assert_eq!(ids(&session, "brown -fox")?, vec!["n3"]);
    assert_eq!(ids(&session, "+fox +dog")?, vec!["n1", "n2"]);
    assert_eq!(ids(&session, "fox AND (eggs OR documentary)")?, vec!["n4"]);
    assert_eq!(ids(&session, "brow*")?, vec!["n1", "n2", "n3"]);
    assert_eq!(ids(&session, "*:* -brown")?, vec!["n4"]);
    // A purely negative query matches nothing.
    assert!(ids(&session, "-fox")?.is_empty());
    Ok(())
}

#[test]
fn test_stop_words_only_matches_nothing() -> notedex::Result<()> {
    let session = notes()?;
    assert!(session.search("the")?.is_empty());
    assert!(session.search("the a")?.is_empty());
    Ok(())
}

#[test]
fn test_empty_query_fails() -> notedex::Result<()> {
    let session = notes()?;
    for query in ["", "  \t "] {
        let err = session.search(query).unwrap_err();
        assert!(matches!(err, NotedexError::QueryParse(_)), "{query:?}");
    }
    Ok(())
}

#[test]
fn test_fuzzy_wildcard_and_range_syntax() -> notedex::Result<()> {
    let config = IndexConfig::default();
    let storage = indexed(
        &config,
        &[
            ("p1", "roam the hills"),
            ("p2", "a test plan"),
            ("p3", "text notes"),
            ("p4", "banana bread"),
            ("p5", "cherry pie"),
        ],
    )?;
    let session = SearchSession::open(storage, config)?;

    assert_eq!(ids(&session, "roam~")?, vec!["p1"]);
    assert_eq!(ids(&session, "ROAD~")?, vec!["p1"]);
    assert_eq!(ids(&session, "te?t")?, vec!["p2", "p3"]);
    assert_eq!(ids(&session, "te*t")?, vec!["p2", "p3"]);
    assert_eq!(ids(&session, "[a TO c]")?, vec!["p4"]);
    assert_eq!(ids(&session, "[banana TO cherry]")?, vec!["p4", "p5"]);
    Ok(())
}

#[test]
fn test_malformed_queries_fail() -> notedex::Result<()> {
    let session = notes()?;
    for query in ["\"open phrase", "(fox", "fox AND", "postBody:", "fox^", "*ox", "fox~2"] {
        let err = session.search(query).unwrap_err();
        assert!(matches!(err, NotedexError::QueryParse(_)), "{query}");
    }
    Ok(())
}

#[test]
fn test_empty_index() -> notedex::Result<()> {
    let session = SearchSession::open(memory_storage(), IndexConfig::default())?;
    assert_eq!(session.num_docs(), 0);
    assert!(session.search("anything at all")?.is_empty());
    assert_eq!(session.search_with_total("*:*")?.total_hits, 0);
    Ok(())
}

#[test]
fn test_prebuilt_queries() -> notedex::Result<()> {
    let session = notes()?;
    let phrase = PhraseQuery::new("postBody", vec!["lazy".to_string(), "dog".to_string()]);
    assert_eq!(session.search_query(&phrase, 10)?.hits[0].id, "n1");

    let query = BooleanQuery::builder()
        .must(Box::new(TermQuery::new("postBody", "brown")))
        .must_not(Box::new(TermQuery::new("id", "n3")))
        .build();
    assert_eq!(session.search_query(&query, 10)?.total_hits, 2);
    Ok(())
}

#[test]
fn test_stemming_config() -> notedex::Result<()> {
    let config = IndexConfig::builder().stemming(true).build()?;
    let storage = indexed(&config, &[("s1", "Running meetings"), ("s2", "Walked home")])?;
    let session = SearchSession::open(storage, config)?;
    assert_eq!(ids(&session, "runs")?, vec!["s1"]);
    assert_eq!(ids(&session, "meeting")?, vec!["s1"]);
    assert_eq!(ids(&session, "walking")?, vec!["s2"]);
    Ok(())
}

#[test]
fn test_custom_field_names() -> notedex::Result<()> {
    let config = IndexConfig::builder()
        .id_field("page")
        .body_field("content")
        .build()?;
    let storage = indexed(&config, &[("x", "custom fields work")])?;
    let session = SearchSession::open(storage, config)?;
    let hits = session.search("fields")?;
    assert_eq!(hits[0].id, "x");
    assert_eq!(hits[0].post_body, "custom fields work");
    assert_eq!(session.all_values_by_field("page")?.len(), 1);
    Ok(())
}
