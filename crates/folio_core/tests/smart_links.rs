use folio_core::db::open_db_in_memory;
use folio_core::{
    extract_links, link_first_occurrence, link_selection, Block, BlockTree, BlockType,
    DocumentService, DocumentUpdate, MatchKind, NewDocument, Session, SqliteDocumentRepository,
    SqliteVersionRepository,
};
use rusqlite::Connection;

fn service(
    conn: &Connection,
) -> DocumentService<SqliteDocumentRepository<'_>, SqliteVersionRepository<'_>> {
    DocumentService::new(
        SqliteDocumentRepository::try_new(conn).unwrap(),
        SqliteVersionRepository::try_new(conn).unwrap(),
    )
}

fn session() -> Session {
    Session::new("user-1", "org-1")
}

#[test]
fn detector_uses_workspace_titles() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let roadmap = service
        .create(&session(), NewDocument::titled("Product Roadmap"))
        .unwrap();
    service.create(&session(), NewDocument::titled("Q3")).unwrap();

    let detector = service.link_detector().unwrap();
    let candidates = detector
        .detect("See the product roadmap before Q3 planning with Alice")
        .collect::<Vec<_>>();

    assert_eq!(candidates[0].anchor_text, "product roadmap");
    assert_eq!(
        candidates[0].kind,
        MatchKind::Exact {
            document_id: roadmap.id
        }
    );
    assert!(candidates
        .iter()
        .all(|candidate| candidate.anchor_text != "Q3"));
    assert!(candidates
        .iter()
        .any(|candidate| candidate.anchor_text == "Alice"
            && candidate.kind == MatchKind::Heuristic));
}

#[test]
fn empty_workspace_yields_no_candidates() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let detector = service.link_detector().unwrap();
    assert_eq!(detector.detect("Meeting with Alice about Budget").count(), 0);
}

#[test]
fn search_link_targets_is_case_insensitive() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let budget = service
        .create(&session(), NewDocument::titled("Budget Review"))
        .unwrap();
    service.create(&session(), NewDocument::titled("Hiring")).unwrap();

    let hits = service.search_link_targets("budget").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, budget.id);
    assert!(service.search_link_targets("   ").unwrap().is_empty());
}

#[test]
fn confirmed_link_is_persisted_and_reported_as_backlink() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let target = service
        .create(&session(), NewDocument::titled("Budget Review"))
        .unwrap();
    let source = service
        .create(
            &session(),
            NewDocument {
                title: Some("Weekly".to_string()),
                blocks: Some(BlockTree::new(vec![Block::new(
                    BlockType::Paragraph,
                    "Discuss the budget review today",
                )])),
                ..NewDocument::default()
            },
        )
        .unwrap();

    let block = &source.blocks.blocks()[0];
    let start = block.content.find("budget review").unwrap();
    let linked = link_selection(&block.content, start..start + 13, target.id).unwrap();
    assert_eq!(
        linked,
        format!("Discuss the [budget review](/documents/{}) today", target.id)
    );

    let mut blocks = source.blocks.clone();
    assert!(blocks.set_content(&block.id, linked));
    let mut update = DocumentUpdate::from_document(&source);
    update.blocks = blocks;
    let saved = service.update(source.id, update).unwrap();

    let links = extract_links(&saved.blocks.blocks()[0].content);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target_id, target.id);

    let backlinks = service.backlinks(target.id).unwrap();
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0].id, source.id);
    assert!(service.backlinks(source.id).unwrap().is_empty());

    let detector = service.link_detector().unwrap();
    assert!(detector
        .detect(&saved.blocks.blocks()[0].content)
        .all(|candidate| candidate.anchor_text != "budget review"));
}

#[test]
fn first_occurrence_fallback_leaves_missing_anchor_alone() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let target = service.create(&session(), NewDocument::titled("Atlas")).unwrap();

    let content = "Atlas notes and Atlas again";
    let linked = link_first_occurrence(content, "Atlas", target.id);
    assert!(linked.starts_with("[Atlas](/documents/"));
    assert!(linked.ends_with("and Atlas again"));
    assert_eq!(link_first_occurrence(content, "Zephyr", target.id), content);
}
