//! Loading hand-written and legacy record files through the public API.

use std::collections::{BTreeSet, HashSet};
use std::io::Write;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use tempfile::TempDir;
use trellis::domain::{
    AcceptanceCriterion, Comment, Dependency, DependencyKind, Priority, Record, RecordType, Status,
};
use trellis::store::LoadWarning;

mod common;
use common::store_in;

const STAMP: &str = r#""created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z""#;

fn write_lines(dir: &TempDir, lines: &[String]) {
    let mut file = std::fs::File::create(dir.path().join("records.jsonl")).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

fn line(id: &str, extra: &str) -> String {
    if extra.is_empty() {
        format!(r#"{{"id":"{id}","title":"{id}",{STAMP}}}"#)
    } else {
        format!(r#"{{"id":"{id}","title":"{id}",{STAMP},{extra}}}"#)
    }
}

#[tokio::test]
async fn corrupt_lines_are_reported_and_the_rest_loads() {
    let dir = TempDir::new().unwrap();
    write_lines(
        &dir,
        &[
            line("a", ""),
            "{\"id\":".to_string(),
            String::new(),
            line("b", r#""priority":"whenever""#),
            line("c", ""),
        ],
    );
    let store = store_in(dir.path());

    let (records, warnings) = store.load().await.unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    let skipped: Vec<usize> = warnings
        .iter()
        .filter(|w| w.is_skip())
        .map(LoadWarning::line_number)
        .collect();
    assert_eq!(skipped, vec![2, 4]);
    assert!(!store.lock_path().exists());
}

#[tokio::test]
async fn load_never_writes() {
    let dir = TempDir::new().unwrap();
    write_lines(&dir, &[line("a", r#""status":"blocked""#)]);
    let before = std::fs::read_to_string(dir.path().join("records.jsonl")).unwrap();
    let store = store_in(dir.path());

    let (records, warnings) = store.load().await.unwrap();

    assert_eq!(records[0].status, Status::Open);
    assert!(matches!(warnings[0], LoadWarning::Migrated { .. }));
    let after = std::fs::read_to_string(dir.path().join("records.jsonl")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn legacy_edges_are_folded_and_pruned() {
    let dir = TempDir::new().unwrap();
    write_lines(
        &dir,
        &[
            line(
                "a",
                r#""dependencies":[{"target_id":"b","kind":"blocks"},{"target_id":"b","kind":"mystery"},{"kind":"related"}]"#,
            ),
            line("b", ""),
        ],
    );
    let store = store_in(dir.path());

    let (records, warnings) = store.load().await.unwrap();

    let a = &records[0];
    assert_eq!(a.dependencies.len(), 1);
    assert_eq!(a.dependencies[0].kind, DependencyKind::BlockedBy);
    assert!(a.updated_at.timestamp() > 1_704_067_200);
    assert_eq!(records[1].updated_at.timestamp(), 1_704_067_200);
    assert_eq!(warnings.len(), 3);
    assert!(warnings.iter().all(|w| w.line_number() == 1 && !w.is_skip()));
}

#[tokio::test]
async fn mutual_blocks_keep_the_smaller_id_edge() {
    let dir = TempDir::new().unwrap();
    write_lines(
        &dir,
        &[
            line("z", r#""dependencies":[{"target_id":"m","kind":"blocked_by"}]"#),
            line("m", r#""dependencies":[{"target_id":"z","kind":"blocked_by"}]"#),
        ],
    );
    let store = store_in(dir.path());

    let (records, warnings) = store.load().await.unwrap();

    let z = records.iter().find(|r| r.id.as_str() == "z").unwrap();
    let m = records.iter().find(|r| r.id.as_str() == "m").unwrap();
    assert!(z.dependencies.is_empty());
    assert_eq!(m.dependencies.len(), 1);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].line_number(), 1);
}

#[tokio::test]
async fn repaired_data_is_persisted_by_the_next_update() {
    let dir = TempDir::new().unwrap();
    write_lines(&dir, &[line("a", r#""status":"blocked""#)]);
    let store = store_in(dir.path());

    store.update(|records| records).await.unwrap();

    let content = std::fs::read_to_string(store.data_path()).unwrap();
    assert!(content.contains(r#""status":"open""#));
    let (_, warnings) = store.load().await.unwrap();
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn completion_is_scored_on_load() {
    let dir = TempDir::new().unwrap();
    write_lines(
        &dir,
        &[
            line(
                "epic",
                r#""acceptance_criteria":[{"text":"Docs","completed":true},{"text":"Demo"}],"completion_percentage":3"#,
            ),
            line(
                "child",
                r#""status":"closed","closed_at":"2024-01-02T00:00:00Z","dependencies":[{"target_id":"epic","kind":"parent-child"}]"#,
            ),
        ],
    );
    let store = store_in(dir.path());

    let (records, _) = store.load().await.unwrap();

    // (1 criterion + 1 closed subtask) of 3 units
    assert_eq!(records[0].completion_percentage, Some(67));
    assert_eq!(records[1].completion_percentage, Some(100));
}

#[tokio::test]
async fn informational_self_edges_load_and_persist() {
    let dir = TempDir::new().unwrap();
    write_lines(
        &dir,
        &[
            line(
                "a",
                r#""dependencies":[{"target_id":"a","kind":"related"},{"target_id":"a","kind":"discovered-from"}]"#,
            ),
            line("b", ""),
            line("c", r#""dependencies":[{"target_id":"c","kind":"blocked_by"}]"#),
        ],
    );
    let store = store_in(dir.path());

    let (records, warnings) = store.load().await.unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(records[0].dependencies.len(), 2);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].is_skip());
    assert_eq!(warnings[0].line_number(), 3);

    store.update(|records| records).await.unwrap();

    let (records, warnings) = store.load().await.unwrap();
    assert!(warnings.is_empty());
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(records[0].dependencies.len(), 2);
}

// =============================================================================
// Rewrite then load gives back what was written
// =============================================================================

const STATUSES: [Status; 3] = [Status::Open, Status::InProgress, Status::Closed];
const PRIORITIES: [Priority; 4] = [
    Priority::Low,
    Priority::Medium,
    Priority::High,
    Priority::Urgent,
];
const TYPES: [RecordType; 7] = [
    RecordType::Epic,
    RecordType::Feature,
    RecordType::Task,
    RecordType::Bug,
    RecordType::Chore,
    RecordType::Docs,
    RecordType::Refactor,
];
const KINDS: [DependencyKind; 4] = [
    DependencyKind::BlockedBy,
    DependencyKind::ParentChild,
    DependencyKind::Related,
    DependencyKind::DiscoveredFrom,
];

#[derive(Debug, Clone)]
struct Shape {
    status: usize,
    priority: Option<usize>,
    record_type: Option<usize>,
    description: Option<String>,
    notes: Option<String>,
    assignee: Option<String>,
    labels: BTreeSet<String>,
    criteria: Vec<(String, bool)>,
    comments: Vec<(String, String)>,
    edges: Vec<(usize, usize)>,
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    (
        (
            0usize..STATUSES.len(),
            proptest::option::of(0usize..PRIORITIES.len()),
            proptest::option::of(0usize..TYPES.len()),
        ),
        (
            proptest::option::of("\\PC{0,40}"),
            proptest::option::of("\\PC{0,40}"),
            proptest::option::of("[a-z]{1,8}"),
        ),
        proptest::collection::btree_set("[a-z]{1,8}", 0..4),
        proptest::collection::vec(("[a-z][a-z ]{0,15}", any::<bool>()), 0..4),
        proptest::collection::vec(("[a-z]{1,8}", "[a-z][a-z ]{0,20}"), 0..3),
        proptest::collection::vec((0usize..KINDS.len(), any::<usize>()), 0..5),
    )
        .prop_map(
            |(
                (status, priority, record_type),
                (description, notes, assignee),
                labels,
                criteria,
                comments,
                edges,
            )| Shape {
                status,
                priority,
                record_type,
                description,
                notes,
                assignee,
                labels,
                criteria,
                comments,
                edges,
            },
        )
}

fn build_records(shapes: Vec<Shape>) -> Vec<Record> {
    let base = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let count = shapes.len();

    shapes
        .into_iter()
        .enumerate()
        .map(|(i, shape)| {
            let created_at = base + Duration::hours(i64::try_from(i).unwrap());
            let mut record = Record::new(format!("r-{i}"), format!("Record {i}"));
            record.created_at = created_at;
            record.updated_at = created_at + Duration::hours(1);
            record.status = STATUSES[shape.status];
            if record.status == Status::Closed {
                record.closed_at = Some(created_at + Duration::minutes(30));
            }
            record.priority = shape.priority.map(|p| PRIORITIES[p]);
            record.record_type = shape.record_type.map(|t| TYPES[t]);
            record.description = shape.description;
            record.notes = shape.notes;
            record.assignee = shape.assignee;
            record.labels = shape.labels.into_iter().collect();
            record.acceptance_criteria = shape
                .criteria
                .into_iter()
                .map(|(text, done)| AcceptanceCriterion::new(text, done))
                .collect();
            record.comments = shape
                .comments
                .into_iter()
                .enumerate()
                .map(|(k, (author, content))| Comment {
                    id: format!("c-{i}{k}"),
                    author,
                    content,
                    created_at: created_at + Duration::minutes(i64::try_from(k).unwrap()),
                })
                .collect();

            // Acyclic kinds only point at earlier records; the others may
            // point anywhere, the record itself included.
            let mut seen = HashSet::new();
            for (kind, seed) in shape.edges {
                let kind = KINDS[kind];
                let target = if kind.requires_acyclic() {
                    if i == 0 {
                        continue;
                    }
                    seed % i
                } else {
                    seed % count
                };
                if seen.insert((target, kind)) {
                    record
                        .dependencies
                        .push(Dependency::new(format!("r-{target}"), kind));
                }
            }
            record
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn populated_records_survive_a_rewrite(
        records in proptest::collection::vec(arb_shape(), 1..6).prop_map(build_records)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        let expected = records.clone();

        let (loaded, warnings) = runtime.block_on(async {
            store.update(move |_| records).await.unwrap();
            store.load().await.unwrap()
        });

        prop_assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
        let loaded: Vec<Record> = loaded
            .into_iter()
            .map(|mut record| {
                record.completion_percentage = None;
                record
            })
            .collect();
        prop_assert_eq!(loaded, expected);
    }
}
