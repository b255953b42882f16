use slate_data::prelude::*;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct Note {
    id: Option<i64>,
    body: String,
}

impl Note {
    fn new(body: &str) -> Self {
        Note {
            id: None,
            body: body.to_string(),
        }
    }
}

impl Entity for Note {
    type Id = i64;

    fn id(&self) -> Option<&i64> {
        self.id.as_ref()
    }

    fn with_id(&self, id: i64) -> Self {
        Note {
            id: Some(id),
            body: self.body.clone(),
        }
    }
}

#[derive(Debug)]
struct DuplicateKey(i64);

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplicate key {}", self.0)
    }
}

impl std::error::Error for DuplicateKey {}

/// Stand-in connection: a table plus a log of what touched it.
#[derive(Debug, Default, Clone)]
struct MemoryDb {
    rows: BTreeMap<i64, Note>,
    last_id: i64,
    statements: Vec<&'static str>,
    locked: Vec<i64>,
}

impl MemoryDb {
    fn insert_generated(&mut self, note: &Note) -> i64 {
        self.last_id += 1;
        self.rows.insert(self.last_id, note.with_id(self.last_id));
        self.last_id
    }

    fn insert_with_id(&mut self, id: i64, note: Note) -> Result<u64, DataError> {
        if self.rows.contains_key(&id) {
            return Err(DataError::database(DuplicateKey(id)));
        }
        self.rows.insert(id, note);
        Ok(1)
    }
}

#[derive(Clone, Copy)]
struct NoteRepo;

fn op<T, F>(name: &'static str, f: F) -> DbAction<MemoryDb, T>
where
    T: Send + 'static,
    F: FnOnce(&mut MemoryDb) -> Result<T, DataError> + Send + 'static,
{
    DbAction::<MemoryDb, T>::new(move |db: &mut MemoryDb| {
        Box::pin(async move {
            db.statements.push(name);
            f(db)
        })
    })
    .named(name)
}

impl Repository<Note> for NoteRepo {
    type Conn = MemoryDb;

    fn find_all(&self) -> DbAction<MemoryDb, Vec<Note>> {
        op("find_all", |db| Ok(db.rows.values().cloned().collect()))
    }

    fn find_one(&self, id: i64) -> DbAction<MemoryDb, Option<Note>> {
        op("find_one", move |db| Ok(db.rows.get(&id).cloned()))
    }

    fn find_page(&self, pageable: &Pageable) -> DbAction<MemoryDb, Page<Note>> {
        let pageable = pageable.clone();
        op("find_page", move |db| {
            let content = db
                .rows
                .values()
                .skip(pageable.offset() as usize)
                .take(pageable.size as usize)
                .cloned()
                .collect();
            Ok(Page::new(content, &pageable, db.rows.len() as u64))
        })
    }

    fn count(&self) -> DbAction<MemoryDb, i64> {
        op("count", |db| Ok(db.rows.len() as i64))
    }

    fn batch_insert(&self, notes: Vec<Note>) -> DbAction<MemoryDb, Option<u64>> {
        op("batch_insert", move |db| {
            let mut inserted = 0;
            for note in notes {
                match note.id {
                    Some(id) => inserted += db.insert_with_id(id, note)?,
                    None => {
                        db.insert_generated(&note);
                        inserted += 1;
                    }
                }
            }
            Ok(Some(inserted))
        })
    }

    fn delete(&self, id: i64) -> DbAction<MemoryDb, u64> {
        op("delete", move |db| Ok(db.rows.remove(&id).map_or(0, |_| 1)))
    }

    fn insert_generated(&self, note: Note) -> DbAction<MemoryDb, i64> {
        op("insert_generated", move |db| Ok(db.insert_generated(&note)))
    }

    fn insert_with_id(&self, id: i64, note: Note) -> DbAction<MemoryDb, u64> {
        op("insert_with_id", move |db| db.insert_with_id(id, note))
    }

    fn update_by_id(&self, id: i64, note: Note) -> DbAction<MemoryDb, u64> {
        op("update_by_id", move |db| match db.rows.get_mut(&id) {
            Some(row) => {
                *row = note;
                Ok(1)
            }
            None => Ok(0),
        })
    }

    fn select_for_update(&self, id: i64) -> DbAction<MemoryDb, ()> {
        op("select_for_update", move |db| {
            db.locked.push(id);
            Ok(())
        })
    }
}

#[derive(Default)]
struct MemoryRunner {
    db: Mutex<MemoryDb>,
}

impl ActionRunner for MemoryRunner {
    type Conn = MemoryDb;

    async fn run<T: Send + 'static>(&self, action: DbAction<MemoryDb, T>) -> Result<T, DataError> {
        let mut db = self.db.lock().await;
        if !action.is_transactional() {
            return action.run(&mut db).await;
        }
        let snapshot = db.clone();
        let outcome = action.run(&mut db).await;
        if outcome.is_err() {
            *db = snapshot;
        }
        outcome
    }
}

#[tokio::test]
async fn save_without_identity_takes_generated_key() {
    let runner = MemoryRunner::default();
    let draft = Note::new("hello");

    let saved = runner.run(NoteRepo.save(draft.clone())).await.unwrap();
    assert_eq!(saved, draft.with_id(1));
    assert_eq!(draft.id, None);

    let found = runner.run(NoteRepo.find_one(1)).await.unwrap();
    assert_eq!(found, Some(saved));
    assert_eq!(
        runner.db.lock().await.statements,
        vec!["insert_generated", "find_one"]
    );
}

#[tokio::test]
async fn save_with_identity_keeps_it() {
    let runner = MemoryRunner::default();
    let natural = Note::new("pinned").with_id(42);

    let saved = runner.run(NoteRepo.save(natural.clone())).await.unwrap();
    assert_eq!(saved, natural);
    assert_eq!(runner.run(NoteRepo.find_one(42)).await.unwrap(), Some(natural));
    assert_eq!(runner.db.lock().await.statements[0], "insert_with_id");
}

#[tokio::test]
async fn duplicate_predefined_identity_surfaces_store_error() {
    let runner = MemoryRunner::default();
    let natural = Note::new("pinned").with_id(7);
    runner.run(NoteRepo.save(natural.clone())).await.unwrap();

    let err = runner.run(NoteRepo.save(natural)).await.unwrap_err();
    assert!(err.database_error::<DuplicateKey>().is_some());
}

#[tokio::test]
async fn update_returns_input_and_persists_fields() {
    let runner = MemoryRunner::default();
    let saved = runner.run(NoteRepo.save(Note::new("v1"))).await.unwrap();

    let edited = Note {
        body: "v2".into(),
        ..saved.clone()
    };
    let returned = runner.run(NoteRepo.update(edited.clone())).await.unwrap();
    assert_eq!(returned, edited);
    assert_eq!(
        runner.run(NoteRepo.find_one(1)).await.unwrap().unwrap().body,
        "v2"
    );
}

#[test]
fn update_of_transient_entity_panics_before_touching_the_store() {
    let runner = MemoryRunner::default();
    let outcome = catch_unwind(AssertUnwindSafe(|| NoteRepo.update(Note::new("ghost"))));
    assert!(outcome.is_err());
    assert!(runner.db.try_lock().unwrap().statements.is_empty());
}

#[test]
#[should_panic(expected = "cannot lock a transient")]
fn lock_of_transient_entity_panics() {
    let _ = NoteRepo.lock(Note::new("ghost"));
}

#[tokio::test]
async fn delete_reduces_count_by_one() {
    let runner = MemoryRunner::default();
    for body in ["a", "b", "c"] {
        runner.run(NoteRepo.save(Note::new(body))).await.unwrap();
    }
    let before = runner.run(NoteRepo.count()).await.unwrap();

    assert_eq!(runner.run(NoteRepo.delete(2)).await.unwrap(), 1);
    assert_eq!(runner.run(NoteRepo.count()).await.unwrap(), before - 1);
    assert_eq!(runner.run(NoteRepo.find_one(2)).await.unwrap(), None);
    assert!(!runner.run(NoteRepo.exists(2)).await.unwrap());
    assert_eq!(runner.run(NoteRepo.delete(2)).await.unwrap(), 0);
}

#[tokio::test]
async fn lock_resolves_to_the_same_entity() {
    let runner = MemoryRunner::default();
    let saved = runner.run(NoteRepo.save(Note::new("row"))).await.unwrap();

    let action = NoteRepo.execute_transactionally(NoteRepo.lock(saved.clone()));
    assert!(action.is_transactional());
    assert_eq!(runner.run(action).await.unwrap(), saved);
    assert_eq!(runner.db.lock().await.locked, vec![1]);
}

#[tokio::test]
async fn failed_transaction_leaves_no_rows_behind() {
    let runner = MemoryRunner::default();
    let pinned = Note::new("pinned").with_id(5);
    runner.run(NoteRepo.save(pinned.clone())).await.unwrap();

    let work = NoteRepo
        .save(Note::new("first"))
        .and_then(move |_| NoteRepo.save(pinned));
    let err = runner
        .run(NoteRepo.execute_transactionally(work))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Database(_)));
    assert_eq!(runner.run(NoteRepo.count()).await.unwrap(), 1);
}

#[tokio::test]
async fn batch_insert_mixes_generated_and_predefined_keys() {
    let runner = MemoryRunner::default();
    let inserted = runner
        .run(NoteRepo.batch_insert(vec![
            Note::new("a"),
            Note::new("b").with_id(100),
            Note::new("c"),
        ]))
        .await
        .unwrap();
    assert_eq!(inserted, Some(3));

    let all = runner.run(NoteRepo.find_all()).await.unwrap();
    let ids: Vec<_> = all.iter().filter_map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 100]);

    let page = runner
        .run(NoteRepo.find_page(&Pageable::new(1, 2)))
        .await
        .unwrap();
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.total_pages, 2);
}
