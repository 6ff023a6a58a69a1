//! Book storage and search on top of the SQLite schema.
//!
//! Books are keyed twice: by identity `hash` (one row per work) and by `path`
//! (one row per file). Match keys live in `book_keys`, one row per key, so an
//! "all of these keys" search is a `GROUP BY ... HAVING COUNT(*) = n`.

use crate::Database;
use crate::error::{ErrorKind, Result, SqlxResultExt};
use crate::models::{BookRow, KeyKind, RefreshRow, path_to_string};
use crate::store::{BookStore, SearchIndex};
use async_trait::async_trait;
use exn::ResultExt;
use libris_book::{Book, RefreshStats, lexical_keys, normalize, normalize_language, phonetic_keys};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Columns that `field:value` queries may filter on.
const FILTER_FIELDS: [&str; 5] = ["author", "title", "language", "series", "isbn"];

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn limit(limit: usize) -> Result<i64> {
        i64::try_from(limit).or_raise(|| ErrorKind::InvalidData("limit"))
    }

    /// Insert one book row and its keys. Returns `false` if the insert was
    /// ignored by an `ON CONFLICT DO NOTHING` clause in `sql`.
    async fn insert_row(conn: &mut SqliteConnection, sql: &'static str, row: &BookRow) -> Result<bool> {
        let inserted = sqlx::query(sql)
            .bind(&row.hash)
            .bind(&row.path)
            .bind(&row.title)
            .bind(&row.author)
            .bind(&row.language)
            .bind(&row.description)
            .bind(&row.publisher)
            .bind(&row.isbn)
            .bind(&row.series)
            .bind(row.series_index)
            .bind(row.published_at)
            .bind(row.size)
            .bind(row.added_at)
            .bind(row.has_cover)
            .bind(&row.cover_path)
            .execute(&mut *conn)
            .await
            .or_classify()?
            .rows_affected()
            == 1;
        if inserted {
            for (kind, keys) in [(KeyKind::Lexical, &row.lexical_keys), (KeyKind::Phonetic, &row.phonetic_keys)] {
                sqlx::query(include_str!("../queries/insert_keys.sql"))
                    .bind(&row.hash)
                    .bind(kind.as_str())
                    .bind(keys)
                    .execute(&mut *conn)
                    .await
                    .or_classify()?;
            }
        }
        Ok(inserted)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    pub async fn get_by_hash(&self, hash: &str) -> Result<Option<Book>> {
        let row: Option<BookRow> = sqlx::query_as(include_str!("../queries/get_by_hash.sql"))
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .or_classify()?;
        row.map(Book::try_from).transpose()
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar(include_str!("../queries/count_books.sql")).fetch_one(&self.pool).await.or_classify()?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }

    /// Most recent refresh windows first.
    pub async fn list_refreshes(&self, limit: usize) -> Result<Vec<RefreshStats>> {
        let rows: Vec<RefreshRow> = sqlx::query_as(include_str!("../queries/list_refreshes.sql"))
            .bind(Self::limit(limit)?)
            .fetch_all(&self.pool)
            .await
            .or_classify()?;
        rows.into_iter().map(RefreshStats::try_from).collect()
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Search the catalogue.
    ///
    /// - An empty query lists the most recently added books.
    /// - A query containing `:` is a comma separated list of `field:value`
    ///   filters over author, title, language, series and isbn. Author and
    ///   title values are canonicalized the same way stored books are.
    /// - Anything else matches books holding *every* lexical key of the
    ///   query, falling back to every phonetic key when nothing matched.
    #[instrument(level = "debug", skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Book>> {
        let query = query.trim();
        if query.is_empty() {
            return self.recent(limit).await;
        }
        if query.contains(':') {
            return self.filter(query, limit).await;
        }
        let books = self.search_keys(KeyKind::Lexical, lexical_keys(query), limit).await?;
        if !books.is_empty() {
            return Ok(books);
        }
        self.search_keys(KeyKind::Phonetic, phonetic_keys(query), limit).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(include_str!("../queries/recent_books.sql"))
            .bind(Self::limit(limit)?)
            .fetch_all(&self.pool)
            .await
            .or_classify()?;
        rows.into_iter().map(Book::try_from).collect()
    }

    async fn search_keys(&self, kind: KeyKind, keys: BTreeSet<String>, limit: usize) -> Result<Vec<Book>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let wanted = i64::try_from(keys.len()).or_raise(|| ErrorKind::InvalidData("key count"))?;
        let keys = serde_json::to_string(&keys).or_raise(|| ErrorKind::InvalidData("search keys"))?;
        let rows: Vec<BookRow> = sqlx::query_as(include_str!("../queries/search_keys.sql"))
            .bind(kind.as_str())
            .bind(keys)
            .bind(wanted)
            .bind(Self::limit(limit)?)
            .fetch_all(&self.pool)
            .await
            .or_classify()?;
        rows.into_iter().map(Book::try_from).collect()
    }

    async fn filter(&self, query: &str, limit: usize) -> Result<Vec<Book>> {
        let filters = parse_filters(query)?;
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM book_rows");
        for (i, (column, value)) in filters.into_iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            builder.push(column).push(" = ").push_bind(value).push(" COLLATE NOCASE");
        }
        builder.push(" ORDER BY author, title LIMIT ").push_bind(Self::limit(limit)?);
        let rows: Vec<BookRow> = builder.build_query_as().fetch_all(&self.pool).await.or_classify()?;
        rows.into_iter().map(Book::try_from).collect()
    }

    /// Full-text search over author, title and description, best match first.
    ///
    /// Every whitespace separated word is quoted, so FTS5 operators in user
    /// input are matched literally rather than interpreted.
    #[instrument(level = "debug", skip(self))]
    pub async fn full_text(&self, query: &str, limit: usize) -> Result<Vec<Book>> {
        let Some(query) = fts_query(query) else {
            return Ok(Vec::new());
        };
        let rows: Vec<BookRow> = sqlx::query_as(include_str!("../queries/full_text.sql"))
            .bind(query)
            .bind(Self::limit(limit)?)
            .fetch_all(&self.pool)
            .await
            .or_classify()?;
        rows.into_iter().map(Book::try_from).collect()
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Remove a book, its keys and its full-text entry.
    pub async fn delete_by_hash(&self, hash: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await.or_classify()?;
        sqlx::query(include_str!("../queries/delete_fts.sql")).bind(hash).execute(&mut *tx).await.or_classify()?;
        let deleted = sqlx::query(include_str!("../queries/delete_book.sql"))
            .bind(hash)
            .execute(&mut *tx)
            .await
            .or_classify()?
            .rows_affected();
        tx.commit().await.or_classify()?;
        Ok(deleted > 0)
    }
}

fn parse_filters(query: &str) -> Result<Vec<(&'static str, String)>> {
    let mut filters = Vec::new();
    for term in query.split(',') {
        let parts = term.split(':').collect::<Vec<_>>();
        let [field, value] = parts.as_slice() else {
            continue;
        };
        let field = field.trim().to_lowercase();
        let value = value.trim();
        let Some(column) = FILTER_FIELDS.into_iter().find(|f| *f == field) else {
            exn::bail!(ErrorKind::InvalidQuery(format!("unknown field {field:?}")));
        };
        let value = match column {
            "author" => normalize(value, true, true),
            "title" => normalize(value, true, false),
            "language" => normalize_language(value),
            _ => value.to_string(),
        };
        filters.push((column, value));
    }
    Ok(filters)
}

fn fts_query(query: &str) -> Option<String> {
    let terms = query.split_whitespace().map(|t| format!("\"{}\"", t.replace('"', "\"\""))).collect::<Vec<_>>();
    (!terms.is_empty()).then(|| terms.join(" "))
}

#[async_trait]
impl BookStore for Repository {
    async fn contains_path(&self, path: &Path) -> Result<bool> {
        sqlx::query_scalar(include_str!("../queries/contains_path.sql"))
            .bind(path_to_string(path, "path")?)
            .fetch_one(&self.pool)
            .await
            .or_classify()
    }

    async fn lookup(&self, hash: &str) -> Result<Option<PathBuf>> {
        let path: Option<String> = sqlx::query_scalar(include_str!("../queries/lookup.sql"))
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .or_classify()?;
        Ok(path.map(PathBuf::from))
    }

    #[instrument(level = "debug", skip_all, fields(hash = %book.hash, path = %book.path.display()))]
    async fn insert(&self, book: &Book) -> Result<()> {
        let row = BookRow::try_from(book)?;
        let mut tx = self.pool.begin().await.or_classify()?;
        Self::insert_row(&mut tx, include_str!("../queries/insert_book.sql"), &row).await?;
        tx.commit().await.or_classify()
    }

    #[instrument(level = "debug", skip_all, fields(books = books.len()))]
    async fn insert_batch(&self, books: &[Book]) -> Result<Vec<Book>> {
        let mut stored = Vec::with_capacity(books.len());
        let mut tx = self.pool.begin().await.or_classify()?;
        for book in books {
            let row = BookRow::try_from(book)?;
            if Self::insert_row(&mut tx, include_str!("../queries/insert_book_or_ignore.sql"), &row).await? {
                stored.push(book.clone());
            }
        }
        tx.commit().await.or_classify()?;
        Ok(stored)
    }

    async fn record_refresh(&self, stats: &RefreshStats) -> Result<()> {
        let row = RefreshRow::try_from(stats)?;
        sqlx::query(include_str!("../queries/insert_refresh.sql"))
            .bind(row.started_at)
            .bind(row.stopped_at)
            .bind(row.old)
            .bind(row.added)
            .bind(row.duplicate)
            .bind(row.invalid)
            .bind(row.errors)
            .execute(&self.pool)
            .await
            .or_classify()?;
        Ok(())
    }

    async fn update_path(&self, hash: &str, path: &Path) -> Result<bool> {
        let updated = sqlx::query(include_str!("../queries/update_path.sql"))
            .bind(path_to_string(path, "path")?)
            .bind(hash)
            .execute(&self.pool)
            .await
            .or_classify()?
            .rows_affected();
        Ok(updated > 0)
    }

    async fn update_cover(&self, hash: &str, cover_path: &Path) -> Result<bool> {
        let updated = sqlx::query(include_str!("../queries/update_cover.sql"))
            .bind(path_to_string(cover_path, "cover path")?)
            .bind(hash)
            .execute(&self.pool)
            .await
            .or_classify()?
            .rows_affected();
        Ok(updated > 0)
    }
}

#[async_trait]
impl SearchIndex for Repository {
    #[instrument(level = "debug", skip_all, fields(books = books.len()))]
    async fn index(&self, books: &[Book]) -> Result<()> {
        let mut tx = self.pool.begin().await.or_classify()?;
        for book in books {
            sqlx::query(include_str!("../queries/delete_fts.sql"))
                .bind(&book.hash)
                .execute(&mut *tx)
                .await
                .or_classify()?;
            sqlx::query(include_str!("../queries/insert_fts.sql"))
                .bind(&book.hash)
                .bind(&book.author)
                .bind(&book.title)
                .bind(&book.description)
                .execute(&mut *tx)
                .await
                .or_classify()?;
        }
        tx.commit().await.or_classify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_book::BookInput;
    use std::ops::Deref;
    use time::UtcDateTime;

    fn book(title: &str, author: &str, path: &str, added: i64) -> Book {
        let mut book = Book::from(BookInput {
            title: title.to_string(),
            author: author.to_string(),
            language: "english".to_string(),
            description: format!("A book called {title}."),
            path: PathBuf::from(path),
        });
        book.added = UtcDateTime::from_unix_timestamp(added).unwrap();
        book.size = 1024;
        book
    }

    async fn repo_with(books: &[Book]) -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        for book in books {
            repo.insert(book).await.unwrap();
        }
        repo
    }

    fn library() -> Vec<Book> {
        vec![
            book("The Da Vinci Code", "Dan Brown", "davinci.epub", 1_000),
            book("Inferno", "Dan Brown", "inferno.epub", 3_000),
            book("The Bourne Identity", "Robert Ludlum", "bourne.epub", 2_000),
            book("La Nausée", "Jean-Paul Sartre", "nausee.epub", 4_000),
        ]
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let inferno = book("Inferno", "Brown, Dan", "b/inferno.epub", 1_700_000_000);
        let repo = repo_with(std::slice::from_ref(&inferno)).await;

        assert!(repo.contains_path(Path::new("b/inferno.epub")).await.unwrap());
        assert!(!repo.contains_path(Path::new("b/origin.epub")).await.unwrap());
        assert_eq!(repo.lookup(&inferno.hash).await.unwrap(), Some(PathBuf::from("b/inferno.epub")));
        assert!(repo.exists(&inferno.hash).await.unwrap());
        assert!(!repo.exists("nothing").await.unwrap());
        assert_eq!(repo.get_by_hash(&inferno.hash).await.unwrap(), Some(inferno));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_same_work_twice_is_duplicate() {
        let repo = repo_with(&[book("Inferno", "Dan Brown", "a.epub", 0)]).await;
        let err = repo.insert(&book("inferno (2013)", "BROWN, DAN", "b.epub", 0)).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Duplicate));
        assert!(!err.is_retryable());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_same_path_twice_is_duplicate() {
        let repo = repo_with(&[book("Inferno", "Dan Brown", "a.epub", 0)]).await;
        let err = repo.insert(&book("Origin", "Dan Brown", "a.epub", 0)).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Duplicate));
    }

    #[tokio::test]
    async fn test_insert_batch_is_best_effort() {
        let repo = repo_with(&[book("Inferno", "Dan Brown", "inferno.epub", 0)]).await;
        let batch = [
            book("Inferno", "Dan Brown", "other/inferno.epub", 0),
            book("Origin", "Dan Brown", "origin.epub", 0),
            book("Origin", "Brown, Dan", "origin-again.epub", 0),
            book("Deception Point", "Dan Brown", "deception.epub", 0),
        ];
        let stored = repo.insert_batch(&batch).await.unwrap();
        assert_eq!(titles(&stored), ["Origin", "Deception Point"]);
        assert_eq!(stored[0].path, PathBuf::from("origin.epub"));
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.search("origin", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_search_lists_recent_books() {
        let repo = repo_with(&library()).await;
        let books = repo.search("  ", 2).await.unwrap();
        assert_eq!(titles(&books), ["La Nausée", "Inferno"]);
    }

    #[rstest::rstest]
    #[case("vinci code", &["The Da Vinci Code"])]
    #[case("CODE vinci", &["The Da Vinci Code"])]
    #[case("dan brown", &["Inferno", "The Da Vinci Code"])]
    #[case("brown sartre", &[])]
    #[case("born identity", &["The Bourne Identity"])]
    #[case("nausée", &["La Nausée"])]
    #[case("!!", &[])]
    #[tokio::test]
    async fn test_key_search(#[case] query: &str, #[case] expected: &[&str]) {
        let repo = repo_with(&library()).await;
        let books = repo.search(query, 10).await.unwrap();
        assert_eq!(titles(&books), expected);
    }

    #[tokio::test]
    async fn test_field_search() {
        let repo = repo_with(&library()).await;
        let books = repo.search("author:BROWN DAN", 10).await.unwrap();
        assert!(books.is_empty());
        let books = repo.search("author:dan brown", 10).await.unwrap();
        assert_eq!(titles(&books), ["Inferno", "The Da Vinci Code"]);
        let books = repo.search("author: dan brown, title: the da vinci code (2003)", 10).await.unwrap();
        assert_eq!(titles(&books), ["The Da Vinci Code"]);
        let books = repo.search("language:English", 1).await.unwrap();
        assert_eq!(titles(&books), ["Inferno"]);
    }

    #[tokio::test]
    async fn test_field_search_rejects_unknown_fields() {
        let repo = repo_with(&library()).await;
        let err = repo.search("publisher:penguin", 10).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_full_text() {
        let books = library();
        let repo = repo_with(&books).await;
        repo.index(&books).await.unwrap();
        // Re-indexing replaces, never duplicates.
        repo.index(&books[..1]).await.unwrap();

        let found = repo.full_text("nausee", 10).await.unwrap();
        assert_eq!(titles(&found), ["La Nausée"]);
        let found = repo.full_text("book called inferno", 10).await.unwrap();
        assert_eq!(titles(&found), ["Inferno"]);
        let found = repo.full_text("\"vinci\" OR", 10).await.unwrap();
        assert!(found.is_empty());
        assert!(repo.full_text("   ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_path_and_cover() {
        let inferno = book("Inferno", "Dan Brown", "import/inferno.epub", 0);
        let repo = repo_with(std::slice::from_ref(&inferno)).await;
        let moved = Path::new("b/Dan_Brown/Dan_Brown-Inferno.epub");

        assert!(repo.update_path(&inferno.hash, moved).await.unwrap());
        assert!(repo.update_cover(&inferno.hash, &moved.with_extension("jpg")).await.unwrap());
        assert!(!repo.update_path("missing", moved).await.unwrap());

        let stored = repo.get_by_hash(&inferno.hash).await.unwrap().unwrap();
        assert_eq!(stored.path, moved);
        assert!(stored.has_cover);
        assert_eq!(stored.cover_path, Some(moved.with_extension("jpg")));
        assert!(!repo.contains_path(Path::new("import/inferno.epub")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_keys_and_index() {
        let books = library();
        let repo = repo_with(&books).await;
        repo.index(&books).await.unwrap();

        assert!(repo.delete_by_hash(&books[0].hash).await.unwrap());
        assert!(!repo.delete_by_hash(&books[0].hash).await.unwrap());
        assert!(repo.search("vinci", 10).await.unwrap().is_empty());
        assert!(repo.full_text("vinci", 10).await.unwrap().is_empty());
        let keys: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_keys WHERE hash = ?")
            .bind(&books[0].hash)
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(keys, 0);
    }

    #[tokio::test]
    async fn test_refresh_history() {
        let repo = repo_with(&[]).await;
        let mut first = RefreshStats::starting_at(UtcDateTime::from_unix_timestamp(100).unwrap());
        first.added = 3;
        first.stop = UtcDateTime::from_unix_timestamp(160).unwrap();
        let mut second = RefreshStats::starting_at(UtcDateTime::from_unix_timestamp(200).unwrap());
        second.duplicate = 1;
        second.errors = 2;

        repo.record_refresh(&first).await.unwrap();
        repo.record_refresh(&second).await.unwrap();

        assert_eq!(repo.list_refreshes(10).await.unwrap(), [second.clone(), first]);
        assert_eq!(repo.list_refreshes(1).await.unwrap(), [second]);
    }

    #[test]
    fn test_fts_query_quotes_terms() {
        assert_eq!(fts_query("dan  \"brown"), Some("\"dan\" \"\"\"brown\"".to_string()));
        assert_eq!(fts_query(" "), None);
    }
}
