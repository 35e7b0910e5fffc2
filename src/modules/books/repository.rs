use anyhow::Context;
use async_trait::async_trait;
use bookshelf_db::Table;

use super::models::{Book, BookFields, BookPatch};

/// Persistence operations the books API needs.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// All books in insertion order.
    async fn list(&self) -> anyhow::Result<Vec<Book>>;

    async fn find(&self, id: i64) -> anyhow::Result<Option<Book>>;

    async fn create(&self, fields: BookFields) -> anyhow::Result<Book>;

    /// Replace title and isbn. `None` when the id is unknown.
    async fn replace(&self, id: i64, fields: BookFields) -> anyhow::Result<Option<Book>>;

    /// Change only the submitted fields. `None` when the id is unknown.
    async fn patch(&self, id: i64, patch: BookPatch) -> anyhow::Result<Option<Book>>;

    /// Returns whether the book existed.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;

    async fn count(&self) -> anyhow::Result<usize>;
}

#[async_trait]
impl BookRepository for Table<BookFields> {
    async fn list(&self) -> anyhow::Result<Vec<Book>> {
        Ok(self.all().await.into_iter().map(Book::from).collect())
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Book>> {
        Ok(self.get(id).await.map(Book::from))
    }

    async fn create(&self, fields: BookFields) -> anyhow::Result<Book> {
        let record = self
            .insert(fields)
            .await
            .context("failed to insert book")?;
        Ok(Book::from(record))
    }

    async fn replace(&self, id: i64, fields: BookFields) -> anyhow::Result<Option<Book>> {
        let record = self
            .update(id, move |row| *row = fields)
            .await
            .with_context(|| format!("failed to replace book {}", id))?;
        Ok(record.map(Book::from))
    }

    async fn patch(&self, id: i64, patch: BookPatch) -> anyhow::Result<Option<Book>> {
        let record = self
            .update(id, move |row| patch.apply(row))
            .await
            .with_context(|| format!("failed to update book {}", id))?;
        Ok(record.map(Book::from))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Table::delete(self, id)
            .await
            .with_context(|| format!("failed to delete book {}", id))
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(self.len().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str, isbn: &str) -> BookFields {
        BookFields {
            title: title.to_string(),
            isbn: isbn.to_string(),
        }
    }

    #[tokio::test]
    async fn patch_changes_only_submitted_fields() {
        let repo: Table<BookFields> = Table::in_memory("books");
        let book = repo
            .create(fields("Clean Code", "9780132350884"))
            .await
            .unwrap();

        let patch = BookPatch {
            title: Some("Clean Code (2nd ed)".to_string()),
            isbn: None,
        };
        let patched = repo.patch(book.id, patch).await.unwrap().unwrap();

        assert_eq!(patched.title, "Clean Code (2nd ed)");
        let stored = repo.find(book.id).await.unwrap().unwrap();
        assert_eq!(stored.isbn, "9780132350884");
    }

    #[tokio::test]
    async fn missing_ids_report_absence() {
        let repo: Table<BookFields> = Table::in_memory("books");

        assert!(repo.find(1).await.unwrap().is_none());
        assert!(repo.replace(1, fields("a", "b")).await.unwrap().is_none());
        assert!(repo
            .patch(1, BookPatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(!BookRepository::delete(&repo, 1).await.unwrap());
    }

    #[tokio::test]
    async fn list_follows_insertion_order() {
        let repo: Table<BookFields> = Table::in_memory("books");
        repo.create(fields("B", "2")).await.unwrap();
        repo.create(fields("A", "1")).await.unwrap();

        let titles: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
