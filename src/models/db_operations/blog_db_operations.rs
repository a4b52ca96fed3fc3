use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::DbError;
use crate::models::{BlogPost, BlogPostSummary};

pub const BLOG_POSTS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("blog_posts");
// Unique slug -> post id lookup, maintained alongside the documents.
pub const BLOG_SLUG_INDEX: TableDefinition<&str, &[u8; 16]> =
    TableDefinition::new("blog_slug_index");

/// Inserts a new post and its slug index entry in one transaction. A
/// slug collision is a hard error; there is no disambiguation.
pub fn create_post(db: &Database, post: &BlogPost) -> Result<(), DbError> {
    let key = Uuid::parse_str(&post.id)?.into_bytes();
    let json = serde_json::to_string(post)?;

    let write_txn = db.begin_write()?;
    {
        let mut posts_table = write_txn.open_table(BLOG_POSTS)?;
        let mut slug_table = write_txn.open_table(BLOG_SLUG_INDEX)?;

        if slug_table.get(post.slug.as_str())?.is_some() {
            return Err(DbError::Duplicate(format!(
                "A post with the slug '{}' already exists.",
                post.slug
            )));
        }

        posts_table.insert(&key, json.as_str())?;
        slug_table.insert(post.slug.as_str(), &key)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Looks a post up by slug and bumps its view counter in the same write
/// transaction. Best-effort counter: concurrent readers serialize on the
/// store's single writer, nothing more is promised.
pub fn read_post_by_slug_counting_view(
    db: &Database,
    slug: &str,
) -> Result<Option<BlogPost>, DbError> {
    let write_txn = db.begin_write()?;
    let post = {
        let mut posts_table = write_txn.open_table(BLOG_POSTS)?;
        let slug_table = write_txn.open_table(BLOG_SLUG_INDEX)?;

        let key = match slug_table.get(slug)? {
            Some(guard) => *guard.value(),
            None => return Ok(None),
        };

        let mut post: BlogPost = match posts_table.get(&key)? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Ok(None),
        };

        post.views += 1;
        let json = serde_json::to_string(&post)?;
        posts_table.insert(&key, json.as_str())?;
        post
    };
    write_txn.commit()?;
    Ok(Some(post))
}

pub fn read_post(db: &Database, id: &str) -> Result<Option<BlogPost>, DbError> {
    let key = match Uuid::parse_str(id) {
        Ok(uuid) => uuid.into_bytes(),
        Err(_) => return Ok(None),
    };

    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(BLOG_POSTS)?;
    let result = match table.get(&key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    };
    result
}

/// Flips the publish flag. Publishing stamps `published_at`; taking a
/// post down clears it. The toggle is deliberately bidirectional.
pub fn set_published(db: &Database, id: &str, published: bool) -> Result<BlogPost, DbError> {
    let key = Uuid::parse_str(id)
        .map_err(|_| DbError::NotFound("Blog post not found.".to_string()))?
        .into_bytes();

    let write_txn = db.begin_write()?;
    let post = {
        let mut table = write_txn.open_table(BLOG_POSTS)?;

        let mut post: BlogPost = match table.get(&key)? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(DbError::NotFound("Blog post not found.".to_string())),
        };

        let now = Utc::now();
        post.published = published;
        post.published_at = if published { Some(now) } else { None };
        post.updated_at = now;

        let json = serde_json::to_string(&post)?;
        table.insert(&key, json.as_str())?;
        post
    };
    write_txn.commit()?;
    Ok(post)
}

/// Post summaries, newest first. Unpublished posts are only included
/// when the caller is allowed to see drafts.
pub fn list_posts(db: &Database, include_unpublished: bool) -> Result<Vec<BlogPostSummary>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(BLOG_POSTS)?;

    let mut posts: Vec<BlogPostSummary> = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str::<BlogPost>(json.value()).ok())
        .filter(|post| include_unpublished || post.published)
        .map(|post| BlogPostSummary::from(&post))
        .collect();

    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::backends::InMemoryBackend;

    fn test_db() -> Database {
        Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .expect("in-memory redb")
    }

    fn sample(slug: &str, published: bool) -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: Uuid::new_v4().to_string(),
            title: "Beach Cleanup Recap".to_string(),
            slug: slug.to_string(),
            content: "We cleaned the beach.".to_string(),
            excerpt: "Recap".to_string(),
            author: 3,
            author_name: "Amaya Perera".to_string(),
            tags: vec!["service".to_string()],
            published,
            published_at: if published { Some(now) } else { None },
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn slug_collision_is_a_hard_error() {
        let db = test_db();
        create_post(&db, &sample("beach-cleanup-recap", true)).unwrap();
        let err = create_post(&db, &sample("beach-cleanup-recap", true)).unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[test]
    fn reading_by_slug_increments_views() {
        let db = test_db();
        let post = sample("beach-cleanup-recap", true);
        create_post(&db, &post).unwrap();

        let first = read_post_by_slug_counting_view(&db, "beach-cleanup-recap")
            .unwrap()
            .unwrap();
        assert_eq!(first.views, 1);
        let second = read_post_by_slug_counting_view(&db, "beach-cleanup-recap")
            .unwrap()
            .unwrap();
        assert_eq!(second.views, 2);

        assert!(read_post_by_slug_counting_view(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn publish_toggle_is_bidirectional() {
        let db = test_db();
        let post = sample("draft-post", false);
        create_post(&db, &post).unwrap();

        let published = set_published(&db, &post.id, true).unwrap();
        assert!(published.published);
        assert!(published.published_at.is_some());

        let unpublished = set_published(&db, &post.id, false).unwrap();
        assert!(!unpublished.published);
        assert!(unpublished.published_at.is_none());
    }

    #[test]
    fn listing_hides_drafts_unless_requested() {
        let db = test_db();
        create_post(&db, &sample("published-post", true)).unwrap();
        create_post(&db, &sample("draft-post", false)).unwrap();

        assert_eq!(list_posts(&db, false).unwrap().len(), 1);
        assert_eq!(list_posts(&db, true).unwrap().len(), 2);
    }
}
