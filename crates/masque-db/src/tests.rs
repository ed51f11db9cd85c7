use std::sync::Arc;

use masque_core::id::{AnonymousPostId, PersonaId, PublicUserId};
use masque_core::{Mode, PostContent, Timestamp, Username};
use masque_util_error::BoxedErrorResult;
use redb_bincode::ReadableTable as _;
use snafu::ResultExt as _;
use tempfile::{TempDir, tempdir};
use tracing::info;

use crate::{
    Database, DbError, FollowError, PersonaError, PostError, RegisterUserError, UnfollowError,
    db_version, follows_followees, follows_followers, personas, personas_by_owner,
};

async fn temp_db() -> BoxedErrorResult<(TempDir, Database)> {
    let dir = tempdir()?;
    let db = Database::open(dir.path().join("db.redb")).await.boxed()?;

    Ok((dir, db))
}

async fn add_user(db: &Database, name: &str, ts: u64) -> BoxedErrorResult<PublicUserId> {
    Ok(db
        .register_user(Username::new(name)?, Timestamp::from_millis(ts))
        .await?
        .id)
}

fn content(s: &str) -> PostContent {
    PostContent::new(s).expect("valid content")
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_register_user() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;

    let alice = add_user(&db, "alice", 1_000).await?;

    let user = db.get_user(alice).await?.expect("registered");
    assert_eq!(user.username.as_str(), "alice");
    assert_eq!(user.date_joined, Timestamp::from_millis(1_000));
    assert_eq!(
        db.get_user_by_username(&Username::new("alice")?).await?,
        Some(user)
    );
    assert_eq!(db.get_user_by_username(&Username::new("Alice")?).await?, None);

    assert_eq!(db.mode_of(alice).await?, Mode::Public);
    assert_eq!(db.persona_of(alice).await?, None);

    assert!(matches!(
        db.register_user(Username::new("alice")?, Timestamp::from_millis(2_000))
            .await,
        Err(RegisterUserError::UsernameTaken)
    ));
    // Usernames are case-sensitive
    add_user(&db, "Alice", 2_000).await?;

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_persona_is_unique() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let alice = add_user(&db, "alice", 1_000).await?;

    let first = db.get_or_create_persona(alice).await?;
    assert_eq!(first.date_joined, Timestamp::from_millis(1_000));

    for _ in 0..5 {
        assert_eq!(db.get_or_create_persona(alice).await?, first);
    }
    assert_eq!(db.persona_of(alice).await?, Some(first));
    assert!(db.is_persona_owned_by(first.id, alice).await?);
    assert!(!db.is_persona_owned_by(PersonaId::ZERO, alice).await?);

    let bob = add_user(&db, "bob", 2_000).await?;
    assert!(!db.is_persona_owned_by(first.id, bob).await?);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_persona_concurrent_creation() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let db = Arc::new(db);
    let alice = add_user(&db, "alice", 1_000).await?;

    let tasks = (0..8).map(|_| {
        let db = db.clone();
        tokio::spawn(async move { db.get_or_create_persona(alice).await })
    });

    let mut persona_ids = vec![];
    for res in futures::future::join_all(tasks).await {
        persona_ids.push(res??.id);
    }
    persona_ids.dedup();
    assert_eq!(persona_ids.len(), 1);

    let stored = db
        .read_with(|tx| {
            let personas_tbl = tx.open_table(&personas::TABLE)?;
            let personas_by_owner_tbl = tx.open_table(&personas_by_owner::TABLE)?;
            Ok((
                personas_tbl.range(..)?.count(),
                personas_by_owner_tbl.range(..)?.count(),
            ))
        })
        .await?;
    assert_eq!(stored, (1, 1));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_persona_of_unknown_user() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;

    assert!(matches!(
        db.get_or_create_persona(PublicUserId::ZERO).await,
        Err(PersonaError::UserNotFound)
    ));
    assert_eq!(db.persona_of(PublicUserId::ZERO).await?, None);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_follow_concurrent_duplicates() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let db = Arc::new(db);
    let a = add_user(&db, "a", 1).await?;
    let b = add_user(&db, "b", 2).await?;

    let tasks = (0..8).map(|i| {
        let db = db.clone();
        tokio::spawn(async move { db.follow(a, b, Timestamp::from_millis(10 + i)).await })
    });

    let mut created = 0;
    let mut rejected = 0;
    for res in futures::future::join_all(tasks).await {
        match res? {
            Ok(_) => created += 1,
            Err(FollowError::AlreadyFollowing) => rejected += 1,
            Err(err) => return Err(err.into()),
        }
    }
    assert_eq!((created, rejected), (1, 7));

    let stored = db
        .read_with(|tx| {
            let followees_tbl = tx.open_table(&follows_followees::TABLE)?;
            let followers_tbl = tx.open_table(&follows_followers::TABLE)?;
            Ok((
                followees_tbl.range(..)?.count(),
                followers_tbl.range(..)?.count(),
            ))
        })
        .await?;
    assert_eq!(stored, (1, 1));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_follow_unfollow() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let a = add_user(&db, "a", 1).await?;
    let b = add_user(&db, "b", 2).await?;

    let edge = db.follow(a, b, Timestamp::from_millis(10)).await?;
    assert_eq!((edge.follower, edge.followee), (a, b));
    assert_eq!(edge.date_created, Timestamp::from_millis(10));

    assert!(matches!(
        db.follow(a, b, Timestamp::from_millis(11)).await,
        Err(FollowError::AlreadyFollowing)
    ));

    assert_eq!(db.followees_of(a).await?.into_iter().collect::<Vec<_>>(), vec![b]);
    assert_eq!(db.followers_of(b).await?.into_iter().collect::<Vec<_>>(), vec![a]);
    assert!(db.followees_of(b).await?.is_empty());
    assert_eq!(db.followee_edges(a).await?, vec![edge]);
    assert_eq!(db.follower_edges(b).await?, vec![edge]);

    db.unfollow(a, b).await?;
    assert!(matches!(
        db.unfollow(a, b).await,
        Err(UnfollowError::NotFollowing)
    ));
    assert!(db.followees_of(a).await?.is_empty());
    assert!(db.followers_of(b).await?.is_empty());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_no_self_follow() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let a = add_user(&db, "a", 1).await?;

    for id in [a, PublicUserId::ZERO, PublicUserId::MAX] {
        assert!(matches!(
            db.follow(id, id, Timestamp::from_millis(10)).await,
            Err(FollowError::SelfFollow)
        ));
    }
    assert!(db.followees_of(a).await?.is_empty());

    assert!(matches!(
        db.follow(a, PublicUserId::ZERO, Timestamp::from_millis(10))
            .await,
        Err(FollowError::UserNotFound)
    ));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_follow_edges_ordering() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let a = add_user(&db, "a", 1).await?;
    let b = add_user(&db, "b", 1).await?;
    let c = add_user(&db, "c", 1).await?;
    let d = add_user(&db, "d", 1).await?;

    db.follow(a, c, Timestamp::from_millis(30)).await?;
    db.follow(a, b, Timestamp::from_millis(10)).await?;
    db.follow(a, d, Timestamp::from_millis(20)).await?;

    let followees: Vec<_> = db
        .followee_edges(a)
        .await?
        .into_iter()
        .map(|e| e.followee)
        .collect();
    assert_eq!(followees, vec![b, d, c]);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_mode() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let a = add_user(&db, "a", 1).await?;

    db.set_mode(a, Mode::Anonymous).await?;
    db.set_mode(a, Mode::Anonymous).await?;
    assert_eq!(db.mode_of(a).await?, Mode::Anonymous);
    db.set_mode(a, Mode::Public).await?;
    assert_eq!(db.mode_of(a).await?, Mode::Public);

    assert!(db.set_mode(PublicUserId::ZERO, Mode::Anonymous).await.is_err());
    assert_eq!(db.mode_of(PublicUserId::ZERO).await?, Mode::Public);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_posts_ordering() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let a = add_user(&db, "a", 1).await?;

    // Inserted out of order on purpose
    let p2 = db
        .create_public_post(a, content("two"), Timestamp::from_millis(20))
        .await?;
    let p1 = db
        .create_public_post(a, content("one"), Timestamp::from_millis(30))
        .await?;
    let p3 = db
        .create_public_post(a, content("three"), Timestamp::from_millis(10))
        .await?;
    // Same modification time as `p3`, inserted later
    let p4 = db
        .create_public_post(a, content("four"), Timestamp::from_millis(10))
        .await?;

    let ids: Vec<_> = db
        .public_posts_by_author(a)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![p1.id, p2.id, p3.id, p4.id]);

    // Editing moves the post to the front, but keeps the creation time
    let p3_updated = db
        .update_public_post(p3.id, a, content("three!"), Timestamp::from_millis(40))
        .await?;
    assert_eq!(p3_updated.date_created, Timestamp::from_millis(10));
    assert_eq!(p3_updated.date_modified, Timestamp::from_millis(40));
    assert_eq!(p3_updated.content.as_str(), "three!");

    let ids: Vec<_> = db
        .public_posts_by_author(a)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![p3.id, p1.id, p2.id, p4.id]);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_post_ownership() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let a = add_user(&db, "a", 1).await?;
    let b = add_user(&db, "b", 1).await?;
    let a_persona = db.get_or_create_persona(a).await?;
    let b_persona = db.get_or_create_persona(b).await?;

    let post = db
        .create_public_post(a, content("mine"), Timestamp::from_millis(1))
        .await?;
    assert!(matches!(
        db.update_public_post(post.id, b, content("yours"), Timestamp::from_millis(2))
            .await,
        Err(PostError::NotOwner)
    ));
    assert!(matches!(
        db.delete_public_post(post.id, b).await,
        Err(PostError::NotOwner)
    ));
    db.delete_public_post(post.id, a).await?;
    assert!(matches!(
        db.delete_public_post(post.id, a).await,
        Err(PostError::PostNotFound)
    ));
    assert_eq!(db.get_public_post(post.id).await?, None);

    let anon = db
        .create_anonymous_post(a_persona.id, content("secret"), Timestamp::from_millis(3))
        .await?;
    assert_eq!(anon.author, a_persona.id);
    assert!(matches!(
        db.delete_anonymous_post(anon.id, b_persona.id).await,
        Err(PostError::NotOwner)
    ));
    db.update_anonymous_post(anon.id, a_persona.id, content("still secret"), Timestamp::from_millis(4))
        .await?;
    db.delete_anonymous_post(anon.id, a_persona.id).await?;
    assert_eq!(db.get_anonymous_post(anon.id).await?, None);

    assert!(matches!(
        db.create_anonymous_post(PersonaId::ZERO, content("nobody"), Timestamp::from_millis(5))
            .await,
        Err(PostError::AuthorNotFound)
    ));
    assert!(matches!(
        db.create_public_post(PublicUserId::ZERO, content("nobody"), Timestamp::from_millis(5))
            .await,
        Err(PostError::AuthorNotFound)
    ));
    assert!(matches!(
        db.delete_anonymous_post(AnonymousPostId::ZERO, a_persona.id)
            .await,
        Err(PostError::PostNotFound)
    ));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_anonymous_pool() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let a = add_user(&db, "a", 1).await?;
    let b = add_user(&db, "b", 1).await?;
    let a_persona = db.get_or_create_persona(a).await?;
    let b_persona = db.get_or_create_persona(b).await?;

    let p1 = db
        .create_anonymous_post(a_persona.id, content("a1"), Timestamp::from_millis(10))
        .await?;
    let p2 = db
        .create_anonymous_post(b_persona.id, content("b1"), Timestamp::from_millis(30))
        .await?;
    let p3 = db
        .create_anonymous_post(a_persona.id, content("a2"), Timestamp::from_millis(20))
        .await?;

    let all: Vec<_> = db.anonymous_posts().await?.into_iter().map(|p| p.id).collect();
    assert_eq!(all, vec![p2.id, p3.id, p1.id]);

    let by_a: Vec<_> = db
        .anonymous_posts_by_persona(a_persona.id)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(by_a, vec![p3.id, p1.id]);

    // Public pool is untouched
    assert!(db.public_posts_by_author(a).await?.is_empty());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_delete_user_cascades() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let a = add_user(&db, "a", 1).await?;
    let b = add_user(&db, "b", 1).await?;
    let c = add_user(&db, "c", 1).await?;

    let a_persona = db.get_or_create_persona(a).await?;
    let b_persona = db.get_or_create_persona(b).await?;
    db.follow(a, b, Timestamp::from_millis(2)).await?;
    db.follow(c, a, Timestamp::from_millis(2)).await?;
    db.follow(b, c, Timestamp::from_millis(2)).await?;
    let a_post = db
        .create_public_post(a, content("a"), Timestamp::from_millis(3))
        .await?;
    let a_anon = db
        .create_anonymous_post(a_persona.id, content("a anon"), Timestamp::from_millis(3))
        .await?;
    let b_anon = db
        .create_anonymous_post(b_persona.id, content("b anon"), Timestamp::from_millis(3))
        .await?;
    db.set_mode(a, Mode::Anonymous).await?;

    assert!(db.delete_user(a).await?);
    assert!(!db.delete_user(a).await?);

    info!("Checking leftovers");
    assert_eq!(db.get_user(a).await?, None);
    assert_eq!(db.get_user_by_username(&Username::new("a")?).await?, None);
    assert_eq!(db.persona_of(a).await?, None);
    assert_eq!(db.get_persona(a_persona.id).await?, None);
    assert!(!db.is_persona_owned_by(a_persona.id, a).await?);
    assert_eq!(db.get_public_post(a_post.id).await?, None);
    assert_eq!(db.get_anonymous_post(a_anon.id).await?, None);
    assert_eq!(db.mode_of(a).await?, Mode::Public);
    assert!(db.followers_of(b).await?.is_empty());
    assert!(db.followees_of(c).await?.is_empty());

    // Other users are untouched
    assert_eq!(db.get_anonymous_post(b_anon.id).await?.map(|p| p.id), Some(b_anon.id));
    assert!(db.followees_of(b).await?.contains(&c));

    // The username is free again
    add_user(&db, "a", 5).await?;

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_data_version_bumps_on_writes_only() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    let v0 = db.data_version();

    let a = add_user(&db, "a", 1).await?;
    let v1 = db.data_version();
    assert!(v0 != v1);

    // Rejected writes and reads leave the version alone
    let _ = db.follow(a, a, Timestamp::from_millis(1)).await;
    let _ = db.unfollow(a, a).await;
    db.get_user(a).await?;
    assert_eq!(db.data_version(), v1);

    db.create_public_post(a, content("x"), Timestamp::from_millis(2))
        .await?;
    assert!(db.data_version() != v1);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_db_version_too_high() -> BoxedErrorResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("db.redb");

    {
        let db = Database::open(&path).await.boxed()?;
        db.write_with(|tx| {
            tx.open_table(&db_version::TABLE)?
                .insert(&(), &(Database::DB_VER + 1))?;
            Ok(())
        })
        .await?;
    }

    assert!(matches!(
        Database::open(&path).await,
        Err(DbError::DbVersionTooHigh { .. })
    ));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_dump_table() -> BoxedErrorResult<()> {
    let (_dir, db) = temp_db().await?;
    add_user(&db, "alice", 1).await?;

    let lines = db.dump_table("users_by_username").await?;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("\"alice\" => "));

    assert!(matches!(
        db.dump_table("nope").await,
        Err(DbError::UnknownTable { .. })
    ));

    Ok(())
}
