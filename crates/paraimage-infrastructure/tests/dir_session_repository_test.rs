use chrono::{Duration, Utc};
use paraimage_core::{GeneratedImage, Message, ReferenceImage, Session, SessionRepository};
use paraimage_infrastructure::DirSessionRepository;
use tempfile::TempDir;

fn sample_session(id: &str) -> Session {
    let created = Utc::now() - Duration::minutes(5);
    Session {
        id: id.to_string(),
        model_key: "Google Gemini::nano-banana".to_string(),
        title: "a red fox".to_string(),
        messages: vec![
            Message::user(
                "a red fox",
                vec![ReferenceImage::new("fox.png", "data:image/png;base64,AAAA")],
            ),
            Message::assistant(
                "Google Gemini::nano-banana",
                Ok(GeneratedImage::new("data:image/png;base64,BBBB")),
            ),
        ],
        created_at: created,
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_upsert_then_find_preserves_transcript() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DirSessionRepository::new(temp_dir.path().join("sessions"))
        .await
        .unwrap();
    let session = sample_session("5d0b1c9e-0000-4000-8000-000000000001");

    repo.upsert(&session).await.unwrap();
    let loaded = repo.find_by_id(&session.id).await.unwrap().unwrap();

    assert_eq!(loaded, session);
    assert!(
        repo.sessions_dir()
            .join(format!("{}.json", session.id))
            .exists()
    );
}

#[tokio::test]
async fn test_upsert_replaces_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DirSessionRepository::new(temp_dir.path()).await.unwrap();
    let mut session = sample_session("s-1");
    repo.upsert(&session).await.unwrap();

    session.messages.push(Message::user("now in blue", vec![]));
    session.updated_at = Utc::now();
    repo.upsert(&session).await.unwrap();

    let listed = repo.list_by_model(&session.model_key).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].messages.len(), 3);
}

#[tokio::test]
async fn test_corrupt_files_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DirSessionRepository::new(temp_dir.path()).await.unwrap();
    let session = sample_session("good");
    repo.upsert(&session).await.unwrap();
    std::fs::write(temp_dir.path().join("broken.json"), "{ truncated").unwrap();
    std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    let listed = repo.list_by_model(&session.model_key).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "good");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DirSessionRepository::new(temp_dir.path()).await.unwrap();
    let session = sample_session("gone");
    repo.upsert(&session).await.unwrap();

    repo.delete("gone").await.unwrap();
    repo.delete("gone").await.unwrap();

    assert!(repo.find_by_id("gone").await.unwrap().is_none());
}
