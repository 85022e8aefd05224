//! # parlor-demo
//!
//! Wires the in-memory backend to a feed and two composers and walks
//! through the full flow: subscribe, type, send (with emoji shorthand),
//! upload an attachment, star the channel, and search.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parlor_backend::{
    MemoryObjectStore, MemoryRealtimeStore, ObjectStore, RealtimeStore, UploadMetadata,
};
use parlor_client::{MessageComposer, MessageFeed};
use parlor_shared::{Channel, ChannelId, CreatorRef, UserId, UserRef, Visibility};

fn user(id: &str, name: &str) -> UserRef {
    UserRef {
        id: UserId::from(id),
        name: name.to_string(),
        avatar: format!("https://avatars.example/{id}.png"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting parlor demo v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn RealtimeStore> = Arc::new(MemoryRealtimeStore::new());
    let storage: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());

    let ada = user("u-ada", "Ada");
    let grace = user("u-grace", "Grace");
    let channel = Channel {
        id: ChannelId::from("general"),
        name: "general".to_string(),
        details: "Anything goes".to_string(),
        created_by: CreatorRef {
            name: ada.name.clone(),
            avatar: ada.avatar.clone(),
        },
        visibility: Visibility::Public,
    };

    // Ada watches the channel.
    let feed = MessageFeed::new(Arc::clone(&store), ada.clone());
    feed.subscribe(&channel)?;

    // Grace composes a message with an emoji shorthand.
    let composer = MessageComposer::new(
        Arc::clone(&store),
        Arc::clone(&storage),
        grace.clone(),
        channel.clone(),
    );
    composer.update_draft("morning everyone");
    composer.keystroke();
    info!(
        typing = ?feed.typing_users().iter().map(|t| t.name.clone()).collect::<Vec<_>>(),
        "Typing indicator while Grace composes"
    );
    composer.insert_text(" :wave:");
    composer.send()?;

    // Ada replies and uploads a picture.
    let ada_composer = MessageComposer::new(
        Arc::clone(&store),
        Arc::clone(&storage),
        ada.clone(),
        channel.clone(),
    );
    ada_composer.update_draft("morning! shipping the new build");
    ada_composer.insert_text(" :rocket:");
    ada_composer.send()?;
    ada_composer.attach_file(
        Bytes::from_static(&[0u8; 2048]),
        UploadMetadata::image_jpeg(),
    )?;
    info!(
        state = ?ada_composer.upload_state(),
        percent = ada_composer.upload_percent(),
        "Attachment upload finished"
    );

    feed.toggle_star();

    for message in feed.messages() {
        match message.body.content() {
            Some(text) => info!(from = %message.user.name, text, "Message"),
            None => info!(
                from = %message.user.name,
                image = message.body.image().unwrap_or(""),
                "Image message"
            ),
        }
    }
    info!(
        label = %feed.unique_user_label(),
        starred = feed.is_starred(),
        "Feed summary"
    );

    let hits = feed.search("shipping").await;
    info!(hits = hits.len(), "Search for 'shipping'");

    feed.detach();
    Ok(())
}
