//! End-to-end flows through the dispatcher and listener
//!
//! Run with: cargo test -p artcore --test bot_flow_test

mod common;

use artcore::{last_image_post, ButtonAction, ImageStore, Invocation, Reply, Session};
use chrono::{TimeZone, Utc};
use common::{texts, TestEnvironment};

// ============================================================================
// Session commands
// ============================================================================

mod session_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_set_bucket_then_query_reports_pair() {
        let env = TestEnvironment::new(Session::default()).await;

        for (bucket, path) in [("art", "mj"), ("renders-2024", "a/b/c"), ("x", "")] {
            env.run(&format!("!set_bucket {bucket} {path}")).await;
            let expected = if path.is_empty() {
                format!("Current S3 bucket is: {bucket}, path is empty")
            } else {
                format!("Current S3 location is: {bucket}/{path}")
            };
            assert_eq!(texts(&env.run("!bucket").await), vec![expected.clone()]);
            assert_eq!(texts(&env.run("!path").await), vec![expected]);
        }
    }

    #[tokio::test]
    async fn test_nothing_set_report() {
        let env = TestEnvironment::new(Session::default()).await;
        assert_eq!(texts(&env.run("!bucket").await), vec!["No S3 bucket or path has been set."]);
    }
}

// ============================================================================
// Upload command
// ============================================================================

mod upload_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_upload_without_bucket_touches_nothing() {
        let env = TestEnvironment::new(Session::default()).await;
        env.serve("/fox.png", b"fox").await;

        let replies = env.run(&format!("!upload {}", env.url("/fox.png"))).await;
        assert_eq!(texts(&replies), vec!["Please set the S3 bucket first using !set_bucket"]);

        let attachment = Invocation::new(false).with_attachments(vec![env.attachment("/fox.png", "fox.png")]);
        let replies = env.run_with("!upload", attachment).await;
        assert_eq!(texts(&replies), vec!["Please set the S3 bucket first using !set_bucket"]);

        assert_eq!(env.store.calls(), 0);
        assert!(env.server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_upload_link_404_reports_status() {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        env.serve_status("/missing.jpg", 404).await;

        let replies = env.run(&format!("!upload {}", env.url("/missing.jpg"))).await;

        assert_eq!(replies.len(), 1);
        let text = &texts(&replies)[0];
        assert!(text.starts_with("Error uploading the image:"), "{text}");
        assert!(text.contains("404"), "{text}");
        assert!(env.store.is_empty());
    }

    #[tokio::test]
    async fn test_upload_link_uses_timestamped_key() {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        env.serve("/fox.png", b"fox-bytes").await;

        let replies = env.run(&format!("!upload {}", env.url("/fox.png"))).await;

        let keys = env.store.keys("art");
        assert_eq!(keys.len(), 1);
        let key = &keys[0];
        assert!(key.starts_with("mj/") && key.ends_with(".png"), "{key}");
        // YYYYMMDD_HHMMSS
        assert_eq!(key.len(), "mj/".len() + 15 + ".png".len());
        assert_eq!(
            texts(&replies),
            vec![format!("Image uploaded as {key} in the bucket art!")]
        );
    }

    #[tokio::test]
    async fn test_upload_attachment_carries_session_metadata() {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        env.serve("/cdn/fox.png", b"attachment-bytes").await;

        env.run("!set_metadata Comments test").await;
        let invocation = Invocation::new(false).with_attachments(vec![env.attachment("/cdn/fox.png", "fox.png")]);
        let replies = env.run_with("!upload", invocation).await;

        assert_eq!(replies.len(), 1);
        let key = env.store.keys("art").remove(0);
        let object = env.store.object("art", &key).unwrap();
        assert_eq!(object.metadata.get("Comments").map(String::as_str), Some("test"));
        assert_eq!(object.data.as_ref(), b"attachment-bytes");

        // staged copy is gone
        let staging = env.scratch.path().join("staging");
        let leftovers = std::fs::read_dir(&staging).map(|d| d.count()).unwrap_or(0);
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_upload_attachment_with_explicit_name() {
        let env = TestEnvironment::with_bucket("art", "").await;
        env.serve("/cdn/fox.png", b"x").await;

        let invocation = Invocation::new(false).with_attachments(vec![env.attachment("/cdn/fox.png", "fox.png")]);
        let replies = env.run_with("!upload snowfox.png", invocation).await;

        assert_eq!(texts(&replies), vec!["Image uploaded as /snowfox.png in the bucket art!"]);
        assert!(env.store.object("art", "/snowfox.png").is_some());
    }

    #[tokio::test]
    async fn test_upload_then_get_image_round_trip() {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        env.serve("/cdn/grid.png", &payload).await;

        let invocation = Invocation::new(false).with_attachments(vec![env.attachment("/cdn/grid.png", "grid.png")]);
        env.run_with("!upload grid.png", invocation).await;

        let replies = env.run("!get_image grid.png").await;
        match &replies[..] {
            [Reply::File { caption, path, filename }] => {
                assert_eq!(caption, "File Name: **grid.png**");
                assert_eq!(filename, "grid.png");
                assert_eq!(std::fs::read(path).unwrap(), payload);
            }
            other => panic!("unexpected replies {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_image_missing_key_reports_error() {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        let replies = env.run("!get_image nope.png").await;
        assert_eq!(texts(&replies), vec!["Error fetching the image: Object not found: mj/nope.png"]);
    }
}

// ============================================================================
// Listing and selection
// ============================================================================

mod listing_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn seeded() -> TestEnvironment {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        for minute in 0..12 {
            let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap();
            env.store.insert("art", &format!("mj/{minute:02}.png"), b"p".to_vec(), at);
        }
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        env.store.insert("art", "mj/notes.txt", b"t".to_vec(), later);
        env.store.insert("art", "mj/anim.gif", b"g".to_vec(), later);
        env.store.insert("art", "other/z.jpeg", b"j".to_vec(), later);
        env
    }

    #[tokio::test]
    async fn test_list_images_covers_whole_bucket_and_filters() {
        let env = seeded().await;
        let text = texts(&env.run("!list_images").await).remove(0);

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("images in the bucket:"));
        let keys: Vec<&str> = lines.collect();
        assert_eq!(keys.len(), 13);
        assert!(keys.contains(&"other/z.jpeg"));
        assert!(keys.iter().all(|k| k.ends_with(".png") || k.ends_with(".jpeg")));
    }

    #[tokio::test]
    async fn test_get_image_offers_ten_newest_under_path() {
        let env = seeded().await;
        let replies = env.run("!get_image").await;

        let [Reply::Choices { text, buttons }] = &replies[..] else {
            panic!("unexpected replies {replies:?}");
        };
        assert_eq!(text, "Select an image:");
        let labels: Vec<&str> = buttons.iter().map(|b| b.label.as_str()).collect();
        let expected: Vec<String> = (2..12).rev().map(|m| format!("mj/{m:02}.png")).collect();
        assert_eq!(labels, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_selection_button_fetches_full_key() {
        let env = seeded().await;
        let replies = env.run("!get_image").await;
        let [Reply::Choices { buttons, .. }] = &replies[..] else {
            panic!("unexpected replies {replies:?}");
        };

        let action = ButtonAction::parse(&buttons[0].action.custom_id()).unwrap();
        let ButtonAction::FetchImage { key } = action else {
            panic!("unexpected action {action:?}");
        };
        let replies = env.dispatcher.on_fetch_button(&key).await;
        assert_eq!(texts(&replies), vec!["File Name: **mj/11.png**"]);
    }

    #[tokio::test]
    async fn test_empty_bucket_messages() {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        assert_eq!(texts(&env.run("!list_images").await), vec!["No images found in the bucket."]);
        assert_eq!(texts(&env.run("!get_image").await), vec!["No images found in the bucket."]);
    }
}

// ============================================================================
// Image-bot posts
// ============================================================================

mod listener_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_prompt_then_button_uploads_once() {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        env.serve("/cdn/grid_0.png", b"grid").await;
        let post = env.image_post("/cdn/grid_0.png", "**a fox in snow** - <@42> (fast)");

        let replies = env.dispatcher.on_image_post(&post).await;
        let [Reply::Choices { text, buttons }] = &replies[..] else {
            panic!("unexpected replies {replies:?}");
        };
        assert_eq!(text, "Would you like to upload the last image?");
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, "Upload Last Image");
        assert_eq!(buttons[0].action, ButtonAction::UploadLast);
        assert!(env.store.is_empty());

        let history = vec![post];
        let found = last_image_post(&history).unwrap();
        let replies = env.dispatcher.upload_last_image(found).await;

        assert_eq!(env.store.len(), 1);
        assert_eq!(replies.len(), 1);
        let key = env.store.keys("art").remove(0);
        assert_eq!(texts(&replies), vec![format!("Image uploaded as {key} in the bucket art!")]);
    }

    #[tokio::test]
    async fn test_auto_upload_embeds_capped_prompt_and_full_comment() {
        let mut session = Session::default();
        session.set_bucket("art", "mj");
        session.auto_upload = true;
        session.prompt_include = true;
        let env = TestEnvironment::new(session).await;
        env.serve("/cdn/grid_0.png", b"grid").await;

        let prompt = format!("**{}** - <@42> (relaxed)", "a very detailed *castle* ".repeat(8));
        let post = env.image_post("/cdn/grid_0.png", &prompt);
        let replies = env.dispatcher.on_image_post(&post).await;

        let key = env.store.keys("art").remove(0);
        assert!(!key.contains(' ') && !key.contains('*'), "{key}");
        let filename = key.strip_prefix("mj/").unwrap();
        // prompt, then "_YYYYMMDD_HHMMSS.png"
        let embedded = &filename[..filename.len() - "_20240101_000000.png".len()];
        assert!(embedded.starts_with("a-very-detailed-castle-"), "{embedded}");
        assert_eq!(embedded.chars().count(), 80, "{embedded}");

        let object = env.store.object("art", &key).unwrap();
        let comment = &object.metadata["Comments"];
        assert!(comment.starts_with(embedded), "{comment}");
        assert_eq!(comment.as_str(), "a-very-detailed-castle-".repeat(8));
        assert_eq!(
            texts(&replies),
            vec![format!("Image **a very detail uploaded as {key} in the bucket art!")]
        );
    }

    #[tokio::test]
    async fn test_auto_upload_failure_is_reported() {
        let mut session = Session::default();
        session.set_bucket("art", "mj");
        session.auto_upload = true;
        let env = TestEnvironment::new(session).await;
        env.serve_status("/cdn/gone.png", 403).await;

        let replies = env.dispatcher.on_image_post(&env.image_post("/cdn/gone.png", "fox")).await;
        let text = texts(&replies).remove(0);
        assert!(text.starts_with("Error uploading the image:"), "{text}");
        assert!(text.contains("403"));
        assert!(env.store.is_empty());
    }

    #[tokio::test]
    async fn test_set_aws_rotates_store_credentials() {
        let env = TestEnvironment::with_bucket("art", "mj").await;
        let replies = env
            .run_with("!set_aws AKIANEWKEY00000 newsecret000000", Invocation::new(true))
            .await;
        assert_eq!(texts(&replies), vec!["AWS credentials configured."]);
        assert_eq!(env.store.credentials().await.unwrap().access_key_id, "AKIANEWKEY00000");
    }
}
