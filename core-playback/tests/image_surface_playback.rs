//! Scheduler and renderer driving the headless image surface

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use bridge_desktop::ImageSurface;
use bridge_traits::{
    display::LayerId, scheduler::ManualScheduler, storage::MemoryKeyValueStore, time::ManualClock,
};
use bytes::Bytes;
use core_cache::{CachedPhoto, CacheStore, StateStore};
use core_manifest::{Manifest, PhotoRef};
use core_playback::{PlaybackScheduler, Renderer};
use image::{DynamicImage, ImageFormat};

fn png(width: u32, height: u32) -> Bytes {
    let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 120, 30]),
    ));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    Bytes::from(buffer)
}

struct Frame {
    surface: ImageSurface,
    scheduler: PlaybackScheduler,
    renderer: Renderer,
}

async fn frame(photos: Vec<(&str, Bytes)>) -> Frame {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let cache = Arc::new(CacheStore::new(kv.clone()));
    let state = StateStore::new(kv);

    let mut refs = Vec::new();
    for (id, payload) in photos {
        cache
            .put(CachedPhoto::new(id, payload, "image/png", 0))
            .await
            .unwrap();
        refs.push(PhotoRef::new(id, format!("https://cdn/{}", id)));
    }
    state
        .set_manifest(&Manifest::new("v1", refs).with_slide_seconds(60))
        .await
        .unwrap();

    let surface = ImageSurface::new();
    let clock = Arc::new(ManualClock::from_millis(0));
    let renderer = Renderer::new(
        Arc::new(surface.clone()),
        cache.clone(),
        Arc::new(ManualScheduler::new(clock)),
        Duration::from_millis(800),
    );

    Frame {
        surface,
        scheduler: PlaybackScheduler::new(cache, state),
        renderer,
    }
}

#[tokio::test]
async fn test_slides_advance_and_old_handles_are_released() {
    let f = frame(vec![("first", png(4, 3)), ("second", png(8, 6))]).await;

    let slot = f.scheduler.tick(0).await.unwrap().unwrap();
    f.renderer.show_by_id(&slot.id).await.unwrap();
    assert_eq!(f.surface.active_layer(), Some(LayerId::A));
    assert_eq!(f.surface.layer(LayerId::A).width, 4);

    assert!(f.scheduler.tick(30_000).await.unwrap().is_none());

    let slot = f.scheduler.tick(60_000).await.unwrap().unwrap();
    assert_eq!(slot.id, "second");
    f.renderer.show_by_id(&slot.id).await.unwrap();

    assert_eq!(f.surface.active_layer(), Some(LayerId::B));
    assert_eq!(f.surface.layer(LayerId::B).width, 8);
    assert!(!f.surface.layer(LayerId::A).active);
    assert_eq!(f.surface.live_handles(), 1);
}

#[tokio::test]
async fn test_corrupt_payload_is_skipped() {
    let f = frame(vec![
        ("good", png(2, 2)),
        ("corrupt", Bytes::from_static(b"\x89PNG truncated")),
    ])
    .await;

    f.renderer.show_by_id("good").await.unwrap();
    let err = f.renderer.show_by_id("corrupt").await.unwrap_err();

    assert!(err.is_render_error());
    assert_eq!(f.surface.active_layer(), Some(LayerId::A));
    assert_eq!(f.surface.live_handles(), 1);
    assert_eq!(f.renderer.current_id().await.as_deref(), Some("good"));
}
