//! Integration tests for moving assets and syncing directories.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{ImageBuffer, Rgb, RgbImage};
use photo_catalog::config::AppSettings;
use photo_catalog::core::model::{SyncAssetsConfiguration, SyncAssetsDirectoriesDefinition};
use photo_catalog::events::{null_sender, Event, EventChannel, SyncEvent};
use photo_catalog::Application;
use predicates::prelude::*;
use std::path::Path;
use std::sync::atomic::AtomicBool;

fn write_image(path: &Path, seed: u8) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let image: RgbImage = ImageBuffer::from_fn(12, 12, |x, y| {
        Rgb([(x as u8).wrapping_mul(seed), y as u8, seed])
    });
    image.save(path).unwrap();
}

fn open(assets: &TempDir, data: &TempDir) -> Application {
    let settings = AppSettings {
        assets_directory: assets.path().to_path_buf(),
        data_directory: data.path().to_path_buf(),
        ..AppSettings::default()
    };
    Application::open(settings).unwrap()
}

#[test]
fn move_then_recatalog_is_stable() {
    let assets = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_image(&assets.child("inbox/a.png").path(), 1);

    let app = open(&assets, &data);
    app.catalog_assets(&null_sender(), &AtomicBool::new(false))
        .unwrap();

    let inbox = assets.child("inbox");
    let album = assets.child("album");
    let to_move = app.get_assets(inbox.path()).unwrap();
    assert!(app
        .move_assets(&to_move, album.path(), false, &null_sender())
        .unwrap());

    inbox.child("a.png").assert(predicate::path::missing());
    album.child("a.png").assert(predicate::path::is_file());
    assert_eq!(app.get_recent_target_paths().unwrap(), vec![album.path().to_path_buf()]);

    let summary = app
        .catalog_assets(&null_sender(), &AtomicBool::new(false))
        .unwrap();
    assert_eq!(summary.assets_created, 0);
    assert_eq!(summary.assets_deleted, 0);
    assert!(app.is_asset_cataloged(album.path(), "a.png").unwrap());
}

#[test]
fn copy_then_recatalog_is_stable() {
    let assets = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_image(&assets.child("inbox/a.png").path(), 4);

    let app = open(&assets, &data);
    app.catalog_assets(&null_sender(), &AtomicBool::new(false))
        .unwrap();

    let inbox = assets.child("inbox");
    let album = assets.child("album");
    let to_copy = app.get_assets(inbox.path()).unwrap();
    app.move_assets(&to_copy, album.path(), true, &null_sender())
        .unwrap();

    let summary = app
        .catalog_assets(&null_sender(), &AtomicBool::new(false))
        .unwrap();
    assert_eq!(summary.assets_created, 0);
    assert_eq!(summary.assets_updated, 0);
    inbox.child("a.png").assert(predicate::path::is_file());
}

#[test]
fn move_onto_existing_file_is_refused() {
    let assets = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_image(&assets.child("inbox/a.png").path(), 1);
    write_image(&assets.child("album/a.png").path(), 2);

    let app = open(&assets, &data);
    app.catalog_assets(&null_sender(), &AtomicBool::new(false))
        .unwrap();
    let before = std::fs::read(assets.child("album/a.png").path()).unwrap();

    let to_move = app.get_assets(assets.child("inbox").path()).unwrap();
    let result = app.move_assets(&to_move, assets.child("album").path(), false, &null_sender());

    assert!(result.is_err());
    assert_eq!(std::fs::read(assets.child("album/a.png").path()).unwrap(), before);
    assets.child("inbox/a.png").assert(predicate::path::is_file());
}

#[test]
fn copy_asset_duplicates_the_file() {
    let assets = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_image(&assets.child("a.png").path(), 3);
    let app = open(&assets, &data);

    let target = assets.child("copies/a.png");
    assert!(app.copy_asset(assets.child("a.png").path(), target.path()).unwrap());

    target.assert(predicate::path::is_file());
    assets.child("a.png").assert(predicate::path::is_file());
}

#[test]
fn sync_mirrors_configured_pairs() {
    let assets = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let backup = TempDir::new().unwrap();
    write_image(&assets.child("a.png").path(), 1);
    write_image(&assets.child("2024/b.png").path(), 2);
    backup.child("stale.png").write_binary(b"old").unwrap();

    let app = open(&assets, &data);
    let mut definition = SyncAssetsDirectoriesDefinition::new(
        assets.path().to_string_lossy(),
        backup.path().to_string_lossy(),
    );
    definition.include_sub_folders = true;
    definition.delete_assets_not_in_source = true;
    app.set_sync_assets_configuration(SyncAssetsConfiguration::new(vec![definition]))
        .unwrap();

    let (sender, receiver) = EventChannel::new();
    let results = app.sync_assets(&sender).unwrap();
    drop(sender);

    backup.child("a.png").assert(predicate::path::is_file());
    backup.child("2024/b.png").assert(predicate::path::is_file());
    backup.child("stale.png").assert(predicate::path::missing());
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].message,
        format!(
            "2 images synced from '{}' to '{}', 1 image deleted in destination.",
            assets.path().display(),
            backup.path().display()
        )
    );

    let copied = receiver
        .drain()
        .into_iter()
        .filter(|e| matches!(e, Event::Sync(SyncEvent::FileCopied { .. })))
        .count();
    assert_eq!(copied, 2);

    // The configuration survives a restart
    drop(app);
    let reopened = open(&assets, &data);
    assert_eq!(
        reopened.get_sync_assets_configuration().unwrap().definitions.len(),
        1
    );
}
