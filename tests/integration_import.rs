//! Integration tests for the import pipeline.
//!
//! These tests drive the importer against real files on disk and check:
//! - Terminal job statuses (novel, duplicate, similar, failed)
//! - The library contents and flags left behind
//! - Searching and rebuilding over the imported items

use assert_fs::prelude::*;
use media_library::core::import::{Importer, JobStatus};
use media_library::core::model::{InMemoryLibrary, ItemStore};
use media_library::core::search::Search;
use media_library::core::similarity::{SimilarityConfig, SimilarityRebuilder};
use media_library::core::CancellationToken;
use media_library::events::null_sender;
use predicates::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

/// Write a 32x32 PNG whose columns alternate between two colors every `stripe` pixels
fn striped_png(path: &Path, a: [u8; 3], b: [u8; 3], stripe: u32) {
    image::RgbImage::from_fn(32, 32, |x, _| {
        image::Rgb(if (x / stripe) % 2 == 0 { a } else { b })
    })
    .save(path)
    .unwrap();
}

const RED: [u8; 3] = [220, 30, 30];
const BLUE: [u8; 3] = [30, 30, 220];
const GREEN: [u8; 3] = [30, 200, 30];
const GRAY: [u8; 3] = [128, 128, 128];
const WHITE: [u8; 3] = [255, 255, 255];

#[test]
fn import_folder_resolves_every_job() {
    let dir = assert_fs::TempDir::new().unwrap();
    let original = dir.child("original.png");
    let restriped = dir.child("restriped.png");
    let copy = dir.child("copy.png");
    let different = dir.child("different.png");
    let broken = dir.child("broken.jpg");

    striped_png(original.path(), RED, BLUE, 4);
    striped_png(restriped.path(), RED, BLUE, 8);
    std::fs::copy(original.path(), copy.path()).unwrap();
    striped_png(different.path(), GREEN, GRAY, 4);
    broken.write_binary(b"\xFF\xD8\xFF not really a jpeg").unwrap();

    let library = Arc::new(InMemoryLibrary::new());
    let importer = Importer::builder().build(library.clone()).unwrap();

    let jobs: Vec<_> = [&original, &restriped, &copy, &different, &broken]
        .iter()
        .map(|file| importer.add_job(file.path().to_path_buf()).unwrap())
        .collect();
    let statuses: Vec<_> = jobs.iter().map(|job| job.wait_timeout(WAIT)).collect();

    assert_eq!(
        statuses,
        vec![
            Some(JobStatus::Succeeded),
            Some(JobStatus::SucceededSimilar),
            Some(JobStatus::FailedDuplicate),
            Some(JobStatus::Succeeded),
            Some(JobStatus::Succeeded),
        ]
    );

    // The exact copy points at the original and added nothing
    assert_eq!(
        jobs[2].duplicate_of().unwrap().id(),
        jobs[0].item().unwrap().id()
    );
    assert_eq!(library.len(), 4);

    // The copy is still on disk; the importer never touches local sources
    copy.assert(predicate::path::exists());

    // The undecodable file was imported without a histogram
    let broken_item = jobs[4].item().unwrap();
    assert!(!broken_item.as_media().unwrap().has_histogram());

    let missing = Search::parse("missing:histogram", false, false).unwrap();
    let found = missing.refresh(&library.all_items());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), broken_item.id());
}

#[test]
fn rebuild_agrees_with_import_flags() {
    let dir = assert_fs::TempDir::new().unwrap();
    let files = [
        ("a.png", RED, BLUE, 4),
        ("b.png", RED, BLUE, 16),
        ("c.png", GRAY, WHITE, 4),
    ];
    for (name, a, b, stripe) in files {
        striped_png(dir.child(name).path(), a, b, stripe);
    }

    let library = Arc::new(InMemoryLibrary::new());
    let importer = Importer::builder().build(library.clone()).unwrap();
    for (name, ..) in files {
        importer
            .add_job(dir.child(name).path().to_path_buf())
            .unwrap()
            .wait_timeout(WAIT)
            .unwrap();
    }

    let items = library.all_items();
    let outcome = SimilarityRebuilder::new(SimilarityConfig::default()).rebuild(
        &items,
        &CancellationToken::new(),
        &null_sender(),
    );

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.without_similar, 1);
    let lonely: Vec<_> = items
        .iter()
        .filter(|item| item.as_media().unwrap().has_no_similar())
        .map(|item| item.as_media().unwrap().file().to_path_buf())
        .collect();
    assert_eq!(lonely, vec![dir.child("c.png").path().to_path_buf()]);
}

#[test]
fn search_over_imported_items() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("holiday").create_dir_all().unwrap();
    striped_png(dir.child("holiday/beach.png").path(), RED, BLUE, 2);
    striped_png(dir.child("holiday/sunset.png").path(), GREEN, BLUE, 2);
    striped_png(dir.child("work.png").path(), GRAY, WHITE, 2);

    let library = Arc::new(InMemoryLibrary::new());
    let importer = Importer::builder().build(library.clone()).unwrap();
    for path in ["holiday/beach.png", "holiday/sunset.png", "work.png"] {
        importer
            .add_job(dir.child(path).path().to_path_buf())
            .unwrap()
            .wait_timeout(WAIT)
            .unwrap();
    }

    let items = library.all_items();
    let holiday = Search::parse("path:holiday type:image", true, false)
        .unwrap()
        .refresh(&items);
    let names: Vec<_> = holiday
        .iter()
        .map(|item| {
            item.as_media()
                .unwrap()
                .file()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(names, vec!["sunset.png", "beach.png"]);

    let first_id = items[0].id().0;
    let later = Search::parse(&format!("id:>{first_id}"), false, false)
        .unwrap()
        .refresh(&items);
    assert_eq!(later.len(), 2);
}
