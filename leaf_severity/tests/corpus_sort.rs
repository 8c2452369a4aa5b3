use leaf_severity::core_modules::utils::image_helper::image_helper::encode_png;
use leaf_severity::corpus::{CorpusLayout, CorpusSorter, CorpusStorage, FsStorage, MemoryStorage};
use leaf_severity::parallel_pipeline::DecodeFailurePolicy;
use leaf_severity::{PixelGrid, Rgb, Severity, SeverityPipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A 10x10 PNG whose first `dark` pixels have intensity 10 and the rest 255.
fn leaf_png(dark: usize) -> Vec<u8> {
    let pixels = (0..100)
        .map(|i| if i < dark { Rgb::gray(10) } else { Rgb::WHITE })
        .collect();
    encode_png(&PixelGrid::new(10, 10, pixels).unwrap()).unwrap()
}

fn memory_corpus() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert_file("raw/Potato___Early_blight/clean.png", leaf_png(0));
    storage.insert_file("raw/Potato___Early_blight/spotty.PNG", leaf_png(20));
    storage.insert_file("raw/Potato___Early_blight/notes.txt", b"field notes".to_vec());
    storage.insert_file("raw/Potato___Late_blight/edge.jpg", leaf_png(15));
    storage.insert_file("raw/Potato___Late_blight/corrupt.jpeg", b"\xff\xd8 truncated".to_vec());
    storage.insert_file("raw/Potato___healthy/dark_but_healthy.png", leaf_png(90));
    storage
}

fn sorter(storage: Arc<MemoryStorage>) -> CorpusSorter {
    CorpusSorter::new(storage, SeverityPipeline::default(), CorpusLayout::new("raw", "processed")).with_workers(2)
}

#[tokio::test]
async fn routes_each_image_by_spot_ratio() {
    let storage = memory_corpus();
    let report = sorter(storage.clone()).run().await.unwrap();

    assert_eq!(report.examined, 5);
    assert_eq!(report.ignored, 1);
    assert!(report.missing_classes.is_empty());

    for (path, expected) in [
        ("processed/Early_Blight_Mild/clean.png", true),
        ("processed/Early_Blight_Severe/spotty.PNG", true),
        ("processed/Late_Blight_Severe/edge.jpg", true),
        ("processed/Healthy/dark_but_healthy.png", true),
        ("processed/Late_Blight_Mild/corrupt.jpeg", false),
    ] {
        assert_eq!(storage.file(Path::new(path)).is_some(), expected, "{path}");
    }

    let edge = report
        .placements
        .iter()
        .find(|p| p.source_path.ends_with("edge.jpg"))
        .unwrap();
    assert_eq!(edge.result.computed_ratio, 0.15);
    assert_eq!(edge.result.severity, Severity::Severe);

    let healthy = report
        .placements
        .iter()
        .find(|p| p.result.source_class == "Potato___healthy")
        .unwrap();
    assert_eq!(healthy.result.computed_ratio, 0.9);
    assert_eq!(healthy.result.output_label, "Healthy");
}

#[tokio::test]
async fn undecodable_image_is_skipped_without_stopping_the_run() {
    let report = sorter(memory_corpus()).run().await.unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, PathBuf::from("raw/Potato___Late_blight/corrupt.jpeg"));
    assert!(report.skipped[0].reason.contains("invalid image"));
    assert_eq!(report.placed_total(), 4);
    assert_eq!(report.final_counts.get("Late_Blight_Mild"), Some(&0));
    assert_eq!(report.final_counts.len(), 5);
}

#[tokio::test]
async fn fail_soft_policy_places_undecodable_image_as_mild() {
    let storage = memory_corpus();
    let report = sorter(storage.clone())
        .with_decode_failure_policy(DecodeFailurePolicy::TreatAsClean)
        .run()
        .await
        .unwrap();

    assert!(report.skipped.is_empty());
    assert_eq!(report.placed.get("Late_Blight_Mild"), Some(&1));
    assert!(storage.file(Path::new("processed/Late_Blight_Mild/corrupt.jpeg")).is_some());
}

#[tokio::test]
async fn missing_class_folder_is_reported() {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert_file("raw/Potato___healthy/leaf.png", leaf_png(0));

    let report = sorter(storage.clone()).run().await.unwrap();

    assert_eq!(
        report.missing_classes,
        vec!["Potato___Early_blight".to_string(), "Potato___Late_blight".to_string()]
    );
    assert_eq!(report.placed_total(), 1);
    // Every bucket exists even when nothing was routed into it.
    assert!(storage.is_directory(Path::new("processed/Early_Blight_Severe")));
}

#[tokio::test]
async fn sorts_a_real_directory_tree() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = tmp.path().join("data/raw");
    let processed = tmp.path().join("data/processed");
    for (class, name, dark) in [
        ("Potato___Early_blight", "a.png", 3),
        ("Potato___Early_blight", "b.png", 40),
        ("Potato___healthy", "c.png", 60),
    ] {
        std::fs::create_dir_all(raw.join(class)).unwrap();
        std::fs::write(raw.join(class).join(name), leaf_png(dark)).unwrap();
    }

    let report = CorpusSorter::new(Arc::new(FsStorage), SeverityPipeline::default(), CorpusLayout::new(&raw, &processed))
        .run()
        .await
        .unwrap();

    assert_eq!(report.placed_total(), 3);
    assert_eq!(report.missing_classes, vec!["Potato___Late_blight".to_string()]);
    assert!(processed.join("Early_Blight_Mild/a.png").is_file());
    assert!(processed.join("Early_Blight_Severe/b.png").is_file());
    assert!(processed.join("Healthy/c.png").is_file());
    assert_eq!(report.final_counts.get("Healthy"), Some(&1));

    // A second run overwrites rather than duplicates.
    let again = CorpusSorter::new(Arc::new(FsStorage), SeverityPipeline::default(), CorpusLayout::new(&raw, &processed))
        .run()
        .await
        .unwrap();
    assert_eq!(again.final_counts.get("Early_Blight_Mild"), Some(&1));
}

#[tokio::test]
async fn final_counts_include_folders_outside_the_table() {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert_file("raw/Potato___healthy/.png", leaf_png(0));
    storage.insert_file("processed/Old_Bucket/stale.png", leaf_png(0));

    let report = sorter(storage.clone()).run().await.unwrap();

    assert_eq!(report.examined, 1);
    assert!(storage.file(Path::new("processed/Healthy/.png")).is_some());
    assert_eq!(report.final_counts.get("Healthy"), Some(&1));
    assert_eq!(report.final_counts.get("Old_Bucket"), Some(&1));
    assert_eq!(report.final_counts.len(), 6);
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_images_are_sorted() {
    let tmp = tempfile::tempdir().unwrap();
    let store = tmp.path().join("store");
    let raw = tmp.path().join("raw");
    let processed = tmp.path().join("processed");
    std::fs::create_dir_all(&store).unwrap();
    std::fs::create_dir_all(raw.join("Potato___healthy")).unwrap();
    std::fs::write(store.join("leaf.png"), leaf_png(0)).unwrap();
    std::os::unix::fs::symlink(store.join("leaf.png"), raw.join("Potato___healthy/leaf.png")).unwrap();

    let report = CorpusSorter::new(Arc::new(FsStorage), SeverityPipeline::default(), CorpusLayout::new(&raw, &processed))
        .run()
        .await
        .unwrap();

    assert_eq!(report.examined, 1);
    assert_eq!(report.placed.get("Healthy"), Some(&1));
    assert!(processed.join("Healthy/leaf.png").is_file());
}
