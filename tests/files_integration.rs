use rust_slideshow::config::Configuration;
use rust_slideshow::tasks::files::{ImageSource, LocalCatalog};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn write_png(path: &std::path::Path, w: u32, h: u32) {
    image::RgbImage::from_pixel(w, h, image::Rgb([10, 200, 30]))
        .save(path)
        .unwrap();
}

#[test]
fn recursive_scan_filters_by_extension() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path();
    fs::create_dir_all(lib.join("nested/deeper")).unwrap();
    fs::write(lib.join("a.jpg"), b"x").unwrap();
    fs::write(lib.join("nested").join("b.JPEG"), b"x").unwrap();
    fs::write(lib.join("nested/deeper").join("c.png"), b"x").unwrap();
    fs::write(lib.join("notes.txt"), b"x").unwrap();
    fs::write(lib.join("no_extension"), b"x").unwrap();

    let mut cat = LocalCatalog::new(lib, ["jpg", "jpeg", "png"], Some(1));
    assert!(cat.rescan());
    let found: HashSet<PathBuf> = cat.paths().iter().cloned().collect();
    let expected: HashSet<PathBuf> = [
        lib.join("a.jpg"),
        lib.join("nested").join("b.JPEG"),
        lib.join("nested/deeper").join("c.png"),
    ]
    .into_iter()
    .collect();
    assert_eq!(found, expected);
}

#[test]
fn missing_root_returns_false_and_keeps_list() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().join("lib");
    fs::create_dir_all(&lib).unwrap();
    fs::write(lib.join("a.jpg"), b"x").unwrap();

    let mut cat = LocalCatalog::new(&lib, ["jpg"], Some(1));
    assert!(cat.rescan());
    assert_eq!(cat.len(), 1);

    fs::remove_dir_all(&lib).unwrap();
    assert!(!cat.refresh());
    assert_eq!(cat.paths(), &[lib.join("a.jpg")]);
}

#[test]
fn missing_root_on_fresh_catalog_is_empty() {
    let mut cat = LocalCatalog::new("/definitely/not/here", ["jpg"], None);
    assert!(!cat.refresh());
    assert!(cat.is_empty());
    assert!(cat.next_path().is_none());
}

#[test]
fn refresh_replaces_the_whole_list() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.png"), b"x").unwrap();
    let mut cat = LocalCatalog::new(tmp.path(), ["png"], Some(1));
    cat.rescan();
    fs::remove_file(tmp.path().join("a.png")).unwrap();
    fs::write(tmp.path().join("b.png"), b"x").unwrap();
    cat.rescan();
    assert_eq!(cat.paths(), &[tmp.path().join("b.png")]);
}

#[test]
fn picks_are_uniform_over_the_list_and_seeded() {
    let tmp = tempdir().unwrap();
    for name in ["a", "b", "c", "d"] {
        fs::write(tmp.path().join(format!("{name}.jpg")), b"x").unwrap();
    }
    let mut first = LocalCatalog::new(tmp.path(), ["jpg"], Some(42));
    let mut second = LocalCatalog::new(tmp.path(), ["jpg"], Some(42));
    first.rescan();
    second.rescan();

    let picks: Vec<PathBuf> = (0..200).filter_map(|_| first.next_path()).collect();
    let again: Vec<PathBuf> = (0..200).filter_map(|_| second.next_path()).collect();
    assert_eq!(picks, again);
    let distinct: HashSet<_> = picks.iter().collect();
    assert_eq!(distinct.len(), 4, "every file should be picked eventually");
}

#[test]
fn next_image_decodes_a_pick() {
    let tmp = tempdir().unwrap();
    write_png(&tmp.path().join("only.png"), 6, 4);
    let cfg = Configuration {
        photo_library_path: tmp.path().to_path_buf(),
        seed: Some(9),
        ..Configuration::default()
    };
    let mut cat = LocalCatalog::from_config(&cfg);
    assert!(cat.refresh());
    let img = cat.next_image();
    assert_eq!(img.dimensions(), (6, 4));
    assert_eq!(img.pixel(0, 0), Some(&[10, 200, 30][..]));
}
