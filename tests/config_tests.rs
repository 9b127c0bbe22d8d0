use rust_slideshow::config::{
    BlurAlgorithm, Configuration, Easing, FitMode, Resolution, TransitionStyle,
};
use rust_slideshow::processing::blur::apply_blur;
use rust_slideshow::processing::pixel_buffer::PixelBuffer;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
photo-library-path: "/photos"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("/photos"));
    assert_eq!(cfg.slide_duration, Duration::from_secs(8));
    assert_eq!(cfg.transition_duration, Duration::from_secs(1));
    assert_eq!(&cfg.extensions[..3], ["jpg", "jpeg", "png"]);
    assert_eq!(
        cfg.extensions.iter().any(|e| e == "heic"),
        cfg!(feature = "heic")
    );
    assert_eq!(cfg.fit, FitMode::Contain);
    assert_eq!(cfg.blur.algorithm, BlurAlgorithm::Gaussian);
    assert!(cfg.target_resolution.is_none());
    assert!(cfg.fullscreen);
    cfg.validated().unwrap();
}

#[test]
fn parse_full_config() {
    let yaml = r#"
photo-library-path: "/p"
extensions: [".JPG", "png"]
slide-duration: 10s
transition-duration: 1500ms
target-resolution: { width: 1920, height: 1080 }
fit: cover
max-dimension: 4096
blur:
  algorithm: box
  radius: 3
  background-scale: 0.25
transition-style: fade-through
easing: parabolic
pan:
  radius-px: 120
  speed-px-per-sec: 30
seed: 7
fullscreen: false
"#;
    let cfg: Configuration = serde_yaml::from_str::<Configuration>(yaml)
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.extensions, vec!["jpg", "png"]);
    assert_eq!(cfg.slide_duration, Duration::from_secs(10));
    assert_eq!(cfg.transition_duration, Duration::from_millis(1500));
    assert_eq!(
        cfg.target_resolution,
        Some(Resolution {
            width: 1920,
            height: 1080
        })
    );
    assert_eq!(cfg.fit, FitMode::Cover);
    assert_eq!(cfg.max_dimension, 4096);
    assert_eq!(cfg.blur.algorithm, BlurAlgorithm::Box);
    assert!((cfg.blur.radius - 3.0).abs() < f32::EPSILON);
    assert!((cfg.blur.background_scale - 0.25).abs() < f32::EPSILON);
    assert_eq!(cfg.transition_style, TransitionStyle::FadeThrough);
    assert_eq!(cfg.easing, Easing::Parabolic);
    assert!((cfg.pan.radius_px - 120.0).abs() < f32::EPSILON);
    assert_eq!(cfg.seed, Some(7));
    assert!(!cfg.fullscreen);
}

#[test]
fn rejects_overlapping_transitions() {
    let yaml = r#"
slide-duration: 4s
transition-duration: 2s
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("half"), "{err}");
}

#[test]
fn rejects_small_blur_radius() {
    let yaml = r#"
blur:
  radius: 0.5
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn rejects_non_finite_blur_radius() {
    for radius in [".inf", ".nan"] {
        let yaml = format!("blur:\n  radius: {radius}\n");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        assert!(cfg.validated().is_err(), "radius {radius} accepted");
    }

    let cfg: Configuration = serde_yaml::from_str("blur:\n  radius: 1.0e20\n").unwrap();
    let cfg = cfg.validated().unwrap();
    let mut img = PixelBuffer::new(4, 4, 3).unwrap();
    img.fill(&[40, 80, 120]);
    for algorithm in [BlurAlgorithm::Gaussian, BlurAlgorithm::Box] {
        assert_eq!(apply_blur(&img, cfg.blur.radius, algorithm), img);
    }
}

#[test]
fn rejects_background_scale_out_of_range() {
    for scale in ["0", "1.5"] {
        let yaml = format!("blur:\n  background-scale: {scale}\n");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        assert!(cfg.validated().is_err(), "scale {scale} accepted");
    }
}

#[test]
fn rejects_empty_extensions_and_zero_resolution() {
    let cfg: Configuration = serde_yaml::from_str("extensions: []").unwrap();
    assert!(cfg.validated().is_err());

    let cfg: Configuration =
        serde_yaml::from_str("target-resolution: { width: 0, height: 10 }").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn unknown_enum_value_fails_to_parse() {
    assert!(serde_yaml::from_str::<Configuration>("fit: stretch").is_err());
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "photo-library-path: /x\nseed: 3\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.seed, Some(3));
    assert!(Configuration::from_yaml_file(dir.path().join("missing.yaml")).is_err());
}
