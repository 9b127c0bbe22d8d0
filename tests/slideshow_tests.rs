use rust_slideshow::config::{Configuration, Easing, TransitionStyle};
use rust_slideshow::processing::pixel_buffer::PixelBuffer;
use rust_slideshow::tasks::files::ImageSource;
use rust_slideshow::tasks::prefetch::SwapPhase;
use rust_slideshow::tasks::slideshow::Slideshow;
use std::thread;
use std::time::{Duration, Instant};

struct Counter(u8);

impl ImageSource for Counter {
    fn refresh(&mut self) -> bool {
        true
    }

    fn next_image(&mut self) -> PixelBuffer {
        self.0 += 1;
        let mut buf = PixelBuffer::new(6, 4, 3).unwrap();
        buf.fill(&[self.0, 0, 0]);
        buf
    }
}

fn config(style: TransitionStyle, easing: Easing) -> Configuration {
    let mut cfg = Configuration {
        slide_duration: Duration::from_secs(10),
        transition_duration: Duration::from_secs(2),
        transition_style: style,
        easing,
        seed: Some(5),
        ..Configuration::default()
    };
    cfg.pan.radius_px = 0.0;
    cfg.validated().unwrap()
}

fn wait_ready(show: &mut Slideshow<Counter>) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !show.pipeline_mut().is_lookahead_ready().unwrap() {
        assert!(Instant::now() < deadline, "lookahead never became ready");
        thread::sleep(Duration::from_millis(1));
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[test]
fn crossfade_draws_hidden_under_fading_main() {
    let cfg = config(TransitionStyle::Crossfade, Easing::Linear);
    let mut show = Slideshow::new(Counter(0), &cfg, (12, 8)).unwrap();

    let layers = show.tick(0.0).unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].slot, 0);
    assert!(close(layers[0].opacity, 1.0));
    assert_eq!(layers[0].image.dimensions(), (12, 8));
    assert_eq!(layers[0].background.dimensions(), (6, 4));
    assert_eq!(layers[0].offset, [0.0, 0.0]);

    show.tick(9.9).unwrap();
    let layers = show.tick(0.2).unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].slot, 0);
    assert!(close(layers[0].opacity, 1.0));
    assert_eq!(layers[1].slot, 1);
    assert!(close(layers[1].opacity, 0.1));
    assert!(show.controller().elapsed() < 1e-6);
}

#[test]
fn completed_fade_replaces_the_old_slide() {
    let cfg = config(TransitionStyle::Crossfade, Easing::Linear);
    let mut show = Slideshow::new(Counter(0), &cfg, (12, 8)).unwrap();
    let old_generation = show.pipeline().slots()[0].generation;
    wait_ready(&mut show);

    show.tick(10.1).unwrap();
    let (count, slot, opacity) = {
        let layers = show.tick(2.0).unwrap();
        (layers.len(), layers[0].slot, layers[0].opacity)
    };
    assert_eq!(show.pipeline().phase(), SwapPhase::Steady);
    assert_eq!(count, 1);
    assert_eq!(slot, 1);
    assert!(close(opacity, 1.0));

    let slot0 = &show.pipeline().slots()[0];
    assert!(slot0.generation > old_generation);
    assert_eq!(slot0.image.pixel(0, 0).unwrap()[0], 3);
}

#[test]
fn fade_through_follows_the_controller() {
    let cfg = config(TransitionStyle::FadeThrough, Easing::Linear);
    let mut show = Slideshow::new(Counter(0), &cfg, (12, 8)).unwrap();
    let layers = show.tick(1.0).unwrap();
    assert_eq!(layers.len(), 1);
    assert!(close(layers[0].opacity, 0.5));

    let layers = show.tick(4.0).unwrap();
    assert!(close(layers[0].opacity, 1.0));

    let layers = show.tick(4.5).unwrap();
    assert!(close(layers[0].opacity, 0.25));
}

#[test]
fn parabolic_easing_shapes_opacity() {
    let cfg = config(TransitionStyle::FadeThrough, Easing::Parabolic);
    let mut show = Slideshow::new(Counter(0), &cfg, (12, 8)).unwrap();
    let layers = show.tick(1.0).unwrap();
    assert!(close(layers[0].opacity, 0.75));
}
