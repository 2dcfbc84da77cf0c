mod common;

use std::time::Instant;

use abloop_core::{
    PlayerEvent, ScrubGesture, ScrubReconciler, TrackGeometry,
    backend::{BackendEvent, MediaSource},
};
use common::{controller, drain, has_time_update, loaded, tick};

fn reconciler() -> ScrubReconciler {
    ScrubReconciler::new(TrackGeometry::new(0.0, 100.0))
}

#[test]
fn drag_previews_then_commits_one_seek() {
    let (mut controller, rec) = loaded(120.0);
    controller.play().unwrap();
    let rx = controller.subscribe_channel();
    let mut scrub = reconciler();

    scrub.begin(&mut controller, 50.0);
    assert!(controller.state().time_updates_suspended);
    tick(&mut controller, 5.0);
    scrub.update(&mut controller, 75.0);
    tick(&mut controller, 5.5);

    let during = drain(&rx);
    assert!(!has_time_update(&during));
    assert_eq!(
        during,
        vec![PlayerEvent::ScrubPreview(60.0), PlayerEvent::ScrubPreview(90.0)]
    );
    // ticks still land internally
    assert_eq!(controller.current_time(), 5.5);
    assert_eq!(scrub.provisional_time(), Some(90.0));

    scrub.end(&mut controller);
    assert!(!scrub.is_active());
    assert!(!controller.state().time_updates_suspended);
    assert_eq!(rec.borrow().seeks, vec![90.0]);

    controller.poll(Instant::now());
    assert_eq!(drain(&rx), vec![PlayerEvent::TimeUpdate(90.0)]);
}

#[test]
fn pointer_outside_track_is_clamped() {
    let (mut controller, rec) = loaded(120.0);
    let mut scrub = reconciler();

    scrub.handle(&mut controller, ScrubGesture::Begin(-30.0));
    assert_eq!(scrub.provisional_time(), Some(0.0));
    scrub.handle(&mut controller, ScrubGesture::Update(400.0));
    scrub.handle(&mut controller, ScrubGesture::End);

    assert_eq!(rec.borrow().seeks, vec![120.0]);
}

#[test]
fn second_begin_acts_as_update() {
    let (mut controller, rec) = loaded(120.0);
    let mut scrub = reconciler();

    scrub.begin(&mut controller, 10.0);
    scrub.begin(&mut controller, 25.0);
    scrub.end(&mut controller);
    scrub.end(&mut controller);

    assert_eq!(rec.borrow().seeks, vec![30.0]);
}

#[test]
fn unknown_duration_never_seeks() {
    let (mut controller, rec) = controller(120.0);
    rec.borrow_mut().metadata_on_load = false;
    controller.load(MediaSource::file("slow.mp3")).unwrap();
    let mut scrub = reconciler();

    scrub.begin(&mut controller, 50.0);
    controller.handle_backend_event(BackendEvent::MetadataReady {
        duration: 120.0,
        metadata: None,
    });
    scrub.update(&mut controller, 60.0);
    scrub.end(&mut controller);

    assert!(rec.borrow().seeks.is_empty());
    assert!(!controller.state().time_updates_suspended);
}

#[test]
fn zero_width_geometry_scrubs_to_start() {
    let (mut controller, rec) = loaded(120.0);
    let mut scrub = ScrubReconciler::default();

    scrub.begin(&mut controller, 80.0);
    scrub.end(&mut controller);

    assert_eq!(rec.borrow().seeks, vec![0.0]);
}

#[test]
fn geometry_can_change_mid_gesture() {
    let (mut controller, rec) = loaded(120.0);
    let mut scrub = reconciler();

    scrub.begin(&mut controller, 50.0);
    scrub.set_geometry(TrackGeometry::new(50.0, 50.0));
    scrub.update(&mut controller, 75.0);
    scrub.end(&mut controller);

    assert_eq!(rec.borrow().seeks, vec![60.0]);
}
