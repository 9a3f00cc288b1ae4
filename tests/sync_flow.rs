mod support;

use std::sync::Arc;

use canvas_sync::event::{EditorEvent, EventLog};
use canvas_sync::graph::{CanvasDataNode, GraphInput, LoadImageNode};
use canvas_sync::payload::{NodeId, PushNotification};
use canvas_sync::surface::{RasterSurface, SurfaceStyle};
use canvas_sync::error::RegistryError;
use canvas_sync::{
    CanvasEditor, CanvasError, EditorConfig, EditorInstances, LayerId, LayerKind, LocalEdit,
    SyncPhase,
};
use futures::executor::{LocalPool, block_on};
use futures::task::LocalSpawnExt as _;

use support::*;

fn applied(log: &EventLog) -> Vec<u64> {
    log.events()
        .into_iter()
        .filter_map(|event| match event {
            EditorEvent::PayloadApplied { generation, .. } => Some(generation),
            _ => None,
        })
        .collect()
}

#[test]
fn allocated_ids_never_repeat() {
    let fx = fixture("1");
    block_on(async {
        let mut added = Vec::new();
        for _ in 0..3 {
            let outcome = fx.editor.apply_local_edit(LocalEdit::AddTextLayer).await.unwrap();
            added.extend(outcome.added);
        }
        assert_eq!(added, vec![LayerId(1), LayerId(2), LayerId(3)]);

        fx.editor.select_layer(Some(LayerId(3)));
        fx.editor.apply_local_edit(LocalEdit::RemoveActive).await.unwrap();
        fx.editor.apply_local_edit(LocalEdit::Reset).await.unwrap();

        let outcome = fx.editor.apply_local_edit(LocalEdit::AddTextLayer).await.unwrap();
        assert_eq!(outcome.added, vec![LayerId(4)]);
    });
}

#[test]
fn same_payload_is_applied_once() {
    let fx = fixture("1");
    let log = EventLog::new();
    fx.editor.subscribe(Box::new(log.clone()));
    let content = payload(None, vec![layer(1, "a.png"), layer(2, "b.png")]);

    block_on(async {
        fx.editor.on_server_payload(content.clone()).await;
        let first = fx.editor.with_registry(|r| r.get(LayerId(1)).map(|e| e.handle));

        fx.editor.on_server_payload(content).await;
        let second = fx.editor.with_registry(|r| r.get(LayerId(1)).map(|e| e.handle));

        assert_eq!(first, second);
        assert_eq!(applied(&log), vec![1]);
        assert_eq!(ids(&fx.editor), vec![1, 2]);
    });
}

#[test]
fn changed_payload_replaces_every_layer() {
    let fx = fixture("1");
    block_on(async {
        fx.editor
            .on_server_payload(payload(None, vec![layer(1, "a.png"), layer(2, "b.png")]))
            .await;
        fx.editor.on_server_payload(payload(None, vec![layer(3, "c.png")])).await;
    });
    assert_eq!(ids(&fx.editor), vec![3]);
    assert_eq!(fx.editor.with_surface(|s| s.object_count()), 1);
}

#[test]
fn empty_canvas_reapplies_a_known_payload() {
    let fx = fixture("1");
    let content = payload(None, vec![layer(1, "a.png")]);
    block_on(async {
        fx.editor.on_server_payload(content.clone()).await;
        fx.editor.apply_local_edit(LocalEdit::ClearLayers).await.unwrap();
        assert!(ids(&fx.editor).is_empty());

        fx.editor.on_server_payload(content).await;
    });
    assert_eq!(ids(&fx.editor), vec![1]);
}

#[test]
fn forced_fetch_keeps_explicit_ids() {
    let fx = fixture("1");
    fx.backend.store(payload(Some(background("bg.png", None)), vec![layer(5, "a.png")]));

    block_on(async {
        assert!(fx.editor.fetch_and_apply_latest(true).await);
        assert_eq!(ids(&fx.editor), vec![5]);

        let outcome = fx.editor.apply_local_edit(LocalEdit::AddTextLayer).await.unwrap();
        assert_eq!(outcome.added, vec![LayerId(6)]);
    });
}

#[test]
fn zero_ids_are_allocated_above_explicit_ones() {
    let fx = fixture("1");
    block_on(fx.editor.reset_and_apply(payload(
        None,
        vec![layer(0, "x.png"), layer(2, "a.png"), layer(0, "y.png")],
    )));
    assert_eq!(ids(&fx.editor), vec![2, 3, 4]);
}

#[test]
fn layers_without_image_and_failed_loads_are_skipped() {
    let fx = fixture("1");
    fx.assets.fail("broken.png");
    let committed = block_on(fx.editor.reset_and_apply(payload(
        None,
        vec![layer(1, ""), layer(2, "broken.png"), layer(3, "ok.png")],
    )));
    assert!(committed);
    assert_eq!(ids(&fx.editor), vec![3]);
    assert_eq!(*fx.assets.requests.lock(), vec!["broken.png", "ok.png"]);
}

#[test]
fn background_sets_the_canvas_size() {
    let fx = fixture("1");
    fx.assets.with_size("bg.png", 300, 200);
    block_on(async {
        fx.editor.reset_and_apply(payload(Some(background("bg.png", None)), vec![])).await;
        assert_eq!(fx.editor.with_surface(|s| s.dimensions()), [300, 200]);

        fx.editor
            .reset_and_apply(payload(Some(background("bg.png", Some((640.0, 480.0)))), vec![]))
            .await;
        assert_eq!(fx.editor.with_surface(|s| s.dimensions()), [640, 480]);
    });
    let natural = fx.editor.with_registry(|r| r.background().map(|bg| bg.natural_size));
    assert_eq!(natural, Some([300, 200]));
}

#[test]
fn repeated_push_keeps_object_count() {
    let fx = fixture("7");
    let push = PushNotification {
        node_id: NodeId::from("7"),
        canvas_data: Some(payload(Some(background("bg.png", None)), vec![layer(1, "a.png")])),
    };
    block_on(async {
        fx.editor.handle_push(push.clone()).await.unwrap();
        let count = fx.editor.with_surface(|s| s.object_count());
        fx.editor.handle_push(push).await.unwrap();
        assert_eq!(fx.editor.with_surface(|s| s.object_count()), count);
    });
    assert_eq!(fx.backend.export_count(), 2);
}

#[test]
fn push_for_another_node_is_rejected() {
    let fx = fixture("7");
    let result = block_on(fx.editor.handle_push(PushNotification {
        node_id: NodeId::from("8"),
        canvas_data: Some(payload(None, vec![layer(1, "a.png")])),
    }));
    assert!(matches!(result, Err(CanvasError::IdentityMismatch(id)) if id == "8"));
    assert!(ids(&fx.editor).is_empty());
    assert_eq!(fx.backend.export_count(), 0);
}

#[test]
fn push_without_data_only_exports() {
    let fx = fixture("7");
    block_on(fx.editor.handle_push(PushNotification {
        node_id: NodeId::from(7),
        canvas_data: None,
    }))
    .unwrap();
    assert_eq!(fx.backend.export_count(), 1);
    assert_eq!(fx.backend.exports.lock()[0].node_id, NodeId::from("7"));
    assert!(fx.backend.exports.lock()[0].image_b64.starts_with("data:image/png;base64,"));
}

fn overlapping_applies(release_newer_first: bool) {
    let fx = fixture("1");
    let log = EventLog::new();
    fx.editor.subscribe(Box::new(log.clone()));
    let older = fx.assets.hold("old.png");
    let newer = fx.assets.hold("new.png");

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let editor = fx.editor.clone();
    spawner
        .spawn_local(async move {
            editor.reset_and_apply(payload(None, vec![layer(1, "old.png")])).await;
        })
        .unwrap();
    let editor = fx.editor.clone();
    spawner
        .spawn_local(async move {
            editor.reset_and_apply(payload(None, vec![layer(2, "new.png")])).await;
        })
        .unwrap();
    pool.run_until_stalled();
    assert_eq!(fx.editor.sync_phase(), SyncPhase::Applying);

    let (first, second) = if release_newer_first {
        (newer, older)
    } else {
        (older, newer)
    };
    first.send(()).unwrap();
    pool.run_until_stalled();
    second.send(()).unwrap();
    pool.run_until_stalled();

    assert_eq!(ids(&fx.editor), vec![2]);
    assert_eq!(fx.editor.sync_phase(), SyncPhase::Idle);
    assert_eq!(applied(&log), vec![2]);
    assert!(log.events().contains(&EditorEvent::PayloadDiscarded { generation: 1 }));
}

#[test]
fn later_apply_wins_when_it_finishes_first() {
    overlapping_applies(true);
}

#[test]
fn later_apply_wins_when_it_finishes_last() {
    overlapping_applies(false);
}

#[test]
fn local_edit_during_apply_is_overwritten_by_the_commit() {
    let fx = fixture("1");
    let gate = fx.assets.hold("b.png");

    let mut pool = LocalPool::new();
    let editor = fx.editor.clone();
    pool.spawner()
        .spawn_local(async move {
            editor
                .reset_and_apply(payload(None, vec![layer(4, "a.png"), layer(5, "b.png")]))
                .await;
        })
        .unwrap();
    pool.run_until_stalled();
    assert_eq!(fx.editor.sync_phase(), SyncPhase::Applying);

    let exports = fx.backend.export_count();
    let outcome = block_on(fx.editor.apply_local_edit(LocalEdit::AddTextLayer)).unwrap();
    let text = outcome.added[0];
    assert_eq!(fx.backend.export_count(), exports + 1);
    assert_eq!(ids(&fx.editor), vec![text.get()]);

    gate.send(()).unwrap();
    pool.run_until_stalled();

    assert_eq!(fx.editor.sync_phase(), SyncPhase::Idle);
    assert_eq!(ids(&fx.editor), vec![4, 5]);
    assert!(!fx.editor.layer_ids().contains(&text));
    let kinds = fx.editor.with_registry(|registry| {
        registry.ordered_layers().iter().map(|entry| entry.kind).collect::<Vec<_>>()
    });
    assert_eq!(kinds, vec![LayerKind::Image, LayerKind::Image]);
    assert_eq!(fx.editor.with_surface(|surface| surface.object_count()), 2);
}

#[test]
fn highest_layer_id_applies_and_exhausts_allocation() {
    let fx = fixture("1");
    block_on(async {
        let committed = fx
            .editor
            .reset_and_apply(payload(None, vec![layer(u32::MAX, "a.png"), layer(0, "b.png")]))
            .await;
        assert!(committed);
        assert_eq!(fx.editor.sync_phase(), SyncPhase::Idle);
        // No id is left for the zero-id layer
        assert_eq!(ids(&fx.editor), vec![u32::MAX]);

        let exports = fx.backend.export_count();
        let err = fx.editor.apply_local_edit(LocalEdit::AddTextLayer).await.unwrap_err();
        assert!(matches!(err, CanvasError::Registry(RegistryError::Exhausted)));
        assert_eq!(fx.backend.export_count(), exports + 1);
        assert_eq!(ids(&fx.editor), vec![u32::MAX]);
        assert_eq!(fx.editor.with_surface(|surface| surface.object_count()), 1);
    });
}

#[test]
fn duplicate_payload_ids_keep_the_first_layer() {
    let fx = fixture("1");
    block_on(async {
        fx.editor
            .reset_and_apply(payload(None, vec![layer(3, "a.png"), layer(3, "b.png")]))
            .await;
    });
    assert_eq!(ids(&fx.editor), vec![3]);
    // The rejected layer's object is taken off the surface again
    assert_eq!(fx.editor.with_surface(|s| s.object_count()), 1);
}

#[test]
fn allocation_uses_the_last_id_then_stops() {
    let fx = fixture("1");
    block_on(async {
        fx.editor
            .reset_and_apply(payload(None, vec![layer(u32::MAX - 1, "a.png")]))
            .await;
        let outcome = fx.editor.apply_local_edit(LocalEdit::AddTextLayer).await.unwrap();
        assert_eq!(outcome.added, vec![LayerId(u32::MAX)]);
        assert!(fx.editor.apply_local_edit(LocalEdit::AddTextLayer).await.is_err());
    });
}

#[test]
fn payloads_wait_for_the_surface() {
    init_logging();
    let backend = Arc::new(RecordingBackend::default());
    let assets = Arc::new(ManualAssets::default());
    let (surface, gate) = RasterSurface::gated(512, 512, SurfaceStyle::default());
    let editor = CanvasEditor::new(
        Some(NodeId::from("3")),
        EditorConfig::default(),
        Box::new(surface),
        services(&backend, &assets),
    );
    let log = EventLog::new();
    editor.subscribe(Box::new(log.clone()));

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    for (id, image) in [(1, "first.png"), (2, "second.png"), (3, "third.png")] {
        let editor = editor.clone();
        spawner
            .spawn_local(async move {
                editor.on_server_payload(payload(None, vec![layer(id, image)])).await;
            })
            .unwrap();
    }
    pool.run_until_stalled();

    assert_eq!(editor.sync_phase(), SyncPhase::AwaitingReady);
    assert!(ids(&editor).is_empty());
    assert!(assets.requests.lock().is_empty());

    gate.open();
    pool.run_until_stalled();

    assert!(editor.is_ready());
    assert_eq!(ids(&editor), vec![3]);
    assert_eq!(*assets.requests.lock(), vec!["third.png"]);
    assert_eq!(applied(&log), vec![1]);
}

#[test]
fn attach_without_payload_exports_then_fetches() {
    let fx = fixture("1");
    fx.backend.store(payload(None, vec![layer(4, "a.png")]));
    block_on(fx.editor.on_attached());

    assert_eq!(fx.backend.export_count(), 1);
    assert_eq!(*fx.backend.fetches.lock(), 1);
    assert_eq!(ids(&fx.editor), vec![4]);
}

#[test]
fn reattach_reapplies_current_payload() {
    let fx = fixture("1");
    block_on(async {
        fx.editor.on_server_payload(payload(None, vec![layer(2, "a.png")])).await;
        fx.editor.apply_local_edit(LocalEdit::ClearLayers).await.unwrap();
        fx.editor.on_attached().await;
    });
    assert_eq!(ids(&fx.editor), vec![2]);
    assert_eq!(*fx.backend.fetches.lock(), 0);
}

#[test]
fn reload_queues_the_node_when_a_trigger_exists() {
    init_logging();
    let backend = Arc::new(RecordingBackend::default());
    let assets = Arc::new(ManualAssets::default());
    let trigger = Arc::new(RecordingTrigger::default());
    let editor = CanvasEditor::new(
        Some(NodeId::from("12")),
        EditorConfig::default(),
        Box::new(RasterSurface::new(512, 512, SurfaceStyle::default())),
        services(&backend, &assets).with_trigger(trigger.clone()),
    );

    block_on(editor.trigger_reload());
    assert_eq!(*trigger.queued.lock(), vec![vec![NodeId::from("12")]]);
    assert_eq!(*backend.fetches.lock(), 0);
    assert_eq!(backend.export_count(), 0);
}

#[test]
fn reload_falls_back_to_stored_payload() {
    let fx = fixture("1");
    block_on(fx.editor.on_server_payload(payload(None, vec![layer(1, "a.png")])));
    fx.backend.store(payload(None, vec![layer(1, "a.png")]));
    let log = EventLog::new();
    fx.editor.subscribe(Box::new(log.clone()));

    block_on(fx.editor.trigger_reload());

    // Forced even though the fingerprint matches
    assert_eq!(applied(&log).len(), 1);
    assert_eq!(fx.backend.export_count(), 1);
}

#[test]
fn reload_falls_back_to_graph_inputs() {
    init_logging();
    let backend = Arc::new(RecordingBackend::default());
    let assets = Arc::new(ManualAssets::default());
    let graph = CanvasDataNode::new(vec![
        GraphInput::linked("bg_image", LoadImageNode::with_file("FunCodeCanvas/bg.png")),
        GraphInput::linked("overlay2", LoadImageNode::with_file("cat.png")),
    ]);
    let editor = CanvasEditor::new(
        None,
        EditorConfig::default(),
        Box::new(RasterSurface::new(512, 512, SurfaceStyle::default())),
        services(&backend, &assets).with_graph(Arc::new(graph)),
    );

    block_on(editor.trigger_reload());

    assert_eq!(ids(&editor), vec![2]);
    assert!(editor.with_registry(|r| r.background().is_some()));
    assert_eq!(
        assets.requests.lock()[0],
        "/view?filename=bg.png&type=input&subfolder=FunCodeCanvas"
    );
    // Unbound editors never export
    assert_eq!(backend.export_count(), 0);
}

#[test]
fn instances_route_pushes_by_node() {
    let fx = fixture("7");
    let instances = EditorInstances::new();
    assert!(instances.attach(fx.editor.clone()).is_none());

    let body = r#"{"node_id": 7, "canvas_data": {"layers": [{"id": 1, "image": "a.png"}]}}"#;
    block_on(instances.dispatch_json(body)).unwrap();
    assert_eq!(ids(&fx.editor), vec![1]);

    let stray = r#"{"node_id": "9", "canvas_data": null}"#;
    let result = block_on(instances.dispatch_json(stray));
    assert!(matches!(result, Err(CanvasError::IdentityMismatch(_))));

    assert!(instances.detach(&NodeId::from("7")).is_some());
    assert!(instances.is_empty());
    assert!(block_on(instances.dispatch_json(body)).is_err());
    assert!(matches!(
        block_on(instances.dispatch_json("not json")),
        Err(CanvasError::Payload(_))
    ));
}
