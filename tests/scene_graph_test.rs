use std::sync::Arc;

use cgmath::{Matrix4, One, Quaternion, Vector2, Vector3};
use lot_ngin::{
    data_structures::{
        material::{Material, Shader, Style},
        mesh::{Mesh, TexturedVertex},
        scene_graph::Model,
        transform::Transform,
    },
    render::Uniform,
};

use crate::common::test_utils::{RecordingBackend, init_logger};

mod common;

fn triangle(name: &str) -> Arc<Mesh> {
    let normal = Vector3::new(0.0, 0.0, 1.0);
    let vertices = vec![
        TexturedVertex::new(Vector3::new(0.0, 0.0, 0.0), normal, Vector2::new(0.0, 0.0)),
        TexturedVertex::new(Vector3::new(1.0, 0.0, 0.0), normal, Vector2::new(1.0, 0.0)),
        TexturedVertex::new(Vector3::new(0.0, 1.0, 0.0), normal, Vector2::new(0.0, 1.0)),
    ];
    Arc::new(Mesh::new(name, vertices, vec![0, 1, 2]))
}

fn style() -> Style {
    Style::new(Arc::new(Shader::new("lit")), Arc::new(Material::new("plain")))
}

fn translated(x: f32, y: f32, z: f32) -> Transform {
    Transform::new(Vector3::new(x, y, z), Vector3::new(1.0, 1.0, 1.0), Quaternion::one())
}

#[test]
fn should_attach_child_on_create() {
    let root = Model::create(None, "root", None, None);
    let child = Model::create(Some(&root), "child", None, None);

    assert_eq!(root.child_count(), 1);
    assert!(Arc::ptr_eq(&child.parent().unwrap(), &root));
    assert!(root.parent().is_none());
}

#[test]
fn should_not_duplicate_child_when_reparenting_to_same_parent() {
    let root = Model::create(None, "root", None, None);
    let child = Model::create(Some(&root), "child", None, None);

    child.set_parent(Some(&root)).unwrap();
    child.set_parent(Some(&root)).unwrap();

    assert_eq!(root.child_count(), 1);
}

#[test]
fn should_move_child_between_parents() {
    let a = Model::create(None, "a", None, None);
    let b = Model::create(None, "b", None, None);
    let child = Model::create(Some(&a), "child", None, None);

    child.set_parent(Some(&b)).unwrap();

    assert_eq!(a.child_count(), 0);
    assert_eq!(b.child_count(), 1);
    assert!(Arc::ptr_eq(&child.parent().unwrap(), &b));

    child.set_parent(None).unwrap();
    assert_eq!(b.child_count(), 0);
    assert!(child.parent().is_none());
}

#[test]
fn should_reject_cycles() {
    let root = Model::create(None, "root", None, None);
    let child = Model::create(Some(&root), "child", None, None);
    let grandchild = Model::create(Some(&child), "grandchild", None, None);

    assert!(root.set_parent(Some(&grandchild)).is_err());
    assert!(root.set_parent(Some(&root)).is_err());

    assert!(root.parent().is_none());
    assert_eq!(grandchild.child_count(), 0);
}

#[test]
fn should_keep_single_parent_under_concurrent_reparenting() {
    let containing = |parents: &[&Arc<Model>], node: &Arc<Model>| {
        parents
            .iter()
            .filter(|parent| parent.children().iter().any(|child| Arc::ptr_eq(child, node)))
            .count()
    };

    for _ in 0..2_000 {
        let p1 = Model::create(None, "p1", None, None);
        let p2 = Model::create(None, "p2", None, None);
        let p3 = Model::create(None, "p3", None, None);
        let node = Model::create(Some(&p1), "node", None, None);
        let barrier = Arc::new(std::sync::Barrier::new(2));

        let movers = [p2.clone(), p3.clone()].map(|target| {
            let node = node.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                node.set_parent(Some(&target)).unwrap();
            })
        });
        for mover in movers {
            mover.join().unwrap();
        }

        let parents = [&p1, &p2, &p3];
        assert_eq!(containing(&parents, &node), 1);
        let parent = node.parent().unwrap();
        assert!(parent.children().iter().any(|child| Arc::ptr_eq(child, &node)));
        assert_eq!(p1.child_count(), 0);
    }
}

#[test]
fn should_find_first_match_in_pre_order() {
    let root = Model::create(None, "root", None, None);
    let left = Model::create(Some(&root), "left", None, None);
    let deep = Model::create(Some(&left), "target", None, None);
    let _shallow = Model::create(Some(&root), "target", None, None);

    let found = root.find_child_by_id("target").unwrap();
    assert!(Arc::ptr_eq(&found, &deep));
    assert!(root.find_child_by_id("root").is_none());
    assert!(root.find_child_by_id("missing").is_none());
}

#[test]
fn should_draw_through_nodes_without_mesh() {
    init_logger();
    let root = Model::create(None, "rig", None, None);
    let group = Model::create(Some(&root), "group", None, None);
    Model::create(Some(&group), "first", Some(triangle("first")), Some(style()));
    Model::create(Some(&root), "second", Some(triangle("second")), Some(style()));
    Model::create(Some(&root), "unstyled", Some(triangle("unstyled")), None);

    let mut backend = RecordingBackend::new();
    root.draw(&mut backend);

    let meshes = backend.draws.iter().map(|d| d.mesh.as_str()).collect::<Vec<_>>();
    assert_eq!(meshes, vec!["first", "second"]);
    assert!(backend.draws.iter().all(|d| d.shader.as_deref() == Some("lit")));
}

#[test]
fn should_send_model_composed_with_parent() {
    let root = Model::create(None, "root", None, None);
    root.set_transform(translated(10.0, 0.0, 0.0));
    let child = Model::create(Some(&root), "child", Some(triangle("child")), Some(style()));
    child.set_transform(translated(0.0, 2.0, 0.0));

    let mut backend = RecordingBackend::new();
    root.draw(&mut backend);

    let expected = Matrix4::from_translation(Vector3::new(10.0, 2.0, 0.0));
    assert_eq!(backend.draws.len(), 1);
    assert_eq!(backend.draws[0].model, Some(expected));
    assert_eq!(backend.uniform("model"), Some(Uniform::Mat4(expected)));
}

#[test]
fn should_pick_up_parent_moves_between_draws() {
    let root = Model::create(None, "root", None, None);
    let child = Model::create(Some(&root), "child", Some(triangle("child")), Some(style()));

    let mut backend = RecordingBackend::new();
    root.draw(&mut backend);
    assert_eq!(backend.draws[0].model, Some(Matrix4::one()));

    root.with_transform(|t| t.set_position(Vector3::new(0.0, 0.0, 3.0)));
    backend.clear_log();
    root.draw(&mut backend);
    assert_eq!(
        backend.draws[0].model,
        Some(Matrix4::from_translation(Vector3::new(0.0, 0.0, 3.0)))
    );
    assert!(child.parent().is_some());
}

#[test]
fn should_bind_material_diffuse_once() {
    let image = Arc::new(image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255])));
    let material = Material::new("red").with_diffuse(image);
    let style = Style::new(Arc::new(Shader::new("lit")), Arc::new(material));
    let root = Model::create(None, "root", Some(triangle("a")), Some(style.clone()));
    Model::create(Some(&root), "b", Some(triangle("b")), Some(style));

    let mut backend = RecordingBackend::new();
    root.draw(&mut backend);
    root.draw(&mut backend);

    assert_eq!(backend.textures.len(), 1);
    let bound = backend.bound_to("material.diffuse").unwrap();
    assert_eq!((bound.width, bound.height), (2, 2));
}
