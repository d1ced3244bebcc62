//! Scene graph and hierarchical scene organization.
//!
//! A [`Model`] is a named node that may own a mesh and a style, carries a
//! [`Transform`], holds its children strongly and its parent weakly. Nodes are
//! only ever handed out as `Arc<Model>`, so every relationship update goes
//! through shared handles and interior locks.

use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use anyhow::bail;
use cgmath::{Matrix4, SquareMatrix};

use crate::{
    data_structures::{material::Style, mesh::Mesh, transform::Transform},
    render::RenderBackend,
};

static STRUCTURE_EDIT: Mutex<()> = Mutex::new(());

#[derive(Debug)]
pub struct Model {
    id: RwLock<String>,
    mesh: Option<Arc<Mesh>>,
    style: RwLock<Option<Style>>,
    transform: Mutex<Transform>,
    parent: RwLock<Weak<Model>>,
    children: RwLock<Vec<Arc<Model>>>,
}

impl Model {
    /**
     * Creates a node and, if `parent` is given, appends it to the parent's
     * children. This is the only way to obtain a `Model`.
     */
    pub fn create(
        parent: Option<&Arc<Model>>,
        id: impl Into<String>,
        mesh: Option<Arc<Mesh>>,
        style: Option<Style>,
    ) -> Arc<Model> {
        let model = Arc::new(Model {
            id: RwLock::new(id.into()),
            mesh,
            style: RwLock::new(style),
            transform: Mutex::new(Transform::default()),
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
        });
        if let Some(parent) = parent {
            *model.parent.write().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(parent);
            parent
                .children
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(model.clone());
        }
        model
    }

    pub fn id(&self) -> String {
        self.id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        *self.id.write().unwrap_or_else(PoisonError::into_inner) = id.into();
    }

    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    pub fn style(&self) -> Option<Style> {
        self.style.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_style(&self, style: Option<Style>) {
        *self.style.write().unwrap_or_else(PoisonError::into_inner) = style;
    }

    pub fn transform(&self) -> Transform {
        self.transform.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_transform(&self, transform: Transform) {
        *self.transform.lock().unwrap_or_else(PoisonError::into_inner) = transform;
    }

    /// Mutates the transform in place, keeping its cached matrix.
    pub fn with_transform<R>(&self, f: impl FnOnce(&mut Transform) -> R) -> R {
        f(&mut self.transform.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn parent(&self) -> Option<Arc<Model>> {
        self.parent.read().unwrap_or_else(PoisonError::into_inner).upgrade()
    }

    pub fn children(&self) -> Vec<Arc<Model>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn child_count(&self) -> usize {
        self.children.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /**
     * Moves this node under `new_parent` (or detaches it for `None`).
     *
     * The node is removed from its old parent's children by identity before it
     * is appended to the new parent's children. Re-parenting to the current
     * parent changes nothing. Making a node its own ancestor is an error.
     *
     * The old parent is read from the held parent guard, so concurrent moves of
     * the same node serialize and each one detaches from the parent the
     * previous move attached it to.
     */
    pub fn set_parent(self: &Arc<Self>, new_parent: Option<&Arc<Model>>) -> anyhow::Result<()> {
        // Ancestor walks read other nodes' parent locks; one structural edit at a time.
        let _edit = STRUCTURE_EDIT.lock().unwrap_or_else(PoisonError::into_inner);
        let mut parent_ref = self.parent.write().unwrap_or_else(PoisonError::into_inner);
        let old_parent = parent_ref.upgrade();
        match (&old_parent, new_parent) {
            (None, None) => return Ok(()),
            (Some(old), Some(new)) if Arc::ptr_eq(old, new) => return Ok(()),
            _ => {}
        }

        if let Some(new_parent) = new_parent {
            let mut ancestor = Some(new_parent.clone());
            while let Some(node) = ancestor {
                if Arc::ptr_eq(&node, self) {
                    bail!(
                        "cannot attach {} below {}: it would become its own ancestor",
                        self.id(),
                        new_parent.id()
                    );
                }
                ancestor = node.parent();
            }
        }

        if let Some(old_parent) = &old_parent {
            old_parent
                .children
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|child| !Arc::ptr_eq(child, self));
        }
        match new_parent {
            Some(new_parent) => {
                new_parent
                    .children
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(self.clone());
                *parent_ref = Arc::downgrade(new_parent);
            }
            None => *parent_ref = Weak::new(),
        }
        Ok(())
    }

    /// Depth-first pre-order search below this node; the first match wins.
    pub fn find_child_by_id(&self, id: &str) -> Option<Arc<Model>> {
        for child in self.children() {
            if child.id() == id {
                return Some(child);
            }
            if let Some(found) = child.find_child_by_id(id) {
                return Some(found);
            }
        }
        None
    }

    /// The current matrix of this node composed with all of its ancestors.
    pub fn world_matrix(&self) -> Matrix4<f32> {
        let local = self.with_transform(|transform| transform.matrix());
        match self.parent() {
            Some(parent) => parent.world_matrix() * local,
            None => local,
        }
    }

    /**
     * Draws this node if it owns a mesh, then all children in order.
     *
     * The parent's matrix is fetched afresh on every call. Nodes without a
     * mesh draw nothing themselves but still recurse.
     */
    pub fn draw(&self, backend: &mut dyn RenderBackend) {
        if let Some(mesh) = &self.mesh {
            match self.style() {
                Some(style) => {
                    backend.use_shader(&style.shader);
                    let parent = self
                        .parent()
                        .map(|parent| parent.world_matrix())
                        .unwrap_or_else(Matrix4::identity);
                    self.with_transform(|transform| transform.send(&parent, backend));
                    style.material.send(backend);
                    backend.draw_elements(mesh);
                }
                None => log::warn!("model {} has a mesh but no style; skipping draw", self.id()),
            }
        }

        for child in self.children() {
            child.draw(backend);
        }
    }
}
