//! Shaders, materials and the style that bundles them for a model.

use std::sync::{Arc, Mutex, PoisonError};

use image::RgbaImage;

use crate::render::{RenderBackend, TextureDesc, TextureFormat, TextureHandle, TextureUnit, Uniform};

/// Material diffuse maps always live on this unit.
pub const DIFFUSE_UNIT: TextureUnit = TextureUnit(0);

/// A shader program, identified by name. Compilation is the backend's business.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shader {
    pub name: String,
}

impl Shader {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Default)]
pub struct Material {
    pub name: String,
    pub uniforms: Vec<(String, Uniform)>,
    diffuse: Option<Arc<RgbaImage>>,
    diffuse_texture: Mutex<Option<TextureHandle>>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_uniform(mut self, name: &str, value: Uniform) -> Self {
        self.uniforms.push((name.to_string(), value));
        self
    }

    pub fn with_diffuse(mut self, image: Arc<RgbaImage>) -> Self {
        self.diffuse = Some(image);
        self
    }

    pub fn diffuse(&self) -> Option<&Arc<RgbaImage>> {
        self.diffuse.as_ref()
    }

    pub fn send(&self, backend: &mut dyn RenderBackend) {
        for (name, value) in &self.uniforms {
            backend.set_uniform(name, *value);
        }

        let Some(image) = &self.diffuse else {
            return;
        };
        let mut texture = self
            .diffuse_texture
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if texture.is_none() {
            let desc = TextureDesc {
                label: format!("{} diffuse", self.name),
                width: image.width(),
                height: image.height(),
                format: TextureFormat::Rgba8,
                data: image.as_raw().clone(),
            };
            match backend.create_texture(&desc) {
                Ok(handle) => *texture = Some(handle),
                Err(e) => {
                    log::error!("could not create diffuse texture for {}: {:#}", self.name, e);
                    return;
                }
            }
        }
        if let Some(handle) = *texture {
            backend.bind_texture(DIFFUSE_UNIT, handle);
            backend.set_uniform("material.diffuse", DIFFUSE_UNIT.as_uniform());
        }
    }
}

/// What a model is drawn with.
#[derive(Clone, Debug)]
pub struct Style {
    pub shader: Arc<Shader>,
    pub material: Arc<Material>,
}

impl Style {
    pub fn new(shader: Arc<Shader>, material: Arc<Material>) -> Self {
        Self { shader, material }
    }
}
