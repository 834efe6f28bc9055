//! Named shader parameters a displacement provider publishes for GPU shading.

use std::sync::Arc;

use rustc_hash::FxHashMap;

/// RGBA8 texture, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        let i = ((x + y * self.width) * 4) as usize;
        self.rgba[i..i + 4].copy_from_slice(&pixel);
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((x + y * self.width) * 4) as usize;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialValue {
    Float(f32),
    Int(i32),
    Texture(Arc<TextureData>),
}

/// Parameter block handed to the renderer's terrain material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialParams {
    values: FxHashMap<String, MaterialValue>,
}

impl MaterialParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.values.insert(name.to_owned(), MaterialValue::Float(value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.values.insert(name.to_owned(), MaterialValue::Int(value));
    }

    pub fn set_texture(&mut self, name: &str, texture: Arc<TextureData>) {
        self.values
            .insert(name.to_owned(), MaterialValue::Texture(texture));
    }

    pub fn get(&self, name: &str) -> Option<&MaterialValue> {
        self.values.get(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.values.get(name) {
            Some(MaterialValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.values.get(name) {
            Some(MaterialValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<&Arc<TextureData>> {
        match self.values.get(name) {
            Some(MaterialValue::Texture(t)) => Some(t),
            _ => None,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<MaterialValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
