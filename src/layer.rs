//! Layers and the layer stack
//!
//! Regular layers live in the lower part of the stack, overlays above them.
//! Updates walk the stack bottom to top; events walk it top to bottom and
//! stop at the first layer that marks them handled.

use crate::application::{Graphics, Timestep};
use crate::error::EngineResult;
use crate::events::Event;

/// A unit of per-frame logic owned by the [`LayerStack`]
pub trait Layer {
    fn name(&self) -> &str;

    fn on_attach(&mut self, _graphics: &mut Graphics) -> EngineResult<()> {
        Ok(())
    }

    fn on_detach(&mut self) {}

    fn on_update(&mut self, _graphics: &mut Graphics, _timestep: Timestep) -> EngineResult<()> {
        Ok(())
    }

    /// Per-frame GUI hook, called after every layer has been updated
    fn on_gui_render(&mut self) {}

    fn on_event(&mut self, _event: &mut Event) {}
}

/// Ordered layers followed by overlays
#[derive(Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn Layer>>,
    layer_insert_index: usize,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a regular layer above the existing ones, below every overlay
    pub fn push_layer(&mut self, layer: Box<dyn Layer>) {
        self.layers.insert(self.layer_insert_index, layer);
        self.layer_insert_index += 1;
    }

    /// Insert an overlay on top of the stack
    pub fn push_overlay(&mut self, overlay: Box<dyn Layer>) {
        self.layers.push(overlay);
    }

    /// Remove the topmost regular layer named `name`
    pub fn pop_layer(&mut self, name: &str) -> Option<Box<dyn Layer>> {
        let index = self.layers[..self.layer_insert_index]
            .iter()
            .rposition(|l| l.name() == name)?;
        self.layer_insert_index -= 1;
        Some(self.layers.remove(index))
    }

    /// Remove the topmost overlay named `name`
    pub fn pop_overlay(&mut self, name: &str) -> Option<Box<dyn Layer>> {
        let index = self.layers[self.layer_insert_index..]
            .iter()
            .rposition(|l| l.name() == name)?;
        Some(self.layers.remove(self.layer_insert_index + index))
    }

    /// Layers in update order: regular layers, then overlays
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &dyn Layer> {
        self.layers.iter().map(|l| l.as_ref())
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Box<dyn Layer>> {
        self.layers.iter_mut()
    }

    /// Offer `event` to each layer from the top down until one handles it
    pub fn dispatch(&mut self, event: &mut Event) {
        for layer in self.layers.iter_mut().rev() {
            if event.handled {
                break;
            }
            layer.on_event(event);
        }
    }

    /// Remove every layer, top first
    pub fn drain(&mut self) -> Vec<Box<dyn Layer>> {
        self.layer_insert_index = 0;
        let mut layers: Vec<_> = self.layers.drain(..).collect();
        layers.reverse();
        layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
