//! Tag-keyed factories for the things an editor can create.
//!
//! Menus list the registered tags and create values through the registry,
//! so adding a node kind means registering one more constructor.

use std::collections::BTreeMap;
use std::fmt;

use crate::scene::{ControlKind, EmitterShape, LightKind, NodeKind};

type Factory<V> = Box<dyn Fn() -> V + Send + Sync>;

struct Entry<V> {
    label: &'static str,
    factory: Factory<V>,
}

/// Maps a tag to a labelled constructor.
pub struct FactoryRegistry<K, V> {
    entries: BTreeMap<K, Entry<V>>,
}

impl<K: Ord + Copy + fmt::Debug, V> FactoryRegistry<K, V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers a constructor, replacing any previous one for `tag`.
    pub fn register<F>(&mut self, tag: K, label: &'static str, factory: F)
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        if self
            .entries
            .insert(
                tag,
                Entry {
                    label,
                    factory: Box::new(factory),
                },
            )
            .is_some()
        {
            log::debug!("Replaced factory for {tag:?}");
        }
    }

    pub fn create(&self, tag: K) -> Option<V> {
        self.entries.get(&tag).map(|entry| (entry.factory)())
    }

    pub fn label(&self, tag: K) -> Option<&'static str> {
        self.entries.get(&tag).map(|entry| entry.label)
    }

    pub fn contains(&self, tag: K) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Registered tags in tag order.
    pub fn tags(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Ord + Copy + fmt::Debug, V> Default for FactoryRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V> fmt::Debug for FactoryRegistry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, e)| (k, e.label)))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKindTag {
    Node,
    Geometry,
    DirectionalLight,
    PointLight,
    SpotLight,
    Camera,
    ParticleEmitter,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlKindTag {
    Rotation,
    Billboard,
    Animation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmitterShapeTag {
    Point,
    Box,
    Sphere,
}

pub fn default_node_kinds() -> FactoryRegistry<NodeKindTag, NodeKind> {
    let mut registry = FactoryRegistry::new();
    registry.register(NodeKindTag::Node, "Node", || NodeKind::Node);
    registry.register(NodeKindTag::Geometry, "Geometry", || NodeKind::Geometry {
        mesh: "cube".into(),
    });
    registry.register(NodeKindTag::DirectionalLight, "Directional Light", || {
        NodeKind::Light {
            light: LightKind::Directional,
            intensity: 1.0,
        }
    });
    registry.register(NodeKindTag::PointLight, "Point Light", || NodeKind::Light {
        light: LightKind::Point,
        intensity: 1.0,
    });
    registry.register(NodeKindTag::SpotLight, "Spot Light", || NodeKind::Light {
        light: LightKind::Spot,
        intensity: 1.0,
    });
    registry.register(NodeKindTag::Camera, "Camera", || NodeKind::Camera {
        fov_degrees: 45.0,
    });
    registry.register(NodeKindTag::ParticleEmitter, "Particle Emitter", || {
        NodeKind::ParticleEmitter {
            shape: EmitterShape::Point,
            max_particles: 100,
        }
    });
    registry.register(NodeKindTag::Audio, "Audio", || NodeKind::Audio {
        source: String::new(),
        volume: 1.0,
    });
    registry
}

pub fn default_controls() -> FactoryRegistry<ControlKindTag, ControlKind> {
    let mut registry = FactoryRegistry::new();
    registry.register(ControlKindTag::Rotation, "Rotation", || ControlKind::Rotation {
        degrees_per_second: 45.0,
    });
    registry.register(ControlKindTag::Billboard, "Billboard", || ControlKind::Billboard);
    registry.register(ControlKindTag::Animation, "Animation", || ControlKind::Animation {
        clip: "idle".into(),
        looping: true,
    });
    registry
}

pub fn default_emitter_shapes() -> FactoryRegistry<EmitterShapeTag, EmitterShape> {
    let mut registry = FactoryRegistry::new();
    registry.register(EmitterShapeTag::Point, "Point", || EmitterShape::Point);
    registry.register(EmitterShapeTag::Box, "Box", || EmitterShape::Box {
        extents: [1.0; 3],
    });
    registry.register(EmitterShapeTag::Sphere, "Sphere", || EmitterShape::Sphere {
        radius: 1.0,
    });
    registry
}

/// The registries an editor session creates things from.
#[derive(Debug)]
pub struct Registries {
    pub node_kinds: FactoryRegistry<NodeKindTag, NodeKind>,
    pub controls: FactoryRegistry<ControlKindTag, ControlKind>,
    pub emitter_shapes: FactoryRegistry<EmitterShapeTag, EmitterShape>,
}

impl Registries {
    /// Builds a particle emitter kind with the registered shape.
    pub fn emitter(&self, shape: EmitterShapeTag, max_particles: u32) -> Option<NodeKind> {
        self.emitter_shapes
            .create(shape)
            .map(|shape| NodeKind::ParticleEmitter {
                shape,
                max_particles,
            })
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self {
            node_kinds: default_node_kinds(),
            controls: default_controls(),
            emitter_shapes: default_emitter_shapes(),
        }
    }
}
