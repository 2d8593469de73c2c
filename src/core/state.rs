//! Purpose: Track placed objects, the single selection, and the HUD placement slot.
//! Exports: `PlacementState`, `PlacedObject`, `LoadState`, `SessionState`, `Signal`.
//! Role: Pure state owned by the bridge actor; every mutation returns the signals it implies.
//! Invariants: A selected id always refers to an object present in the set.
//! Invariants: At most one object is selected and at most one is in placement.
//! Invariants: Transitions are idempotent; repeating one yields no signals.

use std::collections::BTreeMap;

use super::vec3::Vec3;

/// Numeric object id assigned by the AR engine.
pub type ObjectId = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    NotRequested,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
    Paused,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedObject {
    pub id: ObjectId,
    pub catalog_item_id: String,
    pub load_state: LoadState,
    pub position: Option<Vec3>,
}

impl PlacedObject {
    pub fn new(id: ObjectId, catalog_item_id: impl Into<String>) -> Self {
        Self {
            id,
            catalog_item_id: catalog_item_id.into(),
            load_state: LoadState::NotRequested,
            position: None,
        }
    }

    pub fn with_position(mut self, position: Option<Vec3>) -> Self {
        self.position = position;
        self
    }
}

/// Observable consequence of a state transition, in delivery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    Added {
        id: ObjectId,
        component_id: String,
    },
    Selected {
        id: ObjectId,
        component_id: String,
    },
    Deselected {
        id: ObjectId,
        component_id: String,
    },
    Removed {
        id: ObjectId,
        component_id: String,
    },
}

#[derive(Debug, Default)]
pub struct PlacementState {
    objects: BTreeMap<ObjectId, PlacedObject>,
    selected: Option<ObjectId>,
    placing: Option<ObjectId>,
}

impl PlacementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn selected(&self) -> Option<&PlacedObject> {
        self.selected.and_then(|id| self.objects.get(&id))
    }

    pub fn placing(&self) -> Option<&PlacedObject> {
        self.placing.and_then(|id| self.objects.get(&id))
    }

    /// Records a requested object as loading and moves it into the placement slot.
    ///
    /// A newer staging takes the slot over; the previous object keeps loading
    /// and commits without it.
    pub fn stage(&mut self, mut object: PlacedObject) {
        object.load_state = LoadState::Loading;
        self.placing = Some(object.id);
        self.objects.insert(object.id, object);
    }

    /// Marks a staged object loaded, announces it, and selects it.
    pub fn commit(&mut self, id: ObjectId) -> Vec<Signal> {
        let Some(object) = self.objects.get_mut(&id) else {
            return Vec::new();
        };
        if object.load_state == LoadState::Loaded {
            return Vec::new();
        }
        object.load_state = LoadState::Loaded;
        let mut signals = vec![Signal::Added {
            id,
            component_id: object.catalog_item_id.clone(),
        }];
        if self.placing == Some(id) {
            self.placing = None;
        }
        signals.extend(self.select(id));
        signals
    }

    /// Drops a staged object whose load failed. Never announced, so never signalled.
    pub fn cancel(&mut self, id: ObjectId, reason: impl Into<String>) -> Option<PlacedObject> {
        if self.placing == Some(id) {
            self.placing = None;
        }
        let mut object = self.objects.remove(&id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        object.load_state = LoadState::Failed(reason.into());
        Some(object)
    }

    /// Inserts an object the engine created on its own. Known ids are ignored.
    pub fn adopt(&mut self, mut object: PlacedObject) -> Vec<Signal> {
        if self.objects.contains_key(&object.id) {
            return Vec::new();
        }
        object.load_state = LoadState::Loaded;
        let signal = Signal::Added {
            id: object.id,
            component_id: object.catalog_item_id.clone(),
        };
        self.objects.insert(object.id, object);
        vec![signal]
    }

    /// Exclusive selection: deselection of the previous object comes first.
    pub fn select(&mut self, id: ObjectId) -> Vec<Signal> {
        if self.selected == Some(id) {
            return Vec::new();
        }
        let Some(object) = self.objects.get(&id) else {
            return Vec::new();
        };
        if object.load_state != LoadState::Loaded {
            return Vec::new();
        }
        let component_id = object.catalog_item_id.clone();
        let mut signals = self.reset_selection();
        self.selected = Some(id);
        signals.push(Signal::Selected { id, component_id });
        signals
    }

    pub fn deselect(&mut self, id: ObjectId) -> Vec<Signal> {
        if self.selected != Some(id) {
            return Vec::new();
        }
        self.reset_selection()
    }

    pub fn reset_selection(&mut self) -> Vec<Signal> {
        let Some(previous) = self.selected.take() else {
            return Vec::new();
        };
        match self.objects.get(&previous) {
            Some(object) => vec![Signal::Deselected {
                id: previous,
                component_id: object.catalog_item_id.clone(),
            }],
            None => Vec::new(),
        }
    }

    /// Removes an object; a selected one is deselected first.
    ///
    /// Objects still loading were never announced and vanish without signals.
    pub fn remove(&mut self, id: ObjectId) -> Vec<Signal> {
        if !self.objects.contains_key(&id) {
            return Vec::new();
        }
        let mut signals = self.deselect(id);
        if self.placing == Some(id) {
            self.placing = None;
        }
        match self.objects.remove(&id) {
            Some(object) if object.load_state == LoadState::Loaded => {
                signals.push(Signal::Removed {
                    id,
                    component_id: object.catalog_item_id,
                });
            }
            _ => {}
        }
        signals
    }

    /// Drops everything without signals; used on teardown.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.selected = None;
        self.placing = None;
    }
}
