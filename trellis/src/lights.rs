use fxhash::FxHashMap;
use log::{debug, info};

use crate::{
    FrameReport, LightPrim, LightType, PrimPath, Renderer, RendererError,
    SceneDelegate, SyncConfig, SyncError,
};

/// Registry of light primitives, together with the default light that keeps
/// the renderer's scene lit until the first real light shows up.
#[derive(Debug, Default)]
pub struct Lights {
    lights: FxHashMap<PrimPath, LightPrim>,
    removed: Vec<PrimPath>,
    default_light: bool,
}

impl Lights {
    pub fn insert(&mut self, id: PrimPath, light_type: LightType) {
        if self.lights.contains_key(&id) {
            debug!("Light {id} is already known; ignoring its re-insertion");
            return;
        }

        self.removed.retain(|removed| *removed != id);
        self.lights.insert(id.clone(), LightPrim::new(id, light_type));
    }

    pub fn remove(&mut self, id: &PrimPath) -> bool {
        let Some(light) = self.lights.remove(id) else {
            return false;
        };

        if light.is_committed() {
            self.removed.push(light.id().clone());
        }

        true
    }

    pub fn get(&self, id: &PrimPath) -> Option<&LightPrim> {
        self.lights.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LightPrim> + '_ {
        self.lights.values()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Whether the default light currently lives on the renderer's side.
    pub fn has_default_light(&self) -> bool {
        self.default_light
    }

    pub fn sync<D>(&mut self, delegate: &D) -> Vec<SyncError>
    where
        D: SceneDelegate + ?Sized,
    {
        let mut lights: Vec<_> = self.lights.values_mut().collect();

        lights.sort_by(|a, b| a.id().cmp(b.id()));

        lights
            .into_iter()
            .flat_map(|light| light.pull(delegate))
            .collect()
    }

    /// Creates the default light, unless it already exists.
    pub fn bootstrap<R>(
        &mut self,
        renderer: &mut R,
        config: &SyncConfig,
    ) -> Result<(), RendererError>
    where
        R: Renderer + ?Sized,
    {
        if self.default_light {
            return Ok(());
        }

        let default = &config.default_light;

        renderer.create_light(&default.name, &default.light)?;
        self.default_light = true;

        info!(
            "Created default light {}: {}",
            default.name,
            default.light.describe()
        );

        Ok(())
    }

    /// Applies pending light changes; must be called within an edit
    /// transaction.
    ///
    /// Each light gets created exactly once, on the first commit after its
    /// first pull. The default light is deleted as soon as any real light
    /// exists, and brought back once the last one is gone.
    pub fn commit<R>(
        &mut self,
        renderer: &mut R,
        config: &SyncConfig,
        report: &mut FrameReport,
    ) -> Result<(), RendererError>
    where
        R: Renderer + ?Sized,
    {
        while let Some(id) = self.removed.last() {
            renderer.delete_light(id.as_str())?;
            info!("Deleted light {id}");

            self.removed.pop();
            report.lights_deleted += 1;
        }

        let mut pending: Vec<_> = self
            .lights
            .values_mut()
            .filter(|light| light.is_synced() && !light.is_committed())
            .collect();

        pending.sort_by(|a, b| a.id().cmp(b.id()));

        for light in pending {
            let desc = light.desc();

            renderer.create_light(light.id().as_str(), &desc)?;
            light.mark_committed();

            info!("Created light {}: {}", light.id(), desc.describe());

            report.lights_created += 1;
        }

        let lit = self.lights.values().any(LightPrim::is_committed);

        if lit && self.default_light {
            renderer.delete_light(&config.default_light.name)?;
            self.default_light = false;

            info!("Deleted default light {}", config.default_light.name);

            report.lights_deleted += 1;
        } else if !lit && !self.default_light {
            self.bootstrap(renderer, config)?;
            report.lights_created += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::delegate::mock::MockScene;
    use crate::renderer::mock::{Call, MockRenderer};
    use crate::DirtyBits;

    fn renderer() -> MockRenderer {
        MockRenderer {
            editing: true,
            ..Default::default()
        }
    }

    #[test]
    fn lights_are_created_once() {
        let mut scene = MockScene::default();
        let key = scene.add_light("/key", Mat4::from_translation(Vec3::Z));
        let fill = scene.add_light("/fill", Mat4::IDENTITY);

        let mut lights = Lights::default();
        let mut renderer = renderer();
        let mut report = FrameReport::default();
        let config = SyncConfig::default();

        lights.insert(key.clone(), LightType::Sphere);
        lights.insert(fill, LightType::Disk);

        assert!(lights.sync(&scene).is_empty());

        lights.commit(&mut renderer, &config, &mut report).unwrap();

        assert_eq!(
            vec![
                Call::CreateLight("/fill".into()),
                Call::CreateLight("/key".into()),
            ],
            renderer.take_calls()
        );

        assert_eq!(2, report.lights_created);

        // Edits are pulled, but not re-applied
        scene.lights.get_mut(&key).unwrap().0 = Mat4::IDENTITY;
        scene.mark(&key, DirtyBits::TRANSFORM);

        lights.sync(&scene);
        lights.commit(&mut renderer, &config, &mut report).unwrap();

        assert!(renderer.calls.is_empty());
        assert_eq!(Mat4::IDENTITY, lights.get(&key).unwrap().transform());
        assert!(scene.violations().is_empty());
    }

    #[test]
    fn default_light() {
        let mut scene = MockScene::default();
        let mut lights = Lights::default();
        let mut renderer = renderer();
        let mut report = FrameReport::default();
        let config = SyncConfig::default();

        lights.bootstrap(&mut renderer, &config).unwrap();
        lights.bootstrap(&mut renderer, &config).unwrap();

        assert!(lights.has_default_light());

        assert_eq!(
            vec![Call::CreateLight("default_light".into())],
            renderer.take_calls()
        );

        // First real light replaces the default one
        let key = scene.add_light("/key", Mat4::IDENTITY);

        lights.insert(key.clone(), LightType::Sphere);
        lights.sync(&scene);
        lights.commit(&mut renderer, &config, &mut report).unwrap();

        assert!(!lights.has_default_light());

        assert_eq!(
            vec![
                Call::CreateLight("/key".into()),
                Call::DeleteLight("default_light".into()),
            ],
            renderer.take_calls()
        );

        // ... and the default light comes back after the last one is gone
        assert!(lights.remove(&key));

        lights.commit(&mut renderer, &config, &mut report).unwrap();

        assert!(lights.has_default_light());

        assert_eq!(
            vec![
                Call::DeleteLight("/key".into()),
                Call::CreateLight("default_light".into()),
            ],
            renderer.take_calls()
        );
    }

    #[test]
    fn removing_uncommitted_light() {
        let mut lights = Lights::default();
        let mut renderer = renderer();
        let mut report = FrameReport::default();
        let config = SyncConfig::default();
        let id = PrimPath::new("/key");

        lights.bootstrap(&mut renderer, &config).unwrap();
        renderer.take_calls();

        lights.insert(id.clone(), LightType::Sphere);

        assert!(lights.remove(&id));
        assert!(!lights.remove(&id));

        lights.commit(&mut renderer, &config, &mut report).unwrap();

        assert!(renderer.calls.is_empty());
        assert_eq!(0, report.lights_deleted);
    }

    #[test]
    fn failed_creation_is_retried() {
        let mut scene = MockScene::default();
        let key = scene.add_light("/key", Mat4::IDENTITY);
        let mut lights = Lights::default();
        let mut renderer = renderer();
        let mut report = FrameReport::default();
        let config = SyncConfig::default();

        lights.insert(key.clone(), LightType::Sphere);
        lights.sync(&scene);

        renderer.editing = false;

        assert_eq!(
            Err(RendererError::NotEditing),
            lights.commit(&mut renderer, &config, &mut report)
        );

        assert!(!lights.get(&key).unwrap().is_committed());

        renderer.editing = true;

        lights.commit(&mut renderer, &config, &mut report).unwrap();

        assert!(lights.get(&key).unwrap().is_committed());
        assert_eq!(1, renderer.lights.len());
    }
}
