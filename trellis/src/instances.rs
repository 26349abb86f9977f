use std::ops::AddAssign;

use glam::Mat4;
use log::{debug, trace};

use crate::{PrimPath, Renderer, RendererError};

/// Renderer-side object instantiating a prototype mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceRecord {
    pub name: String,
    pub transform: Mat4,
    pub created: bool,
    pub visible: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstanceDiff {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl InstanceDiff {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for InstanceDiff {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.updated += rhs.updated;
        self.deleted += rhs.deleted;
    }
}

/// Objects created for a single prototype, indexed by their ordinal.
///
/// The set only ever records objects the renderer has confirmed, so the
/// number of created records always matches the number of live objects,
/// even if a batch of mutations gets interrupted halfway through.
#[derive(Clone, Debug, Default)]
pub struct InstanceSet {
    records: Vec<InstanceRecord>,
    material: Option<String>,
}

impl InstanceSet {
    /// Number of objects currently alive on the renderer's side.
    pub fn rendered(&self) -> usize {
        self.records.iter().filter(|record| record.created).count()
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    /// Brings renderer-side objects of `prototype` in line with
    /// `transforms` (one object per transform).
    ///
    /// When the object count and material didn't change, only transforms
    /// that actually differ are re-sent; identical input issues no calls at
    /// all.
    pub fn reconcile<R>(
        &mut self,
        renderer: &mut R,
        prototype: &PrimPath,
        transforms: &[Mat4],
        visible: bool,
        material: &str,
    ) -> Result<InstanceDiff, RendererError>
    where
        R: Renderer + ?Sized,
    {
        if !visible {
            return self.clear(renderer);
        }

        let rebind = self.material.as_deref() != Some(material);
        let mut diff = InstanceDiff::default();

        let resize = transforms.len() != self.rendered()
            || transforms.len() != self.records.len();

        if resize || rebind {
            trace!(
                "Re-instancing {prototype}: {} -> {} objects (rebind: {rebind})",
                self.rendered(),
                transforms.len(),
            );

            for (ordinal, transform) in transforms.iter().enumerate() {
                let name = prototype.instance_name(ordinal);

                renderer.create_or_update_object(&name, prototype, material)?;

                match self.records.get(ordinal) {
                    Some(record) if record.created => diff.updated += 1,
                    Some(_) => diff.created += 1,

                    None => {
                        self.records.push(InstanceRecord {
                            name: name.clone(),
                            transform: Mat4::IDENTITY,
                            created: false,
                            visible: true,
                        });

                        diff.created += 1;
                    }
                }

                let record = &mut self.records[ordinal];

                record.created = true;
                record.visible = true;

                renderer.set_object_transform(&name, transform)?;
                record.transform = *transform;
            }

            diff.deleted += self.destroy(renderer, transforms.len())?;
            self.material = Some(material.to_owned());
        } else {
            for (record, transform) in self.records.iter_mut().zip(transforms)
            {
                if record.transform != *transform {
                    renderer.set_object_transform(&record.name, transform)?;
                    record.transform = *transform;

                    diff.updated += 1;
                }
            }
        }

        Ok(diff)
    }

    /// Deletes all of the objects.
    pub fn clear<R>(
        &mut self,
        renderer: &mut R,
    ) -> Result<InstanceDiff, RendererError>
    where
        R: Renderer + ?Sized,
    {
        let deleted = self.destroy(renderer, 0)?;

        if deleted > 0 {
            debug!("Deleted {deleted} object(s)");
        }

        Ok(InstanceDiff {
            deleted,
            ..Default::default()
        })
    }

    /// Deletes objects with ordinals `from..`.
    fn destroy<R>(
        &mut self,
        renderer: &mut R,
        from: usize,
    ) -> Result<usize, RendererError>
    where
        R: Renderer + ?Sized,
    {
        let mut deleted = 0;

        for record in self.records.iter_mut().skip(from) {
            if !record.created {
                continue;
            }

            // Renderers may resurrect a deleted object's stale transform once
            // its name gets reused, so it's reset to the inverse first
            let reset = record.transform.inverse();

            renderer.set_object_transform(&record.name, &reset)?;

            renderer.delete_object(&record.name)?;

            record.created = false;
            record.visible = false;
            deleted += 1;
        }

        while self.records.last().is_some_and(|record| !record.created) {
            self.records.pop();
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::renderer::mock::{Call, MockRenderer};

    fn transforms(n: usize) -> Vec<Mat4> {
        (0..n)
            .map(|i| Mat4::from_translation(Vec3::X * i as f32))
            .collect()
    }

    fn renderer() -> MockRenderer {
        MockRenderer {
            editing: true,
            ..Default::default()
        }
    }

    #[test]
    fn create() {
        let mut renderer = renderer();
        let mut set = InstanceSet::default();
        let prototype = PrimPath::new("/tri");

        let diff = set
            .reconcile(&mut renderer, &prototype, &transforms(2), true, "mat")
            .unwrap();

        assert_eq!(
            InstanceDiff {
                created: 2,
                updated: 0,
                deleted: 0,
            },
            diff
        );

        assert_eq!(2, set.rendered());
        assert_eq!(2, renderer.objects.len());

        assert_eq!(
            vec![
                Call::CreateOrUpdateObject {
                    name: "/tri0".into(),
                    material: "mat".into(),
                },
                Call::SetObjectTransform {
                    name: "/tri0".into(),
                    transform: transforms(2)[0],
                },
                Call::CreateOrUpdateObject {
                    name: "/tri1".into(),
                    material: "mat".into(),
                },
                Call::SetObjectTransform {
                    name: "/tri1".into(),
                    transform: transforms(2)[1],
                },
            ],
            renderer.calls
        );
    }

    #[test]
    fn identical_input_is_a_noop() {
        let mut renderer = renderer();
        let mut set = InstanceSet::default();
        let prototype = PrimPath::new("/tri");

        set.reconcile(&mut renderer, &prototype, &transforms(3), true, "mat")
            .unwrap();

        renderer.take_calls();

        let diff = set
            .reconcile(&mut renderer, &prototype, &transforms(3), true, "mat")
            .unwrap();

        assert!(diff.is_empty());
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn moved_instances_are_updated_in_place() {
        let mut renderer = renderer();
        let mut set = InstanceSet::default();
        let prototype = PrimPath::new("/tri");

        set.reconcile(&mut renderer, &prototype, &transforms(2), true, "mat")
            .unwrap();

        renderer.take_calls();

        let mut moved = transforms(2);

        moved[1] = Mat4::from_scale(Vec3::splat(2.0));

        let diff = set
            .reconcile(&mut renderer, &prototype, &moved, true, "mat")
            .unwrap();

        assert_eq!(1, diff.updated);

        assert_eq!(
            vec![Call::SetObjectTransform {
                name: "/tri1".into(),
                transform: moved[1],
            }],
            renderer.calls
        );

        assert_eq!(moved[1], renderer.objects["/tri1"]);
    }

    #[test]
    fn shrinking() {
        let mut renderer = renderer();
        let mut set = InstanceSet::default();
        let prototype = PrimPath::new("/tri");

        set.reconcile(&mut renderer, &prototype, &transforms(3), true, "mat")
            .unwrap();

        renderer.take_calls();

        let diff = set
            .reconcile(&mut renderer, &prototype, &transforms(1), true, "mat")
            .unwrap();

        assert_eq!(
            InstanceDiff {
                created: 0,
                updated: 1,
                deleted: 2,
            },
            diff
        );

        assert_eq!(1, set.rendered());
        assert_eq!(1, renderer.objects.len());
        assert_eq!(
            2,
            renderer.count(|call| matches!(call, Call::DeleteObject(_)))
        );
    }

    #[test]
    fn hiding_deletes_everything() {
        let mut renderer = renderer();
        let mut set = InstanceSet::default();
        let prototype = PrimPath::new("/tri");

        set.reconcile(&mut renderer, &prototype, &transforms(3), true, "mat")
            .unwrap();

        renderer.take_calls();

        let diff = set
            .reconcile(&mut renderer, &prototype, &[], false, "mat")
            .unwrap();

        assert_eq!(3, diff.deleted);
        assert_eq!(0, set.rendered());
        assert!(set.records().is_empty());
        assert!(renderer.objects.is_empty());

        // Each deletion is preceded by the inverse-transform reset
        let calls = renderer.take_calls();

        assert_eq!(6, calls.len());

        for (ordinal, pair) in calls.chunks(2).enumerate() {
            let name = format!("/tri{ordinal}");

            assert_eq!(
                Call::SetObjectTransform {
                    name: name.clone(),
                    transform: transforms(3)[ordinal].inverse(),
                },
                pair[0]
            );

            assert_eq!(Call::DeleteObject(name), pair[1]);
        }

        // Hiding an already hidden prim doesn't do anything
        let diff = set
            .reconcile(&mut renderer, &prototype, &[], false, "mat")
            .unwrap();

        assert!(diff.is_empty());
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn visibility_toggles_keep_count_in_sync() {
        let mut renderer = renderer();
        let mut set = InstanceSet::default();
        let prototype = PrimPath::new("/tri");

        for (visible, count) in [
            (true, 2),
            (false, 2),
            (true, 4),
            (true, 1),
            (false, 0),
            (true, 0),
            (true, 3),
        ] {
            set.reconcile(
                &mut renderer,
                &prototype,
                &transforms(count),
                visible,
                "mat",
            )
            .unwrap();

            assert_eq!(renderer.objects.len(), set.rendered());
            assert_eq!(if visible { count } else { 0 }, set.rendered());
        }
    }

    #[test]
    fn rebinding_material() {
        let mut renderer = renderer();
        let mut set = InstanceSet::default();
        let prototype = PrimPath::new("/tri");

        set.reconcile(&mut renderer, &prototype, &transforms(2), true, "a")
            .unwrap();

        renderer.take_calls();

        let diff = set
            .reconcile(&mut renderer, &prototype, &transforms(2), true, "b")
            .unwrap();

        assert_eq!(2, diff.updated);
        assert_eq!(Some("b"), set.material());

        assert_eq!(
            2,
            renderer.count(|call| matches!(
                call,
                Call::CreateOrUpdateObject { material, .. } if material == "b"
            ))
        );
    }

    #[test]
    fn interrupted_batch() {
        let mut renderer = renderer();
        let mut set = InstanceSet::default();
        let prototype = PrimPath::new("/tri");

        renderer.fail_creating = Some("/tri2".into());

        let result = set.reconcile(
            &mut renderer,
            &prototype,
            &transforms(4),
            true,
            "mat",
        );

        assert!(result.is_err());
        assert_eq!(2, set.rendered());
        assert_eq!(2, renderer.objects.len());

        renderer.fail_creating = None;

        set.reconcile(&mut renderer, &prototype, &transforms(4), true, "mat")
            .unwrap();

        assert_eq!(4, set.rendered());
        assert_eq!(4, renderer.objects.len());
    }
}
