//! Builds a small scene (an instanced, subdivided backdrop lit by a single
//! light), and renders frames until the renderer converges; run with
//! `RUST_LOG=debug` to see what gets synchronized.

use glam::{Mat4, UVec2, Vec3};
use log::info;
use trellis::{
    AovBinding, AovFormat, AovName, DirtyBits, DisplayStyle, Engine,
    LightParams, LightType, MeshTopology, PassState, PrimPath, RenderPass,
    SyncConfig, SyncError,
};
use trellis_memory::{MemoryLight, MemoryMesh, MemoryScene, RecordingRenderer};

const VIEWPORT: UVec2 = UVec2::new(320, 240);

fn main() -> Result<(), SyncError> {
    env_logger::init();

    let scene = MemoryScene::new();
    let backdrop = PrimPath::new("/world/backdrop");
    let instancer = PrimPath::new("/world/backdrops");

    scene.insert_mesh(
        backdrop.clone(),
        MemoryMesh::new(
            MeshTopology::new(vec![4, 4], vec![0, 1, 2, 3, 3, 2, 4, 5]),
            vec![
                Vec3::new(-2.0, 0.0, -2.0),
                Vec3::new(2.0, 0.0, -2.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(-2.0, 0.0, 0.0),
                Vec3::new(2.0, 3.0, 0.0),
                Vec3::new(-2.0, 3.0, 0.0),
            ],
        )
        .with_display_style(DisplayStyle {
            refine_level: 2,
            refined: true,
            flat_shading: false,
        })
        .with_material("clay")
        .with_instancer(instancer.clone()),
    );

    scene.set_instance_transforms(
        &instancer,
        &backdrop,
        (0..3)
            .map(|i| Mat4::from_translation(Vec3::X * 5.0 * i as f32))
            .collect(),
    );

    scene.insert_light(
        "/world/sun",
        MemoryLight::new(
            LightType::Sphere,
            Mat4::from_translation(Vec3::new(0.0, 8.0, 4.0)),
        )
        .with_params(LightParams {
            intensity: 4.0,
            radius: 1.0,
            ..Default::default()
        }),
    );

    let mut engine = Engine::new(SyncConfig {
        sync_threads: 2,
        ..Default::default()
    });

    let mut renderer = RecordingRenderer::new(64);
    let mut pass = RenderPass::new();

    pass.set_aov_bindings(vec![AovBinding::new(
        AovName::Color,
        AovFormat::UNorm8Vec4,
        VIEWPORT,
    )]);

    pass.bootstrap(&mut engine, &mut renderer)?;

    let state = PassState::new(
        VIEWPORT,
        Mat4::look_at_rh(Vec3::new(5.0, 4.0, 12.0), Vec3::ZERO, Vec3::Y),
        Mat4::perspective_rh(
            45f32.to_radians(),
            VIEWPORT.x as f32 / VIEWPORT.y as f32,
            0.1,
            100.0,
        ),
    );

    loop {
        scene.apply_changes(&mut engine);

        let report = pass.run(&mut engine, &scene, &mut renderer, &state)?;

        info!(
            "Frame {}: {} sample(s), converged: {}",
            report.frame,
            renderer.samples(),
            report.converged
        );

        if report.converged {
            break;
        }

        // Midway, the middle backdrop gets moved aside
        if report.frame == 3 {
            scene.set_instance_transforms(
                &instancer,
                &backdrop,
                vec![
                    Mat4::IDENTITY,
                    Mat4::from_translation(Vec3::new(5.0, 0.0, -3.0)),
                    Mat4::from_translation(Vec3::X * 10.0),
                ],
            );
        }

        if report.frame == 5 {
            scene.update_mesh(&backdrop, DirtyBits::MATERIAL_ID, |mesh| {
                mesh.material = Some("marble".into());
            });
        }

        renderer.advance(16);
    }

    let color = &pass.aov_bindings()[0];

    info!(
        "Converged after {} frame(s); {} object(s), {} renderer call(s), \
         first pixel: {:?}",
        pass.frame(),
        renderer.objects().len(),
        renderer.calls().len(),
        &color.data[..4],
    );

    Ok(())
}
