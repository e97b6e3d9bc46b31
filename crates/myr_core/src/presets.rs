//! Procedural scenes.
//!
//! Built in code so the renderer can be exercised without any file loader.

use myr_math::{Mat4, Vec3};

use crate::camera::Camera;
use crate::material::{Color, Material};
use crate::mesh::Mesh;
use crate::scene::{Scene, SceneResult};

/// Append a planar quad centred on `center` spanning `±u` and `±v`.
///
/// The quad faces `u × v`.
pub fn add_quad(mesh: &mut Mesh, center: Vec3, u: Vec3, v: Vec3, material: u32) {
    mesh.add_quad(
        [
            center - u - v,
            center + u - v,
            center + u + v,
            center - u + v,
        ],
        material,
    );
}

/// Axis-aligned cube `[-0.5, 0.5]^3` with outward-facing triangles.
pub fn cube(material: u32) -> Mesh {
    let mut mesh = Mesh::default();
    let h = 0.5;
    add_quad(&mut mesh, Vec3::X * h, Vec3::Y * h, Vec3::Z * h, material);
    add_quad(&mut mesh, -Vec3::X * h, Vec3::Z * h, Vec3::Y * h, material);
    add_quad(&mut mesh, Vec3::Y * h, Vec3::Z * h, Vec3::X * h, material);
    add_quad(&mut mesh, -Vec3::Y * h, Vec3::X * h, Vec3::Z * h, material);
    add_quad(&mut mesh, Vec3::Z * h, Vec3::X * h, Vec3::Y * h, material);
    add_quad(&mut mesh, -Vec3::Z * h, Vec3::Y * h, Vec3::X * h, material);
    mesh
}

/// Cornell box spanning `[-1, 1]^3`, open towards +Z, with a ceiling light,
/// a tall glossy block and a short diffuse block.
pub fn cornell_box() -> SceneResult<Scene> {
    const WHITE: u32 = 0;
    const RED: u32 = 1;
    const GREEN: u32 = 2;
    const LIGHT: u32 = 3;
    const GLOSSY: u32 = 4;

    let materials = vec![
        Material::diffuse(Color::new(0.73, 0.73, 0.73)),
        Material::diffuse(Color::new(0.65, 0.05, 0.05)),
        Material::diffuse(Color::new(0.12, 0.45, 0.15)),
        Material::light(Color::new(17.0, 12.0, 4.0)),
        Material::metal(Color::new(0.9, 0.9, 0.9), 0.3).with_metallic(0.8),
    ];

    let mut mesh = Mesh::default();
    add_quad(&mut mesh, -Vec3::Y, Vec3::Z, Vec3::X, WHITE); // floor
    add_quad(&mut mesh, Vec3::Y, Vec3::X, Vec3::Z, WHITE); // ceiling
    add_quad(&mut mesh, -Vec3::Z, Vec3::X, Vec3::Y, WHITE); // back
    add_quad(&mut mesh, -Vec3::X, Vec3::Y, Vec3::Z, RED); // left
    add_quad(&mut mesh, Vec3::X, Vec3::Z, Vec3::Y, GREEN); // right
    add_quad(
        &mut mesh,
        Vec3::new(0.0, 0.98, 0.0),
        Vec3::X * 0.25,
        Vec3::Z * 0.25,
        LIGHT,
    );

    let mut tall = cube(GLOSSY);
    tall.transform(
        &(Mat4::from_translation(Vec3::new(-0.35, -0.4, -0.3))
            * Mat4::from_rotation_y(0.3)
            * Mat4::from_scale(Vec3::new(0.6, 1.2, 0.6))),
    );
    mesh.append(&tall);

    let mut short = cube(WHITE);
    short.transform(
        &(Mat4::from_translation(Vec3::new(0.4, -0.7, 0.3))
            * Mat4::from_rotation_y(-0.3)
            * Mat4::from_scale(Vec3::splat(0.6))),
    );
    mesh.append(&short);

    let camera = Camera::look_at(Vec3::new(0.0, 0.0, 3.4), Vec3::ZERO, Vec3::Y, 38f32.to_radians());
    Scene::new(mesh, materials, camera)
}

/// A small downward-facing square light `distance` above a large diffuse
/// floor, with the camera looking straight down at the point under the light.
pub fn light_over_floor(distance: f32, light_half_size: f32, emission: Color) -> SceneResult<Scene> {
    let materials = vec![Material::diffuse(Color::splat(0.5)), Material::light(emission)];

    let mut mesh = Mesh::default();
    // Off-centre so the camera's axis does not graze the diagonal edge.
    add_quad(&mut mesh, Vec3::new(0.3, 0.0, 0.7), Vec3::Z * 50.0, Vec3::X * 50.0, 0);
    add_quad(
        &mut mesh,
        Vec3::Y * distance,
        Vec3::X * light_half_size,
        Vec3::Z * light_half_size,
        1,
    );

    let eye = Vec3::Y * (0.5 * distance).min(0.5);
    let camera = Camera::look_at(eye, Vec3::ZERO, Vec3::Z, 2f32.to_radians());
    Scene::new(mesh, materials, camera)
}
