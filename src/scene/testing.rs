//! Minimal analytic scene fixtures — a sphere, an infinite plane, and a
//! rectangular emissive patch — used only by this crate's own property and
//! end-to-end tests. The sphere intersection is the usual quadratic-formula
//! ray/sphere solve; this is deliberately the smallest fixture that can
//! stand in for the out-of-scope scene loader and BVH.

use crate::primitives::{Aabb, Colour, Vector};

use super::{ComplexIor, Emitter, Material, RawHit, Scene};

pub fn diffuse_material(reflectance: Colour) -> Material {
    Material {
        emittance: Colour::BLACK,
        ior: 1.0,
        external_ior: 1.0,
        transparency: 0.0,
        reflect_probability: 0.0,
        opaque: true,
        perfect_mirror: false,
        complex_ior: None,
        rough_specular: false,
        can_diffusely_reflect: true,
        diffuse_reflectance: reflectance,
        roughness: 1.0,
    }
}

pub fn mirror_material() -> Material {
    Material {
        perfect_mirror: true,
        reflect_probability: 1.0,
        can_diffusely_reflect: false,
        ..diffuse_material(Colour::BLACK)
    }
}

pub fn glass_material(ior: f32) -> Material {
    Material {
        ior,
        transparency: 1.0,
        opaque: false,
        can_diffusely_reflect: false,
        ..diffuse_material(Colour::BLACK)
    }
}

#[allow(dead_code)]
pub fn conductor_material(n: Colour, k: Colour) -> Material {
    Material {
        perfect_mirror: true,
        complex_ior: Some(ComplexIor { n, k }),
        can_diffusely_reflect: false,
        ..diffuse_material(Colour::BLACK)
    }
}

pub struct TestSphere {
    pub centre: Vector,
    pub radius: f32,
    pub material: Material,
}

impl TestSphere {
    fn intersect(&self, origin: Vector, direction: Vector) -> Option<(f32, Vector)> {
        let oc = origin - self.centre;
        let a = direction.dot(&direction);
        let b = 2.0 * direction.dot(&oc);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let t0 = (-b - sqrt_d) / (2.0 * a);
        let t1 = (-b + sqrt_d) / (2.0 * a);
        let t = if t0 > 1e-4 {
            t0
        } else if t1 > 1e-4 {
            t1
        } else {
            return None;
        };
        let p = origin + t * direction;
        let n = (p - self.centre).normalise();
        Some((t, n))
    }
}

pub struct TestPlane {
    pub point: Vector,
    pub normal: Vector,
    pub material: Material,
}

impl TestPlane {
    fn intersect(&self, origin: Vector, direction: Vector) -> Option<(f32, Vector)> {
        let denom = self.normal.dot(&direction);
        if denom.abs() < 1e-7 {
            return None;
        }
        let t = (self.point - origin).dot(&self.normal) / denom;
        if t > 1e-4 {
            Some((t, self.normal))
        } else {
            None
        }
    }
}

pub enum TestObject {
    Sphere(TestSphere),
    Plane(TestPlane),
}

impl TestObject {
    fn intersect(&self, origin: Vector, direction: Vector) -> Option<(f32, Vector, &Material)> {
        match self {
            TestObject::Sphere(s) => s.intersect(origin, direction).map(|(t, n)| (t, n, &s.material)),
            TestObject::Plane(p) => p.intersect(origin, direction).map(|(t, n)| (t, n, &p.material)),
        }
    }
}

/// A rectangular area light in the XZ plane, facing `normal`.
pub struct RectLight {
    pub centre: Vector,
    pub half_extent_x: f32,
    pub half_extent_z: f32,
    pub normal: Vector,
    pub material: Material,
}

impl Emitter for RectLight {
    fn sample_point(&self, u: f32, v: f32) -> Vector {
        self.centre
            + Vector::new(
                (u * 2.0 - 1.0) * self.half_extent_x,
                0.0,
                (v * 2.0 - 1.0) * self.half_extent_z,
            )
    }

    fn normal(&self, _point: Vector) -> Vector {
        self.normal
    }

    fn area(&self) -> f32 {
        4.0 * self.half_extent_x * self.half_extent_z
    }

    fn material(&self) -> &Material {
        &self.material
    }
}

pub struct TestScene {
    pub objects: Vec<TestObject>,
    pub emissives: Vec<Box<dyn Emitter>>,
    pub bounds: Aabb,
}

impl Scene for TestScene {
    fn intersect(&self, origin: Vector, direction: Vector) -> Option<RawHit<'_>> {
        let mut best: Option<(f32, Vector, &Material)> = None;
        for object in &self.objects {
            if let Some((t, n, material)) = object.intersect(origin, direction) {
                if best.is_none() || t < best.unwrap().0 {
                    best = Some((t, n, material));
                }
            }
        }
        best.map(|(t, n, material)| RawHit {
            t,
            geometric_normal: n,
            shading_normal: None,
            material,
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    fn emissives(&self) -> &[Box<dyn Emitter>] {
        &self.emissives
    }
}

/// A 10x10x10 Cornell-like box: a diffuse white floor, and a 2x2 emissive
/// patch in the centre of the ceiling.
pub fn cornell_box(floor_reflectance: Colour, flux: Colour) -> TestScene {
    let half = 5.0;
    let floor = TestObject::Plane(TestPlane {
        point: Vector::new(0.0, -half, 0.0),
        normal: Vector::new(0.0, 1.0, 0.0),
        material: diffuse_material(floor_reflectance),
    });

    let light_material = Material {
        emittance: flux,
        ..diffuse_material(Colour::BLACK)
    };
    let light = RectLight {
        centre: Vector::new(0.0, half - 1e-3, 0.0),
        half_extent_x: 1.0,
        half_extent_z: 1.0,
        normal: Vector::new(0.0, -1.0, 0.0),
        material: light_material,
    };

    TestScene {
        objects: vec![floor],
        emissives: vec![Box::new(light)],
        bounds: Aabb::new(Vector::new(-half, -half, -half), Vector::new(half, half, half)),
    }
}

/// Scenario S2: adds an IOR-1.5 glass sphere between the light and floor.
pub fn cornell_box_with_glass_sphere() -> TestScene {
    let mut scene = cornell_box(Colour::splat(0.8), Colour::splat(1.0));
    scene.objects.push(TestObject::Sphere(TestSphere {
        centre: Vector::new(0.0, 0.0, 0.0),
        radius: 1.2,
        material: glass_material(1.5),
    }));
    scene
}

/// Scenario S4: the floor is replaced with a perfect mirror.
pub fn cornell_box_with_mirror_floor() -> TestScene {
    let half = 5.0;
    let floor = TestObject::Plane(TestPlane {
        point: Vector::new(0.0, -half, 0.0),
        normal: Vector::new(0.0, 1.0, 0.0),
        material: mirror_material(),
    });
    let light_material = Material {
        emittance: Colour::splat(1.0),
        ..diffuse_material(Colour::BLACK)
    };
    let light = RectLight {
        centre: Vector::new(0.0, half - 1e-3, 0.0),
        half_extent_x: 1.0,
        half_extent_z: 1.0,
        normal: Vector::new(0.0, -1.0, 0.0),
        material: light_material,
    };
    TestScene {
        objects: vec![floor],
        emissives: vec![Box::new(light)],
        bounds: Aabb::new(Vector::new(-half, -half, -half), Vector::new(half, half, half)),
    }
}
