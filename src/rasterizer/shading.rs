//! Blinn-Phong reflectance

use super::math::Vec4;
use super::types::{PointLight, ShadingMode, ShadingOptions};

/// Scalar light intensity at world-space `point` with unit `normal`,
/// seen from `eye`. The result scales the sampled texture color.
pub fn blinn_phong(point: Vec4, normal: Vec4, options: &ShadingOptions, light: &PointLight, eye: Vec4) -> f32 {
    if options.mode == ShadingMode::Unlit {
        return 1.0;
    }

    let n = normal.normalize();
    let l = (light.position - point).normalize();
    let v = (eye - point).normalize();
    let h = (v + l).normalize();

    let ambient = options.ambient;
    let diffuse = options.diffuse * n.dot(l).max(0.0);
    let specular = options.specular * n.dot(h).max(0.0).powf(options.shininess);

    ambient + diffuse + specular
}

/// Shade a texture sample and clamp it to the displayable range
pub fn shade_color(texel: Vec4, intensity: f32, light: &PointLight) -> Vec4 {
    let rgb = Vec4::new(
        texel.x * intensity * (light.color.x / 255.0),
        texel.y * intensity * (light.color.y / 255.0),
        texel.z * intensity * (light.color.z / 255.0),
        texel.w,
    );
    rgb.clamp(0.0, 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(ambient: f32, diffuse: f32, specular: f32) -> ShadingOptions {
        ShadingOptions {
            mode: ShadingMode::BlinnPhong,
            ambient,
            diffuse,
            specular,
            shininess: 8.0,
        }
    }

    #[test]
    fn test_light_straight_above() {
        let light = PointLight::new(Vec4::point(0.0, 5.0, 0.0));
        let eye = Vec4::point(0.0, 3.0, 0.0);
        let n = Vec4::direction(0.0, 1.0, 0.0);
        let i = blinn_phong(Vec4::point(0.0, 0.0, 0.0), n, &options(0.1, 0.6, 0.3), &light, eye);
        // N.L = 1 and N.H = 1
        assert!((i - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_light_behind_surface_is_ambient_only() {
        let light = PointLight::new(Vec4::point(0.0, -5.0, 0.0));
        let eye = Vec4::point(0.0, -3.0, 0.0);
        let n = Vec4::direction(0.0, 1.0, 0.0);
        let i = blinn_phong(Vec4::point(0.0, 0.0, 0.0), n, &options(0.25, 0.6, 0.3), &light, eye);
        assert!((i - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_grazing_diffuse() {
        // Light at 60 degrees from the normal, no specular
        let light = PointLight::new(Vec4::point(3.0_f32.sqrt(), 1.0, 0.0));
        let eye = Vec4::point(0.0, 1.0, 0.0);
        let n = Vec4::direction(0.0, 1.0, 0.0);
        let i = blinn_phong(Vec4::point(0.0, 0.0, 0.0), n, &options(0.0, 1.0, 0.0), &light, eye);
        assert!((i - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_unlit_ignores_light() {
        let light = PointLight::new(Vec4::point(0.0, -5.0, 0.0));
        let mut opts = options(0.0, 0.0, 0.0);
        opts.mode = ShadingMode::Unlit;
        let i = blinn_phong(Vec4::point(0.0, 0.0, 0.0), Vec4::UP, &opts, &light, Vec4::point(0.0, 1.0, 0.0));
        assert_eq!(i, 1.0);
    }

    #[test]
    fn test_shade_color_clamps() {
        let light = PointLight::new(Vec4::point(0.0, 0.0, 0.0));
        let c = shade_color(Vec4::rgb(200.0, 100.0, 10.0), 1.5, &light);
        assert!(c.approx_eq(Vec4::rgb(255.0, 150.0, 15.0), 1e-3));
        let tinted = shade_color(Vec4::rgb(200.0, 200.0, 200.0), 1.0, &light.with_color(Vec4::rgb(255.0, 0.0, 127.5)));
        assert!(tinted.approx_eq(Vec4::rgb(200.0, 0.0, 100.0), 1e-3));
    }
}
