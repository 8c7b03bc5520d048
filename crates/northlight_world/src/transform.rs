//! # Transforms
//!
//! Position + rotation + scale records and their composition.
//!
//! The hierarchy maintains the invariant that for every object
//! `global = parent_global * local`, recomputed parents-first.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A local or global spatial transform.
///
/// Composition treats `self` as the parent frame:
/// scale is applied first, then rotation, then translation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation.
    pub position: Vec3,
    /// Rotation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Creates a transform from a translation only.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Creates a transform from position, rotation and scale.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Composes `self` (parent frame) with `child` (local frame).
    ///
    /// The result maps points from the child's space into the space
    /// `self` is expressed in.
    #[must_use]
    pub fn compose(&self, child: &Self) -> Self {
        Self {
            position: self.transform_point(child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale * child.scale,
        }
    }

    /// Transforms a point from local space into this transform's space.
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    /// Returns the inverse transform.
    ///
    /// Exact for rigid transforms and uniform scale. Non-uniform scale
    /// combined with rotation is not closed under TRS inversion; the
    /// standard per-axis reciprocal is used, matching what re-parenting
    /// expects.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_scale = self.scale.recip();
        let inv_rotation = self.rotation.conjugate();
        Self {
            position: inv_scale * (inv_rotation * -self.position),
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx_eq(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_identity_composition() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Transform::IDENTITY.compose(&t), t);
        assert_eq!(t.compose(&Transform::IDENTITY), t);
    }

    #[test]
    fn test_translation_composition() {
        let parent = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let global = parent.compose(&child);
        assert!(approx_eq(global.position, Vec3::new(6.0, 0.0, 0.0)));
    }

    #[test]
    fn test_rotation_affects_child_position() {
        let parent = Transform::new(
            Vec3::ZERO,
            Quat::from_rotation_z(FRAC_PI_2),
            Vec3::ONE,
        );
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let global = parent.compose(&child);
        assert!(approx_eq(global.position, Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform::new(
            Vec3::new(3.0, -2.0, 7.0),
            Quat::from_rotation_y(0.7),
            Vec3::splat(2.0),
        );
        let round = t.compose(&t.inverse());
        assert!(approx_eq(round.position, Vec3::ZERO));
        assert!(approx_eq(round.scale, Vec3::ONE));
    }

    #[test]
    fn test_scale_composition() {
        let parent = Transform::new(Vec3::ZERO, Quat::IDENTITY, Vec3::splat(2.0));
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let global = parent.compose(&child);
        assert!(approx_eq(global.position, Vec3::new(2.0, 0.0, 0.0)));
    }
}
