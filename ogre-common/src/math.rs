//! Coordinate conversion between the Z-up source space and the Y-up Ogre space
//!
//! The source (editor) space is right-handed with Z up; Ogre is right-handed
//! with Y up. Positions, normals, tangents and binormals are mapped with
//! `(x, y, z) -> (x, z, -y)`, texture coordinates with `(u, v) -> (u, 1 - v)`.
//! These functions are the only place the axis swap is spelled out; every
//! codec goes through them.

use glam::{Mat3, Mat4, Quat, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

/// Map a source-space vector into Ogre space.
#[inline]
pub fn to_target_space(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// Map an Ogre-space vector back into source space.
#[inline]
pub fn to_source_space(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

/// Flip the V texture coordinate. The mapping is its own inverse.
#[inline]
pub fn uv_flip(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

/// Rotation taking source space to Ogre space (-90° about X).
pub fn source_to_target() -> Mat4 {
    Mat4::from_rotation_x(-FRAC_PI_2)
}

/// Express an Ogre-space rotation in source space (`C · m · C⁻¹`).
pub fn rotation_to_source(m: Mat3) -> Mat3 {
    let c = Mat3::from_rotation_x(FRAC_PI_2);
    c * m * c.transpose()
}

/// Correction applied to a bone's armature-space matrix so the Ogre bone
/// points along the axis Ogre expects.
///
/// Combined with [`source_to_target`] on the right-hand side of every rest
/// matrix.
pub fn bone_axis_fix() -> Mat4 {
    Mat4::from_rotation_z(FRAC_PI_2) * Mat4::from_rotation_x(PI) * source_to_target()
}

/// Rest-relative frame for root bone translation keys.
///
/// Rows: `(1, 0, 0)`, `(0, 0, 1)`, `(0, -1, 0)`.
pub const ROOT_KEY_FRAME: Mat3 =
    Mat3::from_cols_array(&[1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0]);

/// Rest-relative frame for child bone translation keys, applied after the
/// parent-relative rotation.
///
/// Rows: `(0, 1, 0)`, `(0, 0, 1)`, `(1, 0, 0)`.
pub const CHILD_KEY_FRAME: Mat3 =
    Mat3::from_cols_array(&[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

/// Per-bone 3x3 that maps a pose-space location into the keyframe frame.
///
/// `bone` and `parent` are the armature-space rest rotations.
pub fn key_frame_matrix(bone: Mat3, parent: Option<Mat3>) -> Mat3 {
    match parent {
        Some(parent) => CHILD_KEY_FRAME * parent.transpose() * bone,
        None => ROOT_KEY_FRAME * bone,
    }
}

/// Remap a bone-local rotation into Ogre bone axes.
///
/// The source bone's Y axis runs along the bone; Ogre bones run along X, so the
/// vector part is rotated `(x, y, z) -> (y, z, x)`.
#[inline]
pub fn bone_rotation_to_target(q: Quat) -> Quat {
    Quat::from_xyzw(q.y, q.z, q.x, q.w)
}

/// Inverse of [`bone_rotation_to_target`].
#[inline]
pub fn bone_rotation_to_source(q: Quat) -> Quat {
    Quat::from_xyzw(q.z, q.x, q.y, q.w)
}

/// Split a quaternion into `(angle, axis)`.
///
/// The axis falls back to +X when the rotation is (numerically) identity.
pub fn quat_to_angle_axis(q: Quat) -> (f32, Vec3) {
    let angle = q.w.clamp(-1.0, 1.0).acos() * 2.0;
    let v = Vec3::new(q.x, q.y, q.z);
    let len = v.length();
    if len > 0.0 {
        (angle, v / len)
    } else {
        (angle, Vec3::X)
    }
}

/// Build a unit quaternion from `(angle, axis)`; the axis need not be normalized.
pub fn angle_axis_to_quat(angle: f32, axis: Vec3) -> Quat {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_axis_angle(axis, angle)
}

// ============================================================================
// Transform decomposition
// ============================================================================

/// An affine transform split into rotation, translation and residual scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub rotation: Quat,
    pub translation: Vec3,
    pub scale: Vec3,
}

impl Decomposed {
    /// The scale-free part as a matrix.
    pub fn rotation_translation(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_quat(self.rotation)
    }
}

/// Factor an affine matrix into a pure rotation+translation and a scale vector.
///
/// Uses Gram-Schmidt on the basis columns (a QR factorisation); shear ends up
/// discarded. A mirrored basis negates all three scale components so the
/// rotation part stays proper.
pub fn decompose_trs(m: Mat4) -> Decomposed {
    let c0 = m.x_axis.truncate();
    let c1 = m.y_axis.truncate();
    let c2 = m.z_axis.truncate();

    let sx = c0.length();
    let x = unit_or(c0, sx, Vec3::X);

    let c1o = c1 - x * x.dot(c1);
    let sy = c1o.length();
    let y = unit_or(c1o, sy, x.any_orthonormal_vector());

    let c2o = c2 - x * x.dot(c2) - y * y.dot(c2);
    let sz = c2o.length();
    let z = unit_or(c2o, sz, x.cross(y));

    let mut basis = Mat3::from_cols(x, y, z);
    let mut scale = Vec3::new(sx, sy, sz);
    if basis.determinant() < 0.0 {
        basis = -basis;
        scale = -scale;
    }

    Decomposed {
        rotation: Quat::from_mat3(&basis).normalize(),
        translation: m.w_axis.truncate(),
        scale,
    }
}

fn unit_or(v: Vec3, len: f32, fallback: Vec3) -> Vec3 {
    if len > 1e-12 { v / len } else { fallback }
}
