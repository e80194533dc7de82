//! Fixed-size math types.
//!
//! Each component is an independent little-endian `f32`, so NaN flushing
//! applies per component. Orders:
//!
//! | type      | components                                              |
//! |-----------|---------------------------------------------------------|
//! | `Vec2`    | x, y                                                    |
//! | `Vec3`    | x, y, z                                                 |
//! | `Vec4`    | x, y, z, w                                              |
//! | `Quat`    | x, y, z, w (not renormalized on read)                   |
//! | `Affine2` | column-major 3x2: x_axis.x, x_axis.y, y_axis.x, y_axis.y, translation.x, translation.y |
//! | `Mat4`    | column-major 4x4, 16 floats                             |

use glam::{Affine2, Mat4, Quat, Vec2, Vec3, Vec4};

use crate::{WireDecode, WireEncode, WireError, WireReader, WireWriter};

fn write_floats(w: &mut WireWriter, values: &[f32]) {
    for v in values {
        w.write_f32(*v);
    }
}

fn read_floats<const N: usize>(r: &mut WireReader<'_>) -> Result<[f32; N], WireError> {
    let mut out = [0.0f32; N];
    for slot in &mut out {
        *slot = r.read_f32()?;
    }
    Ok(out)
}

impl WireEncode for Vec2 {
    fn encode(&self, w: &mut WireWriter) {
        write_floats(w, &self.to_array());
    }
}

impl WireDecode for Vec2 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Vec2::from_array(read_floats(r)?))
    }
}

impl WireEncode for Vec3 {
    fn encode(&self, w: &mut WireWriter) {
        write_floats(w, &self.to_array());
    }
}

impl WireDecode for Vec3 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Vec3::from_array(read_floats(r)?))
    }
}

impl WireEncode for Vec4 {
    fn encode(&self, w: &mut WireWriter) {
        write_floats(w, &self.to_array());
    }
}

impl WireDecode for Vec4 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Vec4::from_array(read_floats(r)?))
    }
}

impl WireEncode for Quat {
    fn encode(&self, w: &mut WireWriter) {
        write_floats(w, &self.to_array());
    }
}

impl WireDecode for Quat {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let [x, y, z, w] = read_floats(r)?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }
}

impl WireEncode for Affine2 {
    fn encode(&self, w: &mut WireWriter) {
        write_floats(w, &self.to_cols_array());
    }
}

impl WireDecode for Affine2 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Affine2::from_cols_array(&read_floats(r)?))
    }
}

impl WireEncode for Mat4 {
    fn encode(&self, w: &mut WireWriter) {
        write_floats(w, &self.to_cols_array());
    }
}

impl WireDecode for Mat4 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Mat4::from_cols_array(&read_floats(r)?))
    }
}
