//! Parametric curve blocks used by animation tracks.

use crate::error::GeometryResult;

use super::reader::BinaryReader;

/// A B-spline style curve: knot vector plus control values.
///
/// `controls` holds `dimension` floats per control point. Evaluating the
/// curve is the animation system's job; this crate only stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub curve_type: u8,
    pub dimension: u8,
    pub degree: u8,
    pub knots: Vec<f32>,
    pub controls: Vec<f32>,
}

impl Curve {
    /// Number of control points.
    pub fn control_point_count(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.controls.len() / self.dimension as usize
        }
    }

    /// Parameter of the last knot, 0 for knotless curves.
    pub fn end_time(&self) -> f32 {
        self.knots.last().copied().unwrap_or(0.0)
    }
}

/// Decode `[type:u8]` followed, for non-zero types, by
/// `[dimension:u8][degree:u8][knotCount:u32][f32..][controlCount:u32][f32..]`.
pub fn decode_curve(reader: &mut BinaryReader<'_>) -> GeometryResult<Option<Curve>> {
    let curve_type = reader.read_u8()?;
    if curve_type == 0 {
        return Ok(None);
    }
    let dimension = reader.read_u8()?;
    let degree = reader.read_u8()?;
    let knot_count = reader.read_u32()? as usize;
    let knots = reader.read_f32_array(knot_count)?;
    let control_count = reader.read_u32()? as usize;
    let controls = reader.read_f32_array(control_count)?;
    Ok(Some(Curve {
        curve_type,
        dimension,
        degree,
        knots,
        controls,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::BinaryWriter;

    #[test]
    fn test_absent_curve() {
        let mut reader = BinaryReader::new(&[0], "mem");
        assert_eq!(decode_curve(&mut reader).unwrap(), None);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_curve_roundtrip() {
        let curve = Curve {
            curve_type: 2,
            dimension: 3,
            degree: 1,
            knots: vec![0.0, 0.5, 1.0],
            controls: vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        };
        let mut writer = BinaryWriter::new();
        writer.write_curve(Some(&curve));
        let bytes = writer.into_bytes();

        let mut reader = BinaryReader::new(&bytes, "mem");
        let decoded = decode_curve(&mut reader).unwrap().unwrap();
        assert_eq!(decoded, curve);
        assert_eq!(decoded.control_point_count(), 3);
        assert_eq!(decoded.end_time(), 1.0);
    }
}
