use glam::UVec2;
use log::trace;

use crate::SyncError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AovName {
    Color,
    Depth,
    Normal,
    PrimId,
    InstanceId,
    ElementId,
    Custom(String),
}

impl AovName {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Color => "color",
            Self::Depth => "depth",
            Self::Normal => "normal",
            Self::PrimId => "primId",
            Self::InstanceId => "instanceId",
            Self::ElementId => "elementId",
            Self::Custom(name) => name,
        }
    }

    /// Whether the renderer's film actually provides this output; other
    /// outputs are accepted, but left untouched.
    pub fn is_produced(&self) -> bool {
        matches!(self, Self::Color)
    }

    fn accepts(&self, format: AovFormat) -> bool {
        match self {
            Self::Color => matches!(
                format,
                AovFormat::Float32Vec3
                    | AovFormat::Float32Vec4
                    | AovFormat::UNorm8Vec3
                    | AovFormat::UNorm8Vec4
            ),
            Self::Depth => format == AovFormat::Float32,
            Self::Normal => format == AovFormat::Float32Vec3,
            Self::PrimId | Self::InstanceId | Self::ElementId => {
                format == AovFormat::Int32
            }
            Self::Custom(_) => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AovFormat {
    Float32,
    Float32Vec3,
    Float32Vec4,
    UNorm8Vec3,
    UNorm8Vec4,
    Int32,
}

impl AovFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Float32 | Self::Int32 => 4,
            Self::Float32Vec3 => 12,
            Self::Float32Vec4 => 16,
            Self::UNorm8Vec3 => 3,
            Self::UNorm8Vec4 => 4,
        }
    }
}

/// Output buffer the host asked to be filled after each frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AovBinding {
    pub name: AovName,
    pub format: AovFormat,
    pub size: UVec2,
    pub data: Vec<u8>,
}

impl AovBinding {
    pub fn new(name: AovName, format: AovFormat, size: UVec2) -> Self {
        let len = (size.x * size.y) as usize * format.bytes_per_pixel();

        Self {
            name,
            format,
            size,
            data: vec![0; len],
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.size.x * self.size.y) as usize
    }

    /// Checks whether this binding can be served for given viewport.
    pub fn validate(&self, viewport: UVec2) -> Result<(), SyncError> {
        let mismatch = |reason: String| SyncError::ConfigurationMismatch {
            aov: self.name.as_str().to_owned(),
            reason,
        };

        if !self.name.accepts(self.format) {
            return Err(mismatch(format!(
                "format {:?} is not supported",
                self.format
            )));
        }

        if self.size != viewport {
            return Err(mismatch(format!(
                "buffer is {}x{}, but the viewport is {}x{}",
                self.size.x, self.size.y, viewport.x, viewport.y
            )));
        }

        let expected = self.pixel_count() * self.format.bytes_per_pixel();

        if self.data.len() != expected {
            return Err(mismatch(format!(
                "buffer has {} bytes, expected {expected}",
                self.data.len()
            )));
        }

        Ok(())
    }

    /// Overwrites this binding with the renderer's film, given as tightly
    /// packed RGB triples.
    pub fn write_color(&mut self, rgb: &[f32]) {
        let pixels = rgb.chunks_exact(3).take(self.pixel_count());

        match self.format {
            AovFormat::Float32Vec3 => {
                let bytes: &[u8] = bytemuck::cast_slice(rgb);
                let len = self.data.len().min(bytes.len());

                self.data[..len].copy_from_slice(&bytes[..len]);
            }

            AovFormat::Float32Vec4 => {
                let rgba: Vec<f32> = pixels
                    .flat_map(|pixel| [pixel[0], pixel[1], pixel[2], 1.0])
                    .collect();

                let bytes: &[u8] = bytemuck::cast_slice(&rgba);

                self.data[..bytes.len()].copy_from_slice(bytes);
            }

            AovFormat::UNorm8Vec3 => {
                for (dst, src) in self.data.iter_mut().zip(rgb) {
                    *dst = unorm8(*src);
                }
            }

            AovFormat::UNorm8Vec4 => {
                for (dst, pixel) in self.data.chunks_exact_mut(4).zip(pixels) {
                    dst[0] = unorm8(pixel[0]);
                    dst[1] = unorm8(pixel[1]);
                    dst[2] = unorm8(pixel[2]);
                    dst[3] = u8::MAX;
                }
            }

            format => {
                trace!("Color cannot be written as {format:?}");
            }
        }
    }
}

fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(data: &[u8]) -> Vec<f32> {
        data.chunks_exact(4)
            .map(|bytes| f32::from_ne_bytes(bytes.try_into().unwrap()))
            .collect()
    }

    #[test]
    fn validate() {
        let viewport = UVec2::new(4, 2);

        AovBinding::new(AovName::Color, AovFormat::Float32Vec4, viewport)
            .validate(viewport)
            .unwrap();

        AovBinding::new(AovName::PrimId, AovFormat::Int32, viewport)
            .validate(viewport)
            .unwrap();

        let err = AovBinding::new(AovName::Color, AovFormat::Int32, viewport)
            .validate(viewport)
            .unwrap_err();

        assert_eq!(
            SyncError::ConfigurationMismatch {
                aov: "color".into(),
                reason: "format Int32 is not supported".into(),
            },
            err
        );

        let err = AovBinding::new(
            AovName::Depth,
            AovFormat::Float32,
            UVec2::new(2, 2),
        )
        .validate(viewport)
        .unwrap_err();

        assert_eq!(
            SyncError::ConfigurationMismatch {
                aov: "depth".into(),
                reason: "buffer is 2x2, but the viewport is 4x2".into(),
            },
            err
        );

        let mut binding =
            AovBinding::new(AovName::Color, AovFormat::UNorm8Vec4, viewport);

        binding.data.pop();

        assert!(binding.validate(viewport).is_err());

        assert!(AovBinding::new(
            AovName::Custom("albedo".into()),
            AovFormat::Float32Vec3,
            viewport
        )
        .validate(viewport)
        .is_err());
    }

    #[test]
    fn write_color() {
        let size = UVec2::new(2, 1);
        let rgb = [0.0, 0.5, 1.0, 2.0, -1.0, 0.25];

        let mut binding =
            AovBinding::new(AovName::Color, AovFormat::Float32Vec3, size);

        binding.write_color(&rgb);

        assert_eq!(rgb.to_vec(), floats(&binding.data));

        let mut binding =
            AovBinding::new(AovName::Color, AovFormat::Float32Vec4, size);

        binding.write_color(&rgb);

        assert_eq!(
            vec![0.0, 0.5, 1.0, 1.0, 2.0, -1.0, 0.25, 1.0],
            floats(&binding.data)
        );

        let mut binding =
            AovBinding::new(AovName::Color, AovFormat::UNorm8Vec4, size);

        binding.write_color(&rgb);

        assert_eq!(vec![0, 128, 255, 255, 255, 0, 64, 255], binding.data);

        let mut binding =
            AovBinding::new(AovName::Color, AovFormat::UNorm8Vec3, size);

        binding.write_color(&rgb);

        assert_eq!(vec![0, 128, 255, 255, 0, 64], binding.data);
    }
}
