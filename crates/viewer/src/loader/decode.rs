//! Asset payload decoding.
//!
//! Environment maps are equirectangular EXR images decoded with the
//! `image` crate. Models arrive as GLB containers; the header and chunk
//! table are validated and the glTF JSON document is parsed, while the
//! binary chunk is kept as raw bytes for the scene graph to upload.

use image::DynamicImage;

use crate::error::LoadError;
use crate::loader::AssetKind;

/// GLB header magic, "glTF" little-endian.
const GLB_MAGIC: u32 = 0x4654_6C67;
/// Supported GLB container version.
const GLB_VERSION: u32 = 2;
/// Chunk type "JSON".
const CHUNK_JSON: u32 = 0x4E4F_534A;
/// Chunk type "BIN\0".
const CHUNK_BIN: u32 = 0x004E_4942;

/// Decoded equirectangular environment map.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    image: DynamicImage,
}

impl EnvironmentMap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The decoded image, ready for equirectangular-to-cubemap processing.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Parsed GLB model container.
#[derive(Debug, Clone)]
pub struct ModelNode {
    document: serde_json::Value,
    binary: Option<Vec<u8>>,
}

impl ModelNode {
    /// The glTF JSON document.
    pub fn document(&self) -> &serde_json::Value {
        &self.document
    }

    /// The raw binary chunk, if the container carries one.
    pub fn binary(&self) -> Option<&[u8]> {
        self.binary.as_deref()
    }

    /// Number of nodes declared by the document.
    pub fn node_count(&self) -> usize {
        self.document["nodes"].as_array().map_or(0, |n| n.len())
    }

    /// Number of meshes declared by the document.
    pub fn mesh_count(&self) -> usize {
        self.document["meshes"].as_array().map_or(0, |m| m.len())
    }
}

/// Decoded payload of a single asset load task.
#[derive(Debug, Clone)]
pub enum AssetPayload {
    Environment(EnvironmentMap),
    Model(ModelNode),
}

/// Decode fetched bytes into the payload matching the asset kind.
pub fn decode(kind: AssetKind, bytes: &[u8]) -> Result<AssetPayload, LoadError> {
    match kind {
        AssetKind::Environment => decode_environment(bytes).map(AssetPayload::Environment),
        AssetKind::Model => decode_model(bytes).map(AssetPayload::Model),
    }
}

/// Decode an EXR environment map.
pub fn decode_environment(bytes: &[u8]) -> Result<EnvironmentMap, LoadError> {
    let image = image::load_from_memory_with_format(bytes, image::ImageFormat::OpenExr)
        .map_err(|e| LoadError::Decode(format!("exr: {e}")))?;
    Ok(EnvironmentMap { image })
}

/// Decode a GLB model container.
pub fn decode_model(bytes: &[u8]) -> Result<ModelNode, LoadError> {
    if bytes.len() < 12 {
        return Err(LoadError::Decode("glb: truncated header".into()));
    }
    let magic = read_u32(bytes, 0);
    if magic != Some(GLB_MAGIC) {
        return Err(LoadError::Decode("glb: bad magic".into()));
    }
    let version = read_u32(bytes, 4);
    if version != Some(GLB_VERSION) {
        return Err(LoadError::Decode(format!(
            "glb: unsupported version {:?}",
            version
        )));
    }
    let declared = read_u32(bytes, 8).unwrap_or(0) as usize;
    if declared != bytes.len() {
        return Err(LoadError::Decode(format!(
            "glb: declared length {} != actual {}",
            declared,
            bytes.len()
        )));
    }

    let mut document = None;
    let mut binary = None;
    let mut offset = 12;
    while offset < bytes.len() {
        let chunk_len = read_u32(bytes, offset)
            .ok_or_else(|| LoadError::Decode("glb: truncated chunk header".into()))?
            as usize;
        let chunk_type = read_u32(bytes, offset + 4)
            .ok_or_else(|| LoadError::Decode("glb: truncated chunk header".into()))?;
        let data_start = offset + 8;
        let data_end = data_start
            .checked_add(chunk_len)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| LoadError::Decode("glb: chunk overruns container".into()))?;
        let data = &bytes[data_start..data_end];

        match chunk_type {
            CHUNK_JSON => {
                // JSON chunks are space-padded to 4 bytes; serde tolerates it.
                let value: serde_json::Value = serde_json::from_slice(data)
                    .map_err(|e| LoadError::Decode(format!("glb json: {e}")))?;
                document = Some(value);
            }
            CHUNK_BIN => {
                binary = Some(data.to_vec());
            }
            // Unknown chunk types are skipped per the container format.
            _ => {}
        }
        offset = data_end;
    }

    let document =
        document.ok_or_else(|| LoadError::Decode("glb: missing JSON chunk".into()))?;
    Ok(ModelNode { document, binary })
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_glb(json: &str, binary: Option<&[u8]>) -> Vec<u8> {
        let mut json_bytes = json.as_bytes().to_vec();
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }

        let mut out = Vec::new();
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // length patched below
        out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&json_bytes);
        if let Some(bin) = binary {
            let mut bin_bytes = bin.to_vec();
            while bin_bytes.len() % 4 != 0 {
                bin_bytes.push(0);
            }
            out.extend_from_slice(&(bin_bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
            out.extend_from_slice(&bin_bytes);
        }
        let total = out.len() as u32;
        out[8..12].copy_from_slice(&total.to_le_bytes());
        out
    }

    #[test]
    fn test_decode_model() {
        let glb = build_glb(
            r#"{"asset":{"version":"2.0"},"nodes":[{},{}],"meshes":[{}]}"#,
            Some(&[1, 2, 3, 4]),
        );
        let model = decode_model(&glb).unwrap();
        assert_eq!(model.node_count(), 2);
        assert_eq!(model.mesh_count(), 1);
        assert_eq!(model.binary().unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_model_without_binary_chunk() {
        let glb = build_glb(r#"{"asset":{"version":"2.0"}}"#, None);
        let model = decode_model(&glb).unwrap();
        assert_eq!(model.node_count(), 0);
        assert!(model.binary().is_none());
    }

    #[test]
    fn test_decode_model_bad_magic() {
        let mut glb = build_glb(r#"{"asset":{"version":"2.0"}}"#, None);
        glb[0] = b'x';
        assert!(matches!(decode_model(&glb), Err(LoadError::Decode(_))));
    }

    #[test]
    fn test_decode_model_wrong_version() {
        let mut glb = build_glb(r#"{"asset":{"version":"2.0"}}"#, None);
        glb[4..8].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(decode_model(&glb), Err(LoadError::Decode(_))));
    }

    #[test]
    fn test_decode_model_truncated() {
        let glb = build_glb(r#"{"asset":{"version":"2.0"}}"#, None);
        assert!(matches!(
            decode_model(&glb[..glb.len() - 3]),
            Err(LoadError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_environment_rejects_garbage() {
        assert!(matches!(
            decode_environment(&[0u8; 64]),
            Err(LoadError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_environment_exr() {
        let img = DynamicImage::ImageRgb32F(image::Rgb32FImage::from_pixel(
            4,
            2,
            image::Rgb([0.5, 0.25, 1.0]),
        ));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::OpenExr).unwrap();

        let env = decode_environment(buf.get_ref()).unwrap();
        assert_eq!(env.width(), 4);
        assert_eq!(env.height(), 2);
    }
}
