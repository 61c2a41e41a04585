/// Byte width of a single vector component
const COMPONENT_BYTES: usize = 4;

/// Encodes a vector as concatenated little-endian f32 components
pub fn encode(values: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * COMPONENT_BYTES);
    for value in values {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

/// Decodes a buffer produced by [`encode`]
///
/// Returns `None` when the length is not a multiple of four; callers treat that
/// as "no usable vector".
pub fn decode(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % COMPONENT_BYTES != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(COMPONENT_BYTES)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
