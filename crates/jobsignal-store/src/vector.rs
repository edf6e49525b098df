//! BLOB encoding for embedding vectors: little-endian f32s, no framing —
//! dimension is validated against `EMBEDDING_DIM` by the caller.

pub fn encode(vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

pub fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_blob_encoding() {
        let v = vec![0.1f32, -0.2, 3.5, 0.0];
        let encoded = encode(&v);
        let decoded = decode(&encoded);
        assert_eq!(decoded, v);
    }
}
