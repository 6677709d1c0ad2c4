//! Vector encoding and similarity helpers.

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub(crate) fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}

/// Little-endian `f32` blob.
pub(crate) fn encode(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Returns `None` when the blob length is not a multiple of 4.
pub(crate) fn decode(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical() {
        let a = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn cosine_similarity_zero_vector() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn blob_preserves_bits() {
        let v = vec![1.5_f32, -0.25, f32::MIN_POSITIVE, 0.0];
        let blob = encode(&v);
        assert_eq!(blob.len(), 16);
        assert_eq!(decode(&blob).unwrap(), v);
    }

    #[test]
    fn finiteness_check() {
        assert!(is_finite(&[0.0, -1.5, f32::MAX]));
        assert!(!is_finite(&[0.0, f32::NAN]));
        assert!(!is_finite(&[f32::INFINITY]));
    }

    #[test]
    fn decode_rejects_truncated_blob() {
        assert!(decode(&[0, 0, 128]).is_none());
    }
}
