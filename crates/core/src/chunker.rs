//! Content-defined chunking with a normalized Gear rolling hash.
//!
//! Boundaries are a pure function of the bytes, so inserting data near the
//! head of a file re-aligns within at most one chunk and every unchanged
//! region keeps its chunk identity. A strict mask (more set bits) applies
//! below the average target and a loose mask above it, pulling the size
//! distribution toward `avg_size`.
//!
//! Parameters are fixed per repository and must match across all writers,
//! otherwise identical data produces different boundaries and deduplication
//! silently stops working.

use crate::gear::GEAR_TABLE;

/// Chunk size normalization level: the strict mask carries `2 * NORM_LEVEL`
/// more bits than the loose one.
const NORM_LEVEL: u32 = 2;

/// Chunk size bounds for the CDC boundary search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkerParams {
    /// No boundary is emitted before this many bytes.
    pub min_size: usize,
    /// Target average chunk size; must be a power of two.
    pub avg_size: usize,
    /// A boundary is forced at this many bytes.
    pub max_size: usize,
}

impl ChunkerParams {
    /// Default parameters: 4 KiB / 8 KiB / 64 KiB.
    ///
    /// Small enough to observe chunking behavior directly; production
    /// repositories typically configure megabyte-scale averages.
    pub const DEFAULT: ChunkerParams = ChunkerParams {
        min_size: 4 * 1024,
        avg_size: 8 * 1024,
        max_size: 64 * 1024,
    };

    /// Validate the parameter triple.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.avg_size.is_power_of_two() {
            return Err(crate::Error::InvalidChunkerParams(format!(
                "avg_size must be a power of two, got {}",
                self.avg_size
            )));
        }
        if self.min_size == 0 || self.min_size >= self.avg_size || self.avg_size >= self.max_size {
            return Err(crate::Error::InvalidChunkerParams(format!(
                "need 0 < min ({}) < avg ({}) < max ({})",
                self.min_size, self.avg_size, self.max_size
            )));
        }
        let bits = self.avg_size.trailing_zeros();
        if bits <= NORM_LEVEL || bits + NORM_LEVEL >= 64 {
            return Err(crate::Error::InvalidChunkerParams(format!(
                "avg_size {} out of maskable range",
                self.avg_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkerParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Stateless content-defined chunker.
#[derive(Clone, Debug)]
pub struct Chunker {
    params: ChunkerParams,
    mask_strict: u64,
    mask_loose: u64,
}

impl Chunker {
    /// Create a chunker from validated parameters.
    pub fn new(params: ChunkerParams) -> crate::Result<Self> {
        params.validate()?;
        let bits = params.avg_size.trailing_zeros();
        Ok(Self {
            params,
            mask_strict: (1u64 << (bits + NORM_LEVEL)) - 1,
            mask_loose: (1u64 << (bits - NORM_LEVEL)) - 1,
        })
    }

    /// The parameters this chunker was built with.
    pub fn params(&self) -> ChunkerParams {
        self.params
    }

    /// Split `data` into chunk boundaries, returned as absolute end offsets
    /// of every complete chunk.
    ///
    /// The tail beyond the last offset is the unconsumed remainder, always
    /// `<= min_size` bytes; streaming callers carry it into the next call
    /// and flush it as a final short chunk at end of input.
    pub fn cut(&self, data: &[u8]) -> Vec<usize> {
        let ChunkerParams {
            min_size,
            avg_size,
            max_size,
        } = self.params;

        let mut cuts = Vec::new();
        let mut offset = 0;
        let n = data.len();

        while offset < n {
            // Too little left for a boundary search; leave as remainder.
            if n - offset <= min_size {
                break;
            }

            // Fingerprint restarts for every chunk so a boundary depends
            // only on bytes within the current chunk.
            let mut fp: u64 = 0;
            let mut idx = offset + min_size;

            let norm_limit = usize::min(offset + avg_size, n);
            let max_limit = usize::min(offset + max_size, n);

            let mut scan = |idx: &mut usize, limit: usize, mask: u64| -> Option<usize> {
                while *idx < limit {
                    fp = (fp << 1).wrapping_add(GEAR_TABLE[data[*idx] as usize]);
                    if fp & mask == 0 {
                        return Some(*idx + 1);
                    }
                    *idx += 1;
                }
                None
            };

            // Strict mask up to the average target, loose mask beyond it,
            // forced boundary at the max limit.
            let cut = scan(&mut idx, norm_limit, self.mask_strict)
                .or_else(|| scan(&mut idx, max_limit, self.mask_loose))
                .unwrap_or(max_limit);

            cuts.push(cut);
            offset = cut;
        }

        cuts
    }
}

impl Default for Chunker {
    fn default() -> Self {
        // DEFAULT is statically valid.
        Self::new(ChunkerParams::DEFAULT).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    }

    #[test]
    fn deterministic() {
        let data = random_bytes(100 * 1024, 1);
        let chunker = Chunker::default();
        assert_eq!(chunker.cut(&data), chunker.cut(&data));
    }

    #[test]
    fn respects_min_and_max() {
        // All-zero input exercises the degenerate fingerprint path.
        for data in [vec![0u8; 200 * 1024], random_bytes(200 * 1024, 2)] {
            let chunker = Chunker::default();
            let params = chunker.params();
            let cuts = chunker.cut(&data);
            let mut start = 0;
            for end in &cuts {
                let size = end - start;
                assert!(size >= params.min_size, "chunk of {size} below min");
                assert!(size <= params.max_size, "chunk of {size} above max");
                start = *end;
            }
            assert!(data.len() - start <= params.min_size);
        }
    }

    #[test]
    fn sub_min_input_has_no_cuts() {
        let data = random_bytes(ChunkerParams::DEFAULT.min_size - 1, 3);
        assert!(Chunker::default().cut(&data).is_empty());
    }

    #[test]
    fn shift_resistance() {
        let data = random_bytes(1024 * 1024, 4);
        let chunker = Chunker::default();
        let base = chunker.cut(&data);

        let prefix = b"pfx";
        let mut shifted = prefix.to_vec();
        shifted.extend_from_slice(&data);
        let moved = chunker.cut(&shifted);

        // Boundaries depend only on bytes inside the current chunk, so after
        // a bounded re-alignment near the head the two runs must agree on
        // the vast majority of boundaries (shifted by the prefix length).
        let expect: std::collections::HashSet<usize> =
            base.iter().map(|c| c + prefix.len()).collect();
        let shared = moved.iter().filter(|c| expect.contains(c)).count();
        assert!(
            shared * 10 >= base.len() * 9,
            "only {shared}/{} boundaries survived a {}-byte prepend",
            base.len(),
            prefix.len()
        );
    }

    #[test]
    fn rejects_bad_params() {
        assert!(Chunker::new(ChunkerParams {
            min_size: 8 * 1024,
            avg_size: 8 * 1024,
            max_size: 64 * 1024,
        })
        .is_err());
        assert!(Chunker::new(ChunkerParams {
            min_size: 1024,
            avg_size: 3000,
            max_size: 64 * 1024,
        })
        .is_err());
    }
}
