//! Vectorized delimiter counting
//!
//! [`Counter::count`] returns the number of bytes in a buffer equal to a single
//! delimiter byte. The buffer is split into three parts that together cover it
//! exactly once:
//!
//! 1. a scalar head up to the next [`ALIGNMENT`] boundary,
//! 2. a vector body, a whole number of vector widths long,
//! 3. a scalar tail shorter than one vector width.
//!
//! The vector backend is picked once, when the counter is built, from the
//! features the CPU reports. Callers never see the width.

use std::fmt;

/// Line terminator counted in line mode
pub const NEWLINE: u8 = b'\n';

/// Boundary the head phase advances to before vector loads start
pub const ALIGNMENT: usize = 32;

/// Implementation used for the vector body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// 32-byte AVX2 compares, two per iteration
    Avx2,
    /// 16-byte SSE2 compares, two per iteration
    Sse2,
    /// 16-byte NEON compares, two per iteration
    Neon,
    /// Portable 8-byte SIMD-within-a-register
    Swar,
    /// `memchr` iterator over the whole buffer
    Memchr,
    /// Reference byte-at-a-time loop
    Scalar,
}

impl Backend {
    pub const ALL: [Backend; 6] = [
        Backend::Avx2,
        Backend::Sse2,
        Backend::Neon,
        Backend::Swar,
        Backend::Memchr,
        Backend::Scalar,
    ];

    /// Widest backend the running CPU supports
    pub fn detect() -> Self {
        [Self::Avx2, Self::Sse2, Self::Neon]
            .into_iter()
            .find(|b| b.is_available())
            .unwrap_or(Self::Swar)
    }

    /// Whether this backend can run on the current CPU
    pub fn is_available(self) -> bool {
        match self {
            Self::Avx2 => cpu::has_avx2(),
            Self::Sse2 => cpu::has_sse2(),
            Self::Neon => cpu::has_neon(),
            Self::Swar | Self::Memchr | Self::Scalar => true,
        }
    }

    /// Bytes consumed per vector step
    pub fn width(self) -> usize {
        match self {
            Self::Avx2 => 32,
            Self::Sse2 | Self::Neon => 16,
            Self::Swar => 8,
            Self::Memchr | Self::Scalar => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Avx2 => "avx2",
            Self::Sse2 => "sse2",
            Self::Neon => "neon",
            Self::Swar => "swar",
            Self::Memchr => "memchr",
            Self::Scalar => "scalar",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counts occurrences of one delimiter byte
#[derive(Debug, Clone, Copy)]
pub struct Counter {
    backend: Backend,
    delimiter: u8,
}

impl Counter {
    /// Counter using the best backend for this CPU
    pub fn new(delimiter: u8) -> Self {
        Self {
            backend: Backend::detect(),
            delimiter,
        }
    }

    /// Newline counter using the best backend for this CPU
    pub fn lines() -> Self {
        Self::new(NEWLINE)
    }

    /// Counter pinned to `backend`, or `None` if the CPU cannot run it
    pub fn with_backend(delimiter: u8, backend: Backend) -> Option<Self> {
        backend
            .is_available()
            .then_some(Self { backend, delimiter })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Number of bytes in `buf` equal to the delimiter
    #[inline]
    pub fn count(&self, buf: &[u8]) -> u64 {
        match self.backend {
            Backend::Scalar => scalar_count(buf, self.delimiter),
            Backend::Memchr => memchr::memchr_iter(self.delimiter, buf).count() as u64,
            backend => count_phased(buf, self.delimiter, backend),
        }
    }
}

/// Reference byte-by-byte count
pub fn scalar_count(buf: &[u8], delimiter: u8) -> u64 {
    buf.iter().filter(|&&b| b == delimiter).count() as u64
}

/// Head, vector body and tail. `backend` must be available on this CPU.
fn count_phased(buf: &[u8], delimiter: u8, backend: Backend) -> u64 {
    let width = backend.width();

    // align_offset may report usize::MAX when it cannot compute an offset
    let head_len = buf.as_ptr().align_offset(ALIGNMENT).min(buf.len());
    let (head, rest) = buf.split_at(head_len);

    let body_len = rest.len() - rest.len() % width;
    let (body, tail) = rest.split_at(body_len);

    scalar_count(head, delimiter) + count_body(body, delimiter, backend) + scalar_count(tail, delimiter)
}

fn count_body(body: &[u8], delimiter: u8, backend: Backend) -> u64 {
    debug_assert_eq!(body.len() % backend.width(), 0);

    match backend {
        // SAFETY: a Counter only holds a backend whose CPU features were detected
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Backend::Avx2 => unsafe { x86::count_avx2(body, delimiter) },
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Backend::Sse2 => unsafe { x86::count_sse2(body, delimiter) },
        #[cfg(target_arch = "aarch64")]
        Backend::Neon => unsafe { neon::count_neon(body, delimiter) },
        Backend::Swar => swar::count(body, delimiter),
        _ => scalar_count(body, delimiter),
    }
}

mod cpu {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    pub fn has_avx2() -> bool {
        is_x86_feature_detected!("avx2")
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    pub fn has_sse2() -> bool {
        is_x86_feature_detected!("sse2")
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    pub fn has_avx2() -> bool {
        false
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    pub fn has_sse2() -> bool {
        false
    }

    #[cfg(target_arch = "aarch64")]
    pub fn has_neon() -> bool {
        std::arch::is_aarch64_feature_detected!("neon")
    }

    #[cfg(not(target_arch = "aarch64"))]
    pub fn has_neon() -> bool {
        false
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86 {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    /// # Safety
    ///
    /// The CPU must support AVX2.
    #[target_feature(enable = "avx2")]
    pub unsafe fn count_avx2(body: &[u8], delimiter: u8) -> u64 {
        let needle = _mm256_set1_epi8(delimiter as i8);
        let mut total = 0u64;

        let mut pairs = body.chunks_exact(64);
        for pair in &mut pairs {
            let lo = _mm256_loadu_si256(pair.as_ptr().cast::<__m256i>());
            let hi = _mm256_loadu_si256(pair.as_ptr().add(32).cast::<__m256i>());
            let lo_mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(lo, needle)) as u32;
            let hi_mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(hi, needle)) as u32;
            total += u64::from(lo_mask.count_ones() + hi_mask.count_ones());
        }

        let mut singles = pairs.remainder().chunks_exact(32);
        for block in &mut singles {
            let v = _mm256_loadu_si256(block.as_ptr().cast::<__m256i>());
            let mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(v, needle)) as u32;
            total += u64::from(mask.count_ones());
        }

        total + super::scalar_count(singles.remainder(), delimiter)
    }

    /// # Safety
    ///
    /// The CPU must support SSE2.
    #[target_feature(enable = "sse2")]
    pub unsafe fn count_sse2(body: &[u8], delimiter: u8) -> u64 {
        let needle = _mm_set1_epi8(delimiter as i8);
        let mut total = 0u64;

        let mut pairs = body.chunks_exact(32);
        for pair in &mut pairs {
            let lo = _mm_loadu_si128(pair.as_ptr().cast::<__m128i>());
            let hi = _mm_loadu_si128(pair.as_ptr().add(16).cast::<__m128i>());
            let lo_mask = _mm_movemask_epi8(_mm_cmpeq_epi8(lo, needle)) as u32;
            let hi_mask = _mm_movemask_epi8(_mm_cmpeq_epi8(hi, needle)) as u32;
            total += u64::from(lo_mask.count_ones() + hi_mask.count_ones());
        }

        let mut singles = pairs.remainder().chunks_exact(16);
        for block in &mut singles {
            let v = _mm_loadu_si128(block.as_ptr().cast::<__m128i>());
            let mask = _mm_movemask_epi8(_mm_cmpeq_epi8(v, needle)) as u32;
            total += u64::from(mask.count_ones());
        }

        total + super::scalar_count(singles.remainder(), delimiter)
    }
}

#[cfg(target_arch = "aarch64")]
mod neon {
    use std::arch::aarch64::*;

    /// # Safety
    ///
    /// The CPU must support NEON.
    #[target_feature(enable = "neon")]
    pub unsafe fn count_neon(body: &[u8], delimiter: u8) -> u64 {
        let needle = vdupq_n_u8(delimiter);
        let ones = vdupq_n_u8(1);
        let mut total = 0u64;

        // Matching lanes are 0xFF; masking to 1 makes the lane sum the popcount.
        let mut pairs = body.chunks_exact(32);
        for pair in &mut pairs {
            let lo = vceqq_u8(vld1q_u8(pair.as_ptr()), needle);
            let hi = vceqq_u8(vld1q_u8(pair.as_ptr().add(16)), needle);
            let hits = vaddq_u8(vandq_u8(lo, ones), vandq_u8(hi, ones));
            total += u64::from(vaddvq_u8(hits));
        }

        let mut singles = pairs.remainder().chunks_exact(16);
        for block in &mut singles {
            let eq = vceqq_u8(vld1q_u8(block.as_ptr()), needle);
            total += u64::from(vaddvq_u8(vandq_u8(eq, ones)));
        }

        total + super::scalar_count(singles.remainder(), delimiter)
    }
}

mod swar {
    const LOW7: u64 = 0x7f7f_7f7f_7f7f_7f7f;
    const HIGH: u64 = 0x8080_8080_8080_8080;
    const SPLAT: u64 = 0x0101_0101_0101_0101;

    /// Counts zero bytes of `word ^ pattern`. `(b & 0x7f) + 0x7f` never carries
    /// out of its byte, so each byte's high bit is exact.
    pub fn count(body: &[u8], delimiter: u8) -> u64 {
        let pattern = SPLAT * u64::from(delimiter);
        let mut total = 0u64;

        let mut words = body.chunks_exact(8);
        for word in &mut words {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(word);
            let x = u64::from_ne_bytes(bytes) ^ pattern;
            let nonzero = ((x & LOW7) + LOW7) | x;
            total += u64::from((!nonzero & HIGH).count_ones());
        }

        total + super::scalar_count(words.remainder(), delimiter)
    }
}
