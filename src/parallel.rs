//! Optional rayon parallelism.
//!
//! With the `parallel` feature the macros expand to rayon iterators; without
//! it they fall back to the sequential std equivalents, so every caller
//! produces the same values either way.

/// Conditionally parallel `into_iter` over ranges and owned collections.
///
/// ```ignore
/// use crate::iter_maybe_parallel;
///
/// let squares: Vec<_> = iter_maybe_parallel!(0..100).map(|i| i * i).collect();
/// ```
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

/// Conditionally parallel enumerated `chunks_mut`.
///
/// ```ignore
/// use crate::maybe_par_chunks_mut_enumerate;
///
/// maybe_par_chunks_mut_enumerate!(data, chunk_size, |(idx, chunk)| {
///     // process chunk at index idx
/// });
/// ```
#[macro_export]
macro_rules! maybe_par_chunks_mut_enumerate {
    ($slice:expr, $chunk_size:expr, $closure:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $slice
                .par_chunks_mut($chunk_size)
                .enumerate()
                .for_each($closure);
        }
        #[cfg(not(feature = "parallel"))]
        {
            $slice
                .chunks_mut($chunk_size)
                .enumerate()
                .for_each($closure);
        }
    }};
}

pub use iter_maybe_parallel;
pub use maybe_par_chunks_mut_enumerate;
