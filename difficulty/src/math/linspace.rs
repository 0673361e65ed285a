use num_traits::{Float, FromPrimitive};

/// Returns `n` evenly spaced values from `start` to `end`, inclusive.
pub fn linspace<T>(start: T, end: T, n: usize) -> impl Iterator<Item = T>
where
    T: Float + FromPrimitive,
{
    let intervals = T::from_usize(n.saturating_sub(1).max(1)).unwrap_or_else(T::one);
    let delta = (end - start) / intervals;
    (0..n).map(move |i| start + T::from_usize(i).unwrap_or_else(T::zero) * delta)
}
