use std::mem::swap;

pub trait MinMax {
    type Inner: PartialOrd;
    /// Simultaneously compute the min and max of items in an Iterator. Returns
    /// `None` if the iterator is empty.
    fn minmax(&mut self) -> Option<(Self::Inner, Self::Inner)>;
}

impl<T> MinMax for T
where
    T: Iterator,
    T::Item: PartialOrd + Clone,
{
    type Inner = T::Item;
    fn minmax(&mut self) -> Option<(Self::Inner, Self::Inner)> {
        let mut min = self.next()?;

        let mut max = if let Some(item) = self.next() {
            item
        } else {
            return Some((min.clone(), min));
        };

        if min > max {
            swap(&mut min, &mut max);
        }

        for item in self {
            if item > max {
                max = item;
            } else if item < min {
                min = item;
            }
        }
        Some((min, max))
    }
}

/// Numerically stable `log(sum(exp(xs))`
///
/// Entries equal to negative infinity contribute nothing. If every entry is
/// negative infinity, so is the result.
#[inline]
pub fn logsumexp(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        panic!("Empty container");
    } else if xs.len() == 1 {
        xs[0]
    } else {
        let maxval = xs
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, |max, x| if x > max { x } else { max });

        if maxval == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }

        assert!(maxval.is_finite(), "Could not find maxval of {:?}", xs);

        xs.iter()
            .fold(0.0_f64, |acc, x| acc + (x - maxval).exp())
            .ln()
            + maxval
    }
}

/// Relabel a partition so that labels appear in order of first occurrence.
///
/// # Example
///
/// ```rust
/// # use crosscat_utils::canonical_partition;
/// let z = vec![3, 3, 0, 7, 0];
/// assert_eq!(canonical_partition(&z), vec![0, 0, 1, 2, 1]);
/// ```
pub fn canonical_partition(zs: &[usize]) -> Vec<usize> {
    let mut lookup: std::collections::HashMap<usize, usize> =
        std::collections::HashMap::new();
    zs.iter()
        .map(|z| {
            let next = lookup.len();
            *lookup.entry(*z).or_insert(next)
        })
        .collect()
}
